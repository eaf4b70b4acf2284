use crate::collectors::{HostSample, HostSampler, SampleError};
use std::path::Path;
use sysinfo::{CpuExt, DiskExt, System, SystemExt};

/// Production sampler backed by sysinfo. CPU usage is computed from the delta
/// between refreshes, so the first cycle after startup reads near zero.
pub struct SysinfoSampler {
    system: System,
}

impl SysinfoSampler {
    pub fn new() -> Self {
        Self {
            system: System::new_all(),
        }
    }
}

impl Default for SysinfoSampler {
    fn default() -> Self {
        Self::new()
    }
}

impl HostSampler for SysinfoSampler {
    fn sample(&mut self) -> Result<HostSample, SampleError> {
        self.system.refresh_cpu();
        self.system.refresh_memory();
        self.system.refresh_disks_list();
        self.system.refresh_disks();

        let host_name = self.system.host_name();
        let os_name = self.system.name();
        let uptime_seconds = Some(self.system.uptime());
        let shell = shell_name();
        let arch = Some(std::env::consts::ARCH.to_string());
        let memory_total_bytes = match self.system.total_memory() {
            0 => None,
            bytes => Some(bytes),
        };
        let (disk_total_bytes, disk_free_bytes) = root_disk_space(&self.system);

        // Usage percentages come last and are the only required fields.
        let cpus = self.system.cpus();
        if cpus.is_empty() {
            return Err(SampleError::CpuUsageUnavailable);
        }
        let cpu_usage_percent =
            (cpus.iter().map(|c| c.cpu_usage()).sum::<f32>() / cpus.len() as f32) as f64;

        let total_bytes = self.system.total_memory();
        if total_bytes == 0 {
            return Err(SampleError::MemoryUsageUnavailable);
        }
        let memory_usage_percent =
            (self.system.used_memory() as f64 / total_bytes as f64) * 100.0;

        Ok(HostSample {
            host_name,
            os_name,
            uptime_seconds,
            shell,
            arch,
            memory_total_bytes,
            disk_total_bytes,
            disk_free_bytes,
            cpu_usage_percent,
            memory_usage_percent,
        })
    }
}

fn shell_name() -> Option<String> {
    std::env::var("SHELL")
        .ok()
        .filter(|s| !s.is_empty())
        .and_then(|s| s.rsplit('/').next().map(str::to_string))
}

/// Totals for the root filesystem; falls back to the largest disk on hosts
/// without a "/" mount (e.g. Windows).
fn root_disk_space(system: &System) -> (Option<u64>, Option<u64>) {
    let disks = system.disks();
    let disk = disks
        .iter()
        .find(|d| d.mount_point() == Path::new("/"))
        .or_else(|| disks.iter().max_by_key(|d| d.total_space()));

    match disk {
        Some(d) => (Some(d.total_space()), Some(d.available_space())),
        None => (None, None),
    }
}
