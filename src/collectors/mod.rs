pub mod system;

use thiserror::Error;

/// Typed metric values for one cycle. Best-effort fields are `None` when the
/// host refuses to report them; the record still ships with defaults filled in
/// at the wire boundary. Usage percentages are required: sampling fails the
/// whole cycle when they are unavailable.
#[derive(Debug, Clone, PartialEq)]
pub struct HostSample {
    pub host_name: Option<String>,
    pub os_name: Option<String>,
    pub uptime_seconds: Option<u64>,
    pub shell: Option<String>,
    pub arch: Option<String>,
    pub memory_total_bytes: Option<u64>,
    pub disk_total_bytes: Option<u64>,
    pub disk_free_bytes: Option<u64>,
    pub cpu_usage_percent: f64,
    pub memory_usage_percent: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SampleError {
    #[error("cpu usage unavailable: host reported no cpus")]
    CpuUsageUnavailable,
    #[error("memory usage unavailable: host reported zero total memory")]
    MemoryUsageUnavailable,
}

/// One full measurement pass over the host. Every field is recomputed on every
/// call; implementations hold whatever refresh state they need.
pub trait HostSampler {
    fn sample(&mut self) -> Result<HostSample, SampleError>;
}
