use crate::collectors::HostSample;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const BYTES_PER_MB: u64 = 1024 * 1024;
const BYTES_PER_GB: f64 = 1024.0 * 1024.0 * 1024.0;

/// One wire message. The collector expects PascalCase keys and every value as
/// a pre-formatted string, including the redundant auth token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    #[serde(rename = "Hostname")]
    pub hostname: String,
    #[serde(rename = "OS")]
    pub os: String,
    #[serde(rename = "Uptime")]
    pub uptime: String,
    #[serde(rename = "Shell")]
    pub shell: String,
    #[serde(rename = "CPU")]
    pub cpu: String,
    #[serde(rename = "MemStats")]
    pub mem_stats: String,
    #[serde(rename = "TotalDiskSpace")]
    pub total_disk_space: String,
    #[serde(rename = "FreeDiskSpace")]
    pub free_disk_space: String,
    #[serde(rename = "UsedDiskSpace")]
    pub used_disk_space: String,
    #[serde(rename = "SystemArch")]
    pub system_arch: String,
    #[serde(rename = "AuthToken")]
    pub auth_token: String,
    #[serde(rename = "CPUPercentage")]
    pub cpu_percentage: String,
    #[serde(rename = "RAMPercentage")]
    pub ram_percentage: String,
}

/// Formats one typed sample into the wire record. All string rendering lives
/// here, at the encoding boundary; missing best-effort fields get their
/// defaults (empty string, "Unknown" for the shell, "0" for disk figures).
pub fn assemble(sample: &HostSample, auth_token: &str) -> Report {
    let arch = sample.arch.clone().unwrap_or_default();
    let (total_disk_space, free_disk_space, used_disk_space) =
        format_disk_space(sample.disk_total_bytes, sample.disk_free_bytes);

    Report {
        hostname: sample.host_name.clone().unwrap_or_default(),
        os: sample.os_name.clone().unwrap_or_default(),
        uptime: sample
            .uptime_seconds
            .map(format_uptime)
            .unwrap_or_default(),
        shell: sample
            .shell
            .clone()
            .unwrap_or_else(|| "Unknown".to_string()),
        // The collector's CPU field historically carries the architecture,
        // same as SystemArch.
        cpu: arch.clone(),
        mem_stats: sample
            .memory_total_bytes
            .map(|b| format!("{}MB", b / BYTES_PER_MB))
            .unwrap_or_default(),
        total_disk_space,
        free_disk_space,
        used_disk_space,
        system_arch: arch,
        auth_token: auth_token.to_string(),
        cpu_percentage: format_percent(sample.cpu_usage_percent),
        ram_percentage: format_percent(sample.memory_usage_percent),
    }
}

fn format_percent(value: f64) -> String {
    format!("{value:.2}%")
}

fn format_uptime(seconds: u64) -> String {
    humantime::format_duration(Duration::from_secs(seconds)).to_string()
}

/// Disk totals go out as whole gigabytes without units, used space with one
/// decimal place. Anything unmeasured collapses to "0".
fn format_disk_space(total_bytes: Option<u64>, free_bytes: Option<u64>) -> (String, String, String) {
    let total = total_bytes.map(|b| b as f64 / BYTES_PER_GB);
    let free = free_bytes.map(|b| b as f64 / BYTES_PER_GB);

    let total_str = total.map_or_else(|| "0".to_string(), |gb| format!("{}", gb.round() as u64));
    let free_str = free.map_or_else(|| "0".to_string(), |gb| format!("{}", gb.round() as u64));
    let used_str = match (total, free) {
        (Some(t), Some(f)) => format!("{:.1}", (t - f).max(0.0)),
        _ => "0".to_string(),
    };

    (total_str, free_str, used_str)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_sample() -> HostSample {
        HostSample {
            host_name: Some("workstation".to_string()),
            os_name: Some("Ubuntu".to_string()),
            uptime_seconds: Some(3 * 3600 + 120),
            shell: Some("zsh".to_string()),
            arch: Some("x86_64".to_string()),
            memory_total_bytes: Some(16 * 1024 * 1024 * 1024),
            disk_total_bytes: Some(512 * 1024 * 1024 * 1024),
            disk_free_bytes: Some(128 * 1024 * 1024 * 1024),
            cpu_usage_percent: 12.345,
            memory_usage_percent: 67.891,
        }
    }

    #[test]
    fn percentages_use_two_decimals_and_a_percent_sign() {
        let report = assemble(&full_sample(), "token");
        assert_eq!(report.cpu_percentage, "12.35%");
        assert_eq!(report.ram_percentage, "67.89%");
    }

    #[test]
    fn disk_figures_are_bare_numeric_strings() {
        let report = assemble(&full_sample(), "token");
        assert_eq!(report.total_disk_space, "512");
        assert_eq!(report.free_disk_space, "128");
        assert_eq!(report.used_disk_space, "384.0");
    }

    #[test]
    fn memory_is_whole_megabytes_with_suffix() {
        let report = assemble(&full_sample(), "token");
        assert_eq!(report.mem_stats, "16384MB");
    }

    #[test]
    fn auth_token_is_embedded_in_the_body() {
        let report = assemble(&full_sample(), "secret-token");
        assert_eq!(report.auth_token, "secret-token");
    }

    #[test]
    fn cpu_and_arch_fields_carry_the_same_value() {
        let report = assemble(&full_sample(), "token");
        assert_eq!(report.cpu, "x86_64");
        assert_eq!(report.system_arch, "x86_64");
    }

    #[test]
    fn missing_best_effort_fields_fall_back_to_defaults() {
        let sample = HostSample {
            host_name: None,
            os_name: None,
            uptime_seconds: None,
            shell: None,
            arch: None,
            memory_total_bytes: None,
            disk_total_bytes: None,
            disk_free_bytes: None,
            cpu_usage_percent: 1.0,
            memory_usage_percent: 2.0,
        };
        let report = assemble(&sample, "token");
        assert_eq!(report.hostname, "");
        assert_eq!(report.os, "");
        assert_eq!(report.uptime, "");
        assert_eq!(report.shell, "Unknown");
        assert_eq!(report.mem_stats, "");
        assert_eq!(report.total_disk_space, "0");
        assert_eq!(report.free_disk_space, "0");
        assert_eq!(report.used_disk_space, "0");
        // The required percentages are still rendered.
        assert_eq!(report.cpu_percentage, "1.00%");
        assert_eq!(report.ram_percentage, "2.00%");
    }

    #[test]
    fn wire_keys_are_pascal_case() {
        let value = serde_json::to_value(assemble(&full_sample(), "token"))
            .expect("report should serialize");
        let object = value.as_object().expect("report should be a json object");
        let mut keys: Vec<&str> = object.keys().map(String::as_str).collect();
        keys.sort_unstable();
        assert_eq!(
            keys,
            vec![
                "AuthToken",
                "CPU",
                "CPUPercentage",
                "FreeDiskSpace",
                "Hostname",
                "MemStats",
                "OS",
                "RAMPercentage",
                "Shell",
                "SystemArch",
                "TotalDiskSpace",
                "Uptime",
                "UsedDiskSpace",
            ]
        );
        assert!(object.values().all(serde_json::Value::is_string));
    }
}
