//! System facts injected into every benchmark row.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Host information recorded alongside benchmark results
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpu: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpu_cores: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpu_threads: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory_mb: Option<u64>,

    pub os: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub os_version: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub kernel: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,

    pub arch: String,
}

impl Default for SystemInfo {
    fn default() -> Self {
        SystemInfo {
            cpu: None,
            cpu_cores: None,
            cpu_threads: None,
            memory_mb: None,
            os: std::env::consts::OS.to_string(),
            os_version: None,
            kernel: None,
            hostname: None,
            arch: std::env::consts::ARCH.to_string(),
        }
    }
}

impl SystemInfo {
    /// Detect system information from the current host
    pub fn detect() -> Self {
        use sysinfo::System;

        let mut sys = System::new_all();
        sys.refresh_all();

        let cpu = sys
            .cpus()
            .first()
            .map(|c| c.brand().trim().to_string())
            .filter(|s| !s.is_empty());
        let cpu_cores = sys.physical_core_count().map(|c| c as u32);
        let cpu_threads = Some(sys.cpus().len() as u32).filter(|n| *n > 0);
        let memory_mb = Some(sys.total_memory() / (1024 * 1024)).filter(|m| *m > 0);

        SystemInfo {
            cpu,
            cpu_cores,
            cpu_threads,
            memory_mb,
            os: System::name().unwrap_or_else(|| std::env::consts::OS.to_string()),
            os_version: System::os_version(),
            kernel: System::kernel_version(),
            hostname: System::host_name(),
            arch: std::env::consts::ARCH.to_string(),
        }
    }

    /// Flatten into `fact -> value` pairs. Unknown facts are omitted.
    pub fn to_facts(&self) -> BTreeMap<String, String> {
        let mut facts = BTreeMap::new();
        let mut put = |k: &str, v: Option<String>| {
            if let Some(v) = v {
                facts.insert(k.to_string(), v);
            }
        };
        put("cpu", self.cpu.clone());
        put("cpu_cores", self.cpu_cores.map(|v| v.to_string()));
        put("cpu_threads", self.cpu_threads.map(|v| v.to_string()));
        put("memory_mb", self.memory_mb.map(|v| v.to_string()));
        put("os", Some(self.os.clone()));
        put("os_version", self.os_version.clone());
        put("kernel", self.kernel.clone());
        put("hostname", self.hostname.clone());
        put("arch", Some(self.arch.clone()));
        facts
    }
}

/// Supplies the system facts for a run. Collected once at construction.
pub trait SystemInfoSource {
    fn collect(&self) -> BTreeMap<String, String>;
}

/// Reads facts from the running host via `sysinfo`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SysinfoSource;

impl SystemInfoSource for SysinfoSource {
    fn collect(&self) -> BTreeMap<String, String> {
        SystemInfo::detect().to_facts()
    }
}

impl SystemInfoSource for BTreeMap<String, String> {
    fn collect(&self) -> BTreeMap<String, String> {
        self.clone()
    }
}
