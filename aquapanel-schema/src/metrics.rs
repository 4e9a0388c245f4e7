//! Host metric payloads served by `/api/system-info`, `/api/performance` and the socket.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Slow-changing host description. Cached for minutes, not seconds.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
pub struct SystemInfo {
    pub cpu: CpuInfo,
    pub memory: MemoryInfo,
    pub disks: Vec<DiskInfo>,
    pub network: Vec<NetworkInterfaceInfo>,
    pub os: OsInfo,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
pub struct CpuInfo {
    pub brand: String,
    pub vendor: String,
    /// Logical cores as reported by the OS.
    pub cores: usize,
    /// Current frequency of the first core in MHz.
    pub frequency_mhz: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
pub struct MemoryInfo {
    pub total: u64,
    pub used: u64,
    pub free: u64,
    pub available: u64,
    /// Percent, two decimals.
    pub usage: f64,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
pub struct DiskInfo {
    pub name: String,
    pub filesystem: String,
    pub mount: String,
    pub size: u64,
    pub used: u64,
    pub available: u64,
    pub usage: f64,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
pub struct NetworkInterfaceInfo {
    pub interface: String,
    pub mac: String,
    pub addresses: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
pub struct OsInfo {
    pub name: Option<String>,
    pub version: Option<String>,
    pub kernel: Option<String>,
    pub arch: String,
    pub hostname: Option<String>,
    /// Seconds since boot.
    pub uptime: u64,
}

/// Fast-changing sample pushed to dashboards and fed to the alert evaluator.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct PerformanceSnapshot {
    pub cpu: CpuLoad,
    pub memory: MemoryUsage,
    pub disk: DiskUsage,
    pub network: Vec<NetworkStat>,
    pub processes: ProcessSummary,
    pub timestamp: DateTime<Utc>,
}

impl PerformanceSnapshot {
    /// An all-zero snapshot stamped with `timestamp`.
    pub fn empty(timestamp: DateTime<Utc>) -> Self {
        Self {
            cpu: CpuLoad::default(),
            memory: MemoryUsage::default(),
            disk: DiskUsage::default(),
            network: Vec::new(),
            processes: ProcessSummary::default(),
            timestamp,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
pub struct CpuLoad {
    /// Global usage in percent.
    pub usage: f64,
    pub cores: Vec<CoreLoad>,
    pub load_average: LoadAverage,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
pub struct CoreLoad {
    pub name: String,
    pub load: f64,
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize, Default, PartialEq)]
pub struct LoadAverage {
    pub one: f64,
    pub five: f64,
    pub fifteen: f64,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
pub struct MemoryUsage {
    pub total: u64,
    pub used: u64,
    pub free: u64,
    pub available: u64,
    pub usage: f64,
    pub swap: SwapUsage,
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize, Default, PartialEq)]
pub struct SwapUsage {
    pub total: u64,
    pub used: u64,
    pub free: u64,
}

/// Aggregate over all mounted filesystems with a non-zero size.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, Default, PartialEq)]
pub struct DiskUsage {
    pub total: u64,
    pub used: u64,
    pub usage: f64,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
pub struct NetworkStat {
    pub interface: String,
    pub rx_bytes: u64,
    pub tx_bytes: u64,
    /// Bytes per second since the previous sample.
    pub rx_sec: f64,
    pub tx_sec: f64,
    pub rx_errors: u64,
    pub tx_errors: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
pub struct ProcessSummary {
    pub all: u64,
    pub running: u64,
    pub sleeping: u64,
    pub blocked: u64,
    pub unknown: u64,
    /// Top processes by CPU usage.
    pub list: Vec<ProcessEntry>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
pub struct ProcessEntry {
    pub pid: u32,
    pub ppid: Option<u32>,
    pub name: String,
    pub command: String,
    pub cpu: f64,
    /// Resident memory in bytes.
    pub mem: u64,
    pub state: String,
}
