//! Host sampling on top of `sysinfo`. Everything here is blocking and runs on the blocking pool.

use ahash::AHashMap;
use aquapanel_schema::{
    CoreLoad, CpuInfo, CpuLoad, DiskInfo, DiskUsage, LoadAverage, MemoryInfo, MemoryUsage,
    NetworkInterfaceInfo, NetworkStat, OsInfo, PerformanceSnapshot, ProcessEntry, ProcessSummary,
    SwapUsage, SystemInfo,
};
use chrono::Utc;
use std::time::Instant;
use sysinfo::{Disks, Networks, ProcessStatus, System};

/// Interface names treated as loopback and left out of every report.
fn is_loopback(name: &str) -> bool {
    name == "lo" || name.starts_with("lo0") || name.eq_ignore_ascii_case("loopback")
}

pub(crate) fn usage_pct(used: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        used as f64 / total as f64 * 100.0
    }
}

/// Bytes per second between two cumulative counters. A counter reset yields 0.
pub(crate) fn per_second(prev: u64, current: u64, elapsed_secs: f64) -> f64 {
    if elapsed_secs <= 0.0 {
        return 0.0;
    }
    current.saturating_sub(prev) as f64 / elapsed_secs
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ProcessBucket {
    Running,
    Sleeping,
    Blocked,
    Unknown,
}

pub(crate) fn bucket_of(status: ProcessStatus) -> ProcessBucket {
    match status {
        ProcessStatus::Run => ProcessBucket::Running,
        ProcessStatus::Sleep | ProcessStatus::Idle => ProcessBucket::Sleeping,
        ProcessStatus::UninterruptibleDiskSleep | ProcessStatus::LockBlocked => {
            ProcessBucket::Blocked
        }
        _ => ProcessBucket::Unknown,
    }
}

#[derive(Debug, Clone, Copy)]
struct NetCounters {
    rx: u64,
    tx: u64,
}

pub struct Collector {
    sys: System,
    process_limit: usize,
    last_net: AHashMap<String, NetCounters>,
    last_net_at: Option<Instant>,
}

impl Collector {
    pub fn new(process_limit: usize) -> Self {
        let mut sys = System::new_all();
        sys.refresh_all();
        Self {
            sys,
            process_limit,
            last_net: AHashMap::new(),
            last_net_at: None,
        }
    }

    pub fn system_info(&mut self) -> SystemInfo {
        self.sys.refresh_memory();

        let cpus = self.sys.cpus();
        let cpu = CpuInfo {
            brand: cpus
                .first()
                .map(|c| c.brand().trim().to_string())
                .unwrap_or_default(),
            vendor: cpus
                .first()
                .map(|c| c.vendor_id().to_string())
                .unwrap_or_default(),
            cores: cpus.len(),
            frequency_mhz: cpus.first().map(|c| c.frequency()).unwrap_or_default(),
        };

        let memory = MemoryInfo {
            total: self.sys.total_memory(),
            used: self.sys.used_memory(),
            free: self.sys.free_memory(),
            available: self.sys.available_memory(),
            usage: usage_pct(self.sys.used_memory(), self.sys.total_memory()),
        };

        let disks = Disks::new_with_refreshed_list()
            .list()
            .iter()
            .filter(|d| d.total_space() > 0)
            .map(|d| {
                let size = d.total_space();
                let available = d.available_space();
                let used = size.saturating_sub(available);
                DiskInfo {
                    name: d.name().to_string_lossy().into_owned(),
                    filesystem: d.file_system().to_string_lossy().into_owned(),
                    mount: d.mount_point().to_string_lossy().into_owned(),
                    size,
                    used,
                    available,
                    usage: usage_pct(used, size),
                }
            })
            .collect();

        let mut network: Vec<NetworkInterfaceInfo> = Networks::new_with_refreshed_list()
            .list()
            .iter()
            .filter(|(name, _)| !is_loopback(name))
            .map(|(name, data)| NetworkInterfaceInfo {
                interface: name.clone(),
                mac: data.mac_address().to_string(),
                addresses: data
                    .ip_networks()
                    .iter()
                    .map(|ip| ip.addr.to_string())
                    .collect(),
            })
            .collect();
        network.sort_by(|a, b| a.interface.cmp(&b.interface));

        let os = OsInfo {
            name: System::name(),
            version: System::os_version(),
            kernel: System::kernel_version(),
            arch: std::env::consts::ARCH.to_string(),
            hostname: System::host_name(),
            uptime: System::uptime(),
        };

        SystemInfo {
            cpu,
            memory,
            disks,
            network,
            os,
        }
    }

    pub fn sample(&mut self) -> PerformanceSnapshot {
        self.sys.refresh_all();
        let timestamp = Utc::now();

        let load = System::load_average();
        let cpu = CpuLoad {
            usage: f64::from(self.sys.global_cpu_usage()),
            cores: self
                .sys
                .cpus()
                .iter()
                .map(|c| CoreLoad {
                    name: c.name().to_string(),
                    load: f64::from(c.cpu_usage()),
                })
                .collect(),
            load_average: LoadAverage {
                one: load.one,
                five: load.five,
                fifteen: load.fifteen,
            },
        };

        let memory = MemoryUsage {
            total: self.sys.total_memory(),
            used: self.sys.used_memory(),
            free: self.sys.free_memory(),
            available: self.sys.available_memory(),
            usage: usage_pct(self.sys.used_memory(), self.sys.total_memory()),
            swap: SwapUsage {
                total: self.sys.total_swap(),
                used: self.sys.used_swap(),
                free: self.sys.free_swap(),
            },
        };

        let (disk_total, disk_used) = Disks::new_with_refreshed_list()
            .list()
            .iter()
            .fold((0u64, 0u64), |(total, used), d| {
                let size = d.total_space();
                (
                    total.saturating_add(size),
                    used.saturating_add(size.saturating_sub(d.available_space())),
                )
            });
        let disk = DiskUsage {
            total: disk_total,
            used: disk_used,
            usage: usage_pct(disk_used, disk_total),
        };

        PerformanceSnapshot {
            cpu,
            memory,
            disk,
            network: self.sample_network(),
            processes: self.sample_processes(),
            timestamp,
        }
    }

    fn sample_network(&mut self) -> Vec<NetworkStat> {
        let now = Instant::now();
        let elapsed = self
            .last_net_at
            .map(|at| now.duration_since(at).as_secs_f64())
            .unwrap_or(0.0);

        let networks = Networks::new_with_refreshed_list();
        let mut stats: Vec<NetworkStat> = networks
            .list()
            .iter()
            .filter(|(name, _)| !is_loopback(name))
            .map(|(name, data)| {
                let rx = data.total_received();
                let tx = data.total_transmitted();
                let (rx_sec, tx_sec) = match self.last_net.get(name) {
                    Some(prev) => (
                        per_second(prev.rx, rx, elapsed),
                        per_second(prev.tx, tx, elapsed),
                    ),
                    None => (0.0, 0.0),
                };
                NetworkStat {
                    interface: name.clone(),
                    rx_bytes: rx,
                    tx_bytes: tx,
                    rx_sec,
                    tx_sec,
                    rx_errors: data.total_errors_on_received(),
                    tx_errors: data.total_errors_on_transmitted(),
                }
            })
            .collect();
        stats.sort_by(|a, b| a.interface.cmp(&b.interface));

        self.last_net = stats
            .iter()
            .map(|s| {
                (
                    s.interface.clone(),
                    NetCounters {
                        rx: s.rx_bytes,
                        tx: s.tx_bytes,
                    },
                )
            })
            .collect();
        self.last_net_at = Some(now);
        stats
    }

    fn sample_processes(&self) -> ProcessSummary {
        let mut summary = ProcessSummary::default();
        let mut list: Vec<ProcessEntry> = Vec::with_capacity(self.sys.processes().len());

        for (pid, process) in self.sys.processes() {
            summary.all += 1;
            match bucket_of(process.status()) {
                ProcessBucket::Running => summary.running += 1,
                ProcessBucket::Sleeping => summary.sleeping += 1,
                ProcessBucket::Blocked => summary.blocked += 1,
                ProcessBucket::Unknown => summary.unknown += 1,
            }
            list.push(ProcessEntry {
                pid: pid.as_u32(),
                ppid: process.parent().map(|p| p.as_u32()),
                name: process.name().to_string_lossy().into_owned(),
                command: process
                    .cmd()
                    .iter()
                    .map(|arg| arg.to_string_lossy())
                    .collect::<Vec<_>>()
                    .join(" "),
                cpu: f64::from(process.cpu_usage()),
                mem: process.memory(),
                state: process.status().to_string(),
            });
        }

        list.sort_by(|a, b| b.cpu.total_cmp(&a.cpu));
        list.truncate(self.process_limit);
        summary.list = list;
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn usage_pct_handles_zero_total() {
        assert_eq!(usage_pct(5, 0), 0.0);
        assert_eq!(usage_pct(25, 100), 25.0);
    }

    #[test]
    fn per_second_tolerates_counter_reset() {
        assert_eq!(per_second(1000, 3000, 2.0), 1000.0);
        assert_eq!(per_second(3000, 10, 2.0), 0.0);
        assert_eq!(per_second(0, 10, 0.0), 0.0);
    }

    #[test]
    fn process_states_fold_into_buckets() {
        assert_eq!(bucket_of(ProcessStatus::Run), ProcessBucket::Running);
        assert_eq!(bucket_of(ProcessStatus::Idle), ProcessBucket::Sleeping);
        assert_eq!(
            bucket_of(ProcessStatus::UninterruptibleDiskSleep),
            ProcessBucket::Blocked
        );
        assert_eq!(bucket_of(ProcessStatus::Zombie), ProcessBucket::Unknown);
    }

    #[test]
    fn loopback_is_filtered() {
        assert!(is_loopback("lo"));
        assert!(!is_loopback("eth0"));
    }

    #[test]
    fn system_info_passes_through_optional_os_fields() {
        let info = Collector::new(5).system_info();
        assert_eq!(info.os.arch, std::env::consts::ARCH);
        assert_eq!(info.os.name, System::name());
        assert_eq!(info.os.version, System::os_version());
    }

    #[test]
    fn sample_is_finite_and_bounded() {
        let mut collector = Collector::new(5);
        let snapshot = collector.sample();
        assert!(snapshot.cpu.usage.is_finite());
        assert!(snapshot.processes.list.len() <= 5);
        assert!(snapshot.network.iter().all(|n| n.rx_sec == 0.0));
        assert!(snapshot.memory.usage >= 0.0 && snapshot.memory.usage <= 100.0);
    }
}
