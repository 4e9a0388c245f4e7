use crate::ParseError;
use aquapanel_schema::PerformanceSnapshot;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// Metrics a rule can watch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    CpuUsage,
    MemoryUsage,
    DiskUsage,
    NetworkIn,
    NetworkOut,
    LoadAverage,
    SwapUsage,
    ProcessCount,
}

impl Metric {
    pub const ALL: [Metric; 8] = [
        Metric::CpuUsage,
        Metric::MemoryUsage,
        Metric::DiskUsage,
        Metric::NetworkIn,
        Metric::NetworkOut,
        Metric::LoadAverage,
        Metric::SwapUsage,
        Metric::ProcessCount,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Metric::CpuUsage => "cpu_usage",
            Metric::MemoryUsage => "memory_usage",
            Metric::DiskUsage => "disk_usage",
            Metric::NetworkIn => "network_in",
            Metric::NetworkOut => "network_out",
            Metric::LoadAverage => "load_average",
            Metric::SwapUsage => "swap_usage",
            Metric::ProcessCount => "process_count",
        }
    }

    /// Percent-valued metrics get a `%` suffix in messages.
    pub fn is_percentage(&self) -> bool {
        matches!(
            self,
            Metric::CpuUsage | Metric::MemoryUsage | Metric::DiskUsage | Metric::SwapUsage
        )
    }

    /// Reads this metric from a snapshot.
    ///
    /// Network metrics use the first reported interface; `None` means the snapshot carries no
    /// such data (no interfaces, no cores), which never triggers a rule.
    pub fn extract(&self, snapshot: &PerformanceSnapshot) -> Option<f64> {
        match self {
            Metric::CpuUsage => Some(snapshot.cpu.usage),
            Metric::MemoryUsage => Some(snapshot.memory.usage),
            Metric::DiskUsage => Some(snapshot.disk.usage),
            Metric::NetworkIn => snapshot.network.first().map(|n| n.rx_sec),
            Metric::NetworkOut => snapshot.network.first().map(|n| n.tx_sec),
            Metric::LoadAverage => {
                let cores = &snapshot.cpu.cores;
                if cores.is_empty() {
                    return None;
                }
                Some(cores.iter().map(|c| c.load).sum::<f64>() / cores.len() as f64)
            }
            Metric::SwapUsage => {
                let swap = snapshot.memory.swap;
                if swap.total == 0 {
                    Some(0.0)
                } else {
                    Some(swap.used as f64 / swap.total as f64 * 100.0)
                }
            }
            Metric::ProcessCount => Some(snapshot.processes.all as f64),
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Metric {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Metric::ALL
            .into_iter()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| ParseError {
                field: "metric",
                value: s.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aquapanel_schema::{CoreLoad, NetworkStat, SwapUsage};
    use chrono::Utc;

    fn snapshot() -> PerformanceSnapshot {
        let mut s = PerformanceSnapshot::empty(Utc::now());
        s.cpu.usage = 42.5;
        s.cpu.cores = vec![
            CoreLoad {
                name: "cpu0".into(),
                load: 10.0,
            },
            CoreLoad {
                name: "cpu1".into(),
                load: 30.0,
            },
        ];
        s.memory.swap = SwapUsage {
            total: 200,
            used: 50,
            free: 150,
        };
        s.network = vec![NetworkStat {
            interface: "eth0".into(),
            rx_sec: 1024.0,
            tx_sec: 512.0,
            ..Default::default()
        }];
        s.processes.all = 321;
        s
    }

    #[test]
    fn extracts_derived_metrics() {
        let s = snapshot();
        assert_eq!(Metric::CpuUsage.extract(&s), Some(42.5));
        assert_eq!(Metric::LoadAverage.extract(&s), Some(20.0));
        assert_eq!(Metric::SwapUsage.extract(&s), Some(25.0));
        assert_eq!(Metric::NetworkIn.extract(&s), Some(1024.0));
        assert_eq!(Metric::NetworkOut.extract(&s), Some(512.0));
        assert_eq!(Metric::ProcessCount.extract(&s), Some(321.0));
    }

    #[test]
    fn missing_sources_yield_none_but_zero_is_a_value() {
        let s = PerformanceSnapshot::empty(Utc::now());
        assert_eq!(Metric::NetworkIn.extract(&s), None);
        assert_eq!(Metric::LoadAverage.extract(&s), None);
        assert_eq!(Metric::SwapUsage.extract(&s), Some(0.0));
        assert_eq!(Metric::CpuUsage.extract(&s), Some(0.0));
    }

    #[test]
    fn round_trips_names() {
        for m in Metric::ALL {
            assert_eq!(m.as_str().parse::<Metric>(), Ok(m));
        }
        assert!("gpu_usage".parse::<Metric>().is_err());
    }
}
