pub mod alert;
pub mod metrics;
pub mod ws;

pub use alert::AlertEvent;
pub use metrics::{
    CoreLoad, CpuInfo, CpuLoad, DiskInfo, DiskUsage, LoadAverage, MemoryInfo, MemoryUsage,
    NetworkInterfaceInfo, NetworkStat, OsInfo, PerformanceSnapshot, ProcessEntry, ProcessSummary,
    SwapUsage, SystemInfo,
};
pub use ws::{ClientMessage, ServerMessage};
