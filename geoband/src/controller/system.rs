//! System load sources.
//!
//! The controller asks a [`SystemMetricsSource`] for CPU and memory
//! utilization as fractions in [0, 1]. Either reading may be missing; a
//! missing reading is not an error.

use std::io;

use parking_lot::Mutex;
use thiserror::Error;

/// Errors from a metrics source.
#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("I/O error reading system metrics: {0}")]
    Io(#[from] io::Error),

    #[error("Malformed system metrics: {0}")]
    Parse(String),
}

/// One sample of system utilization.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SystemLoad {
    /// CPU utilization in [0, 1], if known.
    pub cpu: Option<f64>,
    /// Memory utilization in [0, 1], if known.
    pub memory: Option<f64>,
}

/// Provider of system utilization readings.
pub trait SystemMetricsSource: Send + Sync {
    fn sample(&self) -> Result<SystemLoad, MetricsError>;
}

/// Aggregate jiffies from the `cpu` line of `/proc/stat`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CpuTimes {
    pub busy: u64,
    pub total: u64,
}

/// Parse the aggregate `cpu` line of `/proc/stat`.
///
/// Format: `cpu  user nice system idle iowait irq softirq steal ...`.
/// Idle time is `idle + iowait`.
pub fn parse_cpu_times(stat: &str) -> Option<CpuTimes> {
    let line = stat.lines().find(|l| l.starts_with("cpu "))?;
    let fields: Vec<u64> = line
        .split_whitespace()
        .skip(1)
        .map(|f| f.parse::<u64>())
        .collect::<Result<_, _>>()
        .ok()?;
    if fields.len() < 4 {
        return None;
    }
    let total: u64 = fields.iter().take(8).sum();
    let idle = fields[3] + fields.get(4).copied().unwrap_or(0);
    Some(CpuTimes {
        busy: total.saturating_sub(idle),
        total,
    })
}

/// Memory utilization from `/proc/meminfo`: `1 - MemAvailable / MemTotal`.
pub fn parse_memory_utilization(meminfo: &str) -> Option<f64> {
    let mut total = None;
    let mut available = None;
    for line in meminfo.lines() {
        // Format: "MemTotal:       16384000 kB"
        let mut parts = line.split_whitespace();
        match (parts.next(), parts.next()) {
            (Some("MemTotal:"), Some(kb)) => total = kb.parse::<u64>().ok(),
            (Some("MemAvailable:"), Some(kb)) => available = kb.parse::<u64>().ok(),
            _ => {}
        }
    }
    match (total, available) {
        (Some(total), Some(available)) if total > 0 => {
            Some(1.0 - available.min(total) as f64 / total as f64)
        }
        _ => None,
    }
}

fn cpu_utilization(previous: Option<CpuTimes>, current: CpuTimes) -> Option<f64> {
    let (busy, total) = match previous {
        Some(prev) if current.total > prev.total => (
            current.busy.saturating_sub(prev.busy),
            current.total - prev.total,
        ),
        _ => (current.busy, current.total),
    };
    if total == 0 {
        None
    } else {
        Some((busy as f64 / total as f64).clamp(0.0, 1.0))
    }
}

/// Reads `/proc/stat` and `/proc/meminfo` on Linux.
///
/// CPU utilization is measured between consecutive samples; the first
/// sample measures since boot. Other platforms report nothing.
#[derive(Debug, Default)]
pub struct ProcMetricsSource {
    previous_cpu: Mutex<Option<CpuTimes>>,
}

impl ProcMetricsSource {
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(target_os = "linux")]
impl SystemMetricsSource for ProcMetricsSource {
    fn sample(&self) -> Result<SystemLoad, MetricsError> {
        let stat = std::fs::read_to_string("/proc/stat")?;
        let meminfo = std::fs::read_to_string("/proc/meminfo")?;

        let times = parse_cpu_times(&stat)
            .ok_or_else(|| MetricsError::Parse("no cpu line in /proc/stat".into()))?;
        let cpu = {
            let mut previous = self.previous_cpu.lock();
            let cpu = cpu_utilization(*previous, times);
            *previous = Some(times);
            cpu
        };

        Ok(SystemLoad {
            cpu,
            memory: parse_memory_utilization(&meminfo),
        })
    }
}

#[cfg(not(target_os = "linux"))]
impl SystemMetricsSource for ProcMetricsSource {
    fn sample(&self) -> Result<SystemLoad, MetricsError> {
        Ok(SystemLoad::default())
    }
}

/// A source that reports whatever it was last told to.
#[derive(Debug, Default)]
pub struct FixedMetricsSource {
    load: Mutex<SystemLoad>,
    failing: Mutex<bool>,
}

impl FixedMetricsSource {
    pub fn new(load: SystemLoad) -> Self {
        Self {
            load: Mutex::new(load),
            failing: Mutex::new(false),
        }
    }

    pub fn set(&self, load: SystemLoad) {
        *self.load.lock() = load;
    }

    /// Make every sample fail until cleared.
    pub fn set_failing(&self, failing: bool) {
        *self.failing.lock() = failing;
    }
}

impl SystemMetricsSource for FixedMetricsSource {
    fn sample(&self) -> Result<SystemLoad, MetricsError> {
        if *self.failing.lock() {
            return Err(MetricsError::Parse("metrics source offline".into()));
        }
        Ok(*self.load.lock())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const STAT: &str = "cpu  100 0 100 700 100 0 0 0 0 0\ncpu0 50 0 50 350 50 0 0 0 0 0\nintr 1\n";

    const MEMINFO: &str = "MemTotal:       16000000 kB\nMemFree:         1000000 kB\nMemAvailable:    4000000 kB\n";

    #[test]
    fn test_parse_cpu_times() {
        let times = parse_cpu_times(STAT).unwrap();
        assert_eq!(times.total, 1000);
        assert_eq!(times.busy, 200);
    }

    #[test]
    fn test_parse_cpu_times_rejects_garbage() {
        assert!(parse_cpu_times("intr 1\n").is_none());
        assert!(parse_cpu_times("cpu  a b c d\n").is_none());
    }

    #[test]
    fn test_cpu_utilization_uses_delta() {
        let prev = CpuTimes {
            busy: 200,
            total: 1000,
        };
        let cur = CpuTimes {
            busy: 290,
            total: 1100,
        };
        assert_eq!(cpu_utilization(Some(prev), cur), Some(0.9));
        assert_eq!(cpu_utilization(None, prev), Some(0.2));
        assert_eq!(cpu_utilization(None, CpuTimes { busy: 0, total: 0 }), None);
    }

    #[test]
    fn test_parse_memory_utilization() {
        assert_eq!(parse_memory_utilization(MEMINFO), Some(0.75));
        assert_eq!(parse_memory_utilization("MemTotal: 100 kB\n"), None);
    }

    #[test]
    fn test_fixed_source() {
        let source = FixedMetricsSource::new(SystemLoad {
            cpu: Some(0.5),
            memory: None,
        });
        assert_eq!(source.sample().unwrap().cpu, Some(0.5));

        source.set_failing(true);
        assert!(source.sample().is_err());
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_proc_source_reads_live_values() {
        let source = ProcMetricsSource::new();
        let load = source.sample().unwrap();
        if let Some(cpu) = load.cpu {
            assert!((0.0..=1.0).contains(&cpu));
        }
        if let Some(memory) = load.memory {
            assert!((0.0..=1.0).contains(&memory));
        }
    }
}
