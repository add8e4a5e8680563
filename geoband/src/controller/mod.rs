//! Adaptive threshold control loop.
//!
//! - [`system`]: CPU and memory utilization sources
//! - [`AdaptiveThresholdController`]: the periodic rule engine that mutates
//!   [`ThresholdState`](crate::threshold::ThresholdState)

mod adaptive;
pub mod system;

pub use adaptive::{
    AdaptiveThresholdController, AdjustmentReport, ControllerError, Rule,
    DEFAULT_CONTROLLER_INTERVAL,
};
pub use system::{
    FixedMetricsSource, MetricsError, ProcMetricsSource, SystemLoad, SystemMetricsSource,
};
