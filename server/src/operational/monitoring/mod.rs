// tag_arena/server/src/operational/monitoring/mod.rs
pub mod metrics;

pub use self::metrics::{init_logging, MetricsSystem};
