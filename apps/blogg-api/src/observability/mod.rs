//! Observability - error alerting on top of tracing.

mod alert;

pub use alert::AlertLayer;
