//! Network Analyzer Module
//!
//! The measurement engine:
//! - Latency probe (single HEAD round trip)
//! - Download/upload throughput probes (time-boxed streaming)
//! - Measurement sessions chaining the probes in order

pub mod client;
pub mod session;
pub mod types;

pub use client::build_client;
pub use latency_test::measure_latency;
pub use session::{MeasurementSession, ProbeRunner, SessionEvent, SessionHandle};
pub use throughput_test::{
    format_speed, measure_download, measure_throughput, measure_upload, Direction, ThroughputParams,
};
pub use types::*;
