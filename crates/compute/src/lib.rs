pub mod algorithms;
pub mod engine;
pub mod loader;
pub mod pipeline;
pub mod window;

pub use engine::DisruptionEngine;
pub use loader::{build_loader, LoaderConfig, MetricLoader, StaticMetricLoader, StaticPayload};
pub use pipeline::{DisruptionDetector, SeriesScore};
pub use window::WindowContext;
