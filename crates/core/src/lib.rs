pub mod anomaly;
pub mod config;
pub mod error;
pub mod series;

pub use anomaly::*;
pub use config::{DetectorConfig, NormalizerConfig};
pub use error::*;
pub use series::*;
