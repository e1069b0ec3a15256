#![allow(clippy::too_many_arguments)]
#![allow(clippy::needless_range_loop)]

pub mod config;
pub mod error;
pub mod stats;

// Re-export commonly used types
pub use config::AnalysisConfig;
pub use error::{Error, Result};
pub use stats::{Degeneracy, MixedRecord, Outcome, VarianceKind};

// Export version info
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
