pub mod check;
pub mod config;
pub mod engine;
pub mod fingerprint;
pub mod fusion;
pub mod schema;
pub mod spatial;
pub mod stats;
pub mod uncertainty;

pub use config::FusionConfig;
pub use engine::{FusionEngine, FusionError};
pub use schema::{AnalysisRequest, DetectorObservation, FusionReport};
