pub mod checks;
pub mod evaluator;


pub use checks::{
    DatabaseLivenessCheck, LivenessCheck, ProbeReport, StaticLivenessCheck, UpstreamLivenessCheck,
};
pub use evaluator::{HealthEvaluator, HealthReport, LastCheck};
