//! Belief tracking over the candidate set.
//!
//! - `likelihood`: the fuzzy-answer likelihood with its floor and smoothing.
//! - `state`: the normalised distribution and its update rule.
//! - `telemetry`: summaries used by log events.

mod likelihood;
mod state;
pub mod telemetry;

pub use likelihood::LikelihoodModel;
pub(crate) use likelihood::parse_env_f64;
pub use state::{BeliefState, entropy_bits};
pub use telemetry::BeliefMetrics;
