//! Sequencer engine: gate composed resource creation on the readiness of the
//! resources that come before them, and emit Usages so deletion runs in the
//! reverse order.

#![forbid(unsafe_code)]

pub mod evaluate;
pub mod function;
pub mod pattern;

pub use evaluate::{deferral_message, evaluate, usage_key, Evaluation};
pub use function::{run_function, Function};
pub use pattern::{compile_rules, CompiledRule, StrictPattern};
