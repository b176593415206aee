// core/src/lib.rs

//! Companion core: the pieces of the marketplace that do not touch I/O.
//!
//! - [`flow`] is a small async step-pipeline engine. Every multi-step business
//!   operation in the server (assigning a guide, settling a final payment,
//!   reviewing a guide application, ...) is declared as a `Pipeline` of named
//!   steps with `before`/`on`/`after` handlers over a shared `ContextData`.
//! - [`domain`] holds the booking rules: the single order state machine, deposit
//!   and final-payment math, the refund workflow, guide verification standing and
//!   balance ledger arithmetic.

pub mod domain;
pub mod error;
pub mod flow;

pub use crate::flow::context_data::ContextData;
pub use crate::flow::control::{PipelineControl, PipelineResult};
pub use crate::flow::handler::Handler;
pub use crate::flow::pipeline::Pipeline;
pub use crate::flow::registry::Registry;
pub use crate::flow::step::{SkipCondition, StepDef};

pub use crate::error::{FlowError, FlowResult, RuleError, RuleResult};
