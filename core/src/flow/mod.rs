// core/src/flow/mod.rs

//! Async step pipelines over shared, lockable context data.

pub mod context_data;
pub mod control;
pub mod execution;
pub mod handler;
pub mod hooks;
pub mod pipeline;
pub mod registry;
pub mod step;
