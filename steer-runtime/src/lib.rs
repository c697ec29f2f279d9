//! Steer Runtime: constrained generation protocols
//!
//! This crate layers generation protocols on top of the core session types
//! in [`steer`].
//!
//! # Architecture
//!
//! ```text
//! process_function_call          ← select functions, then fill arguments
//!   └── generate_with_constraint ← retry full completions, raising temperature
//!         └── C: TextCompletion  ← LocalCompletion or a hosted provider
//!
//! constrained_decode             ← token-by-token filtering of a Generation
//! ```

mod completion;
mod decode;
mod function_call;
mod local;
mod retry;

pub use completion::{CompletionRequest, TextCompletion, DEFAULT_MODEL};
pub use decode::{constrained_decode, DecodeOptions};
pub use function_call::{
    arguments_messages, process_function_call, selection_messages, FunctionCallConfig,
    FunctionInvocation,
};
pub use local::LocalCompletion;
pub use retry::{generate_with_constraint, RetryPolicy};
