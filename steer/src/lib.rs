//! Steer: constrained, incremental token generation
//!
//! This crate provides the core types and traits for steering a language
//! model one token at a time. The runtime itself (tokenizer plus forward
//! pass) is an external collaborator behind the [`Model`] trait; higher
//! level protocols live in `steer-runtime`.
//!
//! # Architecture
//!
//! ```text
//! Generation<'m, M>   ← text so far, candidate stream, register(token)
//!   ├── prefix        ← reuse of the runtime's evaluated history
//!   ├── logits::rank  ← lazy best-first token ordering
//!   └── M: Model      ← tokenize / detokenize / eval / logits
//! ```

pub mod chat_template;
pub mod constraint;
pub mod error;
pub mod function;
pub mod generation;
pub mod logits;
pub mod model;
pub mod prefix;
pub mod prompter;
pub mod sampling;
pub mod tokenizer;

pub use chat_template::{ChatMessage, ChatTemplate, FunctionCall, MessageBody, RawTemplate, Role};
pub use constraint::{
    Constraint, EnumConstraint, JsonSchemaConstraint, MultiEnumConstraint, Verdict, NO_FUNCTION,
};
pub use error::{Error, Result};
pub use function::FunctionSchema;
pub use generation::{Candidates, Generation};
pub use logits::{rank, RankedTokens};
pub use model::{CachedModel, Forward, Model};
pub use prefix::PrefixPlan;
pub use prompter::{PrefixItem, Prompt, Prompter};
pub use sampling::{GenerateOptions, SamplingParams};
pub use tokenizer::{ByteTokenizer, LlamaTokenizer, Tokenizer};
