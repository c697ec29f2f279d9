//! Runtime adapter traits
//!
//! [`Model`] is the capability interface the generation core drives:
//! tokenization, detokenization, incremental evaluation and the logits of
//! the last evaluated position. [`CachedModel`] builds one out of any
//! [`Forward`] backend plus a [`Tokenizer`].

use crate::tokenizer::Tokenizer;
use crate::{Error, Result};

/// A stateful language-model runtime.
///
/// The runtime remembers the tokens it has evaluated so far (its
/// history). Evaluation appends to that history and replaces the current
/// logits with those predicted for the position after the last token.
///
/// Implementations are not reentrant: one runtime serves one
/// [`Generation`](crate::Generation) at a time.
pub trait Model {
    /// Encode text to token IDs.
    ///
    /// # Errors
    /// Returns an error if the tokenizer rejects the text.
    fn tokenize(&self, text: &str, add_bos: bool) -> Result<Vec<u32>>;

    /// Decode token IDs to raw bytes, which may end mid-character.
    ///
    /// # Errors
    /// Returns an error if an ID is outside the vocabulary.
    fn detokenize(&self, tokens: &[u32]) -> Result<Vec<u8>>;

    /// Evaluate `tokens` on top of the current history.
    ///
    /// # Errors
    /// Returns [`Error::Evaluation`] if the forward pass fails.
    fn eval(&mut self, tokens: &[u32]) -> Result<()>;

    /// Logits for the position after the last evaluated token.
    ///
    /// Empty until the first successful [`Model::eval`].
    fn logits(&self) -> &[f32];

    /// Tokens evaluated so far.
    fn history(&self) -> &[u32];

    /// Forget all evaluated state.
    fn reset(&mut self);

    /// Drop evaluated state after the first `len` tokens.
    ///
    /// Returns `false` if the runtime cannot roll back partially; the
    /// history is then left untouched and the caller must [`Model::reset`].
    fn rewind(&mut self, len: usize) -> bool {
        let _ = len;
        false
    }

    /// End-of-sequence token ID.
    fn eos_token_id(&self) -> u32;
}

impl<M: Model + ?Sized> Model for Box<M> {
    fn tokenize(&self, text: &str, add_bos: bool) -> Result<Vec<u32>> {
        (**self).tokenize(text, add_bos)
    }

    fn detokenize(&self, tokens: &[u32]) -> Result<Vec<u8>> {
        (**self).detokenize(tokens)
    }

    fn eval(&mut self, tokens: &[u32]) -> Result<()> {
        (**self).eval(tokens)
    }

    fn logits(&self) -> &[f32] {
        (**self).logits()
    }

    fn history(&self) -> &[u32] {
        (**self).history()
    }

    fn reset(&mut self) {
        (**self).reset();
    }

    fn rewind(&mut self, len: usize) -> bool {
        (**self).rewind(len)
    }

    fn eos_token_id(&self) -> u32 {
        (**self).eos_token_id()
    }
}

/// A forward pass with a resumable cache (e.g. a KV cache).
///
/// Backends process `tokens` as positions `position..position + tokens.len()`
/// and return the logits of the last one.
pub trait Forward {
    /// Vocabulary size (length of every returned logit vector).
    fn vocab_size(&self) -> usize;

    /// Run the forward pass over `tokens` starting at `position`.
    ///
    /// # Errors
    /// Returns an error if the forward pass fails.
    fn forward(&mut self, tokens: &[u32], position: usize) -> Result<Vec<f32>>;

    /// Discard all cached state.
    fn clear(&mut self);

    /// Keep cached state for the first `len` positions only.
    ///
    /// Returns `false` if the backend cannot truncate its cache.
    fn truncate(&mut self, len: usize) -> bool {
        let _ = len;
        false
    }
}

/// A [`Model`] composed of a [`Forward`] backend and a [`Tokenizer`].
///
/// Tracks the evaluated history so the backend only ever sees the tokens
/// it has not processed yet.
pub struct CachedModel<F: Forward, T: Tokenizer> {
    forward: F,
    tokenizer: T,
    history: Vec<u32>,
    logits: Vec<f32>,
}

impl<F: Forward, T: Tokenizer> CachedModel<F, T> {
    /// Create a runtime adapter with empty history.
    #[must_use]
    pub fn new(forward: F, tokenizer: T) -> Self {
        Self {
            forward,
            tokenizer,
            history: Vec::new(),
            logits: Vec::new(),
        }
    }

    /// Get a reference to the forward backend.
    #[must_use]
    pub fn backend(&self) -> &F {
        &self.forward
    }

    /// Get a mutable reference to the forward backend.
    ///
    /// Mutating backend state directly desynchronizes it from the
    /// tracked history; call [`Model::reset`] afterwards if in doubt.
    pub fn backend_mut(&mut self) -> &mut F {
        &mut self.forward
    }

    /// Get a reference to the tokenizer.
    #[must_use]
    pub fn tokenizer(&self) -> &T {
        &self.tokenizer
    }
}

impl<F: Forward, T: Tokenizer> Model for CachedModel<F, T> {
    fn tokenize(&self, text: &str, add_bos: bool) -> Result<Vec<u32>> {
        self.tokenizer.encode(text, add_bos)
    }

    fn detokenize(&self, tokens: &[u32]) -> Result<Vec<u8>> {
        self.tokenizer.decode_bytes(tokens)
    }

    fn eval(&mut self, tokens: &[u32]) -> Result<()> {
        if tokens.is_empty() {
            return Ok(());
        }
        let logits = self
            .forward
            .forward(tokens, self.history.len())
            .map_err(|e| match e {
                Error::Evaluation(_) => e,
                other => Error::Evaluation(other.to_string()),
            })?;
        if logits.len() != self.forward.vocab_size() {
            return Err(Error::Evaluation(format!(
                "Expected {} logits, got {}",
                self.forward.vocab_size(),
                logits.len()
            )));
        }
        self.history.extend_from_slice(tokens);
        self.logits = logits;
        Ok(())
    }

    fn logits(&self) -> &[f32] {
        &self.logits
    }

    fn history(&self) -> &[u32] {
        &self.history
    }

    fn reset(&mut self) {
        self.forward.clear();
        self.history.clear();
        self.logits.clear();
    }

    fn rewind(&mut self, len: usize) -> bool {
        if len >= self.history.len() {
            return true;
        }
        if !self.forward.truncate(len) {
            return false;
        }
        self.history.truncate(len);
        true
    }

    fn eos_token_id(&self) -> u32 {
        self.tokenizer.eos_token_id()
    }
}


#[cfg(test)]
mod tests {
    use super::testing::{byte_model, logits_for};
    use super::*;

    #[test]
    fn eval_appends_history_and_replaces_logits() {
        let mut model = byte_model();
        assert!(model.logits().is_empty());
        model.eval(&[1, 2, 3]).unwrap();
        model.eval(&[4]).unwrap();
        assert_eq!(model.history(), &[1, 2, 3, 4]);
        assert_eq!(model.logits(), logits_for(&[1, 2, 3, 4], 258).as_slice());
        assert_eq!(model.backend().calls, vec![vec![1, 2, 3], vec![4]]);
    }

    #[test]
    fn rewind_truncates_when_backend_supports_it() {
        let mut model = byte_model();
        model.eval(&[1, 2, 3]).unwrap();
        assert!(model.rewind(1));
        assert_eq!(model.history(), &[1]);
        assert_eq!(model.backend().cache, vec![1]);
    }

    #[test]
    fn rewind_refused_leaves_history() {
        let mut model = byte_model();
        model.forward.can_truncate = false;
        model.eval(&[1, 2, 3]).unwrap();
        assert!(!model.rewind(1));
        assert_eq!(model.history(), &[1, 2, 3]);
    }

    #[test]
    fn wrong_logit_length_is_an_evaluation_error() {
        let mut model = byte_model();
        model.forward.logits_len = Some(4);
        let err = model.eval(&[1]).unwrap_err();
        assert!(matches!(err, Error::Evaluation(_)));
        assert!(model.history().is_empty());
    }
}
