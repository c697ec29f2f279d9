//! Incremental generation session.
//!
//! A [`Generation`] owns the "text so far" for one runtime. Each step is an
//! explicit two-phase exchange: the caller inspects [`Generation::candidates`]
//! (and may [`Generation::preview`] any of them), then commits one with
//! [`Generation::register`], which evaluates exactly that token.
//!
//! ```text
//! start(prefix) ──► AwaitingSelection ──register(t)──► AwaitingSelection ──► …
//!                          │
//!                 eval failure ──► Poisoned
//! ```

use crate::logits::{rank, RankedTokens};
use crate::model::Model;
use crate::prefix;
use crate::prompter::{tokenize_prefix, PrefixItem};
use crate::{Error, Result};

/// One generation sequence over a runtime.
///
/// Holds the runtime mutably for its whole life, so a runtime cannot be
/// driven by two sessions at once. Between calls the runtime's history is
/// exactly the session's token sequence.
pub struct Generation<'m, M: Model + ?Sized> {
    model: &'m mut M,
    tokens: Vec<u32>,
    prompt_len: usize,
    poisoned: bool,
}

impl<'m, M: Model + ?Sized> Generation<'m, M> {
    /// Start a generation from a mixed token/text prefix.
    ///
    /// Whatever the runtime already evaluated is reused as far as it
    /// matches the new prompt.
    ///
    /// # Errors
    /// Returns an error if tokenization or the first evaluation fails.
    pub fn start(model: &'m mut M, prefix: &[PrefixItem]) -> Result<Self> {
        let tokens = tokenize_prefix(&*model, prefix)?;
        Self::from_tokens(model, tokens)
    }

    /// Start a generation from an already tokenized prompt.
    ///
    /// # Errors
    /// Returns [`Error::InvalidPrompt`] for an empty prompt, or the
    /// runtime's evaluation error.
    pub fn from_tokens(model: &'m mut M, tokens: Vec<u32>) -> Result<Self> {
        prefix::evaluate(&mut *model, &tokens, false)?;
        Ok(Self {
            model,
            prompt_len: tokens.len(),
            tokens,
            poisoned: false,
        })
    }

    fn ensure_usable(&self) -> Result<()> {
        if self.poisoned {
            Err(Error::SessionPoisoned)
        } else {
            Ok(())
        }
    }

    /// Tokens of the current step, best first, skipping undecodable ones.
    ///
    /// A candidate is skipped when the generated text plus that token does
    /// not decode to valid UTF-8 or decodes to nothing at all. Tokens that
    /// stand for no bytes (BOS and other specials) are skipped too, except
    /// EOS once there is generated text. Calling
    /// this repeatedly without [`Generation::register`] yields the same
    /// stream.
    ///
    /// # Errors
    /// Returns [`Error::SessionPoisoned`] after a failed evaluation.
    pub fn candidates(&self) -> Result<Candidates<'_, M>> {
        self.ensure_usable()?;
        Ok(Candidates {
            ranked: rank(self.model.logits()),
            model: &*self.model,
            eos: self.model.eos_token_id(),
            scratch: self.generated().to_vec(),
        })
    }

    /// Commit `token` as the next generated token and evaluate it.
    ///
    /// # Errors
    /// Returns the runtime's evaluation error; the session is then
    /// poisoned and every later call fails with [`Error::SessionPoisoned`].
    pub fn register(&mut self, token: u32) -> Result<()> {
        self.ensure_usable()?;
        self.tokens.push(token);
        if let Err(e) = prefix::evaluate(&mut *self.model, &self.tokens, false) {
            self.poisoned = true;
            return Err(e);
        }
        Ok(())
    }

    /// The generated text so far (prompt excluded).
    ///
    /// # Errors
    /// Returns [`Error::Decode`] if the generated tokens end inside a
    /// multi-byte character.
    pub fn text(&self) -> Result<String> {
        self.ensure_usable()?;
        decode(&*self.model, self.generated())
    }

    /// The generated text up to its last complete character.
    ///
    /// Bytes from the first one that does not yet form a valid character
    /// are left out, so a budget that runs out mid-character still yields
    /// text.
    ///
    /// # Errors
    /// Returns [`Error::SessionPoisoned`] after a failed evaluation, or the
    /// tokenizer's error for an unknown token.
    pub fn settled_text(&self) -> Result<String> {
        self.ensure_usable()?;
        let mut bytes = self.model.detokenize(self.generated())?;
        let valid = std::str::from_utf8(&bytes).map_or_else(|e| e.valid_up_to(), str::len);
        bytes.truncate(valid);
        String::from_utf8(bytes).map_err(|e| Error::Decode(e.to_string()))
    }

    /// The text that registering `candidate` would produce, without
    /// changing any state.
    ///
    /// # Errors
    /// Returns [`Error::Decode`] if that text is not valid UTF-8. This only
    /// rules out the candidate; the session is unaffected.
    pub fn preview(&self, candidate: u32) -> Result<String> {
        self.ensure_usable()?;
        let mut tokens = Vec::with_capacity(self.generated().len() + 1);
        tokens.extend_from_slice(self.generated());
        tokens.push(candidate);
        decode(&*self.model, &tokens)
    }

    /// Logits of the current step.
    ///
    /// # Errors
    /// Returns [`Error::SessionPoisoned`] after a failed evaluation.
    pub fn logits(&self) -> Result<&[f32]> {
        self.ensure_usable()?;
        Ok(self.model.logits())
    }

    /// Prompt tokens followed by generated tokens.
    #[must_use]
    pub fn tokens(&self) -> &[u32] {
        &self.tokens
    }

    #[must_use]
    pub fn prompt(&self) -> &[u32] {
        &self.tokens[..self.prompt_len]
    }

    #[must_use]
    pub fn generated(&self) -> &[u32] {
        &self.tokens[self.prompt_len..]
    }

    #[must_use]
    pub fn eos_token_id(&self) -> u32 {
        self.model.eos_token_id()
    }

    #[must_use]
    pub fn is_poisoned(&self) -> bool {
        self.poisoned
    }
}

fn decode<M: Model + ?Sized>(model: &M, tokens: &[u32]) -> Result<String> {
    let bytes = model.detokenize(tokens)?;
    String::from_utf8(bytes).map_err(|e| Error::Decode(e.to_string()))
}

/// Lazy candidate stream of one generation step.
///
/// Single-pass: call [`Generation::candidates`] again to restart.
pub struct Candidates<'g, M: Model + ?Sized> {
    ranked: RankedTokens,
    model: &'g M,
    eos: u32,
    scratch: Vec<u32>,
}

impl<M: Model + ?Sized> Candidates<'_, M> {
    fn renders(&mut self, id: u32) -> bool {
        if id != self.eos && !self.model.detokenize(&[id]).is_ok_and(|b| !b.is_empty()) {
            return false;
        }
        self.scratch.push(id);
        let ok = decode(self.model, &self.scratch).is_ok_and(|text| !text.is_empty());
        self.scratch.pop();
        ok
    }
}

impl<M: Model + ?Sized> Iterator for Candidates<'_, M> {
    type Item = u32;

    fn next(&mut self) -> Option<u32> {
        loop {
            let id = self.ranked.next()?;
            if self.renders(id) {
                return Some(id);
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, self.ranked.size_hint().1)
    }
}
