//! Tokenizer integration
//!
//! Defines the [`Tokenizer`] trait and concrete implementations.

mod byte_tokenizer;
mod llama_tokenizer;

use crate::{Error, Result};

pub use byte_tokenizer::ByteTokenizer;
pub use llama_tokenizer::LlamaTokenizer;

/// Trait for tokenizers that convert between text and token IDs.
///
/// [`CachedModel`](crate::CachedModel) pairs one of these with a forward
/// backend to form a complete runtime adapter.
pub trait Tokenizer {
    /// Encode text to token IDs.
    ///
    /// # Arguments
    /// * `text` - The text to encode
    /// * `add_bos` - Whether to prepend the beginning-of-sequence token
    ///
    /// # Errors
    /// Returns an error if encoding fails.
    fn encode(&self, text: &str, add_bos: bool) -> Result<Vec<u32>>;

    /// Decode token IDs to the exact bytes they stand for.
    ///
    /// Unlike [`Tokenizer::decode`], a sequence that ends in the middle of
    /// a multi-byte character is returned as-is rather than patched with
    /// replacement characters.
    ///
    /// # Errors
    /// Returns an error if an ID is outside the vocabulary.
    fn decode_bytes(&self, ids: &[u32]) -> Result<Vec<u8>>;

    /// Decode token IDs to text.
    ///
    /// # Errors
    /// Returns [`Error::Decode`] if the bytes are not valid UTF-8.
    fn decode(&self, ids: &[u32]) -> Result<String> {
        let bytes = self.decode_bytes(ids)?;
        String::from_utf8(bytes).map_err(|e| Error::Decode(e.to_string()))
    }

    /// Get the beginning-of-sequence token ID.
    fn bos_token_id(&self) -> u32;

    /// Get the end-of-sequence token ID.
    fn eos_token_id(&self) -> u32;

    /// Number of token IDs the tokenizer can produce.
    fn vocab_size(&self) -> usize;
}
