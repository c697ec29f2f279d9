//! Byte-level tokenizer.
//!
//! Every byte is its own token:
//! - Bytes 0x00..=0xFF occupy IDs 0..=255
//! - BOS is 256, EOS is 257

use crate::{Error, Result};

pub const BOS_ID: u32 = 256;
pub const EOS_ID: u32 = 257;

/// Total vocabulary size: 256 bytes + BOS + EOS.
pub const VOCAB_SIZE: u32 = 258;

/// Tokenizer whose vocabulary is the 256 byte values.
///
/// Stateless: the mapping is fixed. Multi-byte characters span several
/// tokens, so prefixes of a sequence can end inside a character.
#[derive(Debug, Default, Clone, Copy)]
pub struct ByteTokenizer;

impl ByteTokenizer {
    pub const BOS: u32 = BOS_ID;
    pub const EOS: u32 = EOS_ID;

    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl super::Tokenizer for ByteTokenizer {
    fn encode(&self, text: &str, add_bos: bool) -> Result<Vec<u32>> {
        let mut ids = Vec::with_capacity(text.len() + usize::from(add_bos));
        if add_bos {
            ids.push(BOS_ID);
        }
        ids.extend(text.bytes().map(u32::from));
        Ok(ids)
    }

    fn decode_bytes(&self, ids: &[u32]) -> Result<Vec<u8>> {
        ids.iter()
            .filter(|&&id| id != BOS_ID && id != EOS_ID)
            .map(|&id| {
                u8::try_from(id).map_err(|_| Error::Tokenizer(format!("Unknown token id {id}")))
            })
            .collect()
    }

    fn bos_token_id(&self) -> u32 {
        BOS_ID
    }

    fn eos_token_id(&self) -> u32 {
        EOS_ID
    }

    fn vocab_size(&self) -> usize {
        VOCAB_SIZE as usize
    }
}
