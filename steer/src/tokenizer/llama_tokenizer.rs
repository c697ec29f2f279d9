//! Llama tokenizer using the `tokenizers` crate

use std::path::Path;
use tokenizers::decoders::DecoderWrapper;
use tokenizers::pre_tokenizers::PreTokenizerWrapper;
use tokenizers::Tokenizer;

use crate::{Error, Result};

/// SentencePiece word-boundary marker.
const WORD_MARKER: char = '\u{2581}';

/// Wrapper around the `tokenizers` crate for Llama models
///
/// Handles both SentencePiece vocabularies (Llama 2, CodeLlama) and
/// byte-level BPE ones (Llama 3).
pub struct LlamaTokenizer {
    tokenizer: Tokenizer,
    bos_token_id: u32,
    eos_token_id: u32,
    byte_level: bool,
}

impl LlamaTokenizer {
    /// Load a tokenizer from a directory containing tokenizer.json
    ///
    /// # Errors
    /// Returns an error if the tokenizer cannot be loaded
    pub fn from_pretrained(model_path: impl AsRef<Path>) -> Result<Self> {
        let model_path = model_path.as_ref();

        let tokenizer_path = model_path.join("tokenizer.json");
        if !tokenizer_path.exists() {
            return Err(Error::Tokenizer(format!(
                "No tokenizer.json found in {}",
                model_path.display()
            )));
        }
        let tokenizer =
            Tokenizer::from_file(&tokenizer_path).map_err(|e| Error::Tokenizer(e.to_string()))?;
        Ok(Self::from_tokenizer(tokenizer))
    }

    /// Load a tokenizer from the contents of a tokenizer.json
    ///
    /// # Errors
    /// Returns an error if the JSON does not describe a tokenizer
    pub fn from_json(json: &str) -> Result<Self> {
        let tokenizer = json
            .parse::<Tokenizer>()
            .map_err(|e| Error::Tokenizer(e.to_string()))?;
        Ok(Self::from_tokenizer(tokenizer))
    }

    fn from_tokenizer(tokenizer: Tokenizer) -> Self {
        let byte_level = matches!(tokenizer.get_decoder(), Some(DecoderWrapper::ByteLevel(_)))
            || matches!(
                tokenizer.get_pre_tokenizer(),
                Some(PreTokenizerWrapper::ByteLevel(_))
            );

        // Llama 2 / CodeLlama ids are the fallback
        let bos_token_id = tokenizer
            .token_to_id("<s>")
            .or_else(|| tokenizer.token_to_id("<|begin_of_text|>"))
            .unwrap_or(1);

        let eos_token_id = tokenizer
            .token_to_id("</s>")
            .or_else(|| tokenizer.token_to_id("<|end_of_text|>"))
            .or_else(|| tokenizer.token_to_id("<|eot_id|>"))
            .unwrap_or(2);

        Self {
            tokenizer,
            bos_token_id,
            eos_token_id,
            byte_level,
        }
    }

    fn piece_bytes(&self, piece: &str, bytes: &mut Vec<u8>) {
        if self.byte_level {
            for c in piece.chars() {
                match byte_level_byte(c) {
                    Some(byte) => bytes.push(byte),
                    None => {
                        let mut buf = [0; 4];
                        bytes.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
                    }
                }
            }
        } else {
            match byte_fallback(piece) {
                Some(byte) => bytes.push(byte),
                None => bytes.extend_from_slice(piece.replace(WORD_MARKER, " ").as_bytes()),
            }
        }
    }
}

impl super::Tokenizer for LlamaTokenizer {
    fn encode(&self, text: &str, add_bos: bool) -> Result<Vec<u32>> {
        let encoding = self
            .tokenizer
            .encode(text, false)
            .map_err(|e| Error::Tokenizer(e.to_string()))?;

        let mut ids: Vec<u32> = encoding.get_ids().to_vec();

        if add_bos {
            ids.insert(0, self.bos_token_id);
        }

        Ok(ids)
    }

    /// Reassemble the raw bytes behind each piece.
    ///
    /// For SentencePiece vocabularies `<0xNN>` byte-fallback pieces
    /// contribute a single byte and the `▁` marker becomes a space. For
    /// byte-level vocabularies every character of a piece maps back to one
    /// byte. BOS/EOS contribute nothing.
    fn decode_bytes(&self, ids: &[u32]) -> Result<Vec<u8>> {
        let mut bytes = Vec::new();
        for &id in ids {
            if id == self.bos_token_id || id == self.eos_token_id {
                continue;
            }
            let piece = self
                .tokenizer
                .id_to_token(id)
                .ok_or_else(|| Error::Tokenizer(format!("Unknown token id {id}")))?;
            self.piece_bytes(&piece, &mut bytes);
        }
        Ok(bytes)
    }

    fn bos_token_id(&self) -> u32 {
        self.bos_token_id
    }

    fn eos_token_id(&self) -> u32 {
        self.eos_token_id
    }

    fn vocab_size(&self) -> usize {
        self.tokenizer.get_vocab_size(true)
    }
}

/// Parse a `<0xNN>` byte-fallback piece.
fn byte_fallback(piece: &str) -> Option<u8> {
    let hex = piece.strip_prefix("<0x")?.strip_suffix('>')?;
    if hex.len() != 2 {
        return None;
    }
    u8::from_str_radix(hex, 16).ok()
}

/// Invert the GPT-2 byte-to-character table used by byte-level BPE.
///
/// Printable Latin-1 bytes stand for themselves; the remaining 68 bytes
/// are shifted, in ascending order, to `U+0100..=U+0143`.
fn byte_level_byte(c: char) -> Option<u8> {
    let code = u32::from(c);
    match code {
        0x21..=0x7E | 0xA1..=0xAC | 0xAE..=0xFF => u8::try_from(code).ok(),
        0x100..=0x143 => {
            let n = u8::try_from(code - 0x100).ok()?;
            Some(match n {
                0..=32 => n,
                33..=66 => 0x7F + (n - 33),
                _ => 0xAD,
            })
        }
        _ => None,
    }
}
