// src/encoding.rs
// =============================================================================
// This module guesses the text encoding of a Markdown file and decodes it.
//
// Blog folders that have been through several CMS exports mix UTF-8 files
// with Windows-1252 / Latin-1 files. Reading them all as UTF-8 would either
// fail or garble accented characters, so every file goes through:
//
// 1. detect_encoding(): BOM sniffing, then a UTF-8 validity check, then the
//    `chardetng` statistical guess
// 2. DecodedDocument::from_bytes(): decode with that guess via `encoding_rs`,
//    falling back to lossy UTF-8 if the guess still produces errors
// 3. DecodedDocument::encode(): turn edited text back into bytes, in the
//    original encoding when that is safe
//
// Nothing in here returns an error: undecodable bytes become U+FFFD.
// =============================================================================

use chardetng::EncodingDetector;
use encoding_rs::{Encoding, UTF_16BE, UTF_16LE, UTF_8};

/// Returns the best-guess encoding for `bytes`, or None for empty input.
pub fn detect_encoding(bytes: &[u8]) -> Option<&'static Encoding> {
    if bytes.is_empty() {
        return None;
    }

    if let Some((encoding, _bom_length)) = Encoding::for_bom(bytes) {
        return Some(encoding);
    }

    if std::str::from_utf8(bytes).is_ok() {
        return Some(UTF_8);
    }

    let mut detector = EncodingDetector::new();
    detector.feed(bytes, true);
    Some(detector.guess(None, true))
}

/// A file's text held in memory for the duration of one file's processing.
#[derive(Debug, Clone)]
pub struct DecodedDocument {
    pub text: String,
    /// The encoding the text was actually decoded with
    pub encoding: &'static Encoding,
    /// True when some bytes were replaced by U+FFFD
    pub lossy: bool,
}

impl DecodedDocument {
    pub fn from_bytes(bytes: &[u8]) -> Self {
        let detected = detect_encoding(bytes).unwrap_or(UTF_8);
        let (text, actual, had_errors) = detected.decode(bytes);

        if had_errors && actual != UTF_8 {
            // The guess was wrong; lossy UTF-8 keeps at least the ASCII intact
            let (text, _) = UTF_8.decode_with_bom_removal(bytes);
            return Self {
                text: text.into_owned(),
                encoding: UTF_8,
                lossy: true,
            };
        }

        Self {
            text: text.into_owned(),
            encoding: actual,
            lossy: had_errors,
        }
    }

    /// Encodes `text` for writing back over this document.
    ///
    /// Uses the original encoding when the original decode was clean and every
    /// character of `text` is representable in it; otherwise UTF-8.
    ///
    /// encoding_rs has no UTF-16 encoder (its `output_encoding` for UTF-16 is
    /// UTF-8), so UTF-16 is written here by hand, BOM first. A UTF-16 file is
    /// only ever detected by its BOM, and decoding strips it.
    pub fn encode(&self, text: &str) -> Vec<u8> {
        if self.lossy || self.encoding == UTF_8 {
            return text.as_bytes().to_vec();
        }
        if self.encoding == UTF_16LE || self.encoding == UTF_16BE {
            return encode_utf16(text, self.encoding == UTF_16BE);
        }

        let (bytes, _used, unmappable) = self.encoding.encode(text);
        if unmappable {
            text.as_bytes().to_vec()
        } else {
            bytes.into_owned()
        }
    }
}

fn encode_utf16(text: &str, big_endian: bool) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(2 + text.len() * 2);
    for unit in std::iter::once(0xFEFF).chain(text.encode_utf16()) {
        let pair = if big_endian { unit.to_be_bytes() } else { unit.to_le_bytes() };
        bytes.extend_from_slice(&pair);
    }
    bytes
}
