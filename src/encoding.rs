//! Text encodings for the text and line operations.
//!
//! Only the handful of encodings callers of the text APIs actually need are
//! supported. Encoding is strict: a character the target encoding cannot
//! represent is an `InvalidData` error rather than a replacement byte.

use std::fmt;
use std::io;
use std::str::FromStr;

use thiserror::Error;

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];
const UTF16LE_BOM: &[u8] = &[0xFF, 0xFE];
const UTF16BE_BOM: &[u8] = &[0xFE, 0xFF];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextEncoding {
    /// UTF-8 without a byte order mark.
    #[default]
    Utf8,
    /// UTF-8 preceded by a byte order mark.
    Utf8Bom,
    /// UTF-16 little endian, with byte order mark.
    Utf16Le,
    /// UTF-16 big endian, with byte order mark.
    Utf16Be,
    /// ISO-8859-1.
    Latin1,
    /// 7-bit US-ASCII.
    Ascii,
}

#[derive(Debug, Error)]
#[error("unknown text encoding '{0}'")]
pub struct ParseEncodingError(String);

impl TextEncoding {
    /// Byte order mark written at the start of a file in this encoding.
    pub fn preamble(self) -> &'static [u8] {
        match self {
            TextEncoding::Utf8Bom => UTF8_BOM,
            TextEncoding::Utf16Le => UTF16LE_BOM,
            TextEncoding::Utf16Be => UTF16BE_BOM,
            TextEncoding::Utf8 | TextEncoding::Latin1 | TextEncoding::Ascii => &[],
        }
    }

    /// Guess the encoding of `bytes` from its byte order mark, UTF-8 otherwise.
    pub fn detect(bytes: &[u8]) -> Self {
        if bytes.starts_with(UTF8_BOM) {
            TextEncoding::Utf8Bom
        } else if bytes.starts_with(UTF16LE_BOM) {
            TextEncoding::Utf16Le
        } else if bytes.starts_with(UTF16BE_BOM) {
            TextEncoding::Utf16Be
        } else {
            TextEncoding::Utf8
        }
    }

    /// Encode `text` without a preamble.
    pub fn encode(self, text: &str) -> io::Result<Vec<u8>> {
        match self {
            TextEncoding::Utf8 | TextEncoding::Utf8Bom => Ok(text.as_bytes().to_vec()),
            TextEncoding::Utf16Le => Ok(text.encode_utf16().flat_map(u16::to_le_bytes).collect()),
            TextEncoding::Utf16Be => Ok(text.encode_utf16().flat_map(u16::to_be_bytes).collect()),
            TextEncoding::Latin1 => self.narrow(text, 0xFF),
            TextEncoding::Ascii => self.narrow(text, 0x7F),
        }
    }

    /// Encode `text` with the preamble in front.
    pub fn encode_with_preamble(self, text: &str) -> io::Result<Vec<u8>> {
        let mut out = self.preamble().to_vec();
        out.extend(self.encode(text)?);
        Ok(out)
    }

    fn narrow(self, text: &str, max: u32) -> io::Result<Vec<u8>> {
        text.chars()
            .map(|c| match u32::from(c) {
                // Both limits fit in a byte.
                code if code <= max => Ok(code as u8),
                _ => Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("character {c:?} cannot be encoded as {self}"),
                )),
            })
            .collect()
    }

    /// Decode `bytes`, skipping a leading byte order mark that matches this
    /// encoding (any UTF-8 mark for the UTF-8 variants).
    pub fn decode(self, bytes: &[u8]) -> io::Result<String> {
        let body = match self {
            TextEncoding::Utf8 | TextEncoding::Utf8Bom => bytes.strip_prefix(UTF8_BOM),
            _ => bytes.strip_prefix(self.preamble()),
        }
        .unwrap_or(bytes);

        match self {
            TextEncoding::Utf8 | TextEncoding::Utf8Bom => {
                String::from_utf8(body.to_vec()).map_err(|e| invalid(self, e))
            }
            TextEncoding::Utf16Le => {
                decode_utf16(body, u16::from_le_bytes).map_err(|e| invalid(self, e))
            }
            TextEncoding::Utf16Be => {
                decode_utf16(body, u16::from_be_bytes).map_err(|e| invalid(self, e))
            }
            TextEncoding::Latin1 => Ok(body.iter().map(|&b| char::from(b)).collect()),
            TextEncoding::Ascii => match body.iter().position(|b| !b.is_ascii()) {
                Some(at) => Err(invalid(self, format!("non-ASCII byte at offset {at}"))),
                None => Ok(body.iter().map(|&b| char::from(b)).collect()),
            },
        }
    }
}

fn decode_utf16(body: &[u8], unit: fn([u8; 2]) -> u16) -> Result<String, String> {
    if body.len() % 2 != 0 {
        return Err("odd number of bytes".to_string());
    }
    let units: Vec<u16> = body.chunks_exact(2).map(|c| unit([c[0], c[1]])).collect();
    String::from_utf16(&units).map_err(|e| e.to_string())
}

fn invalid(encoding: TextEncoding, detail: impl fmt::Display) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, format!("invalid {encoding} data: {detail}"))
}

impl fmt::Display for TextEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TextEncoding::Utf8 => "utf-8",
            TextEncoding::Utf8Bom => "utf-8-bom",
            TextEncoding::Utf16Le => "utf-16le",
            TextEncoding::Utf16Be => "utf-16be",
            TextEncoding::Latin1 => "latin1",
            TextEncoding::Ascii => "ascii",
        };
        f.write_str(name)
    }
}

impl FromStr for TextEncoding {
    type Err = ParseEncodingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key: String = s
            .chars()
            .filter(|c| !matches!(c, '-' | '_' | ' '))
            .flat_map(char::to_lowercase)
            .collect();
        match key.as_str() {
            "utf8" => Ok(TextEncoding::Utf8),
            "utf8bom" => Ok(TextEncoding::Utf8Bom),
            "utf16" | "utf16le" | "unicode" => Ok(TextEncoding::Utf16Le),
            "utf16be" | "bigendianunicode" => Ok(TextEncoding::Utf16Be),
            "latin1" | "iso88591" => Ok(TextEncoding::Latin1),
            "ascii" | "usascii" => Ok(TextEncoding::Ascii),
            _ => Err(ParseEncodingError(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn utf16_round_trips_non_ascii() {
        let text = "grüße, 世界";
        for enc in [TextEncoding::Utf16Le, TextEncoding::Utf16Be] {
            let bytes = enc.encode_with_preamble(text).unwrap();
            assert_eq!(TextEncoding::detect(&bytes), enc);
            assert_eq!(enc.decode(&bytes).unwrap(), text);
        }
    }

    #[test]
    fn ascii_rejects_non_ascii() {
        let err = TextEncoding::Ascii.encode("café").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
        assert!(TextEncoding::Ascii.decode(&[b'a', 0xE9]).is_err());
    }

    #[test]
    fn latin1_covers_the_first_256_code_points() {
        let bytes = TextEncoding::Latin1.encode("café").unwrap();
        assert_eq!(bytes, vec![b'c', b'a', b'f', 0xE9]);
        assert_eq!(TextEncoding::Latin1.decode(&bytes).unwrap(), "café");
        assert!(TextEncoding::Latin1.encode("€").is_err());
    }

    #[test]
    fn utf8_decoding_skips_a_bom() {
        assert_eq!(TextEncoding::Utf8.decode(b"\xEF\xBB\xBFhi").unwrap(), "hi");
        assert!(TextEncoding::Utf8.decode(&[0xFF]).is_err());
    }

    #[test]
    fn parses_common_spellings() {
        assert_eq!("UTF-8".parse::<TextEncoding>().unwrap(), TextEncoding::Utf8);
        assert_eq!("utf_16_le".parse::<TextEncoding>().unwrap(), TextEncoding::Utf16Le);
        assert_eq!("ISO-8859-1".parse::<TextEncoding>().unwrap(), TextEncoding::Latin1);
        assert!("ebcdic".parse::<TextEncoding>().is_err());
        for enc in [TextEncoding::Utf8Bom, TextEncoding::Utf16Be, TextEncoding::Ascii] {
            assert_eq!(enc.to_string().parse::<TextEncoding>().unwrap(), enc);
        }
    }
}
