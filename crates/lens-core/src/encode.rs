//! Transport encoding — binary audio to a text-safe base64 payload.

use std::path::Path;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("failed to read audio file: {0}")]
    Read(#[from] std::io::Error),
    #[error("failed to decode audio payload: {0}")]
    Decode(#[from] base64::DecodeError),
}

pub fn encode(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

pub fn decode(data: &str) -> Result<Vec<u8>, EncodeError> {
    Ok(STANDARD.decode(strip_data_url(data))?)
}

/// Strip a `data:<mime>;base64,` prefix if one is present; payloads from
/// other tooling sometimes arrive as full data URLs.
pub fn strip_data_url(data: &str) -> &str {
    match data.split_once(',') {
        Some((head, rest)) if head.starts_with("data:") && head.ends_with(";base64") => rest,
        _ => data,
    }
}

/// Read a file and encode it in one step. Read failures surface as
/// [`EncodeError::Read`] so the caller can report "encoding failed".
pub fn read_and_encode(path: &Path) -> Result<String, EncodeError> {
    Ok(encode(&std::fs::read(path)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_is_byte_exact() {
        let payload: Vec<u8> = (0..=255u8).cycle().take(4096).collect();
        let encoded = encode(&payload);
        assert_eq!(decode(&encoded).unwrap(), payload);
    }

    #[test]
    fn test_strip_data_url_prefix() {
        assert_eq!(strip_data_url("data:audio/mpeg;base64,AAAA"), "AAAA");
        assert_eq!(strip_data_url("AAAA"), "AAAA");
        // A comma in plain base64-ish text is left alone.
        assert_eq!(strip_data_url("not-a-url,AAAA"), "not-a-url,AAAA");
    }

    #[test]
    fn test_decode_accepts_data_url() {
        let encoded = format!("data:audio/wav;base64,{}", encode(b"abc"));
        assert_eq!(decode(&encoded).unwrap(), b"abc");
    }

    #[test]
    fn test_read_and_encode() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.bin");
        std::fs::write(&path, b"\x00\x01\x02").unwrap();
        let encoded = read_and_encode(&path).unwrap();
        assert_eq!(decode(&encoded).unwrap(), b"\x00\x01\x02");

        let missing = read_and_encode(&dir.path().join("missing.bin"));
        assert!(matches!(missing, Err(EncodeError::Read(_))));
    }
}
