//! Header sniffing for candidate model files.
//!
//! Only the first [`HEADER_LEN`] bytes are inspected so large files are rejected
//! before anything expensive happens.

use std::fs::File;
use std::io::Read;
use std::path::Path;

pub const HEADER_LEN: usize = 20;

/// Hex prefixes of known FBX payloads (binary "Kaydara", ASCII exports and the
/// odd container variants seen in the wild).
pub const KNOWN_SIGNATURES: [&str; 7] =
    ["4662780a", "46424380", "00000020", "4b617964", "2e464258", "4d5a", "4d534d"];

/// Lowercase hex encoding of at most [`HEADER_LEN`] leading bytes.
pub fn header_hex(bytes: &[u8]) -> String {
    let take = bytes.len().min(HEADER_LEN);
    let mut hex = String::with_capacity(take * 2);
    for byte in &bytes[..take] {
        hex.push_str(&format!("{byte:02x}"));
    }
    hex
}

/// Returns true when the header matches a known signature, or when the decoded
/// header text mentions `fbx` in any case (loose fallback for ASCII exports such
/// as `; FBX 7.4.0 project file`).
pub fn validate_header(bytes: &[u8]) -> bool {
    let hex = header_hex(bytes);
    if KNOWN_SIGNATURES.iter().any(|signature| hex.starts_with(signature)) {
        return true;
    }
    let take = bytes.len().min(HEADER_LEN);
    String::from_utf8_lossy(&bytes[..take]).to_ascii_lowercase().contains("fbx")
}

/// Reads the header of `path` and validates it. Read errors fail closed.
pub fn validate_file(path: &Path) -> bool {
    let mut header = Vec::with_capacity(HEADER_LEN);
    let read = File::open(path).and_then(|file| file.take(HEADER_LEN as u64).read_to_end(&mut header));
    match read {
        Ok(_) => {
            let valid = validate_header(&header);
            log::debug!("[validate] {} header={} valid={valid}", path.display(), header_hex(&header));
            valid
        }
        Err(err) => {
            log::warn!("[validate] unable to read {}: {err}", path.display());
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_is_truncated_to_header_length() {
        let bytes = [0xABu8; 64];
        assert_eq!(header_hex(&bytes).len(), HEADER_LEN * 2);
        assert_eq!(header_hex(&[0x0f, 0xa0]), "0fa0");
    }

    fn decode_hex(hex: &str) -> Vec<u8> {
        (0..hex.len())
            .step_by(2)
            .map(|i| u8::from_str_radix(&hex[i..i + 2], 16).expect("hex pair"))
            .collect()
    }

    #[test]
    fn every_known_signature_is_accepted() {
        for signature in KNOWN_SIGNATURES {
            let mut header = decode_hex(signature);
            assert!(validate_header(&header), "bare {signature}");
            header.resize(HEADER_LEN + 8, 0xee);
            assert!(validate_header(&header), "padded {signature}");
        }
    }

    #[test]
    fn other_magic_numbers_are_rejected() {
        let foreign: [&[u8]; 5] =
            [b"\x7fELF\x02\x01\x01", b"PK\x03\x04", b"\xff\xd8\xff\xe0", &[0u8; HEADER_LEN], b"GIF89a"];
        for header in foreign {
            assert!(!validate_header(header), "{}", header_hex(header));
        }
    }

    #[test]
    fn binary_fbx_magic_is_accepted() {
        assert!(validate_header(b"Kaydara FBX Binary  \x00\x1a\x00"));
    }

    #[test]
    fn png_magic_is_rejected() {
        assert!(!validate_header(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0x0D]));
    }

    #[test]
    fn short_signature_matches_prefix_only() {
        assert!(validate_header(&[0x4d, 0x5a, 0x90, 0x00]));
        assert!(!validate_header(&[0x00, 0x4d, 0x5a]));
    }

    #[test]
    fn ascii_export_falls_back_to_text_match() {
        assert!(validate_header(b"; FBX 7.4.0 project file\n"));
        assert!(validate_header(b"\xef\xbb\xbf; fbx exported"));
        assert!(!validate_header(b"; OBJ exported by tool"));
    }

    #[test]
    fn empty_input_is_rejected() {
        assert!(!validate_header(&[]));
    }

    #[test]
    fn missing_file_fails_closed() {
        assert!(!validate_file(Path::new("definitely/not/here.fbx")));
    }
}
