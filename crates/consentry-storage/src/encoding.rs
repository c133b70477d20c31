//! Reversible record obfuscation.
//!
//! Standard base64 over the serialized record. This keeps casual eyes off
//! cookie values; it is obfuscation, not encryption, and must never be
//! presented as a security measure. Plain-text and obfuscated records
//! coexist in the wild, so decoding is always attempted second, after a
//! plain parse has failed (see the adapter).

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

/// Encodes serialized text for storage.
pub fn obfuscate(text: &str) -> String {
    STANDARD.encode(text.as_bytes())
}

/// Reverses [`obfuscate`]. Returns `None` when the input is not valid
/// base64 or does not decode to UTF-8.
pub fn deobfuscate(text: &str) -> Option<String> {
    let bytes = STANDARD.decode(text.trim()).ok()?;
    String::from_utf8(bytes).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip() {
        let text = r#"{"version":"2.0","necessary":true}"#;
        assert_eq!(deobfuscate(&obfuscate(text)).as_deref(), Some(text));
    }

    #[test]
    fn deobfuscate_rejects_plain_json() {
        assert_eq!(deobfuscate(r#"{"version":"2.0"}"#), None);
    }

    #[test]
    fn deobfuscate_rejects_non_utf8_payload() {
        let encoded = STANDARD.encode([0xff, 0xfe, 0x00]);
        assert_eq!(deobfuscate(&encoded), None);
    }

    #[test]
    fn deobfuscate_tolerates_surrounding_whitespace() {
        let encoded = format!("  {}  ", obfuscate("hello"));
        assert_eq!(deobfuscate(&encoded).as_deref(), Some("hello"));
    }
}
