//! URL-safe base64 (RFC 4648 §5).

use base64::Engine;
use base64::engine::general_purpose::{STANDARD, URL_SAFE, URL_SAFE_NO_PAD};

/// Encodes `bytes` with the URL-safe alphabet and no `=` padding.
pub fn encode<T: AsRef<[u8]>>(bytes: T) -> String {
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Encodes `bytes` with the URL-safe alphabet, keeping `=` padding.
pub fn encode_padded<T: AsRef<[u8]>>(bytes: T) -> String {
    URL_SAFE.encode(bytes)
}

/// Decodes padded or unpadded URL-safe base64.
///
/// Returns `None` if the input is not valid base64 after the alphabet is
/// mapped back and the padding restored.
pub fn decode(encoded: &str) -> Option<Vec<u8>> {
    let mut standard: String = encoded
        .chars()
        .map(|c| match c {
            '-' => '+',
            '_' => '/',
            c => c,
        })
        .collect();

    let rem = standard.len() % 4;
    if rem != 0 {
        standard.extend(std::iter::repeat_n('=', 4 - rem));
    }

    STANDARD.decode(standard).ok()
}
