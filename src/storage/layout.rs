//! Key-to-path layout schemes.

/// Length in hex characters of a SHA-256 digest, which is what a Bazel
/// remote cache expects in action-cache paths.
const DIGEST_HEX_LEN: usize = 64;

/// Scheme mapping a cache key to a backend storage path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Layout {
    /// Lowercase hex of the key, no separators.
    Flat,
    /// First two hex characters as a subdirectory: `ab/cdef...`.
    #[default]
    Subdirs,
    /// `ac/<64 hex chars>`, compatible with Bazel remote caches.
    Bazel,
}

impl Layout {
    /// Parse a layout attribute value. Unknown names fall back to the
    /// default `subdirs`, matching what ccache's other helpers tolerate.
    pub fn from_name(name: &str) -> Self {
        match name {
            "flat" => Layout::Flat,
            "bazel" => Layout::Bazel,
            _ => Layout::Subdirs,
        }
    }

    /// Map a key to its backend path.
    pub fn key_path(&self, key: &[u8]) -> String {
        let hex = hex::encode(key);
        match self {
            Layout::Flat => hex,
            Layout::Subdirs => {
                if hex.len() < 2 {
                    hex
                } else {
                    format!("{}/{}", &hex[..2], &hex[2..])
                }
            }
            Layout::Bazel => format!("ac/{}", bazel_digest(&hex)),
        }
    }
}

/// Produce exactly [`DIGEST_HEX_LEN`] hex characters from a key's hex form.
///
/// Longer keys are truncated; shorter keys are padded by repeating the
/// key's own leading hex digits. This is a deliberate non-cryptographic
/// padding for keys shorter than a SHA-256 digest, not a hash.
fn bazel_digest(hex: &str) -> String {
    if hex.len() >= DIGEST_HEX_LEN {
        return hex[..DIGEST_HEX_LEN].to_string();
    }
    if hex.is_empty() {
        return "0".repeat(DIGEST_HEX_LEN);
    }
    let mut padded = String::with_capacity(DIGEST_HEX_LEN);
    padded.push_str(hex);
    while padded.len() < DIGEST_HEX_LEN {
        let take = (DIGEST_HEX_LEN - padded.len()).min(hex.len());
        padded.push_str(&hex[..take]);
    }
    padded
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flat_never_inserts_separators() {
        assert_eq!(Layout::Flat.key_path(&[]), "");
        assert_eq!(Layout::Flat.key_path(&[0xab]), "ab");
        assert_eq!(Layout::Flat.key_path(&[0xab, 0xcd, 0xef]), "abcdef");
    }

    #[test]
    fn subdirs_splits_after_two_hex_chars() {
        assert_eq!(Layout::Subdirs.key_path(&[]), "");
        assert_eq!(Layout::Subdirs.key_path(&[0xab]), "ab/");
        assert_eq!(Layout::Subdirs.key_path(&[0xab, 0xcd]), "ab/cd");
        assert_eq!(
            Layout::Subdirs.key_path(&[0xab, 0xcd, 0xef, 0x01]),
            "ab/cdef01"
        );
    }

    #[test]
    fn bazel_truncates_long_keys_to_64_hex_chars() {
        let key = [0x12u8; 40]; // 80 hex chars
        let path = Layout::Bazel.key_path(&key);
        assert_eq!(path, format!("ac/{}", "12".repeat(32)));

        // Exactly 32 bytes passes through untouched.
        let key = [0xabu8; 32];
        assert_eq!(
            Layout::Bazel.key_path(&key),
            format!("ac/{}", "ab".repeat(32))
        );
    }

    #[test]
    fn bazel_pads_short_keys_by_repeating_leading_hex() {
        // 20 bytes → 40 hex chars + the first 24 again.
        let key: Vec<u8> = (0u8..20).collect();
        let hex = hex::encode(&key);
        let expected = format!("ac/{}{}", hex, &hex[..24]);
        assert_eq!(Layout::Bazel.key_path(&key), expected);

        // 1 byte cycles its two hex digits to fill 64 characters.
        let path = Layout::Bazel.key_path(&[0xab]);
        assert_eq!(path, format!("ac/{}", "ab".repeat(32)));
    }

    #[test]
    fn bazel_paths_are_always_64_hex_chars() {
        for len in [0usize, 1, 2, 15, 31, 32, 33, 255] {
            let key = vec![0x7fu8; len];
            let path = Layout::Bazel.key_path(&key);
            assert!(path.starts_with("ac/"));
            assert_eq!(path.len(), 3 + DIGEST_HEX_LEN, "key length {len}");
        }
    }

    #[test]
    fn unknown_layout_name_defaults_to_subdirs() {
        assert_eq!(Layout::from_name("flat"), Layout::Flat);
        assert_eq!(Layout::from_name("bazel"), Layout::Bazel);
        assert_eq!(Layout::from_name("subdirs"), Layout::Subdirs);
        assert_eq!(Layout::from_name("shiny-new-layout"), Layout::Subdirs);
    }
}
