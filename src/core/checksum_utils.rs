/*
 * SHA-256 helpers used to key the accurate token-count cache. The local folder
 * source already holds a file's text when it needs a checksum, so hashing works
 * on in-memory content rather than re-reading the file.
 */
use sha2::{Digest, Sha256};

/* Hex-encoded SHA-256 of the given bytes. */
pub fn sha256_hex(content: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content);
    format!("{:x}", hasher.finalize())
}

pub fn checksum_for_text(text: &str) -> String {
    let checksum = sha256_hex(text.as_bytes());
    log::trace!(
        "ChecksumUtils: {} bytes hashed to {}",
        text.len(),
        &checksum[..12]
    );
    checksum
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checksum_of_empty_input() {
        assert_eq!(
            checksum_for_text(""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_checksum_of_known_input() {
        assert_eq!(
            sha256_hex(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_checksum_changes_with_content() {
        assert_ne!(checksum_for_text("fn main() {}"), checksum_for_text("fn main() { }"));
    }
}
