//! File content hashing for change detection.

use md5::{Digest, Md5};

/// Returns the lowercase hex md5 digest of `bytes`.
#[must_use]
pub fn compute_file_hash(bytes: &[u8]) -> String {
    hex::encode(Md5::digest(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_digests() {
        assert_eq!(compute_file_hash(b""), "d41d8cd98f00b204e9800998ecf8427e");
        assert_eq!(compute_file_hash(b"abc"), "900150983cd24fb0d6963f7d28e17f72");
    }
}
