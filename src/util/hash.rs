//! Hashing utilities for deterministic generated names.
//!
//! Unity names and copy aliases embed a short hash. The hash must not depend
//! on process state or std's randomized hasher, so everything goes through
//! SHA-256 with explicit field separators.

use sha2::{Digest, Sha256};

/// A hasher for building fingerprints from multiple components.
#[derive(Default)]
pub struct Fingerprint {
    hasher: Sha256,
}

impl Fingerprint {
    /// Create a new fingerprint builder.
    pub fn new() -> Self {
        Fingerprint {
            hasher: Sha256::new(),
        }
    }

    /// Add a string component to the fingerprint.
    pub fn update_str(&mut self, s: &str) -> &mut Self {
        self.hasher.update(s.as_bytes());
        self.hasher.update(b"\0"); // Separator
        self
    }

    /// Add multiple strings to the fingerprint.
    ///
    /// The item count is hashed too, so `["a", "b"]` and `["a\0b"]` differ.
    pub fn update_strs<'a>(&mut self, items: impl IntoIterator<Item = &'a str>) -> &mut Self {
        let mut count: u64 = 0;
        for s in items {
            self.update_str(s);
            count += 1;
        }
        self.update_u64(count)
    }

    /// Add an optional string component.
    pub fn update_opt(&mut self, opt: Option<&str>) -> &mut Self {
        match opt {
            Some(s) => {
                self.hasher.update(b"\x01"); // Present marker
                self.update_str(s);
            }
            None => {
                self.hasher.update(b"\x00"); // Absent marker
            }
        }
        self
    }

    /// Add a boolean component.
    pub fn update_bool(&mut self, b: bool) -> &mut Self {
        self.hasher.update([b as u8]);
        self
    }

    /// Add an integer component.
    pub fn update_u64(&mut self, v: u64) -> &mut Self {
        self.hasher.update(v.to_le_bytes());
        self
    }

    /// Finalize and return the fingerprint as a hex string.
    pub fn finish(self) -> String {
        hex::encode(self.hasher.finalize())
    }

    /// Finalize into the leading 32 bits of the digest.
    pub fn finish_u32(self) -> u32 {
        let digest = self.hasher.finalize();
        u32::from_be_bytes([digest[0], digest[1], digest[2], digest[3]])
    }

    /// Finalize and return an uppercase 8-hex-digit string.
    pub fn finish_hex8(self) -> String {
        format!("{:08X}", self.finish_u32())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fingerprint() {
        let fp1 = {
            let mut fp = Fingerprint::new();
            fp.update_str("hello").update_str("world");
            fp.finish()
        };

        let fp2 = {
            let mut fp = Fingerprint::new();
            fp.update_str("hello").update_str("world");
            fp.finish()
        };

        let fp3 = {
            let mut fp = Fingerprint::new();
            fp.update_str("hello").update_str("different");
            fp.finish()
        };

        assert_eq!(fp1, fp2);
        assert_ne!(fp1, fp3);
    }

    #[test]
    fn test_hex8_is_uppercase_and_padded() {
        let hex8 = |s: &str| {
            let mut fp = Fingerprint::new();
            fp.update_str(s);
            fp.finish_hex8()
        };
        let h = hex8("Core");
        assert_eq!(h.len(), 8);
        assert!(h.chars().all(|c| c.is_ascii_digit() || c.is_ascii_uppercase()));
        assert_eq!(h, hex8("Core"));
    }

    #[test]
    fn test_update_strs_counts_items() {
        let a = {
            let mut fp = Fingerprint::new();
            fp.update_strs(["a", "b"]);
            fp.finish()
        };
        let b = {
            let mut fp = Fingerprint::new();
            fp.update_strs(["a", "b", ""]);
            fp.finish()
        };
        assert_ne!(a, b);
    }
}
