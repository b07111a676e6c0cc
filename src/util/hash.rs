//! Hashing utilities for cache fingerprints.

use std::path::Path;

use sha2::{Digest, Sha256};

/// A hasher for building fingerprints from multiple components.
///
/// Each component is followed by a NUL separator so that the component
/// boundaries participate in the digest (`["ab", "c"]` and `["a", "bc"]`
/// hash differently).
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
        self.hasher.update(b"\0");
        self
    }

    /// Add a path component, hashing its exact byte representation.
    pub fn update_path(&mut self, path: &Path) -> &mut Self {
        self.hasher.update(path.as_os_str().as_encoded_bytes());
        self.hasher.update(b"\0");
        self
    }

    /// Finalize and return the fingerprint as a hex string.
    pub fn finish(self) -> String {
        hex::encode(self.hasher.finalize())
    }
}
