//! Opaque blob references.

use serde::{Deserialize, Serialize};

/// Opaque key addressing stored audio bytes.
///
/// Keys are issued by the blob gateway (client uploads) or returned by a
/// synthesis backend (generated audio). The core never dereferences a key
/// itself; it is only ever exchanged for a time-boxed URL.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlobKey(String);

impl BlobKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl core::fmt::Display for BlobKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for BlobKey {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for BlobKey {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<BlobKey> for String {
    fn from(value: BlobKey) -> Self {
        value.0
    }
}
