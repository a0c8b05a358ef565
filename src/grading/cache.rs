use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use parking_lot::Mutex;
use sha2::{Digest, Sha256};

use crate::sandbox::{ExecutionMode, ExecutionResult, SandboxError};

// Private-use code point, never part of legitimate source or test text
const SEPARATOR: &str = "\u{e000}";

/// Fingerprint of a reference run: mode, reference source and test content
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CacheKey([u8; 32]);

impl CacheKey {
    pub fn new(mode: ExecutionMode, reference: &str, test: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(mode.tag());
        hasher.update(SEPARATOR);
        hasher.update(reference);
        hasher.update(SEPARATOR);
        hasher.update(test);
        Self(hasher.finalize().into())
    }
}

/// Process-lifetime memo of reference runs
///
/// Entries are never evicted. Two requests missing on the same key at the same time
/// may both compute it; the later insert overwrites an identical value.
#[derive(Default)]
pub struct ReferenceCache {
    entries: Mutex<HashMap<CacheKey, Arc<ExecutionResult>>>,
}

impl ReferenceCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the stored result for `key`, or runs `compute` and stores what it returns
    ///
    /// Errors from `compute` are passed through and never stored.
    pub async fn get_or_compute<F, Fut>(
        &self,
        key: CacheKey,
        compute: F,
    ) -> Result<Arc<ExecutionResult>, SandboxError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<ExecutionResult, SandboxError>>,
    {
        let cached = self.entries.lock().get(&key).cloned();
        if let Some(hit) = cached {
            return Ok(hit);
        }

        let result = Arc::new(compute().await?);
        self.entries.lock().insert(key, Arc::clone(&result));
        Ok(result)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
