//! Outcome of a controller operation that also writes to the store.

use beacon_storage::StorageResult;

/// The in-memory result of an operation plus how its write went.
///
/// The controller always applies the in-memory change, even when the
/// store rejects the write. `persistence` reports the write so callers
/// can decide whether it matters to them.
#[derive(Debug)]
pub struct Persisted<T> {
    pub value: T,
    pub persistence: StorageResult<()>,
}

impl<T> Persisted<T> {
    pub(crate) fn new(value: T, persistence: StorageResult<()>) -> Self {
        Self { value, persistence }
    }

    /// Whether every write behind this outcome succeeded.
    pub fn is_durable(&self) -> bool {
        self.persistence.is_ok()
    }

    /// Returns the value, discarding the write outcome.
    pub fn into_value(self) -> T {
        self.value
    }

    /// Fails with the storage error if the write did not succeed.
    pub fn into_result(self) -> StorageResult<T> {
        self.persistence.map(|()| self.value)
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Persisted<U> {
        Persisted {
            value: f(self.value),
            persistence: self.persistence,
        }
    }
}
