use parking_lot::RwLock;
use tracing::info;

use crate::models::GenerationConfig;

/// A config value paired with the number of writes it has seen.
#[derive(Debug, Clone, PartialEq)]
pub struct Versioned<T> {
    pub version: u64,
    pub value: T,
}

/// Generation config shared by the router (readers) and the adjustment
/// control (writer). Writers hold the lock for the whole read-modify-write,
/// so concurrent adjustments never lose an update.
pub struct GenerationSettings {
    inner: RwLock<Versioned<GenerationConfig>>,
}

impl GenerationSettings {
    pub fn new(config: GenerationConfig) -> Self {
        Self {
            inner: RwLock::new(Versioned { version: 0, value: config }),
        }
    }

    pub fn snapshot(&self) -> Versioned<GenerationConfig> {
        self.inner.read().clone()
    }

    /// Apply `f` under the write lock and bump the version.
    pub fn update<R>(&self, f: impl FnOnce(&mut GenerationConfig) -> R) -> (u64, R) {
        let mut guard = self.inner.write();
        let result = f(&mut guard.value);
        guard.version += 1;
        info!("Generation config updated to version {}", guard.version);
        (guard.version, result)
    }
}
