//! Debounced autosave of the board to the local store.
//!
//! Each change pushes the save deadline out by the debounce interval, so a
//! burst of edits produces one write shortly after the last of them.

use crate::board::Board;
use crate::config::{DEFAULT_STORAGE_KEY, EngineConfig};
use crate::storage::{Storage, StorageError, StorageResult};
use std::sync::Arc;

#[cfg(not(target_arch = "wasm32"))]
use std::time::{Duration, Instant};

#[cfg(target_arch = "wasm32")]
use web_time::{Duration, Instant};

/// Default debounce between the last change and the write.
pub const DEFAULT_AUTOSAVE_DEBOUNCE_MS: u64 = 500;

/// Manages the debounced write of the board to one storage key.
pub struct AutoSaveManager<S: Storage + ?Sized> {
    /// Storage backend.
    storage: Arc<S>,
    /// Key of the autosave slot.
    key: String,
    /// Quiet period after the last change before writing.
    debounce: Duration,
    /// When the pending write becomes due.
    deadline: Option<Instant>,
    /// Last successful write.
    last_save: Option<Instant>,
}

impl<S: Storage + ?Sized> AutoSaveManager<S> {
    /// Create a manager writing to the default key with the default debounce.
    pub fn new(storage: Arc<S>) -> Self {
        Self {
            storage,
            key: DEFAULT_STORAGE_KEY.to_string(),
            debounce: Duration::from_millis(DEFAULT_AUTOSAVE_DEBOUNCE_MS),
            deadline: None,
            last_save: None,
        }
    }

    /// Create a manager using the key and debounce from `config`.
    pub fn from_config(storage: Arc<S>, config: &EngineConfig) -> Self {
        Self {
            key: config.storage_key.clone(),
            debounce: config.autosave_debounce(),
            ..Self::new(storage)
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn debounce(&self) -> Duration {
        self.debounce
    }

    pub fn set_debounce(&mut self, debounce: Duration) {
        self.debounce = debounce;
    }

    /// Record a change at `now`, restarting the debounce window.
    pub fn schedule(&mut self, now: Instant) {
        self.deadline = Some(now + self.debounce);
    }

    /// Whether a write is waiting for its deadline.
    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    /// Drop the pending write without performing it.
    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    /// When the pending write becomes due, if any.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Check if the debounce window has elapsed.
    pub fn should_save(&self, now: Instant) -> bool {
        self.deadline.is_some_and(|deadline| now >= deadline)
    }

    /// Write the board if the debounce window has elapsed.
    ///
    /// Storage failures are logged and swallowed: autosave is best effort and
    /// must never interrupt drawing. Returns true if a write succeeded.
    pub async fn maybe_save(&mut self, board: &Board, now: Instant) -> bool {
        if !self.should_save(now) {
            return false;
        }
        self.deadline = None;
        match self.save(board).await {
            Ok(()) => {
                self.last_save = Some(now);
                true
            }
            Err(e) => {
                log::warn!("Autosave failed: {}", e);
                false
            }
        }
    }

    /// Write the board immediately.
    pub async fn save(&mut self, board: &Board) -> StorageResult<()> {
        let json = board
            .to_json()
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        self.storage.save(&self.key, &json).await?;
        self.deadline = None;
        log::debug!("Autosaved {} stroke(s) to {}", board.len(), self.key);
        Ok(())
    }

    /// Read the raw autosave payload, if present.
    pub async fn load_raw(&self) -> Option<String> {
        match self.storage.load(&self.key).await {
            Ok(json) => Some(json),
            Err(StorageError::NotFound(_)) => None,
            Err(e) => {
                log::warn!("Could not read autosave: {}", e);
                None
            }
        }
    }

    /// Load the last autosaved board. Missing or malformed data yields `None`.
    pub async fn load_last(&self) -> Option<Board> {
        let json = self.load_raw().await?;
        match Board::from_json(&json) {
            Ok(board) => Some(board),
            Err(e) => {
                log::warn!("Ignoring malformed autosave: {}", e);
                None
            }
        }
    }

    /// Remove the autosave slot and any pending write.
    pub async fn clear(&mut self) -> StorageResult<()> {
        self.deadline = None;
        self.storage.delete(&self.key).await
    }

    pub fn last_save(&self) -> Option<Instant> {
        self.last_save
    }

    /// Get a reference to the storage backend.
    pub fn storage(&self) -> &Arc<S> {
        &self.storage
    }
}

/// Create a platform-appropriate storage backend.
#[cfg(not(target_arch = "wasm32"))]
pub fn create_default_storage() -> StorageResult<Arc<crate::storage::FileStorage>> {
    Ok(Arc::new(crate::storage::FileStorage::default_location()?))
}

#[cfg(target_arch = "wasm32")]
pub fn create_default_storage() -> StorageResult<Arc<crate::storage::LocalStorage>> {
    Ok(Arc::new(crate::storage::LocalStorage::new()))
}

/// Convenience type alias for platform-specific storage.
#[cfg(not(target_arch = "wasm32"))]
pub type PlatformStorage = crate::storage::FileStorage;

#[cfg(target_arch = "wasm32")]
pub type PlatformStorage = crate::storage::LocalStorage;

/// Type alias for the auto-save manager with platform-specific storage.
pub type PlatformAutoSaveManager = AutoSaveManager<PlatformStorage>;

/// Convenience function to create an auto-save manager with default storage.
pub fn create_autosave_manager(config: &EngineConfig) -> StorageResult<PlatformAutoSaveManager> {
    let storage = create_default_storage()?;
    Ok(AutoSaveManager::from_config(storage, config))
}

#[cfg(all(test, not(target_arch = "wasm32")))]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;
    use crate::storage::test_util::block_on;
    use crate::stroke::{Stroke, StrokeColor};
    use kurbo::Point;

    fn board_with_strokes(n: usize) -> Board {
        let mut board = Board::new();
        for i in 0..n {
            board.push(
                Stroke::from_points(
                    vec![Point::new(0.0, i as f64), Point::new(10.0, i as f64)],
                    StrokeColor::default(),
                    2.0,
                )
                .unwrap(),
            );
        }
        board
    }

    /// Storage whose writes always fail.
    struct BrokenStorage;

    impl Storage for BrokenStorage {
        fn save(&self, _key: &str, _value: &str) -> crate::storage::BoxFuture<'_, StorageResult<()>> {
            Box::pin(async { Err(StorageError::Unavailable("quota exceeded".to_string())) })
        }
        fn load(&self, key: &str) -> crate::storage::BoxFuture<'_, StorageResult<String>> {
            let key = key.to_string();
            Box::pin(async move { Err(StorageError::NotFound(key)) })
        }
        fn delete(&self, _key: &str) -> crate::storage::BoxFuture<'_, StorageResult<()>> {
            Box::pin(async { Ok(()) })
        }
        fn list(&self) -> crate::storage::BoxFuture<'_, StorageResult<Vec<String>>> {
            Box::pin(async { Ok(vec![]) })
        }
        fn exists(&self, _key: &str) -> crate::storage::BoxFuture<'_, StorageResult<bool>> {
            Box::pin(async { Ok(false) })
        }
    }

    #[test]
    fn test_autosave_manager_creation() {
        let manager = AutoSaveManager::new(Arc::new(MemoryStorage::new()));
        assert!(!manager.is_pending());
        assert!(!manager.should_save(Instant::now()));
        assert_eq!(manager.key(), "sb_autosave_v1");
    }

    #[test]
    fn test_debounce_restarts_on_each_change() {
        let mut manager = AutoSaveManager::new(Arc::new(MemoryStorage::new()));
        let t0 = Instant::now();
        manager.schedule(t0);
        manager.schedule(t0 + Duration::from_millis(300));

        assert!(!manager.should_save(t0 + Duration::from_millis(600)));
        assert!(manager.should_save(t0 + Duration::from_millis(800)));
    }

    #[test]
    fn test_burst_produces_single_write() {
        let storage = Arc::new(MemoryStorage::new());
        let mut manager = AutoSaveManager::new(storage.clone());
        let t0 = Instant::now();
        let board = board_with_strokes(2);

        for i in 0..10 {
            let now = t0 + Duration::from_millis(i * 50);
            manager.schedule(now);
            assert!(!block_on(manager.maybe_save(&board, now)));
        }
        let later = t0 + Duration::from_millis(450 + 500);
        assert!(block_on(manager.maybe_save(&board, later)));
        assert!(!manager.is_pending());
        assert!(!block_on(manager.maybe_save(&board, later)));

        let saved = block_on(storage.load("sb_autosave_v1")).unwrap();
        assert_eq!(Board::from_json(&saved).unwrap().len(), 2);
    }

    #[test]
    fn test_load_last_round_trip() {
        let storage = Arc::new(MemoryStorage::new());
        let mut manager = AutoSaveManager::new(storage.clone());
        let board = board_with_strokes(3);
        block_on(manager.save(&board)).unwrap();

        let manager2 = AutoSaveManager::new(storage);
        let loaded = block_on(manager2.load_last()).expect("Should load autosave");
        assert_eq!(loaded.paths(), board.paths());
    }

    #[test]
    fn test_load_last_ignores_malformed_data() {
        let storage = Arc::new(MemoryStorage::new());
        block_on(storage.save("sb_autosave_v1", "{not json")).unwrap();
        let manager = AutoSaveManager::new(storage);
        assert!(block_on(manager.load_last()).is_none());
    }

    #[test]
    fn test_write_failure_is_swallowed() {
        let mut manager = AutoSaveManager::new(Arc::new(BrokenStorage));
        let t0 = Instant::now();
        manager.schedule(t0);
        assert!(!block_on(manager.maybe_save(&Board::new(), t0 + Duration::from_secs(1))));
        assert!(manager.last_save().is_none());
    }

    #[test]
    fn test_from_config_uses_key() {
        let config = EngineConfig {
            storage_key: "custom".to_string(),
            autosave_debounce_ms: 100,
            ..EngineConfig::default()
        };
        let manager = AutoSaveManager::from_config(Arc::new(MemoryStorage::new()), &config);
        assert_eq!(manager.key(), "custom");
        assert_eq!(manager.debounce(), Duration::from_millis(100));
    }

    #[test]
    fn test_clear_removes_slot() {
        let storage = Arc::new(MemoryStorage::new());
        let mut manager = AutoSaveManager::new(storage.clone());
        block_on(manager.save(&Board::new())).unwrap();
        manager.schedule(Instant::now());
        block_on(manager.clear()).unwrap();

        assert!(!manager.is_pending());
        assert!(!block_on(storage.exists("sb_autosave_v1")).unwrap());
    }
}
