//! Loading and saving boards: bootstrap data, local autosave, legacy
//! migration and the remote save endpoint.

mod migration;
mod remote;

pub use migration::{
    CookieJar, CookieMap, LEGACY_COOKIE_PREFIX, LEGACY_MAX_CHUNKS, MigrationOutcome,
    clear_legacy_cookies, migrate_legacy_autosave,
};
#[cfg(target_arch = "wasm32")]
pub use migration::DocumentCookies;
pub use remote::{
    ErrorResponse, HttpSaveTransport, SaveRequest, SaveResponse, SaveTransport, TransportError,
    TransportResponse, TransportResult,
};

use crate::board::Board;
use crate::storage::{AutoSaveManager, BoxFuture, Storage, StorageResult};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;

#[cfg(not(target_arch = "wasm32"))]
use std::time::Instant;

#[cfg(target_arch = "wasm32")]
use web_time::Instant;

/// Where the host should send the user when a save needs a login.
pub const DEFAULT_LOGIN_URL: &str = "/login";

/// Errors from an explicit save.
#[derive(Debug, Error)]
pub enum PersistError {
    #[error("A save is already in progress")]
    SaveInProgress,
    #[error("Failed to encode board: {0}")]
    Encode(String),
    #[error("Preview must be a PNG data URL")]
    InvalidPreview,
    #[error("Save rejected with status {status}: {message}")]
    Remote { status: u16, message: String },
    #[error("Unexpected response from save endpoint: {0}")]
    InvalidResponse(String),
    #[error(transparent)]
    Transport(#[from] TransportError),
}

pub type PersistResult<T> = Result<T, PersistError>;

/// Successful outcomes of an explicit save.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    /// The board is stored remotely and can be shared at `url`.
    Saved { url: String },
    /// The user is not signed in; the host should navigate to `login_url`.
    LoginRequired { login_url: String },
}

/// Which source produced the initial board.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadSource {
    Bootstrap,
    LocalStore,
    Empty,
}

/// Clears the in-flight flag when the save finishes or is dropped.
struct InFlight(Arc<AtomicBool>);

impl InFlight {
    fn acquire(flag: &Arc<AtomicBool>) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| Self(flag.clone()))
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Explicit remote saves with at most one request in flight.
pub struct RemoteSaver<T: SaveTransport> {
    transport: Arc<T>,
    saving: Arc<AtomicBool>,
    login_url: String,
}

impl<T: SaveTransport> Clone for RemoteSaver<T> {
    fn clone(&self) -> Self {
        Self {
            transport: self.transport.clone(),
            saving: self.saving.clone(),
            login_url: self.login_url.clone(),
        }
    }
}

impl<T: SaveTransport + 'static> RemoteSaver<T> {
    pub fn new(transport: T, login_url: impl Into<String>) -> Self {
        Self {
            transport: Arc::new(transport),
            saving: Arc::new(AtomicBool::new(false)),
            login_url: login_url.into(),
        }
    }

    pub fn is_saving(&self) -> bool {
        self.saving.load(Ordering::SeqCst)
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Send `board` and its PNG preview to the save endpoint.
    ///
    /// The board is serialized before this returns, so the caller can keep
    /// drawing while the request runs. A second call while one is in flight
    /// fails with [`PersistError::SaveInProgress`].
    pub fn save(&self, board: &Board, preview: &str) -> BoxFuture<'static, PersistResult<SaveOutcome>> {
        let prepared = self.prepare(board, preview);
        let transport = self.transport.clone();
        let login_url = self.login_url.clone();

        Box::pin(async move {
            let (guard, body) = prepared?;
            let response = transport.post_json(body).await?;
            drop(guard);
            interpret_response(response, login_url)
        })
    }

    fn prepare(&self, board: &Board, preview: &str) -> PersistResult<(InFlight, String)> {
        if !preview.starts_with("data:image/png") {
            return Err(PersistError::InvalidPreview);
        }
        let guard = InFlight::acquire(&self.saving).ok_or(PersistError::SaveInProgress)?;
        let body = serde_json::to_string(&SaveRequest { data: board, preview })
            .map_err(|e| PersistError::Encode(e.to_string()))?;
        Ok((guard, body))
    }
}

fn interpret_response(response: TransportResponse, login_url: String) -> PersistResult<SaveOutcome> {
    if response.status == 401 {
        log::info!("Save requires login");
        return Ok(SaveOutcome::LoginRequired { login_url });
    }
    if !response.is_success() {
        let message = serde_json::from_str::<ErrorResponse>(&response.body)
            .map(|e| e.error)
            .unwrap_or_else(|_| response.body.chars().take(200).collect());
        log::error!("Save failed with status {}: {}", response.status, message);
        return Err(PersistError::Remote {
            status: response.status,
            message,
        });
    }
    let saved: SaveResponse = serde_json::from_str(&response.body)
        .map_err(|e| PersistError::InvalidResponse(e.to_string()))?;
    log::info!("Board saved at {}", saved.url);
    Ok(SaveOutcome::Saved { url: saved.url })
}

/// Ties together everything that moves a board in and out of the session.
pub struct PersistenceBridge<S: Storage, T: SaveTransport> {
    autosave: AutoSaveManager<S>,
    remote: RemoteSaver<T>,
    migrated: bool,
}

impl<S: Storage, T: SaveTransport + 'static> PersistenceBridge<S, T> {
    pub fn new(autosave: AutoSaveManager<S>, remote: RemoteSaver<T>) -> Self {
        Self {
            autosave,
            remote,
            migrated: false,
        }
    }

    pub fn autosave(&self) -> &AutoSaveManager<S> {
        &self.autosave
    }

    pub fn autosave_mut(&mut self) -> &mut AutoSaveManager<S> {
        &mut self.autosave
    }

    /// A cheap handle for running saves alongside the session.
    pub fn remote(&self) -> RemoteSaver<T> {
        self.remote.clone()
    }

    /// Produce the board to start the session with.
    ///
    /// Legacy cookies are migrated first (once per bridge). Then bootstrap
    /// data wins if it parses; otherwise the local autosave is used; otherwise
    /// the board starts empty.
    pub async fn load_initial(
        &mut self,
        bootstrap: Option<&str>,
        cookies: &mut dyn CookieJar,
    ) -> (Board, LoadSource) {
        if !self.migrated {
            self.migrated = true;
            let storage = self.autosave.storage().clone();
            migrate_legacy_autosave(cookies, storage.as_ref(), self.autosave.key()).await;
        }

        if let Some(json) = bootstrap.filter(|json| !json.trim().is_empty()) {
            match Board::from_json(json) {
                Ok(board) => {
                    log::info!("Loaded board from bootstrap data ({} strokes)", board.len());
                    return (board, LoadSource::Bootstrap);
                }
                Err(e) => log::warn!("Ignoring malformed bootstrap data: {}", e),
            }
        }

        match self.autosave.load_last().await {
            Some(board) => {
                log::info!("Restored autosaved board ({} strokes)", board.len());
                (board, LoadSource::LocalStore)
            }
            None => (Board::new(), LoadSource::Empty),
        }
    }

    /// Note a change at `now`; the write happens after the debounce window.
    pub fn schedule_autosave(&mut self, now: Instant) {
        self.autosave.schedule(now);
    }

    /// Perform the pending autosave if its window has elapsed.
    pub async fn flush_autosave(&mut self, board: &Board, now: Instant) -> bool {
        self.autosave.maybe_save(board, now).await
    }

    /// Remove the local autosave slot.
    pub async fn clear_local(&mut self) -> StorageResult<()> {
        self.autosave.clear().await
    }

    /// See [`RemoteSaver::save`].
    pub fn save_remote(&self, board: &Board, preview: &str) -> BoxFuture<'static, PersistResult<SaveOutcome>> {
        self.remote.save(board, preview)
    }

    pub fn is_saving(&self) -> bool {
        self.remote.is_saving()
    }
}
