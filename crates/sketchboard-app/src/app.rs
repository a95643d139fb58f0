//! Host shell wiring a session to persistence and rendering.

use crate::config::{AppConfig, AppConfigError};
use sketchboard_core::persistence::{
    CookieJar, HttpSaveTransport, LoadSource, PersistError, PersistenceBridge, RemoteSaver,
    SaveOutcome, SaveTransport, TransportError,
};
use sketchboard_core::storage::{AutoSaveManager, PlatformStorage, Storage, StorageError};
use sketchboard_core::{Command, FrameRequester, InputOutcome, KeyPress, PointerEvent, Session};
use sketchboard_render::{ExportOptions, RenderContext, Renderer, RendererError};
use std::sync::Arc;
use thiserror::Error;

#[cfg(not(target_arch = "wasm32"))]
use std::time::Instant;

#[cfg(target_arch = "wasm32")]
use web_time::Instant;

/// Errors surfaced to the host.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] AppConfigError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error(transparent)]
    Render(#[from] RendererError),
    #[error(transparent)]
    Persist(#[from] PersistError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid board JSON: {0}")]
    BoardFormat(#[from] serde_json::Error),
}

pub type AppResult<T> = Result<T, AppError>;

/// Main application struct.
///
/// Owns the drawing session and the persistence bridge. The host feeds it
/// input, calls [`App::tick`] regularly so debounced autosaves land, and
/// calls [`App::paint_frame`] when its frame callback fires.
pub struct App<S: Storage, T: SaveTransport + 'static> {
    config: AppConfig,
    session: Session,
    bridge: PersistenceBridge<S, T>,
}

/// The app with the platform's local store and the HTTP save endpoint.
pub type PlatformApp = App<PlatformStorage, HttpSaveTransport>;

impl<S: Storage, T: SaveTransport + 'static> App<S, T> {
    pub fn new(config: AppConfig, storage: Arc<S>, transport: T, requester: Box<dyn FrameRequester>) -> Self {
        let autosave = AutoSaveManager::from_config(storage, &config.engine);
        let remote = RemoteSaver::new(transport, config.login_url.clone());
        Self {
            session: Session::new(config.engine.clone(), requester),
            bridge: PersistenceBridge::new(autosave, remote),
            config,
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Direct access for tool and pen changes. Changes that need saving are
    /// picked up on the next [`App::tick`].
    pub fn session_mut(&mut self) -> &mut Session {
        &mut self.session
    }

    pub fn bridge(&self) -> &PersistenceBridge<S, T> {
        &self.bridge
    }

    /// Seed the session from bootstrap data, the local store, or nothing.
    pub async fn load(&mut self, bootstrap: Option<&str>, cookies: &mut dyn CookieJar) -> LoadSource {
        let (board, source) = self.bridge.load_initial(bootstrap, cookies).await;
        self.session.load_board(board);
        source
    }

    pub fn handle_pointer(&mut self, event: PointerEvent, now: Instant) -> InputOutcome {
        let outcome = self.session.handle_pointer(event);
        self.sync_autosave(now);
        outcome
    }

    pub fn handle_key(&mut self, press: &KeyPress, now: Instant) -> Option<Command> {
        let command = self.session.handle_key(press);
        self.sync_autosave(now);
        command
    }

    /// Clear the board and history. The empty board is autosaved.
    pub fn new_board(&mut self, now: Instant) {
        self.session.new_board();
        self.sync_autosave(now);
    }

    /// Write the autosave if its debounce window has elapsed.
    pub async fn tick(&mut self, now: Instant) -> bool {
        self.sync_autosave(now);
        self.bridge.flush_autosave(self.session.board(), now).await
    }

    /// Paint the scheduled frame into `renderer`.
    ///
    /// Returns false if no frame was scheduled.
    pub fn paint_frame<R: Renderer + ?Sized>(&mut self, renderer: &mut R) -> bool {
        if !self.session.begin_frame() {
            return false;
        }
        renderer.build_scene(&RenderContext::from_session(&self.session));
        self.session.finish_frame();
        true
    }

    /// Export size: the canvas when it has one, the configured size otherwise.
    pub fn export_options(&self) -> ExportOptions {
        let viewport = self.session.viewport();
        if viewport.backing_size() == (0, 0) {
            ExportOptions::new(self.config.export_width as f64, self.config.export_height as f64)
        } else {
            ExportOptions::from_viewport(viewport)
        }
    }

    /// Rasterize the committed strokes to PNG.
    pub fn export_png(&self) -> AppResult<Vec<u8>> {
        sketchboard_render::export_png(self.session.board(), &self.export_options()).map_err(|e| {
            log::error!("Export failed: {}", e);
            AppError::from(e)
        })
    }

    /// Upload the board with a PNG preview. The board is never modified.
    pub async fn save(&self) -> AppResult<SaveOutcome> {
        let preview = sketchboard_render::preview_data_url(self.session.board(), &self.export_options())?;
        let outcome = self.bridge.save_remote(self.session.board(), &preview).await?;
        match &outcome {
            SaveOutcome::Saved { url } => log::info!("Board saved at {}", url),
            SaveOutcome::LoginRequired { login_url } => log::info!("Save needs login at {}", login_url),
        }
        Ok(outcome)
    }

    pub fn is_saving(&self) -> bool {
        self.bridge.is_saving()
    }

    /// Write the board to the local store now, skipping the debounce.
    pub async fn save_local(&mut self) -> AppResult<()> {
        self.bridge.autosave_mut().save(self.session.board()).await?;
        Ok(())
    }

    /// Remove the local autosave slot.
    pub async fn clear_local(&mut self) -> AppResult<()> {
        self.bridge.clear_local().await?;
        Ok(())
    }

    fn sync_autosave(&mut self, now: Instant) {
        if self.session.take_autosave_request() {
            self.bridge.schedule_autosave(now);
        }
    }
}

impl PlatformApp {
    /// Build the app with the platform store and the configured endpoint.
    pub fn from_config(config: AppConfig, requester: Box<dyn FrameRequester>) -> AppResult<Self> {
        config.validate()?;
        let storage = platform_storage(&config)?;
        let transport = HttpSaveTransport::parse(&config.save_endpoint)?;
        Ok(Self::new(config, storage, transport, requester))
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn platform_storage(config: &AppConfig) -> Result<Arc<PlatformStorage>, StorageError> {
    match &config.storage_dir {
        Some(dir) => Ok(Arc::new(PlatformStorage::new(dir.clone())?)),
        None => sketchboard_core::storage::create_default_storage(),
    }
}

#[cfg(target_arch = "wasm32")]
fn platform_storage(_config: &AppConfig) -> Result<Arc<PlatformStorage>, StorageError> {
    sketchboard_core::storage::create_default_storage()
}
