//! Command-line entry point (native).

#[cfg(feature = "native")]
mod cli {
    use clap::{Parser, Subcommand};
    use sketchboard_app::{AppConfig, AppResult, PlatformApp};
    use sketchboard_core::persistence::{CookieMap, SaveOutcome};
    use sketchboard_core::{Board, ShortcutRegistry};
    use sketchboard_render::ExportOptions;
    use std::path::{Path, PathBuf};

    #[derive(Debug, Parser)]
    #[command(name = "sketchboard", version, about = "SketchBoard board tools")]
    pub struct Cli {
        /// JSON config file
        #[arg(short, long, global = true)]
        config: Option<PathBuf>,

        #[command(subcommand)]
        command: Commands,
    }

    #[derive(Debug, Subcommand)]
    enum Commands {
        /// Summarize a board file, or the local autosave
        Info { board: Option<PathBuf> },
        /// Render a board to PNG
        Export {
            board: Option<PathBuf>,
            #[arg(short, long)]
            output: PathBuf,
            #[arg(long)]
            width: Option<u32>,
            #[arg(long)]
            height: Option<u32>,
            #[arg(long, default_value_t = 1.0)]
            scale: f64,
        },
        /// Upload a board to the save endpoint
        Save { board: Option<PathBuf> },
        /// Replace the local autosave with a board file
        Import { board: PathBuf },
        /// Delete the local autosave
        Clear,
        /// List keyboard shortcuts
        Shortcuts,
    }

    pub async fn run(cli: Cli) -> AppResult<()> {
        let config = match &cli.config {
            Some(path) => AppConfig::load(path)?,
            None => AppConfig::default(),
        };
        let mut app = PlatformApp::from_config(config, Box::new(|| {}))?;

        match cli.command {
            Commands::Info { board } => {
                load(&mut app, board.as_deref()).await?;
                let board = app.session().board();
                let points: usize = board.paths().iter().map(|s| s.points().len()).sum();
                println!("strokes: {}", board.len());
                println!("points:  {}", points);
                match board.bounds() {
                    Some(b) => println!("bounds:  ({:.1}, {:.1}) - ({:.1}, {:.1})", b.x0, b.y0, b.x1, b.y1),
                    None => println!("bounds:  (empty)"),
                }
            }
            Commands::Export {
                board,
                output,
                width,
                height,
                scale,
            } => {
                load(&mut app, board.as_deref()).await?;
                let options = ExportOptions::new(
                    width.unwrap_or(app.config().export_width) as f64,
                    height.unwrap_or(app.config().export_height) as f64,
                )
                .with_scale(scale);
                let png = sketchboard_render::export_png(app.session().board(), &options)?;
                std::fs::write(&output, &png)?;
                println!("wrote {} ({} bytes)", output.display(), png.len());
            }
            Commands::Save { board } => {
                load(&mut app, board.as_deref()).await?;
                match app.save().await? {
                    SaveOutcome::Saved { url } => println!("{}", url),
                    SaveOutcome::LoginRequired { login_url } => {
                        println!("login required: {}", login_url)
                    }
                }
            }
            Commands::Import { board } => {
                load(&mut app, Some(&board)).await?;
                app.save_local().await?;
                println!("imported {} strokes", app.session().board().len());
            }
            Commands::Clear => {
                app.clear_local().await?;
                println!("local autosave cleared");
            }
            Commands::Shortcuts => ShortcutRegistry::print_all(),
        }
        Ok(())
    }

    /// Load `path` strictly, or fall back to the local autosave.
    async fn load(app: &mut PlatformApp, path: Option<&Path>) -> AppResult<()> {
        match path {
            Some(path) => {
                let json = std::fs::read_to_string(path)?;
                let board = Board::from_json(&json)?;
                app.session_mut().load_board(board);
            }
            None => {
                let source = app.load(None, &mut CookieMap::new()).await;
                log::info!("Using board from {:?}", source);
            }
        }
        Ok(())
    }
}

#[cfg(feature = "native")]
#[tokio::main(flavor = "current_thread")]
async fn main() {
    use clap::Parser;

    env_logger::init();
    log::info!("Starting SketchBoard");

    if let Err(e) = cli::run(cli::Cli::parse()).await {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}

#[cfg(not(feature = "native"))]
fn main() {
    panic!("Native feature not enabled. Use `cargo run --features native`");
}
