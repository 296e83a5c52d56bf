use std::path::PathBuf;

use clap::{
    CommandFactory, Parser, Subcommand,
    builder::{
        Styles,
        styling::{AnsiColor, Effects},
    },
};
use clap_complete::{Shell, generate};
use tracing_subscriber::EnvFilter;

use sporldl::{
    cli,
    config::{self, AppConfig},
    error,
};

fn styles() -> Styles {
    Styles::styled()
        .header(AnsiColor::White.on_default() | Effects::BOLD)
        .usage(AnsiColor::White.on_default() | Effects::BOLD)
        .literal(AnsiColor::BrightBlue.on_default())
        .placeholder(AnsiColor::BrightGreen.on_default())
}

#[derive(Parser, Debug, Clone)]
#[clap(
  version = env!("CARGO_PKG_VERSION"),
  name=env!("CARGO_PKG_NAME"),
  bin_name=env!("CARGO_PKG_NAME"),
  author=env!("CARGO_PKG_AUTHORS"),
  about=env!("CARGO_PKG_DESCRIPTION"),
  styles=styles(),
)]
struct Cli {
    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Run the HTTP backend
    Serve(ServeOptions),

    /// Search YouTube for a track
    Search(SearchOptions),

    /// Download the audio of a single video
    Download(DownloadOptions),

    /// Get shell completions
    Completions(CompletionsOption),
}

#[derive(Parser, Debug, Clone)]
pub struct ServeOptions {
    /// Address to listen on (overrides SERVER_ADDRESS)
    #[clap(long)]
    pub addr: Option<String>,

    /// Where finished downloads are written (overrides DOWNLOADS_DIR)
    #[clap(long)]
    pub downloads_dir: Option<PathBuf>,
}

#[derive(Parser, Debug, Clone)]
pub struct SearchOptions {
    /// Track title
    pub title: String,

    /// Artist name
    #[clap(default_value = "")]
    pub artist: String,
}

#[derive(Parser, Debug, Clone)]
pub struct DownloadOptions {
    /// YouTube video id
    pub video_id: String,

    /// Title used for the output file name
    #[clap(default_value = "")]
    pub title: String,

    /// Where the file is written (overrides DOWNLOADS_DIR)
    #[clap(long)]
    pub downloads_dir: Option<PathBuf>,
}

#[derive(Parser, Debug, Clone)]
pub struct CompletionsOption {
    shell: Shell,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("sporldl=info,tower_http=info")),
        )
        .init();

    if let Err(e) = config::load_env().await {
        error!("Cannot load environment. Err: {}", e);
    }

    let cli = Cli::parse();

    let mut config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => error!("Invalid configuration. Err: {}", e),
    };

    match cli.command {
        Command::Serve(opt) => {
            if let Some(addr) = opt.addr {
                config.server_addr = addr;
            }
            if let Some(dir) = opt.downloads_dir {
                config.downloads_dir = dir;
            }
            cli::serve(config).await
        }
        Command::Search(opt) => cli::search(&config, &opt.title, &opt.artist).await,
        Command::Download(opt) => {
            if let Some(dir) = opt.downloads_dir {
                config.downloads_dir = dir;
            }
            cli::download(&config, &opt.video_id, &opt.title).await
        }
        Command::Completions(opt) => {
            let mut cmd = Cli::command_for_update();
            let name = cmd.get_name().to_string();
            generate(opt.shell, &mut cmd, name, &mut std::io::stdout())
        }
    }
}
