use crate::demo::{run_demo, run_generate, DemoArgs, GenerateArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use outfit_ai::error::AppError;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "Outfit AI",
    about = "Compose weather- and occasion-appropriate outfits from a wardrobe",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Generate one outfit from a wardrobe export
    Generate(GenerateArgs),
    /// Run sample scenarios over the bundled wardrobe and print the healing trail
    Demo(DemoArgs),
}

#[derive(Args, Debug)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
    /// Wardrobe export to preload into the in-memory store
    #[arg(long)]
    pub(crate) wardrobe: Option<PathBuf>,
    /// Owner of the preloaded wardrobe
    #[arg(long, default_value = "demo")]
    pub(crate) user: String,
}

impl Default for ServeArgs {
    fn default() -> Self {
        Self {
            host: None,
            port: None,
            wardrobe: None,
            user: "demo".to_string(),
        }
    }
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Generate(args) => run_generate(args).await,
        Command::Demo(args) => run_demo(args).await,
    }
}
