mod app;
mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use app::{App, StoreArgs};

#[derive(Parser)]
#[command(
    name = "qnap-import",
    about = "Import QNAP Notes Station archives into Joplin",
    version
)]
struct Cli {
    /// Output format
    #[arg(long, global = true, default_value = "plain")]
    format: OutputFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Plain,
    Json,
}

#[derive(Subcommand)]
enum Command {
    /// List notebooks, sections and note counts without importing
    Preview {
        /// Notes Station export (.ns3)
        archive: PathBuf,
    },

    /// Import every notebook of an archive
    Import {
        /// Notes Station export (.ns3)
        archive: PathBuf,
        #[command(flatten)]
        store: StoreArgs,
    },

    /// Import a single note
    Probe {
        /// Notes Station export (.ns3)
        archive: PathBuf,
        /// Note location inside the archive, e.g. 1/4/2
        location: String,
        #[command(flatten)]
        store: StoreArgs,
    },

    /// Print a note as Markdown
    Show {
        /// Notes Station export (.ns3)
        archive: PathBuf,
        /// Note location inside the archive, e.g. 1/4/2
        location: String,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let cli = Cli::parse();

    match cli.command {
        Command::Preview { archive } => {
            let app = App::open(&archive)?;
            commands::preview::run(&app, &cli.format)?;
        }
        Command::Import { archive, store } => {
            let app = App::with_store(&archive, &store)?;
            commands::import::run(&app, &cli.format).await?;
        }
        Command::Probe {
            archive,
            location,
            store,
        } => {
            let app = App::with_store(&archive, &store)?;
            commands::probe::run(&app, &location, &cli.format).await?;
        }
        Command::Show { archive, location } => {
            let app = App::open(&archive)?;
            commands::show::run(&app, &location, &cli.format).await?;
        }
    }

    Ok(())
}
