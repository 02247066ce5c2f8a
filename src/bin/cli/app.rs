use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use qnap_import::config::ImportConfig;
use qnap_import::qnap::QnapArchive;
use qnap_import::store::{JoplinClient, MemoryStore, NoteStore};

/// Destination options shared by the writing subcommands
#[derive(clap::Args, Debug, Clone)]
pub struct StoreArgs {
    /// Config file (default: <config dir>/qnap-import/config.toml)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Joplin Data API URL
    #[arg(long)]
    pub url: Option<String>,

    /// Joplin API token
    #[arg(long, env = "JOPLIN_TOKEN")]
    pub token: Option<String>,

    /// Destination folder id (default: top level)
    #[arg(long)]
    pub folder: Option<String>,

    /// Write to an in-memory store instead of Joplin
    #[arg(long)]
    pub dry_run: bool,
}

/// An opened archive plus the effective configuration
pub struct App {
    pub archive: QnapArchive,
    pub config: ImportConfig,
    dry_run: bool,
}

impl App {
    /// Open an archive without touching any configuration
    pub fn open(archive: &Path) -> Result<Self> {
        Ok(Self {
            archive: open_archive(archive)?,
            config: ImportConfig::default(),
            dry_run: true,
        })
    }

    /// Open an archive and resolve the destination from file and flags
    pub fn with_store(archive: &Path, args: &StoreArgs) -> Result<Self> {
        let mut config = ImportConfig::load_or_default(args.config.as_deref())?;
        if let Some(url) = &args.url {
            config.joplin.base_url = url.clone();
        }
        if let Some(token) = &args.token {
            config.joplin.token = Some(token.clone());
        }
        if let Some(folder) = &args.folder {
            config.import.parent_folder = folder.clone();
        }
        config.validate()?;

        Ok(Self {
            archive: open_archive(archive)?,
            config,
            dry_run: args.dry_run,
        })
    }

    pub fn parent_folder(&self) -> &str {
        &self.config.import.parent_folder
    }

    pub async fn store(&self) -> Result<Box<dyn NoteStore>> {
        if self.dry_run {
            log::info!("Dry run: writing to memory");
            return Ok(Box::new(MemoryStore::new()));
        }

        let joplin = &self.config.joplin;
        let client = JoplinClient::new(joplin.base_url.clone(), joplin.token.clone(), joplin.timeout())?;
        let reachable = client
            .ping()
            .await
            .with_context(|| format!("Joplin is not reachable at {}", joplin.base_url))?;
        if !reachable {
            anyhow::bail!("{} is not a Joplin clipper service", joplin.base_url);
        }
        Ok(Box::new(client))
    }
}

fn open_archive(path: &Path) -> Result<QnapArchive> {
    QnapArchive::open(path).with_context(|| format!("Cannot open archive {}", path.display()))
}
