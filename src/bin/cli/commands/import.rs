use anyhow::{Context, Result};

use qnap_import::import::Importer;

use crate::app::App;
use crate::OutputFormat;

pub async fn run(app: &App, format: &OutputFormat) -> Result<()> {
    let store = app.store().await?;
    let summary = Importer::new(&app.archive, store.as_ref())
        .import(app.parent_folder())
        .await
        .with_context(|| format!("Import of {} failed", app.archive.path().display()))?;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        OutputFormat::Plain => {
            println!(
                "Imported {} notebooks, {} sections, {} notes ({} tag links)",
                summary.notebooks, summary.sections, summary.notes, summary.tags
            );
        }
    }

    Ok(())
}
