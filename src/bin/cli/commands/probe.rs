use anyhow::{Context, Result};

use qnap_import::import::Importer;
use qnap_import::qnap::Location;

use crate::app::App;
use crate::OutputFormat;

pub async fn run(app: &App, location: &str, format: &OutputFormat) -> Result<()> {
    let location = Location::new(location);
    let store = app.store().await?;
    let note = Importer::new(&app.archive, store.as_ref())
        .import_location(app.parent_folder(), &location)
        .await
        .with_context(|| format!("Import of note {} failed", location))?;

    match format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string_pretty(&serde_json::json!({
                    "location": location,
                    "id": note.id,
                    "title": note.title,
                }))?
            );
        }
        OutputFormat::Plain => println!("{} -> {} ({})", location, note.title, note.id),
    }

    Ok(())
}
