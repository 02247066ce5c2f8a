use anyhow::Result;

use qnap_import::import::Importer;
use qnap_import::qnap::{Level, Location};
use qnap_import::store::MemoryStore;

use crate::app::App;
use crate::OutputFormat;

pub async fn run(app: &App, location: &str, format: &OutputFormat) -> Result<()> {
    let note = app.archive.note(&Location::new(location))?;
    // Resource links point at ids of a throwaway store
    let store = MemoryStore::new();
    let markdown = Importer::new(&app.archive, &store).convert_note(&note).await?;

    match format {
        OutputFormat::Json => {
            let tags: Vec<&str> = note.tags.iter().map(|t| t.name.as_str()).collect();
            println!(
                "{}",
                serde_json::to_string_pretty(&serde_json::json!({
                    "location": note.location,
                    "title": note.name(),
                    "created": note.times().created.map(|t| t.to_rfc3339()),
                    "updated": note.times().updated.map(|t| t.to_rfc3339()),
                    "tags": tags,
                    "markdown": markdown,
                }))?
            );
        }
        OutputFormat::Plain => {
            println!("{}", note.name());
            if !note.tags.is_empty() {
                let tags = note
                    .tags
                    .iter()
                    .map(|t| format!("#{}", t.name))
                    .collect::<Vec<_>>()
                    .join(" ");
                println!("{}", tags);
            }
            println!();
            print!("{}", markdown);
        }
    }

    Ok(())
}
