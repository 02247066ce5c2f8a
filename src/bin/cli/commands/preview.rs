use anyhow::Result;

use qnap_import::import::preview_archive;

use crate::app::App;
use crate::OutputFormat;

pub fn run(app: &App, format: &OutputFormat) -> Result<()> {
    let preview = preview_archive(&app.archive)?;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&preview)?);
        }
        OutputFormat::Plain => {
            println!(
                "{}: {} notebooks, {} sections, {} notes",
                preview.suggested_name,
                preview.notebook_count,
                preview.section_count,
                preview.note_count
            );
            for notebook in &preview.notebooks {
                println!("  {}", notebook.name);
                for section in &notebook.sections {
                    println!("    {} ({} notes)", section.name, section.note_count);
                }
            }
            for warning in &preview.warnings {
                eprintln!("warning: {}", warning);
            }
        }
    }

    Ok(())
}
