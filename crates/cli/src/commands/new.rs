// `quire new`: create a document.

use std::path::PathBuf;

use anyhow::Context;
use clap::Args;
use quire_client::api::DocumentApi;
use quire_common::types::{Document, DocumentPatch};

use super::{block_on, resolve_content, Settings};
use crate::output::{self, OutputFormat};

#[derive(Debug, Args)]
pub struct NewArgs {
    /// Title for the new document. Blank titles become "Untitled note".
    #[arg(long)]
    title: Option<String>,

    /// Initial Markdown content. Defaults to the welcome template.
    #[arg(long, group = "content_source")]
    content: Option<String>,

    /// Read initial content from a file.
    #[arg(long, value_name = "FILE", group = "content_source")]
    file: Option<PathBuf>,

    /// Force JSON output.
    #[arg(long)]
    json: bool,
}

pub fn run(args: NewArgs, settings: &Settings) -> anyhow::Result<()> {
    let format = OutputFormat::detect(args.json);
    let patch = DocumentPatch::new(args.title, resolve_content(args.content, args.file.as_deref())?);

    match block_on(call_new(settings, patch)).and_then(|result| result) {
        Ok(document) => {
            output::print_output(format, &document, format_human)?;
            Ok(())
        }
        Err(error) => {
            output::print_anyhow_error(format, &error);
            Err(error)
        }
    }
}

async fn call_new(settings: &Settings, patch: DocumentPatch) -> anyhow::Result<Document> {
    let api = settings.api()?;
    api.create(&patch).await.context("failed to create document")
}

fn format_human(document: &Document) -> String {
    format!("Created {} ({})", document.id, document.title)
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    #[test]
    fn human_format_shows_id_and_title() {
        let now = Utc::now();
        let document = Document {
            id: "0b5c".into(),
            title: "Notes".into(),
            content: String::new(),
            created_at: now,
            updated_at: now,
        };
        assert_eq!(format_human(&document), "Created 0b5c (Notes)");
    }
}
