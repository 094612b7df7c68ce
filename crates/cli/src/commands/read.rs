// `quire read`: print one document.

use anyhow::Context;
use clap::Args;
use quire_client::api::DocumentApi;
use quire_client::view::{display_title, format_updated};
use quire_common::markdown::render_preview;
use quire_common::types::Document;
use serde::{Deserialize, Serialize};

use super::{block_on, Settings};
use crate::output::{self, OutputFormat};

#[derive(Debug, Args)]
pub struct ReadArgs {
    /// Document id.
    pub id: String,

    /// Print the rendered HTML preview instead of the Markdown source.
    #[arg(long)]
    html: bool,

    /// Force JSON output.
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreviewResult {
    pub id: String,
    pub title: String,
    pub html: String,
}

impl PreviewResult {
    fn of(document: &Document) -> Self {
        Self {
            id: document.id.clone(),
            title: display_title(&document.title).to_owned(),
            html: render_preview(&document.content),
        }
    }
}

pub fn run(args: ReadArgs, settings: &Settings) -> anyhow::Result<()> {
    let format = OutputFormat::detect(args.json);

    match block_on(call_read(settings, &args.id)).and_then(|result| result) {
        Ok(document) if args.html => {
            output::print_output(format, &PreviewResult::of(&document), |preview| preview.html.clone())?;
            Ok(())
        }
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

async fn call_read(settings: &Settings, id: &str) -> anyhow::Result<Document> {
    let api = settings.api()?;
    api.get(id).await.with_context(|| format!("failed to read document `{id}`"))
}

fn format_human(document: &Document) -> String {
    format!(
        "# {}\n{} · updated {}\n\n{}",
        display_title(&document.title),
        document.id,
        format_updated(&document.updated_at),
        document.content
    )
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;

    fn sample() -> Document {
        let at = Utc.with_ymd_and_hms(2026, 10, 18, 9, 30, 0).unwrap();
        Document {
            id: "doc-1".into(),
            title: "Plans".into(),
            content: "- ship it".into(),
            created_at: at,
            updated_at: at,
        }
    }

    #[test]
    fn human_format_has_title_header_and_body() {
        let output = format_human(&sample());
        assert!(output.starts_with("# Plans\n"));
        assert!(output.contains("doc-1"));
        assert!(output.ends_with("- ship it"));
    }

    #[test]
    fn json_format_uses_wire_shape() {
        let mut buf = Vec::new();
        output::write_output(&mut buf, OutputFormat::Json, &sample(), format_human).unwrap();
        let parsed: serde_json::Value = serde_json::from_slice(&buf).unwrap();
        assert_eq!(parsed["id"], "doc-1");
        assert_eq!(parsed["content"], "- ship it");
        assert_eq!(parsed["updatedAt"], "2026-10-18T09:30:00.000Z");
    }

    #[test]
    fn preview_renders_markdown_to_html() {
        let mut document = sample();
        document.content = "# Plans\n\n- [ ] ship it\n".into();

        let preview = PreviewResult::of(&document);
        assert_eq!(preview.title, "Plans");
        assert!(preview.html.contains("<h1>Plans</h1>"));
        assert!(preview.html.contains("type=\"checkbox\""));
    }
}
