// `quire ls`: list documents.

use anyhow::Context;
use clap::Args;
use quire_client::api::DocumentApi;
use quire_client::view::{display_title, format_updated};
use quire_common::types::Document;
use serde::{Deserialize, Serialize};

use super::{block_on, Settings};
use crate::output::{self, OutputFormat};

#[derive(Debug, Args)]
pub struct LsArgs {
    /// Force JSON output.
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LsResult {
    #[serde(default)]
    pub documents: Vec<Document>,
}

pub fn run(args: LsArgs, settings: &Settings) -> anyhow::Result<()> {
    let format = OutputFormat::detect(args.json);

    match block_on(call_ls(settings)).and_then(|result| result) {
        Ok(result) => {
            output::print_output(format, &result, format_human)?;
            Ok(())
        }
        Err(error) => {
            output::print_anyhow_error(format, &error);
            Err(error)
        }
    }
}

async fn call_ls(settings: &Settings) -> anyhow::Result<LsResult> {
    let api = settings.api()?;
    let documents = api.list().await.context("failed to list documents")?;
    Ok(LsResult { documents })
}

fn format_human(result: &LsResult) -> String {
    if result.documents.is_empty() {
        return "No documents.".into();
    }

    let mut lines = Vec::with_capacity(result.documents.len() + 1);
    lines.push(format!("{} document(s)", result.documents.len()));
    for document in &result.documents {
        lines.push(format!(
            "  {}  {}  (updated {})",
            document.id,
            display_title(&document.title),
            format_updated(&document.updated_at)
        ));
    }
    lines.join("\n")
}
