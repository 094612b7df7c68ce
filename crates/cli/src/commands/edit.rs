// `quire edit`: change a document through a workspace session.
//
// Loads the workspace, selects the document, applies the edits and saves
// explicitly, the same path an interactive editor takes.

use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::Args;
use quire_client::session::{SessionHandle, WorkspaceSession};
use quire_client::view::{STATUS_SAVED, WorkspaceView};
use quire_client::workspace::{SaveOutcome, Workspace};
use serde::{Deserialize, Serialize};

use super::{block_on, resolve_content, Settings};
use crate::output::{self, OutputFormat};

#[derive(Debug, Args)]
pub struct EditArgs {
    /// Document id.
    pub id: String,

    /// New title.
    #[arg(long)]
    title: Option<String>,

    /// New Markdown content.
    #[arg(long, group = "content_source")]
    content: Option<String>,

    /// Read new content from a file.
    #[arg(long, value_name = "FILE", group = "content_source")]
    file: Option<PathBuf>,

    /// Force JSON output.
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EditResult {
    pub id: String,
    pub title: String,
    pub outcome: SaveOutcome,
    pub status: String,
    pub chars: usize,
}

#[derive(Debug)]
struct EditRequest {
    id: String,
    title: Option<String>,
    content: Option<String>,
}

pub fn run(args: EditArgs, settings: &Settings) -> anyhow::Result<()> {
    let format = OutputFormat::detect(args.json);
    let request = EditRequest {
        content: resolve_content(args.content, args.file.as_deref())?,
        title: args.title,
        id: args.id,
    };
    if request.title.is_none() && request.content.is_none() {
        bail!("nothing to change: pass --title, --content or --file");
    }

    match block_on(call_edit(settings, request)).and_then(|result| result) {
        Ok(result) => {
            if result.status != STATUS_SAVED {
                output::print_warning(
                    format,
                    "NOT_SAVED",
                    &format!("document ended in state `{}`", result.status),
                );
            }
            output::print_output(format, &result, format_human)?;
            Ok(())
        }
        Err(error) => {
            output::print_anyhow_error(format, &error);
            Err(error)
        }
    }
}

async fn call_edit(settings: &Settings, request: EditRequest) -> anyhow::Result<EditResult> {
    let workspace = Workspace::new(settings.api()?, settings.debounce);
    let session = WorkspaceSession::spawn(workspace);

    let result = edit_in_session(&session, request).await;
    let shutdown = session.shutdown().await;

    let result = result?;
    shutdown.context("workspace session did not shut down cleanly")?;
    Ok(result)
}

async fn edit_in_session(session: &SessionHandle, request: EditRequest) -> anyhow::Result<EditResult> {
    session.load().await.context("failed to load documents")?;

    let view = session.view().await?;
    if !is_active(&view, &request.id) && !session.switch_to(request.id.as_str()).await? {
        bail!("document `{}` not found", request.id);
    }

    if let Some(title) = request.title {
        session.edit_title(title).await?;
    }
    if let Some(content) = request.content {
        session.edit_content(content).await?;
    }

    let outcome = session.save().await?;
    session.settle().await?;
    let view = session.view().await?;

    Ok(to_result(&view, outcome))
}

fn is_active(view: &WorkspaceView, id: &str) -> bool {
    view.active.as_ref().is_some_and(|document| document.id == id)
}

fn to_result(view: &WorkspaceView, outcome: SaveOutcome) -> EditResult {
    EditResult {
        id: view.active.as_ref().map(|document| document.id.clone()).unwrap_or_default(),
        title: view.active.as_ref().map(|document| document.title.clone()).unwrap_or_default(),
        outcome,
        status: view.status_label.to_owned(),
        chars: view.char_count,
    }
}

fn format_human(result: &EditResult) -> String {
    format!("Edited {} ({}): {}, {} chars", result.id, result.title, result.status, result.chars)
}
