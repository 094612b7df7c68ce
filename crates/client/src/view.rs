// Read-only snapshot of what the workspace shows.

use chrono::{DateTime, Local, Utc};
use quire_common::markdown::render_preview;
use quire_common::types::{iso_millis, Document, DEFAULT_TITLE};
use serde::Serialize;

use crate::api::DocumentApi;
use crate::workspace::{Pane, SaveState, Workspace};

pub const STATUS_NO_DOCUMENT: &str = "no document selected";
pub const STATUS_SAVING: &str = "saving…";
pub const STATUS_FAILED: &str = "save failed";
pub const STATUS_PENDING: &str = "pending save";
pub const STATUS_SAVED: &str = "saved";

/// One row of the document list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentEntry {
    pub id: String,
    pub title: String,
    #[serde(serialize_with = "iso_millis::serialize")]
    pub updated_at: DateTime<Utc>,
    /// `updated_at` in local time, e.g. `10/18 09:30`.
    pub updated_label: String,
    pub is_active: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceView {
    pub documents: Vec<DocumentEntry>,
    pub active: Option<Document>,
    pub has_unsaved_changes: bool,
    pub status_label: &'static str,
    pub save_state: SaveState,
    pub is_loading: bool,
    pub is_creating: bool,
    pub banner: Option<String>,
    pub pane: Pane,
    /// Characters in the active document's content.
    pub char_count: usize,
    /// Rendered preview of the active document; `None` when there is
    /// nothing to show.
    pub preview_html: Option<String>,
}

/// Title as shown in the list: trimmed, or the placeholder when blank.
pub fn display_title(title: &str) -> &str {
    match title.trim() {
        "" => DEFAULT_TITLE,
        trimmed => trimmed,
    }
}

pub fn format_updated(at: &DateTime<Utc>) -> String {
    at.with_timezone(&Local).format("%m/%d %H:%M").to_string()
}

pub fn status_label(has_active: bool, save_state: SaveState, dirty: bool) -> &'static str {
    if !has_active {
        return STATUS_NO_DOCUMENT;
    }

    match save_state {
        SaveState::Saving => STATUS_SAVING,
        SaveState::Error => STATUS_FAILED,
        SaveState::Idle | SaveState::Saved if dirty => STATUS_PENDING,
        SaveState::Idle | SaveState::Saved => STATUS_SAVED,
    }
}

impl<A: DocumentApi> Workspace<A> {
    pub fn view(&self) -> WorkspaceView {
        let active = self.active_document().cloned();
        let dirty = self.has_unsaved_changes();

        WorkspaceView {
            documents: self
                .documents()
                .iter()
                .map(|document| DocumentEntry {
                    id: document.id.clone(),
                    title: display_title(&document.title).to_owned(),
                    updated_at: document.updated_at,
                    updated_label: format_updated(&document.updated_at),
                    is_active: self.active_id() == Some(document.id.as_str()),
                })
                .collect(),
            has_unsaved_changes: dirty,
            status_label: status_label(active.is_some(), self.save_state(), dirty),
            save_state: self.save_state(),
            is_loading: self.is_loading(),
            is_creating: self.is_creating(),
            banner: self.banner().map(str::to_owned),
            pane: self.pane(),
            char_count: active.as_ref().map_or(0, |document| document.content.chars().count()),
            preview_html: active
                .as_ref()
                .filter(|document| !document.content.is_empty())
                .map(|document| render_preview(&document.content)),
            active,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::autosave::DebounceConfig;
    use crate::workspace::tests::{doc, FakeApi};

    #[test]
    fn status_label_mapping() {
        assert_eq!(status_label(false, SaveState::Error, true), STATUS_NO_DOCUMENT);
        assert_eq!(status_label(true, SaveState::Saving, false), STATUS_SAVING);
        assert_eq!(status_label(true, SaveState::Error, true), STATUS_FAILED);
        assert_eq!(status_label(true, SaveState::Saved, true), STATUS_PENDING);
        assert_eq!(status_label(true, SaveState::Idle, true), STATUS_PENDING);
        assert_eq!(status_label(true, SaveState::Saved, false), STATUS_SAVED);
        assert_eq!(status_label(true, SaveState::Idle, false), STATUS_SAVED);
    }

    #[test]
    fn blank_titles_display_placeholder() {
        assert_eq!(display_title("   "), DEFAULT_TITLE);
        assert_eq!(display_title("  Plans "), "Plans");
    }

    #[tokio::test]
    async fn view_reflects_loaded_workspace() {
        let api = FakeApi::with_documents(vec![
            doc("a", "  ", "héllo", 2),
            doc("b", "Beta", "", 1),
        ]);
        let mut ws = Workspace::new(api, DebounceConfig::default());

        let before = ws.view();
        assert!(before.is_loading);
        assert_eq!(before.status_label, STATUS_NO_DOCUMENT);

        ws.load().await.unwrap();
        let view = ws.view();

        assert_eq!(view.documents.len(), 2);
        assert_eq!(view.documents[0].title, DEFAULT_TITLE);
        assert!(view.documents[0].is_active);
        assert!(!view.documents[1].is_active);
        assert_eq!(view.active.as_ref().map(|d| d.id.as_str()), Some("a"));
        assert_eq!(view.char_count, 5);
        assert_eq!(view.status_label, STATUS_SAVED);
        assert_eq!(view.pane, Pane::Editor);
        assert!(!view.documents[0].updated_label.is_empty());

        ws.edit_content("hello world");
        let view = ws.view();
        assert!(view.has_unsaved_changes);
        assert_eq!(view.status_label, STATUS_SAVING);
        assert_eq!(view.char_count, 11);
    }

    #[tokio::test]
    async fn preview_follows_active_content() {
        let api = FakeApi::with_documents(vec![
            doc("a", "Tasks", "- [x] done\n- [ ] todo\n", 2),
            doc("b", "Empty", "", 1),
        ]);
        let mut ws = Workspace::new(api, DebounceConfig::default());
        ws.load().await.unwrap();

        let preview = ws.view().preview_html.unwrap();
        assert_eq!(preview.matches("type=\"checkbox\"").count(), 2);

        ws.edit_content("| k | v |\n|---|---|\n| x | 1 |\n");
        assert!(ws.view().preview_html.unwrap().contains("<td>x</td>"));

        assert!(ws.switch_to("b").await);
        assert_eq!(ws.view().preview_html, None);
    }

    #[test]
    fn view_serializes_camel_case() {
        let ws = Workspace::new(FakeApi::default(), DebounceConfig::default());
        let value = serde_json::to_value(ws.view()).unwrap();

        assert_eq!(value["statusLabel"], STATUS_NO_DOCUMENT);
        assert_eq!(value["saveState"], "idle");
        assert_eq!(value["pane"], "editor");
        assert_eq!(value["isLoading"], true);
        assert!(value["previewHtml"].is_null());
    }
}
