// Workspace state machine.
//
// Holds the working copy of every loaded document, the active selection,
// the last-synced signature per document and the status shown to the
// user. Saves and creations are split into a synchronous `begin_*` half
// that decides what to send and a `complete_*` half that reconciles the
// server's answer, so a caller can keep accepting edits while a request
// is in flight. The async methods compose both halves around the network
// call for callers that are happy to wait.

use std::collections::HashMap;
use std::sync::Arc;

use quire_common::types::{
    sort_by_recency, Document, DocumentPatch, Signature, NEW_DOC_CONTENT, NEW_DOC_TITLE,
};
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::api::{ClientError, DocumentApi};
use crate::autosave::{AutosaveTimer, DebounceConfig};

pub const LOAD_ERROR_BANNER: &str = "Failed to load documents. Refresh to try again.";
pub const CREATE_ERROR_BANNER: &str = "Failed to create a document. Please try again later.";

/// Status of the most recent save attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SaveState {
    Idle,
    Saving,
    Saved,
    Error,
}

/// Which half of the workspace is visible on narrow screens.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Pane {
    #[default]
    Editor,
    Preview,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Title,
    Content,
}

/// A save that has been decided on but not yet sent.
#[derive(Debug, Clone)]
pub struct SaveTicket {
    pub(crate) doc_id: String,
    pub(crate) dispatched: Signature,
    pub(crate) patch: DocumentPatch,
}

impl SaveTicket {
    pub fn doc_id(&self) -> &str {
        &self.doc_id
    }

    pub fn patch(&self) -> &DocumentPatch {
        &self.patch
    }
}

#[derive(Debug)]
pub enum SaveStart {
    /// Resolved without a request.
    Settled(SaveOutcome),
    /// Send `patch` to the service, then hand the result to `complete_save`.
    Dispatch(SaveTicket),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SaveOutcome {
    /// The working copy already matched the server; nothing was sent.
    Clean,
    Saved,
    /// Saved, but the document was edited again while the request was in flight.
    Superseded,
    /// Saved, but a follow-up was requested for a document that is no longer
    /// active and is still dirty. The caller should save it again.
    Resave,
    /// A save for the same document is already in flight and will follow up.
    Deferred,
    Failed,
    /// The service no longer has the document; it was dropped locally.
    Removed,
    /// No such document in the working set, or no active document.
    Missing,
}

/// A creation that has been accepted but not yet sent.
#[derive(Debug)]
pub struct CreateTicket {
    pub(crate) flushes: Vec<SaveTicket>,
    pub(crate) patch: DocumentPatch,
}

#[derive(Debug)]
pub enum CreateStart {
    Busy,
    Dispatch(CreateTicket),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreateOutcome {
    Created(Document),
    /// Another creation is still running.
    Busy,
    Failed,
}

#[derive(Debug)]
pub enum SwitchStart {
    /// The target is already active.
    Unchanged,
    Unknown,
    /// Selection moved; the returned saves flush the documents left behind.
    Switched(Vec<SaveTicket>),
}

#[derive(Debug, Default)]
struct InFlight {
    follow_up: bool,
}

pub struct Workspace<A> {
    api: Arc<A>,
    documents: Vec<Document>,
    active_id: Option<String>,
    synced: HashMap<String, Signature>,
    in_flight: HashMap<String, InFlight>,
    autosave: AutosaveTimer,
    save_state: SaveState,
    pane: Pane,
    is_loading: bool,
    is_creating: bool,
    banner: Option<String>,
}

impl<A: DocumentApi> Workspace<A> {
    pub fn new(api: A, debounce: DebounceConfig) -> Self {
        Self {
            api: Arc::new(api),
            documents: Vec::new(),
            active_id: None,
            synced: HashMap::new(),
            in_flight: HashMap::new(),
            autosave: AutosaveTimer::new(debounce),
            save_state: SaveState::Idle,
            pane: Pane::Editor,
            is_loading: true,
            is_creating: false,
            banner: None,
        }
    }

    pub fn api(&self) -> Arc<A> {
        Arc::clone(&self.api)
    }

    // ── Accessors ──────────────────────────────────────────────────

    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    pub fn document(&self, id: &str) -> Option<&Document> {
        self.documents.iter().find(|document| document.id == id)
    }

    pub fn active_id(&self) -> Option<&str> {
        self.active_id.as_deref()
    }

    pub fn active_document(&self) -> Option<&Document> {
        self.active_id.as_deref().and_then(|id| self.document(id))
    }

    pub fn save_state(&self) -> SaveState {
        self.save_state
    }

    pub fn pane(&self) -> Pane {
        self.pane
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    pub fn is_creating(&self) -> bool {
        self.is_creating
    }

    pub fn banner(&self) -> Option<&str> {
        self.banner.as_deref()
    }

    /// True when the working copy differs from what the service last confirmed.
    pub fn is_dirty(&self, id: &str) -> bool {
        self.document(id)
            .is_some_and(|document| self.synced.get(id) != Some(&document.signature()))
    }

    pub fn has_unsaved_changes(&self) -> bool {
        self.active_id.as_deref().is_some_and(|id| self.is_dirty(id))
    }

    pub fn next_autosave_deadline(&self) -> Option<Instant> {
        self.autosave.next_deadline()
    }

    pub fn is_in_flight(&self, id: &str) -> bool {
        self.in_flight.contains_key(id)
    }

    pub fn set_pane(&mut self, pane: Pane) {
        self.pane = pane;
    }

    pub fn dismiss_banner(&mut self) {
        self.banner = None;
    }

    // ── Load ───────────────────────────────────────────────────────

    pub async fn load(&mut self) -> Result<(), ClientError> {
        self.is_loading = true;
        self.banner = None;

        let result = self.api.list().await;
        self.is_loading = false;

        match result {
            Ok(documents) => {
                self.replace_documents(documents);
                Ok(())
            }
            Err(error) => {
                warn!(%error, "failed to load documents");
                self.banner = Some(LOAD_ERROR_BANNER.to_owned());
                Err(error)
            }
        }
    }

    fn replace_documents(&mut self, documents: Vec<Document>) {
        self.synced = documents
            .iter()
            .map(|document| (document.id.clone(), document.signature()))
            .collect();
        self.active_id = documents.first().map(|document| document.id.clone());
        self.documents = documents;
        self.in_flight.clear();
        self.autosave.cancel();
        self.save_state = SaveState::Saved;

        info!(count = self.documents.len(), active = ?self.active_id, "workspace loaded");
    }

    // ── Edit ───────────────────────────────────────────────────────

    pub fn edit_title(&mut self, value: impl Into<String>) {
        self.edit_at(Field::Title, value.into(), Instant::now());
    }

    pub fn edit_content(&mut self, value: impl Into<String>) {
        self.edit_at(Field::Content, value.into(), Instant::now());
    }

    /// Apply an edit to the active document's working copy and re-evaluate
    /// the autosave timer. Ignored when nothing is active.
    pub fn edit_at(&mut self, field: Field, value: String, now: Instant) {
        let Some(id) = self.active_id.clone() else {
            return;
        };
        let Some(document) = self.documents.iter_mut().find(|document| document.id == id) else {
            return;
        };

        match field {
            Field::Title => document.title = value,
            Field::Content => document.content = value,
        }

        self.schedule_autosave(now);
    }

    /// Arm the debounce timer when the active document is dirty. A document
    /// edited back to its synced state drops its pending autosave.
    fn schedule_autosave(&mut self, now: Instant) {
        let Some(id) = self.active_id.clone() else {
            return;
        };

        if self.is_dirty(&id) {
            self.autosave.arm_at(&id, now);
            self.save_state = SaveState::Saving;
        } else if self.autosave.pending_doc() == Some(id.as_str()) {
            self.autosave.cancel();
            if !self.is_in_flight(&id) {
                self.save_state = SaveState::Saved;
            }
        }
    }

    // ── Save ───────────────────────────────────────────────────────

    pub fn begin_save(&mut self, id: &str) -> SaveStart {
        let Some(document) = self.document(id) else {
            return SaveStart::Settled(SaveOutcome::Missing);
        };

        let signature = document.signature();
        if self.synced.get(id) == Some(&signature) {
            self.save_state = SaveState::Saved;
            return SaveStart::Settled(SaveOutcome::Clean);
        }

        let patch = DocumentPatch::full(document.title.clone(), document.content.clone());

        if let Some(flight) = self.in_flight.get_mut(id) {
            debug!(doc_id = id, "save already in flight, queueing follow-up");
            flight.follow_up = true;
            return SaveStart::Settled(SaveOutcome::Deferred);
        }

        self.in_flight.insert(id.to_owned(), InFlight::default());
        self.save_state = SaveState::Saving;

        SaveStart::Dispatch(SaveTicket { doc_id: id.to_owned(), dispatched: signature, patch })
    }

    /// Reconcile the service's answer to a dispatched save.
    pub fn complete_save(
        &mut self,
        ticket: SaveTicket,
        result: Result<Document, ClientError>,
        now: Instant,
    ) -> SaveOutcome {
        let SaveTicket { doc_id, dispatched, .. } = ticket;
        let follow_up = self.in_flight.remove(&doc_id).is_some_and(|flight| flight.follow_up);

        let saved = match result {
            Ok(document) => document,
            Err(ClientError::NotFound) => {
                warn!(doc_id = %doc_id, "document disappeared from the service");
                self.remove_document(&doc_id);
                self.save_state = SaveState::Idle;
                return SaveOutcome::Removed;
            }
            Err(error) => {
                warn!(doc_id = %doc_id, %error, "failed to save document");
                self.save_state = SaveState::Error;
                return SaveOutcome::Failed;
            }
        };

        self.synced.insert(doc_id.clone(), saved.signature());

        let superseded = match self.documents.iter_mut().find(|document| document.id == doc_id) {
            Some(local) if local.signature() == dispatched => {
                *local = saved;
                false
            }
            Some(local) => {
                local.created_at = saved.created_at;
                local.updated_at = saved.updated_at;
                true
            }
            None => false,
        };

        sort_by_recency(&mut self.documents);
        self.save_state = SaveState::Saved;
        debug!(doc_id = %doc_id, superseded, "document saved");

        if !self.is_dirty(&doc_id) {
            return SaveOutcome::Saved;
        }

        if self.active_id.as_deref() == Some(doc_id.as_str()) {
            if self.autosave.pending_doc() != Some(doc_id.as_str()) {
                self.autosave.arm_at(&doc_id, now);
            }
            self.save_state = SaveState::Saving;
            SaveOutcome::Superseded
        } else if follow_up {
            SaveOutcome::Resave
        } else {
            SaveOutcome::Superseded
        }
    }

    fn remove_document(&mut self, id: &str) {
        self.documents.retain(|document| document.id != id);
        self.synced.remove(id);

        if self.autosave.pending_doc() == Some(id) {
            self.autosave.cancel();
        }
        if self.active_id.as_deref() == Some(id) {
            self.active_id = self.documents.first().map(|document| document.id.clone());
        }
    }

    /// Save `id` now, waiting for the service.
    pub async fn save(&mut self, id: &str) -> SaveOutcome {
        match self.begin_save(id) {
            SaveStart::Dispatch(ticket) => self.dispatch(ticket).await,
            SaveStart::Settled(outcome) => outcome,
        }
    }

    async fn dispatch(&mut self, mut ticket: SaveTicket) -> SaveOutcome {
        loop {
            let result = self.api.update(&ticket.doc_id, &ticket.patch).await;
            let doc_id = ticket.doc_id.clone();

            match self.complete_save(ticket, result, Instant::now()) {
                SaveOutcome::Resave => match self.begin_save(&doc_id) {
                    SaveStart::Dispatch(next) => ticket = next,
                    SaveStart::Settled(outcome) => return outcome,
                },
                outcome => return outcome,
            }
        }
    }

    /// Explicit save of the active document. Drops its pending autosave.
    pub fn begin_manual_save(&mut self) -> SaveStart {
        let Some(id) = self.active_id.clone() else {
            return SaveStart::Settled(SaveOutcome::Missing);
        };

        if self.autosave.pending_doc() == Some(id.as_str()) {
            self.autosave.cancel();
        }
        self.begin_save(&id)
    }

    pub async fn manual_save(&mut self) -> SaveOutcome {
        match self.begin_manual_save() {
            SaveStart::Dispatch(ticket) => self.dispatch(ticket).await,
            SaveStart::Settled(outcome) => outcome,
        }
    }

    /// Take the debounced save if its window has elapsed at `now`.
    pub fn begin_autosave(&mut self, now: Instant) -> Option<SaveStart> {
        let id = self.autosave.take_ready(now)?;
        Some(self.begin_save(&id))
    }

    pub async fn fire_autosave(&mut self, now: Instant) -> Option<SaveOutcome> {
        match self.begin_autosave(now)? {
            SaveStart::Dispatch(ticket) => Some(self.dispatch(ticket).await),
            SaveStart::Settled(outcome) => Some(outcome),
        }
    }

    /// Cancel the debounce timer and start saves for the document it was
    /// armed for and the active document.
    pub fn begin_flush(&mut self) -> Vec<SaveTicket> {
        let mut targets = Vec::with_capacity(2);
        if let Some(pending) = self.autosave.cancel() {
            targets.push(pending);
        }
        if let Some(active) = self.active_id.clone() {
            if !targets.contains(&active) {
                targets.push(active);
            }
        }

        targets
            .into_iter()
            .filter_map(|id| match self.begin_save(&id) {
                SaveStart::Dispatch(ticket) => Some(ticket),
                SaveStart::Settled(_) => None,
            })
            .collect()
    }

    pub async fn flush(&mut self) -> Vec<SaveOutcome> {
        let mut outcomes = Vec::new();
        for ticket in self.begin_flush() {
            outcomes.push(self.dispatch(ticket).await);
        }
        outcomes
    }

    // ── Switch ─────────────────────────────────────────────────────

    /// Move the selection to `id`. The document being left is flushed
    /// before the selection changes.
    pub fn select(&mut self, id: &str, now: Instant) -> SwitchStart {
        if self.active_id.as_deref() == Some(id) {
            return SwitchStart::Unchanged;
        }
        if self.document(id).is_none() {
            debug!(doc_id = id, "ignoring switch to unknown document");
            return SwitchStart::Unknown;
        }

        let flushes = self.begin_flush();
        self.active_id = Some(id.to_owned());
        self.save_state = SaveState::Idle;
        self.schedule_autosave(now);

        SwitchStart::Switched(flushes)
    }

    /// Switch to `id`, waiting for the flush of the document left behind.
    /// Returns false when the selection did not change.
    pub async fn switch_to(&mut self, id: &str) -> bool {
        match self.select(id, Instant::now()) {
            SwitchStart::Switched(flushes) => {
                for ticket in flushes {
                    self.dispatch(ticket).await;
                }
                true
            }
            SwitchStart::Unchanged | SwitchStart::Unknown => false,
        }
    }

    // ── Create ─────────────────────────────────────────────────────

    /// Accept a creation unless one is already running. Pending edits are
    /// flushed ahead of the create request.
    pub fn begin_create(&mut self) -> CreateStart {
        if self.is_creating {
            return CreateStart::Busy;
        }

        let flushes = self.begin_flush();
        self.is_creating = true;
        self.banner = None;

        CreateStart::Dispatch(CreateTicket {
            flushes,
            patch: DocumentPatch::full(NEW_DOC_TITLE, NEW_DOC_CONTENT),
        })
    }

    /// Reconcile the create response. Edits made to the previous document
    /// while the request was in flight come back as saves to dispatch.
    pub fn complete_create(
        &mut self,
        result: Result<Document, ClientError>,
    ) -> (CreateOutcome, Vec<SaveTicket>) {
        self.is_creating = false;

        match result {
            Ok(document) => {
                info!(doc_id = %document.id, "document created");
                let flushes = self.begin_flush();
                self.synced.insert(document.id.clone(), document.signature());
                self.active_id = Some(document.id.clone());
                self.documents.insert(0, document.clone());
                self.pane = Pane::Editor;
                self.save_state = SaveState::Saved;
                (CreateOutcome::Created(document), flushes)
            }
            Err(error) => {
                warn!(%error, "failed to create document");
                self.banner = Some(CREATE_ERROR_BANNER.to_owned());
                (CreateOutcome::Failed, Vec::new())
            }
        }
    }

    pub async fn create_document(&mut self) -> CreateOutcome {
        let CreateTicket { flushes, patch } = match self.begin_create() {
            CreateStart::Dispatch(ticket) => ticket,
            CreateStart::Busy => return CreateOutcome::Busy,
        };

        for ticket in flushes {
            self.dispatch(ticket).await;
        }

        let result = self.api.create(&patch).await;
        let (outcome, flushes) = self.complete_create(result);
        for ticket in flushes {
            self.dispatch(ticket).await;
        }
        outcome
    }
}
