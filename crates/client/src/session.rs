// Workspace session: runs the state machine on one task.
//
// Commands arrive over an mpsc channel and are applied in order. Requests
// to the document service run on a `JoinSet` so edits keep flowing while
// a save or creation is in flight; their results are folded back in by
// the same loop. The loop also sleeps until the autosave deadline.

use std::sync::Arc;

use quire_common::types::Document;
use tokio::sync::{mpsc, oneshot};
use tokio::task::{JoinError, JoinSet};
use tokio::time::{sleep_until, Instant};
use tracing::{debug, error, info};

use crate::api::{ClientError, DocumentApi};
use crate::view::WorkspaceView;
use crate::workspace::{
    CreateOutcome, CreateStart, CreateTicket, Field, Pane, SaveOutcome, SaveStart, SaveTicket,
    SwitchStart, Workspace,
};

const COMMAND_BUFFER: usize = 64;

enum Command {
    Load { reply: oneshot::Sender<Result<(), ClientError>> },
    Edit { field: Field, value: String },
    Save { reply: oneshot::Sender<SaveOutcome> },
    Switch { id: String, reply: oneshot::Sender<bool> },
    Create { reply: oneshot::Sender<CreateOutcome> },
    SetPane { pane: Pane },
    DismissBanner,
    View { reply: oneshot::Sender<WorkspaceView> },
    Settle { reply: oneshot::Sender<()> },
    Shutdown { reply: oneshot::Sender<WorkspaceView> },
}

enum Completion {
    Save {
        ticket: SaveTicket,
        result: Result<Document, ClientError>,
        reply: Option<oneshot::Sender<SaveOutcome>>,
    },
    Create {
        flushed: Vec<(SaveTicket, Result<Document, ClientError>)>,
        result: Result<Document, ClientError>,
        reply: oneshot::Sender<CreateOutcome>,
    },
}

pub struct WorkspaceSession<A> {
    workspace: Workspace<A>,
    commands: mpsc::Receiver<Command>,
    requests: JoinSet<Completion>,
}

impl<A: DocumentApi> WorkspaceSession<A> {
    /// Spawn the session loop on the current runtime.
    ///
    /// The loop exits on `shutdown` or once every handle is dropped; either
    /// way pending edits are flushed first.
    pub fn spawn(workspace: Workspace<A>) -> SessionHandle {
        let (sender, commands) = mpsc::channel(COMMAND_BUFFER);
        let session = Self { workspace, commands, requests: JoinSet::new() };
        tokio::spawn(session.run());
        SessionHandle { commands: sender }
    }

    async fn run(mut self) {
        info!("workspace session started");

        loop {
            let deadline = self.workspace.next_autosave_deadline();

            tokio::select! {
                biased;

                _ = autosave_due(deadline) => self.fire_autosave(),

                Some(joined) = self.requests.join_next(), if !self.requests.is_empty() => {
                    self.apply(joined);
                }

                command = self.commands.recv() => match command {
                    Some(Command::Shutdown { reply }) => {
                        let view = self.shutdown().await;
                        let _ = reply.send(view);
                        return;
                    }
                    Some(command) => self.handle(command).await,
                    None => {
                        debug!("all session handles dropped");
                        self.shutdown().await;
                        return;
                    }
                },
            }
        }
    }

    async fn handle(&mut self, command: Command) {
        match command {
            Command::Load { reply } => {
                let result = self.workspace.load().await;
                let _ = reply.send(result);
            }
            Command::Edit { field, value } => {
                self.workspace.edit_at(field, value, Instant::now());
            }
            Command::Save { reply } => match self.workspace.begin_manual_save() {
                SaveStart::Dispatch(ticket) => self.spawn_save(ticket, Some(reply)),
                SaveStart::Settled(outcome) => {
                    let _ = reply.send(outcome);
                }
            },
            Command::Switch { id, reply } => {
                let switched = match self.workspace.select(&id, Instant::now()) {
                    SwitchStart::Switched(flushes) => {
                        for ticket in flushes {
                            self.spawn_save(ticket, None);
                        }
                        true
                    }
                    SwitchStart::Unchanged | SwitchStart::Unknown => false,
                };
                let _ = reply.send(switched);
            }
            Command::Create { reply } => match self.workspace.begin_create() {
                CreateStart::Dispatch(ticket) => self.spawn_create(ticket, reply),
                CreateStart::Busy => {
                    let _ = reply.send(CreateOutcome::Busy);
                }
            },
            Command::SetPane { pane } => self.workspace.set_pane(pane),
            Command::DismissBanner => self.workspace.dismiss_banner(),
            Command::View { reply } => {
                let _ = reply.send(self.workspace.view());
            }
            Command::Settle { reply } => {
                self.settle().await;
                let _ = reply.send(());
            }
            Command::Shutdown { .. } => {}
        }
    }

    fn fire_autosave(&mut self) {
        if let Some(SaveStart::Dispatch(ticket)) = self.workspace.begin_autosave(Instant::now()) {
            self.spawn_save(ticket, None);
        }
    }

    fn spawn_save(&mut self, ticket: SaveTicket, reply: Option<oneshot::Sender<SaveOutcome>>) {
        let api = self.workspace.api();
        self.requests.spawn(async move {
            let result = api.update(&ticket.doc_id, &ticket.patch).await;
            Completion::Save { ticket, result, reply }
        });
    }

    fn spawn_create(&mut self, ticket: CreateTicket, reply: oneshot::Sender<CreateOutcome>) {
        let api: Arc<A> = self.workspace.api();
        let CreateTicket { flushes, patch } = ticket;

        self.requests.spawn(async move {
            let mut flushed = Vec::with_capacity(flushes.len());
            for ticket in flushes {
                let result = api.update(&ticket.doc_id, &ticket.patch).await;
                flushed.push((ticket, result));
            }
            let result = api.create(&patch).await;
            Completion::Create { flushed, result, reply }
        });
    }

    fn apply(&mut self, joined: Result<Completion, JoinError>) {
        let completion = match joined {
            Ok(completion) => completion,
            Err(join_error) => {
                error!(?join_error, "document service request task failed");
                return;
            }
        };

        match completion {
            Completion::Save { ticket, result, reply } => self.finish_save(ticket, result, reply),
            Completion::Create { flushed, result, reply } => {
                for (ticket, result) in flushed {
                    self.finish_save(ticket, result, None);
                }
                let (outcome, flushes) = self.workspace.complete_create(result);
                for ticket in flushes {
                    self.spawn_save(ticket, None);
                }
                let _ = reply.send(outcome);
            }
        }
    }

    fn finish_save(
        &mut self,
        ticket: SaveTicket,
        result: Result<Document, ClientError>,
        reply: Option<oneshot::Sender<SaveOutcome>>,
    ) {
        let doc_id = ticket.doc_id.clone();
        let outcome = self.workspace.complete_save(ticket, result, Instant::now());

        if outcome == SaveOutcome::Resave {
            if let SaveStart::Dispatch(next) = self.workspace.begin_save(&doc_id) {
                self.spawn_save(next, reply);
                return;
            }
        }

        if let Some(reply) = reply {
            let _ = reply.send(outcome);
        }
    }

    /// Wait for every in-flight request, including follow-ups they trigger.
    async fn settle(&mut self) {
        while let Some(joined) = self.requests.join_next().await {
            self.apply(joined);
        }
    }

    async fn shutdown(&mut self) -> WorkspaceView {
        for ticket in self.workspace.begin_flush() {
            self.spawn_save(ticket, None);
        }
        self.settle().await;

        info!("workspace session stopped");
        self.workspace.view()
    }
}

async fn autosave_due(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

/// Cloneable handle to a running [`WorkspaceSession`].
#[derive(Debug, Clone)]
pub struct SessionHandle {
    commands: mpsc::Sender<Command>,
}

impl SessionHandle {
    async fn send(&self, command: Command) -> Result<(), ClientError> {
        self.commands.send(command).await.map_err(|_| ClientError::SessionClosed)
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<T>) -> Command,
    ) -> Result<T, ClientError> {
        let (reply, response) = oneshot::channel();
        self.send(build(reply)).await?;
        response.await.map_err(|_| ClientError::SessionClosed)
    }

    pub async fn load(&self) -> Result<(), ClientError> {
        self.request(|reply| Command::Load { reply }).await?
    }

    pub async fn edit_title(&self, value: impl Into<String>) -> Result<(), ClientError> {
        self.send(Command::Edit { field: Field::Title, value: value.into() }).await
    }

    pub async fn edit_content(&self, value: impl Into<String>) -> Result<(), ClientError> {
        self.send(Command::Edit { field: Field::Content, value: value.into() }).await
    }

    /// Save the active document now. Resolves once the service answers.
    pub async fn save(&self) -> Result<SaveOutcome, ClientError> {
        self.request(|reply| Command::Save { reply }).await
    }

    /// Resolves once the selection has moved; the flush of the document
    /// left behind may still be in flight.
    pub async fn switch_to(&self, id: impl Into<String>) -> Result<bool, ClientError> {
        let id = id.into();
        self.request(|reply| Command::Switch { id, reply }).await
    }

    pub async fn create(&self) -> Result<CreateOutcome, ClientError> {
        self.request(|reply| Command::Create { reply }).await
    }

    pub async fn set_pane(&self, pane: Pane) -> Result<(), ClientError> {
        self.send(Command::SetPane { pane }).await
    }

    pub async fn dismiss_banner(&self) -> Result<(), ClientError> {
        self.send(Command::DismissBanner).await
    }

    pub async fn view(&self) -> Result<WorkspaceView, ClientError> {
        self.request(|reply| Command::View { reply }).await
    }

    /// Wait until no request to the document service is in flight.
    pub async fn settle(&self) -> Result<(), ClientError> {
        self.request(|reply| Command::Settle { reply }).await
    }

    /// Flush pending edits and stop the session, returning the final view.
    pub async fn shutdown(&self) -> Result<WorkspaceView, ClientError> {
        self.request(|reply| Command::Shutdown { reply }).await
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::time::sleep;

    use super::*;
    use crate::autosave::DebounceConfig;
    use crate::view::{STATUS_PENDING, STATUS_SAVED, STATUS_SAVING};
    use crate::workspace::tests::{doc, FakeApi};
    use crate::workspace::SaveState;

    fn two_docs() -> Vec<Document> {
        vec![doc("a", "Alpha", "alpha body", 2), doc("b", "Beta", "beta body", 1)]
    }

    async fn started() -> (SessionHandle, Arc<FakeApi>) {
        let workspace = Workspace::new(FakeApi::with_documents(two_docs()), DebounceConfig::default());
        let api = workspace.api();
        let handle = WorkspaceSession::spawn(workspace);
        handle.load().await.unwrap();
        (handle, api)
    }

    #[tokio::test(start_paused = true)]
    async fn edits_within_window_coalesce_into_one_update() {
        let (handle, api) = started().await;

        handle.edit_content("one").await.unwrap();
        sleep(Duration::from_millis(300)).await;
        handle.edit_content("two").await.unwrap();
        sleep(Duration::from_millis(300)).await;
        handle.edit_content("three").await.unwrap();

        let view = handle.view().await.unwrap();
        assert_eq!(view.status_label, STATUS_SAVING);
        assert!(api.updates().is_empty());

        sleep(Duration::from_millis(1_000)).await;
        handle.settle().await.unwrap();

        let updates = api.updates();
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].1.content.as_deref(), Some("three"));

        let view = handle.view().await.unwrap();
        assert_eq!(view.save_state, SaveState::Saved);
        assert_eq!(view.status_label, STATUS_SAVED);
        assert!(!view.has_unsaved_changes);
    }

    #[tokio::test(start_paused = true)]
    async fn nothing_is_saved_before_the_window_elapses() {
        let (handle, api) = started().await;

        handle.edit_title("Alpha 2").await.unwrap();
        sleep(Duration::from_millis(700)).await;
        handle.settle().await.unwrap();

        assert!(api.updates().is_empty());
        assert!(handle.view().await.unwrap().has_unsaved_changes);
    }

    #[tokio::test(start_paused = true)]
    async fn manual_save_replies_after_the_service_answers() {
        let (handle, api) = started().await;

        handle.edit_content("now").await.unwrap();
        assert_eq!(handle.save().await.unwrap(), SaveOutcome::Saved);
        assert_eq!(api.updates().len(), 1);

        sleep(Duration::from_millis(2_000)).await;
        handle.settle().await.unwrap();
        assert_eq!(api.updates().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn switch_flushes_the_document_being_left() {
        let (handle, api) = started().await;

        handle.edit_content("pending").await.unwrap();
        assert!(handle.switch_to("b").await.unwrap());
        handle.settle().await.unwrap();

        let updates = api.updates();
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].0, "a");

        sleep(Duration::from_millis(2_000)).await;
        handle.settle().await.unwrap();
        assert_eq!(api.updates().len(), 1);

        let view = handle.view().await.unwrap();
        assert_eq!(view.active.map(|d| d.id), Some("b".to_owned()));
    }

    #[tokio::test(start_paused = true)]
    async fn create_flushes_and_activates_new_document() {
        let (handle, api) = started().await;

        handle.set_pane(Pane::Preview).await.unwrap();
        handle.edit_content("before create").await.unwrap();

        let CreateOutcome::Created(created) = handle.create().await.unwrap() else {
            panic!("expected a created document");
        };

        assert_eq!(api.updates().len(), 1);
        let view = handle.view().await.unwrap();
        assert_eq!(view.documents[0].id, created.id);
        assert_eq!(view.pane, Pane::Editor);
        assert!(!view.is_creating);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_flushes_pending_edits() {
        let (handle, api) = started().await;

        handle.edit_content("unsaved at exit").await.unwrap();
        let view = handle.shutdown().await.unwrap();

        assert_eq!(api.updates().len(), 1);
        assert!(!view.has_unsaved_changes);
        assert!(matches!(handle.view().await, Err(ClientError::SessionClosed)));
    }

    #[tokio::test(start_paused = true)]
    async fn failed_autosave_reports_failure_and_keeps_edit() {
        let (handle, api) = started().await;
        api.state.lock().unwrap().fail_updates = true;

        handle.edit_content("kept locally").await.unwrap();
        sleep(Duration::from_millis(900)).await;
        handle.settle().await.unwrap();

        let view = handle.view().await.unwrap();
        assert_eq!(view.save_state, SaveState::Error);
        assert_eq!(view.active.unwrap().content, "kept locally");
        assert!(view.has_unsaved_changes);

        api.state.lock().unwrap().fail_updates = false;
        assert_eq!(handle.save().await.unwrap(), SaveOutcome::Saved);
        assert_ne!(handle.view().await.unwrap().status_label, STATUS_PENDING);
    }
}
