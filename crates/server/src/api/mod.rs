// HTTP API surface for documents.

pub mod documents;

use axum::Router;

use crate::store::DocumentStore;

#[derive(Clone)]
pub struct ApiState {
    pub store: DocumentStore,
}

impl ApiState {
    pub fn new(store: DocumentStore) -> Self {
        Self { store }
    }
}

pub fn router(store: DocumentStore) -> Router {
    documents::router(ApiState::new(store))
}
