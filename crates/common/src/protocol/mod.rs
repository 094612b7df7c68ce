// HTTP wire contract between the document service and its clients.
//
//   GET    /api/docs       → 200 { data: Document[] }
//   POST   /api/docs       → 201 { data: Document }
//   GET    /api/docs/{id}  → 200 { data: Document } | 404 { error }
//   PATCH  /api/docs/{id}  → 200 { data: Document } | 400 | 404 { error }

use serde::{Deserialize, Serialize};

pub const DOCS_PATH: &str = "/api/docs";
pub const HEALTH_PATH: &str = "/healthz";

pub const NO_UPDATE_FIELDS_MESSAGE: &str = "No fields were provided for update.";
pub const NOT_FOUND_MESSAGE: &str = "Document not found.";
pub const CREATE_FAILED_MESSAGE: &str = "Unable to create document.";
pub const UPDATE_FAILED_MESSAGE: &str = "Unable to update document.";
pub const LOAD_FAILED_MESSAGE: &str = "Unable to load documents.";

/// Path of a single document resource.
pub fn doc_path(id: &str) -> String {
    format!("{DOCS_PATH}/{id}")
}

/// Successful response body.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DataEnvelope<T> {
    pub data: T,
}

impl<T> DataEnvelope<T> {
    pub fn new(data: T) -> Self {
        Self { data }
    }
}

/// Failed response body.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorEnvelope {
    pub error: String,
}

impl ErrorEnvelope {
    pub fn new(error: impl Into<String>) -> Self {
        Self { error: error.into() }
    }
}
