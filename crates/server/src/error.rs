use std::future::Future;

use axum::{
    http::{header::HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use quire_common::protocol::{ErrorEnvelope, NOT_FOUND_MESSAGE, NO_UPDATE_FIELDS_MESSAGE};
use uuid::Uuid;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

tokio::task_local! {
    static REQUEST_ID: String;
}

/// Failure at the document HTTP boundary.
///
/// Rendered as `{ "error": "<message>" }`. Internal causes are logged and
/// never sent to the caller.
#[derive(Debug)]
pub enum ApiError {
    /// The update body carried no usable field.
    NoFields,
    NotFound,
    /// Storage failure, reported with a fixed operation-level message.
    Internal { message: &'static str, source: anyhow::Error },
}

impl ApiError {
    pub fn internal(message: &'static str, source: anyhow::Error) -> Self {
        Self::Internal { message, source }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::NoFields => StatusCode::BAD_REQUEST,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            Self::NoFields => NO_UPDATE_FIELDS_MESSAGE,
            Self::NotFound => NOT_FOUND_MESSAGE,
            Self::Internal { message, .. } => message,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let Self::Internal { message, source } = &self {
            tracing::error!(
                request_id = current_request_id().as_deref().unwrap_or("-"),
                error = ?source,
                "{message}"
            );
        }

        let mut response = (self.status(), Json(ErrorEnvelope::new(self.message()))).into_response();
        if let Some(request_id) = current_request_id() {
            attach_request_id_header(&mut response, &request_id);
        }
        response
    }
}

pub async fn with_request_id_scope<F>(request_id: String, future: F) -> F::Output
where
    F: Future,
{
    REQUEST_ID.scope(request_id, future).await
}

pub fn current_request_id() -> Option<String> {
    REQUEST_ID.try_with(Clone::clone).ok()
}

pub fn request_id_from_headers_or_generate(headers: &HeaderMap) -> String {
    headers
        .get(REQUEST_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.trim().is_empty())
        .map(ToOwned::to_owned)
        .unwrap_or_else(|| Uuid::new_v4().to_string())
}

pub fn attach_request_id_header(response: &mut Response, request_id: &str) {
    if let Ok(header) = HeaderValue::from_str(request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, header);
    }
}
