// Document service client.
//
// `DocumentApi` is the seam the workspace state machine talks through;
// `HttpDocumentApi` is the production implementation over HTTP/JSON.

use std::future::Future;

use quire_common::protocol::{DataEnvelope, ErrorEnvelope, DOCS_PATH};
use quire_common::types::{Document, DocumentPatch};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::debug;
use url::Url;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("invalid server url `{0}`")]
    InvalidUrl(String),
    #[error("request to document service failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("document not found")]
    NotFound,
    #[error("document service responded {status}: {message}")]
    Status { status: u16, message: String },
    #[error("invalid response payload: {0}")]
    InvalidPayload(#[from] serde_json::Error),
    #[error("workspace session has shut down")]
    SessionClosed,
}

/// Operations the workspace needs from the document service.
pub trait DocumentApi: Send + Sync + 'static {
    fn list(&self) -> impl Future<Output = Result<Vec<Document>, ClientError>> + Send;

    fn get(&self, id: &str) -> impl Future<Output = Result<Document, ClientError>> + Send;

    fn create(
        &self,
        patch: &DocumentPatch,
    ) -> impl Future<Output = Result<Document, ClientError>> + Send;

    fn update(
        &self,
        id: &str,
        patch: &DocumentPatch,
    ) -> impl Future<Output = Result<Document, ClientError>> + Send;
}

/// `DocumentApi` over the HTTP service.
#[derive(Debug, Clone)]
pub struct HttpDocumentApi {
    http: reqwest::Client,
    base_url: Url,
}

impl HttpDocumentApi {
    pub fn new(base_url: Url) -> Self {
        Self { http: reqwest::Client::new(), base_url }
    }

    pub fn parse(base_url: &str) -> Result<Self, ClientError> {
        Url::parse(base_url)
            .map(Self::new)
            .map_err(|_| ClientError::InvalidUrl(base_url.to_owned()))
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn collection_url(&self) -> Result<Url, ClientError> {
        self.base_url.join(DOCS_PATH).map_err(|_| ClientError::InvalidUrl(self.base_url.to_string()))
    }

    fn document_url(&self, id: &str) -> Result<Url, ClientError> {
        let mut url = self.collection_url()?;
        url.path_segments_mut()
            .map_err(|_| ClientError::InvalidUrl(self.base_url.to_string()))?
            .push(id);
        Ok(url)
    }
}

impl DocumentApi for HttpDocumentApi {
    async fn list(&self) -> Result<Vec<Document>, ClientError> {
        let response = self.http.get(self.collection_url()?).send().await?;
        decode(response).await
    }

    async fn get(&self, id: &str) -> Result<Document, ClientError> {
        let response = self.http.get(self.document_url(id)?).send().await?;
        decode(response).await
    }

    async fn create(&self, patch: &DocumentPatch) -> Result<Document, ClientError> {
        let response = self.http.post(self.collection_url()?).json(patch).send().await?;
        decode(response).await
    }

    async fn update(&self, id: &str, patch: &DocumentPatch) -> Result<Document, ClientError> {
        let response = self.http.patch(self.document_url(id)?).json(patch).send().await?;
        decode(response).await
    }
}

async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ClientError> {
    let status = response.status();
    let url = response.url().clone();
    let body = response.bytes().await?;
    debug!(%url, status = status.as_u16(), bytes = body.len(), "document service responded");

    decode_body(status, &body)
}

fn decode_body<T: DeserializeOwned>(status: StatusCode, body: &[u8]) -> Result<T, ClientError> {
    if status == StatusCode::NOT_FOUND {
        return Err(ClientError::NotFound);
    }

    if !status.is_success() {
        let message = serde_json::from_slice::<ErrorEnvelope>(body)
            .map(|envelope| envelope.error)
            .unwrap_or_else(|_| status.canonical_reason().unwrap_or("unexpected status").to_owned());
        return Err(ClientError::Status { status: status.as_u16(), message });
    }

    let envelope: DataEnvelope<T> = serde_json::from_slice(body)?;
    Ok(envelope.data)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn api() -> HttpDocumentApi {
        HttpDocumentApi::parse("http://127.0.0.1:3000").unwrap()
    }

    #[test]
    fn urls_are_built_from_base() {
        assert_eq!(api().collection_url().unwrap().as_str(), "http://127.0.0.1:3000/api/docs");
        assert_eq!(
            api().document_url("abc-123").unwrap().as_str(),
            "http://127.0.0.1:3000/api/docs/abc-123"
        );
    }

    #[test]
    fn document_ids_are_percent_encoded() {
        let url = api().document_url("a/b c").unwrap();
        assert_eq!(url.path(), "/api/docs/a%2Fb%20c");
    }

    #[test]
    fn invalid_base_url_is_rejected() {
        assert!(matches!(HttpDocumentApi::parse("not a url"), Err(ClientError::InvalidUrl(_))));
    }

    #[test]
    fn not_found_maps_to_not_found() {
        let body = json!({"error": "Document not found."}).to_string();
        let result = decode_body::<Document>(StatusCode::NOT_FOUND, body.as_bytes());
        assert!(matches!(result, Err(ClientError::NotFound)));
    }

    #[test]
    fn error_envelope_message_is_preserved() {
        let body = json!({"error": "No fields were provided for update."}).to_string();
        match decode_body::<Document>(StatusCode::BAD_REQUEST, body.as_bytes()) {
            Err(ClientError::Status { status, message }) => {
                assert_eq!(status, 400);
                assert_eq!(message, "No fields were provided for update.");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn non_json_error_body_falls_back_to_reason() {
        match decode_body::<Document>(StatusCode::BAD_GATEWAY, b"<html>") {
            Err(ClientError::Status { message, .. }) => assert_eq!(message, "Bad Gateway"),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn malformed_success_payload_is_invalid() {
        let body = json!({"data": {"id": 1}}).to_string();
        let result = decode_body::<Document>(StatusCode::OK, body.as_bytes());
        assert!(matches!(result, Err(ClientError::InvalidPayload(_))));
    }

    #[test]
    fn data_envelope_is_unwrapped() {
        let body = json!({"data": [{
            "id": "d1",
            "title": "T",
            "content": "",
            "createdAt": "2026-10-18T09:30:00.000Z",
            "updatedAt": "2026-10-18T09:31:00.000Z"
        }]})
        .to_string();
        let docs = decode_body::<Vec<Document>>(StatusCode::OK, body.as_bytes()).unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].id, "d1");
    }
}
