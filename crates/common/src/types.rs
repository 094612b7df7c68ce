// Core domain types shared across all Quire crates.

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Title given to documents whose title is blank after trimming.
pub const DEFAULT_TITLE: &str = "Untitled note";

/// Title of the document materialized into an empty store.
pub const WELCOME_TITLE: &str = "Welcome";

/// Content used when a document is created without any content.
pub const WELCOME_CONTENT: &str = "# Welcome

This is your Markdown workspace.

- Edit on the left
- Preview on the right
- Changes are auto-saved to SQLite
";

/// Title the workspace client sends when the user asks for a new note.
pub const NEW_DOC_TITLE: &str = DEFAULT_TITLE;

/// Content the workspace client sends when the user asks for a new note.
pub const NEW_DOC_CONTENT: &str = "# New note\n\nStart writing your Markdown here.";

/// Separator between title and content inside a [`Signature`].
const SIGNATURE_SEPARATOR: char = '\u{1f}';

/// A Markdown note.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub id: String,
    pub title: String,
    pub content: String,
    #[serde(with = "iso_millis")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "iso_millis")]
    pub updated_at: DateTime<Utc>,
}

/// Timestamps on the wire are always `YYYY-MM-DDTHH:MM:SS.mmmZ`, so their
/// string order matches their time order.
pub mod iso_millis {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn format(at: &DateTime<Utc>) -> String {
        at.to_rfc3339_opts(SecondsFormat::Millis, true)
    }

    pub fn serialize<S: Serializer>(at: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format(at))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        DateTime::<Utc>::deserialize(deserializer)
    }
}

impl Document {
    pub fn signature(&self) -> Signature {
        Signature::of(&self.title, &self.content)
    }
}

/// A partial document mutation. `None` fields are left untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct DocumentPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

impl DocumentPatch {
    pub fn new(title: Option<String>, content: Option<String>) -> Self {
        Self { title, content }
    }

    /// Full replacement of both editable fields.
    pub fn full(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self { title: Some(title.into()), content: Some(content.into()) }
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.content.is_none()
    }

    /// Lenient request-body coercion.
    ///
    /// Only string-typed `title` and `content` survive. Fields of any other
    /// type are treated as absent, and a body that is not a JSON object
    /// yields an empty patch rather than an error.
    pub fn from_json(value: &Value) -> Self {
        let Some(object) = value.as_object() else {
            return Self::default();
        };

        let string_field = |name: &str| object.get(name).and_then(Value::as_str).map(str::to_owned);

        Self { title: string_field("title"), content: string_field("content") }
    }

    /// Parse a raw request body with the same leniency as [`Self::from_json`].
    /// Malformed JSON is treated as an empty object.
    pub fn from_body(bytes: &[u8]) -> Self {
        serde_json::from_slice::<Value>(bytes).map(|value| Self::from_json(&value)).unwrap_or_default()
    }
}

/// Composite of title and content at a point in time.
///
/// Two documents with equal signatures need no synchronization.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Signature(String);

impl Signature {
    pub fn of(title: &str, content: &str) -> Self {
        let mut raw = String::with_capacity(title.len() + content.len() + 1);
        raw.push_str(title);
        raw.push(SIGNATURE_SEPARATOR);
        raw.push_str(content);
        Self(raw)
    }
}

/// Trim a title, falling back to [`DEFAULT_TITLE`] when nothing is left.
pub fn normalize_title(title: Option<&str>) -> String {
    match title.map(str::trim) {
        Some(value) if !value.is_empty() => value.to_owned(),
        _ => DEFAULT_TITLE.to_owned(),
    }
}

/// Order documents most-recently-updated first.
pub fn sort_by_recency(documents: &mut [Document]) {
    documents.sort_by(|left, right| right.updated_at.cmp(&left.updated_at));
}

/// Current time truncated to the millisecond precision the store persists.
pub fn now_millis() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}
