//! Purpose: Define a structured schema for non-fatal notices shown to the user.
//! Exports: `Notice`, `NoticeKind`, `notice_json`, `notice_time_now`.
//! Role: Transient notification contract between the controller/grid and the UI.
//! Invariants: Notices never alter row state; they only describe what happened.
//! Invariants: JSON schema is additive-only once published.
use crate::error::Error;
use serde_json::{Map, Value, json};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum NoticeKind {
    /// A store call failed; visible state was left unchanged.
    StoreError,
    /// An operation ran before the state it needs existed.
    Precondition,
    /// A row could not be identified and was left out of id-based operations.
    MalformedRow,
    /// A delete could not find its row and fell back to a full refresh.
    Fallback,
}

impl NoticeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            NoticeKind::StoreError => "store_error",
            NoticeKind::Precondition => "precondition",
            NoticeKind::MalformedRow => "malformed_row",
            NoticeKind::Fallback => "fallback",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub time: String,
    pub cmd: String,
    pub message: String,
    pub details: Map<String, Value>,
}

impl Notice {
    pub fn new(kind: NoticeKind, cmd: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            time: notice_time_now().unwrap_or_default(),
            cmd: cmd.into(),
            message: message.into(),
            details: Map::new(),
        }
    }

    pub fn from_error(kind: NoticeKind, cmd: impl Into<String>, err: &Error) -> Self {
        let message = err
            .message()
            .map(str::to_string)
            .unwrap_or_else(|| err.to_string());
        let mut notice = Self::new(kind, cmd, message);
        notice
            .details
            .insert("error_kind".to_string(), json!(format!("{:?}", err.kind())));
        if let Some(key) = err.key() {
            notice.details.insert("id".to_string(), json!(key.as_str()));
        }
        if let Some(status) = err.status() {
            notice.details.insert("status".to_string(), json!(status));
        }
        notice
    }

    pub fn with_detail(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.details.insert(name.to_string(), value.into());
        self
    }
}

pub fn notice_json(notice: &Notice) -> Value {
    let mut inner = Map::new();
    inner.insert("kind".to_string(), json!(notice.kind.as_str()));
    inner.insert("time".to_string(), json!(notice.time));
    inner.insert("cmd".to_string(), json!(notice.cmd));
    inner.insert("message".to_string(), json!(notice.message));
    inner.insert("details".to_string(), Value::Object(notice.details.clone()));

    let mut outer = Map::new();
    outer.insert("notice".to_string(), Value::Object(inner));
    Value::Object(outer)
}

pub fn notice_time_now() -> Option<String> {
    OffsetDateTime::now_utc().format(&Rfc3339).ok()
}
