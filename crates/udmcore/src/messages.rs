//! Non-fatal conditions reported by an object.
//!
//! Some failures do not abort an operation. A suppressed object-class
//! change, a child left behind by a cascading remove or a failed undo step
//! is logged and collected on the object instead. Callers read them with
//! [`DirectoryObject::take_messages`](crate::object::DirectoryObject::take_messages).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageLevel {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectMessage {
    pub level: MessageLevel,
    pub content: String,
}

impl ObjectMessage {
    pub fn info(content: impl Into<String>) -> Self {
        Self {
            level: MessageLevel::Info,
            content: content.into(),
        }
    }

    pub fn warning(content: impl Into<String>) -> Self {
        Self {
            level: MessageLevel::Warning,
            content: content.into(),
        }
    }

    pub fn error(content: impl Into<String>) -> Self {
        Self {
            level: MessageLevel::Error,
            content: content.into(),
        }
    }
}
