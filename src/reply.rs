use std::path::PathBuf;

use serde::Serialize;

use crate::{callback::Callback, handles::Handle};

/// Inline button: a label and the callback payload it sends back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Button {
    pub label: String,
    pub data: String,
}

impl Button {
    pub fn new(label: impl Into<String>, callback: Callback) -> Self {
        Self {
            label: label.into(),
            data: callback.to_string(),
        }
    }

    /// Inert button, used for labels and padding.
    pub fn inert(label: impl Into<String>) -> Self {
        Self::new(label, Callback::Noop)
    }
}

/// Rows of buttons.
pub type Keyboard = Vec<Vec<Button>>;

/// One outgoing message, in the order the transport should deliver it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Reply {
    Text {
        text: String,
        #[serde(skip_serializing_if = "Vec::is_empty")]
        buttons: Keyboard,
    },
    Document {
        handle: Handle,
        path: PathBuf,
        caption: String,
        #[serde(skip_serializing_if = "Vec::is_empty")]
        buttons: Keyboard,
    },
    /// Short notice attached to a button press rather than a new message.
    Alert { text: String },
}

impl Reply {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text {
            text: text.into(),
            buttons: Vec::new(),
        }
    }

    pub fn with_buttons(text: impl Into<String>, buttons: Keyboard) -> Self {
        Self::Text {
            text: text.into(),
            buttons,
        }
    }

    pub fn alert(text: impl Into<String>) -> Self {
        Self::Alert { text: text.into() }
    }

    /// Body text of a text or alert reply, caption of a document.
    pub fn body(&self) -> &str {
        match self {
            Self::Text { text, .. } | Self::Alert { text } => text,
            Self::Document { caption, .. } => caption,
        }
    }

    pub fn buttons(&self) -> &[Vec<Button>] {
        match self {
            Self::Text { buttons, .. } | Self::Document { buttons, .. } => buttons,
            Self::Alert { .. } => &[],
        }
    }
}
