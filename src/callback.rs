use std::fmt;

use crate::handles::Handle;

/// Direction of a card navigation button.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Prev,
    Next,
}

impl Step {
    fn as_str(self) -> &'static str {
        match self {
            Self::Prev => "prev",
            Self::Next => "next",
        }
    }
}

/// Payload carried by a button press.
///
/// Payloads stay short: documents and people are referenced by handle,
/// cards by index into the session's pending matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Callback {
    /// Move the disambiguation card to `index`.
    Card { step: Step, index: usize },
    /// Resolve the folder at an index of the pending matches.
    SelectFolder { index: usize },
    /// Enter AI mode for a delivered document.
    AskAi { document: Handle },
    /// Deliver the full folder of a birthday person.
    FullReport { person: Handle },
    ShowSurnames,
    Settings,
    ToggleBroadcast,
    BackToStart,
    Birthdays,
    /// Inert buttons (position label, padding).
    Noop,
}

/// Malformed or unknown payload.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid callback payload: {0}")]
pub struct InvalidCallback(pub String);

impl Callback {
    /// Parse a payload such as `card:next:3` or `ask_ai|17`.
    ///
    /// # Examples
    ///
    /// ```
    /// use dossier::callback::Callback;
    ///
    /// use dossier::callback::Step;
    ///
    /// assert_eq!(
    ///     Callback::parse("card:prev:0"),
    ///     Ok(Callback::Card { step: Step::Prev, index: 0 })
    /// );
    /// assert_eq!(Callback::parse("ask_ai|7").unwrap().to_string(), "ask_ai|7");
    /// ```
    pub fn parse(data: &str) -> Result<Self, InvalidCallback> {
        let invalid = || InvalidCallback(data.to_string());

        let parsed = match data {
            "show_surnames" => Self::ShowSurnames,
            "settings" => Self::Settings,
            "toggle_broadcast" => Self::ToggleBroadcast,
            "back_to_start" => Self::BackToStart,
            "birthdays" => Self::Birthdays,
            "_" => Self::Noop,
            _ => {
                if let Some(rest) = data.strip_prefix("card:") {
                    let (step, index) = rest.split_once(':').ok_or_else(invalid)?;
                    let step = match step {
                        "prev" => Step::Prev,
                        "next" => Step::Next,
                        _ => return Err(invalid()),
                    };
                    Self::Card {
                        step,
                        index: index.parse().map_err(|_| invalid())?,
                    }
                } else if let Some(index) = data.strip_prefix("select_folder:") {
                    Self::SelectFolder {
                        index: index.parse().map_err(|_| invalid())?,
                    }
                } else if let Some(id) = data.strip_prefix("ask_ai|") {
                    Self::AskAi {
                        document: id.parse().map_err(|_| invalid())?,
                    }
                } else if let Some(id) = data.strip_prefix("full_report:") {
                    Self::FullReport {
                        person: id.parse().map_err(|_| invalid())?,
                    }
                } else {
                    return Err(invalid());
                }
            }
        };
        Ok(parsed)
    }
}

impl fmt::Display for Callback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Card { step, index } => write!(f, "card:{}:{index}", step.as_str()),
            Self::SelectFolder { index } => write!(f, "select_folder:{index}"),
            Self::AskAi { document } => write!(f, "ask_ai|{document}"),
            Self::FullReport { person } => write!(f, "full_report:{person}"),
            Self::ShowSurnames => f.write_str("show_surnames"),
            Self::Settings => f.write_str("settings"),
            Self::ToggleBroadcast => f.write_str("toggle_broadcast"),
            Self::BackToStart => f.write_str("back_to_start"),
            Self::Birthdays => f.write_str("birthdays"),
            Self::Noop => f.write_str("_"),
        }
    }
}
