//! Message texts and keyboards.

use std::collections::BTreeMap;

use crate::{
    callback::{Callback, Step},
    pager::CardView,
    reply::{Button, Keyboard, Reply},
    session::Mode,
    text_util::{MAX_MESSAGE_CHARS, split_into_chunks},
};

pub const HELP: &str = "Type a surname, a full name or a birth date to find a folder.\n\n\
Commands:\n\
/start - main menu\n\
/search - switch to search mode\n\
/cancel - leave AI mode\n\
/birthdays - today's birthdays\n\
/ask <question> - ask the AI a general question";

pub const ADMIN_HELP: &str = "Admin commands:\n\
/add_admin <user id> - grant access\n\
/remove_admin <user id> - revoke access\n\
/list_admins - show the access list\n\
/test_broadcast - send today's birthday broadcast to yourself";

fn on_off(enabled: bool) -> &'static str {
    if enabled { "on" } else { "off" }
}

fn back_to_start() -> Vec<Button> {
    vec![Button::new("Back to main menu", Callback::BackToStart)]
}

pub fn start_menu(mode: &Mode, broadcast_on: bool) -> Reply {
    let mode_line = match mode {
        Mode::Search => "Mode: search.".to_string(),
        Mode::AiContext { document } => format!(
            "Mode: AI, asking about {}. Use /cancel to go back to search.",
            document
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default()
        ),
    };
    let text = format!(
        "Hello! I find folders in the document catalog and answer questions about \
         their documents.\n\n{mode_line}\n\nType a name or birth date to search, or \
         pick an action below."
    );
    Reply::with_buttons(
        text,
        vec![
            vec![Button::new("Available surnames", Callback::ShowSurnames)],
            vec![Button::new("Who has a birthday today?", Callback::Birthdays)],
            vec![Button::new(
                format!("Broadcast settings (currently {})", on_off(broadcast_on)),
                Callback::Settings,
            )],
        ],
    )
}

pub fn settings_menu(broadcast_on: bool, schedule: &str) -> Reply {
    let toggle = if broadcast_on {
        "Turn broadcast off"
    } else {
        "Turn broadcast on"
    };
    Reply::with_buttons(
        format!(
            "Daily birthday broadcast\n\nStatus: {}\nTime: {schedule}",
            on_off(broadcast_on)
        ),
        vec![
            vec![Button::new(toggle, Callback::ToggleBroadcast)],
            back_to_start(),
        ],
    )
}

/// One disambiguation card.
pub fn card(query: &str, display_name: &str, summary: &str, view: &CardView) -> Reply {
    let text = format!(
        "Several records match '{query}' ({position}).\n\n\
         Name: {display_name}\n\n\
         Summary:\n{summary}",
        position = view.position(),
    );

    let prev = match view.prev {
        Some(index) => Button::new(
            "Previous",
            Callback::Card {
                step: Step::Prev,
                index,
            },
        ),
        None => Button::inert(" "),
    };
    let next = match view.next {
        Some(index) => Button::new(
            "Next",
            Callback::Card {
                step: Step::Next,
                index,
            },
        ),
        None => Button::inert(" "),
    };
    let buttons: Keyboard = vec![
        vec![prev, Button::inert(view.position()), next],
        vec![Button::new(
            "Open folder",
            Callback::SelectFolder { index: view.index },
        )],
    ];
    Reply::with_buttons(text, buttons)
}

/// Surnames grouped by category, two per row, split into message-sized
/// chunks.
pub fn surname_listing(by_category: &BTreeMap<String, Vec<String>>) -> Vec<String> {
    if by_category.values().all(Vec::is_empty) {
        return vec!["No surnames are available.".to_string()];
    }

    let mut text = String::from("Available surnames by category:");
    for (category, surnames) in by_category {
        if surnames.is_empty() {
            continue;
        }
        text.push_str("\n\n");
        text.push_str(&category.replace('_', " "));
        text.push(':');
        for pair in surnames.chunks(2) {
            text.push('\n');
            text.push_str(&pair.join(" | "));
        }
    }

    split_into_chunks(&text, MAX_MESSAGE_CHARS)
}

/// Today's birthday list with a report button per person.
pub fn birthday_list(people: &[(String, u64)]) -> Reply {
    if people.is_empty() {
        return Reply::with_buttons("Nobody has a birthday today.", vec![back_to_start()]);
    }

    let mut text = String::from("Today's birthdays:\n");
    let mut buttons: Keyboard = Vec::new();
    for (name, person) in people {
        text.push('\n');
        text.push_str(name);
        buttons.push(vec![Button::new(
            format!("Full report: {name}"),
            Callback::FullReport { person: *person },
        )]);
    }
    buttons.push(back_to_start());
    Reply::with_buttons(text, buttons)
}

/// Broadcast notice for one person.
pub fn birthday_notice(name: &str, person: u64) -> Reply {
    Reply::with_buttons(
        format!("Today is {name}'s birthday!"),
        vec![vec![Button::new(
            "Show full report",
            Callback::FullReport { person },
        )]],
    )
}

/// Plain-text rendering of replies for line-oriented transports.
///
/// Buttons are listed under their message with the payload that presses
/// them.
pub fn transcript(replies: &[Reply]) -> String {
    let mut out = Vec::with_capacity(replies.len());
    for reply in replies {
        let mut block = match reply {
            Reply::Text { text, .. } => text.clone(),
            Reply::Document { caption, path, .. } => {
                format!("[document] {caption} ({})", path.display())
            }
            Reply::Alert { text } => format!("[alert] {text}"),
        };
        for button in reply.buttons().iter().flatten() {
            if button.data == Callback::Noop.to_string() {
                continue;
            }
            block.push_str(&format!("\n  [{}] -> {}", button.label, button.data));
        }
        out.push(block);
    }
    out.join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pager;

    #[test]
    fn card_buttons_follow_affordances() {
        let matches = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        let view = pager::render(&matches, 0).unwrap();
        let reply = card("ivan", "Ivanov Petr", "Engineer.", &view);

        let rows = reply.buttons();
        assert_eq!(rows[0][0].data, "_");
        assert_eq!(rows[0][1].label, "1 / 3");
        assert_eq!(rows[0][2].data, "card:next:1");
        assert_eq!(rows[1][0].data, "select_folder:0");
        assert!(reply.body().contains("Ivanov Petr"));
        assert!(reply.body().contains("Engineer."));
    }

    #[test]
    fn surnames_two_per_row() {
        let by_category = BTreeMap::from([
            (
                "Group_A".to_string(),
                vec!["Ivanov".to_string(), "Petrov".to_string(), "Sidorov".to_string()],
            ),
            ("Other".to_string(), vec!["Orlov".to_string()]),
        ]);
        let chunks = surname_listing(&by_category);
        assert_eq!(chunks.len(), 1);
        assert_eq!(
            chunks[0],
            "Available surnames by category:\n\nGroup A:\nIvanov | Petrov\nSidorov\n\nOther:\nOrlov"
        );
    }

    #[test]
    fn long_listing_is_chunked() {
        let names: Vec<String> = (0..2000).map(|i| format!("Surname{i:04}")).collect();
        let by_category = BTreeMap::from([("Big".to_string(), names)]);
        let chunks = surname_listing(&by_category);
        assert!(chunks.len() > 1);
        assert!(chunks.iter().all(|c| c.chars().count() <= MAX_MESSAGE_CHARS));
    }

    #[test]
    fn empty_listing_has_notice() {
        assert_eq!(
            surname_listing(&BTreeMap::new()),
            vec!["No surnames are available.".to_string()]
        );
    }

    #[test]
    fn transcript_lists_pressable_buttons() {
        let replies = vec![
            Reply::with_buttons(
                "Pick",
                vec![vec![
                    Button::inert("1 / 2"),
                    Button::new("Open folder", Callback::SelectFolder { index: 0 }),
                ]],
            ),
            Reply::alert("Expired"),
        ];
        assert_eq!(
            transcript(&replies),
            "Pick\n  [Open folder] -> select_folder:0\n\n[alert] Expired"
        );
    }

    #[test]
    fn settings_menu_reflects_state() {
        let reply = settings_menu(false, "00:00 (UTC+03:00)");
        assert!(reply.body().contains("Status: off"));
        assert_eq!(reply.buttons()[0][0].label, "Turn broadcast on");
        assert_eq!(reply.buttons()[1][0].data, "back_to_start");
    }
}
