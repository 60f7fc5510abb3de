//! Console transport: one input per line on stdin, replies on stdout.

use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::info;

use crate::{
    bot::{Bot, Input},
    error::{self, Result},
    render,
    session::UserId,
};

const PROMPT: &str = "> ";

/// Classify one console line.
///
/// `!payload` presses a button, `/cmd args` is a command and anything
/// else is text. Blank lines yield nothing.
pub fn parse_line(line: &str) -> Option<Input> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    match line.strip_prefix('!') {
        Some(payload) => Some(Input::Callback(payload.trim().to_string())),
        None => Some(Input::from_message(line)),
    }
}

/// Run the console loop until stdin closes or `/quit` is entered.
pub async fn run(bot: Arc<Bot>, user: UserId) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    info!(user, "console chat started");
    stdout
        .write_all(
            format!(
                "Chatting as user {user}. Type /start for the menu, !<payload> to press a button, /quit to leave.\n{PROMPT}"
            )
            .as_bytes(),
        )
        .await?;
    stdout.flush().await?;

    while let Some(line) = lines.next_line().await? {
        let Some(input) = parse_line(&line) else {
            stdout.write_all(PROMPT.as_bytes()).await?;
            stdout.flush().await?;
            continue;
        };
        if matches!(&input, Input::Command { name, .. } if name == "quit") {
            break;
        }

        let replies = bot.handle(user, input).await;
        let mut out = render::transcript(&replies);
        out.push_str("\n\n");
        out.push_str(PROMPT);
        stdout.write_all(out.as_bytes()).await?;
        stdout.flush().await?;
    }

    info!(user, "console chat finished");
    Ok(())
}

/// Blocking entry point for the binary.
pub fn run_chat(bot: Bot, user: UserId) -> Result<()> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| {
            error::Error::Config(format!("failed to start tokio runtime: {e}"))
        })?;
    runtime.block_on(run(Arc::new(bot), user))
}
