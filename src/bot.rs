//! Conversation dispatcher.
//!
//! Transports turn incoming updates into [`Input`] values and deliver the
//! returned [`Reply`] values in order. Every request first passes the
//! access guard, then runs with the caller's session locked, so requests
//! of one user are handled one at a time.
//!
//! Handlers never fail: every error becomes a reply.

use std::{
    path::{Path, PathBuf},
    sync::Arc,
    time::Instant,
};

use chrono::NaiveDate;
use tracing::{debug, info, warn};

use crate::{
    access::{AccessGuard, Revocation},
    assistant::Assistant,
    birthdays::{BirthdayBook, broadcast_recipients},
    callback::Callback,
    catalog::CatalogIndex,
    config::Config,
    error::Result,
    handles::HandleTable,
    pager,
    rate_limit::RateLimiter,
    render,
    reply::{Button, Reply},
    selector::{FolderContentSelector, Selection, SummaryForm, SummaryLookup, megabytes},
    session::{SessionState, SessionStore, UserId},
    settings_db::SettingsDb,
    text_util::{MAX_MESSAGE_CHARS, split_into_chunks},
};

const SESSION_EXPIRED: &str = "This selection has expired. Please search again.";
const LINK_EXPIRED: &str = "This link has expired. Please search again.";
const DOCUMENT_GONE: &str = "The document was not found or has been deleted.";

/// One incoming update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    /// `/name args`; `name` is lowercase without the slash.
    Command { name: String, args: String },
    Text(String),
    /// A button press carrying its payload.
    Callback(String),
}

impl Input {
    /// Classify a chat message: a leading `/` makes it a command.
    ///
    /// A `@botname` suffix on the command name is dropped.
    pub fn from_message(message: &str) -> Self {
        let trimmed = message.trim();
        let Some(rest) = trimmed.strip_prefix('/') else {
            return Self::Text(trimmed.to_string());
        };
        let (name, args) = rest
            .split_once(char::is_whitespace)
            .unwrap_or((rest, ""));
        let name = name.split('@').next().unwrap_or(name);
        Self::Command {
            name: name.to_lowercase(),
            args: args.trim().to_string(),
        }
    }
}

pub struct Bot {
    catalog: Arc<CatalogIndex>,
    selector: Arc<FolderContentSelector>,
    documents: Arc<HandleTable<PathBuf>>,
    people: HandleTable<String>,
    sessions: SessionStore,
    access: AccessGuard,
    settings: Arc<SettingsDb>,
    limiter: RateLimiter,
    max_ai_document_mb: f64,
    birthdays: BirthdayBook,
    assistant: Arc<dyn Assistant>,
}

impl Bot {
    pub fn new(
        config: &Config,
        catalog: Arc<CatalogIndex>,
        settings: Arc<SettingsDb>,
        assistant: Arc<dyn Assistant>,
    ) -> Result<Self> {
        let selector = Arc::new(FolderContentSelector::new(
            config.document_root(),
            config.file_rules()?,
            config.folder_budget(),
        ));
        let access = AccessGuard::new(
            config.main_admin_id,
            config.whitelisted_user_ids.iter().copied(),
            Arc::clone(&settings),
        );

        Ok(Self {
            catalog,
            selector,
            documents: Arc::new(HandleTable::new()),
            people: HandleTable::new(),
            sessions: SessionStore::new(),
            access,
            settings,
            limiter: config.rate_limiter(),
            max_ai_document_mb: config.limits.max_document_size_mb_for_ai,
            birthdays: config.birthday_book()?,
            assistant,
        })
    }

    /// Load the catalog named by `config` and build the dispatcher.
    pub fn from_config(
        config: &Config,
        settings: Arc<SettingsDb>,
        assistant: Arc<dyn Assistant>,
    ) -> Result<Self> {
        let catalog = CatalogIndex::load(
            &config.file_list(),
            &config.base_folder_name,
            config.name_cleaner()?,
        )?;
        if catalog.is_empty() {
            warn!(
                file_list = %config.file_list().display(),
                base_folder = %config.base_folder_name,
                "catalog has no person folders"
            );
        }
        Self::new(config, Arc::new(catalog), settings, assistant)
    }

    pub fn catalog(&self) -> &CatalogIndex {
        &self.catalog
    }

    pub fn access(&self) -> &AccessGuard {
        &self.access
    }

    /// Handle one update from `user`.
    pub async fn handle(&self, user: UserId, input: Input) -> Vec<Reply> {
        match self.access.check(user) {
            Ok(true) => {}
            Ok(false) => {
                warn!(user, "access denied");
                return vec![denied(user)];
            }
            Err(e) => {
                warn!(user, error = %e, "access check failed, denying");
                return vec![denied(user)];
            }
        }

        let session = self.sessions.get_or_create(user, || self.seed_session(user));
        let mut session = session.lock().await;

        match input {
            Input::Command { name, args } => {
                self.on_command(user, &mut session, &name, &args).await
            }
            Input::Text(text) => self.on_text(user, &mut session, &text).await,
            Input::Callback(data) => self.on_callback(user, &mut session, &data).await,
        }
    }

    fn seed_session(&self, user: UserId) -> SessionState {
        let opt_in = self.settings.broadcast_or_default(user).unwrap_or_else(|e| {
            warn!(user, error = %e, "could not read broadcast preference");
            true
        });
        SessionState::new(opt_in)
    }

    async fn on_command(
        &self,
        user: UserId,
        session: &mut SessionState,
        name: &str,
        args: &str,
    ) -> Vec<Reply> {
        info!(user, command = name, "command");
        session.begin_command();

        match name {
            "start" => {
                session.cancel();
                vec![render::start_menu(session.mode(), session.broadcast_opt_in())]
            }
            "search" => {
                session.reset_to_search();
                vec![Reply::text(
                    "Search mode is on. Type a name to find a folder; use /start for the main menu.",
                )]
            }
            "cancel" => {
                session.cancel();
                vec![Reply::text("AI mode cancelled. Search mode is on.")]
            }
            "birthdays" => vec![self.birthday_list(self.birthdays.today())],
            "ask" => {
                if args.is_empty() {
                    return vec![Reply::text("Usage: /ask <question>")];
                }
                self.ask(user, session, None, args).await
            }
            "add_admin" | "remove_admin" | "list_admins" | "test_broadcast" => {
                if !self.access.is_main_admin(user) {
                    warn!(user, command = name, "admin command refused");
                    return vec![Reply::text("You are not allowed to run this command.")];
                }
                self.on_admin_command(user, name, args)
            }
            _ => {
                let mut help = render::HELP.to_string();
                if self.access.is_main_admin(user) {
                    help.push_str("\n\n");
                    help.push_str(render::ADMIN_HELP);
                }
                vec![Reply::text(help)]
            }
        }
    }

    fn on_admin_command(&self, user: UserId, name: &str, args: &str) -> Vec<Reply> {
        let target = || args.split_whitespace().next()?.parse::<UserId>().ok();

        let reply = match name {
            "add_admin" => match target() {
                None => Reply::text("Usage: /add_admin <user id>"),
                Some(id) => match self.access.grant(id, user) {
                    Ok(true) => {
                        info!(admin = user, user = id, "access granted");
                        Reply::text(format!("User {id} now has access."))
                    }
                    Ok(false) => Reply::text(format!("User {id} already has access.")),
                    Err(e) => storage_failure(&e),
                },
            },
            "remove_admin" => match target() {
                None => Reply::text("Usage: /remove_admin <user id>"),
                Some(id) => match self.access.revoke(id) {
                    Ok(Revocation::Removed) => {
                        info!(admin = user, user = id, "access revoked");
                        Reply::text(format!("User {id} no longer has access."))
                    }
                    Ok(Revocation::NotPresent) => {
                        Reply::text(format!("User {id} is not on the access list."))
                    }
                    Ok(Revocation::MainAdmin) => {
                        Reply::text("The main administrator cannot be removed.")
                    }
                    Ok(Revocation::Configured) => Reply::text(format!(
                        "User {id} is listed in the configuration file; remove it there."
                    )),
                    Err(e) => storage_failure(&e),
                },
            },
            "list_admins" => match self.access.access_list() {
                Ok(list) => {
                    let mut text = String::from("Access list:\n");
                    if let Some(admin) = self.access.main_admin() {
                        text.push_str(&format!("\nMain admin: {admin}"));
                    }
                    for id in list.iter().filter(|&&id| Some(id) != self.access.main_admin()) {
                        text.push_str(&format!("\n- {id}"));
                    }
                    if list.is_empty() {
                        text.push_str("\nNo other users.");
                    }
                    Reply::text(text)
                }
                Err(e) => storage_failure(&e),
            },
            _ => return self.test_broadcast(self.birthdays.today()),
        };
        vec![reply]
    }

    async fn on_text(&self, user: UserId, session: &mut SessionState, text: &str) -> Vec<Reply> {
        let query = text.trim();
        if let Some(document) = session.active_document().map(Path::to_path_buf) {
            if query.is_empty() {
                return vec![Reply::text("Please type your question about the document.")];
            }
            return self.ask(user, session, Some(document), query).await;
        }

        session.begin_command();
        if query.is_empty() {
            return vec![Reply::text(render::HELP)];
        }
        if self.catalog.is_empty() {
            return vec![Reply::text("The catalog is empty; nothing can be found.")];
        }

        let matches = self.catalog.search(query);
        info!(user, query, matches = matches.len(), "search");
        match matches.len() {
            0 => vec![Reply::text(format!(
                "No folder found for '{query}'. Try a surname, e.g. 'Ivanov'."
            ))],
            1 => self.open_folder(&matches[0]).await,
            _ => {
                let reply = self.card(query, &matches, 0).await;
                session.set_pending(query.to_string(), matches);
                reply.into_iter().collect()
            }
        }
    }

    async fn on_callback(
        &self,
        user: UserId,
        session: &mut SessionState,
        data: &str,
    ) -> Vec<Reply> {
        let callback = match Callback::parse(data) {
            Ok(callback) => callback,
            Err(e) => {
                warn!(user, error = %e, "rejected callback");
                return vec![Reply::alert("Invalid data.")];
            }
        };
        debug!(user, %callback, "callback");

        match callback {
            Callback::Noop => Vec::new(),
            Callback::Card { index, .. } => {
                let Some(pending) = session.pending() else {
                    return vec![Reply::alert(SESSION_EXPIRED)];
                };
                let Some(reply) = self.card(&pending.query, &pending.matches, index).await
                else {
                    return vec![Reply::alert("Invalid card index.")];
                };
                session.move_cursor(index);
                vec![reply]
            }
            Callback::SelectFolder { index } => {
                let Some(pending) = session.pending() else {
                    return vec![Reply::alert(SESSION_EXPIRED)];
                };
                if let Err(e) = pager::check_index(&pending.matches, index) {
                    warn!(user, error = %e, "folder selection rejected");
                    return vec![Reply::alert("Invalid selection.")];
                }
                let Some(pending) = session.take_pending() else {
                    return vec![Reply::alert(SESSION_EXPIRED)];
                };
                self.open_folder(&pending.matches[index]).await
            }
            Callback::AskAi { document } => {
                let Some(path) = self.documents.resolve(document) else {
                    warn!(user, handle = document, "stale document handle");
                    return vec![Reply::alert(LINK_EXPIRED)];
                };
                if !self.assistant.is_enabled() {
                    return vec![Reply::text("The AI assistant is disabled.")];
                }
                match tokio::fs::metadata(&path).await {
                    Ok(meta) if meta.is_file() => {}
                    Ok(_) => {
                        warn!(user, path = %path.display(), "AI document is not a file");
                        return vec![Reply::text(DOCUMENT_GONE)];
                    }
                    Err(e) => {
                        warn!(user, path = %path.display(), error = %e, "AI document missing");
                        return vec![Reply::text(DOCUMENT_GONE)];
                    }
                }
                let name = file_label(&path);
                info!(user, path = %path.display(), "AI mode entered");
                session.enter_ai(path);
                vec![Reply::text(format!(
                    "AI mode: ask questions about {name}. Use /cancel to go back to search."
                ))]
            }
            Callback::FullReport { person } => {
                let Some(name) = self.people.resolve(person) else {
                    warn!(user, handle = person, "stale person handle");
                    return vec![Reply::alert(LINK_EXPIRED)];
                };
                match self.catalog.find_folder_by_name(&name) {
                    Some(folder) => self.open_folder(folder).await,
                    None => {
                        warn!(user, name, "no folder for birthday entry");
                        vec![Reply::text(format!("No folder found for {name}."))]
                    }
                }
            }
            Callback::ShowSurnames => render::surname_listing(self.catalog.surnames_by_category())
                .into_iter()
                .map(Reply::text)
                .collect(),
            Callback::Settings => vec![render::settings_menu(
                session.broadcast_opt_in(),
                &self.birthdays.schedule_label(),
            )],
            Callback::ToggleBroadcast => {
                let enabled = session.toggle_broadcast();
                if let Err(e) = self.settings.set_broadcast(user, enabled) {
                    warn!(user, error = %e, "could not store broadcast preference");
                }
                info!(user, enabled, "broadcast preference changed");
                vec![render::settings_menu(enabled, &self.birthdays.schedule_label())]
            }
            Callback::BackToStart => {
                vec![render::start_menu(session.mode(), session.broadcast_opt_in())]
            }
            Callback::Birthdays => vec![self.birthday_list(self.birthdays.today())],
        }
    }

    /// Card at `index`, or `None` when the index is out of range.
    async fn card(&self, query: &str, matches: &[String], index: usize) -> Option<Reply> {
        let view = match pager::render(matches, index) {
            Ok(view) => view,
            Err(e) => {
                debug!(error = %e, "card not rendered");
                return None;
            }
        };
        let summary = match self.short_summary(&view.folder).await {
            SummaryLookup::Found(summary) => summary.text,
            SummaryLookup::Blank(_) => "The summary file is empty.".to_string(),
            SummaryLookup::Missing => "Summary not found.".to_string(),
            SummaryLookup::Unreadable { .. } => "Could not read the summary file.".to_string(),
        };
        let display_name = self.catalog.display_name(&view.folder);
        Some(render::card(query, &display_name, &summary, &view))
    }

    /// Short summary of `folder`, read on the blocking pool.
    async fn short_summary(&self, folder: &str) -> SummaryLookup {
        let selector = Arc::clone(&self.selector);
        let catalog = Arc::clone(&self.catalog);
        let owned = folder.to_string();
        tokio::task::spawn_blocking(move || {
            selector.read_summary(&catalog, &owned, SummaryForm::Short)
        })
        .await
        .unwrap_or_else(|e| {
            warn!(folder, error = %e, "summary read task failed");
            SummaryLookup::Unreadable {
                path: PathBuf::from(folder),
                error: e.to_string(),
            }
        })
    }

    /// Everything delivered for a resolved folder.
    async fn open_folder(&self, folder: &str) -> Vec<Reply> {
        let selector = Arc::clone(&self.selector);
        let catalog = Arc::clone(&self.catalog);
        let documents = Arc::clone(&self.documents);
        let owned = folder.to_string();
        let selection = tokio::task::spawn_blocking(move || {
            selector.select(&catalog, &owned, &documents)
        })
        .await;

        let contents = match selection {
            Err(e) => {
                warn!(folder, error = %e, "folder selection task failed");
                return vec![Reply::text("Could not open the folder. Please try again.")];
            }
            Ok(Selection::Empty { display_name, .. }) => {
                return vec![Reply::text(format!(
                    "The folder of {display_name} holds no summary and no documents."
                ))];
            }
            Ok(Selection::Contents(contents)) => contents,
        };
        info!(
            folder,
            documents = contents.documents.len(),
            truncated = !contents.truncation_notices.is_empty(),
            "folder delivered"
        );

        let mut replies = vec![Reply::text(format!("Folder: {}", contents.display_name))];
        match (&contents.summary, &contents.summary_error) {
            (Some(summary), _) => replies.extend(
                split_into_chunks(&summary.text, MAX_MESSAGE_CHARS)
                    .into_iter()
                    .map(Reply::text),
            ),
            (None, Some(error)) => replies.push(Reply::text(error.clone())),
            (None, None) => replies.push(Reply::text("Summary not found.")),
        }

        for document in &contents.documents {
            replies.push(Reply::Document {
                handle: document.handle,
                path: document.path.clone(),
                caption: document.display_name.clone(),
                buttons: vec![vec![Button::new(
                    "Ask AI about this document",
                    Callback::AskAi {
                        document: document.handle,
                    },
                )]],
            });
        }
        replies.extend(contents.truncation_notices.iter().cloned().map(Reply::text));
        replies
    }

    /// Put `question` to the assistant, about `document` when given.
    async fn ask(
        &self,
        user: UserId,
        session: &mut SessionState,
        document: Option<PathBuf>,
        question: &str,
    ) -> Vec<Reply> {
        if !self.assistant.is_enabled() {
            return vec![Reply::text("The AI assistant is disabled.")];
        }

        if !self.limiter.allow(session.ai_requests_mut(), Instant::now()) {
            warn!(user, limit = self.limiter.max_per_window(), "AI rate limit exceeded");
            session.reset_to_search();
            return vec![Reply::text(format!(
                "AI request limit exceeded (at most {} per minute). Search mode is on again; \
                 try again in a minute.",
                self.limiter.max_per_window()
            ))];
        }

        if let Some(path) = &document {
            match tokio::fs::metadata(path).await.map(|meta| megabytes(meta.len())) {
                Ok(size) if size > self.max_ai_document_mb => {
                    warn!(user, path = %path.display(), size_mb = size, "document too large for AI");
                    self.limiter.refund(session.ai_requests_mut());
                    session.reset_to_search();
                    return vec![Reply::text(format!(
                        "The document is {size:.2} MB, over the AI limit of {} MB. \
                         Search mode is on again.",
                        self.max_ai_document_mb
                    ))];
                }
                Ok(_) => {}
                Err(e) => {
                    warn!(user, path = %path.display(), error = %e, "AI document unavailable");
                    self.limiter.refund(session.ai_requests_mut());
                    session.reset_to_search();
                    return vec![Reply::text(
                        "The document is no longer available. Search mode is on again.",
                    )];
                }
            }
        }

        info!(user, with_document = document.is_some(), "AI question");
        match self.assistant.ask(document.as_deref(), question).await {
            Ok(Some(answer)) => {
                let header = if document.is_some() {
                    "AI answer about the document:"
                } else {
                    "AI answer:"
                };
                std::iter::once(Reply::text(header))
                    .chain(
                        split_into_chunks(&answer, MAX_MESSAGE_CHARS)
                            .into_iter()
                            .map(Reply::text),
                    )
                    .collect()
            }
            Ok(None) => {
                warn!(user, "AI returned no answer");
                session.reset_to_search();
                vec![Reply::text(
                    "The AI could not produce an answer. Search mode is on again.",
                )]
            }
            Err(e) => {
                warn!(user, error = %e, "AI request failed");
                vec![Reply::text(format!(
                    "The AI assistant failed: {e}. You can ask again."
                ))]
            }
        }
    }

    fn birthday_list(&self, date: NaiveDate) -> Reply {
        let people: Vec<(String, u64)> = self
            .birthdays
            .on(date)
            .into_iter()
            .map(|name| (name.to_string(), self.people.allocate(name.to_string())))
            .collect();
        render::birthday_list(&people)
    }

    /// Birthday notices for `date`, one per person with a folder.
    pub fn birthday_notices(&self, date: NaiveDate) -> Vec<Reply> {
        self.birthdays
            .on(date)
            .into_iter()
            .filter(|name| {
                let found = self.catalog.find_folder_by_name(name).is_some();
                if !found {
                    warn!(name, "no folder for birthday entry, notice skipped");
                }
                found
            })
            .map(|name| render::birthday_notice(name, self.people.allocate(name.to_string())))
            .collect()
    }

    /// The daily broadcast for `date`: each recipient with its notices.
    ///
    /// Recipients are the authorized users that have not opted out.
    pub fn broadcast(&self, date: NaiveDate) -> Result<Vec<(UserId, Vec<Reply>)>> {
        if self.birthdays.on(date).is_empty() {
            info!(%date, "no birthdays, nothing to broadcast");
            return Ok(Vec::new());
        }

        let mut authorized = self.access.access_list()?;
        authorized.extend(self.access.main_admin());
        let recipients = broadcast_recipients(authorized, |user| {
            self.settings.broadcast_or_default(user).unwrap_or_else(|e| {
                warn!(user, error = %e, "could not read broadcast preference");
                false
            })
        });

        info!(%date, recipients = recipients.len(), "broadcast prepared");
        Ok(recipients
            .into_iter()
            .map(|user| (user, self.birthday_notices(date)))
            .collect())
    }

    fn test_broadcast(&self, date: NaiveDate) -> Vec<Reply> {
        let names = self.birthdays.on(date);
        if names.is_empty() {
            return vec![Reply::text("Test finished: nobody has a birthday today.")];
        }

        let mut replies = vec![Reply::text(format!(
            "Test broadcast: {} birthday(s) today.",
            names.len()
        ))];
        for name in names {
            if self.catalog.find_folder_by_name(name).is_none() {
                replies.push(Reply::text(format!("Test: no folder found for {name}.")));
            }
        }
        replies.extend(self.birthday_notices(date));
        replies
    }
}

fn denied(user: UserId) -> Reply {
    Reply::text(format!(
        "Access denied. Ask the administrator to add your id ({user})."
    ))
}

fn storage_failure(error: &crate::Error) -> Reply {
    warn!(error = %error, "settings storage failed");
    Reply::text(format!("Could not update the settings: {error}"))
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
