//! Per-user conversation state.
//!
//! A session is either searching or holding a document for AI questions.
//! The mode is sticky: it only changes on an explicit transition.

use std::{
    collections::{HashMap, VecDeque},
    path::{Path, PathBuf},
    sync::{Arc, Mutex, PoisonError},
    time::Instant,
};

use tokio::sync::Mutex as AsyncMutex;

/// Chat-platform user identifier.
pub type UserId = u64;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Mode {
    /// Text is treated as a search query.
    #[default]
    Search,
    /// Text is treated as a question about `document`.
    AiContext { document: PathBuf },
}

/// Matches of the last multi-result query, kept for card navigation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingMatches {
    pub query: String,
    pub matches: Vec<String>,
    /// Index of the card currently shown.
    pub cursor: usize,
}

#[derive(Debug, Clone, Default)]
pub struct SessionState {
    mode: Mode,
    pending: Option<PendingMatches>,
    ai_requests: VecDeque<Instant>,
    broadcast_opt_in: bool,
}

impl SessionState {
    pub fn new(broadcast_opt_in: bool) -> Self {
        Self {
            broadcast_opt_in,
            ..Self::default()
        }
    }

    pub fn mode(&self) -> &Mode {
        &self.mode
    }

    pub fn active_document(&self) -> Option<&Path> {
        match &self.mode {
            Mode::AiContext { document } => Some(document),
            Mode::Search => None,
        }
    }

    pub fn enter_ai(&mut self, document: PathBuf) {
        self.mode = Mode::AiContext { document };
    }

    pub fn reset_to_search(&mut self) {
        self.mode = Mode::Search;
    }

    /// Start of a top-level command: forget pending matches.
    pub fn begin_command(&mut self) {
        self.pending = None;
    }

    /// Forget matches and drop back to search mode.
    pub fn cancel(&mut self) {
        self.begin_command();
        self.reset_to_search();
    }

    /// Keep `matches` for navigation, with the cursor on the first card.
    pub fn set_pending(&mut self, query: String, matches: Vec<String>) {
        self.pending = Some(PendingMatches {
            query,
            matches,
            cursor: 0,
        });
    }

    /// Move the cursor of the pending matches.
    ///
    /// Returns `false`, leaving the state alone, when nothing is pending or
    /// `index` is out of range.
    pub fn move_cursor(&mut self, index: usize) -> bool {
        match &mut self.pending {
            Some(pending) if index < pending.matches.len() => {
                pending.cursor = index;
                true
            }
            _ => false,
        }
    }

    pub fn pending(&self) -> Option<&PendingMatches> {
        self.pending.as_ref()
    }

    /// Remove and return the pending matches, e.g. once a folder is opened.
    pub fn take_pending(&mut self) -> Option<PendingMatches> {
        self.pending.take()
    }

    /// Timestamps of recent AI requests, for the rate limiter.
    pub fn ai_requests_mut(&mut self) -> &mut VecDeque<Instant> {
        &mut self.ai_requests
    }

    pub fn broadcast_opt_in(&self) -> bool {
        self.broadcast_opt_in
    }

    /// Flip the broadcast preference and return the new value.
    pub fn toggle_broadcast(&mut self) -> bool {
        self.broadcast_opt_in = !self.broadcast_opt_in;
        self.broadcast_opt_in
    }
}

/// Sessions keyed by user.
///
/// Each session has its own async lock; a handler keeps it for the whole
/// request so one user's requests run one at a time while different users
/// proceed in parallel.
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: Mutex<HashMap<UserId, Arc<AsyncMutex<SessionState>>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The session of `user`, created with `seed` on first contact.
    pub fn get_or_create(
        &self,
        user: UserId,
        seed: impl FnOnce() -> SessionState,
    ) -> Arc<AsyncMutex<SessionState>> {
        let mut sessions = self
            .sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        Arc::clone(
            sessions
                .entry(user)
                .or_insert_with(|| Arc::new(AsyncMutex::new(seed()))),
        )
    }

    pub fn len(&self) -> usize {
        self.sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_session_searches() {
        let session = SessionState::new(true);
        assert_eq!(session.mode(), &Mode::Search);
        assert!(session.active_document().is_none());
        assert!(session.pending().is_none());
    }

    #[test]
    fn selecting_a_document_enters_ai_mode() {
        let mut session = SessionState::new(true);
        session.enter_ai(PathBuf::from("/docs/cv.pdf"));
        assert_eq!(session.active_document(), Some(Path::new("/docs/cv.pdf")));
        assert!(matches!(session.mode(), Mode::AiContext { .. }));
    }

    #[test]
    fn cancel_keeps_broadcast_preference() {
        for opt_in in [true, false] {
            let mut session = SessionState::new(opt_in);
            session.enter_ai(PathBuf::from("/docs/cv.pdf"));
            session.set_pending("ivanov".into(), vec!["Base/G/Ivanov".into()]);

            session.cancel();

            assert_eq!(session.mode(), &Mode::Search);
            assert!(session.active_document().is_none());
            assert!(session.pending().is_none());
            assert_eq!(session.broadcast_opt_in(), opt_in);
        }
    }

    #[test]
    fn begin_command_keeps_mode() {
        let mut session = SessionState::new(false);
        session.enter_ai(PathBuf::from("/docs/cv.pdf"));
        session.set_pending("q".into(), vec!["a".into(), "b".into()]);

        session.begin_command();

        assert!(session.pending().is_none());
        assert!(session.active_document().is_some());
    }

    #[test]
    fn take_pending_clears_matches() {
        let mut session = SessionState::default();
        session.set_pending("q".into(), vec!["a".into()]);
        let pending = session.take_pending().unwrap();
        assert_eq!(pending.query, "q");
        assert!(session.pending().is_none());
    }

    #[test]
    fn cursor_tracks_navigation_within_bounds() {
        let mut session = SessionState::default();
        assert!(!session.move_cursor(0));

        session.set_pending("q".into(), vec!["a".into(), "b".into()]);
        assert_eq!(session.pending().unwrap().cursor, 0);

        assert!(session.move_cursor(1));
        assert_eq!(session.pending().unwrap().cursor, 1);

        assert!(!session.move_cursor(2));
        assert_eq!(session.pending().unwrap().cursor, 1);

        session.set_pending("r".into(), vec!["c".into(), "d".into()]);
        assert_eq!(session.pending().unwrap().cursor, 0);
    }

    #[test]
    fn toggle_flips_preference() {
        let mut session = SessionState::new(true);
        assert!(!session.toggle_broadcast());
        assert!(session.toggle_broadcast());
    }

    #[tokio::test]
    async fn store_seeds_once_per_user() {
        let store = SessionStore::new();
        let first = store.get_or_create(1, || SessionState::new(false));
        first.lock().await.toggle_broadcast();

        let again = store.get_or_create(1, || SessionState::new(false));
        assert!(again.lock().await.broadcast_opt_in());

        let other = store.get_or_create(2, || SessionState::new(false));
        assert!(!other.lock().await.broadcast_opt_in());
        assert_eq!(store.len(), 2);
    }
}
