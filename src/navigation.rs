use std::sync::Arc;

use tokio::sync::watch;

use crate::{
    models::{GuardOutcome, Location, Redirect, RedirectState, RetryAction, Session},
    portal::Portal,
    title::TitleManager,
};

/// Upper bound on consecutive redirects executed for a single evaluation.
pub const MAX_REDIRECTS: usize = 8;

/// History
///
/// The router's history stack as seen by the navigation controller.
pub trait History {
    fn current(&self) -> &Location;
    fn push(&mut self, location: Location, state: Option<RedirectState>);
    fn replace(&mut self, location: Location, state: Option<RedirectState>);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    pub location: Location,
    pub state: Option<RedirectState>,
}

/// MemoryHistory
///
/// An in-process history stack with a cursor, for hosts without a browser history.
#[derive(Debug, Clone)]
pub struct MemoryHistory {
    entries: Vec<HistoryEntry>,
    index: usize,
}

impl MemoryHistory {
    pub fn new(initial: &str) -> Self {
        Self {
            entries: vec![HistoryEntry {
                location: Location::parse(initial),
                state: None,
            }],
            index: 0,
        }
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn current_entry(&self) -> &HistoryEntry {
        &self.entries[self.index]
    }

    /// Moves the cursor back one entry. Returns false at the start of history.
    pub fn back(&mut self) -> bool {
        if self.index == 0 {
            return false;
        }
        self.index -= 1;
        true
    }
}

impl History for MemoryHistory {
    fn current(&self) -> &Location {
        &self.entries[self.index].location
    }

    fn push(&mut self, location: Location, state: Option<RedirectState>) {
        self.entries.truncate(self.index + 1);
        self.entries.push(HistoryEntry { location, state });
        self.index = self.entries.len() - 1;
    }

    fn replace(&mut self, location: Location, state: Option<RedirectState>) {
        self.entries[self.index] = HistoryEntry { location, state };
    }
}

/// Performs a redirect decision on a history stack.
pub fn execute<H: History>(history: &mut H, redirect: Redirect) {
    let location = Location::parse(&redirect.to);
    if redirect.replace {
        history.replace(location, redirect.state);
    } else {
        history.push(location, redirect.state);
    }
}

/// What the controller currently shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum View {
    Page { pattern: String, pathname: String },
    NotFound { pathname: String },
    Loading,
    Error { message: String, retry: RetryAction },
}

/// NavigationController
///
/// Runs the portal's guards on every navigation and every session change, executes
/// their redirects on the history, and keeps the document title current.
pub struct NavigationController<H> {
    portal: Arc<Portal>,
    session: watch::Receiver<Session>,
    history: H,
    titles: TitleManager,
    view: View,
}

impl<H: History> NavigationController<H> {
    pub fn new(portal: Arc<Portal>, session: watch::Receiver<Session>, history: H) -> Self {
        let titles = TitleManager::new(Arc::clone(&portal.titles));
        Self {
            portal,
            session,
            history,
            titles,
            view: View::Loading,
        }
    }

    pub fn view(&self) -> &View {
        &self.view
    }

    pub fn history(&self) -> &H {
        &self.history
    }

    pub fn location(&self) -> &Location {
        self.history.current()
    }

    pub fn document_title(&self) -> &str {
        self.titles.current()
    }

    pub fn navigate(&mut self, target: &str) -> &View {
        self.history.push(Location::parse(target), None);
        self.evaluate()
    }

    /// Evaluates the current location against the latest session snapshot, following
    /// redirects until a view settles.
    pub fn evaluate(&mut self) -> &View {
        let session = self.session.borrow_and_update().clone();
        let mut redirects = 0;

        loop {
            let location = self.history.current().clone();
            let resolution = self.portal.resolve(&session, &location);
            self.titles.update(&resolution.navigation);

            let view = match resolution.outcome {
                // One redirect past the cap is a loop; it is not executed.
                GuardOutcome::Redirect(_) if redirects == MAX_REDIRECTS => break,
                GuardOutcome::Redirect(redirect) => {
                    tracing::debug!(from = %location.pathname, to = %redirect.to, "redirecting");
                    execute(&mut self.history, redirect);
                    redirects += 1;
                    continue;
                }
                GuardOutcome::Render => match resolution.route {
                    Some(route) => View::Page {
                        pattern: route.pattern.clone(),
                        pathname: resolution.navigation.pathname,
                    },
                    None => View::NotFound {
                        pathname: resolution.navigation.pathname,
                    },
                },
                GuardOutcome::Loading => View::Loading,
                GuardOutcome::Error { message, retry } => View::Error { message, retry },
            };

            self.view = view;
            return &self.view;
        }

        tracing::error!(path = %self.history.current().pathname, "redirect loop detected");
        self.view = View::Error {
            message: "Demasiadas redirecciones".to_string(),
            retry: RetryAction::Reload,
        };
        &self.view
    }

    /// Waits for the next session change and re-evaluates the mounted location. `None`
    /// once the session provider is gone.
    pub async fn session_changed(&mut self) -> Option<&View> {
        self.session.changed().await.ok()?;
        Some(self.evaluate())
    }

    /// Leaves the title-managing scope.
    pub fn unmount(&mut self) {
        self.titles.unmount();
    }
}
