//! Application state and core logic

use anyhow::{Context, Result};
use std::process::Command;
use std::time::{Duration, Instant};
use tokio::sync::mpsc::UnboundedSender;

use crate::client::SearchClient;
use crate::controller::{Completion, CompletionGuard, SearchController, SearchState, Ticket};
use crate::normalize::SearchResult;

/// Main application structure
pub struct App {
    pub input: String,
    pub controller: SearchController,
    pub selected_index: usize,
    /// Status message shown in UI
    pub status_message: String,
    client: SearchClient,
    tx: UnboundedSender<Completion>,
}

impl App {
    /// Create new app instance
    ///
    /// Search tasks report back through `tx`; the event loop feeds what
    /// arrives into [`App::handle_completion`].
    pub fn new(client: SearchClient, debounce: Duration, tx: UnboundedSender<Completion>) -> Self {
        Self {
            input: String::new(),
            controller: SearchController::new(debounce),
            selected_index: 0,
            status_message: String::new(),
            client,
            tx,
        }
    }

    /// Cursor column inside the input box
    pub fn cursor_pos(&self) -> usize {
        self.input.chars().count()
    }

    pub fn push_char(&mut self, c: char) {
        self.input.push(c);
        self.controller.on_input(Instant::now());
    }

    pub fn pop_char(&mut self) {
        if self.input.pop().is_some() {
            self.controller.on_input(Instant::now());
        }
    }

    /// Clear the input and drop whatever is shown or in flight
    pub fn clear_input(&mut self) {
        self.input.clear();
        self.controller.reset();
        self.selected_index = 0;
        self.status_message.clear();
    }

    /// Explicit submit (Enter)
    pub fn submit(&mut self) {
        match self.controller.submit(&self.input) {
            Ok(ticket) => self.launch(ticket),
            Err(e) => self.status_message = e.to_string(),
        }
    }

    /// Fire the debounced search once typing has settled
    pub fn tick(&mut self, now: Instant) {
        if let Some(ticket) = self.controller.poll_debounce(now, &self.input) {
            self.launch(ticket);
        }
    }

    /// Spawn the background task for a ticket
    fn launch(&mut self, ticket: Ticket) {
        self.selected_index = 0;
        self.status_message = "Searching...".to_string();

        let client = self.client.clone();
        let guard = CompletionGuard::new(self.tx.clone(), ticket.generation);
        let query = ticket.query.clone();

        let handle = tokio::spawn(async move {
            let outcome = client.search(&query).await;
            guard.report(outcome);
        });
        self.controller.track(&ticket, handle.abort_handle());
    }

    /// Apply a finished search, ignoring superseded ones
    pub fn handle_completion(&mut self, completion: Completion) {
        if !self.controller.complete(completion) {
            return;
        }

        self.selected_index = 0;
        self.status_message = match self.controller.state() {
            SearchState::Succeeded if self.controller.results().is_empty() => {
                "No results found".to_string()
            }
            SearchState::Succeeded => format!("Found {} results", self.controller.results().len()),
            SearchState::Failed => "Search failed".to_string(),
            SearchState::Idle | SearchState::Searching => String::new(),
        };
    }

    pub fn results(&self) -> &[SearchResult] {
        self.controller.results()
    }

    pub fn selected_result(&self) -> Option<&SearchResult> {
        self.results().get(self.selected_index)
    }

    /// Move to next result
    pub fn next_result(&mut self) {
        let len = self.results().len();
        if len > 0 {
            self.selected_index = (self.selected_index + 1) % len;
        }
    }

    /// Move to previous result
    pub fn previous_result(&mut self) {
        let len = self.results().len();
        if len > 0 {
            if self.selected_index == 0 {
                self.selected_index = len - 1;
            } else {
                self.selected_index -= 1;
            }
        }
    }

    /// Jump to first result
    pub fn first_result(&mut self) {
        self.selected_index = 0;
    }

    /// Jump to last result
    pub fn last_result(&mut self) {
        self.selected_index = self.results().len().saturating_sub(1);
    }

    /// Get scroll offset for rendering
    pub fn get_scroll_offset(&self, visible_height: usize) -> usize {
        let items_per_screen = (visible_height / 4).max(1);

        if self.selected_index >= items_per_screen {
            self.selected_index + 1 - items_per_screen
        } else {
            0
        }
    }

    /// Open the selected result in the default browser
    pub fn open_in_browser(&mut self) {
        let Some(url) = self.selected_result().and_then(|r| r.url.clone()) else {
            self.status_message = "Selected result has no link".to_string();
            return;
        };

        match open_url(&url) {
            Ok(()) => self.status_message = format!("Opened {url}"),
            Err(e) => {
                tracing::warn!("Failed to open {url}: {e:#}");
                self.status_message = format!("Failed to open URL: {e}");
            }
        }
    }
}

/// Open URL in default browser
fn open_url(url: &str) -> Result<()> {
    #[cfg(target_os = "macos")]
    let mut command = Command::new("open");

    #[cfg(target_os = "windows")]
    let mut command = {
        let mut command = Command::new("cmd");
        command.args(["/C", "start", ""]);
        command
    };

    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    let mut command = Command::new("xdg-open");

    command
        .arg(url)
        .stdin(std::process::Stdio::null())
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .spawn()
        .context("Failed to open browser")?;

    Ok(())
}
