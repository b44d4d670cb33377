//! Search request lifecycle
//!
//! `Idle -> Searching -> (Succeeded | Failed) -> Idle` on the next input.
//!
//! At most one request is live. Starting a search aborts the previous task
//! and bumps a generation counter; completions are applied only when their
//! generation is still the current one, so a superseded response can never
//! overwrite newer state, whatever order the responses arrive in.

use std::time::{Duration, Instant};

use thiserror::Error;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::AbortHandle;

use crate::normalize::SearchResult;

/// How a search ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchOutcome {
    /// Normalized records, possibly none
    Completed(Vec<SearchResult>),
    /// Single-line, user-facing failure message
    Failed(String),
    /// Aborted before reporting
    Cancelled,
}

/// Controller state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchState {
    Idle,
    Searching,
    Succeeded,
    Failed,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum InputError {
    #[error("Please enter a search term.")]
    EmptyQuery,
}

/// A search the controller has agreed to run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ticket {
    pub generation: u64,
    pub query: String,
}

/// Completion report sent back from a search task
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    pub generation: u64,
    pub outcome: SearchOutcome,
}

/// Reports `Cancelled` for its generation unless the task reported first
///
/// Held by the search task; dropping the task (abort, panic) drops the guard.
pub struct CompletionGuard {
    tx: UnboundedSender<Completion>,
    generation: u64,
    reported: bool,
}

impl CompletionGuard {
    pub fn new(tx: UnboundedSender<Completion>, generation: u64) -> Self {
        Self {
            tx,
            generation,
            reported: false,
        }
    }

    pub fn report(mut self, outcome: SearchOutcome) {
        self.reported = true;
        let _ = self.tx.send(Completion {
            generation: self.generation,
            outcome,
        });
    }
}

impl Drop for CompletionGuard {
    fn drop(&mut self) {
        if !self.reported {
            let _ = self.tx.send(Completion {
                generation: self.generation,
                outcome: SearchOutcome::Cancelled,
            });
        }
    }
}

/// Fires once after input has been quiet for a fixed period
#[derive(Debug, Clone)]
pub struct Debouncer {
    quiet: Duration,
    deadline: Option<Instant>,
}

impl Debouncer {
    pub fn new(quiet: Duration) -> Self {
        Self {
            quiet,
            deadline: None,
        }
    }

    /// Input changed at `now`; restart the quiet period
    pub fn touch(&mut self, now: Instant) {
        self.deadline = Some(now + self.quiet);
    }

    /// True exactly once when the quiet period has elapsed
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }

    pub fn reset(&mut self) {
        self.deadline = None;
    }
}

/// Owns the in-flight request handle and everything the widget displays
pub struct SearchController {
    state: SearchState,
    generation: u64,
    in_flight: Option<AbortHandle>,
    results: Vec<SearchResult>,
    error: Option<String>,
    notice: Option<String>,
    loading: bool,
    debouncer: Debouncer,
}

impl SearchController {
    pub fn new(quiet: Duration) -> Self {
        Self {
            state: SearchState::Idle,
            generation: 0,
            in_flight: None,
            results: Vec::new(),
            error: None,
            notice: None,
            loading: false,
            debouncer: Debouncer::new(quiet),
        }
    }

    /// Explicit submit
    ///
    /// A blank query is rejected locally and no request must be issued.
    /// Otherwise any live request is aborted and a new ticket is handed out.
    pub fn submit(&mut self, query: &str) -> Result<Ticket, InputError> {
        self.debouncer.reset();

        let query = query.trim();
        if query.is_empty() {
            self.notice = Some(InputError::EmptyQuery.to_string());
            return Err(InputError::EmptyQuery);
        }

        self.abort_in_flight();
        self.generation += 1;
        self.state = SearchState::Searching;
        self.loading = true;
        self.notice = None;

        Ok(Ticket {
            generation: self.generation,
            query: query.to_string(),
        })
    }

    /// The input text changed
    pub fn on_input(&mut self, now: Instant) {
        self.debouncer.touch(now);
        self.notice = None;
        if matches!(self.state, SearchState::Succeeded | SearchState::Failed) {
            self.state = SearchState::Idle;
            self.error = None;
        }
    }

    /// Automatic trigger once the input has settled
    ///
    /// A settled blank input clears the widget instead of searching.
    pub fn poll_debounce(&mut self, now: Instant, input: &str) -> Option<Ticket> {
        if !self.debouncer.poll(now) {
            return None;
        }
        if input.trim().is_empty() {
            self.reset();
            return None;
        }
        self.submit(input).ok()
    }

    /// Remember the task running `ticket`
    pub fn track(&mut self, ticket: &Ticket, handle: AbortHandle) {
        if ticket.generation == self.generation && self.loading {
            self.in_flight = Some(handle);
        } else {
            handle.abort();
        }
    }

    /// Apply a completion; returns false when it was stale and discarded
    pub fn complete(&mut self, completion: Completion) -> bool {
        if completion.generation != self.generation {
            tracing::debug!(
                "discarding stale completion {} (current {})",
                completion.generation,
                self.generation
            );
            return false;
        }
        if !self.loading {
            // Already settled, e.g. cancelled locally
            return false;
        }

        self.in_flight = None;
        self.loading = false;

        match completion.outcome {
            SearchOutcome::Completed(results) => {
                self.results = results;
                self.error = None;
                self.state = SearchState::Succeeded;
            }
            SearchOutcome::Failed(message) => {
                self.results.clear();
                self.error = Some(message);
                self.state = SearchState::Failed;
            }
            SearchOutcome::Cancelled => {
                self.state = SearchState::Idle;
            }
        }

        true
    }

    /// Abort the live request, if any, and settle back to idle
    pub fn cancel(&mut self) {
        self.debouncer.reset();
        if self.loading {
            self.abort_in_flight();
            // Whatever the aborted task still reports is stale now
            self.generation += 1;
            self.loading = false;
            self.state = SearchState::Idle;
        }
    }

    /// Cancel and forget everything shown
    pub fn reset(&mut self) {
        self.cancel();
        self.state = SearchState::Idle;
        self.results.clear();
        self.error = None;
        self.notice = None;
    }

    fn abort_in_flight(&mut self) {
        if let Some(handle) = self.in_flight.take() {
            handle.abort();
        }
    }

    pub fn state(&self) -> SearchState {
        self.state
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn results(&self) -> &[SearchResult] {
        &self.results
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }
}

impl Drop for SearchController {
    fn drop(&mut self) {
        self.abort_in_flight();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    const QUIET: Duration = Duration::from_millis(400);

    fn titled(titles: &[&str]) -> Vec<SearchResult> {
        titles.iter().map(|t| SearchResult::titled(*t)).collect()
    }

    fn done(ticket: &Ticket, outcome: SearchOutcome) -> Completion {
        Completion {
            generation: ticket.generation,
            outcome,
        }
    }

    #[test]
    fn test_empty_query_is_rejected_locally() {
        let mut controller = SearchController::new(QUIET);
        assert_eq!(controller.submit("   "), Err(InputError::EmptyQuery));
        assert_eq!(controller.notice(), Some("Please enter a search term."));
        assert_eq!(controller.state(), SearchState::Idle);
        assert!(!controller.is_loading());
        assert_eq!(controller.submit("abc").map(|t| t.generation), Ok(1));
    }

    #[test]
    fn test_success_flow() {
        let mut controller = SearchController::new(QUIET);
        let ticket = controller.submit(" ADDRESS123 ").unwrap();
        assert_eq!(ticket.query, "ADDRESS123");
        assert_eq!(controller.state(), SearchState::Searching);
        assert!(controller.is_loading());

        assert!(controller.complete(done(&ticket, SearchOutcome::Completed(titled(&["Tx 1"])))));
        assert_eq!(controller.state(), SearchState::Succeeded);
        assert!(!controller.is_loading());
        assert_eq!(controller.results(), titled(&["Tx 1"]).as_slice());
        assert_eq!(controller.error(), None);
    }

    #[test]
    fn test_failure_clears_results() {
        let mut controller = SearchController::new(QUIET);
        let first = controller.submit("a").unwrap();
        controller.complete(done(&first, SearchOutcome::Completed(titled(&["A"]))));

        let second = controller.submit("b").unwrap();
        controller.complete(done(
            &second,
            SearchOutcome::Failed("Search failed with status 500 Internal Server Error".into()),
        ));
        assert_eq!(controller.state(), SearchState::Failed);
        assert!(controller.results().is_empty());
        assert_eq!(
            controller.error(),
            Some("Search failed with status 500 Internal Server Error")
        );
        assert!(!controller.is_loading());
    }

    #[test]
    fn test_later_search_wins_when_earlier_arrives_last() {
        let mut controller = SearchController::new(QUIET);
        let a = controller.submit("a").unwrap();
        let b = controller.submit("b").unwrap();

        assert!(controller.complete(done(&b, SearchOutcome::Completed(titled(&["B"])))));
        assert!(!controller.complete(done(&a, SearchOutcome::Completed(titled(&["A"])))));

        assert_eq!(controller.results(), titled(&["B"]).as_slice());
        assert_eq!(controller.state(), SearchState::Succeeded);
    }

    #[test]
    fn test_stale_completion_does_not_end_loading() {
        let mut controller = SearchController::new(QUIET);
        let a = controller.submit("a").unwrap();
        let b = controller.submit("b").unwrap();

        assert!(!controller.complete(done(&a, SearchOutcome::Failed("late".into()))));
        assert!(controller.is_loading());
        assert_eq!(controller.error(), None);

        assert!(controller.complete(done(&b, SearchOutcome::Completed(vec![]))));
        assert!(!controller.is_loading());
    }

    #[test]
    fn test_cancellation_is_silent() {
        let mut controller = SearchController::new(QUIET);
        let ticket = controller.submit("a").unwrap();
        assert!(controller.complete(done(&ticket, SearchOutcome::Cancelled)));
        assert_eq!(controller.state(), SearchState::Idle);
        assert_eq!(controller.error(), None);
        assert!(!controller.is_loading());
    }

    #[test]
    fn test_local_cancel_makes_pending_completion_stale() {
        let mut controller = SearchController::new(QUIET);
        let ticket = controller.submit("a").unwrap();
        controller.cancel();
        assert!(!controller.is_loading());
        assert!(!controller.complete(done(&ticket, SearchOutcome::Completed(titled(&["A"])))));
        assert!(controller.results().is_empty());
    }

    #[test]
    fn test_input_after_result_returns_to_idle() {
        let mut controller = SearchController::new(QUIET);
        let ticket = controller.submit("a").unwrap();
        controller.complete(done(&ticket, SearchOutcome::Failed("nope".into())));

        controller.on_input(Instant::now());
        assert_eq!(controller.state(), SearchState::Idle);
        assert_eq!(controller.error(), None);
    }

    #[test]
    fn test_debounce_fires_once_after_quiet_period() {
        let mut controller = SearchController::new(QUIET);
        let start = Instant::now();

        controller.on_input(start);
        controller.on_input(start + Duration::from_millis(300));
        assert_eq!(controller.poll_debounce(start + Duration::from_millis(500), "abc"), None);

        let ticket = controller.poll_debounce(start + Duration::from_millis(700), "abc");
        assert_eq!(ticket.map(|t| t.query), Some("abc".to_string()));
        assert_eq!(controller.poll_debounce(start + Duration::from_secs(5), "abc"), None);
    }

    #[test]
    fn test_debounced_blank_input_clears() {
        let mut controller = SearchController::new(QUIET);
        let ticket = controller.submit("a").unwrap();
        controller.complete(done(&ticket, SearchOutcome::Completed(titled(&["A"]))));

        let start = Instant::now();
        controller.on_input(start);
        assert_eq!(controller.poll_debounce(start + QUIET, "  "), None);
        assert!(controller.results().is_empty());
        assert_eq!(controller.notice(), None);
        assert_eq!(controller.state(), SearchState::Idle);
    }

    #[test]
    fn test_submit_cancels_pending_debounce() {
        let mut controller = SearchController::new(QUIET);
        let start = Instant::now();
        controller.on_input(start);
        controller.submit("abc").unwrap();
        assert_eq!(controller.poll_debounce(start + QUIET, "abc"), None);
    }

    #[tokio::test]
    async fn test_new_submit_aborts_previous_task() {
        let mut controller = SearchController::new(QUIET);
        let a = controller.submit("a").unwrap();
        let task = tokio::spawn(std::future::pending::<()>());
        controller.track(&a, task.abort_handle());

        controller.submit("b").unwrap();
        assert!(task.await.unwrap_err().is_cancelled());
    }

    #[tokio::test]
    async fn test_tracking_a_stale_ticket_aborts_it() {
        let mut controller = SearchController::new(QUIET);
        let a = controller.submit("a").unwrap();
        controller.submit("b").unwrap();

        let task = tokio::spawn(std::future::pending::<()>());
        controller.track(&a, task.abort_handle());
        assert!(task.await.unwrap_err().is_cancelled());
    }

    #[tokio::test]
    async fn test_guard_reports_cancelled_when_task_is_aborted() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let (started_tx, started_rx) = tokio::sync::oneshot::channel();
        let task = tokio::spawn(async move {
            let _guard = CompletionGuard::new(tx, 7);
            let _ = started_tx.send(());
            std::future::pending::<()>().await;
        });
        started_rx.await.unwrap();
        task.abort();

        assert_eq!(
            rx.recv().await,
            Some(Completion {
                generation: 7,
                outcome: SearchOutcome::Cancelled
            })
        );
    }

    #[tokio::test]
    async fn test_guard_reports_outcome_once() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        CompletionGuard::new(tx, 3).report(SearchOutcome::Completed(vec![]));

        assert_eq!(
            rx.recv().await,
            Some(Completion {
                generation: 3,
                outcome: SearchOutcome::Completed(vec![])
            })
        );
        assert_eq!(rx.recv().await, None);
    }
}
