use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::time::Duration;

use crate::types::QueryError;

/// Identity of a single load, unique per pager
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LoadId(pub(crate) u64);

/// Terminal result of a load, also handed to the load callback
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome<T> {
    /// The page was merged; these are its visible (sentinel-trimmed) items
    Loaded(Vec<T>),

    /// The executor reported an error; pager state is unchanged
    Failed(QueryError),

    /// The token was cancelled before completion; nothing was merged
    Cancelled,
}

impl<T> LoadOutcome<T> {
    pub fn is_loaded(&self) -> bool {
        matches!(self, LoadOutcome::Loaded(_))
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, LoadOutcome::Cancelled)
    }

    pub fn items(&self) -> Option<&[T]> {
        match self {
            LoadOutcome::Loaded(items) => Some(items),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&QueryError> {
        match self {
            LoadOutcome::Failed(err) => Some(err),
            _ => None,
        }
    }
}

/// Raw-completion state of one in-flight load.
///
/// A cache-then-network fetch completes twice and resolves on the second
/// completion; every other fetch resolves on the first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CompletionState {
    AwaitingFirst,
    AwaitingSecond,
    Resolved,
}

impl CompletionState {
    /// Advance on one raw completion. `None` for a completion after resolution.
    pub fn advance(self, expected_completions: u8) -> Option<CompletionState> {
        match self {
            CompletionState::AwaitingFirst if expected_completions >= 2 => {
                Some(CompletionState::AwaitingSecond)
            }
            CompletionState::AwaitingFirst | CompletionState::AwaitingSecond => {
                Some(CompletionState::Resolved)
            }
            CompletionState::Resolved => None,
        }
    }
}

/// Completion future of a page load.
///
/// Resolves exactly once, after the pager has cleared its in-flight slot.
#[derive(Debug)]
pub struct LoadHandle<T> {
    id: LoadId,
    page: usize,
    receiver: Receiver<LoadOutcome<T>>,
    outcome: Option<LoadOutcome<T>>,
}

impl<T> LoadHandle<T> {
    pub(crate) fn channel(id: LoadId, page: usize) -> (Sender<LoadOutcome<T>>, Self) {
        let (sender, receiver) = crossbeam_channel::bounded(1);
        let handle = Self {
            id,
            page,
            receiver,
            outcome: None,
        };
        (sender, handle)
    }

    pub fn id(&self) -> LoadId {
        self.id
    }

    /// Page index this load targets
    pub fn page(&self) -> usize {
        self.page
    }

    /// Non-blocking check for the outcome
    pub fn try_outcome(&mut self) -> Option<&LoadOutcome<T>> {
        if self.outcome.is_none() {
            match self.receiver.try_recv() {
                Ok(outcome) => self.outcome = Some(outcome),
                Err(TryRecvError::Disconnected) => {
                    self.outcome = Some(LoadOutcome::Failed(QueryError::Abandoned))
                }
                Err(TryRecvError::Empty) => {}
            }
        }
        self.outcome.as_ref()
    }

    pub fn is_finished(&mut self) -> bool {
        self.try_outcome().is_some()
    }

    /// Block until the load resolves
    pub fn wait(mut self) -> LoadOutcome<T> {
        if let Some(outcome) = self.outcome.take() {
            return outcome;
        }
        self.receiver
            .recv()
            .unwrap_or(LoadOutcome::Failed(QueryError::Abandoned))
    }

    /// Block for at most `timeout`; `None` if the load is still running
    pub fn wait_timeout(&mut self, timeout: Duration) -> Option<&LoadOutcome<T>> {
        if self.outcome.is_none() {
            match self.receiver.recv_timeout(timeout) {
                Ok(outcome) => self.outcome = Some(outcome),
                Err(RecvTimeoutError::Disconnected) => {
                    self.outcome = Some(LoadOutcome::Failed(QueryError::Abandoned))
                }
                Err(RecvTimeoutError::Timeout) => {}
            }
        }
        self.outcome.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_completion_resolves_first() {
        let state = CompletionState::AwaitingFirst.advance(1);
        assert_eq!(state, Some(CompletionState::Resolved));
        assert_eq!(CompletionState::Resolved.advance(1), None);
    }

    #[test]
    fn test_dual_completion_resolves_second() {
        let first = CompletionState::AwaitingFirst.advance(2);
        assert_eq!(first, Some(CompletionState::AwaitingSecond));
        let second = first.and_then(|state| state.advance(2));
        assert_eq!(second, Some(CompletionState::Resolved));
    }

    #[test]
    fn test_handle_resolves_once() {
        let (sender, mut handle) = LoadHandle::<u32>::channel(LoadId(7), 3);
        assert!(!handle.is_finished());
        assert_eq!(handle.page(), 3);

        sender.send(LoadOutcome::Loaded(vec![1, 2])).unwrap();
        assert_eq!(handle.try_outcome(), Some(&LoadOutcome::Loaded(vec![1, 2])));
        assert_eq!(handle.wait(), LoadOutcome::Loaded(vec![1, 2]));
    }

    #[test]
    fn test_dropped_sender_means_abandoned() {
        let (sender, handle) = LoadHandle::<u32>::channel(LoadId(1), 0);
        drop(sender);
        assert_eq!(handle.wait(), LoadOutcome::Failed(QueryError::Abandoned));
    }

    #[test]
    fn test_wait_timeout_while_pending() {
        let (_sender, mut handle) = LoadHandle::<u32>::channel(LoadId(1), 0);
        assert!(handle.wait_timeout(Duration::from_millis(5)).is_none());
    }
}
