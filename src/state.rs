use crate::resolver::ResolutionOutcome;
use crate::validation::LinkPolicy;
use crate::{PreviewError, PreviewResult};
use std::fmt;
use url::Url;

/// Where the card is in its request lifecycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ResolutionState {
    #[default]
    Idle,
    Loading,
    Resolved,
    Failed,
}

/// Monotonic per-card request counter. Only the latest id may land.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestId(u64);

impl RequestId {
    pub fn next(self) -> Self {
        RequestId(self.0 + 1)
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Raised when the search box input is rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationNotice {
    pub input: String,
    pub message: String,
}

#[derive(Debug)]
pub enum CardEvent {
    Submit {
        input: String,
    },
    Completed {
        id: RequestId,
        outcome: ResolutionOutcome,
    },
    DismissNotice,
    Clear,
}

/// Everything a renderer needs to draw the card.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CardState {
    pub link: Option<Url>,
    pub result: PreviewResult,
    pub status: ResolutionState,
    pub request_id: RequestId,
    pub notice: Option<ValidationNotice>,
    pub last_error: Option<String>,
    policy: LinkPolicy,
}

impl CardState {
    pub fn new(policy: LinkPolicy) -> Self {
        Self {
            policy,
            ..Default::default()
        }
    }

    pub fn policy(&self) -> &LinkPolicy {
        &self.policy
    }

    /// True strictly between an accepted submission and its completion.
    pub fn is_busy(&self) -> bool {
        self.status == ResolutionState::Loading
    }
}

/// The card's only state transition function.
pub fn reduce(mut state: CardState, event: CardEvent) -> CardState {
    match event {
        CardEvent::Submit { input } => return submit(state, &input).0,
        CardEvent::Completed { id, outcome } => {
            if id != state.request_id || !state.is_busy() {
                return state;
            }
            match outcome {
                ResolutionOutcome::Resolved(result) => {
                    state.result = result;
                    state.status = ResolutionState::Resolved;
                }
                ResolutionOutcome::Failed { result, error } => {
                    state.result = result;
                    state.status = ResolutionState::Failed;
                    state.last_error = Some(error.to_string());
                }
            }
        }
        CardEvent::DismissNotice => state.notice = None,
        CardEvent::Clear => {
            state = CardState {
                request_id: state.request_id,
                policy: state.policy,
                ..Default::default()
            }
        }
    }
    state
}

/// The `Submit` transition, keeping the validation verdict for the caller.
///
/// Accepted input yields the new request id; rejected input leaves
/// everything but the notice untouched and yields the validation error.
pub fn submit(mut state: CardState, input: &str) -> (CardState, Result<RequestId, PreviewError>) {
    match state.policy.validate(input) {
        Ok(link) => {
            state.request_id = state.request_id.next();
            state.link = Some(link);
            state.status = ResolutionState::Loading;
            state.notice = None;
            state.last_error = None;
            let id = state.request_id;
            (state, Ok(id))
        }
        Err(e) => {
            state.notice = Some(ValidationNotice {
                input: input.trim().to_string(),
                message: e.to_string(),
            });
            (state, Err(e))
        }
    }
}
