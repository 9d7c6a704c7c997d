use crate::resolver::MetadataResolver;
use crate::state::{self, reduce, CardEvent, CardState, RequestId};
use crate::validation::LinkPolicy;
use crate::PreviewError;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info_span, Instrument};

/// A preview card: one link, one current request, one published state.
///
/// All state changes go through [`reduce`]. Renderers subscribe to the
/// watch channel and redraw whenever a new snapshot is published.
pub struct PreviewCard {
    resolver: MetadataResolver,
    state: Arc<watch::Sender<CardState>>,
    in_flight: Mutex<Option<(RequestId, JoinHandle<()>)>>,
}

impl PreviewCard {
    pub fn new(resolver: MetadataResolver) -> Self {
        Self::with_policy(resolver, LinkPolicy::default())
    }

    pub fn with_policy(resolver: MetadataResolver, policy: LinkPolicy) -> Self {
        let (state, _) = watch::channel(CardState::new(policy));
        Self {
            resolver,
            state: Arc::new(state),
            in_flight: Mutex::new(None),
        }
    }

    pub fn snapshot(&self) -> CardState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<CardState> {
        self.state.subscribe()
    }

    /// Validates `input` and starts resolving it, superseding any pending request.
    ///
    /// Rejected input leaves the preview untouched, raises a notice on the
    /// state and is returned as [`PreviewError::InvalidLink`] (or a URL parse
    /// error). Must be called from within a Tokio runtime.
    pub fn submit(&self, input: &str) -> Result<RequestId, PreviewError> {
        let mut verdict = Err(PreviewError::InvalidLink(input.trim().to_string()));
        self.state.send_if_modified(|current| {
            let (next, accepted) = state::submit(current.clone(), input);
            let changed = next != *current;
            *current = next;
            verdict = accepted.and_then(|id| {
                current
                    .link
                    .clone()
                    .map(|link| (id, link))
                    .ok_or_else(|| PreviewError::InvalidLink(input.trim().to_string()))
            });
            changed
        });

        let (id, link) = verdict.map_err(|error| {
            error.log();
            error
        })?;
        debug!(request = %id, link = %link, "Link submitted");

        let resolver = self.resolver.clone();
        let state = Arc::clone(&self.state);
        let handle = tokio::spawn(
            async move {
                let outcome = resolver.resolve_outcome(&link).await;
                let after = apply(&state, CardEvent::Completed { id, outcome });
                if after.request_id != id {
                    debug!("Discarded completion of superseded request");
                }
            }
            .instrument(info_span!("resolve", request = id.get())),
        );

        self.track(id, handle);
        Ok(id)
    }

    pub fn dismiss_notice(&self) {
        apply(&self.state, CardEvent::DismissNotice);
    }

    /// Drops the current link and result and cancels the pending request.
    pub fn clear(&self) {
        self.cancel_in_flight();
        apply(&self.state, CardEvent::Clear);
    }

    /// Waits until no request is pending and returns that snapshot.
    pub async fn settled(&self) -> CardState {
        let mut receiver = self.state.subscribe();
        let settled = match receiver.wait_for(|state| !state.is_busy()).await {
            Ok(state) => state.clone(),
            Err(_) => self.snapshot(),
        };
        settled
    }

    fn track(&self, id: RequestId, handle: JoinHandle<()>) {
        let mut slot = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        // A newer submission may have registered itself first.
        if matches!(slot.as_ref(), Some((current, _)) if *current > id) {
            handle.abort();
            return;
        }
        if let Some((superseded, previous)) = slot.replace((id, handle)) {
            debug!(request = %superseded, "Cancelling superseded request");
            previous.abort();
        }
    }

    fn cancel_in_flight(&self) {
        let mut slot = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some((id, handle)) = slot.take() {
            debug!(request = %id, "Cancelling pending request");
            handle.abort();
        }
    }
}

impl Drop for PreviewCard {
    fn drop(&mut self) {
        self.cancel_in_flight();
    }
}

/// Runs one event through the reducer and returns the state it produced.
fn apply(sender: &watch::Sender<CardState>, event: CardEvent) -> CardState {
    let mut produced = None;
    sender.send_if_modified(|state| {
        let next = reduce(state.clone(), event);
        let changed = next != *state;
        *state = next;
        produced = Some(state.clone());
        changed
    });
    produced.unwrap_or_else(|| sender.borrow().clone())
}
