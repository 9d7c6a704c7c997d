use async_trait::async_trait;
use link_preview_card::{
    MetadataPayload, MetadataResolver, MetadataResponse, MetadataSource, PreviewCard,
    LinkPolicy, PreviewError, PreviewResult, ResolutionState, NO_DESCRIPTION_PLACEHOLDER,
    NO_TITLE_PLACEHOLDER,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use url::Url;

enum Reply {
    Body(Value),
    Status(u16),
}

/// Answers from a fixed script after a per-link delay.
#[derive(Default)]
struct ScriptedSource {
    script: HashMap<String, (Duration, Reply)>,
    finished: Arc<AtomicUsize>,
}

impl ScriptedSource {
    fn reply(mut self, link: &str, delay: Duration, reply: Reply) -> Self {
        self.script.insert(link.to_string(), (delay, reply));
        self
    }
}

#[async_trait]
impl MetadataSource for ScriptedSource {
    async fn fetch_metadata(&self, link: &Url) -> Result<MetadataPayload, PreviewError> {
        let Some((delay, reply)) = self.script.get(link.as_str()) else {
            return Err(PreviewError::from_status(404, "unscripted link"));
        };

        tokio::time::sleep(*delay).await;
        self.finished.fetch_add(1, Ordering::SeqCst);

        match reply {
            Reply::Body(body) => serde_json::from_value::<MetadataResponse>(body.clone())
                .map(MetadataResponse::into_payload)
                .map_err(|e| PreviewError::ParseError(e.to_string())),
            Reply::Status(status) => Err(PreviewError::from_status(*status, "scripted")),
        }
    }
}

fn og_body(title: &str) -> Reply {
    Reply::Body(json!({
        "data": {
            "og:title": title,
            "og:description": format!("{title} description"),
            "og:image": format!("https://img.example.com/{title}.png")
        }
    }))
}

#[tokio::test]
async fn test_resolve_open_graph_fields() {
    let resolver = MetadataResolver::new(ScriptedSource::default().reply(
        "https://example.com/post",
        Duration::ZERO,
        Reply::Body(json!({ "data": { "og:title": "A", "og:description": "B", "og:image": "C" } })),
    ));

    let result = resolver
        .resolve(&Url::parse("https://example.com/post").unwrap())
        .await;

    assert_eq!(
        result,
        PreviewResult {
            title: Some("A".into()),
            description: Some("B".into()),
            image_url: Some("C".into()),
        }
    );
}

#[tokio::test]
async fn test_resolve_generic_fields() {
    let resolver = MetadataResolver::new(ScriptedSource::default().reply(
        "https://example.com/post",
        Duration::ZERO,
        Reply::Body(json!({ "data": { "title": "A", "description": "B" } })),
    ));

    let result = resolver
        .resolve(&Url::parse("https://example.com/post").unwrap())
        .await;

    assert_eq!(result.title.as_deref(), Some("A"));
    assert_eq!(result.description.as_deref(), Some("B"));
    assert_eq!(result.image_url, None);
}

#[tokio::test]
async fn test_resolve_empty_body_and_failure_look_alike() {
    let source = ScriptedSource::default()
        .reply("https://empty.example.com/", Duration::ZERO, Reply::Body(json!({})))
        .reply("https://down.example.com/", Duration::ZERO, Reply::Status(503));
    let resolver = MetadataResolver::new(source);

    let empty = resolver
        .resolve_outcome(&Url::parse("https://empty.example.com").unwrap())
        .await;
    let down = resolver
        .resolve_outcome(&Url::parse("https://down.example.com").unwrap())
        .await;

    assert!(!empty.is_failed());
    assert!(down.is_failed());
    assert_eq!(empty.result(), down.result());

    let result = down.into_result();
    assert_eq!(result.title_or_placeholder(), NO_TITLE_PLACEHOLDER);
    assert_eq!(result.description_or_placeholder(), NO_DESCRIPTION_PLACEHOLDER);
    assert_eq!(result.image_url, None);
}

#[tokio::test]
async fn test_invalid_submission_keeps_result() {
    let card = PreviewCard::new(MetadataResolver::new(ScriptedSource::default().reply(
        "https://example.com/",
        Duration::ZERO,
        og_body("Example"),
    )));

    card.submit("https://example.com").unwrap();
    let before = card.settled().await;
    assert_eq!(before.status, ResolutionState::Resolved);

    let error = card.submit("not-a-url").unwrap_err();
    assert!(matches!(error, PreviewError::InvalidLink(_)));

    let after = card.snapshot();
    assert_eq!(after.result, before.result);
    assert_eq!(after.link, before.link);
    assert_eq!(after.request_id, before.request_id);
    assert_eq!(after.notice.as_ref().map(|n| n.input.as_str()), Some("not-a-url"));

    card.dismiss_notice();
    assert_eq!(card.snapshot().notice, None);
}

#[tokio::test]
async fn test_rejected_submission_returns_the_notice_error() {
    let card = PreviewCard::with_policy(
        MetadataResolver::new(ScriptedSource::default()),
        LinkPolicy::strict(),
    );

    let error = card.submit("  https://localhost:8080/admin ").unwrap_err();
    assert!(matches!(error, PreviewError::InvalidLink(_)));

    let state = card.snapshot();
    let notice = state.notice.as_ref().unwrap();
    assert_eq!(notice.input, "https://localhost:8080/admin");
    assert_eq!(notice.message, error.to_string());
    assert_eq!(state.status, ResolutionState::Idle);
    assert_eq!(state.request_id.get(), 0);

    let error = card.submit("ftp://example.com").unwrap_err();
    assert_eq!(
        card.snapshot().notice.map(|n| n.message),
        Some(error.to_string())
    );
}

#[tokio::test(start_paused = true)]
async fn test_stale_response_never_lands() {
    let card = PreviewCard::new(MetadataResolver::new(
        ScriptedSource::default()
            .reply("https://slow.example.com/", Duration::from_secs(5), og_body("Slow"))
            .reply("https://fast.example.com/", Duration::from_secs(1), og_body("Fast")),
    ));

    let first = card.submit("https://slow.example.com").unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;
    let second = card.submit("https://fast.example.com").unwrap();
    assert!(second > first);

    let settled = card.settled().await;
    assert_eq!(settled.result.title.as_deref(), Some("Fast"));

    tokio::time::sleep(Duration::from_secs(10)).await;
    let later = card.snapshot();
    assert_eq!(later.status, ResolutionState::Resolved);
    assert_eq!(later.result.title.as_deref(), Some("Fast"));
    assert_eq!(later.request_id, second);
}

#[tokio::test(start_paused = true)]
async fn test_busy_tracks_request_lifecycle() {
    let card = PreviewCard::new(MetadataResolver::new(ScriptedSource::default().reply(
        "https://example.com/",
        Duration::from_secs(8),
        og_body("Example"),
    )));
    let mut updates = card.subscribe();

    assert!(!card.snapshot().is_busy());
    card.submit("https://example.com").unwrap();
    assert!(card.snapshot().is_busy());

    // Still loading well past any fixed timer.
    tokio::time::sleep(Duration::from_secs(6)).await;
    assert!(card.snapshot().is_busy());

    let done = updates
        .wait_for(|state| !state.is_busy())
        .await
        .unwrap()
        .clone();
    assert_eq!(done.status, ResolutionState::Resolved);
    assert_eq!(done.result.title.as_deref(), Some("Example"));
}

#[tokio::test(start_paused = true)]
async fn test_failed_status_on_transport_error() {
    let card = PreviewCard::new(MetadataResolver::new(ScriptedSource::default().reply(
        "https://down.example.com/",
        Duration::from_millis(10),
        Reply::Status(500),
    )));

    card.submit("https://down.example.com").unwrap();
    let state = card.settled().await;

    assert_eq!(state.status, ResolutionState::Failed);
    assert!(state.result.is_empty());
    assert!(state.last_error.is_some());
}

#[tokio::test(start_paused = true)]
async fn test_clear_cancels_pending_request() {
    let source = ScriptedSource::default().reply(
        "https://example.com/",
        Duration::from_secs(2),
        og_body("Example"),
    );
    let finished = Arc::clone(&source.finished);
    let card = PreviewCard::new(MetadataResolver::new(source));

    card.submit("https://example.com").unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;
    card.clear();

    tokio::time::sleep(Duration::from_secs(5)).await;
    let state = card.snapshot();
    assert_eq!(state.status, ResolutionState::Idle);
    assert_eq!(state.link, None);
    assert!(state.result.is_empty());
    assert_eq!(finished.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn test_dropping_card_aborts_request() {
    let source = ScriptedSource::default().reply(
        "https://example.com/",
        Duration::from_secs(2),
        og_body("Example"),
    );
    let finished = Arc::clone(&source.finished);
    let card = PreviewCard::new(MetadataResolver::new(source));

    card.submit("https://example.com").unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;
    drop(card);

    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(finished.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_settled_on_idle_card_returns_immediately() {
    let card = PreviewCard::new(MetadataResolver::new(ScriptedSource::default()));
    let state = card.settled().await;
    assert_eq!(state.status, ResolutionState::Idle);
}
