//! End-to-end ingest flow: webhook payload → lead resolution → message
//! normalization → media re-hosting, over a file-backed store and bucket.

use std::sync::Arc;

use leadcrab::config::GatewayConfig;
use leadcrab::ingest::{InboundEvent, IngestOutcome, IngestPipeline, SkipReason};
use leadcrab::leads::LeadStore;
use leadcrab::media::MediaIngestor;
use leadcrab::storage::{FsBucketStorage, MediaReference};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

struct Harness {
    pipeline: IngestPipeline,
    store: Arc<LeadStore>,
    _dir: tempfile::TempDir,
    bucket_root: std::path::PathBuf,
}

fn harness(gateway: Option<GatewayConfig>) -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(LeadStore::new(dir.path().join("leads.db")).unwrap());
    let bucket_root = dir.path().join("storage");
    let storage = Arc::new(FsBucketStorage::new("lead-media", bucket_root.clone()));
    let media = MediaIngestor::new(storage, gateway);
    Harness {
        pipeline: IngestPipeline::new(store.clone(), media),
        store,
        _dir: dir,
        bucket_root,
    }
}

fn event(chat_id: &str, message_type: &str, content: &str) -> InboundEvent {
    InboundEvent {
        chat_id: chat_id.to_string(),
        message_type: message_type.to_string(),
        content: content.to_string(),
        media_url: None,
        sender_name: Some("Ana Clara".to_string()),
    }
}

#[tokio::test]
async fn full_conversation_flow() {
    let h = harness(None);

    // First contact creates the lead
    let outcome = h
        .pipeline
        .process(&event("5511987654321@c.us", "chat", "quero um orçamento"))
        .await
        .unwrap();
    let IngestOutcome::Accepted { lead, message } = outcome else {
        panic!("expected accepted");
    };
    assert_eq!(lead.phone, "11987654321");
    assert_eq!(lead.country_code, "55");
    assert_eq!(message.message_type, "text");
    assert_eq!(h.store.count().unwrap(), 1);

    // Same person, pushed without the 9th digit — must not fork the lead
    let outcome = h
        .pipeline
        .process(&event("551187654321@c.us", "chat", "ainda está aí?"))
        .await
        .unwrap();
    let IngestOutcome::Accepted { lead: second, .. } = outcome else {
        panic!("expected accepted");
    };
    assert_eq!(second.id, lead.id);
    assert_eq!(h.store.count().unwrap(), 1);

    // Group noise and gateway markers never reach persistence
    let outcome = h
        .pipeline
        .process(&event("120363000111222333444@g.us", "chat", "group talk"))
        .await
        .unwrap();
    assert!(matches!(
        outcome,
        IngestOutcome::Skipped {
            reason: SkipReason::GroupChat
        }
    ));
    let outcome = h
        .pipeline
        .process(&event("5511987654321@c.us", "chat", "[Áudio]"))
        .await
        .unwrap();
    assert!(matches!(
        outcome,
        IngestOutcome::Skipped {
            reason: SkipReason::PlaceholderContent
        }
    ));
    assert_eq!(h.store.count().unwrap(), 1);
}

#[tokio::test]
async fn media_rehosted_through_authenticated_gateway() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/media/audio.ogg"))
        .and(header("X-Api-Key", "k-123"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(b"voice-note-bytes")
                .insert_header("content-type", "audio/ogg; codecs=opus"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let h = harness(Some(GatewayConfig {
        base_url: Some(server.uri()),
        api_key: "k-123".to_string(),
    }));

    // Gateway hands out a loopback URL; the ingestor rewrites it onto the
    // gateway host before fetching
    let mut ev = event("5511987654321@c.us", "ptt", "");
    ev.media_url = Some("http://localhost:3000/media/audio.ogg".to_string());

    let outcome = h.pipeline.process(&ev).await.unwrap();
    let IngestOutcome::Accepted { lead, message } = outcome else {
        panic!("expected accepted");
    };
    assert_eq!(message.message_type, "audio");

    let media = message.media.expect("media should be re-hosted");
    assert_eq!(media.bucket(), "lead-media");
    assert!(media.path().starts_with(&format!("leads/{}/", lead.id)));
    assert!(media.path().ends_with(".ogg"));

    // The reference round-trips and the bytes landed in the private bucket
    let parsed = MediaReference::parse(&media.to_string()).unwrap();
    assert_eq!(parsed, media);
    let on_disk = h.bucket_root.join("lead-media").join(media.path());
    assert_eq!(std::fs::read(on_disk).unwrap(), b"voice-note-bytes");
}

#[tokio::test]
async fn unsupported_and_unknown_types() {
    let h = harness(None);

    let outcome = h
        .pipeline
        .process(&event("5511987654321@c.us", "reaction", "👍"))
        .await
        .unwrap();
    assert!(matches!(
        outcome,
        IngestOutcome::Skipped {
            reason: SkipReason::UnsupportedType
        }
    ));

    // Unknown types degrade to text instead of being dropped
    let outcome = h
        .pipeline
        .process(&event("5511987654321@c.us", "bogus_kind", "still a message"))
        .await
        .unwrap();
    let IngestOutcome::Accepted { message, .. } = outcome else {
        panic!("expected accepted");
    };
    assert_eq!(message.message_type, "text");
    assert_eq!(message.content, "still a message");
}
