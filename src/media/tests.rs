use super::*;
use crate::config::GatewayConfig;
use crate::storage::FsBucketStorage;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn gateway_for(server: &MockServer) -> GatewayConfig {
    GatewayConfig {
        base_url: Some(server.uri()),
        api_key: "gw-key".to_string(),
    }
}

fn make_ingestor(server: &MockServer, dir: &tempfile::TempDir) -> MediaIngestor {
    let storage = Arc::new(FsBucketStorage::new("lead-media", dir.path()));
    MediaIngestor::new(storage, Some(gateway_for(server)))
}

// --- URL normalization / rewrite (pure helpers) ---

#[test]
fn test_normalize_adds_https() {
    let url = normalize_media_url("gw.example.com/media/1.jpg").unwrap();
    assert_eq!(url.as_str(), "https://gw.example.com/media/1.jpg");
}

#[test]
fn test_normalize_keeps_existing_scheme() {
    let url = normalize_media_url("http://gw.example.com/1.jpg").unwrap();
    assert_eq!(url.scheme(), "http");
}

#[test]
fn test_normalize_rejects_empty() {
    assert!(normalize_media_url("").is_err());
    assert!(normalize_media_url("   ").is_err());
}

#[test]
fn test_rewrite_localhost_to_gateway() {
    let base = Url::parse("https://gw.example.com").unwrap();
    let url = Url::parse("http://localhost:3000/file.jpg?tok=abc").unwrap();
    let rewritten = rewrite_loopback(url, Some(&base));
    assert_eq!(rewritten.as_str(), "https://gw.example.com/file.jpg?tok=abc");
}

#[test]
fn test_rewrite_127_0_0_1() {
    let base = Url::parse("https://gw.example.com:8443").unwrap();
    let url = Url::parse("http://127.0.0.1/media/2.ogg").unwrap();
    let rewritten = rewrite_loopback(url, Some(&base));
    assert_eq!(rewritten.as_str(), "https://gw.example.com:8443/media/2.ogg");
}

#[test]
fn test_rewrite_leaves_real_hosts_alone() {
    let base = Url::parse("https://gw.example.com").unwrap();
    let url = Url::parse("https://cdn.example.net/3.mp4").unwrap();
    assert_eq!(rewrite_loopback(url.clone(), Some(&base)), url);
}

#[test]
fn test_rewrite_without_gateway_base() {
    let url = Url::parse("http://localhost:3000/file.jpg").unwrap();
    assert_eq!(rewrite_loopback(url.clone(), None), url);
}

// --- extension mapping ---

#[test]
fn test_extension_exact_match() {
    assert_eq!(extension_for("image/jpeg", "image"), "jpg");
    assert_eq!(extension_for("application/pdf", "document"), "pdf");
    // Exact lookup keeps audio/mp4 from substring-matching video/mp4
    assert_eq!(extension_for("audio/mp4", "audio"), "m4a");
}

#[test]
fn test_extension_substring_match() {
    assert_eq!(extension_for("audio/ogg; codecs=opus", "audio"), "ogg");
}

#[test]
fn test_extension_type_fallback() {
    assert_eq!(extension_for("application/octet-stream", "audio"), "ogg");
    assert_eq!(extension_for("", "video"), "mp4");
    assert_eq!(extension_for("", "image"), "jpg");
    assert_eq!(extension_for("weird/thing", "text"), "bin");
}

// --- full ingest flow ---

#[tokio::test]
async fn test_ingest_rewrites_localhost_and_stores() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/media/file.jpg"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(vec![0xFF, 0xD8, 0xFF, 0xE0])
                .insert_header("content-type", "image/jpeg"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let ingestor = make_ingestor(&server, &dir);

    // Gateway emitted an unreachable loopback URL
    let reference = ingestor
        .ingest("http://localhost:3000/media/file.jpg", "image", 7)
        .await
        .expect("ingest should succeed");

    assert_eq!(reference.bucket(), "lead-media");
    assert!(reference.path().starts_with("leads/7/"), "{}", reference.path());
    assert!(reference.path().ends_with(".jpg"));
    assert!(reference.to_string().starts_with("storage://lead-media/leads/7/"));

    let on_disk = dir
        .path()
        .join("lead-media")
        .join(reference.path());
    assert_eq!(std::fs::read(on_disk).unwrap(), vec![0xFF, 0xD8, 0xFF, 0xE0]);
}

#[tokio::test]
async fn test_ingest_sends_both_auth_headers_to_gateway() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/m.ogg"))
        .and(header("X-Api-Key", "gw-key"))
        .and(header("Authorization", "Bearer gw-key"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(b"oggdata")
                .insert_header("content-type", "audio/ogg"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let ingestor = make_ingestor(&server, &dir);
    let media_url = format!("{}/m.ogg", server.uri());
    let reference = ingestor.ingest(&media_url, "audio", 3).await.unwrap();
    assert!(reference.path().ends_with(".ogg"));
}

#[tokio::test]
async fn test_ingest_falls_back_to_bare_authorization() {
    let server = MockServer::start().await;
    // Keyed headers rejected by this gateway version
    Mock::given(method("GET"))
        .and(path("/m.bin"))
        .and(header("Authorization", "Bearer gw-key"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/m.bin"))
        .and(header("Authorization", "gw-key"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"data"))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let ingestor = make_ingestor(&server, &dir);
    let media_url = format!("{}/m.bin", server.uri());
    let reference = ingestor.ingest(&media_url, "document", 9).await;
    assert!(reference.is_some());
}

#[tokio::test]
async fn test_ingest_all_auth_formats_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let ingestor = make_ingestor(&server, &dir);
    let media_url = format!("{}/m.jpg", server.uri());
    assert!(ingestor.ingest(&media_url, "image", 1).await.is_none());
}

#[tokio::test]
async fn test_ingest_no_auth_for_foreign_hosts() {
    let media_server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(b"img")
                .insert_header("content-type", "image/png"),
        )
        .mount(&media_server)
        .await;
    // Gateway config points at a different host:port
    let gateway = GatewayConfig {
        base_url: Some("https://gw.example.com".to_string()),
        api_key: "gw-key".to_string(),
    };

    let dir = tempfile::tempdir().unwrap();
    let storage = Arc::new(FsBucketStorage::new("lead-media", dir.path()));
    let ingestor = MediaIngestor::new(storage, Some(gateway));
    let media_url = format!("{}/pic.png", media_server.uri());
    let reference = ingestor.ingest(&media_url, "image", 2).await.unwrap();
    assert!(reference.path().ends_with(".png"));

    let requests = media_server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    assert!(!requests[0].headers.contains_key("x-api-key"));
    assert!(!requests[0].headers.contains_key("authorization"));
}

#[tokio::test]
async fn test_ingest_http_error_returns_none() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let ingestor = make_ingestor(&server, &dir);
    let media_url = format!("{}/gone.jpg", server.uri());
    assert!(ingestor.ingest(&media_url, "image", 1).await.is_none());
}

#[tokio::test]
async fn test_ingest_empty_body_returns_none() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let ingestor = make_ingestor(&server, &dir);
    let media_url = format!("{}/empty.jpg", server.uri());
    assert!(ingestor.ingest(&media_url, "image", 1).await.is_none());
}

#[tokio::test]
async fn test_ingest_invalid_url_returns_none() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let ingestor = make_ingestor(&server, &dir);
    assert!(ingestor.ingest("", "image", 1).await.is_none());
}
