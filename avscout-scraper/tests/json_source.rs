use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use avscout_core::{DiscoveredFile, Field, Identity, MetadataRecord, Movie};
use avscout_lib::{ConnectorSettings, MirrorSettings, NetworkSettings, Settings};
use avscout_scraper::client::{FetchRequest, HttpPool};
use avscout_scraper::*;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::time::{Duration, Instant};

/// Request line path and `x-api-key` header of one request the stub received.
#[derive(Debug, Clone)]
struct Seen {
    path: String,
    api_key: Option<String>,
}

/// Minimal HTTP/1.1 server answering canned responses by path. Unknown paths
/// get a 404.
struct Stub {
    base: String,
    seen: Arc<Mutex<Vec<Seen>>>,
}

impl Stub {
    async fn start(routes: &[(&str, u16, &str)]) -> Stub {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        let routes: Arc<HashMap<String, (u16, String)>> = Arc::new(
            routes
                .iter()
                .map(|(path, status, body)| (path.to_string(), (*status, body.to_string())))
                .collect(),
        );
        let seen = Arc::new(Mutex::new(Vec::new()));

        let log = Arc::clone(&seen);
        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                let routes = Arc::clone(&routes);
                let log = Arc::clone(&log);
                tokio::spawn(async move {
                    let mut buf = Vec::new();
                    let mut chunk = [0u8; 1024];
                    loop {
                        let n = socket.read(&mut chunk).await.unwrap_or(0);
                        if n == 0 {
                            break;
                        }
                        buf.extend_from_slice(&chunk[..n]);
                        if buf.windows(4).any(|w| w == b"\r\n\r\n") {
                            break;
                        }
                    }
                    let request = String::from_utf8_lossy(&buf).into_owned();
                    let path = request.split_whitespace().nth(1).unwrap_or("/").to_string();
                    let api_key = request.lines().find_map(|line| {
                        let (name, value) = line.split_once(':')?;
                        name.eq_ignore_ascii_case("x-api-key")
                            .then(|| value.trim().to_string())
                    });
                    log.lock().unwrap().push(Seen {
                        path: path.clone(),
                        api_key,
                    });

                    let (status, body) = routes
                        .get(&path)
                        .cloned()
                        .unwrap_or((404, "{}".to_string()));
                    let response = format!(
                        "HTTP/1.1 {} Stub\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                        status,
                        body.len(),
                        body
                    );
                    let _ = socket.write_all(response.as_bytes()).await;
                    let _ = socket.shutdown().await;
                });
            }
        });

        Stub { base, seen }
    }

    fn seen(&self) -> Vec<Seen> {
        self.seen.lock().unwrap().clone()
    }
}

fn connector_settings(url: &str) -> ConnectorSettings {
    ConnectorSettings {
        url: url.to_string(),
        path: "/v1/{id}".to_string(),
        detail_path: None,
        api_key_env: None,
        api_key_header: "X-Api-Key".to_string(),
    }
}

fn target(key: &str, hardworking: bool) -> CrawlTarget {
    CrawlTarget {
        identity: Identity::from_key(key, None).unwrap(),
        hardworking,
    }
}

async fn crawl(
    settings: ConnectorSettings,
    network: &NetworkSettings,
    target: &CrawlTarget,
) -> Result<MetadataRecord, ConnectorError> {
    let ctx = RunContext::new(network).unwrap();
    let connector = JsonSourceFactory::new("stub", settings).create(&ctx).await?;
    let mut record = MetadataRecord::new();
    connector.crawl_and_fill(target, &mut record).await?;
    Ok(record)
}

#[tokio::test]
async fn object_response_fills_the_record() {
    let stub = Stub::start(&[(
        "/v1/ABC-123",
        200,
        r#"{"title": "Found", "actress": ["One", "Two"], "score": 4.5}"#,
    )])
    .await;

    let record = crawl(
        connector_settings(&stub.base),
        &NetworkSettings::default(),
        &target("ABC-123", false),
    )
    .await
    .unwrap();

    assert_eq!(record.text(Field::Title), Some("Found"));
    assert_eq!(record.list(Field::Actress).map(<[String]>::len), Some(2));
    assert_eq!(record.text(Field::Score), Some("4.5"));
}

#[tokio::test]
async fn responses_map_to_failure_kinds() {
    let stub = Stub::start(&[
        ("/v1/NONE-001", 200, "[]"),
        ("/v1/DUPE-001", 200, r#"[{"title": "a"}, {"title": "b"}]"#),
        ("/v1/DENY-001", 403, "{}"),
        ("/v1/AUTH-001", 401, "{}"),
        ("/v1/FAIL-001", 500, "{}"),
        ("/v1/TEXT-001", 200, "not json"),
    ])
    .await;
    let network = NetworkSettings::default();

    let cases: [(&str, SkipReason); 7] = [
        ("NONE-001", SkipReason::NotFound),
        ("GONE-001", SkipReason::NotFound),
        ("DUPE-001", SkipReason::Duplicate),
        ("DENY-001", SkipReason::Blocked),
        ("AUTH-001", SkipReason::Credential),
        ("FAIL-001", SkipReason::SiteError),
        ("TEXT-001", SkipReason::SiteError),
    ];
    for (key, expected) in cases {
        let err = crawl(connector_settings(&stub.base), &network, &target(key, false))
            .await
            .unwrap_err();
        assert_eq!(err.skip_reason(), expected, "{}: {}", key, err);
    }
}

#[tokio::test]
async fn blocked_error_carries_a_hint() {
    let stub = Stub::start(&[("/v1/DENY-001", 403, "{}")]).await;
    let err = crawl(
        connector_settings(&stub.base),
        &NetworkSettings::default(),
        &target("DENY-001", false),
    )
    .await
    .unwrap_err();
    assert!(err.to_string().contains("proxy"));
}

#[tokio::test]
async fn hardworking_mode_fetches_details_without_overwriting() {
    let stub = Stub::start(&[
        ("/v1/ABC-123", 200, r#"{"title": "Lookup"}"#),
        (
            "/v1/ABC-123/detail",
            200,
            r#"{"title": "Detail", "plot": "Long plot"}"#,
        ),
    ])
    .await;
    let mut settings = connector_settings(&stub.base);
    settings.detail_path = Some("v1/{id}/detail".to_string());
    let network = NetworkSettings::default();

    let lazy = crawl(settings.clone(), &network, &target("ABC-123", false))
        .await
        .unwrap();
    assert!(!lazy.is_set(Field::Plot));

    let thorough = crawl(settings, &network, &target("ABC-123", true))
        .await
        .unwrap();
    assert_eq!(thorough.text(Field::Title), Some("Lookup"));
    assert_eq!(thorough.text(Field::Plot), Some("Long plot"));
}

#[tokio::test]
async fn api_key_is_sent_from_the_environment() {
    const VAR: &str = "AVSCOUT_STUB_KEY_FOR_HEADER_TEST";
    // SAFETY: no other test touches this variable.
    unsafe { std::env::set_var(VAR, "secret") };

    let stub = Stub::start(&[("/v1/ABC-123", 200, r#"{"title": "T"}"#)]).await;
    let mut settings = connector_settings(&stub.base);
    settings.api_key_env = Some(VAR.to_string());

    crawl(settings, &NetworkSettings::default(), &target("ABC-123", false))
        .await
        .unwrap();
    let seen = stub.seen();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].api_key.as_deref(), Some("secret"));
}

#[tokio::test]
async fn missing_api_key_fails_creation() {
    let mut settings = connector_settings("http://127.0.0.1:1");
    settings.api_key_env = Some("AVSCOUT_STUB_KEY_NEVER_SET".to_string());

    let err = crawl(settings, &NetworkSettings::default(), &target("ABC-123", false))
        .await
        .unwrap_err();
    assert_eq!(err.skip_reason(), SkipReason::Credential);
    assert!(err.to_string().contains("AVSCOUT_STUB_KEY_NEVER_SET"));
}

#[tokio::test]
async fn connector_uses_the_first_reachable_mirror() {
    let stub = Stub::start(&[
        ("/", 200, "{}"),
        ("/v1/FC2-123456", 200, r#"{"title": "Via mirror"}"#),
    ])
    .await;

    let mut network = NetworkSettings::default();
    network.mirrors.insert(
        "stub".to_string(),
        MirrorSettings {
            preferred: None,
            candidates: vec!["http://127.0.0.1:1".to_string(), stub.base.clone()],
        },
    );
    let ctx = RunContext::new(&network).unwrap();
    let connector = JsonSourceFactory::new("stub", connector_settings("http://unreachable.invalid"))
        .create(&ctx)
        .await
        .unwrap();

    assert_eq!(ctx.resolver().cached("stub").await, Some(stub.base.clone()));
    let mut record = MetadataRecord::new();
    connector
        .crawl_and_fill(&target("FC2-123456", false), &mut record)
        .await
        .unwrap();
    assert_eq!(record.text(Field::Title), Some("Via mirror"));
}

#[tokio::test]
async fn http_probe_reports_reachability() {
    let stub = Stub::start(&[("/", 200, "{}")]).await;
    let ctx = RunContext::new(&NetworkSettings::default()).unwrap();
    let probe = HttpProbe::new(
        Arc::clone(ctx.http()),
        Duration::from_secs(2),
    );

    assert!(probe.is_reachable(&stub.base).await);
    assert!(!probe.is_reachable(&format!("{}/missing", stub.base)).await);
    assert!(!probe.is_reachable("http://127.0.0.1:1").await);
}

/// Answers every request with an empty 200, but only after `delay`.
async fn slow_server(delay: Duration) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());
    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                let mut chunk = [0u8; 1024];
                let _ = socket.read(&mut chunk).await;
                tokio::time::sleep(delay).await;
                let response = b"HTTP/1.1 200 OK\r\n\
                    Content-Length: 2\r\nConnection: close\r\n\r\n{}";
                let _ = socket.write_all(response).await;
            });
        }
    });
    base
}

#[tokio::test]
async fn refused_connections_are_retried_then_reported_as_transport() {
    // Bind then drop, so the port refuses connections.
    let addr = TcpListener::bind("127.0.0.1:0")
        .await
        .unwrap()
        .local_addr()
        .unwrap();
    let mut network = NetworkSettings::default();
    network.retry = 2;
    let pool = HttpPool::new(&network).unwrap();

    let started = Instant::now();
    let err = pool
        .get(&FetchRequest::new("s", "ABC-123", format!("http://{}/", addr)))
        .await
        .unwrap_err();

    assert!(
        matches!(err, ConnectorError::Transport { attempts: 3, .. }),
        "{:?}",
        err
    );
    assert_eq!(err.skip_reason(), SkipReason::SiteError);
    // Linear backoff: 0.5s after the first attempt, 1.0s after the second.
    assert!(started.elapsed() >= Duration::from_millis(1500));
}

#[tokio::test]
async fn probe_gives_up_after_its_timeout() {
    let base = slow_server(Duration::from_secs(3)).await;
    let mut network = NetworkSettings::default();
    network.probe_timeout_secs = 1;
    let ctx = RunContext::new(&network).unwrap();
    let probe = HttpProbe::new(
        Arc::clone(ctx.http()),
        Duration::from_secs(network.probe_timeout_secs),
    );

    let started = Instant::now();
    assert!(!probe.is_reachable(&base).await);
    assert!(started.elapsed() < Duration::from_secs(3));
}

#[tokio::test]
async fn orchestrator_falls_through_configured_sources() {
    let stub = Stub::start(&[
        ("/first/ABC-123", 200, "[]"),
        (
            "/second/ABC-123",
            200,
            r#"{"title": "Second", "cover": "http://img/1.jpg", "genre": ["Drama", "drama"]}"#,
        ),
    ])
    .await;

    let mut settings = Settings::default();
    for name in ["first", "second"] {
        let mut connector = connector_settings(&stub.base);
        connector.path = format!("/{}/{{id}}", name);
        settings.connectors.insert(name.to_string(), connector);
    }
    settings.sources.normal = vec!["first".to_string(), "second".to_string()];

    let registry = ConnectorRegistry::from_settings(&settings);
    let orchestrator = Orchestrator::from_settings(&settings, &registry).unwrap();
    let movie = Movie::new(
        Identity::from_key("ABC-123", None).unwrap(),
        vec![DiscoveredFile::new("/movies/ABC-123.mp4", 1)],
    );

    let result = orchestrator.aggregate(&movie, None).await;
    assert!(result.outcome.is_satisfied());
    assert_eq!(result.record.source_of(Field::Title), Some("second"));
    assert_eq!(
        result.record.list(Field::GenreNorm),
        Some(&["Drama".to_string()][..])
    );
    assert!(matches!(
        result.attempts[0].result,
        AttemptResult::Skipped {
            reason: SkipReason::NotFound,
            ..
        }
    ));
}

#[test]
fn unknown_connector_ids_are_rejected_up_front() {
    let mut settings = Settings::default();
    settings.sources.normal = vec!["nowhere".to_string()];
    settings.sources.fc2 = vec!["elsewhere".to_string()];

    let registry = ConnectorRegistry::from_settings(&settings);
    let Err(err) = Orchestrator::from_settings(&settings, &registry) else {
        panic!("expected a configuration error");
    };
    let message = err.to_string();
    assert!(message.contains("nowhere"));
    assert!(message.contains("elsewhere"));
}
