//! # Integration Tests
//!
//! End-to-end tests over the full pipeline: facade -> dispatcher -> queue ->
//! transport, with persistence adapters in the loop. No real collector
//! required; the HTTP round trip runs against a loopback listener.

#[cfg(test)]
mod pipeline_tests {
    use std::sync::Arc;
    use std::time::Duration;

    use client::{ClientBuilder, SdkConfig, TelemetryClient};
    use contracts::Platform;
    use serde_json::json;
    use storage::MemoryStore;
    use tokio::time::sleep;
    use transport::{MockReply, MockTransport};

    fn config(max_batch_size: usize) -> SdkConfig {
        let mut config = SdkConfig::new("secret-key", "https://collector.example.com/v1/events");
        config.max_batch_size = max_batch_size;
        config.flush_interval_ms = 60_000;
        config
    }

    fn build_client(
        config: SdkConfig,
        transport: MockTransport,
        store: MemoryStore,
    ) -> TelemetryClient<MockTransport, MemoryStore> {
        ClientBuilder::new(config, transport, store).build().unwrap()
    }

    async fn wait_for(mut condition: impl FnMut() -> bool) {
        for _ in 0..200 {
            if condition() {
                return;
            }
            sleep(Duration::from_millis(10)).await;
        }
        panic!("condition not met within 2s");
    }

    /// Batch trigger: reaching max_batch_size flushes exactly once without
    /// an explicit flush call.
    #[tokio::test]
    async fn test_batch_trigger() {
        let transport = MockTransport::new();
        let store = MemoryStore::new();
        let client = build_client(config(3), transport.clone(), store.clone());
        client.init().await.unwrap();

        for name in ["a", "b", "c"] {
            client.track(name, None, None).unwrap();
        }

        wait_for(|| transport.calls() == 1).await;
        assert_eq!(transport.batch_names(0), vec!["a", "b", "c"]);
        assert_eq!(client.pending_events(), 0);
        wait_for(|| store.pending_names().is_empty()).await;

        client.dispose().await;
        assert_eq!(transport.calls(), 1);
    }

    /// 5xx requeue: the failed batch regains head position and is
    /// reattempted before newer events.
    #[tokio::test]
    async fn test_server_error_requeue() {
        let transport = MockTransport::with_replies([MockReply::Status(500)]);
        let store = MemoryStore::new();
        let client = build_client(config(3), transport.clone(), store.clone());
        client.init().await.unwrap();

        for name in ["a", "b", "c"] {
            client.track(name, None, None).unwrap();
        }

        wait_for(|| transport.calls() == 1 && client.pending_events() == 3).await;
        assert_eq!(store.pending_names(), vec!["a", "b", "c"]);

        client.track("d", None, None).unwrap();
        client.flush().await.unwrap();

        assert_eq!(transport.batch_names(1), vec!["a", "b", "c"]);
        assert_eq!(client.pending_events(), 1);

        client.flush().await.unwrap();
        assert_eq!(transport.batch_names(2), vec!["d"]);
        client.dispose().await;
    }

    /// 4xx drop: no retry, queue and slot emptied.
    #[tokio::test]
    async fn test_client_error_drop() {
        let transport = MockTransport::with_replies([MockReply::Status(400)]);
        let store = MemoryStore::new();
        let client = build_client(config(10), transport.clone(), store.clone());
        client.init().await.unwrap();

        client.track("a", None, None).unwrap();
        client.track("b", None, None).unwrap();
        client.flush().await.unwrap();

        assert_eq!(transport.calls(), 1);
        assert_eq!(client.pending_events(), 0);
        assert!(store.pending_names().is_empty());
        assert_eq!(client.metrics().retries_scheduled, 0);
        client.dispose().await;
    }

    /// Buffer overflow: the oldest event is evicted and counted.
    #[tokio::test]
    async fn test_buffer_overflow() {
        let transport = MockTransport::new();
        let mut cfg = config(10);
        cfg.max_buffer_size = Some(2);
        let client = build_client(cfg, transport.clone(), MemoryStore::new());
        client.init().await.unwrap();

        for name in ["a", "b", "c"] {
            client.track(name, None, None).unwrap();
        }

        assert_eq!(client.pending_events(), 2);
        assert_eq!(client.metrics().dropped_overflow, 1);

        client.flush().await.unwrap();
        assert_eq!(transport.batch_names(0), vec!["b", "c"]);
        client.dispose().await;
    }

    /// Concurrent flush triggers collapse into a single transport request.
    #[tokio::test]
    async fn test_concurrent_flush() {
        let transport = MockTransport::new();
        let client = Arc::new(build_client(config(10), transport.clone(), MemoryStore::new()));
        client.init().await.unwrap();

        client.track("a", None, None).unwrap();
        client.track("b", None, None).unwrap();

        let first = {
            let client = Arc::clone(&client);
            tokio::spawn(async move { client.flush().await })
        };
        let second = {
            let client = Arc::clone(&client);
            tokio::spawn(async move { client.flush().await })
        };
        first.await.unwrap().unwrap();
        second.await.unwrap().unwrap();

        assert_eq!(transport.calls(), 1);
        assert_eq!(transport.batch_names(0), vec!["a", "b"]);
        client.dispose().await;
    }

    /// Transport-level failure is retryable, and the scheduled retry
    /// eventually delivers without any manual flush.
    #[tokio::test]
    async fn test_transport_error_retries_in_background() {
        let transport =
            MockTransport::with_replies([MockReply::Error("connection reset".into())]);
        let store = MemoryStore::new();
        let client = build_client(config(2), transport.clone(), store.clone());
        client.init().await.unwrap();

        client.track("a", None, None).unwrap();
        client.track("b", None, None).unwrap();

        // first attempt fails and requeues
        wait_for(|| transport.calls() == 1 && client.pending_events() == 2).await;
        assert_eq!(client.metrics().retries_scheduled, 1);

        // backoff for the first retry is 1-2s
        for _ in 0..40 {
            if transport.calls() >= 2 {
                break;
            }
            sleep(Duration::from_millis(100)).await;
        }
        assert_eq!(transport.batch_names(1), vec!["a", "b"]);
        wait_for(|| client.pending_events() == 0).await;
        client.dispose().await;
    }

    /// The periodic ticker flushes below-threshold events on its own.
    #[tokio::test]
    async fn test_timer_driven_flush() {
        let transport = MockTransport::new();
        let mut cfg = config(10);
        cfg.flush_interval_ms = 100;
        let client = build_client(cfg, transport.clone(), MemoryStore::new());
        client.init().await.unwrap();

        client.track("lone", None, None).unwrap();
        wait_for(|| transport.calls() >= 1).await;

        assert_eq!(transport.batch_names(0), vec!["lone"]);
        client.dispose().await;
    }

    /// Storage quota: the adapter sheds oldest persisted events but the
    /// in-memory queue stays authoritative and everything still delivers.
    #[tokio::test]
    async fn test_quota_bounded_store() {
        let transport = MockTransport::with_replies([MockReply::Status(503)]);
        let store = MemoryStore::with_quota(2);
        let client = build_client(config(3), transport.clone(), store.clone());
        client.init().await.unwrap();

        for name in ["a", "b", "c"] {
            client.track(name, None, None).unwrap();
        }

        wait_for(|| transport.calls() == 1 && client.pending_events() == 3).await;
        // reduced save kept the newest two
        assert_eq!(store.pending_names(), vec!["b", "c"]);

        client.flush().await.unwrap();
        assert_eq!(transport.batch_names(1), vec!["a", "b", "c"]);
        assert_eq!(client.pending_events(), 0);
        client.dispose().await;
    }

    /// A non-quota save failure never reaches the caller; delivery still
    /// succeeds from memory.
    #[tokio::test]
    async fn test_save_failure_is_swallowed() {
        let transport = MockTransport::new();
        let store = MemoryStore::new();
        let client = build_client(config(10), transport.clone(), store.clone());
        client.init().await.unwrap();

        store.fail_saves(true);
        client.track("a", None, None).unwrap();
        client.flush().await.unwrap();

        assert_eq!(transport.batch_names(0), vec!["a"]);
        client.dispose().await;
    }

    /// Wire contract: the configured endpoint and api-key header reach the
    /// transport on every call.
    #[tokio::test]
    async fn test_endpoint_and_headers() {
        let transport = MockTransport::new();
        let client = build_client(config(10), transport.clone(), MemoryStore::new());
        client.init().await.unwrap();

        client.track("a", None, None).unwrap();
        client.flush().await.unwrap();

        assert_eq!(
            transport.last_endpoint().as_deref(),
            Some("https://collector.example.com/v1/events")
        );
        assert_eq!(transport.last_headers().unwrap()["X-API-Key"], "secret-key");
        client.dispose().await;
    }

    /// Platform probe output lands on every event.
    #[tokio::test]
    async fn test_platform_probe() {
        let transport = MockTransport::new();
        let client = ClientBuilder::new(config(10), transport.clone(), MemoryStore::new())
            .platform_probe(Arc::new(|| {
                Some(Platform::Native {
                    device: "pixel-9".into(),
                    os: "android-15".into(),
                })
            }))
            .build()
            .unwrap();
        client.init().await.unwrap();

        client.track("open", Some([("screen".to_string(), json!("home"))].into()), None)
            .unwrap();
        client.flush().await.unwrap();

        let batches = transport.batches();
        let event = &batches[0][0];
        assert!(matches!(event.platform, Some(Platform::Native { .. })));
        assert_eq!(event.payload.as_ref().unwrap()["screen"], json!("home"));
        client.dispose().await;
    }
}

#[cfg(test)]
mod restart_tests {
    use std::path::PathBuf;
    use std::time::Duration;

    use client::{ClientBuilder, SdkConfig, TelemetryClient};
    use storage::{EventStore, FileStore};
    use tokio::time::sleep;
    use transport::{MockReply, MockTransport};

    fn config() -> SdkConfig {
        let mut config = SdkConfig::new("secret-key", "https://collector.example.com/v1/events");
        config.max_batch_size = 10;
        config.flush_interval_ms = 60_000;
        config
    }

    fn slot_path(tag: &str) -> PathBuf {
        std::env::temp_dir().join(format!("telemetry-e2e-{}-{}.json", std::process::id(), tag))
    }

    fn build_client(
        transport: MockTransport,
        store: FileStore,
    ) -> TelemetryClient<MockTransport, FileStore> {
        ClientBuilder::new(config(), transport, store).build().unwrap()
    }

    async fn wait_for(mut condition: impl FnMut() -> bool) {
        for _ in 0..200 {
            if condition() {
                return;
            }
            sleep(Duration::from_millis(10)).await;
        }
        panic!("condition not met within 2s");
    }

    /// Events stranded by an outage survive dispose and a fresh client
    /// delivers them after init.
    #[tokio::test]
    async fn test_pending_events_survive_restart() {
        let path = slot_path("restart");
        let store = FileStore::new(&path);
        store.clear().await.unwrap();

        // first lifetime: collector down
        let down = MockTransport::with_replies([MockReply::Error("offline".into())]);
        let client = build_client(down.clone(), store.clone());
        client.init().await.unwrap();

        client.track("a", None, None).unwrap();
        client.track("b", None, None).unwrap();
        client.flush().await.unwrap();
        wait_for(|| client.pending_events() == 2).await;
        client.dispose().await;

        // second lifetime: collector back
        let up = MockTransport::new();
        let revived = build_client(up.clone(), FileStore::new(&path));
        revived.init().await.unwrap();
        assert_eq!(revived.pending_events(), 2);

        revived.flush().await.unwrap();
        assert_eq!(up.batch_names(0), vec!["a", "b"]);
        assert_eq!(revived.pending_events(), 0);

        revived.dispose().await;
        FileStore::new(&path).clear().await.unwrap();
    }

    /// Re-init after dispose starts from exactly what the slot holds.
    #[tokio::test]
    async fn test_reinit_clean_state() {
        let path = slot_path("reinit");
        let store = FileStore::new(&path);
        store.clear().await.unwrap();

        let transport = MockTransport::with_replies([MockReply::Status(500)]);
        let client = build_client(transport.clone(), store.clone());
        client.init().await.unwrap();

        client.track("a", None, None).unwrap();
        client.flush().await.unwrap();
        assert_eq!(client.pending_events(), 1);

        client.dispose().await;
        assert_eq!(client.pending_events(), 0);

        client.init().await.unwrap();
        assert_eq!(client.pending_events(), 1);
        assert_eq!(client.metrics().enqueued, 1);

        client.dispose().await;
        FileStore::new(&path).clear().await.unwrap();
    }
}

#[cfg(test)]
mod http_tests {
    use std::sync::Arc;
    use std::time::Duration;

    use client::{ClientBuilder, SdkConfig};
    use storage::MemoryStore;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::sync::Mutex;
    use transport::HttpTransport;

    /// Minimal one-shot HTTP collector: accepts connections, answers every
    /// request with the given status and records the bodies.
    async fn spawn_collector(status: u16) -> (String, Arc<Mutex<Vec<String>>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let bodies = Arc::new(Mutex::new(Vec::new()));

        let recorded = Arc::clone(&bodies);
        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                let recorded = Arc::clone(&recorded);
                tokio::spawn(async move {
                    let mut buf = Vec::new();
                    let mut chunk = [0u8; 4096];

                    // read headers
                    let header_end = loop {
                        let n = match socket.read(&mut chunk).await {
                            Ok(0) | Err(_) => return,
                            Ok(n) => n,
                        };
                        buf.extend_from_slice(&chunk[..n]);
                        if let Some(pos) = find_subslice(&buf, b"\r\n\r\n") {
                            break pos + 4;
                        }
                    };

                    // read the body per content-length
                    let headers = String::from_utf8_lossy(&buf[..header_end]).to_string();
                    let content_length = headers
                        .lines()
                        .find_map(|line| {
                            let (name, value) = line.split_once(':')?;
                            name.eq_ignore_ascii_case("content-length")
                                .then(|| value.trim().parse::<usize>().ok())?
                        })
                        .unwrap_or(0);

                    while buf.len() < header_end + content_length {
                        let n = match socket.read(&mut chunk).await {
                            Ok(0) | Err(_) => return,
                            Ok(n) => n,
                        };
                        buf.extend_from_slice(&chunk[..n]);
                    }

                    let body =
                        String::from_utf8_lossy(&buf[header_end..header_end + content_length])
                            .to_string();
                    recorded.lock().await.push(body);

                    let response = format!(
                        "HTTP/1.1 {status} X\r\ncontent-length: 2\r\nconnection: close\r\n\r\n{{}}"
                    );
                    let _ = socket.write_all(response.as_bytes()).await;
                    let _ = socket.shutdown().await;
                });
            }
        });

        (format!("http://{addr}/v1/events"), bodies)
    }

    fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
        haystack
            .windows(needle.len())
            .position(|window| window == needle)
    }

    /// Full round trip through the real HTTP transport against a loopback
    /// collector.
    #[tokio::test]
    async fn test_http_round_trip() {
        let (endpoint, bodies) = spawn_collector(200).await;

        // endpoint validation is for production config; wire the dispatcher
        // directly to keep the loopback listener in plain http
        let mut config = SdkConfig::new("secret-key", &endpoint);
        config.max_batch_size = 10;
        config.flush_interval_ms = 60_000;

        let dispatcher = dispatcher::Dispatcher::new(
            config,
            HttpTransport::new(),
            MemoryStore::new(),
            contracts::no_metadata(),
            contracts::no_session(),
            contracts::no_platform(),
        );
        dispatcher.init().await.unwrap();

        dispatcher
            .enqueue(contracts::EventDraft::new("signup"))
            .unwrap();
        dispatcher.flush().await.unwrap();

        tokio::time::timeout(Duration::from_secs(2), async {
            loop {
                if !bodies.lock().await.is_empty() {
                    break;
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("collector never saw the batch");

        let recorded = bodies.lock().await;
        assert!(recorded[0].contains("\"signup\""));
        drop(recorded);

        assert_eq!(dispatcher.queue_len(), 0);
        dispatcher.dispose().await;
    }

    /// A 5xx from a real HTTP server is classified as retryable.
    #[tokio::test]
    async fn test_http_server_error_requeues() {
        let (endpoint, _bodies) = spawn_collector(500).await;

        let mut config = SdkConfig::new("secret-key", &endpoint);
        config.max_batch_size = 10;
        config.flush_interval_ms = 60_000;

        let dispatcher = dispatcher::Dispatcher::new(
            config,
            HttpTransport::new(),
            MemoryStore::new(),
            contracts::no_metadata(),
            contracts::no_session(),
            contracts::no_platform(),
        );
        dispatcher.init().await.unwrap();

        dispatcher
            .enqueue(contracts::EventDraft::new("signup"))
            .unwrap();
        dispatcher.flush().await.unwrap();

        assert_eq!(dispatcher.queue_len(), 1);
        assert_eq!(dispatcher.metrics().retries_scheduled, 1);
        dispatcher.dispose().await;
    }

    // ClientBuilder enforces https; keep that contract visible here next to
    // the plain-http dispatcher wiring above.
    #[tokio::test]
    async fn test_facade_rejects_plain_http() {
        let config = SdkConfig::new("secret-key", "http://127.0.0.1:9/v1/events");
        let result = ClientBuilder::new(config, HttpTransport::new(), MemoryStore::new()).build();
        assert!(result.is_err());
    }
}
