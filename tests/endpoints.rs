use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use feedd::adapters::{RecordingNotifier, SimulatedSource};
use feedd::config::AppConfig;
use feedd::context::AppContext;
use feedd::core::{Item, Notifications, Notifier, Orchestrator, Sources};
use feedd::ipc::{ClientError, IpcClient, LISTENER_CAPACITY, ListenerPool, Operation, Response};
use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::UnixStream;
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout};

struct TestDaemon {
    ctx: AppContext,
    source: SimulatedSource,
    notifier: Arc<RecordingNotifier>,
    task: JoinHandle<anyhow::Result<()>>,
    _dir: TempDir,
}

impl TestDaemon {
    async fn start() -> Self {
        let dir = tempfile::tempdir().unwrap();
        Self::start_in(dir).await
    }

    async fn start_in(dir: TempDir) -> Self {
        let config = AppConfig {
            socket_dir: dir.path().to_path_buf(),
            socket_prefix: "test".to_string(),
            refresh_minutes: 60,
            debug: true,
            ..AppConfig::default()
        };

        let source = SimulatedSource::new();
        let notifier = Arc::new(RecordingNotifier::new());
        let ctx = AppContext::new(
            config,
            Sources::from_single(Arc::new(source.clone())),
            Notifications::new(Some(notifier.clone() as Arc<dyn Notifier>)),
            Arc::new(ListenerPool::new(LISTENER_CAPACITY)),
        );

        let orchestrator = Orchestrator::new(ctx.clone());
        let task = tokio::spawn(async move { orchestrator.start().await });

        timeout(Duration::from_secs(5), async {
            while ctx.listeners.len() < LISTENER_CAPACITY {
                sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("endpoints did not start");

        Self {
            ctx,
            source,
            notifier,
            task,
            _dir: dir,
        }
    }

    async fn call(&self, operation: Operation, request: &str) -> Option<Response> {
        IpcClient::for_operation(&self.ctx.config, operation)
            .call(request.as_bytes())
            .await
            .expect("call failed")
    }

    async fn ok(&self, operation: Operation, request: &str) -> String {
        let response = self.call(operation, request).await.expect("no response");
        assert!(response.is_success(), "failure: {}", response.payload);
        response.payload
    }

    async fn err(&self, operation: Operation, request: &str) -> String {
        let response = self.call(operation, request).await.expect("no response");
        assert!(!response.is_success(), "success: {}", response.payload);
        response.payload
    }
}

fn item(id: &str) -> Item {
    Item::new(format!("Video {}", id), id, "")
}

#[tokio::test]
async fn test_health_echoes_request_verbatim() {
    let daemon = TestDaemon::start().await;

    assert_eq!(daemon.ok(Operation::Health, "ping\n").await, "\"ping\\n\"");
    assert_eq!(daemon.ok(Operation::Health, "").await, "\"\"");
}

#[tokio::test]
async fn test_health_wire_format() {
    let daemon = TestDaemon::start().await;
    let mut stream = UnixStream::connect(daemon.ctx.config.socket_path("health"))
        .await
        .unwrap();

    stream.write_all(b"hi").await.unwrap();
    let mut buf = Vec::new();
    stream.read_to_end(&mut buf).await.unwrap();

    assert_eq!(buf, b"\x01\x00\x02\"hi\"");
}

#[tokio::test]
async fn test_health_quotes_raw_bytes() {
    let daemon = TestDaemon::start().await;

    let response = IpcClient::for_operation(&daemon.ctx.config, Operation::Health)
        .call(b"\xff\x01ok\t\"")
        .await
        .unwrap()
        .expect("no response");

    assert!(response.is_success());
    assert_eq!(response.payload, r#""\xff\x01ok\t\"""#);
}

#[tokio::test]
async fn test_request_truncated_to_128_bytes() {
    let daemon = TestDaemon::start().await;
    let mut stream = UnixStream::connect(daemon.ctx.config.socket_path("health"))
        .await
        .unwrap();

    stream.write_all(&[b'a'; 200]).await.unwrap();

    let expected = format!("\"{}\"", "a".repeat(128));
    let mut buf = vec![0u8; 3 + expected.len()];
    stream.read_exact(&mut buf).await.unwrap();

    let response = Response::decode(&buf).unwrap();
    assert_eq!(response.payload, expected);
}

#[tokio::test]
async fn test_add_get_and_remove() {
    let daemon = TestDaemon::start().await;
    daemon
        .source
        .publish("Some Channel", vec![item("v2"), item("v1")]);

    assert_eq!(
        daemon.ok(Operation::Add, "Some Channel\n").await,
        "subscribed to channel \"Some Channel\""
    );
    assert_eq!(
        daemon.err(Operation::Add, "some channel").await,
        "already subscribed to channel \"some channel\""
    );

    assert_eq!(
        daemon.ok(Operation::Get, "SOME CHANNEL\n").await,
        "Some Channel\n\tsim://channel/somechannel\n\n\
         Video v2\n\thttps://www.youtube.com/watch?v=v2\n\
         Video v1\n\thttps://www.youtube.com/watch?v=v1"
    );

    assert_eq!(
        daemon.ok(Operation::Remove, "somechannel\n").await,
        "unsubscribed from channel \"somechannel\""
    );
    assert_eq!(
        daemon.err(Operation::Get, "Some Channel").await,
        "not subscribed to channel 'somechannel'"
    );
}

#[tokio::test]
async fn test_remove_unknown_succeeds() {
    let daemon = TestDaemon::start().await;
    assert_eq!(
        daemon.ok(Operation::Remove, "ghost").await,
        "unsubscribed from channel \"ghost\""
    );
}

#[tokio::test]
async fn test_add_unknown_and_empty_feed() {
    let daemon = TestDaemon::start().await;
    daemon.source.publish("quiet", Vec::new());

    assert_eq!(
        daemon.err(Operation::Add, "ghost").await,
        "channel 'ghost' not found"
    );
    assert_eq!(
        daemon.err(Operation::Add, "quiet").await,
        "channel with no videos"
    );
    assert_eq!(daemon.ok(Operation::Subscriptions, "").await, "no subscriptions");
}

#[tokio::test]
async fn test_fetch_does_not_subscribe() {
    let daemon = TestDaemon::start().await;
    daemon.source.publish("alpha", vec![item("a1")]);

    let rendered = daemon.ok(Operation::Fetch, "alpha\n").await;
    assert!(rendered.starts_with("alpha\n\tsim://channel/alpha\n\n"));
    assert!(rendered.ends_with("watch?v=a1"));

    assert_eq!(daemon.ok(Operation::Subscriptions, "").await, "no subscriptions");
    assert_eq!(daemon.err(Operation::Fetch, "\n").await, "empty channel name");
}

#[tokio::test]
async fn test_subscriptions_lists_display_names() {
    let daemon = TestDaemon::start().await;
    daemon.source.publish("Beta", vec![item("b1")]);
    daemon.source.publish("Alpha One", vec![item("a1")]);

    daemon.ok(Operation::Add, "Beta").await;
    daemon.ok(Operation::Add, "Alpha One\n").await;

    assert_eq!(
        daemon.ok(Operation::Subscriptions, "").await,
        "Alpha One\nBeta"
    );
}

#[tokio::test]
async fn test_search() {
    let daemon = TestDaemon::start().await;
    daemon.source.publish("linustechtips", vec![item("l1")]);
    daemon.source.publish("techlinked", vec![item("t1")]);
    daemon.source.publish("cooking", vec![item("c1")]);

    assert_eq!(
        daemon.ok(Operation::Search, "Tech\n").await,
        "linustechtips, techlinked"
    );
    assert_eq!(
        daemon.ok(Operation::Search, "zzz\n").await,
        "found no channel like \"zzz\""
    );
}

#[tokio::test]
async fn test_refresh_replies_with_nothing_and_merges() {
    let daemon = TestDaemon::start().await;
    daemon.source.publish("alpha", vec![item("a1")]);
    daemon.ok(Operation::Add, "alpha").await;

    daemon.source.upload("alpha", item("a2"));
    daemon.source.upload("alpha", item("a3"));

    assert!(daemon.call(Operation::Refresh, "").await.is_none());

    let rendered = daemon.ok(Operation::Get, "alpha").await;
    let a3 = rendered.find("watch?v=a3").unwrap();
    let a2 = rendered.find("watch?v=a2").unwrap();
    let a1 = rendered.find("watch?v=a1").unwrap();
    assert!(a3 < a2 && a2 < a1);
    assert_eq!(daemon.notifier.seen(), vec!["a3".to_string(), "a2".to_string()]);
}

#[tokio::test]
async fn test_stale_socket_file_is_replaced() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("test.add.sock"), b"stale").unwrap();
    std::fs::create_dir(dir.path().join("test.get.sock")).unwrap();

    let daemon = TestDaemon::start_in(dir).await;
    daemon.source.publish("alpha", vec![item("a1")]);

    daemon.ok(Operation::Add, "alpha").await;
    daemon.ok(Operation::Get, "alpha").await;
}

#[tokio::test]
async fn test_close_all_stops_every_endpoint() {
    let daemon = TestDaemon::start().await;
    let health = daemon.ctx.config.socket_path("health");

    assert_eq!(daemon.ctx.listeners.close_all(), LISTENER_CAPACITY);

    timeout(Duration::from_secs(5), daemon.task)
        .await
        .expect("blocking endpoint kept running")
        .unwrap()
        .unwrap();

    assert!(!Path::new(&health).exists());
    let err = IpcClient::new(&health).call(b"ping").await.unwrap_err();
    assert!(matches!(err, ClientError::Connect { .. }));
}
