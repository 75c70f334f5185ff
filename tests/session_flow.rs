//! End-to-end session flows against in-process fake servers.
//!
//! A fake metadata API answers `getDanmuInfo` and a fake push server speaks
//! the framed TCP protocol, so the whole connect, run, heartbeat, and close
//! cycle runs without network access.

// ============================================================================
// Imports
// ============================================================================

use std::io::Write;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use blive::transport::read_frame;
use blive::{
    Error, EventType, Frame, HttpResolver, Operation, Session, SubProtocol, TokioScheduler,
};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;
use tracing_subscriber::EnvFilter;

// ============================================================================
// Fixtures
// ============================================================================

fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Serves `getDanmuInfo` for every request, pointing at `push_port`.
async fn spawn_metadata_server(push_port: u16) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");

    let body = format!(
        r#"{{"code":0,"message":"0","data":{{"token":"secret","host_list":[{{"host":"127.0.0.1","port":{push_port},"wss_port":443,"ws_port":2244}}]}}}}"#
    );

    tokio::spawn(async move {
        loop {
            let Ok((mut stream, _)) = listener.accept().await else {
                return;
            };
            let body = body.clone();
            tokio::spawn(async move {
                let mut request = Vec::new();
                let mut buf = [0u8; 1024];
                while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                    match stream.read(&mut buf).await {
                        Ok(0) | Err(_) => return,
                        Ok(n) => request.extend_from_slice(&buf[..n]),
                    }
                }
                let response = format!(
                    "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                    body.len()
                );
                stream.write_all(response.as_bytes()).await.ok();
                stream.shutdown().await.ok();
            });
        }
    });

    format!("http://{addr}/xlive/web-room/v1/index/getDanmuInfo")
}

async fn send(stream: &mut TcpStream, op: Operation, protocol: SubProtocol, body: &[u8]) {
    let frame = Frame::with_protocol(op, protocol, 0, body.to_vec()).expect("frame");
    stream.write_all(&frame.encode()).await.expect("write");
}

async fn accept_authed(listener: &TcpListener) -> (TcpStream, serde_json::Value) {
    let (mut stream, _) = listener.accept().await.expect("accept");
    let auth = read_frame(&mut stream).await.expect("auth");
    assert_eq!(auth.header.op(), Some(Operation::Auth));
    send(&mut stream, Operation::AuthReply, SubProtocol::HeartbeatAuth, br#"{"code":0}"#).await;
    (stream, serde_json::from_slice(&auth.body).expect("auth json"))
}

fn brotli_batch(commands: &[&str]) -> Vec<u8> {
    let payload: Vec<u8> = commands
        .iter()
        .flat_map(|c| {
            Frame::with_protocol(Operation::Command, SubProtocol::Raw, 0, c.as_bytes().to_vec())
                .expect("frame")
                .encode()
        })
        .collect();

    let mut out = Vec::new();
    {
        let mut writer = brotli::CompressorWriter::new(&mut out, 4096, 9, 22);
        writer.write_all(&payload).expect("compress");
    }
    out
}

fn count(session: &Session, event_type: EventType) -> Arc<AtomicUsize> {
    let counter = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&counter);
    session.set_handler(event_type, move |_, _| {
        seen.fetch_add(1, Ordering::SeqCst);
    });
    counter
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test]
async fn test_full_flow_with_http_resolver() {
    init_logging();

    let push = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let push_port = push.local_addr().expect("addr").port();
    let endpoint = spawn_metadata_server(push_port).await;

    let session = Session::builder()
        .room_id(42)
        .user_id(7)
        .heartbeat_interval(Duration::from_millis(100))
        .resolver(Arc::new(
            HttpResolver::with_endpoint(&endpoint).expect("resolver"),
        ))
        .build()
        .expect("session");

    let danmaku = count(&session, EventType::DanmuMsg);
    let popularity = count(&session, EventType::PopValueUpdate);

    let (heartbeat_tx, heartbeat_rx) = oneshot::channel();
    let (done_tx, done_rx) = oneshot::channel::<()>();
    let server = tokio::spawn(async move {
        let (mut stream, auth) = accept_authed(&push).await;
        assert_eq!(auth["uid"], 7);
        assert_eq!(auth["roomid"], 42);
        assert_eq!(auth["key"], "secret");

        let batch = brotli_batch(&[
            r#"{"cmd":"DANMU_MSG","info":[[0],"first",[1,"a"]]}"#,
            r#"{"cmd":"DANMU_MSG","info":[[0],"second",[2,"b"]]}"#,
        ]);
        send(&mut stream, Operation::Command, SubProtocol::Brotli, &batch).await;
        send(&mut stream, Operation::HeartbeatReply, SubProtocol::HeartbeatAuth, &1234u32.to_be_bytes()).await;

        let heartbeat = read_frame(&mut stream).await.expect("heartbeat");
        heartbeat_tx.send(heartbeat).ok();

        done_rx.await.ok();
    });

    session
        .connect(TokioScheduler::shared())
        .await
        .expect("connect");
    assert!(session.is_connected());
    assert_eq!(session.hosts().len(), 1);

    session.run(2).await.expect("run");
    assert_eq!(danmaku.load(Ordering::SeqCst), 2);
    assert_eq!(popularity.load(Ordering::SeqCst), 1);
    assert_eq!(session.popularity(), 1234);

    let heartbeat = tokio::time::timeout(Duration::from_secs(3), heartbeat_rx)
        .await
        .expect("heartbeat in time")
        .expect("heartbeat frame");
    assert_eq!(heartbeat.header.op(), Some(Operation::Heartbeat));
    assert_eq!(heartbeat.header.protocol(), Some(SubProtocol::HeartbeatAuth));

    session.close().await;
    assert!(!session.is_connected());
    assert!(matches!(session.run(1).await, Err(Error::NotConnected)));

    done_tx.send(()).ok();
    server.await.expect("server");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_stop_from_another_thread() {
    init_logging();

    let push = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let push_port = push.local_addr().expect("addr").port();
    let endpoint = spawn_metadata_server(push_port).await;

    let session = Arc::new(
        Session::builder()
            .room_id(42)
            .resolver(Arc::new(
                HttpResolver::with_endpoint(&endpoint).expect("resolver"),
            ))
            .build()
            .expect("session"),
    );

    let (result, (_stream, _)) = tokio::join!(
        session.connect(TokioScheduler::shared()),
        accept_authed(&push)
    );
    result.expect("connect");

    let stop = session.stop_handle();
    let runner = {
        let session = Arc::clone(&session);
        tokio::spawn(async move { session.run_forever().await })
    };

    std::thread::spawn(move || {
        std::thread::sleep(Duration::from_millis(50));
        stop.stop();
    })
    .join()
    .expect("stopper");

    tokio::time::timeout(Duration::from_secs(2), runner)
        .await
        .expect("stopped in time")
        .expect("join")
        .expect("run");

    session.close().await;
}

#[tokio::test]
async fn test_reconnect_rounds_then_fail() {
    init_logging();

    // Metadata points at a port nobody listens on.
    let vacant = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let vacant_port = vacant.local_addr().expect("addr").port();
    drop(vacant);
    let endpoint = spawn_metadata_server(vacant_port).await;

    let session = Session::builder()
        .room_id(42)
        .max_reconnect(2)
        .connect_timeout(Duration::from_secs(1))
        .resolver(Arc::new(
            HttpResolver::with_endpoint(&endpoint).expect("resolver"),
        ))
        .build()
        .expect("session");

    let err = session
        .connect(TokioScheduler::shared())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::AuthFailed { attempts: 1 }));
    assert!(err.is_recoverable());
    assert!(!session.is_connected());
}
