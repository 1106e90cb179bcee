//! Tests for connection handshake, framing and response handling

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use chwire_protocol::{ColumnType, ProfileInfo, Progress, ServerException, ServerLog, ServerPacket};
use tokio::io::AsyncReadExt;

use super::*;
use crate::options::QueryOptions;
use crate::test::{Exchange, MockServer, connect_mock};

fn log_line(text: &str) -> ServerLog {
    ServerLog {
        time: chrono::DateTime::from_timestamp(1_700_000_000, 0).unwrap(),
        time_micro: 0,
        host: "ch-1".into(),
        query_id: "q".into(),
        thread_id: 7,
        priority: 6,
        source: "executeQuery".into(),
        text: text.into(),
    }
}

// =============================================================================
// Handshake
// =============================================================================

#[tokio::test]
async fn test_handshake_negotiates_lower_revision() {
    let server = MockServer::new().revision(54450);
    let (conn, _server) = connect_mock(server).await.unwrap();

    assert_eq!(conn.revision(), 54450);
    assert_eq!(conn.server().name, "ClickHouse");
    assert!(conn.deadline().is_none());
    assert!(conn.last_error().is_none());
}

#[tokio::test]
async fn test_handshake_sends_quota_key() {
    let server = MockServer::new();
    let recorder = server.recorder();
    let (stream, _server) = server.spawn();
    let options = ClientOptions {
        quota_key: "tenant-a".into(),
        ..ClientOptions::default()
    };
    let mut conn = Connection::handshake(stream, &options).await.unwrap();

    // the addendum is read before the first packet is answered
    conn.ping().await.unwrap();
    assert_eq!(recorder.quota_key().as_deref(), Some("tenant-a"));
}

#[tokio::test]
async fn test_handshake_peer_closes() {
    let (client, mut server) = tokio::io::duplex(1024);
    tokio::spawn(async move {
        let mut buf = [0u8; 1024];
        let _ = server.read(&mut buf).await;
    });

    let err = Connection::handshake(client, &ClientOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::ConnectionClosed), "{err:?}");
}

#[tokio::test]
async fn test_handshake_bounded_by_dial_timeout() {
    // peer that never answers
    let (client, _server) = tokio::io::duplex(1024);
    let options = ClientOptions {
        dial_timeout: Duration::from_millis(50),
        ..ClientOptions::default()
    };

    let err = Connection::handshake(client, &options).await.unwrap_err();
    assert!(matches!(err, Error::Timeout), "{err:?}");
}

// =============================================================================
// Requests
// =============================================================================

#[tokio::test]
async fn test_ping() {
    let server = MockServer::new();
    let recorder = server.recorder();
    let (mut conn, _server) = connect_mock(server).await.unwrap();

    conn.ping().await.unwrap();
    conn.ping().await.unwrap();
    assert_eq!(recorder.pings(), 2);
}

#[tokio::test]
async fn test_query_settings_override_client_settings() {
    let server = MockServer::new().column("id", ColumnType::UInt64);
    let recorder = server.recorder();
    let (stream, _server) = server.spawn();
    let options = ClientOptions {
        settings: vec![
            Setting::new("max_threads", "4"),
            Setting::new("insert_deduplicate", "1"),
        ],
        ..ClientOptions::default()
    };
    let mut conn = Connection::handshake(stream, &options).await.unwrap();

    let query = QueryOptions::new()
        .query_id("q-1")
        .setting("insert_deduplicate", "0");
    let mut on_process = OnProcess::default();
    conn.start_insert("INSERT INTO t VALUES", &query.query_id, &query.settings, &mut on_process)
        .await
        .unwrap();
    conn.send_data(&Block::new(), "").await.unwrap();
    conn.flush().await.unwrap();
    conn.process(&mut on_process).await.unwrap();

    assert_eq!(recorder.queries(), vec!["INSERT INTO t VALUES".to_string()]);
    assert_eq!(
        recorder.settings()[0],
        vec![
            ("max_threads".to_string(), "4".to_string()),
            ("insert_deduplicate".to_string(), "0".to_string()),
        ]
    );
}

#[tokio::test]
async fn test_deadline_bounds_reads() {
    let server = MockServer::new().exchange(Exchange::stall());
    let (mut conn, _server) = connect_mock(server).await.unwrap();

    conn.set_deadline(Instant::now() + Duration::from_millis(50));
    conn.send_query("INSERT INTO t VALUES", "", &[])
        .await
        .unwrap();
    let err = conn
        .first_block(&mut OnProcess::default())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Timeout), "{err:?}");
}

// =============================================================================
// Responses
// =============================================================================

#[tokio::test]
async fn test_first_block_returns_header_schema() {
    let server = MockServer::new()
        .column("id", ColumnType::UInt64)
        .column("name", ColumnType::String);
    let (mut conn, _server) = connect_mock(server).await.unwrap();

    let header = conn
        .start_insert("INSERT INTO t VALUES", "", &[], &mut OnProcess::default())
        .await
        .unwrap();
    assert_eq!(header.names(), ["id", "name"]);
    assert_eq!(header.rows(), 0);
}

#[tokio::test]
async fn test_first_block_end_of_stream() {
    let server = MockServer::new().exchange(Exchange::accept().prelude(ServerPacket::EndOfStream));
    let (mut conn, _server) = connect_mock(server).await.unwrap();

    let err = conn
        .start_insert("INSERT INTO t VALUES", "", &[], &mut OnProcess::default())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::UnexpectedEndOfStream), "{err:?}");
}

#[tokio::test]
async fn test_first_block_exception() {
    let server = MockServer::new().exchange(Exchange::reject(ServerException::new(
        60,
        "DB::Exception",
        "Table default.t does not exist",
    )));
    let (mut conn, _server) = connect_mock(server).await.unwrap();

    let err = conn
        .start_insert("INSERT INTO t VALUES", "", &[], &mut OnProcess::default())
        .await
        .unwrap_err();
    assert_eq!(err.server_code(), Some(60));
    assert!(err.to_string().contains("does not exist"));
}

#[tokio::test]
async fn test_process_dispatches_callbacks() {
    let progress_rows = Arc::new(AtomicU64::new(0));
    let logs = Arc::new(AtomicUsize::new(0));
    let profiles = Arc::new(AtomicUsize::new(0));

    let server = MockServer::new().column("id", ColumnType::UInt64).exchange(
        Exchange::accept()
            .prelude(ServerPacket::Progress(Progress::default()))
            .replies(vec![
                ServerPacket::Progress(Progress {
                    wrote_rows: 3,
                    ..Progress::default()
                }),
                ServerPacket::Log(vec![log_line("inserted"), log_line("done")]),
                ServerPacket::ProfileInfo(ProfileInfo::default()),
                ServerPacket::Progress(Progress {
                    wrote_rows: 2,
                    ..Progress::default()
                }),
                ServerPacket::EndOfStream,
            ]),
    );
    let (mut conn, _server) = connect_mock(server).await.unwrap();

    let mut options = {
        let progress_rows = progress_rows.clone();
        let logs = logs.clone();
        let profiles = profiles.clone();
        QueryOptions::new()
            .on_progress(move |p| {
                progress_rows.fetch_add(p.wrote_rows, Ordering::SeqCst);
            })
            .on_logs(move |lines| {
                logs.fetch_add(lines.len(), Ordering::SeqCst);
            })
            .on_profile_info(move |_| {
                profiles.fetch_add(1, Ordering::SeqCst);
            })
    };
    let mut on_process = std::mem::take(&mut options.on_process);

    conn.start_insert("INSERT INTO t VALUES", "", &[], &mut on_process)
        .await
        .unwrap();
    conn.send_data(&Block::new(), "").await.unwrap();
    conn.flush().await.unwrap();
    conn.process(&mut on_process).await.unwrap();

    assert_eq!(progress_rows.load(Ordering::SeqCst), 5);
    assert_eq!(logs.load(Ordering::SeqCst), 2);
    assert_eq!(profiles.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_process_returns_server_exception() {
    let server = MockServer::new().column("id", ColumnType::UInt64).exchange(
        Exchange::accept().replies(vec![ServerPacket::Exception(ServerException::new(
            252,
            "DB::Exception",
            "Too many parts",
        ))]),
    );
    let (mut conn, _server) = connect_mock(server).await.unwrap();

    let mut on_process = OnProcess::default();
    conn.start_insert("INSERT INTO t VALUES", "", &[], &mut on_process)
        .await
        .unwrap();
    conn.send_data(&Block::new(), "").await.unwrap();
    conn.flush().await.unwrap();
    let err = conn.process(&mut on_process).await.unwrap_err();

    assert!(matches!(err, Error::Server(ref e) if e.code == 252), "{err:?}");

    // the stream is still in step after an exception
    conn.ping().await.unwrap();
}
