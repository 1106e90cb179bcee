//! Tests for packet decoding, driven through the encoders

use bytes::BytesMut;
use chrono::{DateTime, Utc};

use super::*;
use crate::encode::{encode_addendum, encode_data, encode_hello, encode_query, encode_server_packet};
use crate::packet::{STAGE_COMPLETE, server_code};
use crate::wire::put_uvarint;
use crate::{
    Block, CLIENT_REVISION, ClientHello, ClientInfo, ClientPacket, ColumnType, ProfileEvent,
    ProfileEventKind, Progress, ProtocolError, Query, ServerException, ServerHello, ServerLog,
    ServerPacket, Setting, Value, revision,
};

fn server_bytes(packet: &ServerPacket, revision: u64) -> BytesMut {
    let mut buf = BytesMut::new();
    encode_server_packet(&mut buf, packet, revision);
    buf
}

fn sample_query() -> Query {
    Query {
        id: "q-1".into(),
        info: ClientInfo {
            initial_user: "default".into(),
            os_user: "loader".into(),
            client_hostname: "host-1".into(),
            client_name: "chwire".into(),
            version_minor: 1,
            ..Default::default()
        },
        settings: vec![Setting::new("max_threads", "4")],
        stage: STAGE_COMPLETE,
        compression: false,
        body: "INSERT INTO t VALUES".into(),
    }
}

// =============================================================================
// Server packets
// =============================================================================

#[test]
fn test_hello_fields_follow_negotiated_revision() {
    let hello = ServerHello {
        name: "ClickHouse".into(),
        version_major: 23,
        version_minor: 8,
        revision: 54465,
        timezone: Some("UTC".into()),
        display_name: Some("node-1".into()),
        version_patch: 3,
    };
    let buf = server_bytes(&ServerPacket::Hello(hello.clone()), CLIENT_REVISION);
    let mut cursor = &buf[..];
    match decode_server_packet(&mut cursor, CLIENT_REVISION).unwrap() {
        ServerPacket::Hello(decoded) => assert_eq!(decoded, hello),
        other => panic!("unexpected packet: {other:?}"),
    }
    assert!(cursor.is_empty());
}

#[test]
fn test_old_server_hello_has_no_patch() {
    let hello = ServerHello {
        name: "ClickHouse".into(),
        version_major: 19,
        version_minor: 1,
        revision: 54213,
        timezone: Some("UTC".into()),
        display_name: None,
        version_patch: 0,
    };
    let buf = server_bytes(&ServerPacket::Hello(hello), 54213);
    match decode_server_packet(&mut &buf[..], CLIENT_REVISION).unwrap() {
        ServerPacket::Hello(decoded) => {
            assert_eq!(decoded.timezone.as_deref(), Some("UTC"));
            assert_eq!(decoded.display_name, None);
            assert_eq!(decoded.version_patch, 54213);
        }
        other => panic!("unexpected packet: {other:?}"),
    }
}

#[test]
fn test_nested_exception() {
    let mut outer = ServerException::new(60, "DB::Exception", "Table default.t does not exist");
    outer.nested = Some(Box::new(ServerException::new(1, "DB::Inner", "cause")));
    let buf = server_bytes(&ServerPacket::Exception(outer.clone()), CLIENT_REVISION);

    match decode_server_packet(&mut &buf[..], CLIENT_REVISION).unwrap() {
        ServerPacket::Exception(e) => {
            assert_eq!(e, outer);
            assert_eq!(e.to_string(), "code: 60, message: Table default.t does not exist");
            assert_eq!(e.nested.unwrap().code, 1);
        }
        other => panic!("unexpected packet: {other:?}"),
    }
}

#[test]
fn test_progress_write_info_gated_by_revision() {
    let progress = Progress {
        rows: 10,
        bytes: 100,
        total_rows: 0,
        total_bytes: 0,
        wrote_rows: 10,
        wrote_bytes: 80,
        elapsed_ns: 5_000,
    };
    let buf = server_bytes(&ServerPacket::Progress(progress), CLIENT_REVISION);
    match decode_server_packet(&mut &buf[..], CLIENT_REVISION).unwrap() {
        ServerPacket::Progress(p) => assert_eq!(p, progress),
        other => panic!("unexpected packet: {other:?}"),
    }

    let old = revision::CLIENT_WRITE_INFO - 1;
    let buf = server_bytes(&ServerPacket::Progress(progress), old);
    match decode_server_packet(&mut &buf[..], old).unwrap() {
        ServerPacket::Progress(p) => {
            assert_eq!(p.rows, 10);
            assert_eq!(p.wrote_rows, 0);
            assert_eq!(p.elapsed_ns, 0);
        }
        other => panic!("unexpected packet: {other:?}"),
    }
}

#[test]
fn test_data_packet_carries_table_and_block() {
    let mut block = Block::new();
    block.add_column("id", ColumnType::UInt64);
    block.append_row(vec![Value::UInt64(9)]).unwrap();
    let packet = ServerPacket::Data {
        table: String::new(),
        block,
    };
    let buf = server_bytes(&packet, CLIENT_REVISION);
    match decode_server_packet(&mut &buf[..], CLIENT_REVISION).unwrap() {
        ServerPacket::Data { table, block } => {
            assert_eq!(table, "");
            assert_eq!(block.row(0), Some(vec![Value::UInt64(9)]));
        }
        other => panic!("unexpected packet: {other:?}"),
    }
}

#[test]
fn test_log_rows() {
    let log = ServerLog {
        time: DateTime::<Utc>::from_timestamp(1_700_000_000, 0).unwrap(),
        time_micro: 42,
        host: "node-1".into(),
        query_id: "q-1".into(),
        thread_id: 7,
        priority: 6,
        source: "executeQuery".into(),
        text: "Inserted 3 rows".into(),
    };
    let buf = server_bytes(&ServerPacket::Log(vec![log.clone()]), CLIENT_REVISION);
    match decode_server_packet(&mut &buf[..], CLIENT_REVISION).unwrap() {
        ServerPacket::Log(logs) => assert_eq!(logs, vec![log]),
        other => panic!("unexpected packet: {other:?}"),
    }
}

#[test]
fn test_profile_events_rows() {
    let event = ProfileEvent {
        host: "node-1".into(),
        current_time: DateTime::<Utc>::from_timestamp(1_700_000_000, 0).unwrap(),
        thread_id: 0,
        kind: ProfileEventKind::Gauge,
        name: "MemoryTracking".into(),
        value: 1 << 20,
    };
    let buf = server_bytes(&ServerPacket::ProfileEvents(vec![event.clone()]), CLIENT_REVISION);
    match decode_server_packet(&mut &buf[..], CLIENT_REVISION).unwrap() {
        ServerPacket::ProfileEvents(events) => assert_eq!(events, vec![event]),
        other => panic!("unexpected packet: {other:?}"),
    }
}

#[test]
fn test_unknown_packet_code() {
    let mut buf = BytesMut::new();
    put_uvarint(&mut buf, 99);
    let err = decode_server_packet(&mut &buf[..], CLIENT_REVISION).unwrap_err();
    assert_eq!(err, ProtocolError::UnknownPacket(99));
}

#[test]
fn test_partial_packet_is_incomplete_at_every_cut() {
    let packets = [
        ServerPacket::Progress(Progress {
            rows: 1 << 40,
            ..Default::default()
        }),
        ServerPacket::Exception(ServerException::new(1, "a", "b")),
        ServerPacket::TableColumns {
            table: "t".into(),
            description: "columns format version: 1".into(),
        },
    ];
    for packet in &packets {
        let buf = server_bytes(packet, CLIENT_REVISION);
        for cut in 0..buf.len() {
            let err = decode_server_packet(&mut &buf[..cut], CLIENT_REVISION).unwrap_err();
            assert!(err.is_incomplete(), "{} cut at {cut}: {err:?}", packet.name());
        }
    }
}

#[test]
fn test_end_of_stream_and_pong_are_code_only() {
    assert_eq!(&server_bytes(&ServerPacket::EndOfStream, CLIENT_REVISION)[..], &[
        server_code::END_OF_STREAM as u8
    ]);
    assert_eq!(&server_bytes(&ServerPacket::Pong, CLIENT_REVISION)[..], &[
        server_code::PONG as u8
    ]);
}

// =============================================================================
// Client packets
// =============================================================================

#[test]
fn test_client_hello_and_addendum() {
    let hello = ClientHello {
        client_name: "chwire".into(),
        version_major: 0,
        version_minor: 1,
        revision: CLIENT_REVISION,
        database: "default".into(),
        user: "default".into(),
        password: "secret".into(),
    };
    let mut buf = BytesMut::new();
    encode_hello(&mut buf, &hello);
    encode_addendum(&mut buf, "", CLIENT_REVISION);

    let mut cursor = &buf[..];
    match decode_client_packet(&mut cursor, CLIENT_REVISION).unwrap() {
        ClientPacket::Hello(decoded) => assert_eq!(decoded, hello),
        other => panic!("unexpected packet: {other:?}"),
    }
    assert_eq!(decode_addendum(&mut cursor, CLIENT_REVISION).unwrap(), "");
    assert!(cursor.is_empty());
}

#[test]
fn test_addendum_absent_on_old_revision() {
    let mut buf = BytesMut::new();
    encode_addendum(&mut buf, "key", revision::ADDENDUM - 1);
    assert!(buf.is_empty());
}

#[test]
fn test_query_at_current_and_old_revisions() {
    let query = sample_query();
    for rev in [CLIENT_REVISION, revision::SETTINGS_SERIALIZED_AS_STRINGS] {
        let mut buf = BytesMut::new();
        encode_query(&mut buf, &query, rev).unwrap();
        let mut cursor = &buf[..];
        match decode_client_packet(&mut cursor, rev).unwrap() {
            ClientPacket::Query(decoded) => assert_eq!(*decoded, query),
            other => panic!("unexpected packet: {other:?}"),
        }
        assert!(cursor.is_empty(), "revision {rev}");
    }
}

#[test]
fn test_query_settings_unsupported_on_old_revision() {
    let mut buf = BytesMut::new();
    let err = encode_query(&mut buf, &sample_query(), 54213).unwrap_err();
    assert!(matches!(err, ProtocolError::Unsupported(_)));
    assert!(buf.is_empty());
}

#[test]
fn test_client_data_packet() {
    let mut block = Block::new();
    block.add_column("s", ColumnType::String);
    block.append_row(vec![Value::from("x")]).unwrap();
    let mut buf = BytesMut::new();
    encode_data(&mut buf, "", &block, CLIENT_REVISION);
    encode_data(&mut buf, "", &Block::new(), CLIENT_REVISION);

    let mut cursor = &buf[..];
    let first = decode_client_packet(&mut cursor, CLIENT_REVISION).unwrap();
    let second = decode_client_packet(&mut cursor, CLIENT_REVISION).unwrap();
    match (first, second) {
        (ClientPacket::Data { block: a, .. }, ClientPacket::Data { block: b, .. }) => {
            assert_eq!(a.rows(), 1);
            assert_eq!(b.rows(), 0);
            assert_eq!(b.columns(), 0);
        }
        other => panic!("unexpected packets: {other:?}"),
    }
}
