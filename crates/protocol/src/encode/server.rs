//! Server packet encoders

use bytes::{BufMut, BytesMut};

use crate::packet::server_code;
use crate::wire::{put_bool, put_string, put_uvarint};
use crate::{
    Block, ColumnType, ProfileEvent, ProfileInfo, Progress, ServerException, ServerHello,
    ServerLog, ServerPacket, Value, revision,
};

/// Encode any server packet at the negotiated revision
pub fn encode_server_packet(buf: &mut BytesMut, packet: &ServerPacket, revision: u64) {
    put_uvarint(buf, packet.code());
    match packet {
        ServerPacket::Hello(hello) => encode_hello(buf, hello, revision),
        ServerPacket::Data { table, block } => {
            put_string(buf, table);
            block.encode(buf, revision);
        }
        ServerPacket::Exception(exception) => encode_exception(buf, exception),
        ServerPacket::Progress(progress) => encode_progress(buf, progress, revision),
        ServerPacket::Pong | ServerPacket::EndOfStream => {}
        ServerPacket::ProfileInfo(info) => encode_profile_info(buf, info),
        ServerPacket::Totals(block) | ServerPacket::Extremes(block) => {
            put_string(buf, "");
            block.encode(buf, revision);
        }
        ServerPacket::Log(logs) => {
            put_string(buf, "");
            log_block(logs).encode(buf, revision);
        }
        ServerPacket::TableColumns { table, description } => {
            put_string(buf, table);
            put_string(buf, description);
        }
        ServerPacket::ProfileEvents(events) => {
            put_string(buf, "");
            profile_events_block(events).encode(buf, revision);
        }
    }
}

fn encode_hello(buf: &mut BytesMut, hello: &ServerHello, revision: u64) {
    put_string(buf, &hello.name);
    put_uvarint(buf, hello.version_major);
    put_uvarint(buf, hello.version_minor);
    put_uvarint(buf, hello.revision);
    if revision >= revision::SERVER_TIMEZONE {
        put_string(buf, hello.timezone.as_deref().unwrap_or_default());
    }
    if revision >= revision::SERVER_DISPLAY_NAME {
        put_string(buf, hello.display_name.as_deref().unwrap_or_default());
    }
    if revision >= revision::VERSION_PATCH {
        put_uvarint(buf, hello.version_patch);
    }
}

fn encode_exception(buf: &mut BytesMut, exception: &ServerException) {
    buf.put_i32_le(exception.code);
    put_string(buf, &exception.name);
    put_string(buf, &exception.message);
    put_string(buf, &exception.stack_trace);
    put_bool(buf, exception.nested.is_some());
    if let Some(nested) = &exception.nested {
        encode_exception(buf, nested);
    }
}

fn encode_progress(buf: &mut BytesMut, progress: &Progress, revision: u64) {
    put_uvarint(buf, progress.rows);
    put_uvarint(buf, progress.bytes);
    put_uvarint(buf, progress.total_rows);
    if revision >= revision::TOTAL_BYTES_IN_PROGRESS {
        put_uvarint(buf, progress.total_bytes);
    }
    if revision >= revision::CLIENT_WRITE_INFO {
        put_uvarint(buf, progress.wrote_rows);
        put_uvarint(buf, progress.wrote_bytes);
    }
    if revision >= revision::SERVER_QUERY_TIME_IN_PROGRESS {
        put_uvarint(buf, progress.elapsed_ns);
    }
}

fn encode_profile_info(buf: &mut BytesMut, info: &ProfileInfo) {
    put_uvarint(buf, info.rows);
    put_uvarint(buf, info.blocks);
    put_uvarint(buf, info.bytes);
    put_bool(buf, info.applied_limit);
    put_uvarint(buf, info.rows_before_limit);
    put_bool(buf, info.calculated_rows_before_limit);
}

fn log_block(logs: &[ServerLog]) -> Block {
    let mut block = Block::new();
    block.add_column("event_time", ColumnType::DateTime(None));
    block.add_column("event_time_microseconds", ColumnType::UInt32);
    block.add_column("host_name", ColumnType::String);
    block.add_column("query_id", ColumnType::String);
    block.add_column("thread_id", ColumnType::UInt64);
    block.add_column("priority", ColumnType::Int8);
    block.add_column("source", ColumnType::String);
    block.add_column("text", ColumnType::String);
    for log in logs {
        let row = vec![
            Value::DateTime(log.time),
            Value::UInt32(log.time_micro),
            Value::String(log.host.clone()),
            Value::String(log.query_id.clone()),
            Value::UInt64(log.thread_id),
            Value::Int8(log.priority),
            Value::String(log.source.clone()),
            Value::String(log.text.clone()),
        ];
        // every value matches its column by construction
        let _ = block.append_row(row);
    }
    block
}

fn profile_events_block(events: &[ProfileEvent]) -> Block {
    let mut block = Block::new();
    block.add_column("host_name", ColumnType::String);
    block.add_column("current_time", ColumnType::DateTime(None));
    block.add_column("thread_id", ColumnType::UInt64);
    block.add_column(
        "type",
        ColumnType::Enum8(vec![("increment".to_string(), 1), ("gauge".to_string(), 2)]),
    );
    block.add_column("name", ColumnType::String);
    block.add_column("value", ColumnType::Int64);
    for event in events {
        let row = vec![
            Value::String(event.host.clone()),
            Value::DateTime(event.current_time),
            Value::UInt64(event.thread_id),
            Value::String(event.kind.as_str().to_string()),
            Value::String(event.name.clone()),
            Value::Int64(event.value),
        ];
        let _ = block.append_row(row);
    }
    block
}
