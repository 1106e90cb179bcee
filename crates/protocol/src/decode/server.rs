//! Server packet decoders

use chrono::{DateTime, Utc};

use crate::packet::server_code;
use crate::wire::{get_bool, get_i32, get_string, get_uvarint};
use crate::{
    Block, CLIENT_REVISION, ProfileEvent, ProfileEventKind, ProfileInfo, Progress, ProtocolError,
    Result, ServerException, ServerHello, ServerLog, ServerPacket, Value, revision,
};

/// Decode one server packet
///
/// `revision` is the negotiated revision; before the handshake completes
/// pass the client revision.
pub fn decode_server_packet(buf: &mut &[u8], revision: u64) -> Result<ServerPacket> {
    let code = get_uvarint(buf)?;
    let packet = match code {
        server_code::HELLO => ServerPacket::Hello(decode_hello(buf, revision)?),
        server_code::DATA => {
            let table = get_string(buf)?;
            let block = Block::decode(buf, revision)?;
            ServerPacket::Data { table, block }
        }
        server_code::EXCEPTION => ServerPacket::Exception(decode_exception(buf)?),
        server_code::PROGRESS => ServerPacket::Progress(decode_progress(buf, revision)?),
        server_code::PONG => ServerPacket::Pong,
        server_code::END_OF_STREAM => ServerPacket::EndOfStream,
        server_code::PROFILE_INFO => ServerPacket::ProfileInfo(decode_profile_info(buf)?),
        server_code::TOTALS => {
            get_string(buf)?;
            ServerPacket::Totals(Block::decode(buf, revision)?)
        }
        server_code::EXTREMES => {
            get_string(buf)?;
            ServerPacket::Extremes(Block::decode(buf, revision)?)
        }
        server_code::LOG => {
            get_string(buf)?;
            ServerPacket::Log(server_logs(&Block::decode(buf, revision)?))
        }
        server_code::TABLE_COLUMNS => ServerPacket::TableColumns {
            table: get_string(buf)?,
            description: get_string(buf)?,
        },
        server_code::PROFILE_EVENTS => {
            get_string(buf)?;
            ServerPacket::ProfileEvents(profile_events(&Block::decode(buf, revision)?)?)
        }
        other => return Err(ProtocolError::UnknownPacket(other)),
    };
    Ok(packet)
}

fn decode_hello(buf: &mut &[u8], revision: u64) -> Result<ServerHello> {
    let name = get_string(buf)?;
    let version_major = get_uvarint(buf)?;
    let version_minor = get_uvarint(buf)?;
    let server_revision = get_uvarint(buf)?;
    let negotiated = server_revision.min(revision).min(CLIENT_REVISION);

    let mut hello = ServerHello {
        name,
        version_major,
        version_minor,
        revision: server_revision,
        ..Default::default()
    };
    if negotiated >= revision::SERVER_TIMEZONE {
        hello.timezone = Some(get_string(buf)?);
    }
    if negotiated >= revision::SERVER_DISPLAY_NAME {
        hello.display_name = Some(get_string(buf)?);
    }
    if negotiated >= revision::VERSION_PATCH {
        hello.version_patch = get_uvarint(buf)?;
    } else {
        hello.version_patch = server_revision;
    }
    Ok(hello)
}

fn decode_exception(buf: &mut &[u8]) -> Result<ServerException> {
    let code = get_i32(buf)?;
    let name = get_string(buf)?;
    let message = get_string(buf)?;
    let stack_trace = get_string(buf)?;
    let nested = if get_bool(buf)? {
        Some(Box::new(decode_exception(buf)?))
    } else {
        None
    };
    Ok(ServerException {
        code,
        name,
        message,
        stack_trace,
        nested,
    })
}

fn decode_progress(buf: &mut &[u8], revision: u64) -> Result<Progress> {
    let mut progress = Progress {
        rows: get_uvarint(buf)?,
        bytes: get_uvarint(buf)?,
        total_rows: get_uvarint(buf)?,
        ..Default::default()
    };
    if revision >= revision::TOTAL_BYTES_IN_PROGRESS {
        progress.total_bytes = get_uvarint(buf)?;
    }
    if revision >= revision::CLIENT_WRITE_INFO {
        progress.wrote_rows = get_uvarint(buf)?;
        progress.wrote_bytes = get_uvarint(buf)?;
    }
    if revision >= revision::SERVER_QUERY_TIME_IN_PROGRESS {
        progress.elapsed_ns = get_uvarint(buf)?;
    }
    Ok(progress)
}

fn decode_profile_info(buf: &mut &[u8]) -> Result<ProfileInfo> {
    Ok(ProfileInfo {
        rows: get_uvarint(buf)?,
        blocks: get_uvarint(buf)?,
        bytes: get_uvarint(buf)?,
        applied_limit: get_bool(buf)?,
        rows_before_limit: get_uvarint(buf)?,
        calculated_rows_before_limit: get_bool(buf)?,
    })
}

// =============================================================================
// Log / ProfileEvents blocks
// =============================================================================

/// Typed accessor over a named column; missing columns read as defaults
struct Cells<'a> {
    block: &'a Block,
}

impl Cells<'_> {
    fn get(&self, name: &str, row: usize) -> Option<Value> {
        self.block.column_by_name(name)?.row(row)
    }

    fn string(&self, name: &str, row: usize) -> String {
        match self.get(name, row) {
            Some(Value::String(s)) => s,
            Some(Value::Bytes(b)) => String::from_utf8_lossy(&b).into_owned(),
            _ => String::new(),
        }
    }

    fn int(&self, name: &str, row: usize) -> i128 {
        self.get(name, row)
            .and_then(|v| v.as_i128())
            .unwrap_or_default()
    }

    fn time(&self, name: &str, row: usize) -> DateTime<Utc> {
        match self.get(name, row) {
            Some(Value::DateTime(dt)) => dt,
            _ => DateTime::<Utc>::default(),
        }
    }
}

fn server_logs(block: &Block) -> Vec<ServerLog> {
    let cells = Cells { block };
    (0..block.rows())
        .map(|row| ServerLog {
            time: cells.time("event_time", row),
            time_micro: cells.int("event_time_microseconds", row) as u32,
            host: cells.string("host_name", row),
            query_id: cells.string("query_id", row),
            thread_id: cells.int("thread_id", row) as u64,
            priority: cells.int("priority", row) as i8,
            source: cells.string("source", row),
            text: cells.string("text", row),
        })
        .collect()
}

fn profile_events(block: &Block) -> Result<Vec<ProfileEvent>> {
    let cells = Cells { block };
    (0..block.rows())
        .map(|row| {
            let kind = match cells.get("type", row) {
                Some(Value::String(s)) if s == "increment" => ProfileEventKind::Increment,
                Some(Value::String(s)) if s == "gauge" => ProfileEventKind::Gauge,
                Some(other) => {
                    return Err(ProtocolError::Unsupported(format!(
                        "profile event type {}",
                        other.describe()
                    )));
                }
                None => ProfileEventKind::Increment,
            };
            Ok(ProfileEvent {
                host: cells.string("host_name", row),
                current_time: cells.time("current_time", row),
                thread_id: cells.int("thread_id", row) as u64,
                kind,
                name: cells.string("name", row),
                value: cells.int("value", row) as i64,
            })
        })
        .collect()
}
