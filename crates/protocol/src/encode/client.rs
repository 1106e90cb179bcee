//! Client packet encoders

use bytes::{BufMut, BytesMut};

use crate::packet::{INTERFACE_TCP, QUERY_KIND_INITIAL, SETTING_FLAG_IMPORTANT, client_code};
use crate::wire::{put_bool, put_string, put_uvarint};
use crate::{Block, CLIENT_REVISION, ClientHello, ProtocolError, Query, Result, revision};

/// Client hello, always encoded at the client's own revision
pub fn encode_hello(buf: &mut BytesMut, hello: &ClientHello) {
    put_uvarint(buf, client_code::HELLO);
    put_string(buf, &hello.client_name);
    put_uvarint(buf, hello.version_major);
    put_uvarint(buf, hello.version_minor);
    put_uvarint(buf, hello.revision);
    put_string(buf, &hello.database);
    put_string(buf, &hello.user);
    put_string(buf, &hello.password);
}

/// Post-handshake addendum (no packet code); a no-op below its revision
pub fn encode_addendum(buf: &mut BytesMut, quota_key: &str, revision: u64) {
    if revision >= revision::ADDENDUM {
        put_string(buf, quota_key);
    }
}

/// Query packet
///
/// # Errors
///
/// `Unsupported` when settings are given but the server predates
/// string-serialized settings.
pub fn encode_query(buf: &mut BytesMut, query: &Query, revision: u64) -> Result<()> {
    if !query.settings.is_empty() && revision < revision::SETTINGS_SERIALIZED_AS_STRINGS {
        return Err(ProtocolError::Unsupported(format!(
            "query settings at revision {revision}"
        )));
    }

    put_uvarint(buf, client_code::QUERY);
    put_string(buf, &query.id);

    // client info
    let info = &query.info;
    buf.put_u8(QUERY_KIND_INITIAL);
    put_string(buf, &info.initial_user);
    put_string(buf, &info.initial_query_id);
    put_string(buf, &info.initial_address);
    if revision >= revision::INITIAL_QUERY_START_TIME {
        buf.put_i64_le(0);
    }
    buf.put_u8(INTERFACE_TCP);
    put_string(buf, &info.os_user);
    put_string(buf, &info.client_hostname);
    put_string(buf, &info.client_name);
    put_uvarint(buf, info.version_major);
    put_uvarint(buf, info.version_minor);
    put_uvarint(buf, CLIENT_REVISION);
    if revision >= revision::QUOTA_KEY_IN_CLIENT_INFO {
        put_string(buf, &info.quota_key);
    }
    if revision >= revision::DISTRIBUTED_DEPTH {
        put_uvarint(buf, 0);
    }
    if revision >= revision::VERSION_PATCH {
        put_uvarint(buf, info.version_patch);
    }
    if revision >= revision::OPENTELEMETRY {
        buf.put_u8(0);
    }
    if revision >= revision::PARALLEL_REPLICAS {
        // collaborate_with_initiator, count_participating_replicas, number_of_current_replica
        put_uvarint(buf, 0);
        put_uvarint(buf, 0);
        put_uvarint(buf, 0);
    }

    for setting in &query.settings {
        put_string(buf, &setting.name);
        let flags = if setting.important { SETTING_FLAG_IMPORTANT } else { 0 };
        put_uvarint(buf, flags);
        put_string(buf, &setting.value);
    }
    put_string(buf, "");

    if revision >= revision::INTERSERVER_SECRET {
        put_string(buf, "");
    }
    put_uvarint(buf, query.stage);
    put_bool(buf, query.compression);
    put_string(buf, &query.body);
    if revision >= revision::PARAMETERS {
        put_string(buf, "");
    }
    Ok(())
}

/// Data packet carrying one block
pub fn encode_data(buf: &mut BytesMut, table: &str, block: &Block, revision: u64) {
    put_uvarint(buf, client_code::DATA);
    put_string(buf, table);
    block.encode(buf, revision);
}

pub fn encode_ping(buf: &mut BytesMut) {
    put_uvarint(buf, client_code::PING);
}

pub fn encode_cancel(buf: &mut BytesMut) {
    put_uvarint(buf, client_code::CANCEL);
}
