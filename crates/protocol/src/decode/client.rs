//! Client packet decoders

use crate::packet::{SETTING_FLAG_IMPORTANT, client_code};
use crate::wire::{get_bool, get_i64, get_string, get_u8, get_uvarint};
use crate::{
    Block, ClientHello, ClientInfo, ClientPacket, ProtocolError, Query, Result, Setting, revision,
};

/// Decode one client packet
///
/// A hello is decoded regardless of `revision`; every other packet is read
/// at the negotiated revision.
pub fn decode_client_packet(buf: &mut &[u8], revision: u64) -> Result<ClientPacket> {
    let code = get_uvarint(buf)?;
    let packet = match code {
        client_code::HELLO => ClientPacket::Hello(ClientHello {
            client_name: get_string(buf)?,
            version_major: get_uvarint(buf)?,
            version_minor: get_uvarint(buf)?,
            revision: get_uvarint(buf)?,
            database: get_string(buf)?,
            user: get_string(buf)?,
            password: get_string(buf)?,
        }),
        client_code::QUERY => ClientPacket::Query(Box::new(decode_query(buf, revision)?)),
        client_code::DATA => {
            let table = get_string(buf)?;
            let block = Block::decode(buf, revision)?;
            ClientPacket::Data { table, block }
        }
        client_code::CANCEL => ClientPacket::Cancel,
        client_code::PING => ClientPacket::Ping,
        other => return Err(ProtocolError::UnknownPacket(other)),
    };
    Ok(packet)
}

/// Quota key sent right after the hello; empty below its revision
pub fn decode_addendum(buf: &mut &[u8], revision: u64) -> Result<String> {
    if revision >= revision::ADDENDUM {
        return get_string(buf);
    }
    Ok(String::new())
}

fn decode_query(buf: &mut &[u8], revision: u64) -> Result<Query> {
    let id = get_string(buf)?;

    let mut info = ClientInfo::default();
    let kind = get_u8(buf)?;
    if kind != 0 {
        info.initial_user = get_string(buf)?;
        info.initial_query_id = get_string(buf)?;
        info.initial_address = get_string(buf)?;
        if revision >= revision::INITIAL_QUERY_START_TIME {
            get_i64(buf)?;
        }
        get_u8(buf)?; // interface
        info.os_user = get_string(buf)?;
        info.client_hostname = get_string(buf)?;
        info.client_name = get_string(buf)?;
        info.version_major = get_uvarint(buf)?;
        info.version_minor = get_uvarint(buf)?;
        get_uvarint(buf)?; // client revision
        if revision >= revision::QUOTA_KEY_IN_CLIENT_INFO {
            info.quota_key = get_string(buf)?;
        }
        if revision >= revision::DISTRIBUTED_DEPTH {
            get_uvarint(buf)?;
        }
        if revision >= revision::VERSION_PATCH {
            info.version_patch = get_uvarint(buf)?;
        }
        if revision >= revision::OPENTELEMETRY && get_u8(buf)? != 0 {
            return Err(ProtocolError::Unsupported("opentelemetry trace context".into()));
        }
        if revision >= revision::PARALLEL_REPLICAS {
            for _ in 0..3 {
                get_uvarint(buf)?;
            }
        }
    }

    let mut settings = Vec::new();
    loop {
        let name = get_string(buf)?;
        if name.is_empty() {
            break;
        }
        let flags = get_uvarint(buf)?;
        let value = get_string(buf)?;
        settings.push(Setting {
            name,
            value,
            important: flags & SETTING_FLAG_IMPORTANT != 0,
        });
    }

    if revision >= revision::INTERSERVER_SECRET {
        get_string(buf)?;
    }
    let stage = get_uvarint(buf)?;
    let compression = get_bool(buf)?;
    let body = get_string(buf)?;
    if revision >= revision::PARAMETERS {
        // parameters use the settings layout; this codec only sends none
        loop {
            let name = get_string(buf)?;
            if name.is_empty() {
                break;
            }
            get_uvarint(buf)?;
            get_string(buf)?;
        }
    }

    Ok(Query {
        id,
        info,
        settings,
        stage,
        compression,
        body,
    })
}
