//! chwire protocol - ClickHouse native wire format
//!
//! This crate provides the types and codecs that cross the wire:
//! - `wire` - varints, length-prefixed strings, little-endian scalars
//! - `Value` / `ColumnType` - dynamically typed cells and parsed type names
//! - `Column` - typed, append-only column buffers
//! - `Block` - ordered named columns, the unit of row data
//! - `packet` - client and server packet types
//! - `encode` / `decode` - packet codecs for both directions
//!
//! # Design Principles
//!
//! - **Revision aware**: optional fields are gated on the negotiated
//!   revision, `min(CLIENT_REVISION, server revision)`
//! - **Resumable decoding**: short input is `UnexpectedEnd`, never a panic,
//!   so stream framing can wait for more bytes
//! - **Atomic appends**: a failed column or row append leaves buffers as
//!   they were

pub mod block;
pub mod column;
pub mod decode;
pub mod encode;
mod error;
pub mod packet;
mod types;
mod value;
pub mod wire;

pub use block::{Block, BlockInfo};
pub use column::{Column, new_column};
pub use error::ProtocolError;
pub use packet::{
    ClientHello, ClientInfo, ClientPacket, ProfileEvent, ProfileEventKind, ProfileInfo, Progress,
    Query, ServerException, ServerHello, ServerLog, ServerPacket, Setting,
};
pub use types::ColumnType;
pub use value::Value;

// Re-export bytes for convenience
pub use bytes::BytesMut;

/// Result type for protocol operations
pub type Result<T> = std::result::Result<T, ProtocolError>;

/// Client name announced in the hello and client info
pub const CLIENT_NAME: &str = "chwire";

pub const CLIENT_VERSION_MAJOR: u64 = 0;
pub const CLIENT_VERSION_MINOR: u64 = 1;
pub const CLIENT_VERSION_PATCH: u64 = 0;

/// Protocol revision spoken by this client
pub const CLIENT_REVISION: u64 = 54460;

/// Minimum server revisions for optional protocol fields
pub mod revision {
    pub const SERVER_TIMEZONE: u64 = 54058;
    pub const QUOTA_KEY_IN_CLIENT_INFO: u64 = 54060;
    pub const SERVER_DISPLAY_NAME: u64 = 54372;
    pub const VERSION_PATCH: u64 = 54401;
    pub const CLIENT_WRITE_INFO: u64 = 54420;
    pub const SETTINGS_SERIALIZED_AS_STRINGS: u64 = 54429;
    pub const INTERSERVER_SECRET: u64 = 54441;
    pub const OPENTELEMETRY: u64 = 54442;
    pub const DISTRIBUTED_DEPTH: u64 = 54448;
    pub const INITIAL_QUERY_START_TIME: u64 = 54449;
    pub const INCREMENTAL_PROFILE_EVENTS: u64 = 54451;
    pub const PARALLEL_REPLICAS: u64 = 54453;
    pub const CUSTOM_SERIALIZATION: u64 = 54454;
    pub const ADDENDUM: u64 = 54458;
    pub const PARAMETERS: u64 = 54459;
    pub const SERVER_QUERY_TIME_IN_PROGRESS: u64 = 54460;
    pub const TOTAL_BYTES_IN_PROGRESS: u64 = 54463;
}
