//! Packet types exchanged over a native connection
//!
//! Every packet starts with a uvarint code. Client and server use separate
//! code spaces; the codes below are the subset this crate speaks.

use std::fmt;

use chrono::{DateTime, Utc};

use crate::Block;

/// Client → server packet codes
pub mod client_code {
    pub const HELLO: u64 = 0;
    pub const QUERY: u64 = 1;
    pub const DATA: u64 = 2;
    pub const CANCEL: u64 = 3;
    pub const PING: u64 = 4;
}

/// Server → client packet codes
pub mod server_code {
    pub const HELLO: u64 = 0;
    pub const DATA: u64 = 1;
    pub const EXCEPTION: u64 = 2;
    pub const PROGRESS: u64 = 3;
    pub const PONG: u64 = 4;
    pub const END_OF_STREAM: u64 = 5;
    pub const PROFILE_INFO: u64 = 6;
    pub const TOTALS: u64 = 7;
    pub const EXTREMES: u64 = 8;
    pub const LOG: u64 = 10;
    pub const TABLE_COLUMNS: u64 = 11;
    pub const PROFILE_EVENTS: u64 = 14;
}

/// Query processing stage: run the query to completion
pub const STAGE_COMPLETE: u64 = 2;

/// Interface kind in client info
pub const INTERFACE_TCP: u8 = 1;

/// Query kind in client info
pub const QUERY_KIND_INITIAL: u8 = 1;

/// Setting flag: the server must reject the query if it does not know it
pub const SETTING_FLAG_IMPORTANT: u64 = 0x01;

// =============================================================================
// Handshake
// =============================================================================

/// First packet sent by the client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientHello {
    pub client_name: String,
    pub version_major: u64,
    pub version_minor: u64,
    pub revision: u64,
    pub database: String,
    pub user: String,
    pub password: String,
}

/// Server reply to the client hello
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ServerHello {
    pub name: String,
    pub version_major: u64,
    pub version_minor: u64,
    pub revision: u64,
    pub timezone: Option<String>,
    pub display_name: Option<String>,
    pub version_patch: u64,
}

impl fmt::Display for ServerHello {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}.{}.{} (revision {})",
            self.name, self.version_major, self.version_minor, self.version_patch, self.revision
        )
    }
}

// =============================================================================
// Query
// =============================================================================

/// Client description attached to every query
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ClientInfo {
    pub initial_user: String,
    pub initial_query_id: String,
    pub initial_address: String,
    pub os_user: String,
    pub client_hostname: String,
    pub client_name: String,
    pub version_major: u64,
    pub version_minor: u64,
    pub version_patch: u64,
    pub quota_key: String,
}

/// One query-level setting, serialized as strings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Setting {
    pub name: String,
    pub value: String,
    pub important: bool,
}

impl Setting {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            important: false,
        }
    }
}

/// Query packet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    pub id: String,
    pub info: ClientInfo,
    pub settings: Vec<Setting>,
    pub stage: u64,
    pub compression: bool,
    pub body: String,
}

// =============================================================================
// Server responses
// =============================================================================

/// Exception reported by the server, possibly with a nested cause
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerException {
    pub code: i32,
    pub name: String,
    pub message: String,
    pub stack_trace: String,
    pub nested: Option<Box<ServerException>>,
}

impl ServerException {
    pub fn new(code: i32, name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code,
            name: name.into(),
            message: message.into(),
            stack_trace: String::new(),
            nested: None,
        }
    }
}

impl fmt::Display for ServerException {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "code: {}, message: {}", self.code, self.message)
    }
}

impl std::error::Error for ServerException {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.nested
            .as_deref()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

/// Query progress counters; the server sends deltas
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Progress {
    pub rows: u64,
    pub bytes: u64,
    pub total_rows: u64,
    pub total_bytes: u64,
    pub wrote_rows: u64,
    pub wrote_bytes: u64,
    pub elapsed_ns: u64,
}

/// Execution profile summary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ProfileInfo {
    pub rows: u64,
    pub blocks: u64,
    pub bytes: u64,
    pub applied_limit: bool,
    pub rows_before_limit: u64,
    pub calculated_rows_before_limit: bool,
}

/// One server-side log line (from a Log packet)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerLog {
    pub time: DateTime<Utc>,
    pub time_micro: u32,
    pub host: String,
    pub query_id: String,
    pub thread_id: u64,
    pub priority: i8,
    pub source: String,
    pub text: String,
}

/// Kind of a profile event counter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileEventKind {
    Increment,
    Gauge,
}

impl ProfileEventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Increment => "increment",
            Self::Gauge => "gauge",
        }
    }
}

/// One profile event row (from a ProfileEvents packet)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileEvent {
    pub host: String,
    pub current_time: DateTime<Utc>,
    pub thread_id: u64,
    pub kind: ProfileEventKind,
    pub name: String,
    pub value: i64,
}

/// Decoded server packet
#[derive(Debug)]
pub enum ServerPacket {
    Hello(ServerHello),
    Data { table: String, block: Block },
    Exception(ServerException),
    Progress(Progress),
    Pong,
    EndOfStream,
    ProfileInfo(ProfileInfo),
    Totals(Block),
    Extremes(Block),
    Log(Vec<ServerLog>),
    TableColumns { table: String, description: String },
    ProfileEvents(Vec<ProfileEvent>),
}

impl ServerPacket {
    /// Packet name for logs and errors
    pub fn name(&self) -> &'static str {
        match self {
            Self::Hello(_) => "Hello",
            Self::Data { .. } => "Data",
            Self::Exception(_) => "Exception",
            Self::Progress(_) => "Progress",
            Self::Pong => "Pong",
            Self::EndOfStream => "EndOfStream",
            Self::ProfileInfo(_) => "ProfileInfo",
            Self::Totals(_) => "Totals",
            Self::Extremes(_) => "Extremes",
            Self::Log(_) => "Log",
            Self::TableColumns { .. } => "TableColumns",
            Self::ProfileEvents(_) => "ProfileEvents",
        }
    }

    pub fn code(&self) -> u64 {
        match self {
            Self::Hello(_) => server_code::HELLO,
            Self::Data { .. } => server_code::DATA,
            Self::Exception(_) => server_code::EXCEPTION,
            Self::Progress(_) => server_code::PROGRESS,
            Self::Pong => server_code::PONG,
            Self::EndOfStream => server_code::END_OF_STREAM,
            Self::ProfileInfo(_) => server_code::PROFILE_INFO,
            Self::Totals(_) => server_code::TOTALS,
            Self::Extremes(_) => server_code::EXTREMES,
            Self::Log(_) => server_code::LOG,
            Self::TableColumns { .. } => server_code::TABLE_COLUMNS,
            Self::ProfileEvents(_) => server_code::PROFILE_EVENTS,
        }
    }
}

/// Decoded client packet (used by test servers)
#[derive(Debug)]
pub enum ClientPacket {
    Hello(ClientHello),
    Query(Box<Query>),
    Data { table: String, block: Block },
    Cancel,
    Ping,
}

impl ClientPacket {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Hello(_) => "Hello",
            Self::Query(_) => "Query",
            Self::Data { .. } => "Data",
            Self::Cancel => "Cancel",
            Self::Ping => "Ping",
        }
    }
}
