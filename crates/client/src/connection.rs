//! Native protocol connection
//!
//! A `Connection` owns one transport (normally a `TcpStream`) and speaks the
//! request/response half of the protocol: handshake, query, data packets and
//! draining the server's response stream.
//!
//! # Framing
//!
//! ```text
//! read_buf: [packet][packet][partial packet...]
//!            ^ decode from the front, advance past each complete packet,
//!              read more from the socket when the front is incomplete
//! ```
//!
//! # Deadlines
//!
//! Every read, write and flush is bounded by the installed deadline, if
//! any, and fails with [`Error::Timeout`] once it passes.

use std::future::Future;
use std::io;

use bytes::{Buf, BytesMut};
use chwire_protocol::decode::decode_server_packet;
use chwire_protocol::encode::{encode_addendum, encode_data, encode_hello, encode_ping, encode_query};
use chwire_protocol::packet::STAGE_COMPLETE;
use chwire_protocol::{
    Block, CLIENT_NAME, CLIENT_REVISION, CLIENT_VERSION_MAJOR, CLIENT_VERSION_MINOR,
    CLIENT_VERSION_PATCH, ClientHello, ClientInfo, Query, ServerHello, ServerPacket, Setting,
};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::Instant;
use tracing::{debug, trace};

use crate::direct::Insert;
use crate::error::{Error, Result};
use crate::options::{ClientOptions, OnProcess};

/// Initial read buffer capacity (64KB)
const READ_BUFFER_CAPACITY: usize = 64 * 1024;

/// Byte stream a connection can run over
pub trait Transport: AsyncRead + AsyncWrite + Unpin + Send {}

impl<T: AsyncRead + AsyncWrite + Unpin + Send> Transport for T {}

/// Run an I/O future under an optional deadline
async fn timed<F, T>(deadline: Option<Instant>, fut: F) -> Result<T>
where
    F: Future<Output = io::Result<T>>,
{
    match deadline {
        Some(deadline) => match tokio::time::timeout_at(deadline, fut).await {
            Ok(result) => Ok(result?),
            Err(_) => Err(Error::Timeout),
        },
        None => Ok(fut.await?),
    }
}

/// A handshaken connection to one server
pub struct Connection {
    stream: Box<dyn Transport>,
    read_buf: BytesMut,
    write_buf: BytesMut,
    revision: u64,
    server: ServerHello,
    client_info: ClientInfo,
    settings: Vec<Setting>,
    block_buffer_size: usize,
    deadline: Option<Instant>,
    last_error: Option<Error>,
    created_at: Instant,
    pub(crate) insert: Option<Insert>,
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("server", &self.server.name)
            .field("revision", &self.revision)
            .field("deadline", &self.deadline)
            .field("last_error", &self.last_error)
            .field("insert_active", &self.insert.is_some())
            .finish()
    }
}

impl Connection {
    /// Dial a server over TCP and perform the handshake
    ///
    /// Both the TCP connect and the handshake are bounded by
    /// `options.dial_timeout`.
    pub async fn connect(options: &ClientOptions) -> Result<Self> {
        let stream = match tokio::time::timeout(
            options.dial_timeout,
            TcpStream::connect(options.addr.as_str()),
        )
        .await
        {
            Ok(stream) => stream?,
            Err(_) => return Err(Error::Timeout),
        };
        stream.set_nodelay(true)?;
        Self::handshake(stream, options).await
    }

    /// Perform the handshake over an established transport
    pub async fn handshake<T>(stream: T, options: &ClientOptions) -> Result<Self>
    where
        T: Transport + 'static,
    {
        let os_user = std::env::var("USER")
            .or_else(|_| std::env::var("USERNAME"))
            .unwrap_or_default();
        let hostname = std::env::var("HOSTNAME").unwrap_or_default();

        let mut conn = Self {
            stream: Box::new(stream),
            read_buf: BytesMut::with_capacity(READ_BUFFER_CAPACITY),
            write_buf: BytesMut::with_capacity(options.block_buffer_size.min(READ_BUFFER_CAPACITY)),
            revision: CLIENT_REVISION,
            server: ServerHello::default(),
            client_info: ClientInfo {
                initial_user: options.username.clone(),
                initial_query_id: String::new(),
                initial_address: "0.0.0.0:0".into(),
                os_user,
                client_hostname: hostname,
                client_name: CLIENT_NAME.into(),
                version_major: CLIENT_VERSION_MAJOR,
                version_minor: CLIENT_VERSION_MINOR,
                version_patch: CLIENT_VERSION_PATCH,
                quota_key: options.quota_key.clone(),
            },
            settings: options.settings.clone(),
            block_buffer_size: options.block_buffer_size,
            deadline: Some(Instant::now() + options.dial_timeout),
            last_error: None,
            created_at: Instant::now(),
            insert: None,
        };

        encode_hello(
            &mut conn.write_buf,
            &ClientHello {
                client_name: CLIENT_NAME.into(),
                version_major: CLIENT_VERSION_MAJOR,
                version_minor: CLIENT_VERSION_MINOR,
                revision: CLIENT_REVISION,
                database: options.database.clone(),
                user: options.username.clone(),
                password: options.password.clone(),
            },
        );
        conn.flush().await?;

        match conn.read_packet().await? {
            ServerPacket::Hello(hello) => {
                conn.revision = hello.revision.min(CLIENT_REVISION);
                conn.server = hello;
            }
            ServerPacket::Exception(e) => return Err(e.into()),
            other => return Err(Error::UnexpectedPacket(other.name())),
        }

        encode_addendum(&mut conn.write_buf, &options.quota_key, conn.revision);
        conn.flush().await?;
        conn.deadline = None;

        debug!(
            server = %conn.server,
            revision = conn.revision,
            "connection established"
        );
        Ok(conn)
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Negotiated protocol revision
    #[inline]
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Server identification from the handshake
    pub fn server(&self) -> &ServerHello {
        &self.server
    }

    /// When the connection was established
    pub fn created_at(&self) -> Instant {
        self.created_at
    }

    /// Terminal error of the last operation, inspected by the pool
    pub fn last_error(&self) -> Option<&Error> {
        self.last_error.as_ref()
    }

    pub fn set_last_error(&mut self, err: Option<Error>) {
        self.last_error = err;
    }

    /// Whether a direct-write insert is in progress
    pub fn has_active_insert(&self) -> bool {
        self.insert.is_some()
    }

    // =========================================================================
    // Deadline
    // =========================================================================

    pub fn set_deadline(&mut self, deadline: Instant) {
        self.deadline = Some(deadline);
    }

    pub fn clear_deadline(&mut self) {
        self.deadline = None;
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    // =========================================================================
    // Requests
    // =========================================================================

    /// Send a query followed by the empty data block that ends its
    /// (absent) external tables, then flush
    ///
    /// `settings` override client settings of the same name.
    pub async fn send_query(&mut self, body: &str, query_id: &str, settings: &[Setting]) -> Result<()> {
        let mut merged: Vec<Setting> = self
            .settings
            .iter()
            .filter(|s| !settings.iter().any(|o| o.name == s.name))
            .cloned()
            .collect();
        merged.extend(settings.iter().cloned());

        let query = Query {
            id: query_id.to_string(),
            info: self.client_info.clone(),
            settings: merged,
            stage: STAGE_COMPLETE,
            compression: false,
            body: body.to_string(),
        };
        encode_query(&mut self.write_buf, &query, self.revision)?;
        encode_data(&mut self.write_buf, "", &Block::new(), self.revision);

        trace!(query_id = %query.id, query = %query.body, "sending query");
        self.flush().await
    }

    /// Queue a data packet, writing the buffer through once it passes
    /// `block_buffer_size`
    pub async fn send_data(&mut self, block: &Block, table: &str) -> Result<()> {
        encode_data(&mut self.write_buf, table, block, self.revision);
        if self.write_buf.len() >= self.block_buffer_size {
            self.write_buffered().await?;
        }
        Ok(())
    }

    /// Write all buffered packets and flush the transport
    pub async fn flush(&mut self) -> Result<()> {
        self.write_buffered().await?;
        timed(self.deadline, self.stream.flush()).await
    }

    async fn write_buffered(&mut self) -> Result<()> {
        if self.write_buf.is_empty() {
            return Ok(());
        }
        let result = timed(self.deadline, self.stream.write_all(&self.write_buf)).await;
        // partially written packets cannot be resent
        self.write_buf.clear();
        result
    }

    /// Round-trip a ping
    pub async fn ping(&mut self) -> Result<()> {
        encode_ping(&mut self.write_buf);
        self.flush().await?;
        let mut ignore = OnProcess::default();
        loop {
            match self.read_packet().await? {
                ServerPacket::Pong => return Ok(()),
                ServerPacket::Exception(e) => return Err(e.into()),
                other => self.dispatch(other, &mut ignore)?,
            }
        }
    }

    /// Shut down the write half of the transport
    pub(crate) async fn shutdown(&mut self) -> Result<()> {
        timed(self.deadline, self.stream.shutdown()).await
    }

    // =========================================================================
    // Responses
    // =========================================================================

    /// Read packets until the first data block, which carries the insert's
    /// column schema
    pub async fn first_block(&mut self, on_process: &mut OnProcess) -> Result<Block> {
        loop {
            match self.read_packet().await? {
                ServerPacket::Data { block, .. } => return Ok(block),
                ServerPacket::Exception(e) => return Err(e.into()),
                ServerPacket::EndOfStream => return Err(Error::UnexpectedEndOfStream),
                other => self.dispatch(other, on_process)?,
            }
        }
    }

    /// Send an insert statement and wait for its header block
    ///
    /// Takes the query id and settings rather than `&QueryOptions`, whose
    /// callbacks are not `Sync`, so the future stays `Send`.
    pub(crate) async fn start_insert(
        &mut self,
        query: &str,
        query_id: &str,
        settings: &[Setting],
        on_process: &mut OnProcess,
    ) -> Result<Block> {
        self.send_query(query, query_id, settings).await?;
        self.first_block(on_process).await
    }

    /// Drain the response stream until end of stream or an exception
    pub async fn process(&mut self, on_process: &mut OnProcess) -> Result<()> {
        loop {
            match self.read_packet().await? {
                ServerPacket::EndOfStream => return Ok(()),
                ServerPacket::Exception(e) => return Err(e.into()),
                ServerPacket::Data { block, .. } => {
                    trace!(rows = block.rows(), "ignoring data block");
                }
                other => self.dispatch(other, on_process)?,
            }
        }
    }

    /// Hand informational packets to their callbacks
    fn dispatch(&mut self, packet: ServerPacket, on_process: &mut OnProcess) -> Result<()> {
        match packet {
            ServerPacket::Progress(progress) => on_process.progress(&progress),
            ServerPacket::ProfileInfo(info) => on_process.profile_info(&info),
            ServerPacket::Log(logs) => on_process.logs(&logs),
            ServerPacket::ProfileEvents(events) => on_process.profile_events(&events),
            ServerPacket::Totals(_)
            | ServerPacket::Extremes(_)
            | ServerPacket::TableColumns { .. }
            | ServerPacket::Data { .. } => {}
            other => return Err(Error::UnexpectedPacket(other.name())),
        }
        Ok(())
    }

    /// Read one complete server packet
    async fn read_packet(&mut self) -> Result<ServerPacket> {
        loop {
            if !self.read_buf.is_empty() {
                let mut cursor = &self.read_buf[..];
                match decode_server_packet(&mut cursor, self.revision) {
                    Ok(packet) => {
                        let consumed = self.read_buf.len() - cursor.len();
                        self.read_buf.advance(consumed);
                        trace!(packet = packet.name(), bytes = consumed, "server packet");
                        return Ok(packet);
                    }
                    Err(e) if e.is_incomplete() => {}
                    Err(e) => return Err(e.into()),
                }
            }

            let n = timed(self.deadline, self.stream.read_buf(&mut self.read_buf)).await?;
            if n == 0 {
                return Err(Error::ConnectionClosed);
            }
        }
    }
}

#[cfg(test)]
#[path = "connection_test.rs"]
mod connection_test;
