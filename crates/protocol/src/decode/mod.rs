//! Packet decoders
//!
//! Decoders read from a `&mut &[u8]` cursor and advance it past the packet.
//! When the input holds only part of a packet they fail with
//! [`ProtocolError::UnexpectedEnd`](crate::ProtocolError::UnexpectedEnd);
//! callers framing a byte stream keep the unread bytes and retry once more
//! data has arrived.
//!
//! - `server` - packets the driver receives
//! - `client` - packets a server receives; used by test servers
//!
//! # Usage
//!
//! ```ignore
//! use chwire_protocol::decode::decode_server_packet;
//!
//! let mut cursor = &read_buf[..];
//! match decode_server_packet(&mut cursor, revision) {
//!     Ok(packet) => {
//!         let consumed = read_buf.len() - cursor.len();
//!         read_buf.advance(consumed);
//!     }
//!     Err(e) if e.is_incomplete() => { /* read more */ }
//!     Err(e) => return Err(e.into()),
//! }
//! ```

mod client;
mod server;

pub use client::{decode_addendum, decode_client_packet};
pub use server::decode_server_packet;

#[cfg(test)]
#[path = "decode_test.rs"]
mod decode_test;
