//! Packet encoders
//!
//! Every encoder writes one complete packet, code included, into a
//! `BytesMut`. Optional fields are gated on the negotiated revision passed
//! in by the caller.
//!
//! - `client` - packets the driver sends (hello, query, data, ping, cancel)
//! - `server` - packets a server sends; used by test servers
//!
//! # Usage
//!
//! ```ignore
//! use chwire_protocol::encode::{encode_data, encode_query};
//!
//! let mut buf = BytesMut::new();
//! encode_query(&mut buf, &query, revision)?;
//! encode_data(&mut buf, "", &Block::new(), revision);
//! ```

mod client;
mod server;

pub use client::{encode_addendum, encode_cancel, encode_data, encode_hello, encode_ping, encode_query};
pub use server::encode_server_packet;
