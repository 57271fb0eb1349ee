//! Connection management: socket ownership, handshake, main loop.

mod connection;
pub mod event_loop;
pub mod handshake;

pub use connection::{Connection, LineReader};
