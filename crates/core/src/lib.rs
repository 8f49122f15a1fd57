//! Domain types shared by the dispatch engine, the collaborator gateway and
//! the HTTP/WebSocket surface.
//!
//! Nothing in this crate performs I/O.

pub mod booking;
pub mod error;
pub mod geo;
pub mod protocol;
pub mod status;
pub mod types;
