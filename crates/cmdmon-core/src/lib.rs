//! The Command & Monitoring (C/M) request pipeline: transport
//! multiplexing, authorization, and dispatch into the collaborator
//! subsystems defined by `cmdmon-collab`.
//!
//! `cmdmon-wire` owns the byte layout; this crate owns what happens to a
//! datagram once it has been read off a socket.

mod collaborators;
mod dispatch;
mod handlers;
mod policy;
mod transport;

pub use collaborators::Collaborators;
pub use dispatch::process;
pub use policy::{authorize, TrustLevel};
pub use transport::{Listener, TransportError};
