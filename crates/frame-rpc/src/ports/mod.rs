//! Ports Layer
//!
//! - Driven port (outbound): `Transport`, the only piece that touches the raw
//!   cross-window messaging primitive.
//! - Driving entry point (inbound): `Session::on_message`, called by whatever
//!   owns the transport's receive side.

pub mod outbound;

pub use outbound::Transport;
