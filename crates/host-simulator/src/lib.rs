//! # Host Simulator
//!
//! Wires frame-rpc sessions to a scripted host inside one process.
//!
//! ```text
//!                 ┌──────────────┐
//!                 │     Host     │  scripted replies, pushes themeChange
//!                 └──────▲───────┘
//!                        │ native channel
//!                 ┌──────┴───────┐
//!                 │ parent frame │  frameless session, relays for children
//!                 └──────▲───────┘
//!                        │ window messages
//!                 ┌──────┴───────┐
//!                 │ child frame  │  framed session
//!                 └──────────────┘
//! ```
//!
//! Every message goes through the `Router`, which owns the receive side of
//! the shared delivery channel.

pub mod host;
pub mod router;
pub mod scenario;

pub use host::{Host, HostSettings, STREAMED_FUNC};
pub use router::Router;
pub use scenario::{run_scenario, ScenarioReport, ScenarioSettings};
