//! Handler layer - typed dispatch targets for inbound requests.

pub mod registry;

pub use registry::{HandlerFn, HandlerOutput, HandlerRegistry, Responder};
