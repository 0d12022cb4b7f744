//! Capability layer - thin typed callers over `Session`.
//!
//! Each capability names a host call, restricts the frame contexts it is
//! valid in and interprets the host's reply args. Correlation, queuing and
//! trust all stay in the session.

pub mod app;
pub mod pages;
pub mod private_apis;

use crate::error::BridgeError;
use serde_json::Value;

/// Interpret a `[success, reason?]` reply.
pub(crate) fn expect_success(func: &str, args: Vec<Value>) -> Result<(), BridgeError> {
    match args.first() {
        Some(Value::Bool(true)) => Ok(()),
        Some(Value::Bool(false)) => Err(BridgeError::Host {
            func: func.to_string(),
            reason: args
                .get(1)
                .and_then(Value::as_str)
                .unwrap_or("host reported failure")
                .to_string(),
        }),
        _ => Err(BridgeError::Host {
            func: func.to_string(),
            reason: "unexpected reply".into(),
        }),
    }
}
