//! Name → typed handler registry.
//!
//! Handlers declare their argument tuple as a `DeserializeOwned` type; the
//! untyped wire args are converted at dispatch time and a mismatch fails
//! closed with `HandlerError::InvalidArguments`.

use crate::domain::envelope::{into_reply_args, typed_args};
use crate::error::HandlerError;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Collects intermediate results from a streaming handler.
#[derive(Debug, Default)]
pub struct Responder {
    partials: Vec<Vec<Value>>,
}

impl Responder {
    /// Emit one partial result ahead of the final one.
    pub fn partial<T: Serialize>(&mut self, value: T) -> Result<(), HandlerError> {
        let value = serde_json::to_value(value).map_err(|e| HandlerError::failed(e.to_string()))?;
        self.partials.push(into_reply_args(value).unwrap_or_default());
        Ok(())
    }

    pub fn partial_count(&self) -> usize {
        self.partials.len()
    }
}

/// What a handler produced for one inbound request.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct HandlerOutput {
    pub partials: Vec<Vec<Value>>,
    /// `None` when the handler returned no value.
    pub result: Option<Vec<Value>>,
}

type ErasedHandler = dyn Fn(Vec<Value>) -> Result<HandlerOutput, HandlerError> + Send + Sync;

/// A registered handler, cheap to clone out of the registry before invoking.
#[derive(Clone)]
pub struct HandlerFn(Arc<ErasedHandler>);

impl HandlerFn {
    pub fn call(&self, args: Vec<Value>) -> Result<HandlerOutput, HandlerError> {
        (self.0)(args)
    }
}

/// At most one handler per name; registering again replaces it.
#[derive(Clone, Default)]
pub struct HandlerRegistry {
    handlers: HashMap<String, HandlerFn>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler taking typed args `A` and returning a value.
    ///
    /// Arrays returned by the handler are spread into the response args;
    /// returning `()` means the request is not answered locally.
    pub fn register<A, R, F>(&mut self, name: impl Into<String>, handler: F)
    where
        A: DeserializeOwned + 'static,
        R: Serialize + 'static,
        F: Fn(A) -> Result<R, HandlerError> + Send + Sync + 'static,
    {
        self.register_streaming(name, move |args: A, _: &mut Responder| handler(args));
    }

    /// Register a handler that may emit partial results before its final one.
    pub fn register_streaming<A, R, F>(&mut self, name: impl Into<String>, handler: F)
    where
        A: DeserializeOwned + 'static,
        R: Serialize + 'static,
        F: Fn(A, &mut Responder) -> Result<R, HandlerError> + Send + Sync + 'static,
    {
        let erased = move |raw: Vec<Value>| -> Result<HandlerOutput, HandlerError> {
            let args: A = typed_args(raw)?;
            let mut responder = Responder::default();
            let value = handler(args, &mut responder)?;
            let value =
                serde_json::to_value(value).map_err(|e| HandlerError::failed(e.to_string()))?;
            Ok(HandlerOutput {
                partials: responder.partials,
                result: into_reply_args(value),
            })
        };
        self.insert(name.into(), HandlerFn(Arc::new(erased)));
    }

    /// Register a handler over the raw wire args.
    pub fn register_raw<F>(&mut self, name: impl Into<String>, handler: F)
    where
        F: Fn(Vec<Value>) -> Result<Option<Vec<Value>>, HandlerError> + Send + Sync + 'static,
    {
        let erased = move |raw: Vec<Value>| -> Result<HandlerOutput, HandlerError> {
            Ok(HandlerOutput {
                partials: Vec::new(),
                result: handler(raw)?,
            })
        };
        self.insert(name.into(), HandlerFn(Arc::new(erased)));
    }

    fn insert(&mut self, name: String, handler: HandlerFn) {
        if self.handlers.insert(name.clone(), handler).is_some() {
            debug!(func = %name, "Replaced existing handler");
        } else {
            debug!(func = %name, "Registered handler");
        }
    }

    pub fn get(&self, name: &str) -> Option<HandlerFn> {
        self.handlers.get(name).cloned()
    }

    pub fn remove(&mut self, name: &str) -> bool {
        self.handlers.remove(name).is_some()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}
