//! Wire envelopes and the message codec.
//!
//! Two shapes cross the wire:
//!
//! ```text
//! request:  { "id": 7 | null, "func": "getContext", "args": [...] }
//! response: { "id": 7, "args": [...], "isPartialResponse": false }
//! ```
//!
//! Inbound frames are structured values; anything carrying `func` is a
//! request, anything else with an integer `id` is a response.

use crate::domain::correlation::MessageId;
use crate::error::{CodecError, HandlerError};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Outbound call or inbound request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageRequest {
    /// `None` for fire-and-forget events.
    pub id: Option<MessageId>,
    pub func: String,
    #[serde(default)]
    pub args: Vec<Value>,
}

impl MessageRequest {
    pub fn call(id: MessageId, func: impl Into<String>, args: Vec<Value>) -> Self {
        Self {
            id: Some(id),
            func: func.into(),
            args,
        }
    }

    pub fn event(func: impl Into<String>, args: Vec<Value>) -> Self {
        Self {
            id: None,
            func: func.into(),
            args,
        }
    }
}

/// Reply to a request, possibly one of several partials.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageResponse {
    pub id: MessageId,
    #[serde(default)]
    pub args: Vec<Value>,
    #[serde(rename = "isPartialResponse", default)]
    pub is_partial_response: bool,
}

impl MessageResponse {
    pub fn from_reply(id: MessageId, reply: Reply) -> Self {
        let is_partial_response = reply.is_partial();
        Self {
            id,
            args: reply.into_args(),
            is_partial_response,
        }
    }

    pub fn into_reply(self) -> Reply {
        if self.is_partial_response {
            Reply::Partial(self.args)
        } else {
            Reply::Final(self.args)
        }
    }
}

/// One item of a reply stream: zero or more partials, then exactly one final.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Partial(Vec<Value>),
    Final(Vec<Value>),
}

impl Reply {
    pub fn is_partial(&self) -> bool {
        matches!(self, Reply::Partial(_))
    }

    pub fn args(&self) -> &[Value] {
        match self {
            Reply::Partial(args) | Reply::Final(args) => args,
        }
    }

    pub fn into_args(self) -> Vec<Value> {
        match self {
            Reply::Partial(args) | Reply::Final(args) => args,
        }
    }
}

/// A decoded inbound frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Envelope {
    Request(MessageRequest),
    Response(MessageResponse),
}

/// Decode an inbound structured value into an envelope.
pub fn decode(raw: &Value) -> Result<Envelope, CodecError> {
    if !raw.is_object() {
        return Err(CodecError::Malformed(format!(
            "expected an object, got {}",
            kind_of(raw)
        )));
    }
    Envelope::deserialize(raw).map_err(|e| CodecError::Malformed(e.to_string()))
}

pub fn encode_request(request: &MessageRequest) -> Result<Value, CodecError> {
    Ok(serde_json::to_value(request)?)
}

pub fn encode_response(response: &MessageResponse) -> Result<Value, CodecError> {
    Ok(serde_json::to_value(response)?)
}

/// Normalize a handler's return value into response args.
///
/// Arrays are spread; `null` means "no value"; anything else becomes a single
/// argument.
pub fn into_reply_args(value: Value) -> Option<Vec<Value>> {
    match value {
        Value::Null => None,
        Value::Array(args) => Some(args),
        other => Some(vec![other]),
    }
}

/// Convert untyped wire args into a handler's typed argument tuple.
///
/// Arity and element types must match exactly; a handler taking no arguments
/// may declare `()`.
pub fn typed_args<A: DeserializeOwned>(args: Vec<Value>) -> Result<A, HandlerError> {
    let was_empty = args.is_empty();
    match serde_json::from_value(Value::Array(args)) {
        Ok(typed) => Ok(typed),
        Err(_) if was_empty => serde_json::from_value(Value::Null)
            .map_err(|e| HandlerError::InvalidArguments(e.to_string())),
        Err(e) => Err(HandlerError::InvalidArguments(e.to_string())),
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_request_with_null_id() {
        let raw = json!({ "id": null, "func": "customAction1", "args": ["arg1", 123, 4.5, true] });
        match decode(&raw).unwrap() {
            Envelope::Request(req) => {
                assert_eq!(req.id, None);
                assert_eq!(req.func, "customAction1");
                assert_eq!(req.args, vec![json!("arg1"), json!(123), json!(4.5), json!(true)]);
            }
            other => panic!("expected request, got {:?}", other),
        }
    }

    #[test]
    fn test_decode_response_defaults_to_final() {
        let raw = json!({ "id": 3, "args": [{ "groupId": "g" }] });
        match decode(&raw).unwrap() {
            Envelope::Response(resp) => {
                assert_eq!(resp.id, MessageId(3));
                assert!(!resp.is_partial_response);
                assert_eq!(resp.into_reply(), Reply::Final(vec![json!({ "groupId": "g" })]));
            }
            other => panic!("expected response, got {:?}", other),
        }
    }

    #[test]
    fn test_decode_partial_response() {
        let raw = json!({ "id": 100, "args": [], "isPartialResponse": true });
        let Envelope::Response(resp) = decode(&raw).unwrap() else {
            panic!("expected response");
        };
        assert!(resp.into_reply().is_partial());
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(decode(&json!("hello")).is_err());
        assert!(decode(&json!([1, 2, 3])).is_err());
        assert!(decode(&json!({ "args": [] })).is_err());
        assert!(decode(&json!({ "id": -1, "args": [] })).is_err());
        assert!(decode(&json!({ "id": "7", "args": [] })).is_err());
    }

    #[test]
    fn test_encode_shapes_are_bit_exact() {
        let event = encode_request(&MessageRequest::event("themeChange", vec![json!("dark")])).unwrap();
        assert_eq!(event, json!({ "id": null, "func": "themeChange", "args": ["dark"] }));

        let partial = encode_response(&MessageResponse::from_reply(
            MessageId(4),
            Reply::Partial(vec![json!(1)]),
        ))
        .unwrap();
        assert_eq!(partial, json!({ "id": 4, "args": [1], "isPartialResponse": true }));
    }

    #[test]
    fn test_typed_args() {
        let (name, count, ratio, flag): (String, i64, f64, bool) =
            typed_args(vec![json!("arg1"), json!(123), json!(4.5), json!(true)]).unwrap();
        assert_eq!((name.as_str(), count, ratio, flag), ("arg1", 123, 4.5, true));

        let () = typed_args(vec![]).unwrap();

        assert!(typed_args::<(String, i64)>(vec![json!("only one")]).is_err());
        assert!(typed_args::<(String,)>(vec![json!("a"), json!("b")]).is_err());
        assert!(typed_args::<(bool,)>(vec![json!("not a bool")]).is_err());
    }

    #[test]
    fn test_into_reply_args() {
        assert_eq!(into_reply_args(Value::Null), None);
        assert_eq!(into_reply_args(json!([1, 2])), Some(vec![json!(1), json!(2)]));
        assert_eq!(into_reply_args(json!("x")), Some(vec![json!("x")]));
    }
}
