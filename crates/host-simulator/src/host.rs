//! Scripted host: answers requests from the top-level frame.

use frame_rpc::domain::envelope::{decode, encode_request, encode_response, Envelope};
use frame_rpc::{Delivery, Endpoint, MessageId, MessageRequest, MessageResponse, Reply};
use frame_telemetry::log_frame_event;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

/// Simulator-only call answered with partial results before its final one.
pub const STREAMED_FUNC: &str = "listItems";

#[derive(Debug, Clone)]
pub struct HostSettings {
    pub origin: String,
    pub frame_context: String,
    pub client_type: String,
    pub locale: String,
    /// Partial replies sent for `STREAMED_FUNC` before the final one.
    pub streamed_chunks: usize,
}

impl Default for HostSettings {
    fn default() -> Self {
        Self {
            origin: "https://teams.microsoft.com".to_string(),
            frame_context: "content".to_string(),
            client_type: "web".to_string(),
            locale: "en-us".to_string(),
            streamed_chunks: 2,
        }
    }
}

pub struct Host {
    settings: HostSettings,
}

impl Host {
    pub fn new(settings: HostSettings) -> Self {
        Self { settings }
    }

    pub fn origin(&self) -> &str {
        &self.settings.origin
    }

    /// Answer one delivery addressed to the host.
    pub fn handle(&self, delivery: &Delivery) -> Vec<Delivery> {
        let request = match decode(&delivery.envelope) {
            Ok(Envelope::Request(request)) => request,
            Ok(Envelope::Response(response)) => {
                debug!(id = %response.id, "Host ignoring response");
                return Vec::new();
            }
            Err(e) => {
                warn!(error = %e, "Host received malformed message");
                return Vec::new();
            }
        };

        let Some(id) = request.id else {
            info!(func = %request.func, args = ?request.args, "Host received event");
            return Vec::new();
        };

        log_frame_event!(debug, "host", "Answering request", delivery.from, Endpoint::Host, func = %request.func, id = %id);
        self.replies(&request)
            .into_iter()
            .filter_map(|reply| self.response(delivery, id, reply))
            .collect()
    }

    fn replies(&self, request: &MessageRequest) -> Vec<Reply> {
        let settings = &self.settings;
        match request.func.as_str() {
            "initialize" => vec![Reply::Final(vec![
                json!(settings.frame_context),
                json!(settings.client_type),
                json!(r#"{"supports":{"pages":{}}}"#),
            ])],
            "getContext" => vec![Reply::Final(vec![json!({
                "locale": settings.locale,
                "entityId": "simulated-entity",
                "frameContext": settings.frame_context,
                "theme": "default",
                "sessionId": "simulated-session",
            })])],
            STREAMED_FUNC => {
                let mut replies: Vec<Reply> = (1..=settings.streamed_chunks)
                    .map(|chunk| Reply::Partial(vec![json!(format!("item-{chunk}"))]))
                    .collect();
                replies.push(Reply::Final(vec![json!(settings.streamed_chunks)]));
                replies
            }
            _ => vec![Reply::Final(vec![
                json!(false),
                json!(format!("{} is not supported by the simulated host", request.func)),
            ])],
        }
    }

    fn response(&self, delivery: &Delivery, id: MessageId, reply: Reply) -> Option<Delivery> {
        let response = MessageResponse::from_reply(id, reply);
        match encode_response(&response) {
            Ok(envelope) => Some(Delivery {
                from: Endpoint::Host,
                to: delivery.from,
                origin: self.settings.origin.clone(),
                envelope,
                target_origin: Some(delivery.origin.clone()),
            }),
            Err(e) => {
                warn!(error = %e, "Failed to encode host reply");
                None
            }
        }
    }

    /// Build an event pushed by the host to `to`.
    pub fn event(&self, to: Endpoint, func: &str, args: Vec<Value>) -> Option<Delivery> {
        let envelope = encode_request(&MessageRequest::event(func, args)).ok()?;
        Some(Delivery {
            from: Endpoint::Host,
            to,
            origin: self.settings.origin.clone(),
            envelope,
            target_origin: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use frame_rpc::WindowId;

    fn request(envelope: Value) -> Delivery {
        Delivery {
            from: Endpoint::Window(WindowId(1)),
            to: Endpoint::Host,
            origin: "https://app.example.com".to_string(),
            envelope,
            target_origin: None,
        }
    }

    #[test]
    fn test_initialize_reply_carries_context_and_runtime_config() {
        let host = Host::new(HostSettings::default());
        let out = host.handle(&request(json!({ "id": 0, "func": "initialize", "args": ["0.1.0"] })));

        assert_eq!(out.len(), 1);
        assert_eq!(out[0].to, Endpoint::Window(WindowId(1)));
        assert_eq!(out[0].target_origin.as_deref(), Some("https://app.example.com"));
        assert_eq!(out[0].envelope["id"], json!(0));
        assert_eq!(out[0].envelope["args"][0], json!("content"));
        assert_eq!(out[0].envelope["isPartialResponse"], json!(false));
    }

    #[test]
    fn test_streamed_call_sends_partials_then_final() {
        let host = Host::new(HostSettings {
            streamed_chunks: 3,
            ..HostSettings::default()
        });
        let out = host.handle(&request(json!({ "id": 4, "func": STREAMED_FUNC, "args": [] })));

        let partial: Vec<bool> = out
            .iter()
            .map(|d| d.envelope["isPartialResponse"].as_bool().unwrap())
            .collect();
        assert_eq!(partial, vec![true, true, true, false]);
        assert_eq!(out[3].envelope["args"], json!([3]));
    }

    #[test]
    fn test_events_and_responses_get_no_reply() {
        let host = Host::new(HostSettings::default());
        assert!(host
            .handle(&request(json!({ "id": null, "func": "returnFocus", "args": [true] })))
            .is_empty());
        assert!(host.handle(&request(json!({ "id": 3, "args": [] }))).is_empty());
        assert!(host.handle(&request(json!("garbage"))).is_empty());
    }

    #[test]
    fn test_unknown_call_is_refused() {
        let host = Host::new(HostSettings::default());
        let out = host.handle(&request(json!({ "id": 9, "func": "navigateBack", "args": [] })));
        assert_eq!(out[0].envelope["args"][0], json!(false));
    }
}
