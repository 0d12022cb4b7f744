//! Property tests for correlation and trust.

use frame_rpc::{
    BridgeConfig, Disposition, DropReason, Endpoint, InMemoryTransport, OriginValidator,
    ParentLink, Session,
};
use futures::executor::block_on;
use proptest::prelude::*;
use serde_json::json;
use std::sync::Arc;

const HOST_ORIGIN: &str = "https://teams.microsoft.com";

fn initialized_session() -> (Session, Arc<InMemoryTransport>) {
    let transport = Arc::new(InMemoryTransport::new());
    let session = Session::new(
        BridgeConfig::default(),
        ParentLink::Frameless,
        transport.clone(),
    )
    .unwrap();
    let init = session.initialize(None);
    let message = transport.find_request("initialize").unwrap();
    session
        .on_message(
            Endpoint::Host,
            HOST_ORIGIN,
            &json!({ "id": message.id().unwrap(), "args": ["content"] }),
        )
        .unwrap();
    assert_eq!(block_on(init.context_kind()).unwrap(), "content");
    (session, transport)
}

fn reply(session: &Session, id: u64, args: serde_json::Value, origin: &str) -> Disposition {
    session
        .on_message(Endpoint::Host, origin, &json!({ "id": id, "args": args }))
        .unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Every call gets its own reply whatever order the host answers in.
    #[test]
    fn prop_any_reply_order_reaches_the_right_caller(
        order in (1usize..12).prop_flat_map(|n| Just((0..n).collect::<Vec<_>>()).prop_shuffle())
    ) {
        let (session, transport) = initialized_session();
        let n = order.len();

        let handles: Vec<_> = (0..n)
            .map(|i| session.send_request("getContext", vec![json!(i)]))
            .collect();
        let ids: Vec<u64> = handles.iter().map(|h| h.id().unwrap().0).collect();
        prop_assert_eq!(transport.len(), n + 1);

        for &i in &order {
            let disposition = reply(&session, ids[i], json!([format!("reply-{i}")]), HOST_ORIGIN);
            prop_assert!(
                matches!(disposition, Disposition::Resolved { .. }),
                "unexpected disposition"
            );
        }

        for (i, handle) in handles.into_iter().enumerate() {
            prop_assert_eq!(block_on(handle).unwrap(), vec![json!(format!("reply-{i}"))]);
        }
        prop_assert_eq!(session.pending_count(), 0);
    }

    /// However many times a final reply is retransmitted, it resolves once.
    #[test]
    fn prop_duplicate_finals_resolve_once(copies in 1usize..100) {
        let (session, _transport) = initialized_session();
        let pending = session.send_request("getContext", vec![]);
        let id = pending.id().unwrap().0;

        for _ in 0..copies {
            reply(&session, id, json!(["ctx"]), HOST_ORIGIN);
        }

        prop_assert_eq!(block_on(pending).unwrap(), vec![json!("ctx")]);
        let stats = session.stats();
        prop_assert_eq!(stats.replies_resolved, 1);
        prop_assert_eq!(stats.stale_replies, (copies - 1) as u64);
    }

    /// Replies from origins outside the trusted set never resolve a call.
    #[test]
    fn prop_untrusted_origin_never_resolves(
        scheme in prop::sample::select(vec!["https://", "http://", "wss://", ""]),
        host in "[a-z]{1,10}\\.(com|net|org|office\\.net)",
    ) {
        let origin = format!("{scheme}{host}");
        prop_assume!(!OriginValidator::builtin(true).is_trusted(&origin));

        let (session, _transport) = initialized_session();
        let pending = session.send_request("getContext", vec![]);
        let id = pending.id().unwrap().0;

        prop_assert_eq!(
            reply(&session, id, json!(["spoofed"]), &origin),
            Disposition::Dropped(DropReason::UntrustedOrigin)
        );
        prop_assert_eq!(session.pending_count(), 1);
        prop_assert_eq!(session.child_count(), 0);
    }
}
