//! Capability callers exercised against a scripted host.

use frame_rpc::capabilities::private_apis::{
    register_custom_handler, register_user_settings_change_handler, send_custom_event,
    send_custom_message, UserSettingKind,
};
use frame_rpc::capabilities::{app, pages};
use frame_rpc::{
    BridgeConfig, BridgeError, Endpoint, InMemoryTransport, ParentLink, SentMessage, Session,
    WindowId,
};
use futures::poll;
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::sync::Arc;

const HOST_ORIGIN: &str = "https://teams.microsoft.com";
const PARENT: WindowId = WindowId(1);

fn framed() -> (Session, Arc<InMemoryTransport>) {
    let transport = Arc::new(InMemoryTransport::new());
    let session = Session::new(
        BridgeConfig::default(),
        ParentLink::Framed(PARENT),
        transport.clone(),
    )
    .unwrap();
    (session, transport)
}

fn respond(session: &Session, message: &SentMessage, args: Value) {
    session
        .on_message(
            Endpoint::Window(PARENT),
            HOST_ORIGIN,
            &json!({ "id": message.id().unwrap(), "args": args }),
        )
        .unwrap();
}

async fn initialize_with(session: &Session, transport: &InMemoryTransport, args: Value) {
    let init = session.initialize(None);
    let message = transport.find_request("initialize").unwrap();
    respond(session, &message, args);
    init.await.unwrap();
}

// =============================================================================
// app
// =============================================================================

#[tokio::test]
async fn test_get_context_out_of_order() {
    let (session, transport) = framed();
    initialize_with(&session, &transport, json!(["content", "web"])).await;

    let mut first = Box::pin(app::get_context(&session));
    assert!(poll!(first.as_mut()).is_pending());
    let m1 = transport.messages().last().cloned().unwrap();
    let mut second = Box::pin(app::get_context(&session));
    assert!(poll!(second.as_mut()).is_pending());
    let m2 = transport.messages().last().cloned().unwrap();
    assert_ne!(m1.id(), m2.id());

    respond(
        &session,
        &m2,
        json!([{ "locale": "someLocale2", "entityId": "someEntityId2", "channelId": "someChannelId2", "userObjectId": "someUserObjectId2" }]),
    );
    respond(
        &session,
        &m1,
        json!([{ "locale": "someLocale1", "entityId": "someEntityId1", "channelId": "someChannelId1", "userObjectId": "someUserObjectId1" }]),
    );

    let first = first.await.unwrap();
    let second = second.await.unwrap();
    assert_eq!(first.app.locale, "someLocale1");
    assert_eq!(first.page.id, "someEntityId1");
    assert_eq!(first.page.frame_context, "content");
    assert_eq!(first.app.host.client_type, "web");
    assert_eq!(first.channel.unwrap().id, "someChannelId1");
    assert_eq!(second.app.locale, "someLocale2");
    assert_eq!(second.user.unwrap().id, "someUserObjectId2");
}

#[tokio::test]
async fn test_get_context_with_unusable_reply_is_a_host_error() {
    let (session, transport) = framed();
    initialize_with(&session, &transport, json!(["content"])).await;

    let mut pending = Box::pin(app::get_context(&session));
    assert!(poll!(pending.as_mut()).is_pending());
    let message = transport.find_request("getContext").unwrap();
    respond(&session, &message, json!([]));

    assert!(matches!(pending.await, Err(BridgeError::Host { .. })));
}

// =============================================================================
// pages
// =============================================================================

#[tokio::test]
async fn test_navigate_cross_domain() {
    let (session, transport) = framed();
    initialize_with(&session, &transport, json!(["content"])).await;

    let mut ok = Box::pin(pages::navigate_cross_domain(&session, "https://valid.origin.com"));
    assert!(poll!(ok.as_mut()).is_pending());
    let message = transport.find_request("navigateCrossDomain").unwrap();
    assert_eq!(message.args(), &[json!("https://valid.origin.com")]);
    respond(&session, &message, json!([true]));
    ok.await.unwrap();

    let mut refused = Box::pin(pages::navigate_cross_domain(&session, "https://invalid.origin.com"));
    assert!(poll!(refused.as_mut()).is_pending());
    let message = transport.find_request("navigateCrossDomain").unwrap();
    respond(&session, &message, json!([false, "Not an allowed domain"]));
    match refused.await {
        Err(BridgeError::Host { reason, .. }) => assert_eq!(reason, "Not an allowed domain"),
        other => panic!("expected host error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_navigation_is_restricted_by_frame_context() {
    let (session, transport) = framed();
    initialize_with(&session, &transport, json!(["authentication"])).await;

    let err = pages::navigate_cross_domain(&session, "https://valid.origin.com")
        .await
        .unwrap_err();
    assert!(matches!(err, BridgeError::WrongFrameContext { .. }));
    assert!(matches!(
        pages::return_focus(&session, true),
        Err(BridgeError::WrongFrameContext { .. })
    ));
    assert!(transport.find_request("navigateCrossDomain").is_none());
}

#[tokio::test]
async fn test_return_focus_is_an_event() {
    let (session, transport) = framed();
    initialize_with(&session, &transport, json!(["content"])).await;

    pages::return_focus(&session, true).unwrap();
    let message = transport.find_request("returnFocus").unwrap();
    assert_eq!(message.id(), None);
    assert_eq!(message.args(), &[json!(true)]);
}

#[tokio::test]
async fn test_pages_support_follows_runtime_config() {
    let (plain, t1) = framed();
    initialize_with(&plain, &t1, json!(["content"])).await;
    assert!(!pages::is_supported(&plain));

    let (rich, t2) = framed();
    initialize_with(
        &rich,
        &t2,
        json!(["content", "web", "{\"supports\":{\"pages\":{}}}"]),
    )
    .await;
    assert!(pages::is_supported(&rich));
}

// =============================================================================
// private APIs
// =============================================================================

#[tokio::test]
async fn test_send_custom_message_passes_args() {
    let (session, transport) = framed();
    initialize_with(&session, &transport, json!(["content"])).await;

    let pending = send_custom_message(
        &session,
        "customMessage",
        vec![json!("arg1"), json!(2), json!(3.0), json!(true)],
    );
    let message = transport.find_request("customMessage").unwrap();
    assert_eq!(
        message.args(),
        &[json!("arg1"), json!(2), json!(3.0), json!(true)]
    );
    respond(&session, &message, json!(["received"]));
    assert_eq!(pending.await.unwrap(), vec![json!("received")]);
}

#[tokio::test]
async fn test_custom_handler_from_parent_receives_args() {
    let (session, transport) = framed();
    initialize_with(&session, &transport, json!(["content"])).await;

    let seen = Arc::new(Mutex::new(None));
    let sink = seen.clone();
    register_custom_handler(&session, "customAction1", move |args| {
        *sink.lock() = Some(args);
        Vec::new()
    });

    session
        .on_message(
            Endpoint::Window(PARENT),
            HOST_ORIGIN,
            &json!({ "id": 10, "func": "customAction1", "args": ["arg1", 123, 4.5, true] }),
        )
        .unwrap();

    assert_eq!(
        seen.lock().clone().unwrap(),
        vec![json!("arg1"), json!(123), json!(4.5), json!(true)]
    );
    let reply = transport.messages().last().cloned().unwrap();
    assert_eq!(reply.envelope, json!({ "id": 10, "args": [], "isPartialResponse": false }));
}

#[tokio::test]
async fn test_user_settings_handler_filters_by_kind() {
    let (session, transport) = framed();
    initialize_with(&session, &transport, json!(["content"])).await;

    let changes = Arc::new(Mutex::new(Vec::new()));
    let sink = changes.clone();
    register_user_settings_change_handler(
        &session,
        &[UserSettingKind::FileOpenPreference],
        move |kind, value| sink.lock().push((kind, value)),
    )
    .unwrap();

    let registration = transport.find_request("registerHandler").unwrap();
    assert_eq!(
        registration.args(),
        &[json!("userSettingsChange"), json!(["fileOpenPreference"])]
    );

    for (kind, value) in [("fileOpenPreference", "value"), ("theme", "dark")] {
        session
            .on_message(
                Endpoint::Window(PARENT),
                HOST_ORIGIN,
                &json!({ "id": null, "func": "userSettingsChange", "args": [kind, value] }),
            )
            .unwrap();
    }

    assert_eq!(
        *changes.lock(),
        vec![(UserSettingKind::FileOpenPreference, json!("value"))]
    );
}

#[tokio::test]
async fn test_send_custom_event_without_children_reaches_nobody() {
    let (session, transport) = framed();
    initialize_with(&session, &transport, json!(["content"])).await;
    transport.clear();

    assert_eq!(send_custom_event(&session, "customEvent", vec![json!(1)]), 0);
    assert!(transport.is_empty());
}
