//! Page navigation.

use crate::capabilities::expect_success;
use crate::domain::types::frame_contexts;
use crate::error::BridgeError;
use crate::service::Session;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const NAVIGATE_CROSS_DOMAIN: &str = "navigateCrossDomain";
pub const NAVIGATE_TO_TAB: &str = "navigateToTab";
pub const NAVIGATE_BACK: &str = "navigateBack";
pub const RETURN_FOCUS: &str = "returnFocus";

const NAVIGABLE: &[&str] = &[
    frame_contexts::CONTENT,
    frame_contexts::SIDE_PANEL,
    frame_contexts::SETTINGS,
    frame_contexts::REMOVE,
    frame_contexts::TASK,
    frame_contexts::STAGE,
    frame_contexts::MEETING_STAGE,
];

/// Target of `navigate_to_tab`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TabInstanceParameters {
    pub tab_name: Option<String>,
    pub entity_id: Option<String>,
    pub channel_id: Option<String>,
    pub content_url: Option<String>,
    pub website_url: Option<String>,
}

/// Navigate the frame to `url` on another trusted domain.
pub async fn navigate_cross_domain(session: &Session, url: &str) -> Result<(), BridgeError> {
    session.ensure_frame_context(NAVIGATE_CROSS_DOMAIN, NAVIGABLE)?;
    let args = session
        .send_request(NAVIGATE_CROSS_DOMAIN, vec![Value::from(url)])
        .await?;
    expect_success(NAVIGATE_CROSS_DOMAIN, args)
}

pub async fn navigate_to_tab(
    session: &Session,
    params: &TabInstanceParameters,
) -> Result<(), BridgeError> {
    session.ensure_frame_context(NAVIGATE_TO_TAB, NAVIGABLE)?;
    let params = serde_json::to_value(params).map_err(crate::error::CodecError::from)?;
    let args = session.send_request(NAVIGATE_TO_TAB, vec![params]).await?;
    expect_success(NAVIGATE_TO_TAB, args)
}

pub async fn navigate_back(session: &Session) -> Result<(), BridgeError> {
    let args = session.send_request(NAVIGATE_BACK, Vec::new()).await?;
    expect_success(NAVIGATE_BACK, args)
}

/// Hand keyboard focus back to the host. Fire-and-forget.
pub fn return_focus(session: &Session, navigate_forward: bool) -> Result<(), BridgeError> {
    session.ensure_frame_context(RETURN_FOCUS, &[frame_contexts::CONTENT])?;
    session.send_event_to_parent(RETURN_FOCUS, vec![Value::from(navigate_forward)])
}

/// Whether the host advertised page support in its runtime config.
pub fn is_supported(session: &Session) -> bool {
    session
        .host_info()
        .and_then(|info| info.runtime_config)
        .map(|config| config.pointer("/supports/pages").is_some())
        .unwrap_or(false)
}
