//! `getContext`: the host's flat context record, reshaped for callers.

use crate::domain::types::frame_contexts;
use crate::error::BridgeError;
use crate::service::Session;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const GET_CONTEXT: &str = "getContext";

/// Context as the host sends it.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ContextBridge {
    pub locale: String,
    pub channel_id: Option<String>,
    pub entity_id: Option<String>,
    pub user_object_id: Option<String>,
    pub group_id: Option<String>,
    pub team_type: Option<Value>,
    pub team_site_url: Option<String>,
    pub team_template_id: Option<String>,
    pub session_id: Option<String>,
    pub app_session_id: Option<String>,
    pub source_origin: Option<String>,
    pub user_click_time: Option<u64>,
    pub user_file_open_preference: Option<String>,
    pub theme: Option<String>,
    pub frame_context: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Context {
    pub app: AppInfo,
    pub page: PageInfo,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<UserInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel: Option<ChannelInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub team: Option<TeamInfo>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppInfo {
    pub locale: String,
    pub session_id: String,
    pub theme: String,
    pub host: HostDescriptor,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_click_time: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_file_open_preference: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HostDescriptor {
    pub name: String,
    pub client_type: String,
    pub session_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub id: String,
    pub frame_context: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_origin: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserInfo {
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelInfo {
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamInfo {
    pub group_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub team_type: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub site_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template_id: Option<String>,
}

impl ContextBridge {
    /// Reshape into `Context`, filling host details the bridge record lacks
    /// from the handshake.
    pub fn into_context(self, frame_context: &str, client_type: &str) -> Context {
        Context {
            app: AppInfo {
                locale: self.locale,
                session_id: self.app_session_id.unwrap_or_default(),
                theme: self.theme.unwrap_or_else(|| "default".into()),
                host: HostDescriptor {
                    name: "Teams".into(),
                    client_type: client_type.to_string(),
                    session_id: self.session_id.unwrap_or_default(),
                },
                user_click_time: self.user_click_time,
                user_file_open_preference: self.user_file_open_preference,
            },
            page: PageInfo {
                id: self.entity_id.unwrap_or_default(),
                frame_context: self
                    .frame_context
                    .unwrap_or_else(|| frame_context.to_string()),
                source_origin: self.source_origin,
            },
            user: self.user_object_id.map(|id| UserInfo { id }),
            channel: self.channel_id.map(|id| ChannelInfo { id }),
            team: self.group_id.map(|group_id| TeamInfo {
                group_id,
                team_type: self.team_type,
                site_url: self.team_site_url,
                template_id: self.team_template_id,
            }),
        }
    }
}

/// Ask the host for the current context.
pub async fn get_context(session: &Session) -> Result<Context, BridgeError> {
    session.ensure_frame_context(
        GET_CONTEXT,
        &[
            frame_contexts::CONTENT,
            frame_contexts::SIDE_PANEL,
            frame_contexts::SETTINGS,
            frame_contexts::REMOVE,
            frame_contexts::TASK,
            frame_contexts::STAGE,
            frame_contexts::MEETING_STAGE,
            frame_contexts::AUTHENTICATION,
        ],
    )?;

    let args = session.send_request(GET_CONTEXT, Vec::new()).await?;
    let raw = args.into_iter().next().ok_or_else(|| BridgeError::Host {
        func: GET_CONTEXT.into(),
        reason: "empty reply".into(),
    })?;
    let bridge: ContextBridge = serde_json::from_value(raw).map_err(|e| BridgeError::Host {
        func: GET_CONTEXT.into(),
        reason: e.to_string(),
    })?;

    let info = session.host_info();
    let frame_context = info
        .as_ref()
        .map(|info| info.frame_context.as_str())
        .unwrap_or(frame_contexts::CONTENT);
    let client_type = info
        .as_ref()
        .and_then(|info| info.client_type.as_deref())
        .unwrap_or("web");
    Ok(bridge.into_context(frame_context, client_type))
}
