//! Custom messages, custom events and user-setting notifications.

use crate::error::BridgeError;
use crate::service::{PendingReply, Session};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::str::FromStr;
use tracing::debug;

pub const USER_SETTINGS_CHANGE: &str = "userSettingsChange";
pub const REGISTER_HANDLER: &str = "registerHandler";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum UserSettingKind {
    FileOpenPreference,
    Theme,
}

impl UserSettingKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserSettingKind::FileOpenPreference => "fileOpenPreference",
            UserSettingKind::Theme => "theme",
        }
    }
}

impl FromStr for UserSettingKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "fileOpenPreference" => Ok(UserSettingKind::FileOpenPreference),
            "theme" => Ok(UserSettingKind::Theme),
            other => Err(format!("unknown user setting: {other}")),
        }
    }
}

/// Send a named message to the parent and await its reply.
pub fn send_custom_message(session: &Session, name: &str, args: Vec<Value>) -> PendingReply {
    session.send_custom_message(name, args)
}

/// Broadcast a named event to every child. Returns the number of children.
pub fn send_custom_event(session: &Session, name: &str, args: Vec<Value>) -> usize {
    session.send_custom_event(name, args)
}

/// Handle `name` with untyped args. The returned args answer the request.
pub fn register_custom_handler<F>(session: &Session, name: &str, handler: F)
where
    F: Fn(Vec<Value>) -> Vec<Value> + Send + Sync + 'static,
{
    session.register_raw_handler(name, move |args| Ok(Some(handler(args))));
}

/// Observe changes to the given settings. Notifications for other kinds are
/// ignored.
pub fn register_user_settings_change_handler<F>(
    session: &Session,
    kinds: &[UserSettingKind],
    handler: F,
) -> Result<(), BridgeError>
where
    F: Fn(UserSettingKind, Value) + Send + Sync + 'static,
{
    let wanted: HashSet<UserSettingKind> = kinds.iter().copied().collect();
    session.register_raw_handler(USER_SETTINGS_CHANGE, move |args| {
        let mut args = args.into_iter();
        let kind = args
            .next()
            .and_then(|kind| kind.as_str().and_then(|s| s.parse::<UserSettingKind>().ok()));
        match kind {
            Some(kind) if wanted.contains(&kind) => handler(kind, args.next().unwrap_or(Value::Null)),
            Some(kind) => debug!(kind = kind.as_str(), "Ignored unsubscribed user setting"),
            None => debug!("Ignored malformed user setting notification"),
        }
        Ok(None)
    });

    let kinds: Vec<Value> = kinds.iter().map(|kind| Value::from(kind.as_str())).collect();
    session.send_event_to_parent(
        REGISTER_HANDLER,
        vec![Value::from(USER_SETTINGS_CHANGE), Value::Array(kinds)],
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_setting_kind_round_trips_through_str() {
        for kind in [UserSettingKind::FileOpenPreference, UserSettingKind::Theme] {
            assert_eq!(kind.as_str().parse::<UserSettingKind>().unwrap(), kind);
        }
        assert!("volume".parse::<UserSettingKind>().is_err());
    }
}
