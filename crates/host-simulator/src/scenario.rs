//! The scripted exchange run by the binary.

use crate::host::{Host, HostSettings, STREAMED_FUNC};
use crate::router::Router;
use anyhow::{Context as _, Result};
use frame_rpc::adapters::channel::ClosedWindows;
use frame_rpc::capabilities::app;
use frame_rpc::{
    BridgeConfig, ChannelTransport, Endpoint, ParentLink, Session, StatsSnapshot, WindowId,
    THEME_CHANGE,
};
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::time::timeout;
use tracing::info;

pub const PARENT_WINDOW: WindowId = WindowId(1);
pub const CHILD_WINDOW: WindowId = WindowId(2);

#[derive(Debug, Clone)]
pub struct ScenarioSettings {
    pub host: HostSettings,
    pub bridge: BridgeConfig,
    pub parent_origin: String,
    pub child_origin: String,
    /// Theme the host pushes once both frames are up.
    pub theme: String,
    /// Upper bound on each awaited step.
    pub step_timeout: Duration,
}

impl Default for ScenarioSettings {
    fn default() -> Self {
        Self {
            host: HostSettings::default(),
            bridge: BridgeConfig::default(),
            parent_origin: "https://app.example.com".to_string(),
            child_origin: "https://child.example.com".to_string(),
            theme: "dark".to_string(),
            step_timeout: Duration::from_secs(5),
        }
    }
}

/// What each frame observed.
#[derive(Debug, Clone, Serialize)]
pub struct ScenarioReport {
    pub parent_context: String,
    pub child_context: String,
    pub child_locale: String,
    pub streamed_partials: Vec<Vec<Value>>,
    pub streamed_final: Vec<Value>,
    pub parent_theme: String,
    pub child_theme: String,
    pub parent_stats: StatsSnapshot,
    pub child_stats: StatsSnapshot,
}

fn theme_observer(session: &Session) -> watch::Receiver<Option<String>> {
    let (tx, rx) = watch::channel(None);
    session.on_theme_change(move |theme| {
        tx.send_replace(Some(theme.to_string()));
    });
    rx
}

async fn observed_theme(
    mut rx: watch::Receiver<Option<String>>,
    step_timeout: Duration,
) -> Result<String> {
    let theme = timeout(step_timeout, rx.wait_for(Option::is_some))
        .await
        .context("timed out waiting for theme change")?
        .context("theme observer dropped")?;
    Ok(theme.clone().unwrap_or_default())
}

/// Run the full exchange: handshake of both frames, a relayed `getContext`, a
/// relayed streamed call and a host theme push.
pub async fn run_scenario(settings: ScenarioSettings) -> Result<ScenarioReport> {
    let (tx, rx) = mpsc::unbounded_channel();
    let closed = ClosedWindows::default();
    let step = settings.step_timeout;

    let parent = Arc::new(Session::new(
        settings.bridge.clone(),
        ParentLink::Frameless,
        Arc::new(ChannelTransport::new(
            Endpoint::Window(PARENT_WINDOW),
            settings.parent_origin.clone(),
            tx.clone(),
            closed.clone(),
        )),
    )?);
    let child = Arc::new(Session::new(
        settings.bridge.clone(),
        ParentLink::Framed(PARENT_WINDOW),
        Arc::new(ChannelTransport::new(
            Endpoint::Window(CHILD_WINDOW),
            settings.child_origin.clone(),
            tx.clone(),
            closed.clone(),
        )),
    )?);
    let parent_theme = theme_observer(&parent);
    let child_theme = theme_observer(&child);

    let host = Host::new(settings.host.clone());
    let theme_push = host
        .event(
            Endpoint::Window(PARENT_WINDOW),
            THEME_CHANGE,
            vec![json!(settings.theme)],
        )
        .context("failed to encode theme push")?;

    let mut router = Router::new(host, tx.clone(), closed);
    router.attach(PARENT_WINDOW, settings.parent_origin.clone(), parent.clone());
    router.attach(CHILD_WINDOW, settings.child_origin.clone(), child.clone());
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let router_task = tokio::spawn(router.run(rx, shutdown_rx));

    // The parent must trust the child's origin before the child's first
    // message arrives. The child's initialize is relayed to the host once the
    // parent's own handshake completes.
    let parent_init = parent.initialize(Some(vec![settings.child_origin.clone()]));
    let child_init = child.initialize(Some(vec![settings.parent_origin.clone()]));

    let parent_context = timeout(step, parent_init.context_kind())
        .await
        .context("timed out waiting for parent handshake")??;
    let child_context = timeout(step, child_init.context_kind())
        .await
        .context("timed out waiting for child handshake")??;
    info!(%parent_context, %child_context, "Both frames initialized");

    let context = timeout(step, app::get_context(&child))
        .await
        .context("timed out waiting for getContext")??;
    info!(locale = %context.app.locale, page = %context.page.id, "Child received context");

    let (streamed_partials, streamed_final) =
        timeout(step, child.send_request_with_partials(STREAMED_FUNC, vec![]).collect_all())
            .await
            .context("timed out waiting for streamed reply")??;
    info!(
        partials = streamed_partials.len(),
        "Child received streamed reply"
    );

    tx.send(theme_push)
        .map_err(|_| anyhow::anyhow!("router stopped before theme push"))?;
    let parent_theme = observed_theme(parent_theme, step).await?;
    let child_theme = observed_theme(child_theme, step).await?;
    info!(%parent_theme, %child_theme, "Theme change observed");

    let report = ScenarioReport {
        parent_context,
        child_context,
        child_locale: context.app.locale,
        streamed_partials,
        streamed_final,
        parent_theme,
        child_theme,
        parent_stats: parent.stats(),
        child_stats: child.stats(),
    };

    child.shutdown();
    parent.shutdown();
    let _ = shutdown_tx.send(true);
    router_task.await.context("router task panicked")?;

    Ok(report)
}
