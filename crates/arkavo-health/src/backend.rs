//! Seam between the flows and whatever actually drives the device.
//!
//! A real implementation talks to an XCTest runner or a simulator companion;
//! `sim::SimBackend`, behind the `sim` feature, is the deterministic stand-in
//! used by tests.

use crate::Result;
use crate::query::{ElementQuery, Scope};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::trace;
use uuid::Uuid;

/// Bundle identifier of an application the backend can attach to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AppId(pub String);

impl AppId {
    pub fn new(bundle_id: impl Into<String>) -> Self {
        Self(bundle_id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for AppId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ElementKind {
    Button,
    StaticText,
    TextField,
    Switch,
    Table,
    Cell,
    Picker,
    PickerWheel,
    NavigationBar,
    TabBar,
    Alert,
    Other,
}

impl std::fmt::Display for ElementKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ElementKind::Button => "button",
            ElementKind::StaticText => "static text",
            ElementKind::TextField => "text field",
            ElementKind::Switch => "switch",
            ElementKind::Table => "table",
            ElementKind::Cell => "cell",
            ElementKind::Picker => "picker",
            ElementKind::PickerWheel => "picker wheel",
            ElementKind::NavigationBar => "navigation bar",
            ElementKind::TabBar => "tab bar",
            ElementKind::Alert => "alert",
            ElementKind::Other => "element",
        };
        f.write_str(name)
    }
}

/// Point-in-time view of one resolved element. Only valid until the next
/// action; re-resolve through the query afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementSnapshot {
    pub kind: ElementKind,
    pub label: String,
    pub identifier: Option<String>,
    pub value: Option<String>,
    pub hittable: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScrollDirection {
    /// Content moves up, revealing what is below (a swipe up).
    Up,
    /// Content moves down, revealing what is above (a swipe down).
    Down,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ScrollVelocity {
    Slow,
    #[default]
    Default,
    Fast,
}

impl ScrollVelocity {
    /// Points per second, matching the gesture velocities XCTest exposes.
    pub fn points_per_second(&self) -> f64 {
        match self {
            ScrollVelocity::Slow => 1000.0,
            ScrollVelocity::Default => 1500.0,
            ScrollVelocity::Fast => 2500.0,
        }
    }
}

/// A system-level alert as presented to interruption monitors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemAlert {
    pub title: String,
    pub buttons: Vec<String>,
    pub texts: Vec<String>,
}

impl SystemAlert {
    pub fn new(title: impl Into<String>, buttons: &[&str]) -> Self {
        Self {
            title: title.into(),
            buttons: buttons.iter().map(|b| b.to_string()).collect(),
            texts: Vec::new(),
        }
    }

    pub fn has_button(&self, label: &str) -> bool {
        self.buttons.iter().any(|b| b == label)
    }
}

/// What a monitor wants done with an alert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MonitorDecision {
    /// Tap the named button; the alert is considered handled.
    Tap(String),
    /// Not this monitor's alert; offer it to the next one.
    Decline,
    /// This monitor's alert, but it cannot be handled. Backends surface this
    /// as [`crate::HealthError::AlertNotHandled`].
    Fail(String),
}

/// Out-of-band handler consulted whenever an alert is up during a wait.
pub trait InterruptionMonitor: Send + Sync {
    fn description(&self) -> &str;

    fn handle(&self, alert: &SystemAlert) -> MonitorDecision;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MonitorToken(pub Uuid);

impl MonitorToken {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for MonitorToken {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
pub trait AutomationBackend: Send + Sync {
    /// Launch a fresh instance, terminating any running one.
    async fn launch(&self, app: &AppId) -> Result<()>;

    /// Bring the app to the foreground, launching it if it is not running.
    async fn activate(&self, app: &AppId) -> Result<()>;

    async fn terminate(&self, app: &AppId) -> Result<()>;

    async fn foreground_app(&self) -> Result<Option<AppId>>;

    /// All elements currently matching the query's scope, kind and predicate,
    /// in tree order. `query.index` is ignored here.
    async fn resolve(&self, query: &ElementQuery) -> Result<Vec<ElementSnapshot>>;

    /// Tap the `query.index`-th match.
    async fn tap(&self, query: &ElementQuery) -> Result<()>;

    async fn type_text(&self, query: &ElementQuery, text: &str) -> Result<()>;

    async fn scroll(
        &self,
        app: &AppId,
        scope: &Scope,
        direction: ScrollDirection,
        velocity: ScrollVelocity,
    ) -> Result<()>;

    async fn adjust_wheel(&self, query: &ElementQuery, value: &str) -> Result<()>;

    fn register_interruption_monitor(&self, monitor: Arc<dyn InterruptionMonitor>) -> MonitorToken;

    fn remove_interruption_monitor(&self, token: MonitorToken) -> bool;

    /// Give registered monitors a chance to handle an alert that is up.
    /// Called on every poll of a blocking wait.
    async fn pump_interruptions(&self) -> Result<()> {
        Ok(())
    }

    fn poll_interval(&self) -> Duration {
        Duration::from_millis(100)
    }

    /// The `query.index`-th match, if there is one right now.
    async fn snapshot(&self, query: &ElementQuery) -> Result<Option<ElementSnapshot>> {
        Ok(self.resolve(query).await?.into_iter().nth(query.index))
    }

    async fn exists(&self, query: &ElementQuery) -> Result<bool> {
        Ok(self.snapshot(query).await?.is_some())
    }

    /// Poll until the element exists or `timeout` passes. Interruption
    /// monitors run on every poll.
    async fn wait_for_existence(&self, query: &ElementQuery, timeout: Duration) -> Result<bool> {
        let deadline = Instant::now() + timeout;
        loop {
            self.pump_interruptions().await?;
            if self.exists(query).await? {
                return Ok(true);
            }
            if Instant::now() >= deadline {
                trace!(query = %query.describe(), ?timeout, "wait_for_existence timed out");
                return Ok(false);
            }
            tokio::time::sleep(self.poll_interval()).await;
        }
    }

    async fn wait_for_non_existence(&self, query: &ElementQuery, timeout: Duration) -> Result<bool> {
        let deadline = Instant::now() + timeout;
        loop {
            self.pump_interruptions().await?;
            if !self.exists(query).await? {
                return Ok(true);
            }
            if Instant::now() >= deadline {
                return Ok(false);
            }
            tokio::time::sleep(self.poll_interval()).await;
        }
    }
}
