//! Element Locator: label lookup with bounded wait and scroll retries.
//!
//! Every lookup distinguishes three states. An absent element gets more time,
//! a present but unhittable one gets a scroll, and one that never shows up is
//! a failure.

use crate::backend::{AutomationBackend, ElementSnapshot, ScrollDirection, ScrollVelocity};
use crate::diagnostics::DiagnosticContext;
use crate::query::{ElementQuery, Scope};
use crate::{HealthError, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presence {
    Absent,
    /// In the hierarchy but off screen or covered.
    Present,
    Hittable,
}

impl Presence {
    pub fn from_snapshot(snapshot: Option<&ElementSnapshot>) -> Self {
        match snapshot {
            None => Presence::Absent,
            Some(element) if element.hittable => Presence::Hittable,
            Some(_) => Presence::Present,
        }
    }
}

/// How `locate_tappable` scrolls when the element is not hittable.
#[derive(Debug, Clone, PartialEq)]
pub struct ScrollPlan {
    /// Container receiving the scroll gesture.
    pub container: Scope,
    pub direction: ScrollDirection,
    pub velocity: ScrollVelocity,
    pub max_attempts: u32,
    /// Wait for existence after each scroll.
    pub retry_timeout: Duration,
}

impl ScrollPlan {
    pub fn new(max_attempts: u32, retry_timeout: Duration) -> Self {
        Self {
            container: Scope::app(),
            direction: ScrollDirection::Up,
            velocity: ScrollVelocity::Default,
            max_attempts,
            retry_timeout,
        }
    }

    pub fn in_container(mut self, container: Scope) -> Self {
        self.container = container;
        self
    }

    pub fn direction(mut self, direction: ScrollDirection) -> Self {
        self.direction = direction;
        self
    }

    pub fn velocity(mut self, velocity: ScrollVelocity) -> Self {
        self.velocity = velocity;
        self
    }
}

#[derive(Clone)]
pub struct Locator {
    backend: Arc<dyn AutomationBackend>,
}

impl Locator {
    pub fn new(backend: Arc<dyn AutomationBackend>) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &Arc<dyn AutomationBackend> {
        &self.backend
    }

    pub async fn presence(&self, query: &ElementQuery) -> Result<Presence> {
        let snapshot = self.backend.snapshot(query).await?;
        Ok(Presence::from_snapshot(snapshot.as_ref()))
    }

    /// Wait up to `timeout` for the element. Absence is `Ok(None)`; callers
    /// decide whether that is fatal.
    pub async fn locate(
        &self,
        query: &ElementQuery,
        timeout: Duration,
    ) -> Result<Option<ElementSnapshot>> {
        if !self.backend.wait_for_existence(query, timeout).await? {
            debug!(query = %query.describe(), ?timeout, "element not found");
            return Ok(None);
        }
        self.backend.snapshot(query).await
    }

    /// Like [`Locator::locate`], but absence is an `ElementNotFound` error.
    pub async fn require(
        &self,
        query: &ElementQuery,
        timeout: Duration,
        diag: &DiagnosticContext,
    ) -> Result<ElementSnapshot> {
        match self.locate(query, timeout).await? {
            Some(element) => Ok(element),
            None => Err(HealthError::ElementNotFound {
                description: query.describe(),
                timeout,
                context: diag.capture(self.backend.as_ref(), &query.app).await,
            }),
        }
    }

    /// Wait for the element and tap it.
    pub async fn tap_required(
        &self,
        query: &ElementQuery,
        timeout: Duration,
        diag: &DiagnosticContext,
    ) -> Result<()> {
        self.require(query, timeout, diag).await?;
        self.backend.tap(query).await
    }

    /// Tap the element if it shows up within `timeout`. Returns whether it
    /// was tapped. For best-effort steps only.
    pub async fn tap_if_present(&self, query: &ElementQuery, timeout: Duration) -> Result<bool> {
        if self.backend.wait_for_existence(query, timeout).await? {
            self.backend.tap(query).await?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    /// Resolve an element that is both present and hittable, scrolling the
    /// plan's container at most `plan.max_attempts` times.
    pub async fn locate_tappable(
        &self,
        query: &ElementQuery,
        timeout: Duration,
        plan: &ScrollPlan,
        diag: &DiagnosticContext,
    ) -> Result<ElementSnapshot> {
        let mut scrolls = 0u32;
        let mut seen = false;
        let mut wait = timeout;

        loop {
            if self.backend.wait_for_existence(query, wait).await? {
                seen = true;
                let snapshot = self.backend.snapshot(query).await?;
                if let Some(element) = snapshot.filter(|e| e.hittable) {
                    debug!(query = %query.describe(), scrolls, "element is tappable");
                    return Ok(element);
                }
            }

            if scrolls >= plan.max_attempts {
                break;
            }

            scrolls += 1;
            info!(
                query = %query.describe(),
                attempt = scrolls,
                max = plan.max_attempts,
                direction = ?plan.direction,
                "element not hittable, scrolling"
            );
            self.backend
                .scroll(&query.app, &plan.container, plan.direction, plan.velocity)
                .await?;
            wait = plan.retry_timeout;
        }

        let context = diag.capture(self.backend.as_ref(), &query.app).await;
        if seen {
            Err(HealthError::ElementUnreachable {
                description: query.describe(),
                scroll_attempts: scrolls,
                context,
            })
        } else {
            Err(HealthError::ElementNotFound {
                description: query.describe(),
                timeout,
                context,
            })
        }
    }
}
