//! First-run "Welcome to Health" walkthrough.
//!
//! The step after the demographic-info page sometimes never advances. Each
//! attempt goes back once and retries; if that still sticks, the app is
//! terminated and the whole walkthrough runs one more time.

use crate::backend::{AppId, ElementKind};
use crate::config::HealthConfig;
use crate::diagnostics::DiagnosticContext;
use crate::locator::Locator;
use crate::query::{ElementQuery, LabelPredicate, Scope};
use crate::{HealthError, Result};
use std::sync::Arc;
use tracing::{debug, info, warn};

pub const MAX_ONBOARDING_ATTEMPTS: u32 = 2;

const WELCOME_TITLE: &str = "Welcome to Health";
const USER_INFO_NAV_BAR: &str = "WDBuddyFlowUserInfoView";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Walk {
    Completed,
    Stuck,
    /// The welcome screen was not there to begin with.
    NotShowing,
}

pub struct Onboarding {
    locator: Locator,
    app: AppId,
    config: Arc<HealthConfig>,
}

impl Onboarding {
    pub fn new(locator: Locator, app: AppId, config: Arc<HealthConfig>) -> Self {
        Self {
            locator,
            app,
            config,
        }
    }

    fn welcome(&self) -> ElementQuery {
        ElementQuery::static_text(&self.app, LabelPredicate::named(WELCOME_TITLE))
    }

    fn continue_text(&self) -> ElementQuery {
        ElementQuery::static_text(&self.app, LabelPredicate::named("Continue"))
    }

    /// Short probe for the welcome screen.
    pub async fn is_showing(&self) -> Result<bool> {
        Ok(self
            .locator
            .locate(&self.welcome(), self.config.timeouts.onboarding_probe)
            .await?
            .is_some())
    }

    /// Run the walkthrough if the welcome screen shows up. Returns whether
    /// it ran.
    pub async fn run_if_needed(&self, diag: &mut DiagnosticContext) -> Result<bool> {
        if !self.is_showing().await? {
            debug!(app = %self.app, "no onboarding to handle");
            return Ok(false);
        }
        self.run(diag).await?;
        Ok(true)
    }

    pub async fn run(&self, diag: &mut DiagnosticContext) -> Result<()> {
        diag.enter("onboarding");
        let backend = self.locator.backend();

        for attempt in 0..MAX_ONBOARDING_ATTEMPTS {
            if attempt > 0 {
                warn!(app = %self.app, attempt, "onboarding stuck, relaunching the app");
                backend.terminate(&self.app).await?;
                backend.activate(&self.app).await?;
            }

            match self.walk(diag).await? {
                Walk::Completed => {
                    self.finish(diag).await?;
                    info!(app = %self.app, attempts = attempt + 1, "onboarding complete");
                    return Ok(());
                }
                Walk::NotShowing => {
                    debug!(app = %self.app, attempt, "welcome screen gone, nothing to do");
                    return Ok(());
                }
                Walk::Stuck => continue,
            }
        }

        Err(HealthError::OnboardingStuck {
            attempts: MAX_ONBOARDING_ATTEMPTS,
            context: diag.capture(backend.as_ref(), &self.app).await,
        })
    }

    async fn walk(&self, diag: &DiagnosticContext) -> Result<Walk> {
        let timeouts = &self.config.timeouts;
        if self
            .locator
            .locate(&self.welcome(), timeouts.onboarding_step)
            .await?
            .is_none()
        {
            return Ok(Walk::NotShowing);
        }

        let continue_text = self.continue_text();
        let next = ElementQuery::button(&self.app, LabelPredicate::named("Next"));
        let table_next = next.clone().within(Scope::table(None));

        self.locator
            .tap_required(&continue_text, timeouts.onboarding_step, diag)
            .await?;
        self.locator
            .tap_required(&continue_text, timeouts.onboarding_step, diag)
            .await?;
        self.locator
            .tap_required(&next, timeouts.onboarding_step, diag)
            .await?;

        if self.advanced(&continue_text).await? {
            return Ok(Walk::Completed);
        }

        info!(app = %self.app, "onboarding did not advance, going back one step");
        let back = ElementQuery::button(&self.app, LabelPredicate::named("Back"))
            .within(Scope::navigation_bar(Some(USER_INFO_NAV_BAR)));
        self.locator
            .tap_required(&back, timeouts.onboarding_step, diag)
            .await?;
        self.locator
            .tap_required(&continue_text, timeouts.onboarding_step, diag)
            .await?;
        // Next may still be loading
        self.locator
            .tap_if_present(&table_next, timeouts.onboarding_step)
            .await?;

        if self.advanced(&continue_text).await? {
            Ok(Walk::Completed)
        } else {
            Ok(Walk::Stuck)
        }
    }

    async fn advanced(&self, continue_text: &ElementQuery) -> Result<bool> {
        self.locator
            .backend()
            .wait_for_existence(continue_text, self.config.timeouts.onboarding_advance)
            .await
    }

    async fn finish(&self, diag: &DiagnosticContext) -> Result<()> {
        let timeouts = &self.config.timeouts;

        // Trends notifications; best effort
        let trends = ElementQuery::new(&self.app, ElementKind::Switch, LabelPredicate::Any);
        match self.locator.locate(&trends, timeouts.onboarding_step).await? {
            Some(switch) if switch.hittable => {
                self.locator.backend().tap(&trends).await?;
                debug!(app = %self.app, "turned off trends notifications");
            }
            _ => debug!(app = %self.app, "trends switch not available"),
        }

        self.locator
            .tap_required(&self.continue_text(), timeouts.onboarding_step, diag)
            .await?;

        // The notifications alert can show up as the walkthrough closes,
        // after monitors stop getting a chance to run.
        let allow = ElementQuery::button(&self.app, LabelPredicate::named("Allow")).within(Scope::alert());
        if self.locator.tap_if_present(&allow, timeouts.alert).await? {
            info!(app = %self.app, "allowed notifications from the onboarding alert");
        }
        Ok(())
    }
}
