//! Navigation Flow Engine: root tab, then category, then sample type.

use crate::backend::AppId;
use crate::catalog::{Category, SampleType};
use crate::config::HealthConfig;
use crate::diagnostics::DiagnosticContext;
use crate::error::AppStateMismatch;
use crate::locator::{Locator, ScrollPlan};
use crate::query::{ElementQuery, LabelPredicate, Scope};
use crate::version::UiProfile;
use crate::{HealthError, Result};
use std::sync::Arc;
use tracing::{debug, info, warn};

const ACCOUNT_SHEET_NAV_BAR: &str = "HealthExperienceUI.ProfileView";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavigationState {
    AtUnknownScreen,
    AtRootTab,
    AtCategoryPage(Category),
    AtSampleTypePage(SampleType),
}

/// "Go to category X, then (optionally) sample type Y."
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationTarget {
    pub category: Category,
    pub sample_type: Option<SampleType>,
    /// Skip the tab and category hops; the caller knows the category page
    /// is already showing.
    pub already_in_category: bool,
}

impl NavigationTarget {
    pub fn category(category: Category) -> Self {
        Self {
            category,
            sample_type: None,
            already_in_category: false,
        }
    }

    pub fn sample_type(sample_type: SampleType) -> Self {
        Self {
            category: sample_type.category(),
            sample_type: Some(sample_type),
            already_in_category: false,
        }
    }

    pub fn already_in_category(mut self) -> Self {
        self.already_in_category = true;
        self
    }

    pub fn describe(&self) -> String {
        match &self.sample_type {
            Some(sample_type) => format!("{} > {}", self.category, sample_type.display_label()),
            None => self.category.to_string(),
        }
    }
}

pub struct Navigator {
    locator: Locator,
    config: Arc<HealthConfig>,
    profile: UiProfile,
    state: NavigationState,
}

impl Navigator {
    pub fn new(locator: Locator, config: Arc<HealthConfig>, profile: UiProfile) -> Self {
        Self {
            locator,
            config,
            profile,
            state: NavigationState::AtUnknownScreen,
        }
    }

    pub fn state(&self) -> &NavigationState {
        &self.state
    }

    fn app(&self) -> &AppId {
        &self.config.health_app
    }

    fn nav_title(&self, title: &str, bar: Option<&str>) -> ElementQuery {
        ElementQuery::static_text(self.app(), LabelPredicate::named(title))
            .within(Scope::navigation_bar(bar))
    }

    pub async fn navigate(&mut self, target: &NavigationTarget, diag: &mut DiagnosticContext) -> Result<()> {
        info!(target = %target.describe(), already_in_category = target.already_in_category, "navigating");
        if !target.already_in_category {
            self.go_to_root_tab(diag).await?;
            self.go_to_category(target.category, diag).await?;
        }
        if let Some(sample_type) = &target.sample_type {
            self.go_to_sample_type(sample_type, diag).await?;
        }
        Ok(())
    }

    /// Fail unless the configured Health app is in the foreground.
    pub async fn assert_health_app(&self, diag: &DiagnosticContext) -> Result<()> {
        let backend = self.locator.backend();
        let foreground = backend.foreground_app().await?;
        if foreground.as_ref() == Some(self.app()) {
            return Ok(());
        }
        Err(HealthError::UnexpectedAppState {
            mismatch: AppStateMismatch::NotTargetApplication {
                expected: self.app().to_string(),
                actual: foreground.map(|a| a.to_string()).unwrap_or_else(|| "none".to_string()),
            },
            context: diag.capture(backend.as_ref(), self.app()).await,
        })
    }

    /// Close the profile/account sheet if it is up. Returns whether it was.
    pub async fn dismiss_account_sheet_if_needed(&self) -> Result<bool> {
        let done = ElementQuery::button(self.app(), LabelPredicate::named("Done"))
            .within(Scope::navigation_bar(Some(ACCOUNT_SHEET_NAV_BAR)));
        let backend = self.locator.backend();
        if !backend.exists(&done).await? {
            return Ok(false);
        }
        backend.tap(&done).await?;
        if !backend
            .wait_for_non_existence(&done, self.config.timeouts.sheet_dismiss)
            .await?
        {
            warn!("account sheet still showing after tapping Done");
        }
        info!("dismissed account sheet");
        Ok(true)
    }

    /// Select the root tab and pop it back to its root page.
    pub async fn go_to_root_tab(&mut self, diag: &mut DiagnosticContext) -> Result<()> {
        let tab_label = self.profile.root_tab_label();
        diag.enter(format!("{} tab", tab_label));
        self.assert_health_app(diag).await?;

        let backend = self.locator.backend().clone();
        let root_title = self.profile.root_title();

        let cancel = ElementQuery::button(self.app(), LabelPredicate::named("Cancel"))
            .within(Scope::navigation_bar(Some(root_title)));
        if backend.exists(&cancel).await? {
            debug!("cancelling open sheet");
            backend.tap(&cancel).await?;
        }

        if self.profile.root_page_short_circuits()
            && backend.exists(&self.nav_title(root_title, Some(root_title))).await?
        {
            debug!(tab = tab_label, "already on the root page");
            self.state = NavigationState::AtRootTab;
            return Ok(());
        }

        let tab = ElementQuery::button(self.app(), LabelPredicate::named(tab_label))
            .within(self.profile.tab_bar_scope());

        for attempt in 0..2 {
            let found = self.locator.locate(&tab, self.config.timeouts.tab_bar).await?;
            if found.is_some_and(|t| t.hittable) {
                backend.tap(&tab).await?; // select the tab
                let still_hittable = backend.snapshot(&tab).await?.is_some_and(|t| t.hittable);
                if !self.profile.root_page_short_circuits() || still_hittable {
                    backend.tap(&tab).await?; // pop to the tab's root page
                }
                info!(tab = tab_label, "on root tab");
                self.state = NavigationState::AtRootTab;
                return Ok(());
            }

            warn!(tab = tab_label, attempt, "root tab button not tappable");
            if attempt > 0 || !self.dismiss_account_sheet_if_needed().await? {
                break;
            }
        }

        Err(HealthError::NavigationFailure {
            target: tab_label.to_string(),
            reason: "tab bar button not found or not hittable".to_string(),
            context: diag.capture(backend.as_ref(), self.app()).await,
        })
    }

    pub async fn go_to_category(&mut self, category: Category, diag: &mut DiagnosticContext) -> Result<()> {
        let label = category.display_label();
        diag.enter(format!("category {}", label));
        self.open_page(label, diag).await?;
        self.state = NavigationState::AtCategoryPage(category);
        Ok(())
    }

    pub async fn go_to_sample_type(
        &mut self,
        sample_type: &SampleType,
        diag: &mut DiagnosticContext,
    ) -> Result<()> {
        let label = sample_type.display_label();
        diag.enter(format!("sample type {}", label));
        self.open_page(label, diag).await?;
        self.state = NavigationState::AtSampleTypePage(sample_type.clone());
        Ok(())
    }

    /// Pop from a sample type page back to its category page.
    pub async fn back_to_category(&mut self, category: Category, diag: &mut DiagnosticContext) -> Result<()> {
        let label = category.display_label();
        diag.enter(format!("back to {}", label));
        let back = ElementQuery::button(self.app(), LabelPredicate::named(label))
            .within(Scope::navigation_bar(None));
        self.locator
            .tap_required(&back, self.config.timeouts.control, diag)
            .await?;

        let backend = self.locator.backend();
        let title = self.nav_title(label, None);
        if !backend
            .wait_for_existence(&title, self.config.timeouts.arrival)
            .await?
        {
            return Err(HealthError::NavigationFailure {
                target: label.to_string(),
                reason: "category title did not reappear after going back".to_string(),
                context: diag.capture(backend.as_ref(), self.app()).await,
            });
        }
        self.state = NavigationState::AtCategoryPage(category);
        Ok(())
    }

    /// Locate the row labelled `label` (scrolling if needed), tap it and
    /// confirm the page title, tapping once more if the first tap was lost.
    async fn open_page(&self, label: &str, diag: &DiagnosticContext) -> Result<()> {
        let timeouts = &self.config.timeouts;
        let backend = self.locator.backend();
        let content = self.profile.content_scope();
        let row = ElementQuery::static_text(self.app(), LabelPredicate::contains(label))
            .within(content.clone());
        let plan = ScrollPlan::new(self.config.max_scroll_attempts, timeouts.scroll_retry)
            .in_container(content)
            .velocity(self.config.scroll_velocity);

        self.locator
            .locate_tappable(&row, timeouts.list_lookup, &plan, diag)
            .await
            .map_err(|e| into_navigation_failure(label, e))?;
        backend.tap(&row).await?;

        let title = self.nav_title(label, None);
        if !backend.wait_for_existence(&title, timeouts.arrival).await? {
            info!(page = label, "page title not showing yet, tapping again");
            if backend.snapshot(&row).await?.is_some_and(|r| r.hittable) {
                backend.tap(&row).await?;
            }
            if !backend.wait_for_existence(&title, timeouts.arrival).await? {
                return Err(HealthError::NavigationFailure {
                    target: label.to_string(),
                    reason: "page title did not appear after tapping".to_string(),
                    context: diag.capture(backend.as_ref(), self.app()).await,
                });
            }
        }
        info!(page = label, "arrived");
        Ok(())
    }
}

fn into_navigation_failure(target: &str, err: HealthError) -> HealthError {
    let reason = err.to_string();
    match err {
        HealthError::ElementNotFound { context, .. }
        | HealthError::ElementUnreachable { context, .. } => HealthError::NavigationFailure {
            target: target.to_string(),
            reason,
            context,
        },
        other => other,
    }
}
