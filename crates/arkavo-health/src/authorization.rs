//! Authorization sheets raised by the app under test.

use crate::backend::{AppId, ElementKind, ScrollDirection};
use crate::catalog::{HealthRecordAccount, HealthRecordType};
use crate::config::HealthConfig;
use crate::diagnostics::DiagnosticContext;
use crate::locator::Locator;
use crate::onboarding::Onboarding;
use crate::query::{ElementQuery, LabelPredicate, Scope};
use crate::{HealthError, Result};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

const HEALTH_ACCESS_TITLE: &str = "Health Access";
const RECORDS_INTRO_NAV_BAR: &str = "HealthUI.ClinicalAuthorizationAccountsIntroView";
const SET_UP_CLINICAL_RECORDS: &str = "UIA.Health.SuggestedAction.SetUpClinicalRecords.PrimaryButton";

/// The "Health Access" sheet: turn every type on and allow.
pub struct HealthKitAuthorization {
    locator: Locator,
    app: AppId,
    config: Arc<HealthConfig>,
    required: bool,
    trigger: Option<ElementQuery>,
}

impl HealthKitAuthorization {
    /// `app` is the application presenting the sheet.
    pub fn new(locator: Locator, app: AppId, config: Arc<HealthConfig>) -> Self {
        Self {
            locator,
            app,
            config,
            required: true,
            trigger: None,
        }
    }

    /// Whether a sheet that never shows up is an error. Defaults to true.
    pub fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    /// Control in the app under test that requests authorization; tapped
    /// before waiting for the sheet.
    pub fn triggered_by(mut self, trigger: ElementQuery) -> Self {
        self.trigger = Some(trigger);
        self
    }

    /// Returns whether the sheet was shown and accepted.
    pub async fn handle(&self, diag: &mut DiagnosticContext) -> Result<bool> {
        diag.enter("health access");
        let timeouts = &self.config.timeouts;

        if let Some(trigger) = &self.trigger {
            self.locator.tap_required(trigger, timeouts.control, diag).await?;
        }

        let sheet = ElementQuery::new(
            &self.app,
            ElementKind::NavigationBar,
            LabelPredicate::named(HEALTH_ACCESS_TITLE),
        );
        let backend = self.locator.backend();
        let mut shown = backend
            .wait_for_existence(&sheet, timeouts.authorization_first)
            .await?;
        if !shown {
            info!(
                waited = ?timeouts.authorization_first,
                "health access sheet not loaded yet, waiting longer"
            );
            shown = backend
                .wait_for_existence(&sheet, timeouts.authorization_second)
                .await?;
        }

        if !shown {
            if self.required {
                return Err(HealthError::ElementNotFound {
                    description: sheet.describe(),
                    timeout: timeouts.authorization_first + timeouts.authorization_second,
                    context: diag.capture(backend.as_ref(), &self.app).await,
                });
            }
            warn!("health access sheet never appeared");
            return Ok(false);
        }

        let turn_on_all = ElementQuery::static_text(&self.app, LabelPredicate::named("Turn On All"))
            .within(Scope::table(None));
        self.locator
            .tap_required(&turn_on_all, timeouts.control, diag)
            .await?;
        let allow = ElementQuery::button(&self.app, LabelPredicate::named("Allow"))
            .within(Scope::navigation_bar(Some(HEALTH_ACCESS_TITLE)));
        self.locator.tap_required(&allow, timeouts.control, diag).await?;

        info!(app = %self.app, "granted health access");
        Ok(true)
    }
}

/// What to grant on the Health Records sharing sheet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthRecordsRequest {
    pub accounts: Vec<HealthRecordAccount>,
    pub record_types: Vec<HealthRecordType>,
    pub automatically_share: bool,
}

impl Default for HealthRecordsRequest {
    fn default() -> Self {
        Self {
            accounts: vec![HealthRecordAccount::SampleA],
            record_types: HealthRecordType::ALL.to_vec(),
            automatically_share: true,
        }
    }
}

/// The clinical records sheet, including linking mock institution accounts
/// through the Health app when they are not linked yet.
pub struct HealthRecordsAuthorization {
    locator: Locator,
    app: AppId,
    config: Arc<HealthConfig>,
}

impl HealthRecordsAuthorization {
    pub fn new(locator: Locator, app: AppId, config: Arc<HealthConfig>) -> Self {
        Self {
            locator,
            app,
            config,
        }
    }

    fn button(&self, label: &str) -> ElementQuery {
        ElementQuery::button(&self.app, LabelPredicate::named(label))
    }

    fn text(&self, label: &str) -> ElementQuery {
        ElementQuery::static_text(&self.app, LabelPredicate::named(label))
    }

    pub async fn handle(&self, request: &HealthRecordsRequest, diag: &mut DiagnosticContext) -> Result<()> {
        diag.enter("health records authorization");
        let timeouts = &self.config.timeouts;

        let intro = ElementQuery::new(
            &self.app,
            ElementKind::NavigationBar,
            LabelPredicate::named(RECORDS_INTRO_NAV_BAR),
        );
        self.locator
            .require(&intro, timeouts.authorization_first, diag)
            .await?;
        self.locator
            .tap_required(&self.button("Next"), timeouts.records_step, diag)
            .await?;

        for account in &request.accounts {
            let location = self.text(&account.location_name());
            if self.locator.locate(&location, timeouts.records_step).await?.is_some() {
                debug!(account = %account.location_name(), "account already linked");
                continue;
            }
            self.link_account(*account, diag).await?;
        }

        for _ in 0..2 {
            self.locator
                .tap_required(&self.button("Next"), timeouts.records_step, diag)
                .await?;
        }

        for record_type in &request.record_types {
            let switch = ElementQuery::new(
                &self.app,
                ElementKind::Switch,
                LabelPredicate::named(record_type.display_label()),
            );
            let visible = self
                .locator
                .locate(&switch, timeouts.records_step)
                .await?
                .is_some_and(|s| s.hittable);
            if !visible {
                debug!(record_type = record_type.display_label(), "switch not visible, scrolling");
                self.locator
                    .backend()
                    .scroll(
                        &self.app,
                        &Scope::app(),
                        ScrollDirection::Down,
                        self.config.scroll_velocity,
                    )
                    .await?;
            }
            self.locator
                .tap_required(&switch, timeouts.records_step, diag)
                .await?;
        }

        self.locator
            .tap_required(&self.button("Share"), timeouts.records_step, diag)
            .await?;
        if request.automatically_share {
            self.locator
                .tap_required(&self.text("Automatically Share"), timeouts.records_step, diag)
                .await?;
        }
        self.locator
            .tap_required(&self.button("Done"), timeouts.records_step, diag)
            .await?;

        info!(
            app = %self.app,
            record_types = request.record_types.len(),
            "granted health records access"
        );
        Ok(())
    }

    /// "Add Account" hands over to the Health app, which may need its own
    /// onboarding before it shows the institution list.
    async fn link_account(&self, account: HealthRecordAccount, diag: &mut DiagnosticContext) -> Result<()> {
        diag.enter(format!("link {}", account.institution_name()));
        let timeouts = &self.config.timeouts;
        let health = &self.config.health_app;

        self.locator
            .tap_required(&self.text("Add Account"), timeouts.records_step, diag)
            .await?;

        Onboarding::new(self.locator.clone(), health.clone(), self.config.clone())
            .run_if_needed(diag)
            .await?;

        let set_up = ElementQuery::button(health, LabelPredicate::named(SET_UP_CLINICAL_RECORDS));
        self.locator.tap_if_present(&set_up, timeouts.records_step).await?;

        let allow_once =
            ElementQuery::button(&self.config.springboard, LabelPredicate::named("Allow Once"));
        if self
            .locator
            .tap_if_present(&allow_once, timeouts.records_step)
            .await?
        {
            debug!("allowed one-time access");
        }

        let institution = account.institution_name();
        for label in [institution.as_str(), "Connect Account", "Done"] {
            let query = ElementQuery::static_text(health, LabelPredicate::named(label));
            self.locator
                .tap_required(&query, timeouts.records_step, diag)
                .await?;
        }

        info!(institution = %institution, "linked account");
        Ok(())
    }
}
