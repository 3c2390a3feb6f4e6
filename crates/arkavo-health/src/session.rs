use crate::authorization::{HealthKitAuthorization, HealthRecordsAuthorization, HealthRecordsRequest};
use crate::backend::{AppId, AutomationBackend, MonitorToken};
use crate::catalog::{Category, HealthAppDataType, SampleType};
use crate::config::HealthConfig;
use crate::data_entry::{DataEntry, SampleInput};
use crate::diagnostics::DiagnosticContext;
use crate::interruption::NotificationsAlertMonitor;
use crate::locator::Locator;
use crate::navigation::{NavigationState, NavigationTarget, Navigator};
use crate::onboarding::Onboarding;
use crate::query::ElementQuery;
use crate::version::UiProfile;
use crate::Result;
use once_cell::sync::OnceCell;
use std::sync::Arc;
use tracing::{debug, info};

type SamplesByType = Vec<(SampleType, Vec<SampleInput>)>;

/// One automation session against the Health app.
///
/// Single caller only: flows assume nothing else drives the device while
/// they run.
pub struct HealthSession {
    backend: Arc<dyn AutomationBackend>,
    config: Arc<HealthConfig>,
    profile: UiProfile,
    locator: Locator,
    notifications_monitor: OnceCell<MonitorToken>,
}

impl HealthSession {
    pub fn new(backend: Arc<dyn AutomationBackend>, config: HealthConfig) -> Result<Self> {
        config.validate()?;
        let profile = UiProfile::for_version(&config.os_version);
        debug!(os_version = %config.os_version, tab = profile.root_tab_label(), "resolved UI profile");
        Ok(Self {
            locator: Locator::new(backend.clone()),
            backend,
            config: Arc::new(config),
            profile,
            notifications_monitor: OnceCell::new(),
        })
    }

    pub fn from_env(backend: Arc<dyn AutomationBackend>) -> Result<Self> {
        Self::new(backend, HealthConfig::from_env()?)
    }

    pub fn config(&self) -> &HealthConfig {
        &self.config
    }

    pub fn profile(&self) -> &UiProfile {
        &self.profile
    }

    pub fn backend(&self) -> &Arc<dyn AutomationBackend> {
        &self.backend
    }

    pub fn locator(&self) -> &Locator {
        &self.locator
    }

    pub fn health_app(&self) -> &AppId {
        &self.config.health_app
    }

    pub fn navigator(&self) -> Navigator {
        Navigator::new(self.locator.clone(), self.config.clone(), self.profile.clone())
    }

    pub fn data_entry(&self) -> DataEntry {
        DataEntry::new(
            self.locator.clone(),
            self.health_app().clone(),
            self.config.clone(),
        )
    }

    pub fn onboarding(&self) -> Onboarding {
        Onboarding::new(
            self.locator.clone(),
            self.health_app().clone(),
            self.config.clone(),
        )
    }

    /// Register the notifications alert monitor. Only the first call
    /// registers; later calls return the same token.
    pub fn install_notifications_monitor(&self) -> MonitorToken {
        *self.notifications_monitor.get_or_init(|| {
            let monitor = NotificationsAlertMonitor::new(self.config.strict_alerts);
            self.backend.register_interruption_monitor(Arc::new(monitor))
        })
    }

    pub fn remove_notifications_monitor(&mut self) -> bool {
        match self.notifications_monitor.take() {
            Some(token) => self.backend.remove_interruption_monitor(token),
            None => false,
        }
    }

    /// Walk through the welcome screens if the Health app shows them.
    pub async fn handle_onboarding_if_needed(&self, diag: &mut DiagnosticContext) -> Result<bool> {
        self.install_notifications_monitor();
        self.onboarding().run_if_needed(diag).await
    }

    /// Launch a fresh Health app instance and add one sample.
    pub async fn launch_and_add_sample(&self, input: SampleInput, diag: &mut DiagnosticContext) -> Result<()> {
        self.launch_and_add_samples(vec![input], diag).await
    }

    /// Launch a fresh Health app instance and add every sample, visiting
    /// each category and each sample type page once.
    pub async fn launch_and_add_samples(
        &self,
        inputs: impl IntoIterator<Item = SampleInput>,
        diag: &mut DiagnosticContext,
    ) -> Result<()> {
        diag.enter("launch health app");
        // A fresh launch leaves no sheets or modals behind
        self.backend.launch(self.health_app()).await?;
        self.handle_onboarding_if_needed(diag).await?;
        self.add_samples(inputs.into_iter().collect(), diag).await
    }

    /// Leave the app under test, bring up the Health app and add the legacy
    /// data type's canned sample.
    pub async fn exit_app_and_open_health(
        &self,
        data_type: HealthAppDataType,
        diag: &mut DiagnosticContext,
    ) -> Result<()> {
        diag.enter(format!("open health for {:?}", data_type));
        self.backend.activate(self.health_app()).await?;
        self.handle_onboarding_if_needed(diag).await?;
        self.add_samples(vec![data_type.default_sample()], diag).await
    }

    async fn add_samples(&self, inputs: Vec<SampleInput>, diag: &mut DiagnosticContext) -> Result<()> {
        let total = inputs.len();
        let mut navigator = self.navigator();
        let data_entry = self.data_entry();
        navigator.go_to_root_tab(diag).await?;

        for (category, by_type) in group_by_page(inputs) {
            if navigator.state() != &NavigationState::AtRootTab {
                navigator.go_to_root_tab(diag).await?;
            }
            navigator.go_to_category(category, diag).await?;

            let type_count = by_type.len();
            for (index, (sample_type, samples)) in by_type.into_iter().enumerate() {
                let target = NavigationTarget::sample_type(sample_type).already_in_category();
                navigator.navigate(&target, diag).await?;
                for sample in samples {
                    data_entry.create(sample, diag).await?;
                }
                if index + 1 < type_count {
                    navigator.back_to_category(category, diag).await?;
                }
            }
        }

        info!(samples = total, "added samples to the Health app");
        Ok(())
    }

    /// Accept the "Health Access" sheet presented by `app`.
    pub async fn handle_health_kit_authorization(
        &self,
        app: &AppId,
        trigger: Option<ElementQuery>,
        required: bool,
        diag: &mut DiagnosticContext,
    ) -> Result<bool> {
        let mut flow = HealthKitAuthorization::new(self.locator.clone(), app.clone(), self.config.clone())
            .required(required);
        if let Some(trigger) = trigger {
            flow = flow.triggered_by(trigger);
        }
        flow.handle(diag).await
    }

    /// Grant clinical record access from `app`, linking accounts as needed.
    pub async fn handle_health_records_authorization(
        &self,
        app: &AppId,
        request: &HealthRecordsRequest,
        diag: &mut DiagnosticContext,
    ) -> Result<()> {
        // Linking an account may start Health app onboarding
        self.install_notifications_monitor();
        HealthRecordsAuthorization::new(self.locator.clone(), app.clone(), self.config.clone())
            .handle(request, diag)
            .await
    }
}

/// Group by category, then by sample type, keeping first-seen order at both
/// levels.
fn group_by_page(inputs: Vec<SampleInput>) -> Vec<(Category, SamplesByType)> {
    let mut groups: Vec<(Category, SamplesByType)> = Vec::new();
    for input in inputs {
        let category = input.sample_type.category();
        let by_type = match groups.iter().position(|(c, _)| *c == category) {
            Some(i) => &mut groups[i].1,
            None => {
                groups.push((category, Vec::new()));
                let last = groups.len() - 1;
                &mut groups[last].1
            }
        };
        match by_type.iter().position(|(t, _)| *t == input.sample_type) {
            Some(i) => by_type[i].1.push(input),
            None => by_type.push((input.sample_type.clone(), vec![input])),
        }
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_entry::ValueEntry;
    use crate::sim::SimBackend;

    fn sample(sample_type: SampleType, value: f64) -> SampleInput {
        SampleInput::new(sample_type, ValueEntry::numeric(value))
    }

    #[test]
    fn test_grouping_keeps_first_seen_order() {
        let groups = group_by_page(vec![
            sample(SampleType::STEPS, 1.0),
            sample(SampleType::RESTING_HEART_RATE, 2.0),
            sample(SampleType::PUSHES, 3.0),
            sample(SampleType::STEPS, 4.0),
        ]);

        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].0, Category::Activity);
        assert_eq!(groups[1].0, Category::Heart);

        let activity: Vec<(&str, usize)> = groups[0]
            .1
            .iter()
            .map(|(t, samples)| (t.display_label(), samples.len()))
            .collect();
        assert_eq!(activity, vec![("Steps", 2), ("Pushes", 1)]);
    }

    #[test]
    fn test_notifications_monitor_installed_once() {
        let sim = Arc::new(SimBackend::new());
        let mut session = HealthSession::new(sim.clone(), HealthConfig::default()).unwrap();

        let first = session.install_notifications_monitor();
        let second = session.install_notifications_monitor();
        assert_eq!(first, second);
        assert_eq!(sim.monitor_count(), 1);

        assert!(session.remove_notifications_monitor());
        assert!(!session.remove_notifications_monitor());
        assert_eq!(sim.monitor_count(), 0);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = HealthConfig {
            day_label_template: "no placeholder".to_string(),
            ..HealthConfig::default()
        };
        assert!(HealthSession::new(Arc::new(SimBackend::new()), config).is_err());
    }
}
