use crate::backend::{InterruptionMonitor, MonitorDecision, SystemAlert};
use tracing::{info, warn};

/// Handles the Health app's "Would Like to Send You Notifications" alert,
/// which may appear at any point during onboarding.
#[derive(Debug, Clone)]
pub struct NotificationsAlertMonitor {
    /// Fail when the alert is ours but has no "Allow" button, instead of
    /// leaving it up.
    pub strict: bool,
}

impl NotificationsAlertMonitor {
    pub const DESCRIPTION: &'static str = "Health notifications alert";

    pub fn new(strict: bool) -> Self {
        Self { strict }
    }

    /// The title names the app in quotes, straight or curly.
    pub fn matches(alert: &SystemAlert) -> bool {
        ["“Health”", "\"Health\""].iter().any(|quoted| {
            alert
                .title
                .strip_prefix(quoted)
                .is_some_and(|rest| rest.trim() == "Would Like to Send You Notifications")
        })
    }
}

impl InterruptionMonitor for NotificationsAlertMonitor {
    fn description(&self) -> &str {
        Self::DESCRIPTION
    }

    fn handle(&self, alert: &SystemAlert) -> MonitorDecision {
        if !Self::matches(alert) {
            return MonitorDecision::Decline;
        }
        if alert.has_button("Allow") {
            info!(title = %alert.title, "allowing Health notifications");
            return MonitorDecision::Tap("Allow".to_string());
        }
        warn!(title = %alert.title, buttons = ?alert.buttons, "notifications alert has no Allow button");
        if self.strict {
            MonitorDecision::Fail("no 'Allow' button on the notifications alert".to_string())
        } else {
            MonitorDecision::Decline
        }
    }
}
