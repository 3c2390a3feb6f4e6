//! UI automation helpers for the Apple Health app.
//!
//! Flows are written against [`AutomationBackend`]; pair them with a real
//! device driver, or with the in-memory `sim::SimBackend` (`sim` feature)
//! in tests.

pub mod authorization;
pub mod backend;
pub mod catalog;
pub mod config;
pub mod data_entry;
pub mod diagnostics;
pub mod error;
pub mod interruption;
pub mod locator;
pub mod navigation;
pub mod onboarding;
pub mod query;
pub mod session;
#[cfg(any(test, feature = "sim"))]
pub mod sim;
pub mod version;

pub use authorization::{HealthKitAuthorization, HealthRecordsAuthorization, HealthRecordsRequest};
pub use backend::{
    AppId, AutomationBackend, ElementKind, ElementSnapshot, InterruptionMonitor, MonitorDecision,
    MonitorToken, ScrollDirection, ScrollVelocity, SystemAlert,
};
pub use catalog::{Category, HealthAppDataType, HealthRecordAccount, HealthRecordType, SampleType};
pub use config::{HealthConfig, Timeouts};
pub use data_entry::{CustomEntry, DataEntry, DateComponents, EntryContext, SampleInput, ValueEntry};
pub use diagnostics::{DiagnosticContext, FailureContext, count_type_identifiers};
pub use error::{AppStateMismatch, HealthError, Result};
pub use interruption::NotificationsAlertMonitor;
pub use locator::{Locator, Presence, ScrollPlan};
pub use navigation::{NavigationState, NavigationTarget, Navigator};
pub use onboarding::Onboarding;
pub use query::{Container, ContainerKind, ElementQuery, LabelPredicate, Scope};
pub use session::HealthSession;
pub use version::{PlatformVersion, TabTerminology, UiProfile};
