//! Failure context for flaky UI runs.
//!
//! Each flow call receives a [`DiagnosticContext`]. Flows record the step they
//! are on, and when a step fails the context snapshots whatever labels are on
//! screen so the error explains what the UI looked like at that moment.

use crate::Result;
use crate::backend::{AppId, AutomationBackend, ElementKind};
use crate::catalog::SampleType;
use crate::query::{ElementQuery, LabelPredicate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Snapshot attached to a failed step.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureContext {
    /// Breadcrumbs of the steps entered before the failure, oldest first.
    pub steps: Vec<String>,
    /// Labels of the static texts and buttons visible at the failure.
    pub visible_labels: Vec<String>,
}

impl FailureContext {
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|_| format!("{:?}", self))
    }
}

#[derive(Debug, Default)]
pub struct DiagnosticContext {
    steps: Vec<String>,
}

impl DiagnosticContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enter(&mut self, step: impl Into<String>) {
        let step = step.into();
        debug!(step = %step, "entering step");
        self.steps.push(step);
    }

    pub fn steps(&self) -> &[String] {
        &self.steps
    }

    /// Snapshot the visible labels of `app`. Never fails: a backend error
    /// while capturing leaves the label list empty.
    pub async fn capture(&self, backend: &dyn AutomationBackend, app: &AppId) -> FailureContext {
        let visible_labels = match visible_labels(backend, app).await {
            Ok(labels) => labels,
            Err(e) => {
                warn!(error = %e, "failed to capture visible labels");
                Vec::new()
            }
        };
        FailureContext {
            steps: self.steps.clone(),
            visible_labels,
        }
    }
}

async fn visible_labels(backend: &dyn AutomationBackend, app: &AppId) -> Result<Vec<String>> {
    let mut labels = Vec::new();
    for kind in [ElementKind::StaticText, ElementKind::Button] {
        let query = ElementQuery::new(app, kind, LabelPredicate::Any);
        for element in backend.resolve(&query).await? {
            if !element.label.is_empty() {
                labels.push(element.label);
            }
        }
    }
    Ok(labels)
}

/// For each sample type, how many visible elements carry its backend type
/// identifier in their label.
pub async fn count_type_identifiers(
    backend: &dyn AutomationBackend,
    app: &AppId,
    sample_types: &[SampleType],
) -> Result<BTreeMap<String, usize>> {
    let mut counts = BTreeMap::new();
    for sample_type in sample_types {
        let query = ElementQuery::new(
            app,
            ElementKind::StaticText,
            LabelPredicate::contains(sample_type.type_identifier()),
        );
        let count = backend.resolve(&query).await?.len();
        counts.insert(sample_type.type_identifier().to_string(), count);
    }
    Ok(counts)
}
