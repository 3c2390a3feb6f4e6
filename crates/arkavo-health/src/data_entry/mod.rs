//! Data-Entry Flow Engine: the "Add Data" sheet of a sample type page.

pub mod format;
mod picker;

use crate::backend::{AppId, AutomationBackend, ElementKind};
use crate::catalog::SampleType;
use crate::config::HealthConfig;
use crate::diagnostics::DiagnosticContext;
use crate::error::AppStateMismatch;
use crate::locator::Locator;
use crate::query::{Container, ContainerKind, ElementQuery, LabelPredicate, Scope};
use crate::{HealthError, Result};
use async_trait::async_trait;
use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike};
use picker::PickerDriver;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

pub const ADD_DATA_TABLE: &str = "UIA.Health.AddData.View";
pub const ADD_DATA_VALUE_CELL: &str = "UIA.Health.AddData.ValueCell";

/// Partial date and time of a sample. Absent components leave the picker at
/// whatever it already shows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateComponents {
    pub year: Option<i32>,
    pub month: Option<u32>,
    pub day: Option<u32>,
    pub hour: Option<u32>,
    pub minute: Option<u32>,
}

impl DateComponents {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn date(year: i32, month: u32, day: u32) -> Self {
        Self {
            year: Some(year),
            month: Some(month),
            day: Some(day),
            ..Self::default()
        }
    }

    pub fn year(mut self, year: i32) -> Self {
        self.year = Some(year);
        self
    }

    pub fn month(mut self, month: u32) -> Self {
        self.month = Some(month);
        self
    }

    pub fn day(mut self, day: u32) -> Self {
        self.day = Some(day);
        self
    }

    pub fn time(mut self, hour: u32, minute: u32) -> Self {
        self.hour = Some(hour);
        self.minute = Some(minute);
        self
    }

    pub fn has_date(&self) -> bool {
        self.year.is_some() || self.month.is_some() || self.day.is_some()
    }

    pub fn has_time(&self) -> bool {
        self.hour.is_some() || self.minute.is_some()
    }

    pub fn validate(&self) -> Result<()> {
        let out_of_range = |what: &str, v: u32| {
            Err(HealthError::InvalidInput(format!("{} {} is out of range", what, v)))
        };
        if let Some(month) = self.month.filter(|m| !(1..=12).contains(m)) {
            return out_of_range("month", month);
        }
        if let Some(day) = self.day.filter(|d| !(1..=31).contains(d)) {
            return out_of_range("day", day);
        }
        if let Some(hour) = self.hour.filter(|h| *h > 23) {
            return out_of_range("hour", hour);
        }
        if let Some(minute) = self.minute.filter(|m| *m > 59) {
            return out_of_range("minute", minute);
        }
        if let (Some(year), Some(month), Some(day)) = (self.year, self.month, self.day) {
            if NaiveDate::from_ymd_opt(year, month, day).is_none() {
                return Err(HealthError::InvalidInput(format!(
                    "{}-{:02}-{:02} is not a calendar date",
                    year, month, day
                )));
            }
        }
        Ok(())
    }
}

impl From<NaiveDateTime> for DateComponents {
    fn from(value: NaiveDateTime) -> Self {
        Self::date(value.year(), value.month(), value.day()).time(value.hour(), value.minute())
    }
}

/// What the entry flow hands a [`CustomEntry`].
pub struct EntryContext<'a> {
    pub backend: &'a dyn AutomationBackend,
    pub app: &'a AppId,
    pub locator: &'a Locator,
    pub config: &'a HealthConfig,
    pub sample: &'a SampleInput,
}

/// Type-specific value entry that neither a numeric field nor a single
/// choice covers.
#[async_trait]
pub trait CustomEntry: Send + Sync {
    fn description(&self) -> &str {
        "custom entry"
    }

    async fn enter(&self, ctx: &EntryContext<'_>) -> anyhow::Result<()>;
}

#[derive(Clone)]
pub enum ValueEntry {
    /// Type `value` into the text field matched by `field`, or into the
    /// sheet's value cell when `field` is `None`.
    Numeric {
        value: f64,
        field: Option<LabelPredicate>,
    },
    /// Tap the option labelled `label` in the entry table.
    Choice { label: String },
    Custom(Arc<dyn CustomEntry>),
}

impl ValueEntry {
    pub fn numeric(value: f64) -> Self {
        ValueEntry::Numeric { value, field: None }
    }

    pub fn numeric_in(value: f64, field: LabelPredicate) -> Self {
        ValueEntry::Numeric {
            value,
            field: Some(field),
        }
    }

    pub fn choice(label: impl Into<String>) -> Self {
        ValueEntry::Choice {
            label: label.into(),
        }
    }

    pub fn custom(entry: impl CustomEntry + 'static) -> Self {
        ValueEntry::Custom(Arc::new(entry))
    }
}

impl std::fmt::Debug for ValueEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValueEntry::Numeric { value, field } => f
                .debug_struct("Numeric")
                .field("value", value)
                .field("field", field)
                .finish(),
            ValueEntry::Choice { label } => f.debug_struct("Choice").field("label", label).finish(),
            ValueEntry::Custom(entry) => f.debug_tuple("Custom").field(&entry.description()).finish(),
        }
    }
}

/// One record to create.
#[derive(Debug, Clone)]
pub struct SampleInput {
    pub sample_type: SampleType,
    pub date: Option<DateComponents>,
    pub value_entry: ValueEntry,
}

impl SampleInput {
    pub fn new(sample_type: SampleType, value_entry: ValueEntry) -> Self {
        Self {
            sample_type,
            date: None,
            value_entry,
        }
    }

    pub fn with_date(mut self, date: DateComponents) -> Self {
        self.date = Some(date);
        self
    }
}

pub struct DataEntry {
    locator: Locator,
    app: AppId,
    config: Arc<HealthConfig>,
}

impl DataEntry {
    pub fn new(locator: Locator, app: AppId, config: Arc<HealthConfig>) -> Self {
        Self {
            locator,
            app,
            config,
        }
    }

    fn nav_bar_button(&self, label: &str) -> ElementQuery {
        ElementQuery::button(&self.app, LabelPredicate::named(label))
            .within(Scope::navigation_bar(None))
    }

    /// Check that the sample type page is showing: its title, the back
    /// button to its category and "Add Data".
    pub async fn verify_page(&self, sample_type: &SampleType, diag: &DiagnosticContext) -> Result<()> {
        let label = sample_type.display_label();
        let timeout = self.config.timeouts.control;
        let checks = [
            ElementQuery::static_text(&self.app, LabelPredicate::named(label))
                .within(Scope::navigation_bar(None)),
            self.nav_bar_button(sample_type.category().display_label()),
            self.nav_bar_button("Add Data"),
        ];

        for query in &checks {
            if self.locator.locate(query, timeout).await?.is_none() {
                warn!(missing = %query.describe(), page = label, "not on the expected sample type page");
                return Err(HealthError::UnexpectedAppState {
                    mismatch: AppStateMismatch::NotOnExpectedPage {
                        expected: label.to_string(),
                    },
                    context: diag.capture(self.locator.backend().as_ref(), &self.app).await,
                });
            }
        }
        Ok(())
    }

    /// Open "Add Data", set the date and time, enter the value and commit.
    pub async fn create(&self, input: SampleInput, diag: &mut DiagnosticContext) -> Result<()> {
        let label = input.sample_type.display_label().to_string();
        diag.enter(format!("add {} sample", label));

        if let Some(date) = &input.date {
            date.validate()?;
        }
        let numeric_text = match &input.value_entry {
            ValueEntry::Numeric { value, .. } => {
                Some(format::format_numeric_value(*value, self.config.decimal_separator)?)
            }
            _ => None,
        };

        self.verify_page(&input.sample_type, diag).await?;

        let timeouts = &self.config.timeouts;
        self.locator
            .tap_required(&self.nav_bar_button("Add Data"), timeouts.control, diag)
            .await?;

        if let Some(date) = input.date.filter(|d| d.has_date() || d.has_time()) {
            diag.enter("date and time");
            let picker = PickerDriver {
                locator: &self.locator,
                app: &self.app,
                config: &self.config,
            };
            if date.has_date() {
                picker.enter_date(&date, diag).await?;
            }
            if date.has_time() {
                picker.enter_time(&date, diag).await?;
            }
        }

        diag.enter("value entry");
        match &input.value_entry {
            ValueEntry::Numeric { field, .. } => {
                let text = numeric_text.unwrap_or_default();
                let query = match field {
                    Some(predicate) => {
                        ElementQuery::new(&self.app, ElementKind::TextField, predicate.clone())
                    }
                    None => default_value_field(&self.app),
                };
                self.locator.tap_required(&query, timeouts.control, diag).await?;
                self.locator.backend().type_text(&query, &text).await?;
                info!(sample = %label, value = %text, "typed sample value");
            }
            ValueEntry::Choice { label: choice } => {
                let query = ElementQuery::static_text(&self.app, LabelPredicate::named(choice))
                    .within(Scope::table(None));
                self.locator.tap_required(&query, timeouts.control, diag).await?;
                info!(sample = %label, choice = %choice, "selected sample value");
            }
            ValueEntry::Custom(entry) => {
                let ctx = EntryContext {
                    backend: self.locator.backend().as_ref(),
                    app: &self.app,
                    locator: &self.locator,
                    config: &self.config,
                    sample: &input,
                };
                entry.enter(&ctx).await.map_err(HealthError::CustomEntry)?;
                info!(sample = %label, entry = entry.description(), "ran custom value entry");
            }
        }

        let add = self.nav_bar_button("Add");
        self.locator.tap_required(&add, timeouts.control, diag).await?;
        if !self
            .locator
            .backend()
            .wait_for_non_existence(&add, timeouts.sheet_dismiss)
            .await?
        {
            warn!(sample = %label, "add data sheet still showing after commit");
        }
        info!(sample = %label, "added sample");
        Ok(())
    }
}

/// First text field of the value cell in the "Add Data" table.
pub fn default_value_field(app: &AppId) -> ElementQuery {
    ElementQuery::new(app, ElementKind::TextField, LabelPredicate::Any).within(
        Scope::table(Some(ADD_DATA_TABLE))
            .then(Container::named(ContainerKind::Cell, ADD_DATA_VALUE_CELL)),
    )
}
