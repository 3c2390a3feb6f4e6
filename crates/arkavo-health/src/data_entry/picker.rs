//! Date and time wheels of the "Add Data" sheet.

use super::DateComponents;
use super::format::{hour_wheel_values, minute_wheel_value, month_name, parse_month_year};
use crate::backend::{AppId, ElementKind};
use crate::config::HealthConfig;
use crate::diagnostics::DiagnosticContext;
use crate::error::AppStateMismatch;
use crate::locator::Locator;
use crate::query::{ElementQuery, LabelPredicate, Scope};
use crate::{HealthError, Result};
use tracing::{debug, info, warn};

pub(crate) struct PickerDriver<'a> {
    pub locator: &'a Locator,
    pub app: &'a AppId,
    pub config: &'a HealthConfig,
}

impl PickerDriver<'_> {
    fn table_text(&self, label: &str) -> ElementQuery {
        ElementQuery::static_text(self.app, LabelPredicate::named(label)).within(Scope::table(None))
    }

    fn wheel(&self, predicate: LabelPredicate) -> ElementQuery {
        ElementQuery::new(self.app, ElementKind::PickerWheel, predicate)
    }

    /// Open the date row, move the month/year wheels if they differ from
    /// the target, pick the day and close the row again. Missing components
    /// keep whatever the picker shows.
    pub async fn enter_date(&self, date: &DateComponents, diag: &DiagnosticContext) -> Result<()> {
        let timeouts = &self.config.timeouts;
        let date_row = self.table_text("Date");
        self.locator.tap_required(&date_row, timeouts.picker, diag).await?;

        let month_button = ElementQuery::button(self.app, LabelPredicate::like("month"));
        let shown = self.locator.require(&month_button, timeouts.control, diag).await?;
        let shown_value = shown.value.unwrap_or_default();
        let (shown_month, shown_year) = match parse_month_year(&shown_value) {
            Ok(parsed) => parsed,
            Err(_) => {
                warn!(shown = %shown_value, "month button is unreadable, closing the date row");
                let context = diag.capture(self.locator.backend().as_ref(), self.app).await;
                self.locator.backend().tap(&date_row).await?;
                return Err(HealthError::UnexpectedAppState {
                    mismatch: AppStateMismatch::UnreadableDatePicker { shown: shown_value },
                    context,
                });
            }
        };
        let target_year = date.year.unwrap_or(shown_year);
        let target_month = date.month.unwrap_or(shown_month);
        debug!(shown = %shown_value, target_year, target_month, "date picker page");

        if shown_month != target_month || shown_year != target_year {
            self.locator.backend().tap(&month_button).await?;

            if shown_year != target_year {
                let year_wheel = self.wheel(LabelPredicate::named(shown_year.to_string()));
                self.locator.require(&year_wheel, timeouts.picker, diag).await?;
                self.locator
                    .backend()
                    .adjust_wheel(&year_wheel, &target_year.to_string())
                    .await?;
            }
            if shown_month != target_month {
                let month_wheel = self.wheel(LabelPredicate::named(month_name(shown_month)?));
                self.locator.require(&month_wheel, timeouts.picker, diag).await?;
                self.locator
                    .backend()
                    .adjust_wheel(&month_wheel, month_name(target_month)?)
                    .await?;
            }

            let hide = ElementQuery::button(self.app, LabelPredicate::named("DatePicker.Hide"));
            self.locator.tap_required(&hide, timeouts.picker, diag).await?;
        }

        if let Some(day) = date.day {
            let day_button = ElementQuery::button(
                self.app,
                LabelPredicate::contains(self.config.day_label_fragment(day)),
            );
            self.locator.tap_required(&day_button, timeouts.picker, diag).await?;
        }

        self.locator.tap_required(&date_row, timeouts.picker, diag).await?;
        info!(year = target_year, month = target_month, day = ?date.day, "entered date");
        Ok(())
    }

    /// Set the time wheels. Two wheels mean a 24-hour clock, three mean
    /// hour, minute and AM/PM. Only the first picker on screen counts.
    pub async fn enter_time(&self, date: &DateComponents, diag: &DiagnosticContext) -> Result<()> {
        let timeouts = &self.config.timeouts;
        let time_row = self.table_text("Time");
        self.locator.tap_required(&time_row, timeouts.picker, diag).await?;

        let any_wheel = self.wheel(LabelPredicate::Any).within(Scope::first_picker());
        self.locator.require(&any_wheel, timeouts.picker, diag).await?;
        let wheels = self.locator.backend().resolve(&any_wheel).await?.len();

        let twelve_hour = match wheels {
            2 => false,
            3 => true,
            other => {
                return Err(HealthError::UnexpectedAppState {
                    mismatch: AppStateMismatch::UnsupportedPickerLayout { wheels: other },
                    context: diag.capture(self.locator.backend().as_ref(), self.app).await,
                });
            }
        };

        let backend = self.locator.backend();
        if let Some(hour) = date.hour {
            let (hour_text, meridiem) = hour_wheel_values(hour, twelve_hour)?;
            backend.adjust_wheel(&any_wheel.clone().nth(0), &hour_text).await?;
            if let Some(meridiem) = meridiem {
                backend.adjust_wheel(&any_wheel.clone().nth(2), meridiem).await?;
            }
        }
        if let Some(minute) = date.minute {
            backend
                .adjust_wheel(&any_wheel.clone().nth(1), &minute_wheel_value(minute)?)
                .await?;
        }

        self.locator.tap_required(&time_row, timeouts.picker, diag).await?;
        info!(hour = ?date.hour, minute = ?date.minute, twelve_hour, "entered time");
        Ok(())
    }
}
