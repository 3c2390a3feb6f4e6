use crate::{HealthError, Result};
use chrono::Month;

/// Text typed into a numeric field: whole numbers without a fractional part,
/// everything else with two decimals and the locale's separator.
pub fn format_numeric_value(value: f64, decimal_separator: char) -> Result<String> {
    if !value.is_finite() {
        return Err(HealthError::InvalidInput(format!(
            "numeric value must be finite, got {}",
            value
        )));
    }

    let rounded = value.round_ties_even();
    if (rounded - value).abs() < 1e-5 {
        // -0.0 would otherwise print as "-0"
        let whole = if rounded == 0.0 { 0.0 } else { rounded };
        return Ok(format!("{:.0}", whole));
    }

    let text = format!("{:.2}", value);
    if decimal_separator == '.' {
        Ok(text)
    } else {
        Ok(text.replace('.', &decimal_separator.to_string()))
    }
}

/// English month name for `month` (1-12).
pub fn month_name(month: u32) -> Result<&'static str> {
    u8::try_from(month)
        .ok()
        .and_then(|m| Month::try_from(m).ok())
        .map(|m| m.name())
        .ok_or_else(|| HealthError::InvalidInput(format!("month {} is out of range", month)))
}

/// Parse the month/year button value of the date picker, e.g. "March 2025",
/// into (month 1-12, year).
pub fn parse_month_year(text: &str) -> Result<(u32, i32)> {
    let invalid = || HealthError::InvalidInput(format!("unrecognized month/year '{}'", text));

    let mut parts = text.split_whitespace();
    let month: Month = parts.next().ok_or_else(invalid)?.parse().map_err(|_| invalid())?;
    let year: i32 = parts.next().ok_or_else(invalid)?.parse().map_err(|_| invalid())?;
    if parts.next().is_some() {
        return Err(invalid());
    }
    Ok((month.number_from_month(), year))
}

/// Hour wheel text and optional AM/PM wheel text for `hour` (0-23).
pub fn hour_wheel_values(hour: u32, twelve_hour: bool) -> Result<(String, Option<&'static str>)> {
    if hour > 23 {
        return Err(HealthError::InvalidInput(format!("hour {} is out of range", hour)));
    }
    if !twelve_hour {
        return Ok((format!("{:02}", hour), None));
    }
    let display = match hour % 12 {
        0 => 12,
        h => h,
    };
    let meridiem = if hour >= 12 { "PM" } else { "AM" };
    Ok((display.to_string(), Some(meridiem)))
}

pub fn minute_wheel_value(minute: u32) -> Result<String> {
    if minute > 59 {
        return Err(HealthError::InvalidInput(format!("minute {} is out of range", minute)));
    }
    Ok(format!("{:02}", minute))
}
