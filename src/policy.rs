use crate::errors::{AppError, AppResult};
use crate::models::{KpiThresholds, Metric, MetricUnit, MetricValues};
use once_cell::sync::Lazy;
use regex::Regex;

static EMAIL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("valid email regex")
});

const MAX_EMAIL_LEN: usize = 255;

/// Bounds checks applied at the input boundary, before anything is stored or assessed.
#[derive(Debug, Clone, Default)]
pub struct InputPolicy;

impl InputPolicy {
    pub fn new() -> Self {
        Self
    }

    pub fn validate_metrics(&self, values: &MetricValues) -> AppResult<()> {
        for (metric, value) in values.iter() {
            self.validate_value(metric, *value)?;
        }
        Ok(())
    }

    pub fn validate_thresholds(&self, thresholds: &KpiThresholds) -> AppResult<()> {
        for (metric, threshold) in thresholds.iter() {
            self.validate_value(metric, threshold)?;
        }
        Ok(())
    }

    pub fn validate_email(&self, email: &str) -> AppResult<()> {
        if email.len() > MAX_EMAIL_LEN {
            return Err(AppError::Validation(format!(
                "Email exceeds {} characters",
                MAX_EMAIL_LEN
            )));
        }
        if !EMAIL_PATTERN.is_match(email) {
            return Err(AppError::Validation(format!("'{}' is not a valid email address", email)));
        }
        Ok(())
    }

    fn validate_value(&self, metric: Metric, value: f64) -> AppResult<()> {
        if !value.is_finite() {
            return Err(AppError::Validation(format!("{} must be a finite number", metric)));
        }

        let unit = metric.unit();
        let max = unit.upper_bound();
        let in_range = value >= 0.0 && max.map_or(true, |max| value <= max);
        if !in_range {
            return Err(AppError::Validation(match max {
                Some(max) => format!("{} {} is out of allowed range (0..={})", metric, value, max),
                None => format!("{} {} must not be negative", metric, value),
            }));
        }

        if unit == MetricUnit::Calls && value.fract() != 0.0 {
            return Err(AppError::Validation(format!(
                "{} {} must be a whole number of calls",
                metric, value
            )));
        }

        Ok(())
    }
}
