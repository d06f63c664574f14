/// Client-side input validation.
///
/// Every check here runs before a request is built. A rejected input means
/// zero network traffic — the caller gets [`ApiError::Validation`] with a
/// message suitable for inline display.
use std::sync::OnceLock;

use regex::Regex;

use super::error::{ApiError, Result};
use super::types::MetricReport;

/// Rough email shape check: one `@`, something on both sides, a dot in the
/// domain. Deliverability is the server's problem; this only catches typos
/// before a round trip.
fn email_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("static regex"))
}

/// Validate an email address shape.
pub fn email_shape(email: &str) -> Result<()> {
    if email.trim().is_empty() {
        return Err(ApiError::Validation("email must not be empty".into()));
    }
    if !email_regex().is_match(email.trim()) {
        return Err(ApiError::Validation(format!(
            "'{email}' does not look like an email address"
        )));
    }
    Ok(())
}

/// Minimum password length enforced by the registration endpoint; checking
/// it locally saves the round trip.
const MIN_PASSWORD_LEN: usize = 8;

/// Validate password strength for registration.
pub fn password_strength(password: &str) -> Result<()> {
    if password.len() < MIN_PASSWORD_LEN {
        return Err(ApiError::Validation(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

/// Validate that a password and its confirmation match.
pub fn confirm_passwords(password: &str, confirmation: &str) -> Result<()> {
    if password != confirmation {
        return Err(ApiError::Validation(
            "password confirmation does not match".into(),
        ));
    }
    Ok(())
}

/// Validate an API key name: non-empty after trimming.
pub fn key_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(ApiError::Validation("key name must not be empty".into()));
    }
    Ok(())
}

/// Validate a metric report before submission.
///
/// The four unit-interval metrics must be finite and within `[0, 1]`,
/// latency must be a positive finite number, and throughput (when given)
/// must be finite and non-negative.
pub fn metric_report(report: &MetricReport) -> Result<()> {
    if report.prompt.trim().is_empty() {
        return Err(ApiError::Validation("prompt must not be empty".into()));
    }
    if report.response.trim().is_empty() {
        return Err(ApiError::Validation("response must not be empty".into()));
    }
    if report.mode.trim().is_empty() {
        return Err(ApiError::Validation("mode must not be empty".into()));
    }

    let unit_metrics = [
        ("semantic_drift", report.semantic_drift),
        ("uncertainty", report.uncertainty),
        ("factual_support", report.factual_support),
        ("hallucination_probability", report.hallucination_probability),
    ];
    for (name, value) in unit_metrics {
        if !value.is_finite() || !(0.0..=1.0).contains(&value) {
            return Err(ApiError::Validation(format!(
                "{name} must be a finite number in [0, 1], got {value}"
            )));
        }
    }

    if !report.latency_sec.is_finite() || report.latency_sec <= 0.0 {
        return Err(ApiError::Validation(format!(
            "latency_sec must be a positive number, got {}",
            report.latency_sec
        )));
    }
    if let Some(qps) = report.throughput_qps
        && (!qps.is_finite() || qps < 0.0)
    {
        return Err(ApiError::Validation(format!(
            "throughput_qps must be a non-negative number, got {qps}"
        )));
    }

    Ok(())
}
