use crate::fusion::{Recommendation, VerdictLabel};
use crate::schema::FusionReport;
use crate::uncertainty::ReliabilityLevel;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Flag {
    Ai,
    Composite,
    Review,
    Degraded,
    Conflict,
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub enum Check {
    Flag(Flag),
    Verdict(VerdictLabel),
    Recommendation(Recommendation),
    Reliability(ReliabilityLevel),
    Generator(String),
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct ParsedCheck {
    pub check: Check,
    pub negated: bool,
}

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum ParseError {
    #[error("empty input")]
    EmptyInput,
    #[error("unknown predicate '{0}'")]
    UnknownPredicate(String),
    #[error("unknown field '{0}'")]
    UnknownField(String),
    #[error("malformed comparison")]
    MalformedComparison,
    #[error("invalid value '{value}' for {field}")]
    InvalidValue { field: String, value: String },
}

pub const FLAGS: &[&str] = &["ai", "composite", "review", "degraded", "conflict"];
pub const FIELDS: &[&str] = &["verdict", "recommendation", "reliability", "generator"];

pub const VERDICTS: &[&str] = &["AI_GENERATED", "LIKELY_AI", "UNCERTAIN", "LIKELY_REAL", "REAL"];
pub const RECOMMENDATIONS: &[&str] = &[
    "high_confidence",
    "moderate_confidence",
    "low_confidence",
    "human_review_recommended",
];
pub const RELIABILITY_LEVELS: &[&str] = &["high", "moderate", "low", "very_low"];

pub fn check_predicate_long_help() -> &'static str {
    "Predicates to evaluate against the fusion report.

Flags:
  ai               calibrated verdict is LIKELY_AI or AI_GENERATED
  composite        spatial map looks like a real/synthetic composite
  review           human review is recommended
  degraded         no detector was usable; static priors were used
  conflict         at least two detectors contradict each other

Comparisons:
  verdict=LABEL            AI_GENERATED, LIKELY_AI, UNCERTAIN, LIKELY_REAL, REAL
  recommendation=VALUE     high_confidence, moderate_confidence, low_confidence,
                           human_review_recommended
  reliability=LEVEL        high, moderate, low, very_low
  generator=NAME           identified generator (case-insensitive)

Prefix any predicate with '!' to negate it."
}

fn parse_flag(input: &str) -> Result<Check, ParseError> {
    let flag = match input {
        "ai" => Flag::Ai,
        "composite" => Flag::Composite,
        "review" => Flag::Review,
        "degraded" => Flag::Degraded,
        "conflict" => Flag::Conflict,
        _ if FIELDS.contains(&input) => return Err(ParseError::MalformedComparison),
        _ => return Err(ParseError::UnknownPredicate(input.to_string())),
    };
    Ok(Check::Flag(flag))
}

fn invalid(field: &str, value: &str) -> ParseError {
    ParseError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
    }
}

fn parse_enum<T: serde::de::DeserializeOwned>(field: &str, value: &str) -> Result<T, ParseError> {
    serde_json::from_value(serde_json::Value::String(value.to_string()))
        .map_err(|_| invalid(field, value))
}

fn parse_comparison(key: &str, value: &str) -> Result<Check, ParseError> {
    if key.is_empty() || value.is_empty() {
        return Err(ParseError::MalformedComparison);
    }
    match key {
        "verdict" => Ok(Check::Verdict(parse_enum(
            key,
            &value.to_ascii_uppercase(),
        )?)),
        "recommendation" => Ok(Check::Recommendation(parse_enum(
            key,
            &value.to_ascii_lowercase(),
        )?)),
        "reliability" => Ok(Check::Reliability(parse_enum(
            key,
            &value.to_ascii_lowercase(),
        )?)),
        "generator" => Ok(Check::Generator(value.to_string())),
        _ => Err(ParseError::UnknownField(key.to_string())),
    }
}

pub fn parse(input: &str) -> Result<Check, ParseError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(ParseError::EmptyInput);
    }

    if let Some((key, value)) = input.split_once('=') {
        parse_comparison(key.trim(), value.trim())
    } else {
        parse_flag(input)
    }
}

pub fn parse_predicate(input: &str) -> Result<ParsedCheck, ParseError> {
    let input = input.trim();

    // Handle negation
    let (input, negated) = if let Some(rest) = input.strip_prefix('!') {
        (rest, true)
    } else {
        (input, false)
    };

    let check = parse(input)?;
    Ok(ParsedCheck { check, negated })
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvaluationResult {
    pub predicate: String,
    pub result: bool,
    /// What the report actually says, for explanations.
    pub actual: String,
}

fn json_name<T: Serialize>(value: &T) -> String {
    serde_json::to_value(value)
        .ok()
        .and_then(|v| v.as_str().map(str::to_string))
        .unwrap_or_default()
}

fn evaluate_check(report: &FusionReport, check: &Check) -> (bool, String) {
    match check {
        Check::Flag(flag) => {
            let value = match flag {
                Flag::Ai => report.is_ai(),
                Flag::Composite => report.is_composite(),
                Flag::Review => report.needs_review(),
                Flag::Degraded => report.is_degraded(),
                Flag::Conflict => report.is_conflict(),
            };
            (value, value.to_string())
        }
        Check::Verdict(label) => (
            report.verdict.label == *label,
            json_name(&report.verdict.label),
        ),
        Check::Recommendation(rec) => (
            report.verdict.recommendation == *rec,
            json_name(&report.verdict.recommendation),
        ),
        Check::Reliability(level) => {
            let actual = report.uncertainty.reliability.level;
            (actual == *level, actual.as_str().to_string())
        }
        Check::Generator(name) => match report.generator() {
            Some(found) => (found.eq_ignore_ascii_case(name), found.to_string()),
            None => (false, "none".to_string()),
        },
    }
}

pub fn evaluate(report: &FusionReport, predicate: &str, parsed: &ParsedCheck) -> EvaluationResult {
    let (value, actual) = evaluate_check(report, &parsed.check);
    EvaluationResult {
        predicate: predicate.trim().to_string(),
        result: value != parsed.negated,
        actual,
    }
}

/// Combine results in ALL (default) or ANY mode.
pub fn overall(results: &[EvaluationResult], any: bool) -> bool {
    if any {
        results.iter().any(|r| r.result)
    } else {
        results.iter().all(|r| r.result)
    }
}

pub fn render_results(results: &[EvaluationResult], overall: bool, any: bool, json: bool) -> String {
    if json {
        let value = serde_json::json!({
            "overall": overall,
            "mode": if any { "any" } else { "all" },
            "checks": results,
        });
        return serde_json::to_string_pretty(&value).unwrap_or_default();
    }

    let mut out = String::new();
    for (i, r) in results.iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        out.push_str(&format!("{}  {}  (actual: {})", r.result, r.predicate, r.actual));
    }
    if results.len() > 1 {
        out.push('\n');
        out.push_str(&format!("overall = {}", overall));
    }
    out
}
