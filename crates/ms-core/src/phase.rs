use regex::Regex;
use serde::Serialize;
use std::fmt;
use std::sync::OnceLock;

static PHASE_RE: OnceLock<Regex> = OnceLock::new();
static LEADING_DIGITS_RE: OnceLock<Regex> = OnceLock::new();

fn phase_re() -> &'static Regex {
    PHASE_RE.get_or_init(|| Regex::new(r"^(\d+)(?:\.(\d+))?$").unwrap())
}

fn leading_digits_re() -> &'static Regex {
    LEADING_DIGITS_RE.get_or_init(|| Regex::new(r"^\d+").unwrap())
}

/// Upper-bound slack for [`in_range`]: covers any `N.x` sub-phase of the last phase.
const RANGE_TOLERANCE: f64 = 0.999;

// ---------------------------------------------------------------------------
// PhaseId
// ---------------------------------------------------------------------------

/// A normalised phase token plus its integer ordinal, if it has one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PhaseId {
    canonical: String,
    ordinal: Option<u32>,
}

impl PhaseId {
    pub fn parse(token: &str) -> Self {
        let canonical = normalize_phase(token);
        let ordinal = extract_phase_number(&canonical);
        Self { canonical, ordinal }
    }

    pub fn as_str(&self) -> &str {
        &self.canonical
    }

    pub fn ordinal(&self) -> Option<u32> {
        self.ordinal
    }
}

impl fmt::Display for PhaseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical)
    }
}

// ---------------------------------------------------------------------------
// Free functions
// ---------------------------------------------------------------------------

/// `"5"` → `"05"`, `"2.1"` → `"02.1"`, `"007"` → `"07"`. Non-numeric tokens
/// pass through unchanged.
pub fn normalize_phase(token: &str) -> String {
    let Some(caps) = phase_re().captures(token) else {
        return token.to_string();
    };
    let digits = caps[1].trim_start_matches('0');
    let integer = if digits.is_empty() { "0" } else { digits };
    match caps.get(2) {
        Some(decimal) => format!("{integer:0>2}.{}", decimal.as_str()),
        None => format!("{integer:0>2}"),
    }
}

/// Leading digit run of `token` (`"05-auth"` → 5), or `None`.
pub fn extract_phase_number(token: &str) -> Option<u32> {
    leading_digits_re()
        .find(token)
        .and_then(|m| m.as_str().parse().ok())
}

/// True when `candidate` is one or two phases before `target`.
pub fn is_adjacent_phase(target: u32, candidate: u32) -> bool {
    let diff = i64::from(target) - i64::from(candidate);
    (1..=2).contains(&diff)
}

/// True when `token` (e.g. `"05"` or `"05.9"`) lies in `start..=end + 0.999`.
/// Non-numeric tokens are never in range.
pub fn in_range(token: &str, start: u32, end: u32) -> bool {
    match token.trim().parse::<f64>() {
        Ok(value) => f64::from(start) <= value && value <= f64::from(end) + RANGE_TOLERANCE,
        Err(_) => false,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
