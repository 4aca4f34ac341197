// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Data version encoding.
//
// A dotted release string is folded into one comparable number:
//
//   MNNNPPP.BBBB
//
//   M    - major, weighted by 1_000_000
//   NNN  - minor, weighted by 1_000
//   PPP  - patch
//   BBBB - build, added as a decimal fraction (".206" -> 0.206)
//
//   "0.1.3"      ->       1003
//   "2.4.17"     ->    2004017
//   "1.7.12.206" -> 1007012.206
//
// Major, minor and patch are read as integer-valued digit runs. The build
// segment is parsed together with its leading dot, so it is a fraction and
// not a count: ".5" encodes higher than ".40".

use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

fn version_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"([0-9]+)\.([0-9]+)(\.[0-9]+)?(\.[0-9]+)?").expect("version pattern is a valid regex")
    })
}

/// Encode a dotted version string into a comparable number.
///
/// Returns `0.0` when no `major.minor` pair can be found, or when the digit
/// runs are too long to encode as a finite number. Only ASCII digits count.
pub fn encode_str(value: &str) -> f64 {
    let Some(caps) = version_pattern().captures(value) else {
        return 0.0;
    };

    let segment = |i: usize| -> f64 {
        caps.get(i)
            .map(|m| m.as_str().trim_start_matches('.'))
            .and_then(|digits| digits.parse::<f64>().ok())
            .unwrap_or(0.0)
    };
    let build = caps
        .get(4)
        .and_then(|m| m.as_str().parse::<f64>().ok())
        .unwrap_or(0.0);

    finite_or_zero(segment(1) * 1_000_000.0 + segment(2) * 1_000.0 + segment(3) + build)
}

fn finite_or_zero(n: f64) -> f64 {
    if n.is_finite() {
        n
    } else {
        0.0
    }
}

/// The version a store is opened with: either already numeric or a dotted
/// release string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StoreVersion {
    /// An already encoded number, used as-is.
    Number(f64),
    /// A dotted release string such as `"2.4.17"`.
    Text(String),
}

impl StoreVersion {
    /// The comparable number for this version. NaN, infinities and
    /// unparsable input encode as `0.0`.
    pub fn encode(&self) -> f64 {
        match self {
            StoreVersion::Number(n) => finite_or_zero(*n),
            StoreVersion::Text(s) => encode_str(s),
        }
    }
}

impl Default for StoreVersion {
    fn default() -> Self {
        StoreVersion::Number(1.0)
    }
}

impl fmt::Display for StoreVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreVersion::Number(n) => write!(f, "{n}"),
            StoreVersion::Text(s) => f.write_str(s),
        }
    }
}

/// Plain numbers stay numeric; anything else is kept as text.
impl FromStr for StoreVersion {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Ok(match trimmed.parse::<f64>() {
            Ok(n) => StoreVersion::Number(n),
            Err(_) => StoreVersion::Text(trimmed.to_string()),
        })
    }
}

impl From<f64> for StoreVersion {
    fn from(n: f64) -> Self {
        StoreVersion::Number(n)
    }
}

impl From<u32> for StoreVersion {
    fn from(n: u32) -> Self {
        StoreVersion::Number(f64::from(n))
    }
}

impl From<&str> for StoreVersion {
    fn from(s: &str) -> Self {
        StoreVersion::Text(s.to_string())
    }
}

impl From<String> for StoreVersion {
    fn from(s: String) -> Self {
        StoreVersion::Text(s)
    }
}
