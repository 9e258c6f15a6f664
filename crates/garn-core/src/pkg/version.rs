//! Version resolution using semver.
//!
//! npm ranges are a superset of what the `semver` crate parses, so ranges are
//! first rewritten into one `VersionReq` per `||` alternative:
//! - Hyphen ranges: `1.0.0 - 2.0.0` -> `>=1.0.0, <=2.0.0`
//! - Space-separated comparators: `>= 2.1.2 < 3.0.0` -> `>=2.1.2, <3.0.0`
//! - Bare versions: `1.2.3` -> `=1.2.3`, `1.2` -> `=1.2` (i.e. `1.2.x`)
//! - X-ranges: `1.x`, `1.2.*`, `*`

use super::error::PkgError;
use semver::{Version, VersionReq};
use std::fmt;

/// Characters that may make up a comparator operator.
const OPERATOR_CHARS: &[char] = &['<', '>', '=', '~', '^'];

/// A parsed npm version range: a disjunction of comparator sets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Range {
    raw: String,
    alternatives: Vec<VersionReq>,
}

impl Range {
    /// Parse an npm range.
    ///
    /// The empty string is `*`. Every `||` alternative must parse.
    ///
    /// # Errors
    /// Returns `InvalidRange` if any alternative is not a valid range.
    pub fn parse(input: &str) -> Result<Self, PkgError> {
        let alternatives = input
            .split("||")
            .map(|alt| parse_comparator_set(alt).map_err(|reason| PkgError::invalid_range(input, reason)))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            raw: input.trim().to_string(),
            alternatives,
        })
    }

    /// Check whether `version` satisfies any alternative.
    #[must_use]
    pub fn matches(&self, version: &Version) -> bool {
        self.alternatives.iter().any(|req| req.matches(version))
    }

    /// The range as written.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl fmt::Display for Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Parse an exact version, tolerating surrounding whitespace and a single
/// leading `v` or `=`.
#[must_use]
pub fn parse_exact(input: &str) -> Option<Version> {
    let trimmed = input.trim();
    let stripped = trimmed
        .strip_prefix('v')
        .or_else(|| trimmed.strip_prefix('='))
        .unwrap_or(trimmed);
    Version::parse(stripped.trim_start()).ok()
}

/// Return the highest version in `versions` that satisfies `range`.
///
/// Every candidate must parse; a malformed published version fails the whole
/// lookup rather than being skipped.
///
/// # Errors
/// - `InvalidRange` if `range` does not parse
/// - `InvalidVersion` if any candidate does not parse
/// - `NoSatisfyingVersion` if nothing matches
pub fn max_satisfying<I, S>(range: &str, versions: I) -> Result<Version, PkgError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let range = Range::parse(range)?;

    let mut best: Option<Version> = None;
    let mut candidates = 0usize;
    for raw in versions {
        let raw = raw.as_ref();
        let version = Version::parse(raw).map_err(|e| PkgError::invalid_version(raw, e))?;
        candidates += 1;

        if range.matches(&version) && best.as_ref().map_or(true, |b| version > *b) {
            best = Some(version);
        }
    }

    best.ok_or_else(|| PkgError::no_satisfying_version(range.as_str(), candidates))
}

/// Check whether `version` satisfies `range`.
///
/// Returns `false` rather than an error when either side does not parse: an
/// unparsable range can never be satisfied, and a locator is never a version.
#[must_use]
pub fn is_satisfied_by(range: &str, version: &str) -> bool {
    let Ok(range) = Range::parse(range) else {
        return false;
    };
    parse_exact(version).is_some_and(|v| range.matches(&v))
}

/// Parse one `||` alternative into a `VersionReq`.
fn parse_comparator_set(set: &str) -> Result<VersionReq, String> {
    let set = set.trim();

    // `*`, `x.x.x`, `X.*` and friends all mean any version
    if set.is_empty() || set.split('.').all(|part| matches!(part, "*" | "x" | "X")) {
        return Ok(VersionReq::STAR);
    }

    let converted = if let Some((start, end)) = parse_hyphen_range(set) {
        format!(">={start}, <={end}")
    } else {
        convert_space_separated_comparators(set)?
    };

    VersionReq::parse(&converted).map_err(|e| e.to_string())
}

/// Parse a hyphen range like "1.0.0 - 2.0.0".
fn parse_hyphen_range(range: &str) -> Option<(&str, &str)> {
    let (start, end) = range.split_once(" - ")?;
    let (start, end) = (start.trim(), end.trim());
    if start.is_empty() || end.is_empty() {
        return None;
    }
    Some((strip_v(start), strip_v(end)))
}

/// Convert space-separated comparators to comma-separated ones.
///
/// An operator standing alone (`>= 2.1.2`) is glued to the token after it.
/// Bare versions get an explicit `=` so that `1.2.3` means exactly that
/// version and `1.2` means `1.2.x`, as npm reads them.
fn convert_space_separated_comparators(range: &str) -> Result<String, String> {
    let mut comparators: Vec<String> = Vec::new();
    let mut pending_op = String::new();

    for token in range.split_whitespace() {
        if token.chars().all(|c| OPERATOR_CHARS.contains(&c)) {
            pending_op.push_str(token);
            continue;
        }

        let (op, version) = split_operator(token);
        let op = format!("{pending_op}{op}");
        pending_op.clear();

        let version = strip_v(version);
        if version.is_empty() {
            return Err(format!("operator '{op}' has no version"));
        }

        if op.is_empty() && !is_wildcard(version) {
            comparators.push(format!("={version}"));
        } else {
            comparators.push(format!("{op}{version}"));
        }
    }

    if !pending_op.is_empty() {
        return Err(format!("operator '{pending_op}' has no version"));
    }

    Ok(comparators.join(", "))
}

fn split_operator(token: &str) -> (&str, &str) {
    let idx = token
        .find(|c: char| !OPERATOR_CHARS.contains(&c))
        .unwrap_or(token.len());
    token.split_at(idx)
}

fn strip_v(version: &str) -> &str {
    version.strip_prefix('v').unwrap_or(version)
}

fn is_wildcard(version: &str) -> bool {
    version
        .split('.')
        .any(|part| matches!(part, "*" | "x" | "X"))
}
