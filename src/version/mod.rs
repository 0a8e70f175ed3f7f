//! Semantic version normalization, parsing and ordering.
//!
//! Version labels arrive in loose shapes (`v2`, `3.5`, `1-beta+exp`) and
//! are rewritten into the canonical `MAJOR.MINOR.PATCH[-PRERELEASE][+BUILD]`
//! form before anything else looks at them. The canonical string is what
//! the migration engine uses as a version's identity.

mod types;

pub use types::{SemVer, VersionError};

use once_cell::sync::Lazy;
use regex::Regex;
use std::cmp::Ordering;
use types::{compare_digits, compare_prerelease};

/// The zero version returned by lenient normalization of garbage input.
pub const ZERO_VERSION: &str = "0.0.0";

/// Loose form: optional `v`, one to three numeric segments, optional
/// prerelease and build suffixes.
static LOOSE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^[vV]?(\d+)(?:\.(\d+))?(?:\.(\d+))?(?:-([0-9A-Za-z-]+(?:\.[0-9A-Za-z-]+)*))?(?:\+([0-9A-Za-z-]+(?:\.[0-9A-Za-z-]+)*))?$",
    )
    .expect("LOOSE pattern should be a valid regex")
});

/// Hyphen tail directly after a bare major number, tolerating empty
/// identifiers and extra `+` separators in the build part.
static HYPHEN_TAIL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[vV]?(\d+)-([0-9A-Za-z.+-]*)$")
        .expect("HYPHEN_TAIL pattern should be a valid regex")
});

static CANONICAL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(0|[1-9]\d*)\.(0|[1-9]\d*)\.(0|[1-9]\d*)(?:-([0-9A-Za-z-]+(?:\.[0-9A-Za-z-]+)*))?(?:\+([0-9A-Za-z-]+(?:\.[0-9A-Za-z-]+)*))?$",
    )
    .expect("CANONICAL pattern should be a valid regex")
});

/// Rewrite a version-like string into canonical form.
///
/// Missing minor/patch segments default to `0` and leading zeros are
/// dropped from numeric segments. When the input has neither accepted
/// shape, `strict` decides between [`VersionError::InvalidVersion`] and
/// the zero version.
///
/// ```ignore
/// assert_eq!(normalize("v3.5", true)?, "3.5.0");
/// assert_eq!(normalize("2-rc.1+b7", true)?, "2.0.0-rc.1+b7");
/// assert_eq!(normalize("nope", false)?, "0.0.0");
/// ```
pub fn normalize(input: &str, strict: bool) -> Result<String, VersionError> {
    let input = input.trim();

    if let Some(caps) = LOOSE.captures(input) {
        let segment = |i: usize| caps.get(i).map_or("0", |m| m.as_str());
        return Ok(assemble(
            segment(1),
            segment(2),
            segment(3),
            caps.get(4).map_or("", |m| m.as_str()),
            caps.get(5).map_or("", |m| m.as_str()),
        ));
    }

    if let Some(caps) = HYPHEN_TAIL.captures(input) {
        let major = caps.get(1).map_or("0", |m| m.as_str());
        let tail = caps.get(2).map_or("", |m| m.as_str());
        let (prerelease, build) = tail.split_once('+').unwrap_or((tail, ""));
        return Ok(assemble(
            major,
            "0",
            "0",
            &join_identifiers(prerelease, &['.']),
            &join_identifiers(build, &['.', '+']),
        ));
    }

    if strict {
        Err(VersionError::InvalidVersion(input.to_string()))
    } else {
        Ok(ZERO_VERSION.to_string())
    }
}

/// Normalize and split a version into its components.
///
/// Input that cannot be normalized is rejected with
/// [`VersionError::InvalidVersion`].
pub fn parse(input: &str) -> Result<SemVer, VersionError> {
    let normalized = normalize(input, true)?;
    let caps = CANONICAL
        .captures(&normalized)
        .ok_or_else(|| VersionError::InvalidSemVer(normalized.clone()))?;

    let number = |i: usize| -> Result<u64, VersionError> {
        caps.get(i)
            .map_or("", |m| m.as_str())
            .parse()
            .map_err(|_| VersionError::InvalidSemVer(normalized.clone()))
    };

    Ok(SemVer {
        major: number(1)?,
        minor: number(2)?,
        patch: number(3)?,
        prerelease: caps.get(4).map_or("", |m| m.as_str()).to_string(),
        build: caps.get(5).map_or("", |m| m.as_str()).to_string(),
    })
}

/// Totally order two version strings.
///
/// Semver precedence decides first; build metadata is ignored there. When
/// two versions have equal precedence the raw input strings are compared
/// so the order stays deterministic. Unparseable input sorts as the zero
/// version. Numeric segments are compared as digit strings, so versions
/// too large for [`SemVer`] still order correctly.
pub fn compare(a: &str, b: &str) -> Ordering {
    let left = normalize(a, false).unwrap_or_else(|_| ZERO_VERSION.to_string());
    let right = normalize(b, false).unwrap_or_else(|_| ZERO_VERSION.to_string());
    let (l, r) = (precedence_parts(&left), precedence_parts(&right));

    compare_digits(l[0], r[0])
        .then_with(|| compare_digits(l[1], r[1]))
        .then_with(|| compare_digits(l[2], r[2]))
        .then_with(|| compare_prerelease(l[3], r[3]))
        .then_with(|| a.cmp(b))
}

/// MAJOR, MINOR, PATCH and PRERELEASE of a canonical version.
fn precedence_parts(canonical: &str) -> [&str; 4] {
    match CANONICAL.captures(canonical) {
        Some(caps) => {
            let part = |i: usize| caps.get(i).map_or("", |m| m.as_str());
            [part(1), part(2), part(3), part(4)]
        }
        None => ["0", "0", "0", ""],
    }
}

fn assemble(major: &str, minor: &str, patch: &str, prerelease: &str, build: &str) -> String {
    let mut out = format!(
        "{}.{}.{}",
        trim_number(major),
        trim_number(minor),
        trim_number(patch)
    );
    if !prerelease.is_empty() {
        out.push('-');
        out.push_str(prerelease);
    }
    if !build.is_empty() {
        out.push('+');
        out.push_str(build);
    }
    out
}

fn trim_number(digits: &str) -> &str {
    let trimmed = digits.trim_start_matches('0');
    if trimmed.is_empty() {
        "0"
    } else {
        trimmed
    }
}

fn join_identifiers(raw: &str, separators: &[char]) -> String {
    raw.split(separators)
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(".")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn norm(input: &str) -> String {
        normalize(input, true).unwrap()
    }

    #[test]
    fn test_normalize_partial_forms() {
        assert_eq!(norm("1"), "1.0.0");
        assert_eq!(norm("v4"), "4.0.0");
        assert_eq!(norm("V2"), "2.0.0");
        assert_eq!(norm("3.5"), "3.5.0");
        assert_eq!(norm("1.2.3"), "1.2.3");
        assert_eq!(norm(" 1.2.3 "), "1.2.3");
    }

    #[test]
    fn test_normalize_suffixes_on_partial_forms() {
        assert_eq!(norm("v3.5.0-foo"), "3.5.0-foo");
        assert_eq!(norm("1-alpha"), "1.0.0-alpha");
        assert_eq!(norm("1.2-rc.1"), "1.2.0-rc.1");
        assert_eq!(norm("1+build.5"), "1.0.0+build.5");
        assert_eq!(norm("2.1-beta+exp.sha.5114f85"), "2.1.0-beta+exp.sha.5114f85");
    }

    #[test]
    fn test_normalize_hyphen_tail() {
        assert_eq!(norm("7-rc..1"), "7.0.0-rc.1");
        assert_eq!(norm("7-rc.+b1+b2"), "7.0.0-rc+b1.b2");
        assert_eq!(norm("7-"), "7.0.0");
        assert_eq!(norm("7-+meta"), "7.0.0+meta");
    }

    #[test]
    fn test_normalize_leading_zeros() {
        assert_eq!(norm("01.002.0003"), "1.2.3");
        assert_eq!(norm("00"), "0.0.0");
    }

    #[test]
    fn test_normalize_invalid() {
        assert_eq!(
            normalize("not a version", true),
            Err(VersionError::InvalidVersion("not a version".to_string()))
        );
        assert!(normalize("", true).is_err());
        assert!(normalize("1.2.3.4", true).is_err());
        assert!(normalize("1.2.3-", true).is_err());
        assert_eq!(normalize("garbage", false).unwrap(), ZERO_VERSION);
    }

    #[test]
    fn test_normalize_idempotent() {
        let inputs = [
            "1",
            "v2.3",
            "1.2.3-alpha.1+b.2",
            "7-rc..1",
            "7-rc.+b1+b2",
            "010.0.1",
            "1.0.0-0.3.7",
            "1.0.0-x-y-z.--",
        ];
        for input in inputs {
            let once = norm(input);
            assert_eq!(norm(&once), once, "normalize not idempotent for {input}");
            assert!(CANONICAL.is_match(&once), "{once} is not canonical");
        }
    }

    #[test]
    fn test_parse_components() {
        let v = parse("v1.2-rc.1+exp").unwrap();
        assert_eq!(v.major, 1);
        assert_eq!(v.minor, 2);
        assert_eq!(v.patch, 0);
        assert_eq!(v.prerelease, "rc.1");
        assert_eq!(v.build, "exp");
    }

    #[test]
    fn test_parse_invalid() {
        assert!(matches!(parse("x.y.z"), Err(VersionError::InvalidVersion(_))));
        assert!(matches!(
            parse("99999999999999999999999.0.0"),
            Err(VersionError::InvalidSemVer(_))
        ));
    }

    #[test]
    fn test_compare_reference_order() {
        let ordered = [
            "1.0.0-alpha.1",
            "1.0.0-alpha.beta",
            "1.0.0-beta",
            "1.0.0",
            "1.1.0-alpha",
            "1.1.0-alpha.1",
            "1.1.0",
            "1.1.0+build.123",
            "1.2.0",
            "1.10.0",
            "2.0.0",
        ];
        for pair in ordered.windows(2) {
            assert_eq!(compare(pair[0], pair[1]), Ordering::Less, "{pair:?}");
        }

        let mut shuffled = ordered.to_vec();
        shuffled.reverse();
        shuffled.swap(2, 7);
        shuffled.sort_by(|a, b| compare(a, b));
        assert_eq!(shuffled, ordered);
    }

    #[test]
    fn test_compare_properties() {
        let versions = [
            "0.0.0", "0.1.0", "1.0.0-1", "1.0.0-a", "1.0.0-a.1", "1.0.0", "1.0.0+z",
            "1.0.1", "2.0.0-rc.2", "2.0.0-rc.10", "2.0.0", "10.0.0",
        ];
        for a in versions {
            assert_eq!(compare(a, a), Ordering::Equal);
            for b in versions {
                assert_eq!(compare(a, b), compare(b, a).reverse(), "{a} vs {b}");
                for c in versions {
                    if compare(a, b) == Ordering::Less && compare(b, c) == Ordering::Less {
                        assert_eq!(compare(a, c), Ordering::Less, "{a} < {b} < {c}");
                    }
                }
            }
        }
    }

    #[test]
    fn test_compare_numbers_beyond_u64() {
        let huge = "18446744073709551616.0.0";
        assert_eq!(norm(huge), huge);
        assert_eq!(compare(huge, "0.0.0"), Ordering::Greater);
        assert_eq!(compare(huge, "0.0.1"), Ordering::Greater);
        assert_eq!(compare(huge, "18446744073709551615.0.0"), Ordering::Greater);
        assert_eq!(compare(huge, "18446744073709551617.0.0"), Ordering::Less);
        assert_eq!(compare("1.99999999999999999999999.0", "1.2.0"), Ordering::Greater);
        assert_eq!(compare(huge, "v18446744073709551616"), Ordering::Less);
        assert_eq!(compare("garbage", "0.0.0"), Ordering::Greater);
        assert_eq!(compare("garbage", "0.0.1"), Ordering::Less);
    }

    #[test]
    fn test_compare_build_tie_break_on_input() {
        assert_eq!(compare("1.0.0+a", "1.0.0+b"), Ordering::Less);
        assert_eq!(compare("v1", "1.0.0"), Ordering::Greater);
    }
}
