//! Invitation slug derivation and validation.
//!
//! # Purpose
//! Turns a guest display name into the URL-safe identifier used in the
//! per-guest invitation link (`/{slug}`), and validates slugs that arrive from
//! the outside world (path segments, stored rows).
//!
//! # Key invariants
//! - A `Slug` is non-empty and contains only lowercase ASCII letters, digits,
//!   and single interior hyphens.
//! - Derivation is pure and deterministic; there is no locale sensitivity.
//!   Non-ASCII letters are dropped, so some names derive to nothing and are
//!   rejected rather than mapped to an empty link.
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;
use thiserror::Error;
use utoipa::ToSchema;

/// Path segments owned by fixed routes. A guest slug equal to one of these
/// would be shadowed by the route and never resolve.
pub const RESERVED_SLUGS: &[&str] = &["admin", "docs", "v1"];

static UNSUPPORTED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-z0-9\s-]").expect("unsupported-char pattern"));
static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("whitespace pattern"));
static HYPHENS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"-+").expect("hyphen pattern"));

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SlugError {
    #[error("name does not contain any characters usable in an invitation link")]
    Empty,
    #[error("invitation link '{0}' is reserved")]
    Reserved(String),
    #[error("invalid invitation slug '{0}'")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema)]
#[serde(try_from = "String", into = "String")]
#[schema(value_type = String, example = "mike-lisa-wilson")]
pub struct Slug(String);

impl Slug {
    /// Derive a slug from a display name.
    ///
    /// Lower-cases the name, drops everything that is not an ASCII letter,
    /// digit, whitespace or hyphen, and joins the remaining words with single
    /// hyphens.
    ///
    /// # Errors
    /// - [`SlugError::Empty`] when nothing usable is left.
    /// - [`SlugError::Reserved`] when the result collides with a fixed route.
    pub fn derive(name: &str) -> Result<Self, SlugError> {
        let derived = derive_slug(name);
        if derived.is_empty() {
            return Err(SlugError::Empty);
        }
        if RESERVED_SLUGS.contains(&derived.as_str()) {
            return Err(SlugError::Reserved(derived));
        }
        Ok(Self(derived))
    }

    /// Validate an already-formed slug without transforming it.
    pub fn parse(value: &str) -> Result<Self, SlugError> {
        if is_well_formed(value) {
            Ok(Self(value.to_string()))
        } else {
            Err(SlugError::Invalid(value.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

/// Raw slug derivation without the empty/reserved guards.
///
/// Characters outside `[a-z0-9]`, whitespace and `-` are removed before
/// whitespace becomes a separator, so `Ann.Marie` joins into one word.
pub fn derive_slug(name: &str) -> String {
    let lowered = name.to_lowercase();
    let stripped = UNSUPPORTED.replace_all(&lowered, "");
    let hyphenated = WHITESPACE.replace_all(&stripped, "-");
    let collapsed = HYPHENS.replace_all(&hyphenated, "-");
    collapsed
        .trim_matches(|ch: char| ch == '-' || ch.is_whitespace())
        .to_string()
}

fn is_well_formed(value: &str) -> bool {
    !value.is_empty()
        && !value.starts_with('-')
        && !value.ends_with('-')
        && !value.contains("--")
        && value
            .chars()
            .all(|ch| ch.is_ascii_lowercase() || ch.is_ascii_digit() || ch == '-')
}

impl fmt::Display for Slug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Slug {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Slug {
    type Error = SlugError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        if is_well_formed(&value) {
            Ok(Self(value))
        } else {
            Err(SlugError::Invalid(value))
        }
    }
}

impl From<Slug> for String {
    fn from(slug: Slug) -> Self {
        slug.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derives_documented_examples() {
        assert_eq!(derive_slug("John Smith"), "john-smith");
        assert_eq!(derive_slug("The Smith Family!!"), "the-smith-family");
        assert_eq!(derive_slug("  Multiple   Spaces  "), "multiple-spaces");
        assert_eq!(derive_slug("Mike & Lisa Wilson"), "mike-lisa-wilson");
    }

    #[test]
    fn collapses_hyphen_runs_and_trims_edges() {
        assert_eq!(derive_slug("--Jane -- Doe--"), "jane-doe");
        assert_eq!(derive_slug("a - & - b"), "a-b");
        assert_eq!(derive_slug("Mary-Jane  O'Neil"), "mary-jane-oneil");
    }

    #[test]
    fn stripped_characters_do_not_split_words() {
        assert_eq!(derive_slug("Ann.Marie"), "annmarie");
        assert_eq!(derive_slug("Guest #42"), "guest-42");
    }

    #[test]
    fn tabs_and_newlines_count_as_whitespace() {
        assert_eq!(derive_slug("Sok\tDara\nChan"), "sok-dara-chan");
    }

    #[test]
    fn derivation_is_idempotent_for_sample_names() {
        for name in ["Table 12 - Family", "-", ""] {
            let once = derive_slug(name);
            assert_eq!(derive_slug(&once), once, "name: {name:?}");
        }
    }

    #[test]
    fn non_ascii_letters_are_dropped() {
        assert_eq!(derive_slug("José Núñez"), "jos-nez");
        assert_eq!(derive_slug("សុខ Dara"), "dara");
    }

    #[test]
    fn khmer_only_name_is_rejected() {
        assert_eq!(Slug::derive("សុខ ដារា"), Err(SlugError::Empty));
        assert_eq!(Slug::derive("!!!"), Err(SlugError::Empty));
    }

    #[test]
    fn reserved_route_segments_are_rejected() {
        assert_eq!(
            Slug::derive("Admin"),
            Err(SlugError::Reserved("admin".to_string()))
        );
        assert!(Slug::derive("Admin Family").is_ok());
    }

    #[test]
    fn parse_accepts_only_well_formed_slugs() {
        assert!(Slug::parse("mike-lisa-wilson").is_ok());
        assert!(Slug::parse("guest-42").is_ok());
        for bad in ["", "-lead", "trail-", "double--hyphen", "Upper", "with space"] {
            assert!(Slug::parse(bad).is_err(), "{bad:?} should be rejected");
        }
    }

    #[test]
    fn serde_round_trip_validates() {
        let slug: Slug = serde_json::from_str("\"john-smith\"").expect("valid");
        assert_eq!(slug.as_str(), "john-smith");
        assert!(serde_json::from_str::<Slug>("\"John Smith\"").is_err());
    }
}
