use std::cmp::Ordering;

use serde::{Deserialize, Deserializer};
use uuid::Uuid;

use crate::tutorial::{Difficulty, Tutorial, TutorialType};

const DEFAULT_TITLE: &str = "Untitled";
const DEFAULT_LANGUAGE: &str = "JavaScript";
const DEFAULT_CATEGORY: &str = "Frontend";
const DEFAULT_ESTIMATED_TIME: &str = "1-2 hours";

/// Normalizes a name by stripping any whitespace and decomposing it
/// into Unicode Normalization Form D.
///
/// ```
/// use codeclips::normalization::normalize_name;
/// assert_eq!(normalize_name(" hï "), "hï");
/// ```
pub fn normalize_name(name: impl AsRef<str>) -> String {
    use unicode_normalization::UnicodeNormalization;

    name.as_ref().trim().nfd().to_string()
}

/// Deserializes a `String` after running it through `normalize_name`.
pub fn deserialize<'de, D>(deserializer: D) -> Result<String, D::Error>
where D: Deserializer<'de> {
    let s: String = Deserialize::deserialize(deserializer)?;
    Ok(normalize_name(s))
}

/// Deserializes an optional `String` after running it through `normalize_name`.
pub fn deserialize_option<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where D: Deserializer<'de> {
    let o: Option<String> = Deserialize::deserialize(deserializer)?;
    Ok(o.map(normalize_name))
}

/// Builds a key for locale-style comparison: accents are dropped and
/// case is folded, so “école” sorts next to “Ecole”.
pub fn collation_key(s: &str) -> String {
    use unicode_normalization::char::is_combining_mark;
    use unicode_normalization::UnicodeNormalization;

    s.nfd()
        .filter(|c| !is_combining_mark(*c))
        .flat_map(char::to_lowercase)
        .collect()
}

/// Compares two titles by collation key, falling back to the raw
/// strings so the order is total.
pub fn compare_titles(a: &str, b: &str) -> Ordering {
    collation_key(a)
        .cmp(&collation_key(b))
        .then_with(|| a.cmp(b))
}

/// Splits a comma-separated tag list, trimming each tag and dropping
/// empty ones.
///
/// ```
/// use codeclips::normalization::parse_tags;
/// assert_eq!(parse_tags("react, hooks"), vec!["react", "hooks"]);
/// ```
pub fn parse_tags(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|tag| !tag.is_empty())
        .map(str::to_owned)
        .collect()
}

/// A loosely-shaped catalog record as it comes out of an import file or
/// a hand-maintained data source. Every descriptive field may be absent.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawTutorial {
    #[serde(default)]
    pub id: Option<Uuid>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    #[serde(default)]
    pub difficulty: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub estimated_time: Option<String>,
}

impl RawTutorial {
    /// Fills in the catalog defaults for anything missing. Records
    /// without an ID get a fresh one.
    pub fn normalize(self) -> Tutorial {
        fn or_default(value: Option<String>, default: &str) -> String {
            value
                .map(|v| v.trim().to_owned())
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| default.to_owned())
        }

        let kind = self
            .kind
            .as_deref()
            .and_then(|k| k.parse().ok())
            .unwrap_or(TutorialType::Article);

        let difficulty = self
            .difficulty
            .map(|d| d.trim().to_owned())
            .filter(|d| !d.is_empty())
            .map(Difficulty::from)
            .unwrap_or(Difficulty::Beginner);

        Tutorial {
            id: self.id.unwrap_or_else(Uuid::new_v4),
            title: or_default(self.title, DEFAULT_TITLE),
            url: self.url.unwrap_or_default(),
            image_url: self.image_url.filter(|u| !u.trim().is_empty()),
            kind,
            summary: self.summary.unwrap_or_default(),
            tags: self.tags.unwrap_or_default(),
            difficulty,
            language: or_default(self.language, DEFAULT_LANGUAGE),
            category: or_default(self.category, DEFAULT_CATEGORY),
            estimated_time: or_default(self.estimated_time, DEFAULT_ESTIMATED_TIME),
        }
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use unicode_normalization::is_nfd;

    use super::*;

    fn count_whitespace(s: impl AsRef<str>) -> usize {
        s.as_ref().chars().filter(|c| c.is_whitespace()).count()
    }

    #[test]
    fn collation_ignores_case_and_accents() {
        assert_eq!(collation_key("École"), collation_key("ecole"));
        assert_eq!(compare_titles("apple", "Banana"), Ordering::Less);
        assert_eq!(compare_titles("Zebra", "apple"), Ordering::Greater);
    }

    #[test]
    fn tags_are_trimmed_and_blank_ones_dropped() {
        assert_eq!(parse_tags(" react ,hooks,, "), vec!["react", "hooks"]);
        assert!(parse_tags("").is_empty());
    }

    #[test]
    fn raw_records_get_catalog_defaults() {
        let tutorial = RawTutorial {
            url: Some("https://example.com/post".to_owned()),
            image_url: Some("  ".to_owned()),
            kind: Some("podcast".to_owned()),
            ..RawTutorial::default()
        }
        .normalize();

        assert_eq!(tutorial.title, "Untitled");
        assert_eq!(tutorial.kind, TutorialType::Article);
        assert_eq!(tutorial.difficulty, Difficulty::Beginner);
        assert_eq!(tutorial.language, "JavaScript");
        assert_eq!(tutorial.category, "Frontend");
        assert_eq!(tutorial.estimated_time, "1-2 hours");
        assert_eq!(tutorial.image_url, None);
    }

    #[test]
    fn raw_records_keep_unknown_difficulties() {
        let tutorial = RawTutorial {
            difficulty: Some("Expert".to_owned()),
            ..RawTutorial::default()
        }
        .normalize();

        assert_eq!(tutorial.difficulty, Difficulty::Other("Expert".to_owned()));
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 1000, ..ProptestConfig::default()
        })]

        #[test]
        fn normalization_works(string in "(\\S.*\\S|\\S+)", space_before in "\\s*", space_after in "\\s*") {
            let normalized = normalize_name(format!("{}{}{}", space_before, string, space_after));

            prop_assert!(is_nfd(&normalized), "{:?} (normalized form of {:?}) is in NFD", normalized, string);

            prop_assert!(!normalized.starts_with(char::is_whitespace) && !normalized.ends_with(char::is_whitespace), "{:?} (normalized form of {:?}) has no leading or trailing whitespace", normalized, string);

            let trimmed = normalized.trim();

            prop_assert_eq!(count_whitespace(&normalized), count_whitespace(&trimmed), "{:?} (normalized form of {:?}) preserves inner whitespace", normalized, string);
        }

        #[test]
        fn parsed_tags_are_never_blank(raw in ".*") {
            for tag in parse_tags(&raw) {
                prop_assert!(!tag.is_empty());
                prop_assert_eq!(tag.trim(), tag.as_str());
            }
        }
    }
}
