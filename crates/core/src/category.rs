use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

/// Category assigned when the raw value is missing or blank.
pub const FALLBACK_CATEGORY: &str = "Other";

/// A normalized category name.
///
/// The only way to build one is through [`Category::new`], so every value in
/// circulation is already trimmed, whitespace-collapsed and Title Cased.
/// Category identity is plain string equality on the normalized form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Category(String);

impl Category {
    pub fn new(raw: &str) -> Self {
        let words: Vec<String> = raw.split_whitespace().map(title_case_word).collect();
        if words.is_empty() {
            Self(FALLBACK_CATEGORY.to_string())
        } else {
            Self(words.join(" "))
        }
    }

    pub fn from_option(raw: Option<&str>) -> Self {
        Self::new(raw.unwrap_or(""))
    }

    pub fn other() -> Self {
        Self(FALLBACK_CATEGORY.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    pub fn is_fallback(&self) -> bool {
        self.0 == FALLBACK_CATEGORY
    }
}

fn title_case_word(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

/// Normalize a raw category string: trim, Title Case, empty -> "Other".
pub fn normalize_category(raw: Option<&str>) -> String {
    Category::from_option(raw).into_string()
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Category {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Category {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

impl From<Option<&str>> for Category {
    fn from(raw: Option<&str>) -> Self {
        Self::from_option(raw)
    }
}

impl<'de> Deserialize<'de> for Category {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        Ok(Self::from_option(raw.as_deref()))
    }
}
