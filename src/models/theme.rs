use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Static theme → keyword lexicon. Keywords are lowercase substrings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ThemeLexicon {
    themes: BTreeMap<String, Vec<String>>,
}

impl Default for ThemeLexicon {
    fn default() -> Self {
        Self::from_map(default_themes())
    }
}

impl ThemeLexicon {
    /// Build a lexicon from raw configuration. Keywords are trimmed,
    /// lowercased and deduplicated; themes left without keywords are dropped.
    pub fn from_map(raw: BTreeMap<String, Vec<String>>) -> Self {
        let mut themes = BTreeMap::new();
        for (name, keywords) in raw {
            let name = name.trim().to_lowercase();
            if name.is_empty() {
                continue;
            }

            let mut cleaned: Vec<String> = keywords
                .iter()
                .map(|k| k.trim().to_lowercase())
                .filter(|k| !k.is_empty())
                .collect();
            cleaned.sort();
            cleaned.dedup();

            if !cleaned.is_empty() {
                themes
                    .entry(name)
                    .or_insert_with(Vec::new)
                    .extend(cleaned);
            }
        }

        for keywords in themes.values_mut() {
            keywords.sort();
            keywords.dedup();
        }

        Self { themes }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Vec<String>)> {
        self.themes.iter()
    }

    pub fn keywords(&self, theme: &str) -> Option<&[String]> {
        self.themes.get(theme).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.themes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.themes.is_empty()
    }

    pub fn to_map(&self) -> BTreeMap<String, Vec<String>> {
        self.themes.clone()
    }
}

/// Default deployment lexicon.
pub fn default_themes() -> BTreeMap<String, Vec<String>> {
    let mut t = BTreeMap::new();
    t.insert("email".to_string(), words(&["email", "gmail", "outlook"]));
    t.insert("mobile".to_string(), words(&["mobile", "app", "phone"]));
    t.insert(
        "performance".to_string(),
        words(&["speed", "slow", "fast", "performance"]),
    );
    t.insert("ui".to_string(), words(&["interface", "ui", "design", "layout"]));
    t.insert(
        "integration".to_string(),
        words(&["integration", "sync", "connect"]),
    );
    t.insert("support".to_string(), words(&["support", "help", "assistance"]));
    t
}

fn words(list: &[&str]) -> Vec<String> {
    list.iter().map(|w| w.to_string()).collect()
}
