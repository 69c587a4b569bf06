use crate::error::LexiconError;
use crate::models::theme::ThemeLexicon;
use aho_corasick::AhoCorasick;
use std::collections::BTreeSet;

/// Keyword-substring theme detection over a static lexicon.
pub struct ThemeTagger {
    matcher: AhoCorasick,
    /// pattern index → index into `themes`
    pattern_themes: Vec<usize>,
    themes: Vec<String>,
}

impl ThemeTagger {
    pub fn new(lexicon: &ThemeLexicon) -> Result<Self, LexiconError> {
        let mut themes = Vec::with_capacity(lexicon.len());
        let mut patterns = Vec::new();
        let mut pattern_themes = Vec::new();

        for (theme_index, (name, keywords)) in lexicon.iter().enumerate() {
            themes.push(name.clone());
            for keyword in keywords {
                patterns.push(keyword.clone());
                pattern_themes.push(theme_index);
            }
        }

        let matcher = AhoCorasick::new(&patterns)?;

        Ok(Self {
            matcher,
            pattern_themes,
            themes,
        })
    }

    /// Themes with at least one keyword contained in the lowercased text.
    pub fn tag(&self, text: &str) -> BTreeSet<String> {
        if self.themes.is_empty() || text.is_empty() {
            return BTreeSet::new();
        }

        let lowered = text.to_lowercase();
        let mut hits = vec![false; self.themes.len()];

        // Overlapping scan so a keyword nested in another theme's keyword
        // still counts for its own theme.
        for found in self.matcher.find_overlapping_iter(&lowered) {
            hits[self.pattern_themes[found.pattern().as_usize()]] = true;
        }

        hits.iter()
            .zip(&self.themes)
            .filter(|(hit, _)| **hit)
            .map(|(_, theme)| theme.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn tagger() -> ThemeTagger {
        ThemeTagger::new(&ThemeLexicon::default()).unwrap()
    }

    fn set(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn matching_is_case_insensitive() {
        let t = tagger();
        assert_eq!(t.tag("EMAIL issue"), t.tag("email issue"));
        assert!(t.tag("EMAIL issue").contains("email"));
    }

    #[test]
    fn text_can_match_several_themes() {
        let tags = tagger().tag("Outlook sync is slow");
        assert_eq!(tags, set(&["email", "integration", "performance"]));
    }

    #[test]
    fn text_without_keywords_matches_nothing() {
        assert!(tagger().tag("billing question").is_empty());
        assert!(tagger().tag("").is_empty());
    }

    #[test]
    fn repeated_keywords_do_not_duplicate_themes() {
        let tags = tagger().tag("email email gmail");
        assert_eq!(tags, set(&["email"]));
    }

    #[test]
    fn overlapping_keywords_from_different_themes_both_match() {
        let mut raw = BTreeMap::new();
        raw.insert("alpha".to_string(), vec!["notification".to_string()]);
        raw.insert("beta".to_string(), vec!["cat".to_string()]);
        let t = ThemeTagger::new(&ThemeLexicon::from_map(raw)).unwrap();

        assert_eq!(t.tag("Notifications broken"), set(&["alpha", "beta"]));
    }

    #[test]
    fn empty_lexicon_tags_nothing() {
        let t = ThemeTagger::new(&ThemeLexicon::from_map(BTreeMap::new())).unwrap();
        assert!(t.tag("email").is_empty());
    }
}
