//! Deterministic heading anchors.
//!
//! A slug is the heading text lowercased, with whitespace runs turned into a
//! single `-` and every character other than alphanumerics, `-` and `_`
//! dropped. Repeats within one document get a numeric suffix in document
//! order (`intro`, `intro-1`, `intro-2`).

use std::collections::HashSet;

const EMPTY_SLUG: &str = "section";

/// Derive the base slug for a piece of heading text.
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut pending_hyphen = false;

    for c in text.trim().chars() {
        if c.is_whitespace() {
            pending_hyphen = true;
            continue;
        }
        if !(c.is_alphanumeric() || c == '-' || c == '_') {
            continue;
        }
        if pending_hyphen && !slug.is_empty() {
            slug.push('-');
        }
        pending_hyphen = false;
        slug.extend(c.to_lowercase());
    }

    if slug.is_empty() {
        EMPTY_SLUG.to_string()
    } else {
        slug
    }
}

/// Hands out unique anchors for one document.
#[derive(Debug, Default)]
pub struct Slugger {
    taken: HashSet<String>,
}

impl Slugger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return a slug for `text` that has not been returned before by this
    /// slugger.
    pub fn unique(&mut self, text: &str) -> String {
        let base = slugify(text);
        if self.taken.insert(base.clone()) {
            return base;
        }
        let mut n = 1usize;
        loop {
            let candidate = format!("{base}-{n}");
            if self.taken.insert(candidate.clone()) {
                return candidate;
            }
            n += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lowercases_and_hyphenates() {
        assert_eq!(slugify("Work  Experience"), "work-experience");
        assert_eq!(slugify("  Hi "), "hi");
    }

    #[test]
    fn drops_punctuation() {
        assert_eq!(slugify("C++ & Rust!"), "c-rust");
        assert_eq!(slugify("2020 – 2024"), "2020-2024");
    }

    #[test]
    fn keeps_unicode_letters() {
        assert_eq!(slugify("Über Café"), "über-café");
    }

    #[test]
    fn empty_text_gets_placeholder() {
        assert_eq!(slugify("!!!"), "section");
        assert_eq!(slugify(""), "section");
    }

    #[test]
    fn duplicates_are_suffixed_in_order() {
        let mut s = Slugger::new();
        assert_eq!(s.unique("Skills"), "skills");
        assert_eq!(s.unique("Skills"), "skills-1");
        assert_eq!(s.unique("Skills"), "skills-2");
    }

    #[test]
    fn suffix_does_not_collide_with_literal_heading() {
        let mut s = Slugger::new();
        assert_eq!(s.unique("Skills 1"), "skills-1");
        assert_eq!(s.unique("Skills"), "skills");
        assert_eq!(s.unique("Skills"), "skills-2");
    }
}
