//! Domain families: substring predicates over link URLs.

use serde::{Deserialize, Serialize};

/// A set of domain substrings. A URL matches when it contains any of them.
///
/// An empty set matches nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DomainSet(Vec<String>);

impl DomainSet {
    pub fn new<I, S>(domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(
            domains
                .into_iter()
                .map(Into::into)
                .filter(|d: &String| !d.is_empty())
                .collect(),
        )
    }

    pub fn empty() -> Self {
        Self(Vec::new())
    }

    pub fn matches(&self, url: &str) -> bool {
        self.0.iter().any(|d| url.contains(d.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&[String]> for DomainSet {
    fn from(domains: &[String]) -> Self {
        Self::new(domains.iter().cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::exact_host("https://hubcloud.foo/file/1", true)]
    #[case::subdomain("https://cdn.hubcdn.fans/x", true)]
    #[case::path_only("https://other.site/?next=hubcloud", true)]
    #[case::unrelated("https://example.com/a", false)]
    fn substring_match(#[case] url: &str, #[case] expected: bool) {
        let set = DomainSet::new(["hubcloud", "hubcdn"]);
        assert_eq!(set.matches(url), expected);
    }

    #[test]
    fn empty_entries_are_dropped_so_nothing_matches_everything() {
        let set = DomainSet::new(["", ""]);
        assert!(set.is_empty());
        assert!(!set.matches("https://anything"));
    }
}
