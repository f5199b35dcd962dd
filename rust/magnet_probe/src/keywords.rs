//! Keyword filtering of candidate identifier lines.

use thiserror::Error;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("Cannot create a `KeywordSet` because no keywords were supplied")]
pub struct EmptyKeywordsError;

/// Returns `true` iff every keyword is a case-insensitive substring of `line`.
///
/// An empty keyword slice matches everything; callers that must reject that case
/// should build a [`KeywordSet`] instead.
#[must_use]
#[inline]
pub fn matches<K: AsRef<str>>(line: &str, keywords: &[K]) -> bool {
    let line = line.to_lowercase();
    keywords
        .iter()
        .all(|keyword| line.contains(&keyword.as_ref().to_lowercase()))
}

/// A non-empty, ordered set of keywords, stored lowercased.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct KeywordSet(Box<[String]>);

impl KeywordSet {
    /// Build a keyword set from a whitespace-separated list, e.g. `"movie 1080p"`.
    #[allow(clippy::missing_errors_doc)]
    #[inline]
    pub fn parse(list: &str) -> Result<Self, EmptyKeywordsError> {
        Self::try_from_iter(list.split_whitespace())
    }

    #[allow(clippy::missing_errors_doc)]
    #[inline]
    pub fn try_from_iter<I, S>(keywords: I) -> Result<Self, EmptyKeywordsError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let keywords: Box<[String]> = keywords
            .into_iter()
            .map(|keyword| keyword.as_ref().trim().to_lowercase())
            .filter(|keyword| !keyword.is_empty())
            .collect();
        if keywords.is_empty() {
            Err(EmptyKeywordsError)
        } else {
            Ok(Self(keywords))
        }
    }

    #[must_use]
    #[inline]
    pub fn matches(&self, line: &str) -> bool {
        matches(line, &self.0)
    }

    #[allow(clippy::len_without_is_empty)]
    #[must_use]
    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }
}
