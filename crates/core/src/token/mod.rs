//! Opaque identifiers carrying an entry's provenance between catalog
//! listing and link resolution.
//!
//! Wire format: `KEY::VALUE` records joined by `|`. Keys and values are
//! percent-encoded, so neither separator can appear inside data. Source
//! records use the key `@<source id>`; the reserved keys are `TITLE`,
//! `SEASON` and `EPISODE`.
//!
//! ```text
//! @alpha::https%3A%2F%2Falpha%2Fm%2F1|@beta::b%2F7|TITLE::Gladiator
//! ```
//!
//! Tokens are only exchanged with the same build; the format is not
//! versioned.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::catalog::{SourceRef, UnifiedEntry};

const RECORD_SEPARATOR: char = '|';
const KEY_VALUE_SEPARATOR: &str = "::";
const SOURCE_KEY_PREFIX: char = '@';
const TITLE_KEY: &str = "TITLE";
const SEASON_KEY: &str = "SEASON";
const EPISODE_KEY: &str = "EPISODE";

/// Why a token string could not be decoded.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("Token is empty")]
    Empty,

    #[error("Token record has no key: {0}")]
    MissingSeparator(String),

    #[error("Token record is not valid percent-encoding: {0}")]
    InvalidEncoding(String),

    #[error("Token {key} is not a number: {value}")]
    InvalidNumber { key: String, value: String },

    #[error("Unknown token key: {0}")]
    UnknownKey(String),

    #[error("Duplicate token key: {0}")]
    DuplicateKey(String),

    #[error("Token has no sources")]
    NoSources,
}

/// Which sources back an entry, plus what is needed to find it elsewhere.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentToken {
    /// `(source id, url)` pairs, unique by source id.
    pub sources: Vec<SourceRef>,
    /// Title used for cross-source lookups.
    pub title: Option<String>,
    pub season: Option<u32>,
    pub episode: Option<u32>,
}

impl ContentToken {
    /// Token for a whole entry.
    pub fn from_entry(entry: &UnifiedEntry) -> Self {
        Self {
            sources: entry.sources.clone(),
            title: Some(entry.display_title.clone()),
            season: None,
            episode: None,
        }
    }

    /// Narrow the token to one episode.
    pub fn with_episode(mut self, season: Option<u32>, episode: Option<u32>) -> Self {
        self.season = season;
        self.episode = episode;
        self
    }

    pub fn is_episode(&self) -> bool {
        self.season.is_some() || self.episode.is_some()
    }

    /// URL for `source_id`, if this token carries it.
    pub fn url_for(&self, source_id: &str) -> Option<&str> {
        self.sources
            .iter()
            .find(|s| s.source_id == source_id)
            .map(|s| s.url.as_str())
    }

    /// Serialize to the wire format.
    pub fn encode(&self) -> String {
        let mut records: Vec<String> = self
            .sources
            .iter()
            .map(|s| {
                format!(
                    "{}{}{}{}",
                    SOURCE_KEY_PREFIX,
                    urlencoding::encode(&s.source_id),
                    KEY_VALUE_SEPARATOR,
                    urlencoding::encode(&s.url)
                )
            })
            .collect();

        if let Some(title) = &self.title {
            records.push(record(TITLE_KEY, &urlencoding::encode(title)));
        }
        if let Some(season) = self.season {
            records.push(record(SEASON_KEY, &season.to_string()));
        }
        if let Some(episode) = self.episode {
            records.push(record(EPISODE_KEY, &episode.to_string()));
        }

        records.join(&RECORD_SEPARATOR.to_string())
    }

    /// Parse the wire format.
    ///
    /// A repeated source id keeps its first URL. A repeated reserved key is
    /// an error.
    pub fn decode(token: &str) -> Result<Self, TokenError> {
        if token.is_empty() {
            return Err(TokenError::Empty);
        }

        let mut decoded = ContentToken::default();
        for raw in token.split(RECORD_SEPARATOR) {
            let (raw_key, raw_value) = raw
                .split_once(KEY_VALUE_SEPARATOR)
                .ok_or_else(|| TokenError::MissingSeparator(raw.to_string()))?;
            let key = unescape(raw_key)?;
            let value = unescape(raw_value)?;

            if let Some(source_id) = key.strip_prefix(SOURCE_KEY_PREFIX) {
                if source_id.is_empty() {
                    return Err(TokenError::UnknownKey(key));
                }
                if decoded.url_for(source_id).is_none() {
                    decoded.sources.push(SourceRef::new(source_id, value));
                }
                continue;
            }

            match key.as_str() {
                TITLE_KEY => set_once(&mut decoded.title, &key, value)?,
                SEASON_KEY => set_once(&mut decoded.season, &key, parse_number(&key, &value)?)?,
                EPISODE_KEY => set_once(&mut decoded.episode, &key, parse_number(&key, &value)?)?,
                _ => return Err(TokenError::UnknownKey(key)),
            }
        }

        if decoded.sources.is_empty() {
            return Err(TokenError::NoSources);
        }
        Ok(decoded)
    }
}

impl fmt::Display for ContentToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

impl FromStr for ContentToken {
    type Err = TokenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::decode(s)
    }
}

/// Encode `entry`, optionally narrowed to one episode.
pub fn encode(entry: &UnifiedEntry, season: Option<u32>, episode: Option<u32>) -> String {
    ContentToken::from_entry(entry)
        .with_episode(season, episode)
        .encode()
}

/// Decode a token string.
pub fn decode(token: &str) -> Result<ContentToken, TokenError> {
    ContentToken::decode(token)
}

fn record(key: &str, value: &str) -> String {
    format!("{}{}{}", key, KEY_VALUE_SEPARATOR, value)
}

fn unescape(raw: &str) -> Result<String, TokenError> {
    urlencoding::decode(raw)
        .map(|s| s.into_owned())
        .map_err(|_| TokenError::InvalidEncoding(raw.to_string()))
}

fn parse_number(key: &str, value: &str) -> Result<u32, TokenError> {
    value.parse().map_err(|_| TokenError::InvalidNumber {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn set_once<T>(slot: &mut Option<T>, key: &str, value: T) -> Result<(), TokenError> {
    if slot.is_some() {
        return Err(TokenError::DuplicateKey(key.to_string()));
    }
    *slot = Some(value);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ContentKind;

    fn entry(title: &str, sources: &[(&str, &str)]) -> UnifiedEntry {
        UnifiedEntry {
            display_title: title.to_string(),
            normalized_title: title.to_lowercase(),
            poster_url: None,
            kind: ContentKind::Movie,
            sources: sources.iter().map(|(id, url)| SourceRef::new(*id, *url)).collect(),
        }
    }

    #[test]
    fn test_round_trip_entry() {
        let e = entry("Gladiator", &[("Source1", "s1/x"), ("Source2", "s2/y")]);

        let token = decode(&encode(&e, None, None)).unwrap();

        assert_eq!(token.sources, e.sources);
        assert_eq!(token.title.as_deref(), Some("Gladiator"));
        assert!(!token.is_episode());
    }

    #[test]
    fn test_round_trip_episode() {
        let e = entry("Dark", &[("alpha", "https://alpha/dark")]);

        let token = decode(&encode(&e, Some(2), Some(5))).unwrap();

        assert_eq!(token.season, Some(2));
        assert_eq!(token.episode, Some(5));
        assert!(token.is_episode());
    }

    #[test]
    fn test_separators_inside_data_survive() {
        let token = ContentToken {
            sources: vec![
                SourceRef::new("alpha", "https://alpha/watch?a=1|b::2&c=%20"),
                SourceRef::new("be|ta::", "b/1"),
            ],
            title: Some("Mission: Impossible || Fallout :: 100%".to_string()),
            season: None,
            episode: Some(3),
        };

        let encoded = token.encode();
        assert_eq!(encoded.matches(RECORD_SEPARATOR).count(), 3);

        assert_eq!(ContentToken::decode(&encoded).unwrap(), token);
    }

    #[test]
    fn test_unicode_title_round_trip() {
        let token = ContentToken {
            sources: vec![SourceRef::new("alpha", "a/1")],
            title: Some("Гладиатор 角斗士".to_string()),
            season: None,
            episode: None,
        };

        assert_eq!(token.to_string().parse::<ContentToken>().unwrap(), token);
    }

    #[test]
    fn test_encoded_form() {
        let e = entry("Heat", &[("alpha", "a/1")]);
        assert_eq!(encode(&e, Some(1), None), "@alpha::a%2F1|TITLE::Heat|SEASON::1");
    }

    #[test]
    fn test_duplicate_source_keeps_first() {
        let token = decode("@alpha::a%2F1|@alpha::a%2F2").unwrap();
        assert_eq!(token.sources, vec![SourceRef::new("alpha", "a/1")]);
    }

    #[test]
    fn test_title_is_optional() {
        let token = decode("@alpha::a").unwrap();
        assert_eq!(token.title, None);
        assert_eq!(token.url_for("alpha"), Some("a"));
    }

    #[test]
    fn test_malformed_tokens() {
        assert_eq!(decode(""), Err(TokenError::Empty));
        assert!(matches!(
            decode("just some text"),
            Err(TokenError::MissingSeparator(_))
        ));
        assert_eq!(decode("TITLE::Heat"), Err(TokenError::NoSources));
        assert!(matches!(
            decode("@alpha::a|SEASON::two"),
            Err(TokenError::InvalidNumber { .. })
        ));
        assert!(matches!(
            decode("@alpha::a|SEASON::-1"),
            Err(TokenError::InvalidNumber { .. })
        ));
        assert_eq!(
            decode("@alpha::a|YEAR::2000"),
            Err(TokenError::UnknownKey("YEAR".to_string()))
        );
        assert_eq!(
            decode("@alpha::a|TITLE::x|TITLE::y"),
            Err(TokenError::DuplicateKey("TITLE".to_string()))
        );
        assert!(matches!(
            decode("@alpha::%FF"),
            Err(TokenError::InvalidEncoding(_))
        ));
        assert!(matches!(decode("@::a"), Err(TokenError::UnknownKey(_))));
    }
}
