// ── Reply sentences ──
//
// Every reply opens with a type word (`!re`, `!done`, `!trap`,
// `!fatal`, `!empty`) followed by `=key=value` attribute words and an
// optional `.tag=` word.

use std::collections::BTreeMap;

use crate::error::Error;

use super::codec::Sentence;

/// Attribute words of a reply, keyed by name (`.id`, `name`, `comment`...).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Attributes(BTreeMap<String, String>);

impl Attributes {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Owned copy of a value, empty strings treated as absent.
    pub fn text(&self, key: &str) -> Option<String> {
        self.get(key).filter(|v| !v.is_empty()).map(str::to_owned)
    }

    /// RouterOS booleans are spelled `true`/`false` or `yes`/`no`.
    pub fn flag(&self, key: &str) -> bool {
        matches!(self.get(key), Some("true" | "yes"))
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Build attributes from `(key, value)` pairs.
    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        Self(
            pairs
                .into_iter()
                .map(|(k, v)| (k.to_owned(), v.to_owned()))
                .collect(),
        )
    }

    /// Encode as `=key=value` words for a reply or command.
    pub fn to_words(&self) -> impl Iterator<Item = String> + '_ {
        self.0.iter().map(|(k, v)| format!("={k}={v}"))
    }
}

/// A decoded reply sentence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// One row of data.
    Re(Attributes),
    /// Command finished. May carry attributes (`=ret=` on add or login).
    Done(Attributes),
    /// Command refused. Always followed by `!done`.
    Trap(Attributes),
    /// Connection is being closed by the router.
    Fatal(String),
    /// Print with no matching rows (RouterOS 7.18+).
    Empty,
}

impl TryFrom<Sentence> for Reply {
    type Error = Error;

    fn try_from(sentence: Sentence) -> Result<Self, Error> {
        let mut words = sentence.into_words().into_iter();
        let head = words
            .next()
            .ok_or_else(|| Error::Protocol("empty reply sentence".into()))?;

        if head == "!fatal" {
            let message = words.collect::<Vec<_>>().join(" ");
            return Ok(Self::Fatal(message));
        }

        let mut attrs = Attributes::default();
        for word in words {
            if let Some(rest) = word.strip_prefix('=') {
                // Values may contain '=', so split on the first one only.
                let (key, value) = rest.split_once('=').unwrap_or((rest, ""));
                attrs.insert(key, value);
            } else if let Some(tag) = word.strip_prefix(".tag=") {
                attrs.insert(".tag", tag);
            }
        }

        match head.as_str() {
            "!re" => Ok(Self::Re(attrs)),
            "!done" => Ok(Self::Done(attrs)),
            "!trap" => Ok(Self::Trap(attrs)),
            "!empty" => Ok(Self::Empty),
            other => Err(Error::Protocol(format!("unexpected reply word '{other}'"))),
        }
    }
}

/// Convert a `!trap` attribute set into an error.
pub(crate) fn trap_error(attrs: &Attributes) -> Error {
    Error::Trap {
        category: attrs.get("category").and_then(|c| c.parse().ok()),
        message: attrs
            .text("message")
            .unwrap_or_else(|| "command failed".into()),
    }
}
