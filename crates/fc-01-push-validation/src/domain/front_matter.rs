//! Post body documents.
//!
//! A post commit's `body` file is YAML front matter between `---` lines
//! followed by free-text content:
//!
//! ```text
//! ---
//! title: Crash on start
//! labels: [bug]
//! ---
//! The node panics when...
//! ```

use super::errors::FieldError;
use serde_yaml::{Mapping, Value};

pub const FIELD_TITLE: &str = "title";
pub const FIELD_REPLY_TO: &str = "replyTo";
pub const FIELD_REACTIONS: &str = "reactions";
pub const FIELD_CLOSE: &str = "close";
pub const FIELD_LABELS: &str = "labels";
pub const FIELD_ASSIGNEES: &str = "assignees";
pub const FIELD_BASE: &str = "base";
pub const FIELD_BASE_HASH: &str = "baseHash";
pub const FIELD_TARGET: &str = "target";
pub const FIELD_TARGET_HASH: &str = "targetHash";

const COMMON_FIELDS: &[&str] = &[FIELD_TITLE, FIELD_REPLY_TO, FIELD_REACTIONS, FIELD_CLOSE];
const ISSUE_FIELDS: &[&str] = &[FIELD_LABELS, FIELD_ASSIGNEES];
const MERGE_REQUEST_FIELDS: &[&str] = &[FIELD_BASE, FIELD_BASE_HASH, FIELD_TARGET, FIELD_TARGET_HASH];

const DELIMITER: &str = "---";

/// Which post flavour a body belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostKind {
    Issue,
    MergeRequest,
}

impl PostKind {
    fn allows(self, key: &str) -> bool {
        COMMON_FIELDS.contains(&key)
            || match self {
                Self::Issue => ISSUE_FIELDS.contains(&key),
                Self::MergeRequest => MERGE_REQUEST_FIELDS.contains(&key),
            }
    }
}

/// A split but not yet validated body file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PostDocument {
    pub front_matter: Mapping,
    pub content: String,
}

impl PostDocument {
    /// Split raw body bytes into front matter and content.
    pub fn parse(raw: &[u8]) -> Result<Self, String> {
        let text = std::str::from_utf8(raw).map_err(|_| "body is not valid utf-8".to_string())?;

        let Some(rest) = strip_delimiter_line(text) else {
            return Ok(Self {
                front_matter: Mapping::new(),
                content: text.to_string(),
            });
        };

        let (yaml, content) = split_at_closing_delimiter(rest)
            .ok_or_else(|| "front matter is not terminated".to_string())?;

        let front_matter = match serde_yaml::from_str::<Value>(yaml).map_err(|e| e.to_string())? {
            Value::Null => Mapping::new(),
            Value::Mapping(map) => map,
            _ => return Err("front matter must be a key/value mapping".to_string()),
        };

        Ok(Self {
            front_matter,
            content: content.to_string(),
        })
    }
}

fn strip_delimiter_line(text: &str) -> Option<&str> {
    let rest = text.strip_prefix(DELIMITER)?;
    rest.strip_prefix("\r\n").or_else(|| rest.strip_prefix('\n'))
}

fn split_at_closing_delimiter(text: &str) -> Option<(&str, &str)> {
    let mut offset = 0;
    for line in text.split_inclusive('\n') {
        if line.trim_end_matches(['\r', '\n']) == DELIMITER {
            return Some((&text[..offset], &text[offset + line.len()..]));
        }
        offset += line.len();
    }
    None
}

/// Typed front matter of a post commit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostFrontMatter {
    pub title: Option<String>,
    pub reply_to: Option<String>,
    pub reactions: Option<Vec<String>>,
    pub close: Option<bool>,
    pub labels: Option<Vec<String>>,
    pub assignees: Option<Vec<String>>,
    pub base: Option<String>,
    pub base_hash: Option<String>,
    pub target: Option<String>,
    pub target_hash: Option<String>,
}

impl PostFrontMatter {
    /// Decode a raw mapping for `kind`.
    ///
    /// Every key is checked against the kind's allow-list before any value is
    /// type-checked.
    pub fn decode(map: &Mapping, kind: PostKind) -> Result<Self, FieldError> {
        for key in map.keys() {
            let name = key
                .as_str()
                .ok_or_else(|| FieldError::new(format!("{:?}", key), "unexpected field"))?;
            if !kind.allows(name) {
                return Err(FieldError::new(name, "unexpected field"));
            }
        }

        let fm = Self {
            title: string_field(map, FIELD_TITLE)?,
            reply_to: string_field(map, FIELD_REPLY_TO)?,
            reactions: string_list_field(map, FIELD_REACTIONS)?,
            close: bool_field(map, FIELD_CLOSE)?,
            labels: string_list_field(map, FIELD_LABELS)?,
            assignees: string_list_field(map, FIELD_ASSIGNEES)?,
            base: string_field(map, FIELD_BASE)?,
            base_hash: string_field(map, FIELD_BASE_HASH)?,
            target: string_field(map, FIELD_TARGET)?,
            target_hash: string_field(map, FIELD_TARGET_HASH)?,
        };
        Ok(fm)
    }

    /// Title, empty when unset.
    pub fn title(&self) -> &str {
        self.title.as_deref().unwrap_or_default()
    }

    /// Reply target, empty when unset.
    pub fn reply_to(&self) -> &str {
        self.reply_to.as_deref().unwrap_or_default()
    }
}

fn string_field(map: &Mapping, key: &str) -> Result<Option<String>, FieldError> {
    match map.get(key) {
        None => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(FieldError::new(key, "expected a string value")),
    }
}

fn string_list_field(map: &Mapping, key: &str) -> Result<Option<Vec<String>>, FieldError> {
    let invalid = || FieldError::new(key, "expected a list of string values");
    match map.get(key) {
        None => Ok(None),
        Some(Value::Sequence(items)) => items
            .iter()
            .map(|v| v.as_str().map(str::to_string).ok_or_else(invalid))
            .collect::<Result<Vec<_>, _>>()
            .map(Some),
        Some(_) => Err(invalid()),
    }
}

fn bool_field(map: &Mapping, key: &str) -> Result<Option<bool>, FieldError> {
    match map.get(key) {
        None => Ok(None),
        Some(Value::Bool(b)) => Ok(Some(*b)),
        Some(_) => Err(FieldError::new(key, "expected a boolean value")),
    }
}
