//! The structured `custom` attribute.
//!
//! Elements may carry a `custom` attribute mixing tagged groups and flat
//! pairs, e.g. `readingOrder {index:2;} readingOrientation: -1.5; x-height: 12px;`.
//! [`CustomAttr`] parses it into ordered maps, exposes the typed values used
//! by the crop and rotation code and serializes back to the same syntax.

use std::fmt;

use indexmap::IndexMap;

use crate::error::{LayoutError, Result};

use super::elements::ReadingDirection;

/// Parsed `custom` attribute.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CustomAttr {
    groups: IndexMap<String, IndexMap<String, String>>,
    pairs: IndexMap<String, String>,
}

fn malformed(value: &str, msg: &str) -> LayoutError {
    LayoutError::validation(format!("malformed custom attribute {value:?}: {msg}"))
}

fn parse_pair(source: &str, text: &str) -> Result<(String, String)> {
    let (key, value) = text
        .split_once(':')
        .ok_or_else(|| malformed(source, "expected key:value"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(malformed(source, "empty key"));
    }
    Ok((key.to_string(), value.trim().to_string()))
}

impl CustomAttr {
    pub fn parse(value: &str) -> Result<Self> {
        let mut attr = CustomAttr::default();
        let mut rest = value.trim_start();

        while !rest.is_empty() {
            let Some(pos) = rest.find(['{', ':', ';']) else {
                return Err(malformed(value, "trailing text"));
            };
            let ident = rest[..pos].trim();
            match rest.as_bytes()[pos] {
                b'{' => {
                    if ident.is_empty() {
                        return Err(malformed(value, "group without a tag"));
                    }
                    let body_len = rest[pos + 1..]
                        .find('}')
                        .ok_or_else(|| malformed(value, "unterminated group"))?;
                    let body = &rest[pos + 1..pos + 1 + body_len];
                    let mut group = IndexMap::new();
                    for item in body.split(';').map(str::trim).filter(|s| !s.is_empty()) {
                        let (k, v) = parse_pair(value, item)?;
                        group.insert(k, v);
                    }
                    attr.groups.insert(ident.to_string(), group);
                    rest = &rest[pos + 1 + body_len + 1..];
                }
                b':' => {
                    let end = rest[pos..].find(';').map_or(rest.len(), |e| pos + e);
                    let (k, v) = parse_pair(value, &rest[..end])?;
                    attr.pairs.insert(k, v);
                    rest = rest.get(end + 1..).unwrap_or("");
                }
                _ => {
                    if !ident.is_empty() {
                        return Err(malformed(value, "key without value"));
                    }
                    rest = &rest[pos + 1..];
                }
            }
            rest = rest.trim_start();
        }
        Ok(attr)
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty() && self.pairs.is_empty()
    }

    /// Value of a flat `key: value;` pair.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs.get(key).map(String::as_str)
    }

    pub fn set(&mut self, key: &str, value: &str) {
        self.pairs.insert(key.to_string(), value.to_string());
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.pairs.shift_remove(key)
    }

    /// Value inside a `tag {key:value;}` group.
    pub fn group_value(&self, tag: &str, key: &str) -> Option<&str> {
        self.groups.get(tag)?.get(key).map(String::as_str)
    }

    pub fn set_group_value(&mut self, tag: &str, key: &str, value: &str) {
        self.groups
            .entry(tag.to_string())
            .or_default()
            .insert(key.to_string(), value.to_string());
    }

    fn number(&self, key: &str, unit: Option<&str>) -> Result<Option<f64>> {
        let Some(raw) = self.get(key) else {
            return Ok(None);
        };
        let digits = match unit {
            Some(u) => raw.strip_suffix(u).unwrap_or(raw).trim(),
            None => raw,
        };
        digits
            .parse::<f64>()
            .map(Some)
            .map_err(|_| LayoutError::validation(format!("invalid {key} value: {raw:?}")))
    }

    /// `readingOrientation` in degrees.
    pub fn reading_orientation(&self) -> Result<Option<f64>> {
        self.number("readingOrientation", None)
    }

    /// `x-height` in pixels (`12px` or `12`).
    pub fn x_height(&self) -> Result<Option<f64>> {
        self.number("x-height", Some("px"))
    }

    /// `readingDirection` given as `ltr`, `rtl`, `ttb` or `btt`.
    pub fn reading_direction(&self) -> Result<Option<ReadingDirection>> {
        self.get("readingDirection")
            .map(|code| {
                ReadingDirection::from_code(code).ok_or_else(|| {
                    LayoutError::validation(format!("invalid readingDirection: {code:?}"))
                })
            })
            .transpose()
    }
}

impl fmt::Display for CustomAttr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (tag, group) in &self.groups {
            if !first {
                f.write_str(" ")?;
            }
            first = false;
            write!(f, "{tag} {{")?;
            for (k, v) in group {
                write!(f, "{k}:{v};")?;
            }
            f.write_str("}")?;
        }
        for (k, v) in &self.pairs {
            if !first {
                f.write_str(" ")?;
            }
            first = false;
            write!(f, "{k}: {v};")?;
        }
        Ok(())
    }
}
