//! YAML front-matter shape.
//!
//! `tags` and `children` accept either a YAML list or a single
//! comma-separated string in the source file — both read into a `Vec`.
//! Any key this struct doesn't name is captured in `extra` and written
//! back out verbatim, so a user's own front-matter fields survive a
//! writeback round-trip untouched.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A YAML scalar or comma-string, normalized to a `Vec<String>`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StringList(pub Vec<String>);

impl<'de> Deserialize<'de> for StringList {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            List(Vec<String>),
            Csv(String),
        }

        let repr = Option::<Repr>::deserialize(deserializer)?;
        Ok(match repr {
            Some(Repr::List(items)) => StringList(items),
            Some(Repr::Csv(s)) => StringList(
                s.split(',')
                    .map(|t| t.trim().to_string())
                    .filter(|t| !t.is_empty())
                    .collect(),
            ),
            None => StringList::default(),
        })
    }
}

impl Serialize for StringList {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.0.serialize(serializer)
    }
}

/// Recognized YAML front-matter fields, plus a catch-all for anything
/// else the user wrote.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NoteFrontmatter {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,

    #[serde(default, skip_serializing_if = "is_empty_list")]
    pub tags: StringList,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,

    #[serde(default, skip_serializing_if = "is_empty_list")]
    pub children: StringList,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub created: Option<DateTime<Utc>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated: Option<DateTime<Utc>>,

    #[serde(flatten)]
    pub extra: HashMap<String, serde_yaml::Value>,
}

fn is_empty_list(list: &StringList) -> bool {
    list.0.is_empty()
}

impl NoteFrontmatter {
    pub fn new(title: impl Into<String>) -> Self {
        NoteFrontmatter {
            title: Some(title.into()),
            created: Some(Utc::now()),
            ..Default::default()
        }
    }

    pub fn tags(&self) -> &[String] {
        &self.tags.0
    }

    pub fn children(&self) -> &[String] {
        &self.children.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_accepts_csv_string() {
        let yaml = "title: Test\ntags: a, b, c\n";
        let fm: NoteFrontmatter = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(
            fm.tags(),
            &["a".to_string(), "b".to_string(), "c".to_string()]
        );
    }

    #[test]
    fn tags_accepts_yaml_list() {
        let yaml = "title: Test\ntags:\n  - a\n  - b\n";
        let fm: NoteFrontmatter = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(fm.tags(), &["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn unknown_keys_preserved() {
        let yaml = "title: Test\nmood: curious\n";
        let fm: NoteFrontmatter = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(
            fm.extra.get("mood").and_then(|v| v.as_str()),
            Some("curious")
        );
        let back = serde_yaml::to_string(&fm).unwrap();
        assert!(back.contains("mood"));
    }

    #[test]
    fn missing_tags_default_to_empty() {
        let yaml = "title: Test\n";
        let fm: NoteFrontmatter = serde_yaml::from_str(yaml).unwrap();
        assert!(fm.tags().is_empty());
    }
}
