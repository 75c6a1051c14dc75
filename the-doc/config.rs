//! Schema description format.
//!
//! A [`SchemaSpec`] is the only configuration surface of the engine. It maps
//! node kind names to [`NodeSpec`]s and mark names to [`MarkSpec`]s and can be
//! read from TOML or JSON:
//!
//! ```toml
//! [nodes.doc]
//! content = "block+"
//!
//! [nodes.paragraph]
//! content = "inline*"
//! group = "block"
//!
//! [nodes.text]
//! group = "inline"
//!
//! [marks.link]
//! attrs.href = {}
//! ```
//!
//! Declaration order matters: it fixes the rank of marks (and so the
//! canonical order of mark sets) and picks the default block kind.

use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ConfigError>;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
  #[error("failed to parse schema description: {0}")]
  Toml(#[from] toml::de::Error),
  #[error("failed to parse schema description: {0}")]
  Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SchemaSpec {
  pub nodes: IndexMap<String, NodeSpec>,
  pub marks: IndexMap<String, MarkSpec>,
}

impl SchemaSpec {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn from_toml(source: &str) -> Result<Self> {
    Ok(toml::from_str(source)?)
  }

  pub fn from_json(source: &str) -> Result<Self> {
    Ok(serde_json::from_str(source)?)
  }

  /// The built-in rich text schema.
  pub fn builtin() -> Result<Self> {
    Self::from_toml(include_str!("schema.toml"))
  }

  #[must_use]
  pub fn node(mut self, name: impl Into<String>, spec: NodeSpec) -> Self {
    self.nodes.insert(name.into(), spec);
    self
  }

  #[must_use]
  pub fn mark(mut self, name: impl Into<String>, spec: MarkSpec) -> Self {
    self.marks.insert(name.into(), spec);
    self
  }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NodeSpec {
  /// Content expression. Absent or empty means the kind is a leaf.
  pub content: Option<String>,
  /// Space separated group labels.
  pub group:   Option<String>,
  pub attrs:   IndexMap<String, AttrSpec>,
  /// Marks allowed on the children of this kind. `"_"` allows every mark,
  /// `""` none, anything else is a space separated list of mark names. When
  /// absent, inline-content kinds allow every mark and others allow none.
  pub marks:   Option<String>,
}

impl NodeSpec {
  pub fn new(content: impl Into<String>) -> Self {
    Self {
      content: Some(content.into()),
      ..Self::default()
    }
  }

  pub fn leaf() -> Self {
    Self::default()
  }

  #[must_use]
  pub fn group(mut self, group: impl Into<String>) -> Self {
    self.group = Some(group.into());
    self
  }

  #[must_use]
  pub fn attr(mut self, name: impl Into<String>, spec: AttrSpec) -> Self {
    self.attrs.insert(name.into(), spec);
    self
  }

  #[must_use]
  pub fn marks(mut self, marks: impl Into<String>) -> Self {
    self.marks = Some(marks.into());
    self
  }

  pub fn groups(&self) -> impl Iterator<Item = &str> {
    self.group.as_deref().unwrap_or_default().split_whitespace()
  }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MarkSpec {
  pub attrs: IndexMap<String, AttrSpec>,
}

impl MarkSpec {
  pub fn new() -> Self {
    Self::default()
  }

  #[must_use]
  pub fn attr(mut self, name: impl Into<String>, spec: AttrSpec) -> Self {
    self.attrs.insert(name.into(), spec);
    self
  }
}

/// An attribute definition. Attributes without a default are required.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AttrSpec {
  pub default: Option<Value>,
}

impl AttrSpec {
  pub fn required() -> Self {
    Self { default: None }
  }

  pub fn with_default(value: impl Into<Value>) -> Self {
    Self {
      default: Some(value.into()),
    }
  }

  pub fn is_required(&self) -> bool {
    self.default.is_none()
  }
}

#[cfg(test)]
mod test {
  use super::*;

  #[test]
  fn builtin_parses_in_declaration_order() {
    let spec = SchemaSpec::builtin().unwrap();
    let names: Vec<_> = spec.nodes.keys().map(String::as_str).take(3).collect();
    assert_eq!(names, ["doc", "paragraph", "blockquote"]);
    let marks: Vec<_> = spec.marks.keys().map(String::as_str).collect();
    assert_eq!(marks, ["em", "strong", "link", "code"]);

    let heading = &spec.nodes["heading"];
    assert_eq!(heading.content.as_deref(), Some("inline*"));
    assert_eq!(heading.attrs["level"].default, Some(Value::from(1)));
    assert!(spec.marks["link"].attrs["href"].is_required());
  }

  #[test]
  fn json_description() {
    let spec = SchemaSpec::from_json(
      r#"{
        "nodes": {
          "doc": { "content": "block+" },
          "paragraph": { "content": "text*", "group": "block" },
          "text": {}
        },
        "marks": { "strong": {} }
      }"#,
    )
    .unwrap();
    assert_eq!(spec.nodes.len(), 3);
    assert_eq!(spec.nodes["paragraph"].groups().collect::<Vec<_>>(), ["block"]);
    assert_eq!(spec.marks.len(), 1);
  }

  #[test]
  fn unknown_keys_are_rejected() {
    let err = SchemaSpec::from_toml("[nodes.doc]\ncontent = \"block+\"\ninline = true\n");
    assert!(matches!(err, Err(ConfigError::Toml(_))));
  }

  #[test]
  fn builder_matches_parsed() {
    let built = SchemaSpec::new()
      .node("doc", NodeSpec::new("block+"))
      .node("paragraph", NodeSpec::new("inline*").group("block"))
      .node("text", NodeSpec::leaf().group("inline"))
      .mark("link", MarkSpec::new().attr("href", AttrSpec::required()));
    let parsed = SchemaSpec::from_toml(
      r#"
[nodes.doc]
content = "block+"

[nodes.paragraph]
content = "inline*"
group = "block"

[nodes.text]
group = "inline"

[marks.link]
attrs.href = {}
"#,
    )
    .unwrap();
    assert_eq!(built, parsed);
  }
}
