//! Node and mark vocabulary.
//!
//! A [`Schema`] is built once from a [`SchemaSpec`] and is immutable
//! afterwards. It owns exactly one root kind (`doc`) and one text kind
//! (`text`). Node and mark kinds are handed out as lightweight [`NodeType`] and
//! [`MarkType`] handles that keep the schema alive.
//!
//! Content validation on node creation follows the schema's [`Validation`]
//! mode: by default an invalid child sequence is logged and the node is built
//! anyway, [`Validation::Strict`] turns it into an error. Missing required
//! attributes are always an error.

use std::{
  collections::HashMap,
  fmt,
  num::NonZeroU64,
  sync::{
    Arc,
    atomic::{
      AtomicU64,
      Ordering,
    },
  },
};

use indexmap::IndexMap;
use smallvec::SmallVec;
use thiserror::Error;

use crate::{
  Attrs,
  Tendril,
  config::{
    AttrSpec,
    MarkSpec,
    NodeSpec,
    SchemaSpec,
  },
  content::{
    ContentError,
    ContentExpr,
    ContentMatch,
    ResolvedToken,
  },
  fragment::Fragment,
  mark::{
    Mark,
    MarkType,
    MarkTypeData,
  },
  node::{
    Node,
    NodeId,
  },
};

pub type Result<T> = std::result::Result<T, SchemaError>;

pub const TOP_NODE: &str = "doc";
pub const TEXT_NODE: &str = "text";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SchemaError {
  #[error("schema is missing the required {0:?} node kind")]
  MissingNodeKind(&'static str),
  #[error("the text node kind cannot declare content")]
  TextWithContent,
  #[error("invalid content expression for node kind {node:?}: {source}")]
  Content {
    node:   String,
    #[source]
    source: ContentError,
  },
  #[error("content expression of {node:?} refers to unknown kind or group {name:?}")]
  UnknownContentName { node: String, name: String },
  #[error("node kind {node:?} allows unknown mark {mark:?}")]
  UnknownAllowedMark { node: String, mark: String },
  #[error("unknown node kind {0:?}")]
  UnknownNodeType(String),
  #[error("unknown mark kind {0:?}")]
  UnknownMarkType(String),
  #[error("text nodes are created with Schema::text")]
  TextViaCreate,
  #[error("no value for required attribute {attr:?} of {owner:?}")]
  MissingAttribute { owner: String, attr: String },
  #[error("invalid content for node {node:?}: [{content}]")]
  InvalidContent { node: String, content: String },
}

/// How node creation reacts to content that does not match the kind's
/// content expression.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Validation {
  /// Log a warning and build the node anyway.
  #[default]
  Warn,
  /// Refuse to build the node.
  Strict,
}

#[derive(Clone)]
pub struct Schema(Arc<SchemaInner>);

struct SchemaInner {
  nodes:         Vec<NodeTypeData>,
  marks:         Vec<MarkTypeData>,
  node_index:    HashMap<String, usize>,
  mark_index:    HashMap<String, usize>,
  top:           usize,
  text:          usize,
  default_block: Option<usize>,
  validation:    Validation,
  next_id:       AtomicU64,
}

pub(crate) struct NodeTypeData {
  name:           String,
  groups:         SmallVec<[String; 2]>,
  content:        ContentExpr,
  matcher:        ContentMatch,
  attrs:          IndexMap<String, AttrSpec>,
  /// `None` allows every mark.
  allowed_marks:  Option<Vec<usize>>,
  is_text:        bool,
  is_inline:      bool,
  inline_content: bool,
}

impl Schema {
  pub fn new(spec: SchemaSpec) -> Result<Self> {
    Self::with_validation(spec, Validation::default())
  }

  pub fn with_validation(spec: SchemaSpec, validation: Validation) -> Result<Self> {
    let SchemaSpec { nodes, marks } = spec;

    let node_index: HashMap<String, usize> = nodes
      .keys()
      .enumerate()
      .map(|(index, name)| (name.clone(), index))
      .collect();
    let mark_index: HashMap<String, usize> = marks
      .keys()
      .enumerate()
      .map(|(index, name)| (name.clone(), index))
      .collect();

    let top = *node_index
      .get(TOP_NODE)
      .ok_or(SchemaError::MissingNodeKind(TOP_NODE))?;
    let text = *node_index
      .get(TEXT_NODE)
      .ok_or(SchemaError::MissingNodeKind(TEXT_NODE))?;

    // Group membership and inline-ness have to be known before content
    // expressions can be resolved.
    let groups: Vec<SmallVec<[String; 2]>> = nodes
      .values()
      .map(|spec| spec.groups().map(str::to_string).collect())
      .collect();
    let inline: Vec<bool> = groups
      .iter()
      .enumerate()
      .map(|(index, groups)| index == text || groups.iter().any(|group| group == "inline"))
      .collect();

    let mut node_data = Vec::with_capacity(nodes.len());
    for (index, (name, spec)) in nodes.into_iter().enumerate() {
      let NodeSpec {
        content,
        attrs,
        marks: allowed,
        ..
      } = spec;
      let content = ContentExpr::parse(content.as_deref().unwrap_or_default()).map_err(
        |source| SchemaError::Content {
          node: name.clone(),
          source,
        },
      )?;
      if index == text && !content.is_empty() {
        return Err(SchemaError::TextWithContent);
      }
      let matcher = resolve_content(&name, &content, &node_index, &groups)?;
      let inline_content = matcher
        .tokens()
        .iter()
        .any(|token| token.members.iter().any(|&member| inline[member]));
      let allowed_marks = resolve_allowed_marks(&name, allowed, inline_content, &mark_index)?;

      node_data.push(NodeTypeData {
        name,
        groups: groups[index].clone(),
        content,
        matcher,
        attrs,
        allowed_marks,
        is_text: index == text,
        is_inline: inline[index],
        inline_content,
      });
    }

    let default_block = node_data.iter().position(|data| {
      !data.is_inline && data.inline_content && node_data[top].matcher.admits(index_of(&node_index, &data.name))
    });

    let mark_data = marks
      .into_iter()
      .enumerate()
      .map(|(rank, (name, MarkSpec { attrs }))| MarkTypeData { name, rank, attrs })
      .collect();

    Ok(Self(Arc::new(SchemaInner {
      nodes: node_data,
      marks: mark_data,
      node_index,
      mark_index,
      top,
      text,
      default_block,
      validation,
      next_id: AtomicU64::new(0),
    })))
  }

  pub fn validation(&self) -> Validation {
    self.0.validation
  }

  pub fn node_type(&self, name: &str) -> Option<NodeType> {
    self.0.node_index.get(name).map(|&index| NodeType {
      schema: self.clone(),
      index,
    })
  }

  pub fn mark_type(&self, name: &str) -> Option<MarkType> {
    self
      .0
      .mark_index
      .get(name)
      .map(|&index| MarkType::new(self.clone(), index))
  }

  pub fn node_types(&self) -> impl Iterator<Item = NodeType> + '_ {
    (0..self.0.nodes.len()).map(|index| NodeType {
      schema: self.clone(),
      index,
    })
  }

  pub fn mark_types(&self) -> impl Iterator<Item = MarkType> + '_ {
    (0..self.0.marks.len()).map(|index| MarkType::new(self.clone(), index))
  }

  pub fn top_node_type(&self) -> NodeType {
    NodeType {
      schema: self.clone(),
      index:  self.0.top,
    }
  }

  pub fn text_type(&self) -> NodeType {
    NodeType {
      schema: self.clone(),
      index:  self.0.text,
    }
  }

  /// The kind used to wrap inline content that ends up where blocks are
  /// expected.
  pub fn default_block_type(&self) -> Option<NodeType> {
    self.0.default_block.map(|index| NodeType {
      schema: self.clone(),
      index,
    })
  }

  /// Create a node of the named kind.
  pub fn node(
    &self,
    name: &str,
    attrs: Option<Attrs>,
    content: impl Into<Fragment>,
    marks: Vec<Mark>,
  ) -> Result<Node> {
    self
      .node_type(name)
      .ok_or_else(|| SchemaError::UnknownNodeType(name.to_string()))?
      .create(attrs, content, marks)
  }

  /// Create a text run.
  pub fn text(&self, text: impl Into<Tendril>, marks: Vec<Mark>) -> Node {
    Node::new_text(self.text_type(), text.into(), Mark::set_from(marks))
  }

  /// Create a mark of the named kind.
  pub fn mark(&self, name: &str, attrs: Option<Attrs>) -> Result<Mark> {
    self
      .mark_type(name)
      .ok_or_else(|| SchemaError::UnknownMarkType(name.to_string()))?
      .create(attrs)
  }

  pub fn ptr_eq(&self, other: &Schema) -> bool {
    Arc::ptr_eq(&self.0, &other.0)
  }

  pub(crate) fn next_id(&self) -> NodeId {
    let raw = self.0.next_id.fetch_add(1, Ordering::Relaxed);
    NodeId::new(NonZeroU64::MIN.saturating_add(raw))
  }

  pub(crate) fn mark_data(&self, index: usize) -> &MarkTypeData {
    &self.0.marks[index]
  }
}

impl fmt::Debug for Schema {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Schema")
      .field("nodes", &self.0.nodes.iter().map(|n| &n.name).collect::<Vec<_>>())
      .field("marks", &self.0.marks.iter().map(|m| &m.name).collect::<Vec<_>>())
      .field("validation", &self.0.validation)
      .finish()
  }
}

fn index_of(index: &HashMap<String, usize>, name: &str) -> usize {
  index.get(name).copied().unwrap_or(usize::MAX)
}

fn resolve_content(
  node: &str,
  content: &ContentExpr,
  node_index: &HashMap<String, usize>,
  groups: &[SmallVec<[String; 2]>],
) -> Result<ContentMatch> {
  let mut tokens = Vec::with_capacity(content.tokens().len());
  for token in content.tokens() {
    let mut members: SmallVec<[usize; 4]> = SmallVec::new();
    for name in &token.names {
      if let Some(&index) = node_index.get(name) {
        members.push(index);
        continue;
      }
      let before = members.len();
      members.extend(
        groups
          .iter()
          .enumerate()
          .filter(|(_, groups)| groups.iter().any(|group| group == name))
          .map(|(index, _)| index),
      );
      if members.len() == before {
        return Err(SchemaError::UnknownContentName {
          node: node.to_string(),
          name: name.clone(),
        });
      }
    }
    members.sort_unstable();
    members.dedup();
    tokens.push(ResolvedToken {
      members,
      quant: token.quant,
    });
  }
  Ok(ContentMatch::new(tokens))
}

fn resolve_allowed_marks(
  node: &str,
  allowed: Option<String>,
  inline_content: bool,
  mark_index: &HashMap<String, usize>,
) -> Result<Option<Vec<usize>>> {
  let Some(allowed) = allowed else {
    return Ok(if inline_content { None } else { Some(Vec::new()) });
  };
  if allowed.trim() == "_" {
    return Ok(None);
  }
  allowed
    .split_whitespace()
    .map(|mark| {
      mark_index
        .get(mark)
        .copied()
        .ok_or_else(|| SchemaError::UnknownAllowedMark {
          node: node.to_string(),
          mark: mark.to_string(),
        })
    })
    .collect::<Result<Vec<_>>>()
    .map(Some)
}

/// Fill in defaults for omitted attributes and reject missing required ones.
/// Attributes the kind does not declare are dropped.
pub(crate) fn compute_attrs(
  owner: &str,
  specs: &IndexMap<String, AttrSpec>,
  given: Option<Attrs>,
) -> Result<Attrs> {
  let mut given = given.unwrap_or_default();
  let mut attrs = Attrs::new();
  for (name, spec) in specs {
    let value = match (given.remove(name), &spec.default) {
      (Some(value), _) => value,
      (None, Some(default)) => default.clone(),
      (None, None) => {
        return Err(SchemaError::MissingAttribute {
          owner: owner.to_string(),
          attr:  name.clone(),
        });
      },
    };
    attrs.insert(name.clone(), value);
  }
  for name in given.keys() {
    tracing::debug!(owner, attr = %name, "dropping undeclared attribute");
  }
  Ok(attrs)
}

/// A node kind of some [`Schema`].
#[derive(Clone)]
pub struct NodeType {
  schema: Schema,
  index:  usize,
}

impl NodeType {
  #[inline]
  fn data(&self) -> &NodeTypeData {
    &self.schema.0.nodes[self.index]
  }

  pub fn schema(&self) -> &Schema {
    &self.schema
  }

  pub fn index(&self) -> usize {
    self.index
  }

  pub fn name(&self) -> &str {
    &self.data().name
  }

  pub fn groups(&self) -> &[String] {
    &self.data().groups
  }

  pub fn is_in_group(&self, group: &str) -> bool {
    self.data().groups.iter().any(|g| g == group)
  }

  pub fn content_expr(&self) -> &ContentExpr {
    &self.data().content
  }

  pub fn content_match(&self) -> &ContentMatch {
    &self.data().matcher
  }

  pub fn attr_specs(&self) -> &IndexMap<String, AttrSpec> {
    &self.data().attrs
  }

  pub fn is_text(&self) -> bool {
    self.data().is_text
  }

  pub fn is_inline(&self) -> bool {
    self.data().is_inline
  }

  pub fn is_block(&self) -> bool {
    !self.data().is_inline
  }

  /// Leaf kinds have no content expression. Non-text leaves have a node size
  /// of one.
  pub fn is_leaf(&self) -> bool {
    self.data().content.is_empty()
  }

  pub fn is_atom(&self) -> bool {
    self.is_leaf() && !self.is_text()
  }

  pub fn is_container(&self) -> bool {
    !self.is_leaf()
  }

  /// Whether the content expression admits inline kinds.
  pub fn inline_content(&self) -> bool {
    self.data().inline_content
  }

  pub fn is_textblock(&self) -> bool {
    self.is_block() && self.inline_content()
  }

  pub fn allows_mark_type(&self, mark: &MarkType) -> bool {
    mark.schema().ptr_eq(&self.schema) &&
      self
        .data()
        .allowed_marks
        .as_ref()
        .is_none_or(|allowed| allowed.contains(&mark.rank()))
  }

  pub fn allows_marks(&self, marks: &[Mark]) -> bool {
    marks.iter().all(|mark| self.allows_mark_type(mark.ty()))
  }

  pub fn compute_attrs(&self, attrs: Option<Attrs>) -> Result<Attrs> {
    compute_attrs(self.name(), self.attr_specs(), attrs)
  }

  /// Whether `content` is a valid child sequence for this kind.
  pub fn valid_content(&self, content: &Fragment) -> bool {
    let mut children: SmallVec<[usize; 16]> = SmallVec::with_capacity(content.child_count());
    for child in content.iter() {
      let ty = child.node_type();
      if !ty.schema.ptr_eq(&self.schema) || !self.allows_marks(child.marks()) {
        return false;
      }
      children.push(ty.index);
    }
    self.data().matcher.matches(&children)
  }

  /// Validate `content` according to the schema's [`Validation`] mode.
  pub fn check_content(&self, content: &Fragment) -> Result<()> {
    if self.valid_content(content) {
      return Ok(());
    }
    let described = describe(content);
    match self.schema.validation() {
      Validation::Warn => {
        tracing::warn!(
          node = self.name(),
          expr = self.content_expr().source(),
          content = %described,
          "content does not match the node kind's content expression"
        );
        Ok(())
      },
      Validation::Strict => Err(SchemaError::InvalidContent {
        node:    self.name().to_string(),
        content: described,
      }),
    }
  }

  /// Create a node of this kind. Attributes are defaulted, content is checked
  /// against the content expression and marks are put in canonical order.
  pub fn create(
    &self,
    attrs: Option<Attrs>,
    content: impl Into<Fragment>,
    marks: Vec<Mark>,
  ) -> Result<Node> {
    if self.is_text() {
      return Err(SchemaError::TextViaCreate);
    }
    let attrs = self.compute_attrs(attrs)?;
    let content = content.into();
    self.check_content(&content)?;
    Ok(Node::new(self.clone(), attrs, content, Mark::set_from(marks)))
  }
}

fn describe(content: &Fragment) -> String {
  content
    .iter()
    .map(|child| child.node_type().name())
    .collect::<Vec<_>>()
    .join(" ")
}

impl PartialEq for NodeType {
  fn eq(&self, other: &Self) -> bool {
    self.index == other.index && self.schema.ptr_eq(&other.schema)
  }
}

impl Eq for NodeType {}

impl std::hash::Hash for NodeType {
  fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
    self.index.hash(state);
  }
}

impl fmt::Debug for NodeType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "NodeType({})", self.name())
  }
}
