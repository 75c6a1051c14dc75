//! Immutable document nodes.
//!
//! A [`Node`] is a cheap-to-clone handle to shared node data. Edits never
//! touch existing nodes; they rebuild the path from the root to the changed
//! subtree and reuse every other subtree as is.
//!
//! Size model: a text node is as large as its character count, a leaf is 1
//! and a container is 2 plus the size of its content. The two extra units are
//! the container's open and close boundaries.

use std::{
  fmt,
  num::NonZeroU64,
  sync::Arc,
};

use crate::{
  Attrs,
  Tendril,
  fragment::Fragment,
  mark::{
    Mark,
    MarkSet,
  },
  schema::{
    self,
    NodeType,
  },
};

/// Identity of a node value, drawn from its schema's counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(NonZeroU64);

impl NodeId {
  pub(crate) const fn new(raw: NonZeroU64) -> Self {
    Self(raw)
  }

  pub const fn get(self) -> u64 {
    self.0.get()
  }
}

#[derive(Clone)]
pub struct Node(Arc<NodeData>);

struct NodeData {
  id:      NodeId,
  ty:      NodeType,
  attrs:   Attrs,
  content: Fragment,
  marks:   MarkSet,
  text:    Option<Tendril>,
  size:    usize,
}

impl Node {
  pub(crate) fn new(ty: NodeType, attrs: Attrs, content: Fragment, marks: MarkSet) -> Self {
    let id = ty.schema().next_id();
    Self::build(id, ty, attrs, content, marks, None)
  }

  pub(crate) fn new_text(ty: NodeType, text: Tendril, marks: MarkSet) -> Self {
    let id = ty.schema().next_id();
    Self::build(id, ty, Attrs::new(), Fragment::empty(), marks, Some(text))
  }

  fn build(
    id: NodeId,
    ty: NodeType,
    attrs: Attrs,
    content: Fragment,
    marks: MarkSet,
    text: Option<Tendril>,
  ) -> Self {
    let (content, size) = match &text {
      Some(text) => (Fragment::empty(), char_len(text)),
      None if ty.is_leaf() => {
        if !content.is_empty() {
          tracing::debug!(node = ty.name(), "dropping content of a leaf node");
        }
        (Fragment::empty(), 1)
      },
      None => {
        let size = content.size() + 2;
        (content, size)
      },
    };
    Self(Arc::new(NodeData {
      id,
      ty,
      attrs,
      content,
      marks,
      text,
      size,
    }))
  }

  #[inline]
  pub fn id(&self) -> NodeId {
    self.0.id
  }

  #[inline]
  pub fn node_type(&self) -> &NodeType {
    &self.0.ty
  }

  pub fn type_name(&self) -> &str {
    self.0.ty.name()
  }

  pub fn attrs(&self) -> &Attrs {
    &self.0.attrs
  }

  pub fn attr(&self, name: &str) -> Option<&serde_json::Value> {
    self.0.attrs.get(name)
  }

  pub fn marks(&self) -> &[Mark] {
    &self.0.marks
  }

  pub fn content(&self) -> &Fragment {
    &self.0.content
  }

  pub fn text(&self) -> Option<&str> {
    self.0.text.as_deref()
  }

  /// Size of this node in the flat position space.
  #[inline]
  pub fn node_size(&self) -> usize {
    self.0.size
  }

  /// Size of the content. Zero for text and leaf nodes.
  #[inline]
  pub fn content_size(&self) -> usize {
    self.0.content.size()
  }

  pub fn child_count(&self) -> usize {
    self.0.content.child_count()
  }

  pub fn child(&self, index: usize) -> Option<&Node> {
    self.0.content.child(index)
  }

  pub fn children(&self) -> std::slice::Iter<'_, Node> {
    self.0.content.iter()
  }

  pub fn is_text(&self) -> bool {
    self.0.text.is_some()
  }

  /// Text or leaf.
  pub fn is_leaf(&self) -> bool {
    self.0.ty.is_leaf()
  }

  /// A non-text leaf, one unit wide.
  pub fn is_atom(&self) -> bool {
    self.0.ty.is_atom()
  }

  pub fn is_container(&self) -> bool {
    !self.is_leaf()
  }

  pub fn is_inline(&self) -> bool {
    self.0.ty.is_inline()
  }

  pub fn is_block(&self) -> bool {
    self.0.ty.is_block()
  }

  pub fn is_textblock(&self) -> bool {
    self.0.ty.is_textblock()
  }

  pub fn inline_content(&self) -> bool {
    self.0.ty.inline_content()
  }

  /// Concatenated text of every text node below this one.
  pub fn text_content(&self) -> String {
    let mut out = String::new();
    self.collect_text(&mut out);
    out
  }

  fn collect_text(&self, out: &mut String) {
    match &self.0.text {
      Some(text) => out.push_str(text),
      None => {
        for child in self.children() {
          child.collect_text(out);
        }
      },
    }
  }

  /// Same kind, attributes and marks.
  pub fn same_markup(&self, other: &Node) -> bool {
    self.0.ty == other.0.ty && self.0.attrs == other.0.attrs && self.0.marks == other.0.marks
  }

  /// This node with new content. Keeps the node's identity and does not
  /// validate the content.
  pub fn with_content(&self, content: Fragment) -> Node {
    Self::build(
      self.0.id,
      self.0.ty.clone(),
      self.0.attrs.clone(),
      content,
      self.0.marks.clone(),
      self.0.text.clone(),
    )
  }

  /// Like [`Node::with_content`], checking the content against the node's
  /// kind first.
  pub fn copy_checked(&self, content: Fragment) -> schema::Result<Node> {
    self.0.ty.check_content(&content)?;
    Ok(self.with_content(content))
  }

  pub fn with_marks(&self, marks: MarkSet) -> Node {
    Self::build(
      self.0.id,
      self.0.ty.clone(),
      self.0.attrs.clone(),
      self.0.content.clone(),
      marks,
      self.0.text.clone(),
    )
  }

  fn with_text(&self, text: Tendril) -> Node {
    Self::build(
      self.0.id,
      self.0.ty.clone(),
      self.0.attrs.clone(),
      Fragment::empty(),
      self.0.marks.clone(),
      Some(text),
    )
  }

  /// The part of this node between two content offsets (character offsets
  /// for text). A partial cut is a new node with a fresh identity.
  pub fn cut(&self, from: usize, to: usize) -> Node {
    match &self.0.text {
      Some(text) => {
        let len = self.0.size;
        let to = to.min(len);
        if from == 0 && to == len {
          return self.clone();
        }
        let text = Tendril::from(char_slice(text, from, to));
        Self::new_text(self.0.ty.clone(), text, self.0.marks.clone())
      },
      None if self.is_leaf() => self.clone(),
      None => {
        if from == 0 && to >= self.content_size() {
          return self.clone();
        }
        Self::build(
          self.0.ty.schema().next_id(),
          self.0.ty.clone(),
          self.0.attrs.clone(),
          self.0.content.cut(from, to),
          self.0.marks.clone(),
          None,
        )
      },
    }
  }

  /// Join two text runs with equal marks into one, keeping this run's
  /// identity.
  pub(crate) fn merge_text(&self, other: &Node) -> Option<Node> {
    let (Some(left), Some(right)) = (&self.0.text, &other.0.text) else {
      return None;
    };
    if !Mark::same_set(self.marks(), other.marks()) {
      return None;
    }
    let mut text = left.clone();
    text.push_str(right);
    Some(self.with_text(text))
  }

  /// This node with child `index` swapped out.
  pub(crate) fn replace_child(&self, index: usize, child: Node) -> Node {
    self.with_content(self.0.content.replace_child(index, child))
  }
}

pub(crate) fn char_len(text: &str) -> usize {
  text.chars().count()
}

/// Slice `text` by character offsets.
pub(crate) fn char_slice(text: &str, from: usize, to: usize) -> &str {
  let byte = |index: usize| {
    text
      .char_indices()
      .nth(index)
      .map_or(text.len(), |(byte, _)| byte)
  };
  let start = byte(from);
  let end = byte(to).max(start);
  &text[start..end]
}

impl PartialEq for Node {
  fn eq(&self, other: &Self) -> bool {
    Arc::ptr_eq(&self.0, &other.0) ||
      (self.same_markup(other) && self.0.text == other.0.text && self.0.content == other.0.content)
  }
}

impl Eq for Node {}

impl fmt::Display for Node {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    for mark in self.marks() {
      write!(f, "{mark}(")?;
    }
    match &self.0.text {
      Some(text) => write!(f, "{:?}", text.as_str())?,
      None => {
        f.write_str(self.type_name())?;
        if !self.is_leaf() {
          write!(f, "({})", self.0.content)?;
        }
      },
    }
    for _ in self.marks() {
      f.write_str(")")?;
    }
    Ok(())
  }
}

impl fmt::Debug for Node {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    fmt::Display::fmt(self, f)
  }
}

#[cfg(test)]
mod test {
  use super::*;
  use crate::fixtures::{
    blockquote,
    doc,
    hr,
    img,
    marked,
    p,
    t,
  };

  #[test]
  fn size_model() {
    let para = p(vec![t("ab"), img("x.png"), t("cd")]);
    assert_eq!(para.node_size(), 2 + 2 + 1 + 2);
    assert_eq!(para.content_size(), 5);
    let quote = blockquote(vec![para.clone(), p(vec![])]);
    assert_eq!(quote.node_size(), 2 + 7 + 2);
    let root = doc(vec![quote, hr()]);
    assert_eq!(root.node_size(), 2 + 11 + 1);
    assert_eq!(root.content_size(), 12);
  }

  #[test]
  fn unicode_text_counts_chars() {
    let run = t("héllo ✓");
    assert_eq!(run.node_size(), 7);
    assert_eq!(run.cut(1, 5).text(), Some("éllo"));
    assert_eq!(run.cut(6, 99).text(), Some("✓"));
    assert_eq!(run.cut(7, 7).text(), Some(""));
  }

  #[test]
  fn equality_ignores_ids() {
    let a = p(vec![t("same")]);
    let b = p(vec![t("same")]);
    assert_ne!(a.id(), b.id());
    assert_eq!(a, b);
    assert_ne!(a, p(vec![marked("same", &["em"])]));
  }

  #[test]
  fn copies_keep_identity() {
    let para = p(vec![t("abc")]);
    let copy = para.with_content(Fragment::from(vec![t("xyz")]));
    assert_eq!(copy.id(), para.id());
    assert_eq!(copy.text_content(), "xyz");

    let partial = para.cut(1, 2);
    assert_ne!(partial.id(), para.id());
    assert_eq!(partial.text_content(), "b");
    assert_eq!(para.cut(0, 3).id(), para.id());
  }

  #[test]
  fn display() {
    let root = doc(vec![p(vec![t("a"), marked("b", &["em", "strong"])]), hr()]);
    assert_eq!(
      root.to_string(),
      r#"doc(paragraph("a", em(strong("b"))), horizontal_rule)"#
    );
  }
}
