//! Position addressing.
//!
//! A position can be named two ways. A [`ModelPosition`] walks a path of child
//! indices down from the root and ends with an offset into the addressed
//! node: a character offset for text, a child index for a container, 0 or 1
//! for a leaf. A flat offset counts positions in document order, where every
//! character and every container boundary takes one unit. Flat offsets start
//! at 0 for the start of the root's content.
//!
//! A flat offset on a boundary between two siblings converts back to the
//! shallowest path: the parent with a child index, unless a text or leaf node
//! starts there, in which case the position points into that node. The end of
//! a text run is preferred over the parent boundary when the next sibling is
//! not text.

use std::fmt;

use smallvec::SmallVec;
use thiserror::Error;

use crate::node::Node;

pub type Result<T> = std::result::Result<T, PositionError>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum PositionError {
  #[error("child index {index} at depth {depth} is out of range (node has {len} children)")]
  IndexOutOfRange {
    depth: usize,
    index: usize,
    len:   usize,
  },
  #[error("path descends into a leaf at depth {depth}")]
  DescendIntoLeaf { depth: usize },
  #[error("offset {offset} exceeds the addressed node's maximum of {max}")]
  OffsetOutOfRange { offset: usize, max: usize },
  #[error("position {pos} is outside the document (content size {size})")]
  FlatOutOfRange { pos: usize, size: usize },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ModelPosition {
  pub path:   SmallVec<[usize; 4]>,
  pub offset: usize,
}

impl ModelPosition {
  pub fn new(path: impl IntoIterator<Item = usize>, offset: usize) -> Self {
    Self {
      path: path.into_iter().collect(),
      offset,
    }
  }

  pub fn depth(&self) -> usize {
    self.path.len()
  }
}

impl fmt::Display for ModelPosition {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{:?}:{}", self.path.as_slice(), self.offset)
  }
}

/// Convert a path position to a flat offset.
pub fn to_flat_offset(doc: &Node, pos: &ModelPosition) -> Result<usize> {
  let mut node = doc;
  let mut flat = 0;
  for (depth, &index) in pos.path.iter().enumerate() {
    if node.is_leaf() {
      return Err(PositionError::DescendIntoLeaf { depth });
    }
    let child = node.child(index).ok_or(PositionError::IndexOutOfRange {
      depth,
      index,
      len: node.child_count(),
    })?;
    flat += node.content().offset_at(index);
    if child.is_container() {
      flat += 1;
    }
    node = child;
  }

  let max = if node.is_text() {
    node.node_size()
  } else if node.is_leaf() {
    1
  } else {
    node.child_count()
  };
  if pos.offset > max {
    return Err(PositionError::OffsetOutOfRange {
      offset: pos.offset,
      max,
    });
  }

  Ok(if node.is_leaf() {
    flat + pos.offset
  } else {
    flat + node.content().offset_at(pos.offset)
  })
}

/// Convert a flat offset to a path position.
pub fn to_model_position(doc: &Node, flat: usize) -> Result<ModelPosition> {
  if flat > doc.content_size() {
    return Err(PositionError::FlatOutOfRange {
      pos:  flat,
      size: doc.content_size(),
    });
  }

  let mut path = SmallVec::new();
  let mut node = doc;
  let mut budget = flat;
  'descend: loop {
    let children = node.content().as_slice();
    for (index, child) in children.iter().enumerate() {
      let size = child.node_size();
      if child.is_text() {
        let next_is_text = children.get(index + 1).is_some_and(Node::is_text);
        if budget < size || (budget == size && !next_is_text) {
          path.push(index);
          return Ok(ModelPosition {
            path,
            offset: budget,
          });
        }
      } else if child.is_leaf() {
        if budget == 0 {
          path.push(index);
          return Ok(ModelPosition { path, offset: 0 });
        }
      } else {
        if budget == 0 {
          return Ok(ModelPosition {
            path,
            offset: index,
          });
        }
        if budget < size {
          path.push(index);
          node = child;
          budget -= 1;
          continue 'descend;
        }
      }
      budget -= size;
    }

    if budget == 0 {
      return Ok(ModelPosition {
        path,
        offset: children.len(),
      });
    }
    return Err(PositionError::FlatOutOfRange {
      pos:  flat,
      size: doc.content_size(),
    });
  }
}

#[derive(Clone)]
struct Level {
  node:        Node,
  index:       usize,
  /// Flat offset where child `index` starts.
  child_start: usize,
}

/// A flat offset resolved against a document, with the chain of ancestors
/// that contain it.
#[derive(Clone)]
pub struct ResolvedPos {
  pos:    usize,
  levels: SmallVec<[Level; 4]>,
}

impl Node {
  /// Resolve a flat offset into this node's content.
  pub fn resolve(&self, pos: usize) -> Result<ResolvedPos> {
    if pos > self.content_size() {
      return Err(PositionError::FlatOutOfRange {
        pos,
        size: self.content_size(),
      });
    }

    let mut levels = SmallVec::new();
    let mut node = self.clone();
    let mut start = 0;
    let mut parent_offset = pos;
    loop {
      let (index, offset) = node.content().find_index(parent_offset);
      let rem = parent_offset - offset;
      levels.push(Level {
        node: node.clone(),
        index,
        child_start: start + offset,
      });
      if rem == 0 {
        break;
      }
      let Some(child) = node.child(index).cloned() else {
        break;
      };
      if child.is_leaf() {
        break;
      }
      parent_offset = rem - 1;
      start += offset + 1;
      node = child;
    }

    Ok(ResolvedPos { pos, levels })
  }
}

impl ResolvedPos {
  pub fn pos(&self) -> usize {
    self.pos
  }

  /// Number of container levels below the root.
  pub fn depth(&self) -> usize {
    self.levels.len() - 1
  }

  pub(crate) fn node(&self, depth: usize) -> &Node {
    &self.levels[depth].node
  }

  pub fn parent(&self) -> &Node {
    self.node(self.depth())
  }

  pub fn doc(&self) -> &Node {
    self.node(0)
  }

  /// Index into the ancestor at `depth`.
  pub(crate) fn index(&self, depth: usize) -> usize {
    self.levels[depth].index
  }

  /// Flat offset of the start of the content of the ancestor at `depth`.
  pub(crate) fn start(&self, depth: usize) -> usize {
    if depth == 0 {
      0
    } else {
      self.levels[depth - 1].child_start + 1
    }
  }

  pub(crate) fn end(&self, depth: usize) -> usize {
    self.start(depth) + self.node(depth).content_size()
  }

  pub fn parent_offset(&self) -> usize {
    self.pos - self.start(self.depth())
  }

  /// Offset into the text node the position points into, 0 when it sits
  /// between nodes.
  pub fn text_offset(&self) -> usize {
    self.pos - self.levels[self.depth()].child_start
  }

  /// The deepest depth whose node contains both this position and `pos`.
  pub fn shared_depth(&self, pos: usize) -> usize {
    (0..=self.depth())
      .rev()
      .find(|&depth| self.start(depth) <= pos && self.end(depth) >= pos)
      .unwrap_or(0)
  }

  /// Convert to a path position.
  pub fn to_model(&self) -> Result<ModelPosition> {
    to_model_position(self.doc(), self.pos)
  }
}

impl fmt::Debug for ResolvedPos {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let path: Vec<_> = self
      .levels
      .iter()
      .map(|level| (level.node.type_name().to_string(), level.index))
      .collect();
    f.debug_struct("ResolvedPos")
      .field("pos", &self.pos)
      .field("path", &path)
      .finish()
  }
}

#[cfg(test)]
mod test {
  use quickcheck::quickcheck;

  use super::*;
  use crate::fixtures::{
    ArbDoc,
    blockquote,
    doc,
    hr,
    img,
    p,
    t,
  };

  fn scenario() -> Node {
    doc(vec![
      p(vec![t("Paragraph "), crate::fixtures::marked("one", &["em"])]),
      p(vec![t("Paragraph "), crate::fixtures::marked("two", &["em"])]),
    ])
  }

  #[test]
  fn scenario_offsets() {
    let doc = scenario();
    assert_eq!(to_flat_offset(&doc, &ModelPosition::new([0, 1], 0)), Ok(11));
    assert_eq!(to_flat_offset(&doc, &ModelPosition::new([1, 0], 10)), Ok(26));
    assert_eq!(to_flat_offset(&doc, &ModelPosition::new([], 1)), Ok(15));
    assert_eq!(to_flat_offset(&doc, &ModelPosition::new([0], 0)), Ok(1));
  }

  #[test]
  fn canonical_paths() {
    let doc = scenario();
    assert_eq!(to_model_position(&doc, 0), Ok(ModelPosition::new([], 0)));
    assert_eq!(to_model_position(&doc, 1), Ok(ModelPosition::new([0, 0], 0)));
    // Between two runs the position points into the second one.
    assert_eq!(to_model_position(&doc, 11), Ok(ModelPosition::new([0, 1], 0)));
    assert_eq!(to_model_position(&doc, 14), Ok(ModelPosition::new([0, 1], 3)));
    assert_eq!(to_model_position(&doc, 15), Ok(ModelPosition::new([], 1)));
    assert_eq!(to_model_position(&doc, 30), Ok(ModelPosition::new([], 2)));
    assert_eq!(
      to_model_position(&doc, 31),
      Err(PositionError::FlatOutOfRange { pos: 31, size: 30 })
    );
  }

  #[test]
  fn leaves() {
    let doc = doc(vec![p(vec![img("a.png"), t("x")]), hr()]);
    assert_eq!(to_model_position(&doc, 1), Ok(ModelPosition::new([0, 0], 0)));
    assert_eq!(to_model_position(&doc, 2), Ok(ModelPosition::new([0, 1], 0)));
    assert_eq!(to_model_position(&doc, 4), Ok(ModelPosition::new([1], 0)));
    assert_eq!(to_model_position(&doc, 5), Ok(ModelPosition::new([], 2)));
    assert_eq!(to_flat_offset(&doc, &ModelPosition::new([0, 0], 1)), Ok(2));
    assert_eq!(to_flat_offset(&doc, &ModelPosition::new([1], 1)), Ok(5));
  }

  #[test]
  fn invalid_paths() {
    let doc = scenario();
    assert_eq!(
      to_flat_offset(&doc, &ModelPosition::new([2], 0)),
      Err(PositionError::IndexOutOfRange {
        depth: 0,
        index: 2,
        len:   2,
      })
    );
    assert_eq!(
      to_flat_offset(&doc, &ModelPosition::new([0, 0, 0], 0)),
      Err(PositionError::DescendIntoLeaf { depth: 2 })
    );
    assert_eq!(
      to_flat_offset(&doc, &ModelPosition::new([0, 0], 11)),
      Err(PositionError::OffsetOutOfRange { offset: 11, max: 10 })
    );
    assert_eq!(
      to_flat_offset(&doc, &ModelPosition::new([0], 3)),
      Err(PositionError::OffsetOutOfRange { offset: 3, max: 2 })
    );
  }

  #[test]
  fn resolve_nested() {
    let doc = doc(vec![p(vec![t("ab")]), blockquote(vec![p(vec![t("cd")])])]);
    let pos = doc.resolve(7).unwrap();
    assert_eq!(pos.depth(), 2);
    assert_eq!(pos.parent().type_name(), "paragraph");
    assert_eq!(pos.start(1), 5);
    assert_eq!(pos.start(2), 6);
    assert_eq!(pos.end(2), 8);
    assert_eq!(pos.parent_offset(), 1);
    assert_eq!(pos.text_offset(), 1);
    assert_eq!(pos.shared_depth(2), 0);
    assert_eq!(pos.shared_depth(5), 1);
    assert_eq!(pos.to_model(), Ok(ModelPosition::new([1, 0, 0], 1)));

    let boundary = doc.resolve(4).unwrap();
    assert_eq!(boundary.depth(), 0);
    assert_eq!(boundary.index(0), 1);
  }

  quickcheck! {
    fn flat_round_trip(doc: ArbDoc) -> bool {
      let doc = doc.0;
      (0..=doc.content_size()).all(|flat| {
        let Ok(pos) = to_model_position(&doc, flat) else {
          return false;
        };
        to_flat_offset(&doc, &pos) == Ok(flat)
      })
    }

    fn size_model(doc: ArbDoc) -> bool {
      fn check(node: &Node) -> bool {
        let expected = if let Some(text) = node.text() {
          text.chars().count()
        } else if node.is_leaf() {
          1
        } else {
          2 + node.children().map(Node::node_size).sum::<usize>()
        };
        node.node_size() == expected && node.children().all(check)
      }
      check(&doc.0)
    }
  }
}
