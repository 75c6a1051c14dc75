use std::fmt;

use crate::{
  fragment::Fragment,
  node::Node,
  position,
};

/// A piece of document content with the number of levels cut open at each
/// end.
///
/// An open end means the outermost nodes there were split out of a larger
/// node and are to be joined with whatever sits next to the insertion point,
/// rather than inserted as whole nodes.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Slice {
  pub content:    Fragment,
  pub open_start: usize,
  pub open_end:   usize,
}

impl Slice {
  pub const EMPTY: Slice = Slice {
    content:    Fragment::EMPTY,
    open_start: 0,
    open_end:   0,
  };

  pub fn new(content: Fragment, open_start: usize, open_end: usize) -> Self {
    Self {
      content,
      open_start,
      open_end,
    }
  }

  /// A closed slice of the given content.
  pub fn from_fragment(content: impl Into<Fragment>) -> Self {
    Self::new(content.into(), 0, 0)
  }

  pub fn from_node(node: Node) -> Self {
    Self::from_fragment(node)
  }

  /// Sum of the sizes of the top-level nodes. This counts the boundaries of
  /// open nodes as well, so for an open slice it is larger than the number of
  /// positions the slice occupies once inserted. See [`Slice::inserted_size`].
  pub fn size(&self) -> usize {
    self.content.size()
  }

  /// Positions this slice occupies between the ends it is joined to.
  pub fn inserted_size(&self) -> usize {
    self
      .content
      .size()
      .saturating_sub(self.open_start + self.open_end)
  }

  pub fn is_empty(&self) -> bool {
    self.content.is_empty()
  }

  pub fn is_closed(&self) -> bool {
    self.open_start == 0 && self.open_end == 0
  }
}

impl fmt::Debug for Slice {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{:?}({},{})", self.content, self.open_start, self.open_end)
  }
}

impl Node {
  /// Cut the content between two flat offsets out of this node.
  pub fn slice(&self, from: usize, to: usize) -> position::Result<Slice> {
    if to <= from {
      return Ok(Slice::EMPTY);
    }
    let rfrom = self.resolve(from)?;
    let rto = self.resolve(to)?;
    let depth = rfrom.shared_depth(to);
    let start = rfrom.start(depth);
    let content = rfrom
      .node(depth)
      .content()
      .cut(from - start, to - start);
    Ok(Slice::new(
      content,
      rfrom.depth() - depth,
      rto.depth() - depth,
    ))
  }
}
