//! Replace steps.
//!
//! A [`ReplaceStep`] swaps the content between two flat offsets for a
//! [`Slice`]. There are three ways to apply it, tried in order:
//!
//! 1. Whole document: `from` is 0 and `to` is past the end of the root's
//!    content. The slice's content becomes the root's content, with stray
//!    inline runs wrapped in the default block kind.
//! 2. Same parent: both ends sit directly in the same node and the slice is
//!    closed and fits that node. The parent's children are spliced.
//! 3. General: both ends must reach a common ancestor through the slice's
//!    open depths. Each open boundary is joined with the cut node next to it,
//!    and the step fails when the two cannot be joined. A closed slice of
//!    blocks splits the textblocks around it. An empty slice joins the cut
//!    nodes for as many levels as their kinds allow.
//!
//! The step map is built from the real size difference of the result, so it
//! stays exact when a replacement splits or joins blocks.

use std::mem;

use crate::{
  fragment::Fragment,
  map::{
    Assoc,
    Mapping,
    StepMap,
  },
  node::Node,
  position::ResolvedPos,
  schema::Schema,
  slice::Slice,
  step::{
    Applied,
    Result,
    StepError,
  },
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplaceStep {
  pub from:  usize,
  pub to:    usize,
  pub slice: Slice,
}

impl ReplaceStep {
  pub fn new(from: usize, to: usize, slice: Slice) -> Self {
    Self { from, to, slice }
  }

  pub fn delete(from: usize, to: usize) -> Self {
    Self::new(from, to, Slice::EMPTY)
  }

  pub fn insert(pos: usize, content: impl Into<Fragment>) -> Self {
    Self::new(pos, pos, Slice::from_fragment(content))
  }

  pub fn apply(&self, doc: &Node) -> Result<Applied> {
    let Self { from, to, slice } = self;
    let (from, to) = (*from, *to);
    let size = doc.content_size();
    if from > to {
      return Err(StepError::InvalidRange { from, to });
    }
    if to > doc.node_size() || from > size {
      return Err(StepError::RangeOutOfBounds {
        from,
        to,
        size: doc.node_size(),
      });
    }

    let result = if from == 0 && to > size {
      replace_whole(doc, slice)?
    } else if to > size {
      return Err(StepError::RangeOutOfBounds {
        from,
        to,
        size: doc.node_size(),
      });
    } else {
      replace_range(doc, from, to, slice)?
    };

    let old_to = to.min(size);
    let new_to = (old_to + result.content_size())
      .saturating_sub(size)
      .max(from);
    Ok(Applied {
      doc: result,
      map: StepMap::new(from, old_to, from, new_to),
    })
  }

  /// The step that restores `doc` after this step was applied to it.
  pub fn invert(&self, doc: &Node) -> Result<ReplaceStep> {
    let applied = self.apply(doc)?;
    let removed = doc.slice(self.from, self.to.min(doc.content_size()))?;
    Ok(Self::new(self.from, applied.map.new_to, removed))
  }

  pub fn map(&self, mapping: &Mapping) -> Option<ReplaceStep> {
    let from = mapping.map_result(self.from, Assoc::After);
    let to = mapping.map_result(self.to, Assoc::Before);
    if from.deleted && to.deleted {
      return None;
    }
    Some(Self::new(
      from.pos,
      to.pos.max(from.pos),
      self.slice.clone(),
    ))
  }
}

fn replace_whole(doc: &Node, slice: &Slice) -> Result<Node> {
  let content = fit_content(doc, slice.content.clone())?;
  Ok(doc.copy_checked(content)?)
}

fn replace_range(doc: &Node, from: usize, to: usize, slice: &Slice) -> Result<Node> {
  let rfrom = doc.resolve(from)?;
  let rto = doc.resolve(to)?;
  let depth = rfrom.depth();

  if rto.depth() == depth &&
    rfrom.shared_depth(to) == depth &&
    slice.is_closed() &&
    fits_inline(rfrom.parent(), &slice.content)
  {
    let parent = rfrom.parent();
    let start = rfrom.start(depth);
    let content = parent
      .content()
      .cut(0, from - start)
      .append(&slice.content)
      .append(&parent.content().cut(to - start, parent.content_size()));
    let content = fit_content(parent, content.normalized())?;
    let node = parent.copy_checked(content)?;
    return Ok(rebuild(&rfrom, depth, node));
  }

  if slice.is_empty() {
    return delete_range(&rfrom, &rto);
  }

  let slice = lift_inline(&rfrom, &rto, slice)?;
  let depth = placement_depth(&rfrom, &rto, &slice)?;
  let parent = rfrom.node(depth);
  let start = rfrom.start(depth);
  let left = parent.content().cut(0, from - start);
  let right = parent
    .content()
    .cut(to - start, parent.content_size());

  let content = join_exact(&left, &slice.content, slice.open_start)?;
  let content = join_exact(&content, &right, slice.open_end)?;
  let content = fit_content(parent, content)?;
  let node = parent.copy_checked(content)?;
  Ok(rebuild(&rfrom, depth, node))
}

/// Drop the range and join the cut nodes on both sides for as many levels as
/// their kinds allow.
fn delete_range(rfrom: &ResolvedPos, rto: &ResolvedPos) -> Result<Node> {
  let depth = rfrom.shared_depth(rto.pos());
  let parent = rfrom.node(depth);
  let start = rfrom.start(depth);
  let left = parent.content().cut(0, rfrom.pos() - start);
  let right = parent
    .content()
    .cut(rto.pos() - start, parent.content_size());
  let open = (rfrom.depth() - depth).min(rto.depth() - depth);
  let content = fit_content(parent, join_open(&left, &right, open))?;
  let node = parent.copy_checked(content)?;
  Ok(rebuild(rfrom, depth, node))
}

/// The depth of the node whose children a non-empty slice replaces.
///
/// Both ends of the range must reach that node through exactly the slice's
/// open depths. A closed slice of blocks may sit higher than both ends, which
/// splits the nodes around it, when the ends are equally deep.
fn placement_depth(rfrom: &ResolvedPos, rto: &ResolvedPos, slice: &Slice) -> Result<usize> {
  let (Some(left), Some(right)) = (
    rfrom.depth().checked_sub(slice.open_start),
    rto.depth().checked_sub(slice.open_end),
  ) else {
    return Err(StepError::CannotPlace(
      "slice is open deeper than the replaced range",
    ));
  };
  if left != right {
    return Err(StepError::CannotPlace(
      "slice open depths do not match the replaced range",
    ));
  }

  let shared = rfrom.shared_depth(rto.pos());
  let has_blocks = slice.content.iter().any(|node| !node.is_inline());
  let mut depth = left;
  if slice.is_closed() {
    depth = depth.min(shared);
    while depth > 0 && has_blocks && rfrom.node(depth).inline_content() {
      depth -= 1;
    }
  } else if depth > shared {
    return Err(StepError::CannotPlace(
      "open slice does not fit under a common ancestor",
    ));
  }
  if has_blocks && rfrom.node(depth).inline_content() {
    return Err(StepError::CannotPlace("block content inside a textblock"));
  }
  Ok(depth)
}

/// Whether `parent` can take `content` directly: inline content needs an
/// inline-content parent and block content a block-level one.
fn fits_inline(parent: &Node, content: &Fragment) -> bool {
  let inline = content.iter().all(Node::is_inline);
  if parent.inline_content() {
    inline
  } else {
    true
  }
}

/// A closed, inline-only slice whose ends do not share a parent is wrapped in
/// a textblock. The wrapper is open on each side that ends in a textblock, so
/// it joins with the text there.
fn lift_inline(rfrom: &ResolvedPos, rto: &ResolvedPos, slice: &Slice) -> Result<Slice> {
  if !slice.is_closed() || slice.is_empty() || !slice.content.iter().all(Node::is_inline) {
    return Ok(slice.clone());
  }
  let content = slice.content.clone().normalized();
  let textblock = [rfrom.parent(), rto.parent()]
    .into_iter()
    .find(|node| node.is_textblock());
  let wrapper = match textblock {
    Some(node) => {
      node
        .node_type()
        .create(Some(node.attrs().clone()), content, Vec::new())?
    },
    None => {
      schema_of(rfrom.doc())
        .default_block_type()
        .ok_or(StepError::CannotPlace(
          "no textblock kind to hold inline content",
        ))?
        .create(None, content, Vec::new())?
    },
  };
  Ok(Slice::new(
    Fragment::from(wrapper),
    usize::from(rfrom.parent().is_textblock()),
    usize::from(rto.parent().is_textblock()),
  ))
}

/// Containers of the same kind, or of kinds with the same content
/// expression, can be joined into one.
fn joinable(left: &Node, right: &Node) -> bool {
  left.is_container() &&
    right.is_container() &&
    (left.node_type() == right.node_type() ||
      left.node_type().content_match() == right.node_type().content_match())
}

/// Concatenate two fragments, joining the last node of `left` with the first
/// node of `right` for exactly `depth` levels. The joined node keeps the left
/// node's markup.
fn join_exact(left: &Fragment, right: &Fragment, depth: usize) -> Result<Fragment> {
  if depth == 0 {
    return Ok(left.append(right));
  }
  let (Some(last), Some(first)) = (left.last_child(), right.first_child()) else {
    return Err(StepError::CannotPlace("open boundary has no node to join"));
  };
  if !joinable(last, first) {
    return Err(StepError::CannotPlace(
      "open boundary joins nodes of incompatible kinds",
    ));
  }
  let inner = join_exact(last.content(), first.content(), depth - 1)?;
  Ok(splice_joined(left, last, inner, right))
}

/// Like [`join_exact`], but stops at the first level whose nodes cannot be
/// joined.
fn join_open(left: &Fragment, right: &Fragment, depth: usize) -> Fragment {
  match (left.last_child(), right.first_child()) {
    (Some(last), Some(first)) if depth > 0 && joinable(last, first) => {
      let inner = join_open(last.content(), first.content(), depth - 1);
      splice_joined(left, last, inner, right)
    },
    _ => left.append(right),
  }
}

/// `left` without its last node, the joined node, then `right` without its
/// first node.
fn splice_joined(left: &Fragment, last: &Node, inner: Fragment, right: &Fragment) -> Fragment {
  let inner = if last.inline_content() {
    inner.normalized()
  } else {
    inner
  };
  let mut nodes = left.as_slice().to_vec();
  if let Some(slot) = nodes.last_mut() {
    *slot = last.with_content(inner);
  }
  nodes.extend(right.iter().skip(1).cloned());
  Fragment::from_nodes(nodes)
}

/// Wrap runs of inline nodes in the default block kind when `parent` only
/// takes blocks.
fn fit_content(parent: &Node, content: Fragment) -> Result<Fragment> {
  if parent.inline_content() {
    return Ok(content.normalized());
  }
  if content.iter().all(|node| !node.is_inline()) {
    return Ok(content);
  }

  let block = schema_of(parent)
    .default_block_type()
    .ok_or(StepError::CannotPlace(
      "no default block kind to wrap inline content",
    ))?;
  let mut nodes = Vec::with_capacity(content.child_count());
  let mut run = Vec::new();
  for node in content.into_vec() {
    if node.is_inline() {
      run.push(node);
      continue;
    }
    if !run.is_empty() {
      let inline = Fragment::from_nodes(mem::take(&mut run)).normalized();
      nodes.push(block.create(None, inline, Vec::new())?);
    }
    nodes.push(node);
  }
  if !run.is_empty() {
    let inline = Fragment::from_nodes(run).normalized();
    nodes.push(block.create(None, inline, Vec::new())?);
  }
  tracing::trace!(
    parent = parent.type_name(),
    block = block.name(),
    "wrapped inline content in blocks"
  );
  Ok(Fragment::from_nodes(nodes))
}

fn schema_of(node: &Node) -> &Schema {
  node.node_type().schema()
}

/// Rebuild the ancestors of the node at `depth` around its replacement.
fn rebuild(pos: &ResolvedPos, depth: usize, node: Node) -> Node {
  (0..depth)
    .rev()
    .fold(node, |child, depth| {
      pos.node(depth).replace_child(pos.index(depth), child)
    })
}
