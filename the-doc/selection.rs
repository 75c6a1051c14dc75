//! Selections over a document.
//!
//! A [`Selection`] has two ends, `anchor` and `head`, both stored as
//! [`ModelPosition`]s. The `head` is the end that moves when the selection is
//! extended. When both ends are equal the selection is a cursor.
//!
//! # Mapping Through Steps
//!
//! After a step, each end is converted to a flat offset in the document before
//! the step, mapped through the step's [`StepMap`] and converted back against
//! the document after it. A cursor maps with [`Assoc::After`] on both ends; a
//! range maps its start with [`Assoc::After`] and its end with
//! [`Assoc::Before`], so text inserted at its edges stays outside of it.

use std::cmp::Ordering;

use crate::{
  map::{
    Assoc,
    StepMap,
  },
  node::Node,
  position::{
    self,
    ModelPosition,
    to_flat_offset,
    to_model_position,
  },
};

/// The direction a selection extends in.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Direction {
  /// The head is at or after the anchor.
  Forward,
  /// The head is before the anchor.
  Backward,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
  pub anchor: ModelPosition,
  pub head:   ModelPosition,
}

impl Selection {
  pub fn new(anchor: ModelPosition, head: ModelPosition) -> Self {
    Self { anchor, head }
  }

  pub fn point(pos: ModelPosition) -> Self {
    Self {
      anchor: pos.clone(),
      head:   pos,
    }
  }

  /// Build a selection from flat offsets into `doc`.
  pub fn from_flat(doc: &Node, anchor: usize, head: usize) -> position::Result<Self> {
    Ok(Self {
      anchor: to_model_position(doc, anchor)?,
      head:   to_model_position(doc, head)?,
    })
  }

  /// Flat offsets of `(anchor, head)` in `doc`.
  pub fn flat(&self, doc: &Node) -> position::Result<(usize, usize)> {
    Ok((
      to_flat_offset(doc, &self.anchor)?,
      to_flat_offset(doc, &self.head)?,
    ))
  }

  /// Flat bounds `(from, to)` in document order.
  pub fn range(&self, doc: &Node) -> position::Result<(usize, usize)> {
    let (anchor, head) = self.flat(doc)?;
    Ok((anchor.min(head), anchor.max(head)))
  }

  /// Structural check only; two different paths can name the same flat
  /// offset.
  pub fn is_empty(&self) -> bool {
    self.anchor == self.head
  }

  #[must_use]
  pub fn flip(self) -> Self {
    Self {
      anchor: self.head,
      head:   self.anchor,
    }
  }

  pub fn direction(&self, doc: &Node) -> position::Result<Direction> {
    let (anchor, head) = self.flat(doc)?;
    Ok(if head < anchor {
      Direction::Backward
    } else {
      Direction::Forward
    })
  }

  /// Carry the selection across a step that turned `before` into `after`.
  /// An end that cannot be converted keeps its old path.
  #[must_use]
  pub fn map(&self, before: &Node, after: &Node, map: &StepMap) -> Self {
    let (anchor, head) = match self.flat(before) {
      Ok(flat) => flat,
      Err(err) => {
        tracing::warn!(%err, selection = ?self, "selection does not fit the document, keeping it");
        return self.clone();
      },
    };

    let (anchor, head) = match anchor.cmp(&head) {
      Ordering::Equal => {
        let pos = map.map(anchor, Assoc::After);
        (pos, pos)
      },
      Ordering::Less => {
        let from = map.map(anchor, Assoc::After);
        let to = map.map(head, Assoc::Before).max(from);
        (from, to)
      },
      Ordering::Greater => {
        let from = map.map(head, Assoc::After);
        let to = map.map(anchor, Assoc::Before).max(from);
        (to, from)
      },
    };

    Self {
      anchor: resolve_or_keep(after, anchor, &self.anchor),
      head:   resolve_or_keep(after, head, &self.head),
    }
  }
}

fn resolve_or_keep(doc: &Node, flat: usize, old: &ModelPosition) -> ModelPosition {
  to_model_position(doc, flat).unwrap_or_else(|err| {
    tracing::warn!(%err, flat, "mapped selection end is outside the document, keeping it");
    old.clone()
  })
}
