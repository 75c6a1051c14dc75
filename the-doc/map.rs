//! Position mapping.
//!
//! Each step produces a [`StepMap`]: one replaced range `[old_from, old_to)`
//! in the document before the step and the range `[new_from, new_to)` that
//! took its place. A [`Mapping`] chains step maps to carry a position across
//! a whole sequence of steps.
//!
//! # Association
//!
//! [`Assoc`] decides where a position lands when the range it sits in was
//! replaced:
//!
//! - a position in `[old_from, old_to)`, or at an insertion point, follows its
//!   association: **Before** to the new start, **After** to the new end;
//! - a position at or after the end of a non-empty range shifts by the size
//!   change, so the end itself lands on the new end.
//!
//! ```
//! use the_doc::{Assoc, StepMap};
//!
//! // "!!" inserted at 4
//! let map = StepMap::new(4, 4, 4, 6);
//! assert_eq!(map.map(4, Assoc::Before), 4);
//! assert_eq!(map.map(4, Assoc::After), 6);
//! assert_eq!(map.map(5, Assoc::Before), 7);
//! ```

#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub enum Assoc {
  Before,
  #[default]
  After,
}

/// A mapped position and whether the content around it was deleted.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct MapResult {
  pub pos:     usize,
  pub deleted: bool,
}

#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct StepMap {
  pub old_from: usize,
  pub old_to:   usize,
  pub new_from: usize,
  pub new_to:   usize,
}

impl StepMap {
  pub fn new(old_from: usize, old_to: usize, new_from: usize, new_to: usize) -> Self {
    debug_assert!(old_from <= old_to && new_from <= new_to);
    Self {
      old_from,
      old_to,
      new_from,
      new_to,
    }
  }

  /// A map that leaves every position where it is.
  pub fn identity() -> Self {
    Self::default()
  }

  pub fn is_identity(&self) -> bool {
    self.old_from == self.old_to && self.new_from == self.new_to && self.old_from == self.new_from
  }

  pub fn map(&self, pos: usize, assoc: Assoc) -> usize {
    self.map_result(pos, assoc).pos
  }

  pub fn map_result(&self, pos: usize, assoc: Assoc) -> MapResult {
    if pos < self.old_from {
      return MapResult {
        pos,
        deleted: false,
      };
    }
    if pos > self.old_to || (pos == self.old_to && self.old_from < self.old_to) {
      return MapResult {
        pos:     pos - self.old_to + self.new_to,
        deleted: false,
      };
    }

    MapResult {
      pos:     match assoc {
        Assoc::Before => self.new_from,
        Assoc::After => self.new_to,
      },
      deleted: pos > self.old_from,
    }
  }

  /// The map of the step that undoes this one.
  pub fn invert(&self) -> Self {
    Self {
      old_from: self.new_from,
      old_to:   self.new_to,
      new_from: self.old_from,
      new_to:   self.old_to,
    }
  }
}

/// An ordered sequence of step maps.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Mapping {
  maps: Vec<StepMap>,
}

impl Mapping {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn maps(&self) -> &[StepMap] {
    &self.maps
  }

  pub fn len(&self) -> usize {
    self.maps.len()
  }

  pub fn is_empty(&self) -> bool {
    self.maps.is_empty()
  }

  pub fn append_map(&mut self, map: StepMap) {
    self.maps.push(map);
  }

  pub fn append_mapping(&mut self, other: &Mapping) {
    self.maps.extend_from_slice(&other.maps);
  }

  /// Maps in reverse order, each inverted.
  pub fn invert(&self) -> Mapping {
    Mapping {
      maps: self.maps.iter().rev().map(StepMap::invert).collect(),
    }
  }

  pub fn map(&self, pos: usize, assoc: Assoc) -> usize {
    self
      .maps
      .iter()
      .fold(pos, |pos, map| map.map(pos, assoc))
  }

  /// Like [`Mapping::map`], also reporting whether any step deleted the
  /// position.
  pub fn map_result(&self, pos: usize, assoc: Assoc) -> MapResult {
    self.maps.iter().fold(
      MapResult {
        pos,
        deleted: false,
      },
      |acc, map| {
        let next = map.map_result(acc.pos, assoc);
        MapResult {
          pos:     next.pos,
          deleted: acc.deleted || next.deleted,
        }
      },
    )
  }
}

impl From<StepMap> for Mapping {
  fn from(map: StepMap) -> Self {
    Self { maps: vec![map] }
  }
}

impl FromIterator<StepMap> for Mapping {
  fn from_iter<I: IntoIterator<Item = StepMap>>(iter: I) -> Self {
    Self {
      maps: iter.into_iter().collect(),
    }
  }
}
