//! Edit steps.
//!
//! A [`Step`] is one atomic edit addressed in flat offsets. Applying a step
//! never touches the input document; it returns the new document together
//! with the [`StepMap`] that moves positions across the edit.

use std::fmt;

use thiserror::Error;

use crate::{
  map::{
    Mapping,
    StepMap,
  },
  mark_step::{
    AddMarkStep,
    RemoveMarkStep,
  },
  node::Node,
  position::PositionError,
  replace::ReplaceStep,
  schema::SchemaError,
};

pub type Result<T> = std::result::Result<T, StepError>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum StepError {
  #[error("invalid range: from {from} is after to {to}")]
  InvalidRange { from: usize, to: usize },
  #[error("range {from}..{to} is outside the document (size {size})")]
  RangeOutOfBounds { from: usize, to: usize, size: usize },
  #[error(transparent)]
  Position(#[from] PositionError),
  #[error(transparent)]
  Schema(#[from] SchemaError),
  #[error("cannot place content: {0}")]
  CannotPlace(&'static str),
  #[error("step cannot be inverted: {0}")]
  NotInvertible(&'static str),
}

/// The result of applying a step.
#[derive(Debug, Clone)]
pub struct Applied {
  pub doc: Node,
  pub map: StepMap,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
  Replace(ReplaceStep),
  AddMark(AddMarkStep),
  RemoveMark(RemoveMarkStep),
}

impl Step {
  pub fn apply(&self, doc: &Node) -> Result<Applied> {
    tracing::trace!(step = %self, "applying step");
    match self {
      Self::Replace(step) => step.apply(doc),
      Self::AddMark(step) => step.apply(doc),
      Self::RemoveMark(step) => step.apply(doc),
    }
  }

  /// The step that undoes this one, given the document this step applies to.
  pub fn invert(&self, doc: &Node) -> Result<Step> {
    match self {
      Self::Replace(step) => step.invert(doc).map(Self::Replace),
      Self::AddMark(step) => Ok(Self::RemoveMark(step.invert())),
      Self::RemoveMark(step) => step.invert().map(Self::AddMark),
    }
  }

  /// Move the step across other edits. Returns `None` when the content it
  /// addresses was deleted.
  pub fn map(&self, mapping: &Mapping) -> Option<Step> {
    match self {
      Self::Replace(step) => step.map(mapping).map(Self::Replace),
      Self::AddMark(step) => step.map(mapping).map(Self::AddMark),
      Self::RemoveMark(step) => step.map(mapping).map(Self::RemoveMark),
    }
  }

  /// The flat range `(from, to)` the step addresses.
  pub fn range(&self) -> (usize, usize) {
    match self {
      Self::Replace(step) => (step.from, step.to),
      Self::AddMark(step) => (step.from, step.to),
      Self::RemoveMark(step) => (step.from, step.to),
    }
  }
}

impl From<ReplaceStep> for Step {
  fn from(step: ReplaceStep) -> Self {
    Self::Replace(step)
  }
}

impl From<AddMarkStep> for Step {
  fn from(step: AddMarkStep) -> Self {
    Self::AddMark(step)
  }
}

impl From<RemoveMarkStep> for Step {
  fn from(step: RemoveMarkStep) -> Self {
    Self::RemoveMark(step)
  }
}

impl fmt::Display for Step {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Replace(step) => write!(f, "replace {}..{} with {:?}", step.from, step.to, step.slice),
      Self::AddMark(step) => write!(f, "add {} to {}..{}", step.mark, step.from, step.to),
      Self::RemoveMark(step) => {
        write!(f, "remove {} from {}..{}", step.target, step.from, step.to)
      },
    }
  }
}
