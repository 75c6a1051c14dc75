//! Transactions.
//!
//! A [`Transaction`] starts from one document and a selection, applies steps
//! in order and keeps the selection pointing at the same content. It is read
//! out once with [`Transaction::finish`].
//!
//! A step that fails to apply leaves the transaction untouched. The chaining
//! helpers ([`Transaction::replace`], [`Transaction::add_mark`], ...) log and
//! skip such steps; [`Transaction::add_step`] reports the error instead.
//!
//! ```
//! use the_doc::{
//!   Schema,
//!   SchemaSpec,
//!   Selection,
//!   Transaction,
//! };
//!
//! let schema = Schema::new(SchemaSpec::builtin().unwrap()).unwrap();
//! let strong = schema.mark("strong", None).unwrap();
//! let para = schema
//!   .node("paragraph", None, vec![schema.text("one two", Vec::new())], Vec::new())
//!   .unwrap();
//! let doc = schema.node("doc", None, vec![para], Vec::new()).unwrap();
//!
//! let mut tr = Transaction::new(doc, Selection::default());
//! tr.add_mark(1, 4, strong).delete(4, 8);
//! assert_eq!(tr.steps().len(), 2);
//! assert_eq!(tr.doc().text_content(), "one");
//! ```

use std::{
  collections::HashMap,
  mem,
};

use serde_json::Value;

use crate::{
  fragment::Fragment,
  map::Mapping,
  mark::Mark,
  mark_step::{
    AddMarkStep,
    MarkTarget,
    RemoveMarkStep,
  },
  node::Node,
  replace::ReplaceStep,
  selection::Selection,
  slice::Slice,
  step::{
    Applied,
    Step,
    StepError,
  },
};

#[derive(Debug, Clone)]
pub struct Transaction {
  before:    Node,
  doc:       Node,
  steps:     Vec<Step>,
  /// The document each step was applied to.
  docs:      Vec<Node>,
  mapping:   Mapping,
  selection: Selection,
  meta:      HashMap<String, Value>,
}

impl Transaction {
  pub fn new(doc: Node, selection: Selection) -> Self {
    Self {
      before: doc.clone(),
      doc,
      steps: Vec::new(),
      docs: Vec::new(),
      mapping: Mapping::new(),
      selection,
      meta: HashMap::new(),
    }
  }

  /// The document the transaction started from.
  pub fn before(&self) -> &Node {
    &self.before
  }

  /// The current document.
  pub fn doc(&self) -> &Node {
    &self.doc
  }

  pub fn steps(&self) -> &[Step] {
    &self.steps
  }

  pub fn docs(&self) -> &[Node] {
    &self.docs
  }

  /// Maps positions in [`Transaction::before`] to positions in
  /// [`Transaction::doc`].
  pub fn mapping(&self) -> &Mapping {
    &self.mapping
  }

  pub fn selection(&self) -> &Selection {
    &self.selection
  }

  pub fn doc_changed(&self) -> bool {
    !self.steps.is_empty()
  }

  /// Apply a step to the current document. On failure nothing changes.
  pub fn add_step(&mut self, step: Step) -> Result<(), StepError> {
    let Applied { doc, map } = step.apply(&self.doc).inspect_err(|err| {
      tracing::debug!(%err, %step, "step failed to apply");
    })?;

    self.selection = self.selection.map(&self.doc, &doc, &map);
    self.docs.push(mem::replace(&mut self.doc, doc));
    self.steps.push(step);
    self.mapping.append_map(map);
    Ok(())
  }

  /// Apply a step, logging and skipping it if it fails.
  pub fn step(&mut self, step: impl Into<Step>) -> &mut Self {
    let step = step.into();
    if let Err(err) = self.add_step(step.clone()) {
      tracing::warn!(%err, %step, "skipping step");
    }
    self
  }

  pub fn replace(&mut self, from: usize, to: usize, slice: Slice) -> &mut Self {
    self.step(ReplaceStep::new(from, to, slice))
  }

  /// Replace a range with closed content.
  pub fn replace_with(&mut self, from: usize, to: usize, content: impl Into<Fragment>) -> &mut Self {
    self.replace(from, to, Slice::from_fragment(content))
  }

  pub fn delete(&mut self, from: usize, to: usize) -> &mut Self {
    self.replace(from, to, Slice::EMPTY)
  }

  pub fn insert(&mut self, pos: usize, content: impl Into<Fragment>) -> &mut Self {
    self.replace_with(pos, pos, content)
  }

  /// Replace a range with unmarked text. Empty text deletes the range.
  pub fn insert_text(&mut self, from: usize, to: usize, text: &str) -> &mut Self {
    if text.is_empty() {
      return self.delete(from, to);
    }
    let node = self.doc.node_type().schema().text(text, Vec::new());
    self.replace_with(from, to, node)
  }

  pub fn add_mark(&mut self, from: usize, to: usize, mark: Mark) -> &mut Self {
    self.step(AddMarkStep::new(from, to, mark))
  }

  pub fn remove_mark(&mut self, from: usize, to: usize, target: impl Into<MarkTarget>) -> &mut Self {
    self.step(RemoveMarkStep::new(from, to, target.into()))
  }

  /// Replace the selection. The new selection is not checked against the
  /// current document.
  pub fn set_selection(&mut self, selection: Selection) -> &mut Self {
    self.selection = selection;
    self
  }

  pub fn set_meta(&mut self, key: impl Into<String>, value: impl Into<Value>) -> &mut Self {
    self.meta.insert(key.into(), value.into());
    self
  }

  pub fn get_meta(&self, key: &str) -> Option<&Value> {
    self.meta.get(key)
  }

  /// Steps that undo this transaction, in the order they must be applied.
  pub fn invert_steps(&self) -> Result<Vec<Step>, StepError> {
    self
      .steps
      .iter()
      .zip(&self.docs)
      .rev()
      .map(|(step, doc)| step.invert(doc))
      .collect()
  }

  /// End the transaction, returning the final document and selection.
  pub fn finish(self) -> (Node, Selection) {
    (self.doc, self.selection)
  }
}

#[cfg(test)]
mod test {
  use serde_json::json;

  use super::*;
  use crate::{
    fixtures::{
      blockquote,
      doc,
      mark,
      marked,
      p,
      t,
    },
    map::{
      Assoc,
      StepMap,
    },
    position::ModelPosition,
  };

  #[test]
  fn deletes_and_restores_a_paragraph() {
    let before = doc(vec![p(vec![t("P1")]), p(vec![t("P2")]), p(vec![t("P3")])]);
    let mut tr = Transaction::new(before.clone(), Selection::default());
    tr.delete(4, 8);
    assert!(tr.doc_changed());
    assert_eq!(tr.doc(), &doc(vec![p(vec![t("P1")]), p(vec![t("P3")])]));

    let mut undo = Transaction::new(tr.doc().clone(), Selection::default());
    for step in tr.invert_steps().unwrap() {
      undo.add_step(step).unwrap();
    }
    assert_eq!(undo.doc(), &before);
  }

  #[test]
  fn failed_steps_change_nothing() {
    let before = doc(vec![p(vec![t("ab")])]);
    let selection = Selection::from_flat(&before, 2, 2).unwrap();
    let mut tr = Transaction::new(before.clone(), selection.clone());

    let err = tr.add_step(ReplaceStep::delete(3, 1).into()).unwrap_err();
    assert_eq!(err, StepError::InvalidRange { from: 3, to: 1 });
    tr.delete(0, 40).add_mark(0, 40, mark("em"));

    assert!(!tr.doc_changed());
    assert!(tr.docs().is_empty());
    assert!(tr.mapping().is_empty());
    assert_eq!(tr.doc(), &before);
    assert_eq!(tr.selection(), &selection);
  }

  #[test]
  fn selection_follows_edits() {
    let before = doc(vec![p(vec![t("hello")]), p(vec![t("world")])]);
    let selection = Selection::from_flat(&before, 9, 11).unwrap();
    let mut tr = Transaction::new(before, selection);

    tr.insert_text(1, 1, ">> ");
    assert_eq!(tr.selection().flat(tr.doc()), Ok((12, 14)));

    // Join the paragraphs: ">> hel" + "ld"
    tr.delete(7, 14);
    assert_eq!(tr.doc().text_content(), ">> helld");
    assert_eq!(tr.doc().child_count(), 1);
    assert_eq!(tr.selection().flat(tr.doc()), Ok((7, 7)));

    assert_eq!(tr.mapping().map(11, Assoc::Before), 7);
    assert_eq!(tr.mapping().map(0, Assoc::Before), 0);
    assert_eq!(tr.docs().len(), 2);
  }

  #[test]
  fn selection_follows_edits_across_nesting() {
    let before = doc(vec![blockquote(vec![p(vec![t("hello")])]), p(vec![t("world")])]);
    let selection = Selection::from_flat(&before, 4, 12).unwrap();
    let mut tr = Transaction::new(before.clone(), selection);

    tr.insert_text(2, 2, "> ");
    assert_eq!(tr.selection().flat(tr.doc()), Ok((6, 14)));
    assert_eq!(tr.selection().anchor, ModelPosition::new([0, 0, 0], 4));

    // A quote and a paragraph do not join, only the text between goes.
    tr.delete(6, 13);
    assert_eq!(
      tr.doc(),
      &doc(vec![blockquote(vec![p(vec![t("> he")])]), p(vec![t("orld")])])
    );
    assert_eq!(tr.mapping().maps()[1], StepMap::new(6, 13, 6, 9));
    assert_eq!(tr.selection().flat(tr.doc()), Ok((9, 10)));
    assert_eq!(tr.selection().head, ModelPosition::new([1, 0], 1));

    let mut undo = Transaction::new(tr.doc().clone(), Selection::default());
    for step in tr.invert_steps().unwrap() {
      undo.add_step(step).unwrap();
    }
    assert_eq!(undo.doc(), &before);
  }

  #[test]
  fn mark_round_trip() {
    let before = doc(vec![p(vec![t("hello")])]);
    let mut tr = Transaction::new(before.clone(), Selection::default());
    tr.add_mark(1, 3, mark("strong"));
    assert_eq!(
      tr.doc(),
      &doc(vec![p(vec![marked("he", &["strong"]), t("llo")])])
    );
    tr.remove_mark(1, 3, mark("strong"));
    assert_eq!(tr.doc(), &before);
    assert_eq!(tr.steps().len(), 2);

    tr.remove_mark(1, 6, mark("em").ty().clone());
    assert!(matches!(
      tr.invert_steps(),
      Err(StepError::NotInvertible(_))
    ));
  }

  #[test]
  fn meta_and_selection() {
    let before = doc(vec![p(vec![t("ab")])]);
    let mut tr = Transaction::new(before, Selection::default());
    tr.set_meta("origin", "paste").set_meta("count", 2);
    assert_eq!(tr.get_meta("origin"), Some(&json!("paste")));
    assert_eq!(tr.get_meta("count"), Some(&json!(2)));
    assert_eq!(tr.get_meta("missing"), None);

    // Not validated against the document.
    let far = Selection::point(ModelPosition::new([7, 7], 7));
    tr.set_selection(far.clone());
    let (doc, selection) = tr.finish();
    assert_eq!(selection, far);
    assert_eq!(doc.text_content(), "ab");
  }
}
