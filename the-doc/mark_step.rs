//! Add and remove mark steps.
//!
//! Both steps walk every inline node overlapping the range and rewrite its
//! mark set. Text runs that only partly overlap are split into an untouched
//! prefix, a rewritten middle and an untouched suffix. Mark steps never change
//! the size of anything, so their step map is the identity.

use std::fmt;

use crate::{
  fragment::Fragment,
  map::{
    Assoc,
    Mapping,
    StepMap,
  },
  mark::{
    Mark,
    MarkSet,
    MarkType,
  },
  node::Node,
  step::{
    Applied,
    Result,
    StepError,
  },
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddMarkStep {
  pub from: usize,
  pub to:   usize,
  pub mark: Mark,
}

/// What a [`RemoveMarkStep`] takes away: one exact mark, or every mark of a
/// kind regardless of its attributes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarkTarget {
  Mark(Mark),
  Type(MarkType),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoveMarkStep {
  pub from:   usize,
  pub to:     usize,
  pub target: MarkTarget,
}

impl AddMarkStep {
  pub fn new(from: usize, to: usize, mark: Mark) -> Self {
    Self { from, to, mark }
  }

  pub fn apply(&self, doc: &Node) -> Result<Applied> {
    check_range(doc, self.from, self.to)?;
    let mark = &self.mark;
    let doc = rewrite_doc(doc, self.from, self.to, &|parent, marks| {
      if !parent.node_type().allows_mark_type(mark.ty()) || mark.is_in_set(marks) {
        return None;
      }
      Some(mark.add_to_set(marks))
    });
    Ok(Applied {
      doc,
      map: StepMap::identity(),
    })
  }

  pub fn invert(&self) -> RemoveMarkStep {
    RemoveMarkStep::new(self.from, self.to, MarkTarget::Mark(self.mark.clone()))
  }

  pub fn map(&self, mapping: &Mapping) -> Option<AddMarkStep> {
    let (from, to) = map_range(mapping, self.from, self.to)?;
    Some(Self::new(from, to, self.mark.clone()))
  }
}

impl RemoveMarkStep {
  pub fn new(from: usize, to: usize, target: MarkTarget) -> Self {
    Self { from, to, target }
  }

  pub fn apply(&self, doc: &Node) -> Result<Applied> {
    check_range(doc, self.from, self.to)?;
    let doc = rewrite_doc(doc, self.from, self.to, &|_, marks| {
      match &self.target {
        MarkTarget::Mark(mark) => mark.is_in_set(marks).then(|| mark.remove_from_set(marks)),
        MarkTarget::Type(ty) => ty.is_in_set(marks).map(|_| ty.remove_from_set(marks)),
      }
    });
    Ok(Applied {
      doc,
      map: StepMap::identity(),
    })
  }

  /// Only the removal of an exact mark can be undone. Removing by kind loses
  /// the attribute values of the marks it took away.
  pub fn invert(&self) -> Result<AddMarkStep> {
    match &self.target {
      MarkTarget::Mark(mark) => Ok(AddMarkStep::new(self.from, self.to, mark.clone())),
      MarkTarget::Type(_) => {
        Err(StepError::NotInvertible(
          "removal by mark kind does not record the removed attributes",
        ))
      },
    }
  }

  pub fn map(&self, mapping: &Mapping) -> Option<RemoveMarkStep> {
    let (from, to) = map_range(mapping, self.from, self.to)?;
    Some(Self::new(from, to, self.target.clone()))
  }
}

impl fmt::Display for MarkTarget {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Mark(mark) => write!(f, "{mark}"),
      Self::Type(ty) => write!(f, "all {}", ty.name()),
    }
  }
}

impl From<Mark> for MarkTarget {
  fn from(mark: Mark) -> Self {
    Self::Mark(mark)
  }
}

impl From<MarkType> for MarkTarget {
  fn from(ty: MarkType) -> Self {
    Self::Type(ty)
  }
}

fn check_range(doc: &Node, from: usize, to: usize) -> Result<()> {
  if from > to {
    return Err(StepError::InvalidRange { from, to });
  }
  if to > doc.content_size() {
    return Err(StepError::RangeOutOfBounds {
      from,
      to,
      size: doc.content_size(),
    });
  }
  Ok(())
}

fn map_range(mapping: &Mapping, from: usize, to: usize) -> Option<(usize, usize)> {
  let from = mapping.map_result(from, Assoc::After);
  let to = mapping.map_result(to, Assoc::Before);
  if (from.deleted && to.deleted) || from.pos >= to.pos {
    return None;
  }
  Some((from.pos, to.pos))
}

/// Computes the new mark set of an inline node under `parent`, or `None` to
/// leave it alone.
type Rewrite<'a> = dyn Fn(&Node, &[Mark]) -> Option<MarkSet> + 'a;

fn rewrite_doc(doc: &Node, from: usize, to: usize, rewrite: &Rewrite<'_>) -> Node {
  if from == to {
    return doc.clone();
  }
  match rewrite_content(doc, 0, from, to, rewrite) {
    Some(content) => doc.with_content(content),
    None => doc.clone(),
  }
}

/// Rewrite the children of `parent`, whose content starts at flat offset
/// `start`. Returns `None` when nothing changed.
fn rewrite_content(
  parent: &Node,
  start: usize,
  from: usize,
  to: usize,
  rewrite: &Rewrite<'_>,
) -> Option<Fragment> {
  let mut changed = false;
  let mut nodes = Vec::with_capacity(parent.child_count());
  let mut pos = start;
  for child in parent.children() {
    let end = pos + child.node_size();
    let overlaps = end > from && pos < to;
    let child_start = pos;
    pos = end;
    if !overlaps {
      nodes.push(child.clone());
      continue;
    }

    if child.is_text() {
      let Some(marks) = rewrite(parent, child.marks()) else {
        nodes.push(child.clone());
        continue;
      };
      let len = child.node_size();
      let a = from.saturating_sub(child_start);
      let b = (to - child_start).min(len);
      if a > 0 {
        nodes.push(child.cut(0, a));
      }
      nodes.push(child.cut(a, b).with_marks(marks));
      if b < len {
        nodes.push(child.cut(b, len));
      }
      changed = true;
    } else if child.is_leaf() {
      match rewrite(parent, child.marks()) {
        Some(marks) if child.is_inline() => {
          nodes.push(child.with_marks(marks));
          changed = true;
        },
        _ => nodes.push(child.clone()),
      }
    } else {
      match rewrite_content(child, child_start + 1, from, to, rewrite) {
        Some(content) => {
          nodes.push(child.with_content(content));
          changed = true;
        },
        None => nodes.push(child.clone()),
      }
    }
  }

  if !changed {
    return None;
  }
  let content = Fragment::from_nodes(nodes);
  Some(if parent.inline_content() {
    content.normalized()
  } else {
    content
  })
}

#[cfg(test)]
mod test {
  use quickcheck::{
    TestResult,
    quickcheck,
  };
  use serde_json::json;

  use super::*;
  use crate::{
    Attrs,
    fixtures::{
      ArbDoc,
      blockquote,
      doc,
      img,
      mark,
      marked,
      node,
      p,
      schema,
      t,
    },
    step::Step,
  };

  fn link(href: &str) -> Mark {
    let mut attrs = Attrs::new();
    attrs.insert("href".into(), json!(href));
    schema().mark("link", Some(attrs)).unwrap()
  }

  #[test]
  fn bold_across_paragraphs() {
    let before = doc(vec![
      p(vec![t("Paragraph "), t("one")]),
      p(vec![t("Paragraph "), t("two")]),
    ]);
    let applied = AddMarkStep::new(11, 26, mark("strong")).apply(&before).unwrap();
    assert_eq!(
      applied.doc,
      doc(vec![
        p(vec![t("Paragraph "), marked("one", &["strong"])]),
        p(vec![marked("Paragraph ", &["strong"]), t("two")]),
      ])
    );
    assert!(applied.map.is_identity());
  }

  #[test]
  fn splits_partially_covered_runs() {
    let before = doc(vec![p(vec![t("hello world")])]);
    let after = AddMarkStep::new(3, 8, mark("em")).apply(&before).unwrap().doc;
    assert_eq!(
      after,
      doc(vec![p(vec![t("he"), marked("llo w", &["em"]), t("orld")])])
    );

    let restored = RemoveMarkStep::new(3, 8, mark("em").into())
      .apply(&after)
      .unwrap()
      .doc;
    assert_eq!(restored, before);
    assert_eq!(restored.child(0).unwrap().child_count(), 1);
  }

  #[test]
  fn replaces_marks_of_the_same_kind() {
    let before = doc(vec![p(vec![t("ab")])]);
    let once = AddMarkStep::new(1, 3, link("a")).apply(&before).unwrap().doc;
    let twice = AddMarkStep::new(2, 3, link("b")).apply(&once).unwrap().doc;
    let para = twice.child(0).unwrap();
    assert_eq!(para.child_count(), 2);
    assert_eq!(para.child(1).unwrap().marks(), [link("b")]);
  }

  #[test]
  fn unchanged_runs_are_reused() {
    let first = p(vec![marked("ab", &["em"])]);
    let before = doc(vec![first.clone(), p(vec![t("cd")])]);
    let after = AddMarkStep::new(1, 8, mark("em")).apply(&before).unwrap().doc;
    assert_eq!(after.child(0).unwrap().id(), first.id());
    assert_eq!(after.child(1).unwrap(), &p(vec![marked("cd", &["em"])]));
  }

  #[test]
  fn respects_allowed_marks_and_marks_atoms() {
    let code = node("code_block", vec![t("let x")]);
    let before = doc(vec![code.clone(), blockquote(vec![p(vec![img("a.png"), t("x")])])]);
    let after = AddMarkStep::new(0, before.content_size(), mark("strong"))
      .apply(&before)
      .unwrap()
      .doc;
    assert_eq!(after.child(0).unwrap(), &code);
    let para = after.child(1).unwrap().child(0).unwrap();
    assert_eq!(para.child(0).unwrap().marks(), [mark("strong")]);
    assert_eq!(para.child(1).unwrap(), &marked("x", &["strong"]));
  }

  #[test]
  fn remove_by_kind() {
    let linked = t("b").with_marks(Mark::set_from([link("x"), mark("em")]));
    let before = doc(vec![p(vec![t("a"), linked])]);
    let step = RemoveMarkStep::new(0, 4, MarkTarget::Type(link("x").ty().clone()));
    let after = step.apply(&before).unwrap().doc;
    assert_eq!(after, doc(vec![p(vec![t("a"), marked("b", &["em"])])]));
    assert!(matches!(step.invert(), Err(StepError::NotInvertible(_))));

    let step = Step::from(step);
    assert!(matches!(
      step.invert(&before),
      Err(StepError::NotInvertible(_))
    ));
  }

  #[test]
  fn add_inverts_to_exact_removal() {
    let step = AddMarkStep::new(1, 3, link("x"));
    assert_eq!(
      step.invert(),
      RemoveMarkStep::new(1, 3, MarkTarget::Mark(link("x")))
    );
    assert_eq!(step.invert().invert(), Ok(step));
  }

  #[test]
  fn mapping_can_collapse_the_range() {
    let step = AddMarkStep::new(4, 8, mark("em"));
    assert_eq!(
      step.map(&Mapping::from(StepMap::new(0, 0, 0, 2))),
      Some(AddMarkStep::new(6, 10, mark("em")))
    );
    assert_eq!(step.map(&Mapping::from(StepMap::new(2, 10, 2, 2))), None);
  }

  #[test]
  fn rejects_bad_ranges() {
    let before = doc(vec![p(vec![t("ab")])]);
    assert!(matches!(
      AddMarkStep::new(3, 2, mark("em")).apply(&before),
      Err(StepError::InvalidRange { .. })
    ));
    assert!(matches!(
      AddMarkStep::new(0, 5, mark("em")).apply(&before),
      Err(StepError::RangeOutOfBounds { .. })
    ));
  }

  quickcheck! {
    fn add_then_remove_restores(doc: ArbDoc, from: usize, to: usize) -> TestResult {
      let doc = doc.0;
      let size = doc.content_size() + 1;
      let (from, to) = ((from % size).min(to % size), (from % size).max(to % size));
      // The generated documents never carry `code` marks.
      let add = AddMarkStep::new(from, to, mark("code"));
      let Ok(added) = add.apply(&doc) else {
        return TestResult::failed();
      };
      match add.invert().apply(&added.doc) {
        Ok(removed) => TestResult::from_bool(removed.doc == doc),
        Err(_) => TestResult::failed(),
      }
    }
  }
}
