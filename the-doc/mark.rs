//! Marks and mark sets.
//!
//! Every mark kind has a rank, its declaration order in the schema. A
//! [`MarkSet`] is kept sorted by rank and holds at most one mark of each kind,
//! so two sets with the same marks compare equal.

use std::fmt;

use indexmap::IndexMap;
use smallvec::SmallVec;

use crate::{
  Attrs,
  config::AttrSpec,
  schema::{
    self,
    Schema,
  },
};

pub type MarkSet = SmallVec<[Mark; 2]>;

pub(crate) struct MarkTypeData {
  pub(crate) name:  String,
  pub(crate) rank:  usize,
  pub(crate) attrs: IndexMap<String, AttrSpec>,
}

/// A mark kind of some [`Schema`].
#[derive(Clone)]
pub struct MarkType {
  schema: Schema,
  index:  usize,
}

impl MarkType {
  pub(crate) fn new(schema: Schema, index: usize) -> Self {
    Self { schema, index }
  }

  fn data(&self) -> &MarkTypeData {
    self.schema.mark_data(self.index)
  }

  pub fn schema(&self) -> &Schema {
    &self.schema
  }

  pub fn name(&self) -> &str {
    &self.data().name
  }

  pub fn rank(&self) -> usize {
    self.data().rank
  }

  pub fn attr_specs(&self) -> &IndexMap<String, AttrSpec> {
    &self.data().attrs
  }

  pub fn create(&self, attrs: Option<Attrs>) -> schema::Result<Mark> {
    let attrs = schema::compute_attrs(self.name(), self.attr_specs(), attrs)?;
    Ok(Mark {
      ty: self.clone(),
      attrs,
    })
  }

  /// The mark of this kind in `set`, if any.
  pub fn is_in_set<'a>(&self, set: &'a [Mark]) -> Option<&'a Mark> {
    set.iter().find(|mark| mark.ty == *self)
  }

  pub fn remove_from_set(&self, set: &[Mark]) -> MarkSet {
    set.iter().filter(|mark| mark.ty != *self).cloned().collect()
  }
}

impl PartialEq for MarkType {
  fn eq(&self, other: &Self) -> bool {
    self.index == other.index && self.schema.ptr_eq(&other.schema)
  }
}

impl Eq for MarkType {}

impl fmt::Debug for MarkType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "MarkType({})", self.name())
  }
}

/// A mark kind plus attribute values. Marks compare by value.
#[derive(Clone, PartialEq, Eq)]
pub struct Mark {
  ty:    MarkType,
  attrs: Attrs,
}

impl Mark {
  pub fn ty(&self) -> &MarkType {
    &self.ty
  }

  pub fn name(&self) -> &str {
    self.ty.name()
  }

  pub fn attrs(&self) -> &Attrs {
    &self.attrs
  }

  pub fn attr(&self, name: &str) -> Option<&serde_json::Value> {
    self.attrs.get(name)
  }

  /// Add this mark to `set`, replacing any mark of the same kind.
  pub fn add_to_set(&self, set: &[Mark]) -> MarkSet {
    let mut out = MarkSet::with_capacity(set.len() + 1);
    let mut placed = false;
    for mark in set {
      if mark.ty == self.ty {
        if !placed {
          out.push(self.clone());
          placed = true;
        }
        continue;
      }
      if !placed && mark.ty.rank() > self.ty.rank() {
        out.push(self.clone());
        placed = true;
      }
      out.push(mark.clone());
    }
    if !placed {
      out.push(self.clone());
    }
    out
  }

  /// Remove this exact mark from `set`. A mark of the same kind with
  /// different attributes is kept.
  pub fn remove_from_set(&self, set: &[Mark]) -> MarkSet {
    set.iter().filter(|mark| *mark != self).cloned().collect()
  }

  pub fn is_in_set(&self, set: &[Mark]) -> bool {
    set.contains(self)
  }

  pub fn same_set(a: &[Mark], b: &[Mark]) -> bool {
    a == b
  }

  /// Build a canonical set. Later marks win over earlier marks of the same
  /// kind.
  pub fn set_from(marks: impl IntoIterator<Item = Mark>) -> MarkSet {
    marks
      .into_iter()
      .fold(MarkSet::new(), |set, mark| mark.add_to_set(&set))
  }
}

impl fmt::Debug for Mark {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    fmt::Display::fmt(self, f)
  }
}

impl fmt::Display for Mark {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.name())?;
    if !self.attrs.is_empty() {
      let attrs = serde_json::to_string(&self.attrs).map_err(|_| fmt::Error)?;
      write!(f, "{attrs}")?;
    }
    Ok(())
  }
}

#[cfg(test)]
mod test {
  use serde_json::json;

  use super::*;
  use crate::fixtures;

  fn link(href: &str) -> Mark {
    let mut attrs = Attrs::new();
    attrs.insert("href".into(), json!(href));
    fixtures::schema().mark("link", Some(attrs)).unwrap()
  }

  #[test]
  fn sets_are_sorted_by_rank() {
    let schema = fixtures::schema();
    let em = schema.mark("em", None).unwrap();
    let strong = schema.mark("strong", None).unwrap();
    let code = schema.mark("code", None).unwrap();

    let set = Mark::set_from([code.clone(), em.clone(), strong.clone()]);
    let names: Vec<_> = set.iter().map(Mark::name).collect();
    assert_eq!(names, ["em", "strong", "code"]);

    let other = strong.add_to_set(&code.add_to_set(&em.add_to_set(&[])));
    assert!(Mark::same_set(&set, &other));
  }

  #[test]
  fn one_mark_per_kind() {
    let schema = fixtures::schema();
    let em = schema.mark("em", None).unwrap();
    let set = Mark::set_from([em.clone(), link("a")]);
    let set = link("b").add_to_set(&set);
    assert_eq!(set.len(), 2);
    assert_eq!(set[1].attr("href"), Some(&json!("b")));

    assert!(!link("a").is_in_set(&set));
    assert_eq!(link("a").remove_from_set(&set), set);
    assert_eq!(link("b").remove_from_set(&set).as_slice(), [em.clone()]);
    assert_eq!(set[1].ty().remove_from_set(&set).as_slice(), [em]);
  }

  #[test]
  fn display() {
    assert_eq!(link("x").to_string(), r#"link{"href":"x"}"#);
    assert_eq!(fixtures::schema().mark("em", None).unwrap().to_string(), "em");
  }
}
