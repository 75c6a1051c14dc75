//! Structured document model and transform engine.
//!
//! Documents are immutable trees of [`Node`]s validated against a
//! [`Schema`]. Edits are expressed as [`Step`]s that produce new trees and a
//! [`StepMap`] describing how positions moved. A [`Transaction`] applies a
//! sequence of steps to one starting document and keeps a [`Selection`]
//! pointing at the same content while the tree changes underneath it.
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
//! let text = schema.text("hello", Vec::new());
//! let para = schema.node("paragraph", None, vec![text], Vec::new()).unwrap();
//! let doc = schema.node("doc", None, vec![para], Vec::new()).unwrap();
//!
//! let selection = Selection::from_flat(&doc, 6, 6).unwrap();
//! let mut tr = Transaction::new(doc, selection);
//! tr.insert_text(6, 6, " world");
//!
//! let (doc, _selection) = tr.finish();
//! assert_eq!(doc.text_content(), "hello world");
//! ```

use std::collections::BTreeMap;

use smartstring::{
  LazyCompact,
  SmartString,
};

pub mod config;
pub mod content;
pub mod fragment;
pub mod map;
pub mod mark;
pub mod mark_step;
pub mod node;
pub mod position;
pub mod replace;
pub mod schema;
pub mod selection;
pub mod slice;
pub mod step;
pub mod transaction;

#[cfg(test)]
mod fixtures;

pub type Tendril = SmartString<LazyCompact>;

/// Attribute values of a node or mark, keyed by attribute name.
pub type Attrs = BTreeMap<String, serde_json::Value>;

pub use config::SchemaSpec;
pub use fragment::Fragment;
pub use map::{
  Assoc,
  Mapping,
  StepMap,
};
pub use mark::{
  Mark,
  MarkSet,
  MarkType,
};
pub use node::{
  Node,
  NodeId,
};
pub use position::{
  ModelPosition,
  ResolvedPos,
  to_flat_offset,
  to_model_position,
};
pub use schema::{
  NodeType,
  Schema,
  SchemaError,
  Validation,
};
pub use selection::Selection;
pub use slice::Slice;
pub use step::{
  Applied,
  Step,
  StepError,
};
pub use transaction::Transaction;
