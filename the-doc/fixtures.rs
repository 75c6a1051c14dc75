//! Builders for test documents over the built-in schema.

use std::sync::OnceLock;

use quickcheck::{
  Arbitrary,
  Gen,
};
use serde_json::json;

use crate::{
  Attrs,
  Fragment,
  Mark,
  Node,
  Schema,
  SchemaSpec,
};

pub fn schema() -> Schema {
  static SCHEMA: OnceLock<Schema> = OnceLock::new();
  SCHEMA
    .get_or_init(|| {
      let spec = SchemaSpec::builtin().expect("built-in schema parses");
      Schema::new(spec).expect("built-in schema is valid")
    })
    .clone()
}

pub fn mark(name: &str) -> Mark {
  schema().mark(name, None).expect("mark without required attributes")
}

pub fn t(text: &str) -> Node {
  schema().text(text, Vec::new())
}

pub fn marked(text: &str, marks: &[&str]) -> Node {
  schema().text(text, marks.iter().map(|name| mark(name)).collect())
}

pub fn node(name: &str, children: Vec<Node>) -> Node {
  schema()
    .node(name, None, children, Vec::new())
    .expect("node without required attributes")
}

pub fn doc(children: Vec<Node>) -> Node {
  node("doc", children)
}

pub fn p(children: Vec<Node>) -> Node {
  node("paragraph", children)
}

pub fn blockquote(children: Vec<Node>) -> Node {
  node("blockquote", children)
}

pub fn h(level: u8, children: Vec<Node>) -> Node {
  let mut attrs = Attrs::new();
  attrs.insert("level".into(), json!(level));
  schema()
    .node("heading", Some(attrs), children, Vec::new())
    .expect("heading")
}

pub fn hr() -> Node {
  node("horizontal_rule", Vec::new())
}

pub fn img(src: &str) -> Node {
  let mut attrs = Attrs::new();
  attrs.insert("src".into(), json!(src));
  schema()
    .node("image", Some(attrs), Vec::<Node>::new(), Vec::new())
    .expect("image")
}

/// A random document of paragraphs, headings, quotes and rules. Text never
/// carries the `code` mark.
#[derive(Clone)]
pub struct ArbDoc(pub Node);

impl std::fmt::Debug for ArbDoc {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}", self.0)
  }
}

const WORDS: &[&str] = &["a", "bc", "def", "héllo", " ", "xyz!"];

fn arb_inline(g: &mut Gen) -> Vec<Node> {
  let len = usize::arbitrary(g) % 4;
  let nodes = (0..len)
    .map(|_| {
      if u8::arbitrary(g) % 6 == 0 {
        return img("pic.png");
      }
      let word = g.choose(WORDS).copied().unwrap_or("a");
      let mut marks = Vec::new();
      if bool::arbitrary(g) {
        marks.push("em");
      }
      if bool::arbitrary(g) {
        marks.push("strong");
      }
      marked(word, &marks)
    })
    .collect();
  Fragment::from_nodes(nodes).normalized().into_vec()
}

fn arb_block(g: &mut Gen, nested: bool) -> Node {
  match u8::arbitrary(g) % 5 {
    0 | 1 => p(arb_inline(g)),
    2 => h(1 + u8::arbitrary(g) % 2, arb_inline(g)),
    3 if !nested => {
      let len = 1 + usize::arbitrary(g) % 2;
      blockquote((0..len).map(|_| arb_block(g, true)).collect())
    },
    _ => hr(),
  }
}

impl Arbitrary for ArbDoc {
  fn arbitrary(g: &mut Gen) -> Self {
    let len = 1 + usize::arbitrary(g) % 4;
    ArbDoc(doc((0..len).map(|_| arb_block(g, false)).collect()))
  }

  fn shrink(&self) -> Box<dyn Iterator<Item = Self>> {
    let blocks: Vec<Node> = self.0.children().cloned().collect();
    if blocks.len() < 2 {
      return Box::new(std::iter::empty());
    }
    Box::new((0..blocks.len()).map(move |skip| {
      let rest = blocks
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != skip)
        .map(|(_, node)| node.clone())
        .collect();
      ArbDoc(doc(rest))
    }))
  }
}
