use std::sync::OnceLock;

use the_doc::{
  Mark,
  Node,
  Schema,
  SchemaSpec,
  Slice,
  Step,
  mark_step::{
    AddMarkStep,
    MarkTarget,
    RemoveMarkStep,
  },
  replace::ReplaceStep,
};

const MAX_BLOCKS: usize = 16;
const MAX_OPS: usize = 64;
const MAX_TEXT_BYTES: usize = 32;
const MARKS: &[&str] = &["em", "strong", "code"];

#[derive(Debug, Clone)]
pub enum EditOp {
  /// Replace a range with a slice cut from the current document.
  Replace {
    from:       u16,
    to:         u16,
    slice_from: u16,
    slice_to:   u16,
  },
  InsertText {
    at:   u16,
    text: Vec<u8>,
  },
  AddMark {
    from: u16,
    to:   u16,
    mark: u8,
  },
  RemoveMark {
    from: u16,
    to:   u16,
    mark: u8,
  },
}

pub struct FuzzSession {
  pub schema: Schema,
  pub doc:    Node,
  pub ops:    Vec<EditOp>,
}

pub fn session_from_bytes(data: &[u8]) -> Option<FuzzSession> {
  let schema = fuzz_schema()?;
  let mut cursor = ByteCursor::new(data);
  let doc = decode_doc(&schema, &mut cursor)?;
  let op_count = cursor.next_usize(MAX_OPS);
  let ops = (0..op_count).map(|_| decode_op(&mut cursor)).collect();
  Some(FuzzSession { schema, doc, ops })
}

/// Turn an op into a step addressed inside `doc`.
pub fn step_for(schema: &Schema, doc: &Node, op: &EditOp) -> Option<Step> {
  let size = doc.content_size();
  let clamp = |pos: u16| (pos as usize) % (size + 1);
  let ordered = |a: u16, b: u16| {
    let (a, b) = (clamp(a), clamp(b));
    (a.min(b), a.max(b))
  };

  let step = match op {
    EditOp::Replace {
      from,
      to,
      slice_from,
      slice_to,
    } => {
      let (from, to) = ordered(*from, *to);
      let (a, b) = ordered(*slice_from, *slice_to);
      let slice = doc.slice(a, b).unwrap_or(Slice::EMPTY);
      ReplaceStep::new(from, to, slice).into()
    },
    EditOp::InsertText { at, text } => {
      let text = String::from_utf8_lossy(text);
      if text.is_empty() {
        return None;
      }
      ReplaceStep::insert(clamp(*at), schema.text(&*text, Vec::new())).into()
    },
    EditOp::AddMark { from, to, mark } => {
      let (from, to) = ordered(*from, *to);
      AddMarkStep::new(from, to, mark_for(schema, *mark)?).into()
    },
    EditOp::RemoveMark { from, to, mark } => {
      let (from, to) = ordered(*from, *to);
      RemoveMarkStep::new(from, to, MarkTarget::Mark(mark_for(schema, *mark)?)).into()
    },
  };
  Some(step)
}

fn mark_for(schema: &Schema, index: u8) -> Option<Mark> {
  schema
    .mark(MARKS[index as usize % MARKS.len()], None)
    .ok()
}

fn fuzz_schema() -> Option<Schema> {
  static SCHEMA: OnceLock<Option<Schema>> = OnceLock::new();
  SCHEMA
    .get_or_init(|| {
      let spec = SchemaSpec::builtin().ok()?;
      Schema::new(spec).ok()
    })
    .clone()
}

fn decode_doc(schema: &Schema, cursor: &mut ByteCursor<'_>) -> Option<Node> {
  let count = 1 + cursor.next_usize(MAX_BLOCKS - 1);
  let mut blocks = Vec::with_capacity(count);
  for _ in 0..count {
    let block = match cursor.next_u8() % 4 {
      0 => {
        schema
          .node("horizontal_rule", None, Vec::<Node>::new(), Vec::new())
          .ok()?
      },
      1 => {
        let para = decode_paragraph(schema, cursor)?;
        schema
          .node("blockquote", None, vec![para], Vec::new())
          .ok()?
      },
      _ => decode_paragraph(schema, cursor)?,
    };
    blocks.push(block);
  }
  schema.node("doc", None, blocks, Vec::new()).ok()
}

fn decode_paragraph(schema: &Schema, cursor: &mut ByteCursor<'_>) -> Option<Node> {
  let len = cursor.next_usize(MAX_TEXT_BYTES);
  let text = String::from_utf8_lossy(cursor.next_bytes(len)).into_owned();
  let marks = match cursor.next_u8() % 3 {
    0 => Vec::new(),
    index => vec![mark_for(schema, index - 1)?],
  };
  let content = if text.is_empty() {
    Vec::new()
  } else {
    vec![schema.text(text, marks)]
  };
  schema.node("paragraph", None, content, Vec::new()).ok()
}

fn decode_op(cursor: &mut ByteCursor<'_>) -> EditOp {
  match cursor.next_u8() % 4 {
    0 => {
      EditOp::Replace {
        from:       cursor.next_u16(),
        to:         cursor.next_u16(),
        slice_from: cursor.next_u16(),
        slice_to:   cursor.next_u16(),
      }
    },
    1 => {
      let at = cursor.next_u16();
      let len = cursor.next_usize(MAX_TEXT_BYTES);
      EditOp::InsertText {
        at,
        text: cursor.next_bytes(len).to_vec(),
      }
    },
    2 => {
      EditOp::AddMark {
        from: cursor.next_u16(),
        to:   cursor.next_u16(),
        mark: cursor.next_u8(),
      }
    },
    _ => {
      EditOp::RemoveMark {
        from: cursor.next_u16(),
        to:   cursor.next_u16(),
        mark: cursor.next_u8(),
      }
    },
  }
}

struct ByteCursor<'a> {
  data: &'a [u8],
  pos:  usize,
}

impl<'a> ByteCursor<'a> {
  fn new(data: &'a [u8]) -> Self {
    Self { data, pos: 0 }
  }

  fn next_u8(&mut self) -> u8 {
    let value = self.data.get(self.pos).copied().unwrap_or(0);
    self.pos = self.pos.saturating_add(1);
    value
  }

  fn next_u16(&mut self) -> u16 {
    let lo = self.next_u8() as u16;
    let hi = self.next_u8() as u16;
    lo | (hi << 8)
  }

  fn next_usize(&mut self, max: usize) -> usize {
    if max == 0 {
      return 0;
    }
    (self.next_u16() as usize) % (max + 1)
  }

  fn next_bytes(&mut self, len: usize) -> &'a [u8] {
    let start = self.pos.min(self.data.len());
    let end = start.saturating_add(len).min(self.data.len());
    self.pos = end;
    &self.data[start..end]
  }
}
