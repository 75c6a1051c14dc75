#![no_main]

mod common;

use libfuzzer_sys::fuzz_target;
use the_doc::{
  Selection,
  Transaction,
};

use crate::common::{
  session_from_bytes,
  step_for,
};

fuzz_target!(|data: &[u8]| {
  let Some(session) = session_from_bytes(data) else {
    return;
  };

  let end = session.doc.content_size();
  let Ok(selection) = Selection::from_flat(&session.doc, end / 3, end * 2 / 3) else {
    return;
  };
  let mut tr = Transaction::new(session.doc.clone(), selection);
  for op in &session.ops {
    let Some(step) = step_for(&session.schema, tr.doc(), op) else {
      continue;
    };
    if tr.add_step(step).is_err() {
      continue;
    }

    // The selection always stays addressable and in document order.
    let Ok((anchor, head)) = tr.selection().flat(tr.doc()) else {
      panic!("selection left the document: {:?}", tr.selection());
    };
    assert!(anchor <= head && head <= tr.doc().content_size());
  }

  // Positions map monotonically.
  let mapped = (0..=end)
    .map(|pos| tr.mapping().map(pos, the_doc::Assoc::After))
    .collect::<Vec<_>>();
  assert!(mapped.windows(2).all(|pair| pair[0] <= pair[1]));
});
