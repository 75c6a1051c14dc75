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

  let mut tr = Transaction::new(session.doc.clone(), Selection::default());
  for op in &session.ops {
    let Some(step) = step_for(&session.schema, tr.doc(), op) else {
      continue;
    };
    let _ = tr.add_step(step);
  }

  let Ok(inverted) = tr.invert_steps() else {
    return;
  };
  let mut undo = Transaction::new(tr.doc().clone(), Selection::default());
  for step in inverted {
    if let Err(err) = undo.add_step(step) {
      panic!("inverse step failed: {err}");
    }
  }
  assert_eq!(undo.doc(), &session.doc);
});
