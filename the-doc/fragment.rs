use std::fmt;

use crate::{
  mark::Mark,
  node::Node,
};

/// An ordered child list with its cached total size.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Fragment {
  nodes: Vec<Node>,
  size:  usize,
}

impl Fragment {
  pub const EMPTY: Fragment = Fragment {
    nodes: Vec::new(),
    size:  0,
  };

  pub fn empty() -> Self {
    Self::EMPTY
  }

  /// Build a fragment as given, without normalizing text runs.
  pub fn from_nodes(nodes: Vec<Node>) -> Self {
    let size = nodes.iter().map(Node::node_size).sum();
    Self { nodes, size }
  }

  /// Merge adjacent text runs with equal mark sets and drop empty text runs,
  /// unless the run is the only child.
  pub fn normalized(self) -> Self {
    if self.is_normalized() {
      return self;
    }
    let sole = self.nodes.len() == 1;
    let mut out: Vec<Node> = Vec::with_capacity(self.nodes.len());
    for node in self.nodes {
      if node.is_text() && node.node_size() == 0 && !sole {
        continue;
      }
      if let Some(last) = out.last_mut() &&
        let Some(merged) = last.merge_text(&node)
      {
        *last = merged;
        continue;
      }
      out.push(node);
    }
    Self::from_nodes(out)
  }

  pub fn is_normalized(&self) -> bool {
    let sole = self.nodes.len() == 1;
    !self
      .nodes
      .iter()
      .any(|node| node.is_text() && node.node_size() == 0 && !sole) &&
      !self
        .nodes
        .windows(2)
        .any(|pair| pair[0].is_text() && pair[1].is_text() && Mark::same_set(pair[0].marks(), pair[1].marks()))
  }

  #[inline]
  pub fn size(&self) -> usize {
    self.size
  }

  #[inline]
  pub fn child_count(&self) -> usize {
    self.nodes.len()
  }

  #[inline]
  pub fn is_empty(&self) -> bool {
    self.nodes.is_empty()
  }

  pub fn child(&self, index: usize) -> Option<&Node> {
    self.nodes.get(index)
  }

  pub fn first_child(&self) -> Option<&Node> {
    self.nodes.first()
  }

  pub fn last_child(&self) -> Option<&Node> {
    self.nodes.last()
  }

  pub fn iter(&self) -> std::slice::Iter<'_, Node> {
    self.nodes.iter()
  }

  pub fn as_slice(&self) -> &[Node] {
    &self.nodes
  }

  pub fn into_vec(self) -> Vec<Node> {
    self.nodes
  }

  /// Concatenate two fragments, merging text runs that meet at the seam.
  pub fn append(&self, other: &Fragment) -> Fragment {
    if other.is_empty() {
      return self.clone();
    }
    if self.is_empty() {
      return other.clone();
    }
    let mut nodes = Vec::with_capacity(self.nodes.len() + other.nodes.len());
    nodes.extend_from_slice(&self.nodes);
    let mut rest = other.nodes.iter();
    if let (Some(last), Some(first)) = (nodes.last_mut(), other.nodes.first()) &&
      let Some(merged) = last.merge_text(first)
    {
      *last = merged;
      rest.next();
    }
    nodes.extend(rest.cloned());
    Self::from_nodes(nodes)
  }

  /// The content between two offsets into this fragment. Children that are
  /// only partially covered are cut down as well.
  pub fn cut(&self, from: usize, to: usize) -> Fragment {
    let to = to.min(self.size);
    if from == 0 && to == self.size {
      return self.clone();
    }
    let mut out = Vec::new();
    if to > from {
      let mut pos = 0;
      for child in &self.nodes {
        if pos >= to {
          break;
        }
        let end = pos + child.node_size();
        if end > from {
          if pos < from || end > to {
            if child.is_text() {
              out.push(child.cut(from.saturating_sub(pos), (to - pos).min(child.node_size())));
            } else {
              out.push(child.cut(
                from.saturating_sub(pos + 1),
                (to - pos).saturating_sub(1).min(child.content_size()),
              ));
            }
          } else {
            out.push(child.clone());
          }
        }
        pos = end;
      }
    }
    Self::from_nodes(out)
  }

  /// The child index at `pos` and the offset where that child starts. A
  /// position on a boundary between two children points at the second one.
  pub fn find_index(&self, pos: usize) -> (usize, usize) {
    if pos == 0 {
      return (0, 0);
    }
    if pos >= self.size {
      return (self.nodes.len(), self.size);
    }
    let mut cur = 0;
    for (index, child) in self.nodes.iter().enumerate() {
      let end = cur + child.node_size();
      if end >= pos {
        if end == pos {
          return (index + 1, end);
        }
        return (index, cur);
      }
      cur = end;
    }
    (self.nodes.len(), self.size)
  }

  /// The offset at which the child `index` starts.
  pub fn offset_at(&self, index: usize) -> usize {
    self.nodes.iter().take(index).map(Node::node_size).sum()
  }

  pub(crate) fn replace_child(&self, index: usize, node: Node) -> Fragment {
    let mut nodes = self.nodes.clone();
    nodes[index] = node;
    Self::from_nodes(nodes)
  }
}

impl From<Vec<Node>> for Fragment {
  fn from(nodes: Vec<Node>) -> Self {
    Self::from_nodes(nodes)
  }
}

impl From<Node> for Fragment {
  fn from(node: Node) -> Self {
    Self::from_nodes(vec![node])
  }
}

impl FromIterator<Node> for Fragment {
  fn from_iter<I: IntoIterator<Item = Node>>(iter: I) -> Self {
    Self::from_nodes(iter.into_iter().collect())
  }
}

impl<'a> IntoIterator for &'a Fragment {
  type Item = &'a Node;
  type IntoIter = std::slice::Iter<'a, Node>;

  fn into_iter(self) -> Self::IntoIter {
    self.nodes.iter()
  }
}

impl fmt::Display for Fragment {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    for (index, node) in self.nodes.iter().enumerate() {
      if index > 0 {
        f.write_str(", ")?;
      }
      write!(f, "{node}")?;
    }
    Ok(())
  }
}

impl fmt::Debug for Fragment {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "<{self}>")
  }
}

#[cfg(test)]
mod test {
  use quickcheck::quickcheck;

  use super::*;
  use crate::fixtures::{
    img,
    marked,
    p,
    t,
  };

  #[test]
  fn normalize_merges_equal_runs() {
    let frag = Fragment::from(vec![t("ab"), t(""), t("cd"), marked("ef", &["strong"]), marked("g", &["strong"])]);
    assert!(!frag.is_normalized());
    let normal = frag.normalized();
    assert_eq!(normal.child_count(), 2);
    assert_eq!(normal.child(0).unwrap().text(), Some("abcd"));
    assert_eq!(normal.child(1).unwrap().text(), Some("efg"));
    assert_eq!(normal.size(), 7);
    assert_eq!(normal.clone().normalized(), normal);
  }

  #[test]
  fn normalize_keeps_sole_empty_run() {
    let frag = Fragment::from(vec![t("")]);
    assert!(frag.is_normalized());
    assert_eq!(frag.normalized().child_count(), 1);
  }

  #[test]
  fn cut_text_and_containers() {
    let frag = Fragment::from(vec![t("hello "), marked("world", &["em"])]);
    let cut = frag.cut(3, 8);
    assert_eq!(cut.child(0).unwrap().text(), Some("lo "));
    assert_eq!(cut.child(1).unwrap().text(), Some("wo"));

    let blocks = Fragment::from(vec![p(vec![t("one")]), p(vec![t("two")])]);
    let cut = blocks.cut(2, 7);
    assert_eq!(cut, Fragment::from(vec![p(vec![t("ne")]), p(vec![t("t")])]));
    assert_eq!(blocks.cut(5, 5), Fragment::empty());
  }

  #[test]
  fn find_index_prefers_next_child_on_boundaries() {
    let frag = Fragment::from(vec![p(vec![t("ab")]), p(vec![t("cd")])]);
    assert_eq!(frag.find_index(0), (0, 0));
    assert_eq!(frag.find_index(1), (0, 0));
    assert_eq!(frag.find_index(4), (1, 4));
    assert_eq!(frag.find_index(6), (1, 4));
    assert_eq!(frag.find_index(8), (2, 8));
    assert_eq!(frag.offset_at(1), 4);
  }

  #[test]
  fn append_merges_seam() {
    let left = Fragment::from(vec![p(vec![]), t("ab")]);
    let right = Fragment::from(vec![t("cd"), p(vec![])]);
    let joined = left.append(&right);
    assert_eq!(joined.child_count(), 3);
    assert_eq!(joined.child(1).unwrap().text(), Some("abcd"));
  }

  quickcheck! {
    fn normalize_is_idempotent(runs: Vec<(u8, bool)>) -> bool {
      const WORDS: &[&str] = &["", "a", "bc", "déf"];
      let nodes = runs
        .iter()
        .map(|&(word, em)| match word % 5 {
          4 => img("x.png"),
          word => {
            let marks: &[&str] = if em { &["em"] } else { &[] };
            marked(WORDS[word as usize], marks)
          },
        })
        .collect::<Vec<_>>();
      let once = Fragment::from_nodes(nodes).normalized();
      once.is_normalized() && once.clone().normalized() == once
    }
  }
}
