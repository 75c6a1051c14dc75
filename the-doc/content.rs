//! Content expressions.
//!
//! A content expression constrains the children of a node kind. The grammar is
//! a deliberately small subset of a regular language:
//!
//! - an atom is a node kind name or a group label, optionally followed by a
//!   quantifier: `*` (zero or more), `+` (one or more) or `?` (zero or one);
//! - a choice group `(a | b | c)` matches any one member per occurrence and
//!   takes a quantifier the same way;
//! - an expression is a whitespace separated sequence of such terms,
//!   e.g. `image figcaption?`.
//!
//! An unquantified term defaults to `+` when it is the only term of the
//! expression and to exactly one inside a longer sequence. The `text` atom
//! defaults to `*` in both cases.
//!
//! Names are resolved against a schema into [`ContentMatch`], which checks a
//! candidate child sequence with a small backtracking matcher.

use smallvec::SmallVec;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ContentError>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ContentError {
  #[error("unexpected character {found:?} at offset {offset} in content expression {expr:?}")]
  UnexpectedChar {
    expr:   String,
    offset: usize,
    found:  char,
  },
  #[error("unclosed choice group in content expression {expr:?}")]
  UnclosedGroup { expr: String },
  #[error("empty choice group in content expression {expr:?}")]
  EmptyGroup { expr: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quantifier {
  pub min: usize,
  pub max: Option<usize>,
}

impl Quantifier {
  pub const ONE: Self = Self {
    min: 1,
    max: Some(1),
  };
  pub const ONE_OR_MORE: Self = Self { min: 1, max: None };
  pub const OPTIONAL: Self = Self {
    min: 0,
    max: Some(1),
  };
  pub const ZERO_OR_MORE: Self = Self { min: 0, max: None };

  fn from_char(ch: char) -> Option<Self> {
    match ch {
      '*' => Some(Self::ZERO_OR_MORE),
      '+' => Some(Self::ONE_OR_MORE),
      '?' => Some(Self::OPTIONAL),
      _ => None,
    }
  }

  pub fn allows(&self, count: usize) -> bool {
    count >= self.min && self.max.is_none_or(|max| count <= max)
  }
}

/// One term of a parsed content expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
  /// Node kind names or group labels, any of which satisfies the term.
  pub names: SmallVec<[String; 1]>,
  pub quant: Quantifier,
}

/// A parsed, not yet resolved, content expression.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContentExpr {
  source: String,
  tokens: Vec<Token>,
}

impl ContentExpr {
  pub fn parse(source: &str) -> Result<Self> {
    let mut parser = Parser {
      source,
      chars: source.char_indices().peekable(),
    };
    let mut terms = Vec::new();
    while let Some(term) = parser.term()? {
      terms.push(term);
    }

    let single = terms.len() == 1;
    let tokens = terms
      .into_iter()
      .map(|(names, quant)| {
        let quant = quant.unwrap_or_else(|| {
          if names.iter().all(|name| name == "text") {
            Quantifier::ZERO_OR_MORE
          } else if single {
            Quantifier::ONE_OR_MORE
          } else {
            Quantifier::ONE
          }
        });
        Token { names, quant }
      })
      .collect();

    Ok(Self {
      source: source.to_string(),
      tokens,
    })
  }

  pub fn source(&self) -> &str {
    &self.source
  }

  pub fn tokens(&self) -> &[Token] {
    &self.tokens
  }

  /// An empty expression describes a leaf kind.
  pub fn is_empty(&self) -> bool {
    self.tokens.is_empty()
  }
}

struct Parser<'a> {
  source: &'a str,
  chars:  std::iter::Peekable<std::str::CharIndices<'a>>,
}

type Term = (SmallVec<[String; 1]>, Option<Quantifier>);

impl Parser<'_> {
  fn skip_whitespace(&mut self) {
    while self.chars.next_if(|(_, ch)| ch.is_whitespace()).is_some() {}
  }

  fn unexpected(&self, offset: usize, found: char) -> ContentError {
    ContentError::UnexpectedChar {
      expr: self.source.to_string(),
      offset,
      found,
    }
  }

  fn name(&mut self) -> Result<Option<String>> {
    self.skip_whitespace();
    let mut name = String::new();
    while let Some((_, ch)) = self.chars.next_if(|(_, ch)| is_name_char(*ch)) {
      name.push(ch);
    }
    Ok((!name.is_empty()).then_some(name))
  }

  fn quantifier(&mut self) -> Option<Quantifier> {
    let (_, ch) = self.chars.peek().copied()?;
    let quant = Quantifier::from_char(ch)?;
    self.chars.next();
    Some(quant)
  }

  fn term(&mut self) -> Result<Option<Term>> {
    self.skip_whitespace();
    let Some((offset, ch)) = self.chars.peek().copied() else {
      return Ok(None);
    };

    let names = if ch == '(' {
      self.chars.next();
      self.choice()?
    } else if is_name_char(ch) {
      let mut names = SmallVec::new();
      names.extend(self.name()?);
      names
    } else {
      return Err(self.unexpected(offset, ch));
    };

    Ok(Some((names, self.quantifier())))
  }

  fn choice(&mut self) -> Result<SmallVec<[String; 1]>> {
    let mut names = SmallVec::new();
    loop {
      match self.name()? {
        Some(name) => names.push(name),
        None => {
          let next = self.chars.peek().copied();
          return match next {
            Some((offset, ch)) => Err(self.unexpected(offset, ch)),
            None => Err(ContentError::UnclosedGroup {
              expr: self.source.to_string(),
            }),
          };
        },
      }
      self.skip_whitespace();
      match self.chars.next() {
        Some((_, '|')) => continue,
        Some((_, ')')) => break,
        Some((offset, ch)) => return Err(self.unexpected(offset, ch)),
        None => {
          return Err(ContentError::UnclosedGroup {
            expr: self.source.to_string(),
          });
        },
      }
    }
    if names.is_empty() {
      return Err(ContentError::EmptyGroup {
        expr: self.source.to_string(),
      });
    }
    Ok(names)
  }
}

fn is_name_char(ch: char) -> bool {
  ch.is_alphanumeric() || ch == '_' || ch == '-'
}

/// A term with its names resolved to node type indices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedToken {
  pub members: SmallVec<[usize; 4]>,
  pub quant:   Quantifier,
}

impl ResolvedToken {
  #[inline]
  pub fn accepts(&self, ty: usize) -> bool {
    self.members.contains(&ty)
  }
}

/// A content expression resolved against a schema.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContentMatch {
  tokens: Vec<ResolvedToken>,
}

impl ContentMatch {
  pub fn new(tokens: Vec<ResolvedToken>) -> Self {
    Self { tokens }
  }

  pub fn tokens(&self) -> &[ResolvedToken] {
    &self.tokens
  }

  /// Whether any term admits the node type with index `ty`.
  pub fn admits(&self, ty: usize) -> bool {
    self.tokens.iter().any(|token| token.accepts(ty))
  }

  /// Check a sequence of child type indices. Every term must be satisfied in
  /// order and every child must be consumed by exactly one term.
  pub fn matches(&self, children: &[usize]) -> bool {
    self.match_from(0, children)
  }

  fn match_from(&self, token: usize, children: &[usize]) -> bool {
    let Some(current) = self.tokens.get(token) else {
      return children.is_empty();
    };

    let run = children
      .iter()
      .take_while(|&&child| current.accepts(child))
      .count();
    let longest = current.quant.max.map_or(run, |max| max.min(run));
    if longest < current.quant.min {
      return false;
    }

    (current.quant.min..=longest)
      .rev()
      .any(|taken| self.match_from(token + 1, &children[taken..]))
  }
}
