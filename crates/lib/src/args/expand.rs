//! Restricted POSIX-style word expansion.
//!
//! Supported forms:
//!
//! - `$NAME` and `${NAME}` - value of `NAME`, or empty when unset
//! - `${NAME:-word}` / `${NAME-word}` - `word` when unset (or empty, with `:`)
//! - `${NAME:+word}` / `${NAME+word}` - `word` when set (and non-empty, with `:`)
//! - `${NAME:?msg}` / `${NAME?msg}` - error when unset (or empty, with `:`)
//!
//! Quoting follows the shell: single quotes are literal, double quotes still
//! expand variables, and both are removed from the result. A backslash makes
//! the next character literal, and one at the very end is dropped. A `$` that
//! does not start a name is kept as-is.
//!
//! A name is a letter or `_` followed by letters, digits and `_`, or a run of
//! digits (a positional name such as `$1`). Positional names are looked up
//! like any other and are usually unset.
//!
//! # Example
//!
//! ```
//! use std::collections::BTreeMap;
//! use buildplan_lib::args::expand;
//!
//! let mut vars = BTreeMap::new();
//! vars.insert("VERSION".to_string(), "1.2.3".to_string());
//!
//! assert_eq!(expand("v${VERSION}-${REV:-1}", &vars).unwrap(), "v1.2.3-1");
//! ```

use std::collections::{BTreeMap, HashMap};

use thiserror::Error;

const ESCAPE: char = '\\';

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExpandError {
  #[error("unterminated {quote} quote starting at position {position}")]
  UnterminatedQuote { quote: char, position: usize },

  #[error("missing '}}' for substitution starting at position {position}")]
  UnterminatedBrace { position: usize },

  #[error("bad substitution at position {position}: {found:?}")]
  BadSubstitution { position: usize, found: String },

  #[error("{name}: {message}")]
  RequiredVariable { name: String, message: String },
}

/// Source of variable values for expansion.
pub trait Lookup {
  fn lookup(&self, name: &str) -> Option<&str>;
}

impl Lookup for BTreeMap<String, String> {
  fn lookup(&self, name: &str) -> Option<&str> {
    self.get(name).map(String::as_str)
  }
}

impl Lookup for HashMap<String, String> {
  fn lookup(&self, name: &str) -> Option<&str> {
    self.get(name).map(String::as_str)
  }
}

/// Expand `word` using values from `vars`.
///
/// # Errors
///
/// Returns an error for unterminated quotes or braces, malformed `${...}`
/// forms, and `?` modifiers whose variable is missing.
pub fn expand(word: &str, vars: &impl Lookup) -> Result<String, ExpandError> {
  let mut lexer = Lexer {
    chars: word.chars().collect(),
    pos: 0,
    vars,
  };
  lexer.word(None)
}

struct Lexer<'a, L: Lookup> {
  chars: Vec<char>,
  pos: usize,
  vars: &'a L,
}

enum Modifier {
  Default,
  Alternate,
  Required,
}

impl<L: Lookup> Lexer<'_, L> {
  fn peek(&self) -> Option<char> {
    self.chars.get(self.pos).copied()
  }

  fn next(&mut self) -> Option<char> {
    let ch = self.peek();
    if ch.is_some() {
      self.pos += 1;
    }
    ch
  }

  /// Expand until end of input, or until an unescaped `stop` character which
  /// is consumed but not included.
  fn word(&mut self, stop: Option<char>) -> Result<String, ExpandError> {
    let start = self.pos;
    let mut out = String::new();

    loop {
      let Some(ch) = self.next() else {
        return match stop {
          // Callers with a stop char report the brace position themselves.
          Some(_) => Err(ExpandError::UnterminatedBrace {
            position: start.saturating_sub(1),
          }),
          None => Ok(out),
        };
      };

      if Some(ch) == stop {
        return Ok(out);
      }

      match ch {
        ESCAPE => {
          if let Some(escaped) = self.next() {
            out.push(escaped);
          }
        }
        '\'' => out.push_str(&self.single_quoted()?),
        '"' => out.push_str(&self.double_quoted()?),
        '$' => out.push_str(&self.dollar()?),
        _ => out.push(ch),
      }
    }
  }

  fn single_quoted(&mut self) -> Result<String, ExpandError> {
    let position = self.pos - 1;
    let mut out = String::new();
    loop {
      match self.next() {
        Some('\'') => return Ok(out),
        Some(ch) => out.push(ch),
        None => return Err(ExpandError::UnterminatedQuote { quote: '\'', position }),
      }
    }
  }

  fn double_quoted(&mut self) -> Result<String, ExpandError> {
    let position = self.pos - 1;
    let mut out = String::new();
    loop {
      match self.next() {
        Some('"') => return Ok(out),
        Some(ESCAPE) => match self.peek() {
          Some(next @ ('"' | '$' | ESCAPE)) => {
            self.pos += 1;
            out.push(next);
          }
          _ => out.push(ESCAPE),
        },
        Some('$') => out.push_str(&self.dollar()?),
        Some(ch) => out.push(ch),
        None => return Err(ExpandError::UnterminatedQuote { quote: '"', position }),
      }
    }
  }

  fn name(&mut self) -> String {
    let positional = self.peek().is_some_and(char::is_numeric);
    let mut name = String::new();
    while let Some(ch) = self.peek() {
      let accepted = if positional {
        ch.is_numeric()
      } else {
        ch.is_alphanumeric() || ch == '_'
      };
      if !accepted {
        break;
      }
      name.push(ch);
      self.pos += 1;
    }
    name
  }

  /// Handle the text following a `$`.
  fn dollar(&mut self) -> Result<String, ExpandError> {
    let position = self.pos - 1;

    match self.peek() {
      Some('{') => {
        self.pos += 1;
        self.braced(position)
      }
      Some(ch) if ch.is_alphanumeric() || ch == '_' => {
        let name = self.name();
        Ok(self.vars.lookup(&name).unwrap_or_default().to_string())
      }
      _ => Ok("$".to_string()),
    }
  }

  fn braced(&mut self, position: usize) -> Result<String, ExpandError> {
    let name = self.name();
    let bad = |lexer: &Self| ExpandError::BadSubstitution {
      position,
      found: lexer.chars[position..lexer.pos.min(lexer.chars.len())].iter().collect(),
    };

    if name.is_empty() {
      return match self.peek() {
        None => Err(ExpandError::UnterminatedBrace { position }),
        Some(_) => {
          self.pos += 1;
          Err(bad(self))
        }
      };
    }

    let vars = self.vars;
    let value = vars.lookup(&name);

    let Some(ch) = self.next() else {
      return Err(ExpandError::UnterminatedBrace { position });
    };

    let (colon, op) = match ch {
      '}' => return Ok(value.unwrap_or_default().to_string()),
      ':' => match self.next() {
        Some(op) => (true, op),
        None => return Err(ExpandError::UnterminatedBrace { position }),
      },
      op => (false, op),
    };

    let modifier = match op {
      '-' => Modifier::Default,
      '+' => Modifier::Alternate,
      '?' => Modifier::Required,
      _ => return Err(bad(self)),
    };

    let word = self
      .word(Some('}'))
      .map_err(|err| match err {
        ExpandError::UnterminatedBrace { .. } => ExpandError::UnterminatedBrace { position },
        other => other,
      })?;

    // With a colon, an empty value counts as unset.
    let set = match value {
      Some(v) => !(colon && v.is_empty()),
      None => false,
    };

    match modifier {
      Modifier::Default if set => Ok(value.unwrap_or_default().to_string()),
      Modifier::Default => Ok(word),
      Modifier::Alternate if set => Ok(word),
      Modifier::Alternate => Ok(String::new()),
      Modifier::Required if set => Ok(value.unwrap_or_default().to_string()),
      Modifier::Required => Err(ExpandError::RequiredVariable {
        message: if word.is_empty() {
          "parameter not set".to_string()
        } else {
          word
        },
        name,
      }),
    }
  }
}
