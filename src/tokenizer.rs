//! Lexical analysis: turns the raw input string into a vector of tokens.
//!
//! Each step tries the recognisers in a fixed order: whitespace, newlines
//! (with automatic semicolon insertion), comments, standard-library names,
//! type names, multi-character operators and keywords, single-character
//! punctuators, string and character literals, identifiers and finally
//! integer literals. Word-like matches are guarded so that `printer` or
//! `integer` stay identifiers.

use tracing::{debug, trace};

use crate::error::{CompileError, CompileResult, ErrorKind};

/// Kinds of tokens recognised by the front-end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
  /// Keywords and operators alike; the text tells them apart.
  Punctuator,
  Ident,
  TypeName,
  Num,
  Str,
  Stdlib,
  Eof,
}

/// Thin wrapper for lexical information needed by later stages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
  pub kind: TokenKind,
  pub text: String,
  pub value: Option<i64>,
  pub loc: usize,
  pub len: usize,
}

impl Token {
  pub fn new(kind: TokenKind, text: impl Into<String>, loc: usize, len: usize) -> Self {
    Self {
      kind,
      text: text.into(),
      value: None,
      loc,
      len,
    }
  }

  pub fn number(text: impl Into<String>, value: i64, loc: usize, len: usize) -> Self {
    Self {
      value: Some(value),
      ..Self::new(TokenKind::Num, text, loc, len)
    }
  }

  pub fn is(&self, text: &str) -> bool {
    self.kind == TokenKind::Punctuator && self.text == text
  }

  /// Body of a string literal without its quotes.
  pub fn string_body(&self) -> &str {
    self
      .text
      .strip_prefix('"')
      .and_then(|s| s.strip_suffix('"'))
      .unwrap_or(&self.text)
  }

  pub fn is_char_literal(&self) -> bool {
    self.kind == TokenKind::Num && self.text.starts_with('\'')
  }
}

pub const STDLIB_NAMES: [&str; 2] = ["println", "print"];

// Longest first so `int64` is not read as `int` followed by `64`.
pub const TYPE_NAMES: [&str; 7] = ["int64", "int32", "int8", "int", "byte", "bool", "string"];

pub const KEYWORDS: [&str; 7] = ["package", "func", "var", "return", "if", "else", "for"];

const MULTI_CHAR_OPS: [&str; 5] = ["==", "!=", "<=", ">=", ":="];

const PUNCTUATORS: &[u8] = b"+-*/()<>;={}[],&";

/// Lex the input into a flat vector of tokens terminated by an `Eof` marker.
pub fn tokenize(input: &str) -> CompileResult<Vec<Token>> {
  let mut tokens: Vec<Token> = Vec::new();
  let bytes = input.as_bytes();
  let mut i = 0;

  while i < bytes.len() {
    let c = bytes[i];
    let rest = &input[i..];

    if c == b' ' || c == b'\t' || c == b'\r' {
      i += 1;
      continue;
    }

    if c == b'\n' {
      if needs_terminator(tokens.last()) {
        tokens.push(Token::new(TokenKind::Punctuator, ";", i, 0));
      }
      i += 1;
      continue;
    }

    if rest.starts_with("//") {
      i += rest.find('\n').unwrap_or(rest.len());
      continue;
    }

    if let Some(name) = match_word(rest, &STDLIB_NAMES) {
      tokens.push(Token::new(TokenKind::Stdlib, name, i, name.len()));
      i += name.len();
      continue;
    }

    if let Some(name) = match_word(rest, &TYPE_NAMES) {
      tokens.push(Token::new(TokenKind::TypeName, name, i, name.len()));
      i += name.len();
      continue;
    }

    if let Some(op) = MULTI_CHAR_OPS.into_iter().find(|op| rest.starts_with(op)) {
      tokens.push(Token::new(TokenKind::Punctuator, op, i, op.len()));
      i += op.len();
      continue;
    }

    if let Some(keyword) = match_word(rest, &KEYWORDS) {
      tokens.push(Token::new(TokenKind::Punctuator, keyword, i, keyword.len()));
      i += keyword.len();
      continue;
    }

    if PUNCTUATORS.contains(&c) {
      tokens.push(Token::new(TokenKind::Punctuator, &rest[..1], i, 1));
      i += 1;
      continue;
    }

    if c == b'"' {
      let Some(close) = rest[1..].find('"') else {
        return Err(CompileError::at(
          ErrorKind::Lex,
          input,
          i,
          "unterminated string literal",
        ));
      };
      let len = close + 2;
      tokens.push(Token::new(TokenKind::Str, &rest[..len], i, len));
      i += len;
      continue;
    }

    if c == b'\'' {
      match rest.as_bytes() {
        [b'\'', ch, b'\'', ..] if ch.is_ascii_graphic() || *ch == b' ' => {
          tokens.push(Token::number(&rest[..3], i64::from(*ch), i, 3));
          i += 3;
          continue;
        }
        _ => {
          return Err(CompileError::at(
            ErrorKind::Lex,
            input,
            i,
            "character literal must hold exactly one character",
          ));
        }
      }
    }

    if is_ident_start(c) {
      let len = rest.bytes().take_while(|b| is_ident_continue(*b)).count();
      tokens.push(Token::new(TokenKind::Ident, &rest[..len], i, len));
      i += len;
      continue;
    }

    if c.is_ascii_digit() {
      let len = rest.bytes().take_while(u8::is_ascii_digit).count();
      let value = rest.bytes().take(len).fold(0i64, |acc, digit| {
        acc.wrapping_mul(10).wrapping_add(i64::from(digit - b'0'))
      });
      tokens.push(Token::number(&rest[..len], value, i, len));
      i += len;
      continue;
    }

    let invalid_char = rest.chars().next().unwrap_or('\0');
    return Err(CompileError::at(
      ErrorKind::Lex,
      input,
      i,
      format!("invalid character '{invalid_char}'"),
    ));
  }

  tokens.push(Token::new(TokenKind::Eof, "", input.len(), 0));
  debug!(count = tokens.len(), "tokenized source");
  for token in &tokens {
    trace!(kind = ?token.kind, text = %token.text, loc = token.loc);
  }
  Ok(tokens)
}

/// A newline ends a statement unless the line closed on a block brace or a
/// terminator already.
fn needs_terminator(last: Option<&Token>) -> bool {
  match last {
    Some(token) => !(token.is("{") || token.is("}") || token.is(";")),
    None => false,
  }
}

fn match_word<'w>(rest: &str, words: &[&'w str]) -> Option<&'w str> {
  words.iter().copied().find(|word| {
    rest.starts_with(word)
      && rest
        .as_bytes()
        .get(word.len())
        .is_none_or(|next| !is_ident_continue(*next))
  })
}

fn is_ident_start(c: u8) -> bool {
  c.is_ascii_alphabetic() || c == b'_'
}

fn is_ident_continue(c: u8) -> bool {
  is_ident_start(c) || c.is_ascii_digit()
}

/// Human-friendly description used in diagnostics.
pub fn describe_token(token: Option<&Token>) -> String {
  match token {
    Some(t) => match t.kind {
      TokenKind::Eof => "EOF".to_string(),
      _ if t.text == ";" && t.len == 0 => "newline".to_string(),
      _ => t.text.clone(),
    },
    None => "EOF".to_string(),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use pretty_assertions::assert_eq;

  fn kinds_and_texts(input: &str) -> Vec<(TokenKind, String)> {
    tokenize(input)
      .unwrap()
      .into_iter()
      .map(|t| (t.kind, t.text))
      .collect()
  }

  #[test]
  fn inserts_terminator_after_statement_line() {
    let toks = kinds_and_texts("x := 1\ny := 2\n");
    let texts: Vec<_> = toks.iter().map(|(_, text)| text.as_str()).collect();
    assert_eq!(texts, ["x", ":=", "1", ";", "y", ":=", "2", ";", ""]);
  }

  #[test]
  fn no_terminator_after_braces_or_blank_lines() {
    let toks = kinds_and_texts("func f() {\n\n}\n");
    let texts: Vec<_> = toks.iter().map(|(_, text)| text.as_str()).collect();
    assert_eq!(texts, ["func", "f", "(", ")", "{", "}", ""]);
  }

  #[test]
  fn keywords_need_a_word_boundary() {
    let toks = kinds_and_texts("format returned printer integer int8 println");
    assert_eq!(
      toks,
      [
        (TokenKind::Ident, "format".to_string()),
        (TokenKind::Ident, "returned".to_string()),
        (TokenKind::Ident, "printer".to_string()),
        (TokenKind::Ident, "integer".to_string()),
        (TokenKind::TypeName, "int8".to_string()),
        (TokenKind::Stdlib, "println".to_string()),
        (TokenKind::Eof, String::new()),
      ]
    );
  }

  #[test]
  fn comments_are_skipped() {
    let toks = kinds_and_texts("return 1 // done\n");
    let texts: Vec<_> = toks.iter().map(|(_, text)| text.as_str()).collect();
    assert_eq!(texts, ["return", "1", ";", ""]);
  }

  #[test]
  fn literals_carry_values() {
    let tokens = tokenize("42 'a' \"hi there\"").unwrap();
    assert_eq!(tokens[0].value, Some(42));
    assert_eq!(tokens[1].value, Some(97));
    assert!(tokens[1].is_char_literal());
    assert_eq!(tokens[2].kind, TokenKind::Str);
    assert_eq!(tokens[2].string_body(), "hi there");
  }

  #[test]
  fn integer_overflow_wraps() {
    let tokens = tokenize("9223372036854775808").unwrap();
    assert_eq!(tokens[0].value, Some(i64::MIN));
  }

  #[test]
  fn multi_char_operators_win_over_single() {
    let toks = kinds_and_texts("a<=b!=c:=d==e>=f");
    let texts: Vec<_> = toks.iter().map(|(_, text)| text.as_str()).collect();
    assert_eq!(
      texts,
      ["a", "<=", "b", "!=", "c", ":=", "d", "==", "e", ">=", "f", ""]
    );
  }

  #[test]
  fn rejects_unknown_character_with_column() {
    let err = tokenize("x := 3 # 4").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Lex);
    assert_eq!(err.location().offset, 7);
    assert_eq!(err.message(), "invalid character '#'");
  }

  #[test]
  fn rejects_unterminated_string() {
    let err = tokenize("s := \"abc").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Lex);
    assert_eq!(err.location().offset, 5);
  }
}
