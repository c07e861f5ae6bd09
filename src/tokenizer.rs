//! Lexical analysis: turns raw nanoMorpho source into a flat token vector.
//!
//! The tokenizer is intentionally tiny – it recognises names, keywords,
//! literals, operator runs and single-character punctuation, and it never
//! fails: anything unrecognisable becomes an `Err` token that the parser
//! reports once it reaches it. Every token carries its 1-based line and
//! column for diagnostics.

/// Kinds of tokens recognised by the front-end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
  Name,
  Var,
  Return,
  If,
  Elif,
  Else,
  While,
  Operator,
  Literal,
  /// One of the structural characters `( ) { } , ; =`.
  Punct(char),
  Eof,
  Err,
}

/// Thin wrapper for lexical information needed by later stages.
#[derive(Debug, Clone)]
pub struct Token {
  pub kind: TokenKind,
  pub lexeme: String,
  pub line: usize,
  pub column: usize,
}

impl Token {
  /// Convenience constructor to keep the `tokenize` loop readable.
  pub fn new(kind: TokenKind, lexeme: impl Into<String>, line: usize, column: usize) -> Self {
    Self {
      kind,
      lexeme: lexeme.into(),
      line,
      column,
    }
  }
}

/// Characters that may form an operator run. A run consisting of exactly
/// `=` is the assignment punctuator, not an operator.
const OPERATOR_CHARS: &[u8] = b":+-*/%!&=<>|?~^";

fn is_operator_byte(c: u8) -> bool {
  OPERATOR_CHARS.contains(&c)
}

/// Lex the input into a flat vector of tokens terminated by an `Eof` marker.
pub fn tokenize(input: &str) -> Vec<Token> {
  let mut tokens = Vec::new();
  let bytes = input.as_bytes();
  let mut i = 0;
  let mut line = 1;
  let mut column = 1;

  while i < bytes.len() {
    let c = bytes[i];

    if c == b'\n' {
      i += 1;
      line += 1;
      column = 1;
      continue;
    }
    if c.is_ascii_whitespace() {
      i += 1;
      column += 1;
      continue;
    }

    // ;;; comments run to the end of the line
    if bytes[i..].starts_with(b";;;") {
      while i < bytes.len() && bytes[i] != b'\n' {
        i += 1;
      }
      continue;
    }

    if c.is_ascii_alphabetic() {
      let start = i;
      i += 1;
      while i < bytes.len() && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'_') {
        i += 1;
      }
      let text = &input[start..i];
      let kind = match text {
        "var" => TokenKind::Var,
        "return" => TokenKind::Return,
        "if" => TokenKind::If,
        "elsif" => TokenKind::Elif,
        "else" => TokenKind::Else,
        "while" => TokenKind::While,
        "true" | "false" | "null" => TokenKind::Literal,
        _ => TokenKind::Name,
      };
      tokens.push(Token::new(kind, text, line, column));
      column += i - start;
      continue;
    }

    if c.is_ascii_digit() {
      let start = i;
      i += 1;
      while i < bytes.len() && bytes[i].is_ascii_digit() {
        i += 1;
      }
      if i + 1 < bytes.len() && bytes[i] == b'.' && bytes[i + 1].is_ascii_digit() {
        i += 2;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
          i += 1;
        }
      }
      // optional exponent, only taken when a digit actually follows
      let mut j = i;
      if j < bytes.len() && (bytes[j] == b'e' || bytes[j] == b'E') {
        j += 1;
        if j < bytes.len() && (bytes[j] == b'+' || bytes[j] == b'-') {
          j += 1;
        }
        if j < bytes.len() && bytes[j].is_ascii_digit() {
          while j < bytes.len() && bytes[j].is_ascii_digit() {
            j += 1;
          }
          i = j;
        }
      }
      let text = &input[start..i];
      tokens.push(Token::new(TokenKind::Literal, text, line, column));
      column += i - start;
      continue;
    }

    if c == b'"' || c == b'\'' {
      let quote = c;
      let start = i;
      i += 1;
      while i < bytes.len() && bytes[i] != quote && bytes[i] != b'\n' {
        if bytes[i] == b'\\' && i + 1 < bytes.len() {
          i += 1;
        }
        i += 1;
      }
      let kind = if i < bytes.len() && bytes[i] == quote {
        i += 1;
        TokenKind::Literal
      } else {
        TokenKind::Err
      };
      // the lexeme keeps quotes and escapes verbatim; the code generator
      // reproduces literal text untouched
      let text = &input[start..i];
      tokens.push(Token::new(kind, text, line, column));
      column += i - start;
      continue;
    }

    if matches!(c, b'(' | b')' | b'{' | b'}' | b',' | b';') {
      tokens.push(Token::new(
        TokenKind::Punct(c as char),
        &input[i..i + 1],
        line,
        column,
      ));
      i += 1;
      column += 1;
      continue;
    }

    if is_operator_byte(c) {
      let start = i;
      i += 1;
      while i < bytes.len() && is_operator_byte(bytes[i]) {
        i += 1;
      }
      let text = &input[start..i];
      let kind = if text == "=" {
        TokenKind::Punct('=')
      } else {
        TokenKind::Operator
      };
      tokens.push(Token::new(kind, text, line, column));
      column += i - start;
      continue;
    }

    let invalid_char = input[i..].chars().next().unwrap_or('\0');
    tokens.push(Token::new(
      TokenKind::Err,
      invalid_char.to_string(),
      line,
      column,
    ));
    i += invalid_char.len_utf8().max(1);
    column += 1;
  }

  tokens.push(Token::new(TokenKind::Eof, "EOF", line, column));
  tokens
}

/// Human-friendly name for a token kind, used in "expected X" diagnostics.
pub fn describe_kind(kind: TokenKind) -> String {
  match kind {
    TokenKind::Name => "<NAME>".to_string(),
    TokenKind::Var => "'var'".to_string(),
    TokenKind::Return => "'return'".to_string(),
    TokenKind::If => "'if'".to_string(),
    TokenKind::Elif => "'elsif'".to_string(),
    TokenKind::Else => "'else'".to_string(),
    TokenKind::While => "'while'".to_string(),
    TokenKind::Operator => "<OPERATOR>".to_string(),
    TokenKind::Literal => "<LITERAL>".to_string(),
    TokenKind::Punct(c) => format!("'{c}'"),
    TokenKind::Eof => "<EOF>".to_string(),
    TokenKind::Err => "<ERR>".to_string(),
  }
}
