//! Recursive-descent parser producing the program IR with resolved slots.
//!
//! The grammar needs exactly one token of lookahead and never backtracks:
//! a `Name` is disambiguated by the token after it (`=` means assignment,
//! `(` means call, anything else a bare variable reference). Parsing is
//! fail-fast – the first syntax error is returned as a positioned
//! diagnostic and nothing is recovered.
//!
//! Variables are resolved here, not in the code generator: each function
//! owns a fresh symbol table mapping names to frame slots, parameters
//! first, `var` declarations after, in declaration order from 0.

use std::collections::HashMap;

use crate::error::{CompileError, CompileResult};
use crate::tokenizer::{Token, TokenKind, describe_kind};

/// A left-associative operator chain: one leading operand followed by zero
/// or more `(operator, operand)` pairs. The language defines no precedence
/// levels, so this flat shape is the entire expression grammar.
#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
  pub first: SmallExpr,
  pub rest: Vec<(String, SmallExpr)>,
}

impl Expr {
  /// An expression with no trailing operator chain.
  pub fn single(first: SmallExpr) -> Self {
    Self {
      first,
      rest: Vec::new(),
    }
  }

  pub fn chain(first: SmallExpr, rest: Vec<(String, SmallExpr)>) -> Self {
    Self { first, rest }
  }
}

/// A `{`-delimited, non-empty sequence of expressions.
pub type Body = Vec<Expr>;

/// One small expression, the unit the code generator dispatches on.
#[derive(Debug, Clone, PartialEq)]
pub enum SmallExpr {
  /// A bare variable reference, already resolved to its frame slot.
  Name { slot: usize },
  /// `name = expr`; assignment is itself an expression with a value.
  Assign { slot: usize, value: Box<Expr> },
  /// `name(arg, ...)` – functions are global, identified by name and arity.
  Call { name: String, args: Vec<Expr> },
  /// `return expr`; legal anywhere an expression is, including nested.
  Return { value: Box<Expr> },
  /// A prefix operator application.
  Unary { op: String, operand: Box<SmallExpr> },
  /// A literal, kept as its verbatim source text.
  Literal { text: String },
  If {
    cond: Box<Expr>,
    then_body: Body,
    elifs: Vec<(Expr, Body)>,
    else_body: Option<Body>,
  },
  While { cond: Box<Expr>, body: Body },
  /// A parenthesised expression. Grouping only affects parse structure, so
  /// code generation passes straight through this node.
  Priority { inner: Box<Expr> },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Function {
  pub name: String,
  pub arg_count: usize,
  pub var_count: usize,
  pub body: Vec<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Program {
  pub functions: Vec<Function>,
}

/// Per-function mapping from variable name to frame slot. Parameters and
/// `var` declarations share one namespace; slots are handed out in
/// declaration order starting from 0.
#[derive(Default)]
struct SymbolTable {
  slots: HashMap<String, usize>,
}

impl SymbolTable {
  fn reset(&mut self) {
    self.slots.clear();
  }

  fn register(&mut self, name: String, line: usize, column: usize) -> CompileResult<()> {
    if self.slots.contains_key(&name) {
      return Err(CompileError::at(
        line,
        column,
        format!("variable name \"{name}\" is already in use"),
      ));
    }
    let slot = self.slots.len();
    self.slots.insert(name, slot);
    Ok(())
  }

  fn slot(&self, name: &str, line: usize, column: usize) -> CompileResult<usize> {
    self
      .slots
      .get(name)
      .copied()
      .ok_or_else(|| CompileError::at(line, column, format!("undeclared variable \"{name}\"")))
  }
}

/// Parse a token stream into a program. The stream is expected to end with
/// an `Eof` marker as produced by [`crate::tokenizer::tokenize`].
pub fn parse(tokens: Vec<Token>) -> CompileResult<Program> {
  let mut parser = Parser::new(tokens);
  parser.lex_check()?;
  parser.program()
}

/// Cursor over the token vector plus the per-function symbol table.
struct Parser {
  tokens: Vec<Token>,
  pos: usize,
  vars: SymbolTable,
}

impl Parser {
  fn new(mut tokens: Vec<Token>) -> Self {
    if tokens.is_empty() {
      tokens.push(Token::new(TokenKind::Eof, "EOF", 1, 1));
    }
    Self {
      tokens,
      pos: 0,
      vars: SymbolTable::default(),
    }
  }

  fn peek(&self) -> &Token {
    &self.tokens[self.pos.min(self.tokens.len() - 1)]
  }

  fn position(&self) -> (usize, usize) {
    let token = self.peek();
    (token.line, token.column)
  }

  fn look(&self, kind: TokenKind) -> bool {
    self.peek().kind == kind
  }

  /// Move past the current token. Lexical errors surface here so a bad
  /// token is reported the moment it becomes the lookahead.
  fn advance(&mut self) -> CompileResult<()> {
    if self.pos + 1 < self.tokens.len() {
      self.pos += 1;
    }
    self.lex_check()
  }

  fn lex_check(&self) -> CompileResult<()> {
    let token = self.peek();
    if token.kind == TokenKind::Err {
      return Err(CompileError::at(
        token.line,
        token.column,
        format!("unexpected symbol \"{}\"", token.lexeme),
      ));
    }
    Ok(())
  }

  /// Consume the current token if it has the given kind, returning its
  /// lexeme; otherwise report what was expected.
  fn expect(&mut self, kind: TokenKind) -> CompileResult<String> {
    if self.look(kind) {
      let lexeme = self.peek().lexeme.clone();
      self.advance()?;
      return Ok(lexeme);
    }
    let token = self.peek();
    Err(CompileError::at(
      token.line,
      token.column,
      format!(
        "expected {}, but got \"{}\"",
        describe_kind(kind),
        token.lexeme
      ),
    ))
  }

  /// Register the upcoming name token as a new variable of the current
  /// function. Duplicates are fatal, parameters included.
  fn declare_variable(&mut self) -> CompileResult<()> {
    let (line, column) = self.position();
    let name = self.expect(TokenKind::Name)?;
    self.vars.register(name, line, column)
  }

  // Program := Function+ Eof
  fn program(&mut self) -> CompileResult<Program> {
    let mut functions = Vec::new();
    loop {
      functions.push(self.function()?);
      if self.look(TokenKind::Eof) {
        break;
      }
    }
    Ok(Program { functions })
  }

  // Function := Name '(' (Name (',' Name)*)? ')' '{' (VarDecl ';')* (Expr ';')+ '}'
  fn function(&mut self) -> CompileResult<Function> {
    self.vars.reset();
    let name = self.expect(TokenKind::Name)?;
    self.expect(TokenKind::Punct('('))?;
    let mut arg_count = 0;
    if !self.look(TokenKind::Punct(')')) {
      self.declare_variable()?;
      arg_count += 1;
      while self.look(TokenKind::Punct(',')) {
        self.advance()?;
        self.declare_variable()?;
        arg_count += 1;
      }
    }
    self.expect(TokenKind::Punct(')'))?;
    self.expect(TokenKind::Punct('{'))?;

    let mut var_count = 0;
    while self.look(TokenKind::Var) {
      var_count += self.decl()?;
      self.expect(TokenKind::Punct(';'))?;
    }

    let mut body = Vec::new();
    loop {
      body.push(self.expr()?);
      self.expect(TokenKind::Punct(';'))?;
      if self.look(TokenKind::Punct('}')) {
        break;
      }
    }
    self.expect(TokenKind::Punct('}'))?;

    Ok(Function {
      name,
      arg_count,
      var_count,
      body,
    })
  }

  // VarDecl := 'var' Name (',' Name)*
  fn decl(&mut self) -> CompileResult<usize> {
    self.expect(TokenKind::Var)?;
    self.declare_variable()?;
    let mut count = 1;
    while self.look(TokenKind::Punct(',')) {
      self.advance()?;
      self.declare_variable()?;
      count += 1;
    }
    Ok(count)
  }

  // Expr := SmallExpr (Operator SmallExpr)*
  fn expr(&mut self) -> CompileResult<Expr> {
    let first = self.small_expr()?;
    let mut rest = Vec::new();
    while self.look(TokenKind::Operator) {
      let op = self.expect(TokenKind::Operator)?;
      rest.push((op, self.small_expr()?));
    }
    Ok(Expr { first, rest })
  }

  fn small_expr(&mut self) -> CompileResult<SmallExpr> {
    match self.peek().kind {
      TokenKind::Name => {
        let (line, column) = self.position();
        let name = self.expect(TokenKind::Name)?;
        if self.look(TokenKind::Punct('=')) {
          self.advance()?;
          let slot = self.vars.slot(&name, line, column)?;
          let value = Box::new(self.expr()?);
          return Ok(SmallExpr::Assign { slot, value });
        }
        if !self.look(TokenKind::Punct('(')) {
          let slot = self.vars.slot(&name, line, column)?;
          return Ok(SmallExpr::Name { slot });
        }
        self.advance()?;
        let mut args = Vec::new();
        if self.look(TokenKind::Punct(')')) {
          self.advance()?;
          return Ok(SmallExpr::Call { name, args });
        }
        args.push(self.expr()?);
        while self.look(TokenKind::Punct(',')) {
          self.advance()?;
          args.push(self.expr()?);
        }
        self.expect(TokenKind::Punct(')'))?;
        Ok(SmallExpr::Call { name, args })
      }
      TokenKind::Return => {
        self.advance()?;
        let value = Box::new(self.expr()?);
        Ok(SmallExpr::Return { value })
      }
      TokenKind::Operator => {
        let op = self.expect(TokenKind::Operator)?;
        let operand = Box::new(self.small_expr()?);
        Ok(SmallExpr::Unary { op, operand })
      }
      TokenKind::Literal => {
        let text = self.expect(TokenKind::Literal)?;
        Ok(SmallExpr::Literal { text })
      }
      TokenKind::Punct('(') => {
        self.advance()?;
        let inner = Box::new(self.expr()?);
        self.expect(TokenKind::Punct(')'))?;
        Ok(SmallExpr::Priority { inner })
      }
      TokenKind::If => {
        self.advance()?;
        self.expect(TokenKind::Punct('('))?;
        let cond = Box::new(self.expr()?);
        self.expect(TokenKind::Punct(')'))?;
        let then_body = self.body()?;
        let mut elifs = Vec::new();
        while self.look(TokenKind::Elif) {
          self.advance()?;
          self.expect(TokenKind::Punct('('))?;
          let elif_cond = self.expr()?;
          self.expect(TokenKind::Punct(')'))?;
          elifs.push((elif_cond, self.body()?));
        }
        let else_body = if self.look(TokenKind::Else) {
          self.advance()?;
          Some(self.body()?)
        } else {
          None
        };
        Ok(SmallExpr::If {
          cond,
          then_body,
          elifs,
          else_body,
        })
      }
      TokenKind::While => {
        self.advance()?;
        self.expect(TokenKind::Punct('('))?;
        let cond = Box::new(self.expr()?);
        self.expect(TokenKind::Punct(')'))?;
        let body = self.body()?;
        Ok(SmallExpr::While { cond, body })
      }
      _ => {
        let token = self.peek();
        Err(CompileError::at(
          token.line,
          token.column,
          format!("expected an expression, but got \"{}\"", token.lexeme),
        ))
      }
    }
  }

  // Body := '{' (Expr ';')+ '}'
  fn body(&mut self) -> CompileResult<Body> {
    self.expect(TokenKind::Punct('{'))?;
    let mut exprs = Vec::new();
    loop {
      exprs.push(self.expr()?);
      self.expect(TokenKind::Punct(';'))?;
      if self.look(TokenKind::Punct('}')) {
        break;
      }
    }
    self.expect(TokenKind::Punct('}'))?;
    Ok(exprs)
  }
}
