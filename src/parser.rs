//! Recursive-descent parser producing the program tree.
//!
//! The parser keeps the classic precedence-climbing layout (equality →
//! relational → additive → multiplicative → unary → index suffix → operand)
//! and resolves local names while it goes. Each function activation gets a
//! fresh `Scope`; package-level variables stay visible from every function.
//!
//! Reading a name that is not declared yet is allowed and yields a
//! placeholder variable that the type & layout pass binds later. Assigning to
//! such a name, redeclaring a name, or indexing an undeclared base is fatal
//! right here.

use std::collections::{HashMap, HashSet};
use std::mem;

use tracing::debug;

use crate::ast::{
  BinaryOp, Expr, ExprKind, Function, Program, StdlibFunc, Stmt, StrLiteral, VarId, Variable,
};
use crate::error::{CompileError, CompileResult, ErrorKind};
use crate::tokenizer::{Token, TokenKind, describe_token};
use crate::ty::Type;

/// Name of the user function the generated initializer calls.
pub const ENTRY_FUNCTION: &str = "main";

/// Parse a whole translation unit from the token stream.
pub fn parse(tokens: Vec<Token>, source: &str) -> CompileResult<Program> {
  let mut parser = Parser::new(TokenStream::new(tokens, source));
  parser.program()
}

/// Names declared in the function currently being parsed.
#[derive(Debug, Default)]
struct Scope {
  names: HashMap<String, VarId>,
  locals: Vec<VarId>,
}

enum Initializer {
  Expr(Expr),
  List(Vec<Expr>),
}

struct Parser<'a> {
  stream: TokenStream<'a>,
  vars: Vec<Variable>,
  globals: HashMap<String, VarId>,
  global_order: Vec<VarId>,
  scope: Option<Scope>,
  strings: Vec<StrLiteral>,
  string_ids: HashMap<String, usize>,
  funcs: Vec<Function>,
  func_names: HashSet<String>,
  global_inits: Vec<Stmt>,
}

impl<'a> Parser<'a> {
  fn new(stream: TokenStream<'a>) -> Self {
    Self {
      stream,
      vars: Vec::new(),
      globals: HashMap::new(),
      global_order: Vec::new(),
      scope: None,
      strings: Vec::new(),
      string_ids: HashMap::new(),
      funcs: Vec::new(),
      func_names: HashSet::new(),
      global_inits: Vec::new(),
    }
  }

  fn error(&self, kind: ErrorKind, loc: usize, message: impl Into<String>) -> CompileError {
    CompileError::at(kind, self.stream.source, loc, message)
  }

  fn program(&mut self) -> CompileResult<Program> {
    self.stream.skip("package")?;
    let (package, _) = self.stream.get_ident()?;

    loop {
      if self.stream.equal(";") {
        continue;
      }
      if self.stream.is_eof() {
        break;
      }
      if self.stream.is("func") {
        self.function()?;
      } else if self.stream.is("var") {
        let stmt = self.var_decl()?;
        if !stmt.is_empty() {
          self.global_inits.push(stmt);
        }
      } else {
        let got = describe_token(self.stream.peek());
        return Err(self.error(
          ErrorKind::Parse,
          self.stream.loc(),
          format!("expected \"func\" or \"var\", but got \"{got}\""),
        ));
      }
    }

    let mut body = mem::take(&mut self.global_inits);
    body.push(Stmt::Return(Expr::call(ENTRY_FUNCTION, Vec::new(), 0)));
    let init = Function {
      name: "init".to_string(),
      params: Vec::new(),
      locals: Vec::new(),
      body,
      stack_size: 0,
      implicit: true,
      loc: 0,
    };

    let mut funcs = vec![init];
    funcs.append(&mut self.funcs);
    debug!(
      package = %package,
      functions = funcs.len(),
      globals = self.global_order.len(),
      strings = self.strings.len(),
      "parsed program"
    );

    Ok(Program {
      package,
      vars: mem::take(&mut self.vars),
      globals: mem::take(&mut self.global_order),
      strings: mem::take(&mut self.strings),
      funcs,
    })
  }

  fn function(&mut self) -> CompileResult<()> {
    let loc = self.stream.skip("func")?;
    let (name, name_loc) = self.stream.get_ident()?;
    if !self.func_names.insert(name.clone()) {
      return Err(self.error(
        ErrorKind::Name,
        name_loc,
        format!("function {name} already declared"),
      ));
    }

    self.scope = Some(Scope::default());
    let mut params = Vec::new();
    self.stream.skip("(")?;
    if !self.stream.equal(")") {
      loop {
        let (param, param_loc) = self.stream.get_ident()?;
        let ty = self.parse_type()?;
        if ty.is_array() {
          return Err(self.error(
            ErrorKind::Parse,
            param_loc,
            "array parameters are not supported",
          ));
        }
        params.push(self.declare(param, ty, param_loc)?);
        if self.stream.equal(")") {
          break;
        }
        self.stream.skip(",")?;
      }
    }

    // Result types are accepted for familiarity but not tracked.
    if self.at_type_start() {
      self.parse_type()?;
    }

    let body = self.block_stmts()?;
    let scope = self.scope.take().unwrap_or_default();
    debug!(function = %name, locals = scope.locals.len(), "parsed function");

    self.funcs.push(Function {
      name,
      params,
      locals: scope.locals,
      body,
      stack_size: 0,
      implicit: false,
      loc,
    });
    Ok(())
  }

  fn at_type_start(&self) -> bool {
    self.stream.is("*")
      || self.stream.is("[")
      || self.stream.peek_kind() == Some(TokenKind::TypeName)
  }

  fn parse_type(&mut self) -> CompileResult<Type> {
    if self.stream.equal("*") {
      return Ok(Type::pointer_to(self.parse_type()?));
    }

    if self.stream.equal("[") {
      let (len, loc) = self.stream.get_number()?;
      if len <= 0 {
        return Err(self.error(
          ErrorKind::Parse,
          loc,
          format!("array length must be positive, got {len}"),
        ));
      }
      self.stream.skip("]")?;
      let ty = Type::array_of(self.parse_type()?, len);
      if ty.checked_size().is_none() {
        return Err(self.error(
          ErrorKind::Type,
          loc,
          format!("array of {len} elements is too large"),
        ));
      }
      return Ok(ty);
    }

    if let Some(token) = self.stream.peek()
      && token.kind == TokenKind::TypeName
      && let Some(ty) = Type::from_name(&token.text)
    {
      self.stream.advance();
      return Ok(ty);
    }

    let got = describe_token(self.stream.peek());
    Err(self.error(
      ErrorKind::Parse,
      self.stream.loc(),
      format!("expected a type, but got \"{got}\""),
    ))
  }

  fn block_stmts(&mut self) -> CompileResult<Vec<Stmt>> {
    self.stream.skip("{")?;
    let mut stmts = Vec::new();
    while !self.stream.equal("}") {
      if self.stream.equal(";") {
        continue;
      }
      stmts.push(self.stmt()?);
    }
    Ok(stmts)
  }

  fn stmt(&mut self) -> CompileResult<Stmt> {
    let loc = self.stream.loc();

    if self.stream.equal("return") {
      let value = if self.at_stmt_end() {
        Expr::empty(loc)
      } else {
        self.expr()?
      };
      self.end_simple_stmt()?;
      return Ok(Stmt::Return(value));
    }

    if self.stream.is("{") {
      return Ok(Stmt::Block(self.block_stmts()?));
    }

    if self.stream.equal("if") {
      return self.if_stmt(loc);
    }

    if self.stream.equal("for") {
      return self.for_stmt(loc);
    }

    if self.stream.is("var") {
      return self.var_decl();
    }

    let stmt = if self.stream.peek_kind() == Some(TokenKind::Stdlib) {
      self.stdlib_call()?
    } else {
      self.simple_stmt()?
    };
    self.end_simple_stmt()?;
    Ok(stmt)
  }

  fn at_stmt_end(&self) -> bool {
    self.stream.is(";") || self.stream.is("}") || self.stream.is_eof()
  }

  /// Simple statements end at a terminator, or right before a closing brace.
  fn end_simple_stmt(&mut self) -> CompileResult<()> {
    if self.stream.equal(";") || self.stream.is("}") || self.stream.is_eof() {
      return Ok(());
    }
    self.stream.skip(";").map(|_| ())
  }

  /// No terminator is inserted after an array literal's `}`, so a line break
  /// also ends that declaration.
  fn end_array_literal_stmt(&mut self) -> CompileResult<()> {
    if self.stream.at_line_start() {
      return Ok(());
    }
    self.end_simple_stmt()
  }

  fn if_stmt(&mut self, loc: usize) -> CompileResult<Stmt> {
    let first = self.simple_stmt()?;
    let (init, cond) = if self.stream.equal(";") {
      (first, self.expr()?)
    } else {
      match first {
        Stmt::Expr(cond) => (Stmt::Empty, cond),
        _ => {
          return Err(self.error(
            ErrorKind::Parse,
            loc,
            "expected a condition after \"if\"",
          ));
        }
      }
    };

    let then = Stmt::Block(self.block_stmts()?);
    let els = if self.stream.equal("else") {
      let else_loc = self.stream.loc();
      if self.stream.equal("if") {
        self.if_stmt(else_loc)?
      } else {
        Stmt::Block(self.block_stmts()?)
      }
    } else {
      Stmt::Empty
    };

    Ok(Stmt::If {
      init: Box::new(init),
      cond,
      then: Box::new(then),
      els: Box::new(els),
    })
  }

  fn for_stmt(&mut self, loc: usize) -> CompileResult<Stmt> {
    let (init, cond, post) = if self.stream.is("{") {
      (Stmt::Empty, Expr::empty(loc), Stmt::Empty)
    } else {
      let first = if self.stream.is(";") {
        Stmt::Empty
      } else {
        self.simple_stmt()?
      };

      if self.stream.equal(";") {
        let cond = if self.stream.is(";") {
          Expr::empty(loc)
        } else {
          self.expr()?
        };
        self.stream.skip(";")?;
        let post = if self.stream.is("{") {
          Stmt::Empty
        } else {
          self.simple_stmt()?
        };
        (first, cond, post)
      } else {
        match first {
          Stmt::Expr(cond) => (Stmt::Empty, cond, Stmt::Empty),
          _ => {
            return Err(self.error(
              ErrorKind::Parse,
              loc,
              "expected a condition after \"for\"",
            ));
          }
        }
      }
    };

    let body = Stmt::Block(self.block_stmts()?);
    Ok(Stmt::For {
      init: Box::new(init),
      cond,
      post: Box::new(post),
      body: Box::new(body),
    })
  }

  fn var_decl(&mut self) -> CompileResult<Stmt> {
    self.stream.skip("var")?;
    let (name, loc) = self.stream.get_ident()?;

    let declared = if self.at_type_start() {
      self.parse_type()?
    } else {
      Type::none()
    };

    let init = if self.stream.equal("=") {
      if self.stream.is("{") {
        Some(Initializer::List(self.array_literal()?))
      } else {
        Some(Initializer::Expr(self.expr()?))
      }
    } else {
      None
    };
    if matches!(init, Some(Initializer::List(_))) {
      self.end_array_literal_stmt()?;
    } else {
      self.end_simple_stmt()?;
    }

    if !declared.is_resolved() && init.is_none() {
      return Err(self.error(
        ErrorKind::Parse,
        loc,
        format!("missing type or initializer for {name}"),
      ));
    }

    let is_global = self.scope.is_none();
    let id = self.declare(name, declared.clone(), loc)?;
    let target = Expr::var(id, loc);

    match init {
      Some(Initializer::Expr(value)) => Ok(Stmt::Assign {
        lvals: vec![target],
        rvals: vec![value],
        loc,
      }),
      Some(Initializer::List(elems)) => {
        if !declared.is_array() {
          return Err(self.error(
            ErrorKind::Parse,
            loc,
            "array literal requires an array type",
          ));
        }
        if elems.is_empty() {
          return Ok(Stmt::Empty);
        }
        let mut lvals = Vec::with_capacity(elems.len());
        for (i, elem) in elems.iter().enumerate() {
          let index = Expr::number(i as i64, elem.loc);
          lvals.push(self.index_expr(target.clone(), index, elem.loc)?);
        }
        Ok(Stmt::Assign {
          lvals,
          rvals: elems,
          loc,
        })
      }
      None if is_global || declared.is_array() => Ok(Stmt::Empty),
      None => {
        let zero = if declared.is_string() {
          Expr::string(self.intern_string(""), loc)
        } else {
          Expr::typed_number(0, declared, loc)
        };
        Ok(Stmt::Assign {
          lvals: vec![target],
          rvals: vec![zero],
          loc,
        })
      }
    }
  }

  fn array_literal(&mut self) -> CompileResult<Vec<Expr>> {
    self.stream.skip("{")?;
    let mut elems = Vec::new();
    if self.stream.equal("}") {
      return Ok(elems);
    }
    loop {
      elems.push(self.expr()?);
      if self.stream.equal("}") {
        return Ok(elems);
      }
      self.stream.skip(",")?;
    }
  }

  fn stdlib_call(&mut self) -> CompileResult<Stmt> {
    let loc = self.stream.loc();
    let func = self
      .stream
      .peek()
      .and_then(|token| StdlibFunc::from_name(&token.text))
      .ok_or_else(|| self.error(ErrorKind::Parse, loc, "unknown standard-library call"))?;
    self.stream.advance();
    self.stream.skip("(")?;
    let args = self.call_args()?;
    Ok(Stmt::Stdlib { func, args, loc })
  }

  /// Short declaration, plain assignment or expression statement.
  fn simple_stmt(&mut self) -> CompileResult<Stmt> {
    if self.is_short_var_decl() {
      let mut names = Vec::new();
      loop {
        names.push(self.stream.get_ident()?);
        if !self.stream.equal(",") {
          break;
        }
      }
      let loc = self.stream.skip(":=")?;
      let rvals = self.expr_list()?;
      let mut lvals = Vec::with_capacity(names.len());
      for (name, name_loc) in names {
        let id = self.declare(name, Type::none(), name_loc)?;
        lvals.push(Expr::var(id, name_loc));
      }
      return Ok(Stmt::Assign { lvals, rvals, loc });
    }

    let mut lhs = self.expr_list()?;
    if self.stream.is("=") {
      let loc = self.stream.skip("=")?;
      for target in &lhs {
        if let ExprKind::Var(id) = target.kind
          && self.vars[id.0].placeholder
        {
          let name = &self.vars[id.0].name;
          return Err(self.error(ErrorKind::Name, target.loc, format!("undefined: {name}")));
        }
        if !target.is_lvalue() {
          return Err(self.error(
            ErrorKind::Parse,
            target.loc,
            "left-hand side is not assignable",
          ));
        }
      }
      let rvals = self.expr_list()?;
      return Ok(Stmt::Assign {
        lvals: lhs,
        rvals,
        loc,
      });
    }

    if lhs.len() == 1
      && let Some(expr) = lhs.pop()
    {
      return Ok(Stmt::Expr(expr));
    }

    let got = describe_token(self.stream.peek());
    Err(self.error(
      ErrorKind::Parse,
      self.stream.loc(),
      format!("expected \"=\" or \":=\", but got \"{got}\""),
    ))
  }

  /// Look ahead for `ident {, ident} :=` without consuming anything.
  fn is_short_var_decl(&self) -> bool {
    let mut offset = 0;
    loop {
      if self.stream.peek_at(offset).map(|t| t.kind) != Some(TokenKind::Ident) {
        return false;
      }
      match self.stream.peek_at(offset + 1) {
        Some(token) if token.is(":=") => return true,
        Some(token) if token.is(",") => offset += 2,
        _ => return false,
      }
    }
  }

  fn expr_list(&mut self) -> CompileResult<Vec<Expr>> {
    let mut exprs = vec![self.expr()?];
    while self.stream.equal(",") {
      exprs.push(self.expr()?);
    }
    Ok(exprs)
  }

  fn expr(&mut self) -> CompileResult<Expr> {
    self.equality()
  }

  fn equality(&mut self) -> CompileResult<Expr> {
    let mut node = self.relational()?;

    loop {
      let loc = self.stream.loc();
      let op = if self.stream.equal("==") {
        BinaryOp::Eq
      } else if self.stream.equal("!=") {
        BinaryOp::Ne
      } else {
        return Ok(node);
      };
      let rhs = self.relational()?;
      node = Expr::binary(op, node, rhs, loc);
    }
  }

  fn relational(&mut self) -> CompileResult<Expr> {
    let mut node = self.add()?;

    loop {
      let loc = self.stream.loc();
      if self.stream.equal("<") {
        let rhs = self.add()?;
        node = Expr::binary(BinaryOp::Lt, node, rhs, loc);
      } else if self.stream.equal("<=") {
        let rhs = self.add()?;
        node = Expr::binary(BinaryOp::Le, node, rhs, loc);
      } else if self.stream.equal(">") {
        let rhs = self.add()?;
        node = Expr::binary(BinaryOp::Lt, rhs, node, loc);
      } else if self.stream.equal(">=") {
        let rhs = self.add()?;
        node = Expr::binary(BinaryOp::Le, rhs, node, loc);
      } else {
        return Ok(node);
      }
    }
  }

  fn add(&mut self) -> CompileResult<Expr> {
    let mut node = self.mul()?;

    loop {
      let loc = self.stream.loc();
      let op = if self.stream.equal("+") {
        BinaryOp::Add
      } else if self.stream.equal("-") {
        BinaryOp::Sub
      } else {
        return Ok(node);
      };
      let rhs = self.mul()?;
      node = Expr::binary(op, node, rhs, loc);
    }
  }

  fn mul(&mut self) -> CompileResult<Expr> {
    let mut node = self.unary()?;

    loop {
      let loc = self.stream.loc();
      let op = if self.stream.equal("*") {
        BinaryOp::Mul
      } else if self.stream.equal("/") {
        BinaryOp::Div
      } else {
        return Ok(node);
      };
      let rhs = self.unary()?;
      node = Expr::binary(op, node, rhs, loc);
    }
  }

  fn unary(&mut self) -> CompileResult<Expr> {
    let loc = self.stream.loc();

    if self.stream.equal("+") {
      return self.unary();
    }

    if self.stream.equal("-") {
      let operand = self.unary()?;
      return Ok(Expr::binary(
        BinaryOp::Sub,
        Expr::number(0, loc),
        operand,
        loc,
      ));
    }

    if self.stream.equal("&") {
      let operand = self.unary()?;
      if !operand.is_lvalue() {
        return Err(self.error(
          ErrorKind::Parse,
          operand.loc,
          "cannot take the address of this expression",
        ));
      }
      return Ok(Expr::addr(operand, loc));
    }

    if self.stream.equal("*") {
      let operand = self.unary()?;
      return Ok(Expr::deref(operand, loc));
    }

    self.postfix()
  }

  fn postfix(&mut self) -> CompileResult<Expr> {
    let mut node = self.primary()?;
    loop {
      let loc = self.stream.loc();
      if !self.stream.equal("[") {
        return Ok(node);
      }
      let index = self.expr()?;
      self.stream.skip("]")?;
      node = self.index_expr(node, index, loc)?;
    }
  }

  /// Build `base[index]`, rejecting undeclared bases and literal indices
  /// past the end of an array whose type is already known.
  fn index_expr(&self, base: Expr, index: Expr, loc: usize) -> CompileResult<Expr> {
    if let ExprKind::Var(id) = base.kind {
      let var = &self.vars[id.0];
      if var.placeholder {
        return Err(self.error(
          ErrorKind::Name,
          base.loc,
          format!("undefined: {}", var.name),
        ));
      }
      if var.ty.is_array()
        && let ExprKind::Num(value) = index.kind
        && (value < 0 || value >= var.ty.len)
      {
        return Err(self.error(
          ErrorKind::Bounds,
          index.loc,
          format!(
            "index {value} out of bounds for {} (length {})",
            var.name, var.ty.len
          ),
        ));
      }
    }
    Ok(Expr::index(base, index, loc))
  }

  fn primary(&mut self) -> CompileResult<Expr> {
    if self.stream.equal("(") {
      let node = self.expr()?;
      self.stream.skip(")")?;
      return Ok(node);
    }

    let Some(token) = self.stream.peek().cloned() else {
      return Err(self.error(
        ErrorKind::Parse,
        self.stream.source.len(),
        "unexpected end of input",
      ));
    };

    match token.kind {
      TokenKind::Num => {
        let (value, loc) = self.stream.get_number()?;
        if token.is_char_literal() {
          Ok(Expr::typed_number(value, Type::int8(), loc))
        } else {
          Ok(Expr::number(value, loc))
        }
      }
      TokenKind::Str => {
        self.stream.advance();
        let index = self.intern_string(token.string_body());
        Ok(Expr::string(index, token.loc))
      }
      TokenKind::Ident => {
        let (name, loc) = self.stream.get_ident()?;
        if self.stream.equal("(") {
          let args = self.call_args()?;
          return Ok(Expr::call(name, args, loc));
        }
        Ok(self.var_ref(name, loc))
      }
      _ => {
        let got = describe_token(Some(&token));
        Err(self.error(
          ErrorKind::Parse,
          token.loc,
          format!("expected an expression, but got \"{got}\""),
        ))
      }
    }
  }

  /// Arguments after an already consumed `(`.
  fn call_args(&mut self) -> CompileResult<Vec<Expr>> {
    let mut args = Vec::new();
    if self.stream.equal(")") {
      return Ok(args);
    }
    loop {
      args.push(self.expr()?);
      if self.stream.equal(")") {
        return Ok(args);
      }
      self.stream.skip(",")?;
    }
  }

  fn lookup(&self, name: &str) -> Option<VarId> {
    self
      .scope
      .as_ref()
      .and_then(|scope| scope.names.get(name))
      .or_else(|| self.globals.get(name))
      .copied()
  }

  fn var_ref(&mut self, name: String, loc: usize) -> Expr {
    if let Some(id) = self.lookup(&name) {
      return Expr::var(id, loc);
    }
    let id = VarId(self.vars.len());
    self.vars.push(Variable {
      name,
      offset: 0,
      is_local: self.scope.is_some(),
      ty: Type::none(),
      loc,
      placeholder: true,
    });
    Expr::var(id, loc)
  }

  /// Declare a local inside a function, a global otherwise.
  fn declare(&mut self, name: String, ty: Type, loc: usize) -> CompileResult<VarId> {
    if self.lookup(&name).is_some() {
      return Err(self.error(
        ErrorKind::Name,
        loc,
        format!("{name} already declared"),
      ));
    }

    let id = VarId(self.vars.len());
    let is_local = self.scope.is_some();
    self.vars.push(Variable {
      name: name.clone(),
      offset: 0,
      is_local,
      ty,
      loc,
      placeholder: false,
    });

    match self.scope.as_mut() {
      Some(scope) => {
        scope.names.insert(name, id);
        scope.locals.push(id);
      }
      None => {
        self.globals.insert(name, id);
        self.global_order.push(id);
      }
    }
    Ok(id)
  }

  fn intern_string(&mut self, body: &str) -> usize {
    if let Some(&index) = self.string_ids.get(body) {
      return index;
    }
    let index = self.strings.len();
    self.strings.push(StrLiteral {
      label: format!(".L.str.{index}"),
      bytes: body.as_bytes().to_vec(),
    });
    self.string_ids.insert(body.to_string(), index);
    index
  }
}

/// Lightweight cursor over the token vector.
struct TokenStream<'a> {
  tokens: Vec<Token>,
  source: &'a str,
  pos: usize,
}

impl<'a> TokenStream<'a> {
  /// Take ownership of the token stream; the parser will advance `pos` as it consumes input.
  fn new(tokens: Vec<Token>, source: &'a str) -> Self {
    Self {
      tokens,
      source,
      pos: 0,
    }
  }

  fn peek(&self) -> Option<&Token> {
    self.tokens.get(self.pos)
  }

  fn peek_at(&self, offset: usize) -> Option<&Token> {
    self.tokens.get(self.pos + offset)
  }

  fn peek_kind(&self) -> Option<TokenKind> {
    self.peek().map(|token| token.kind)
  }

  /// Byte offset of the current token, or end of input.
  fn loc(&self) -> usize {
    self.peek().map_or(self.source.len(), |token| token.loc)
  }

  fn advance(&mut self) {
    if self.pos < self.tokens.len() {
      self.pos += 1;
    }
  }

  /// Whether the current token is the given punctuator or keyword.
  fn is(&self, op: &str) -> bool {
    self.peek().is_some_and(|token| token.is(op))
  }

  /// Whether a line break separates the current token from the previous one.
  fn at_line_start(&self) -> bool {
    let Some(prev) = self.pos.checked_sub(1).and_then(|prev| self.tokens.get(prev)) else {
      return false;
    };
    let start = prev.loc + prev.len;
    let end = self.loc();
    start <= end && self.source[start..end].contains('\n')
  }

  /// Consume the current token if it matches the provided punctuator.
  fn equal(&mut self, op: &str) -> bool {
    if self.is(op) {
      self.pos += 1;
      return true;
    }
    false
  }

  /// Consume `s` and return its location, or fail.
  fn skip(&mut self, s: &str) -> CompileResult<usize> {
    let loc = self.loc();
    if self.equal(s) {
      Ok(loc)
    } else {
      let got = describe_token(self.peek());
      Err(CompileError::at(
        ErrorKind::Parse,
        self.source,
        loc,
        format!("expected \"{s}\", but got \"{got}\""),
      ))
    }
  }

  /// Parse the current token as an integer literal returning its value and location.
  fn get_number(&mut self) -> CompileResult<(i64, usize)> {
    if let Some(token) = self.peek()
      && token.kind == TokenKind::Num
    {
      let loc = token.loc;
      let value = token.value.ok_or_else(|| {
        CompileError::at(
          ErrorKind::Parse,
          self.source,
          loc,
          "internal error: numeric token missing value",
        )
      })?;
      self.pos += 1;
      return Ok((value, loc));
    }

    let got = describe_token(self.peek());
    Err(CompileError::at(
      ErrorKind::Parse,
      self.source,
      self.loc(),
      format!("expected a number, but got \"{got}\""),
    ))
  }

  /// Parse the current token as an identifier.
  fn get_ident(&mut self) -> CompileResult<(String, usize)> {
    if let Some(token) = self.peek()
      && token.kind == TokenKind::Ident
    {
      let ident = (token.text.clone(), token.loc);
      self.pos += 1;
      return Ok(ident);
    }

    let got = describe_token(self.peek());
    Err(CompileError::at(
      ErrorKind::Parse,
      self.source,
      self.loc(),
      format!("expected an identifier, but got \"{got}\""),
    ))
  }

  fn is_eof(&self) -> bool {
    matches!(self.peek_kind(), Some(TokenKind::Eof) | None)
  }
}
