//! Development-mode renderings of the token stream and the typed tree.
//!
//! Purely diagnostic; nothing here feeds back into code generation.

use itertools::Itertools;

use crate::ast::{Expr, ExprKind, Function, Program, Stmt, VarId};
use crate::tokenizer::{Token, TokenKind};

/// One token per line: kind, quoted text and the literal value if any.
pub fn tokens(tokens: &[Token]) -> String {
  tokens
    .iter()
    .map(|token| {
      let mut line = format!("{:<10} {:?}", format!("{:?}", token.kind), token.text);
      if token.kind == TokenKind::Punctuator && token.len == 0 {
        line.push_str(" (newline)");
      }
      if let Some(value) = token.value {
        line.push_str(&format!(" = {value}"));
      }
      line
    })
    .join("\n")
}

/// Indented tree of every function, annotated with types and frame slots.
pub fn program(program: &Program) -> String {
  let mut dumper = Dumper {
    program,
    out: String::new(),
  };
  dumper.program();
  dumper.out
}

struct Dumper<'a> {
  program: &'a Program,
  out: String,
}

impl Dumper<'_> {
  fn line(&mut self, depth: usize, text: impl AsRef<str>) {
    for _ in 0..depth {
      self.out.push_str("  ");
    }
    self.out.push_str(text.as_ref());
    self.out.push('\n');
  }

  fn slot(&self, id: VarId) -> String {
    let var = self.program.var(id);
    if var.is_local {
      format!("{} {} [rbp-{}]", var.name, var.ty, var.offset)
    } else {
      format!("{} {} [{}]", var.name, var.ty, self.program.symbol(&var.name))
    }
  }

  fn program(&mut self) {
    let program = self.program;
    self.line(0, format!("package {}", program.package));
    for &id in &program.globals {
      let slot = self.slot(id);
      self.line(0, format!("global {slot}"));
    }
    for func in &program.funcs {
      self.function(func);
    }
  }

  fn function(&mut self, func: &Function) {
    let program = self.program;
    let params = func.params.iter().map(|&id| self.slot(id)).join(", ");
    let marker = if func.implicit { " (implicit)" } else { "" };
    self.line(
      0,
      format!(
        "func {}({params}) frame {}{marker}",
        program.function_symbol(func),
        func.stack_size
      ),
    );
    for &id in func.locals.iter().filter(|id| !func.params.contains(id)) {
      let slot = self.slot(id);
      self.line(1, format!("local {slot}"));
    }
    for stmt in &func.body {
      self.stmt(stmt, 1);
    }
  }

  fn stmt(&mut self, stmt: &Stmt, depth: usize) {
    match stmt {
      Stmt::Expr(expr) => {
        self.line(depth, "expr");
        self.expr(expr, depth + 1);
      }
      Stmt::Return(expr) => {
        self.line(depth, "return");
        if !expr.is_empty() {
          self.expr(expr, depth + 1);
        }
      }
      Stmt::Block(stmts) => {
        self.line(depth, "block");
        for stmt in stmts {
          self.stmt(stmt, depth + 1);
        }
      }
      Stmt::If {
        init,
        cond,
        then,
        els,
      } => {
        self.line(depth, "if");
        if !init.is_empty() {
          self.stmt(init, depth + 1);
        }
        self.expr(cond, depth + 1);
        self.stmt(then, depth + 1);
        if !els.is_empty() {
          self.line(depth, "else");
          self.stmt(els, depth + 1);
        }
      }
      Stmt::For {
        init,
        cond,
        post,
        body,
      } => {
        self.line(depth, "for");
        if !init.is_empty() {
          self.stmt(init, depth + 1);
        }
        if !cond.is_empty() {
          self.expr(cond, depth + 1);
        }
        if !post.is_empty() {
          self.stmt(post, depth + 1);
        }
        self.stmt(body, depth + 1);
      }
      Stmt::Assign { lvals, rvals, .. } => {
        self.line(depth, "assign");
        for lval in lvals {
          self.expr(lval, depth + 1);
        }
        self.line(depth, "=");
        for rval in rvals {
          self.expr(rval, depth + 1);
        }
      }
      Stmt::Stdlib { func, args, .. } => {
        self.line(depth, func.name());
        for arg in args {
          self.expr(arg, depth + 1);
        }
      }
      Stmt::Empty => self.line(depth, "empty"),
    }
  }

  fn expr(&mut self, expr: &Expr, depth: usize) {
    let ty = &expr.ty;
    match &expr.kind {
      ExprKind::Num(value) => self.line(depth, format!("num {value} : {ty}")),
      ExprKind::Str(index) => {
        let lit = &self.program.strings[*index];
        let text = String::from_utf8_lossy(&lit.bytes);
        self.line(depth, format!("str {text:?} {}", lit.label));
      }
      ExprKind::Var(id) => {
        let slot = self.slot(*id);
        self.line(depth, format!("var {slot}"));
      }
      ExprKind::Addr(operand) => {
        self.line(depth, format!("addr : {ty}"));
        self.expr(operand, depth + 1);
      }
      ExprKind::Deref(operand) => {
        self.line(depth, format!("deref : {ty}"));
        self.expr(operand, depth + 1);
      }
      ExprKind::Binary { op, lhs, rhs } => {
        self.line(depth, format!("binary {} : {ty}", op.symbol()));
        self.expr(lhs, depth + 1);
        self.expr(rhs, depth + 1);
      }
      ExprKind::Index { base, index } => {
        self.line(depth, format!("index : {ty}"));
        self.expr(base, depth + 1);
        self.expr(index, depth + 1);
      }
      ExprKind::Call { name, args } => {
        self.line(depth, format!("call {} : {ty}", self.program.symbol(name)));
        for arg in args {
          self.expr(arg, depth + 1);
        }
      }
      ExprKind::Empty => self.line(depth, "empty"),
    }
  }
}
