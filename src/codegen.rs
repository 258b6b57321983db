//! Code generation: lower the resolved program into Intel-syntax x86-64
//! assembly.
//!
//! The emitter is a stack machine. Every expression leaves its value on the
//! stack (a string takes two words: data pointer underneath, length on top)
//! and statements pop what they do not keep. Locals are addressed relative
//! to `rbp`, globals relative to `rip`.

use itertools::Itertools;
use tracing::{debug, trace};

use crate::ast::{BinaryOp, Expr, ExprKind, Function, Program, StdlibFunc, Stmt};
use crate::runtime::{self, Routine};
use crate::ty::{Type, TypeKind};

const ARG_REGS: [&str; 6] = ["rdi", "rsi", "rdx", "rcx", "r8", "r9"];
const ARG_REGS8: [&str; 6] = ["dil", "sil", "dl", "cl", "r8b", "r9b"];

/// Emit the complete assembly file for a resolved program.
pub fn generate(program: &Program) -> String {
  let mut out = Generator {
    program,
    asm: String::new(),
    depth: 0,
    label_seq: 0,
    return_label: String::new(),
  };
  out.asm.push_str(".intel_syntax noprefix\n");
  out.emit_data();
  out.emit_text();
  out.asm.push_str(".section .note.GNU-stack,\"\",@progbits\n");
  debug!(
    lines = out.asm.lines().count(),
    labels = out.label_seq,
    "emitted assembly"
  );
  out.asm
}

struct Generator<'a> {
  program: &'a Program,
  asm: String,
  /// Words pushed on top of the frame; odd means `rsp` is off by 8.
  depth: i64,
  /// Control-flow label counter, unique within one run.
  label_seq: usize,
  return_label: String,
}

impl Generator<'_> {
  fn line(&mut self, text: &str) {
    self.asm.push_str("    ");
    self.asm.push_str(text);
    self.asm.push('\n');
  }

  fn label(&mut self, name: &str) {
    self.asm.push_str(name);
    self.asm.push_str(":\n");
  }

  fn next_label(&mut self) -> usize {
    self.label_seq += 1;
    trace!(seq = self.label_seq, "allocated label");
    self.label_seq
  }

  fn push(&mut self, reg: &str) {
    self.line(&format!("push {reg}"));
    self.depth += 1;
  }

  fn pop(&mut self, reg: &str) {
    self.line(&format!("pop {reg}"));
    self.depth -= 1;
  }

  fn discard(&mut self, words: usize) {
    if words > 0 {
      self.line(&format!("add rsp, {}", words * 8));
      self.depth -= words as i64;
    }
  }

  fn emit_data(&mut self) {
    let program = self.program;
    self.asm.push_str(".data\n");
    for &id in &program.globals {
      let var = program.var(id);
      self.line(".balign 8");
      self.label(&program.symbol(&var.name));
      self.line(&format!(".zero {}", var.ty.size().max(1)));
    }
    for lit in &program.strings {
      self.label(&lit.label);
      if !lit.bytes.is_empty() {
        self.line(&format!(".byte {}", lit.bytes.iter().join(", ")));
      }
      self.line(".balign 8");
      self.label(&lit.descriptor_label());
      self.line(&format!(".quad {}", lit.label));
      self.line(&format!(".quad {}", lit.bytes.len()));
    }
    runtime::emit_data(&mut self.asm);
  }

  fn emit_text(&mut self) {
    let program = self.program;
    self.asm.push_str(".text\n");
    self.asm.push_str(".globl main\n");
    for func in program.funcs.iter().filter(|func| !func.implicit) {
      self.asm.push_str(&format!(
        ".globl {}\n",
        program.function_symbol(func)
      ));
    }
    runtime::emit_routines(&mut self.asm);
    for func in &program.funcs {
      self.emit_function(func);
    }
  }

  fn emit_function(&mut self, func: &Function) {
    let program = self.program;
    let symbol = program.function_symbol(func);
    self.return_label = format!(".L.return.{symbol}");
    self.depth = 0;

    self.label(&symbol);
    self.line("push rbp");
    self.line("mov rbp, rsp");
    if func.stack_size > 0 {
      self.line(&format!("sub rsp, {}", func.stack_size));
    }

    let mut reg = 0;
    for &id in &func.params {
      let var = program.var(id);
      let offset = var.offset;
      match var.ty.kind {
        TypeKind::String => {
          self.line(&format!("mov [rbp - {offset}], {}", ARG_REGS[reg]));
          self.line(&format!(
            "mov [rbp - {}], {}",
            offset - 8,
            ARG_REGS[reg + 1]
          ));
          reg += 2;
        }
        _ if var.ty.size() == 1 => {
          self.line(&format!("mov [rbp - {offset}], {}", ARG_REGS8[reg]));
          reg += 1;
        }
        _ => {
          self.line(&format!("mov [rbp - {offset}], {}", ARG_REGS[reg]));
          reg += 1;
        }
      }
    }

    for stmt in &func.body {
      self.emit_stmt(stmt);
    }
    debug_assert_eq!(self.depth, 0, "unbalanced stack in {symbol}");

    // Falling off the end returns 0.
    self.line("mov rax, 0");
    let return_label = self.return_label.clone();
    self.label(&return_label);
    self.line("mov rsp, rbp");
    self.line("pop rbp");
    self.line("ret");
  }

  fn emit_stmt(&mut self, stmt: &Stmt) {
    match stmt {
      Stmt::Expr(expr) => {
        self.emit_expr(expr);
        self.discard(expr.ty.words());
      }
      Stmt::Return(expr) => {
        if !expr.is_empty() {
          self.emit_expr(expr);
          if expr.ty.is_string() {
            self.pop("rdx");
          }
          self.pop("rax");
        }
        let target = self.return_label.clone();
        self.line(&format!("jmp {target}"));
      }
      Stmt::Block(stmts) => {
        for stmt in stmts {
          self.emit_stmt(stmt);
        }
      }
      Stmt::If {
        init,
        cond,
        then,
        els,
      } => {
        self.emit_stmt(init);
        let seq = self.next_label();
        self.emit_cond_jump(cond, &format!(".L.else.{seq}"));
        self.emit_stmt(then);
        self.line(&format!("jmp .L.end.{seq}"));
        self.label(&format!(".L.else.{seq}"));
        self.emit_stmt(els);
        self.label(&format!(".L.end.{seq}"));
      }
      Stmt::For {
        init,
        cond,
        post,
        body,
      } => {
        self.emit_stmt(init);
        let seq = self.next_label();
        self.label(&format!(".L.begin.{seq}"));
        if !cond.is_empty() {
          self.emit_cond_jump(cond, &format!(".L.end.{seq}"));
        }
        self.emit_stmt(body);
        self.emit_stmt(post);
        self.line(&format!("jmp .L.begin.{seq}"));
        self.label(&format!(".L.end.{seq}"));
      }
      Stmt::Assign { lvals, rvals, .. } => {
        // Every right-hand side is evaluated before the first store.
        for rval in rvals {
          self.emit_expr(rval);
        }
        for lval in lvals.iter().rev() {
          self.emit_addr(lval);
          self.store(&lval.ty);
          self.discard(lval.ty.words());
        }
      }
      Stmt::Stdlib { func, args, .. } => self.emit_stdlib(*func, args),
      Stmt::Empty => {}
    }
  }

  fn emit_cond_jump(&mut self, cond: &Expr, target: &str) {
    self.emit_expr(cond);
    self.pop("rax");
    self.line("cmp rax, 0");
    self.line(&format!("je {target}"));
  }

  fn emit_stdlib(&mut self, func: StdlibFunc, args: &[Expr]) {
    for (i, arg) in args.iter().enumerate() {
      if i > 0 && func == StdlibFunc::Println {
        self.emit_call(Routine::PrintSpace.symbol());
      }
      self.emit_expr(arg);
      if arg.ty.is_string() {
        self.pop("rsi");
        self.pop("rdi");
        self.emit_call(Routine::PrintString.symbol());
      } else {
        self.pop("rdi");
        self.emit_call(Routine::PrintInt.symbol());
      }
    }
    if func == StdlibFunc::Println {
      self.emit_call(Routine::PrintNewline.symbol());
    }
  }

  /// `call` with `rsp` realigned to 16 bytes.
  fn emit_call(&mut self, symbol: &str) {
    self.line("mov rax, 0");
    if self.depth % 2 == 1 {
      self.line("sub rsp, 8");
      self.line(&format!("call {symbol}"));
      self.line("add rsp, 8");
    } else {
      self.line(&format!("call {symbol}"));
    }
  }

  fn emit_expr(&mut self, expr: &Expr) {
    match &expr.kind {
      ExprKind::Num(value) => {
        self.line(&format!("mov rax, {value}"));
        self.push("rax");
      }
      ExprKind::Str(_) | ExprKind::Var(_) | ExprKind::Index { .. } => {
        self.emit_addr(expr);
        self.load(&expr.ty);
      }
      ExprKind::Deref(operand) => {
        self.emit_expr(operand);
        self.load(&expr.ty);
      }
      ExprKind::Addr(operand) => self.emit_addr(operand),
      ExprKind::Binary { op, lhs, rhs } => {
        self.emit_expr(lhs);
        self.emit_expr(rhs);
        self.pop("rdi");
        self.pop("rax");
        match op {
          BinaryOp::Add => self.line("add rax, rdi"),
          BinaryOp::Sub => self.line("sub rax, rdi"),
          BinaryOp::Mul => self.line("imul rax, rdi"),
          BinaryOp::Div => {
            self.line("cqo");
            self.line("idiv rdi");
          }
          BinaryOp::Eq | BinaryOp::Ne | BinaryOp::Lt | BinaryOp::Le => {
            let set = match op {
              BinaryOp::Eq => "sete",
              BinaryOp::Ne => "setne",
              BinaryOp::Lt => "setl",
              _ => "setle",
            };
            self.line("cmp rax, rdi");
            self.line(&format!("{set} al"));
            self.line("movzx rax, al");
          }
        }
        self.push("rax");
      }
      ExprKind::Call { name, args } => {
        let mut words = 0;
        for arg in args {
          self.emit_expr(arg);
          words += arg.ty.words();
        }
        for reg in ARG_REGS[..words].iter().rev() {
          self.pop(reg);
        }
        let symbol = self.program.symbol(name);
        self.emit_call(&symbol);
        self.push("rax");
      }
      ExprKind::Empty => {}
    }
  }

  /// Push the address an lvalue (or string literal) denotes.
  fn emit_addr(&mut self, expr: &Expr) {
    match &expr.kind {
      ExprKind::Var(id) => {
        let program = self.program;
        let var = program.var(*id);
        if var.is_local {
          self.line(&format!("lea rax, [rbp - {}]", var.offset));
        } else {
          self.line(&format!("lea rax, [rip + {}]", program.symbol(&var.name)));
        }
        self.push("rax");
      }
      ExprKind::Str(index) => {
        let desc = self.program.strings[*index].descriptor_label();
        self.line(&format!("lea rax, [rip + {desc}]"));
        self.push("rax");
      }
      ExprKind::Deref(operand) => self.emit_expr(operand),
      ExprKind::Index { base, index } => {
        match base.ty.kind {
          TypeKind::Array => self.emit_addr(base),
          TypeKind::String => {
            // Index into the bytes the descriptor points at.
            self.emit_addr(base);
            self.pop("rax");
            self.line("mov rax, [rax]");
            self.push("rax");
          }
          _ => self.emit_expr(base),
        }
        self.emit_expr(index);
        self.pop("rdi");
        let size = expr.ty.size();
        if size != 1 {
          self.line(&format!("imul rdi, rdi, {size}"));
        }
        self.pop("rax");
        self.line("add rax, rdi");
        self.push("rax");
      }
      _ => panic!("not an lvalue"),
    }
  }

  /// Replace the address on top of the stack with the value stored there.
  fn load(&mut self, ty: &Type) {
    match ty.kind {
      TypeKind::Array => {}
      TypeKind::String => {
        self.pop("rax");
        self.line("push qword ptr [rax]");
        self.line("push qword ptr [rax + 8]");
        self.depth += 2;
      }
      TypeKind::Int8 => {
        self.pop("rax");
        self.line("movsx rax, byte ptr [rax]");
        self.push("rax");
      }
      TypeKind::Bool => {
        self.pop("rax");
        self.line("movzx rax, byte ptr [rax]");
        self.push("rax");
      }
      _ => {
        self.pop("rax");
        self.line("mov rax, [rax]");
        self.push("rax");
      }
    }
  }

  /// Store the value under the address on top of the stack, leaving the
  /// value in place.
  fn store(&mut self, ty: &Type) {
    self.pop("rax");
    match ty.kind {
      TypeKind::String => {
        self.pop("rsi");
        self.pop("rdi");
        self.line("mov [rax], rdi");
        self.line("mov [rax + 8], rsi");
        self.push("rdi");
        self.push("rsi");
      }
      _ if ty.size() == 1 => {
        self.pop("rdi");
        self.line("mov [rax], dil");
        self.push("rdi");
      }
      _ => {
        self.pop("rdi");
        self.line("mov [rax], rdi");
        self.push("rdi");
      }
    }
  }
}
