//! Type & layout pass: annotates every expression with a type, binds the
//! placeholders the parser left behind, and assigns frame offsets to locals.
//!
//! Resolution is idempotent per node: an expression whose type is already
//! concrete is left untouched. Binary operators resolve their right operand
//! before the left one.

use std::collections::HashMap;

use tracing::debug;

use crate::ast::{Expr, ExprKind, Function, Program, Stmt, VarId, Variable};
use crate::error::{CompileError, CompileResult, ErrorKind};
use crate::ty::Type;

/// Integer argument registers available to a call.
pub const MAX_ARG_WORDS: usize = 6;

/// Resolve types and frame layout for the whole program in place.
pub fn resolve(program: &mut Program, source: &str) -> CompileResult<()> {
  for func in program.funcs.iter().filter(|func| !func.implicit) {
    let words: usize = func
      .params
      .iter()
      .map(|id| program.vars[id.0].ty.words())
      .sum();
    if words > MAX_ARG_WORDS {
      return Err(CompileError::at(
        ErrorKind::Type,
        source,
        func.loc,
        format!(
          "parameters of {} need {words} argument registers, at most {MAX_ARG_WORDS} are available",
          func.name
        ),
      ));
    }
  }

  let signatures: HashMap<String, Vec<Type>> = program
    .funcs
    .iter()
    .filter(|func| !func.implicit)
    .map(|func| {
      let params = func
        .params
        .iter()
        .map(|id| program.vars[id.0].ty.clone())
        .collect();
      (func.name.clone(), params)
    })
    .collect();

  let Program {
    vars,
    globals,
    funcs,
    ..
  } = program;

  for func in funcs.iter_mut() {
    let Function {
      name,
      params,
      locals,
      body,
      stack_size,
      loc: func_loc,
      ..
    } = func;

    // Offsets are the far end of each slot, so the largest one is the frame
    // size so far; this keeps a second run from shrinking the frame.
    let frame_size = locals
      .iter()
      .map(|id| vars[id.0].offset)
      .max()
      .unwrap_or(0);
    let mut resolver = Resolver {
      source,
      vars: &mut *vars,
      globals: globals.as_slice(),
      locals: locals.as_slice(),
      signatures: &signatures,
      frame_size,
    };

    for &param in params.iter() {
      resolver.assign_offset(param)?;
    }
    for stmt in body.iter_mut() {
      resolver.resolve_stmt(stmt)?;
    }
    for &local in locals.iter() {
      resolver.assign_offset(local)?;
    }

    *stack_size = align_to(resolver.frame_size, 16).ok_or_else(|| {
      CompileError::at(
        ErrorKind::Type,
        source,
        *func_loc,
        format!("stack frame of {name} is too large"),
      )
    })?;
    debug!(function = %name, stack_size = *stack_size, "laid out frame");
  }

  for id in globals.iter() {
    let var = &vars[id.0];
    if !var.ty.is_resolved() {
      return Err(CompileError::at(
        ErrorKind::Type,
        source,
        var.loc,
        format!("cannot infer type of {}", var.name),
      ));
    }
  }
  Ok(())
}

/// Round `n` up to the nearest multiple of `align`, `None` on overflow.
pub fn align_to(n: i64, align: i64) -> Option<i64> {
  Some(n.checked_add(align - 1)? / align * align)
}

struct Resolver<'a> {
  source: &'a str,
  vars: &'a mut Vec<Variable>,
  globals: &'a [VarId],
  locals: &'a [VarId],
  signatures: &'a HashMap<String, Vec<Type>>,
  frame_size: i64,
}

impl Resolver<'_> {
  fn error(&self, kind: ErrorKind, loc: usize, message: impl Into<String>) -> CompileError {
    CompileError::at(kind, self.source, loc, message)
  }

  fn resolve_stmt(&mut self, stmt: &mut Stmt) -> CompileResult<()> {
    match stmt {
      Stmt::Expr(expr) => self.resolve_expr(expr),
      Stmt::Return(expr) => {
        if expr.is_empty() {
          return Ok(());
        }
        self.resolve_expr(expr)
      }
      Stmt::Block(stmts) => stmts.iter_mut().try_for_each(|s| self.resolve_stmt(s)),
      Stmt::If {
        init,
        cond,
        then,
        els,
      } => {
        if !init.is_empty() {
          self.resolve_stmt(init)?;
        }
        self.resolve_expr(cond)?;
        self.resolve_stmt(then)?;
        if !els.is_empty() {
          self.resolve_stmt(els)?;
        }
        Ok(())
      }
      Stmt::For {
        init,
        cond,
        post,
        body,
      } => {
        if !init.is_empty() {
          self.resolve_stmt(init)?;
        }
        if !cond.is_empty() {
          self.resolve_expr(cond)?;
        }
        self.resolve_stmt(body)?;
        if !post.is_empty() {
          self.resolve_stmt(post)?;
        }
        Ok(())
      }
      Stmt::Assign { lvals, rvals, loc } => self.resolve_assign(lvals, rvals, *loc),
      Stmt::Stdlib { args, .. } => args.iter_mut().try_for_each(|arg| self.resolve_expr(arg)),
      Stmt::Empty => Ok(()),
    }
  }

  fn resolve_assign(
    &mut self,
    lvals: &mut [Expr],
    rvals: &mut [Expr],
    loc: usize,
  ) -> CompileResult<()> {
    if lvals.len() != rvals.len() {
      return Err(self.error(
        ErrorKind::Type,
        loc,
        format!(
          "assignment mismatch: {} variables but {} values",
          lvals.len(),
          rvals.len()
        ),
      ));
    }

    for (lval, rval) in lvals.iter_mut().zip(rvals.iter_mut()) {
      self.resolve_expr(rval)?;
      if !rval.ty.is_resolved() {
        return Err(self.error(
          ErrorKind::Type,
          rval.loc,
          "value is used before its type is known",
        ));
      }

      if let ExprKind::Var(id) = &mut lval.kind {
        self.bind(id, lval.loc)?;
        let var = &mut self.vars[id.0];
        if !var.ty.is_resolved() {
          var.ty = rval.ty.clone();
        }
      }
      self.resolve_expr(lval)?;

      if lval.ty.is_array() {
        return Err(self.error(
          ErrorKind::Type,
          lval.loc,
          format!("cannot assign to array of type {}", lval.ty),
        ));
      }
      if lval.ty.words() != rval.ty.words() {
        return Err(self.error(
          ErrorKind::Type,
          rval.loc,
          format!("cannot assign {} to {}", rval.ty, lval.ty),
        ));
      }

      if let Some(id) = lval.root_var() {
        self.assign_offset(id)?;
      }
    }
    Ok(())
  }

  fn resolve_expr(&mut self, expr: &mut Expr) -> CompileResult<()> {
    if expr.ty.is_resolved() {
      return Ok(());
    }

    match &mut expr.kind {
      ExprKind::Num(_) => expr.ty = Type::int64(),
      ExprKind::Str(_) => expr.ty = Type::string(),
      ExprKind::Var(id) => {
        self.bind(id, expr.loc)?;
        expr.ty = self.vars[id.0].ty.clone();
      }
      ExprKind::Addr(operand) => {
        self.resolve_expr(operand)?;
        expr.ty = Type::pointer_to(operand.ty.clone());
      }
      ExprKind::Deref(operand) => {
        self.resolve_expr(operand)?;
        expr.ty = match operand.ty.base() {
          Some(base) if operand.ty.is_pointer() => base.clone(),
          _ => Type::int64(),
        };
      }
      ExprKind::Binary { op, lhs, rhs } => {
        self.resolve_expr(rhs)?;
        self.resolve_expr(lhs)?;
        if lhs.ty.kind != rhs.ty.kind {
          return Err(self.error(
            ErrorKind::Type,
            expr.loc,
            format!(
              "mismatched types {} and {} in {}",
              lhs.ty,
              rhs.ty,
              op.symbol()
            ),
          ));
        }
        if !lhs.ty.is_resolved() || lhs.ty.is_string() || lhs.ty.is_array() {
          return Err(self.error(
            ErrorKind::Type,
            expr.loc,
            format!("operator {} not defined on {}", op.symbol(), lhs.ty),
          ));
        }
        expr.ty = if op.is_comparison() {
          Type::bool()
        } else {
          lhs.ty.clone()
        };
      }
      ExprKind::Index { base, index } => {
        self.resolve_expr(base)?;
        self.resolve_expr(index)?;
        expr.ty = match base.ty.base() {
          Some(elem) if base.ty.is_array() => elem.clone(),
          _ => Type::int8(),
        };
      }
      ExprKind::Call { name, args } => {
        for arg in args.iter_mut() {
          self.resolve_expr(arg)?;
        }
        self.check_call(name, args, expr.loc)?;
        expr.ty = Type::int64();
      }
      ExprKind::Empty => {}
    }
    Ok(())
  }

  fn check_call(&self, name: &str, args: &[Expr], loc: usize) -> CompileResult<()> {
    let Some(params) = self.signatures.get(name) else {
      return Err(self.error(ErrorKind::Name, loc, format!("undefined: {name}")));
    };

    if params.len() != args.len() {
      return Err(self.error(
        ErrorKind::Type,
        loc,
        format!(
          "wrong argument count in call to {name}: have {}, want {}",
          args.len(),
          params.len()
        ),
      ));
    }

    for (arg, param) in args.iter().zip(params) {
      if arg.ty.words() != param.words() {
        return Err(self.error(
          ErrorKind::Type,
          arg.loc,
          format!("cannot use {} as {param} argument to {name}", arg.ty),
        ));
      }
    }

    Ok(())
  }

  /// Swap a placeholder for the binding its name refers to.
  fn bind(&self, id: &mut VarId, loc: usize) -> CompileResult<()> {
    let var = &self.vars[id.0];
    if !var.placeholder {
      return Ok(());
    }
    let name = &var.name;
    *id = self
      .locals
      .iter()
      .chain(self.globals)
      .copied()
      .find(|candidate| self.vars[candidate.0].name == *name)
      .ok_or_else(|| self.error(ErrorKind::Name, loc, format!("undefined: {name}")))?;
    Ok(())
  }

  /// Give a local its frame slot the first time it is laid out.
  fn assign_offset(&mut self, id: VarId) -> CompileResult<()> {
    let var = &self.vars[id.0];
    if !var.is_local || var.offset != 0 {
      return Ok(());
    }
    if !var.ty.is_resolved() {
      return Err(self.error(
        ErrorKind::Type,
        var.loc,
        format!("cannot infer type of {}", var.name),
      ));
    }
    let Some(end) = self.frame_size.checked_add(var.ty.size()) else {
      return Err(self.error(
        ErrorKind::Type,
        var.loc,
        format!("{} does not fit in the stack frame", var.name),
      ));
    };
    self.frame_size = end;
    self.vars[id.0].offset = end;
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::parser::parse;
  use crate::tokenizer::tokenize;
  use crate::ty::TypeKind;

  fn resolve_src(source: &str) -> CompileResult<Program> {
    let mut program = parse(tokenize(source)?, source)?;
    resolve(&mut program, source)?;
    Ok(program)
  }

  fn local<'p>(program: &'p Program, func: &str, name: &str) -> &'p Variable {
    let func = program
      .funcs
      .iter()
      .find(|f| !f.implicit && f.name == func)
      .unwrap();
    func
      .locals
      .iter()
      .map(|id| program.var(*id))
      .find(|v| v.name == name)
      .unwrap()
  }

  #[test]
  fn short_declaration_infers_type_and_offset() {
    let program =
      resolve_src("package main\nfunc main() {\nx := 5\ns := \"hi\"\nc := 'a'\n}\n").unwrap();
    let x = local(&program, "main", "x");
    let s = local(&program, "main", "s");
    let c = local(&program, "main", "c");
    assert_eq!(x.ty.kind, TypeKind::Int64);
    assert_eq!(s.ty.kind, TypeKind::String);
    assert_eq!(c.ty.kind, TypeKind::Int8);
    assert_eq!(x.offset, 8);
    assert_eq!(s.offset, 24);
    assert_eq!(c.offset, 25);
    let main = program.funcs.iter().find(|f| f.name == "main").unwrap();
    assert_eq!(main.stack_size, 32);
  }

  #[test]
  fn parameters_are_laid_out_first() {
    let program = resolve_src(
      "package main\nfunc add(a int, b *int) {\nc := a\nreturn c\n}\nfunc main() {\nreturn 0\n}\n",
    )
    .unwrap();
    assert_eq!(local(&program, "add", "a").offset, 8);
    assert_eq!(local(&program, "add", "b").offset, 16);
    assert_eq!(local(&program, "add", "c").offset, 24);
  }

  #[test]
  fn array_elements_share_one_slot() {
    let program = resolve_src(
      "package main\nfunc main() {\nvar a [3]int = {1, 2, 3}\nvar b bool\n}\n",
    )
    .unwrap();
    assert_eq!(local(&program, "main", "a").offset, 24);
    assert_eq!(local(&program, "main", "b").offset, 25);
  }

  #[test]
  fn mismatched_operands_are_a_type_error() {
    let err = resolve_src("package main\nfunc main() {\nc := 'a'\nreturn c + 1\n}\n").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Type);
    assert_eq!(err.message(), "mismatched types int8 and int in +");
  }

  #[test]
  fn comparisons_yield_bool_and_deref_follows_pointer() {
    let program = resolve_src(
      "package main\nfunc main() {\nx := 1\np := &x\nb := *p < 2\ny := *p\n}\n",
    )
    .unwrap();
    assert_eq!(local(&program, "main", "p").ty.to_string(), "*int");
    assert_eq!(local(&program, "main", "b").ty.kind, TypeKind::Bool);
    assert_eq!(local(&program, "main", "y").ty.kind, TypeKind::Int64);
  }

  #[test]
  fn string_index_is_a_byte() {
    let program = resolve_src("package main\nfunc main() {\ns := \"abc\"\nc := s[1]\n}\n").unwrap();
    assert_eq!(local(&program, "main", "c").ty.kind, TypeKind::Int8);
  }

  #[test]
  fn forward_global_reference_binds_to_global() {
    let program =
      resolve_src("package main\nfunc main() {\nreturn g + 1\n}\nvar g int = 41\n").unwrap();
    let main = program.funcs.iter().find(|f| f.name == "main").unwrap();
    let Stmt::Return(expr) = &main.body[0] else {
      panic!("expected return");
    };
    let ExprKind::Binary { lhs, .. } = &expr.kind else {
      panic!("expected binary");
    };
    let ExprKind::Var(id) = lhs.kind else {
      panic!("expected var");
    };
    assert!(!program.var(id).placeholder);
    assert!(!program.var(id).is_local);
  }

  #[test]
  fn unknown_name_is_a_name_error() {
    let err = resolve_src("package main\nfunc main() {\nreturn missing\n}\n").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Name);
    assert_eq!(err.message(), "undefined: missing");
  }

  #[test]
  fn calls_are_checked_against_declarations() {
    let err = resolve_src("package main\nfunc main() {\nreturn nothere(1)\n}\n").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Name);

    let err = resolve_src("package main\nfunc f(a int) {}\nfunc main() {\nreturn f(1, 2)\n}\n")
      .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Type);
  }

  #[test]
  fn missing_entry_function_is_a_name_error() {
    let err = resolve_src("package main\nfunc helper() {}\n").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Name);
    assert_eq!(err.message(), "undefined: main");
  }

  #[test]
  fn assignment_arity_is_checked() {
    let err = resolve_src("package main\nfunc main() {\na, b := 1\n}\n").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Type);
  }

  #[test]
  fn resolving_twice_changes_nothing() {
    let source = "package main\nfunc main() {\nx := 2\nreturn x * 3\n}\n";
    let mut program = parse(tokenize(source).unwrap(), source).unwrap();
    resolve(&mut program, source).unwrap();
    let offsets: Vec<_> = program.vars.iter().map(|v| v.offset).collect();
    resolve(&mut program, source).unwrap();
    let again: Vec<_> = program.vars.iter().map(|v| v.offset).collect();
    assert_eq!(offsets, again);
  }
}
