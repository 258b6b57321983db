//! Syntax tree shared by the parser, the type & layout pass and codegen.
//!
//! Expressions and statements are closed enums. Variables live in one arena
//! owned by the `Program`; expression nodes refer to them by `VarId`, so a
//! frame offset assigned later is visible through every reference.

use crate::ty::Type;

/// Stable handle into `Program::vars`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VarId(pub usize);

#[derive(Debug, Clone)]
pub struct Variable {
  pub name: String,
  /// Distance below the frame base; 0 until the layout pass assigns it.
  pub offset: i64,
  pub is_local: bool,
  pub ty: Type,
  pub loc: usize,
  /// Stand-in for a name that was not declared yet when it was read.
  pub placeholder: bool,
}

/// Binary operators after parsing. `>` and `>=` are rewritten into `<` and
/// `<=` with swapped operands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
  Add,
  Sub,
  Mul,
  Div,
  Eq,
  Ne,
  Lt,
  Le,
}

impl BinaryOp {
  pub fn is_comparison(self) -> bool {
    matches!(self, Self::Eq | Self::Ne | Self::Lt | Self::Le)
  }

  pub fn symbol(self) -> &'static str {
    match self {
      Self::Add => "+",
      Self::Sub => "-",
      Self::Mul => "*",
      Self::Div => "/",
      Self::Eq => "==",
      Self::Ne => "!=",
      Self::Lt => "<",
      Self::Le => "<=",
    }
  }
}

#[derive(Debug, Clone)]
pub struct Expr {
  pub kind: ExprKind,
  /// Filled once by the type & layout pass.
  pub ty: Type,
  pub loc: usize,
}

#[derive(Debug, Clone)]
pub enum ExprKind {
  Num(i64),
  /// Index into `Program::strings`.
  Str(usize),
  Var(VarId),
  Addr(Box<Expr>),
  Deref(Box<Expr>),
  Binary {
    op: BinaryOp,
    lhs: Box<Expr>,
    rhs: Box<Expr>,
  },
  Index {
    base: Box<Expr>,
    index: Box<Expr>,
  },
  Call {
    name: String,
    args: Vec<Expr>,
  },
  Empty,
}

impl Expr {
  fn new(kind: ExprKind, loc: usize) -> Self {
    Self {
      kind,
      ty: Type::none(),
      loc,
    }
  }

  pub fn number(value: i64, loc: usize) -> Self {
    Self::new(ExprKind::Num(value), loc)
  }

  /// Integer literal whose type is fixed up front (character literals and
  /// implicit zero values).
  pub fn typed_number(value: i64, ty: Type, loc: usize) -> Self {
    Self {
      ty,
      ..Self::number(value, loc)
    }
  }

  pub fn string(index: usize, loc: usize) -> Self {
    Self::new(ExprKind::Str(index), loc)
  }

  pub fn var(id: VarId, loc: usize) -> Self {
    Self::new(ExprKind::Var(id), loc)
  }

  pub fn addr(operand: Expr, loc: usize) -> Self {
    Self::new(ExprKind::Addr(Box::new(operand)), loc)
  }

  pub fn deref(operand: Expr, loc: usize) -> Self {
    Self::new(ExprKind::Deref(Box::new(operand)), loc)
  }

  pub fn binary(op: BinaryOp, lhs: Expr, rhs: Expr, loc: usize) -> Self {
    Self::new(
      ExprKind::Binary {
        op,
        lhs: Box::new(lhs),
        rhs: Box::new(rhs),
      },
      loc,
    )
  }

  pub fn index(base: Expr, index: Expr, loc: usize) -> Self {
    Self::new(
      ExprKind::Index {
        base: Box::new(base),
        index: Box::new(index),
      },
      loc,
    )
  }

  pub fn call(name: impl Into<String>, args: Vec<Expr>, loc: usize) -> Self {
    Self::new(
      ExprKind::Call {
        name: name.into(),
        args,
      },
      loc,
    )
  }

  pub fn empty(loc: usize) -> Self {
    Self::new(ExprKind::Empty, loc)
  }

  pub fn is_empty(&self) -> bool {
    matches!(self.kind, ExprKind::Empty)
  }

  /// Whether the expression denotes a storage location.
  pub fn is_lvalue(&self) -> bool {
    matches!(
      self.kind,
      ExprKind::Var(_) | ExprKind::Deref(_) | ExprKind::Index { .. }
    )
  }

  /// Variable whose storage an lvalue lives in, looking through indexing.
  pub fn root_var(&self) -> Option<VarId> {
    match &self.kind {
      ExprKind::Var(id) => Some(*id),
      ExprKind::Index { base, .. } => base.root_var(),
      _ => None,
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StdlibFunc {
  Print,
  Println,
}

impl StdlibFunc {
  pub fn from_name(name: &str) -> Option<Self> {
    match name {
      "print" => Some(Self::Print),
      "println" => Some(Self::Println),
      _ => None,
    }
  }

  pub fn name(self) -> &'static str {
    match self {
      Self::Print => "print",
      Self::Println => "println",
    }
  }
}

#[derive(Debug, Clone)]
pub enum Stmt {
  Expr(Expr),
  Return(Expr),
  Block(Vec<Stmt>),
  If {
    init: Box<Stmt>,
    cond: Expr,
    then: Box<Stmt>,
    els: Box<Stmt>,
  },
  For {
    init: Box<Stmt>,
    cond: Expr,
    post: Box<Stmt>,
    body: Box<Stmt>,
  },
  /// One or more `lvalue = rvalue` pairs evaluated as a group.
  Assign {
    lvals: Vec<Expr>,
    rvals: Vec<Expr>,
    loc: usize,
  },
  Stdlib {
    func: StdlibFunc,
    args: Vec<Expr>,
    loc: usize,
  },
  Empty,
}

impl Stmt {
  pub fn is_empty(&self) -> bool {
    matches!(self, Self::Empty)
  }
}

#[derive(Debug, Clone)]
pub struct Function {
  pub name: String,
  pub params: Vec<VarId>,
  /// Every local including the parameters, in declaration order.
  pub locals: Vec<VarId>,
  pub body: Vec<Stmt>,
  pub stack_size: i64,
  /// The generated initializer that runs global initializers and calls
  /// the user's `main`.
  pub implicit: bool,
  pub loc: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StrLiteral {
  pub label: String,
  pub bytes: Vec<u8>,
}

impl StrLiteral {
  pub fn descriptor_label(&self) -> String {
    format!("{}.desc", self.label)
  }
}

#[derive(Debug, Clone)]
pub struct Program {
  pub package: String,
  pub vars: Vec<Variable>,
  pub globals: Vec<VarId>,
  pub strings: Vec<StrLiteral>,
  pub funcs: Vec<Function>,
}

impl Program {
  pub fn var(&self, id: VarId) -> &Variable {
    &self.vars[id.0]
  }

  /// Assembly symbol for a package-level name.
  pub fn symbol(&self, name: &str) -> String {
    format!("{}.{name}", self.package)
  }

  pub fn function_symbol(&self, func: &Function) -> String {
    if func.implicit {
      "main".to_string()
    } else {
      self.symbol(&func.name)
    }
  }
}
