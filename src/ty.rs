use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeKind {
  /// Not resolved yet.
  None,
  Bool,
  Int8,
  Int32,
  Int64,
  String,
  Ptr,
  Array,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Type {
  pub kind: TypeKind,
  pub base: Option<Box<Type>>,
  pub len: i64,
}

impl Type {
  fn scalar(kind: TypeKind) -> Self {
    Self {
      kind,
      base: None,
      len: 1,
    }
  }

  pub fn none() -> Self {
    Self::scalar(TypeKind::None)
  }

  pub fn bool() -> Self {
    Self::scalar(TypeKind::Bool)
  }

  pub fn int8() -> Self {
    Self::scalar(TypeKind::Int8)
  }

  pub fn int32() -> Self {
    Self::scalar(TypeKind::Int32)
  }

  pub fn int64() -> Self {
    Self::scalar(TypeKind::Int64)
  }

  pub fn string() -> Self {
    Self::scalar(TypeKind::String)
  }

  pub fn pointer_to(base: Type) -> Self {
    Self {
      kind: TypeKind::Ptr,
      base: Some(Box::new(base)),
      len: 1,
    }
  }

  pub fn array_of(base: Type, len: i64) -> Self {
    Self {
      kind: TypeKind::Array,
      base: Some(Box::new(base)),
      len,
    }
  }

  /// Map a source-level type name onto its descriptor.
  pub fn from_name(name: &str) -> Option<Self> {
    match name {
      "int" | "int64" => Some(Self::int64()),
      "int32" => Some(Self::int32()),
      "int8" | "byte" => Some(Self::int8()),
      "bool" => Some(Self::bool()),
      "string" => Some(Self::string()),
      _ => None,
    }
  }

  pub fn is_resolved(&self) -> bool {
    self.kind != TypeKind::None
  }

  pub fn is_pointer(&self) -> bool {
    matches!(self.kind, TypeKind::Ptr)
  }

  pub fn is_array(&self) -> bool {
    matches!(self.kind, TypeKind::Array)
  }

  pub fn is_string(&self) -> bool {
    matches!(self.kind, TypeKind::String)
  }

  pub fn base(&self) -> Option<&Type> {
    self.base.as_deref()
  }

  /// Bytes occupied in a frame slot or in the data section.
  ///
  /// `int32` is widened to a full word so every slot stays 8-byte sized.
  /// The parser rejects array types whose size does not fit, so this only
  /// saturates for types built by hand.
  pub fn size(&self) -> i64 {
    self.checked_size().unwrap_or(i64::MAX)
  }

  /// Like `size`, but `None` when an array's size overflows `i64`.
  pub fn checked_size(&self) -> Option<i64> {
    match self.kind {
      TypeKind::None => Some(0),
      TypeKind::Bool | TypeKind::Int8 => Some(1),
      TypeKind::Int32 | TypeKind::Int64 | TypeKind::Ptr => Some(8),
      TypeKind::String => Some(16),
      TypeKind::Array => self
        .base()
        .map_or(Some(0), Type::checked_size)?
        .checked_mul(self.len),
    }
  }

  /// Number of 8-byte words a value of this type occupies on the
  /// evaluation stack. Arrays decay to their address.
  pub fn words(&self) -> usize {
    match self.kind {
      TypeKind::None => 0,
      TypeKind::String => 2,
      _ => 1,
    }
  }
}

impl fmt::Display for Type {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self.kind {
      TypeKind::None => write!(f, "none"),
      TypeKind::Bool => write!(f, "bool"),
      TypeKind::Int8 => write!(f, "int8"),
      TypeKind::Int32 => write!(f, "int32"),
      TypeKind::Int64 => write!(f, "int"),
      TypeKind::String => write!(f, "string"),
      TypeKind::Ptr => match self.base() {
        Some(base) => write!(f, "*{base}"),
        None => write!(f, "*none"),
      },
      TypeKind::Array => match self.base() {
        Some(base) => write!(f, "[{}]{base}", self.len),
        None => write!(f, "[{}]none", self.len),
      },
    }
  }
}
