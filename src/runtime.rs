//! Hand-written routines behind `print` and `println`.
//!
//! They talk to the kernel directly through the `write` syscall, so the
//! emitted file links with nothing but the C start-up objects. Arguments
//! arrive in the integer argument registers like any other call.

/// A runtime routine the code generator can call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Routine {
  /// `rdi` = signed value.
  PrintInt,
  /// `rdi` = data pointer, `rsi` = byte length.
  PrintString,
  PrintSpace,
  PrintNewline,
}

impl Routine {
  pub fn symbol(self) -> &'static str {
    match self {
      Self::PrintInt => "__rgoc.printint",
      Self::PrintString => "__rgoc.printstring",
      Self::PrintSpace => "__rgoc.printsp",
      Self::PrintNewline => "__rgoc.printnl",
    }
  }
}

const DATA: &str = "\
.L.rgoc.nl:
    .byte 10
.L.rgoc.sp:
    .byte 32
";

const PRINT_STRING: &str = "\
__rgoc.printstring:
    push rbp
    mov rbp, rsp
    mov rdx, rsi
    mov rsi, rdi
    mov rdi, 1
    mov rax, 1
    syscall
    pop rbp
    ret
";

const PRINT_SPACE: &str = "\
__rgoc.printsp:
    push rbp
    mov rbp, rsp
    lea rsi, [rip + .L.rgoc.sp]
    mov rdx, 1
    mov rdi, 1
    mov rax, 1
    syscall
    pop rbp
    ret
";

const PRINT_NEWLINE: &str = "\
__rgoc.printnl:
    push rbp
    mov rbp, rsp
    lea rsi, [rip + .L.rgoc.nl]
    mov rdx, 1
    mov rdi, 1
    mov rax, 1
    syscall
    pop rbp
    ret
";

// Digits are written backwards from rbp-1; the magnitude is divided as
// unsigned so the most negative value still prints correctly.
const PRINT_INT: &str = "\
__rgoc.printint:
    push rbp
    mov rbp, rsp
    sub rsp, 32
    mov rax, rdi
    lea rsi, [rbp - 1]
    mov rcx, 10
    xor r8, r8
    test rax, rax
    jns .L.rgoc.printint.digits
    neg rax
    mov r8, 1
.L.rgoc.printint.digits:
    xor rdx, rdx
    div rcx
    add dl, 48
    mov [rsi], dl
    dec rsi
    test rax, rax
    jnz .L.rgoc.printint.digits
    test r8, r8
    jz .L.rgoc.printint.write
    mov byte ptr [rsi], 45
    dec rsi
.L.rgoc.printint.write:
    inc rsi
    mov rdx, rbp
    sub rdx, rsi
    mov rdi, 1
    mov rax, 1
    syscall
    mov rsp, rbp
    pop rbp
    ret
";

/// Constant bytes the routines print.
pub fn emit_data(asm: &mut String) {
  asm.push_str(DATA);
}

pub fn emit_routines(asm: &mut String) {
  for body in [PRINT_INT, PRINT_STRING, PRINT_SPACE, PRINT_NEWLINE] {
    asm.push_str(body);
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn every_routine_symbol_has_a_body() {
    let mut asm = String::new();
    emit_routines(&mut asm);
    for routine in [
      Routine::PrintInt,
      Routine::PrintString,
      Routine::PrintSpace,
      Routine::PrintNewline,
    ] {
      assert!(
        asm.contains(&format!("{}:\n", routine.symbol())),
        "missing {}",
        routine.symbol()
      );
    }
  }

  #[test]
  fn routines_return_balanced() {
    let mut asm = String::new();
    emit_routines(&mut asm);
    let pushes = asm.matches("push rbp").count();
    let pops = asm.matches("pop rbp").count();
    assert_eq!(pushes, 4);
    assert_eq!(pops, 4);
  }
}
