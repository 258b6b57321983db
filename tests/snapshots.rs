use insta::assert_snapshot;
use rgoc::{compile, dump, generate_assembly};

const ADD: &str = "package main
func add(a int, b int) int {
  return a + b
}
func main() int {
  return add(2, 3)
}
";

/// Slice one function, label through `ret`, out of a listing.
fn function_listing(asm: &str, symbol: &str) -> String {
  let start = asm
    .find(&format!("\n{symbol}:\n"))
    .map(|at| at + 1)
    .unwrap();
  let rest = &asm[start..];
  let end = rest.find("    ret\n").unwrap() + "    ret".len();
  rest[..end].to_string()
}

#[test]
fn token_dump() {
  let compilation = compile("package main\nfunc main() {\n}\n").unwrap();
  assert_snapshot!(dump::tokens(&compilation.tokens), @r#"
  Punctuator "package"
  Ident      "main"
  Punctuator ";" (newline)
  Punctuator "func"
  Ident      "main"
  Punctuator "("
  Punctuator ")"
  Punctuator "{"
  Punctuator "}"
  Eof        ""
  "#);
}

#[test]
fn program_dump() {
  let compilation = compile(ADD).unwrap();
  assert_snapshot!(dump::program(&compilation.program).trim_end(), @r"
  package main
  func main() frame 0 (implicit)
    return
      call main.main : int
  func main.add(a int [rbp-8], b int [rbp-16]) frame 16
    return
      binary + : int
        var a int [rbp-8]
        var b int [rbp-16]
  func main.main() frame 0
    return
      call main.add : int
        num 2 : int
        num 3 : int
  ");
}

#[test]
fn return_constant_listing() {
  let asm = generate_assembly("package main\nfunc main() int {\n  return 42\n}\n").unwrap();
  assert_snapshot!(function_listing(&asm, "main.main"), @r"
  main.main:
      push rbp
      mov rbp, rsp
      mov rax, 42
      push rax
      pop rax
      jmp .L.return.main.main
      mov rax, 0
  .L.return.main.main:
      mov rsp, rbp
      pop rbp
      ret
  ");
}

#[test]
fn parameter_call_listing() {
  let asm = generate_assembly(ADD).unwrap();
  assert_snapshot!(function_listing(&asm, "main.add"), @r"
  main.add:
      push rbp
      mov rbp, rsp
      sub rsp, 16
      mov [rbp - 8], rdi
      mov [rbp - 16], rsi
      lea rax, [rbp - 8]
      push rax
      pop rax
      mov rax, [rax]
      push rax
      lea rax, [rbp - 16]
      push rax
      pop rax
      mov rax, [rax]
      push rax
      pop rdi
      pop rax
      add rax, rdi
      push rax
      pop rax
      jmp .L.return.main.add
      mov rax, 0
  .L.return.main.add:
      mov rsp, rbp
      pop rbp
      ret
  ");
}
