use pretty_assertions::assert_eq;
use rgoc::ast::{ExprKind, Program, Stmt};
use rgoc::compile;

const SAMPLE: &str = "package sample

var counter int
var label = \"ready\"

func fill(n int, tag string) int {
  var grid [3]int = {n, n + 1, n + 2}
  var flag bool
  c := 'z'
  p := &grid[1]
  total := *p
  for i := 0; i < 3; i = i + 1 {
    total = total + grid[i]
  }
  if total < 0 {
    return 0
  }
  return total
}

func main() int {
  counter = fill(4, label)
  return counter
}
";

fn sample() -> Program {
  compile(SAMPLE).unwrap().program
}

#[test]
fn every_local_gets_a_slot_and_a_type() {
  let program = sample();
  for func in &program.funcs {
    let mut seen = Vec::new();
    for &id in &func.locals {
      let var = program.var(id);
      assert!(var.is_local);
      assert!(var.ty.is_resolved(), "{} has no type", var.name);
      assert!(var.offset > 0, "{} has no slot", var.name);
      assert!(var.offset <= func.stack_size);
      assert!(!seen.contains(&var.offset), "{} shares a slot", var.name);
      seen.push(var.offset);
    }
    assert_eq!(func.stack_size % 16, 0);
  }
}

#[test]
fn globals_are_typed_and_live_outside_frames() {
  let program = sample();
  assert_eq!(program.globals.len(), 2);
  for &id in &program.globals {
    let var = program.var(id);
    assert!(!var.is_local);
    assert!(var.ty.is_resolved());
    assert_eq!(var.offset, 0);
  }
  let label = program.var(program.globals[1]);
  assert_eq!(label.ty.to_string(), "string");
}

#[test]
fn array_literal_fills_consecutive_elements() {
  let program = sample();
  let fill = program
    .funcs
    .iter()
    .find(|func| func.name == "fill")
    .unwrap();
  let Stmt::Assign { lvals, rvals, .. } = &fill.body[0] else {
    panic!("expected the array initializer first");
  };
  assert_eq!(lvals.len(), 3);
  assert_eq!(rvals.len(), 3);
  for (i, lval) in lvals.iter().enumerate() {
    let ExprKind::Index { base, index } = &lval.kind else {
      panic!("expected an element store");
    };
    assert_eq!(lval.ty.size(), 8);
    assert!(base.ty.is_array());
    assert!(matches!(index.kind, ExprKind::Num(n) if n == i as i64));
  }
}

#[test]
fn frame_sizes_cover_every_local() {
  let program = sample();
  let fill = program
    .funcs
    .iter()
    .find(|func| func.name == "fill")
    .unwrap();
  let bytes: i64 = fill
    .locals
    .iter()
    .map(|&id| program.var(id).ty.size())
    .sum();
  // n 8, tag 16, grid 24, flag 1, c 1, p 8, total 8, i 8
  assert_eq!(bytes, 74);
  assert_eq!(fill.stack_size, 80);
}

#[test]
fn implicit_initializer_runs_first() {
  let program = sample();
  let init = &program.funcs[0];
  assert!(init.implicit);
  assert_eq!(program.function_symbol(init), "main");
  assert!(matches!(init.body.first(), Some(Stmt::Assign { .. })));
  assert!(matches!(init.body.last(), Some(Stmt::Return(_))));
}

/// Slice one function, label through `ret`, out of a listing.
fn listing<'a>(asm: &'a str, symbol: &str) -> &'a str {
  let start = asm.find(&format!("\n{symbol}:\n")).unwrap() + 1;
  let rest = &asm[start..];
  &rest[..rest.find("    ret\n").unwrap()]
}

#[test]
fn array_literal_stores_step_by_element_size() {
  let asm = rgoc::generate_assembly(
    "package main
func bytes() {
  var b [3]int8 = {'a', 'b', 'c'}
}
func words() {
  var w [3]int = {1, 2, 3}
}
func main() {
}
",
  )
  .unwrap();

  let bytes = listing(&asm, "main.bytes");
  assert!(!bytes.contains("imul"), "{bytes}");
  assert_eq!(bytes.matches("add rax, rdi\n").count(), 3);
  assert_eq!(bytes.matches("mov [rax], dil\n").count(), 3);

  let words = listing(&asm, "main.words");
  assert_eq!(words.matches("imul rdi, rdi, 8\n").count(), 3);
  assert_eq!(words.matches("add rax, rdi\n").count(), 3);
  assert_eq!(words.matches("mov [rax], rdi\n").count(), 3);
  for index in 0..3 {
    assert!(words.contains(&format!("mov rax, {index}\n    push rax\n    pop rdi\n")));
  }
}
