use rgoc::tokenizer::tokenize;
use rgoc::{CompileError, ErrorKind, generate_assembly, parser};

fn fail(src: &str) -> CompileError {
  match generate_assembly(src) {
    Ok(asm) => panic!("expected a compile error, got:\n{asm}"),
    Err(err) => err,
  }
}

#[test]
fn unknown_character_is_a_lex_error() {
  let err = fail("package main\nfunc main() {\n  x := 1 @ 2\n}\n");
  assert_eq!(err.kind(), ErrorKind::Lex);
  assert_eq!(err.message(), "invalid character '@'");
  assert_eq!(err.location().line, 3);
  assert_eq!(err.location().column, 10);
}

#[test]
fn missing_package_clause_is_a_parse_error() {
  let err = fail("func main() {\n}\n");
  assert_eq!(err.kind(), ErrorKind::Parse);
}

#[test]
fn redeclared_local_is_a_name_error() {
  let err = fail("package main\nfunc main() {\n  var x int; var x int\n}\n");
  assert_eq!(err.kind(), ErrorKind::Name);
  assert_eq!(err.message(), "x already declared");
}

#[test]
fn assigning_an_undeclared_name_is_a_name_error() {
  let err = fail("package main\nfunc main() {\n  total = 3\n}\n");
  assert_eq!(err.kind(), ErrorKind::Name);
  assert_eq!(err.message(), "undefined: total");
}

#[test]
fn reading_a_name_nobody_declares_fails_after_parsing() {
  let err = fail("package main\nfunc main() int {\n  return ghost\n}\n");
  assert_eq!(err.kind(), ErrorKind::Name);
  assert_eq!(err.message(), "undefined: ghost");
}

#[test]
fn mixing_operand_types_is_a_type_error() {
  let err = fail("package main\nfunc main() {\n  var c int8 = 'a'\n  x := c + 1\n}\n");
  assert_eq!(err.kind(), ErrorKind::Type);
  assert_eq!(err.message(), "mismatched types int8 and int in +");
}

#[test]
fn index_past_a_declared_array_is_a_bounds_error() {
  let err = fail("package main\nfunc main() int {\n  var a [4]int\n  return a[4]\n}\n");
  assert_eq!(err.kind(), ErrorKind::Bounds);
  assert_eq!(err.message(), "index 4 out of bounds for a (length 4)");
}

#[test]
fn index_into_untyped_base_is_not_checked_while_parsing() {
  // `b` has no type until the type pass runs, so the parser lets the
  // literal index through. Known gap, kept as observed behaviour.
  let src = "package main\nvar a [2]int\nfunc main() int {\n  b := &a\n  return b[5]\n}\n";
  let tokens = tokenize(src).unwrap();
  assert!(parser::parse(tokens, src).is_ok());
}

#[test]
fn diagnostic_points_at_the_offending_token() {
  let err = fail("package main\nfunc main() {\n  y := 1 +\n}\n");
  let rendered = err.to_string();
  assert!(rendered.starts_with("3:11: parse error: "), "{rendered}");
  assert!(rendered.ends_with("  y := 1 +\n          ^"), "{rendered}");
}

const SEVEN_WORDS: &str = "parameters of f need 7 argument registers, at most 6 are available";

#[test]
fn too_many_parameter_words_fail_even_without_a_call() {
  let err = fail(
    "package main
func f(a int, b int, c int, d int, e int, g int, h int) int {
  return a
}
func main() int {
  return 0
}
",
  );
  assert_eq!(err.kind(), ErrorKind::Type);
  assert_eq!(err.message(), SEVEN_WORDS);
  assert_eq!(err.location().line, 2);

  // A string parameter takes two registers.
  let err = fail(
    "package main
func f(a int, b int, c int, d int, e int, s string) int {
  return a
}
func main() int {
  return 0
}
",
  );
  assert_eq!(err.kind(), ErrorKind::Type);
  assert_eq!(err.message(), SEVEN_WORDS);
}

#[test]
fn six_parameter_words_still_compile() {
  let src = "package main
func f(a int, b int, c int, d int, s string) int {
  return a
}
func main() int {
  return f(1, 2, 3, 4, \"x\")
}
";
  assert!(generate_assembly(src).is_ok());
}

#[test]
fn array_too_large_for_its_size_is_rejected() {
  let err = fail("package main\nfunc main() {\n  var a [2000000000000000000]int\n}\n");
  assert_eq!(err.kind(), ErrorKind::Type);
  assert_eq!(err.message(), "array of 2000000000000000000 elements is too large");
}

#[test]
fn frame_that_overflows_is_rejected() {
  let err = fail(
    "package main
func main() {
  var a [4611686018427387904]int8
  var b [4611686018427387904]int8
}
",
  );
  assert_eq!(err.kind(), ErrorKind::Type);
  assert_eq!(err.message(), "b does not fit in the stack frame");

  let err = fail("package main\nfunc main() {\n  var a [9223372036854775800]int8\n}\n");
  assert_eq!(err.kind(), ErrorKind::Type);
  assert_eq!(err.message(), "stack frame of main is too large");
}
