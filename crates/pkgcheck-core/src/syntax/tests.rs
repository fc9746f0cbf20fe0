use super::ast::{Decl, Expr, Stmt};
use super::*;
use std::path::Path;

fn parse(source: &str) -> Result<SourceFile, ParseError> {
    MiniParser::new().parse_source(Path::new("/pkg/a.mini"), source, ParseMode::default())
}

fn syntax_errors(source: &str, mode: ParseMode) -> Vec<SyntaxError> {
    match MiniParser::new().parse_source(Path::new("/pkg/a.mini"), source, mode) {
        Err(ParseError::Syntax { errors, .. }) => errors,
        other => panic!("expected syntax errors, got {:?}", other),
    }
}

#[test]
fn test_parse_package_imports_and_decls() {
    let file = parse(
        "package main\n\nimport \"text/fmt\"\n\nvar limit = 10\n\nfunc main() {\n    fmt.Println(limit)\n}\n",
    )
    .unwrap();

    assert_eq!(file.package_name(), "main");
    assert_eq!(file.imports.len(), 1);
    assert_eq!(file.imports[0].path, "text/fmt");
    assert_eq!(file.decls.len(), 2);
    assert_eq!(file.decls[1].name().name, "main");
}

#[test]
fn test_parse_statements() {
    let file = parse(
        "package a\nfunc f(x, y) {\n  var z = x + y * 2\n  z = -z\n  { print(z) }\n  return z\n}\n",
    )
    .unwrap();

    let Decl::Func(func) = &file.decls[0] else {
        panic!("expected func");
    };
    assert_eq!(func.params.len(), 2);
    assert!(matches!(func.body.stmts[0], Stmt::Var(_)));
    assert!(matches!(func.body.stmts[1], Stmt::Assign { .. }));
    assert!(matches!(func.body.stmts[2], Stmt::Block(_)));
    assert!(matches!(
        func.body.stmts[3],
        Stmt::Return { value: Some(_), .. }
    ));
}

#[test]
fn test_parse_nested_calls() {
    let file = parse("package a\nvar v = f(g(1), \"s\")(2)\n").unwrap();
    let Decl::Var(var) = &file.decls[0] else {
        panic!("expected var");
    };
    let Expr::Call { callee, args, .. } = &var.value else {
        panic!("expected call");
    };
    assert_eq!(args.len(), 1);
    assert!(matches!(**callee, Expr::Call { .. }));
}

#[test]
fn test_positions_are_one_based() {
    let file = parse("package a\nvar x = 1\n").unwrap();
    let pos = file.position(file.decls[0].name().span.start);
    assert_eq!((pos.line, pos.column), (2, 5));
    assert_eq!(pos.filename, "/pkg/a.mini");
}

#[test]
fn test_unmatched_brace_reports_at_or_after_brace_line() {
    let errors = syntax_errors(
        "package a\n\nfunc f() {\n    print(1)\n",
        ParseMode::default(),
    );
    assert_eq!(errors.len(), 1);
    assert!(errors[0].position.line >= 3);
    assert_eq!(errors[0].message, "expected '}', found EOF");
}

#[test]
fn test_unclosed_body_before_next_func() {
    let errors = syntax_errors(
        "package a\nfunc f() {\n  print(1)\nfunc g() {}\n",
        ParseMode::default(),
    );
    assert_eq!(errors[0].message, "expected '}', found 'func'");
    assert_eq!(errors[0].position.line, 4);
}

#[test]
fn test_missing_package_clause() {
    let errors = syntax_errors("func f() {}", ParseMode::default());
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].message, "expected 'package', found 'func'");
}

#[test]
fn test_import_after_declaration() {
    let errors = syntax_errors(
        "package a\nvar x = 1\nimport \"b\"\n",
        ParseMode::default(),
    );
    assert_eq!(
        errors[0].message,
        "imports must appear before other declarations"
    );
}

#[test]
fn test_lex_and_parse_errors_are_merged_in_order() {
    let errors = syntax_errors(
        "package a\nvar x = @\nvar y = )\n",
        ParseMode::default(),
    );
    assert!(errors[0].message.starts_with("illegal character"));
    assert_eq!(errors[0].position.line, 2);
    assert!(errors.iter().any(|e| e.position.line == 3));
}

#[test]
fn test_error_limit_without_all_errors() {
    let mut source = String::from("package a\n");
    for _ in 0..15 {
        source.push_str("var = 1\n");
    }

    let limited = syntax_errors(&source, ParseMode::default());
    assert_eq!(limited.len(), DEFAULT_SYNTAX_ERROR_LIMIT);

    let all = syntax_errors(&source, ParseMode::all_errors(true));
    assert_eq!(all.len(), 15);
}

#[test]
fn test_one_error_per_line_without_all_errors() {
    let errors = syntax_errors("package a\nvar x = @ @ @ 1\n", ParseMode::default());
    assert_eq!(errors.len(), 1);

    let errors = syntax_errors("package a\nvar x = @ @ @ 1\n", ParseMode::all_errors(true));
    assert_eq!(errors.len(), 3);
}

#[test]
fn test_buffer_is_used_instead_of_disk() {
    // the path does not exist; only the buffer is read
    let file = MiniParser::new()
        .parse_file(
            Path::new("/definitely/missing/a.mini"),
            Some(b"package a\n".as_slice()),
            ParseMode::default(),
        )
        .unwrap();
    assert_eq!(file.package_name(), "a");
}

#[test]
fn test_missing_file_is_io_error() {
    let result = MiniParser::new().parse_file(
        Path::new("/definitely/missing/a.mini"),
        None,
        ParseMode::default(),
    );
    assert!(matches!(result, Err(ParseError::Io { .. })));
}

#[test]
fn test_invalid_utf8_is_syntax_error() {
    let result = MiniParser::new().parse_file(
        Path::new("/pkg/a.mini"),
        Some(b"package a\nvar x = \"\xff\"\n".as_slice()),
        ParseMode::default(),
    );
    let Err(ParseError::Syntax { errors, .. }) = result else {
        panic!("expected syntax error");
    };
    assert_eq!(errors[0].message, "invalid UTF-8 encoding");
    assert_eq!(errors[0].position.line, 2);
}

fn nested_parens(depth: usize) -> String {
    format!("package a\nvar x = {}1{}\n", "(".repeat(depth), ")".repeat(depth))
}

fn nesting_errors(source: &str) -> Vec<SyntaxError> {
    syntax_errors(source, ParseMode::all_errors(true))
        .into_iter()
        .filter(|e| e.message == "exceeded max nesting depth")
        .collect()
}

#[test]
fn test_moderate_nesting_parses() {
    assert!(parse(&nested_parens(MAX_NESTING_DEPTH / 2)).is_ok());
    let blocks = format!(
        "package a\nfunc f() {}{}\n",
        "{".repeat(MAX_NESTING_DEPTH / 2),
        "}".repeat(MAX_NESTING_DEPTH / 2)
    );
    assert!(parse(&blocks).is_ok());
}

#[test]
fn test_deep_parens_are_a_syntax_error() {
    for depth in [MAX_NESTING_DEPTH + 1, 1_000, 100_000] {
        let errors = nesting_errors(&nested_parens(depth));
        assert_eq!(errors.len(), 1, "depth {depth}");
        assert_eq!(errors[0].position.line, 2);
    }
}

#[test]
fn test_deep_unary_is_a_syntax_error() {
    let source = format!("package a\nvar x = {}1\n", "-".repeat(50_000));
    assert_eq!(nesting_errors(&source).len(), 1);
}

#[test]
fn test_deep_blocks_are_a_syntax_error() {
    let source = format!(
        "package a\nfunc f() {}{}\n",
        "{".repeat(50_000),
        "}".repeat(50_000)
    );
    assert!(!nesting_errors(&source).is_empty());
}

#[test]
fn test_long_call_chains_are_a_syntax_error() {
    let source = format!("package a\nvar x = f{}\n", "()".repeat(50_000));
    assert_eq!(nesting_errors(&source).len(), 1);
}

#[test]
fn test_long_operator_chains_are_a_syntax_error() {
    let source = format!("package a\nvar x = 1{}\n", "+1".repeat(50_000));
    assert_eq!(nesting_errors(&source).len(), 1);
}
