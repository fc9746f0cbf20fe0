//! Test fixtures - Mini source snippets for testing

/// A package file with no errors
pub fn clean_file(package: &str) -> String {
    format!(
        "package {package}\n\nfunc add(a, b) {{\n    return a + b\n}}\n\nvar total = add(1, 2)\n"
    )
}

/// A function whose body is never closed
pub fn unmatched_brace(package: &str) -> String {
    format!("package {package}\n\nfunc broken() {{\n    var x = 1\n\nvar y = 2\n")
}

/// `count` references to distinct undeclared names, one per line
pub fn undeclared_names(package: &str, count: usize) -> String {
    let mut source = format!("package {package}\n\nfunc f() {{\n");
    for i in 0..count {
        source.push_str(&format!("    print(missing{i})\n"));
    }
    source.push_str("}\n");
    source
}

/// A library package with two exported functions and one private one
pub fn fmt_library() -> &'static str {
    r#"package fmt

func Println(x) {
    print(x)
}

func Sprint(a, b) {
    return a + b
}

func helper() {}
"#
}

/// A file importing `import_path` and calling `Println` through it
pub fn importing_file(package: &str, import_path: &str) -> String {
    let local = import_path.rsplit('/').next().unwrap_or(import_path);
    format!("package {package}\n\nimport \"{import_path}\"\n\nfunc main() {{\n    {local}.Println(1)\n}}\n")
}
