use super::scope::{Entity, Scope};
use super::{CheckOptions, CheckerError, TypeChecker, TypeError};
use crate::cache::Importer;
use crate::discovery::INTEROP_IMPORT;
use crate::package::{is_exported, Package, SymbolKind};
use crate::span::Span;
use crate::syntax::ast::{Decl, Expr, FuncDecl, Ident, ImportSpec, Stmt};
use crate::syntax::SourceFile;
use std::ops::ControlFlow::{self, Continue};
use std::sync::Arc;
use tracing::debug;

/// Checker for Mini packages: name resolution, call arity and import use.
///
/// Mini values are untyped, so beyond names the checker only knows whether
/// something can be called and with how many arguments.
#[derive(Debug, Clone, Copy, Default)]
pub struct MiniChecker;

impl MiniChecker {
    pub fn new() -> Self {
        Self
    }
}

impl TypeChecker for MiniChecker {
    fn check(
        &self,
        package: &str,
        files: &[Arc<SourceFile>],
        importer: &dyn Importer,
        options: &CheckOptions,
        report: &mut dyn FnMut(TypeError) -> ControlFlow<()>,
    ) -> Result<(), CheckerError> {
        if files.is_empty() {
            return Err(CheckerError::NoFiles {
                package: package.to_string(),
            });
        }

        let mut checker = Checker {
            package,
            importer,
            options,
            report,
            universe: Scope::universe(),
            package_scope: Scope::new(),
        };
        if checker.run(files).is_break() {
            debug!(package, "type checking stopped by the error sink");
        }
        Ok(())
    }
}

#[derive(Debug)]
enum Imported {
    Package(Arc<Package>),
    /// The `"C"` pseudo-package: every member exists
    Fake,
    /// Resolution failed and was reported; members are not checked
    Unresolved,
}

#[derive(Debug)]
struct ImportBinding<'f> {
    spec: &'f ImportSpec,
    name: String,
    target: Imported,
    used: bool,
}

/// Per-file state: the file scope holding its imports and the block scopes
/// of the body being walked, innermost last.
struct FileState<'f> {
    file: &'f SourceFile,
    scope: Scope,
    imports: Vec<ImportBinding<'f>>,
    blocks: Vec<Scope>,
}

impl FileState<'_> {
    fn declare_local(&mut self, name: &str, entity: Entity) -> Result<(), String> {
        match self.blocks.last_mut() {
            Some(block) => block.declare(name, entity),
            None => self.scope.declare(name, entity),
        }
    }
}

/// What a call's callee turned out to be.
enum Callee {
    /// Callable with this many arguments, `None` when variadic
    Func(Option<usize>),
    NotFunc,
    /// Nothing known; already reported or not checkable
    Unknown,
}

struct Checker<'c, 'r> {
    package: &'c str,
    importer: &'c dyn Importer,
    options: &'c CheckOptions,
    report: &'c mut (dyn FnMut(TypeError) -> ControlFlow<()> + 'r),
    universe: Scope,
    package_scope: Scope,
}

impl Checker<'_, '_> {
    fn error(
        &mut self,
        file: &SourceFile,
        offset: usize,
        message: impl Into<String>,
    ) -> ControlFlow<()> {
        (self.report)(TypeError::new(file.position(offset), message))
    }

    fn run(&mut self, files: &[Arc<SourceFile>]) -> ControlFlow<()> {
        let mut accepted: Vec<&SourceFile> = Vec::with_capacity(files.len());
        for file in files {
            if file.package_name() != self.package {
                let message = format!(
                    "package {}; expected {}",
                    file.package_name(),
                    self.package
                );
                self.error(file, file.package.span.start, message)?;
                continue;
            }
            accepted.push(file.as_ref());
        }

        for &file in &accepted {
            self.collect_decls(file)?;
        }

        let mut states = Vec::with_capacity(accepted.len());
        for &file in &accepted {
            states.push(self.bind_imports(file)?);
        }

        for state in &mut states {
            self.check_bodies(state)?;
        }

        for state in &states {
            self.report_unused(state)?;
        }

        Continue(())
    }

    fn collect_decls(&mut self, file: &SourceFile) -> ControlFlow<()> {
        for decl in &file.decls {
            let entity = match decl {
                Decl::Var(_) => Entity::Var,
                Decl::Func(func) => Entity::Func {
                    params: func.params.len(),
                },
            };
            let name = decl.name();
            if let Err(message) = self.package_scope.declare(&name.name, entity) {
                self.error(file, name.span.start, message)?;
            }
        }
        Continue(())
    }

    fn bind_imports<'f>(&mut self, file: &'f SourceFile) -> ControlFlow<(), FileState<'f>> {
        let mut state = FileState {
            file,
            scope: Scope::new(),
            imports: Vec::with_capacity(file.imports.len()),
            blocks: Vec::new(),
        };

        for spec in &file.imports {
            let (name, target) = if spec.path == INTEROP_IMPORT && self.options.fake_import_c {
                (INTEROP_IMPORT.to_string(), Imported::Fake)
            } else {
                match self.importer.import(&spec.path) {
                    Ok(package) => (package.name.clone(), Imported::Package(package)),
                    Err(err) => {
                        let message = format!("could not import {} ({})", spec.path, err);
                        self.error(file, spec.span.start, message)?;
                        (spec.local_name().to_string(), Imported::Unresolved)
                    }
                }
            };

            if self.package_scope.lookup(&name).is_some() {
                self.error(
                    file,
                    spec.span.start,
                    format!("{} redeclared in this block", name),
                )?;
                continue;
            }
            let index = state.imports.len();
            if let Err(message) = state.scope.declare(&name, Entity::Package(index)) {
                self.error(file, spec.span.start, message)?;
                continue;
            }
            state.imports.push(ImportBinding {
                spec,
                name,
                target,
                used: false,
            });
        }

        Continue(state)
    }

    fn check_bodies(&mut self, state: &mut FileState<'_>) -> ControlFlow<()> {
        let file = state.file;
        for decl in &file.decls {
            match decl {
                Decl::Var(var) => self.check_expr(state, &var.value)?,
                Decl::Func(func) => self.check_func(state, func)?,
            }
        }
        Continue(())
    }

    fn check_func(&mut self, state: &mut FileState<'_>, func: &FuncDecl) -> ControlFlow<()> {
        // parameters share the scope of the body's top-level statements
        state.blocks.push(Scope::new());
        for param in &func.params {
            if let Err(message) = state.declare_local(&param.name, Entity::Var) {
                self.error(state.file, param.span.start, message)?;
            }
        }
        self.check_stmts(state, &func.body.stmts)?;
        state.blocks.pop();
        Continue(())
    }

    fn check_stmts(&mut self, state: &mut FileState<'_>, stmts: &[Stmt]) -> ControlFlow<()> {
        for stmt in stmts {
            self.check_stmt(state, stmt)?;
        }
        Continue(())
    }

    fn check_stmt(&mut self, state: &mut FileState<'_>, stmt: &Stmt) -> ControlFlow<()> {
        match stmt {
            Stmt::Var(var) => {
                // the initializer cannot see the name it initializes
                self.check_expr(state, &var.value)?;
                if let Err(message) = state.declare_local(&var.name.name, Entity::Var) {
                    self.error(state.file, var.name.span.start, message)?;
                }
            }
            Stmt::Assign { target, value } => {
                match self.use_value(state, target)? {
                    Some(Entity::Var) | None => {}
                    Some(_) => {
                        let message = format!("cannot assign to {}", target.name);
                        self.error(state.file, target.span.start, message)?;
                    }
                }
                self.check_expr(state, value)?;
            }
            Stmt::Return { value, .. } => {
                if let Some(value) = value {
                    self.check_expr(state, value)?;
                }
            }
            Stmt::Block(block) => {
                state.blocks.push(Scope::new());
                self.check_stmts(state, &block.stmts)?;
                state.blocks.pop();
            }
            Stmt::Expr(expr) => self.check_expr(state, expr)?,
        }
        Continue(())
    }

    fn check_expr(&mut self, state: &mut FileState<'_>, expr: &Expr) -> ControlFlow<()> {
        match expr {
            Expr::Ident(ident) => {
                self.use_value(state, ident)?;
            }
            Expr::Int(..) | Expr::Str(..) => {}
            Expr::Selector { base, field } => {
                self.check_selector(state, base, field)?;
            }
            Expr::Call { callee, args, span } => self.check_call(state, callee, args, *span)?,
            Expr::Unary { operand, .. } => self.check_expr(state, operand)?,
            Expr::Binary { lhs, rhs, .. } => {
                self.check_expr(state, lhs)?;
                self.check_expr(state, rhs)?;
            }
        }
        Continue(())
    }

    fn lookup(&self, state: &FileState<'_>, name: &str) -> Option<Entity> {
        state
            .blocks
            .iter()
            .rev()
            .find_map(|block| block.lookup(name))
            .or_else(|| state.scope.lookup(name))
            .or_else(|| self.package_scope.lookup(name))
            .or_else(|| self.universe.lookup(name))
    }

    fn resolve(
        &mut self,
        state: &mut FileState<'_>,
        ident: &Ident,
    ) -> ControlFlow<(), Option<Entity>> {
        match self.lookup(state, &ident.name) {
            Some(entity) => Continue(Some(entity)),
            None => {
                let message = format!("undeclared name: {}", ident.name);
                self.error(state.file, ident.span.start, message)?;
                Continue(None)
            }
        }
    }

    /// Resolve a name used as a value. A package is only valid as the base
    /// of a selector.
    fn use_value(
        &mut self,
        state: &mut FileState<'_>,
        ident: &Ident,
    ) -> ControlFlow<(), Option<Entity>> {
        match self.resolve(state, ident)? {
            Some(Entity::Package(index)) => {
                state.imports[index].used = true;
                let message = format!("use of package {} without selector", ident.name);
                self.error(state.file, ident.span.start, message)?;
                Continue(None)
            }
            other => Continue(other),
        }
    }

    fn check_selector(
        &mut self,
        state: &mut FileState<'_>,
        base: &Ident,
        field: &Ident,
    ) -> ControlFlow<(), Callee> {
        let Some(Entity::Package(index)) = self.resolve(state, base)? else {
            // members of values are not tracked
            return Continue(Callee::Unknown);
        };

        let binding = &mut state.imports[index];
        binding.used = true;
        let Imported::Package(package) = &binding.target else {
            return Continue(Callee::Unknown);
        };
        let package = Arc::clone(package);
        let local = binding.name.clone();

        if !is_exported(&field.name) {
            let message = format!("name {} not exported by package {}", field.name, local);
            self.error(state.file, field.span.start, message)?;
            return Continue(Callee::Unknown);
        }

        match package.lookup(&field.name) {
            Some(symbol) => Continue(match symbol.kind {
                SymbolKind::Func { params } => Callee::Func(Some(params)),
                SymbolKind::Var => Callee::NotFunc,
            }),
            None => {
                let message = format!("{} not declared by package {}", field.name, local);
                self.error(state.file, field.span.start, message)?;
                Continue(Callee::Unknown)
            }
        }
    }

    fn check_call(
        &mut self,
        state: &mut FileState<'_>,
        callee: &Expr,
        args: &[Expr],
        span: Span,
    ) -> ControlFlow<()> {
        let kind = match callee {
            Expr::Ident(ident) => match self.use_value(state, ident)? {
                Some(Entity::Func { params }) => Callee::Func(Some(params)),
                Some(Entity::Builtin(builtin)) => Callee::Func(builtin.arity()),
                Some(Entity::Var | Entity::Const) => Callee::NotFunc,
                Some(Entity::Package(_)) | None => Callee::Unknown,
            },
            Expr::Selector { base, field } => self.check_selector(state, base, field)?,
            Expr::Int(..) | Expr::Str(..) => Callee::NotFunc,
            other => {
                self.check_expr(state, other)?;
                Callee::Unknown
            }
        };

        for arg in args {
            self.check_expr(state, arg)?;
        }

        let file = state.file;
        match kind {
            Callee::NotFunc => {
                let message = format!("cannot call non-function {}", describe(callee));
                self.error(file, callee.span().start, message)?;
            }
            Callee::Func(Some(params)) if args.len() < params => {
                let message = format!("not enough arguments in call to {}", describe(callee));
                // at the closing parenthesis
                self.error(file, span.end.saturating_sub(1), message)?;
            }
            Callee::Func(Some(params)) if args.len() > params => {
                let message = format!("too many arguments in call to {}", describe(callee));
                self.error(file, args[params].span().start, message)?;
            }
            Callee::Func(_) | Callee::Unknown => {}
        }
        Continue(())
    }

    fn report_unused(&mut self, state: &FileState<'_>) -> ControlFlow<()> {
        for binding in &state.imports {
            if binding.used || !matches!(binding.target, Imported::Package(_)) {
                continue;
            }
            let message = format!("\"{}\" imported but not used", binding.spec.path);
            self.error(state.file, binding.spec.span.start, message)?;
        }
        Continue(())
    }
}

/// Short source-like rendering of a callee for messages.
fn describe(expr: &Expr) -> String {
    match expr {
        Expr::Ident(ident) => ident.name.clone(),
        Expr::Selector { base, field } => format!("{}.{}", base.name, field.name),
        Expr::Int(value, _) => value.to_string(),
        Expr::Str(value, _) => format!("\"{}\"", value),
        Expr::Call { callee, .. } => format!("{}(...)", describe(callee)),
        Expr::Unary { .. } | Expr::Binary { .. } => "expression".to_string(),
    }
}
