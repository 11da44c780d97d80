//! Traversal engine and contract verifiers
//!
//! Walks the statement tree depth-first in source order, classifies each
//! decorator attached to a function or class, and checks that the argument
//! names of its condition (or capture) are consistent with the decorated
//! function's signature.

use std::collections::BTreeSet;

use rustpython_parser::ast::{self, Ranged};

use crate::error::{Error, ErrorId};
use crate::infer::{self, ContractKind, DecoratorKind, Resolution, Scope};
use crate::parse::{LineIndex, ParsedModule};


/// Lint the module and return its errors in source order
pub fn lint_module(module: &ParsedModule, filename: &str) -> Vec<Error> {
    let scope = Scope::from_body(&module.body, None);
    let mut visitor = LintVisitor { filename, lines: &module.lines, errors: Vec::new() };
    visitor.visit_body(&module.body, &scope);
    visitor.errors
}

/// A decorated function, independent of whether it is `def` or `async def`
struct FuncView<'m> {
    decorators: &'m [ast::Expr],
    args: &'m ast::Arguments,
    returns: Option<&'m ast::Expr>,
    lineno: usize,
}

struct LintVisitor<'m> {
    filename: &'m str,
    lines: &'m LineIndex,
    errors: Vec<Error>,
}

impl LintVisitor<'_> {
    fn line_of(&self, node: &impl Ranged) -> usize {
        self.lines.line_of(usize::from(node.start()))
    }

    fn push(&mut self, identifier: ErrorId, description: String, lineno: usize) {
        self.errors.push(Error::new(identifier, description, self.filename, Some(lineno)));
    }

    fn visit_body(&mut self, body: &[ast::Stmt], scope: &Scope) {
        for stmt in body {
            self.visit_stmt(stmt, scope);
        }
    }

    fn visit_stmt(&mut self, stmt: &ast::Stmt, scope: &Scope) {
        match stmt {
            ast::Stmt::FunctionDef(func) => self.visit_function(
                FuncView {
                    decorators: &func.decorator_list,
                    args: &func.args,
                    returns: func.returns.as_deref(),
                    lineno: self.line_of(func),
                },
                scope,
            ),
            ast::Stmt::AsyncFunctionDef(func) => self.visit_function(
                FuncView {
                    decorators: &func.decorator_list,
                    args: &func.args,
                    returns: func.returns.as_deref(),
                    lineno: self.line_of(func),
                },
                scope,
            ),
            ast::Stmt::ClassDef(class) => self.visit_class(class, scope),
            other => self.visit_nested(other, scope),
        }
    }

    /// Propagate into statement bodies that can hold function or class
    /// definitions; such bodies share the enclosing scope.
    fn visit_nested(&mut self, stmt: &ast::Stmt, scope: &Scope) {
        match stmt {
            ast::Stmt::If(inner) => {
                self.visit_body(&inner.body, scope);
                self.visit_body(&inner.orelse, scope);
            }
            ast::Stmt::While(inner) => {
                self.visit_body(&inner.body, scope);
                self.visit_body(&inner.orelse, scope);
            }
            ast::Stmt::For(inner) => {
                self.visit_body(&inner.body, scope);
                self.visit_body(&inner.orelse, scope);
            }
            ast::Stmt::AsyncFor(inner) => {
                self.visit_body(&inner.body, scope);
                self.visit_body(&inner.orelse, scope);
            }
            ast::Stmt::With(inner) => self.visit_body(&inner.body, scope),
            ast::Stmt::AsyncWith(inner) => self.visit_body(&inner.body, scope),
            ast::Stmt::Try(inner) => {
                self.visit_body(&inner.body, scope);
                for handler in &inner.handlers {
                    let ast::ExceptHandler::ExceptHandler(handler) = handler;
                    self.visit_body(&handler.body, scope);
                }
                self.visit_body(&inner.orelse, scope);
                self.visit_body(&inner.finalbody, scope);
            }
            ast::Stmt::TryStar(inner) => {
                self.visit_body(&inner.body, scope);
                for handler in &inner.handlers {
                    let ast::ExceptHandler::ExceptHandler(handler) = handler;
                    self.visit_body(&handler.body, scope);
                }
                self.visit_body(&inner.orelse, scope);
                self.visit_body(&inner.finalbody, scope);
            }
            ast::Stmt::Match(inner) => {
                for case in &inner.cases {
                    self.visit_body(&case.body, scope);
                }
            }
            _ => {}
        }
    }

    fn visit_function(&mut self, func: FuncView, scope: &Scope) {
        // Undecorated functions need no extraction work at all.
        if func.decorators.is_empty() {
            return;
        }

        let func_args: BTreeSet<String> = infer::param_names(func.args).into_iter().collect();

        // Optimistic: only an explicit `-> None` marks the function as
        // having no result.
        let has_result = !func.returns.map_or(false, annotation_is_none);

        let mut kinds = Vec::with_capacity(func.decorators.len());
        for decorator in func.decorators {
            let kind = infer::classify_decorator(decorator, scope);
            kinds.push(kind);

            match kind {
                DecoratorKind::Contract(contract @ (ContractKind::Require | ContractKind::Ensure)) => {
                    self.verify_condition_decorator(decorator, contract, &func_args, has_result, scope);
                }
                DecoratorKind::Contract(ContractKind::Snapshot) => {
                    self.verify_snapshot_decorator(decorator, &func_args, scope);
                }
                // Invariants apply to classes, not functions.
                DecoratorKind::Contract(ContractKind::Invariant) => {}
                DecoratorKind::Ignore => {}
            }
        }

        // A snapshot is only reachable through `OLD` in a postcondition, so
        // without one it is dead weight.
        let has = |kind| kinds.contains(&DecoratorKind::Contract(kind));
        if has(ContractKind::Snapshot) && !has(ContractKind::Ensure) {
            self.push(
                ErrorId::SnapshotWoPost,
                "Snapshot defined on a function without a postcondition".to_owned(),
                func.lineno,
            );
        }
    }

    /// Verify a precondition or postcondition decorator
    fn verify_condition_decorator(
        &mut self,
        decorator: &ast::Expr,
        kind: ContractKind,
        func_args: &BTreeSet<String>,
        has_result: bool,
        scope: &Scope,
    ) {
        let lineno = self.line_of(decorator);

        let condition = match decorator {
            ast::Expr::Call(call) => condition_argument(call),
            _ => None,
        };
        let Some(condition) = condition else {
            self.push(
                ErrorId::NoCondition,
                "The contract decorator lacks the condition.".to_owned(),
                lineno,
            );
            return;
        };

        // Resolve so that conditions given by name are covered as well.
        let info = match infer::resolve_callable(condition, scope) {
            Resolution::Resolved(info) => info,
            Resolution::Unresolvable => return,
        };
        let condition_args: BTreeSet<String> = info.params.into_iter().collect();

        match kind {
            ContractKind::Require => self.verify_pre(func_args, &condition_args, lineno),
            ContractKind::Ensure => self.verify_post(func_args, has_result, &condition_args, lineno),
            ContractKind::Snapshot | ContractKind::Invariant => {}
        }
    }

    fn verify_pre(
        &mut self,
        func_args: &BTreeSet<String>,
        condition_args: &BTreeSet<String>,
        lineno: usize,
    ) {
        let diff: Vec<&str> = condition_args.difference(func_args).map(String::as_str).collect();
        if !diff.is_empty() {
            self.push(
                ErrorId::PreInvalidArg,
                format!(
                    "Precondition argument(s) are missing in the function signature: {}",
                    diff.join(", ")
                ),
                lineno,
            );
        }
    }

    /// The checks are independent; a single decorator may raise several.
    fn verify_post(
        &mut self,
        func_args: &BTreeSet<String>,
        has_result: bool,
        condition_args: &BTreeSet<String>,
        lineno: usize,
    ) {
        if func_args.contains("result") && condition_args.contains("result") {
            self.push(
                ErrorId::PostResultConflict,
                "Function argument 'result' conflicts with the postcondition.".to_owned(),
                lineno,
            );
        }

        if condition_args.contains("result") && !has_result {
            self.push(
                ErrorId::PostResultNone,
                "Function is annotated to return None, but postcondition expects a result.".to_owned(),
                lineno,
            );
        }

        if func_args.contains("OLD") && condition_args.contains("OLD") {
            self.push(
                ErrorId::PostOldConflict,
                "Function argument 'OLD' conflicts with the postcondition.".to_owned(),
                lineno,
            );
        }

        // `result` and `OLD` are supplied by the contract runtime, so the
        // postcondition may take them without the signature defining them.
        let diff: Vec<&str> = condition_args
            .difference(func_args)
            .map(String::as_str)
            .filter(|name| *name != "result" && *name != "OLD")
            .collect();
        if !diff.is_empty() {
            self.push(
                ErrorId::PostInvalidArg,
                format!(
                    "Postcondition argument(s) are missing in the function signature: {}",
                    diff.join(", ")
                ),
                lineno,
            );
        }
    }

    fn verify_snapshot_decorator(
        &mut self,
        decorator: &ast::Expr,
        func_args: &BTreeSet<String>,
        scope: &Scope,
    ) {
        let lineno = self.line_of(decorator);

        let (capture, name) = match decorator {
            ast::Expr::Call(call) => snapshot_arguments(call),
            _ => (None, None),
        };
        let Some(capture) = capture else {
            self.push(
                ErrorId::SnapshotWoCapture,
                "The snapshot decorator lacks the capture function.".to_owned(),
                lineno,
            );
            return;
        };

        let info = match infer::resolve_callable(capture, scope) {
            Resolution::Resolved(info) => info,
            Resolution::Unresolvable => return,
        };
        let capture_args: BTreeSet<String> = info.params.into_iter().collect();

        let diff: Vec<&str> = capture_args.difference(func_args).map(String::as_str).collect();
        if !diff.is_empty() {
            self.push(
                ErrorId::SnapshotInvalidArg,
                format!(
                    "Snapshot argument(s) are missing in the function signature: {}",
                    diff.join(", ")
                ),
                lineno,
            );
        }

        // A multi-argument capture has no single binding name for `OLD`
        // unless one is given explicitly.
        if capture_args.len() > 1 && name.is_none() {
            self.push(
                ErrorId::SnapshotWoName,
                "Snapshot involves multiple arguments, but its name has not been specified."
                    .to_owned(),
                lineno,
            );
        }
    }

    fn visit_class(&mut self, class: &ast::StmtClassDef, scope: &Scope) {
        for decorator in &class.decorator_list {
            self.verify_class_decorator(decorator, scope);
        }

        let class_scope = Scope::from_body(&class.body, Some(scope));
        self.visit_body(&class.body, &class_scope);
    }

    fn verify_class_decorator(&mut self, decorator: &ast::Expr, scope: &Scope) {
        // Of the contract decorators, only invariants apply to classes.
        if infer::classify_decorator(decorator, scope)
            != DecoratorKind::Contract(ContractKind::Invariant)
        {
            return;
        }

        let lineno = self.line_of(decorator);

        let condition = match decorator {
            ast::Expr::Call(call) => condition_argument(call),
            _ => None,
        };
        let Some(condition) = condition else {
            self.push(
                ErrorId::NoCondition,
                "The contract decorator lacks the condition.".to_owned(),
                lineno,
            );
            return;
        };

        let info = match infer::resolve_callable(condition, scope) {
            Resolution::Resolved(info) => info,
            Resolution::Unresolvable => return,
        };

        if info.params != ["self"] {
            let rendered: Vec<String> =
                info.params.iter().map(|param| format!("'{param}'")).collect();
            self.push(
                ErrorId::InvInvalidArg,
                format!(
                    "An invariant expects one and only argument 'self', but the arguments are: [{}]",
                    rendered.join(", ")
                ),
                lineno,
            );
        }
    }
}

/// The condition of a contract call: the first positional argument if any
/// positional arguments exist, otherwise the keyword named `condition`.
fn condition_argument(call: &ast::ExprCall) -> Option<&ast::Expr> {
    if let Some(first) = call.args.first() {
        return Some(first);
    }
    call.keywords
        .iter()
        .find(|keyword| keyword.arg.as_ref().map(ast::Identifier::as_str) == Some("condition"))
        .map(|keyword| &keyword.value)
}

/// The capture and name of a snapshot call: first and second positional
/// arguments, overridden by the `capture` and `name` keywords.
fn snapshot_arguments(call: &ast::ExprCall) -> (Option<&ast::Expr>, Option<&ast::Expr>) {
    let mut capture = call.args.first();
    let mut name = call.args.get(1);

    for keyword in &call.keywords {
        match keyword.arg.as_ref().map(ast::Identifier::as_str) {
            Some("capture") => capture = Some(&keyword.value),
            Some("name") => name = Some(&keyword.value),
            _ => {}
        }
    }

    (capture, name)
}

/// Whether a return annotation is the `None` literal
fn annotation_is_none(annotation: &ast::Expr) -> bool {
    matches!(
        annotation,
        ast::Expr::Constant(constant) if matches!(constant.value, ast::Constant::None)
    )
}
