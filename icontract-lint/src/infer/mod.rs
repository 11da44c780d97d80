//! Best-effort name resolution over a parsed module
//!
//! Covers the small slice of semantic inference that contract linting
//! needs: resolving a decorator expression to one of the known `icontract`
//! decorators through import aliases, and resolving a condition or capture
//! expression to the lambda or function definition it names. Anything the
//! scope cannot account for is [`Resolution::Unresolvable`]; by policy the
//! verifiers skip such decorators silently, trading false negatives for
//! zero false positives.

use std::collections::HashMap;

use rustpython_parser::ast;

/// Kinds of icontract decorators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContractKind {
    Require,
    Ensure,
    Snapshot,
    Invariant,
}

/// Classification of a decorator expression
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecoratorKind {
    Contract(ContractKind),
    /// A non-contract decorator, or one whose identity could not be resolved
    Ignore,
}

/// Known contract decorators, by qualified identity
const CONTRACT_IDENTITIES: &[(&str, ContractKind)] = &[
    ("icontract.require", ContractKind::Require),
    ("icontract.ensure", ContractKind::Ensure),
    ("icontract.snapshot", ContractKind::Snapshot),
    ("icontract.invariant", ContractKind::Invariant),
];

/// Parameter names of a resolved condition/capture callable
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallableInfo {
    pub params: Vec<String>,
}

/// Outcome of resolving an expression to a callable definition
#[derive(Debug, Clone)]
pub enum Resolution {
    Resolved(CallableInfo),
    Unresolvable,
}

/// What a name in scope is known to refer to
#[derive(Debug, Clone)]
enum Binding {
    /// `import icontract` or `import icontract as ic`
    Module(String),
    /// `from icontract import require as pre` resolves to `icontract.require`
    Qualified(String),
    /// A `def` statement or a `name = lambda ...` assignment
    Callable(CallableInfo),
}

/// Lexical scope, chained from innermost to module level
#[derive(Debug)]
pub struct Scope<'a> {
    bindings: HashMap<String, Binding>,
    parent: Option<&'a Scope<'a>>,
}

impl<'a> Scope<'a> {
    /// Collect the bindings of a statement body
    ///
    /// Compound statements such as `if` or `try` do not open a scope in
    /// Python, so their bodies contribute bindings as well; function and
    /// class bodies do not.
    pub fn from_body(body: &[ast::Stmt], parent: Option<&'a Scope<'a>>) -> Scope<'a> {
        let mut bindings = HashMap::new();
        collect_bindings(&mut bindings, body);
        Scope { bindings, parent }
    }

    fn lookup(&self, name: &str) -> Option<&Binding> {
        match self.bindings.get(name) {
            Some(binding) => Some(binding),
            None => self.parent.and_then(|parent| parent.lookup(name)),
        }
    }
}

fn collect_bindings(bindings: &mut HashMap<String, Binding>, body: &[ast::Stmt]) {
    for stmt in body {
        match stmt {
            ast::Stmt::Import(import) => {
                for alias in &import.names {
                    match &alias.asname {
                        Some(asname) => {
                            bindings.insert(
                                asname.as_str().to_owned(),
                                Binding::Module(alias.name.as_str().to_owned()),
                            );
                        }
                        None => {
                            // `import a.b` binds only `a`.
                            let first = alias
                                .name
                                .as_str()
                                .split('.')
                                .next()
                                .unwrap_or(alias.name.as_str());
                            bindings.insert(first.to_owned(), Binding::Module(first.to_owned()));
                        }
                    }
                }
            }
            ast::Stmt::ImportFrom(import) => {
                // Relative imports cannot name the icontract package.
                if import.level.as_ref().map_or(false, |level| level.to_u32() > 0) {
                    continue;
                }
                let Some(module) = &import.module else { continue };
                for alias in &import.names {
                    if alias.name.as_str() == "*" {
                        continue;
                    }
                    let bound = alias.asname.as_ref().unwrap_or(&alias.name);
                    bindings.insert(
                        bound.as_str().to_owned(),
                        Binding::Qualified(format!("{}.{}", module.as_str(), alias.name.as_str())),
                    );
                }
            }
            ast::Stmt::FunctionDef(func) => {
                bindings.insert(
                    func.name.as_str().to_owned(),
                    Binding::Callable(CallableInfo { params: param_names(&func.args) }),
                );
            }
            ast::Stmt::AsyncFunctionDef(func) => {
                bindings.insert(
                    func.name.as_str().to_owned(),
                    Binding::Callable(CallableInfo { params: param_names(&func.args) }),
                );
            }
            ast::Stmt::Assign(assign) if assign.targets.len() == 1 => {
                if let ast::Expr::Name(target) = &assign.targets[0] {
                    if let Some(binding) = value_binding(bindings, &assign.value) {
                        bindings.insert(target.id.as_str().to_owned(), binding);
                    }
                }
            }
            ast::Stmt::AnnAssign(assign) => {
                if let (ast::Expr::Name(target), Some(value)) =
                    (assign.target.as_ref(), assign.value.as_deref())
                {
                    if let Some(binding) = value_binding(bindings, value) {
                        bindings.insert(target.id.as_str().to_owned(), binding);
                    }
                }
            }
            ast::Stmt::If(inner) => {
                collect_bindings(bindings, &inner.body);
                collect_bindings(bindings, &inner.orelse);
            }
            ast::Stmt::While(inner) => {
                collect_bindings(bindings, &inner.body);
                collect_bindings(bindings, &inner.orelse);
            }
            ast::Stmt::For(inner) => {
                collect_bindings(bindings, &inner.body);
                collect_bindings(bindings, &inner.orelse);
            }
            ast::Stmt::AsyncFor(inner) => {
                collect_bindings(bindings, &inner.body);
                collect_bindings(bindings, &inner.orelse);
            }
            ast::Stmt::With(inner) => collect_bindings(bindings, &inner.body),
            ast::Stmt::AsyncWith(inner) => collect_bindings(bindings, &inner.body),
            ast::Stmt::Try(inner) => {
                collect_bindings(bindings, &inner.body);
                for handler in &inner.handlers {
                    let ast::ExceptHandler::ExceptHandler(handler) = handler;
                    collect_bindings(bindings, &handler.body);
                }
                collect_bindings(bindings, &inner.orelse);
                collect_bindings(bindings, &inner.finalbody);
            }
            ast::Stmt::TryStar(inner) => {
                collect_bindings(bindings, &inner.body);
                for handler in &inner.handlers {
                    let ast::ExceptHandler::ExceptHandler(handler) = handler;
                    collect_bindings(bindings, &handler.body);
                }
                collect_bindings(bindings, &inner.orelse);
                collect_bindings(bindings, &inner.finalbody);
            }
            ast::Stmt::Match(inner) => {
                for case in &inner.cases {
                    collect_bindings(bindings, &case.body);
                }
            }
            _ => {}
        }
    }
}

/// Binding for the right-hand side of a simple assignment, if any
///
/// Besides direct lambdas, an alias such as `check = lt_100` copies
/// whatever binding the name has collected so far, so that a contract may
/// refer to a condition through the alias.
fn value_binding(bindings: &HashMap<String, Binding>, value: &ast::Expr) -> Option<Binding> {
    match value {
        ast::Expr::Lambda(lambda) => {
            Some(Binding::Callable(CallableInfo { params: param_names(&lambda.args) }))
        }
        ast::Expr::Name(name) => bindings.get(name.id.as_str()).cloned(),
        _ => None,
    }
}

/// Classify a decorator expression
///
/// Only called decorators can be contract decorators; a bare `@require`
/// never produces a contract instance, so it classifies as ignore, exactly
/// like an unresolvable or foreign decorator.
pub fn classify_decorator(decorator: &ast::Expr, scope: &Scope) -> DecoratorKind {
    let ast::Expr::Call(call) = decorator else {
        return DecoratorKind::Ignore;
    };
    match qualified_identity(&call.func, scope) {
        Some(identity) => CONTRACT_IDENTITIES
            .iter()
            .find(|(name, _)| *name == identity)
            .map(|(_, kind)| DecoratorKind::Contract(*kind))
            .unwrap_or(DecoratorKind::Ignore),
        None => DecoratorKind::Ignore,
    }
}

/// Resolve a condition/capture expression to its callable definition
pub fn resolve_callable(expr: &ast::Expr, scope: &Scope) -> Resolution {
    match expr {
        ast::Expr::Lambda(lambda) => {
            Resolution::Resolved(CallableInfo { params: param_names(&lambda.args) })
        }
        ast::Expr::Name(name) => match scope.lookup(name.id.as_str()) {
            Some(Binding::Callable(info)) => Resolution::Resolved(info.clone()),
            _ => Resolution::Unresolvable,
        },
        _ => Resolution::Unresolvable,
    }
}

/// Qualified identity of a callee such as `require` or `ic.require`
fn qualified_identity(expr: &ast::Expr, scope: &Scope) -> Option<String> {
    let path = dotted_path(expr)?;
    let (first, rest) = path.split_first()?;
    match scope.lookup(first)? {
        Binding::Module(module) => {
            let mut identity = module.clone();
            for segment in rest {
                identity.push('.');
                identity.push_str(segment);
            }
            Some(identity)
        }
        Binding::Qualified(qualified) if rest.is_empty() => Some(qualified.clone()),
        _ => None,
    }
}

/// Segments of a pure `Name`/`Attribute` chain, left to right
fn dotted_path(expr: &ast::Expr) -> Option<Vec<&str>> {
    match expr {
        ast::Expr::Name(name) => Some(vec![name.id.as_str()]),
        ast::Expr::Attribute(attribute) => {
            let mut path = dotted_path(&attribute.value)?;
            path.push(attribute.attr.as_str());
            Some(path)
        }
        _ => None,
    }
}

/// All parameter names of a callable, across every parameter kind
pub fn param_names(args: &ast::Arguments) -> Vec<String> {
    let mut names = Vec::new();
    for arg in &args.posonlyargs {
        names.push(arg.def.arg.as_str().to_owned());
    }
    for arg in &args.args {
        names.push(arg.def.arg.as_str().to_owned());
    }
    if let Some(vararg) = &args.vararg {
        names.push(vararg.arg.as_str().to_owned());
    }
    for arg in &args.kwonlyargs {
        names.push(arg.def.arg.as_str().to_owned());
    }
    if let Some(kwarg) = &args.kwarg {
        names.push(kwarg.arg.as_str().to_owned());
    }
    names
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::parse_module;

    fn module(source: &str) -> Vec<ast::Stmt> {
        parse_module(source, "a.py").expect("source should parse").body
    }

    fn first_decorator(body: &[ast::Stmt]) -> &ast::Expr {
        for stmt in body {
            if let ast::Stmt::FunctionDef(func) = stmt {
                return &func.decorator_list[0];
            }
        }
        panic!("expected a decorated function in the module");
    }

    #[test]
    fn test_classify_from_import() {
        let body = module(
            "from icontract import require\n\n@require(lambda x: x > 0)\ndef f(x):\n    pass\n",
        );
        let scope = Scope::from_body(&body, None);
        assert_eq!(
            classify_decorator(first_decorator(&body), &scope),
            DecoratorKind::Contract(ContractKind::Require)
        );
    }

    #[test]
    fn test_classify_import_alias() {
        let body = module(
            "import icontract as ic\n\n@ic.ensure(lambda result: result > 0)\ndef f(x):\n    pass\n",
        );
        let scope = Scope::from_body(&body, None);
        assert_eq!(
            classify_decorator(first_decorator(&body), &scope),
            DecoratorKind::Contract(ContractKind::Ensure)
        );
    }

    #[test]
    fn test_classify_renamed_import() {
        let body = module(
            "from icontract import snapshot as snap\n\n@snap(lambda lst: lst[:])\ndef f(lst):\n    pass\n",
        );
        let scope = Scope::from_body(&body, None);
        assert_eq!(
            classify_decorator(first_decorator(&body), &scope),
            DecoratorKind::Contract(ContractKind::Snapshot)
        );
    }

    #[test]
    fn test_classify_foreign_decorator() {
        let body = module(
            "import functools\n\n@functools.lru_cache()\ndef f(x):\n    pass\n",
        );
        let scope = Scope::from_body(&body, None);
        assert_eq!(classify_decorator(first_decorator(&body), &scope), DecoratorKind::Ignore);
    }

    #[test]
    fn test_classify_unresolvable_decorator() {
        let body = module("@whatever(lambda x: x)\ndef f(x):\n    pass\n");
        let scope = Scope::from_body(&body, None);
        assert_eq!(classify_decorator(first_decorator(&body), &scope), DecoratorKind::Ignore);
    }

    #[test]
    fn test_classify_bare_decorator() {
        let body = module("from icontract import require\n\n@require\ndef f(x):\n    pass\n");
        let scope = Scope::from_body(&body, None);
        assert_eq!(classify_decorator(first_decorator(&body), &scope), DecoratorKind::Ignore);
    }

    #[test]
    fn test_resolve_named_function() {
        let body = module("def lt_100(x):\n    return x < 100\n");
        let scope = Scope::from_body(&body, None);
        let name = module("lt_100\n");
        let ast::Stmt::Expr(expr) = &name[0] else { panic!("expected an expression") };
        match resolve_callable(&expr.value, &scope) {
            Resolution::Resolved(info) => assert_eq!(info.params, vec!["x".to_owned()]),
            Resolution::Unresolvable => panic!("expected the function to resolve"),
        }
    }

    #[test]
    fn test_resolve_alias_of_function() {
        let body = module("def lt_100(x):\n    return x < 100\n\nalias = lt_100\n");
        let scope = Scope::from_body(&body, None);
        let name = module("alias\n");
        let ast::Stmt::Expr(expr) = &name[0] else { panic!("expected an expression") };
        match resolve_callable(&expr.value, &scope) {
            Resolution::Resolved(info) => assert_eq!(info.params, vec!["x".to_owned()]),
            Resolution::Unresolvable => panic!("expected the alias to resolve"),
        }
    }

    #[test]
    fn test_resolve_alias_chain_of_lambda() {
        let body = module("positive = lambda x: x > 0\ncheck = positive\n");
        let scope = Scope::from_body(&body, None);
        let name = module("check\n");
        let ast::Stmt::Expr(expr) = &name[0] else { panic!("expected an expression") };
        match resolve_callable(&expr.value, &scope) {
            Resolution::Resolved(info) => assert_eq!(info.params, vec!["x".to_owned()]),
            Resolution::Unresolvable => panic!("expected the alias chain to resolve"),
        }
    }

    #[test]
    fn test_resolve_unknown_name() {
        let body = module("x = 1\n");
        let scope = Scope::from_body(&body, None);
        let name = module("unknown\n");
        let ast::Stmt::Expr(expr) = &name[0] else { panic!("expected an expression") };
        assert!(matches!(resolve_callable(&expr.value, &scope), Resolution::Unresolvable));
    }

    #[test]
    fn test_binding_under_if() {
        let body = module(
            "import sys\nif sys.maxsize > 0:\n    from icontract import require\n\n@require(lambda x: x > 0)\ndef f(x):\n    pass\n",
        );
        let scope = Scope::from_body(&body, None);
        assert_eq!(
            classify_decorator(first_decorator(&body), &scope),
            DecoratorKind::Contract(ContractKind::Require)
        );
    }

    #[test]
    fn test_param_names_cover_all_kinds() {
        let body = module("def f(a, b, *args, c, **kwargs):\n    pass\n");
        let ast::Stmt::FunctionDef(func) = &body[0] else { panic!("expected a function") };
        assert_eq!(param_names(&func.args), vec!["a", "b", "args", "c", "kwargs"]);
    }
}
