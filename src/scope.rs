use crate::errors::JsError;
use crate::value::Value;
use indexmap::IndexMap;
use std::cell::RefCell;
use std::rc::Rc;

/// Scopes are shared: closures keep their captured environment alive.
pub type ScopeRef = Rc<RefCell<Scope>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingKind {
    Let,
    Const,
    Var,
}

#[derive(Debug)]
struct Binding {
    value: Value,
    kind: BindingKind,
}

/// One lexical environment: a name table plus a parent link.
///
/// Function bodies (and the global program) open scopes flagged with
/// `is_function_scope`; plain blocks do not, which is what gives `var` its
/// function-wide hoisting behavior.
#[derive(Debug)]
pub struct Scope {
    bindings: IndexMap<String, Binding>,
    parent: Option<ScopeRef>,
    is_function_scope: bool,
}

impl Scope {
    /// Creates the root scope of a run.
    pub fn global() -> ScopeRef {
        Rc::new(RefCell::new(Scope {
            bindings: IndexMap::new(),
            parent: None,
            is_function_scope: true,
        }))
    }

    /// Opens a scope nested under `parent`.
    pub fn child(parent: &ScopeRef, is_function_scope: bool) -> ScopeRef {
        Rc::new(RefCell::new(Scope {
            bindings: IndexMap::new(),
            parent: Some(parent.clone()),
            is_function_scope,
        }))
    }

    /// Declares a binding. `let`/`const` land in the current scope; `var`
    /// rewrites upward to the nearest enclosing function scope first.
    pub fn define(scope: &ScopeRef, name: &str, value: Value, kind: BindingKind) {
        let target = match kind {
            BindingKind::Var => Self::nearest_function_scope(scope),
            _ => scope.clone(),
        };
        target
            .borrow_mut()
            .bindings
            .insert(name.to_string(), Binding { value, kind });
    }

    /// Reads a binding from the nearest scope that holds it.
    pub fn get(scope: &ScopeRef, name: &str) -> Option<Value> {
        let mut current = scope.clone();
        loop {
            if let Some(binding) = current.borrow().bindings.get(name) {
                return Some(binding.value.clone());
            }
            let parent = current.borrow().parent.clone();
            match parent {
                Some(parent) => current = parent,
                None => return None,
            }
        }
    }

    /// Reassigns an existing binding, walking the parent chain.
    pub fn set(scope: &ScopeRef, name: &str, value: Value) -> Result<(), JsError> {
        let mut current = scope.clone();
        loop {
            {
                let mut bindings = current.borrow_mut();
                if let Some(binding) = bindings.bindings.get_mut(name) {
                    if binding.kind == BindingKind::Const {
                        return Err(JsError::type_error("Assignment to constant variable."));
                    }
                    binding.value = value;
                    return Ok(());
                }
            }
            let parent = current.borrow().parent.clone();
            match parent {
                Some(parent) => current = parent,
                None => return Err(JsError::reference(format!("{name} is not defined"))),
            }
        }
    }

    pub fn has(scope: &ScopeRef, name: &str) -> bool {
        Self::get(scope, name).is_some()
    }

    fn nearest_function_scope(scope: &ScopeRef) -> ScopeRef {
        let mut current = scope.clone();
        loop {
            if current.borrow().is_function_scope {
                return current;
            }
            let parent = current.borrow().parent.clone();
            match parent {
                Some(parent) => current = parent,
                // The global scope is a function scope, so this is unreachable
                // in practice; fall back to the scope we were handed.
                None => return current,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn var_declarations_hoist_to_the_function_scope() {
        let global = Scope::global();
        let function = Scope::child(&global, true);
        let block = Scope::child(&function, false);

        Scope::define(&block, "x", Value::Number(1.0), BindingKind::Var);

        assert!(block.borrow().bindings.is_empty());
        assert!(function.borrow().bindings.contains_key("x"));
        assert!(!global.borrow().bindings.contains_key("x"));
    }

    #[test]
    fn let_declarations_stay_in_their_block() {
        let global = Scope::global();
        let block = Scope::child(&global, false);

        Scope::define(&block, "x", Value::Number(1.0), BindingKind::Let);

        assert!(block.borrow().bindings.contains_key("x"));
        assert!(Scope::get(&global, "x").is_none());
    }

    #[test]
    fn lookups_walk_the_parent_chain() {
        let global = Scope::global();
        Scope::define(&global, "x", Value::String("outer".into()), BindingKind::Let);
        let inner = Scope::child(&Scope::child(&global, true), false);

        let value = Scope::get(&inner, "x").unwrap();
        assert_eq!(value.stringify(), "outer");
    }

    #[test]
    fn assignment_to_const_is_a_type_error() {
        let global = Scope::global();
        Scope::define(&global, "x", Value::Number(1.0), BindingKind::Const);

        let error = Scope::set(&global, "x", Value::Number(2.0)).unwrap_err();
        assert_eq!(error.class, "TypeError");
    }

    #[test]
    fn assignment_to_a_missing_name_is_a_reference_error() {
        let global = Scope::global();
        let error = Scope::set(&global, "missing", Value::Null).unwrap_err();
        assert_eq!(error.class, "ReferenceError");
    }

    #[test]
    fn inner_scopes_shadow_outer_bindings() {
        let global = Scope::global();
        Scope::define(&global, "x", Value::Number(1.0), BindingKind::Let);
        let inner = Scope::child(&global, false);
        Scope::define(&inner, "x", Value::Number(2.0), BindingKind::Let);

        assert_eq!(Scope::get(&inner, "x").unwrap().to_number(), 2.0);
        assert_eq!(Scope::get(&global, "x").unwrap().to_number(), 1.0);
    }
}
