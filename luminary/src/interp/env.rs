//! Environment for variable bindings

use super::Value;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// Shared reference to an environment
pub type EnvRef = Rc<RefCell<Environment>>;

/// Environment holding variable bindings
#[derive(Debug, Clone)]
pub struct Environment {
    /// Variable bindings in this scope
    bindings: HashMap<String, Value>,
    /// Enclosing scope; for a call this is the caller's environment
    parent: Option<EnvRef>,
}

impl Environment {
    /// Create a new root environment
    pub fn new() -> Self {
        Environment {
            bindings: HashMap::new(),
            parent: None,
        }
    }

    /// Create a new environment with a parent
    pub fn with_parent(parent: EnvRef) -> Self {
        Environment {
            bindings: HashMap::new(),
            parent: Some(parent),
        }
    }

    /// Wrap in Rc<RefCell<>>
    pub fn into_ref(self) -> EnvRef {
        Rc::new(RefCell::new(self))
    }

    /// Define or overwrite a variable in this scope
    pub fn define(&mut self, name: impl Into<String>, value: Value) {
        self.bindings.insert(name.into(), value);
    }

    /// Remove a variable from this scope only
    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.bindings.remove(name)
    }

    /// Look up a variable in the scope chain
    ///
    /// Walks the chain iteratively: with call-site scoping a deep recursion
    /// produces an equally deep chain.
    pub fn get(&self, name: &str) -> Option<Value> {
        if let Some(value) = self.bindings.get(name) {
            return Some(value.clone());
        }
        let mut next = self.parent.clone();
        while let Some(env) = next {
            let env = env.borrow();
            if let Some(value) = env.bindings.get(name) {
                return Some(value.clone());
            }
            next = env.parent.clone();
        }
        None
    }

    /// Check if a variable exists in the scope chain
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Bindings of this scope only
    pub fn bindings(&self) -> &HashMap<String, Value> {
        &self.bindings
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}

/// Create a child environment from a parent reference
pub fn child_env(parent: &EnvRef) -> EnvRef {
    Environment::with_parent(Rc::clone(parent)).into_ref()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn num(n: f64) -> Value {
        Value::Number(n)
    }

    #[test]
    fn test_define_and_get() {
        let mut env = Environment::new();
        env.define("x", num(42.0));
        assert_eq!(env.get("x"), Some(num(42.0)));
        assert_eq!(env.get("y"), None);
    }

    #[test]
    fn test_scope_chain() {
        let parent = Environment::new().into_ref();
        parent.borrow_mut().define("x", num(1.0));

        let child = child_env(&parent);
        child.borrow_mut().define("y", num(2.0));

        // Child can see parent's bindings
        assert_eq!(child.borrow().get("x"), Some(num(1.0)));
        assert_eq!(child.borrow().get("y"), Some(num(2.0)));

        // Parent cannot see child's bindings
        assert_eq!(parent.borrow().get("y"), None);
    }

    #[test]
    fn test_shadowing() {
        let parent = Environment::new().into_ref();
        parent.borrow_mut().define("x", num(1.0));

        let child = child_env(&parent);
        child.borrow_mut().define("x", num(2.0));

        assert_eq!(child.borrow().get("x"), Some(num(2.0)));
        assert_eq!(parent.borrow().get("x"), Some(num(1.0)));
    }

    #[test]
    fn test_define_overwrites() {
        let mut env = Environment::new();
        env.define("x", num(1.0));
        env.define("x", Value::string("a"));
        assert_eq!(env.get("x"), Some(Value::string("a")));
        assert_eq!(env.bindings().len(), 1);
    }

    #[test]
    fn test_remove_is_local() {
        let parent = Environment::new().into_ref();
        parent.borrow_mut().define("i", num(1.0));
        let child = child_env(&parent);

        assert_eq!(child.borrow_mut().remove("i"), None);
        assert!(child.borrow().contains("i"));

        assert_eq!(parent.borrow_mut().remove("i"), Some(num(1.0)));
        assert!(!child.borrow().contains("i"));
    }

    #[test]
    fn test_deep_chain_lookup() {
        let root = Environment::new().into_ref();
        root.borrow_mut().define("x", num(7.0));
        let mut env = Rc::clone(&root);
        for _ in 0..1_000 {
            env = child_env(&env);
        }
        assert_eq!(env.borrow().get("x"), Some(num(7.0)));
        assert_eq!(env.borrow().get("missing"), None);
    }

    #[test]
    fn test_default() {
        let env = Environment::default();
        assert!(env.bindings().is_empty());
    }
}
