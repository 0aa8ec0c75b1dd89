//! Variable store: five disjoint namespaces.
//!
//! | Namespace | Holds | Declared by |
//! |-----------|-------|-------------|
//! | global integers | `i64` | `INT` outside a macro, `FOR` loop variables |
//! | global strings | `String` | `STRING` outside a macro |
//! | mutables | `Option<i64>` | `MUTABLE INT` anywhere |
//! | local integers | `i64` | `INT` inside a macro |
//! | local strings | `String` | `STRING` inside a macro |
//!
//! A name is unique *within* a namespace; the same name may live in several
//! namespaces at once.  The two local namespaces are shared by every macro
//! invocation in a run, so a second call that re-declares a local fails.

use std::collections::HashMap;

use crate::script::error::ScriptError;
use crate::script::value::Value;

/// Which code path a statement executes on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// Top level, conditional and loop bodies outside any macro.
    Global,
    /// Anything reached through `CALL`.
    Local,
}

/// Identifies one namespace; returned by [`VarStore::resolve_target`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    Int,
    Str,
    Mutable,
    LocalInt,
    LocalStr,
}

// ── Namespace ─────────────────────────────────────────────────────────────────

/// One name → value table.
#[derive(Debug)]
pub struct Namespace<T> {
    vars: HashMap<String, T>,
}

impl<T> Default for Namespace<T> {
    fn default() -> Self {
        Self { vars: HashMap::new() }
    }
}

impl<T> Namespace<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a new name.  Fails if the name is taken in this namespace or
    /// is not a valid variable name.
    pub fn declare(&mut self, name: &str, value: T) -> Result<(), ScriptError> {
        check_name(name)?;
        if self.vars.contains_key(name) {
            return Err(ScriptError::syntax("Expected new variable name!"));
        }
        self.vars.insert(name.to_owned(), value);
        Ok(())
    }

    /// Set a variable, creating it if needed.  Used for loop variables.
    pub fn insert(&mut self, name: impl Into<String>, value: T) {
        self.vars.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<&T> {
        self.vars.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut T> {
        self.vars.get_mut(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.vars.contains_key(name)
    }

    pub fn clear(&mut self) {
        self.vars.clear();
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }
}

/// An integer literal is never a valid variable name.
fn check_name(name: &str) -> Result<(), ScriptError> {
    if name.parse::<i64>().is_ok() || name.contains('"') {
        return Err(ScriptError::syntax("Expected valid variable name!"));
    }
    Ok(())
}

// ── VarStore ──────────────────────────────────────────────────────────────────

/// All variable namespaces of one run.
#[derive(Debug, Default)]
pub struct VarStore {
    pub ints: Namespace<i64>,
    pub strs: Namespace<String>,
    pub mutables: Namespace<Option<i64>>,
    pub local_ints: Namespace<i64>,
    pub local_strs: Namespace<String>,
}

impl VarStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty every namespace.
    pub fn clear(&mut self) {
        self.ints.clear();
        self.strs.clear();
        self.mutables.clear();
        self.local_ints.clear();
        self.local_strs.clear();
    }

    /// The namespace `INT` declares into on the given path.
    pub fn int_decls(&mut self, scope: Scope) -> &mut Namespace<i64> {
        match scope {
            Scope::Global => &mut self.ints,
            Scope::Local => &mut self.local_ints,
        }
    }

    /// The namespace `STRING` declares into on the given path.
    pub fn str_decls(&mut self, scope: Scope) -> &mut Namespace<String> {
        match scope {
            Scope::Global => &mut self.strs,
            Scope::Local => &mut self.local_strs,
        }
    }

    /// `true` if `name` is a string the classifier should treat as the target
    /// of a quoted reassignment.
    pub fn is_string(&self, scope: Scope, name: &str) -> bool {
        self.strs.contains(name) || (scope == Scope::Local && self.local_strs.contains(name))
    }

    /// Read an integer operand: local integers (local path only), then global
    /// integers, then mutables that hold a value.
    pub fn int_value(&self, scope: Scope, name: &str) -> Result<i64, ScriptError> {
        if scope == Scope::Local {
            if let Some(&n) = self.local_ints.get(name) {
                return Ok(n);
            }
        }
        if let Some(&n) = self.ints.get(name) {
            return Ok(n);
        }
        match self.mutables.get(name) {
            Some(Some(n)) => Ok(*n),
            _ => Err(ScriptError::missing_var(name)),
        }
    }

    /// Read a string operand: local strings (local path only), then global
    /// strings.
    pub fn str_value(&self, scope: Scope, name: &str) -> Result<&str, ScriptError> {
        if scope == Scope::Local {
            if let Some(s) = self.local_strs.get(name) {
                return Ok(s);
            }
        }
        self.strs
            .get(name)
            .map(String::as_str)
            .ok_or_else(|| ScriptError::missing_var(name))
    }

    /// Resolve a name for `PRINTVAR`.
    ///
    /// The global path sees global integers, strings and mutables; the local
    /// path sees the two local namespaces and nothing else.
    pub fn printable(&self, scope: Scope, name: &str) -> Result<Value, ScriptError> {
        let found = match scope {
            Scope::Global => self
                .ints
                .get(name)
                .map(|&n| Value::Int(n))
                .or_else(|| self.strs.get(name).map(|s| Value::Str(s.clone())))
                .or_else(|| self.mutables.get(name).map(|&m| Value::from(m))),
            Scope::Local => self
                .local_ints
                .get(name)
                .map(|&n| Value::Int(n))
                .or_else(|| self.local_strs.get(name).map(|s| Value::Str(s.clone()))),
        };
        found.ok_or_else(|| ScriptError::missing_var(name))
    }

    /// Find the namespace a bare-identifier reassignment writes to.
    ///
    /// Global integers, global strings and mutables are tried in that order;
    /// on the local path the local integers and strings come first.
    pub fn resolve_target(&self, scope: Scope, name: &str) -> Option<Slot> {
        if scope == Scope::Local {
            if self.local_ints.contains(name) {
                return Some(Slot::LocalInt);
            }
            if self.local_strs.contains(name) {
                return Some(Slot::LocalStr);
            }
        }
        if self.ints.contains(name) {
            Some(Slot::Int)
        } else if self.strs.contains(name) {
            Some(Slot::Str)
        } else if self.mutables.contains(name) {
            Some(Slot::Mutable)
        } else {
            None
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
