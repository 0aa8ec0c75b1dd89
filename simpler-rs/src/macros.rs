//! Macro registry.
//!
//! A macro is a named group of source lines captured between `MACRO name`
//! and `END MACRO`.  The body is stored verbatim and re-classified on every
//! `CALL`; nothing is compiled ahead of time.
//!
//! Definitions have no uniqueness guard: declaring a name again silently
//! replaces the previous body.

use std::collections::HashMap;
use std::sync::Arc;

// ── Macro ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct Macro {
    pub name: String,
    /// Body lines, terminator excluded.
    pub body: Arc<[String]>,
}

impl Macro {
    pub fn new(name: impl Into<String>, body: impl Into<Arc<[String]>>) -> Self {
        Self { name: name.into(), body: body.into() }
    }

    pub fn len(&self) -> usize {
        self.body.len()
    }

    pub fn is_empty(&self) -> bool {
        self.body.is_empty()
    }
}

// ── MacroStore ────────────────────────────────────────────────────────────────

#[derive(Debug)]
pub struct MacroStore {
    next_num: u32,
    by_name: HashMap<String, Macro>,
}

impl MacroStore {
    pub fn new() -> Self {
        Self { next_num: 1, by_name: HashMap::new() }
    }

    /// Register a macro and return its definition number, which counts every
    /// `MACRO` header seen since the last clear.
    ///
    /// Returns the replaced definition alongside, if the name was taken.
    pub fn add(&mut self, mac: Macro) -> (u32, Option<Macro>) {
        let num = self.next_num;
        self.next_num += 1;
        let old = self.by_name.insert(mac.name.clone(), mac);
        (num, old)
    }

    /// Shared handle to a macro body, so it can run while the store is
    /// borrowed mutably by the statements inside it.
    pub fn body(&self, name: &str) -> Option<Arc<[String]>> {
        self.by_name.get(name).map(|m| Arc::clone(&m.body))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }

    pub fn clear(&mut self) {
        self.by_name.clear();
        self.next_num = 1;
    }
}

impl Default for MacroStore {
    fn default() -> Self {
        Self::new()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn body(lines: &[&str]) -> Vec<String> {
        lines.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn add_and_lookup() {
        let mut store = MacroStore::new();
        let (num, old) = store.add(Macro::new("greet", body(&["PRINTSTR \"hi\" endl"])));
        assert_eq!(num, 1);
        assert!(old.is_none());
        let body = store.body("greet").unwrap();
        assert_eq!(body.len(), 1);
        assert_eq!(body[0], "PRINTSTR \"hi\" endl");
        assert!(store.body("other").is_none());
    }

    #[test]
    fn redefinition_replaces_silently() {
        let mut store = MacroStore::new();
        store.add(Macro::new("m", body(&["a ++"])));
        let (num, old) = store.add(Macro::new("m", body(&["b ++", "c ++"])));
        assert_eq!(num, 2);
        assert_eq!(old.unwrap().len(), 1);
        assert_eq!(store.len(), 1);
        assert_eq!(store.body("m").unwrap().len(), 2);
    }

    #[test]
    fn clear_resets_numbering() {
        let mut store = MacroStore::new();
        store.add(Macro::new("m", body(&[])));
        store.clear();
        assert!(store.is_empty());
        assert!(!store.contains("m"));
        assert_eq!(store.add(Macro::new("m", body(&[]))).0, 1);
    }
}
