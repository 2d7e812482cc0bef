//! The set of modules required for a build.
//!
//! Traversal visits every distinct `(path, version)` pair it discovers so
//! that requirements introduced only by newer versions are never missed.
//! Collapsing each path to its highest version happens afterwards, in
//! [`BuildList::all`].

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use crate::core::version;
use crate::types::Module;

/// Thread-safe visited set over module identities.
#[derive(Debug, Default)]
pub struct BuildList {
    modules: Mutex<HashSet<Module>>,
}

impl BuildList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a module. Returns true the first time a given
    /// `(path, version)` pair is seen and false on every repeat.
    pub fn visit(&self, m: Module) -> bool {
        self.modules.lock().unwrap().insert(m)
    }

    /// One module per path, at the highest version seen, sorted by path.
    pub fn all(&self) -> Vec<Module> {
        let modules = self.modules.lock().unwrap();

        let mut latest: HashMap<&str, &Module> = HashMap::new();
        for m in modules.iter() {
            match latest.get(m.path.as_str()) {
                Some(cur) if !version::is_newer(&m.version, &cur.version) => {}
                _ => {
                    latest.insert(&m.path, m);
                }
            }
        }

        let mut list: Vec<Module> = latest.into_values().cloned().collect();
        list.sort_by(|a, b| a.path.cmp(&b.path));
        list
    }

    /// Number of distinct identities visited so far.
    pub fn len(&self) -> usize {
        self.modules.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.lock().unwrap().is_empty()
    }
}
