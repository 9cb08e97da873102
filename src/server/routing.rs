//! Routing of (method, path) to canned responses and processors
//!
//! Paths are normalized by stripping one leading and one trailing `/`, so
//! `/test`, `test/` and `/test/` are the same key.

use super::RequestProcessor;
use crate::http::{Method, Response};
use std::collections::HashMap;
use std::sync::Arc;

/// Strip a single leading and a single trailing `/`
pub fn normalize_path(path: &str) -> &str {
    let path = path.strip_prefix('/').unwrap_or(path);
    path.strip_suffix('/').unwrap_or(path)
}

/// Method-keyed map of normalized path to `V`
#[derive(Debug, Clone)]
pub struct Mapping<V> {
    entries: HashMap<Method, HashMap<String, V>>,
}

impl<V> Default for Mapping<V> {
    fn default() -> Self {
        Mapping {
            entries: HashMap::new(),
        }
    }
}

impl<V> Mapping<V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `value`, returning the one it replaced
    pub fn add(&mut self, method: Method, path: &str, value: V) -> Option<V> {
        self.entries
            .entry(method)
            .or_default()
            .insert(normalize_path(path).to_string(), value)
    }

    pub fn get(&self, method: Method, path: &str) -> Option<&V> {
        self.entries.get(&method)?.get(normalize_path(path))
    }

    pub fn remove(&mut self, method: Method, path: &str) -> Option<V> {
        self.entries.get_mut(&method)?.remove(normalize_path(path))
    }

    pub fn len(&self) -> usize {
        self.entries.values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

/// Predefined responses and request processors of a server
#[derive(Default, Clone)]
pub struct RoutingTable {
    responses: Mapping<Arc<Response>>,
    processors: Mapping<Arc<dyn RequestProcessor>>,
}

impl RoutingTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_response(&mut self, method: Method, path: &str, response: Response) {
        self.responses.add(method, path, Arc::new(response));
    }

    pub fn add_processor(&mut self, method: Method, path: &str, processor: Arc<dyn RequestProcessor>) {
        self.processors.add(method, path, processor);
    }

    pub fn response(&self, method: Method, path: &str) -> Option<&Arc<Response>> {
        self.responses.get(method, path)
    }

    pub fn processor(&self, method: Method, path: &str) -> Option<&Arc<dyn RequestProcessor>> {
        self.processors.get(method, path)
    }

    pub fn responses(&self) -> &Mapping<Arc<Response>> {
        &self.responses
    }

    pub fn processors(&self) -> &Mapping<Arc<dyn RequestProcessor>> {
        &self.processors
    }

    pub fn clear(&mut self) {
        self.responses.clear();
        self.processors.clear();
    }
}

impl std::fmt::Debug for RoutingTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoutingTable")
            .field("responses", &self.responses.len())
            .field("processors", &self.processors.len())
            .finish()
    }
}
