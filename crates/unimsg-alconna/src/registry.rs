//! Command registry.
//!
//! [`CommandRegistry`] owns the registered grammars and their enabled flags.
//! It is an ordinary value: hosts create one (or several, in tests) and hand
//! it to the services that need it. Cloning shares the underlying table.
//!
//! The table is written when commands are registered or toggled and read on
//! every dispatch; grammars themselves are shared as `Arc<Alconna>` and never
//! copied.

use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, info};
use unimsg_core::UniMessage;

use crate::alconna::Alconna;
use crate::arparma::Arparma;
use crate::error::{GrammarError, GrammarResult};

struct Entry {
    grammar: Arc<Alconna>,
    enabled: bool,
}

/// Process-wide set of command grammars, keyed by `namespace::name`.
#[derive(Clone, Default)]
pub struct CommandRegistry {
    entries: Arc<RwLock<Vec<Entry>>>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a grammar, enabled. Paths must be unique.
    pub fn register(&self, grammar: Alconna) -> GrammarResult<Arc<Alconna>> {
        let path = grammar.path();
        let mut entries = self.entries.write();
        if entries.iter().any(|e| e.grammar.path() == path) {
            return Err(GrammarError::DuplicateCommand(path));
        }
        let grammar = Arc::new(grammar);
        entries.push(Entry {
            grammar: Arc::clone(&grammar),
            enabled: true,
        });
        info!(command = %path, "command registered");
        Ok(grammar)
    }

    /// Removes a grammar; returns it if it was registered.
    pub fn unregister(&self, path: &str) -> Option<Arc<Alconna>> {
        let mut entries = self.entries.write();
        let index = entries.iter().position(|e| e.grammar.path() == path)?;
        let entry = entries.remove(index);
        info!(command = %path, "command unregistered");
        Some(entry.grammar)
    }

    /// Enables or disables a grammar; returns `false` if it is unknown.
    pub fn set_enabled(&self, path: &str, enabled: bool) -> bool {
        let mut entries = self.entries.write();
        match entries.iter_mut().find(|e| e.grammar.path() == path) {
            Some(entry) => {
                entry.enabled = enabled;
                debug!(command = %path, enabled, "command toggled");
                true
            }
            None => false,
        }
    }

    /// Unknown commands count as disabled.
    pub fn is_enabled(&self, path: &str) -> bool {
        self.entries
            .read()
            .iter()
            .any(|e| e.enabled && e.grammar.path() == path)
    }

    pub fn get(&self, path: &str) -> Option<Arc<Alconna>> {
        self.entries
            .read()
            .iter()
            .find(|e| e.grammar.path() == path)
            .map(|e| Arc::clone(&e.grammar))
    }

    /// Paths of every registered grammar, in registration order.
    pub fn paths(&self) -> Vec<String> {
        self.entries.read().iter().map(|e| e.grammar.path()).collect()
    }

    /// Usage lines of the enabled, visible grammars.
    pub fn list_usage(&self) -> Vec<String> {
        self.entries
            .read()
            .iter()
            .filter(|e| e.enabled && !e.grammar.meta().hide)
            .map(|e| e.grammar.usage())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Parses `message` with the first enabled grammar whose header matches.
    pub fn parse_any(&self, message: &UniMessage) -> Option<(Arc<Alconna>, Arparma)> {
        let candidates: Vec<Arc<Alconna>> = self
            .entries
            .read()
            .iter()
            .filter(|e| e.enabled)
            .map(|e| Arc::clone(&e.grammar))
            .collect();

        candidates.into_iter().find_map(|grammar| {
            let argv = grammar.tokenize(message);
            if !grammar.accepts(argv.tokens()) {
                return None;
            }
            let result = grammar.parse_argv(argv);
            Some((grammar, result))
        })
    }
}

impl std::fmt::Debug for CommandRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandRegistry")
            .field("commands", &self.paths())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::args::Arg;
    use crate::namespace::Namespace;
    use crate::pattern::Pattern;

    fn grammar(name: &str) -> Alconna {
        Alconna::builder(name)
            .arg(Arg::new("x", Pattern::Int))
            .build()
            .unwrap()
    }

    #[test]
    fn test_register_rejects_duplicates() {
        let registry = CommandRegistry::new();
        registry.register(grammar("a")).unwrap();
        assert_eq!(
            registry.register(grammar("a")).unwrap_err(),
            GrammarError::DuplicateCommand("default::a".into())
        );
        let other = Alconna::builder("a")
            .namespace(Namespace::new("tools"))
            .build()
            .unwrap();
        registry.register(other).unwrap();
        assert_eq!(registry.paths(), vec!["default::a", "tools::a"]);
    }

    #[test]
    fn test_parse_any_skips_disabled() {
        let registry = CommandRegistry::new();
        registry.register(grammar("a")).unwrap();
        registry.register(grammar("b")).unwrap();
        let msg = UniMessage::new().text("b 3");

        let (found, result) = registry.parse_any(&msg).unwrap();
        assert_eq!(found.name(), "b");
        assert!(result.matched);

        assert!(registry.set_enabled("default::b", false));
        assert!(!registry.is_enabled("default::b"));
        assert!(registry.parse_any(&msg).is_none());
        assert!(!registry.set_enabled("default::zzz", true));
    }

    #[test]
    fn test_unregister() {
        let registry = CommandRegistry::new();
        registry.register(grammar("a")).unwrap();
        assert!(registry.unregister("default::a").is_some());
        assert!(registry.is_empty());
        assert!(registry.get("default::a").is_none());
    }
}
