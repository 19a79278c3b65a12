use crate::command::{CommandHandler, FnCommand, Outcome, Parsed, ParsedCommand};
use crate::interpreter::Interpreter;
use std::collections::{BTreeMap, HashSet};
use std::rc::Rc;

/// Where a registered command came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    Builtin,
    Custom,
}

#[derive(Clone)]
struct Entry {
    handler: Rc<dyn CommandHandler>,
    origin: Origin,
}

/// Mapping from command name to handler.
///
/// Callers fill a registry with their own commands and hand it to
/// [`Interpreter::new`], which layers it over the built-ins: a custom command with
/// a built-in's name replaces it. Names iterate in sorted order.
#[derive(Clone, Default)]
pub struct CommandRegistry {
    commands: BTreeMap<String, Entry>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `handler` to `name`, replacing any earlier binding.
    pub fn register(&mut self, name: impl Into<String>, handler: Rc<dyn CommandHandler>) {
        self.insert(name.into(), handler, Origin::Custom);
    }

    /// Bind a closure to `name`.
    pub fn register_fn<F>(&mut self, name: impl Into<String>, f: F)
    where
        F: for<'a> Fn(&'a mut Interpreter, Vec<String>) -> Outcome<'a> + 'static,
    {
        self.register(name, Rc::new(FnCommand(f)));
    }

    /// Bind an argh-parsed command under its own name.
    pub fn register_parsed<T: ParsedCommand>(&mut self) {
        self.register(T::name(), Rc::new(Parsed::<T>::default()));
    }

    pub(crate) fn register_builtin<T: ParsedCommand>(&mut self) {
        self.insert(
            T::name().to_string(),
            Rc::new(Parsed::<T>::default()),
            Origin::Builtin,
        );
    }

    fn insert(&mut self, name: String, handler: Rc<dyn CommandHandler>, origin: Origin) {
        if self.commands.contains_key(&name) {
            log::debug!("command {name} replaced");
        }
        self.commands.insert(name, Entry { handler, origin });
    }

    /// Register every entry of `other` on top of this registry.
    pub(crate) fn layer(&mut self, other: CommandRegistry) {
        for (name, entry) in other.commands {
            self.insert(name, entry.handler, entry.origin);
        }
    }

    pub fn resolve(&self, name: &str) -> Option<Rc<dyn CommandHandler>> {
        self.commands.get(name).map(|e| e.handler.clone())
    }

    pub fn origin(&self, name: &str) -> Option<Origin> {
        self.commands.get(name).map(|e| e.origin)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.commands.contains_key(name)
    }

    /// All command names, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.commands.keys().map(String::as_str)
    }

    /// Names of the commands supplied by the caller rather than built in.
    pub fn custom_names(&self) -> HashSet<String> {
        self.commands
            .iter()
            .filter(|(_, e)| e.origin == Origin::Custom)
            .map(|(name, _)| name.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

impl std::fmt::Debug for CommandRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map()
            .entries(self.commands.iter().map(|(k, e)| (k, e.origin)))
            .finish()
    }
}
