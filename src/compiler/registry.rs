//! Action registry.
//!
//! The generator only knows action *names*. The registry maps each name (and
//! any aliases) to an [`ActionSchema`]: the typed properties the action accepts,
//! which one an unlabeled value binds to, and a factory that turns the bound
//! [`Bindings`] into a ready [`BoxedAction`].
//!
//! Hosts build a registry once at startup:
//!
//! ```text
//! ActionRegistry::with_builtins(&options)?   // $trans/goto, yield, done, loop, log
//!     .register(ActionSchema::new("wait", factory).default_property("ticks", PropertyKind::Int))?
//! ```
//!
//! ## Invariants
//!
//! - Names, aliases and property names are stored lowercased; every lookup
//!   lowercases its argument, so lookups ignore ASCII case.
//! - A schema has at most one default property.
//! - Registration is all-or-nothing: a schema with one bad name registers none.

use super::convert::PropertyKind;
use crate::Value;
use crate::runtime::{BoxedAction, Context, TickResult, TransitionDestination};
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("'{name}' is not a valid action name")]
    InvalidName { name: String },
    #[error("an action named '{name}' is already registered")]
    Duplicate { name: String },
}

/// Raised by an action factory that cannot build from its bindings.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BindError {
    #[error("property '{property}' is required")]
    Missing { property: String },
    #[error("property '{property}' is not a {}", .expected.as_str())]
    WrongKind { property: String, expected: PropertyKind },
    #[error("property '{property}': {reason}")]
    Invalid { property: String, reason: String },
}

// --- Bindings ----------------------------------------------------------------

/// One bound property value.
#[derive(Debug, Clone, PartialEq)]
pub enum Binding {
    Value(Value),
    Transition(TransitionDestination),
}

/// Property values collected for one action line, keyed by the schema's
/// property name (lowercased). Binding a property twice keeps the last value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Bindings {
    entries: Vec<(String, Binding)>,
}

impl Bindings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind(&mut self, property: &str, binding: Binding) {
        let key = property.to_ascii_lowercase();
        match self.entries.iter_mut().find(|(name, _)| *name == key) {
            Some((_, slot)) => *slot = binding,
            None => self.entries.push((key, binding)),
        }
    }

    pub fn get(&self, property: &str) -> Option<&Binding> {
        let key = property.to_ascii_lowercase();
        self.entries.iter().find(|(name, _)| *name == key).map(|(_, binding)| binding)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn value(&self, property: &str, expected: PropertyKind) -> Result<Option<&Value>, BindError> {
        match self.get(property) {
            None => Ok(None),
            Some(Binding::Value(value)) => Ok(Some(value)),
            Some(Binding::Transition(_)) => Err(wrong_kind(property, expected)),
        }
    }

    fn required<'a, V>(
        &'a self,
        property: &str,
        expected: PropertyKind,
        extract: impl FnOnce(&'a Value) -> Option<V>,
    ) -> Result<V, BindError> {
        let value = self.value(property, expected)?.ok_or_else(|| missing(property))?;
        extract(value).ok_or_else(|| wrong_kind(property, expected))
    }

    fn optional<'a, V>(
        &'a self,
        property: &str,
        expected: PropertyKind,
        extract: impl FnOnce(&'a Value) -> Option<V>,
    ) -> Result<Option<V>, BindError> {
        match self.value(property, expected)? {
            None => Ok(None),
            Some(value) => extract(value).map(Some).ok_or_else(|| wrong_kind(property, expected)),
        }
    }

    pub fn int(&self, property: &str) -> Result<i64, BindError> {
        self.required(property, PropertyKind::Int, Value::as_int)
    }

    pub fn int_or(&self, property: &str, default: i64) -> Result<i64, BindError> {
        Ok(self.optional(property, PropertyKind::Int, Value::as_int)?.unwrap_or(default))
    }

    pub fn float(&self, property: &str) -> Result<f64, BindError> {
        self.required(property, PropertyKind::Float, Value::as_float)
    }

    pub fn float_or(&self, property: &str, default: f64) -> Result<f64, BindError> {
        Ok(self.optional(property, PropertyKind::Float, Value::as_float)?.unwrap_or(default))
    }

    pub fn text(&self, property: &str) -> Result<&str, BindError> {
        self.required(property, PropertyKind::Str, Value::as_str)
    }

    pub fn text_or<'a>(&'a self, property: &str, default: &'a str) -> Result<&'a str, BindError> {
        Ok(self.optional(property, PropertyKind::Str, Value::as_str)?.unwrap_or(default))
    }

    pub fn bool(&self, property: &str) -> Result<bool, BindError> {
        self.required(property, PropertyKind::Bool, Value::as_bool)
    }

    pub fn bool_or(&self, property: &str, default: bool) -> Result<bool, BindError> {
        Ok(self.optional(property, PropertyKind::Bool, Value::as_bool)?.unwrap_or(default))
    }

    pub fn transition(&self, property: &str) -> Result<TransitionDestination, BindError> {
        match self.get(property) {
            Some(Binding::Transition(destination)) => Ok(*destination),
            Some(Binding::Value(_)) => Err(wrong_kind(property, PropertyKind::Transition)),
            None => Err(missing(property)),
        }
    }
}

fn missing(property: &str) -> BindError {
    BindError::Missing { property: property.to_string() }
}

fn wrong_kind(property: &str, expected: PropertyKind) -> BindError {
    BindError::WrongKind { property: property.to_string(), expected }
}

// --- Schema ------------------------------------------------------------------

type Factory<T> = Box<dyn Fn(&Bindings) -> Result<BoxedAction<T>, BindError> + Send + Sync>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertySpec {
    pub name: String,
    pub kind: PropertyKind,
}

/// Declared shape of one action type.
pub struct ActionSchema<T> {
    name: String,
    aliases: Vec<String>,
    properties: Vec<PropertySpec>,
    default_property: Option<usize>,
    factory: Factory<T>,
}

impl<T> ActionSchema<T> {
    pub fn new<F>(name: impl Into<String>, factory: F) -> Self
    where
        F: Fn(&Bindings) -> Result<BoxedAction<T>, BindError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            aliases: Vec::new(),
            properties: Vec::new(),
            default_property: None,
            factory: Box::new(factory),
        }
    }

    /// A parameterless action: every line gets its own copy of `action`.
    pub fn from_fn<F>(name: impl Into<String>, action: F) -> Self
    where
        F: Fn(&mut Context<T>) -> TickResult + Clone + Send + Sync + 'static,
        T: 'static,
    {
        Self::new(name, move |_: &Bindings| Ok(Box::new(action.clone()) as BoxedAction<T>))
    }

    pub fn alias(mut self, name: impl Into<String>) -> Self {
        self.aliases.push(name.into());
        self
    }

    pub fn property(mut self, name: impl Into<String>, kind: PropertyKind) -> Self {
        self.push_property(name.into(), kind);
        self
    }

    /// Declare a property that unlabeled values bind to. Replaces any earlier default.
    pub fn default_property(mut self, name: impl Into<String>, kind: PropertyKind) -> Self {
        let index = self.push_property(name.into(), kind);
        self.default_property = Some(index);
        self
    }

    fn push_property(&mut self, name: String, kind: PropertyKind) -> usize {
        let name = name.to_ascii_lowercase();
        match self.properties.iter().position(|p| p.name == name) {
            Some(index) => {
                self.properties[index] = PropertySpec { name, kind };
                index
            }
            None => {
                self.properties.push(PropertySpec { name, kind });
                self.properties.len() - 1
            }
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn aliases(&self) -> &[String] {
        &self.aliases
    }

    pub fn properties(&self) -> &[PropertySpec] {
        &self.properties
    }

    /// Property lookup, ignoring ASCII case. Declared names are stored lowercased.
    pub fn find_property(&self, name: &str) -> Option<&PropertySpec> {
        let key = name.to_ascii_lowercase();
        self.properties.iter().find(|p| p.name == key)
    }

    pub fn default(&self) -> Option<&PropertySpec> {
        self.default_property.and_then(|index| self.properties.get(index))
    }

    /// Run the factory.
    pub fn build(&self, bindings: &Bindings) -> Result<BoxedAction<T>, BindError> {
        (self.factory)(bindings)
    }
}

impl<T> fmt::Debug for ActionSchema<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionSchema")
            .field("name", &self.name)
            .field("aliases", &self.aliases)
            .field("properties", &self.properties)
            .field("default", &self.default().map(|p| &p.name))
            .finish()
    }
}

// --- Registry ----------------------------------------------------------------

pub struct ActionRegistry<T> {
    schemas: Vec<ActionSchema<T>>,
    by_name: HashMap<String, usize>,
}

impl<T> ActionRegistry<T> {
    pub fn new() -> Self {
        Self { schemas: Vec::new(), by_name: HashMap::new() }
    }

    pub fn register(&mut self, schema: ActionSchema<T>) -> Result<(), RegistryError> {
        let mut keys = Vec::with_capacity(1 + schema.aliases.len());
        for name in std::iter::once(&schema.name).chain(&schema.aliases) {
            if !regex!(r"^[A-Za-z_$][A-Za-z0-9_.$-]*$").is_match(name) {
                return Err(RegistryError::InvalidName { name: name.clone() });
            }
            let key = name.to_ascii_lowercase();
            if self.by_name.contains_key(&key) || keys.contains(&key) {
                return Err(RegistryError::Duplicate { name: name.clone() });
            }
            keys.push(key);
        }

        tracing::trace!(action = %schema.name, aliases = schema.aliases.len(), "action registered");
        let index = self.schemas.len();
        self.schemas.push(schema);
        self.by_name.extend(keys.into_iter().map(|key| (key, index)));
        Ok(())
    }

    /// Look an action up by name or alias, ignoring ASCII case.
    pub fn resolve(&self, name: &str) -> Option<&ActionSchema<T>> {
        self.by_name.get(&name.to_ascii_lowercase()).and_then(|&index| self.schemas.get(index))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.resolve(name).is_some()
    }

    /// Registered schemas in registration order.
    pub fn schemas(&self) -> &[ActionSchema<T>] {
        &self.schemas
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }
}

impl<T: 'static> ActionRegistry<T> {
    /// A registry holding the built-in actions, with the transition action
    /// registered under `options.transition_action`.
    pub fn with_builtins(options: &crate::CompilerOptions) -> Result<Self, RegistryError> {
        let mut registry = Self::new();
        crate::builtin::register(&mut registry, options)?;
        Ok(registry)
    }
}

impl<T> Default for ActionRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for ActionRegistry<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.schemas.iter().map(ActionSchema::name)).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop() -> ActionSchema<()> {
        ActionSchema::from_fn("noop", |_: &mut Context| TickResult::Done)
    }

    #[test]
    fn lookup_ignores_case_and_follows_aliases() {
        let mut registry = ActionRegistry::new();
        registry.register(noop().alias("Nothing")).unwrap();

        assert_eq!(registry.resolve("NOOP").map(ActionSchema::name), Some("noop"));
        assert_eq!(registry.resolve("nothing").map(ActionSchema::name), Some("noop"));
        assert!(registry.resolve("other").is_none());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let mut registry = ActionRegistry::new();
        registry.register(noop()).unwrap();

        let err = registry.register(ActionSchema::from_fn("NoOp", |_: &mut Context| TickResult::Yield));
        assert_eq!(err, Err(RegistryError::Duplicate { name: "NoOp".into() }));
    }

    #[test]
    fn registration_is_all_or_nothing() {
        let mut registry = ActionRegistry::new();
        let err = registry.register(noop().alias("bad name"));

        assert_eq!(err, Err(RegistryError::InvalidName { name: "bad name".into() }));
        assert!(registry.resolve("noop").is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn alias_clashing_with_own_name() {
        let mut registry = ActionRegistry::new();
        assert!(matches!(registry.register(noop().alias("NOOP")), Err(RegistryError::Duplicate { .. })));
    }

    #[test]
    fn only_one_default_property() {
        let schema = noop()
            .default_property("a", PropertyKind::Int)
            .default_property("b", PropertyKind::Str)
            .property("A", PropertyKind::Float);

        assert_eq!(schema.default().map(|p| p.name.as_str()), Some("b"));
        assert_eq!(schema.properties().len(), 2);
        assert_eq!(schema.find_property("a").map(|p| p.kind), Some(PropertyKind::Float));
    }

    #[test]
    fn property_names_are_normalized() {
        let schema = noop().default_property("Target", PropertyKind::Transition).property("MaxHits", PropertyKind::Int);

        assert_eq!(schema.properties()[1].name, "maxhits");
        assert_eq!(schema.find_property("MAXHITS").map(|p| p.kind), Some(PropertyKind::Int));
        assert_eq!(schema.default().map(|p| p.name.as_str()), Some("target"));

        let mut bindings = Bindings::new();
        bindings.bind("MaxHits", Binding::Value(Value::Int(2)));
        assert_eq!(bindings.int("maxhits"), Ok(2));
        assert_eq!(bindings.int("MAXHITS"), Ok(2));
    }

    #[test]
    fn bindings_typed_access() {
        let mut bindings = Bindings::new();
        bindings.bind("ticks", Binding::Value(Value::Int(3)));
        bindings.bind("speed", Binding::Value(Value::Int(2)));
        bindings.bind("target", Binding::Transition(TransitionDestination::new(1)));
        bindings.bind("ticks", Binding::Value(Value::Int(4)));

        assert_eq!(bindings.len(), 3);
        assert_eq!(bindings.int("ticks"), Ok(4));
        assert_eq!(bindings.float("speed"), Ok(2.0));
        assert_eq!(bindings.transition("target").map(|d| d.index()), Ok(1));
        assert_eq!(bindings.int_or("missing", 9), Ok(9));
        assert_eq!(bindings.text("missing"), Err(BindError::Missing { property: "missing".into() }));
        assert!(matches!(bindings.text("ticks"), Err(BindError::WrongKind { .. })));
        assert!(matches!(bindings.int("target"), Err(BindError::WrongKind { .. })));
        assert!(matches!(bindings.transition("ticks"), Err(BindError::WrongKind { .. })));
    }

    #[test]
    fn from_fn_builds_fresh_actions() {
        let schema = ActionSchema::from_fn("count", |ctx: &mut Context<u32>| {
            ctx.data += 1;
            TickResult::Done
        });
        let action = schema.build(&Bindings::new()).unwrap();
        let mut ctx = Context::new(0);

        assert_eq!(action.tick(&mut ctx), TickResult::Done);
        assert_eq!(ctx.data, 1);
    }
}
