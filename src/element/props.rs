//! Element properties - ordered attribute map plus children.
//!
//! Keys are kept in insertion order. Keys starting with `on` are event
//! subscriptions (`onClick` subscribes to `click`); everything else is a plain
//! attribute handed to the host as-is.

use std::fmt;
use std::rc::Rc;

use super::Element;

/// Prop key carrying the literal value of a text element.
pub const NODE_VALUE: &str = "nodeValue";

// =============================================================================
// Events
// =============================================================================

/// Event delivered to a listener by the host.
#[derive(Clone, Debug, PartialEq)]
pub struct Event {
    /// Event name without the `on` prefix, lowercased (e.g. "click").
    pub name: String,
    /// Optional payload (input value, key name, ...).
    pub value: Option<String>,
}

impl Event {
    /// Create an event without payload.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: None,
        }
    }

    /// Create an event carrying a value.
    pub fn with_value(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: Some(value.into()),
        }
    }
}

/// Event listener attached through an `on*` prop.
///
/// Two handlers are equal only when they share the same allocation, so a
/// closure recreated on every render counts as a changed handler.
#[derive(Clone)]
pub struct EventHandler(Rc<dyn Fn(&Event)>);

impl EventHandler {
    /// Wrap a closure as a handler.
    pub fn new(handler: impl Fn(&Event) + 'static) -> Self {
        Self(Rc::new(handler))
    }

    /// Invoke the handler.
    pub fn call(&self, event: &Event) {
        (self.0)(event);
    }

    /// Reference identity.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl PartialEq for EventHandler {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl fmt::Debug for EventHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EventHandler({:p})", Rc::as_ptr(&self.0).cast::<()>())
    }
}

/// Returns true if `key` names an event subscription.
pub fn is_event_key(key: &str) -> bool {
    key.len() > 2 && key.starts_with("on")
}

/// Host event name for an event key: `onClick` -> `click`.
pub fn event_name(key: &str) -> String {
    key.get(2..).unwrap_or_default().to_lowercase()
}

// =============================================================================
// Prop Value
// =============================================================================

/// A single property value.
#[derive(Clone, Debug, PartialEq)]
pub enum PropValue {
    Str(Rc<str>),
    Int(i64),
    Float(f64),
    Bool(bool),
    Handler(EventHandler),
}

impl PropValue {
    /// String contents, if this is a string value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    /// The handler, if this is an event handler value.
    pub fn as_handler(&self) -> Option<&EventHandler> {
        match self {
            Self::Handler(h) => Some(h),
            _ => None,
        }
    }
}

impl fmt::Display for PropValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Str(s) => f.write_str(s),
            Self::Int(n) => write!(f, "{n}"),
            Self::Float(n) => write!(f, "{n}"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Handler(h) => write!(f, "{h:?}"),
        }
    }
}

impl From<&str> for PropValue {
    fn from(value: &str) -> Self {
        Self::Str(value.into())
    }
}

impl From<String> for PropValue {
    fn from(value: String) -> Self {
        Self::Str(value.into())
    }
}

impl From<i64> for PropValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for PropValue {
    fn from(value: i32) -> Self {
        Self::Int(value.into())
    }
}

impl From<f64> for PropValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<bool> for PropValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<EventHandler> for PropValue {
    fn from(value: EventHandler) -> Self {
        Self::Handler(value)
    }
}

// =============================================================================
// Props
// =============================================================================

/// Ordered key/value properties plus the normalized children sequence.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Props {
    entries: Vec<(Rc<str>, PropValue)>,
    children: Vec<Element>,
}

impl Props {
    /// Empty props.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`Props::set`].
    pub fn with(mut self, key: &str, value: impl Into<PropValue>) -> Self {
        self.set(key, value);
        self
    }

    /// Builder shorthand for an event subscription.
    pub fn on(self, key: &str, handler: impl Fn(&Event) + 'static) -> Self {
        self.with(key, EventHandler::new(handler))
    }

    /// Insert or replace a value. Replacing keeps the key's original position.
    pub fn set(&mut self, key: &str, value: impl Into<PropValue>) {
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| &**k == key) {
            Some((_, slot)) => *slot = value,
            None => self.entries.push((key.into(), value)),
        }
    }

    /// Remove a key, returning its value.
    pub fn remove(&mut self, key: &str) -> Option<PropValue> {
        let pos = self.entries.iter().position(|(k, _)| &**k == key)?;
        Some(self.entries.remove(pos).1)
    }

    pub fn get(&self, key: &str) -> Option<&PropValue> {
        self.entries
            .iter()
            .find(|(k, _)| &**k == key)
            .map(|(_, v)| v)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// All entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &PropValue)> {
        self.entries.iter().map(|(k, v)| (&**k, v))
    }

    /// Plain attributes (non-event keys).
    pub fn attributes(&self) -> impl Iterator<Item = (&str, &PropValue)> {
        self.iter().filter(|(k, _)| !is_event_key(k))
    }

    /// Event subscriptions (`on*` keys).
    pub fn events(&self) -> impl Iterator<Item = (&str, &PropValue)> {
        self.iter().filter(|(k, _)| is_event_key(k))
    }

    /// Number of key/value entries (children not counted).
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn children(&self) -> &[Element] {
        &self.children
    }

    pub fn set_children(&mut self, children: Vec<Element>) {
        self.children = children;
    }

    /// Builder form of [`Props::set_children`].
    pub fn with_children(mut self, children: Vec<Element>) -> Self {
        self.children = children;
        self
    }

    /// Overlay `other` on top of `self`: keys in `other` win, children are
    /// left untouched.
    pub fn merge(&mut self, other: &Self) {
        for (key, value) in other.iter() {
            self.set(key, value.clone());
        }
    }
}
