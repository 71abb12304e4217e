//! Element Model - Immutable descriptions of the tree to render.
//!
//! An [`Element`] is a type plus props. Children live inside the props and are
//! normalized at construction time: strings and numbers become text elements,
//! absent children are dropped.
//!
//! ```ignore
//! use spark_fiber::{create_element, children, Props};
//!
//! let tree = create_element(
//!     "div",
//!     Props::new().with("id", "greeting"),
//!     children!["hello ", 42],
//! );
//! ```

mod props;

pub use props::*;

use std::any::{type_name, Any, TypeId};
use std::fmt;
use std::rc::Rc;

use crate::engine::Hooks;

/// Reserved type name for text elements.
pub const TEXT_ELEMENT: &str = "TEXT_ELEMENT";

// =============================================================================
// Component
// =============================================================================

type RenderFn = dyn Fn(&Props, &mut Hooks) -> Option<Element>;

/// A function component.
///
/// Identity is the Rust type of the render function, so building the same
/// component again on every render still matches the previous fiber. Plain
/// `fn` pointers all share one type; for those the address is part of the
/// identity too.
///
/// The body may return anything convertible to a [`Child`]. An empty child
/// (`None`) renders nothing.
#[derive(Clone)]
pub struct Component {
    id: TypeId,
    addr: Option<usize>,
    name: &'static str,
    render: Rc<RenderFn>,
}

impl Component {
    /// Wrap a render function. The name defaults to the function's type name.
    pub fn new<F, R>(render: F) -> Self
    where
        F: Fn(&Props, &mut Hooks) -> R + 'static,
        R: Into<Child> + 'static,
    {
        let addr = (&render as &dyn Any)
            .downcast_ref::<fn(&Props, &mut Hooks) -> R>()
            .map(|f| *f as usize);

        Self {
            id: TypeId::of::<F>(),
            addr,
            name: type_name::<F>(),
            render: Rc::new(move |props: &Props, hooks: &mut Hooks| {
                let child: Child = render(props, hooks).into();
                child.normalize()
            }),
        }
    }

    /// Wrap a render function under an explicit display name.
    pub fn named<F, R>(name: &'static str, render: F) -> Self
    where
        F: Fn(&Props, &mut Hooks) -> R + 'static,
        R: Into<Child> + 'static,
    {
        Self {
            name,
            ..Self::new(render)
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Invoke the component body.
    pub(crate) fn render(&self, props: &Props, hooks: &mut Hooks) -> Option<Element> {
        (self.render)(props, hooks)
    }
}

impl PartialEq for Component {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.addr == other.addr
    }
}

impl fmt::Debug for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Component").field(&self.name).finish()
    }
}

// =============================================================================
// Element Type
// =============================================================================

/// What an element renders as.
///
/// Text elements compare equal regardless of their value; the value itself is
/// the [`NODE_VALUE`] prop.
#[derive(Clone, Debug, PartialEq)]
pub enum ElementType {
    /// Native host node with the given tag.
    Native(Rc<str>),
    /// Function component.
    Component(Component),
    /// Text node.
    Text,
}

impl ElementType {
    /// Display name: tag, component name or [`TEXT_ELEMENT`].
    pub fn name(&self) -> &str {
        match self {
            Self::Native(tag) => tag,
            Self::Component(c) => c.name(),
            Self::Text => TEXT_ELEMENT,
        }
    }
}

impl From<&str> for ElementType {
    fn from(tag: &str) -> Self {
        Self::Native(tag.into())
    }
}

impl From<String> for ElementType {
    fn from(tag: String) -> Self {
        Self::Native(tag.into())
    }
}

impl From<Component> for ElementType {
    fn from(component: Component) -> Self {
        Self::Component(component)
    }
}

// =============================================================================
// Element
// =============================================================================

/// Immutable description node. Cheap to clone.
#[derive(Clone, Debug, PartialEq)]
pub struct Element {
    pub ty: ElementType,
    pub props: Rc<Props>,
}

impl Element {
    pub fn new(ty: impl Into<ElementType>, props: Props) -> Self {
        Self {
            ty: ty.into(),
            props: Rc::new(props),
        }
    }

    pub fn children(&self) -> &[Element] {
        self.props.children()
    }

    /// Literal value of a text element.
    pub fn text_value(&self) -> Option<&str> {
        match self.ty {
            ElementType::Text => self.props.get(NODE_VALUE).and_then(PropValue::as_str),
            _ => None,
        }
    }
}

/// A child passed to [`create_element`] before normalization.
#[derive(Clone, Debug, PartialEq)]
pub enum Child {
    Element(Element),
    Text(String),
    Empty,
}

impl Child {
    fn normalize(self) -> Option<Element> {
        match self {
            Self::Element(element) => Some(element),
            Self::Text(value) => Some(text(value)),
            Self::Empty => None,
        }
    }
}

impl From<Element> for Child {
    fn from(element: Element) -> Self {
        Self::Element(element)
    }
}

impl From<&str> for Child {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<String> for Child {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<i64> for Child {
    fn from(value: i64) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<i32> for Child {
    fn from(value: i32) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<f64> for Child {
    fn from(value: f64) -> Self {
        Self::Text(value.to_string())
    }
}

impl<T: Into<Child>> From<Option<T>> for Child {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Empty, Into::into)
    }
}

/// Build a `Vec<Child>` from heterogeneous values.
#[macro_export]
macro_rules! children {
    () => { ::std::vec::Vec::<$crate::Child>::new() };
    ($($child:expr),+ $(,)?) => {
        ::std::vec![$($crate::Child::from($child)),+]
    };
}

// =============================================================================
// Construction
// =============================================================================

/// Build an element description.
pub fn create_element(
    ty: impl Into<ElementType>,
    props: Props,
    children: impl IntoIterator<Item = Child>,
) -> Element {
    let children = children.into_iter().filter_map(Child::normalize).collect();
    Element::new(ty, props.with_children(children))
}

/// Build a text element.
pub fn text(value: impl Into<String>) -> Element {
    let value: String = value.into();
    Element::new(ElementType::Text, Props::new().with(NODE_VALUE, value))
}

/// Copy `element` with `props` overlaid on its props and its children
/// replaced by `children`.
pub fn clone_element(
    element: &Element,
    props: &Props,
    children: impl IntoIterator<Item = Child>,
) -> Element {
    let mut merged = (*element.props).clone();
    merged.merge(props);
    create_element(element.ty.clone(), merged, children)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn app(_: &Props, _: &mut Hooks) -> Element {
        create_element("div", Props::new(), children![])
    }

    fn other(_: &Props, _: &mut Hooks) -> Element {
        create_element("span", Props::new(), children![])
    }

    #[test]
    fn test_scalar_children_become_text() {
        let el = create_element("h1", Props::new(), children!["value is ", 3]);

        assert_eq!(el.children().len(), 2);
        assert_eq!(el.children()[0].ty, ElementType::Text);
        assert_eq!(el.children()[0].text_value(), Some("value is "));
        assert_eq!(el.children()[1].text_value(), Some("3"));
    }

    #[test]
    fn test_empty_children_skipped() {
        let maybe: Option<&str> = None;
        let el = create_element("ul", Props::new(), children![maybe, Some("x")]);

        assert_eq!(el.children().len(), 1);
        assert_eq!(el.children()[0].text_value(), Some("x"));
    }

    #[test]
    fn test_text_type_ignores_value() {
        assert_eq!(text("a").ty, text("b").ty);
        assert_ne!(text("a"), text("b"));
    }

    #[test]
    fn test_component_identity() {
        let a = Component::new(app);
        let b = Component::new(app);
        let c = Component::new(other);

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(ElementType::from(a), ElementType::from(b));
    }

    #[test]
    fn test_fn_pointer_identity_includes_address() {
        let routes: [fn(&Props, &mut Hooks) -> Element; 2] = [app, other];

        assert_ne!(Component::new(routes[0]), Component::new(routes[1]));
        assert_eq!(Component::new(routes[0]), Component::new(routes[0]));
        // A fn item and a pointer to it are different types.
        assert_ne!(Component::new(app), Component::new(routes[0]));
    }

    #[test]
    fn test_closure_identity_is_its_type() {
        let make = |tag: &'static str| {
            Component::new(move |_: &Props, _: &mut Hooks| {
                create_element(tag, Props::new(), children![])
            })
        };

        assert_eq!(make("a"), make("b"));
        assert_eq!(make("a").addr, None);
    }

    #[test]
    fn test_component_name() {
        assert!(Component::new(app).name().ends_with("app"));
        assert_eq!(Component::named("App", app).name(), "App");
    }

    #[test]
    fn test_clone_element_overlays_props() {
        let base = create_element(
            "button",
            Props::new().with("id", "a").with("title", "t"),
            children!["old"],
        );
        let copy = clone_element(&base, &Props::new().with("id", "b"), children!["new"]);

        assert_eq!(copy.ty, base.ty);
        assert_eq!(copy.props.get("id").and_then(PropValue::as_str), Some("b"));
        assert_eq!(copy.props.get("title").and_then(PropValue::as_str), Some("t"));
        assert_eq!(copy.children()[0].text_value(), Some("new"));
        assert_eq!(base.children()[0].text_value(), Some("old"));
    }
}
