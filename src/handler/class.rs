//! Stateful Handlers
//!
//! A [`HandlerClass`] describes a handler type: how an instance is built
//! when a node matches, which methods handle what, and what is yielded
//! once the instance is done. A [`HandlerObject`] binds the methods of an
//! instance that already exists.

use super::{nothing, text_path, Dispatcher, Handler, IntoPath, IntoResults, NodeFn, Results};
use crate::error::{Error, Result, UsageError};
use crate::node::{XmlElement, XmlNode, XmlText};
use std::cell::RefCell;
use std::fmt;
use std::iter;
use std::rc::Rc;
use tracing::warn;

type Construct<H> = Rc<dyn Fn(&XmlNode) -> Result<H>>;
type Method<H, M> = Rc<dyn Fn(&mut H, XmlNode) -> Results<M>>;
type Finish<H, M, T> = Rc<dyn Fn(Rc<RefCell<H>>, Results<M>) -> Results<T>>;

enum Member<H, M> {
    Method(Vec<String>, Method<H, M>),
    Nested(Handler<M>),
}

/// Members of a handler: bound methods and nested declarations.
struct Members<H, M> {
    members: Vec<Member<H, M>>,
}

impl<H: 'static, M: 'static> Members<H, M> {
    fn new() -> Self {
        Members {
            members: Vec::new(),
        }
    }

    fn method<F, R>(&mut self, path: Vec<String>, method: F)
    where
        F: Fn(&mut H, XmlNode) -> R + 'static,
        R: IntoResults<M>,
    {
        let method: Method<H, M> =
            Rc::new(move |instance: &mut H, node: XmlNode| method(instance, node).into_results());
        self.members.push(Member::Method(path, method));
    }

    fn method_element<F, R>(&mut self, path: Vec<String>, method: F)
    where
        F: Fn(&mut H, XmlElement) -> R + 'static,
        R: IntoResults<M>,
    {
        self.method(path, move |instance: &mut H, node: XmlNode| -> Results<M> {
            match node {
                XmlNode::Element(element) => method(instance, element).into_results(),
                XmlNode::Text(_) => nothing(),
            }
        });
    }

    fn method_text<F, R>(&mut self, path: Vec<String>, method: F)
    where
        F: Fn(&mut H, XmlText) -> R + 'static,
        R: IntoResults<M>,
    {
        self.method(path, move |instance: &mut H, node: XmlNode| -> Results<M> {
            match node {
                XmlNode::Text(text) => method(instance, text).into_results(),
                XmlNode::Element(_) => nothing(),
            }
        });
    }

    /// Declarations bound to `instance`
    fn bind(&self, instance: &Rc<RefCell<H>>) -> Handler<M> {
        let handlers = self
            .members
            .iter()
            .map(|member| match member {
                Member::Method(path, method) => {
                    let instance = Rc::clone(instance);
                    let method = Rc::clone(method);
                    let leaf: NodeFn<M> = Rc::new(move |node: XmlNode| call_bound(&instance, &method, node));
                    Handler::At(path.clone(), leaf)
                }
                Member::Nested(handler) => handler.clone(),
            })
            .collect();
        Handler::Group(handlers)
    }
}

/// Run a bound method; a method running on the same instance makes it busy.
fn call_bound<H, M: 'static>(instance: &RefCell<H>, method: &Method<H, M>, node: XmlNode) -> Results<M> {
    match instance.try_borrow_mut() {
        Ok(mut instance) => method(&mut instance, node),
        Err(_) => Box::new(iter::once(Err(UsageError::HandlerBusy.into()))),
    }
}

/// Drain what the members produced, then hand the instance to `hook`.
fn drain_then<H, M, T: 'static>(
    instance: Rc<RefCell<H>>,
    results: Results<M>,
    hook: impl FnOnce(H) -> Results<T>,
) -> Results<T> {
    let mut produced = 0usize;
    for item in results {
        if let Err(e) = item {
            return Box::new(iter::once(Err(e)));
        }
        produced += 1;
    }
    if produced > 0 {
        warn!(produced, "sub-handler yielded items that no finalize hook consumed");
    }
    match Rc::try_unwrap(instance) {
        Ok(cell) => hook(cell.into_inner()),
        Err(_) => Box::new(iter::once(Err(UsageError::HandlerBusy.into()))),
    }
}

/// Description of a stateful handler type.
///
/// On each match an instance `H` is built. Its methods handle the children
/// of the matched element (or, without base paths, the matched node
/// itself) and produce `M` items. The finalize step turns the instance and
/// those items into the `T` items yielded to the caller; by default the
/// items are drained and the instance itself is yielded.
///
/// ```
/// use lazyxml::{HandlerClass, Handlers, Parser, XmlElement};
///
/// #[derive(Default)]
/// struct Cart {
///     total: u32,
/// }
///
/// let class: HandlerClass<Cart, (), u32> = HandlerClass::new(Cart::default)
///     .at("cart")
///     .method_element("item", |cart: &mut Cart, item: XmlElement| {
///         cart.total += item.attributes().get("price").and_then(|p| p.parse::<u32>().ok()).unwrap_or(0);
///     })
///     .finish(|cart: Cart| Some(cart.total));
///
/// let parser = Parser::new(b"<cart><item price='3'/><item price='4'/></cart>");
/// assert_eq!(parser.return_from(Handlers::new().class(class)).unwrap(), Some(7));
/// ```
pub struct HandlerClass<H, M, T = H> {
    construct: Construct<H>,
    paths: Vec<Vec<String>>,
    members: Members<H, M>,
    finish: Finish<H, M, T>,
}

impl<H: 'static, M: 'static> HandlerClass<H, M, H> {
    fn with_constructor(construct: Construct<H>) -> Self {
        let finish: Finish<H, M, H> = Rc::new(|instance: Rc<RefCell<H>>, results: Results<M>| {
            drain_then(instance, results, |instance| Box::new(iter::once(Ok(instance))))
        });
        HandlerClass {
            construct,
            paths: Vec::new(),
            members: Members::new(),
            finish,
        }
    }

    /// Instances built without looking at the node.
    pub fn new(construct: impl Fn() -> H + 'static) -> Self {
        Self::with_constructor(Rc::new(move |_: &XmlNode| -> Result<H> { Ok(construct()) }))
    }

    /// Instances built from the matched node.
    pub fn with_node(construct: impl Fn(&XmlNode) -> H + 'static) -> Self {
        Self::with_constructor(Rc::new(move |node: &XmlNode| -> Result<H> { Ok(construct(node)) }))
    }

    /// Instances built from the matched node, failures reported as output.
    pub fn try_with_node<E>(construct: impl Fn(&XmlNode) -> Result<H, E> + 'static) -> Self
    where
        E: Into<Error>,
    {
        Self::with_constructor(Rc::new(move |node: &XmlNode| -> Result<H> { construct(node).map_err(Into::into) }))
    }
}

impl<H: 'static, M: 'static, T: 'static> HandlerClass<H, M, T> {
    /// Base path at which instances are built. May be repeated.
    pub fn at(mut self, path: impl IntoPath) -> Self {
        self.paths.push(path.into_path());
        self
    }

    /// Build instances for the text inside the elements at `path`.
    pub fn at_text(mut self, path: impl IntoPath) -> Self {
        self.paths.push(text_path(path));
        self
    }

    /// Method called with the nodes at `path`, relative to the instance.
    pub fn method<F, R>(mut self, path: impl IntoPath, method: F) -> Self
    where
        F: Fn(&mut H, XmlNode) -> R + 'static,
        R: IntoResults<M>,
    {
        self.members.method(path.into_path(), method);
        self
    }

    /// Method called with the elements at `path`.
    pub fn method_element<F, R>(mut self, path: impl IntoPath, method: F) -> Self
    where
        F: Fn(&mut H, XmlElement) -> R + 'static,
        R: IntoResults<M>,
    {
        self.members.method_element(path.into_path(), method);
        self
    }

    /// Method called with the text inside the elements at `path`.
    pub fn method_text<F, R>(mut self, path: impl IntoPath, method: F) -> Self
    where
        F: Fn(&mut H, XmlText) -> R + 'static,
        R: IntoResults<M>,
    {
        self.members.method_text(text_path(path), method);
        self
    }

    /// Declarations that run next to the methods, without the instance.
    pub fn nest(mut self, handler: impl Into<Handler<M>>) -> Self {
        self.members.members.push(Member::Nested(handler.into()));
        self
    }

    /// Finalize hook taking the instance once the members are done.
    ///
    /// Items produced by the members are discarded, with a warning.
    pub fn finish<U, F, R>(self, hook: F) -> HandlerClass<H, M, U>
    where
        U: 'static,
        F: Fn(H) -> R + 'static,
        R: IntoResults<U>,
    {
        let finish: Finish<H, M, U> = Rc::new(move |instance: Rc<RefCell<H>>, results: Results<M>| {
            drain_then(instance, results, |instance| hook(instance).into_results())
        });
        HandlerClass {
            construct: self.construct,
            paths: self.paths,
            members: self.members,
            finish,
        }
    }

    /// Finalize hook taking the shared instance and the lazy member items.
    ///
    /// The hook decides what is yielded; the instance may be read once the
    /// items have been consumed.
    pub fn finish_with<U, F, R>(self, hook: F) -> HandlerClass<H, M, U>
    where
        U: 'static,
        F: Fn(Rc<RefCell<H>>, Results<M>) -> R + 'static,
        R: IntoResults<U>,
    {
        let finish: Finish<H, M, U> = Rc::new(move |instance: Rc<RefCell<H>>, results: Results<M>| {
            hook(instance, results).into_results()
        });
        HandlerClass {
            construct: self.construct,
            paths: self.paths,
            members: self.members,
            finish,
        }
    }

    /// Handle one matched node.
    fn run(&self, node: XmlNode, over_children: bool) -> Results<T> {
        let instance = match (self.construct)(&node) {
            Ok(instance) => Rc::new(RefCell::new(instance)),
            Err(e) => return Box::new(iter::once(Err(e))),
        };
        let dispatcher = match self.members.bind(&instance).compile() {
            Ok(dispatcher) => Rc::new(dispatcher),
            Err(e) => return Box::new(iter::once(Err(e))),
        };
        let results = run_members(dispatcher, node, over_children);
        (self.finish)(instance, results)
    }
}

/// Member output for `node`: over its children when the handler sits at a
/// base path, over the node itself otherwise.
fn run_members<M: 'static>(dispatcher: Rc<Dispatcher<M>>, node: XmlNode, over_children: bool) -> Results<M> {
    if !over_children {
        return dispatcher.dispatch(node);
    }
    match node {
        XmlNode::Element(element) => Box::new(element.iter_with(dispatcher)),
        XmlNode::Text(_) => nothing(),
    }
}

impl<H: 'static, M: 'static, T: 'static> From<HandlerClass<H, M, T>> for Handler<T> {
    fn from(mut class: HandlerClass<H, M, T>) -> Self {
        let paths = std::mem::take(&mut class.paths);
        let over_children = !paths.is_empty();
        let class = Rc::new(class);
        let leaf: NodeFn<T> = Rc::new(move |node: XmlNode| -> Results<T> {
            let class = Rc::clone(&class);
            Box::new(iter::once_with(move || class.run(node, over_children)).flatten())
        });
        if paths.is_empty() {
            return Handler::Catchall(leaf);
        }
        Handler::Group(
            paths
                .into_iter()
                .map(|path| Handler::At(path, Rc::clone(&leaf)))
                .collect(),
        )
    }
}

impl<H, M, T> fmt::Debug for HandlerClass<H, M, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerClass")
            .field("paths", &self.paths)
            .field("members", &self.members.members.len())
            .finish_non_exhaustive()
    }
}

/// Handler type described once, registered with
/// [`Handlers::handler_type`](super::Handlers::handler_type).
pub trait XmlHandler: Sized + 'static {
    /// Items produced by the methods
    type Item: 'static;
    /// Items yielded to the caller
    type Output: 'static;

    fn describe() -> HandlerClass<Self, Self::Item, Self::Output>;
}

/// Methods bound to an existing instance.
///
/// There is no lifecycle: the instance is shared, and whatever the methods
/// produce is yielded as is. With base paths, method paths are relative to
/// them.
pub struct HandlerObject<H, T> {
    instance: Rc<RefCell<H>>,
    paths: Vec<Vec<String>>,
    members: Members<H, T>,
}

impl<H: 'static, T: 'static> HandlerObject<H, T> {
    pub fn new(instance: H) -> Self {
        Self::shared(Rc::new(RefCell::new(instance)))
    }

    /// Bind an instance the caller keeps a reference to.
    pub fn shared(instance: Rc<RefCell<H>>) -> Self {
        HandlerObject {
            instance,
            paths: Vec::new(),
            members: Members::new(),
        }
    }

    /// The bound instance
    pub fn instance(&self) -> Rc<RefCell<H>> {
        Rc::clone(&self.instance)
    }

    pub fn at(mut self, path: impl IntoPath) -> Self {
        self.paths.push(path.into_path());
        self
    }

    pub fn at_text(mut self, path: impl IntoPath) -> Self {
        self.paths.push(text_path(path));
        self
    }

    pub fn method<F, R>(mut self, path: impl IntoPath, method: F) -> Self
    where
        F: Fn(&mut H, XmlNode) -> R + 'static,
        R: IntoResults<T>,
    {
        self.members.method(path.into_path(), method);
        self
    }

    pub fn method_element<F, R>(mut self, path: impl IntoPath, method: F) -> Self
    where
        F: Fn(&mut H, XmlElement) -> R + 'static,
        R: IntoResults<T>,
    {
        self.members.method_element(path.into_path(), method);
        self
    }

    pub fn method_text<F, R>(mut self, path: impl IntoPath, method: F) -> Self
    where
        F: Fn(&mut H, XmlText) -> R + 'static,
        R: IntoResults<T>,
    {
        self.members.method_text(text_path(path), method);
        self
    }

    pub fn nest(mut self, handler: impl Into<Handler<T>>) -> Self {
        self.members.members.push(Member::Nested(handler.into()));
        self
    }
}

impl<H: 'static, T: 'static> From<HandlerObject<H, T>> for Handler<T> {
    fn from(object: HandlerObject<H, T>) -> Self {
        let members = object.members.bind(&object.instance);
        if object.paths.is_empty() {
            return members;
        }
        Handler::Group(
            object
                .paths
                .iter()
                .map(|path| members.clone().prefixed(path))
                .collect(),
        )
    }
}

impl<H, T> fmt::Debug for HandlerObject<H, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerObject")
            .field("paths", &self.paths)
            .field("members", &self.members.members.len())
            .finish_non_exhaustive()
    }
}
