//! Type-erased accessors and the resolver capability.
//!
//! An accessor is a getter bound to one shape and one field path. The plan
//! compilers only ever see accessors through [`AccessorResolver`]; how they
//! are produced (static registry, derive, hand-written tables) is up to the
//! resolver.

use std::any::{Any, TypeId};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use super::value::{ScalarType, Value};

/// Identity of a data shape (a concrete Rust type).
///
/// Equality and hashing use the [`TypeId`] only; the name is carried for
/// diagnostics.
#[derive(Clone, Copy)]
pub struct ShapeId {
    type_id: TypeId,
    name: &'static str,
}

impl ShapeId {
    pub fn of<T: Any>() -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Fully qualified type name.
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl PartialEq for ShapeId {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id
    }
}

impl Eq for ShapeId {}

impl Hash for ShapeId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.type_id.hash(state);
    }
}

impl fmt::Debug for ShapeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

impl fmt::Display for ShapeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

// =============================================================================
// Getters
// =============================================================================

type ScalarFn = dyn Fn(&dyn Any) -> Value + Send + Sync;
type ItemsFn = dyn Fn(&dyn Any, &mut dyn FnMut(&dyn Any)) -> bool + Send + Sync;
type ObjectFn = dyn for<'a> Fn(&'a dyn Any) -> Option<&'a dyn Any> + Send + Sync;

/// Extracts one scalar from a shape instance.
#[derive(Clone)]
pub struct ScalarGetter {
    value_type: ScalarType,
    get: Arc<ScalarFn>,
}

impl ScalarGetter {
    pub fn new<F>(value_type: ScalarType, get: F) -> Self
    where
        F: Fn(&dyn Any) -> Value + Send + Sync + 'static,
    {
        Self {
            value_type,
            get: Arc::new(get),
        }
    }

    /// The type this getter produces (before any column coercion).
    pub fn value_type(&self) -> ScalarType {
        self.value_type
    }

    #[inline]
    pub fn get(&self, value: &dyn Any) -> Value {
        (self.get)(value)
    }
}

/// Visits the child items of a collection-valued field.
#[derive(Clone)]
pub struct ItemsGetter {
    item_shape: ShapeId,
    each: Arc<ItemsFn>,
}

impl ItemsGetter {
    pub fn new<F>(item_shape: ShapeId, each: F) -> Self
    where
        F: Fn(&dyn Any, &mut dyn FnMut(&dyn Any)) -> bool + Send + Sync + 'static,
    {
        Self {
            item_shape,
            each: Arc::new(each),
        }
    }

    pub fn item_shape(&self) -> ShapeId {
        self.item_shape
    }

    /// Calls `visit` for every item in order. Returns `false` when the
    /// collection is absent.
    #[inline]
    pub fn for_each(&self, value: &dyn Any, visit: &mut dyn FnMut(&dyn Any)) -> bool {
        (self.each)(value, visit)
    }
}

/// Navigates from a shape instance to a nested object.
#[derive(Clone)]
pub struct ObjectGetter {
    target: ShapeId,
    get: Arc<ObjectFn>,
}

impl ObjectGetter {
    pub fn new<F>(target: ShapeId, get: F) -> Self
    where
        F: for<'a> Fn(&'a dyn Any) -> Option<&'a dyn Any> + Send + Sync + 'static,
    {
        Self {
            target,
            get: Arc::new(get),
        }
    }

    pub fn target(&self) -> ShapeId {
        self.target
    }

    #[inline]
    pub fn get<'a>(&self, value: &'a dyn Any) -> Option<&'a dyn Any> {
        (self.get)(value)
    }
}

/// A resolved field accessor.
#[derive(Clone)]
pub enum Accessor {
    Scalar(ScalarGetter),
    Items(ItemsGetter),
    Object(ObjectGetter),
}

impl Accessor {
    /// Short description used in type errors.
    pub fn describe(&self) -> String {
        match self {
            Accessor::Scalar(getter) => getter.value_type().to_string(),
            Accessor::Items(getter) => format!("enumerable of {}", getter.item_shape()),
            Accessor::Object(getter) => format!("object {}", getter.target()),
        }
    }

    /// Prefixes this accessor with a navigation step, so that it applies to
    /// the parent of the object `parent` navigates to. A missing parent
    /// object yields null (scalars) or an absent collection.
    pub(crate) fn through(self, parent: &ObjectGetter) -> Accessor {
        let nav = Arc::clone(&parent.get);
        match self {
            Accessor::Scalar(inner) => {
                let get = inner.get;
                Accessor::Scalar(ScalarGetter::new(inner.value_type, move |value| {
                    match nav(value) {
                        Some(object) => get(object),
                        None => Value::Null,
                    }
                }))
            }
            Accessor::Items(inner) => {
                let each = inner.each;
                Accessor::Items(ItemsGetter::new(inner.item_shape, move |value, visit| {
                    match nav(value) {
                        Some(object) => each(object, visit),
                        None => false,
                    }
                }))
            }
            Accessor::Object(inner) => {
                let get = inner.get;
                Accessor::Object(ObjectGetter::new(inner.target, move |value| {
                    nav(value).and_then(|object| get(object))
                }))
            }
        }
    }
}

impl fmt::Debug for Accessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Accessor({})", self.describe())
    }
}

// =============================================================================
// Resolver
// =============================================================================

/// Resolves dotted field paths against data shapes.
///
/// Resolution must be pure and idempotent. Returning `None` means the path
/// does not exist on the shape; the compiler turns that into a compile-time
/// error.
pub trait AccessorResolver: Send + Sync {
    fn resolve(&self, shape: ShapeId, path: &str) -> Option<Accessor>;
}

impl<R: AccessorResolver + ?Sized> AccessorResolver for Arc<R> {
    fn resolve(&self, shape: ShapeId, path: &str) -> Option<Accessor> {
        (**self).resolve(shape, path)
    }
}

impl<R: AccessorResolver + ?Sized> AccessorResolver for &R {
    fn resolve(&self, shape: ShapeId, path: &str) -> Option<Accessor> {
        (**self).resolve(shape, path)
    }
}
