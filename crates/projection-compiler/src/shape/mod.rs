//! Data shapes and field accessors.
//!
//! A shape is a Rust type whose fields can be referenced from a mapping.
//! Shapes describe themselves once through [`ShapeBuilder`] (usually via
//! `#[derive(Shape)]`), and the [`ShapeRegistry`] turns those descriptions
//! into cached, type-erased [`Accessor`]s.

mod accessor;
mod registry;
mod value;

pub use accessor::{
    Accessor, AccessorResolver, ItemsGetter, ObjectGetter, ScalarGetter, ShapeId,
};
pub use registry::ShapeRegistry;
pub use value::{IntoValue, ScalarType, Value};

use std::any::Any;
use std::marker::PhantomData;

/// A type whose fields can be referenced by mappings.
pub trait Shape: Any + Send + Sync {
    /// Registers the fields of this shape.
    fn describe(shape: &mut ShapeBuilder<Self>)
    where
        Self: Sized;
}

/// Collects the field accessors of one shape.
pub struct ShapeBuilder<T> {
    fields: Vec<(String, Accessor)>,
    nested: Vec<fn(&mut ShapeRegistry)>,
    _shape: PhantomData<fn(&T)>,
}

impl<T: Shape> ShapeBuilder<T> {
    pub(crate) fn new() -> Self {
        Self {
            fields: Vec::new(),
            nested: Vec::new(),
            _shape: PhantomData,
        }
    }

    /// Registers a scalar field.
    pub fn field<V, F>(&mut self, name: &str, get: F) -> &mut Self
    where
        V: IntoValue,
        F: Fn(&T) -> V + Send + Sync + 'static,
    {
        let getter = ScalarGetter::new(V::SCALAR_TYPE, move |value| match value.downcast_ref::<T>() {
            Some(value) => get(value).into_value(),
            None => Value::Null,
        });
        self.fields.push((name.to_string(), Accessor::Scalar(getter)));
        self
    }

    /// Registers a collection of child shapes. `None` means the collection
    /// is absent, which serializes the same as an empty one.
    pub fn items<C, F>(&mut self, name: &str, get: F) -> &mut Self
    where
        C: Shape,
        F: for<'a> Fn(&'a T) -> Option<&'a [C]> + Send + Sync + 'static,
    {
        let getter = ItemsGetter::new(ShapeId::of::<C>(), move |value, visit| {
            let Some(items) = value.downcast_ref::<T>().and_then(|value| get(value)) else {
                return false;
            };
            for item in items {
                visit(item);
            }
            true
        });
        self.fields.push((name.to_string(), Accessor::Items(getter)));
        self.nested.push(register_nested::<C>);
        self
    }

    /// Registers a nested object, reachable through dotted paths.
    pub fn object<C, F>(&mut self, name: &str, get: F) -> &mut Self
    where
        C: Shape,
        F: for<'a> Fn(&'a T) -> Option<&'a C> + Send + Sync + 'static,
    {
        let getter = ObjectGetter::new(ShapeId::of::<C>(), move |value| {
            value
                .downcast_ref::<T>()
                .and_then(|value| get(value))
                .map(|object| object as &dyn Any)
        });
        self.fields.push((name.to_string(), Accessor::Object(getter)));
        self.nested.push(register_nested::<C>);
        self
    }

    pub(crate) fn finish(self) -> (Vec<(String, Accessor)>, Vec<fn(&mut ShapeRegistry)>) {
        (self.fields, self.nested)
    }
}

fn register_nested<C: Shape>(registry: &mut ShapeRegistry) {
    registry.register::<C>();
}
