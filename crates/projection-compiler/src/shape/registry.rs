//! Static shape registry backing [`AccessorResolver`].

use std::any::TypeId;
use std::collections::HashMap;

use parking_lot::RwLock;

use super::{Accessor, AccessorResolver, Shape, ShapeBuilder, ShapeId};

/// Separator between segments of a field path (`Customer.Address.City`).
const FIELD_SEPARATOR: char = '.';

struct ShapeDescriptor {
    id: ShapeId,
    fields: HashMap<String, Accessor>,
}

/// Registry of shapes and their field accessors.
///
/// Shapes are registered up front; nested shapes reachable through `items`
/// or `object` fields are registered transitively. Resolved dotted paths are
/// cached per `(shape, path)`.
pub struct ShapeRegistry {
    shapes: HashMap<TypeId, ShapeDescriptor>,
    resolved: RwLock<HashMap<(TypeId, String), Option<Accessor>>>,
}

impl ShapeRegistry {
    pub fn new() -> Self {
        Self {
            shapes: HashMap::new(),
            resolved: RwLock::new(HashMap::new()),
        }
    }

    /// Registers a shape and every shape nested in it.
    pub fn register<T: Shape>(&mut self) -> &mut Self {
        let type_id = TypeId::of::<T>();
        if self.shapes.contains_key(&type_id) {
            return self;
        }

        let mut builder = ShapeBuilder::<T>::new();
        T::describe(&mut builder);
        let (fields, nested) = builder.finish();

        // Insert before recursing so self-referential shapes terminate.
        self.shapes.insert(
            type_id,
            ShapeDescriptor {
                id: ShapeId::of::<T>(),
                fields: fields.into_iter().collect(),
            },
        );
        self.resolved.get_mut().clear();

        for register in nested {
            register(self);
        }
        self
    }

    /// Builder-style variant of [`register`](Self::register).
    pub fn with<T: Shape>(mut self) -> Self {
        self.register::<T>();
        self
    }

    pub fn contains(&self, shape: ShapeId) -> bool {
        self.shapes.contains_key(&shape.type_id())
    }

    /// Returns the number of registered shapes.
    pub fn len(&self) -> usize {
        self.shapes.len()
    }

    /// Returns true if no shapes are registered.
    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }

    /// Top-level field names of a shape, sorted.
    pub fn field_names(&self, shape: ShapeId) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .shapes
            .get(&shape.type_id())
            .map(|descriptor| descriptor.fields.keys().map(String::as_str).collect())
            .unwrap_or_default();
        names.sort_unstable();
        names
    }

    fn resolve_uncached(&self, shape: ShapeId, path: &str) -> Option<Accessor> {
        let mut segments = path.split(FIELD_SEPARATOR);
        let first = segments.next()?;
        let mut current = self.field(shape, first)?;

        for segment in segments {
            let Accessor::Object(parent) = &current else {
                return None;
            };
            let next = self.field(parent.target(), segment)?;
            current = next.through(parent);
        }

        Some(current)
    }

    fn field(&self, shape: ShapeId, name: &str) -> Option<Accessor> {
        let descriptor = self.shapes.get(&shape.type_id())?;
        debug_assert_eq!(descriptor.id, shape);
        descriptor.fields.get(name).cloned()
    }
}

impl Default for ShapeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl AccessorResolver for ShapeRegistry {
    fn resolve(&self, shape: ShapeId, path: &str) -> Option<Accessor> {
        let key = (shape.type_id(), path.to_string());
        if let Some(cached) = self.resolved.read().get(&key) {
            return cached.clone();
        }

        let resolved = self.resolve_uncached(shape, path);
        self.resolved
            .write()
            .entry(key)
            .or_insert(resolved)
            .clone()
    }
}

impl std::fmt::Debug for ShapeRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<_> = self.shapes.values().map(|d| d.id.name()).collect();
        names.sort_unstable();
        f.debug_struct("ShapeRegistry")
            .field("shapes", &names)
            .finish_non_exhaustive()
    }
}
