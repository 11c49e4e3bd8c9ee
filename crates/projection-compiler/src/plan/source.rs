//! Compiled value sources and field binding.

use std::fmt;

use crate::config::CompilerConfig;
use crate::diagnostic::{CompileError, ConfigPath, Result};
use crate::exec::ExecContext;
use crate::ir::{FieldRef, Scope};
use crate::shape::{Accessor, AccessorResolver, ItemsGetter, ScalarGetter, ScalarType, ShapeId, Value};

use super::Scopes;

/// Where a single value comes from at execution time.
#[derive(Clone)]
pub enum ValueSource {
    /// A getter applied to one of the execution inputs, optionally coerced
    /// to the declared type.
    Field {
        reference: FieldRef,
        scope: Scope,
        getter: ScalarGetter,
        coerce_to: Option<ScalarType>,
    },
    /// A literal, ignoring all inputs.
    Const(Value),
}

impl ValueSource {
    /// The type of the values this source produces (nulls aside).
    pub fn value_type(&self) -> Option<ScalarType> {
        match self {
            ValueSource::Field {
                getter, coerce_to, ..
            } => Some(coerce_to.unwrap_or(getter.value_type())),
            ValueSource::Const(value) => value.scalar_type(),
        }
    }

    #[inline]
    pub fn evaluate(&self, cx: &ExecContext<'_>) -> Value {
        match self {
            ValueSource::Const(value) => value.clone(),
            ValueSource::Field {
                scope,
                getter,
                coerce_to,
                ..
            } => {
                let Some(input) = cx.input(*scope) else {
                    return Value::Null;
                };
                let value = getter.get(input);
                match coerce_to {
                    Some(target) => value.coerce(*target),
                    None => value,
                }
            }
        }
    }
}

impl fmt::Debug for ValueSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl fmt::Display for ValueSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueSource::Field {
                reference,
                coerce_to: Some(target),
                ..
            } => write!(f, "{} as {}", reference, target),
            ValueSource::Field { reference, .. } => write!(f, "{}", reference),
            ValueSource::Const(value) => write!(f, "const {:?}", value),
        }
    }
}

/// The items of a collection-valued field.
#[derive(Clone)]
pub struct CollectionSource {
    reference: FieldRef,
    scope: Scope,
    getter: ItemsGetter,
}

impl CollectionSource {
    pub fn item_shape(&self) -> ShapeId {
        self.getter.item_shape()
    }

    /// Visits every item. Returns `false` when the collection is absent.
    #[inline]
    pub fn for_each(&self, cx: &ExecContext<'_>, visit: &mut dyn FnMut(&dyn std::any::Any)) -> bool {
        match cx.input(self.scope) {
            Some(input) => self.getter.for_each(input, visit),
            None => false,
        }
    }
}

impl fmt::Debug for CollectionSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.reference)
    }
}

// =============================================================================
// Binding
// =============================================================================

/// Binds field references to accessors for one set of scopes.
pub(crate) struct FieldBinder<'c> {
    resolver: &'c dyn AccessorResolver,
    config: &'c CompilerConfig,
}

impl<'c> FieldBinder<'c> {
    pub(crate) fn new(resolver: &'c dyn AccessorResolver, config: &'c CompilerConfig) -> Self {
        Self { resolver, config }
    }

    fn lookup(
        &self,
        scopes: &Scopes,
        reference: &FieldRef,
        scope: Scope,
        field: &str,
        path: &ConfigPath,
    ) -> Result<Accessor> {
        let shape = scopes.shape(scope).ok_or_else(|| {
            CompileError::invalid(
                path,
                format!("'{}' uses item. outside of an array's items", reference),
            )
        })?;

        self.resolver
            .resolve(shape, field)
            .ok_or_else(|| CompileError::UnresolvableField {
                path: path.clone(),
                field: reference.to_string(),
                shape: shape.name(),
            })
    }

    /// Binds a reference that must produce a scalar, optionally of a
    /// declared type.
    pub(crate) fn scalar(
        &self,
        scopes: &Scopes,
        reference: &FieldRef,
        declared: Option<ScalarType>,
        path: &ConfigPath,
    ) -> Result<ValueSource> {
        let (scope, field) = match reference {
            FieldRef::Const(literal) => {
                let value = match declared {
                    None => Value::String(literal.clone()),
                    Some(value_type) => Value::parse_literal(value_type, literal).ok_or_else(|| {
                        CompileError::TypeCoercionFailure {
                            path: path.clone(),
                            field: reference.to_string(),
                            declared: value_type.to_string(),
                            actual: format!("literal '{}'", literal),
                        }
                    })?,
                };
                return Ok(ValueSource::Const(value));
            }
            FieldRef::Field { scope, path: field } => (*scope, field),
        };

        let getter = match self.lookup(scopes, reference, scope, field, path)? {
            Accessor::Scalar(getter) => getter,
            other => {
                return Err(CompileError::TypeCoercionFailure {
                    path: path.clone(),
                    field: reference.to_string(),
                    declared: declared.map_or("scalar".to_string(), |t| t.to_string()),
                    actual: other.describe(),
                })
            }
        };

        let actual = getter.value_type();
        let coerce_to = match declared {
            None => None,
            Some(target) if target == actual => None,
            Some(target) if actual.coercible_to(target, self.config) => Some(target),
            Some(target) => {
                return Err(CompileError::TypeCoercionFailure {
                    path: path.clone(),
                    field: reference.to_string(),
                    declared: target.to_string(),
                    actual: actual.to_string(),
                })
            }
        };

        Ok(ValueSource::Field {
            reference: reference.clone(),
            scope,
            getter,
            coerce_to,
        })
    }

    /// Binds a reference that must produce an enumerable of child shapes.
    pub(crate) fn collection(
        &self,
        scopes: &Scopes,
        reference: &FieldRef,
        path: &ConfigPath,
    ) -> Result<CollectionSource> {
        let FieldRef::Field { scope, path: field } = reference else {
            return Err(CompileError::invalid(
                path,
                "an array context cannot be a constant",
            ));
        };

        match self.lookup(scopes, reference, *scope, field, path)? {
            Accessor::Items(getter) => Ok(CollectionSource {
                reference: reference.clone(),
                scope: *scope,
                getter,
            }),
            other => Err(CompileError::TypeCoercionFailure {
                path: path.clone(),
                field: reference.to_string(),
                declared: "enumerable".to_string(),
                actual: other.describe(),
            }),
        }
    }
}
