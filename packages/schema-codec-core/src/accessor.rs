//! Explicit field accessors, registered once per type instead of reflection.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;

/// Reads a field as `Any`.
pub type GetFn<T> = fn(&T) -> &dyn Any;

/// Borrows a field mutably as `Any`.
pub type GetMutFn<T> = fn(&mut T) -> &mut dyn Any;

/// Get/set capability for one field of `T`.
pub struct FieldAccessor<T> {
    pub get: GetFn<T>,
    pub get_mut: GetMutFn<T>,
}

impl<T> FieldAccessor<T> {
    pub fn new(get: GetFn<T>, get_mut: GetMutFn<T>) -> Self {
        Self { get, get_mut }
    }
}

impl<T> Clone for FieldAccessor<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for FieldAccessor<T> {}

impl<T> fmt::Debug for FieldAccessor<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldAccessor").finish_non_exhaustive()
    }
}

/// Builds a [`FieldAccessor`] for a named field of a struct.
///
/// ```
/// use schema_codec_core::accessor;
///
/// struct Point { x: f32, y: f32 }
/// let x = accessor!(Point, x);
/// let p = Point { x: 1.0, y: 2.0 };
/// assert_eq!((x.get)(&p).downcast_ref::<f32>(), Some(&1.0));
/// ```
#[macro_export]
macro_rules! accessor {
    ($ty:ty, $field:ident) => {{
        fn get(value: &$ty) -> &dyn ::std::any::Any {
            &value.$field
        }
        fn get_mut(value: &mut $ty) -> &mut dyn ::std::any::Any {
            &mut value.$field
        }
        $crate::FieldAccessor::<$ty>::new(get, get_mut)
    }};
}

/// Accessor table of one type, keyed by member name.
pub struct FieldAccessors<T> {
    fields: HashMap<String, FieldAccessor<T>>,
}

impl<T> FieldAccessors<T> {
    pub fn new() -> Self {
        Self {
            fields: HashMap::new(),
        }
    }

    /// Adds an accessor, builder style.
    pub fn with(mut self, name: impl Into<String>, accessor: FieldAccessor<T>) -> Self {
        self.insert(name, accessor);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, accessor: FieldAccessor<T>) {
        self.fields.insert(name.into(), accessor);
    }

    pub fn get(&self, name: &str) -> Option<FieldAccessor<T>> {
        self.fields.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<T> Default for FieldAccessors<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for FieldAccessors<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldAccessors")
            .field("fields", &self.fields.keys().collect::<Vec<_>>())
            .finish()
    }
}
