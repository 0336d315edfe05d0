// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 recast contributors

//! Runtime type descriptors.
//!
//! A [`Type`] is a copyable handle to an immutable, process-lifetime
//! [`TypeInfo`]. Equality is handle equality; all behavior is reached
//! through the descriptor's vtable so that callers never need the compile
//! time type.

use crate::streams::{BinaryReader, BinaryWriter, StreamError, StringReader, StringWriter};
use std::fmt;
use std::hash::{Hash, Hasher};

/// Trait-flag bits recorded per type.
pub mod trait_flags {
    /// Type supports the binary stream vtable.
    pub const BINARY_SERIALIZABLE: u32 = 1 << 0;
    /// Type supports the string stream vtable.
    pub const STRING_SERIALIZABLE: u32 = 1 << 1;
    /// Type is a resizable list (`Vec<T>`).
    pub const IS_LIST_TYPE: u32 = 1 << 2;
    /// Type is a fixed-size array (`[T; N]`).
    pub const IS_ARRAY: u32 = 1 << 3;
    /// Wrapper type: casting to the underlying type is implicit.
    pub const CAST_TO_UNDERLYING_IMPLICIT: u32 = 1 << 4;
    /// Wrapper type: casting from the underlying type is implicit.
    pub const CAST_FROM_UNDERLYING_IMPLICIT: u32 = 1 << 5;
    /// Wrapper type: reinterpreting underlying-type storage as this type is valid.
    pub const REINTERPRET_FROM_UNDERLYING_VALID: u32 = 1 << 6;
}

/// One element of a tuple layout: byte offset and element type.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TupleField {
    pub offset: usize,
    pub element: Type,
}

/// Binary stream entry points for one type.
#[derive(Clone, Copy)]
pub struct BinaryVTable {
    /// Encode the value at `src` into the writer.
    pub encode: unsafe fn(src: *const u8, writer: &mut BinaryWriter<'_>),
    /// Decode from the reader into the already-constructed value at `dst`.
    pub decode: unsafe fn(dst: *mut u8, reader: &mut BinaryReader<'_>) -> Result<(), StreamError>,
}

/// String stream entry points for one type.
#[derive(Clone, Copy)]
pub struct StringVTable {
    /// Format the value at `src` into the writer.
    pub format: unsafe fn(src: *const u8, writer: &mut StringWriter),
    /// Parse from the reader into the already-constructed value at `dst`.
    pub parse: unsafe fn(dst: *mut u8, reader: &mut StringReader<'_>) -> Result<(), StreamError>,
}

/// Sequence (list/array) access for one type.
#[derive(Clone, Copy)]
pub struct SequenceVTable {
    /// Number of elements.
    pub len: unsafe fn(seq: *const u8) -> usize,
    /// Resize to `len` elements. Returns false when the type has a fixed
    /// size and `len` does not match it.
    pub resize: unsafe fn(seq: *mut u8, len: usize) -> bool,
    /// Address of element `index`, null when out of bounds.
    pub element: unsafe fn(seq: *const u8, index: usize) -> *const u8,
    /// Mutable address of element `index`, null when out of bounds.
    pub element_mut: unsafe fn(seq: *mut u8, index: usize) -> *mut u8,
}

/// Per-type behavior table. Every entry is a monomorphized shim created at
/// registration time.
#[derive(Clone, Copy)]
pub struct TypeVTable {
    /// Default-construct a value in place.
    pub construct: unsafe fn(dst: *mut u8),
    /// Drop the value in place.
    pub drop_in_place: unsafe fn(value: *mut u8),
    /// Replace the value at `dst` with a deep copy of `src`.
    pub deep_copy: unsafe fn(dst: *mut u8, src: *const u8),
    /// Value equality.
    pub equals: unsafe fn(a: *const u8, b: *const u8) -> bool,
    pub binary: Option<BinaryVTable>,
    pub string: Option<StringVTable>,
    pub sequence: Option<SequenceVTable>,
}

/// Immutable descriptor of one registered type.
pub struct TypeInfo {
    pub(crate) name: String,
    pub(crate) handle: u16,
    pub(crate) size: usize,
    pub(crate) align: usize,
    pub(crate) traits: u32,
    pub(crate) underlying: Option<Type>,
    pub(crate) element: Option<Type>,
    pub(crate) array_len: Option<usize>,
    pub(crate) tuple: Vec<TupleField>,
    pub(crate) vtable: TypeVTable,
}

/// Handle to a registered runtime type. Copyable, equality is cheap.
#[derive(Clone, Copy)]
pub struct Type {
    pub(crate) info: &'static TypeInfo,
}

impl Type {
    /// Look up the type registered for `T`. Panics when `T` was never
    /// registered; use [`Type::lookup`] for a fallible variant.
    pub fn of<T: 'static>() -> Type {
        match Type::lookup::<T>() {
            Some(ty) => ty,
            None => panic!(
                "type {} is not registered with recast-rtti",
                std::any::type_name::<T>()
            ),
        }
    }

    /// Look up the type registered for `T`.
    pub fn lookup<T: 'static>() -> Option<Type> {
        crate::registry::lookup_by_id(std::any::TypeId::of::<T>())
    }

    /// Look up a type by its registered name.
    pub fn by_name(name: &str) -> Option<Type> {
        crate::registry::lookup_by_name(name)
    }

    /// Registered name.
    pub fn name(&self) -> &'static str {
        &self.info.name
    }

    /// Registration handle; monotone and stable for the process lifetime.
    pub fn handle(&self) -> u16 {
        self.info.handle
    }

    /// Size in bytes.
    pub fn size(&self) -> usize {
        self.info.size
    }

    /// Alignment requirement in bytes.
    pub fn align(&self) -> usize {
        self.info.align
    }

    /// Size rounded up to alignment; used to size scratch buffers that
    /// construct values of this type in place.
    pub fn padded_size(&self) -> usize {
        (self.info.size + self.info.align - 1) & !(self.info.align - 1)
    }

    /// Trait-flag bitset (see [`trait_flags`]).
    pub fn traits(&self) -> u32 {
        self.info.traits
    }

    /// Check a single trait flag.
    pub fn has_trait(&self, flag: u32) -> bool {
        self.info.traits & flag != 0
    }

    /// The wrapped storage type for wrapper types; the type itself
    /// otherwise.
    pub fn underlying(&self) -> Type {
        self.info.underlying.unwrap_or(*self)
    }

    /// Element type for lists and arrays.
    pub fn element_type(&self) -> Option<Type> {
        self.info.element
    }

    /// Fixed element count for arrays.
    pub fn array_len(&self) -> Option<usize> {
        self.info.array_len
    }

    /// Ordered (offset, element type) layout for tuple types; empty for
    /// non-tuples.
    pub fn tuple_layout(&self) -> &'static [TupleField] {
        &self.info.tuple
    }

    /// Is this a resizable list type?
    pub fn is_list_type(&self) -> bool {
        self.has_trait(trait_flags::IS_LIST_TYPE)
    }

    /// Is this a fixed-size array type?
    pub fn is_array(&self) -> bool {
        self.has_trait(trait_flags::IS_ARRAY)
    }

    /// Behavior vtable.
    pub fn vtable(&self) -> &'static TypeVTable {
        &self.info.vtable
    }
}

impl PartialEq for Type {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.info, other.info)
    }
}

impl Eq for Type {}

impl Hash for Type {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.info.handle.hash(state);
    }
}

impl fmt::Debug for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Type({})", self.info.name)
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.info.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_equality_is_handle_equality() {
        let a = Type::of::<i32>();
        let b = Type::of::<i32>();
        assert_eq!(a, b);
        assert_ne!(a, Type::of::<i64>());
    }

    #[test]
    fn test_scalar_descriptors() {
        let ty = Type::of::<u16>();
        assert_eq!(ty.name(), "u16");
        assert_eq!(ty.size(), 2);
        assert_eq!(ty.align(), 2);
        assert!(ty.has_trait(trait_flags::BINARY_SERIALIZABLE));
        assert!(ty.has_trait(trait_flags::STRING_SERIALIZABLE));
        assert!(!ty.is_list_type());
        assert!(!ty.is_array());
    }

    #[test]
    fn test_underlying_defaults_to_self() {
        let ty = Type::of::<f64>();
        assert_eq!(ty.underlying(), ty);
    }

    #[test]
    fn test_list_introspection() {
        let ty = Type::of::<Vec<i32>>();
        assert!(ty.is_list_type());
        assert_eq!(ty.element_type(), Some(Type::of::<i32>()));
        assert_eq!(ty.array_len(), None);
    }

    #[test]
    fn test_lookup_by_name() {
        assert_eq!(Type::by_name("f32"), Some(Type::of::<f32>()));
        assert!(Type::by_name("no such type").is_none());
    }

    #[test]
    fn test_padded_size() {
        // A type whose size is already a multiple of its alignment is
        // unchanged by padding.
        let ty = Type::of::<u64>();
        assert_eq!(ty.padded_size(), ty.size());
    }
}
