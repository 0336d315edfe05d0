// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 recast contributors

//! Type registration.
//!
//! `TypeRegistration<T>` collects a type's name, traits and behavior, then
//! leaks an immutable `TypeInfo` into the process-wide table. The vtable
//! entries are monomorphized shims over `T`; once registered, all access
//! goes through raw pointers plus the descriptor.

use crate::streams::{
    BinaryReader, BinarySerializable, BinaryWriter, StreamError, StringReader, StringSerializable,
    StringWriter,
};
use crate::type_info::{
    trait_flags, BinaryVTable, SequenceVTable, StringVTable, TupleField, Type, TypeInfo,
    TypeVTable,
};
use std::any::TypeId;
use std::marker::PhantomData;

/// Baseline bounds every registered type must satisfy: the vtable needs
/// default construction, deep copy and equality, and registered values may
/// be shared across threads.
pub trait RuntimeType: 'static + Default + Clone + PartialEq + Send + Sync {}
impl<T: 'static + Default + Clone + PartialEq + Send + Sync> RuntimeType for T {}

unsafe fn construct_shim<T: RuntimeType>(dst: *mut u8) {
    dst.cast::<T>().write(T::default());
}

unsafe fn drop_shim<T: RuntimeType>(value: *mut u8) {
    std::ptr::drop_in_place(value.cast::<T>());
}

unsafe fn deep_copy_shim<T: RuntimeType>(dst: *mut u8, src: *const u8) {
    (*dst.cast::<T>()).clone_from(&*src.cast::<T>());
}

unsafe fn equals_shim<T: RuntimeType>(a: *const u8, b: *const u8) -> bool {
    *a.cast::<T>() == *b.cast::<T>()
}

unsafe fn binary_encode_shim<T: RuntimeType + BinarySerializable>(
    src: *const u8,
    writer: &mut BinaryWriter<'_>,
) {
    (*src.cast::<T>()).encode(writer);
}

unsafe fn binary_decode_shim<T: RuntimeType + BinarySerializable>(
    dst: *mut u8,
    reader: &mut BinaryReader<'_>,
) -> Result<(), StreamError> {
    *dst.cast::<T>() = T::decode(reader)?;
    Ok(())
}

unsafe fn string_format_shim<T: RuntimeType + StringSerializable>(
    src: *const u8,
    writer: &mut StringWriter,
) {
    (*src.cast::<T>()).format(writer);
}

unsafe fn string_parse_shim<T: RuntimeType + StringSerializable>(
    dst: *mut u8,
    reader: &mut StringReader<'_>,
) -> Result<(), StreamError> {
    *dst.cast::<T>() = T::parse(reader)?;
    Ok(())
}

unsafe fn vec_len_shim<T: RuntimeType>(seq: *const u8) -> usize {
    (*seq.cast::<Vec<T>>()).len()
}

unsafe fn vec_resize_shim<T: RuntimeType>(seq: *mut u8, len: usize) -> bool {
    (*seq.cast::<Vec<T>>()).resize(len, T::default());
    true
}

unsafe fn vec_element_shim<T: RuntimeType>(seq: *const u8, index: usize) -> *const u8 {
    let vec = &*seq.cast::<Vec<T>>();
    if index < vec.len() {
        vec.as_ptr().add(index).cast()
    } else {
        std::ptr::null()
    }
}

unsafe fn vec_element_mut_shim<T: RuntimeType>(seq: *mut u8, index: usize) -> *mut u8 {
    let vec = &mut *seq.cast::<Vec<T>>();
    if index < vec.len() {
        vec.as_mut_ptr().add(index).cast()
    } else {
        std::ptr::null_mut()
    }
}

unsafe fn array_len_shim<T: RuntimeType, const N: usize>(_seq: *const u8) -> usize {
    N
}

unsafe fn array_resize_shim<T: RuntimeType, const N: usize>(_seq: *mut u8, len: usize) -> bool {
    len == N
}

unsafe fn array_element_shim<T: RuntimeType, const N: usize>(
    seq: *const u8,
    index: usize,
) -> *const u8 {
    if index < N {
        seq.cast::<T>().add(index).cast()
    } else {
        std::ptr::null()
    }
}

unsafe fn array_element_mut_shim<T: RuntimeType, const N: usize>(
    seq: *mut u8,
    index: usize,
) -> *mut u8 {
    if index < N {
        seq.cast::<T>().add(index).cast()
    } else {
        std::ptr::null_mut()
    }
}

/// Builder for registering `T` as a runtime type.
pub struct TypeRegistration<T: RuntimeType> {
    name: String,
    traits: u32,
    underlying: Option<Type>,
    element: Option<Type>,
    array_len: Option<usize>,
    tuple: Vec<TupleField>,
    binary: Option<BinaryVTable>,
    string: Option<StringVTable>,
    sequence: Option<SequenceVTable>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: RuntimeType> TypeRegistration<T> {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            traits: 0,
            underlying: None,
            element: None,
            array_len: None,
            tuple: Vec::new(),
            binary: None,
            string: None,
            sequence: None,
            _marker: PhantomData,
        }
    }

    /// Attach binary stream support.
    pub fn binary(mut self) -> Self
    where
        T: BinarySerializable,
    {
        self.traits |= trait_flags::BINARY_SERIALIZABLE;
        self.binary = Some(BinaryVTable {
            encode: binary_encode_shim::<T>,
            decode: binary_decode_shim::<T>,
        });
        self
    }

    /// Attach string stream support.
    pub fn stringable(mut self) -> Self
    where
        T: StringSerializable,
    {
        self.traits |= trait_flags::STRING_SERIALIZABLE;
        self.string = Some(StringVTable {
            format: string_format_shim::<T>,
            parse: string_parse_shim::<T>,
        });
        self
    }

    /// Declare `T` a wrapper around `underlying`. `cast_traits` may carry
    /// the `CAST_TO_UNDERLYING_IMPLICIT`, `CAST_FROM_UNDERLYING_IMPLICIT`
    /// and `REINTERPRET_FROM_UNDERLYING_VALID` bits.
    pub fn wraps(mut self, underlying: Type, cast_traits: u32) -> Self {
        self.underlying = Some(underlying);
        self.traits |= cast_traits
            & (trait_flags::CAST_TO_UNDERLYING_IMPLICIT
                | trait_flags::CAST_FROM_UNDERLYING_IMPLICIT
                | trait_flags::REINTERPRET_FROM_UNDERLYING_VALID);
        self
    }

    /// Append one field to the tuple layout.
    pub fn tuple_field(mut self, offset: usize, element: Type) -> Self {
        assert!(
            offset + element.size() <= std::mem::size_of::<T>(),
            "tuple field at offset {} exceeds {}",
            offset,
            self.name
        );
        self.tuple.push(TupleField { offset, element });
        self
    }

    pub(crate) fn list_of(mut self, element: Type) -> Self
    where
        T: 'static,
    {
        self.traits |= trait_flags::IS_LIST_TYPE;
        self.element = Some(element);
        self
    }

    pub(crate) fn array_of(mut self, element: Type, len: usize) -> Self {
        self.traits |= trait_flags::IS_ARRAY;
        self.element = Some(element);
        self.array_len = Some(len);
        self
    }

    pub(crate) fn sequence_vtable(mut self, vtable: SequenceVTable) -> Self {
        self.sequence = Some(vtable);
        self
    }

    /// Register and return the handle. Registering the same `T` twice
    /// returns the existing handle.
    pub fn register(self) -> Type {
        crate::registry::ensure_builtin_types();
        self.finish()
    }

    /// Registration body; used directly by the builtin bootstrap (which
    /// must not re-enter the bootstrap through the public lookups).
    pub(crate) fn finish(self) -> Type {
        if let Some(existing) = crate::registry::lookup_by_id_raw(TypeId::of::<T>()) {
            return existing;
        }
        let info = TypeInfo {
            name: self.name,
            handle: 0, // assigned by the table
            size: std::mem::size_of::<T>(),
            align: std::mem::align_of::<T>(),
            traits: self.traits,
            underlying: self.underlying,
            element: self.element,
            array_len: self.array_len,
            tuple: self.tuple,
            vtable: TypeVTable {
                construct: construct_shim::<T>,
                drop_in_place: drop_shim::<T>,
                deep_copy: deep_copy_shim::<T>,
                equals: equals_shim::<T>,
                binary: self.binary,
                string: self.string,
                sequence: self.sequence,
            },
        };
        crate::registry::insert(TypeId::of::<T>(), info)
    }
}

fn vec_sequence_vtable<T: RuntimeType>() -> SequenceVTable {
    SequenceVTable {
        len: vec_len_shim::<T>,
        resize: vec_resize_shim::<T>,
        element: vec_element_shim::<T>,
        element_mut: vec_element_mut_shim::<T>,
    }
}

/// Register `Vec<T>` as a list type. The element type must already be
/// registered; the list is serializable through both stream kinds.
pub fn register_list_type<T>() -> Type
where
    T: RuntimeType + BinarySerializable + StringSerializable,
{
    crate::registry::ensure_builtin_types();
    register_list_type_inner::<T>()
}

pub(crate) fn register_list_type_inner<T>() -> Type
where
    T: RuntimeType + BinarySerializable + StringSerializable,
{
    let element = crate::registry::lookup_by_id_raw(TypeId::of::<T>())
        .expect("list element type must be registered first");
    TypeRegistration::<Vec<T>>::new(format!("Vec<{}>", element.name()))
        .binary()
        .stringable()
        .list_of(element)
        .sequence_vtable(vec_sequence_vtable::<T>())
        .finish()
}

/// Register `[T; N]` as a fixed-size array type. The element type must
/// already be registered.
pub fn register_array_type<T, const N: usize>() -> Type
where
    T: RuntimeType + Copy,
    [T; N]: Default,
{
    crate::registry::ensure_builtin_types();
    let element = Type::of::<T>();
    TypeRegistration::<[T; N]>::new(format!("[{}; {}]", element.name(), N))
        .array_of(element, N)
        .sequence_vtable(SequenceVTable {
            len: array_len_shim::<T, N>,
            resize: array_resize_shim::<T, N>,
            element: array_element_shim::<T, N>,
            element_mut: array_element_mut_shim::<T, N>,
        })
        .finish()
}

fn field_offset<P, F>(parent: &P, field: &F) -> usize {
    field as *const F as usize - parent as *const P as usize
}

/// Register `(A, B)` as a tuple type with offset introspection. Field
/// types must already be registered.
pub fn register_tuple2_type<A, B>() -> Type
where
    A: RuntimeType,
    B: RuntimeType,
{
    crate::registry::ensure_builtin_types();
    let a = Type::of::<A>();
    let b = Type::of::<B>();
    // Offsets are fixed per monomorphized tuple; probe a default instance.
    let probe = <(A, B)>::default();
    TypeRegistration::<(A, B)>::new(format!("({}, {})", a.name(), b.name()))
        .tuple_field(field_offset(&probe, &probe.0), a)
        .tuple_field(field_offset(&probe, &probe.1), b)
        .finish()
}

/// Register `(A, B, C)` as a tuple type with offset introspection.
pub fn register_tuple3_type<A, B, C>() -> Type
where
    A: RuntimeType,
    B: RuntimeType,
    C: RuntimeType,
{
    crate::registry::ensure_builtin_types();
    let a = Type::of::<A>();
    let b = Type::of::<B>();
    let c = Type::of::<C>();
    let probe = <(A, B, C)>::default();
    TypeRegistration::<(A, B, C)>::new(format!("({}, {}, {})", a.name(), b.name(), c.name()))
        .tuple_field(field_offset(&probe, &probe.0), a)
        .tuple_field(field_offset(&probe, &probe.1), b)
        .tuple_field(field_offset(&probe, &probe.2), c)
        .finish()
}
