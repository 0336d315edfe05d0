// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 recast contributors

//! Typed raw pointers.
//!
//! A typed pointer pairs a raw data address with the runtime [`Type`] of
//! the pointed-to value. They are the unit of data exchange in the
//! conversion engine: conversion functions receive and produce typed
//! pointers and dispatch behavior through the type's vtable.
//!
//! Lifetimes are erased; the engine's compiled-operation flags define how
//! long a pointer may be read (see the result-aliasing contract). Within
//! one conversion call, pointers are only used while their referents are
//! alive on the caller's stack.

use crate::streams::{BinaryReader, BinaryWriter, StreamError, StringReader, StringWriter};
use crate::type_info::Type;
use std::fmt;

/// Immutable (address, type) pair.
#[derive(Clone, Copy)]
pub struct TypedConstPtr {
    addr: *const u8,
    ty: Type,
}

impl TypedConstPtr {
    /// Typed pointer to `value`. `T` must be registered.
    pub fn new<T: 'static>(value: &T) -> Self {
        Self {
            addr: (value as *const T).cast(),
            ty: Type::of::<T>(),
        }
    }

    /// Assemble from raw parts. The caller guarantees `addr` points to a
    /// live value of type `ty`.
    pub fn from_raw(addr: *const u8, ty: Type) -> Self {
        Self { addr, ty }
    }

    /// Runtime type of the pointed-to value.
    pub fn data_type(&self) -> Type {
        self.ty
    }

    /// Raw data address.
    pub fn raw(&self) -> *const u8 {
        self.addr
    }

    /// Borrow the value as `T`.
    ///
    /// # Safety
    ///
    /// The pointer must reference a live value whose registered type is
    /// exactly `Type::of::<T>()`.
    pub unsafe fn get<T: 'static>(&self) -> &T {
        debug_assert_eq!(self.ty, Type::of::<T>(), "typed pointer downcast mismatch");
        &*self.addr.cast::<T>()
    }

    /// New pointer `offset` bytes into the same storage, retyped.
    pub fn rebased(&self, offset: usize, ty: Type) -> Self {
        Self {
            addr: unsafe { self.addr.add(offset) },
            ty,
        }
    }

    /// Element count when the type is a list or array.
    pub fn sequence_len(&self) -> Option<usize> {
        let vtable = self.ty.vtable().sequence?;
        Some(unsafe { (vtable.len)(self.addr) })
    }

    /// Typed pointer to element `index`; `None` when out of bounds or the
    /// type is not a sequence.
    pub fn element(&self, index: usize) -> Option<TypedConstPtr> {
        let vtable = self.ty.vtable().sequence?;
        let element_type = self.ty.element_type()?;
        let addr = unsafe { (vtable.element)(self.addr, index) };
        if addr.is_null() {
            None
        } else {
            Some(TypedConstPtr::from_raw(addr, element_type))
        }
    }

    /// Encode through the type's binary vtable.
    pub fn encode_binary(&self, writer: &mut BinaryWriter<'_>) -> Result<(), StreamError> {
        match self.ty.vtable().binary {
            Some(vtable) => {
                unsafe { (vtable.encode)(self.addr, writer) };
                Ok(())
            }
            None => Err(StreamError::Unsupported("binary serialization")),
        }
    }

    /// Format through the type's string vtable.
    pub fn format_string(&self, writer: &mut StringWriter) -> Result<(), StreamError> {
        match self.ty.vtable().string {
            Some(vtable) => {
                unsafe { (vtable.format)(self.addr, writer) };
                Ok(())
            }
            None => Err(StreamError::Unsupported("string serialization")),
        }
    }

    /// Value equality through the vtable; false when the types differ.
    pub fn equals(&self, other: &TypedConstPtr) -> bool {
        self.ty == other.ty && unsafe { (self.ty.vtable().equals)(self.addr, other.addr) }
    }
}

impl fmt::Debug for TypedConstPtr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypedConstPtr({} @ {:p})", self.ty.name(), self.addr)
    }
}

/// Mutable (address, type) pair.
#[derive(Clone, Copy)]
pub struct TypedPtr {
    addr: *mut u8,
    ty: Type,
}

impl TypedPtr {
    /// Typed pointer to `value`. `T` must be registered.
    pub fn new<T: 'static>(value: &mut T) -> Self {
        Self {
            addr: (value as *mut T).cast(),
            ty: Type::of::<T>(),
        }
    }

    /// Assemble from raw parts. The caller guarantees `addr` points to a
    /// live, exclusively-borrowed value of type `ty`.
    pub fn from_raw(addr: *mut u8, ty: Type) -> Self {
        Self { addr, ty }
    }

    /// Runtime type of the pointed-to value.
    pub fn data_type(&self) -> Type {
        self.ty
    }

    /// Raw data address.
    pub fn raw(&self) -> *mut u8 {
        self.addr
    }

    /// Immutable view of the same pointer.
    pub fn as_const(&self) -> TypedConstPtr {
        TypedConstPtr::from_raw(self.addr, self.ty)
    }

    /// Borrow the value as `T`.
    ///
    /// # Safety
    ///
    /// The pointer must reference a live value whose registered type is
    /// exactly `Type::of::<T>()`, with no other live borrows.
    pub unsafe fn get_mut<T: 'static>(&self) -> &mut T {
        debug_assert_eq!(self.ty, Type::of::<T>(), "typed pointer downcast mismatch");
        &mut *self.addr.cast::<T>()
    }

    /// Replace the value with a deep copy of `source` (virtual dispatch
    /// through the type descriptor). Types must match.
    pub fn deep_copy_from(&self, source: TypedConstPtr) {
        debug_assert_eq!(self.ty, source.data_type(), "deep copy type mismatch");
        unsafe { (self.ty.vtable().deep_copy)(self.addr, source.raw()) };
    }

    /// Element count when the type is a list or array.
    pub fn sequence_len(&self) -> Option<usize> {
        self.as_const().sequence_len()
    }

    /// Resize a sequence. Returns false when the type has a fixed element
    /// count different from `len`, or is not a sequence.
    pub fn resize_sequence(&self, len: usize) -> bool {
        match self.ty.vtable().sequence {
            Some(vtable) => unsafe { (vtable.resize)(self.addr, len) },
            None => false,
        }
    }

    /// Mutable typed pointer to element `index`.
    pub fn element_mut(&self, index: usize) -> Option<TypedPtr> {
        let vtable = self.ty.vtable().sequence?;
        let element_type = self.ty.element_type()?;
        let addr = unsafe { (vtable.element_mut)(self.addr, index) };
        if addr.is_null() {
            None
        } else {
            Some(TypedPtr::from_raw(addr, element_type))
        }
    }

    /// Decode through the type's binary vtable, replacing the value.
    pub fn decode_binary(&self, reader: &mut BinaryReader<'_>) -> Result<(), StreamError> {
        match self.ty.vtable().binary {
            Some(vtable) => unsafe { (vtable.decode)(self.addr, reader) },
            None => Err(StreamError::Unsupported("binary deserialization")),
        }
    }

    /// Parse through the type's string vtable, replacing the value.
    pub fn parse_string(&self, reader: &mut StringReader<'_>) -> Result<(), StreamError> {
        match self.ty.vtable().string {
            Some(vtable) => unsafe { (vtable.parse)(self.addr, reader) },
            None => Err(StreamError::Unsupported("string deserialization")),
        }
    }
}

impl fmt::Debug for TypedPtr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypedPtr({} @ {:p})", self.ty.name(), self.addr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_typed_pointer_roundtrip() {
        let value = 7i64;
        let ptr = TypedConstPtr::new(&value);
        assert_eq!(ptr.data_type(), Type::of::<i64>());
        assert_eq!(unsafe { *ptr.get::<i64>() }, 7);
    }

    #[test]
    fn test_deep_copy_dispatch() {
        let source = String::from("payload");
        let mut destination = String::new();
        TypedPtr::new(&mut destination).deep_copy_from(TypedConstPtr::new(&source));
        assert_eq!(destination, "payload");
    }

    #[test]
    fn test_sequence_access() {
        let values = vec![10i32, 20, 30];
        let ptr = TypedConstPtr::new(&values);
        assert_eq!(ptr.sequence_len(), Some(3));
        let element = ptr.element(1).unwrap();
        assert_eq!(element.data_type(), Type::of::<i32>());
        assert_eq!(unsafe { *element.get::<i32>() }, 20);
        assert!(ptr.element(3).is_none());
    }

    #[test]
    fn test_resize_sequence() {
        let mut values: Vec<u16> = Vec::new();
        let ptr = TypedPtr::new(&mut values);
        assert!(ptr.resize_sequence(4));
        assert_eq!(values.len(), 4);
    }

    #[test]
    fn test_scalar_has_no_sequence_access() {
        let value = 5u32;
        let ptr = TypedConstPtr::new(&value);
        assert_eq!(ptr.sequence_len(), None);
        assert!(ptr.element(0).is_none());
    }

    #[test]
    fn test_value_equality() {
        let a = 3.5f64;
        let b = 3.5f64;
        let c = 4.5f64;
        assert!(TypedConstPtr::new(&a).equals(&TypedConstPtr::new(&b)));
        assert!(!TypedConstPtr::new(&a).equals(&TypedConstPtr::new(&c)));
    }
}
