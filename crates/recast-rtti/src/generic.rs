// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 recast contributors

//! Owned runtime-typed values.
//!
//! `GenericObject` owns one heap-allocated value of a runtime type;
//! `ScratchObject` constructs a short-lived value in an inline buffer with
//! heap fallback, sized by the type's padded size. Neither retains any
//! reference to other storage after construction.

use crate::type_info::Type;
use crate::typed_ptr::{TypedConstPtr, TypedPtr};
use std::alloc::{alloc, dealloc, Layout};
use std::fmt;
use std::mem::MaybeUninit;
use std::ptr::NonNull;

fn layout_of(ty: Type) -> Layout {
    Layout::from_size_align(ty.size().max(1), ty.align().max(1))
        .expect("registered type has a valid layout")
}

/// Owning box around a single value of a runtime type.
pub struct GenericObject {
    ptr: NonNull<u8>,
    ty: Type,
}

impl GenericObject {
    /// Allocate and default-construct a value of `ty`.
    pub fn new(ty: Type) -> Self {
        let layout = layout_of(ty);
        let ptr = NonNull::new(unsafe { alloc(layout) }).expect("allocation failed");
        unsafe { (ty.vtable().construct)(ptr.as_ptr()) };
        Self { ptr, ty }
    }

    /// Allocate and move `value` in. `T` must be registered.
    pub fn from_value<T: 'static>(value: T) -> Self {
        let ty = Type::of::<T>();
        let layout = layout_of(ty);
        let ptr = NonNull::new(unsafe { alloc(layout) }).expect("allocation failed");
        unsafe { ptr.as_ptr().cast::<T>().write(value) };
        Self { ptr, ty }
    }

    /// Allocate a deep copy of the value behind `source`.
    pub fn copy_of(source: TypedConstPtr) -> Self {
        let mut object = Self::new(source.data_type());
        object.deep_copy_from(source);
        object
    }

    /// Runtime type of the owned value.
    pub fn data_type(&self) -> Type {
        self.ty
    }

    /// Immutable typed pointer to the owned value.
    pub fn as_const_ptr(&self) -> TypedConstPtr {
        TypedConstPtr::from_raw(self.ptr.as_ptr(), self.ty)
    }

    /// Mutable typed pointer to the owned value.
    pub fn as_ptr(&mut self) -> TypedPtr {
        TypedPtr::from_raw(self.ptr.as_ptr(), self.ty)
    }

    /// Replace the owned value with a deep copy of `source`. Types must
    /// match.
    pub fn deep_copy_from(&mut self, source: TypedConstPtr) {
        self.as_ptr().deep_copy_from(source);
    }

    /// Borrow the owned value as `T`.
    ///
    /// # Safety
    ///
    /// `T` must be exactly the registered type of the owned value.
    pub unsafe fn get<T: 'static>(&self) -> &T {
        debug_assert_eq!(self.ty, Type::of::<T>(), "generic object downcast mismatch");
        &*self.ptr.as_ptr().cast::<T>()
    }
}

impl Drop for GenericObject {
    fn drop(&mut self) {
        unsafe {
            (self.ty.vtable().drop_in_place)(self.ptr.as_ptr());
            dealloc(self.ptr.as_ptr(), layout_of(self.ty));
        }
    }
}

impl Clone for GenericObject {
    fn clone(&self) -> Self {
        Self::copy_of(self.as_const_ptr())
    }
}

impl PartialEq for GenericObject {
    fn eq(&self, other: &Self) -> bool {
        self.as_const_ptr().equals(&other.as_const_ptr())
    }
}

impl fmt::Debug for GenericObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GenericObject({})", self.ty.name())
    }
}

// Registration bounds every stored type to Send + Sync.
unsafe impl Send for GenericObject {}
unsafe impl Sync for GenericObject {}

/// Bytes available inline in a [`ScratchObject`] before falling back to
/// the heap.
pub const SCRATCH_INLINE_SIZE: usize = 128;

#[repr(align(16))]
struct InlineStorage([MaybeUninit<u8>; SCRATCH_INLINE_SIZE]);

/// Short-lived default-constructed value of a runtime type, kept inline
/// when it fits. Used by conversion functions that materialize an
/// intermediate of a type known only at runtime.
pub struct ScratchObject {
    inline: InlineStorage,
    heap: Option<NonNull<u8>>,
    ty: Type,
}

impl ScratchObject {
    /// Construct a default value of `ty` in scratch storage.
    pub fn new(ty: Type) -> Self {
        let use_heap = ty.padded_size() > SCRATCH_INLINE_SIZE || ty.align() > 16;
        let mut scratch = Self {
            inline: InlineStorage([MaybeUninit::uninit(); SCRATCH_INLINE_SIZE]),
            heap: None,
            ty,
        };
        if use_heap {
            let ptr =
                NonNull::new(unsafe { alloc(layout_of(ty)) }).expect("allocation failed");
            scratch.heap = Some(ptr);
        }
        unsafe { (ty.vtable().construct)(scratch.data_ptr()) };
        scratch
    }

    fn data_ptr(&self) -> *mut u8 {
        match self.heap {
            Some(ptr) => ptr.as_ptr(),
            None => self.inline.0.as_ptr() as *mut u8,
        }
    }

    /// Runtime type of the scratch value.
    pub fn data_type(&self) -> Type {
        self.ty
    }

    /// Immutable typed pointer to the scratch value.
    pub fn as_const_ptr(&self) -> TypedConstPtr {
        TypedConstPtr::from_raw(self.data_ptr(), self.ty)
    }

    /// Mutable typed pointer to the scratch value.
    pub fn as_ptr(&mut self) -> TypedPtr {
        TypedPtr::from_raw(self.data_ptr(), self.ty)
    }
}

impl Drop for ScratchObject {
    fn drop(&mut self) {
        unsafe { (self.ty.vtable().drop_in_place)(self.data_ptr()) };
        if let Some(ptr) = self.heap {
            unsafe { dealloc(ptr.as_ptr(), layout_of(self.ty)) };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generic_object_lifecycle() {
        let mut object = GenericObject::new(Type::of::<String>());
        assert_eq!(unsafe { object.get::<String>() }, "");

        let source = String::from("copied");
        object.deep_copy_from(TypedConstPtr::new(&source));
        assert_eq!(unsafe { object.get::<String>() }, "copied");
    }

    #[test]
    fn test_from_value_and_equality() {
        let a = GenericObject::from_value(41u32);
        let b = GenericObject::from_value(41u32);
        let c = GenericObject::from_value(42u32);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_ne!(a, GenericObject::from_value(41i32));
    }

    #[test]
    fn test_clone_is_deep() {
        let original = GenericObject::from_value(vec![1u8, 2, 3]);
        let cloned = original.clone();
        assert_eq!(original, cloned);
        assert_ne!(
            original.as_const_ptr().raw(),
            cloned.as_const_ptr().raw()
        );
    }

    #[test]
    fn test_scratch_inline_and_heap() {
        // A scalar fits inline.
        let scratch = ScratchObject::new(Type::of::<u64>());
        assert_eq!(unsafe { *scratch.as_const_ptr().get::<u64>() }, 0);

        // A Vec also fits inline; fill it through a typed pointer.
        let mut scratch = ScratchObject::new(Type::of::<Vec<i32>>());
        assert!(scratch.as_ptr().resize_sequence(2));
        assert_eq!(scratch.as_const_ptr().sequence_len(), Some(2));
    }
}
