// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 recast contributors

//! # recast-rtti - Runtime Type Information
//!
//! Runtime type descriptors and type-erased data access for the recast
//! conversion engine. Types are registered once per process and referenced
//! through cheap copyable [`Type`] handles; behavior (construction, deep
//! copy, serialization, sequence access) is dispatched through a per-type
//! vtable of monomorphized shims.
//!
//! # Example
//!
//! ```rust
//! use recast_rtti::{Type, GenericObject, TypedConstPtr};
//!
//! let int_type = Type::of::<i32>();
//! assert_eq!(int_type.name(), "i32");
//! assert_eq!(int_type.size(), 4);
//!
//! let value = 42i32;
//! let ptr = TypedConstPtr::new(&value);
//! let copy = GenericObject::copy_of(ptr);
//! assert_eq!(unsafe { *copy.get::<i32>() }, 42);
//! ```

/// Owned runtime-typed values and scratch construction.
mod generic;
/// Type registration builder and vtable shims.
mod registration;
/// Process-wide type table and builtin type bootstrap.
mod registry;
/// Byte buffers, binary streams and formatted string streams.
mod streams;
/// `Type` handles, descriptors, trait flags and vtables.
mod type_info;
/// Typed raw pointers with vtable dispatch.
mod typed_ptr;

pub use generic::{GenericObject, ScratchObject, SCRATCH_INLINE_SIZE};
pub use registration::{
    register_array_type, register_list_type, register_tuple2_type, register_tuple3_type,
    RuntimeType, TypeRegistration,
};
pub use registry::ensure_builtin_types;
pub use streams::{
    format, BinaryReader, BinaryWriter, BinarySerializable, MemoryBuffer, StreamError,
    StringReader, StringSerializable, StringWriter, STACK_BUFFER_SIZE,
};
pub use type_info::{
    trait_flags, BinaryVTable, SequenceVTable, StringVTable, TupleField, Type, TypeInfo,
    TypeVTable,
};
pub use typed_ptr::{TypedConstPtr, TypedPtr};
