// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 recast contributors

//! # recast - Runtime Type-Conversion Engine
//!
//! Composes, compiles and executes conversions between values whose types
//! are known only at runtime (through the `recast-rtti` type facility).
//! Clients hold typed pointers, describe intent as a sequence of up to two
//! named operations, compile the sequence against concrete source and
//! destination types, and repeatedly execute the resulting
//! [`CompiledOperation`].
//!
//! ## Quick Start
//!
//! ```rust
//! use recast::{format, OperationSequence};
//! use recast_rtti::{Type, TypedConstPtr, TypedPtr};
//!
//! // "convert an i32 to its hex string form"
//! let mut sequence = OperationSequence::from_names("ToString", None, None)?;
//! sequence.set_parameter_value(0, TypedConstPtr::new(&format::HEX));
//!
//! let compiled = sequence.compile(false, Some(Type::of::<i32>()), Some(Type::of::<String>()))?;
//!
//! let input = 255i32;
//! let mut output = String::new();
//! compiled.convert(TypedConstPtr::new(&input), TypedPtr::new(&mut output))?;
//! assert_eq!(output, "ff");
//! # Ok::<(), recast::Error>(())
//! ```
//!
//! ## Architecture
//!
//! ```text
//! +--------------------------------------------------------------------+
//! |                        Client Intent                               |
//! |    OperationSequence (up to two named ops + parameters)            |
//! +--------------------------------------------------------------------+
//! |                        Sequence Compiler                           |
//! |    ambiguity resolution | type inference | implicit casts | fusion |
//! +--------------------------------------------------------------------+
//! |                        Execution                                   |
//! |    CompiledOperation::convert / convert_ref + CurrentOp callbacks  |
//! +--------------------------------------------------------------------+
//! |                        Registries                                  |
//! |    named operations | static casts | runtime types (recast-rtti)   |
//! +--------------------------------------------------------------------+
//! ```

/// The flattened, optimized form of a compiled sequence.
mod compiled;
/// The four-phase sequence compiler.
mod compiler;
/// The library of pre-registered conversion operations.
mod defined;
/// Reusable operation families (const offset, free function).
mod definition;
/// Engine error types.
mod error;
/// Conversion options: one (source, destination) recipe each.
mod option;
/// The registered-operation contract and supporting value types.
mod operation;
/// Process-wide operation and static-cast registries.
mod registry;
/// The static-cast engine.
mod static_cast;
/// Conversion operation sequences and their wire format.
mod sequence;

#[cfg(test)]
mod tests;

pub use compiled::{CompiledOperation, CurrentOp};
pub use defined::to_string_flags as format;
pub use definition::const_offset_operation;
pub use error::{Error, Result};
pub use operation::{
    ConversionOperation, ParameterDefinition, SingleOptionOperation, SupportedTypes, TypeFilter,
};
pub use option::{ConversionOption, ConvertFn, GetRefFn, OptionKind};
pub use registry::{register_operation, registry, OperationRegistry, StaticCast};
pub use sequence::OperationSequence;
pub use static_cast::{
    register_cast, register_cast_bidirectional, register_ref_cast, register_ref_cast_variable,
    register_vector_cast, CastFrom, RefCast, StaticCastOperation, STATIC_CAST_NAME,
};
