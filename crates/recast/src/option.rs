// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 recast contributors

//! Conversion options.
//!
//! A conversion option is one concrete recipe for converting a fixed
//! (source, destination) type pair, tagged by execution strategy. A
//! registered operation may produce different options for different
//! pairs; the compiler selects and fuses up to two of them.

use crate::compiled::CurrentOp;
use crate::error::Result;
use recast_rtti::{Type, TypedConstPtr, TypedPtr};

/// Conversion step entry point.
///
/// `first_fn` variants write into a caller-supplied intermediate and then
/// invoke [`CurrentOp::continue_with`]; `final_fn` variants write directly
/// into the destination.
pub type ConvertFn = fn(TypedConstPtr, TypedPtr, &CurrentOp<'_>) -> Result<()>;

/// Entry point resolving a variable offset into the source object. The
/// returned pointer aliases the source; `continue_with` must not be
/// called.
pub type GetRefFn = fn(TypedConstPtr, &CurrentOp<'_>) -> Result<TypedConstPtr>;

/// Execution strategy of one conversion option.
#[derive(Clone, Copy)]
pub enum OptionKind {
    /// Plain conversion function with no reference to the source.
    ///
    /// Overhead: one indirect call, plus intermediate construction and a
    /// copy when used as the first step of a pair.
    Standard {
        first_fn: ConvertFn,
        final_fn: ConvertFn,
    },

    /// Destination data lives inside the source object at a fixed byte
    /// offset. Preferred option: reduces to a deep copy, or to pure
    /// pointer arithmetic as a first step.
    ConstOffset { offset: usize },

    /// Destination data lives inside the source object at an offset
    /// resolved per call (e.g. a vector element).
    VariableOffset {
        first_fn: ConvertFn,
        get_ref_fn: GetRefFn,
    },

    /// Conversion function whose result wraps or borrows source storage;
    /// the destination is only valid while the source is alive.
    AliasesSource {
        first_fn: ConvertFn,
        final_fn: ConvertFn,
    },
}

/// One concrete conversion recipe for a (source, destination) pair.
#[derive(Clone, Copy)]
pub struct ConversionOption {
    pub source: Type,
    pub destination: Type,
    pub kind: OptionKind,
}

impl ConversionOption {
    /// Standard conversion-function option.
    pub fn standard(
        source: Type,
        destination: Type,
        first_fn: ConvertFn,
        final_fn: ConvertFn,
    ) -> Self {
        Self {
            source,
            destination,
            kind: OptionKind::Standard { first_fn, final_fn },
        }
    }

    /// Constant-offset option. Requires `offset + destination.size() <=
    /// source.size()`: the destination value lies inside the source.
    pub fn const_offset(source: Type, destination: Type, offset: usize) -> Self {
        debug_assert!(
            offset + destination.size() <= source.size(),
            "const offset {} with {} does not fit inside {}",
            offset,
            destination.name(),
            source.name()
        );
        Self {
            source,
            destination,
            kind: OptionKind::ConstOffset { offset },
        }
    }

    /// Variable-offset option.
    pub fn variable_offset(
        source: Type,
        destination: Type,
        first_fn: ConvertFn,
        get_ref_fn: GetRefFn,
    ) -> Self {
        Self {
            source,
            destination,
            kind: OptionKind::VariableOffset {
                first_fn,
                get_ref_fn,
            },
        }
    }

    /// Option whose result references the source object.
    pub fn aliasing(
        source: Type,
        destination: Type,
        first_fn: ConvertFn,
        final_fn: ConvertFn,
    ) -> Self {
        Self {
            source,
            destination,
            kind: OptionKind::AliasesSource { first_fn, final_fn },
        }
    }

    /// The constant offset when this is a const-offset option.
    pub fn const_offset_value(&self) -> Option<usize> {
        match self.kind {
            OptionKind::ConstOffset { offset } => Some(offset),
            _ => None,
        }
    }

    /// Is this a const-offset option?
    pub fn is_const_offset(&self) -> bool {
        matches!(self.kind, OptionKind::ConstOffset { .. })
    }
}

impl std::fmt::Debug for ConversionOption {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match self.kind {
            OptionKind::Standard { .. } => "Standard",
            OptionKind::ConstOffset { .. } => "ConstOffset",
            OptionKind::VariableOffset { .. } => "VariableOffset",
            OptionKind::AliasesSource { .. } => "AliasesSource",
        };
        write!(
            f,
            "ConversionOption({} -> {}, {})",
            self.source.name(),
            self.destination.name(),
            kind
        )
    }
}
