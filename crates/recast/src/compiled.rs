// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 recast contributors

//! Compiled conversion operations.
//!
//! A compiled operation is the fused, immutable result of resolving a
//! sequence against concrete types: at most two step functions, two fixed
//! byte offsets, and a flag word. Execution never allocates for dispatch;
//! each step is an indirect call through a plain function pointer.
//!
//! Step functions re-enter the engine through [`CurrentOp`], which knows
//! the compiled operation and the running step index. Calling
//! [`CurrentOp::continue_with`] hands the intermediate to the next step
//! or performs the final deep copy, as encoded in the flags.

use crate::error::Result;
use crate::operation::ConversionOperation;
use crate::option::{ConvertFn, GetRefFn};
use recast_rtti::{GenericObject, Type, TypedConstPtr, TypedPtr};
use std::fmt;
use std::sync::Arc;

/// One fused step: either a conversion function or a get-reference
/// function, distinguished by a small tag instead of a raw union.
#[derive(Clone, Copy)]
pub(crate) enum StepFn {
    Convert(ConvertFn),
    GetRef(GetRefFn),
}

#[derive(Default)]
pub(crate) struct CompiledSlot {
    pub(crate) operation: Option<Arc<dyn ConversionOperation>>,
    pub(crate) parameter: Option<GenericObject>,
}

/// Conversion operation compiled from up to two elementary operations and
/// optimized for repeated execution. Immutable and shareable across
/// threads.
pub struct CompiledOperation {
    pub(crate) slots: [CompiledSlot; 2],
    /// Data type at `source + fixed_offset_first`.
    pub(crate) type_after_first_offset: Type,
    /// Data type after the first conversion function (possibly the
    /// destination type).
    pub(crate) intermediate_type: Type,
    pub(crate) destination_type: Type,
    pub(crate) function_first: Option<StepFn>,
    pub(crate) function_final: Option<StepFn>,
    /// Fixed byte offsets. In the pure-copy case the deep copy happens at
    /// `source + fixed_offset_first` directly.
    pub(crate) fixed_offset_first: u32,
    pub(crate) fixed_offset_final: u32,
    pub(crate) flags: u32,
}

impl CompiledOperation {
    /// Deep copy into the destination after the first function returns,
    /// shifted by `fixed_offset_final`. Bit position doubles as the step
    /// index it follows.
    pub const FINAL_DEEP_COPY_AFTER_FIRST_FN: u32 = 1 << 0;
    /// Deep copy into the destination after the second function returns.
    pub const FINAL_DEEP_COPY_AFTER_SECOND_FN: u32 = 1 << 1;
    /// No function call at all: deep copy from `source +
    /// fixed_offset_first`.
    pub const DEEPCOPY_ONLY: u32 = 1 << 2;
    /// The first operation was folded into `fixed_offset_first`;
    /// parameter lookup for step 0 reads sequence slot 1.
    pub const FIRST_OPERATION_OPTIMIZED_AWAY: u32 = 1 << 3;
    /// The destination does not reference the source.
    pub const RESULT_INDEPENDENT: u32 = 1 << 29;
    /// The destination object owns storage that borrows from the source.
    pub const RESULT_ALIASES_SOURCE_INTERNALLY: u32 = 1 << 30;
    /// `convert_ref` is legal: the result is a pointer into the source.
    pub const RESULT_ALIASES_SOURCE_DIRECTLY: u32 = 1 << 31;

    /// Flag word of this compiled operation.
    pub fn flags(&self) -> u32 {
        self.flags
    }

    /// Data type after the first conversion function (possibly the
    /// destination type).
    pub fn intermediate_type(&self) -> Type {
        self.intermediate_type
    }

    /// Final data type.
    pub fn destination_type(&self) -> Type {
        self.destination_type
    }

    /// The materialized parameter of sequence slot `index`.
    pub fn parameter_value(&self, index: usize) -> Option<TypedConstPtr> {
        self.slots[index]
            .parameter
            .as_ref()
            .map(|parameter| parameter.as_const_ptr())
    }

    /// Perform the conversion, filling the provided destination.
    ///
    /// `source` must have the compiled source type and `destination` the
    /// compiled destination type; for performance no type checks are
    /// performed on the hot path.
    pub fn convert(&self, source: TypedConstPtr, destination: TypedPtr) -> Result<()> {
        assert!(
            self.flags
                & (Self::RESULT_INDEPENDENT | Self::RESULT_ALIASES_SOURCE_INTERNALLY)
                != 0,
            "conversion result must be materializable into a destination object"
        );
        let intermediate = source.rebased(
            self.fixed_offset_first as usize,
            self.type_after_first_offset,
        );
        if self.flags & Self::DEEPCOPY_ONLY != 0 {
            destination.deep_copy_from(intermediate);
            return Ok(());
        }
        let current = CurrentOp {
            compiled: self,
            index: 0,
        };
        match self.function_first {
            Some(StepFn::Convert(function)) => function(intermediate, destination, &current),
            _ => unreachable!("compiled operation without a first conversion function"),
        }
    }

    /// Perform the conversion without copying: returns a pointer into the
    /// source object. Only legal when
    /// [`RESULT_ALIASES_SOURCE_DIRECTLY`](Self::RESULT_ALIASES_SOURCE_DIRECTLY)
    /// is set; the result is valid only while the source is alive.
    pub fn convert_ref(&self, source: TypedConstPtr) -> Result<TypedConstPtr> {
        assert!(
            self.flags & Self::RESULT_ALIASES_SOURCE_DIRECTLY != 0,
            "convert_ref requires a directly-aliasing compiled operation"
        );
        let mut result = source.rebased(
            self.fixed_offset_first as usize,
            self.type_after_first_offset,
        );
        if let Some(StepFn::GetRef(first)) = self.function_first {
            result = first(
                result,
                &CurrentOp {
                    compiled: self,
                    index: 0,
                },
            )?;
            if let Some(StepFn::GetRef(second)) = self.function_final {
                result = second(
                    result,
                    &CurrentOp {
                        compiled: self,
                        index: 1,
                    },
                )?;
            }
        }
        Ok(result.rebased(self.fixed_offset_final as usize, self.destination_type))
    }
}

impl fmt::Debug for CompiledOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "CompiledOperation(-> {}, flags {:#x})",
            self.destination_type.name(),
            self.flags
        )
    }
}

/// Data about the running step of a compiled conversion. Passed to every
/// step function to reach parameters and continue the chain.
pub struct CurrentOp<'a> {
    pub(crate) compiled: &'a CompiledOperation,
    /// Index of the running step; decides the next action and which
    /// parameter slot applies.
    pub(crate) index: u32,
}

impl CurrentOp<'_> {
    /// Continue the conversion with the result of the current step.
    ///
    /// `intermediate` must have the intermediate (or destination) type of
    /// the chain. Depending on the compiled flags this either performs
    /// the final deep copy (shifted by the final fixed offset) or invokes
    /// the next conversion function.
    pub fn continue_with(&self, intermediate: TypedConstPtr, destination: TypedPtr) -> Result<()> {
        let next = self.index + 1;
        // The two deep-copy flags occupy bits 0 and 1, matching the step
        // index they follow.
        if self.compiled.flags & next != 0 {
            let shifted = intermediate.rebased(
                self.compiled.fixed_offset_final as usize,
                destination.data_type(),
            );
            destination.deep_copy_from(shifted);
            return Ok(());
        }
        let current = CurrentOp {
            compiled: self.compiled,
            index: next,
        };
        match self.compiled.function_final {
            Some(StepFn::Convert(function)) => function(intermediate, destination, &current),
            _ => unreachable!("conversion chain continued past its final step"),
        }
    }

    /// The parameter of the running step's sequence slot; `None` means
    /// the operation should use its default. When the first operation was
    /// folded into a fixed offset, step 0 reads sequence slot 1.
    pub fn parameter(&self) -> Option<TypedConstPtr> {
        let slot = if self.compiled.flags & CompiledOperation::FIRST_OPERATION_OPTIMIZED_AWAY != 0
        {
            1
        } else {
            self.index as usize
        };
        self.compiled.parameter_value(slot)
    }

    /// Data type after the first conversion function; conversion
    /// functions use this to materialize intermediates of runtime type.
    pub fn intermediate_type(&self) -> Type {
        self.compiled.intermediate_type
    }

    /// The registered operation of the running step, when known.
    pub fn operation(&self) -> Option<&Arc<dyn ConversionOperation>> {
        self.compiled.slots[self.index as usize].operation.as_ref()
    }
}
