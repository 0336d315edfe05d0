// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 recast contributors

//! The sequence compiler.
//!
//! `OperationSequence::compile` turns a sequence plus concrete source and
//! destination types into a [`CompiledOperation`] in four phases:
//!
//! 1. re-resolve slots whose name lookup was ambiguous, now that types
//!    are known;
//! 2. infer missing source/destination/intermediate types from the
//!    operations' fixed single types;
//! 3. acquire up to two conversion options, inserting implicit casts
//!    where the sequence leaves gaps;
//! 4. validate offsets, fuse the options into the compiled form and
//!    materialize parameters.
//!
//! Compilation never mutates the registries; every error leaves them
//! unchanged.

use crate::compiled::{CompiledOperation, CompiledSlot, StepFn};
use crate::error::{Error, Result};
use crate::operation::ConversionOperation;
use crate::option::{ConversionOption, OptionKind};
use crate::registry::registry;
use crate::sequence::OperationSequence;
use crate::static_cast::StaticCastOperation;
use recast_rtti::{GenericObject, StringReader, Type};
use std::sync::Arc;

/// Const offsets at or above this value are reserved.
const MAX_CONST_OFFSET: usize = (u32::MAX / 2) as usize;

fn incompatible(source: Type, destination: Type) -> Error {
    Error::Incompatible {
        source: source.name().to_string(),
        destination: destination.name().to_string(),
    }
}

impl OperationSequence {
    /// Compile the sequence into a single optimized operation.
    ///
    /// `allow_alias` permits results that reference the source object;
    /// without it an extra deep copy severs any alias. `source` and
    /// `destination` may be omitted when the first (respectively last)
    /// operation fixes them.
    pub fn compile(
        &self,
        allow_alias: bool,
        source: Option<Type>,
        destination: Option<Type>,
    ) -> Result<CompiledOperation> {
        let registry = registry();

        // Phase 1: resolve ambiguous name lookups with the known types.
        let mut first_op = self.slots[0].operation.clone();
        if first_op.is_some() && self.slots[0].ambiguous {
            let step_source = source.ok_or(Error::TypeUnspecified("source"))?;
            let step_destination = if self.size() == 2 {
                self.intermediate_type
                    .ok_or(Error::TypeUnspecified("intermediate"))?
            } else {
                destination.ok_or(Error::TypeUnspecified("destination"))?
            };
            let name = self.operation_name(0).expect("slot has an operation");
            first_op = Some(registry.find(name, step_source, step_destination)?);
        }
        let mut second_op = self.slots[1].operation.clone();
        if second_op.is_some() && self.slots[1].ambiguous {
            let step_source = self
                .intermediate_type
                .ok_or(Error::TypeUnspecified("intermediate"))?;
            let step_destination = destination.ok_or(Error::TypeUnspecified("destination"))?;
            let name = self.operation_name(1).expect("slot has an operation");
            second_op = Some(registry.find(name, step_source, step_destination)?);
        }

        // Phase 2: infer missing types from fixed single types.
        let source_type = match source {
            Some(ty) => ty,
            None => first_op
                .as_ref()
                .and_then(|op| op.supported_sources().single_type())
                .ok_or(Error::TypeUnspecified("source"))?,
        };
        let destination_type = match destination {
            Some(ty) => ty,
            None => second_op
                .as_ref()
                .or(first_op.as_ref())
                .and_then(|op| op.supported_destinations().single_type())
                .ok_or(Error::TypeUnspecified("destination"))?,
        };
        let mut intermediate_type = self.intermediate_type;
        if intermediate_type.is_none() && second_op.is_some() {
            intermediate_type = first_op
                .as_ref()
                .and_then(|op| op.supported_destinations().single_type())
                .or_else(|| {
                    second_op
                        .as_ref()
                        .and_then(|op| op.supported_sources().single_type())
                });
            if intermediate_type.is_none() {
                return Err(Error::TypeUnspecified("intermediate"));
            }
        }

        // Phase 3: acquire conversion options, inserting implicit casts
        // where the sequence leaves gaps.
        let parameter_first = self.parameter_value(0);
        let parameter_second = self.parameter_value(1);
        let conversion_first: ConversionOption;
        let mut conversion_second: Option<ConversionOption> = None;

        if first_op.is_none() {
            // No operations: identity or implicit cast chain.
            if source_type == destination_type {
                conversion_first =
                    ConversionOption::const_offset(source_type, destination_type, 0);
            } else {
                let (first, second) =
                    StaticCastOperation::implicit_options(source_type, destination_type);
                conversion_first =
                    first.ok_or_else(|| incompatible(source_type, destination_type))?;
                conversion_second = second;
            }
        } else if Arc::ptr_eq(
            first_op.as_ref().expect("checked above"),
            registry.for_each_operation(),
        ) {
            // For-each applies the second operation (or an implicit
            // element cast) element-wise.
            let element_source = source_type
                .element_type()
                .ok_or_else(|| incompatible(source_type, destination_type))?;
            let element_destination = destination_type
                .element_type()
                .ok_or_else(|| incompatible(source_type, destination_type))?;
            let element_option = match &second_op {
                Some(op) => op
                    .conversion_option(element_source, element_destination, parameter_second)
                    .ok_or_else(|| incompatible(element_source, element_destination))?,
                None => StaticCastOperation::implicit_option(element_source, element_destination)
                    .ok_or_else(|| incompatible(element_source, element_destination))?,
            };
            conversion_first = first_op
                .as_ref()
                .expect("checked above")
                .conversion_option(source_type, destination_type, parameter_first)
                .ok_or_else(|| incompatible(source_type, destination_type))?;
            conversion_second = Some(element_option);
        } else if let Some(second) = &second_op {
            // Two operations: both must serve their leg.
            let intermediate = intermediate_type.expect("inferred in phase 2");
            let first = first_op
                .as_ref()
                .expect("checked above")
                .conversion_option(source_type, intermediate, parameter_first);
            let second = second.conversion_option(intermediate, destination_type, parameter_second);
            match (first, second) {
                (Some(first), Some(second)) => {
                    conversion_first = first;
                    conversion_second = Some(second);
                }
                _ => return Err(incompatible(source_type, destination_type)),
            }
        } else {
            // One operation: direct, or bracketed by an implicit cast on
            // the side whose type the operation does not fix.
            let operation = first_op.as_ref().expect("checked above");
            match operation.conversion_option(source_type, destination_type, parameter_first) {
                Some(direct) => conversion_first = direct,
                None => {
                    let mut bracketed = None;
                    let mut attempted = false;
                    if operation.supported_sources().single_type() == Some(source_type) {
                        if let Some(intermediate) = intermediate_type
                            .or_else(|| operation.supported_destinations().single_type())
                        {
                            attempted = true;
                            let first = operation.conversion_option(
                                source_type,
                                intermediate,
                                parameter_first,
                            );
                            let second = StaticCastOperation::implicit_option(
                                intermediate,
                                destination_type,
                            );
                            if let (Some(first), Some(second)) = (first, second) {
                                bracketed = Some((first, second));
                            }
                        }
                    }
                    if bracketed.is_none()
                        && operation.supported_destinations().single_type()
                            == Some(destination_type)
                    {
                        if let Some(intermediate) = intermediate_type
                            .or_else(|| operation.supported_sources().single_type())
                        {
                            attempted = true;
                            let first = StaticCastOperation::implicit_option(
                                source_type,
                                intermediate,
                            );
                            let second = operation.conversion_option(
                                intermediate,
                                destination_type,
                                parameter_first,
                            );
                            if let (Some(first), Some(second)) = (first, second) {
                                bracketed = Some((first, second));
                            }
                        }
                    }
                    match bracketed {
                        Some((first, second)) => {
                            conversion_first = first;
                            conversion_second = Some(second);
                        }
                        None if attempted => {
                            return Err(incompatible(source_type, destination_type))
                        }
                        None => return Err(Error::TypeUnspecified("intermediate")),
                    }
                }
            }
        }

        // Phase 4: validate, fuse and materialize.
        let result = self.fuse(
            allow_alias,
            destination_type,
            conversion_first,
            conversion_second,
            first_op,
            second_op,
        )?;
        log::trace!(
            "compiled {:?} ({} -> {}) with flags {:#x}",
            self,
            source_type.name(),
            destination_type.name(),
            result.flags()
        );
        Ok(result)
    }

    fn fuse(
        &self,
        allow_alias: bool,
        destination_type: Type,
        conversion_first: ConversionOption,
        conversion_second: Option<ConversionOption>,
        first_op: Option<Arc<dyn ConversionOperation>>,
        second_op: Option<Arc<dyn ConversionOperation>>,
    ) -> Result<CompiledOperation> {
        let last = conversion_second.as_ref().unwrap_or(&conversion_first);
        for option in [&conversion_first, last] {
            if let Some(offset) = option.const_offset_value() {
                if offset > MAX_CONST_OFFSET {
                    return Err(Error::InvalidOffset(offset));
                }
            }
        }

        let mut result = CompiledOperation {
            slots: [
                CompiledSlot {
                    operation: first_op,
                    parameter: None,
                },
                CompiledSlot {
                    operation: second_op,
                    parameter: None,
                },
            ],
            type_after_first_offset: destination_type,
            intermediate_type: destination_type,
            destination_type: last.destination,
            function_first: None,
            function_final: None,
            fixed_offset_first: 0,
            fixed_offset_final: 0,
            flags: 0,
        };

        // Pure copy: both options are const offsets, the whole chain is
        // one deep copy at a shifted address.
        if conversion_first.is_const_offset() && last.is_const_offset() {
            result.type_after_first_offset = result.destination_type;
            result.intermediate_type = result.destination_type;
            let total = conversion_first.const_offset_value().unwrap_or(0)
                + conversion_second
                    .and_then(|option| option.const_offset_value())
                    .unwrap_or(0);
            result.fixed_offset_first = total as u32;
            result.flags =
                CompiledOperation::RESULT_INDEPENDENT | CompiledOperation::DEEPCOPY_ONLY;
            if allow_alias {
                result.flags |= CompiledOperation::RESULT_ALIASES_SOURCE_DIRECTLY;
            }
            self.materialize_parameters(&mut result)?;
            return Ok(result);
        }

        let mut conversion_first = conversion_first;
        let mut conversion_second = conversion_second;

        // A leading const offset folds into the initial pointer shift and
        // the second option becomes the only step.
        let first_is_const = conversion_first.is_const_offset();
        result.type_after_first_offset = if first_is_const {
            conversion_first.destination
        } else {
            conversion_first.source
        };
        if first_is_const {
            result.fixed_offset_first =
                conversion_first.const_offset_value().expect("const offset") as u32;
            result.flags |= CompiledOperation::FIRST_OPERATION_OPTIMIZED_AWAY;
            conversion_first = conversion_second
                .take()
                .expect("a lone const offset is the pure-copy case");
        }
        result.intermediate_type = conversion_first.destination;

        let first_aliases = matches!(conversion_first.kind, OptionKind::AliasesSource { .. });
        match conversion_first.kind {
            OptionKind::AliasesSource { first_fn, final_fn } if conversion_second.is_none() => {
                if allow_alias {
                    result.function_first = Some(StepFn::Convert(final_fn));
                    result.flags |= CompiledOperation::RESULT_ALIASES_SOURCE_INTERNALLY;
                } else {
                    // Run the aliasing step into an intermediate and
                    // sever the alias with a final deep copy.
                    result.function_first = Some(StepFn::Convert(first_fn));
                    result.flags |= CompiledOperation::RESULT_INDEPENDENT
                        | CompiledOperation::FINAL_DEEP_COPY_AFTER_FIRST_FN;
                }
            }
            OptionKind::Standard { first_fn, final_fn }
            | OptionKind::AliasesSource { first_fn, final_fn } => {
                result.function_first = Some(StepFn::Convert(if conversion_second.is_some() {
                    first_fn
                } else {
                    final_fn
                }));
                result.flags |= CompiledOperation::RESULT_INDEPENDENT;
                match conversion_second {
                    Some(second) => match second.kind {
                        OptionKind::Standard {
                            final_fn: second_final,
                            ..
                        } => result.function_final = Some(StepFn::Convert(second_final)),
                        OptionKind::ConstOffset { offset } => {
                            if offset == 0
                                && second.source == second.destination
                                && (!first_aliases || allow_alias)
                            {
                                // The second step is a no-op; drop it.
                                result.function_first = Some(StepFn::Convert(final_fn));
                                result.intermediate_type = result.destination_type;
                                if first_aliases {
                                    result.flags = (result.flags
                                        & !CompiledOperation::RESULT_INDEPENDENT)
                                        | CompiledOperation::RESULT_ALIASES_SOURCE_INTERNALLY;
                                }
                            } else {
                                result.flags |=
                                    CompiledOperation::FINAL_DEEP_COPY_AFTER_FIRST_FN;
                                result.fixed_offset_final = offset as u32;
                            }
                        }
                        OptionKind::VariableOffset {
                            first_fn: second_first,
                            ..
                        }
                        | OptionKind::AliasesSource {
                            first_fn: second_first,
                            ..
                        } => {
                            result.function_final = Some(StepFn::Convert(second_first));
                            result.flags |= CompiledOperation::FINAL_DEEP_COPY_AFTER_SECOND_FN;
                        }
                    },
                    None => {}
                }
            }
            OptionKind::VariableOffset {
                first_fn,
                get_ref_fn,
            } => {
                let reference_result = allow_alias
                    && conversion_second
                        .map_or(true, |second| {
                            !matches!(second.kind, OptionKind::Standard { .. })
                        });
                if reference_result {
                    if let Some(ConversionOption {
                        kind:
                            OptionKind::AliasesSource {
                                final_fn: second_final,
                                ..
                            },
                        ..
                    }) = conversion_second
                    {
                        result.flags |= CompiledOperation::RESULT_ALIASES_SOURCE_INTERNALLY;
                        result.function_first = Some(StepFn::Convert(first_fn));
                        result.function_final = Some(StepFn::Convert(second_final));
                    } else {
                        result.flags |= CompiledOperation::RESULT_ALIASES_SOURCE_DIRECTLY;
                        result.function_first = Some(StepFn::GetRef(get_ref_fn));
                        match conversion_second.map(|second| second.kind) {
                            Some(OptionKind::ConstOffset { offset }) => {
                                result.fixed_offset_final = offset as u32;
                            }
                            Some(OptionKind::VariableOffset {
                                get_ref_fn: second_ref,
                                ..
                            }) => {
                                result.function_final = Some(StepFn::GetRef(second_ref));
                            }
                            None => {}
                            Some(_) => unreachable!("excluded by reference_result"),
                        }
                    }
                } else {
                    result.function_first = Some(StepFn::Convert(first_fn));
                    result.flags |= CompiledOperation::RESULT_INDEPENDENT;
                    match conversion_second.map(|second| second.kind) {
                        None => {
                            result.flags |= CompiledOperation::FINAL_DEEP_COPY_AFTER_FIRST_FN;
                        }
                        Some(OptionKind::Standard {
                            final_fn: second_final,
                            ..
                        }) => result.function_final = Some(StepFn::Convert(second_final)),
                        Some(OptionKind::ConstOffset { offset }) => {
                            result.flags |= CompiledOperation::FINAL_DEEP_COPY_AFTER_FIRST_FN;
                            result.fixed_offset_final = offset as u32;
                        }
                        Some(OptionKind::VariableOffset {
                            first_fn: second_first,
                            ..
                        })
                        | Some(OptionKind::AliasesSource {
                            first_fn: second_first,
                            ..
                        }) => {
                            result.function_final = Some(StepFn::Convert(second_first));
                            result.flags |= CompiledOperation::FINAL_DEEP_COPY_AFTER_SECOND_FN;
                        }
                    }
                }
            }
            OptionKind::ConstOffset { .. } => {
                unreachable!("leading const offsets are folded above")
            }
        }

        self.materialize_parameters(&mut result)?;
        Ok(result)
    }

    /// Convert parameters into their declared types: matching values are
    /// deep-copied, strings are parsed through the declared type's string
    /// stream, anything else is an error.
    fn materialize_parameters(&self, result: &mut CompiledOperation) -> Result<()> {
        for index in 0..2 {
            let operation = match &result.slots[index].operation {
                Some(operation) => operation.clone(),
                None => continue,
            };
            let definition = match operation.parameter() {
                Some(definition) => definition,
                None => continue,
            };
            let value = match self.parameter_value(index) {
                Some(value) => value,
                None => continue,
            };
            if value.data_type() == definition.value_type() {
                result.slots[index].parameter = Some(GenericObject::copy_of(value));
            } else if value.data_type() == Type::of::<String>() {
                let mut object = GenericObject::new(definition.value_type());
                let mut reader = StringReader::new(unsafe { value.get::<String>() });
                object.as_ptr().parse_string(&mut reader)?;
                result.slots[index].parameter = Some(object);
            } else {
                return Err(Error::ParameterType {
                    parameter: definition.name().to_string(),
                });
            }
        }
        Ok(())
    }
}
