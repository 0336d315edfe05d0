// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 recast contributors

//! Reusable operation families.
//!
//! Helpers for defining registered operations without writing the trait
//! impl by hand: constant-offset projections and conversions backed by a
//! plain function. Function-backed families are macros so the function
//! lands in the monomorphized step shims as a direct call, keeping
//! dispatch at plain `fn` pointers.

use crate::operation::SingleOptionOperation;
use crate::option::ConversionOption;
use recast_rtti::Type;

/// Operation performing a conversion by adding a constant byte offset to
/// the source address: the destination value lives inside the source
/// object. Very efficient, but layout changes in either type are on the
/// caller.
pub fn const_offset_operation<S: 'static, D: 'static>(
    name: impl Into<String>,
    offset: usize,
) -> SingleOptionOperation {
    SingleOptionOperation::new(
        name,
        ConversionOption::const_offset(Type::of::<S>(), Type::of::<D>(), offset),
    )
}

/// Define an operation from a value-returning function `fn(&S) -> D`.
/// Free functions and methods callable as `path(&S)` both work.
#[macro_export]
macro_rules! function_operation {
    ($name:expr, $source:ty => $destination:ty, $function:path) => {{
        fn first_fn(
            source: ::recast_rtti::TypedConstPtr,
            destination: ::recast_rtti::TypedPtr,
            op: &$crate::CurrentOp<'_>,
        ) -> $crate::Result<()> {
            let intermediate: $destination = $function(unsafe { source.get::<$source>() });
            op.continue_with(::recast_rtti::TypedConstPtr::new(&intermediate), destination)
        }
        fn final_fn(
            source: ::recast_rtti::TypedConstPtr,
            destination: ::recast_rtti::TypedPtr,
            _op: &$crate::CurrentOp<'_>,
        ) -> $crate::Result<()> {
            unsafe {
                *destination.get_mut::<$destination>() = $function(source.get::<$source>());
            }
            Ok(())
        }
        $crate::SingleOptionOperation::new(
            $name,
            $crate::ConversionOption::standard(
                ::recast_rtti::Type::of::<$source>(),
                ::recast_rtti::Type::of::<$destination>(),
                first_fn,
                final_fn,
            ),
        )
    }};
}

/// Define an operation from an output-parameter function
/// `fn(&S, &mut D)`.
#[macro_export]
macro_rules! assign_function_operation {
    ($name:expr, $source:ty => $destination:ty, $function:path) => {{
        fn first_fn(
            source: ::recast_rtti::TypedConstPtr,
            destination: ::recast_rtti::TypedPtr,
            op: &$crate::CurrentOp<'_>,
        ) -> $crate::Result<()> {
            let mut intermediate = <$destination as ::core::default::Default>::default();
            $function(unsafe { source.get::<$source>() }, &mut intermediate);
            op.continue_with(::recast_rtti::TypedConstPtr::new(&intermediate), destination)
        }
        fn final_fn(
            source: ::recast_rtti::TypedConstPtr,
            destination: ::recast_rtti::TypedPtr,
            _op: &$crate::CurrentOp<'_>,
        ) -> $crate::Result<()> {
            unsafe {
                $function(source.get::<$source>(), destination.get_mut::<$destination>());
            }
            Ok(())
        }
        $crate::SingleOptionOperation::new(
            $name,
            $crate::ConversionOption::standard(
                ::recast_rtti::Type::of::<$source>(),
                ::recast_rtti::Type::of::<$destination>(),
                first_fn,
                final_fn,
            ),
        )
    }};
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operation::ConversionOperation;
    use crate::registry::register_operation;
    use crate::sequence::OperationSequence;
    use recast_rtti::{TypedConstPtr, TypedPtr};
    use std::sync::Arc;

    fn double_it(value: &i32) -> i64 {
        (*value as i64) * 2
    }

    #[test]
    fn test_function_operation_end_to_end() {
        let operation = function_operation!("double", i32 => i64, double_it);
        assert_eq!(operation.name(), "double");
        register_operation(Arc::new(operation));

        let sequence = OperationSequence::from_names("double", None, None).unwrap();
        let compiled = sequence.compile(false, None, None).unwrap();

        let input = 21i32;
        let mut output = 0i64;
        compiled
            .convert(TypedConstPtr::new(&input), TypedPtr::new(&mut output))
            .unwrap();
        assert_eq!(output, 42);
    }

    fn stringify(value: &u16, out: &mut String) {
        *out = value.to_string();
    }

    #[test]
    fn test_assign_function_operation() {
        let operation = assign_function_operation!("stringify u16", u16 => String, stringify);
        register_operation(Arc::new(operation));

        let sequence = OperationSequence::from_names("stringify u16", None, None).unwrap();
        let compiled = sequence.compile(false, None, None).unwrap();

        let input = 9u16;
        let mut output = String::new();
        compiled
            .convert(TypedConstPtr::new(&input), TypedPtr::new(&mut output))
            .unwrap();
        assert_eq!(output, "9");
    }

    #[test]
    fn test_const_offset_operation_projects_tuple_head() {
        recast_rtti::register_tuple2_type::<u32, u32>();
        let operation = const_offset_operation::<(u32, u32), u32>("first of pair", 0);
        assert_eq!(
            operation.supported_destinations().single_type(),
            Some(recast_rtti::Type::of::<u32>())
        );
    }
}
