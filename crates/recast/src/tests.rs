// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 recast contributors

//! End-to-end scenarios over the pre-registered operation library, plus
//! the engine-wide invariants.

use crate::compiled::CompiledOperation;
use crate::error::Error;
use crate::sequence::OperationSequence;
use crate::static_cast::StaticCastOperation;
use recast_rtti::{
    format, register_tuple3_type, trait_flags, MemoryBuffer, Type, TypeRegistration,
    TypedConstPtr, TypedPtr,
};
use std::sync::Arc;

fn string_type() -> Type {
    Type::of::<String>()
}

#[test]
fn test_to_string_with_hex_flag() {
    // ToString of an integer with the Hex flag.
    let mut sequence = OperationSequence::from_names("ToString", None, None).unwrap();
    sequence.set_parameter_value(0, TypedConstPtr::new(&format::HEX));

    let compiled = sequence
        .compile(false, Some(Type::of::<i32>()), Some(string_type()))
        .unwrap();

    let input = 255i32;
    let mut output = String::new();
    compiled
        .convert(TypedConstPtr::new(&input), TypedPtr::new(&mut output))
        .unwrap();
    // Hex alone: no 0x prefix.
    assert_eq!(output, "ff");
    assert_ne!(compiled.flags() & CompiledOperation::RESULT_INDEPENDENT, 0);
}

#[test]
fn test_for_each_with_implicit_element_cast() {
    // ForEach alone over vectors; the element cast is implicit.
    let sequence = OperationSequence::from_names("For Each", None, None).unwrap();
    let compiled = sequence
        .compile(
            false,
            Some(Type::of::<Vec<i32>>()),
            Some(Type::of::<Vec<f64>>()),
        )
        .unwrap();

    let input = vec![1i32, 2, 3];
    let mut output: Vec<f64> = Vec::new();
    compiled
        .convert(TypedConstPtr::new(&input), TypedPtr::new(&mut output))
        .unwrap();
    assert_eq!(output, vec![1.0, 2.0, 3.0]);

    // Empty input produces empty output without touching elements.
    let input: Vec<i32> = Vec::new();
    let mut output = vec![9.0f64];
    compiled
        .convert(TypedConstPtr::new(&input), TypedPtr::new(&mut output))
        .unwrap();
    assert!(output.is_empty());
}

#[test]
fn test_get_list_element_with_string_parameter() {
    // List element access, index supplied as a decimal string.
    let mut sequence = OperationSequence::from_names("[]", None, None).unwrap();
    sequence.set_parameter_string(0, "2");

    let compiled = sequence
        .compile(false, Some(Type::of::<Vec<String>>()), Some(string_type()))
        .unwrap();

    let input: Vec<String> = ["a", "b", "c", "d"].iter().map(|s| s.to_string()).collect();
    let mut output = String::new();
    compiled
        .convert(TypedConstPtr::new(&input), TypedPtr::new(&mut output))
        .unwrap();
    assert_eq!(output, "c");

    // Too-short input raises at conversion time.
    let input = vec!["a".to_string()];
    let err = compiled
        .convert(TypedConstPtr::new(&input), TypedPtr::new(&mut output))
        .unwrap_err();
    assert_eq!(err, Error::IndexOutOfBounds { index: 2, len: 1 });
}

#[test]
fn test_zero_copy_wrap_with_binary_deserialization() {
    // Byte-vector wrap feeding binary deserialization, alias allowed.
    let sequence = OperationSequence::from_names(
        "Wrap",
        Some("Binary Deserialization"),
        Some(Type::of::<MemoryBuffer>()),
    )
    .unwrap();
    let compiled = sequence
        .compile(true, Some(Type::of::<Vec<u8>>()), Some(Type::of::<i32>()))
        .unwrap();

    // Deserialization is a standard function, so the result is
    // independent even though the wrap step aliases.
    assert_ne!(compiled.flags() & CompiledOperation::RESULT_INDEPENDENT, 0);
    assert_eq!(
        compiled.flags()
            & (CompiledOperation::RESULT_ALIASES_SOURCE_INTERNALLY
                | CompiledOperation::RESULT_ALIASES_SOURCE_DIRECTLY),
        0
    );

    let input = vec![0x2Au8, 0, 0, 0];
    let mut output = 0i32;
    compiled
        .convert(TypedConstPtr::new(&input), TypedPtr::new(&mut output))
        .unwrap();
    assert_eq!(output, 42);
}

#[test]
fn test_tuple_element_reference() {
    // Tuple element by index, direct (aliasing) conversion form.
    let tuple_type = register_tuple3_type::<i32, f64, String>();
    let mut sequence = OperationSequence::from_names("get", None, None).unwrap();
    sequence.set_parameter_value(0, TypedConstPtr::new(&1u32));

    let compiled = sequence
        .compile(true, Some(tuple_type), Some(Type::of::<f64>()))
        .unwrap();
    assert_ne!(
        compiled.flags() & CompiledOperation::RESULT_ALIASES_SOURCE_DIRECTLY,
        0
    );

    let input: (i32, f64, String) = (7, 2.75, "x".into());
    let result = compiled.convert_ref(TypedConstPtr::new(&input)).unwrap();
    assert_eq!(result.data_type(), Type::of::<f64>());
    assert_eq!(unsafe { *result.get::<f64>() }, 2.75);
    // The result points into the source tuple.
    assert_eq!(result.raw(), &input.1 as *const f64 as *const u8);
}

#[test]
fn test_unspecifiable_intermediate_type_is_rejected() {
    // Two operations whose adjacent ends are both filters leave the
    // intermediate uninferable.
    let sequence =
        OperationSequence::from_names("Binary Deserialization", Some("ToString"), None).unwrap();
    let err = sequence
        .compile(
            false,
            Some(Type::of::<MemoryBuffer>()),
            Some(string_type()),
        )
        .unwrap_err();
    assert_eq!(err, Error::TypeUnspecified("intermediate"));
}

#[test]
fn test_string_round_trip_chain_infers_intermediate() {
    // [ToString, String Deserialization] fixes String on both adjacent
    // ends, so the intermediate is inferable and the chain round-trips.
    let sequence =
        OperationSequence::from_names("ToString", Some("String Deserialization"), None).unwrap();
    let compiled = sequence
        .compile(false, Some(Type::of::<i32>()), Some(Type::of::<i32>()))
        .unwrap();

    let input = 255i32;
    let mut output = 0i32;
    compiled
        .convert(TypedConstPtr::new(&input), TypedPtr::new(&mut output))
        .unwrap();
    assert_eq!(output, 255);
}

#[test]
fn test_empty_sequence_identity_and_implicit_cast() {
    // Identity: deep copy only.
    let sequence = OperationSequence::new();
    let compiled = sequence
        .compile(false, Some(Type::of::<u32>()), Some(Type::of::<u32>()))
        .unwrap();
    assert_ne!(compiled.flags() & CompiledOperation::DEEPCOPY_ONLY, 0);

    let input = 11u32;
    let mut output = 0u32;
    compiled
        .convert(TypedConstPtr::new(&input), TypedPtr::new(&mut output))
        .unwrap();
    assert_eq!(output, 11);

    // Widening: one implicit cast.
    let compiled = sequence
        .compile(false, Some(Type::of::<u16>()), Some(Type::of::<u64>()))
        .unwrap();
    let input = 300u16;
    let mut output = 0u64;
    compiled
        .convert(TypedConstPtr::new(&input), TypedPtr::new(&mut output))
        .unwrap();
    assert_eq!(output, 300);

    // Narrowing is not implicit.
    let err = sequence
        .compile(false, Some(Type::of::<u64>()), Some(Type::of::<u16>()))
        .unwrap_err();
    assert!(matches!(err, Error::Incompatible { .. }));
}

#[test]
fn test_binary_serialization_round_trip() {
    let buffer_type = Type::of::<MemoryBuffer>();
    let sequence = OperationSequence::from_names("Binary Serialization", None, None).unwrap();
    let compiled = sequence
        .compile(false, Some(Type::of::<u64>()), Some(buffer_type))
        .unwrap();

    let input = 0x0102_0304_0506_0708u64;
    let mut buffer = MemoryBuffer::new();
    compiled
        .convert(TypedConstPtr::new(&input), TypedPtr::new(&mut buffer))
        .unwrap();
    assert_eq!(buffer.len(), 8);

    let sequence = OperationSequence::from_names("Binary Deserialization", None, None).unwrap();
    let compiled = sequence
        .compile(false, Some(buffer_type), Some(Type::of::<u64>()))
        .unwrap();
    let mut output = 0u64;
    compiled
        .convert(TypedConstPtr::new(&buffer), TypedPtr::new(&mut output))
        .unwrap();
    assert_eq!(output, input);
}

#[test]
fn test_size_operation() {
    let sequence = OperationSequence::from_names("size()", None, None).unwrap();
    let compiled = sequence
        .compile(false, Some(Type::of::<Vec<f32>>()), None)
        .unwrap();
    assert_eq!(compiled.destination_type(), Type::of::<usize>());

    let input = vec![1.0f32, 2.0];
    let mut output = 0usize;
    compiled
        .convert(TypedConstPtr::new(&input), TypedPtr::new(&mut output))
        .unwrap();
    assert_eq!(output, 2);
}

#[test]
fn test_array_to_vector() {
    let array_type = recast_rtti::register_array_type::<f64, 3>();
    let sequence = OperationSequence::from_names("To Vector", None, None).unwrap();
    let compiled = sequence
        .compile(false, Some(array_type), Some(Type::of::<Vec<f64>>()))
        .unwrap();

    let input = [1.5f64, 2.5, 3.5];
    let mut output: Vec<f64> = Vec::new();
    compiled
        .convert(TypedConstPtr::new(&input), TypedPtr::new(&mut output))
        .unwrap();
    assert_eq!(output, vec![1.5, 2.5, 3.5]);
}

#[test]
fn test_for_each_array_size_mismatch() {
    let source_type = recast_rtti::register_array_type::<i32, 3>();
    let destination_type = recast_rtti::register_array_type::<i64, 4>();

    let sequence = OperationSequence::from_names("For Each", None, None).unwrap();
    let compiled = sequence
        .compile(false, Some(source_type), Some(destination_type))
        .unwrap();

    let input = [1i32, 2, 3];
    let mut output = [0i64; 4];
    let err = compiled
        .convert(TypedConstPtr::new(&input), TypedPtr::new(&mut output))
        .unwrap_err();
    assert_eq!(
        err,
        Error::SizeMismatch {
            source: 3,
            destination: 4
        }
    );
}

#[test]
fn test_for_each_rejected_as_second_operation() {
    let sequence =
        OperationSequence::from_names("size()", Some("For Each"), None);
    // Lookup succeeds; the misuse shows up at compile time as an
    // incompatible chain (For Each never accepts scalar legs) or at
    // conversion time as MisuseFinal, depending on the types involved.
    let sequence = sequence.unwrap();
    let err = sequence
        .compile(
            false,
            Some(Type::of::<Vec<u8>>()),
            Some(Type::of::<Vec<u8>>()),
        )
        .unwrap_err();
    assert!(matches!(
        err,
        Error::Incompatible { .. } | Error::TypeUnspecified(_)
    ));
}

#[test]
fn test_for_each_as_final_step_raises_misuse() {
    // For Each fused as the second step compiles (both legs are lists)
    // but refuses to run: it is only meaningful as a leading step.
    let array_type = recast_rtti::register_array_type::<i32, 2>();
    let sequence = OperationSequence::from_names(
        "To Vector",
        Some("For Each"),
        Some(Type::of::<Vec<i32>>()),
    )
    .unwrap();
    let compiled = sequence
        .compile(false, Some(array_type), Some(Type::of::<Vec<i32>>()))
        .unwrap();

    let input = [1i32, 2];
    let mut output: Vec<i32> = Vec::new();
    let err = compiled
        .convert(TypedConstPtr::new(&input), TypedPtr::new(&mut output))
        .unwrap_err();
    assert_eq!(err, Error::MisuseFinal("For Each"));
}

#[test]
fn test_char_vector_string_conversions() {
    let sequence = OperationSequence::from_names("To Vector", None, None).unwrap();
    let compiled = sequence
        .compile(false, Some(string_type()), Some(Type::of::<Vec<char>>()))
        .unwrap();

    let input = String::from("abc");
    let mut chars: Vec<char> = Vec::new();
    compiled
        .convert(TypedConstPtr::new(&input), TypedPtr::new(&mut chars))
        .unwrap();
    assert_eq!(chars, vec!['a', 'b', 'c']);

    let sequence = OperationSequence::from_names("Make String", None, None).unwrap();
    let compiled = sequence.compile(false, None, None).unwrap();
    let mut output = String::new();
    compiled
        .convert(TypedConstPtr::new(&chars), TypedPtr::new(&mut output))
        .unwrap();
    assert_eq!(output, "abc");
}

#[test]
fn test_parameter_with_invalid_type_is_rejected() {
    let mut sequence = OperationSequence::from_names("ToString", None, None).unwrap();
    sequence.set_parameter_value(0, TypedConstPtr::new(&1.5f64));
    let err = sequence
        .compile(false, Some(Type::of::<i32>()), Some(string_type()))
        .unwrap_err();
    assert_eq!(
        err,
        Error::ParameterType {
            parameter: "Flags".to_string()
        }
    );
}

// -------------------------------------------------------------------
// Invariants
// -------------------------------------------------------------------

#[test]
fn test_invariant_options_echo_requested_types() {
    // Every non-None option returned by a registered operation carries
    // exactly the requested pair.
    let pairs = [
        (Type::of::<i32>(), string_type()),
        (Type::of::<Vec<u8>>(), Type::of::<u8>()),
        (Type::of::<Vec<i32>>(), Type::of::<Vec<f64>>()),
        (Type::of::<MemoryBuffer>(), Type::of::<f32>()),
    ];
    for operation in crate::registry::registry().operations() {
        for (source, destination) in pairs {
            if let Some(option) = operation.conversion_option(source, destination, None) {
                assert_eq!(option.source, source, "{}", operation.name());
                assert_eq!(option.destination, destination, "{}", operation.name());
            }
        }
    }
}

#[test]
fn test_invariant_result_flags() {
    let result_mask = CompiledOperation::RESULT_INDEPENDENT
        | CompiledOperation::RESULT_ALIASES_SOURCE_INTERNALLY
        | CompiledOperation::RESULT_ALIASES_SOURCE_DIRECTLY;

    let cases: Vec<(OperationSequence, Type, Type)> = vec![
        (
            OperationSequence::from_names("ToString", None, None).unwrap(),
            Type::of::<i32>(),
            string_type(),
        ),
        (
            OperationSequence::new(),
            Type::of::<u8>(),
            Type::of::<u64>(),
        ),
        (
            OperationSequence::from_names("Wrap", None, None).unwrap(),
            Type::of::<Vec<u8>>(),
            Type::of::<MemoryBuffer>(),
        ),
    ];
    for allow_alias in [false, true] {
        for (sequence, source, destination) in &cases {
            let compiled = sequence
                .compile(allow_alias, Some(*source), Some(*destination))
                .unwrap();
            // At least one result flag, and direct aliasing only when the
            // caller allowed aliasing at all.
            assert_ne!(compiled.flags() & result_mask, 0);
            if compiled.flags() & CompiledOperation::RESULT_ALIASES_SOURCE_DIRECTLY != 0 {
                assert!(allow_alias);
            }
        }
    }
}

#[test]
fn test_invariant_implicit_chain_connects() {
    let types = [
        Type::of::<i8>(),
        Type::of::<u16>(),
        Type::of::<i32>(),
        Type::of::<f32>(),
        Type::of::<f64>(),
        Type::of::<bool>(),
    ];
    for source in types {
        for destination in types {
            let (first, second) = StaticCastOperation::implicit_options(source, destination);
            if let (Some(first), Some(second)) = (first, second) {
                assert_eq!(first.destination, second.source);
                assert_eq!(first.source, source);
                assert_eq!(second.destination, destination);
            }
        }
    }
}

#[test]
fn test_invariant_static_cast_idempotence() {
    // A wrapper with an underlying type casts to itself as ConstOffset(0).
    #[derive(Default, Clone, PartialEq)]
    struct Ticks(u64);
    let ticks = TypeRegistration::<Ticks>::new("Ticks")
        .wraps(
            Type::of::<u64>(),
            trait_flags::CAST_TO_UNDERLYING_IMPLICIT
                | trait_flags::CAST_FROM_UNDERLYING_IMPLICIT,
        )
        .register();
    let option = StaticCastOperation::implicit_option(ticks, ticks).unwrap();
    assert_eq!(option.const_offset_value(), Some(0));
}

#[test]
fn test_compiled_operation_shared_across_threads() {
    let sequence = OperationSequence::from_names("ToString", None, None).unwrap();
    let compiled = Arc::new(
        sequence
            .compile(false, Some(Type::of::<u32>()), Some(string_type()))
            .unwrap(),
    );

    let workers: Vec<_> = (0..4)
        .map(|worker| {
            let compiled = compiled.clone();
            std::thread::spawn(move || {
                for i in 0..100u32 {
                    let value = worker * 1000 + i;
                    let mut output = String::new();
                    compiled
                        .convert(TypedConstPtr::new(&value), TypedPtr::new(&mut output))
                        .unwrap();
                    assert_eq!(output, value.to_string());
                }
            })
        })
        .collect();
    for worker in workers {
        worker.join().unwrap();
    }
}

#[test]
fn test_convert_after_wire_round_trip() {
    // Serialize a sequence, decode it, compile and run the decoded copy.
    let mut sequence = OperationSequence::from_names("[]", None, None).unwrap();
    sequence.set_parameter_value(0, TypedConstPtr::new(&1u32));

    let mut buffer = MemoryBuffer::new();
    let mut writer = recast_rtti::BinaryWriter::new(&mut buffer);
    sequence.encode(&mut writer).unwrap();

    let mut reader = recast_rtti::BinaryReader::new(buffer.as_slice());
    let decoded = OperationSequence::decode(&mut reader).unwrap();
    assert_eq!(decoded, sequence);

    let compiled = decoded
        .compile(false, Some(Type::of::<Vec<i16>>()), Some(Type::of::<i16>()))
        .unwrap();
    let input = vec![5i16, 6, 7];
    let mut output = 0i16;
    compiled
        .convert(TypedConstPtr::new(&input), TypedPtr::new(&mut output))
        .unwrap();
    assert_eq!(output, 6);
}
