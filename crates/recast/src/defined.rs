// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 recast contributors

//! Pre-registered conversion operations.
//!
//! The operation library installed at registry init: string and binary
//! (de)serialization, list/array element access, element-wise for-each,
//! array flattening, tuple projection, byte-vector wrapping, list size
//! and char-vector/string conversions. All of them work on runtime types
//! through the rtti vtables; none is specific to a compile-time type
//! except the fixed-pair operations expressed as `SingleOptionOperation`.

use crate::compiled::CurrentOp;
use crate::error::{Error, Result};
use crate::operation::{
    ConversionOperation, ParameterDefinition, SingleOptionOperation, SupportedTypes, TypeFilter,
};
use crate::option::ConversionOption;
use crate::registry::OperationRegistry;
use recast_rtti::{
    trait_flags, BinaryReader, BinaryWriter, MemoryBuffer, ScratchObject, StringReader,
    StringWriter, Type, TypedConstPtr, TypedPtr,
};
use std::sync::Arc;

/// Flag bits accepted by the `ToString` operation's `Flags` parameter,
/// mapped onto the string writer's format options.
pub mod to_string_flags {
    pub use recast_rtti::format::*;
}

/// Index parameter as needed at compile time: absent means 0, `u32` is
/// read directly, strings hold a decimal form.
fn compile_time_index(parameter: Option<TypedConstPtr>) -> Option<u32> {
    let parameter = match parameter {
        Some(parameter) => parameter,
        None => return Some(0),
    };
    if parameter.data_type() == Type::of::<u32>() {
        return Some(unsafe { *parameter.get::<u32>() });
    }
    if parameter.data_type() == Type::of::<String>() {
        return unsafe { parameter.get::<String>() }.trim().parse().ok();
    }
    None
}

/// Index parameter at conversion time; the compiler has already
/// materialized string parameters into the declared type.
fn runtime_index(op: &CurrentOp<'_>) -> usize {
    op.parameter()
        .map(|parameter| unsafe { *parameter.get::<u32>() } as usize)
        .unwrap_or(0)
}

// ---------------------------------------------------------------------
// ToString
// ---------------------------------------------------------------------

pub(crate) struct ToStringOperation {
    parameter: ParameterDefinition,
}

impl ToStringOperation {
    fn new() -> Self {
        Self {
            parameter: ParameterDefinition::new("Flags", Type::of::<u32>(), true),
        }
    }
}

fn to_string_render(source: TypedConstPtr, op: &CurrentOp<'_>) -> Result<String> {
    let flags = op
        .parameter()
        .map(|parameter| unsafe { *parameter.get::<u32>() })
        .unwrap_or(0);
    let mut writer = StringWriter::with_options(flags);
    source.format_string(&mut writer)?;
    Ok(writer.finish())
}

fn to_string_first(
    source: TypedConstPtr,
    destination: TypedPtr,
    op: &CurrentOp<'_>,
) -> Result<()> {
    let intermediate = to_string_render(source, op)?;
    op.continue_with(TypedConstPtr::new(&intermediate), destination)
}

fn to_string_final(
    source: TypedConstPtr,
    destination: TypedPtr,
    op: &CurrentOp<'_>,
) -> Result<()> {
    let text = to_string_render(source, op)?;
    unsafe { *destination.get_mut::<String>() = text };
    Ok(())
}

impl ConversionOperation for ToStringOperation {
    fn name(&self) -> &str {
        "ToString"
    }

    fn supported_sources(&self) -> SupportedTypes {
        SupportedTypes::Filter(TypeFilter::StringSerializable)
    }

    fn supported_destinations(&self) -> SupportedTypes {
        SupportedTypes::Single(Type::of::<String>())
    }

    fn parameter(&self) -> Option<&ParameterDefinition> {
        Some(&self.parameter)
    }

    fn conversion_option(
        &self,
        source: Type,
        destination: Type,
        _parameter: Option<TypedConstPtr>,
    ) -> Option<ConversionOption> {
        if source.has_trait(trait_flags::STRING_SERIALIZABLE)
            && destination == Type::of::<String>()
        {
            Some(ConversionOption::standard(
                source,
                destination,
                to_string_first,
                to_string_final,
            ))
        } else {
            None
        }
    }
}

// ---------------------------------------------------------------------
// String Deserialization
// ---------------------------------------------------------------------

pub(crate) struct StringDeserializationOperation;

fn string_deserialize_first(
    source: TypedConstPtr,
    destination: TypedPtr,
    op: &CurrentOp<'_>,
) -> Result<()> {
    let mut scratch = ScratchObject::new(op.intermediate_type());
    let mut reader = StringReader::new(unsafe { source.get::<String>() });
    scratch.as_ptr().parse_string(&mut reader)?;
    op.continue_with(scratch.as_const_ptr(), destination)
}

fn string_deserialize_final(
    source: TypedConstPtr,
    destination: TypedPtr,
    _op: &CurrentOp<'_>,
) -> Result<()> {
    let mut reader = StringReader::new(unsafe { source.get::<String>() });
    destination.parse_string(&mut reader)?;
    Ok(())
}

impl ConversionOperation for StringDeserializationOperation {
    fn name(&self) -> &str {
        "String Deserialization"
    }

    fn supported_sources(&self) -> SupportedTypes {
        SupportedTypes::Single(Type::of::<String>())
    }

    fn supported_destinations(&self) -> SupportedTypes {
        SupportedTypes::Filter(TypeFilter::StringSerializable)
    }

    fn conversion_option(
        &self,
        source: Type,
        destination: Type,
        _parameter: Option<TypedConstPtr>,
    ) -> Option<ConversionOption> {
        if destination.has_trait(trait_flags::STRING_SERIALIZABLE)
            && source == Type::of::<String>()
        {
            Some(ConversionOption::standard(
                source,
                destination,
                string_deserialize_first,
                string_deserialize_final,
            ))
        } else {
            None
        }
    }
}

// ---------------------------------------------------------------------
// Binary Serialization / Deserialization
// ---------------------------------------------------------------------

pub(crate) struct BinarySerializationOperation;

fn binary_serialize_first(
    source: TypedConstPtr,
    destination: TypedPtr,
    op: &CurrentOp<'_>,
) -> Result<()> {
    // The buffer's inline storage keeps small payloads on this frame's
    // stack; the intermediate handed onward references it.
    let mut buffer = MemoryBuffer::new();
    {
        let mut writer = BinaryWriter::new(&mut buffer);
        source.encode_binary(&mut writer)?;
    }
    op.continue_with(TypedConstPtr::new(&buffer), destination)
}

fn binary_serialize_final(
    source: TypedConstPtr,
    destination: TypedPtr,
    _op: &CurrentOp<'_>,
) -> Result<()> {
    let buffer = unsafe { destination.get_mut::<MemoryBuffer>() };
    let mut writer = BinaryWriter::new(buffer);
    source.encode_binary(&mut writer)?;
    Ok(())
}

impl ConversionOperation for BinarySerializationOperation {
    fn name(&self) -> &str {
        "Binary Serialization"
    }

    fn supported_sources(&self) -> SupportedTypes {
        SupportedTypes::Filter(TypeFilter::BinarySerializable)
    }

    fn supported_destinations(&self) -> SupportedTypes {
        SupportedTypes::Single(Type::of::<MemoryBuffer>())
    }

    fn conversion_option(
        &self,
        source: Type,
        destination: Type,
        _parameter: Option<TypedConstPtr>,
    ) -> Option<ConversionOption> {
        if source.has_trait(trait_flags::BINARY_SERIALIZABLE)
            && destination == Type::of::<MemoryBuffer>()
        {
            Some(ConversionOption::standard(
                source,
                destination,
                binary_serialize_first,
                binary_serialize_final,
            ))
        } else {
            None
        }
    }
}

pub(crate) struct BinaryDeserializationOperation;

fn binary_deserialize_first(
    source: TypedConstPtr,
    destination: TypedPtr,
    op: &CurrentOp<'_>,
) -> Result<()> {
    let mut scratch = ScratchObject::new(op.intermediate_type());
    let buffer = unsafe { source.get::<MemoryBuffer>() };
    let mut reader = BinaryReader::new(buffer.as_slice());
    scratch.as_ptr().decode_binary(&mut reader)?;
    op.continue_with(scratch.as_const_ptr(), destination)
}

fn binary_deserialize_final(
    source: TypedConstPtr,
    destination: TypedPtr,
    _op: &CurrentOp<'_>,
) -> Result<()> {
    let buffer = unsafe { source.get::<MemoryBuffer>() };
    let mut reader = BinaryReader::new(buffer.as_slice());
    destination.decode_binary(&mut reader)?;
    Ok(())
}

impl ConversionOperation for BinaryDeserializationOperation {
    fn name(&self) -> &str {
        "Binary Deserialization"
    }

    fn supported_sources(&self) -> SupportedTypes {
        SupportedTypes::Single(Type::of::<MemoryBuffer>())
    }

    fn supported_destinations(&self) -> SupportedTypes {
        SupportedTypes::Filter(TypeFilter::BinarySerializable)
    }

    fn conversion_option(
        &self,
        source: Type,
        destination: Type,
        _parameter: Option<TypedConstPtr>,
    ) -> Option<ConversionOption> {
        if destination.has_trait(trait_flags::BINARY_SERIALIZABLE)
            && source == Type::of::<MemoryBuffer>()
        {
            Some(ConversionOption::standard(
                source,
                destination,
                binary_deserialize_first,
                binary_deserialize_final,
            ))
        } else {
            None
        }
    }
}

// ---------------------------------------------------------------------
// [] - list element access
// ---------------------------------------------------------------------

pub(crate) struct GetListElementOperation {
    parameter: ParameterDefinition,
}

impl GetListElementOperation {
    fn new() -> Self {
        Self {
            parameter: ParameterDefinition::new("Index", Type::of::<u32>(), true),
        }
    }
}

fn list_element(source: TypedConstPtr, op: &CurrentOp<'_>) -> Result<TypedConstPtr> {
    let index = runtime_index(op);
    source.element(index).ok_or(Error::IndexOutOfBounds {
        index,
        len: source.sequence_len().unwrap_or(0),
    })
}

fn list_element_first(
    source: TypedConstPtr,
    destination: TypedPtr,
    op: &CurrentOp<'_>,
) -> Result<()> {
    let element = list_element(source, op)?;
    op.continue_with(element, destination)
}

fn list_element_get_ref(source: TypedConstPtr, op: &CurrentOp<'_>) -> Result<TypedConstPtr> {
    list_element(source, op)
}

impl ConversionOperation for GetListElementOperation {
    fn name(&self) -> &str {
        "[]"
    }

    fn supported_sources(&self) -> SupportedTypes {
        SupportedTypes::Filter(TypeFilter::GetListElement)
    }

    fn supported_destinations(&self) -> SupportedTypes {
        SupportedTypes::Filter(TypeFilter::GetListElement)
    }

    fn parameter(&self) -> Option<&ParameterDefinition> {
        Some(&self.parameter)
    }

    fn conversion_option(
        &self,
        source: Type,
        destination: Type,
        _parameter: Option<TypedConstPtr>,
    ) -> Option<ConversionOption> {
        if source.is_list_type() && source.element_type() == Some(destination) {
            Some(ConversionOption::variable_offset(
                source,
                destination,
                list_element_first,
                list_element_get_ref,
            ))
        } else {
            None
        }
    }
}

// ---------------------------------------------------------------------
// [] - array element access (constant offset, index checked at compile)
// ---------------------------------------------------------------------

pub(crate) struct GetArrayElementOperation {
    parameter: ParameterDefinition,
}

impl GetArrayElementOperation {
    fn new() -> Self {
        Self {
            parameter: ParameterDefinition::new("Index", Type::of::<u32>(), true),
        }
    }
}

impl ConversionOperation for GetArrayElementOperation {
    fn name(&self) -> &str {
        "[]"
    }

    fn supported_sources(&self) -> SupportedTypes {
        SupportedTypes::Filter(TypeFilter::GenericArrayCast)
    }

    fn supported_destinations(&self) -> SupportedTypes {
        SupportedTypes::Filter(TypeFilter::GenericArrayCast)
    }

    fn parameter(&self) -> Option<&ParameterDefinition> {
        Some(&self.parameter)
    }

    fn conversion_option(
        &self,
        source: Type,
        destination: Type,
        parameter: Option<TypedConstPtr>,
    ) -> Option<ConversionOption> {
        if !source.is_array() || source.element_type() != Some(destination) {
            return None;
        }
        let index = compile_time_index(parameter)? as usize;
        if index >= source.array_len()? {
            return None;
        }
        Some(ConversionOption::const_offset(
            source,
            destination,
            index * destination.size(),
        ))
    }
}

// ---------------------------------------------------------------------
// For Each
// ---------------------------------------------------------------------

/// Applies the second operation of the sequence (or an implicit element
/// cast) to every element. Only valid as the first step; the compiler
/// special-cases it.
pub(crate) struct ForEach;

impl ForEach {
    pub(crate) fn new() -> Self {
        Self
    }
}

fn for_each_first(
    source: TypedConstPtr,
    destination: TypedPtr,
    op: &CurrentOp<'_>,
) -> Result<()> {
    let len = source.sequence_len().ok_or_else(|| Error::Incompatible {
        source: source.data_type().name().to_string(),
        destination: destination.data_type().name().to_string(),
    })?;
    if !destination.resize_sequence(len) {
        return Err(Error::SizeMismatch {
            source: len,
            destination: destination.sequence_len().unwrap_or(0),
        });
    }
    for index in 0..len {
        let element = source
            .element(index)
            .expect("element within resized bounds");
        let slot = destination
            .element_mut(index)
            .expect("element within resized bounds");
        op.continue_with(element, slot)?;
    }
    Ok(())
}

fn for_each_final(
    _source: TypedConstPtr,
    _destination: TypedPtr,
    _op: &CurrentOp<'_>,
) -> Result<()> {
    Err(Error::MisuseFinal("For Each"))
}

impl ConversionOperation for ForEach {
    fn name(&self) -> &str {
        "For Each"
    }

    fn supported_sources(&self) -> SupportedTypes {
        SupportedTypes::Filter(TypeFilter::ForEach)
    }

    fn supported_destinations(&self) -> SupportedTypes {
        SupportedTypes::Filter(TypeFilter::ForEach)
    }

    fn conversion_option(
        &self,
        source: Type,
        destination: Type,
        _parameter: Option<TypedConstPtr>,
    ) -> Option<ConversionOption> {
        let sequence_like =
            |ty: Type| ty.is_list_type() || ty.is_array();
        if sequence_like(source) && sequence_like(destination) {
            Some(ConversionOption::standard(
                source,
                destination,
                for_each_first,
                for_each_final,
            ))
        } else {
            None
        }
    }
}

// ---------------------------------------------------------------------
// To Vector - array to vector
// ---------------------------------------------------------------------

pub(crate) struct ArrayToVectorOperation;

fn array_to_vector_fill(source: TypedConstPtr, destination: TypedPtr) -> Result<()> {
    let len = source.sequence_len().unwrap_or(0);
    destination.resize_sequence(len);
    for index in 0..len {
        let element = source.element(index).expect("element within bounds");
        destination
            .element_mut(index)
            .expect("element within resized bounds")
            .deep_copy_from(element);
    }
    Ok(())
}

fn array_to_vector_first(
    source: TypedConstPtr,
    destination: TypedPtr,
    op: &CurrentOp<'_>,
) -> Result<()> {
    let mut scratch = ScratchObject::new(op.intermediate_type());
    array_to_vector_fill(source, scratch.as_ptr())?;
    op.continue_with(scratch.as_const_ptr(), destination)
}

fn array_to_vector_final(
    source: TypedConstPtr,
    destination: TypedPtr,
    _op: &CurrentOp<'_>,
) -> Result<()> {
    array_to_vector_fill(source, destination)
}

impl ConversionOperation for ArrayToVectorOperation {
    fn name(&self) -> &str {
        "To Vector"
    }

    fn supported_sources(&self) -> SupportedTypes {
        SupportedTypes::Filter(TypeFilter::ArrayToVector)
    }

    fn supported_destinations(&self) -> SupportedTypes {
        SupportedTypes::Filter(TypeFilter::ArrayToVector)
    }

    fn conversion_option(
        &self,
        source: Type,
        destination: Type,
        _parameter: Option<TypedConstPtr>,
    ) -> Option<ConversionOption> {
        if source.is_array()
            && destination.is_list_type()
            && source.element_type() == destination.element_type()
        {
            Some(ConversionOption::standard(
                source,
                destination,
                array_to_vector_first,
                array_to_vector_final,
            ))
        } else {
            None
        }
    }
}

// ---------------------------------------------------------------------
// get - tuple element projection
// ---------------------------------------------------------------------

pub(crate) struct GetTupleElementOperation {
    parameter: ParameterDefinition,
}

impl GetTupleElementOperation {
    fn new() -> Self {
        Self {
            parameter: ParameterDefinition::new("Index", Type::of::<u32>(), true),
        }
    }
}

impl ConversionOperation for GetTupleElementOperation {
    fn name(&self) -> &str {
        "get"
    }

    fn supported_sources(&self) -> SupportedTypes {
        SupportedTypes::Filter(TypeFilter::GetTupleElement)
    }

    fn supported_destinations(&self) -> SupportedTypes {
        SupportedTypes::Filter(TypeFilter::All)
    }

    fn parameter(&self) -> Option<&ParameterDefinition> {
        Some(&self.parameter)
    }

    fn conversion_option(
        &self,
        source: Type,
        destination: Type,
        parameter: Option<TypedConstPtr>,
    ) -> Option<ConversionOption> {
        let layout = source.tuple_layout();
        if layout.is_empty() {
            return None;
        }
        let index = compile_time_index(parameter)? as usize;
        let field = layout.get(index)?;
        if field.element == destination {
            Some(ConversionOption::const_offset(
                source,
                destination,
                field.offset,
            ))
        } else {
            None
        }
    }
}

// ---------------------------------------------------------------------
// Wrap / size() / char-vector conversions (fixed-pair operations)
// ---------------------------------------------------------------------

fn wrap_first(source: TypedConstPtr, destination: TypedPtr, op: &CurrentOp<'_>) -> Result<()> {
    // Zero copy: the buffer aliases the vector's storage.
    let view = MemoryBuffer::view(unsafe { source.get::<Vec<u8>>() });
    op.continue_with(TypedConstPtr::new(&view), destination)
}

fn wrap_final(
    source: TypedConstPtr,
    destination: TypedPtr,
    _op: &CurrentOp<'_>,
) -> Result<()> {
    let view = MemoryBuffer::view(unsafe { source.get::<Vec<u8>>() });
    unsafe { *destination.get_mut::<MemoryBuffer>() = view };
    Ok(())
}

fn wrap_operation() -> SingleOptionOperation {
    SingleOptionOperation::new(
        "Wrap",
        ConversionOption::aliasing(
            Type::of::<Vec<u8>>(),
            Type::of::<MemoryBuffer>(),
            wrap_first,
            wrap_final,
        ),
    )
}

pub(crate) struct SizeOperation;

fn size_first(source: TypedConstPtr, destination: TypedPtr, op: &CurrentOp<'_>) -> Result<()> {
    let len = source.sequence_len().unwrap_or(0);
    op.continue_with(TypedConstPtr::new(&len), destination)
}

fn size_final(
    source: TypedConstPtr,
    destination: TypedPtr,
    _op: &CurrentOp<'_>,
) -> Result<()> {
    unsafe { *destination.get_mut::<usize>() = source.sequence_len().unwrap_or(0) };
    Ok(())
}

impl ConversionOperation for SizeOperation {
    fn name(&self) -> &str {
        "size()"
    }

    fn supported_sources(&self) -> SupportedTypes {
        SupportedTypes::Filter(TypeFilter::Lists)
    }

    fn supported_destinations(&self) -> SupportedTypes {
        SupportedTypes::Single(Type::of::<usize>())
    }

    fn conversion_option(
        &self,
        source: Type,
        destination: Type,
        _parameter: Option<TypedConstPtr>,
    ) -> Option<ConversionOption> {
        if source.is_list_type() && destination == Type::of::<usize>() {
            Some(ConversionOption::standard(
                source,
                destination,
                size_first,
                size_final,
            ))
        } else {
            None
        }
    }
}

fn string_to_chars_first(
    source: TypedConstPtr,
    destination: TypedPtr,
    op: &CurrentOp<'_>,
) -> Result<()> {
    let intermediate: Vec<char> = unsafe { source.get::<String>() }.chars().collect();
    op.continue_with(TypedConstPtr::new(&intermediate), destination)
}

fn string_to_chars_final(
    source: TypedConstPtr,
    destination: TypedPtr,
    _op: &CurrentOp<'_>,
) -> Result<()> {
    unsafe {
        *destination.get_mut::<Vec<char>>() = source.get::<String>().chars().collect();
    }
    Ok(())
}

fn string_to_vector_operation() -> SingleOptionOperation {
    SingleOptionOperation::new(
        "To Vector",
        ConversionOption::standard(
            Type::of::<String>(),
            Type::of::<Vec<char>>(),
            string_to_chars_first,
            string_to_chars_final,
        ),
    )
}

fn make_string_first(
    source: TypedConstPtr,
    destination: TypedPtr,
    op: &CurrentOp<'_>,
) -> Result<()> {
    let intermediate: String = unsafe { source.get::<Vec<char>>() }.iter().collect();
    op.continue_with(TypedConstPtr::new(&intermediate), destination)
}

fn make_string_final(
    source: TypedConstPtr,
    destination: TypedPtr,
    _op: &CurrentOp<'_>,
) -> Result<()> {
    unsafe {
        *destination.get_mut::<String>() = source.get::<Vec<char>>().iter().collect();
    }
    Ok(())
}

fn make_string_operation() -> SingleOptionOperation {
    SingleOptionOperation::new(
        "Make String",
        ConversionOption::standard(
            Type::of::<Vec<char>>(),
            Type::of::<String>(),
            make_string_first,
            make_string_final,
        ),
    )
}

/// Install every pre-registered operation except the singletons the
/// registry constructs itself (`static_cast`, `For Each`).
pub(crate) fn install(registry: &OperationRegistry) {
    registry.add_operation(Arc::new(ToStringOperation::new()));
    registry.add_operation(Arc::new(StringDeserializationOperation));
    registry.add_operation(Arc::new(BinarySerializationOperation));
    registry.add_operation(Arc::new(BinaryDeserializationOperation));
    registry.add_operation(Arc::new(GetListElementOperation::new()));
    registry.add_operation(Arc::new(GetArrayElementOperation::new()));
    registry.add_operation(Arc::new(ArrayToVectorOperation));
    registry.add_operation(Arc::new(GetTupleElementOperation::new()));
    registry.add_operation(Arc::new(wrap_operation()));
    registry.add_operation(Arc::new(SizeOperation));
    registry.add_operation(Arc::new(string_to_vector_operation()));
    registry.add_operation(Arc::new(make_string_operation()));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::registry;

    #[test]
    fn test_to_string_accepts_string_serializable_sources() {
        let op = ToStringOperation::new();
        let string = Type::of::<String>();
        assert!(op
            .conversion_option(Type::of::<i32>(), string, None)
            .is_some());
        assert!(op
            .conversion_option(Type::of::<f64>(), string, None)
            .is_some());
        // Wrong destination.
        assert!(op
            .conversion_option(Type::of::<i32>(), Type::of::<i64>(), None)
            .is_none());
    }

    #[test]
    fn test_binary_deserialization_destination_filter() {
        // Destination must be binary-serializable and source the buffer
        // type.
        let op = BinaryDeserializationOperation;
        assert!(op
            .conversion_option(Type::of::<MemoryBuffer>(), Type::of::<i32>(), None)
            .is_some());
        assert!(op
            .conversion_option(Type::of::<String>(), Type::of::<i32>(), None)
            .is_none());
    }

    #[test]
    fn test_list_element_option_kind() {
        let op = GetListElementOperation::new();
        let option = op
            .conversion_option(Type::of::<Vec<f64>>(), Type::of::<f64>(), None)
            .unwrap();
        assert!(matches!(
            option.kind,
            crate::option::OptionKind::VariableOffset { .. }
        ));
        // Element type mismatch.
        assert!(op
            .conversion_option(Type::of::<Vec<f64>>(), Type::of::<f32>(), None)
            .is_none());
    }

    #[test]
    fn test_array_element_const_offset() {
        let array = recast_rtti::register_array_type::<i32, 4>();
        let op = GetArrayElementOperation::new();

        let index = 2u32;
        let option = op
            .conversion_option(array, Type::of::<i32>(), Some(TypedConstPtr::new(&index)))
            .unwrap();
        assert_eq!(option.const_offset_value(), Some(8));

        // Out-of-range index yields no option.
        let index = 4u32;
        assert!(op
            .conversion_option(array, Type::of::<i32>(), Some(TypedConstPtr::new(&index)))
            .is_none());

        // String-form index is accepted.
        let index = String::from("1");
        let option = op
            .conversion_option(array, Type::of::<i32>(), Some(TypedConstPtr::new(&index)))
            .unwrap();
        assert_eq!(option.const_offset_value(), Some(4));
    }

    #[test]
    fn test_tuple_projection_offsets() {
        let tuple = recast_rtti::register_tuple3_type::<i32, f64, String>();
        let op = GetTupleElementOperation::new();

        let index = 1u32;
        let option = op
            .conversion_option(tuple, Type::of::<f64>(), Some(TypedConstPtr::new(&index)))
            .unwrap();
        assert_eq!(
            option.const_offset_value(),
            Some(tuple.tuple_layout()[1].offset)
        );

        // Type mismatch at the index yields no option.
        assert!(op
            .conversion_option(tuple, Type::of::<i32>(), Some(TypedConstPtr::new(&index)))
            .is_none());
    }

    #[test]
    fn test_for_each_rejects_non_sequences() {
        let for_each = ForEach::new();
        assert!(for_each
            .conversion_option(Type::of::<Vec<i32>>(), Type::of::<Vec<f64>>(), None)
            .is_some());
        assert!(for_each
            .conversion_option(Type::of::<i32>(), Type::of::<Vec<f64>>(), None)
            .is_none());
    }

    #[test]
    fn test_size_operation_pair() {
        let op = SizeOperation;
        assert!(op
            .conversion_option(Type::of::<Vec<u8>>(), Type::of::<usize>(), None)
            .is_some());
        assert!(op
            .conversion_option(Type::of::<Vec<u8>>(), Type::of::<u32>(), None)
            .is_none());
    }

    #[test]
    fn test_all_defined_operations_registered() {
        let names: Vec<String> = registry()
            .operations()
            .iter()
            .map(|op| op.name().to_string())
            .collect();
        for expected in [
            "static_cast",
            "For Each",
            "ToString",
            "String Deserialization",
            "Binary Serialization",
            "Binary Deserialization",
            "[]",
            "To Vector",
            "get",
            "Wrap",
            "size()",
            "Make String",
        ] {
            assert!(
                names.iter().any(|name| name == expected),
                "missing operation {:?}",
                expected
            );
        }
    }
}
