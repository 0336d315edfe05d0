// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 recast contributors

//! Conversion operation sequences.
//!
//! A sequence is the client-facing description of intent: up to two
//! registered operations, per-slot owned parameters, and an optional
//! intermediate type that disambiguates chains whose steps do not fix it.
//! Sequences are values (deep-copying clone, structural equality) and
//! have a compact wire format so producers and consumers can exchange
//! them; compiled operations are never serialized.

use crate::error::{Error, Result};
use crate::operation::{ConversionOperation, SupportedTypes, TypeFilter};
use crate::registry::registry;
use recast_rtti::{BinaryReader, BinaryWriter, GenericObject, Type, TypedConstPtr};
use std::sync::Arc;

/// Wire flags per serialized slot.
const WIRE_FULL_OPERATION: u8 = 1;
const WIRE_PARAMETER: u8 = 2;

pub(crate) struct Slot {
    pub(crate) operation: Option<Arc<dyn ConversionOperation>>,
    /// Name lookup matched several operations; the concrete one must be
    /// re-resolved with the types known at compile time.
    pub(crate) ambiguous: bool,
    pub(crate) parameter: Option<GenericObject>,
}

impl Slot {
    fn empty() -> Self {
        Self {
            operation: None,
            ambiguous: false,
            parameter: None,
        }
    }

    fn of(operation: Arc<dyn ConversionOperation>, ambiguous: bool) -> Self {
        Self {
            operation: Some(operation),
            ambiguous,
            parameter: None,
        }
    }
}

impl Clone for Slot {
    fn clone(&self) -> Self {
        Self {
            operation: self.operation.clone(),
            ambiguous: self.ambiguous,
            parameter: self.parameter.clone(),
        }
    }
}

/// Sequence of up to two conversion operations. May be empty (pure cast).
pub struct OperationSequence {
    pub(crate) slots: [Slot; 2],
    pub(crate) intermediate_type: Option<Type>,
}

impl OperationSequence {
    /// Empty sequence: compilation degenerates to an implicit cast.
    pub fn new() -> Self {
        Self {
            slots: [Slot::empty(), Slot::empty()],
            intermediate_type: None,
        }
    }

    /// Sequence of one operation.
    pub fn single(
        operation: Arc<dyn ConversionOperation>,
        intermediate_type: Option<Type>,
    ) -> Self {
        Self {
            slots: [Slot::of(operation, false), Slot::empty()],
            intermediate_type,
        }
    }

    /// Sequence of two operations. The intermediate type is needed when
    /// neither the first operation's destination nor the second's source
    /// is fixed.
    pub fn chain(
        first: Arc<dyn ConversionOperation>,
        second: Arc<dyn ConversionOperation>,
        intermediate_type: Option<Type>,
    ) -> Self {
        Self {
            slots: [Slot::of(first, false), Slot::of(second, false)],
            intermediate_type,
        }
    }

    /// Build a sequence from operation names. Ambiguous lookups are
    /// recorded rather than rejected so the concrete operation can be
    /// resolved at compile time from the then-known types.
    pub fn from_names(
        first: &str,
        second: Option<&str>,
        intermediate_type: Option<Type>,
    ) -> Result<Self> {
        let registry = registry();
        let (first_op, first_ambiguous) = registry
            .find_by_name(first)
            .ok_or_else(|| Error::UnknownOperation(first.to_string()))?;
        let mut sequence = Self {
            slots: [Slot::of(first_op, first_ambiguous), Slot::empty()],
            intermediate_type,
        };
        if let Some(second) = second {
            let (second_op, second_ambiguous) = registry
                .find_by_name(second)
                .ok_or_else(|| Error::UnknownOperation(second.to_string()))?;
            sequence.slots[1] = Slot::of(second_op, second_ambiguous);
        }
        Ok(sequence)
    }

    /// Number of operations in the chain.
    pub fn size(&self) -> usize {
        match (&self.slots[0].operation, &self.slots[1].operation) {
            (None, _) => 0,
            (Some(_), None) => 1,
            (Some(_), Some(_)) => 2,
        }
    }

    /// Name of the operation at `index`.
    pub fn operation_name(&self, index: usize) -> Option<&str> {
        self.slots[index]
            .operation
            .as_deref()
            .map(ConversionOperation::name)
    }

    /// The resolved operation at `index`; `None` when the slot is empty
    /// or its name lookup was ambiguous.
    pub fn resolved_operation(&self, index: usize) -> Option<&Arc<dyn ConversionOperation>> {
        let slot = &self.slots[index];
        if slot.ambiguous {
            None
        } else {
            slot.operation.as_ref()
        }
    }

    /// Type after the first operation, when specified.
    pub fn intermediate_type(&self) -> Option<Type> {
        self.intermediate_type
    }

    /// Set the parameter of the operation at `index`, deep-copying the
    /// value into owned storage.
    pub fn set_parameter_value(&mut self, index: usize, value: TypedConstPtr) {
        self.slots[index].parameter = Some(GenericObject::copy_of(value));
    }

    /// Set the parameter as a string; it is deserialized into the
    /// declared parameter type when the sequence is compiled.
    pub fn set_parameter_string(&mut self, index: usize, value: impl Into<String>) {
        self.slots[index].parameter = Some(GenericObject::from_value::<String>(value.into()));
    }

    /// Reset the parameter of the operation at `index` to its default.
    pub fn clear_parameter(&mut self, index: usize) {
        self.slots[index].parameter = None;
    }

    /// The stored parameter of the operation at `index`, if set.
    pub fn parameter_value(&self, index: usize) -> Option<TypedConstPtr> {
        self.slots[index]
            .parameter
            .as_ref()
            .map(|parameter| parameter.as_const_ptr())
    }

    /// Serialize to the wire format: a size byte, then per slot a flags
    /// byte followed by the operation (full descriptor or name) and any
    /// parameter, then the intermediate type when two operations are
    /// present.
    pub fn encode(&self, writer: &mut BinaryWriter<'_>) -> Result<()> {
        writer.write_u8(self.size() as u8);
        for index in 0..self.size() {
            let slot = &self.slots[index];
            let operation = slot.operation.as_ref().expect("slot within size");
            let full = !slot.ambiguous;
            let mut flags = 0u8;
            if full {
                flags |= WIRE_FULL_OPERATION;
            }
            if slot.parameter.is_some() {
                flags |= WIRE_PARAMETER;
            }
            writer.write_u8(flags);
            if full {
                encode_operation(operation.as_ref(), writer);
            } else {
                writer.write_str(operation.name());
            }
            if let Some(parameter) = &slot.parameter {
                parameter.as_const_ptr().encode_binary(writer)?;
            }
        }
        if self.size() == 2 {
            match self.intermediate_type {
                Some(ty) => writer.write_str(ty.name()),
                None => writer.write_str(""),
            }
        }
        Ok(())
    }

    /// Deserialize from the wire format. Unknown operations and
    /// structural violations are fatal.
    pub fn decode(reader: &mut BinaryReader<'_>) -> Result<Self> {
        let size = reader.read_u8()? as usize;
        if size > 2 {
            return Err(Error::MalformedWire(format!("sequence size {}", size)));
        }
        let mut sequence = OperationSequence::new();
        for index in 0..size {
            let flags = reader.read_u8()?;
            let (operation, ambiguous) = if flags & WIRE_FULL_OPERATION != 0 {
                (decode_operation(reader)?, false)
            } else {
                let name = reader.read_str()?;
                registry()
                    .find_by_name(&name)
                    .ok_or(Error::UnknownOperation(name))?
            };
            if flags & WIRE_PARAMETER != 0 {
                let definition = operation.parameter().ok_or_else(|| {
                    Error::MalformedWire(format!(
                        "operation {:?} carries a parameter but declares none",
                        operation.name()
                    ))
                })?;
                let mut parameter = GenericObject::new(definition.value_type());
                parameter.as_ptr().decode_binary(reader)?;
                sequence.slots[index].parameter = Some(parameter);
            }
            sequence.slots[index].operation = Some(operation);
            sequence.slots[index].ambiguous = ambiguous;
        }
        if size == 2 {
            let name = reader.read_str()?;
            if name.is_empty() {
                sequence.intermediate_type = None;
            } else {
                sequence.intermediate_type = Some(Type::by_name(&name).ok_or_else(|| {
                    Error::MalformedWire(format!("unknown intermediate type {:?}", name))
                })?);
            }
        }
        Ok(sequence)
    }
}

impl Default for OperationSequence {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for OperationSequence {
    /// Deep copy: parameters are duplicated into fresh owned storage.
    fn clone(&self) -> Self {
        Self {
            slots: self.slots.clone(),
            intermediate_type: self.intermediate_type,
        }
    }
}

impl PartialEq for OperationSequence {
    /// Structural equality: same operations (by identity), equal
    /// parameter values, and - for chains - the same intermediate type.
    /// Ambiguity bookkeeping does not participate.
    fn eq(&self, other: &Self) -> bool {
        if self.size() != other.size() {
            return false;
        }
        for index in 0..self.size() {
            let (a, b) = (&self.slots[index], &other.slots[index]);
            let same_operation = match (&a.operation, &b.operation) {
                (Some(x), Some(y)) => Arc::ptr_eq(x, y),
                (None, None) => true,
                _ => false,
            };
            if !same_operation {
                return false;
            }
            let same_parameter = match (&a.parameter, &b.parameter) {
                (Some(x), Some(y)) => x == y,
                (None, None) => true,
                _ => false,
            };
            if !same_parameter {
                return false;
            }
        }
        self.size() < 2 || self.intermediate_type == other.intermediate_type
    }
}

impl std::fmt::Debug for OperationSequence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = (0..self.size())
            .filter_map(|index| self.operation_name(index))
            .collect();
        write!(f, "OperationSequence({:?})", names)
    }
}

fn encode_supported_types(types: SupportedTypes, writer: &mut BinaryWriter<'_>) {
    match types {
        SupportedTypes::Single(ty) => {
            writer.write_u8(0);
            writer.write_str(ty.name());
        }
        SupportedTypes::Filter(filter) => writer.write_u8(filter.wire_tag()),
    }
}

fn decode_supported_types(reader: &mut BinaryReader<'_>) -> Result<SupportedTypes> {
    let tag = reader.read_u8()?;
    if tag == 0 {
        let name = reader.read_str()?;
        let ty = Type::by_name(&name)
            .ok_or_else(|| Error::MalformedWire(format!("unknown type {:?}", name)))?;
        Ok(SupportedTypes::Single(ty))
    } else {
        TypeFilter::from_wire_tag(tag)
            .map(SupportedTypes::Filter)
            .ok_or_else(|| Error::MalformedWire(format!("unknown type filter tag {}", tag)))
    }
}

/// Full wire descriptor of a registered operation: name plus both
/// supported-type encodings. The registry dictates this form; handles are
/// process-local and never serialized.
fn encode_operation(operation: &dyn ConversionOperation, writer: &mut BinaryWriter<'_>) {
    writer.write_str(operation.name());
    encode_supported_types(operation.supported_sources(), writer);
    encode_supported_types(operation.supported_destinations(), writer);
}

fn decode_operation(reader: &mut BinaryReader<'_>) -> Result<Arc<dyn ConversionOperation>> {
    let name = reader.read_str()?;
    let sources = decode_supported_types(reader)?;
    let destinations = decode_supported_types(reader)?;
    if name == crate::static_cast::STATIC_CAST_NAME {
        return Ok(registry().static_cast_operation());
    }
    registry()
        .operations()
        .into_iter()
        .find(|operation| {
            operation.name() == name
                && operation.supported_sources() == sources
                && operation.supported_destinations() == destinations
        })
        .ok_or_else(|| {
            Error::MalformedWire(format!("encoded conversion operation {:?} not found", name))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use recast_rtti::MemoryBuffer;

    #[test]
    fn test_size_and_names() {
        let sequence = OperationSequence::new();
        assert_eq!(sequence.size(), 0);

        let sequence = OperationSequence::from_names("ToString", None, None).unwrap();
        assert_eq!(sequence.size(), 1);
        assert_eq!(sequence.operation_name(0), Some("ToString"));

        let sequence = OperationSequence::from_names(
            "Binary Serialization",
            Some("Binary Deserialization"),
            Some(Type::of::<MemoryBuffer>()),
        )
        .unwrap();
        assert_eq!(sequence.size(), 2);
    }

    #[test]
    fn test_unknown_name_is_rejected() {
        let err = OperationSequence::from_names("definitely not registered", None, None)
            .unwrap_err();
        assert!(matches!(err, Error::UnknownOperation(_)));
    }

    #[test]
    fn test_ambiguous_lookup_is_recorded() {
        let sequence = OperationSequence::from_names("[]", None, None).unwrap();
        assert_eq!(sequence.operation_name(0), Some("[]"));
        assert!(sequence.resolved_operation(0).is_none());
    }

    #[test]
    fn test_clone_deep_copies_parameters() {
        let mut sequence = OperationSequence::from_names("ToString", None, None).unwrap();
        sequence.set_parameter_value(0, TypedConstPtr::new(&5u32));

        let cloned = sequence.clone();
        assert_eq!(sequence, cloned);
        assert_ne!(
            sequence.parameter_value(0).unwrap().raw(),
            cloned.parameter_value(0).unwrap().raw()
        );
    }

    #[test]
    fn test_equality_requires_parameter_equality() {
        let mut a = OperationSequence::from_names("ToString", None, None).unwrap();
        let mut b = OperationSequence::from_names("ToString", None, None).unwrap();
        assert_eq!(a, b);

        a.set_parameter_value(0, TypedConstPtr::new(&1u32));
        assert_ne!(a, b);

        b.set_parameter_value(0, TypedConstPtr::new(&1u32));
        assert_eq!(a, b);
    }

    #[test]
    fn test_wire_roundtrip() {
        let sequence = OperationSequence::from_names(
            "Binary Serialization",
            Some("Binary Deserialization"),
            Some(Type::of::<MemoryBuffer>()),
        )
        .unwrap();

        let mut buffer = MemoryBuffer::new();
        let mut writer = BinaryWriter::new(&mut buffer);
        sequence.encode(&mut writer).unwrap();

        let mut reader = BinaryReader::new(buffer.as_slice());
        let decoded = OperationSequence::decode(&mut reader).unwrap();
        assert_eq!(decoded.size(), 2);
        assert_eq!(decoded.operation_name(0), Some("Binary Serialization"));
        assert_eq!(
            decoded.intermediate_type(),
            Some(Type::of::<MemoryBuffer>())
        );
    }

    #[test]
    fn test_wire_roundtrip_with_parameter_and_ambiguity() {
        let mut sequence = OperationSequence::from_names("[]", None, None).unwrap();
        sequence.set_parameter_value(0, TypedConstPtr::new(&2u32));

        let mut buffer = MemoryBuffer::new();
        let mut writer = BinaryWriter::new(&mut buffer);
        sequence.encode(&mut writer).unwrap();

        let mut reader = BinaryReader::new(buffer.as_slice());
        let decoded = OperationSequence::decode(&mut reader).unwrap();
        assert_eq!(decoded, sequence);
        assert!(decoded.resolved_operation(0).is_none());
        assert_eq!(
            unsafe { *decoded.parameter_value(0).unwrap().get::<u32>() },
            2
        );
    }

    #[test]
    fn test_wire_rejects_oversized_sequence() {
        let mut buffer = MemoryBuffer::new();
        let mut writer = BinaryWriter::new(&mut buffer);
        writer.write_u8(3);
        let mut reader = BinaryReader::new(buffer.as_slice());
        let err = OperationSequence::decode(&mut reader).unwrap_err();
        assert!(matches!(err, Error::MalformedWire(_)));
    }
}
