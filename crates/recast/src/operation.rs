// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 recast contributors

//! The registered-operation contract.
//!
//! A conversion operation is a named, process-lifetime dispatcher that may
//! serve many (source, destination) pairs. The supported-type filters are
//! metadata for tooling; the operation itself decides acceptance in
//! `conversion_option`.

use crate::option::ConversionOption;
use recast_rtti::{trait_flags, Type, TypedConstPtr};

/// Supported-type filters, encoded for external tooling.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TypeFilter {
    /// All binary-serializable types.
    BinarySerializable,
    /// All string-serializable types.
    StringSerializable,
    /// All list types.
    Lists,
    /// All types.
    All,
    /// Types supported by static casts.
    StaticCast,
    /// Types supported by the for-each operation.
    ForEach,
    /// Types supported by get-list-element.
    GetListElement,
    /// Types supported by array-to-vector.
    ArrayToVector,
    /// Types supported by get-tuple-element.
    GetTupleElement,
    /// Types supported by generic element-wise array casts.
    GenericArrayCast,
    /// Types supported by generic element-wise vector casts.
    GenericVectorCast,
}

impl TypeFilter {
    /// Stable wire tag; 0 is reserved for `SupportedTypes::Single`.
    pub(crate) fn wire_tag(self) -> u8 {
        match self {
            Self::BinarySerializable => 1,
            Self::StringSerializable => 2,
            Self::Lists => 3,
            Self::All => 4,
            Self::StaticCast => 5,
            Self::ForEach => 6,
            Self::GetListElement => 7,
            Self::ArrayToVector => 8,
            Self::GetTupleElement => 9,
            Self::GenericArrayCast => 10,
            Self::GenericVectorCast => 11,
        }
    }

    pub(crate) fn from_wire_tag(tag: u8) -> Option<Self> {
        Some(match tag {
            1 => Self::BinarySerializable,
            2 => Self::StringSerializable,
            3 => Self::Lists,
            4 => Self::All,
            5 => Self::StaticCast,
            6 => Self::ForEach,
            7 => Self::GetListElement,
            8 => Self::ArrayToVector,
            9 => Self::GetTupleElement,
            10 => Self::GenericArrayCast,
            11 => Self::GenericVectorCast,
            _ => return None,
        })
    }
}

/// Supported types for one end of an operation: either one fixed type or
/// a filter over many.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SupportedTypes {
    Single(Type),
    Filter(TypeFilter),
}

impl SupportedTypes {
    /// The fixed type when exactly one is supported.
    pub fn single_type(&self) -> Option<Type> {
        match self {
            Self::Single(ty) => Some(*ty),
            Self::Filter(_) => None,
        }
    }
}

/// Declaration of an operation's parameter.
#[derive(Clone, Debug)]
pub struct ParameterDefinition {
    name: &'static str,
    value_type: Type,
    optional: bool,
}

impl ParameterDefinition {
    /// Declare a parameter. Parameter types must be string-serializable so
    /// operations can accept textual parameters; violating that is a
    /// static wiring mistake and panics eagerly.
    pub fn new(name: &'static str, value_type: Type, optional: bool) -> Self {
        assert!(
            value_type.has_trait(trait_flags::STRING_SERIALIZABLE),
            "conversion operation parameter {:?} must have a string-serializable type, got {}",
            name,
            value_type.name()
        );
        Self {
            name,
            value_type,
            optional,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn value_type(&self) -> Type {
        self.value_type
    }

    pub fn is_optional(&self) -> bool {
        self.optional
    }
}

/// A named conversion operation registered for runtime lookup.
///
/// Registered operations live for the process; they may be applicable to
/// many type combinations and are compiled before use. The name must be
/// unique per (source filter, destination filter) combination; duplicate
/// names across filters are resolved by type at compile time.
pub trait ConversionOperation: Send + Sync {
    /// Operation name.
    fn name(&self) -> &str;

    /// Supported source types.
    fn supported_sources(&self) -> SupportedTypes;

    /// Supported destination types.
    fn supported_destinations(&self) -> SupportedTypes;

    /// The operation's parameter, if it declares one.
    fn parameter(&self) -> Option<&ParameterDefinition> {
        None
    }

    /// The conversion option for the pair, or `None` when the operation
    /// cannot serve it. A returned option's `source`/`destination` equal
    /// the arguments. `parameter` is the raw sequence parameter (it may
    /// still be a string at compile time); operations that need it at
    /// compile time (e.g. tuple element projection) decode it here.
    fn conversion_option(
        &self,
        source: Type,
        destination: Type,
        parameter: Option<TypedConstPtr>,
    ) -> Option<ConversionOption>;
}

impl std::fmt::Debug for dyn ConversionOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConversionOperation")
            .field("name", &self.name())
            .finish()
    }
}

/// Operation built from one fixed conversion option: serves exactly the
/// option's (source, destination) pair.
pub struct SingleOptionOperation {
    name: String,
    option: ConversionOption,
    parameter: Option<ParameterDefinition>,
}

impl SingleOptionOperation {
    pub fn new(name: impl Into<String>, option: ConversionOption) -> Self {
        Self {
            name: name.into(),
            option,
            parameter: None,
        }
    }

    pub fn with_parameter(mut self, parameter: ParameterDefinition) -> Self {
        self.parameter = Some(parameter);
        self
    }
}

impl ConversionOperation for SingleOptionOperation {
    fn name(&self) -> &str {
        &self.name
    }

    fn supported_sources(&self) -> SupportedTypes {
        SupportedTypes::Single(self.option.source)
    }

    fn supported_destinations(&self) -> SupportedTypes {
        SupportedTypes::Single(self.option.destination)
    }

    fn parameter(&self) -> Option<&ParameterDefinition> {
        self.parameter.as_ref()
    }

    fn conversion_option(
        &self,
        source: Type,
        destination: Type,
        _parameter: Option<TypedConstPtr>,
    ) -> Option<ConversionOption> {
        if source == self.option.source && destination == self.option.destination {
            Some(self.option)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_type_accessor() {
        let ty = Type::of::<i32>();
        assert_eq!(SupportedTypes::Single(ty).single_type(), Some(ty));
        assert_eq!(
            SupportedTypes::Filter(TypeFilter::Lists).single_type(),
            None
        );
    }

    #[test]
    fn test_filter_wire_tags_roundtrip() {
        let filters = [
            TypeFilter::BinarySerializable,
            TypeFilter::StringSerializable,
            TypeFilter::Lists,
            TypeFilter::All,
            TypeFilter::StaticCast,
            TypeFilter::ForEach,
            TypeFilter::GetListElement,
            TypeFilter::ArrayToVector,
            TypeFilter::GetTupleElement,
            TypeFilter::GenericArrayCast,
            TypeFilter::GenericVectorCast,
        ];
        for filter in filters {
            assert_eq!(TypeFilter::from_wire_tag(filter.wire_tag()), Some(filter));
        }
        assert_eq!(TypeFilter::from_wire_tag(0), None);
    }

    #[test]
    #[should_panic(expected = "string-serializable")]
    fn test_parameter_type_must_be_string_serializable() {
        // Tuple types register without string support.
        let tuple = recast_rtti::register_tuple2_type::<i32, i32>();
        ParameterDefinition::new("Broken", tuple, false);
    }

    #[test]
    fn test_single_option_operation_acceptance() {
        let src = Type::of::<u8>();
        let dst = Type::of::<u16>();
        let op = SingleOptionOperation::new(
            "widen",
            ConversionOption::const_offset(dst, src, 0),
        );
        // Only the exact registered pair is accepted.
        assert!(op.conversion_option(dst, src, None).is_some());
        assert!(op.conversion_option(src, dst, None).is_none());
    }
}
