// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 recast contributors

//! The static-cast engine.
//!
//! Casts are handled separately from other conversion operations: they
//! may be implicit, they are universal, and new casts can be registered
//! at any time. The engine consults them both for explicit `static_cast`
//! sequence steps and as the glue inserted between user-specified steps.
//!
//! Implicit chains are bounded at two hops; the first matching table
//! entry in registration order wins.

use crate::compiled::CurrentOp;
use crate::error::Result;
use crate::operation::{ConversionOperation, SupportedTypes, TypeFilter};
use crate::option::ConversionOption;
use crate::registry::{registry, OperationRegistry, StaticCast};
use recast_rtti::{trait_flags, MemoryBuffer, Type, TypedConstPtr, TypedPtr};

/// Reserved name resolving to the singleton static-cast operation.
pub const STATIC_CAST_NAME: &str = "static_cast";

/// Value-level cast between two registered types.
///
/// `IMPLICIT` marks casts the engine may insert without being named in a
/// sequence: exactly the lossless conversions (numeric widening in the
/// `From` sense, `bool` to numeric). Narrowing and numeric-to-bool casts
/// must be requested explicitly.
pub trait CastFrom<S>: Sized {
    const IMPLICIT: bool;
    fn cast_from(source: &S) -> Self;
}

/// Reference-producing cast: projects a borrow of `D` out of `S` (e.g. a
/// wrapper exposing its payload). Implement this to register
/// reference-destination static casts.
pub trait RefCast<D> {
    fn project(&self) -> &D;
}

macro_rules! lossless_casts {
    ($($source:ty => $($destination:ty),+);* $(;)?) => {$($(
        impl CastFrom<$source> for $destination {
            const IMPLICIT: bool = true;
            #[inline]
            fn cast_from(source: &$source) -> Self {
                *source as $destination
            }
        }
    )+)*};
}

macro_rules! lossy_casts {
    ($($source:ty => $($destination:ty),+);* $(;)?) => {$($(
        impl CastFrom<$source> for $destination {
            const IMPLICIT: bool = false;
            #[inline]
            fn cast_from(source: &$source) -> Self {
                *source as $destination
            }
        }
    )+)*};
}

lossless_casts! {
    i8 => i16, i32, i64, f32, f64;
    i16 => i32, i64, f32, f64;
    i32 => i64, f64;
    u8 => u16, u32, u64, i16, i32, i64, f32, f64;
    u16 => u32, u64, i32, i64, f32, f64;
    u32 => u64, i64, f64;
    f32 => f64;
}

lossy_casts! {
    i8 => u8, u16, u32, u64;
    i16 => i8, u8, u16, u32, u64;
    i32 => i8, i16, u8, u16, u32, u64, f32;
    i64 => i8, i16, i32, u8, u16, u32, u64, f32, f64;
    u8 => i8;
    u16 => u8, i8, i16;
    u32 => u16, u8, i8, i16, i32, f32;
    u64 => u32, u16, u8, i8, i16, i32, i64, f32, f64;
    f32 => i8, i16, i32, i64, u8, u16, u32, u64;
    f64 => f32, i8, i16, i32, i64, u8, u16, u32, u64;
}

macro_rules! bool_casts {
    ($($ty:ty),* $(,)?) => {$(
        impl CastFrom<bool> for $ty {
            const IMPLICIT: bool = true;
            #[inline]
            fn cast_from(source: &bool) -> Self {
                (*source as u8) as $ty
            }
        }
        impl CastFrom<$ty> for bool {
            const IMPLICIT: bool = false;
            #[inline]
            fn cast_from(source: &$ty) -> bool {
                *source != (0 as $ty)
            }
        }
    )*};
}

bool_casts!(i8, i16, i32, i64, u8, u16, u32, u64, f32, f64);

fn cast_first<S, D>(source: TypedConstPtr, destination: TypedPtr, op: &CurrentOp<'_>) -> Result<()>
where
    S: 'static,
    D: CastFrom<S> + 'static,
{
    let intermediate: D = D::cast_from(unsafe { source.get::<S>() });
    op.continue_with(TypedConstPtr::new(&intermediate), destination)
}

fn cast_final<S, D>(
    source: TypedConstPtr,
    destination: TypedPtr,
    _op: &CurrentOp<'_>,
) -> Result<()>
where
    S: 'static,
    D: CastFrom<S> + 'static,
{
    unsafe { *destination.get_mut::<D>() = D::cast_from(source.get::<S>()) };
    Ok(())
}

fn vector_cast_final<S, D>(
    source: TypedConstPtr,
    destination: TypedPtr,
    _op: &CurrentOp<'_>,
) -> Result<()>
where
    S: 'static,
    D: CastFrom<S> + 'static,
{
    let source = unsafe { source.get::<Vec<S>>() };
    let destination = unsafe { destination.get_mut::<Vec<D>>() };
    destination.clear();
    destination.reserve(source.len());
    destination.extend(source.iter().map(D::cast_from));
    Ok(())
}

fn vector_cast_first<S, D>(
    source: TypedConstPtr,
    destination: TypedPtr,
    op: &CurrentOp<'_>,
) -> Result<()>
where
    S: 'static,
    D: CastFrom<S> + 'static,
{
    let elements = unsafe { source.get::<Vec<S>>() };
    let intermediate: Vec<D> = elements.iter().map(D::cast_from).collect();
    op.continue_with(TypedConstPtr::new(&intermediate), destination)
}

fn ref_cast_first<S, D>(
    source: TypedConstPtr,
    destination: TypedPtr,
    op: &CurrentOp<'_>,
) -> Result<()>
where
    S: RefCast<D> + 'static,
    D: 'static,
{
    let projected = unsafe { source.get::<S>() }.project();
    op.continue_with(TypedConstPtr::new(projected), destination)
}

fn ref_cast_get_ref<S, D>(source: TypedConstPtr, _op: &CurrentOp<'_>) -> Result<TypedConstPtr>
where
    S: RefCast<D> + 'static,
    D: 'static,
{
    Ok(TypedConstPtr::new(unsafe { source.get::<S>() }.project()))
}

fn register_cast_with<S, D>(registry: &OperationRegistry)
where
    S: 'static,
    D: CastFrom<S> + 'static,
{
    let source = Type::of::<S>();
    let destination = Type::of::<D>();
    if source.underlying() == destination.underlying() {
        // Shared storage: the cast is synthesized as ConstOffset(0) on
        // demand, no table entry needed.
        return;
    }
    registry.add_static_cast(StaticCast {
        option: ConversionOption::standard(
            source,
            destination,
            cast_first::<S, D>,
            cast_final::<S, D>,
        ),
        implicit: D::IMPLICIT,
    });
}

fn register_vector_cast_with<S, D>(registry: &OperationRegistry)
where
    S: 'static,
    D: CastFrom<S> + 'static,
{
    let source = Type::of::<Vec<S>>();
    let destination = Type::of::<Vec<D>>();
    if source.underlying() == destination.underlying() {
        return;
    }
    // Dedicated element-wise casts are never implicit.
    registry.add_static_cast(StaticCast {
        option: ConversionOption::standard(
            source,
            destination,
            vector_cast_first::<S, D>,
            vector_cast_final::<S, D>,
        ),
        implicit: false,
    });
}

/// Register the `S -> D` value cast.
pub fn register_cast<S, D>()
where
    S: 'static,
    D: CastFrom<S> + 'static,
{
    register_cast_with::<S, D>(registry());
}

/// Register both `S -> D` and `D -> S`.
pub fn register_cast_bidirectional<S, D>()
where
    S: 'static + CastFrom<D>,
    D: 'static + CastFrom<S>,
{
    let registry = registry();
    register_cast_with::<S, D>(registry);
    register_cast_with::<D, S>(registry);
}

/// Register a dedicated element-wise `Vec<S> -> Vec<D>` cast. Worthwhile
/// for vectors with typically many elements; a generic for-each is used
/// otherwise. Both vector types must be registered.
pub fn register_vector_cast<S, D>()
where
    S: 'static,
    D: CastFrom<S> + 'static,
{
    register_vector_cast_with::<S, D>(registry());
}

/// Register a reference-destination cast with a constant offset. The
/// offset is precomputed once from a synthetic instance; projections that
/// reach outside the source object are rejected eagerly (up-casts are
/// unsafe without further checks).
pub fn register_ref_cast<S, D>(implicit: bool)
where
    S: RefCast<D> + Default + 'static,
    D: 'static,
{
    let probe = S::default();
    let offset = probe.project() as *const D as usize - (&probe as *const S as usize);
    assert!(
        offset + std::mem::size_of::<D>() <= std::mem::size_of::<S>(),
        "reference static cast must project into the source object"
    );
    registry().add_static_cast(StaticCast {
        option: ConversionOption::const_offset(Type::of::<S>(), Type::of::<D>(), offset),
        implicit,
    });
}

/// Register a reference-destination cast whose offset is resolved per
/// call (for projections without a constant offset).
pub fn register_ref_cast_variable<S, D>(implicit: bool)
where
    S: RefCast<D> + 'static,
    D: 'static,
{
    registry().add_static_cast(StaticCast {
        option: ConversionOption::variable_offset(
            Type::of::<S>(),
            Type::of::<D>(),
            ref_cast_first::<S, D>,
            ref_cast_get_ref::<S, D>,
        ),
        implicit,
    });
}

fn buffer_to_bytes_final(
    source: TypedConstPtr,
    destination: TypedPtr,
    _op: &CurrentOp<'_>,
) -> Result<()> {
    let buffer = unsafe { source.get::<MemoryBuffer>() };
    unsafe { *destination.get_mut::<Vec<u8>>() = buffer.as_slice().to_vec() };
    Ok(())
}

fn buffer_to_bytes_first(
    source: TypedConstPtr,
    destination: TypedPtr,
    op: &CurrentOp<'_>,
) -> Result<()> {
    let intermediate = unsafe { source.get::<MemoryBuffer>() }.as_slice().to_vec();
    op.continue_with(TypedConstPtr::new(&intermediate), destination)
}

fn bytes_to_buffer_final(
    source: TypedConstPtr,
    destination: TypedPtr,
    _op: &CurrentOp<'_>,
) -> Result<()> {
    let bytes = unsafe { source.get::<Vec<u8>>() };
    unsafe { *destination.get_mut::<MemoryBuffer>() = MemoryBuffer::from_slice(bytes) };
    Ok(())
}

fn bytes_to_buffer_first(
    source: TypedConstPtr,
    destination: TypedPtr,
    op: &CurrentOp<'_>,
) -> Result<()> {
    let intermediate = MemoryBuffer::from_slice(unsafe { source.get::<Vec<u8>>() });
    op.continue_with(TypedConstPtr::new(&intermediate), destination)
}

/// Install the builtin cast table: all scalar pairs in both directions
/// with dedicated vector casts, plus `MemoryBuffer <-> Vec<u8>`.
pub(crate) fn install_builtin_casts(registry: &OperationRegistry) {
    macro_rules! builtin_pairs {
        ($($a:ty | $b:ty),* $(,)?) => {$(
            register_cast_with::<$a, $b>(registry);
            register_cast_with::<$b, $a>(registry);
            register_vector_cast_with::<$a, $b>(registry);
            register_vector_cast_with::<$b, $a>(registry);
        )*};
    }
    builtin_pairs! {
        i8 | i16, i8 | i32, i8 | i64, i8 | u8, i8 | u16, i8 | u32, i8 | u64,
        i8 | f32, i8 | f64, i8 | bool,
        i16 | i32, i16 | i64, i16 | u8, i16 | u16, i16 | u32, i16 | u64,
        i16 | f32, i16 | f64, i16 | bool,
        i32 | i64, i32 | u8, i32 | u16, i32 | u32, i32 | u64, i32 | f32,
        i32 | f64, i32 | bool,
        i64 | u8, i64 | u16, i64 | u32, i64 | u64, i64 | f32, i64 | f64,
        i64 | bool,
        u8 | u16, u8 | u32, u8 | u64, u8 | f32, u8 | f64, u8 | bool,
        u16 | u32, u16 | u64, u16 | f32, u16 | f64, u16 | bool,
        u32 | u64, u32 | f32, u32 | f64, u32 | bool,
        u64 | f32, u64 | f64, u64 | bool,
        f32 | f64, f32 | bool,
        f64 | bool,
    }

    let buffer = Type::of::<MemoryBuffer>();
    let bytes = Type::of::<Vec<u8>>();
    registry.add_static_cast(StaticCast {
        option: ConversionOption::standard(
            buffer,
            bytes,
            buffer_to_bytes_first,
            buffer_to_bytes_final,
        ),
        implicit: false,
    });
    registry.add_static_cast(StaticCast {
        option: ConversionOption::standard(
            bytes,
            buffer,
            bytes_to_buffer_first,
            bytes_to_buffer_final,
        ),
        implicit: false,
    });
}

/// The singleton operation behind the `"static_cast"` name.
pub struct StaticCastOperation {
    _private: (),
}

impl StaticCastOperation {
    pub(crate) fn new() -> Self {
        Self { _private: () }
    }

    /// Identity and wrapper-equivalence casts synthesized without a table
    /// entry; `implicit_gates` additionally requires the implicit
    /// underlying-cast trait flags.
    fn wrapper_option(
        source: Type,
        destination: Type,
        implicit_gates: bool,
    ) -> Option<ConversionOption> {
        if source == destination {
            return Some(ConversionOption::const_offset(source, destination, 0));
        }
        let equivalent = if implicit_gates {
            (source.underlying() == destination
                && source.has_trait(trait_flags::CAST_TO_UNDERLYING_IMPLICIT))
                || (source == destination.underlying()
                    && destination.has_trait(trait_flags::CAST_FROM_UNDERLYING_IMPLICIT))
                || (source.underlying() == destination.underlying()
                    && source.has_trait(trait_flags::CAST_TO_UNDERLYING_IMPLICIT)
                    && destination.has_trait(trait_flags::CAST_FROM_UNDERLYING_IMPLICIT))
        } else {
            source.underlying() == destination
                || (source.underlying() == destination.underlying()
                    && destination.has_trait(trait_flags::REINTERPRET_FROM_UNDERLYING_VALID))
        };
        if equivalent {
            Some(ConversionOption::const_offset(source, destination, 0))
        } else {
            None
        }
    }

    fn implicit_option_in(
        source: Type,
        destination: Type,
        casts: &[StaticCast],
    ) -> Option<ConversionOption> {
        if let Some(option) = Self::wrapper_option(source, destination, true) {
            return Some(option);
        }
        casts
            .iter()
            .find(|cast| {
                cast.implicit
                    && cast.option.source == source
                    && cast.option.destination == destination
            })
            .map(|cast| cast.option)
    }

    /// Single implicit cast from `source` to `destination`, if any.
    /// Identity returns `ConstOffset(0)`.
    pub fn implicit_option(source: Type, destination: Type) -> Option<ConversionOption> {
        let casts = registry().static_casts();
        Self::implicit_option_in(source, destination, &casts)
    }

    /// Implicit cast chain of length <= 2 from `source` to `destination`.
    /// A single hop is preferred; otherwise the first table entry (in
    /// registration order) that bridges the gap wins. Both slots are
    /// `None` when no chain exists.
    pub fn implicit_options(
        source: Type,
        destination: Type,
    ) -> (Option<ConversionOption>, Option<ConversionOption>) {
        let casts = registry().static_casts();
        if let Some(single) = Self::implicit_option_in(source, destination, &casts) {
            return (Some(single), None);
        }
        for cast in casts.iter().filter(|cast| cast.implicit) {
            if cast.option.source == source {
                if let Some(second) =
                    Self::implicit_option_in(cast.option.destination, destination, &casts)
                {
                    return (Some(cast.option), Some(second));
                }
            }
            if cast.option.destination == destination {
                if let Some(first) =
                    Self::implicit_option_in(source, cast.option.source, &casts)
                {
                    return (Some(first), Some(cast.option));
                }
            }
        }
        (None, None)
    }

    /// Is `source` implicitly convertible to `destination`, possibly via
    /// a chain of two implicit casts? Always true for identical types.
    pub fn is_implicitly_convertible(source: Type, destination: Type) -> bool {
        Self::implicit_options(source, destination).0.is_some()
    }
}

impl ConversionOperation for StaticCastOperation {
    fn name(&self) -> &str {
        STATIC_CAST_NAME
    }

    fn supported_sources(&self) -> SupportedTypes {
        SupportedTypes::Filter(TypeFilter::StaticCast)
    }

    fn supported_destinations(&self) -> SupportedTypes {
        SupportedTypes::Filter(TypeFilter::StaticCast)
    }

    fn conversion_option(
        &self,
        source: Type,
        destination: Type,
        _parameter: Option<TypedConstPtr>,
    ) -> Option<ConversionOption> {
        if let Some(option) = Self::wrapper_option(source, destination, false) {
            return Some(option);
        }
        registry()
            .static_casts()
            .iter()
            .find(|cast| {
                cast.option.source == source && cast.option.destination == destination
            })
            .map(|cast| cast.option)
    }
}
