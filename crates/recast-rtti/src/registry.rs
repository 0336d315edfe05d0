// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 recast contributors

//! Process-wide type table.
//!
//! Append-only: descriptors are leaked into the table and live for the
//! process. Handles are indices, monotonically assigned and stable.
//! Lookups by `TypeId` and by name go through concurrent maps so readers
//! never contend with registration.

use crate::registration::{register_list_type_inner, TypeRegistration};
use crate::streams::MemoryBuffer;
use crate::type_info::{Type, TypeInfo};
use dashmap::DashMap;
use parking_lot::RwLock;
use std::any::TypeId;
use std::sync::{Once, OnceLock};

struct TypeTable {
    infos: RwLock<Vec<&'static TypeInfo>>,
    by_id: DashMap<TypeId, Type>,
    by_name: DashMap<String, Type>,
}

static TABLE: OnceLock<TypeTable> = OnceLock::new();
static BUILTINS: Once = Once::new();

fn table() -> &'static TypeTable {
    TABLE.get_or_init(|| TypeTable {
        infos: RwLock::new(Vec::new()),
        by_id: DashMap::new(),
        by_name: DashMap::new(),
    })
}

/// Register the builtin type set. Called automatically by every public
/// lookup and registration entry point; safe to call repeatedly.
pub fn ensure_builtin_types() {
    BUILTINS.call_once(|| {
        macro_rules! builtin_scalar {
            ($($ty:ty => $name:literal),* $(,)?) => {$(
                TypeRegistration::<$ty>::new($name).binary().stringable().finish();
            )*};
        }
        builtin_scalar! {
            bool => "bool",
            u8 => "u8",
            u16 => "u16",
            u32 => "u32",
            u64 => "u64",
            i8 => "i8",
            i16 => "i16",
            i32 => "i32",
            i64 => "i64",
            f32 => "f32",
            f64 => "f64",
            usize => "usize",
            char => "char",
        }
        TypeRegistration::<String>::new("String")
            .binary()
            .stringable()
            .finish();
        TypeRegistration::<MemoryBuffer>::new("MemoryBuffer")
            .binary()
            .finish();

        macro_rules! builtin_list {
            ($($ty:ty),* $(,)?) => {$(
                register_list_type_inner::<$ty>();
            )*};
        }
        builtin_list! {
            bool, u8, u16, u32, u64, i8, i16, i32, i64, f32, f64, char, String,
        }
        log::debug!(
            "registered {} builtin runtime types",
            table().infos.read().len()
        );
    });
}

pub(crate) fn lookup_by_id(id: TypeId) -> Option<Type> {
    ensure_builtin_types();
    lookup_by_id_raw(id)
}

/// Lookup without triggering the builtin bootstrap. Used from inside the
/// bootstrap itself, which must not re-enter `ensure_builtin_types`.
pub(crate) fn lookup_by_id_raw(id: TypeId) -> Option<Type> {
    table().by_id.get(&id).map(|entry| *entry)
}

pub(crate) fn lookup_by_name(name: &str) -> Option<Type> {
    ensure_builtin_types();
    table().by_name.get(name).map(|entry| *entry)
}

/// Insert a descriptor, assigning its handle. Returns the handle.
/// Concurrent registration of the same type resolves to the first entry.
pub(crate) fn insert(id: TypeId, mut info: TypeInfo) -> Type {
    let table = table();
    let mut infos = table.infos.write();
    if let Some(existing) = table.by_id.get(&id) {
        return *existing;
    }
    assert!(
        !table.by_name.contains_key(&info.name),
        "type name {:?} is already registered",
        info.name
    );
    info.handle = u16::try_from(infos.len()).expect("type table overflow");
    let leaked: &'static TypeInfo = Box::leak(Box::new(info));
    infos.push(leaked);
    let ty = Type { info: leaked };
    table.by_id.insert(id, ty);
    table.by_name.insert(leaked.name.clone(), ty);
    log::trace!("registered type {} (handle {})", leaked.name, leaked.handle);
    ty
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_types_present() {
        ensure_builtin_types();
        for name in ["bool", "i32", "f64", "String", "MemoryBuffer", "Vec<u8>"] {
            assert!(Type::by_name(name).is_some(), "missing builtin {}", name);
        }
    }

    #[test]
    fn test_handles_are_stable() {
        let a = Type::of::<i32>();
        let b = Type::of::<i32>();
        assert_eq!(a.handle(), b.handle());
    }

    #[test]
    fn test_vec_u8_element() {
        let ty = Type::of::<Vec<u8>>();
        assert_eq!(ty.element_type(), Some(Type::of::<u8>()));
    }
}
