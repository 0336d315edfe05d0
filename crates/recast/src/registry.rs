// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 recast contributors

//! Process-wide operation registry.
//!
//! Append-only: operations are registered at library init (or later) and
//! live for the process. Handles are table indices, monotonically
//! assigned and stable. Static casts are kept in a parallel, separately
//! indexed register because they are universal and may be added at any
//! time.

use crate::error::{Error, Result};
use crate::operation::ConversionOperation;
use crate::option::ConversionOption;
use crate::static_cast::{StaticCastOperation, STATIC_CAST_NAME};
use parking_lot::RwLock;
use recast_rtti::Type;
use std::sync::{Arc, OnceLock};

/// One entry of the static-cast register.
#[derive(Clone, Copy, Debug)]
pub struct StaticCast {
    pub option: ConversionOption,
    /// True when the engine may insert this cast without it being named in
    /// a sequence.
    pub implicit: bool,
}

/// Registry of named conversion operations and static casts.
pub struct OperationRegistry {
    operations: RwLock<Vec<Arc<dyn ConversionOperation>>>,
    static_casts: RwLock<Vec<StaticCast>>,
    static_cast_op: Arc<StaticCastOperation>,
    for_each_op: Arc<dyn ConversionOperation>,
}

static REGISTRY: OnceLock<OperationRegistry> = OnceLock::new();

/// The process-wide registry. First access registers the builtin types,
/// the builtin static-cast table and the pre-defined operations.
pub fn registry() -> &'static OperationRegistry {
    REGISTRY.get_or_init(|| {
        recast_rtti::ensure_builtin_types();
        let static_cast_op = Arc::new(StaticCastOperation::new());
        let for_each_op: Arc<dyn ConversionOperation> = Arc::new(crate::defined::ForEach::new());
        let registry = OperationRegistry {
            operations: RwLock::new(Vec::new()),
            static_casts: RwLock::new(Vec::new()),
            static_cast_op: static_cast_op.clone(),
            for_each_op: for_each_op.clone(),
        };
        registry.add_operation(static_cast_op);
        registry.add_operation(for_each_op);
        crate::defined::install(&registry);
        crate::static_cast::install_builtin_casts(&registry);
        log::debug!(
            "conversion registry initialized with {} operations and {} static casts",
            registry.operations.read().len(),
            registry.static_casts.read().len()
        );
        registry
    })
}

/// Register an operation with the process-wide registry, returning its
/// handle.
pub fn register_operation(operation: Arc<dyn ConversionOperation>) -> u16 {
    registry().add_operation(operation)
}

impl OperationRegistry {
    /// Append an operation; returns its handle.
    pub fn add_operation(&self, operation: Arc<dyn ConversionOperation>) -> u16 {
        let mut operations = self.operations.write();
        let handle = u16::try_from(operations.len()).expect("operation table overflow");
        log::trace!(
            "registered conversion operation {:?} (handle {})",
            operation.name(),
            handle
        );
        operations.push(operation);
        handle
    }

    /// Append a static cast to the parallel register.
    pub fn add_static_cast(&self, cast: StaticCast) {
        log::trace!(
            "registered static cast {} -> {}{}",
            cast.option.source.name(),
            cast.option.destination.name(),
            if cast.implicit { " (implicit)" } else { "" }
        );
        self.static_casts.write().push(cast);
    }

    /// Snapshot of the static-cast register in registration order.
    pub fn static_casts(&self) -> Vec<StaticCast> {
        self.static_casts.read().clone()
    }

    /// Snapshot of all registered operations in registration order.
    pub fn operations(&self) -> Vec<Arc<dyn ConversionOperation>> {
        self.operations.read().clone()
    }

    /// The singleton static-cast operation.
    pub fn static_cast_operation(&self) -> Arc<dyn ConversionOperation> {
        self.static_cast_op.clone()
    }

    /// The singleton for-each operation (special-cased by the compiler).
    pub(crate) fn for_each_operation(&self) -> &Arc<dyn ConversionOperation> {
        &self.for_each_op
    }

    /// Operation by handle.
    pub fn operation_by_handle(&self, handle: u16) -> Option<Arc<dyn ConversionOperation>> {
        self.operations.read().get(handle as usize).cloned()
    }

    /// Find an operation by name. The bool is true when more operations
    /// share the name (the lookup is ambiguous and must be re-resolved by
    /// type at compile time). The literal name `"static_cast"` resolves to
    /// the singleton without a table scan.
    pub fn find_by_name(&self, name: &str) -> Option<(Arc<dyn ConversionOperation>, bool)> {
        if name == STATIC_CAST_NAME {
            return Some((self.static_cast_operation(), false));
        }
        let operations = self.operations.read();
        let mut found: Option<Arc<dyn ConversionOperation>> = None;
        for operation in operations.iter() {
            if operation.name() == name {
                match found {
                    Some(first) => return Some((first, true)),
                    None => found = Some(operation.clone()),
                }
            }
        }
        found.map(|operation| (operation, false))
    }

    /// Find the operation with `name` that accepts the (source,
    /// destination) pair. Zero matches is an error; more than one is
    /// ambiguous.
    pub fn find(
        &self,
        name: &str,
        source: Type,
        destination: Type,
    ) -> Result<Arc<dyn ConversionOperation>> {
        if name == STATIC_CAST_NAME {
            return Ok(self.static_cast_operation());
        }
        let operations = self.operations.read();
        let mut found: Option<Arc<dyn ConversionOperation>> = None;
        for operation in operations.iter() {
            if operation.name() == name
                && operation
                    .conversion_option(source, destination, None)
                    .is_some()
            {
                if found.is_some() {
                    return Err(Error::AmbiguousOperation(name.to_string()));
                }
                found = Some(operation.clone());
            }
        }
        found.ok_or_else(|| Error::UnknownOperation(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_cast_name_is_special_cased() {
        let (op, ambiguous) = registry().find_by_name(STATIC_CAST_NAME).unwrap();
        assert_eq!(op.name(), STATIC_CAST_NAME);
        assert!(!ambiguous);
    }

    #[test]
    fn test_find_by_name_reports_duplicates() {
        // Two pre-registered operations share the name "[]" (list and
        // array element access).
        let (_, ambiguous) = registry().find_by_name("[]").unwrap();
        assert!(ambiguous);
        let (_, ambiguous) = registry().find_by_name("ToString").unwrap();
        assert!(!ambiguous);
    }

    #[test]
    fn test_find_resolves_duplicates_by_type() {
        let source = Type::of::<Vec<String>>();
        let destination = Type::of::<String>();
        let op = registry().find("[]", source, destination).unwrap();
        assert_eq!(op.name(), "[]");
    }

    #[test]
    fn test_find_unknown_name() {
        let err = registry()
            .find("no such operation", Type::of::<i32>(), Type::of::<i32>())
            .unwrap_err();
        assert!(matches!(err, Error::UnknownOperation(_)));
    }

    #[test]
    fn test_handles_are_monotone() {
        let registry = registry();
        let operations = registry.operations();
        for (index, operation) in operations.iter().enumerate() {
            assert_eq!(
                registry.operation_by_handle(index as u16).unwrap().name(),
                operation.name()
            );
        }
    }
}
