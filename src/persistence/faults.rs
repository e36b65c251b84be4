//! # Fault Injection
//!
//! Deterministic replacement for random connection-drop simulation. A
//! [`FaultInjector`] is consulted before every backend operation and may
//! answer with an error instead of letting the operation run.

use super::gateway::{BackendError, GatewayOperation};
use crate::models::RecordKey;
use parking_lot::Mutex;
use std::collections::HashMap;

/// Hook consulted by the in-memory gateway before each operation
pub trait FaultInjector: Send + Sync {
    /// Return `Some(error)` to fail the operation without executing it
    fn before_operation(
        &self,
        operation: GatewayOperation,
        collection: &str,
        key: Option<&RecordKey>,
    ) -> Option<BackendError>;
}

/// Injector that never fails
#[derive(Debug, Default, Clone, Copy)]
pub struct NoFaults;

impl FaultInjector for NoFaults {
    fn before_operation(
        &self,
        _operation: GatewayOperation,
        _collection: &str,
        _key: Option<&RecordKey>,
    ) -> Option<BackendError> {
        None
    }
}

#[derive(Debug, Clone)]
struct FaultRule {
    operation: GatewayOperation,
    collection: Option<String>,
    /// `None` fails forever
    remaining: Option<u32>,
    error: BackendError,
}

impl FaultRule {
    fn matches(&self, operation: GatewayOperation, collection: &str) -> bool {
        self.operation == operation
            && self
                .collection
                .as_deref()
                .map_or(true, |wanted| wanted == collection)
    }
}

#[derive(Debug, Default)]
struct FaultState {
    rules: Vec<FaultRule>,
    calls: HashMap<GatewayOperation, usize>,
    injected: usize,
}

/// Scripted faults: "fail the next N saves transiently", "always fail deletes".
///
/// Rules are matched in insertion order; a rule with a finite budget is
/// removed once spent. Every consulted operation is counted, faulted or not.
#[derive(Debug, Default)]
pub struct ScriptedFaults {
    state: Mutex<FaultState>,
}

impl ScriptedFaults {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_next(&self, operation: GatewayOperation, times: u32, error: BackendError) {
        self.push(operation, None, Some(times), error);
    }

    pub fn fail_next_in(
        &self,
        operation: GatewayOperation,
        collection: impl Into<String>,
        times: u32,
        error: BackendError,
    ) {
        self.push(operation, Some(collection.into()), Some(times), error);
    }

    pub fn fail_always(&self, operation: GatewayOperation, error: BackendError) {
        self.push(operation, None, None, error);
    }

    pub fn fail_always_in(
        &self,
        operation: GatewayOperation,
        collection: impl Into<String>,
        error: BackendError,
    ) {
        self.push(operation, Some(collection.into()), None, error);
    }

    pub fn clear(&self) {
        self.state.lock().rules.clear();
    }

    /// Operations of this type seen so far, including faulted ones
    pub fn calls(&self, operation: GatewayOperation) -> usize {
        self.state.lock().calls.get(&operation).copied().unwrap_or(0)
    }

    pub fn injected(&self) -> usize {
        self.state.lock().injected
    }

    fn push(
        &self,
        operation: GatewayOperation,
        collection: Option<String>,
        remaining: Option<u32>,
        error: BackendError,
    ) {
        if remaining == Some(0) {
            return;
        }
        self.state.lock().rules.push(FaultRule {
            operation,
            collection,
            remaining,
            error,
        });
    }
}

impl FaultInjector for ScriptedFaults {
    fn before_operation(
        &self,
        operation: GatewayOperation,
        collection: &str,
        _key: Option<&RecordKey>,
    ) -> Option<BackendError> {
        let mut state = self.state.lock();
        *state.calls.entry(operation).or_insert(0) += 1;

        let index = state
            .rules
            .iter()
            .position(|rule| rule.matches(operation, collection))?;

        let rule = &mut state.rules[index];
        let error = rule.error.clone();
        let spent = match rule.remaining.as_mut() {
            Some(remaining) => {
                *remaining -= 1;
                *remaining == 0
            }
            None => false,
        };
        if spent {
            state.rules.remove(index);
        }
        state.injected += 1;
        Some(error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_finite_rule_is_spent() {
        let faults = ScriptedFaults::new();
        faults.fail_next(GatewayOperation::Save, 2, BackendError::transient("reset"));

        assert!(faults.before_operation(GatewayOperation::Save, "tags", None).is_some());
        assert!(faults.before_operation(GatewayOperation::FindAll, "tags", None).is_none());
        assert!(faults.before_operation(GatewayOperation::Save, "tags", None).is_some());
        assert!(faults.before_operation(GatewayOperation::Save, "tags", None).is_none());

        assert_eq!(faults.calls(GatewayOperation::Save), 3);
        assert_eq!(faults.injected(), 2);
    }

    #[test]
    fn test_collection_scoped_rule() {
        let faults = ScriptedFaults::new();
        faults.fail_next_in(
            GatewayOperation::Save,
            "absences",
            1,
            BackendError::fatal("constraint violated"),
        );

        assert!(faults.before_operation(GatewayOperation::Save, "justifications", None).is_none());
        assert_eq!(
            faults.before_operation(GatewayOperation::Save, "absences", None),
            Some(BackendError::fatal("constraint violated"))
        );
    }

    #[test]
    fn test_sticky_rule_until_cleared() {
        let faults = ScriptedFaults::new();
        faults.fail_always(GatewayOperation::Delete, BackendError::transient("down"));
        for _ in 0..5 {
            assert!(faults.before_operation(GatewayOperation::Delete, "x", None).is_some());
        }
        faults.clear();
        assert!(faults.before_operation(GatewayOperation::Delete, "x", None).is_none());
    }
}
