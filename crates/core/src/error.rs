// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for the lifecycle engine

use crate::guid::Guid;
use crate::state::ResourceState;
use thiserror::Error;

/// Error raised by a resource type's behavior hooks
#[derive(Debug, Error)]
#[error("{message}")]
pub struct BehaviorError {
    message: String,
}

impl BehaviorError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Why a condition can never be satisfied
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ConditionError {
    #[error("critical peer {0} has failed")]
    CriticalPeerFailed(Guid),
    #[error("unknown peer: {0}")]
    UnknownPeer(Guid),
}

/// Errors from resource lifecycle operations
#[derive(Debug, Error)]
pub enum ResourceError {
    #[error("resource {guid} cannot {op} while {state}")]
    WrongState {
        guid: Guid,
        op: &'static str,
        state: ResourceState,
    },
    #[error("{kind} resource {guid} failed during {op}: {source}")]
    StepFailed {
        guid: Guid,
        kind: String,
        op: &'static str,
        #[source]
        source: BehaviorError,
    },
    #[error("condition on resource {guid} cannot be satisfied: {source}")]
    UnsatisfiableCondition {
        guid: Guid,
        #[source]
        source: ConditionError,
    },
    #[error("unknown resource: {0}")]
    UnknownResource(Guid),
}

/// Errors from the resource type factory
#[derive(Debug, Error)]
pub enum FactoryError {
    #[error("unknown resource type: {0}")]
    UnknownType(String),
    #[error("resource type already registered: {0}")]
    DuplicateType(String),
}
