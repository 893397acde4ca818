// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Resource handles and their allocation

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Integer handle identifying a resource within an experiment
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Guid(pub u64);

impl fmt::Display for Guid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for Guid {
    fn from(n: u64) -> Self {
        Self(n)
    }
}

/// Allocates experiment-unique guids
#[derive(Debug)]
pub struct GuidAllocator {
    next: AtomicU64,
}

impl GuidAllocator {
    pub fn new() -> Self {
        Self {
            next: AtomicU64::new(1),
        }
    }

    pub fn next(&self) -> Guid {
        Guid(self.next.fetch_add(1, Ordering::SeqCst))
    }
}

impl Default for GuidAllocator {
    fn default() -> Self {
        Self::new()
    }
}
