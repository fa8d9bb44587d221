//! Type compatibility checking
//!
//! Decides whether a value of one type may be bound where another is required.
//! The lattice is fixed and directional:
//!
//! 1. identity
//! 2. boxing / unboxing of the same primitive kind
//! 3. primitive widening, with a boxed `found` unboxed first
//!
//! Wrapper-to-wrapper conversion and narrowing are never accepted.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::types::TypeRef;

/// How a found type relates to a required type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Assignability {
    /// Same canonical type
    Identity,
    /// Primitive and wrapper of the same kind
    Boxing,
    /// Value-preserving primitive widening
    Widening,
    Incompatible,
}

impl Assignability {
    pub fn is_compatible(&self) -> bool {
        !matches!(self, Self::Incompatible)
    }
}

impl fmt::Display for Assignability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Identity => write!(f, "identity"),
            Self::Boxing => write!(f, "boxing"),
            Self::Widening => write!(f, "widening"),
            Self::Incompatible => write!(f, "incompatible"),
        }
    }
}

/// Rule applied to computation method return types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReturnTypePolicy {
    /// Same lattice as parameters
    #[default]
    Lattice,
    /// Canonical identity only
    Exact,
}

/// Classify `found` against `required`; first matching rule wins.
pub fn classify(required: &TypeRef, found: &TypeRef) -> Assignability {
    if required == found {
        return Assignability::Identity;
    }

    match (required, found) {
        (TypeRef::Primitive(r), TypeRef::Boxed(f)) | (TypeRef::Boxed(r), TypeRef::Primitive(f))
            if r == f =>
        {
            return Assignability::Boxing;
        }
        _ => {}
    }

    // Widening only ever targets a primitive; a boxed required type never widens.
    if let (Some(r), Some(f)) = (required.as_primitive(), found.unboxed()) {
        if f.widens_to(r) {
            return Assignability::Widening;
        }
    }

    Assignability::Incompatible
}

/// `true` when `found` may be bound where `required` is expected
pub fn is_assignable(required: &TypeRef, found: &TypeRef) -> bool {
    classify(required, found).is_compatible()
}

/// Compatibility checker for projected fields and computation methods
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CompatibilityChecker {
    return_policy: ReturnTypePolicy,
}

impl CompatibilityChecker {
    /// Create a checker applying the lattice everywhere
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_return_policy(mut self, policy: ReturnTypePolicy) -> Self {
        self.return_policy = policy;
        self
    }

    /// Require method return types to match exactly
    pub fn exact_returns(self) -> Self {
        self.with_return_policy(ReturnTypePolicy::Exact)
    }

    pub fn return_policy(&self) -> ReturnTypePolicy {
        self.return_policy
    }

    /// Declared target type vs resolved source type, and parameter vs dependency
    pub fn check(&self, required: &TypeRef, found: &TypeRef) -> Assignability {
        classify(required, found)
    }

    pub fn is_assignable(&self, required: &TypeRef, found: &TypeRef) -> bool {
        self.check(required, found).is_compatible()
    }

    /// Declared field type vs a candidate method's return type
    pub fn check_return(&self, declared: &TypeRef, returned: &TypeRef) -> Assignability {
        match self.return_policy {
            ReturnTypePolicy::Lattice => classify(declared, returned),
            ReturnTypePolicy::Exact if declared == returned => Assignability::Identity,
            ReturnTypePolicy::Exact => Assignability::Incompatible,
        }
    }
}
