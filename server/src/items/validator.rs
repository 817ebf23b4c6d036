//! Pluggable validation of candidate items.

use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;

use crate::storage::NewItem;

/// Reasons a candidate is rejected
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("name must not be empty")]
    EmptyName,

    #[error("price must be a finite, non-negative number (got {0})")]
    InvalidPrice(f64),
}

/// Decides whether a candidate may be stored
pub trait ItemValidator: Send + Sync {
    fn validate(&self, candidate: &NewItem) -> Result<(), ValidationError>;
}

/// Stores every candidate as submitted
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptAll;

impl ItemValidator for AcceptAll {
    fn validate(&self, _candidate: &NewItem) -> Result<(), ValidationError> {
        Ok(())
    }
}

/// Requires a non-blank name and a usable price
#[derive(Debug, Clone, Copy, Default)]
pub struct BasicValidator;

impl ItemValidator for BasicValidator {
    fn validate(&self, candidate: &NewItem) -> Result<(), ValidationError> {
        if candidate.name.trim().is_empty() {
            return Err(ValidationError::EmptyName);
        }
        if !candidate.price.is_finite() || candidate.price < 0.0 {
            return Err(ValidationError::InvalidPrice(candidate.price));
        }
        Ok(())
    }
}

/// Which validator the write path uses
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ValidationPolicy {
    /// No validation, candidates are stored as submitted
    #[default]
    None,
    Basic,
}

impl ValidationPolicy {
    pub fn validator(self) -> Arc<dyn ItemValidator> {
        match self {
            ValidationPolicy::None => Arc::new(AcceptAll),
            ValidationPolicy::Basic => Arc::new(BasicValidator),
        }
    }
}

impl FromStr for ValidationPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" => Ok(ValidationPolicy::None),
            "basic" => Ok(ValidationPolicy::Basic),
            other => Err(format!("unknown validation policy: {}", other)),
        }
    }
}
