//! Distribution rules.
//!
//! Rules are registered once and compiled to walks at registration. Each
//! registration returns a new rule set; existing sets are never modified,
//! so a set can be shared freely between engines and threads.

use crate::error::{DistributionError, DistributionResult};
use crate::walk::{walk_from_specification, Walk};
use factweave_spec::Specification;
use std::sync::Arc;

/// Restriction of a rule to particular users
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserConstraint {
    /// Specification selecting the permitted users from the rule's given
    pub specification: Specification,
    /// Its compiled walk
    pub walk: Walk,
}

/// A traversal that may be distributed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DistributionRule {
    /// The permitted specification
    pub specification: Specification,
    /// Its compiled walk
    pub walk: Walk,
    /// Users the rule is restricted to, if any
    pub user: Option<UserConstraint>,
}

/// Immutable, append-only set of distribution rules
#[derive(Debug, Clone, Default)]
pub struct DistributionRules {
    rules: Vec<Arc<DistributionRule>>,
}

impl DistributionRules {
    /// Create an empty rule set
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a group of registrations
    ///
    /// # Errors
    ///
    /// Returns the first registration error
    pub fn with<F>(self, rules: F) -> DistributionResult<Self>
    where
        F: FnOnce(Self) -> DistributionResult<Self>,
    {
        rules(self)
    }

    /// Permit a specification to everyone
    ///
    /// # Errors
    ///
    /// Returns error if the specification has no walk
    pub fn everyone(&self, specification: Specification) -> DistributionResult<Self> {
        let walk = walk_from_specification(&specification)?;
        Ok(self.push(DistributionRule {
            specification,
            walk,
            user: None,
        }))
    }

    /// Permit a specification to the users selected by `user`
    ///
    /// # Errors
    ///
    /// Returns error if either specification has no walk or the two start
    /// from different types
    pub fn only(&self, specification: Specification, user: Specification) -> DistributionResult<Self> {
        let walk = walk_from_specification(&specification)?;
        let user_walk = walk_from_specification(&user)?;
        if walk.fact_type != user_walk.fact_type {
            return Err(DistributionError::UserGivenMismatch {
                rule: walk.fact_type,
                user: user_walk.fact_type,
            });
        }
        Ok(self.push(DistributionRule {
            specification,
            walk,
            user: Some(UserConstraint {
                specification: user,
                walk: user_walk,
            }),
        }))
    }

    fn push(&self, rule: DistributionRule) -> Self {
        let mut rules = self.rules.clone();
        rules.push(Arc::new(rule));
        Self { rules }
    }

    /// Rules in registration order
    pub fn iter(&self) -> impl Iterator<Item = &DistributionRule> {
        self.rules.iter().map(Arc::as_ref)
    }

    /// Number of rules
    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Check whether no rules are registered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
