//! Walks: the traversal shape of a specification.
//!
//! A walk starts at the given fact's type and lists the predecessor and
//! successor steps a specification takes from there, with existential
//! obligations attached to the facts they constrain. Walks say nothing
//! about stored data; they are compared against each other to decide
//! whether one traversal is covered by another.

use crate::error::{WalkError, WalkResult};
use factweave_spec::{ExistentialCondition, Match, Role, Specification};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Direction of a step through the fact graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// From a successor to the fact its role points to
    Predecessor,
    /// From a fact to the successors pointing at it through a role
    Successor,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Predecessor => f.write_str("predecessor"),
            Self::Successor => f.write_str("successor"),
        }
    }
}

/// One step of a walk
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WalkStep {
    /// Direction of travel
    pub direction: Direction,
    /// Role followed
    pub role: String,
    /// Continuation from the fact reached
    pub next: Walk,
}

impl WalkStep {
    /// Type declaring the role, given the type the step starts from
    #[must_use]
    pub fn declaring_type<'a>(&'a self, from: &'a str) -> &'a str {
        match self.direction {
            Direction::Predecessor => from,
            Direction::Successor => &self.next.fact_type,
        }
    }
}

/// Existential obligation on the facts a walk reaches
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WalkCondition {
    /// Whether the step must (`true`) or must not (`false`) be possible
    pub exists: bool,
    /// The step in question
    pub step: WalkStep,
}

/// Traversal rooted at a fact type
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Walk {
    /// Type of the fact the walk starts from
    #[serde(rename = "type")]
    pub fact_type: String,
    /// Steps taken from here
    pub steps: Vec<WalkStep>,
    /// Obligations on the fact reached here
    pub conditions: Vec<WalkCondition>,
}

impl Walk {
    /// A walk that stops at a fact of the given type
    #[must_use]
    pub fn new(fact_type: impl Into<String>) -> Self {
        Self {
            fact_type: fact_type.into(),
            steps: Vec::new(),
            conditions: Vec::new(),
        }
    }

    /// Add a step
    #[must_use]
    pub fn step(mut self, direction: Direction, role: impl Into<String>, next: Walk) -> Self {
        self.steps.push(WalkStep {
            direction,
            role: role.into(),
            next,
        });
        self
    }

    /// Add a successor step
    #[must_use]
    pub fn successor(self, role: impl Into<String>, next: Walk) -> Self {
        self.step(Direction::Successor, role, next)
    }

    /// Add a predecessor step
    #[must_use]
    pub fn predecessor(self, role: impl Into<String>, next: Walk) -> Self {
        self.step(Direction::Predecessor, role, next)
    }

    /// Add an existential obligation
    #[must_use]
    pub fn condition(
        mut self,
        exists: bool,
        direction: Direction,
        role: impl Into<String>,
        next: Walk,
    ) -> Self {
        self.conditions.push(WalkCondition {
            exists,
            step: WalkStep {
                direction,
                role: role.into(),
                next,
            },
        });
        self
    }

    /// Check whether any fact along the walk carries an obligation
    #[must_use]
    pub fn has_conditions(&self) -> bool {
        !self.conditions.is_empty() || self.steps.iter().any(|step| step.next.has_conditions())
    }
}

type LabeledTypes = IndexMap<String, String>;
type LabeledWalks = IndexMap<String, Walk>;

/// Derive the walk of a single-given specification
///
/// # Errors
///
/// Returns error if the specification does not have exactly one given,
/// a match does not have exactly one path condition, a path refers to an
/// unknown label, an existential condition is detached from its unknown or
/// nests further conditions, or two continuations of a label disagree on
/// its type
pub fn walk_from_specification(spec: &Specification) -> WalkResult<Walk> {
    let [given] = spec.given.as_slice() else {
        return Err(WalkError::GivenCount {
            count: spec.given.len(),
        });
    };
    let labels = LabeledTypes::from([(given.name.clone(), given.fact_type.clone())]);
    let mut walks = walks_from_matches(&spec.matches, &labels)?;
    Ok(walks
        .shift_remove(&given.name)
        .unwrap_or_else(|| Walk::new(given.fact_type.clone())))
}

/// Continuations from each label, built back to front
fn walks_from_matches(matches: &[Match], labels: &LabeledTypes) -> WalkResult<LabeledWalks> {
    let Some((m, rest)) = matches.split_first() else {
        return Ok(LabeledWalks::new());
    };

    let mut labels = labels.clone();
    labels.insert(m.unknown.name.clone(), m.unknown.fact_type.clone());
    let mut walks = walks_from_matches(rest, &labels)?;

    let condition = m.path_condition().ok_or_else(|| WalkError::PathConditionCount {
        label: m.unknown.name.clone(),
        count: m.path_conditions().count(),
    })?;

    // Whatever later matches continue from the unknown.
    let mut next = walks
        .shift_remove(&m.unknown.name)
        .unwrap_or_else(|| Walk::new(m.unknown.fact_type.clone()));
    for existential in m.existential_conditions() {
        next = apply_existential_condition(next, existential, &m.unknown.name, &labels)?;
    }

    let label_type = labels
        .get(&condition.label_right)
        .ok_or_else(|| WalkError::UnknownLabel {
            name: condition.label_right.clone(),
        })?;
    let left = walk_roles_left(&condition.roles_left, next);
    let walk = walk_roles_right(&condition.roles_right, label_type, left);

    let merged = match walks.shift_remove(&condition.label_right) {
        Some(other) => merge_walks(walk, other)?,
        None => walk,
    };
    walks.insert(condition.label_right.clone(), merged);
    Ok(walks)
}

/// Successor steps down from the end of `roles` to the unknown
fn walk_roles_left(roles: &[Role], next: Walk) -> Walk {
    roles.iter().fold(next, |walk, role| {
        Walk::new(role.target_type.clone()).successor(role.name.clone(), walk)
    })
}

/// Predecessor steps up from `fact_type` through `roles`
fn walk_roles_right(roles: &[Role], fact_type: &str, next: Walk) -> Walk {
    match roles.split_first() {
        None => next,
        Some((role, rest)) => Walk::new(fact_type).predecessor(
            role.name.clone(),
            walk_roles_right(rest, &role.target_type, next),
        ),
    }
}

fn apply_existential_condition(
    mut walk: Walk,
    existential: &ExistentialCondition,
    label: &str,
    labels: &LabeledTypes,
) -> WalkResult<Walk> {
    let mut child_walks = walks_from_matches(&existential.matches, labels)?;
    let child = child_walks
        .shift_remove(label)
        .ok_or_else(|| WalkError::DetachedCondition {
            label: label.to_string(),
        })?;
    if child.has_conditions() {
        return Err(WalkError::NestedCondition {
            label: label.to_string(),
        });
    }
    walk.conditions
        .extend(child.steps.into_iter().map(|step| WalkCondition {
            exists: existential.exists,
            step,
        }));
    Ok(walk)
}

fn merge_walks(mut left: Walk, right: Walk) -> WalkResult<Walk> {
    if left.fact_type != right.fact_type {
        return Err(WalkError::TypeConflict {
            left: left.fact_type,
            right: right.fact_type,
        });
    }
    left.steps.extend(right.steps);
    left.conditions.extend(right.conditions);
    Ok(left)
}
