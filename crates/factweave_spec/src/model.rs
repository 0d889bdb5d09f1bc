//! Specification model.
//!
//! A specification starts from one or more given facts, matches unknown
//! facts reachable from them through predecessor/successor roles, and
//! projects the results. Values are built once and never mutated.

use serde::{Deserialize, Serialize};

/// A named slot bound to a fact type
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Label {
    /// Label name, unique within its scope
    pub name: String,
    /// Fact type bound to the label
    #[serde(rename = "type")]
    pub fact_type: String,
}

impl Label {
    /// Create a new label
    #[must_use]
    pub fn new(name: impl Into<String>, fact_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fact_type: fact_type.into(),
        }
    }
}

/// A named predecessor edge leading to `target_type`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Role {
    /// Role name as declared on the successor type
    pub name: String,
    /// Type of the predecessor the role points to
    pub target_type: String,
}

impl Role {
    /// Create a new role
    #[must_use]
    pub fn new(name: impl Into<String>, target_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            target_type: target_type.into(),
        }
    }
}

/// Join predicate of a match
///
/// The unknown followed by `roles_left` reaches the same fact as
/// `label_right` followed by `roles_right`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PathCondition {
    /// Roles walked up from the unknown
    pub roles_left: Vec<Role>,
    /// Previously bound label on the other side
    pub label_right: String,
    /// Roles walked up from `label_right`
    pub roles_right: Vec<Role>,
}

impl PathCondition {
    /// Create a new path condition
    #[must_use]
    pub fn new(roles_left: Vec<Role>, label_right: impl Into<String>, roles_right: Vec<Role>) -> Self {
        Self {
            roles_left,
            label_right: label_right.into(),
            roles_right,
        }
    }
}

/// Nested matches that must (or must not) produce at least one fact
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExistentialCondition {
    /// `true` for "exists", `false` for "not exists"
    pub exists: bool,
    /// Matches evaluated in the scope of the enclosing match
    pub matches: Vec<Match>,
}

impl ExistentialCondition {
    /// Create a new existential condition
    #[must_use]
    pub fn new(exists: bool, matches: Vec<Match>) -> Self {
        Self { exists, matches }
    }
}

/// Condition attached to a match
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Condition {
    /// Join predicate
    Path(PathCondition),
    /// Existence obligation
    Existential(ExistentialCondition),
}

/// Introduces an unknown label constrained by conditions
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Match {
    /// Label being introduced
    pub unknown: Label,
    /// Conditions in declaration order
    pub conditions: Vec<Condition>,
}

impl Match {
    /// Create a new match
    #[must_use]
    pub fn new(unknown: Label, conditions: Vec<Condition>) -> Self {
        Self { unknown, conditions }
    }

    /// Path conditions in declaration order
    pub fn path_conditions(&self) -> impl Iterator<Item = &PathCondition> {
        self.conditions.iter().filter_map(|condition| match condition {
            Condition::Path(path) => Some(path),
            Condition::Existential(_) => None,
        })
    }

    /// Existential conditions in declaration order
    pub fn existential_conditions(&self) -> impl Iterator<Item = &ExistentialCondition> {
        self.conditions.iter().filter_map(|condition| match condition {
            Condition::Existential(existential) => Some(existential),
            Condition::Path(_) => None,
        })
    }

    /// The single path condition, if the match is well formed
    #[must_use]
    pub fn path_condition(&self) -> Option<&PathCondition> {
        let mut paths = self.path_conditions();
        match (paths.next(), paths.next()) {
            (Some(path), None) => Some(path),
            _ => None,
        }
    }
}

/// Nested specification projected under a name
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SpecificationProjection {
    /// Name of the projected collection
    pub name: String,
    /// Matches joined onto the outer tuple
    pub matches: Vec<Match>,
    /// Projections of the nested tuple
    pub projections: Vec<Projection>,
}

/// Output component of a specification
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Projection {
    /// Scalar field of a labeled fact
    Field {
        /// Output name (empty for a single unnamed projection)
        name: String,
        /// Source label
        label: String,
        /// Field name
        field: String,
    },
    /// Hash of a labeled fact
    Hash {
        /// Output name
        name: String,
        /// Source label
        label: String,
    },
    /// The labeled fact itself
    Fact {
        /// Output name
        name: String,
        /// Source label
        label: String,
    },
    /// Nested specification
    Specification(SpecificationProjection),
}

impl Projection {
    /// Output name of the projection
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Field { name, .. } | Self::Hash { name, .. } | Self::Fact { name, .. } => name,
            Self::Specification(spec) => &spec.name,
        }
    }
}

/// Declarative description of a graph traversal
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Specification {
    /// Starting facts
    pub given: Vec<Label>,
    /// Matches in declaration order
    pub matches: Vec<Match>,
    /// Output projections
    pub projections: Vec<Projection>,
}

impl Specification {
    /// Create a new specification
    #[must_use]
    pub fn new(given: Vec<Label>, matches: Vec<Match>, projections: Vec<Projection>) -> Self {
        Self {
            given,
            matches,
            projections,
        }
    }

    /// Look up a given label by name
    #[must_use]
    pub fn given_label(&self, name: &str) -> Option<&Label> {
        self.given.iter().find(|label| label.name == name)
    }

    /// Labels introduced by the top-level matches, in order
    pub fn unknowns(&self) -> impl Iterator<Item = &Label> {
        self.matches.iter().map(|m| &m.unknown)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn office_match() -> Match {
        Match::new(
            Label::new("office", "Office"),
            vec![
                Condition::Path(PathCondition::new(
                    vec![Role::new("company", "Company")],
                    "company",
                    vec![],
                )),
                Condition::Existential(ExistentialCondition::new(false, vec![])),
            ],
        )
    }

    #[test]
    fn test_path_condition_single() {
        let m = office_match();
        let path = m.path_condition().unwrap();
        assert_eq!(path.label_right, "company");
        assert_eq!(m.existential_conditions().count(), 1);
    }

    #[test]
    fn test_path_condition_missing() {
        let m = Match::new(Label::new("x", "X"), vec![]);
        assert!(m.path_condition().is_none());
    }

    #[test]
    fn test_path_condition_multiple() {
        let path = Condition::Path(PathCondition::new(vec![], "a", vec![]));
        let m = Match::new(Label::new("x", "X"), vec![path.clone(), path]);
        assert!(m.path_condition().is_none());
        assert_eq!(m.path_conditions().count(), 2);
    }

    #[test]
    fn test_projection_name() {
        let projection = Projection::Hash {
            name: "id".to_string(),
            label: "office".to_string(),
        };
        assert_eq!(projection.name(), "id");
    }

    #[test]
    fn test_condition_json_tag() {
        let condition = Condition::Path(PathCondition::new(vec![], "company", vec![]));
        let json = serde_json::to_value(&condition).unwrap();
        assert_eq!(json["type"], "path");
        assert_eq!(json["label_right"], "company");
    }

    #[test]
    fn test_given_label() {
        let spec = Specification::new(vec![Label::new("company", "Company")], vec![office_match()], vec![]);
        assert_eq!(spec.given_label("company").unwrap().fact_type, "Company");
        assert!(spec.given_label("office").is_none());
        assert_eq!(spec.unknowns().count(), 1);
    }
}
