//! Query descriptions: immutable join plans over the fact/edge schema.
//!
//! Every `with_*` operation returns a new description and leaves the
//! receiver untouched, so the builder can branch at any point and keep
//! extending each branch independently.

use crate::error::{QueryError, QueryResult};
use factweave_core::{FactTypeId, RoleId};
use serde::{Deserialize, Serialize};

/// Positional SQL parameter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SqlParameter {
    /// Fact type id, role id or limit
    Integer(i64),
    /// Fact hash
    Text(String),
    /// Bookmark fact ids
    IntegerArray(Vec<i64>),
}

impl From<i64> for SqlParameter {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<String> for SqlParameter {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<FactTypeId> for SqlParameter {
    fn from(value: FactTypeId) -> Self {
        Self::Integer(value.0)
    }
}

impl From<RoleId> for SqlParameter {
    fn from(value: RoleId) -> Self {
        Self::Integer(value.0)
    }
}

/// A given fact, bound to a fact slot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputDescription {
    /// Given label
    pub label: String,
    /// Fact slot (`f<index>`)
    pub fact_index: usize,
    /// Resolved type id, if the catalog knows the type
    pub fact_type_id: Option<FactTypeId>,
    /// Hash of the start fact
    pub fact_hash: String,
    /// Parameter holding the type id, once allocated
    pub fact_type_parameter: Option<usize>,
    /// Parameter holding the hash, once allocated
    pub fact_hash_parameter: Option<usize>,
}

/// A fact selected by the query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputDescription {
    /// Output label, prefixed for projections
    pub label: String,
    /// Fact type
    #[serde(rename = "type")]
    pub fact_type: String,
    /// Fact slot
    pub fact_index: usize,
}

/// A fact slot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FactDescription {
    /// Slot index, starting at 1
    pub fact_index: usize,
    /// Fact type
    #[serde(rename = "type")]
    pub fact_type: String,
}

/// An edge joining two fact slots through a role
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeDescription {
    /// Edge alias index (`e<index>`), unique across all branches
    pub edge_index: usize,
    /// Predecessor fact slot
    pub predecessor_fact_index: usize,
    /// Successor fact slot
    pub successor_fact_index: usize,
    /// Parameter holding the role id
    pub role_parameter: usize,
}

/// Edges that must not be matched, with their own nested groups
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotExistsConditionDescription {
    /// Edges in allocation order
    pub edges: Vec<EdgeDescription>,
    /// Nested NOT EXISTS groups
    pub not_exists_conditions: Vec<NotExistsConditionDescription>,
}

impl NotExistsConditionDescription {
    fn edge_count(&self) -> usize {
        self.edges.len() + count_edges(&self.not_exists_conditions)
    }
}

fn count_edges(conditions: &[NotExistsConditionDescription]) -> usize {
    conditions
        .iter()
        .map(NotExistsConditionDescription::edge_count)
        .sum()
}

/// Follow a branch path down the tree of NOT EXISTS groups
fn condition_at<'a>(
    conditions: &'a mut [NotExistsConditionDescription],
    path: &[usize],
) -> QueryResult<&'a mut NotExistsConditionDescription> {
    let (head, tail) = path.split_first().ok_or_else(|| QueryError::UnknownBranch {
        path: path.to_vec(),
    })?;
    let condition = conditions
        .get_mut(*head)
        .ok_or_else(|| QueryError::UnknownBranch {
            path: path.to_vec(),
        })?;
    if tail.is_empty() {
        Ok(condition)
    } else {
        condition_at(&mut condition.not_exists_conditions, tail)
    }
}

/// Join plan for one SQL statement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryDescription {
    inputs: Vec<InputDescription>,
    parameters: Vec<SqlParameter>,
    outputs: Vec<OutputDescription>,
    facts: Vec<FactDescription>,
    edges: Vec<EdgeDescription>,
    not_exists_conditions: Vec<NotExistsConditionDescription>,
}

impl QueryDescription {
    /// Start a description from the given facts
    #[must_use]
    pub fn new(inputs: Vec<InputDescription>, facts: Vec<FactDescription>) -> Self {
        Self {
            inputs,
            parameters: Vec::new(),
            outputs: Vec::new(),
            facts,
            edges: Vec::new(),
            not_exists_conditions: Vec::new(),
        }
    }

    /// Given facts
    #[must_use]
    pub fn inputs(&self) -> &[InputDescription] {
        &self.inputs
    }

    /// Positional parameters allocated so far
    #[must_use]
    pub fn parameters(&self) -> &[SqlParameter] {
        &self.parameters
    }

    /// Selected facts
    #[must_use]
    pub fn outputs(&self) -> &[OutputDescription] {
        &self.outputs
    }

    /// All fact slots
    #[must_use]
    pub fn facts(&self) -> &[FactDescription] {
        &self.facts
    }

    /// Unconditional edges
    #[must_use]
    pub fn edges(&self) -> &[EdgeDescription] {
        &self.edges
    }

    /// Top-level NOT EXISTS groups
    #[must_use]
    pub fn not_exists_conditions(&self) -> &[NotExistsConditionDescription] {
        &self.not_exists_conditions
    }

    /// Find the input bound to a given label
    #[must_use]
    pub fn input_by_label(&self, label: &str) -> Option<&InputDescription> {
        self.inputs.iter().find(|input| input.label == label)
    }

    /// Allocate the type and hash parameters of an input
    ///
    /// Returns `None` when the label is not an input or its fact type is
    /// unknown to the catalog, in which case nothing can match.
    #[must_use]
    pub fn with_input_parameter(&self, label: &str) -> Option<Self> {
        let position = self.inputs.iter().position(|input| input.label == label)?;
        let input = &self.inputs[position];
        let fact_type_id = input.fact_type_id?;
        let fact_hash = input.fact_hash.clone();

        let (next, fact_type_parameter) = self.with_parameter(fact_type_id);
        let (mut next, fact_hash_parameter) = next.with_parameter(fact_hash);
        let input = &mut next.inputs[position];
        input.fact_type_parameter = Some(fact_type_parameter);
        input.fact_hash_parameter = Some(fact_hash_parameter);
        Some(next)
    }

    /// Append a parameter, returning its 1-based position
    #[must_use]
    pub fn with_parameter(&self, parameter: impl Into<SqlParameter>) -> (Self, usize) {
        let mut next = self.clone();
        next.parameters.push(parameter.into());
        let index = next.parameters.len();
        (next, index)
    }

    /// Allocate a new fact slot, returning its index
    #[must_use]
    pub fn with_fact(&self, fact_type: &str) -> (Self, usize) {
        let mut next = self.clone();
        let fact_index = next.facts.len() + 1;
        next.facts.push(FactDescription {
            fact_index,
            fact_type: fact_type.to_string(),
        });
        (next, fact_index)
    }

    /// Add an edge to the branch identified by `path`
    ///
    /// An empty path is the unconditional branch.
    ///
    /// # Errors
    ///
    /// Returns error if `path` does not name an existing NOT EXISTS group
    pub fn with_edge(
        &self,
        predecessor_fact_index: usize,
        successor_fact_index: usize,
        role_parameter: usize,
        path: &[usize],
    ) -> QueryResult<Self> {
        let mut next = self.clone();
        let edge = EdgeDescription {
            edge_index: self.edge_count() + 1,
            predecessor_fact_index,
            successor_fact_index,
            role_parameter,
        };
        if path.is_empty() {
            next.edges.push(edge);
        } else {
            condition_at(&mut next.not_exists_conditions, path)?.edges.push(edge);
        }
        Ok(next)
    }

    /// Select a fact slot under a label
    #[must_use]
    pub fn with_output(&self, label: impl Into<String>, fact_type: &str, fact_index: usize) -> Self {
        let mut next = self.clone();
        next.outputs.push(OutputDescription {
            label: label.into(),
            fact_type: fact_type.to_string(),
            fact_index,
        });
        next
    }

    /// Open a NOT EXISTS group under the branch identified by `path`
    ///
    /// Returns the path of the new group.
    ///
    /// # Errors
    ///
    /// Returns error if `path` does not name an existing NOT EXISTS group
    pub fn with_not_exists_condition(&self, path: &[usize]) -> QueryResult<(Self, Vec<usize>)> {
        let mut next = self.clone();
        let siblings = if path.is_empty() {
            &mut next.not_exists_conditions
        } else {
            &mut condition_at(&mut next.not_exists_conditions, path)?.not_exists_conditions
        };
        siblings.push(NotExistsConditionDescription::default());
        let mut new_path = path.to_vec();
        new_path.push(siblings.len() - 1);
        Ok((next, new_path))
    }

    /// Number of edges across every branch
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.edges.len() + count_edges(&self.not_exists_conditions)
    }
}
