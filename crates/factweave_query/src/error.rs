//! Query compilation errors.

use thiserror::Error;

/// Result type for query compilation
pub type QueryResult<T> = Result<T, QueryError>;

/// Structural failure while compiling a specification to SQL
///
/// An unknown fact type or role is not an error: the affected branch is
/// simply dropped.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    /// Start facts do not line up with the given labels
    #[error("The number of start facts ({start}) does not equal the number of inputs ({given})")]
    StartCountMismatch {
        /// Number of start facts supplied
        start: usize,
        /// Number of given labels
        given: usize,
    },

    /// A start fact has the wrong type
    #[error("The type of start fact {index} ({actual}) does not match the type of input {index} ({expected})")]
    StartTypeMismatch {
        /// Position of the start fact
        index: usize,
        /// Type of the given label
        expected: String,
        /// Type of the supplied fact
        actual: String,
    },

    /// A path condition refers to a label that has not been joined
    #[error("Label {name} is not known at this point in the query")]
    UnknownLabel {
        /// Label name
        name: String,
    },

    /// An edge joins two facts neither of which is reachable yet
    #[error("Edge e{edge_index} is not connected to any joined fact")]
    DisconnectedEdge {
        /// Alias index of the edge
        edge_index: usize,
    },

    /// A branch path that does not name a NOT EXISTS group
    #[error("No NOT EXISTS condition at {path:?}")]
    UnknownBranch {
        /// Indices from the top-level group downwards
        path: Vec<usize>,
    },

    /// A NOT EXISTS group with no edges
    #[error("NOT EXISTS condition has no edges")]
    EmptyNotExistsCondition,

    /// Nothing to select
    #[error("Query has no outputs")]
    NoOutputs,

    /// Nothing to join from
    #[error("Query has no edges")]
    NoEdges,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_start_type_mismatch_display() {
        let err = QueryError::StartTypeMismatch {
            index: 0,
            expected: "Root".to_string(),
            actual: "Blog".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "The type of start fact 0 (Blog) does not match the type of input 0 (Root)"
        );
    }
}
