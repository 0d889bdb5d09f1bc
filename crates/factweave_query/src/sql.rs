//! SQL rendering of query descriptions.
//!
//! Facts live in `public.fact (fact_id, fact_type_id, hash)` and edges in
//! `public.edge (predecessor_fact_id, successor_fact_id, role_id)`. Fact
//! slot `n` is aliased `f<n>`, edge `n` is aliased `e<n>`, and parameters
//! are positional (`$1`, `$2`, ...).

use crate::builder::DescriptionBuilder;
use crate::description::{EdgeDescription, NotExistsConditionDescription, QueryDescription, SqlParameter};
use crate::error::{QueryError, QueryResult};
use factweave_core::{FactBookmark, FactReference, SchemaCatalog};
use factweave_spec::Specification;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::debug;

/// Column of the result set holding one output fact's hash
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultSetLabel {
    /// Output label
    pub name: String,
    /// Fact type
    #[serde(rename = "type")]
    pub fact_type: String,
    /// Column name (`hash<n>`)
    pub column: String,
}

/// A rendered SQL statement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecificationSqlQuery {
    /// SQL text
    pub sql: String,
    /// Positional parameters
    pub parameters: Vec<SqlParameter>,
    /// Result columns
    pub labels: Vec<ResultSetLabel>,
}

impl QueryDescription {
    /// Render the description as a paginated SQL query
    ///
    /// A non-empty bookmark restricts results to those sorting after it.
    ///
    /// # Errors
    ///
    /// Returns error if the description has nothing to select or contains an
    /// edge that is not connected to the rest of the query
    pub fn generate_sql_query(
        &self,
        bookmark: &FactBookmark,
        limit: u32,
    ) -> QueryResult<SpecificationSqlQuery> {
        if self.outputs().is_empty() {
            return Err(QueryError::NoOutputs);
        }

        let hashes = self
            .outputs()
            .iter()
            .map(|output| format!("f{}.hash as hash{}", output.fact_index, output.fact_index))
            .collect::<Vec<_>>()
            .join(", ");
        let fact_ids = self
            .outputs()
            .iter()
            .map(|output| format!("f{}.fact_id", output.fact_index))
            .collect::<Vec<_>>()
            .join(", ");

        let root = self.root_fact_index()?;
        let mut written = BTreeSet::from([root]);
        let joins = generate_joins(self.edges(), &mut written)?;

        let input_clauses = self
            .inputs()
            .iter()
            .filter_map(|input| {
                let type_parameter = input.fact_type_parameter?;
                let hash_parameter = input.fact_hash_parameter?;
                Some(format!(
                    "f{}.fact_type_id = ${} AND f{}.hash = ${}",
                    input.fact_index, type_parameter, input.fact_index, hash_parameter
                ))
            })
            .collect::<Vec<_>>()
            .join(" AND ");

        let mut not_exists_clauses = String::new();
        for condition in self.not_exists_conditions() {
            not_exists_clauses.push_str(&format!(
                " AND NOT EXISTS ({})",
                generate_not_exists_clause(condition, &written)?
            ));
        }

        let mut parameters = self.parameters().to_vec();
        let bookmark_clause = if bookmark.is_start() {
            String::new()
        } else {
            parameters.push(SqlParameter::IntegerArray(bookmark.fact_ids().to_vec()));
            format!(" AND sort(array[{}], 'desc') > ${}", fact_ids, parameters.len())
        };
        parameters.push(SqlParameter::Integer(i64::from(limit)));
        let limit_parameter = parameters.len();

        let sql = format!(
            "SELECT {}, sort(array[{}], 'desc') as bookmark FROM public.fact f{}{} WHERE {}{}{} ORDER BY bookmark ASC LIMIT ${}",
            hashes, fact_ids, root, joins, input_clauses, not_exists_clauses, bookmark_clause, limit_parameter
        );
        let labels = self
            .outputs()
            .iter()
            .map(|output| ResultSetLabel {
                name: output.label.clone(),
                fact_type: output.fact_type.clone(),
                column: format!("hash{}", output.fact_index),
            })
            .collect();

        Ok(SpecificationSqlQuery {
            sql,
            parameters,
            labels,
        })
    }

    /// The fact slot the query selects `FROM`
    fn root_fact_index(&self) -> QueryResult<usize> {
        let is_input = |index: usize| self.inputs().iter().any(|input| input.fact_index == index);
        match self.edges().first() {
            Some(edge) if is_input(edge.predecessor_fact_index) => Ok(edge.predecessor_fact_index),
            Some(edge) => Ok(edge.successor_fact_index),
            None => self
                .inputs()
                .iter()
                .find(|input| input.fact_type_parameter.is_some())
                .map(|input| input.fact_index)
                .ok_or(QueryError::NoEdges),
        }
    }
}

fn generate_joins(edges: &[EdgeDescription], written: &mut BTreeSet<usize>) -> QueryResult<String> {
    let mut joins = String::new();
    for edge in edges {
        let e = edge.edge_index;
        let predecessor = edge.predecessor_fact_index;
        let successor = edge.successor_fact_index;
        let role = edge.role_parameter;
        match (written.contains(&predecessor), written.contains(&successor)) {
            (true, true) => joins.push_str(&format!(
                " JOIN public.edge e{e} ON e{e}.predecessor_fact_id = f{predecessor}.fact_id AND e{e}.successor_fact_id = f{successor}.fact_id AND e{e}.role_id = ${role}"
            )),
            (true, false) => {
                joins.push_str(&format!(
                    " JOIN public.edge e{e} ON e{e}.predecessor_fact_id = f{predecessor}.fact_id AND e{e}.role_id = ${role}"
                ));
                joins.push_str(&format!(
                    " JOIN public.fact f{successor} ON f{successor}.fact_id = e{e}.successor_fact_id"
                ));
                written.insert(successor);
            }
            (false, true) => {
                joins.push_str(&format!(
                    " JOIN public.edge e{e} ON e{e}.successor_fact_id = f{successor}.fact_id AND e{e}.role_id = ${role}"
                ));
                joins.push_str(&format!(
                    " JOIN public.fact f{predecessor} ON f{predecessor}.fact_id = e{e}.predecessor_fact_id"
                ));
                written.insert(predecessor);
            }
            (false, false) => return Err(QueryError::DisconnectedEdge { edge_index: e }),
        }
    }
    Ok(joins)
}

fn generate_not_exists_clause(
    condition: &NotExistsConditionDescription,
    outer: &BTreeSet<usize>,
) -> QueryResult<String> {
    let (first, rest) = condition
        .edges
        .split_first()
        .ok_or(QueryError::EmptyNotExistsCondition)?;
    let mut written = outer.clone();
    let e = first.edge_index;
    let predecessor = first.predecessor_fact_index;
    let successor = first.successor_fact_index;
    let role = first.role_parameter;

    // The first edge is the subquery's FROM; link it to the outer query.
    let (first_join, link) = match (written.contains(&predecessor), written.contains(&successor)) {
        (true, false) => {
            written.insert(successor);
            (
                format!(" JOIN public.fact f{successor} ON f{successor}.fact_id = e{e}.successor_fact_id"),
                format!("e{e}.predecessor_fact_id = f{predecessor}.fact_id AND e{e}.role_id = ${role}"),
            )
        }
        (false, true) => {
            written.insert(predecessor);
            (
                format!(" JOIN public.fact f{predecessor} ON f{predecessor}.fact_id = e{e}.predecessor_fact_id"),
                format!("e{e}.successor_fact_id = f{successor}.fact_id AND e{e}.role_id = ${role}"),
            )
        }
        _ => return Err(QueryError::DisconnectedEdge { edge_index: e }),
    };

    let joins = generate_joins(rest, &mut written)?;
    let mut nested = String::new();
    for inner in &condition.not_exists_conditions {
        nested.push_str(&format!(
            " AND NOT EXISTS ({})",
            generate_not_exists_clause(inner, &written)?
        ));
    }
    Ok(format!(
        "SELECT 1 FROM public.edge e{e}{first_join}{joins} WHERE {link}{nested}"
    ))
}

/// Compile a specification into SQL queries
///
/// Bookmarks apply to the rendered queries by position; queries beyond the
/// supplied bookmarks start from the beginning. Descriptions with nothing to
/// select are skipped.
///
/// # Errors
///
/// Returns error if the start facts do not match the given labels or the
/// specification cannot be compiled
pub fn sql_from_specification<C: SchemaCatalog + ?Sized>(
    start: &[FactReference],
    bookmarks: &[FactBookmark],
    limit: u32,
    spec: &Specification,
    catalog: &C,
) -> QueryResult<Vec<SpecificationSqlQuery>> {
    let descriptions = DescriptionBuilder::new(catalog).build_descriptions(start, spec)?;
    let start_bookmark = FactBookmark::start();
    let mut queries = Vec::with_capacity(descriptions.len());
    for description in descriptions {
        if description.outputs().is_empty() {
            debug!("skipping query description with no outputs");
            continue;
        }
        let bookmark = bookmarks.get(queries.len()).unwrap_or(&start_bookmark);
        queries.push(description.generate_sql_query(bookmark, limit)?);
    }
    debug!(count = queries.len(), "compiled specification to SQL");
    Ok(queries)
}
