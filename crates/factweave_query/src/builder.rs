//! Builds query descriptions from a specification.
//!
//! The builder threads three things through the matches: the description
//! being extended, the fact slot of every label joined so far, and the
//! branch path of the NOT EXISTS group being filled (empty for the
//! unconditional part of the query). Each negative existential condition
//! forks the description, so one specification may yield several
//! descriptions.
//!
//! A fact type or role unknown to the catalog means no stored fact can
//! match. The affected branch becomes unsatisfiable (`None`) instead of
//! failing the whole compilation.

use crate::description::{FactDescription, InputDescription, QueryDescription};
use crate::error::{QueryError, QueryResult};
use factweave_core::{FactReference, RoleId, SchemaCatalog};
use factweave_spec::{Condition, Label, Match, PathCondition, Projection, Specification};
use indexmap::IndexMap;
use tracing::debug;

/// Fact slot of every label joined so far
type KnownFacts = IndexMap<String, FactDescription>;

/// Result of joining a list of matches
struct EdgesOutcome {
    /// Descriptions completed along the way
    descriptions: Vec<QueryDescription>,
    /// Description representing the full tuple, if satisfiable
    last: Option<QueryDescription>,
    /// Labels known after the matches
    known_facts: KnownFacts,
}

/// Compiles specifications into query descriptions
pub struct DescriptionBuilder<'a, C: SchemaCatalog + ?Sized> {
    catalog: &'a C,
}

impl<'a, C: SchemaCatalog + ?Sized> DescriptionBuilder<'a, C> {
    /// Create a builder over a catalog snapshot
    #[must_use]
    pub fn new(catalog: &'a C) -> Self {
        Self { catalog }
    }

    /// Build the descriptions needed to answer a specification
    ///
    /// Only satisfiable descriptions are returned. The list may be empty.
    ///
    /// # Errors
    ///
    /// Returns error if the start facts do not match the given labels, or
    /// if a path condition refers to a label that is not yet joined
    pub fn build_descriptions(
        &self,
        start: &[FactReference],
        spec: &Specification,
    ) -> QueryResult<Vec<QueryDescription>> {
        if start.len() != spec.given.len() {
            return Err(QueryError::StartCountMismatch {
                start: start.len(),
                given: spec.given.len(),
            });
        }
        for (index, (fact, label)) in start.iter().zip(&spec.given).enumerate() {
            if fact.fact_type != label.fact_type {
                return Err(QueryError::StartTypeMismatch {
                    index,
                    expected: label.fact_type.clone(),
                    actual: fact.fact_type.clone(),
                });
            }
        }

        // Inputs get a slot each, but no parameters until a path uses them.
        let inputs = spec
            .given
            .iter()
            .zip(start)
            .enumerate()
            .map(|(i, (label, fact))| InputDescription {
                label: label.name.clone(),
                fact_index: i + 1,
                fact_type_id: self.catalog.fact_type_id(&label.fact_type),
                fact_hash: fact.hash.clone(),
                fact_type_parameter: None,
                fact_hash_parameter: None,
            })
            .collect();
        let facts: Vec<FactDescription> = spec
            .given
            .iter()
            .enumerate()
            .map(|(i, label)| FactDescription {
                fact_index: i + 1,
                fact_type: label.fact_type.clone(),
            })
            .collect();
        let known_facts = spec
            .given
            .iter()
            .zip(&facts)
            .map(|(label, fact)| (label.name.clone(), fact.clone()))
            .collect();

        let initial = QueryDescription::new(inputs, facts);
        let outcome = self.add_edges(initial, known_facts, &[], "", &spec.matches)?;

        let mut descriptions = outcome.descriptions;
        match outcome.last {
            Some(last) => {
                let projected =
                    self.add_projections(&last, &outcome.known_facts, "", &spec.projections)?;
                descriptions.push(last);
                descriptions.extend(projected);
            }
            None => debug!("specification is unsatisfiable against the catalog"),
        }

        debug!(count = descriptions.len(), "built query descriptions");
        Ok(descriptions)
    }

    fn add_edges(
        &self,
        description: QueryDescription,
        known_facts: KnownFacts,
        path: &[usize],
        prefix: &str,
        matches: &[Match],
    ) -> QueryResult<EdgesOutcome> {
        let mut descriptions = Vec::new();
        let mut current = description;
        let mut known_facts = known_facts;

        for m in matches {
            for condition in &m.conditions {
                match condition {
                    Condition::Path(path_condition) => {
                        match self.add_path_condition(
                            &current,
                            &known_facts,
                            path,
                            &m.unknown,
                            prefix,
                            path_condition,
                        )? {
                            Some((next, known)) => {
                                current = next;
                                known_facts = known;
                            }
                            None => {
                                return Ok(EdgesOutcome {
                                    descriptions,
                                    last: None,
                                    known_facts,
                                });
                            }
                        }
                    }
                    Condition::Existential(existential) if existential.exists => {
                        // The join itself proves existence.
                        let nested = self.add_edges(
                            current.clone(),
                            known_facts.clone(),
                            path,
                            prefix,
                            &existential.matches,
                        )?;
                        descriptions.extend(nested.descriptions);
                        match nested.last {
                            Some(next) => current = next,
                            None => {
                                return Ok(EdgesOutcome {
                                    descriptions,
                                    last: None,
                                    known_facts,
                                });
                            }
                        }
                    }
                    Condition::Existential(existential) => {
                        // Tuples proving the condition false, as their own query.
                        let unconditional = self.add_edges(
                            current.clone(),
                            known_facts.clone(),
                            path,
                            prefix,
                            &existential.matches,
                        )?;

                        let (with_condition, conditional_path) =
                            current.with_not_exists_condition(path)?;
                        let conditional = self.add_edges(
                            with_condition,
                            known_facts.clone(),
                            &conditional_path,
                            prefix,
                            &existential.matches,
                        )?;

                        match conditional.last {
                            Some(next) => {
                                descriptions.extend(unconditional.descriptions);
                                descriptions.extend(unconditional.last);
                                descriptions.extend(conditional.descriptions);
                                current = next;
                            }
                            None => debug!(
                                label = %m.unknown.name,
                                "NOT EXISTS condition can never match, dropping it"
                            ),
                        }
                    }
                }
            }
        }

        Ok(EdgesOutcome {
            descriptions,
            last: Some(current),
            known_facts,
        })
    }

    fn add_path_condition(
        &self,
        description: &QueryDescription,
        known_facts: &KnownFacts,
        path: &[usize],
        unknown: &Label,
        prefix: &str,
        condition: &PathCondition,
    ) -> QueryResult<Option<(QueryDescription, KnownFacts)>> {
        let mut description = description.clone();
        if let Some(input) = description.input_by_label(&condition.label_right) {
            if input.fact_type_parameter.is_none() {
                match description.with_input_parameter(&condition.label_right) {
                    Some(next) => description = next,
                    None => {
                        debug!(label = %condition.label_right, "given fact type is not in the catalog");
                        return Ok(None);
                    }
                }
            }
        }

        let known_fact = known_facts.get(&unknown.name).cloned();
        let role_count = condition.roles_left.len() + condition.roles_right.len();

        // Predecessor joins up the right-hand side.
        let right = known_facts
            .get(&condition.label_right)
            .ok_or_else(|| QueryError::UnknownLabel {
                name: condition.label_right.clone(),
            })?;
        let mut fact_type = right.fact_type.clone();
        let mut fact_index = right.fact_index;
        for (i, role) in condition.roles_right.iter().enumerate() {
            let Some(role_id) = self.resolve_role(&fact_type, &role.name) else {
                return Ok(None);
            };
            let (with_parameter, role_parameter) = description.with_parameter(role_id);
            match &known_fact {
                Some(known) if i == role_count - 1 => {
                    description =
                        with_parameter.with_edge(known.fact_index, fact_index, role_parameter, path)?;
                    fact_index = known.fact_index;
                }
                _ => {
                    let (with_fact, predecessor) = with_parameter.with_fact(&role.target_type);
                    description = with_fact.with_edge(predecessor, fact_index, role_parameter, path)?;
                    fact_index = predecessor;
                }
            }
            fact_type = role.target_type.clone();
        }

        // Resolve the left-hand side walking up from the unknown, then join
        // it in reverse as successor joins.
        let mut fact_type = unknown.fact_type.clone();
        let mut declared = Vec::with_capacity(condition.roles_left.len());
        for role in &condition.roles_left {
            let Some(role_id) = self.resolve_role(&fact_type, &role.name) else {
                return Ok(None);
            };
            declared.push((role_id, fact_type));
            fact_type = role.target_type.clone();
        }
        for (i, (role_id, declaring_type)) in declared.into_iter().rev().enumerate() {
            let (with_parameter, role_parameter) = description.with_parameter(role_id);
            match &known_fact {
                Some(known) if condition.roles_right.len() + i == role_count - 1 => {
                    description =
                        with_parameter.with_edge(fact_index, known.fact_index, role_parameter, path)?;
                    fact_index = known.fact_index;
                }
                _ => {
                    let (with_fact, successor) = with_parameter.with_fact(&declaring_type);
                    description = with_fact.with_edge(fact_index, successor, role_parameter, path)?;
                    fact_index = successor;
                }
            }
        }

        let mut known_facts = known_facts.clone();
        if known_fact.is_none() {
            known_facts.insert(
                unknown.name.clone(),
                FactDescription {
                    fact_index,
                    fact_type: unknown.fact_type.clone(),
                },
            );
            // Facts inside a NOT EXISTS group are never selected.
            if path.is_empty() {
                description = description.with_output(
                    format!("{}{}", prefix, unknown.name),
                    &unknown.fact_type,
                    fact_index,
                );
            }
        }
        Ok(Some((description, known_facts)))
    }

    fn add_projections(
        &self,
        description: &QueryDescription,
        known_facts: &KnownFacts,
        prefix: &str,
        projections: &[Projection],
    ) -> QueryResult<Vec<QueryDescription>> {
        let mut descriptions = Vec::new();
        for projection in projections {
            let Projection::Specification(nested) = projection else {
                continue;
            };
            let nested_prefix = format!("{}{}.", prefix, nested.name);
            let outcome = self.add_edges(
                description.clone(),
                known_facts.clone(),
                &[],
                &nested_prefix,
                &nested.matches,
            )?;
            descriptions.extend(outcome.descriptions);
            if let Some(last) = outcome.last {
                let deeper = self.add_projections(
                    &last,
                    &outcome.known_facts,
                    &nested_prefix,
                    &nested.projections,
                )?;
                descriptions.push(last);
                descriptions.extend(deeper);
            }
        }
        Ok(descriptions)
    }

    fn resolve_role(&self, fact_type: &str, role: &str) -> Option<RoleId> {
        let Some(type_id) = self.catalog.fact_type_id(fact_type) else {
            debug!(fact_type, "fact type is not in the catalog");
            return None;
        };
        let role_id = self.catalog.role_id(type_id, role);
        if role_id.is_none() {
            debug!(fact_type, role, "role is not in the catalog");
        }
        role_id
    }
}
