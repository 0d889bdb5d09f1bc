//! Fact types and roles mentioned by a specification.

use crate::model::{Condition, Match, Projection, Role, Specification};
use factweave_core::{CoreResult, FactTypeId, RoleId, TypeCatalog};
use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};

/// A role as declared on its successor type
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RoleDefinition {
    /// Successor type declaring the role
    pub defining_fact_type: String,
    /// Role name
    pub name: String,
    /// Predecessor type the role points to
    pub target_type: String,
}

#[derive(Default)]
struct Collector {
    fact_types: IndexSet<String>,
    roles: IndexSet<RoleDefinition>,
}

impl Collector {
    fn fact_type(&mut self, fact_type: &str) {
        self.fact_types.insert(fact_type.to_string());
    }

    fn chain(&mut self, start: &str, roles: &[Role]) {
        let mut current = start.to_string();
        for role in roles {
            self.fact_type(&role.target_type);
            self.roles.insert(RoleDefinition {
                defining_fact_type: current,
                name: role.name.clone(),
                target_type: role.target_type.clone(),
            });
            current = role.target_type.clone();
        }
    }

    fn matches(&mut self, matches: &[Match], scope: &mut IndexMap<String, String>) {
        for m in matches {
            self.fact_type(&m.unknown.fact_type);
            scope.insert(m.unknown.name.clone(), m.unknown.fact_type.clone());
            for condition in &m.conditions {
                match condition {
                    Condition::Path(path) => {
                        self.chain(&m.unknown.fact_type, &path.roles_left);
                        if let Some(right_type) = scope.get(&path.label_right).cloned() {
                            self.chain(&right_type, &path.roles_right);
                        }
                    }
                    Condition::Existential(existential) => {
                        self.matches(&existential.matches, &mut scope.clone());
                    }
                }
            }
        }
    }

    fn projections(&mut self, projections: &[Projection], scope: &IndexMap<String, String>) {
        for projection in projections {
            if let Projection::Specification(nested) = projection {
                let mut inner = scope.clone();
                self.matches(&nested.matches, &mut inner);
                self.projections(&nested.projections, &inner);
            }
        }
    }
}

impl Specification {
    fn collect(&self) -> Collector {
        let mut collector = Collector::default();
        let mut scope = IndexMap::new();
        for label in &self.given {
            collector.fact_type(&label.fact_type);
            scope.insert(label.name.clone(), label.fact_type.clone());
        }
        collector.matches(&self.matches, &mut scope);
        collector.projections(&self.projections, &scope);
        collector
    }

    /// Every fact type mentioned, in first-appearance order
    #[must_use]
    pub fn fact_types(&self) -> Vec<String> {
        self.collect().fact_types.into_iter().collect()
    }

    /// Every role traversed, in first-appearance order
    #[must_use]
    pub fn roles(&self) -> Vec<RoleDefinition> {
        self.collect().roles.into_iter().collect()
    }
}

/// Build a catalog numbering the specification's fact types and roles from 1
///
/// # Errors
///
/// Returns error if the catalog rejects a registration
pub fn infer_catalog(spec: &Specification) -> CoreResult<TypeCatalog> {
    let collector = spec.collect();
    let mut catalog = TypeCatalog::new();
    for (index, fact_type) in collector.fact_types.into_iter().enumerate() {
        catalog.insert_fact_type(fact_type, FactTypeId(index as i64 + 1))?;
    }
    for (index, role) in collector.roles.into_iter().enumerate() {
        catalog.insert_role(&role.defining_fact_type, role.name, RoleId(index as i64 + 1))?;
    }
    Ok(catalog)
}
