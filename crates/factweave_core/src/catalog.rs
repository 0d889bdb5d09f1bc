//! Schema catalog: numeric ids for fact types and roles.
//!
//! Storage identifies fact types and roles by integer ids. Compilers look
//! them up through [`SchemaCatalog`], which is passed in explicitly so that
//! one compilation sees a single consistent snapshot of the schema.

use crate::error::{CoreError, CoreResult};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Numeric id of a fact type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FactTypeId(pub i64);

/// Numeric id of a role, unique within its declaring fact type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoleId(pub i64);

impl fmt::Display for FactTypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for RoleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Read-only lookup of fact type and role ids
///
/// A miss is not an error: it means no fact of that shape has ever been
/// stored, so any query that needs it cannot match anything.
pub trait SchemaCatalog {
    /// Look up the id of a fact type
    fn fact_type_id(&self, fact_type: &str) -> Option<FactTypeId>;

    /// Look up the id of a role declared by a fact type
    fn role_id(&self, fact_type_id: FactTypeId, role: &str) -> Option<RoleId>;
}

impl<C: SchemaCatalog + ?Sized> SchemaCatalog for &C {
    fn fact_type_id(&self, fact_type: &str) -> Option<FactTypeId> {
        (**self).fact_type_id(fact_type)
    }

    fn role_id(&self, fact_type_id: FactTypeId, role: &str) -> Option<RoleId> {
        (**self).role_id(fact_type_id, role)
    }
}

/// In-memory schema catalog
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TypeCatalog {
    fact_types: IndexMap<String, FactTypeId>,
    roles: IndexMap<FactTypeId, IndexMap<String, RoleId>>,
}

impl TypeCatalog {
    /// Create an empty catalog
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a fact type
    ///
    /// # Errors
    ///
    /// Returns error if the fact type is already registered
    pub fn insert_fact_type(&mut self, name: impl Into<String>, id: FactTypeId) -> CoreResult<()> {
        let name = name.into();
        if self.fact_types.contains_key(&name) {
            return Err(CoreError::DuplicateFactType { name });
        }
        self.fact_types.insert(name, id);
        Ok(())
    }

    /// Register a role on a previously registered fact type
    ///
    /// # Errors
    ///
    /// Returns error if the fact type is unknown or already declares the role
    pub fn insert_role(
        &mut self,
        fact_type: &str,
        role: impl Into<String>,
        id: RoleId,
    ) -> CoreResult<()> {
        let type_id = self
            .fact_types
            .get(fact_type)
            .copied()
            .ok_or_else(|| CoreError::UnknownFactType {
                name: fact_type.to_string(),
            })?;
        let role = role.into();
        let roles = self.roles.entry(type_id).or_default();
        if roles.contains_key(&role) {
            return Err(CoreError::DuplicateRole {
                fact_type: fact_type.to_string(),
                role,
            });
        }
        roles.insert(role, id);
        Ok(())
    }

    /// Builder form of [`TypeCatalog::insert_fact_type`]
    ///
    /// # Errors
    ///
    /// Returns error if the fact type is already registered
    pub fn with_fact_type(mut self, name: impl Into<String>, id: i64) -> CoreResult<Self> {
        self.insert_fact_type(name, FactTypeId(id))?;
        Ok(self)
    }

    /// Builder form of [`TypeCatalog::insert_role`]
    ///
    /// # Errors
    ///
    /// Returns error if the fact type is unknown or already declares the role
    pub fn with_role(mut self, fact_type: &str, role: impl Into<String>, id: i64) -> CoreResult<Self> {
        self.insert_role(fact_type, role, RoleId(id))?;
        Ok(self)
    }

    /// Number of registered fact types
    #[must_use]
    pub fn fact_type_count(&self) -> usize {
        self.fact_types.len()
    }

    /// Number of registered roles across all fact types
    #[must_use]
    pub fn role_count(&self) -> usize {
        self.roles.values().map(IndexMap::len).sum()
    }
}

impl SchemaCatalog for TypeCatalog {
    fn fact_type_id(&self, fact_type: &str) -> Option<FactTypeId> {
        self.fact_types.get(fact_type).copied()
    }

    fn role_id(&self, fact_type_id: FactTypeId, role: &str) -> Option<RoleId> {
        self.roles.get(&fact_type_id)?.get(role).copied()
    }
}
