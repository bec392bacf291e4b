use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from the partition registry
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("no partition registered for tenant {0}")]
    UnknownPartition(i64),

    #[error("duplicate registry entry for tenant {0}")]
    DuplicateTenant(i64),

    #[error("registry has no aggregation root")]
    NoAggregationRoot,

    #[error("registry has more than one aggregation root ({0} and {1})")]
    MultipleAggregationRoots(i64, i64),
}

/// One registered site: tenant id plus the partition database it owns.
///
/// The aggregation root is the site whose partition database is also the
/// global catalog database, and whose administrators may request the
/// federated view. Exactly one entry carries the flag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionTarget {
    pub tenant_id: i64,
    pub name: String,
    pub database: String,
    pub aggregation_root: bool,
}

/// Static tenant-to-partition mapping, built once at startup from
/// configuration. No dynamic registration.
#[derive(Debug, Clone)]
pub struct PartitionRegistry {
    entries: BTreeMap<i64, PartitionTarget>,
    root_id: i64,
}

impl PartitionRegistry {
    pub fn from_entries(
        entries: impl IntoIterator<Item = PartitionTarget>,
    ) -> Result<Self, RegistryError> {
        let mut map = BTreeMap::new();
        let mut root_id: Option<i64> = None;

        for entry in entries {
            if entry.aggregation_root {
                if let Some(existing) = root_id {
                    return Err(RegistryError::MultipleAggregationRoots(
                        existing,
                        entry.tenant_id,
                    ));
                }
                root_id = Some(entry.tenant_id);
            }
            if map.insert(entry.tenant_id, entry.clone()).is_some() {
                return Err(RegistryError::DuplicateTenant(entry.tenant_id));
            }
        }

        let root_id = root_id.ok_or(RegistryError::NoAggregationRoot)?;
        Ok(Self { entries: map, root_id })
    }

    /// Resolve a tenant id to its partition. A miss is a configuration-level
    /// fault, not a request error.
    pub fn resolve(&self, tenant_id: i64) -> Result<&PartitionTarget, RegistryError> {
        self.entries
            .get(&tenant_id)
            .ok_or(RegistryError::UnknownPartition(tenant_id))
    }

    pub fn aggregation_root(&self) -> &PartitionTarget {
        &self.entries[&self.root_id]
    }

    /// The catalog store shares the aggregation root's connection target.
    pub fn catalog_database(&self) -> &str {
        &self.aggregation_root().database
    }

    /// Remote sites queried by a federated list, in ascending tenant-id
    /// order. The root is excluded; its records are served by the caller's
    /// own single-partition path.
    pub fn fanout_set(&self) -> Vec<&PartitionTarget> {
        self.entries
            .values()
            .filter(|t| !t.aggregation_root)
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PartitionTarget> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn site(tenant_id: i64, name: &str, root: bool) -> PartitionTarget {
        PartitionTarget {
            tenant_id,
            name: name.to_string(),
            database: format!("medcenter_{}", name),
            aggregation_root: root,
        }
    }

    #[test]
    fn resolves_known_tenants_and_rejects_unknown() {
        let registry = PartitionRegistry::from_entries(vec![
            site(1, "central", true),
            site(2, "north", false),
        ])
        .unwrap();

        assert_eq!(registry.resolve(2).unwrap().database, "medcenter_north");
        assert!(matches!(
            registry.resolve(99),
            Err(RegistryError::UnknownPartition(99))
        ));
    }

    #[test]
    fn fanout_excludes_aggregation_root() {
        let registry = PartitionRegistry::from_entries(vec![
            site(1, "central", true),
            site(2, "north", false),
            site(3, "south", false),
        ])
        .unwrap();

        let fanout: Vec<i64> = registry.fanout_set().iter().map(|t| t.tenant_id).collect();
        assert_eq!(fanout, vec![2, 3]);
        assert_eq!(registry.catalog_database(), "medcenter_central");
    }

    #[test]
    fn rejects_duplicate_and_rootless_registries() {
        assert!(matches!(
            PartitionRegistry::from_entries(vec![site(2, "north", false)]),
            Err(RegistryError::NoAggregationRoot)
        ));
        assert!(matches!(
            PartitionRegistry::from_entries(vec![
                site(1, "central", true),
                site(1, "again", false)
            ]),
            Err(RegistryError::DuplicateTenant(1))
        ));
        assert!(matches!(
            PartitionRegistry::from_entries(vec![
                site(1, "central", true),
                site(2, "north", true)
            ]),
            Err(RegistryError::MultipleAggregationRoots(1, 2))
        ));
    }
}
