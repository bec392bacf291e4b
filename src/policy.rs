//! Request-boundary policy predicates.

use crate::auth::CallerIdentity;
use crate::registry::PartitionRegistry;

/// Whether a caller gets the federated all-sites view instead of their own
/// partition: an administrative caller homed at the aggregation root who is
/// not also a clinician. A clinician-admin at the root sees only the root
/// partition; this is a deliberate distinct-path rule. The predicate never
/// widens write access.
pub fn federated_view_allowed(identity: &CallerIdentity, registry: &PartitionRegistry) -> bool {
    identity.roles.administrative
        && !identity.roles.clinician
        && registry
            .resolve(identity.tenant_id)
            .map(|target| target.aggregation_root)
            .unwrap_or(false)
}
