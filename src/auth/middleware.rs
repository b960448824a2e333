use crate::auth::models::{Actor, Role};

/// Map account role tags to the role set understood by the access policy.
///
/// Unknown tags are dropped; the result is sorted and free of duplicates.
pub fn map_claims_to_roles(groups: &[String]) -> Vec<Role> {
    let mut roles: Vec<Role> = groups
        .iter()
        .filter_map(|g| Role::from_str_ci(g))
        .collect();
    roles.sort();
    roles.dedup();
    roles
}

/// Build an `Actor` from an account's identity and role tags.
pub fn build_actor(id: String, email: String, groups: &[String]) -> Actor {
    Actor {
        id,
        email,
        roles: map_claims_to_roles(groups),
    }
}
