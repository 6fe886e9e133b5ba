//! Endpoint Template Registry and Tenant Endpoint Manager.
//!
//! Neither performs authorization; callers reach them only after the gate
//! has allowed the request.

pub mod endpoints;
pub mod registry;

/// Path ids that are not integers cannot name anything.
pub(crate) fn parse_id(raw: &str) -> Option<i64> {
    raw.trim().parse::<i64>().ok().filter(|id| *id > 0)
}
