//! # Customer Duplicate Detection
//!
//! Identity key for dedup is the lower-cased, trimmed `(name, identification)`
//! pair.
//!
//! ## Matching Matrix
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  candidate id │ existing id │ rule                                      │
//! │  ────────────-┼─────────────┼─────────────────────────────────────────  │
//! │  present      │ present     │ duplicate iff name AND id both match      │
//! │  absent       │ absent      │ duplicate iff name matches                │
//! │  only one side│             │ never a duplicate                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! On a match the operation is rejected with a message naming the conflicting
//! customer; records are never silently merged.

use crate::types::Customer;

/// Normalizes a dedup key component: trimmed, lower-cased. An empty or
/// whitespace-only identification counts as absent.
fn normalize(value: &str) -> String {
    value.trim().to_lowercase()
}

/// Finds an existing customer that collides with the candidate
/// `(name, identification)` pair.
///
/// `exclude_id` skips one record, so updates don't collide with themselves.
pub fn find_duplicate<'a>(
    existing: &'a [Customer],
    name: &str,
    identification: Option<&str>,
    exclude_id: Option<&str>,
) -> Option<&'a Customer> {
    let candidate_name = normalize(name);
    let candidate_id = identification.map(normalize).filter(|id| !id.is_empty());

    existing.iter().find(|customer| {
        if Some(customer.id.as_str()) == exclude_id {
            return false;
        }

        if normalize(&customer.name) != candidate_name {
            return false;
        }

        let existing_id = customer
            .identification
            .as_deref()
            .map(normalize)
            .filter(|id| !id.is_empty());

        match (&candidate_id, &existing_id) {
            (Some(a), Some(b)) => a == b,
            (None, None) => true,
            // only one side has an identification: different people may
            // share a name, so this is never considered a duplicate
            _ => false,
        }
    })
}
