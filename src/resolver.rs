//! Record resolution.
//!
//! Lookups scan the store in order and the first matching record wins, even
//! when a later record would match more specifically.

use log::trace;

use crate::names::{normalize, QueryToken};
use crate::store::{Record, RecordStore};

/// Find the record a classified token identifies.
///
/// Numeric tokens match a record id exactly. Textual tokens match the first
/// record whose lower-cased name is contained in the token; failing that, the
/// token's first label is compared against every record's id aliases.
pub fn resolve<'a>(store: &'a RecordStore, token: &QueryToken) -> Option<&'a Record> {
    match token {
        QueryToken::Numeric(id) => store.iter().find(|record| record.id == *id),
        QueryToken::Textual { needle, label } => store
            .iter()
            .find(|record| !record.match_name().is_empty() && needle.contains(record.match_name()))
            .or_else(|| find_by_alias(store, label)),
    }
}

/// Match an exact id alias such as `42`, `e42` or `e-42`.
fn find_by_alias<'a>(store: &'a RecordStore, label: &str) -> Option<&'a Record> {
    store
        .iter()
        .filter(|record| record.has_id())
        .find(|record| record.id_aliases().iter().any(|alias| alias == label))
}

/// Normalize a raw query token and resolve it.
///
/// # Arguments
/// * `store` - The record store to search.
/// * `raw` - A DNS question name or an HTTP host label / path.
///
/// # Returns
/// The matching record, or `None` if nothing matches.
pub fn find_record<'a>(store: &'a RecordStore, raw: &str) -> Option<&'a Record> {
    let token = normalize(raw);
    let record = resolve(store, &token);
    trace!("{:?} resolved to {:?}", token, record.map(|r| r.id));
    record
}
