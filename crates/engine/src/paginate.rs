//! The core seek/filter/slice algorithm, operating purely on keys.
//! Hydration (fetching and decrypting the bodies behind each key) is a
//! separate step left to the caller.

use progressdb_core::key::gen_softdel_key;
use progressdb_storage::LsmStore;

use crate::error::Result;
use crate::request::{Boundary, PaginationRequest};

/// A page of keys plus the metadata needed to build `has_before`/
/// `has_after` in a response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    /// The keys in this page, in the order they should be presented.
    pub keys: Vec<String>,
    /// Whether a key exists before the first item in `keys`.
    pub has_before: bool,
    /// Whether a key exists after the last item in `keys`.
    pub has_after: bool,
}

/// Collect every non-deleted key under `prefix` from `store`, ascending,
/// consulting `index_store`'s soft-delete markers unless
/// `include_deleted` is set. `target_of` maps a raw key under `prefix`
/// to the key that would carry its soft-delete marker — identity for
/// message keys, `ParseUserOwnsThread`'s extracted thread key for
/// relationship keys.
pub fn collect_live_ascending(
    store: &LsmStore,
    index_store: &LsmStore,
    prefix: &str,
    include_deleted: bool,
    target_of: impl Fn(&str) -> Result<String>,
) -> Result<Vec<String>> {
    let entries = store.iter_prefix(prefix.as_bytes(), false)?;
    let mut out = Vec::with_capacity(entries.len());
    for (key, _value) in entries {
        let key_str = String::from_utf8_lossy(&key).into_owned();
        if include_deleted {
            out.push(key_str);
            continue;
        }
        let target = target_of(&key_str)?;
        let is_deleted = index_store.get(gen_softdel_key(&target).as_bytes())?.is_some();
        if !is_deleted {
            out.push(key_str);
        }
    }
    Ok(out)
}

/// Build a page from an ascending, already-deletion-filtered key list.
pub fn paginate(live: &[String], request: &PaginationRequest) -> Page {
    let limit = request.limit.max(1);
    match &request.boundary {
        Boundary::None => {
            let start = live.len().saturating_sub(limit);
            let mut keys: Vec<String> = live[start..].to_vec();
            keys.reverse();
            Page { has_before: start > 0, has_after: false, keys }
        }
        Boundary::After(ref_key) => {
            let pos = live.partition_point(|k| k.as_str() <= ref_key.as_str());
            let end = (pos + limit).min(live.len());
            Page { keys: live[pos..end].to_vec(), has_before: pos > 0, has_after: end < live.len() }
        }
        Boundary::Before(ref_key) => {
            let pos = live.partition_point(|k| k.as_str() < ref_key.as_str());
            let start = pos.saturating_sub(limit);
            let mut keys: Vec<String> = live[start..pos].to_vec();
            keys.reverse();
            Page { has_before: start > 0, has_after: pos < live.len(), keys }
        }
        Boundary::Anchor(ref_key) => {
            let half = (limit / 2).max(1);
            match live.binary_search(ref_key) {
                Ok(idx) => {
                    let before_start = idx.saturating_sub(half);
                    let after_end = (idx + 1 + half).min(live.len());
                    let mut keys: Vec<String> = live[before_start..idx].to_vec();
                    keys.push(live[idx].clone());
                    keys.extend_from_slice(&live[idx + 1..after_end]);
                    Page { has_before: before_start > 0, has_after: after_end < live.len(), keys }
                }
                Err(idx) => {
                    // ref is soft-deleted or never existed: split around
                    // where it would have sorted, without including it.
                    let before_start = idx.saturating_sub(half);
                    let after_end = (idx + half).min(live.len());
                    let mut keys: Vec<String> = live[before_start..idx].to_vec();
                    keys.extend_from_slice(&live[idx..after_end]);
                    Page { has_before: before_start > 0, has_after: after_end < live.len(), keys }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::Boundary;

    fn sample(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("k{:03}", i)).collect()
    }

    fn req(limit: usize, boundary: Boundary) -> PaginationRequest {
        PaginationRequest { limit, boundary, sort_by: Default::default(), order_by: Default::default(), include_deleted: false }
    }

    #[test]
    fn initial_load_returns_newest_first_and_reports_more() {
        let live = sample(10);
        let page = paginate(&live, &req(3, Boundary::None));
        assert_eq!(page.keys, vec!["k009", "k008", "k007"]);
        assert!(page.has_before);
        assert!(!page.has_after);
    }

    #[test]
    fn initial_load_under_limit_reports_no_more() {
        let live = sample(2);
        let page = paginate(&live, &req(5, Boundary::None));
        assert_eq!(page.keys, vec!["k001", "k000"]);
        assert!(!page.has_before);
    }

    #[test]
    fn after_skips_the_exact_match_and_walks_forward() {
        let live = sample(10);
        let page = paginate(&live, &req(3, Boundary::After("k004".into())));
        assert_eq!(page.keys, vec!["k005", "k006", "k007"]);
        assert!(page.has_before);
        assert!(page.has_after);
    }

    #[test]
    fn before_walks_backward_and_is_the_inverse_of_after() {
        let live = sample(10);
        let page = paginate(&live, &req(3, Boundary::Before("k005".into())));
        assert_eq!(page.keys, vec!["k004", "k003", "k002"]);
        assert!(page.has_before);
        assert!(page.has_after);
    }

    #[test]
    fn anchor_centers_the_reference_key() {
        let live = sample(10);
        let page = paginate(&live, &req(4, Boundary::Anchor("k005".into())));
        assert!(page.keys.contains(&"k005".to_string()));
        let idx = page.keys.iter().position(|k| k == "k005").unwrap();
        assert!(idx > 0 && idx < page.keys.len() - 1);
    }

    #[test]
    fn anchor_on_a_missing_key_splits_around_its_would_be_position() {
        let live = sample(10);
        let page = paginate(&live, &req(4, Boundary::Anchor("k005x".into())));
        assert!(!page.keys.is_empty());
    }
}
