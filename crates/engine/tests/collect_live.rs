use progressdb_core::key::gen_softdel_key;
use progressdb_durability::WalConfig;
use progressdb_engine::{collect_live_ascending, paginate, PaginationRequest};
use progressdb_storage::{LsmStore, WriteOpt};
use tempfile::tempdir;

#[test]
fn deleted_entries_are_excluded_unless_requested() {
    let dir = tempdir().unwrap();
    let store = LsmStore::open(dir.path().join("store"), WalConfig::disabled()).unwrap();
    let index = LsmStore::open(dir.path().join("index"), WalConfig::disabled()).unwrap();

    for i in 0..5 {
        let key = format!("m:0000000000000000001:{:020}", i);
        store.set(key.as_bytes(), b"{}", WriteOpt::default()).unwrap();
    }
    let deleted_key = format!("m:0000000000000000001:{:020}", 2);
    index.set(gen_softdel_key(&deleted_key).as_bytes(), b"1", WriteOpt::default()).unwrap();

    let live = collect_live_ascending(&store, &index, "m:0000000000000000001:", false, |k| Ok(k.to_string())).unwrap();
    assert_eq!(live.len(), 4);
    assert!(!live.contains(&deleted_key));

    let all = collect_live_ascending(&store, &index, "m:0000000000000000001:", true, |k| Ok(k.to_string())).unwrap();
    assert_eq!(all.len(), 5);

    let page = paginate(&live, &PaginationRequest::initial(2));
    assert_eq!(page.keys.len(), 2);
    assert!(page.has_before);
}
