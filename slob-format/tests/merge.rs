//! Multi-archive merge: preference ranking, dedup, and per-archive
//! lookup-failure isolation.

mod support;

use slob_format::{find, Archive, SlobError, Strength};
use support::{ArchiveBuilder, Item};
use tempfile::tempdir;

fn archive_with_apple(dir: &std::path::Path, name: &str, uri: &str, body: &[u8]) -> Archive {
    let path = dir.join(name);
    ArchiveBuilder::new()
        .tag("uri", uri)
        .push_ref("apple", 0, 0, "")
        .push_bin(vec![Item {
            content_type_id: 0,
            bytes: body.to_vec(),
        }])
        .write_to(&path);
    Archive::open(&path).unwrap()
}

#[test]
fn preferred_archive_is_ranked_first() {
    let dir = tempdir().unwrap();
    let a = archive_with_apple(dir.path(), "a.slob", "slob:a", b"from a");
    let b = archive_with_apple(dir.path(), "b.slob", "slob:b", b"from b");

    let archives = vec![a.clone(), b.clone()];
    let results: Vec<_> = find("apple", &archives, Some(&b), Some(Strength::Quaternary)).collect();

    assert_eq!(results.len(), 2);
    assert_eq!(results[0].content().unwrap().data(), b"from b");
    assert_eq!(results[1].content().unwrap().data(), b"from a");
}

#[test]
fn results_from_different_archives_are_not_deduplicated() {
    let dir = tempdir().unwrap();
    let a = archive_with_apple(dir.path(), "a.slob", "slob:a", b"from a");
    let b = archive_with_apple(dir.path(), "b.slob", "slob:b", b"from b");

    let archives = vec![a, b];
    let results: Vec<_> = find("apple", &archives, None, Some(Strength::Quaternary)).collect();

    assert_eq!(results.len(), 2);
}

#[test]
fn up_to_strength_bounds_the_cascade() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("only.slob");
    ArchiveBuilder::new()
        .push_ref("apple", 0, 0, "")
        .push_bin(vec![Item {
            content_type_id: 0,
            bytes: b"a red fruit".to_vec(),
        }])
        .write_to(&path);
    let archive = Archive::open(&path).unwrap();

    let archives = vec![archive];
    let exact_only: Vec<_> = find("apple", &archives, None, Some(Strength::Quaternary)).collect();
    assert_eq!(exact_only.len(), 1);

    let none_at_all: Vec<_> =
        find("nonexistent", &archives, None, Some(Strength::Quaternary)).collect();
    assert!(none_at_all.is_empty());
}

#[test]
fn a_corrupt_archive_does_not_abort_the_merge() {
    let dir = tempdir().unwrap();

    let good_path = dir.path().join("good.slob");
    ArchiveBuilder::new()
        .tag("uri", "slob:good")
        .push_ref("apple", 0, 0, "")
        .push_bin(vec![Item {
            content_type_id: 0,
            bytes: b"a red fruit".to_vec(),
        }])
        .write_to(&good_path);
    let good = Archive::open(&good_path).unwrap();

    // Build a second, structurally-valid archive, then corrupt its sole
    // ref-list/key-list position-table entry so that every positional
    // read into its data region runs off the end of the file. The
    // header still parses and the file-size invariant still holds, so
    // `Archive::open` succeeds; only `find` on this archive fails.
    let (mut corrupt_bytes, ref_list_offset) = ArchiveBuilder::new()
        .tag("uri", "slob:corrupt")
        .push_ref("apple", 0, 0, "")
        .push_bin(vec![Item {
            content_type_id: 0,
            bytes: b"unreachable".to_vec(),
        }])
        .build_with_ref_list_offset();

    // Position table starts 4 bytes into the item-list (after `count`);
    // overwrite entry 0 with an offset far past the data region.
    let pos_table_start = ref_list_offset + 4;
    corrupt_bytes[pos_table_start..pos_table_start + 8].copy_from_slice(&u64::MAX.to_be_bytes());

    let corrupt_path = dir.path().join("corrupt.slob");
    std::fs::write(&corrupt_path, &corrupt_bytes).unwrap();
    let corrupt = Archive::open(&corrupt_path).expect("header alone is still well-formed");

    // Confirm the corruption actually breaks single-archive lookup, so
    // the merge test below is exercising real per-archive isolation.
    assert!(matches!(
        corrupt.find("apple", Strength::Quaternary),
        Err(SlobError::TruncatedFile)
    ));

    let archives = vec![good, corrupt];
    let results: Vec<_> = find("apple", &archives, None, Some(Strength::Quaternary)).collect();

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].content().unwrap().data(), b"a red fruit");
}
