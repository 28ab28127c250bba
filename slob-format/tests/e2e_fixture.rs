//! Canonical end-to-end fixture: two bins holding one content item each,
//! four references where `"earth"` and a sibling key sharing its prefix
//! resolve to the same blob.

mod support;

use slob_format::{find, Archive, OpenOptions, Strength};
use support::{ArchiveBuilder, Item};
use tempfile::tempdir;

fn build_fixture(dir: &std::path::Path, name: &str) -> Archive {
    let path = dir.join(name);
    ArchiveBuilder::new()
        .tag("sometag", "xyz")
        .tag("some.other.tag", "abc")
        .content_types(&["text/plain; charset=utf-8"])
        .push_ref("earth", 0, 0, "")
        .push_ref("earthy", 0, 0, "")
        .push_ref("mars", 1, 0, "")
        .push_ref("venus", 1, 0, "")
        .push_bin(vec![Item {
            content_type_id: 0,
            bytes: b"Hello, Earth!".to_vec(),
        }])
        .push_bin(vec![Item {
            content_type_id: 0,
            bytes: b"a rusty planet".to_vec(),
        }])
        .write_to(&path);
    Archive::open(&path).unwrap()
}

#[test]
fn e1_opens_and_reports_counts() {
    let dir = tempdir().unwrap();
    let archive = build_fixture(dir.path(), "test.slob");

    assert_eq!(archive.blob_count(), 2);
    assert_eq!(archive.size(), 4);
}

#[test]
fn e2_lookup_resolves_typed_content() {
    let dir = tempdir().unwrap();
    let archive = build_fixture(dir.path(), "test.slob");

    let blob = archive
        .find("earth", Strength::Quaternary)
        .unwrap()
        .next()
        .unwrap()
        .unwrap();

    let content = blob.content().unwrap();
    assert_eq!(content.content_type(), "text/plain; charset=utf-8");
    assert_eq!(content.data(), b"Hello, Earth!");
}

#[test]
fn e3_tags_are_exposed() {
    let dir = tempdir().unwrap();
    let archive = build_fixture(dir.path(), "test.slob");

    assert_eq!(archive.tags()["sometag"], "xyz");
    assert_eq!(archive.tags()["some.other.tag"], "abc");
}

#[test]
fn e4_prefix_lookup_reaches_longer_keys_and_nothing_else() {
    let dir = tempdir().unwrap();
    let archive = build_fixture(dir.path(), "test.slob");

    // "earth" is itself a match, and its own prefix match set is a
    // superset of that: it also reaches "earthy", which does not match
    // at any non-prefix strength.
    let prefix_matches: Vec<_> = archive
        .find("earth", Strength::PrimaryPrefix)
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(prefix_matches.len(), 2);
    assert!(prefix_matches
        .iter()
        .all(|b| b.content().unwrap().data() == b"Hello, Earth!"));

    let exact_matches: Vec<_> = archive
        .find("earth", Strength::Quaternary)
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(exact_matches.len(), 1);
    assert_eq!(exact_matches[0].key(), "earth");

    let no_non_prefix_match_for_unknown_longer_key: Vec<_> = archive
        .find("earthy", Strength::PrimaryPrefix)
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(no_non_prefix_match_for_unknown_longer_key.len(), 1);
}

#[test]
fn e5_preferred_archive_emits_first() {
    let dir = tempdir().unwrap();
    let a = build_fixture(dir.path(), "a.slob");
    let b = build_fixture(dir.path(), "b.slob");

    let archives = vec![a, b.clone()];
    let first = find("earth", &archives, Some(&b), Some(Strength::Quaternary))
        .next()
        .unwrap();

    assert_eq!(first.owner_id(), b.id());
}

fn build_case_variant_fixture(dir: &std::path::Path, name: &str) -> Archive {
    let path = dir.join(name);
    ArchiveBuilder::new()
        .push_ref("earth", 0, 0, "")
        .push_ref("Earth", 0, 1, "")
        .push_bin(vec![
            Item {
                content_type_id: 0,
                bytes: b"a planet (lowercase ref)".to_vec(),
            },
            Item {
                content_type_id: 0,
                bytes: b"a planet (capitalized ref)".to_vec(),
            },
        ])
        .write_to(&path);
    Archive::open(&path).unwrap()
}

#[test]
fn case_variants_collapse_at_primary_but_diverge_at_quaternary() {
    let dir = tempdir().unwrap();
    let archive = build_case_variant_fixture(dir.path(), "case.slob");

    // PRIMARY and SECONDARY ignore case: both "earth" and "Earth" fall
    // into the same equality class, so looking up either one reaches
    // both references, per the `MERGE_LADDER`/strength-ladder semantics
    // in collator.rs.
    for strength in [Strength::Primary, Strength::Secondary] {
        let matches: Vec<_> = archive
            .find("earth", strength)
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(matches.len(), 2, "case should collapse at {strength:?}");
    }

    // QUATERNARY (and TERTIARY, where case is first distinguished)
    // separates them again: each spelling resolves only to its own
    // reference.
    let lower_exact: Vec<_> = archive
        .find("earth", Strength::Quaternary)
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(lower_exact.len(), 1);
    assert_eq!(
        lower_exact[0].content().unwrap().data(),
        b"a planet (lowercase ref)"
    );

    let upper_exact: Vec<_> = archive
        .find("Earth", Strength::Quaternary)
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(upper_exact.len(), 1);
    assert_eq!(
        upper_exact[0].content().unwrap().data(),
        b"a planet (capitalized ref)"
    );
}

#[test]
fn e6_content_survives_store_cache_eviction() {
    let dir = tempdir().unwrap();
    // Capacity 1 so fetching the second bin evicts the first's decoded
    // state out from under any retained `Content`.
    let path = dir.path().join("test.slob");
    ArchiveBuilder::new()
        .push_ref("earth", 0, 0, "")
        .push_ref("mars", 1, 0, "")
        .push_bin(vec![Item {
            content_type_id: 0,
            bytes: b"Hello, Earth!".to_vec(),
        }])
        .push_bin(vec![Item {
            content_type_id: 0,
            bytes: b"a rusty planet".to_vec(),
        }])
        .write_to(&path);

    let archive = OpenOptions::new()
        .store_cache_capacity(1)
        .open(&path)
        .unwrap();

    let first_read = archive.get(0).unwrap().content().unwrap().data().to_vec();
    // Force eviction of bin 0's decoded state by decoding bin 1.
    let _ = archive.get(1).unwrap().content().unwrap();
    let second_read = archive.get(0).unwrap().content().unwrap().data().to_vec();

    assert_eq!(first_read, second_read);
    assert_eq!(first_read, b"Hello, Earth!");
}
