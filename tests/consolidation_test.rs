mod helpers;

use helpers::{test_store, StubOracle};
use taleweave::config::GenerationParams;
use taleweave::memory::codec;
use taleweave::memory::consolidate::Consolidator;
use taleweave::memory::types::ConsolidationEntry;
use taleweave::memory::{CharacterKey, CharacterProfile, Tier};
use taleweave::oracle::OracleError;
use taleweave::Error;

fn marcus_with_memories(t: &helpers::TestStore, count: usize) -> CharacterKey {
    let key = t
        .memory
        .create_character("Marcus", &CharacterProfile::new("A guard."))
        .unwrap();
    for i in 1..=count {
        t.memory
            .append_shortterm(&key, &format!("Memory number {i}."))
            .unwrap();
    }
    key
}

#[tokio::test]
async fn consolidation_moves_shortterm_into_one_longterm_entry() {
    let t = test_store();
    let marcus = marcus_with_memories(&t, 3);
    let oracle = StubOracle::replying(["Marcus reflects on recent events."]);
    let params = GenerationParams::default();
    let consolidator = Consolidator::new(&t.memory, &oracle, &params, 5);

    let plan = consolidator.load(&marcus).unwrap();
    assert_eq!(plan.entry_count(), 3);
    assert!(plan.below_minimum());

    let staged = consolidator.generate(&plan).await.unwrap();
    let receipt = consolidator.commit(staged).unwrap();

    assert_eq!(receipt.source_count, 3);
    assert_eq!(receipt.longterm_entries, 1);

    let longterm = t.memory.longterm(&marcus).unwrap();
    assert_eq!(longterm.len(), 1);
    assert_eq!(longterm.entries[0].source_count, 3);
    assert_eq!(longterm.entries[0].text, "Marcus reflects on recent events.");

    let raw = t.memory.load(&marcus, Tier::Longterm).unwrap().unwrap();
    assert!(raw.contains("[2026-10-18 21:30] Consolidated from 3 memories:"));

    assert_eq!(t.memory.count_shortterm_entries(&marcus).unwrap(), 0);
    let shortterm = t.memory.load(&marcus, Tier::Shortterm).unwrap().unwrap();
    assert!(shortterm.starts_with("CHARACTER: Marcus\nSHORT-TERM MEMORY"));

    assert!(t.memory.pending_recoveries().unwrap().is_empty());
    assert!(receipt.shortterm_backup.is_some());
    assert!(receipt.longterm_backup.is_some());
}

#[tokio::test]
async fn oracle_failure_leaves_both_tiers_byte_identical() {
    let t = test_store();
    let marcus = marcus_with_memories(&t, 4);
    let shortterm_before = t.memory.load(&marcus, Tier::Shortterm).unwrap();
    let longterm_before = t.memory.load(&marcus, Tier::Longterm).unwrap();
    let backups_before = t.memory.backups().list_for(&marcus.record_name(Tier::Longterm)).unwrap();

    let oracle = StubOracle::failing(1);
    let params = GenerationParams::default();
    let consolidator = Consolidator::new(&t.memory, &oracle, &params, 5);
    let plan = consolidator.load(&marcus).unwrap();

    let err = consolidator.generate(&plan).await.unwrap_err();
    assert!(matches!(
        err,
        Error::GenerationFailed(OracleError::Request(_))
    ));

    assert_eq!(t.memory.load(&marcus, Tier::Shortterm).unwrap(), shortterm_before);
    assert_eq!(t.memory.load(&marcus, Tier::Longterm).unwrap(), longterm_before);
    assert_eq!(
        t.memory.backups().list_for(&marcus.record_name(Tier::Longterm)).unwrap(),
        backups_before
    );
}

#[tokio::test]
async fn discarding_the_staged_summary_changes_nothing() {
    let t = test_store();
    let marcus = marcus_with_memories(&t, 6);
    let before = t.memory.load(&marcus, Tier::Shortterm).unwrap();

    let oracle = StubOracle::replying(["A summary nobody wanted."]);
    let params = GenerationParams::default();
    let consolidator = Consolidator::new(&t.memory, &oracle, &params, 5);
    let plan = consolidator.load(&marcus).unwrap();
    assert!(!plan.below_minimum());

    let staged = consolidator.generate(&plan).await.unwrap();
    drop(staged);

    assert_eq!(t.memory.load(&marcus, Tier::Shortterm).unwrap(), before);
    assert!(t.memory.longterm(&marcus).unwrap().is_empty());
}

#[tokio::test]
async fn second_consolidation_appends_after_the_first() {
    let t = test_store();
    let marcus = marcus_with_memories(&t, 2);
    let oracle = StubOracle::replying(["First summary.", "Second summary."]);
    let params = GenerationParams::default();
    let consolidator = Consolidator::new(&t.memory, &oracle, &params, 5);

    let plan = consolidator.load(&marcus).unwrap();
    consolidator
        .commit(consolidator.generate(&plan).await.unwrap())
        .unwrap();

    t.memory.append_shortterm(&marcus, "Later memory.").unwrap();
    let plan = consolidator.load(&marcus).unwrap();
    assert_eq!(plan.entry_count(), 1);
    let receipt = consolidator
        .commit(consolidator.generate(&plan).await.unwrap())
        .unwrap();

    assert_eq!(receipt.longterm_entries, 2);
    let raw = t.memory.load(&marcus, Tier::Longterm).unwrap();
    let doc = codec::decode::<ConsolidationEntry>(raw.as_deref().unwrap());
    let counts: Vec<usize> = doc.entries.iter().map(|e| e.source_count).collect();
    assert_eq!(counts, vec![2, 1]);
}

#[test]
fn longterm_write_failure_changes_nothing() {
    let t = test_store();
    let marcus = marcus_with_memories(&t, 3);
    let shortterm_before = t.memory.load(&marcus, Tier::Shortterm).unwrap();

    t.characters
        .fail_writes_to(&marcus.record_name(Tier::Longterm));
    let err = t
        .memory
        .consolidate(&marcus, "Never written.", 3)
        .unwrap_err();

    assert!(matches!(err, Error::Storage { .. }));
    assert_eq!(t.memory.load(&marcus, Tier::Shortterm).unwrap(), shortterm_before);
    assert!(t.memory.longterm(&marcus).unwrap().is_empty());
    assert!(t.memory.pending_recoveries().unwrap().is_empty());
}

#[test]
fn interrupted_reset_leaves_a_recovery_marker() {
    let t = test_store();
    let marcus = marcus_with_memories(&t, 3);

    t.characters
        .fail_writes_to(&marcus.record_name(Tier::Shortterm));
    let err = t
        .memory
        .consolidate(&marcus, "Written before the failure.", 3)
        .unwrap_err();

    match err {
        Error::ConsolidationInterrupted {
            key,
            shortterm_backup,
        } => {
            assert_eq!(key, "marcus");
            assert_eq!(
                shortterm_backup.as_deref(),
                Some("character_marcus_shortterm_backup_2026-10-18_21-30")
            );
        }
        other => panic!("unexpected error: {other}"),
    }

    assert_eq!(t.memory.longterm(&marcus).unwrap().len(), 1);
    assert_eq!(t.memory.count_shortterm_entries(&marcus).unwrap(), 3);

    let pending = t.memory.pending_recoveries().unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].character, marcus);
    assert_eq!(pending[0].source_count, 3);

    t.characters.heal();
    assert!(t.memory.clear_recovery(&marcus).unwrap());
    assert!(t.memory.pending_recoveries().unwrap().is_empty());
    assert!(!t.memory.clear_recovery(&marcus).unwrap());
}
