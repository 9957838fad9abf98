//! Branch lifecycle through the facade: create, divergent edits, merge
//! blocking, forced merges, and the merge audit log.

use draftdb_core::{
    BranchName, ConflictKind, Document, DocumentContent, Error, MergeOutcome, Section, SemVer,
    StrategyKind, UserId,
};
use draftdb_engine::{DocumentStore, EngineConfig, GetOptions, MergeOptions, SaveOptions};

fn store() -> DocumentStore {
    DocumentStore::open(EngineConfig::default()).unwrap()
}

fn seeded(store: &DocumentStore, owner: UserId) -> Document {
    let doc = Document::new("Proposal", owner).with_content(DocumentContent::Structured {
        sections: vec![
            Section::with_body("summary", "Summary", "Short version"),
            Section::with_body("details", "Details", "Long version"),
        ],
    });
    let id = doc.id;
    store.save(doc, SaveOptions::default()).unwrap();
    (*store
        .get(&id, GetOptions::default())
        .unwrap()
        .unwrap()
        .document)
        .clone()
}

fn feature() -> BranchName {
    BranchName::new("feature").unwrap()
}

#[test]
fn test_create_branch_and_edit_on_it() {
    let store = store();
    let owner = UserId::new();
    let doc = seeded(&store, owner);

    let branch = store
        .create_branch(&doc.id, feature(), None, owner)
        .unwrap();
    assert_eq!(branch.base_version, SemVer::INITIAL);
    assert!(!branch.merged);

    // Work lands on the branch, mainline stays put
    let mut edit = doc.clone();
    edit.content.sections_mut().unwrap()[0].body = "Branch summary".into();
    store
        .save(edit, SaveOptions::default().on_branch(feature()))
        .unwrap();

    let feature_head = store.resolve_branch(&doc.id, &feature()).unwrap();
    assert_eq!(feature_head.snapshot().content.sections()[0].body, "Branch summary");
    let main_head = store
        .resolve_branch(&doc.id, &BranchName::main())
        .unwrap();
    assert_eq!(main_head.snapshot().content.sections()[0].body, "Short version");
}

#[test]
fn test_duplicate_branch_name_rejected() {
    let store = store();
    let owner = UserId::new();
    let doc = seeded(&store, owner);

    store.create_branch(&doc.id, feature(), None, owner).unwrap();
    assert!(matches!(
        store.create_branch(&doc.id, feature(), None, owner),
        Err(Error::BranchExists { .. })
    ));
}

#[test]
fn test_clean_merge_appends_minor_to_main() {
    let store = store();
    let owner = UserId::new();
    let doc = seeded(&store, owner);
    store.create_branch(&doc.id, feature(), None, owner).unwrap();

    let mut edit = doc.clone();
    edit.content.sections_mut().unwrap()[1].body = "Much longer version".into();
    store
        .save(edit, SaveOptions::default().on_branch(feature()))
        .unwrap();

    let report = store
        .merge_branch(
            &doc.id,
            &feature(),
            &BranchName::main(),
            MergeOptions::new(owner, StrategyKind::Manual),
        )
        .unwrap();

    assert_eq!(report.outcome, MergeOutcome::Merged);
    assert!(report.conflicts.is_empty());
    assert_eq!(report.merged_version, SemVer::new(1, 1, 0));

    // Mainline and primary store now carry the branch's work
    let main_doc = store.get(&doc.id, GetOptions::default()).unwrap().unwrap();
    assert_eq!(
        main_doc.document.content.sections()[1].body,
        "Much longer version"
    );
    assert!(store.branches(&doc.id).unwrap().iter().any(|b| b.merged));
    assert_eq!(store.merge_log(&doc.id).unwrap().len(), 1);
}

#[test]
fn test_merge_blocked_by_permissions_conflict() {
    let store = store();
    let owner = UserId::new();
    let doc = seeded(&store, owner);
    store.create_branch(&doc.id, feature(), None, owner).unwrap();

    // Both sides change the editor list since the base, differently
    let mut branch_edit = doc.clone();
    branch_edit.permissions.editors.push(UserId::new());
    store
        .save(branch_edit, SaveOptions::default().on_branch(feature()))
        .unwrap();
    let mut main_edit = doc.clone();
    main_edit.permissions.editors.push(UserId::new());
    store.save(main_edit, SaveOptions::default()).unwrap();

    let target_before = store
        .resolve_branch(&doc.id, &BranchName::main())
        .unwrap();

    let err = store
        .merge_branch(
            &doc.id,
            &feature(),
            &BranchName::main(),
            MergeOptions::new(owner, StrategyKind::Manual),
        )
        .unwrap_err();
    match err {
        Error::UnresolvedConflicts { conflicts } => {
            assert_eq!(conflicts.len(), 1);
            assert_eq!(conflicts[0].kind(), ConflictKind::Permissions);
        }
        other => panic!("expected UnresolvedConflicts, got {:?}", other),
    }

    // Merge safety: the target head did not move
    let target_after = store
        .resolve_branch(&doc.id, &BranchName::main())
        .unwrap();
    assert_eq!(target_before.number, target_after.number);
    assert!(!store
        .branches(&doc.id)
        .unwrap()
        .iter()
        .find(|b| b.name == feature())
        .unwrap()
        .merged);

    // The blocked attempt is still on the audit log
    let log = store.merge_log(&doc.id).unwrap();
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].outcome, MergeOutcome::Blocked);
    assert_eq!(log[0].conflict_count, 1);
    assert!(log[0].merged_version.is_none());
}

#[test]
fn test_forced_merge_records_conflicts() {
    let store = store();
    let owner = UserId::new();
    let doc = seeded(&store, owner);
    store.create_branch(&doc.id, feature(), None, owner).unwrap();

    // Divergent edits to the same section on both sides
    let mut branch_edit = doc.clone();
    branch_edit.content.sections_mut().unwrap()[0].body = "Forced in".into();
    store
        .save(branch_edit, SaveOptions::default().on_branch(feature()))
        .unwrap();
    let mut main_edit = doc.clone();
    main_edit.content.sections_mut().unwrap()[0].body = "Main's take".into();
    store.save(main_edit, SaveOptions::default()).unwrap();

    let report = store
        .merge_branch(
            &doc.id,
            &feature(),
            &BranchName::main(),
            MergeOptions::new(owner, StrategyKind::Manual).forced(),
        )
        .unwrap();

    assert_eq!(report.outcome, MergeOutcome::Forced);
    assert!(!report.conflicts.is_empty());
    // The conflicts were not silently dropped
    assert!(!store.conflict_history(&doc.id).is_empty());
    assert_eq!(
        store.merge_log(&doc.id).unwrap()[0].outcome,
        MergeOutcome::Forced
    );
    // Source side won
    let main_doc = store.get(&doc.id, GetOptions::default()).unwrap().unwrap();
    assert_eq!(main_doc.document.content.sections()[0].body, "Forced in");
}

#[test]
fn test_automatic_strategy_unblocks_metadata_only_divergence() {
    let store = store();
    let owner = UserId::new();
    let doc = seeded(&store, owner);
    store.create_branch(&doc.id, feature(), None, owner).unwrap();

    // Both sides retag since the base
    let mut branch_edit = doc.clone();
    branch_edit.metadata.tags = vec!["reviewed".into()];
    store
        .save(branch_edit, SaveOptions::default().on_branch(feature()))
        .unwrap();
    let mut main_edit = doc.clone();
    main_edit.metadata.tags = vec!["draft".into()];
    store.save(main_edit, SaveOptions::default()).unwrap();

    // Manual strategy would block; automatic resolves the tag conflict
    let report = store
        .merge_branch(
            &doc.id,
            &feature(),
            &BranchName::main(),
            MergeOptions::new(owner, StrategyKind::Automatic),
        )
        .unwrap();
    assert_eq!(report.outcome, MergeOutcome::Merged);
    assert_eq!(report.conflicts.len(), 1);
    assert!(report.resolutions[0].outcome.is_resolved());
}

#[test]
fn test_merge_into_branch_leaves_primary_store_alone() {
    let store = store();
    let owner = UserId::new();
    let doc = seeded(&store, owner);
    let staging = BranchName::new("staging").unwrap();
    store.create_branch(&doc.id, feature(), None, owner).unwrap();
    store
        .create_branch(&doc.id, staging.clone(), None, owner)
        .unwrap();

    let mut edit = doc.clone();
    edit.content.sections_mut().unwrap()[0].body = "Feature work".into();
    store
        .save(edit, SaveOptions::default().on_branch(feature()))
        .unwrap();

    store
        .merge_branch(
            &doc.id,
            &feature(),
            &staging,
            MergeOptions::new(owner, StrategyKind::Manual),
        )
        .unwrap();

    // Mainline document is untouched by a branch-to-branch merge
    let main_doc = store.get(&doc.id, GetOptions::default()).unwrap().unwrap();
    assert_eq!(main_doc.document.content.sections()[0].body, "Short version");
    // The staging branch resolves to the merged state
    let staging_head = store.resolve_branch(&doc.id, &staging).unwrap();
    assert_eq!(
        staging_head.snapshot().content.sections()[0].body,
        "Feature work"
    );
}

#[test]
fn test_missing_branch_is_not_found() {
    let store = store();
    let owner = UserId::new();
    let doc = seeded(&store, owner);

    let err = store
        .merge_branch(
            &doc.id,
            &BranchName::new("ghost").unwrap(),
            &BranchName::main(),
            MergeOptions::new(owner, StrategyKind::Manual),
        )
        .unwrap_err();
    assert!(matches!(err, Error::NotFound { .. }));
}
