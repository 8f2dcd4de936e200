//! Tests for commit tracking during import

use pretty_assertions::assert_eq;
use qbank_core::{Scope, SkipReason, SyncConfig, SyncEngine};
use qbank_git::GitCommits;
use qbank_test_utils::git::commit_all;
use qbank_test_utils::{MockRemote, TestRepo};

fn tracked_engine<'a>(repo: &TestRepo, remote: &'a MockRemote) -> SyncEngine<&'a MockRemote> {
    let config = SyncConfig {
        use_vcs: true,
        ..SyncConfig::default()
    };
    let commits = GitCommits::discover(repo.root()).unwrap();
    SyncEngine::new(repo.path(), remote.scope().clone(), config, remote).with_vcs(commits)
}

#[test]
fn test_new_questions_record_their_commit() {
    let repo = TestRepo::new();
    let git = repo.init_git();
    repo.write_marker("top", "top");
    repo.write("top/q1.xml", "<quiz>one</quiz>");
    repo.write("top/q2.xml", "<quiz>two</quiz>");
    let head = commit_all(&git, "Add questions");
    let remote = MockRemote::new(Scope::course("Physics"));
    let engine = tracked_engine(&repo, &remote);

    engine.import().unwrap();

    let manifest = engine.load_manifest().unwrap();
    for entry in manifest.questions() {
        assert_eq!(entry.scm_commit_current.as_deref(), Some(head.as_str()));
        assert_eq!(entry.scm_commit_remote.as_deref(), Some(head.as_str()));
        assert!(entry.is_unchanged());
    }
}

#[test]
fn test_only_committed_changes_are_pushed_again() {
    let repo = TestRepo::new();
    let git = repo.init_git();
    repo.write_marker("top", "top");
    repo.write("top/q1.xml", "<quiz>one</quiz>");
    repo.write("top/q2.xml", "<quiz>two</quiz>");
    commit_all(&git, "Add questions");
    let remote = MockRemote::new(Scope::course("Physics"));
    let engine = tracked_engine(&repo, &remote);
    engine.import().unwrap();

    let report = engine.import().unwrap();
    assert_eq!(report.skipped_for(&SkipReason::Unchanged).count(), 2);
    assert_eq!(remote.call_count("push"), 2);

    repo.write("top/q2.xml", "<quiz>two, revised</quiz>");
    let edit = commit_all(&git, "Revise q2");
    let report = engine.import().unwrap();

    assert_eq!(report.updated, vec!["top/q2.xml".to_string()]);
    assert_eq!(
        report.skipped_for(&SkipReason::Unchanged).collect::<Vec<_>>(),
        ["top/q1.xml"]
    );
    let manifest = engine.load_manifest().unwrap();
    let entry = manifest.find_by_path(&"top/q2.xml".into()).unwrap();
    assert_eq!(entry.scm_commit_current.as_deref(), Some(edit.as_str()));
    assert_eq!(entry.scm_commit_remote.as_deref(), Some(edit.as_str()));
    assert_eq!(remote.question(&entry.entity_id).unwrap().payload, "<quiz>two, revised</quiz>");
}

#[test]
fn test_tracking_is_off_without_config() {
    let repo = TestRepo::new();
    let git = repo.init_git();
    repo.write_marker("top", "top");
    repo.write("top/q1.xml", "<quiz>one</quiz>");
    commit_all(&git, "Add question");
    let remote = MockRemote::new(Scope::course("Physics"));
    let commits = GitCommits::discover(repo.root()).unwrap();
    let engine = SyncEngine::new(repo.path(), remote.scope().clone(), SyncConfig::default(), &remote)
        .with_vcs(commits);

    engine.import().unwrap();
    engine.import().unwrap();

    let manifest = engine.load_manifest().unwrap();
    assert_eq!(manifest.questions()[0].scm_commit_current, None);
    assert_eq!(remote.call_count("push"), 2);
}
