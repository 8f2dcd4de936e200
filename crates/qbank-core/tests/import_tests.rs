//! Tests for the import flow

use pretty_assertions::assert_eq;
use qbank_core::{
    Error, ExportMode, Manifest, ManifestContext, ManifestEntry, Scope, SkipReason, SyncConfig,
    SyncEngine, Version,
};
use qbank_test_utils::{MockRemote, TestRepo};

fn engine<'a>(repo: &TestRepo, remote: &'a MockRemote, config: SyncConfig) -> SyncEngine<&'a MockRemote> {
    SyncEngine::new(repo.path(), remote.scope().clone(), config, remote)
}

fn question(name: &str) -> String {
    qbank_test_utils::remote::question_payload(name, "Local text")
}

mod category_pass_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_categories_are_created_parents_first() {
        let repo = TestRepo::new();
        repo.write_marker("top/B", "top/B");
        repo.write_marker("top/A", "top/A");
        repo.write_marker("top", "top");
        repo.write_marker("top/A/deep", "top/A/deep");
        let remote = MockRemote::new(Scope::course("Physics"));

        engine(&repo, &remote, SyncConfig::default()).import().unwrap();

        assert_eq!(remote.categories(), vec!["top", "top/A", "top/A/deep", "top/B"]);
    }

    #[test]
    fn test_category_failure_aborts_before_any_push() {
        let repo = TestRepo::new();
        repo.write_marker("top", "top");
        repo.write_marker("top/A", "top/A");
        repo.write("top/q1.xml", &question("q1"));
        repo.write("top/A/q2.xml", &question("q2"));
        let remote = MockRemote::new(Scope::course("Physics"));
        remote.fail_category("top/A");
        let engine = engine(&repo, &remote, SyncConfig::default());

        let err = engine.import().unwrap_err();

        assert!(matches!(err, Error::CategoryCreation { ref category, .. } if category == "top/A"));
        assert!(err.is_fatal());
        assert_eq!(remote.call_count("upload"), 0);
        assert_eq!(remote.call_count("push"), 0);
        assert!(engine.load_manifest().unwrap().is_empty());
    }

    #[test]
    fn test_ignored_categories_are_skipped_silently() {
        let repo = TestRepo::new();
        repo.write_marker("top", "top");
        repo.write_marker("top/drafts", "top/drafts");
        repo.write_marker("top/drafts/old", "top/drafts/old");
        repo.write("top/q1.xml", &question("q1"));
        repo.write("top/drafts/q2.xml", &question("q2"));
        repo.write("top/drafts/old/q3.xml", &question("q3"));
        let remote = MockRemote::new(Scope::course("Physics"));
        let config = SyncConfig {
            ignore_pattern: Some("/^drafts$/".into()),
            ..SyncConfig::default()
        };

        let report = engine(&repo, &remote, config).import().unwrap();

        assert_eq!(remote.categories(), vec!["top"]);
        assert_eq!(report.created, vec!["top/q1.xml".to_string()]);
        assert!(report.skipped.is_empty());
    }
}

mod question_pass_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_new_files_are_created_remotely() {
        let repo = TestRepo::new();
        repo.write_marker("top", "top");
        repo.write_marker("top/A", "top/A");
        repo.write("top/q1.xml", &question("q1"));
        repo.write("top/A/q2.xml", &question("q2"));
        let remote = MockRemote::new(Scope::course("Physics"));
        let engine = engine(&repo, &remote, SyncConfig::default());

        let report = engine.import().unwrap();

        assert_eq!(report.created, vec!["top/q1.xml".to_string(), "top/A/q2.xml".to_string()]);
        let manifest = engine.load_manifest().unwrap();
        assert_eq!(manifest.len(), 2);
        let entry = manifest.find_by_path(&"top/A/q2.xml".into()).unwrap();
        assert_eq!(entry.imported_version, Some(Version::from(1)));
        assert_eq!(
            remote.question(&entry.entity_id).unwrap().category_path,
            "top/A"
        );
        assert!(!engine.staging_log().exists());
    }

    #[test]
    fn test_file_without_category_is_reported() {
        let repo = TestRepo::new();
        repo.write_marker("top", "top");
        repo.write("top/q1.xml", &question("q1"));
        repo.write("misc/loose.xml", &question("loose"));
        let remote = MockRemote::new(Scope::course("Physics"));

        let report = engine(&repo, &remote, SyncConfig::default()).import().unwrap();

        assert_eq!(report.created, vec!["top/q1.xml".to_string()]);
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].item, "misc/loose.xml");
        assert!(matches!(report.skipped[0].reason, SkipReason::NoCategory(_)));
    }

    #[test]
    fn test_rejected_push_skips_only_that_file() {
        let repo = TestRepo::new();
        repo.write_marker("top", "top");
        repo.write("top/good.xml", &question("good"));
        repo.write("top/bad.xml", "<quiz>BROKEN</quiz>");
        let remote = MockRemote::new(Scope::course("Physics"));
        remote.reject_content_containing("BROKEN");
        let engine = engine(&repo, &remote, SyncConfig::default());

        let report = engine.import().unwrap();

        assert_eq!(report.created, vec!["top/good.xml".to_string()]);
        assert_eq!(report.skipped[0].item, "top/bad.xml");
        assert!(matches!(report.skipped[0].reason, SkipReason::Failed(_)));
        assert_eq!(engine.load_manifest().unwrap().len(), 1);
    }

    #[test]
    fn test_subdirectory_limits_import() {
        let repo = TestRepo::new();
        repo.write_marker("top", "top");
        repo.write_marker("top/A", "top/A");
        repo.write("top/q1.xml", &question("q1"));
        repo.write("top/A/q2.xml", &question("q2"));
        let remote = MockRemote::new(Scope::course("Physics"));
        let config = SyncConfig {
            subdirectory: Some("top/A".into()),
            ..SyncConfig::default()
        };

        let report = engine(&repo, &remote, config).import().unwrap();

        assert_eq!(remote.categories(), vec!["top/A"]);
        assert_eq!(report.created, vec!["top/A/q2.xml".to_string()]);
    }

    #[test]
    fn test_unchanged_entries_are_not_pushed() {
        let repo = TestRepo::new();
        repo.write_marker("top", "top");
        repo.write("top/q.xml", &question("q"));
        let remote = MockRemote::new(Scope::course("Physics"));
        let id = remote.add_question("q", "top");
        let engine = engine(&repo, &remote, SyncConfig::default());

        let mut manifest = Manifest::new(ManifestContext::new(remote.scope().clone()));
        let mut entry = ManifestEntry::new(id.clone(), "top/q.xml");
        entry.exported_version = Some(Version::from(1));
        entry.scm_commit_current = Some("abc123".into());
        entry.scm_commit_remote = Some("abc123".into());
        manifest.upsert(&qbank_core::StagedEntry {
            file_path: Some(entry.file_path.clone()),
            exported_version: entry.exported_version.clone(),
            scm_commit_current: entry.scm_commit_current.clone(),
            scm_commit_remote: entry.scm_commit_remote.clone(),
            ..qbank_core::StagedEntry::new(id.clone())
        });
        manifest.save(&engine.manifest_path()).unwrap();

        let report = engine.import().unwrap();

        assert_eq!(report.skipped_for(&SkipReason::Unchanged).collect::<Vec<_>>(), ["top/q.xml"]);
        assert_eq!(remote.call_count("upload"), 0);
        assert_eq!(remote.question(&id).unwrap().version, 1);
    }
}

mod version_check_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_export_then_import_updates_remote() {
        let repo = TestRepo::new();
        let remote = MockRemote::new(Scope::course("Physics"));
        let id = remote.add_question("Vectors", "top");
        let engine = engine(&repo, &remote, SyncConfig::default());
        engine.export(ExportMode::Refresh).unwrap();

        repo.write("top/Vectors.xml", "<quiz>edited locally</quiz>");
        let report = engine.import().unwrap();

        assert_eq!(report.updated, vec!["top/Vectors.xml".to_string()]);
        assert_eq!(remote.question(&id).unwrap().payload, "<quiz>edited locally</quiz>");
        let manifest = engine.load_manifest().unwrap();
        let entry = manifest.get(&id).unwrap();
        assert_eq!(entry.exported_version, Some(Version::from(1)));
        assert_eq!(entry.imported_version, Some(Version::from(2)));

        // The pushed version is known, so a second import passes the check
        engine.import().unwrap();
    }

    #[test]
    fn test_remote_edit_blocks_import() {
        let repo = TestRepo::new();
        let remote = MockRemote::new(Scope::course("Physics"));
        let id = remote.add_question("Vectors", "top");
        remote.add_question("Forces", "top");
        let engine = engine(&repo, &remote, SyncConfig::default());
        engine.export(ExportMode::Refresh).unwrap();

        remote.edit_remotely(&id, "<quiz>edited on the server</quiz>");
        let err = engine.import().unwrap_err();

        match err {
            Error::VersionConflict { entries } => {
                assert_eq!(entries, vec![format!("top/Vectors.xml ({id})")]);
            }
            other => panic!("expected version conflict, got {other}"),
        }
        assert_eq!(remote.call_count("upload"), 0);
    }
}
