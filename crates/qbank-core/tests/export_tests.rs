//! Tests for the export flows

use pretty_assertions::assert_eq;
use qbank_core::{
    Error, ExportMode, Manifest, ManifestContext, Scope, SkipReason, SyncConfig, SyncEngine,
    Version,
};
use qbank_test_utils::{MockRemote, TestRepo, init_tracing};

fn engine<'a>(repo: &TestRepo, remote: &'a MockRemote, config: SyncConfig) -> SyncEngine<&'a MockRemote> {
    SyncEngine::new(repo.path(), remote.scope().clone(), config, remote)
}

mod scenario_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_initial_export_materializes_categories_and_files() {
        init_tracing();
        let repo = TestRepo::new();
        let remote = MockRemote::new(Scope::course("Physics 101"));
        let vectors = remote.add_question("Vectors", "top");
        let forces = remote.add_question("Forces", "top/A/sub1");
        let energy = remote.add_question("Energy", "top/A/sub2");
        let power = remote.add_question("Power", "top/A/sub2");
        let engine = engine(&repo, &remote, SyncConfig::default());

        let mut manifest = engine.load_or_init_manifest().unwrap();
        let report = engine.stage_export(&mut manifest, ExportMode::Refresh).unwrap();

        assert_eq!(report.created.len(), 4);
        assert_eq!(
            repo.markers(),
            vec![
                "top/A/sub1/qbank_category.xml",
                "top/A/sub2/qbank_category.xml",
                "top/qbank_category.xml",
            ]
        );
        assert_eq!(
            repo.files_ending_with(".xml"),
            vec![
                "top/A/sub1/Forces.xml",
                "top/A/sub2/Energy.xml",
                "top/A/sub2/Power.xml",
                "top/Vectors.xml",
            ]
        );
        repo.assert_file_contains("top/A/sub2/Power.xml", "<name><text>Power</text></name>");

        let log = engine.staging_log();
        let raw = std::fs::read_to_string(log.path().to_native()).unwrap();
        assert_eq!(raw.lines().count(), 4);

        let summary = engine.recover().unwrap().unwrap();
        assert_eq!(summary.inserted, 4);
        assert!(!log.exists());

        let manifest = engine.load_manifest().unwrap();
        let mut ids: Vec<&str> = manifest.questions().iter().map(|q| q.entity_id.as_str()).collect();
        ids.sort();
        let mut expected = vec![vectors.as_str(), forces.as_str(), energy.as_str(), power.as_str()];
        expected.sort();
        assert_eq!(ids, expected);

        let forces_entry = manifest.get(&forces).unwrap();
        assert_eq!(forces_entry.file_path.as_str(), "top/A/sub1/Forces.xml");
        assert_eq!(forces_entry.exported_version, Some(Version::from(1)));
        assert_eq!(forces_entry.format.as_deref(), Some("xml"));
        assert_eq!(forces_entry.context.as_ref(), Some(remote.scope()));
    }

    #[test]
    fn test_export_merges_and_removes_staging_log() {
        let repo = TestRepo::new();
        let remote = MockRemote::new(Scope::course("Physics"));
        remote.add_question("Vectors", "top");
        remote.add_question("Forces", "top/A");
        let engine = engine(&repo, &remote, SyncConfig::default());

        let report = engine.export(ExportMode::Refresh).unwrap();

        assert_eq!(report.created.len(), 2);
        assert!(!engine.staging_log().exists());
        assert_eq!(engine.load_manifest().unwrap().len(), 2);
        repo.assert_file_exists("qbank_course_Physics_question_manifest.json");
    }

    #[test]
    fn test_identical_names_get_numbered_files() {
        let repo = TestRepo::new();
        let remote = MockRemote::new(Scope::course("Physics"));
        let ids: Vec<String> = (0..3).map(|_| remote.add_question("Same name", "top")).collect();
        let engine = engine(&repo, &remote, SyncConfig::default());

        engine.export(ExportMode::Refresh).unwrap();

        let manifest = engine.load_manifest().unwrap();
        let paths: Vec<&str> = ids
            .iter()
            .map(|id| manifest.get(id).unwrap().file_path.as_str())
            .collect();
        assert_eq!(
            paths,
            vec!["top/Same-name.xml", "top/Same-name_2.xml", "top/Same-name_3.xml"]
        );
    }

    #[test]
    fn test_long_multibyte_names_fit_the_file_system() {
        let repo = TestRepo::new();
        let remote = MockRemote::new(Scope::course("Physics"));
        let long_name = remote.add_question(&"я".repeat(200), "top");
        let long_category = remote.add_question("Q", &format!("top/{}", "ж".repeat(300)));
        let engine = engine(&repo, &remote, SyncConfig::default());

        let report = engine.export(ExportMode::Refresh).unwrap();

        assert_eq!(report.created.len(), 2);
        assert!(report.skipped.is_empty());
        let manifest = engine.load_manifest().unwrap();
        assert_eq!(
            manifest.get(&long_name).unwrap().file_path.as_str(),
            format!("top/{}.xml", "я".repeat(115))
        );
        assert_eq!(
            manifest.get(&long_category).unwrap().file_path.as_str(),
            format!("top/{}/Q.xml", "ж".repeat(120))
        );
    }

    #[test]
    fn test_second_export_creates_nothing_new() {
        let repo = TestRepo::new();
        let remote = MockRemote::new(Scope::course("Physics"));
        remote.add_question("Vectors", "top");
        let engine = engine(&repo, &remote, SyncConfig::default());

        engine.export(ExportMode::Refresh).unwrap();
        let report = engine.export(ExportMode::CreateOnly).unwrap();

        assert!(report.created.is_empty());
        assert_eq!(report.skipped_for(&SkipReason::AlreadyTracked).count(), 1);
        assert_eq!(repo.files_ending_with(".xml").len(), 1);
        assert_eq!(remote.call_count("fetch:"), 1);
    }
}

mod refresh_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_refresh_overwrites_tracked_files() {
        let repo = TestRepo::new();
        let remote = MockRemote::new(Scope::course("Physics"));
        let id = remote.add_question("Vectors", "top");
        let engine = engine(&repo, &remote, SyncConfig::default());
        engine.export(ExportMode::Refresh).unwrap();

        remote.edit_remotely(&id, "<quiz>edited on the server</quiz>");
        let report = engine.export(ExportMode::Refresh).unwrap();

        assert_eq!(report.updated, vec!["top/Vectors.xml".to_string()]);
        assert_eq!(repo.read("top/Vectors.xml"), "<quiz>edited on the server</quiz>");
        let manifest = engine.load_manifest().unwrap();
        assert_eq!(manifest.get(&id).unwrap().exported_version, Some(Version::from(2)));
        assert_eq!(manifest.len(), 1);
    }

    #[test]
    fn test_failed_fetch_skips_only_that_question() {
        let repo = TestRepo::new();
        let remote = MockRemote::new(Scope::course("Physics"));
        remote.add_question("Vectors", "top");
        let broken = remote.add_question("Forces", "top");
        remote.add_question("Energy", "top");
        remote.fail_fetch(&broken);
        let engine = engine(&repo, &remote, SyncConfig::default());

        let report = engine.export(ExportMode::Refresh).unwrap();

        assert_eq!(report.created.len(), 2);
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].item, broken);
        assert!(matches!(report.skipped[0].reason, SkipReason::Failed(_)));
        let manifest = engine.load_manifest().unwrap();
        assert_eq!(manifest.len(), 2);
        assert!(manifest.get(&broken).is_none());
    }

    #[test]
    fn test_unavailable_listing_fails_the_run() {
        let repo = TestRepo::new();
        let remote = MockRemote::new(Scope::course("Physics"));
        remote.fail_listing();
        let engine = engine(&repo, &remote, SyncConfig::default());

        let err = engine.export(ExportMode::Refresh).unwrap_err();

        assert!(matches!(err, Error::Remote { operation: "list", .. }));
        assert!(repo.files_ending_with(".xml").is_empty());
    }
}

mod scope_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_subcategory_limits_export_and_records_directory() {
        let repo = TestRepo::new();
        let remote = MockRemote::new(Scope::course("Physics"));
        remote.add_question("Outside", "top");
        remote.add_question("Sibling", "top/A2");
        remote.add_question("Anchor", "top/A");
        remote.add_question("Inside", "top/A/sub1");
        let config = SyncConfig {
            subcategory: Some("top/A".into()),
            ..SyncConfig::default()
        };
        let engine = engine(&repo, &remote, config);

        let report = engine.export(ExportMode::Refresh).unwrap();

        assert_eq!(report.created.len(), 2);
        assert_eq!(
            repo.files_ending_with(".xml"),
            vec!["top/A/Anchor.xml", "top/A/sub1/Inside.xml"]
        );
        let manifest = engine.load_manifest().unwrap();
        assert_eq!(manifest.context.default_subcategory.as_deref(), Some("top/A"));
        assert_eq!(manifest.context.default_subdirectory.as_deref(), Some("top/A"));
    }

    #[test]
    fn test_manifest_for_other_scope_is_rejected() {
        let repo = TestRepo::new();
        let remote = MockRemote::new(Scope::course("Physics"));
        let engine = engine(&repo, &remote, SyncConfig::default());
        Manifest::new(ManifestContext::new(Scope::course("Chemistry")))
            .save(&engine.manifest_path())
            .unwrap();

        let err = engine.export(ExportMode::Refresh).unwrap_err();

        assert!(matches!(err, Error::ContextMismatch { .. }));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_first_run_records_context_from_config() {
        let repo = TestRepo::new();
        let remote = MockRemote::new(Scope::module("Physics", "Quiz 1"));
        let config = SyncConfig {
            remote_url: Some("https://lms.example".into()),
            ignore_pattern: Some("^draft".into()),
            ..SyncConfig::default()
        };
        let engine = engine(&repo, &remote, config);

        engine.export(ExportMode::Refresh).unwrap();

        let manifest = engine.load_manifest().unwrap();
        assert_eq!(manifest.context.scope, Scope::module("Physics", "Quiz 1"));
        assert_eq!(manifest.context.remote_url.as_deref(), Some("https://lms.example"));
        assert_eq!(manifest.context.default_ignore_pattern.as_deref(), Some("^draft"));
        repo.assert_file_exists("qbank_module_Quiz-1_question_manifest.json");
    }
}
