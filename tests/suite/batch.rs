//! One-shot invocations: the fallback when the interactive process is off.

use std::fs;
use std::sync::Arc;

use gmod_backend::BackendManager;
use gmod_config::{FileSettingsProvider, Settings, SettingsLayer, ToolConfig};
use gmod_types::{Position, QueueName, SourceFile, SymbolKind};

use crate::common::FakeProject;

fn batch_only(project: &FakeProject) -> ToolConfig {
    ToolConfig {
        enable_interactive: false,
        ..project.config()
    }
}

#[tokio::test]
async fn disabled_interactive_falls_back_with_same_result() {
    let project = FakeProject::new();
    let file = SourceFile::new(project.file("A.hs"));

    let interactive = project.manager();
    let expected = interactive.type_at(&file, Position::new(0, 2)).await.unwrap();

    let batch = project.manager_with(batch_only(&project), Settings::default());
    let actual = batch.type_at(&file, Position::new(0, 2)).await.unwrap();

    assert_eq!(actual, expected);
    assert_eq!(project.count("spawn"), 1);
    assert_eq!(project.count("batch"), 1);
}

#[tokio::test]
async fn unsaved_text_uses_map_file_option() {
    let project = FakeProject::new();
    let manager = project.manager_with(batch_only(&project), Settings::default());
    let file = SourceFile::new(project.file("A.hs")).with_text("module A where\n");

    let messages = manager.check(&file, false).await.unwrap();
    assert_eq!(messages.len(), 1);

    let path = project.file("A.hs").display().to_string();
    let expected = format!("batch --map-file {path} check {path} --");
    assert!(
        project.log_lines().contains(&expected),
        "log: {:?}",
        project.log_lines()
    );
}

#[tokio::test]
async fn unsaved_text_without_final_newline_is_terminated() {
    let project = FakeProject::new();
    let manager = project.manager_with(batch_only(&project), Settings::default());
    let file = SourceFile::new(project.file("A.hs")).with_text("module A where\nx = 1");

    let messages = manager.check(&file, false).await.unwrap();
    assert_eq!(messages.len(), 1);
    assert_eq!(project.count("batch --map-file"), 1);
}

#[tokio::test]
async fn old_tool_stages_text_in_temp_file_and_rewrites_paths() {
    let project = FakeProject::with_version("5.3.0");
    let manager = project.manager_with(batch_only(&project), Settings::default());
    let mut events = manager.subscribe();
    let file = SourceFile::new(project.file("A.hs")).with_text("module A where\n");

    let messages = manager.check(&file, false).await.unwrap();
    assert_eq!(messages.len(), 1);

    let batch_line = project
        .log_lines()
        .into_iter()
        .find(|line| line.starts_with("batch check"))
        .unwrap();
    assert!(batch_line.contains("gmod-"), "{batch_line}");
    assert!(batch_line.ends_with(".hs"), "{batch_line}");
    assert!(!batch_line.contains("--map-file"));

    let mut advisory = false;
    while let Ok(event) = events.try_recv() {
        if let gmod_backend::BackendEvent::Warning { kind, .. } = event {
            advisory |= kind == gmod_backend::WarningKind::VersionAdvisory;
        }
    }
    assert!(advisory);
}

#[tokio::test]
async fn root_settings_add_compiler_options() {
    let project = FakeProject::new();
    fs::write(
        project.root.join(".gmod.toml"),
        "compiler_options = [\"-Wall\"]\n",
    )
    .unwrap();
    let manager = BackendManager::new(
        batch_only(&project),
        Arc::new(FileSettingsProvider::new(SettingsLayer::default())),
    );

    manager.lang(&project.root).await.unwrap();
    assert!(
        project
            .log_lines()
            .contains(&"batch --ghc-option -Wall lang --".to_string()),
        "log: {:?}",
        project.log_lines()
    );
}

#[tokio::test]
async fn browse_skips_main_and_classifies_symbols() {
    let project = FakeProject::new();
    let manager = project.manager();
    let modules = vec!["Main".to_string(), "Data.List".to_string()];

    let symbols = manager.browse(&project.root, &modules).await.unwrap();
    assert_eq!(symbols.len(), 2);
    assert_eq!(symbols[0].name, "foldr");
    assert_eq!(symbols[0].kind, SymbolKind::Function);
    assert_eq!(symbols[1].kind, SymbolKind::Type);
    assert!(
        project
            .log_lines()
            .contains(&"batch browse -d -o -p -- Data.List".to_string())
    );
}

#[tokio::test]
async fn list_lint_and_flag_run_as_batch() {
    let project = FakeProject::new();
    let config = ToolConfig {
        hlint_options: vec!["--ignore=Use camelCase".to_string()],
        ..project.config()
    };
    let manager = project.manager_with(config, Settings::default());
    manager.set_queue_limit(QueueName::List, 3);

    assert_eq!(
        manager.list(&project.root).await.unwrap(),
        vec!["Data.List", "Main"]
    );
    assert_eq!(manager.flag(&project.root).await.unwrap(), vec!["-Wall"]);
    let lint = manager
        .lint(&SourceFile::new(project.file("A.hs")))
        .await
        .unwrap();
    assert_eq!(lint.len(), 1);
    assert_eq!(lint[0].severity, gmod_types::Severity::Lint);
    assert_eq!(project.count("spawn"), 0);
    assert_eq!(manager.queue_limit(QueueName::List), 3);
    assert_eq!(manager.outstanding(QueueName::List), 0);
}
