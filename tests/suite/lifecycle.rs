//! Backend creation, failure reporting and shutdown.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use gmod_backend::{BackendError, BackendEvent, BackendManager, SpawnFailureReport};
use gmod_config::{FileSettingsProvider, Settings, SettingsLayer, ToolConfig};
use gmod_types::{Position, QueueName, SourceFile};
use tokio::sync::broadcast::Receiver;

use crate::common::FakeProject;

#[tokio::test]
async fn probe_derives_capabilities() {
    let project = FakeProject::new();
    let manager = project.manager();

    let caps = manager.capabilities(&project.root).await.unwrap();
    assert_eq!(caps.version.parts(), &[5, 6, 0, 0]);
    assert!(caps.type_constraints);
    assert!(caps.browse_parents);
    assert!(caps.interactive_case_split);
    assert!(!caps.imported_from);
}

#[tokio::test]
async fn experimental_setting_enables_imported_from() {
    let project = FakeProject::new();
    let config = ToolConfig {
        experimental: true,
        ..project.config()
    };
    let manager = project.manager_with(config, Settings::default());
    assert!(manager.capabilities(&project.root).await.unwrap().imported_from);
}

fn spawn_failures(events: &mut Receiver<BackendEvent>) -> Vec<SpawnFailureReport> {
    std::iter::from_fn(|| events.try_recv().ok())
        .filter_map(|event| match event {
            BackendEvent::SpawnFailed(report) => Some(report),
            _ => None,
        })
        .collect()
}

#[tokio::test]
async fn concurrent_callers_share_one_failed_probe() {
    let project = FakeProject::failing_probe();
    let config = ToolConfig {
        additional_path_directories: vec![PathBuf::from("/opt/ghc/bin")],
        ..project.config()
    };
    let manager = project.manager_with(config, Settings::default());
    let mut events = manager.subscribe();

    let (a, b) = tokio::join!(
        manager.capabilities(&project.root),
        manager.capabilities(&project.root)
    );
    assert!(matches!(a, Err(BackendError::Probe { .. })));
    assert!(matches!(b, Err(BackendError::Probe { .. })));
    assert_eq!(project.count("probe"), 1);

    let reports = spawn_failures(&mut events);
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].root, project.root);
    assert_eq!(reports[0].tool, project.tool);
    assert_eq!(reports[0].path_entries[0], PathBuf::from("/opt/ghc/bin"));
    assert_eq!(reports[0].stderr, vec!["ghc-mod: cannot satisfy -package-id"]);
}

#[tokio::test]
async fn missing_tool_is_reprobed_on_next_call() {
    let project = FakeProject::new();
    let config = ToolConfig {
        path: "/nonexistent/bin/ghc-mod".into(),
        ..project.config()
    };
    let manager = project.manager_with(config, Settings::default());
    let mut events = manager.subscribe();

    assert!(manager.capabilities(&project.root).await.is_err());
    assert_eq!(spawn_failures(&mut events).len(), 1);

    // The failed entry is gone, so the next call probes again.
    assert!(manager.list(&project.root).await.is_err());
    assert_eq!(spawn_failures(&mut events).len(), 1);
}

#[tokio::test]
async fn disabled_root_never_runs_the_tool() {
    let project = FakeProject::new();
    fs::write(project.root.join(".gmod.toml"), "disable = true\n").unwrap();
    let manager = BackendManager::new(
        project.config(),
        Arc::new(FileSettingsProvider::new(SettingsLayer::default())),
    );

    let err = manager
        .type_at(&SourceFile::new(project.file("A.hs")), Position::new(0, 2))
        .await;
    assert!(matches!(err, Err(BackendError::Disabled { .. })));
    assert!(project.log_lines().is_empty());
}

#[tokio::test]
async fn queue_events_bracket_each_command() {
    let project = FakeProject::new();
    let manager = project.manager();
    manager.capabilities(&project.root).await.unwrap();
    let mut events = manager.subscribe();

    manager.list(&project.root).await.unwrap();

    let seen: Vec<_> = std::iter::from_fn(|| events.try_recv().ok())
        .filter(|event| {
            matches!(
                event,
                BackendEvent::BackendActive
                    | BackendEvent::QueueIdle { .. }
                    | BackendEvent::BackendIdle
            )
        })
        .collect();
    assert!(matches!(seen[0], BackendEvent::BackendActive));
    assert!(matches!(
        seen[1],
        BackendEvent::QueueIdle {
            queue: QueueName::List
        }
    ));
    assert!(matches!(seen[2], BackendEvent::BackendIdle));
}

#[tokio::test]
async fn low_memory_mode_still_answers_queries() {
    let project = FakeProject::new();
    let config = ToolConfig {
        low_memory: true,
        ..project.config()
    };
    let manager = project.manager_with(config, Settings::default());

    let modules = manager.list(&project.root).await.unwrap();
    assert_eq!(modules, vec!["Data.List", "Main"]);
    // Every command is interactive when the process is enabled.
    assert_eq!(project.count("interactive list"), 1);

    manager.set_low_memory(false);
    manager.list(&project.root).await.unwrap();
    assert_eq!(project.count("batch list"), 1);
}

#[tokio::test]
async fn destroy_announces_shutdown() {
    let project = FakeProject::new();
    let manager = project.manager();
    let file = SourceFile::new(project.file("A.hs"));
    manager.info(&file, "main").await.unwrap();

    let mut events = manager.subscribe();
    manager.destroy().await;
    let destroyed = std::iter::from_fn(|| events.try_recv().ok())
        .any(|event| matches!(event, BackendEvent::Destroyed));
    assert!(destroyed);
}
