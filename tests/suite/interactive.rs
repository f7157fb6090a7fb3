//! Queries served by the long-lived interactive process.

use std::sync::Arc;

use gmod_backend::{BackendError, BackendEvent, WarningKind};
use gmod_config::{Settings, ToolConfig};
use gmod_types::{Position, SourceFile};

use crate::common::FakeProject;

#[tokio::test]
async fn type_query_runs_through_one_session() {
    let project = FakeProject::new();
    let manager = project.manager();
    let file = SourceFile::new(project.file("A.hs"));

    let first = manager.type_at(&file, Position::new(0, 2)).await.unwrap();
    assert_eq!(first.type_text, "Int");
    let second = manager.type_at(&file, Position::new(0, 20)).await.unwrap();
    assert_eq!(second.type_text, "IO ()");

    assert_eq!(project.count("probe"), 1);
    assert_eq!(project.count("spawn"), 1);
    assert_eq!(project.count("interactive type"), 2);
    assert_eq!(project.count("batch"), 0);
}

#[tokio::test]
async fn concurrent_first_requests_share_probe_and_session() {
    let project = FakeProject::new();
    let manager = project.manager();
    let file = SourceFile::new(project.file("A.hs"));

    let (a, b) = tokio::join!(
        manager.capabilities(&project.root),
        manager.capabilities(&project.root)
    );
    assert!(Arc::ptr_eq(&a.unwrap(), &b.unwrap()));

    let (a, b) = tokio::join!(
        manager.type_at(&file, Position::new(0, 2)),
        manager.info(&file, "main")
    );
    assert_eq!(a.unwrap().type_text, "Int");
    assert_eq!(b.unwrap(), "main :: IO ()");

    assert_eq!(project.count("probe"), 1);
    assert_eq!(project.count("spawn"), 1);
}

#[tokio::test]
async fn unsaved_text_is_mapped_and_unmapped() {
    let project = FakeProject::new();
    let manager = project.manager();
    let file = SourceFile::new(project.file("A.hs")).with_text("module A where\nx = 1\n");

    manager.type_at(&file, Position::new(0, 2)).await.unwrap();

    let commands: Vec<String> = project
        .log_lines()
        .into_iter()
        .filter_map(|line| {
            line.strip_prefix("interactive ")
                .and_then(|rest| rest.split(' ').next().map(str::to_string))
        })
        .collect();
    assert_eq!(commands, vec!["map-file", "type", "unmap-file"]);
}

#[tokio::test]
async fn modern_tool_gets_constraints_flag_and_separator() {
    let project = FakeProject::new();
    let manager = project.manager();
    let file = SourceFile::new(project.file("A.hs"));

    manager.type_at(&file, Position::new(0, 2)).await.unwrap();

    let expected = format!("interactive type {} -c -- 1 3", project.file("A.hs").display());
    assert!(
        project.log_lines().contains(&expected),
        "log: {:?}",
        project.log_lines()
    );
}

#[tokio::test]
async fn crash_evicts_backend_and_next_call_reprobes() {
    let project = FakeProject::new();
    let manager = project.manager();
    let mut events = manager.subscribe();
    let file = SourceFile::new(project.file("A.hs"));

    let err = manager.info(&file, "crash").await.unwrap_err();
    assert!(matches!(err, BackendError::Crashed { .. }), "got {err:?}");

    let mut reported = false;
    while let Ok(event) = events.try_recv() {
        if let BackendEvent::Error(report) = event {
            assert_eq!(report.command, "info");
            assert!(report.capabilities.is_some());
            reported = true;
        }
    }
    assert!(reported);

    assert_eq!(manager.info(&file, "main").await.unwrap(), "main :: IO ()");
    assert_eq!(project.count("probe"), 2);
    assert_eq!(project.count("spawn"), 2);
}

#[tokio::test]
async fn timeout_evicts_backend_and_next_call_reprobes() {
    let project = FakeProject::new();
    let config = ToolConfig {
        interactive_action_timeout_secs: 1,
        ..project.config()
    };
    let manager = project.manager_with(config, Settings::default());
    let mut events = manager.subscribe();
    let file = SourceFile::new(project.file("A.hs"));

    let err = manager.info(&file, "hang").await.unwrap_err();
    assert!(matches!(err, BackendError::TimedOut { .. }), "got {err:?}");

    let reported = std::iter::from_fn(|| events.try_recv().ok()).any(|event| {
        matches!(event, BackendEvent::Error(report) if report.command == "info")
    });
    assert!(reported);

    assert_eq!(manager.info(&file, "main").await.unwrap(), "main :: IO ()");
    assert_eq!(project.count("probe"), 2);
    assert_eq!(project.count("spawn"), 2);
}

#[tokio::test]
async fn suppressed_errors_resolve_empty() {
    let project = FakeProject::new();
    let settings = Settings {
        suppress_errors: true,
        ..Settings::default()
    };
    let manager = project.manager_with(project.config(), settings);
    let mut events = manager.subscribe();
    let file = SourceFile::new(project.file("A.hs"));

    // The empty substitute response has no info in it.
    let err = manager.info(&file, "crash").await.unwrap_err();
    assert!(matches!(err, BackendError::NoResult));
    while let Ok(event) = events.try_recv() {
        assert!(!matches!(event, BackendEvent::Error(_)));
    }
}

#[tokio::test]
async fn fast_check_reports_messages_and_tool_warnings() {
    let project = FakeProject::new();
    let manager = project.manager();
    let mut events = manager.subscribe();
    let file = SourceFile::new(project.file("A.hs"));

    let messages = manager.check(&file, true).await.unwrap();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].file, project.file("A.hs"));
    assert_eq!(messages[0].position, Position::new(1, 0));
    assert_eq!(project.count("interactive check"), 1);

    let mut tool_warning = false;
    while let Ok(event) = events.try_recv() {
        if let BackendEvent::Warning {
            kind: WarningKind::ToolMessage,
            message,
            ..
        } = event
        {
            assert_eq!(message, "tool note");
            tool_warning = true;
        }
    }
    assert!(tool_warning);
}

#[tokio::test]
async fn kill_process_stops_session_until_next_call() {
    let project = FakeProject::new();
    let manager = project.manager();
    let file = SourceFile::new(project.file("A.hs"));

    manager.find(&file, "foldr").await.unwrap();
    manager.kill_process().await;
    assert_eq!(manager.find(&file, "foldr").await.unwrap(), vec!["Data.List"]);

    assert_eq!(project.count("spawn"), 2);
    assert_eq!(project.count("probe"), 2);
}
