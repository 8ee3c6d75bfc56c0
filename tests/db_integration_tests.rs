//! Integration tests for the database layer.
//!
//! These tests verify the core store operations and punishment invariants
//! using an in-memory SQLite database.

use shameboard::db::{Database, now_ms};
use shameboard::types::TaskChanges;

/// Helper to create a fresh in-memory database for testing.
fn setup_db() -> Database {
    Database::open_in_memory().expect("Failed to create in-memory database")
}

mod crud_tests {
    use super::*;

    #[test]
    fn create_task_sets_defaults_and_timestamps() {
        let db = setup_db();

        let task = db
            .create_task(
                "write tests".to_string(),
                100.0,
                120.0,
                None,
                String::new(),
                String::new(),
            )
            .expect("Failed to create task");

        assert!(!task.id.is_empty());
        assert!(!task.is_completed);
        assert!(!task.is_punished);
        assert!(task.deadline.is_none());
        assert_eq!(task.created_at, task.updated_at);
        assert!(task.created_at > 0);
    }

    #[test]
    fn create_generates_unique_ids() {
        let db = setup_db();

        let a = db
            .create_task("a".to_string(), 0.0, 0.0, None, String::new(), String::new())
            .unwrap();
        let b = db
            .create_task("b".to_string(), 0.0, 0.0, None, String::new(), String::new())
            .unwrap();

        assert_ne!(a.id, b.id);
    }

    #[test]
    fn stored_task_round_trips_exactly() {
        let db = setup_db();

        let created = db
            .create_task(
                "- [ ] milk\n- [x] bread".to_string(),
                12.5,
                -3.25,
                Some(1_700_000_000_123),
                "wear the hat".to_string(),
                "https://hooks.example/abc".to_string(),
            )
            .unwrap();

        let fetched = db.get_task(&created.id).unwrap().expect("task exists");

        assert_eq!(fetched.content, created.content);
        assert_eq!(fetched.x, 12.5);
        assert_eq!(fetched.y, -3.25);
        assert_eq!(fetched.deadline, Some(1_700_000_000_123));
        assert_eq!(fetched.shame_message, "wear the hat");
        assert_eq!(fetched.webhook_url, "https://hooks.example/abc");
        assert_eq!(fetched.created_at, created.created_at);
        assert_eq!(fetched.updated_at, created.updated_at);
    }

    #[test]
    fn get_unknown_id_returns_none() {
        let db = setup_db();

        assert!(db.get_task("no-such-task").unwrap().is_none());
    }

    #[test]
    fn update_merges_partial_fields() {
        let db = setup_db();
        let task = db
            .create_task(
                "original".to_string(),
                1.0,
                2.0,
                Some(5_000),
                "shame".to_string(),
                "url".to_string(),
            )
            .unwrap();

        let updated = db
            .update_task(
                &task.id,
                TaskChanges {
                    x: Some(50.0),
                    ..TaskChanges::default()
                },
            )
            .unwrap()
            .expect("task exists");

        assert_eq!(updated.x, 50.0);
        assert_eq!(updated.y, 2.0);
        assert_eq!(updated.content, "original");
        assert_eq!(updated.deadline, Some(5_000));
        assert_eq!(updated.shame_message, "shame");
        assert!(updated.updated_at >= task.updated_at);
    }

    #[test]
    fn update_refreshes_updated_at() {
        let db = setup_db();
        let task = db
            .create_task("t".to_string(), 0.0, 0.0, None, String::new(), String::new())
            .unwrap();

        std::thread::sleep(std::time::Duration::from_millis(5));

        let updated = db
            .update_task(
                &task.id,
                TaskChanges {
                    content: Some("t2".to_string()),
                    ..TaskChanges::default()
                },
            )
            .unwrap()
            .unwrap();

        assert!(updated.updated_at > task.updated_at);
        assert!(updated.updated_at >= updated.created_at);
    }

    #[test]
    fn update_clears_deadline_with_explicit_null() {
        let db = setup_db();
        let task = db
            .create_task(
                "t".to_string(),
                0.0,
                0.0,
                Some(9_000),
                String::new(),
                String::new(),
            )
            .unwrap();

        let updated = db
            .update_task(
                &task.id,
                TaskChanges {
                    deadline: Some(None),
                    ..TaskChanges::default()
                },
            )
            .unwrap()
            .unwrap();

        assert!(updated.deadline.is_none());
    }

    #[test]
    fn update_keeps_deadline_when_field_is_absent() {
        let db = setup_db();
        let task = db
            .create_task(
                "t".to_string(),
                0.0,
                0.0,
                Some(9_000),
                String::new(),
                String::new(),
            )
            .unwrap();

        let updated = db
            .update_task(
                &task.id,
                TaskChanges {
                    content: Some("still due".to_string()),
                    ..TaskChanges::default()
                },
            )
            .unwrap()
            .unwrap();

        assert_eq!(updated.deadline, Some(9_000));
    }

    #[test]
    fn update_unknown_id_returns_none() {
        let db = setup_db();

        let result = db
            .update_task(
                "missing",
                TaskChanges {
                    x: Some(1.0),
                    ..TaskChanges::default()
                },
            )
            .unwrap();

        assert!(result.is_none());
    }

    #[test]
    fn delete_removes_task_and_reports_absence() {
        let db = setup_db();
        let task = db
            .create_task("t".to_string(), 0.0, 0.0, None, String::new(), String::new())
            .unwrap();

        assert!(db.delete_task(&task.id).unwrap());
        assert!(db.get_task(&task.id).unwrap().is_none());
        assert!(!db.delete_task(&task.id).unwrap());
    }

    #[test]
    fn list_returns_all_tasks_with_real_booleans() {
        let db = setup_db();
        let open = db
            .create_task("open".to_string(), 0.0, 0.0, None, String::new(), String::new())
            .unwrap();
        let done = db
            .create_task("done".to_string(), 0.0, 0.0, None, String::new(), String::new())
            .unwrap();
        db.update_task(
            &done.id,
            TaskChanges {
                is_completed: Some(true),
                ..TaskChanges::default()
            },
        )
        .unwrap();

        let tasks = db.list_tasks().unwrap();

        assert_eq!(tasks.len(), 2);
        let open_row = tasks.iter().find(|t| t.id == open.id).unwrap();
        let done_row = tasks.iter().find(|t| t.id == done.id).unwrap();
        assert!(!open_row.is_completed);
        assert!(done_row.is_completed);
    }
}

mod eligibility_tests {
    use super::*;

    fn overdue_task(db: &Database) -> shameboard::types::Task {
        db.create_task(
            "overdue".to_string(),
            0.0,
            0.0,
            Some(now_ms() - 3_600_000),
            String::new(),
            String::new(),
        )
        .unwrap()
    }

    #[test]
    fn overdue_open_task_is_selected() {
        let db = setup_db();
        let task = overdue_task(&db);

        let eligible = db.overdue_tasks(now_ms()).unwrap();

        assert_eq!(eligible.len(), 1);
        assert_eq!(eligible[0].id, task.id);
    }

    #[test]
    fn completed_task_is_never_selected() {
        let db = setup_db();
        let task = overdue_task(&db);
        db.update_task(
            &task.id,
            TaskChanges {
                is_completed: Some(true),
                ..TaskChanges::default()
            },
        )
        .unwrap();

        assert!(db.overdue_tasks(now_ms()).unwrap().is_empty());
    }

    #[test]
    fn punished_task_is_never_selected_again() {
        let db = setup_db();
        let task = overdue_task(&db);
        assert!(db.mark_punished(&task.id, now_ms()).unwrap());

        assert!(db.overdue_tasks(now_ms()).unwrap().is_empty());
    }

    #[test]
    fn task_without_deadline_is_never_selected() {
        let db = setup_db();
        db.create_task("no deadline".to_string(), 0.0, 0.0, None, String::new(), String::new())
            .unwrap();

        assert!(db.overdue_tasks(now_ms()).unwrap().is_empty());
    }

    #[test]
    fn future_deadline_is_not_selected() {
        let db = setup_db();
        db.create_task(
            "later".to_string(),
            0.0,
            0.0,
            Some(now_ms() + 3_600_000),
            String::new(),
            String::new(),
        )
        .unwrap();

        assert!(db.overdue_tasks(now_ms()).unwrap().is_empty());
    }

    #[test]
    fn deadline_exactly_now_is_not_yet_overdue() {
        let db = setup_db();
        let now = now_ms();
        db.create_task(
            "on the dot".to_string(),
            0.0,
            0.0,
            Some(now),
            String::new(),
            String::new(),
        )
        .unwrap();

        assert!(db.overdue_tasks(now).unwrap().is_empty());
        assert_eq!(db.overdue_tasks(now + 1).unwrap().len(), 1);
    }
}

mod punishment_tests {
    use super::*;

    #[test]
    fn mark_punished_flips_the_flag_once() {
        let db = setup_db();
        let task = db
            .create_task(
                "t".to_string(),
                0.0,
                0.0,
                Some(now_ms() - 1_000),
                String::new(),
                String::new(),
            )
            .unwrap();

        assert!(db.mark_punished(&task.id, now_ms()).unwrap());
        assert!(db.get_task(&task.id).unwrap().unwrap().is_punished);

        // Second attempt is rejected by the guard
        assert!(!db.mark_punished(&task.id, now_ms()).unwrap());
    }

    #[test]
    fn mark_punished_refuses_completed_tasks() {
        let db = setup_db();
        let task = db
            .create_task(
                "t".to_string(),
                0.0,
                0.0,
                Some(now_ms() - 1_000),
                String::new(),
                String::new(),
            )
            .unwrap();
        db.update_task(
            &task.id,
            TaskChanges {
                is_completed: Some(true),
                ..TaskChanges::default()
            },
        )
        .unwrap();

        assert!(!db.mark_punished(&task.id, now_ms()).unwrap());
        assert!(!db.get_task(&task.id).unwrap().unwrap().is_punished);
    }

    #[test]
    fn mark_punished_refuses_unknown_tasks() {
        let db = setup_db();

        assert!(!db.mark_punished("missing", now_ms()).unwrap());
    }

    #[test]
    fn mark_punished_refreshes_updated_at() {
        let db = setup_db();
        let task = db
            .create_task(
                "t".to_string(),
                0.0,
                0.0,
                Some(now_ms() - 1_000),
                String::new(),
                String::new(),
            )
            .unwrap();

        let write_time = now_ms() + 10;
        assert!(db.mark_punished(&task.id, write_time).unwrap());

        let stored = db.get_task(&task.id).unwrap().unwrap();
        assert_eq!(stored.updated_at, write_time);
    }

    #[test]
    fn client_updates_cannot_clear_the_punished_flag() {
        let db = setup_db();
        let task = db
            .create_task(
                "t".to_string(),
                0.0,
                0.0,
                Some(now_ms() - 1_000),
                String::new(),
                String::new(),
            )
            .unwrap();
        assert!(db.mark_punished(&task.id, now_ms()).unwrap());

        // TaskChanges has no punished field; any update leaves it intact.
        let updated = db
            .update_task(
                &task.id,
                TaskChanges {
                    content: Some("rewritten".to_string()),
                    is_completed: Some(true),
                    deadline: Some(None),
                    ..TaskChanges::default()
                },
            )
            .unwrap()
            .unwrap();

        assert!(updated.is_punished);
        assert!(db.get_task(&task.id).unwrap().unwrap().is_punished);
    }

    #[test]
    fn completing_a_punished_task_keeps_punishment_history() {
        let db = setup_db();
        let task = db
            .create_task(
                "t".to_string(),
                0.0,
                0.0,
                Some(now_ms() - 1_000),
                String::new(),
                String::new(),
            )
            .unwrap();
        db.mark_punished(&task.id, now_ms()).unwrap();

        db.update_task(
            &task.id,
            TaskChanges {
                is_completed: Some(true),
                ..TaskChanges::default()
            },
        )
        .unwrap();

        let stored = db.get_task(&task.id).unwrap().unwrap();
        assert!(stored.is_completed);
        assert!(stored.is_punished);
    }
}

mod persistence_tests {
    use super::*;

    #[test]
    fn tasks_survive_reopening_the_database() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("tasks.db");

        let id = {
            let db = Database::open(&path).unwrap();
            let task = db
                .create_task(
                    "durable".to_string(),
                    7.0,
                    8.0,
                    Some(1_234),
                    "shame".to_string(),
                    String::new(),
                )
                .unwrap();
            db.mark_punished(&task.id, now_ms()).unwrap();
            task.id
        };

        let db = Database::open(&path).unwrap();
        let task = db.get_task(&id).unwrap().expect("task survives restart");
        assert_eq!(task.content, "durable");
        assert_eq!(task.deadline, Some(1_234));
        assert!(task.is_punished);
    }
}
