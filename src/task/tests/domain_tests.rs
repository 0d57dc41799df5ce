//! Unit tests for task domain values.

use crate::task::domain::{
    MAX_NAME_LENGTH, MAX_WORKER_ID_LENGTH, PersistedTaskData, Progress, Status, Task,
    TaskDomainError, TaskId, TaskKind, TaskStatus, WorkerId,
};
use mockable::DefaultClock;
use rstest::rstest;

#[rstest]
fn new_task_trims_its_name_and_keeps_the_payload() {
    let task = Task::new(
        TaskId::new(4),
        "  transcode clip  ",
        TaskKind::new(2),
        "{\"codec\":\"av1\"}",
        &DefaultClock,
    )
    .expect("valid task");

    assert_eq!(task.id(), TaskId::new(4));
    assert_eq!(task.name(), "transcode clip");
    assert_eq!(task.kind(), TaskKind::new(2));
    assert_eq!(task.payload(), "{\"codec\":\"av1\"}");
    assert_eq!(task.description(), None);
}

#[rstest]
#[case("")]
#[case("   ")]
fn blank_task_names_are_rejected(#[case] name: &str) {
    let result = Task::new(TaskId::new(1), name, TaskKind::new(0), "", &DefaultClock);

    assert_eq!(result, Err(TaskDomainError::EmptyTaskName));
}

#[rstest]
fn task_names_are_limited_in_characters() {
    let longest = "é".repeat(MAX_NAME_LENGTH);
    let too_long = "x".repeat(MAX_NAME_LENGTH + 1);

    let accepted = Task::new(TaskId::new(1), longest.as_str(), TaskKind::new(0), "", &DefaultClock);
    let rejected = Task::new(TaskId::new(1), too_long, TaskKind::new(0), "", &DefaultClock);

    assert_eq!(accepted.map(|task| task.name().to_owned()), Ok(longest));
    assert_eq!(rejected, Err(TaskDomainError::TaskNameTooLong(MAX_NAME_LENGTH + 1)));
}

#[rstest]
fn descriptive_fields_can_change_after_creation() {
    let mut task = Task::new(TaskId::new(1), "draft", TaskKind::new(0), "", &DefaultClock)
        .expect("valid task")
        .with_description("first");

    task.rename("final").expect("valid rename");
    task.describe(None);

    assert_eq!(task.name(), "final");
    assert_eq!(task.description(), None);
    assert_eq!(task.rename(" "), Err(TaskDomainError::EmptyTaskName));
}

#[rstest]
fn persisted_tasks_are_validated() {
    let data = PersistedTaskData {
        id: TaskId::new(1),
        name: String::new(),
        kind: TaskKind::new(0),
        created_at: chrono::Utc::now(),
        description: None,
        payload: String::new(),
    };

    assert_eq!(Task::from_persisted(data), Err(TaskDomainError::EmptyTaskName));
}

#[rstest]
fn new_status_is_idle_and_enabled() {
    let status = Status::new(TaskId::new(3));

    assert_eq!(status.status(), TaskStatus::NotStarted);
    assert_eq!(status.progress(), Progress::ZERO);
    assert!(status.is_enabled());
    assert_eq!(status.start_time(), None);
    assert_eq!(status.update_time(), None);
    assert_eq!(status.worker(), None);
    assert_eq!(status.version(), 0);
}

#[rstest]
#[case(0, true)]
#[case(57, true)]
#[case(100, true)]
#[case(-1, false)]
#[case(101, false)]
#[case(i64::MAX, false)]
fn progress_accepts_only_percentages(#[case] value: i64, #[case] valid: bool) {
    assert_eq!(Progress::new(value).is_ok(), valid);
}

#[rstest]
fn progress_displays_as_a_percentage() {
    assert_eq!(Progress::new(42).expect("valid").to_string(), "42%");
    assert!(Progress::COMPLETE.is_complete());
}

#[rstest]
#[case("0", TaskStatus::NotStarted)]
#[case("in_progress", TaskStatus::InProgress)]
#[case("DONE", TaskStatus::Completed)]
#[case(" 3 ", TaskStatus::Error)]
#[case("pending", TaskStatus::NotStarted)]
#[case("Error", TaskStatus::Error)]
#[case("completed", TaskStatus::Completed)]
fn statuses_parse_from_codes_and_names(#[case] text: &str, #[case] expected: TaskStatus) {
    assert_eq!(TaskStatus::try_from(text), Ok(expected));
}

#[rstest]
#[case("4")]
#[case("-1")]
#[case("paused")]
fn unknown_statuses_are_rejected(#[case] text: &str) {
    assert!(TaskStatus::try_from(text).is_err());
}

#[rstest]
fn status_codes_follow_declaration_order() {
    let codes: Vec<u8> = TaskStatus::ALL.into_iter().map(TaskStatus::code).collect();

    assert_eq!(codes, vec![0, 1, 2, 3]);
}

#[rstest]
fn worker_ids_are_trimmed_and_must_not_be_blank() {
    assert_eq!(
        WorkerId::new(" node-7 ").expect("valid worker").as_str(),
        "node-7"
    );
    assert_eq!(WorkerId::new("\t"), Err(TaskDomainError::EmptyWorkerId));
}

#[rstest]
fn worker_ids_are_limited_in_characters() {
    assert!(WorkerId::new("w".repeat(MAX_WORKER_ID_LENGTH)).is_ok());
    assert_eq!(
        WorkerId::new("w".repeat(MAX_WORKER_ID_LENGTH + 1)),
        Err(TaskDomainError::WorkerIdTooLong(MAX_WORKER_ID_LENGTH + 1))
    );
}

#[rstest]
fn task_ids_advance_monotonically() {
    assert!(TaskId::new(1) < TaskId::new(1).next());
    assert_eq!(TaskId::new(9).next(), TaskId::new(10));
}
