//! Service-level flows over real SQLite stores: the lifecycle engine and
//! claim dispatcher wired to a recording event bus and callback poster.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use judge_core::application::{ClaimDispatcher, JobLifecycle};
use judge_core::domain::{
    DomainError, JobProgress, JobStatus, Language, NewProblem, NewSubmission, Verdict,
    STALE_CLAIM_MS,
};
use judge_core::port::callback::mocks::RecordingCallbackPoster;
use judge_core::port::event_bus::mocks::RecordingEventBus;
use judge_core::port::time_provider::mocks::FixedTimeProvider;
use judge_core::port::token_provider::mocks::SequentialTokenProvider;
use judge_core::port::ProblemStore;
use judge_core::AppError;
use judge_infra_sqlite::{
    create_pool, run_migrations, PoolSettings, SqliteJobStore, SqliteProblemStore,
    SqliteSubmissionStore,
};

const TEST_CASES: i64 = 3;
const START_MS: i64 = 1_000_000;

struct Harness {
    lifecycle: Arc<JobLifecycle>,
    dispatcher: Arc<ClaimDispatcher>,
    events: Arc<RecordingEventBus>,
    callbacks: Arc<RecordingCallbackPoster>,
    clock: Arc<FixedTimeProvider>,
}

static DB_SEQ: AtomicU64 = AtomicU64::new(0);

async fn harness(failing_callbacks: bool) -> Harness {
    let name = DB_SEQ.fetch_add(1, Ordering::SeqCst);
    let url = format!("sqlite:file:lifecycle_{}?mode=memory&cache=shared", name);
    let pool = create_pool(&url, &PoolSettings::default()).await.unwrap();
    run_migrations(&pool).await.unwrap();

    let jobs = Arc::new(SqliteJobStore::new(pool.clone()));
    let submissions = Arc::new(SqliteSubmissionStore::new(pool.clone()));
    let problems = Arc::new(SqliteProblemStore::new(pool.clone()));

    problems
        .insert(
            NewProblem {
                id: 1,
                test_cases: TEST_CASES,
                time_limit: 1.0,
                memory_limit: 65536,
                generator_code: "gen".into(),
                generator_language: Language::Python3,
                grader_code: "grade".into(),
                grader_language: Language::Python3,
                source_verifier_code: None,
                source_verifier_language: None,
            },
            START_MS,
        )
        .await
        .unwrap();

    let events = Arc::new(RecordingEventBus::new());
    let callbacks = Arc::new(if failing_callbacks {
        RecordingCallbackPoster::failing()
    } else {
        RecordingCallbackPoster::new()
    });
    let clock = Arc::new(FixedTimeProvider::new(START_MS));
    let tokens = Arc::new(SequentialTokenProvider::new(100));

    let lifecycle = Arc::new(JobLifecycle::new(
        jobs.clone(),
        submissions.clone(),
        problems.clone(),
        events.clone(),
        callbacks.clone(),
        clock.clone(),
    ));
    let dispatcher = Arc::new(ClaimDispatcher::new(
        jobs,
        submissions,
        events.clone(),
        tokens,
        clock.clone(),
    ));

    Harness {
        lifecycle,
        dispatcher,
        events,
        callbacks,
        clock,
    }
}

fn submission(code: &str) -> NewSubmission {
    NewSubmission {
        uid: Some(7),
        gid: None,
        problem_id: 1,
        code: code.into(),
        language: Language::Cxx,
    }
}

fn progress(last_ran_case: i64) -> JobProgress {
    JobProgress {
        execution_time: 0.12,
        execution_memory: 1024,
        last_ran_case,
    }
}

async fn wait_for_callbacks(harness: &Harness, count: usize) {
    for _ in 0..100 {
        if harness.callbacks.posts().len() >= count {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("expected {} callback post(s)", count);
}

#[tokio::test]
async fn happy_path_finishes_and_fires_callback() {
    let h = harness(false).await;

    let (_submission, job) = h
        .lifecycle
        .create_submission(submission("int main;"), Some("http://cb.example/hook".into()))
        .await
        .unwrap();

    // The jury pulls the job and receives its working set.
    let claim = h.dispatcher.claim().await.unwrap().unwrap();
    assert_eq!(claim.id, job.id);
    assert_eq!(claim.problem_id, 1);
    assert_eq!(claim.code, "int main;");
    assert_eq!(claim.language, Language::Cxx);

    // All cases ran, verdict attached: the job is finished.
    let finished = h
        .lifecycle
        .submit(
            job.id,
            claim.verification_code,
            progress(TEST_CASES),
            Some(Verdict::Accepted),
        )
        .await
        .unwrap();
    assert_eq!(finished.status, JobStatus::Finished);
    assert_eq!(finished.verdict, Some(Verdict::Accepted));

    let fetched = h.lifecycle.get_job(job.id).await.unwrap();
    assert_eq!(fetched.status, JobStatus::Finished);
    assert_eq!(fetched.verification_code, None);

    // Exactly one callback, carrying the job details.
    wait_for_callbacks(&h, 1).await;
    let posts = h.callbacks.posts();
    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0].0, "http://cb.example/hook");
    assert_eq!(posts[0].1["verdict"], serde_json::json!("AC"));
    assert_eq!(posts[0].1["id"], serde_json::json!(job.id));

    // Event traffic: creation, claim, update.
    assert!(h.events.was_published("submission_new"));
    assert!(h.events.was_published("job_new"));
    assert!(h.events.was_published("job_claimed"));
    let updates = h.events.events_named("job_updated");
    assert_eq!(updates.len(), 1);
    assert_eq!(updates[0].payload["status"], serde_json::json!("finished"));
}

#[tokio::test]
async fn last_case_without_verdict_awaits() {
    let h = harness(false).await;

    let (_, job) = h
        .lifecycle
        .create_submission(submission("x"), None)
        .await
        .unwrap();
    let claim = h.dispatcher.claim().await.unwrap().unwrap();

    // One case short keeps the job started.
    let running = h
        .lifecycle
        .submit(job.id, claim.verification_code, progress(TEST_CASES - 1), None)
        .await
        .unwrap();
    assert_eq!(running.status, JobStatus::Started);

    let awaiting = h
        .lifecycle
        .submit(job.id, claim.verification_code, progress(TEST_CASES), None)
        .await
        .unwrap();
    assert_eq!(awaiting.status, JobStatus::AwaitingVerdict);

    // The verdict arrives in a later message.
    let finished = h
        .lifecycle
        .submit(
            job.id,
            claim.verification_code,
            progress(TEST_CASES),
            Some(Verdict::WrongAnswer),
        )
        .await
        .unwrap();
    assert_eq!(finished.status, JobStatus::Finished);
}

#[tokio::test]
async fn stale_claim_is_reclaimed_and_old_holder_locked_out() {
    let h = harness(false).await;

    let (_, job) = h
        .lifecycle
        .create_submission(submission("x"), None)
        .await
        .unwrap();

    let first = h.dispatcher.claim().await.unwrap().unwrap();

    // Jury A goes dark; five minutes later B claims the same job.
    h.clock.advance(STALE_CLAIM_MS + 1);
    let second = h.dispatcher.claim().await.unwrap().unwrap();
    assert_eq!(second.id, job.id);
    assert_ne!(second.verification_code, first.verification_code);

    // A comes back: its code no longer opens the job.
    let err = h
        .lifecycle
        .submit(job.id, first.verification_code, progress(1), None)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Domain(DomainError::CodeMismatch)));

    // B proceeds normally.
    h.lifecycle
        .submit(job.id, second.verification_code, progress(1), None)
        .await
        .unwrap();

    assert_eq!(h.events.events_named("job_claimed").len(), 2);
}

#[tokio::test]
async fn cancel_during_run_conflicts_next_submit() {
    let h = harness(false).await;

    let (_, job) = h
        .lifecycle
        .create_submission(submission("x"), None)
        .await
        .unwrap();
    let claim = h.dispatcher.claim().await.unwrap().unwrap();

    h.lifecycle.cancel(job.id).await.unwrap();
    assert!(h.events.was_published("job_cancelled"));

    let err = h
        .lifecycle
        .submit(job.id, claim.verification_code, progress(1), None)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        AppError::Domain(DomainError::InvalidStateTransition { .. })
    ));

    // Cancel is terminal.
    assert!(h.lifecycle.cancel(job.id).await.is_err());
}

#[tokio::test]
async fn release_requeues_for_the_next_claim() {
    let h = harness(false).await;

    let (_, job) = h
        .lifecycle
        .create_submission(submission("x"), None)
        .await
        .unwrap();
    let claim = h.dispatcher.claim().await.unwrap().unwrap();

    let err = h
        .lifecycle
        .release(job.id, claim.verification_code + 1)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Domain(DomainError::CodeMismatch)));

    h.lifecycle
        .release(job.id, claim.verification_code)
        .await
        .unwrap();
    assert!(h.events.was_published("job_released"));

    let requeued = h.lifecycle.get_job(job.id).await.unwrap();
    assert_eq!(requeued.status, JobStatus::Queued);
    assert_eq!(requeued.verification_code, None);

    // No stale wait needed: a released job is immediately claimable.
    let reclaim = h.dispatcher.claim().await.unwrap().unwrap();
    assert_eq!(reclaim.id, job.id);
    assert_ne!(reclaim.verification_code, claim.verification_code);
}

#[tokio::test]
async fn callback_failure_is_swallowed() {
    let h = harness(true).await;

    let (_, job) = h
        .lifecycle
        .create_submission(submission("x"), Some("http://down.example".into()))
        .await
        .unwrap();
    let claim = h.dispatcher.claim().await.unwrap().unwrap();

    // The submit succeeds even though the callback target is down.
    let finished = h
        .lifecycle
        .submit(
            job.id,
            claim.verification_code,
            progress(TEST_CASES),
            Some(Verdict::JudgeError),
        )
        .await
        .unwrap();
    assert_eq!(finished.status, JobStatus::Finished);

    wait_for_callbacks(&h, 1).await;
}

#[tokio::test]
async fn callback_fires_at_most_once() {
    let h = harness(false).await;

    let (_, job) = h
        .lifecycle
        .create_submission(submission("x"), Some("http://cb.example".into()))
        .await
        .unwrap();
    let claim = h.dispatcher.claim().await.unwrap().unwrap();

    h.lifecycle
        .submit(
            job.id,
            claim.verification_code,
            progress(TEST_CASES),
            Some(Verdict::Accepted),
        )
        .await
        .unwrap();
    wait_for_callbacks(&h, 1).await;

    // A retry of the final message conflicts and must not re-fire.
    let err = h
        .lifecycle
        .submit(
            job.id,
            claim.verification_code,
            progress(TEST_CASES),
            Some(Verdict::Accepted),
        )
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        AppError::Domain(DomainError::InvalidStateTransition { .. })
    ));

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(h.callbacks.posts().len(), 1);
}

#[tokio::test]
async fn submission_details_list_jobs_in_creation_order() {
    let h = harness(false).await;

    let (submission_row, first_job) = h
        .lifecycle
        .create_submission(submission("x"), None)
        .await
        .unwrap();

    h.clock.advance(1_000);
    let rerun_a = h.lifecycle.create_job(submission_row.id, None).await.unwrap();
    h.clock.advance(1_000);
    let rerun_b = h.lifecycle.create_job(submission_row.id, None).await.unwrap();

    let details = h
        .lifecycle
        .get_submission_details(submission_row.id)
        .await
        .unwrap();
    let jobs = details.jobs.unwrap();
    let ids: Vec<i64> = jobs.iter().map(|j| j.id).collect();
    assert_eq!(ids, vec![first_job.id, rerun_a.id, rerun_b.id]);
}

#[tokio::test]
async fn create_submission_validations() {
    let h = harness(false).await;

    let mut missing_problem = submission("x");
    missing_problem.problem_id = 404;
    assert!(matches!(
        h.lifecycle
            .create_submission(missing_problem, None)
            .await
            .unwrap_err(),
        AppError::Validation(_)
    ));

    assert!(matches!(
        h.lifecycle
            .create_submission(submission("x"), Some("u".repeat(257)))
            .await
            .unwrap_err(),
        AppError::Validation(_)
    ));

    // Rerun creation checks the submission exists.
    assert!(matches!(
        h.lifecycle.create_job(404, None).await.unwrap_err(),
        AppError::NotFound(_)
    ));
}

#[tokio::test]
async fn empty_queue_yields_no_claim() {
    let h = harness(false).await;
    assert!(h.dispatcher.claim().await.unwrap().is_none());
}
