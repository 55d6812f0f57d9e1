use std::sync::Arc;

use batchbridge_client::{
    DriverConfig, DriverRegistry, ExecutorError, Level, RecordingObserver, RefreshOutcome,
    RemoteExecutor,
};
use batchbridge_core::{Job, JobSpec, JobState};
use mockito::Server;

fn executor(driver: &str, server: &Server, observer: Arc<RecordingObserver>) -> RemoteExecutor {
    DriverRegistry::builtin()
        .executor(
            driver,
            DriverConfig::new("tok").with_base_url(server.url()),
            observer,
        )
        .unwrap()
}

#[tokio::test]
async fn nersc_submit_poll_until_completed() {
    let mut server = Server::new_async().await;
    let submit = server
        .mock("POST", "/compute/jobs/perlmutter")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"jobid": "12345"}"#)
        .create_async()
        .await;

    let observer = Arc::new(RecordingObserver::new());
    let executor = executor("nersc", &server, observer.clone());
    let mut job = Job::new(JobSpec::new("/bin/hostname").with_name("hostname"));

    executor.submit(&mut job).await.unwrap();
    submit.assert_async().await;
    assert_eq!(job.native_id(), Some("12345"));
    assert_eq!(job.state(), JobState::Queued);

    let running = server
        .mock("GET", "/compute/jobs/perlmutter/12345")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"status": "RUNNING"}"#)
        .create_async()
        .await;
    assert!(matches!(
        executor.refresh(&mut job).await,
        RefreshOutcome::Updated { from: JobState::Queued, to: JobState::Active }
    ));
    running.remove_async().await;

    let done = server
        .mock("GET", "/compute/jobs/perlmutter/12345")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"status": "COMPLETED"}"#)
        .create_async()
        .await;
    executor.refresh(&mut job).await;
    done.remove_async().await;
    assert_eq!(job.state(), JobState::Completed);

    // Scheduler noise after completion is ignored
    let _noise = server
        .mock("GET", "/compute/jobs/perlmutter/12345")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"status": "RUNNING"}"#)
        .expect(0)
        .create_async()
        .await;
    executor.refresh(&mut job).await;
    assert_eq!(job.state(), JobState::Completed);

    assert!(observer.messages(Level::Error).is_empty());
}

#[tokio::test]
async fn slurm_submit_without_id_keeps_job_new() {
    let mut server = Server::new_async().await;
    let _submit = server
        .mock("POST", "/slurm/v0.0.41/job/submit")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"errors": [], "warnings": []}"#)
        .create_async()
        .await;

    let observer = Arc::new(RecordingObserver::new());
    let executor = executor("slurm-rest", &server, observer.clone());
    let mut job = Job::new(JobSpec::new("/bin/hostname"));

    let err = executor.submit(&mut job).await.unwrap_err();

    assert!(matches!(err, ExecutorError::Protocol(_)));
    assert_eq!(job.state(), JobState::New);
    assert!(job.native_id().is_none());
    assert_eq!(observer.messages(Level::Error).len(), 1);
}

#[tokio::test]
async fn slurm_attach_then_cancel() {
    let mut server = Server::new_async().await;
    let _status = server
        .mock("GET", "/slurm/v0.0.40/job/777")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"jobs": [{"job_id": 777, "job_state": ["RUNNING"]}]}"#)
        .create_async()
        .await;
    let cancel = server
        .mock("DELETE", "/slurm/v0.0.40/job/777")
        .with_status(200)
        .with_body("{}")
        .create_async()
        .await;

    let executor = executor("slurm-rest", &server, Arc::new(RecordingObserver::new()));
    let mut job = Job::new(JobSpec::new("/bin/sleep").with_argument("600"));

    executor.attach(&mut job, "777").await.unwrap();
    assert_eq!(job.state(), JobState::Active);

    executor.cancel(&job).await.unwrap();
    cancel.assert_async().await;
    assert_eq!(job.state(), JobState::Active);
}

#[tokio::test]
async fn cancel_before_submit_sends_no_request() {
    let mut server = Server::new_async().await;
    let cancel = server
        .mock("DELETE", mockito::Matcher::Any)
        .expect(0)
        .create_async()
        .await;

    let executor = executor("nersc", &server, Arc::new(RecordingObserver::new()));
    let job = Job::new(JobSpec::new("/bin/hostname"));

    let err = executor.cancel(&job).await.unwrap_err();

    assert!(err.is_precondition());
    cancel.assert_async().await;
}

#[tokio::test]
async fn refresh_failure_is_reported_not_raised() {
    let mut server = Server::new_async().await;
    let _status = server
        .mock("GET", "/slurm/v0.0.40/job/1")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"jobs": [{"job_id": 1, "job_state": ["PENDING"]}]}"#)
        .create_async()
        .await;

    let observer = Arc::new(RecordingObserver::new());
    let executor = executor("slurm-rest", &server, observer.clone());
    let mut job = Job::new(JobSpec::new("/bin/true"));
    executor.attach(&mut job, "1").await.unwrap();
    assert_eq!(job.state(), JobState::Queued);

    server.reset_async().await;
    let _outage = server
        .mock("GET", "/slurm/v0.0.40/job/1")
        .with_status(502)
        .create_async()
        .await;

    let outcome = executor.refresh(&mut job).await;

    assert!(outcome.error().is_some_and(|e| e.is_transport()));
    assert_eq!(job.state(), JobState::Queued);
    assert_eq!(observer.messages(Level::Warning).len(), 1);
}

#[tokio::test]
async fn list_with_no_jobs_is_empty() {
    let mut server = Server::new_async().await;
    let _list = server
        .mock("GET", "/slurm/v0.0.40/jobs")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"jobs": []}"#)
        .create_async()
        .await;

    let executor = executor("slurm-rest", &server, Arc::new(RecordingObserver::new()));

    assert_eq!(executor.list().await.unwrap(), Vec::<String>::new());
}

#[tokio::test]
async fn refresh_before_submit_is_a_noop() {
    let mut server = Server::new_async().await;
    let status = server
        .mock("GET", mockito::Matcher::Any)
        .expect(0)
        .create_async()
        .await;

    let observer = Arc::new(RecordingObserver::new());
    let executor = executor("nersc", &server, observer.clone());
    let mut job = Job::new(JobSpec::new("/bin/hostname"));

    let outcome = executor.refresh(&mut job).await;

    assert!(matches!(outcome, RefreshOutcome::Unchanged(JobState::New)));
    assert!(outcome.error().is_none());
    status.assert_async().await;
    assert!(observer.events().is_empty());
}
