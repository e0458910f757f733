mod common;

use common::*;
use dendro_core::domain::job::JobStatus;
use dendro_core::dto::job::SetJobStatusRequest;
use dendro_core::event::JobEvent;
use dendro_orchestrator::service::{ServiceError, dependency_service, job_service};
use serde_json::json;

fn pending_events(app: &TestApp) -> Vec<String> {
    app.notifier
        .events()
        .into_iter()
        .filter_map(|e| match e {
            JobEvent::NewPendingJob { job_id, .. } => Some(job_id),
            _ => None,
        })
        .collect()
}

#[tokio::test]
async fn test_dependent_waits_for_every_dependency() {
    let app = test_app().await;
    let (client_id, _) = register_client(&app, vec![slot(8, 16.0, 4)]).await;
    let a = create(&app, BOB, job_request(definition("prep", 1.0), json!({}))).await;
    let b = create(&app, BOB, job_request(definition("prep", 2.0), json!({}))).await;
    let c = create(
        &app,
        BOB,
        job_request(definition("sort", 1.0), json!({ "jobDependencies": [a.job_id, b.job_id] })),
    )
    .await;
    assert!(!c.is_runnable);

    // blocked jobs cannot be claimed
    let key = job_key(&app, &c.job_id).await;
    let err = job_service::set_job_status(
        &app.state,
        &c.job_id,
        Some(&key),
        status(JobStatus::Starting, Some(&client_id)),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, ServiceError::InvalidState(_)));

    start(&app, &a.job_id, &client_id).await;
    complete(&app, &a.job_id, &client_id).await;
    assert!(!stored(&app, &c.job_id).await.is_runnable);

    app.notifier.clear();
    start(&app, &b.job_id, &client_id).await;
    complete(&app, &b.job_id, &client_id).await;

    let released = stored(&app, &c.job_id).await;
    assert!(released.is_runnable);
    assert_eq!(released.status, JobStatus::Pending);
    assert_eq!(pending_events(&app), vec![c.job_id.clone()]);
}

#[tokio::test]
async fn test_chain_releases_one_level_at_a_time() {
    let app = test_app().await;
    let (client_id, _) = register_client(&app, vec![slot(8, 16.0, 4)]).await;
    let a = create(&app, BOB, job_request(definition("step", 1.0), json!({}))).await;
    let b = create(
        &app,
        BOB,
        job_request(definition("step", 2.0), json!({ "jobDependencies": [a.job_id] })),
    )
    .await;
    let c = create(
        &app,
        BOB,
        job_request(definition("step", 3.0), json!({ "jobDependencies": [b.job_id] })),
    )
    .await;

    start(&app, &a.job_id, &client_id).await;
    complete(&app, &a.job_id, &client_id).await;
    assert!(stored(&app, &b.job_id).await.is_runnable);
    assert!(!stored(&app, &c.job_id).await.is_runnable);

    start(&app, &b.job_id, &client_id).await;
    complete(&app, &b.job_id, &client_id).await;
    assert!(stored(&app, &c.job_id).await.is_runnable);
}

#[tokio::test]
async fn test_dependency_already_complete_at_creation() {
    let app = test_app().await;
    let (client_id, _) = register_client(&app, vec![slot(8, 16.0, 1)]).await;
    let a = create(&app, BOB, job_request(definition("prep", 1.0), json!({}))).await;
    start(&app, &a.job_id, &client_id).await;
    complete(&app, &a.job_id, &client_id).await;

    let b = create(
        &app,
        BOB,
        job_request(definition("sort", 1.0), json!({ "jobDependencies": [a.job_id] })),
    )
    .await;
    assert!(b.is_runnable);
}

#[tokio::test]
async fn test_missing_or_failed_dependency_blocks() {
    let app = test_app().await;
    let ghost = create(
        &app,
        BOB,
        job_request(definition("sort", 1.0), json!({ "jobDependencies": ["no-such-job"] })),
    )
    .await;
    assert!(!ghost.is_runnable);

    let a = create(&app, BOB, job_request(definition("prep", 1.0), json!({}))).await;
    let b = create(
        &app,
        BOB,
        job_request(definition("sort", 2.0), json!({ "jobDependencies": [a.job_id] })),
    )
    .await;
    let key = job_key(&app, &a.job_id).await;
    let req = SetJobStatusRequest {
        error: Some("bad input".to_string()),
        ..status(JobStatus::Failed, None)
    };
    job_service::set_job_status(&app.state, &a.job_id, Some(&key), req).await.unwrap();

    assert!(!stored(&app, &b.job_id).await.is_runnable);
}

#[tokio::test]
async fn test_release_is_idempotent() {
    let app = test_app().await;
    let (client_id, _) = register_client(&app, vec![slot(8, 16.0, 1)]).await;
    let a = create(&app, BOB, job_request(definition("prep", 1.0), json!({}))).await;
    let b = create(
        &app,
        BOB,
        job_request(definition("sort", 1.0), json!({ "jobDependencies": [a.job_id] })),
    )
    .await;
    start(&app, &a.job_id, &client_id).await;
    complete(&app, &a.job_id, &client_id).await;
    assert!(stored(&app, &b.job_id).await.is_runnable);

    let again = dependency_service::release_dependents(&app.state, &a.job_id).await.unwrap();
    assert_eq!(again, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_sibling_completions_release_dependent_once() {
    for _ in 0..20 {
        let app = test_app().await;
        let (client_id, _) = register_client(&app, vec![slot(8, 16.0, 4)]).await;
        let a = create(&app, BOB, job_request(definition("prep", 1.0), json!({}))).await;
        let b = create(&app, BOB, job_request(definition("prep", 2.0), json!({}))).await;
        let c = create(
            &app,
            BOB,
            job_request(
                definition("sort", 1.0),
                json!({ "jobDependencies": [a.job_id, b.job_id] }),
            ),
        )
        .await;
        start(&app, &a.job_id, &client_id).await;
        start(&app, &b.job_id, &client_id).await;
        app.notifier.clear();

        let mut completions = Vec::new();
        for job_id in [a.job_id.clone(), b.job_id.clone()] {
            let key = job_key(&app, &job_id).await;
            let state = app.state.clone();
            let done = status(JobStatus::Completed, Some(&client_id));
            completions.push(tokio::spawn(async move {
                job_service::set_job_status(&state, &job_id, Some(&key), done).await
            }));
        }
        for completion in completions {
            completion.await.unwrap().unwrap();
        }

        assert!(stored(&app, &c.job_id).await.is_runnable);
        assert_eq!(pending_events(&app), vec![c.job_id.clone()]);
    }
}
