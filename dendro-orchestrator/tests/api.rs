mod common;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use common::*;
use dendro_orchestrator::api::create_router;
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

fn create_body(threshold: f64) -> Value {
    json!({
        "serviceName": SERVICE,
        "jobDefinition": definition("ms5", threshold),
        "requiredResources": { "numCpus": 1, "numGpus": 0, "memoryGb": 1.0, "timeSec": 60.0 },
        "secrets": [{ "name": "TOKEN", "value": "s3cret" }]
    })
}

#[tokio::test]
async fn test_health() {
    let app = test_app().await;
    let router = create_router(app.state.clone());

    let response = router
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_create_and_fetch_never_leak_credentials() {
    let app = test_app().await;
    let router = create_router(app.state.clone());

    let (status, job) = send(&router, "POST", "/api/jobs", Some(BOB), Some(create_body(1.0))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(job["status"], "pending");
    assert!(job.get("jobPrivateKey").is_none_or(Value::is_null));
    assert!(job.get("secrets").is_none_or(Value::is_null));
    let job_id = job["jobId"].as_str().unwrap().to_string();

    let (status, fetched) = send(
        &router,
        "GET",
        &format!("/api/jobs/{}", job_id),
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["jobId"], job_id.as_str());
    assert!(fetched.get("jobPrivateKey").is_none_or(Value::is_null));

    let (status, found) = send(
        &router,
        "POST",
        "/api/jobs/find",
        None,
        Some(json!({ "serviceName": SERVICE, "jobDefinition": definition("ms5", 1.0) })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(found["found"], true);
    assert_eq!(found["job"]["jobId"], job_id.as_str());
    assert!(found["job"].get("jobPrivateKey").is_none_or(Value::is_null));
    assert!(found["job"].get("secrets").is_none_or(Value::is_null));

    let (status, listed) = send(
        &router,
        "POST",
        "/api/jobs/query",
        None,
        Some(json!({ "serviceName": SERVICE })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let jobs = listed["jobs"].as_array().unwrap();
    assert_eq!(jobs.len(), 1);
    for listed_job in jobs {
        assert!(listed_job.get("jobPrivateKey").is_none_or(Value::is_null));
        assert!(listed_job.get("secrets").is_none_or(Value::is_null));
    }

    // an identical request reuses the stored job
    let (status, reused) = send(
        &router,
        "POST",
        "/api/jobs",
        Some(BOB),
        Some(create_body(1.0)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(reused["jobId"], job_id.as_str());
    assert!(reused.get("jobPrivateKey").is_none_or(Value::is_null));
    assert!(reused.get("secrets").is_none_or(Value::is_null));
}

#[tokio::test]
async fn test_error_bodies_carry_kind() {
    let app = test_app().await;
    let router = create_router(app.state.clone());

    let (status, body) = send(&router, "POST", "/api/jobs", None, Some(create_body(1.0))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["kind"], "unauthorized");
    assert!(body["error"].is_string());

    let (status, body) = send(&router, "GET", "/api/jobs/nope", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["kind"], "not_found");

    let mut invalid = create_body(1.0);
    invalid["jobDefinition"]["appName"] = json!("");
    let (status, body) = send(&router, "POST", "/api/jobs", Some(BOB), Some(invalid)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "invalid_request");

    let (status, body) = send(&router, "POST", "/api/jobs/query", None, Some(json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "invalid_request");
}

#[tokio::test]
async fn test_compute_client_flow_over_http() {
    let app = test_app().await;
    let router = create_router(app.state.clone());

    let (status, registered) = send(
        &router,
        "POST",
        "/api/compute-clients",
        Some(CAROL),
        Some(json!({
            "computeClientName": "gpu-box",
            "serviceNames": [SERVICE],
            "computeSlots": [serde_json::to_value(slot(8, 16.0, 2)).unwrap()]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let client_id = registered["computeClientId"].as_str().unwrap().to_string();
    let client_key = registered["computeClientPrivateKey"].as_str().unwrap().to_string();

    let (_, job) = send(&router, "POST", "/api/jobs", Some(BOB), Some(create_body(2.0))).await;
    let job_id = job["jobId"].as_str().unwrap().to_string();

    let (status, polled) = send(
        &router,
        "POST",
        &format!("/api/compute-clients/{}/runnable-jobs", client_id),
        Some(&client_key),
        Some(json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let offered = &polled["runnableJobs"][0];
    assert_eq!(offered["jobId"], job_id.as_str());
    assert!(offered.get("secrets").is_none_or(Value::is_null));
    let job_key = offered["jobPrivateKey"].as_str().unwrap().to_string();

    let status_uri = format!("/api/jobs/{}/status", job_id);
    let claim = json!({ "status": "starting", "computeClientId": client_id });
    let (status, _) = send(&router, "POST", &status_uri, Some(&job_key), Some(claim.clone())).await;
    assert_eq!(status, StatusCode::OK);

    // a second claim conflicts
    let (status, body) = send(&router, "POST", &status_uri, Some(&job_key), Some(claim)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["kind"], "invalid_state");

    let (status, fetched) = send(
        &router,
        "GET",
        &format!("/api/jobs/{}?includePrivateKey=true&computeClientId={}", job_id, client_id),
        Some(&client_key),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["jobPrivateKey"], job_key.as_str());

    let (status, shown) = send(
        &router,
        "GET",
        &format!("/api/compute-clients/{}", client_id),
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(shown["computeClientName"], "gpu-box");
    assert!(shown.get("computeClientPrivateKey").is_none_or(Value::is_null));

    let (status, _) = send(
        &router,
        "DELETE",
        &format!("/api/compute-clients/{}", client_id),
        Some(BOB),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = send(
        &router,
        "DELETE",
        &format!("/api/compute-clients/{}", client_id),
        Some(CAROL),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_bearer_colon_form_and_ping() {
    let app = test_app().await;
    let router = create_router(app.state.clone());

    let request = Request::builder()
        .method("POST")
        .uri(format!("/api/services/{}/ping", SERVICE))
        .header(header::AUTHORIZATION, format!("Bearer: {}", DAVE))
        .body(Body::empty())
        .unwrap();
    let response = router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        app.notifier.events(),
        vec![dendro_core::event::JobEvent::PingComputeClients {
            service_name: SERVICE.to_string()
        }]
    );

    let (status, _) = send(
        &router,
        "POST",
        &format!("/api/services/{}/ping", SERVICE),
        Some(BOB),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_cancel_and_delete_over_http() {
    let app = test_app().await;
    let router = create_router(app.state.clone());

    let (_, job) = send(&router, "POST", "/api/jobs", Some(BOB), Some(create_body(3.0))).await;
    let job_id = job["jobId"].as_str().unwrap().to_string();

    let (status, ack) = send(
        &router,
        "POST",
        &format!("/api/jobs/{}/cancel", job_id),
        Some(BOB),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ack["success"], true);

    let (status, deleted) = send(
        &router,
        "POST",
        "/api/jobs/delete",
        Some(BOB),
        Some(json!({ "jobIds": [job_id] })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(deleted["deletedCount"], 1);
    assert_eq!(deleted["archivedCount"], 0);

    let (status, body) = send(
        &router,
        "POST",
        "/api/jobs/delete",
        Some(BOB),
        Some(json!({ "jobIds": [] })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "invalid_request");
}
