mod common;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use common::{memory_storage, registry_with, FakeSession};
use roomflow::runtime::{CapturedOutput, OutputSink, RunnerDeps};
use roomflow::server::assemble;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

async fn app() -> (Router, Arc<FakeSession>, CapturedOutput) {
    let session = Arc::new(FakeSession::named("main"));
    let (sink, captured) = OutputSink::capture();
    let deps = RunnerDeps::new(registry_with(Arc::clone(&session)), reqwest::Client::new()).with_output(sink);
    let (router, _state) = assemble(memory_storage().await, deps).await.unwrap();
    (router, session, captured)
}

async fn call(app: &Router, method: &str, uri: &str, body: Option<&str>) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(body.map(|b| Body::from(b.to_string())).unwrap_or_else(Body::empty))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

async fn create(app: &Router, definition: Value) {
    let (status, _) = call(app, "POST", "/api/workflows", Some(&definition.to_string())).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn health_check_answers() {
    let (app, _, _) = app().await;
    let response = app
        .oneshot(Request::builder().uri("/healthz").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&bytes[..], b"ok");
}

#[tokio::test]
async fn workflow_crud_round_trip() {
    let (app, _, _) = app().await;
    let definition = json!({
        "workflow": { "id": "wf-echo", "name": "Echo", "trigger": { "type": "command", "name": "echo" } },
        "steps": [
            { "id": "post", "variety": "postMatrixMessage", "sort_order": 2 },
            { "id": "print", "variety": "stdOut", "sort_order": 1 }
        ]
    });
    create(&app, definition.clone()).await;

    let (status, _) = call(&app, "POST", "/api/workflows", Some(&definition.to_string())).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, listing) = call(&app, "GET", "/api/workflows", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listing["workflows"][0]["id"], "wf-echo");

    let (status, fetched) = call(&app, "GET", "/api/workflows/wf-echo", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["workflow"]["trigger"]["type"], "command");
    let step_ids: Vec<&str> = fetched["steps"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["id"].as_str().unwrap())
        .collect();
    assert_eq!(step_ids, vec!["print", "post"]);

    let update = json!({
        "workflow": { "id": "ignored", "name": "Echo v2", "trigger": { "type": "command", "name": "echo" } },
        "steps": [ { "id": "print", "variety": "stdOut" } ]
    });
    let (status, _) = call(&app, "PUT", "/api/workflows/wf-echo", Some(&update.to_string())).await;
    assert_eq!(status, StatusCode::OK);

    let (_, fetched) = call(&app, "GET", "/api/workflows/wf-echo", None).await;
    assert_eq!(fetched["workflow"]["name"], "Echo v2");
    assert_eq!(fetched["steps"].as_array().unwrap().len(), 1);

    let (status, _) = call(&app, "DELETE", "/api/workflows/wf-echo", None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = call(&app, "GET", "/api/workflows/wf-echo", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = call(&app, "DELETE", "/api/workflows/wf-echo", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn blank_names_are_rejected() {
    let (app, _, _) = app().await;
    let definition = json!({ "workflow": { "id": "wf", "name": " ", "trigger": { "type": "manual" } } });
    let (status, _) = call(&app, "POST", "/api/workflows", Some(&definition.to_string())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn invalid_poll_schedules_leave_nothing_behind() {
    let (app, _, _) = app().await;
    let poll = |schedule: &str| {
        json!({
            "workflow": {
                "id": "wf-feed",
                "name": "Feed",
                "trigger": { "type": "poll", "schedule": schedule, "url": "http://feed.local/items" }
            },
            "steps": [ { "id": "print", "variety": "stdOut" } ]
        })
        .to_string()
    };

    let (status, _) = call(&app, "POST", "/api/workflows", Some(&poll("not a cron"))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = call(&app, "GET", "/api/workflows/wf-feed", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = call(&app, "POST", "/api/workflows", Some(&poll("0 */5 * * * *"))).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = call(&app, "PUT", "/api/workflows/wf-feed", Some(&poll("not a cron either"))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (_, fetched) = call(&app, "GET", "/api/workflows/wf-feed", None).await;
    assert_eq!(fetched["workflow"]["trigger"]["schedule"], "0 */5 * * * *");
}

#[tokio::test]
async fn manual_runs_return_reports() {
    let (app, _, captured) = app().await;
    create(
        &app,
        json!({
            "workflow": { "id": "wf-manual", "name": "Manual", "trigger": { "type": "manual" } },
            "steps": [ { "id": "print", "variety": "stdOut" } ]
        }),
    )
    .await;

    let (status, body) = call(&app, "POST", "/api/workflows/wf-manual/run", Some(r#"{"message":"by hand"}"#)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["runs"][0]["workflow_id"], "wf-manual");
    assert_eq!(body["runs"][0]["report"]["steps"][0]["status"]["status"], "succeeded");
    assert_eq!(body["runs"][0]["report"]["payload"]["message"], "by hand");
    assert_eq!(captured.contents(), ">>by hand\n");

    let (status, _) = call(&app, "POST", "/api/workflows/wf-manual/run", Some("{not json")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = call(&app, "POST", "/api/workflows/wf-missing/run", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn webhooks_fire_bound_workflows() {
    let (app, _, captured) = app().await;
    create(
        &app,
        json!({
            "workflow": { "id": "wf-hook", "name": "Hook", "trigger": { "type": "webhook", "path": "hooks/deploy" } },
            "steps": [ { "id": "print", "variety": "stdOut" } ]
        }),
    )
    .await;
    create(
        &app,
        json!({
            "workflow": { "id": "wf-off", "name": "Off", "active": false, "trigger": { "type": "webhook", "path": "hooks/off" } },
            "steps": [ { "id": "print", "variety": "stdOut" } ]
        }),
    )
    .await;

    let (status, body) = call(&app, "POST", "/webhook/hooks/deploy", Some(r#"{"message":"shipped"}"#)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["runs"].as_array().unwrap().len(), 1);

    let (status, _) = call(&app, "GET", "/webhook/hooks/deploy", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(captured.contents(), ">>shipped\n[Empty line]\n");

    let (status, _) = call(&app, "POST", "/webhook/hooks/off", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = call(&app, "POST", "/webhook/unknown", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn chat_commands_dispatch_or_reply_with_hints() {
    let (app, session, _) = app().await;
    create(
        &app,
        json!({
            "workflow": { "id": "wf-echo", "name": "Echo", "trigger": { "type": "command", "name": "echo" } },
            "steps": [ { "id": "post", "variety": "postMatrixMessage" } ]
        }),
    )
    .await;

    let line = |body: &str| json!({ "room": "!lobby:example.org", "sender": "@ann:example.org", "body": body }).to_string();

    let (status, outcome) = call(&app, "POST", "/api/commands", Some(&line("!echo hello   all"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(outcome["outcome"], "dispatched");
    assert_eq!(outcome["runs"][0]["workflow_id"], "wf-echo");
    assert_eq!(
        session.sent(),
        vec![("!lobby:example.org".to_string(), "hello all".to_string())]
    );

    let (_, outcome) = call(&app, "POST", "/api/commands", Some(&line("!echo"))).await;
    assert_eq!(outcome["outcome"], "rejected");
    let hint = outcome["hint"].as_str().unwrap().to_string();
    assert_eq!(session.sent().last().cloned(), Some(("!lobby:example.org".to_string(), hint)));

    let (_, outcome) = call(&app, "POST", "/api/commands", Some(&line("good morning"))).await;
    assert_eq!(outcome["outcome"], "ignored");
    assert_eq!(session.sent().len(), 2);
}

#[tokio::test]
async fn bot_records_show_connection_state() {
    let (app, _, _) = app().await;
    for (id, primary) in [("main", true), ("spare", false)] {
        let bot = json!({
            "id": id,
            "display_name": id,
            "user_id": format!("@{id}:example.org"),
            "password": "hunter2",
            "primary": primary
        });
        let (status, _) = call(&app, "POST", "/api/bots", Some(&bot.to_string())).await;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, body) = call(&app, "GET", "/api/bots", None).await;
    assert_eq!(status, StatusCode::OK);
    let bots = body["bots"].as_array().unwrap();
    assert_eq!(bots.len(), 2);
    assert_eq!(bots[0]["id"], "main");
    assert_eq!(bots[0]["connected"], true);
    assert_eq!(bots[1]["connected"], false);
    assert!(bots.iter().all(|bot| bot.get("password").is_none()));

    let (status, _) = call(&app, "POST", "/api/bots", Some(r#"{"id":"","display_name":"x","user_id":""}"#)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
