//! Runs the real HTTP session against a small in-process NiFi look-alike.

use axum::{
    extract::{
        Path,
        Query,
        State,
    },
    http::{
        header::AUTHORIZATION,
        HeaderMap,
        StatusCode,
    },
    routing::{
        get,
        post,
    },
    Form,
    Json,
    Router,
};
use chrono::{
    TimeZone,
    Utc,
};
use nifi_usage_gatherer::{
    ActivityTier,
    Completeness,
    CountValue,
    Credentials,
    GroupTarget,
    NifiError,
    ProcessorEnumerator,
    ProvenanceCounter,
    ProvenanceOptions,
    Session,
    SessionOptions,
    StatusCounter,
    TimeWindow,
    UsageOrchestrator,
};
use pretty_assertions::assert_eq;
use serde_json::{
    json,
    Value,
};
use std::{
    collections::HashMap,
    sync::{
        Arc,
        Mutex,
    },
    time::Duration,
};

const TOKEN: &str = "eyJ0ZXN0IjoidG9rZW4ifQ";
/// `admin:secret`
const BASIC: &str = "Basic YWRtaW46c2VjcmV0";

#[derive(Default)]
struct MockNifi {
    /// Answer the token endpoint with 404, as servers without login providers do.
    token_unsupported: bool,
    status_queries: Mutex<Vec<HashMap<String, String>>>,
    provenance_requests: Mutex<Vec<Value>>,
    polls: Mutex<u32>,
    deleted: Mutex<Vec<String>>,
}

type Shared = Arc<MockNifi>;

fn authorized(state: &MockNifi, headers: &HeaderMap) -> Result<(), StatusCode> {
    let expected = if state.token_unsupported {
        BASIC.to_string()
    } else {
        format!("Bearer {TOKEN}")
    };
    match headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok()) {
        Some(value) if value == expected => Ok(()),
        _ => Err(StatusCode::UNAUTHORIZED),
    }
}

async fn token(State(state): State<Shared>, Form(form): Form<HashMap<String, String>>) -> (StatusCode, String) {
    if state.token_unsupported {
        return (StatusCode::NOT_FOUND, String::new());
    }
    match (form.get("username").map(String::as_str), form.get("password").map(String::as_str)) {
        (Some("admin"), Some("secret")) => (StatusCode::CREATED, TOKEN.to_string()),
        _ => (StatusCode::BAD_REQUEST, "The supplied username and password are not valid.".to_string()),
    }
}

async fn flow(State(state): State<Shared>, headers: HeaderMap, Path(id): Path<String>) -> Result<Json<Value>, StatusCode> {
    authorized(&state, &headers)?;
    let body = match id.as_str() {
        "root" | "pg-root" => json!({
            "processGroupFlow": {
                "id": "pg-root",
                "flow": {
                    "processors": [{
                        "id": "p-idle",
                        "component": {
                            "name": "Archive",
                            "type": "org.apache.nifi.processors.standard.PutFile",
                            "parentGroupId": "pg-root"
                        }
                    }],
                    "processGroups": [{
                        "id": "pg-child",
                        "component": { "id": "pg-child", "name": "Orders" }
                    }]
                }
            }
        }),
        "pg-child" => json!({
            "processGroupFlow": {
                "id": "pg-child",
                "flow": {
                    "processors": [
                        {
                            "id": "p-busy",
                            "component": {
                                "name": "Fetch orders",
                                "type": "org.apache.nifi.processors.standard.FetchFile",
                                "parentGroupId": "pg-child"
                            }
                        },
                        {
                            "id": "p-rare",
                            "component": {
                                "name": "Alert",
                                "type": "org.apache.nifi.processors.standard.LogMessage",
                                "parentGroupId": "pg-child"
                            }
                        }
                    ],
                    "processGroups": []
                }
            }
        }),
        _ => return Err(StatusCode::NOT_FOUND),
    };
    Ok(Json(body))
}

async fn status(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Query(query): Query<HashMap<String, String>>,
) -> Result<Json<Value>, StatusCode> {
    authorized(&state, &headers)?;
    state.status_queries.lock().unwrap().push(query);
    let snapshots = match id.as_str() {
        "pg-root" => json!([
            { "id": "p-idle", "processorStatusSnapshot": { "id": "p-idle", "name": "Archive", "invocations": 0 } }
        ]),
        "pg-child" => json!([
            { "id": "p-busy", "processorStatusSnapshot": { "id": "p-busy", "name": "Fetch orders", "invocations": 1250 } },
            { "id": "p-rare", "processorStatusSnapshot": { "id": "p-rare", "name": "Alert", "invocations": 5 } }
        ]),
        _ => return Err(StatusCode::NOT_FOUND),
    };
    Ok(Json(json!({
        "processGroupStatus": {
            "id": id,
            "aggregateSnapshot": { "processorStatusSnapshots": snapshots }
        }
    })))
}

async fn submit(State(state): State<Shared>, headers: HeaderMap, Json(body): Json<Value>) -> Result<Json<Value>, StatusCode> {
    authorized(&state, &headers)?;
    let component = body["provenance"]["request"]["componentId"]
        .as_str()
        .ok_or(StatusCode::BAD_REQUEST)?
        .to_string();
    state.provenance_requests.lock().unwrap().push(body);
    Ok(Json(json!({
        "provenance": { "id": format!("q-{component}"), "finished": false, "percentCompleted": 0 }
    })))
}

async fn poll(State(state): State<Shared>, headers: HeaderMap, Path(id): Path<String>) -> Result<Json<Value>, StatusCode> {
    authorized(&state, &headers)?;
    *state.polls.lock().unwrap() += 1;
    let total = match id.as_str() {
        "q-p-idle" => 0,
        "q-p-rare" => 5,
        "q-p-busy" => 1250,
        _ => return Err(StatusCode::NOT_FOUND),
    };
    Ok(Json(json!({
        "provenance": {
            "id": id,
            "finished": true,
            "percentCompleted": 100,
            "results": { "totalCount": total, "provenanceEvents": [] }
        }
    })))
}

async fn discard(State(state): State<Shared>, headers: HeaderMap, Path(id): Path<String>) -> Result<StatusCode, StatusCode> {
    authorized(&state, &headers)?;
    state.deleted.lock().unwrap().push(id);
    Ok(StatusCode::OK)
}

async fn serve(state: Shared) -> String {
    let app = Router::new()
        .route("/nifi-api/access/token", post(token))
        .route("/nifi-api/flow/process-groups/{id}", get(flow))
        .route("/nifi-api/flow/process-groups/{id}/status", get(status))
        .route("/nifi-api/provenance", post(submit))
        .route("/nifi-api/provenance/{id}", get(poll).delete(discard))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}/")
}

fn credentials() -> Credentials {
    Credentials::new("admin", "secret")
}

#[tokio::test]
async fn cumulative_counts_through_a_token_session() {
    let state = Arc::new(MockNifi::default());
    let url = serve(state.clone()).await;

    let session = Session::open(&url, &credentials(), &SessionOptions::default()).await.unwrap();
    assert!(session.uses_token());
    assert!(session.api_url().as_str().ends_with("/nifi-api"));

    let retriever = StatusCounter::new();
    let report = UsageOrchestrator::new(&session, &retriever)
        .analyze_group(&GroupTarget::unlabeled("root"))
        .await
        .unwrap();

    assert_eq!(report.group_id, "pg-root");
    let rows: Vec<(&str, &str, Option<u64>, Option<ActivityTier>)> = report
        .rows
        .iter()
        .map(|r| (r.name.as_str(), r.processor_type.as_str(), r.count.count(), r.tier))
        .collect();
    assert_eq!(
        rows,
        vec![
            ("Fetch orders", "FetchFile", Some(1250), Some(ActivityTier::Active)),
            ("Alert", "LogMessage", Some(5), Some(ActivityTier::Low)),
            ("Archive", "PutFile", Some(0), Some(ActivityTier::Unused)),
        ]
    );

    let queries = state.status_queries.lock().unwrap();
    assert_eq!(queries.len(), 2);
    assert!(queries.iter().all(|q| q.get("recursive").map(String::as_str) == Some("false")));
}

#[tokio::test]
async fn windowed_counts_submit_poll_and_clean_up() {
    let state = Arc::new(MockNifi::default());
    let url = serve(state.clone()).await;
    let session = Session::open(&url, &credentials(), &SessionOptions::default()).await.unwrap();

    let window = TimeWindow::last_days(Utc.with_ymd_and_hms(2025, 3, 31, 0, 0, 0).unwrap(), 30);
    let retriever = ProvenanceCounter::new(ProvenanceOptions {
        max_results: 5000,
        poll_interval: Duration::from_millis(10),
        query_timeout: Duration::from_secs(10),
        ..ProvenanceOptions::new(window)
    });
    let report = UsageOrchestrator::new(&session, &retriever)
        .analyze_group(&GroupTarget::new("pg-child", "orders"))
        .await
        .unwrap();

    assert_eq!(report.rows.len(), 2);
    assert_eq!(report.rows[0].count, CountValue::known(1250));
    assert_eq!(report.rows[0].completeness, Some(Completeness::Complete));
    assert_eq!(format!("{:.1}", report.rows[0].events_per_day.unwrap()), "41.7");

    let requests = state.provenance_requests.lock().unwrap();
    let request = requests
        .iter()
        .find(|r| r["provenance"]["request"]["componentId"] == "p-busy")
        .unwrap();
    assert_eq!(
        request["provenance"]["request"],
        json!({
            "maxResults": 5000,
            "startDate": "03/01/2025 00:00:00 UTC",
            "endDate": "03/31/2025 00:00:00 UTC",
            "componentId": "p-busy"
        })
    );

    let mut deleted = state.deleted.lock().unwrap().clone();
    deleted.sort();
    assert_eq!(deleted, vec!["q-p-busy", "q-p-rare"]);
    assert_eq!(*state.polls.lock().unwrap(), 2);
}

#[tokio::test]
async fn default_cap_marks_busy_processors_as_lower_bounds() {
    let url = serve(Arc::new(MockNifi::default())).await;
    let session = Session::open(&url, &credentials(), &SessionOptions::default()).await.unwrap();

    let window = TimeWindow::last_days(Utc.with_ymd_and_hms(2025, 3, 31, 0, 0, 0).unwrap(), 30);
    let retriever = ProvenanceCounter::new(ProvenanceOptions {
        poll_interval: Duration::from_millis(10),
        ..ProvenanceOptions::new(window)
    });
    let report = UsageOrchestrator::new(&session, &retriever)
        .analyze_group(&GroupTarget::new("pg-child", "orders"))
        .await
        .unwrap();

    let busy = report.rows.iter().find(|r| r.processor_id == "p-busy").unwrap();
    assert_eq!(busy.count, CountValue::known(1000));
    assert_eq!(busy.completeness, Some(Completeness::Capped));
    let rare = report.rows.iter().find(|r| r.processor_id == "p-rare").unwrap();
    assert_eq!(rare.count, CountValue::known(5));
    assert_eq!(rare.completeness, Some(Completeness::Complete));
}

#[tokio::test]
async fn falls_back_to_basic_credentials() {
    let state = Arc::new(MockNifi {
        token_unsupported: true,
        ..MockNifi::default()
    });
    let url = serve(state).await;

    let session = Session::open(&url, &credentials(), &SessionOptions::default()).await.unwrap();
    assert!(!session.uses_token());

    let processors = ProcessorEnumerator::new(&session).list_processors("root").await.unwrap();
    assert_eq!(processors.len(), 3);
}

#[tokio::test]
async fn rejected_credentials_are_an_authentication_error() {
    let url = serve(Arc::new(MockNifi::default())).await;
    let err = Session::open(&url, &Credentials::new("admin", "wrong"), &SessionOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, NifiError::Authentication { status, .. } if status == StatusCode::BAD_REQUEST));
    assert!(err.is_fatal_for_run());
}

#[tokio::test]
async fn unknown_group_is_reported_as_missing() {
    let url = serve(Arc::new(MockNifi::default())).await;
    let session = Session::open(&url, &credentials(), &SessionOptions::default()).await.unwrap();

    let err = ProcessorEnumerator::new(&session)
        .list_processors("does-not-exist")
        .await
        .unwrap_err();
    assert!(matches!(err, NifiError::GroupNotFound(id) if id == "does-not-exist"));
}

#[tokio::test]
async fn unreachable_server_is_a_connectivity_error() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let err = Session::open(&format!("http://{addr}"), &credentials(), &SessionOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, NifiError::Connectivity { .. }));
}

#[tokio::test]
async fn tls_words_in_the_url_do_not_make_a_tls_error() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let err = Session::open(
        &format!("http://{addr}/ssl-proxy/tls-certificate"),
        &credentials(),
        &SessionOptions::default(),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, NifiError::Connectivity { .. }), "{err:?}");
    assert!(!err.is_fatal_for_run());
}
