//! In-process stand-in for the Auth0 Signals API.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};

pub const VENDOR_KEY: &str = "signals-api-key";
pub const REJECTED_KEY: &str = "revoked-key";

/// One request received by the fake vendor.
#[derive(Debug, Clone)]
pub struct Hit {
    /// Path with the captured segments decoded.
    pub path: String,
    /// Path exactly as it arrived on the wire.
    pub raw_path: String,
    pub query: Option<String>,
    pub token: Option<String>,
    pub user_agent: Option<String>,
    pub accept: Option<String>,
}

#[derive(Clone, Default)]
pub struct FakeVendor {
    hits: Arc<Mutex<Vec<Hit>>>,
}

impl FakeVendor {
    pub fn hits(&self) -> Vec<Hit> {
        self.hits.lock().unwrap().clone()
    }

    fn record(&self, path: String, uri: &Uri, headers: &HeaderMap) -> Option<String> {
        let header = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(String::from)
        };
        let token = header("x-auth-token");
        self.hits.lock().unwrap().push(Hit {
            path,
            raw_path: uri.path().to_string(),
            query: uri.query().map(String::from),
            token: token.clone(),
            user_agent: header("user-agent"),
            accept: header("accept"),
        });
        token
    }
}

/// Start the fake vendor and return it with its base URL.
pub async fn spawn_vendor() -> (FakeVendor, String) {
    let vendor = FakeVendor::default();
    let router = Router::new()
        .route("/ip", get(health))
        .route("/ip/:value", get(lookup))
        .route("/metadata/:kind/lists/:id", get(metadata))
        .with_state(vendor.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    (vendor, format!("http://{addr}/"))
}

fn unauthorized() -> Response {
    (StatusCode::UNAUTHORIZED, "Unauthorized. API Key not found.").into_response()
}

async fn health(State(vendor): State<FakeVendor>, uri: Uri, headers: HeaderMap) -> Response {
    if vendor.record("/ip".into(), &uri, &headers).as_deref() != Some(VENDOR_KEY) {
        return unauthorized();
    }
    Json(json!({"fullip": {"geo": {"country": "UA", "city": "Dnipro"}}})).into_response()
}

async fn lookup(
    State(vendor): State<FakeVendor>,
    Path(value): Path<String>,
    uri: Uri,
    headers: HeaderMap,
) -> Response {
    if vendor.record(format!("/ip/{value}"), &uri, &headers).as_deref() != Some(VENDOR_KEY) {
        return unauthorized();
    }

    match value.as_str() {
        "1.1.1.1" => Json(listed_record()).into_response(),
        "10.0.0.1" => Json(record(0, 0, 0, &[])).into_response(),
        "1.1.1.9" => Json(record(-7, 0, 0, &[])).into_response(),
        "1.1.1.7" => Json(json!({"fullip": {"hostname": "no-score.example"}})).into_response(),
        "1.1.1.8" => Json(json!({
            "fullip": {
                "score": -1,
                "badip": {"score": -1, "blacklists": null},
                "baddomain": {"score": 0, "domain": {"blacklist": "", "blacklist_mx": null}},
                "history": {"score": 0}
            }
        }))
        .into_response(),
        "bad-ip-format" => (StatusCode::BAD_REQUEST, "Bad IP format: bad-ip-format").into_response(),
        "1.1.1.3" => unauthorized(),
        "1.1.1.5" => (StatusCode::INTERNAL_SERVER_ERROR, "boom").into_response(),
        "1.1.1.6" => (StatusCode::OK, "not json").into_response(),
        _ => (StatusCode::NOT_FOUND, "Not found").into_response(),
    }
}

async fn metadata(
    State(vendor): State<FakeVendor>,
    Path((kind, id)): Path<(String, String)>,
    uri: Uri,
    headers: HeaderMap,
) -> Response {
    vendor.record(format!("/metadata/{kind}/lists/{id}"), &uri, &headers);

    match (kind.as_str(), id.as_str()) {
        ("badip", "UCEPROTECT-LEVEL1") => Json(json!({
            "source": "uceprotect.net",
            "site": "http://www.uceprotect.net/en/",
            "sensitivity": "5",
            "visibility": "Public",
            "name": "UCEPROTECT Level 1",
            "description": "Single IPs with spam traps hits",
            "tags": "spam,email"
        }))
        .into_response(),
        ("baddomain", "SPAMHAUS-DBL") => Json(json!({
            "source": "spamhaus.org",
            "site": "https://www.spamhaus.org/dbl/",
            "sensitivity": 1,
            "visibility": "Private",
            "name": "Spamhaus DBL",
            "description": "Domain block list",
            "tags": "spam"
        }))
        .into_response(),
        _ => (StatusCode::NOT_FOUND, "Not found").into_response(),
    }
}

fn record(score: i64, badip: i64, history: i64, lists: &[&str]) -> Value {
    json!({
        "fullip": {
            "hostname": "one.one.one.one",
            "baddomain": {
                "domain": {
                    "blacklist": [],
                    "blacklist_mx": [],
                    "blacklist_ns": [],
                    "score": 0
                },
                "ip": {"address": "1.1.1.1", "blacklist": "", "score": 0},
                "score": 0
            },
            "badip": {"score": badip, "blacklists": lists},
            "history": {
                "score": history,
                "activity": [{
                    "ip": "1.1.1.1",
                    "timestamp": 1537000113218u64,
                    "command": "rem",
                    "blacklists": "",
                    "blacklist_change": "UCEPROTECT-LEVEL1"
                }]
            },
            "score": score,
            "whois": {}
        }
    })
}

/// Suspicious IP listed on one blocklist.
fn listed_record() -> Value {
    record(-1, -1, -1, &["UCEPROTECT-LEVEL1"])
}
