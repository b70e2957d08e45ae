//! Verify request building and response classification against JSON test
//! vectors stored in `test-vectors/`.
//!
//! Comparing parsed JSON (not raw strings) avoids false negatives from
//! field-ordering differences.

use serde_json::Value;
use tracker_core::http::{build_request, classify_response};
use tracker_core::{operations, Args, Error, HttpMethod, HttpResponse, Overrides, Settings};

const BASE_URL: &str = "http://localhost:3000";

fn settings() -> Settings {
    let overrides = Overrides {
        base_url: Some(BASE_URL.to_string()),
        ..Overrides::api_key("vector-key")
    };
    Settings::resolve(None, |_| None, overrides).unwrap()
}

fn parse_method(s: &str) -> HttpMethod {
    match s {
        "GET" => HttpMethod::Get,
        "POST" => HttpMethod::Post,
        other => panic!("unknown method: {other}"),
    }
}

fn pairs(value: &Value) -> Vec<(String, String)> {
    value
        .as_array()
        .unwrap()
        .iter()
        .map(|pair| {
            let arr = pair.as_array().unwrap();
            (arr[0].as_str().unwrap().to_string(), arr[1].as_str().unwrap().to_string())
        })
        .collect()
}

fn args_of(value: &Value) -> Args {
    value
        .as_object()
        .unwrap()
        .iter()
        .fold(Args::new(), |args, (k, v)| args.with(k.as_str(), v.clone()))
}

fn load(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap()
}

// ---------------------------------------------------------------------------
// Operations
// ---------------------------------------------------------------------------

#[test]
fn operation_test_vectors() {
    let vectors = load(include_str!("../../test-vectors/operations.json"));
    let settings = settings();

    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let op = operations::find(case["operation"].as_str().unwrap()).unwrap();
        let expected = &case["expected_request"];

        let descriptor = op.descriptor(&args_of(&case["args"])).unwrap();
        let req = build_request(&settings, &descriptor).unwrap();

        assert_eq!(req.method, parse_method(expected["method"].as_str().unwrap()), "{name}: method");
        assert_eq!(req.url, format!("{BASE_URL}{}", expected["path"].as_str().unwrap()), "{name}: url");
        assert_eq!(req.query, pairs(&expected["query"]), "{name}: query");

        let body: Value = match req.body.as_deref() {
            Some(raw) => serde_json::from_str(raw).unwrap(),
            None => Value::Null,
        };
        assert_eq!(body, expected["body"], "{name}: body");
    }
}

#[test]
fn invalid_operation_vectors() {
    let vectors = load(include_str!("../../test-vectors/operations.json"));

    for case in vectors["invalid"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let op = operations::find(case["operation"].as_str().unwrap()).unwrap();

        let err = op.descriptor(&args_of(&case["args"])).unwrap_err();
        assert!(matches!(err, Error::Validation(_)), "{name}: {err:?}");
    }
}

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

#[test]
fn classify_test_vectors() {
    let vectors = load(include_str!("../../test-vectors/classify.json"));

    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let resp = &case["response"];
        let expected = &case["expected"];

        let response = HttpResponse {
            status: resp["status"].as_u64().unwrap() as u16,
            headers: pairs(&resp["headers"]),
            body: resp["body"].as_str().unwrap().to_string(),
        };
        let outcome = classify_response(response);

        match expected["kind"].as_str().unwrap() {
            "ok" => assert_eq!(outcome.unwrap(), expected["value"], "{name}"),
            "authentication" => {
                let err = outcome.unwrap_err();
                assert!(matches!(err, Error::Authentication(_)), "{name}: {err:?}");
                assert_eq!(err.status(), Some(401), "{name}");
            }
            "rate_limit" => {
                let err = outcome.unwrap_err();
                assert_eq!(err.status(), Some(429), "{name}");
                assert_eq!(err.retry_after(), expected["retry_after"].as_u64(), "{name}");
            }
            "api" => match outcome.unwrap_err() {
                Error::Api { status, body, .. } => {
                    assert_eq!(status.map(u64::from), expected["status"].as_u64(), "{name}: status");
                    assert_eq!(body.as_ref(), Some(&expected["body"]), "{name}: body");
                }
                other => panic!("{name}: unexpected {other:?}"),
            },
            other => panic!("{name}: unknown kind {other}"),
        }
    }
}
