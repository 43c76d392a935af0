#![allow(dead_code)]

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use empowernet_core::analyzer::{AnalysisOutcome, Analyzer, AnalyzerSet};
use empowernet_core::api::{self, AppState};
use empowernet_core::config::{LedgerBackend, LedgerConfig};
use empowernet_core::error::ScanError;
use empowernet_core::evidence::{InferenceResult, Modality};
use empowernet_core::fixture::FixtureOverride;
use empowernet_core::ledger::LedgerClient;
use empowernet_core::orchestrator::ScanOrchestrator;
use serde_json::{json, Map, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tower::util::ServiceExt;

/// 固定输出的分析器，记录被调用的次数
pub struct ScriptedAnalyzer {
    payload: Value,
    calls: AtomicUsize,
}

impl ScriptedAnalyzer {
    pub fn new(payload: Value) -> Arc<Self> {
        Arc::new(Self {
            payload,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Analyzer for ScriptedAnalyzer {
    async fn analyze(&self, _content: &str) -> Result<AnalysisOutcome, ScanError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        AnalysisOutcome::from_payload(Modality::Text, self.payload.clone())
    }
}

pub fn scam_payload() -> Value {
    json!({
        "category": "SCAM",
        "confidence": 0.87,
        "riskScore": 91,
        "explanation": [
            "Urgent payment request",
            "Impersonates a bank",
            "Contains a shortened link",
            "Sent outside business hours"
        ],
        "userSummary": {"verdict": "SCAM DETECTED", "reason": "Payment pressure", "triggers": ["Urgency"]}
    })
}

pub fn sample_result() -> InferenceResult {
    serde_json::from_value(scam_payload()).expect("sample payload")
}

pub struct Harness {
    pub app: axum::Router,
    pub analyzers: Vec<(Modality, Arc<ScriptedAnalyzer>)>,
}

impl Harness {
    pub fn analyzer(&self, modality: Modality) -> &Arc<ScriptedAnalyzer> {
        &self
            .analyzers
            .iter()
            .find(|(m, _)| *m == modality)
            .expect("analyzer registered")
            .1
    }

    pub fn total_calls(&self) -> usize {
        self.analyzers.iter().map(|(_, a)| a.calls()).sum()
    }
}

pub async fn memory_ledger() -> LedgerClient {
    LedgerClient::initialize(&LedgerConfig {
        backend: LedgerBackend::Memory,
        network_name: "Local Registry".to_string(),
        ..LedgerConfig::default()
    })
    .await
}

pub async fn disabled_ledger() -> LedgerClient {
    LedgerClient::initialize(&LedgerConfig::default()).await
}

/// 每种模态都注册同一份输出
pub fn harness(ledger: LedgerClient, payload: Value) -> Harness {
    let mut set = AnalyzerSet::new();
    let mut analyzers = Vec::new();
    for modality in Modality::ALL {
        let analyzer = ScriptedAnalyzer::new(payload.clone());
        set = set.with(modality, analyzer.clone());
        analyzers.push((modality, analyzer));
    }

    let state = Arc::new(AppState {
        orchestrator: ScanOrchestrator::new(set, ledger, FixtureOverride::demo()),
    });
    Harness {
        app: api::app(state, &[]),
        analyzers,
    }
}

pub async fn post_json(app: axum::Router, path: &str, body: &Value) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri(path)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(body).expect("serialize")))
        .expect("build request");
    send(app, request).await
}

pub async fn get_json(app: axum::Router, path: &str) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("GET")
        .uri(path)
        .body(Body::empty())
        .expect("build request");
    send(app, request).await
}

pub async fn send(app: axum::Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.expect("response");
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body");
    let payload: Value = serde_json::from_slice(&body).expect("parse body");
    (status, payload)
}

pub fn object(value: &Value) -> &Map<String, Value> {
    value.as_object().expect("json object")
}
