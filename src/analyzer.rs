use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;

use crate::config::InferenceConfig;
use crate::error::ScanError;
use crate::evidence::{InferenceResult, Modality};

/// 分析器的输出：要么是完整的推理结果，要么是分析器自己报告的错误（原样返回给调用方）
#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisOutcome {
    Completed(InferenceResult),
    Failed(Map<String, Value>),
}

impl AnalysisOutcome {
    /// 按分析器的约定解释一个 JSON 对象：带 `error` 键即视为失败
    pub fn from_payload(modality: Modality, payload: Value) -> Result<Self, ScanError> {
        let Value::Object(map) = payload else {
            return Err(ScanError::MalformedResult {
                modality: modality.to_string(),
                reason: "expected a JSON object".to_string(),
            });
        };
        if map.contains_key("error") {
            return Ok(AnalysisOutcome::Failed(map));
        }
        serde_json::from_value(Value::Object(map))
            .map(AnalysisOutcome::Completed)
            .map_err(|e| ScanError::MalformedResult {
                modality: modality.to_string(),
                reason: e.to_string(),
            })
    }
}

/// 单一模态的分析器：`analyze(content) -> InferenceResult`
#[async_trait]
pub trait Analyzer: Send + Sync {
    async fn analyze(&self, content: &str) -> Result<AnalysisOutcome, ScanError>;
}

/// 通过 HTTP 把内容转发给外部推理服务：`POST {base_url}/{modality}`
pub struct HttpAnalyzer {
    client: Client,
    modality: Modality,
    endpoint: String,
}

#[derive(Serialize)]
struct AnalyzeRequest<'a> {
    content: &'a str,
}

impl HttpAnalyzer {
    pub fn new(client: Client, base_url: &str, modality: Modality) -> Self {
        Self {
            client,
            modality,
            endpoint: format!("{}/{}", base_url.trim_end_matches('/'), modality.as_str()),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn unavailable(&self, reason: String) -> ScanError {
        ScanError::AnalyzerUnavailable {
            modality: self.modality.to_string(),
            reason,
        }
    }
}

#[async_trait]
impl Analyzer for HttpAnalyzer {
    async fn analyze(&self, content: &str) -> Result<AnalysisOutcome, ScanError> {
        let resp = self
            .client
            .post(&self.endpoint)
            .json(&AnalyzeRequest { content })
            .send()
            .await
            .map_err(|e| self.unavailable(format!("request failed: {e}")))?;

        let status = resp.status();
        let payload = resp
            .json::<Value>()
            .await
            .map_err(|e| self.unavailable(format!("unreadable response ({status}): {e}")))?;

        // 非 2xx 但带了 `error` 的响应按分析器报错处理
        if !status.is_success() && payload.get("error").is_none() {
            return Err(self.unavailable(format!("returned non-success status: {status}")));
        }
        AnalysisOutcome::from_payload(self.modality, payload)
    }
}

/// 四种模态各自的分析器
#[derive(Clone, Default)]
pub struct AnalyzerSet {
    analyzers: HashMap<Modality, Arc<dyn Analyzer>>,
}

impl AnalyzerSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, modality: Modality, analyzer: Arc<dyn Analyzer>) -> Self {
        self.analyzers.insert(modality, analyzer);
        self
    }

    /// 每种模态都指向同一推理服务下的对应路径
    pub fn over_http(config: &InferenceConfig) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| anyhow::anyhow!("failed to build http client: {e}"))?;

        Ok(Modality::ALL.into_iter().fold(Self::new(), |set, modality| {
            set.with(
                modality,
                Arc::new(HttpAnalyzer::new(client.clone(), &config.base_url, modality)),
            )
        }))
    }

    pub fn get(&self, modality: Modality) -> Option<&Arc<dyn Analyzer>> {
        self.analyzers.get(&modality)
    }
}
