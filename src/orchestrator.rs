use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{error, info, warn};

use crate::analyzer::{AnalysisOutcome, AnalyzerSet};
use crate::error::ScanError;
use crate::evidence::{EvidenceHash, InferenceResult, Modality};
use crate::fingerprint::compute_hash;
use crate::fixture::FixtureOverride;
use crate::ledger::{AnchorReceipt, LedgerClient, LedgerNetwork, VerificationRecord};

// ==========================================
// 1. 数据传输对象 (DTOs)
// ==========================================

// 请求：扫描一份内容
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScanRequest {
    #[serde(rename = "type", default)]
    pub scan_type: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub label: Option<String>,
}

// 请求：按哈希查询存证
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyRequest {
    #[serde(default)]
    pub evidence_hash: Option<String>,
}

/// 响应中的 `ledger` 块，按 `status` 区分三种情况
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum LedgerBlock {
    Confirmed(ConfirmedAnchor),
    Failed { error: String },
    Offline { network: String, reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmedAnchor {
    pub network: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub transaction_id: String,
    pub topic_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub consensus_timestamp: Option<String>,
    pub explorer_url: String,
    pub block_number: u64,
}

impl LedgerBlock {
    fn confirmed(network: &LedgerNetwork, receipt: AnchorReceipt) -> Self {
        let consensus_timestamp = receipt.timestamp.map(|ts| {
            i64::try_from(ts)
                .ok()
                .and_then(|secs| chrono::DateTime::from_timestamp(secs, 0))
                .map(|at| at.to_rfc3339())
                .unwrap_or_else(|| ts.to_string())
        });

        LedgerBlock::Confirmed(ConfirmedAnchor {
            network: network.name.clone(),
            kind: network.kind.clone(),
            explorer_url: network.explorer_link(&receipt.transaction_id),
            transaction_id: receipt.transaction_id,
            topic_id: receipt.registry,
            consensus_timestamp,
            block_number: receipt.block_number,
        })
    }
}

// 响应：推理结果 + 证据哈希 + 账本状态
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanResponse {
    #[serde(flatten)]
    pub result: InferenceResult,
    pub evidence_hash: EvidenceHash,
    pub ledger: LedgerBlock,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

impl ErrorBody {
    pub fn new(error: impl Into<String>) -> Self {
        Self { error: error.into() }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ScanReply {
    Scanned(Box<ScanResponse>),
    /// 分析器报告的错误，原样返回
    AnalyzerError(Map<String, Value>),
    Error(ErrorBody),
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum VerifyReply {
    Record(VerificationRecord),
    Error(ErrorBody),
}

// ==========================================
// 2. 编排器 (Scan Orchestrator)
// ==========================================

/// 分发 → 哈希 → 锚定
pub struct ScanOrchestrator {
    analyzers: AnalyzerSet,
    ledger: LedgerClient,
    fixture: FixtureOverride,
}

impl ScanOrchestrator {
    pub fn new(analyzers: AnalyzerSet, ledger: LedgerClient, fixture: FixtureOverride) -> Self {
        Self {
            analyzers,
            ledger,
            fixture,
        }
    }

    pub fn ledger(&self) -> &LedgerClient {
        &self.ledger
    }

    /// 流水线中的任何错误都在这里兜住，渲染为 `{"error": ...}`
    pub async fn scan(&self, req: ScanRequest) -> ScanReply {
        match self.run_pipeline(req).await {
            Ok(reply) => reply,
            Err(e) => {
                error!(error = %e, "scan pipeline failed");
                ScanReply::Error(ErrorBody::new(e.to_string()))
            }
        }
    }

    async fn run_pipeline(&self, req: ScanRequest) -> Result<ScanReply, ScanError> {
        let result = match self.fixture.intercept(req.label.as_deref(), req.content.as_deref()) {
            Some(canned) => {
                info!("demo fixture matched; analyzers bypassed");
                canned
            }
            None => {
                let modality = req
                    .scan_type
                    .as_deref()
                    .and_then(Modality::parse)
                    .ok_or(ScanError::UnsupportedType)?;
                let analyzer = self.analyzers.get(modality).ok_or_else(|| {
                    ScanError::AnalyzerUnavailable {
                        modality: modality.to_string(),
                        reason: "no analyzer registered".to_string(),
                    }
                })?;
                let content = req
                    .content
                    .as_deref()
                    .filter(|c| !c.is_empty())
                    .ok_or(ScanError::MissingField("content"))?;

                match analyzer.analyze(content).await? {
                    AnalysisOutcome::Completed(result) => result,
                    AnalysisOutcome::Failed(payload) => {
                        warn!(%modality, "analyzer reported an error; skipping anchoring");
                        return Ok(ScanReply::AnalyzerError(payload));
                    }
                }
            }
        };

        Ok(ScanReply::Scanned(Box::new(self.seal(result).await)))
    }

    /// 计算证据哈希并尝试上链；上链失败只影响 `ledger` 块
    async fn seal(&self, mut result: InferenceResult) -> ScanResponse {
        result.extra.remove("evidenceHash");
        result.extra.remove("ledger");

        let evidence_hash = compute_hash(&result);
        info!(%evidence_hash, category = %result.category, risk_score = %result.risk_score, "evidence hash generated");

        let ledger = match &self.ledger {
            LedgerClient::Disabled(reason) => LedgerBlock::Offline {
                network: "Digital Registry".to_string(),
                reason: reason.to_string(),
            },
            LedgerClient::Ready(ledger) => {
                let label = if result.category.is_empty() {
                    "Uncategorized"
                } else {
                    result.category.as_str()
                };
                match ledger.anchor(evidence_hash.as_str(), label).await {
                    Ok(receipt) => LedgerBlock::confirmed(ledger.network(), receipt),
                    Err(e) => {
                        warn!(%evidence_hash, error = %e, "evidence anchoring failed");
                        LedgerBlock::Failed { error: e.to_string() }
                    }
                }
            }
        };

        ScanResponse {
            result,
            evidence_hash,
            ledger,
        }
    }

    /// 空哈希直接拒绝，不访问账本
    pub async fn verify(&self, evidence_hash: Option<&str>) -> VerifyReply {
        match evidence_hash.filter(|h| !h.trim().is_empty()) {
            Some(hash) => VerifyReply::Record(self.ledger.verify(hash).await),
            None => VerifyReply::Error(ErrorBody::new("evidenceHash required")),
        }
    }
}
