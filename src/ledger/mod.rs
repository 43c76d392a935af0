//! 模块：证据账本 (Evidence Ledger)
//!
//! **职责**: 把证据哈希写进链上的 `EvidenceRegistry` 合约，并在之后按哈希查回存证记录。
//!
//! 进程启动时只初始化一次：
//! - 凭证齐全且 RPC 可达 → `LedgerClient::Ready`
//! - 否则 → `LedgerClient::Disabled`，整个进程生命周期内都不会再尝试恢复
//!
//! 锚定是尽力而为的：失败只会反映在响应的 `ledger.status` 上，不会让扫描请求失败。

pub mod evm;
pub mod memory;

use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::{LedgerBackend, LedgerConfig};
use crate::error::LedgerError;

/// 存证回执：交易被确认之后才会产生，之后不再修改
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnchorReceipt {
    pub transaction_id: String,
    /// 出块时间 (Unix 秒)。查不到所在区块时为 `None`，不用本地时钟顶替
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<u64>,
    pub block_number: u64,
    /// 合约地址，对应响应中的 `topicId`
    pub registry: String,
}

/// 链上查询结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VerificationRecord {
    pub exists: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl VerificationRecord {
    pub fn found(timestamp: u64, category: String) -> Self {
        Self {
            exists: true,
            timestamp: Some(timestamp),
            category: Some(category),
            error: None,
        }
    }

    /// 合约返回 `exists = false` 时，时间戳为 0、类别为空串
    pub fn not_found() -> Self {
        Self {
            exists: false,
            timestamp: Some(0),
            category: Some(String::new()),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            exists: false,
            timestamp: None,
            category: None,
            error: Some(error.into()),
        }
    }
}

/// 账本网络的展示信息
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerNetwork {
    pub name: String,
    pub kind: String,
    pub explorer_url: String,
}

impl LedgerNetwork {
    pub fn explorer_link(&self, transaction_id: &str) -> String {
        format!("{}/tx/{}", self.explorer_url.trim_end_matches('/'), transaction_id)
    }
}

/// 账本后端的统一接口
#[async_trait]
pub trait EvidenceLedger: Send + Sync {
    fn network(&self) -> &LedgerNetwork;

    /// 签名账户（模拟账本没有）
    fn account(&self) -> Option<String>;

    /// 写入 `anchorEvidence(hash, category)` 并等待回执
    async fn anchor(&self, hash: &str, category: &str) -> Result<AnchorReceipt, LedgerError>;

    /// 只读调用 `verifyEvidence(hash)`
    async fn verify(&self, hash: &str) -> Result<VerificationRecord, LedgerError>;
}

/// 账本停用原因
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisabledReason {
    MissingCredentials,
    InvalidCredentials(String),
    Unreachable(String),
}

impl std::fmt::Display for DisabledReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DisabledReason::MissingCredentials => {
                f.write_str("ledger credentials unconfigured (PRIVATE_KEY / CONTRACT_ADDRESS)")
            }
            DisabledReason::InvalidCredentials(e) => write!(f, "invalid ledger credentials: {e}"),
            DisabledReason::Unreachable(e) => write!(f, "ledger rpc unreachable: {e}"),
        }
    }
}

/// 账本客户端：要么可用，要么停用，调用方必须 match 才能拿到后端
#[derive(Clone)]
pub enum LedgerClient {
    Ready(Arc<dyn EvidenceLedger>),
    Disabled(DisabledReason),
}

/// `GET /api/status` 中的账本状态
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerStatusReport {
    pub mode: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub network: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl LedgerClient {
    /// 按配置建立连接。任何失败都落入 `Disabled`，不会返回错误。
    pub async fn initialize(config: &LedgerConfig) -> Self {
        let client = match config.backend {
            LedgerBackend::Memory => {
                LedgerClient::Ready(Arc::new(memory::MemoryLedger::new(network_of(config))))
            }
            LedgerBackend::Evm => match evm::EvmLedger::connect(config, network_of(config)).await {
                Ok(ledger) => LedgerClient::Ready(Arc::new(ledger)),
                Err(reason) => LedgerClient::Disabled(reason),
            },
        };

        match &client {
            LedgerClient::Ready(ledger) => {
                let account = ledger.account().unwrap_or_else(|| "-".to_string());
                info!(network = %ledger.network().name, %account, "ledger client ready");
            }
            LedgerClient::Disabled(reason) => warn!(%reason, "ledger client disabled; anchoring offline"),
        }
        client
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, LedgerClient::Ready(_))
    }

    pub async fn anchor(&self, hash: &str, category: &str) -> Result<AnchorReceipt, LedgerError> {
        match self {
            LedgerClient::Ready(ledger) => ledger.anchor(hash, category).await,
            LedgerClient::Disabled(reason) => Err(LedgerError::Disabled(reason.to_string())),
        }
    }

    /// 查询失败或账本停用时返回 `exists = false` 并附带错误信息
    pub async fn verify(&self, hash: &str) -> VerificationRecord {
        match self {
            LedgerClient::Ready(ledger) => match ledger.verify(hash).await {
                Ok(record) => record,
                Err(e) => {
                    warn!(evidence_hash = hash, error = %e, "ledger verification failed");
                    VerificationRecord::failed(e.to_string())
                }
            },
            LedgerClient::Disabled(_) => VerificationRecord::failed("Service disabled"),
        }
    }

    pub fn status(&self) -> LedgerStatusReport {
        match self {
            LedgerClient::Ready(ledger) => LedgerStatusReport {
                mode: "ready",
                network: Some(ledger.network().name.clone()),
                account: ledger.account(),
                reason: None,
            },
            LedgerClient::Disabled(reason) => LedgerStatusReport {
                mode: "disabled",
                network: None,
                account: None,
                reason: Some(reason.to_string()),
            },
        }
    }
}

fn network_of(config: &LedgerConfig) -> LedgerNetwork {
    let kind = match config.backend {
        LedgerBackend::Evm => "EvidenceRegistry (EVM)",
        LedgerBackend::Memory => "EvidenceRegistry (in-memory)",
    };
    LedgerNetwork {
        name: config.network_name.clone(),
        kind: kind.to_string(),
        explorer_url: config.explorer_url.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_credentials_disable_the_client() {
        let client = LedgerClient::initialize(&LedgerConfig::default()).await;
        assert!(matches!(client, LedgerClient::Disabled(DisabledReason::MissingCredentials)));

        let err = client.anchor("abc", "SAFE").await.unwrap_err();
        assert!(matches!(err, LedgerError::Disabled(_)));

        let record = client.verify("abc").await;
        assert!(!record.exists);
        assert_eq!(record.error.as_deref(), Some("Service disabled"));
        assert_eq!(client.status().mode, "disabled");
    }

    #[tokio::test]
    async fn memory_backend_is_ready_without_credentials() {
        let config = LedgerConfig {
            backend: LedgerBackend::Memory,
            ..LedgerConfig::default()
        };
        let client = LedgerClient::initialize(&config).await;
        assert!(client.is_ready());
        assert_eq!(client.status().network.as_deref(), Some("Polygon Amoy Testnet"));
    }

    #[test]
    fn explorer_link_tolerates_trailing_slash() {
        let network = LedgerNetwork {
            name: "n".to_string(),
            kind: "k".to_string(),
            explorer_url: "https://amoy.polygonscan.com/".to_string(),
        };
        assert_eq!(network.explorer_link("0xabc"), "https://amoy.polygonscan.com/tx/0xabc");
    }
}
