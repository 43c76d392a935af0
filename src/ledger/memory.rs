use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use tokio::sync::Mutex;

use super::{AnchorReceipt, EvidenceLedger, LedgerNetwork, VerificationRecord};
use crate::error::LedgerError;

/// 模拟注册表的地址（占位，不对应任何真实合约）
pub const SIMULATED_REGISTRY: &str = "0x0000000000000000000000000000000000000000";

/// 进程内模拟账本 (In-memory Registry)
///
/// 与 `EvidenceRegistry` 合约语义一致：同一个哈希只能锚定一次，先到者为准。
/// 程序一关数据就没了，只用于本地联调和测试。
pub struct MemoryLedger {
    network: LedgerNetwork,
    state: Mutex<RegistryState>,
}

#[derive(Default)]
struct RegistryState {
    records: HashMap<String, StoredEvidence>,
    height: u64,
}

struct StoredEvidence {
    timestamp: u64,
    category: String,
}

impl MemoryLedger {
    pub fn new(network: LedgerNetwork) -> Self {
        Self {
            network,
            state: Mutex::new(RegistryState::default()),
        }
    }
}

#[async_trait]
impl EvidenceLedger for MemoryLedger {
    fn network(&self) -> &LedgerNetwork {
        &self.network
    }

    fn account(&self) -> Option<String> {
        None
    }

    async fn anchor(&self, hash: &str, category: &str) -> Result<AnchorReceipt, LedgerError> {
        let mut state = self.state.lock().await;
        if state.records.contains_key(hash) {
            return Err(LedgerError::Rejected(format!("evidence already anchored: {hash}")));
        }

        // 每次写入出一个“块”，高度即交易序号
        state.height += 1;
        let block_number = state.height;
        let timestamp = chrono::Utc::now().timestamp().max(1) as u64;

        let mut hasher = Sha256::new();
        hasher.update(block_number.to_be_bytes());
        hasher.update(hash.as_bytes());
        hasher.update(category.as_bytes());
        let transaction_id = format!("0x{}", hex::encode(hasher.finalize()));

        state.records.insert(
            hash.to_string(),
            StoredEvidence {
                timestamp,
                category: category.to_string(),
            },
        );

        Ok(AnchorReceipt {
            transaction_id,
            timestamp: Some(timestamp),
            block_number,
            registry: SIMULATED_REGISTRY.to_string(),
        })
    }

    async fn verify(&self, hash: &str) -> Result<VerificationRecord, LedgerError> {
        let state = self.state.lock().await;
        Ok(match state.records.get(hash) {
            Some(stored) => VerificationRecord::found(stored.timestamp, stored.category.clone()),
            None => VerificationRecord::not_found(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ledger() -> MemoryLedger {
        MemoryLedger::new(LedgerNetwork {
            name: "Local Registry".to_string(),
            kind: "EvidenceRegistry (in-memory)".to_string(),
            explorer_url: "http://localhost".to_string(),
        })
    }

    #[tokio::test]
    async fn anchor_then_verify_round_trip() {
        let ledger = ledger();
        let receipt = ledger.anchor("deadbeef", "SCAM").await.unwrap();
        assert!(receipt.transaction_id.starts_with("0x"));
        assert_eq!(receipt.transaction_id.len(), 66);
        assert_eq!(receipt.block_number, 1);

        let record = ledger.verify("deadbeef").await.unwrap();
        assert!(record.exists);
        assert!(record.timestamp.unwrap() > 0);
        assert_eq!(record.timestamp, receipt.timestamp);
        assert_eq!(record.category.as_deref(), Some("SCAM"));
    }

    #[tokio::test]
    async fn unknown_hash_reports_zero_timestamp() {
        let record = ledger().verify("missing").await.unwrap();
        assert_eq!(record, VerificationRecord::not_found());
    }

    #[tokio::test]
    async fn first_anchor_wins() {
        let ledger = ledger();
        ledger.anchor("h", "SAFE").await.unwrap();
        let err = ledger.anchor("h", "SCAM").await.unwrap_err();
        assert!(matches!(err, LedgerError::Rejected(_)));
        assert_eq!(ledger.verify("h").await.unwrap().category.as_deref(), Some("SAFE"));
    }
}
