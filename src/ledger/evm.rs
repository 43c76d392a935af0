use async_trait::async_trait;
use ethers::contract::abigen;
use ethers::middleware::SignerMiddleware;
use ethers::providers::{Http, JsonRpcClient, Middleware, Provider};
use ethers::signers::LocalWallet;
use ethers::types::{Address, BlockNumber, U256, U64};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::{AnchorReceipt, DisabledReason, EvidenceLedger, LedgerNetwork, VerificationRecord};
use crate::config::LedgerConfig;
use crate::error::LedgerError;
use crate::signer::LedgerSigner;

abigen!(
    EvidenceRegistry,
    r#"[
        {
            "inputs": [
                {"internalType": "string", "name": "_hash", "type": "string"},
                {"internalType": "string", "name": "_category", "type": "string"}
            ],
            "name": "anchorEvidence",
            "outputs": [],
            "stateMutability": "nonpayable",
            "type": "function"
        },
        {
            "inputs": [
                {"internalType": "string", "name": "_hash", "type": "string"}
            ],
            "name": "verifyEvidence",
            "outputs": [
                {"internalType": "bool", "name": "", "type": "bool"},
                {"internalType": "uint256", "name": "", "type": "uint256"},
                {"internalType": "string", "name": "", "type": "string"}
            ],
            "stateMutability": "view",
            "type": "function"
        }
    ]"#
);

type SignerClient<P> = SignerMiddleware<Provider<P>, LocalWallet>;

// 回执轮询间隔
const RECEIPT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// EVM 账本：通过 JSON-RPC 调用 `EvidenceRegistry` 合约
pub struct EvmLedger<P: JsonRpcClient = Http> {
    network: LedgerNetwork,
    signer: LedgerSigner,
    client: Arc<SignerClient<P>>,
    contract: EvidenceRegistry<SignerClient<P>>,
    gas_limit: u64,
    receipt_timeout: Duration,
    /// 下一个可用 nonce。锁同时保证同一账户的提交串行化；
    /// `None` 表示需要重新从链上读取（首次使用、提交失败或交易下落不明之后）。
    next_nonce: Mutex<Option<U256>>,
}

impl EvmLedger<Http> {
    pub async fn connect(config: &LedgerConfig, network: LedgerNetwork) -> Result<Self, DisabledReason> {
        let (Some(private_key), Some(contract_address)) =
            (config.private_key.as_deref(), config.contract_address.as_deref())
        else {
            return Err(DisabledReason::MissingCredentials);
        };

        let signer = LedgerSigner::from_private_key(private_key, config.chain_id)
            .map_err(|e| DisabledReason::InvalidCredentials(e.to_string()))?;
        let registry = Address::from_str(contract_address)
            .map_err(|e| DisabledReason::InvalidCredentials(format!("invalid CONTRACT_ADDRESS: {e}")))?;

        let provider = Provider::<Http>::try_from(config.rpc_url.as_str())
            .map_err(|e| DisabledReason::Unreachable(format!("provider init failed: {e}")))?
            .interval(RECEIPT_POLL_INTERVAL);

        // 连通性检查
        match tokio::time::timeout(config.connect_timeout, provider.get_block_number()).await {
            Ok(Ok(height)) => debug!(rpc = %config.rpc_url, %height, "ledger rpc reachable"),
            Ok(Err(e)) => return Err(DisabledReason::Unreachable(e.to_string())),
            Err(_) => {
                return Err(DisabledReason::Unreachable(format!(
                    "no answer from {} within {}s",
                    config.rpc_url,
                    config.connect_timeout.as_secs()
                )))
            }
        }

        Ok(Self::from_parts(provider, signer, registry, network, config))
    }
}

impl<P: JsonRpcClient + 'static> EvmLedger<P> {
    fn from_parts(
        provider: Provider<P>,
        signer: LedgerSigner,
        registry: Address,
        network: LedgerNetwork,
        config: &LedgerConfig,
    ) -> Self {
        let client = Arc::new(SignerMiddleware::new(provider, signer.wallet().clone()));
        let contract = EvidenceRegistry::new(registry, client.clone());

        Self {
            network,
            signer,
            client,
            contract,
            gas_limit: config.gas_limit,
            receipt_timeout: config.receipt_timeout,
            next_nonce: Mutex::new(None),
        }
    }

    /// 交易已广播但结果不明（超时 / 被节点丢弃）时，让下一次提交重新读取链上 nonce。
    /// 期间若已有其他提交推进了 nonce，则保持不动。
    async fn forget_nonce(&self, used: U256) {
        let mut slot = self.next_nonce.lock().await;
        if *slot == Some(used + U256::one()) {
            *slot = None;
        }
    }

    /// 区块时间；查不到时返回 `None`
    async fn block_timestamp(&self, block_number: Option<U64>) -> Option<u64> {
        let number = block_number?;
        match self.client.get_block(number).await {
            Ok(Some(block)) => Some(saturating_u64(block.timestamp)),
            Ok(None) => {
                warn!(block = %number, "block not found; anchor receipt has no timestamp");
                None
            }
            Err(e) => {
                warn!(block = %number, error = %e, "block lookup failed; anchor receipt has no timestamp");
                None
            }
        }
    }
}

#[async_trait]
impl<P: JsonRpcClient + 'static> EvidenceLedger for EvmLedger<P> {
    fn network(&self) -> &LedgerNetwork {
        &self.network
    }

    fn account(&self) -> Option<String> {
        Some(format!("{:#x}", self.signer.address()))
    }

    async fn anchor(&self, hash: &str, category: &str) -> Result<AnchorReceipt, LedgerError> {
        let mut slot = self.next_nonce.lock().await;

        let nonce = match *slot {
            Some(nonce) => nonce,
            None => self
                .client
                .get_transaction_count(self.signer.address(), Some(BlockNumber::Pending.into()))
                .await
                .map_err(|e| LedgerError::Rpc(format!("nonce lookup failed: {e}")))?,
        };
        let gas_price = self
            .client
            .get_gas_price()
            .await
            .map_err(|e| LedgerError::Rpc(format!("gas price lookup failed: {e}")))?;

        let call = self
            .contract
            .anchor_evidence(hash.to_string(), category.to_string())
            .legacy()
            .gas(self.gas_limit)
            .gas_price(gas_price)
            .nonce(nonce);

        let pending = match call.send().await {
            Ok(pending) => {
                *slot = Some(nonce + U256::one());
                pending
            }
            Err(e) => {
                *slot = None;
                return Err(LedgerError::Submission(format!("anchorEvidence call failed: {e}")));
            }
        };
        drop(slot);

        let tx_hash = format!("{:#x}", pending.tx_hash());
        debug!(tx = %tx_hash, %nonce, "anchor transaction submitted");

        let receipt = match tokio::time::timeout(self.receipt_timeout, pending).await {
            Err(_) => {
                self.forget_nonce(nonce).await;
                return Err(LedgerError::ReceiptTimeout(self.receipt_timeout.as_secs()));
            }
            Ok(Err(e)) => {
                self.forget_nonce(nonce).await;
                return Err(LedgerError::Rpc(format!("tx confirmation failed: {e}")));
            }
            Ok(Ok(None)) => {
                self.forget_nonce(nonce).await;
                return Err(LedgerError::MissingReceipt(tx_hash));
            }
            Ok(Ok(Some(receipt))) => receipt,
        };

        if receipt.status != Some(U64::from(1u64)) {
            return Err(LedgerError::Reverted(tx_hash));
        }

        let timestamp = self.block_timestamp(receipt.block_number).await;
        let block_number = receipt.block_number.map(|n| n.as_u64()).unwrap_or_default();
        info!(tx = %tx_hash, block = block_number, evidence_hash = hash, "evidence anchored");

        Ok(AnchorReceipt {
            transaction_id: tx_hash,
            timestamp,
            block_number,
            registry: format!("{:#x}", self.contract.address()),
        })
    }

    async fn verify(&self, hash: &str) -> Result<VerificationRecord, LedgerError> {
        let (exists, timestamp, category) = self
            .contract
            .verify_evidence(hash.to_string())
            .call()
            .await
            .map_err(|e| LedgerError::Rpc(format!("verifyEvidence call failed: {e}")))?;

        Ok(VerificationRecord {
            exists,
            timestamp: Some(saturating_u64(timestamp)),
            category: Some(category),
            error: None,
        })
    }
}

fn saturating_u64(value: U256) -> u64 {
    if value > U256::from(u64::MAX) {
        u64::MAX
    } else {
        value.as_u64()
    }
}
