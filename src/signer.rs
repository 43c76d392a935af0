use ethers::signers::{LocalWallet, Signer};
use ethers::types::Address;
use rand::rngs::OsRng; // 用于生成私钥的安全随机数生成器

/// 签名器模块
/// 持有锚定交易所用的 secp256k1 私钥（链上账户）
#[derive(Debug, Clone)]
pub struct LedgerSigner {
    wallet: LocalWallet,
}

impl LedgerSigner {
    /// 从十六进制私钥加载（允许带 `0x` 前缀），并绑定链 ID 以启用 EIP-155 重放保护
    pub fn from_private_key(private_key: &str, chain_id: u64) -> anyhow::Result<Self> {
        let stripped = private_key.trim().trim_start_matches("0x");
        let wallet = stripped
            .parse::<LocalWallet>()
            .map_err(|e| anyhow::anyhow!("invalid private key: {e}"))?
            .with_chain_id(chain_id);
        Ok(Self { wallet })
    }

    /// 生成一个全新的随机账户
    pub fn generate() -> Self {
        Self { wallet: LocalWallet::new(&mut OsRng) }
    }

    /// 账户地址（需要在链上充值 gas）
    pub fn address(&self) -> Address {
        self.wallet.address()
    }

    /// 十六进制私钥，带 `0x` 前缀
    pub fn private_key_hex(&self) -> String {
        format!("0x{}", hex::encode(self.wallet.signer().to_bytes()))
    }

    pub fn wallet(&self) -> &LocalWallet {
        &self.wallet
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_key_reloads_to_the_same_address() {
        let signer = LedgerSigner::generate();
        let reloaded = LedgerSigner::from_private_key(&signer.private_key_hex(), 80002).unwrap();
        assert_eq!(signer.address(), reloaded.address());
        assert_eq!(reloaded.wallet().chain_id(), 80002);
    }

    #[test]
    fn garbage_key_is_rejected() {
        assert!(LedgerSigner::from_private_key("not-a-key", 1).is_err());
    }
}
