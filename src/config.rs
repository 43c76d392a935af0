use anyhow::Context;
use std::env;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub ledger: LedgerConfig,
    pub inference: InferenceConfig,
    pub cors_allowed_origins: Vec<String>,
    pub fixture_override_enabled: bool,
}

/// 账本后端选择
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerBackend {
    /// EvidenceRegistry 合约 (EVM JSON-RPC)
    Evm,
    /// 进程内模拟账本，只用于本地联调和测试
    Memory,
}

#[derive(Debug, Clone)]
pub struct LedgerConfig {
    pub backend: LedgerBackend,
    pub rpc_url: String,
    pub private_key: Option<String>,
    pub contract_address: Option<String>,
    pub chain_id: u64,
    pub gas_limit: u64,
    pub receipt_timeout: Duration,
    pub connect_timeout: Duration,
    pub network_name: String,
    pub explorer_url: String,
}

#[derive(Debug, Clone)]
pub struct InferenceConfig {
    pub base_url: String,
    pub timeout: Duration,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            backend: LedgerBackend::Evm,
            rpc_url: "https://rpc-amoy.polygon.technology/".to_string(),
            private_key: None,
            contract_address: None,
            chain_id: 80002,
            gas_limit: 200_000,
            receipt_timeout: Duration::from_secs(120),
            connect_timeout: Duration::from_secs(10),
            network_name: "Polygon Amoy Testnet".to_string(),
            explorer_url: "https://amoy.polygonscan.com".to_string(),
        }
    }
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8001/analyze".to_string(),
            timeout: Duration::from_secs(120),
        }
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        load_dotenv_layers();

        let ledger_defaults = LedgerConfig::default();
        let inference_defaults = InferenceConfig::default();

        let backend = match env::var("LEDGER_BACKEND").as_deref() {
            Ok("memory") => LedgerBackend::Memory,
            Ok("evm") | Err(_) => LedgerBackend::Evm,
            Ok(other) => anyhow::bail!("LEDGER_BACKEND must be `evm` or `memory`, got `{other}`"),
        };

        let ledger = LedgerConfig {
            backend,
            rpc_url: env::var("POLYGON_RPC_URL").unwrap_or(ledger_defaults.rpc_url),
            private_key: non_empty_var("PRIVATE_KEY"),
            contract_address: non_empty_var("CONTRACT_ADDRESS"),
            chain_id: parse_var("CHAIN_ID", ledger_defaults.chain_id)?,
            gas_limit: parse_var("LEDGER_GAS_LIMIT", ledger_defaults.gas_limit)?,
            receipt_timeout: Duration::from_secs(parse_var(
                "LEDGER_RECEIPT_TIMEOUT_SECS",
                ledger_defaults.receipt_timeout.as_secs(),
            )?),
            connect_timeout: Duration::from_secs(parse_var(
                "LEDGER_CONNECT_TIMEOUT_SECS",
                ledger_defaults.connect_timeout.as_secs(),
            )?),
            network_name: env::var("LEDGER_NETWORK_NAME").unwrap_or(ledger_defaults.network_name),
            explorer_url: env::var("EXPLORER_URL").unwrap_or(ledger_defaults.explorer_url),
        };

        let inference = InferenceConfig {
            base_url: env::var("INFERENCE_BASE_URL").unwrap_or(inference_defaults.base_url),
            timeout: Duration::from_secs(parse_var(
                "INFERENCE_TIMEOUT_SECS",
                inference_defaults.timeout.as_secs(),
            )?),
        };

        let mut cors_allowed_origins = env::var("CORS_ALLOWED_ORIGINS")
            .map(|v| split_origins(&v))
            .unwrap_or_default();
        if let Some(frontend) = non_empty_var("FRONTEND_URL") {
            cors_allowed_origins.push(frontend);
        }

        Ok(Self {
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: parse_var("PORT", 8000)?,
            ledger,
            inference,
            cors_allowed_origins,
            fixture_override_enabled: read_bool("FIXTURE_OVERRIDE_ENABLED", true)?,
        })
    }
}

fn load_dotenv_layers() {
    for path in [".env", "backend/.env"] {
        let _ = dotenvy::from_path(path);
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key).ok().map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn parse_var<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(raw) => raw.trim().parse::<T>().with_context(|| format!("invalid {key}: `{raw}`")),
        Err(_) => Ok(default),
    }
}

fn read_bool(key: &str, default: bool) -> anyhow::Result<bool> {
    match non_empty_var(key) {
        Some(raw) => parse_bool(key, &raw),
        None => Ok(default),
    }
}

// 拼错的开关值直接报错，不静默当成 false
fn parse_bool(key: &str, raw: &str) -> anyhow::Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => anyhow::bail!("invalid {key}: {raw:?} (expected true/false, yes/no, on/off or 1/0)"),
    }
}

fn split_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|o| !o.is_empty())
        .map(str::to_string)
        .collect()
}
