use serde_json::{json, Map, Value};
use sha2::{Digest, Sha256};
use std::fmt::Write;

use crate::evidence::{EvidenceHash, InferenceResult};

/// 进入哈希的解释条目数量
pub const HASHED_EXPLANATION_ENTRIES: usize = 3;

/// 计算证据哈希 (Evidence Fingerprint)
///
/// 只取四个字段：`category`、`riskScore`、`confidence` 以及前 3 条 `explanation`。
/// 其余字段（模型详情、用户摘要、第 4 条以后的解释）无论怎么变，哈希都不变。
///
/// 序列化规则：键按字母序排列、无空白、非 ASCII 字符转义为小写 `\uXXXX`，
/// 这样与旧服务已经上链的哈希逐字节一致。
pub fn compute_hash(result: &InferenceResult) -> EvidenceHash {
    let canonical = canonical_subset(result);

    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    EvidenceHash::from_digest(&hasher.finalize())
}

/// 规范化后的 JSON 字符串（哈希的原像）
pub fn canonical_subset(result: &InferenceResult) -> String {
    let explanation: Vec<&str> = result
        .explanation
        .iter()
        .take(HASHED_EXPLANATION_ENTRIES)
        .map(String::as_str)
        .collect();

    let subset = json!({
        "category": result.category,
        "riskScore": result.risk_score,
        "confidence": result.confidence,
        "explanation": explanation,
    });

    escape_non_ascii(&sorted(&subset).to_string())
}

fn sorted(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut keys = map.keys().cloned().collect::<Vec<_>>();
            keys.sort();
            let mut ordered = Map::new();
            for key in keys {
                if let Some(v) = map.get(&key) {
                    ordered.insert(key, sorted(v));
                }
            }
            Value::Object(ordered)
        }
        Value::Array(items) => Value::Array(items.iter().map(sorted).collect()),
        _ => value.clone(),
    }
}

// 非 ASCII 只会出现在 JSON 字符串内部，逐个按 UTF-16 码元转义即可
fn escape_non_ascii(json: &str) -> String {
    let mut out = String::with_capacity(json.len());
    let mut units = [0u16; 2];
    for ch in json.chars() {
        if ch.is_ascii() {
            out.push(ch);
            continue;
        }
        for unit in ch.encode_utf16(&mut units) {
            let _ = write!(out, "\\u{:04x}", unit);
        }
    }
    out
}
