use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

/// 推理结果 (Inference Result)
///
/// 外部 ML 分析器对一份媒体内容给出的判定。
/// 一旦由分析器返回就不再修改；编排层只会在外面再包一层 `evidenceHash` 和 `ledger`。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InferenceResult {
    // === 第一层：判定 (Verdict) ===

    // 类别标签，例如 "SAFE" / "SCAM" / "DEEPFAKE"
    pub category: String,

    // 置信度 (0.0 ~ 1.0)。保留分析器给出的数字原样（`1` 与 `1.0` 不同），
    // 否则证据哈希会和分析器的原始输出对不上
    pub confidence: Number,

    // 风险分 (0 ~ 100)，同样保留原始数字形式
    pub risk_score: Number,

    // === 第二层：解释 (Reasoning) ===

    // 有序的解释条目。只有前 3 条进入证据哈希。
    #[serde(default)]
    pub explanation: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_details: Option<ModelDetails>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_summary: Option<UserSummary>,

    // 分析器额外返回的字段，原样透传给前端
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ModelDetails {
    #[serde(default)]
    pub architecture: String,
    #[serde(default)]
    pub features_analysed: Vec<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    #[serde(default)]
    pub verdict: String,
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub triggers: Vec<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// 由浮点数构造分值；NaN / 无穷大无法表示为 JSON，记为 0
pub fn score(value: f64) -> Number {
    Number::from_f64(value).unwrap_or_else(|| Number::from(0))
}

/// 证据哈希：64 位小写十六进制 SHA-256
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EvidenceHash(String);

impl EvidenceHash {
    pub(crate) fn from_digest(digest: &[u8]) -> Self {
        Self(hex::encode(digest))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for EvidenceHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// 媒体类型 (Modality)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Modality {
    Text,
    Image,
    Audio,
    Video,
}

impl Modality {
    pub const ALL: [Modality; 4] = [Modality::Text, Modality::Image, Modality::Audio, Modality::Video];

    pub fn as_str(&self) -> &'static str {
        match self {
            Modality::Text => "text",
            Modality::Image => "image",
            Modality::Audio => "audio",
            Modality::Video => "video",
        }
    }

    /// 未知类型返回 None，由调用方决定如何报错
    pub fn parse(raw: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.as_str() == raw)
    }
}

impl std::fmt::Display for Modality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
