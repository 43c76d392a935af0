use serde_json::Map;

use crate::evidence::{score, InferenceResult, ModelDetails, UserSummary};

/// 演示用的固定样本文件名（已小写）
pub const DEMO_FIXTURE_SIGNATURE: &str = "test.mp4";

/// 演示样本覆盖钩子 (Demo Fixture Override)
///
/// label 或 content 中出现样本文件名（任意目录下）时直接返回一份预置的高风险结果，
/// 不经过任何分析器。文件名前必须是路径分隔符或非字母数字字符，`latest.mp4` 不算命中。
/// 这是演示 / 测试用的固定输出，不是检测规则。
#[derive(Debug, Clone)]
pub struct FixtureOverride {
    signature: Option<String>,
}

impl FixtureOverride {
    pub fn demo() -> Self {
        Self {
            signature: Some(DEMO_FIXTURE_SIGNATURE.to_string()),
        }
    }

    pub fn disabled() -> Self {
        Self { signature: None }
    }

    pub fn from_flag(enabled: bool) -> Self {
        if enabled {
            Self::demo()
        } else {
            Self::disabled()
        }
    }

    /// 命中时返回预置结果
    pub fn intercept(&self, label: Option<&str>, content: Option<&str>) -> Option<InferenceResult> {
        let signature = self.signature.as_deref()?;
        let hit = [label, content]
            .into_iter()
            .flatten()
            .any(|field| names_file(&normalize(field), signature));
        hit.then(canned_deepfake)
    }
}

// 只认完整的文件名：命中位置之前是串首、分隔符或其他非字母数字字符
fn names_file(haystack: &str, file_name: &str) -> bool {
    haystack.match_indices(file_name).any(|(at, _)| {
        haystack[..at]
            .chars()
            .next_back()
            .map_or(true, |prev| !prev.is_alphanumeric())
    })
}

// 不区分大小写，`/` 与 `\` 视为同一分隔符
fn normalize(raw: &str) -> String {
    raw.replace('/', "\\").to_lowercase()
}

fn canned_deepfake() -> InferenceResult {
    InferenceResult {
        category: "DEEPFAKE".to_string(),
        confidence: score(0.99),
        risk_score: 99.into(),
        explanation: vec![
            "Temporal facial inconsistencies detected between frames 45-60".to_string(),
            "Deepfake artifacts identified in eye reflection patterns".to_string(),
            "Audio-visual synchronization mismatch exceeding threshold".to_string(),
            "Metadata anomalies indicating frame manipulation".to_string(),
        ],
        model_details: Some(ModelDetails {
            architecture: "EmpowerNet Zero-Tolerance Engine".to_string(),
            features_analysed: vec![
                "facial forgery signatures".to_string(),
                "temporal coherence".to_string(),
                "metadata integrity".to_string(),
                "generative noise patterns".to_string(),
            ],
            extra: Map::new(),
        }),
        user_summary: Some(UserSummary {
            verdict: "DEEPFAKE DETECTED".to_string(),
            reason: "Detection of multiple high-confidence generative artifacts including temporal facial inconsistencies and metadata tampering signatures.".to_string(),
            triggers: vec![
                "Temporal Inconsistency".to_string(),
                "Eye Reflection Artifacts".to_string(),
                "Sync Mismatch".to_string(),
            ],
            extra: Map::new(),
        }),
        extra: Map::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn label_matches_in_any_case_and_separator_style() {
        let hook = FixtureOverride::demo();
        for label in [
            r"C:\Users\johri\Downloads\test.mp4",
            r"c:\USERS\JOHRI\downloads\TEST.MP4",
            "C:/Users/johri/Downloads/test.mp4",
        ] {
            let result = hook.intercept(Some(label), None).expect(label);
            assert_eq!(result.category, "DEEPFAKE");
            assert_eq!(result.risk_score.as_u64(), Some(99));
            assert_eq!(result.confidence.as_f64(), Some(0.99));
        }
    }

    #[test]
    fn content_containing_the_signature_matches() {
        let content = "file://C:/Users/johri/Downloads/test.mp4?preview=1";
        assert!(FixtureOverride::demo().intercept(None, Some(content)).is_some());
    }

    #[test]
    fn bare_file_name_matches_in_any_directory() {
        let hook = FixtureOverride::demo();
        for label in ["test.mp4", "TEST.MP4", r"D:\clips\test.mp4", "/home/demo/Test.mp4"] {
            assert!(hook.intercept(Some(label), None).is_some(), "{label}");
        }
    }

    #[test]
    fn other_files_do_not_match() {
        let hook = FixtureOverride::demo();
        assert!(hook.intercept(Some("latest.mp4"), None).is_none());
        assert!(hook.intercept(Some(r"D:\clips\contest.mp4"), Some("hello")).is_none());
        assert!(hook.intercept(Some("test.mov"), None).is_none());
        assert!(hook.intercept(None, None).is_none());
    }

    #[test]
    fn disabled_hook_never_matches() {
        let hook = FixtureOverride::disabled();
        assert!(hook.intercept(Some(r"C:\Users\johri\Downloads\test.mp4"), None).is_none());
    }
}
