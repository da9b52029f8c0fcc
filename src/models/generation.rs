use serde::{Deserialize, Serialize};

/// 生成结果
///
/// `answer_key` 依赖 `question_paper`：只有在试卷生成成功、
/// 且答案生成也成功后才会有值
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenerationResult {
    pub question_paper: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub answer_key: Option<String>,
}

impl GenerationResult {
    pub fn is_complete(&self) -> bool {
        self.answer_key.is_some()
    }
}

/// `POST /generate-question-paper/` 的响应
#[derive(Debug, Clone, Deserialize)]
pub struct QuestionPaperResponse {
    pub question_paper: String,
}

/// `POST /generate-answer-key/` 的响应
#[derive(Debug, Clone, Deserialize)]
pub struct AnswerKeyResponse {
    pub answer_key: String,
}

/// `GET /health` 的响应
#[derive(Debug, Clone, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

/// 服务端错误响应（`{"error": ...}` 或 FastAPI 的 `{"detail": ...}`）
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorResponse {
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub detail: Option<serde_json::Value>,
}

impl ErrorResponse {
    /// 提取可读的错误信息
    pub fn message(&self) -> Option<String> {
        if let Some(error) = self.error.as_deref().filter(|e| !e.trim().is_empty()) {
            return Some(error.to_string());
        }
        match &self.detail {
            Some(serde_json::Value::String(s)) if !s.trim().is_empty() => Some(s.clone()),
            Some(serde_json::Value::Null) | None => None,
            Some(other) => Some(other.to_string()),
        }
    }
}
