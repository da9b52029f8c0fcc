/// 生成服务客户端
///
/// 封装所有与远程生成服务相关的 HTTP 调用
use std::future::Future;
use std::time::Duration;

use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::{ApiError, ConfigError};
use crate::models::generation::{
    AnswerKeyResponse, ErrorResponse, HealthResponse, QuestionPaperResponse,
};
use crate::services::payload_encoder::MultipartPayload;
use crate::utils::logging::truncate_text;

/// 试卷生成接口
pub const QUESTION_PAPER_ENDPOINT: &str = "/generate-question-paper/";
/// 答案生成接口
pub const ANSWER_KEY_ENDPOINT: &str = "/generate-answer-key/";
/// 健康检查接口
pub const HEALTH_ENDPOINT: &str = "/health";

// 错误响应体在消息中最多保留的字符数
const ERROR_BODY_PREVIEW: usize = 300;

/// 生成服务能力
///
/// 流水线只依赖这个 trait，测试中可以替换成内存实现
pub trait GenerationService {
    /// 第一阶段：生成试卷，返回试卷正文
    fn generate_question_paper(
        &self,
        payload: &MultipartPayload,
    ) -> impl Future<Output = Result<String, ApiError>> + Send;

    /// 第二阶段：根据试卷正文生成答案
    fn generate_answer_key(
        &self,
        payload: &MultipartPayload,
    ) -> impl Future<Output = Result<String, ApiError>> + Send;
}

/// 基于 reqwest 的生成服务客户端
#[derive(Clone, Debug)]
pub struct HttpGenerationClient {
    client: reqwest::Client,
    base_url: String,
}

impl HttpGenerationClient {
    /// 创建新的客户端
    ///
    /// 未配置超时时请求会一直等待服务响应
    pub fn new(config: &Config) -> Result<Self, ConfigError> {
        config.validate()?;

        let mut builder = reqwest::Client::builder().user_agent(concat!(
            "exam-paper-generator/",
            env!("CARGO_PKG_VERSION")
        ));
        if let Some(secs) = config.request_timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder
            .build()
            .map_err(|e| ConfigError::ClientBuildFailed { source: e })?;

        Ok(Self {
            client,
            base_url: config.base_url().to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}{}", self.base_url, endpoint)
    }

    /// 检查服务是否存活，返回服务端给出的状态文本
    pub async fn health(&self) -> Result<String, ApiError> {
        let response = self
            .client
            .get(self.url(HEALTH_ENDPOINT))
            .send()
            .await
            .map_err(|e| transport(HEALTH_ENDPOINT, e))?;

        let body: HealthResponse = read_json(HEALTH_ENDPOINT, response).await?;
        Ok(body.status)
    }

    /// 发送 multipart 请求并解析 JSON 响应
    async fn post_multipart<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        payload: &MultipartPayload,
    ) -> Result<T, ApiError> {
        debug!(
            "POST {} ({} 个字段)",
            self.url(endpoint),
            payload.parts().len()
        );

        let form = payload.to_form()?;
        let response = self
            .client
            .post(self.url(endpoint))
            .multipart(form)
            .send()
            .await
            .map_err(|e| transport(endpoint, e))?;

        read_json(endpoint, response).await
    }
}

impl GenerationService for HttpGenerationClient {
    async fn generate_question_paper(&self, payload: &MultipartPayload) -> Result<String, ApiError> {
        let body: QuestionPaperResponse =
            self.post_multipart(QUESTION_PAPER_ENDPOINT, payload).await?;
        require_text(QUESTION_PAPER_ENDPOINT, body.question_paper)
    }

    async fn generate_answer_key(&self, payload: &MultipartPayload) -> Result<String, ApiError> {
        let body: AnswerKeyResponse = self.post_multipart(ANSWER_KEY_ENDPOINT, payload).await?;
        require_text(ANSWER_KEY_ENDPOINT, body.answer_key)
    }
}

fn transport(endpoint: &str, source: reqwest::Error) -> ApiError {
    warn!("API请求失败 ({}): {}", endpoint, source);
    ApiError::Transport {
        endpoint: endpoint.to_string(),
        source,
    }
}

/// 读取响应体：非 2xx 转换为 `HttpStatus`，无法解析转换为 `MalformedResponse`
async fn read_json<T: DeserializeOwned>(endpoint: &str, response: Response) -> Result<T, ApiError> {
    let status = response.status();
    let body = response.text().await.map_err(|e| transport(endpoint, e))?;

    if !status.is_success() {
        let message = error_message(status, &body);
        warn!("API返回错误状态 ({}): HTTP {} {}", endpoint, status.as_u16(), message);
        return Err(ApiError::HttpStatus {
            endpoint: endpoint.to_string(),
            status: status.as_u16(),
            message,
        });
    }

    serde_json::from_str(&body).map_err(|e| ApiError::MalformedResponse {
        endpoint: endpoint.to_string(),
        detail: format!("{} (响应: {})", e, truncate_text(&body, ERROR_BODY_PREVIEW)),
    })
}

/// 从错误响应中提取可读信息
fn error_message(status: StatusCode, body: &str) -> String {
    if let Ok(parsed) = serde_json::from_str::<ErrorResponse>(body) {
        if let Some(message) = parsed.message() {
            return truncate_text(&message, ERROR_BODY_PREVIEW);
        }
    }

    let trimmed = body.trim();
    if trimmed.is_empty() {
        status.canonical_reason().unwrap_or("未知错误").to_string()
    } else {
        truncate_text(trimmed, ERROR_BODY_PREVIEW)
    }
}

fn require_text(endpoint: &str, text: String) -> Result<String, ApiError> {
    if text.trim().is_empty() {
        return Err(ApiError::EmptyResponse {
            endpoint: endpoint.to_string(),
        });
    }
    Ok(text)
}
