use thiserror::Error;

use crate::workflow::pipeline_state::Stage;

/// 应用程序错误类型
#[derive(Debug, Error)]
pub enum AppError {
    /// 表单校验错误
    #[error("表单校验失败: {0}")]
    Validation(#[from] ValidationErrors),
    /// 字段输入错误
    #[error("字段错误: {0}")]
    Field(#[from] FieldError),
    /// API 调用错误
    #[error("API错误: {0}")]
    Api(#[from] ApiError),
    /// 配置错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),
    /// 文件操作错误
    #[error("文件错误: {0}")]
    File(#[from] FileError),
    /// 流水线忙碌
    #[error(transparent)]
    Busy(#[from] PipelineBusy),
}

/// 单条校验失败
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// 年级/班级为空
    #[error("年级 (Standard) 不能为空")]
    MissingStandard,
    /// 科目为空
    #[error("科目 (Subject_Name) 不能为空")]
    MissingSubjectName,
}

/// 校验失败列表，至少包含一条
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationErrors(pub Vec<ValidationError>);

impl ValidationErrors {
    pub fn iter(&self) -> impl Iterator<Item = &ValidationError> {
        self.0.iter()
    }

    pub fn contains(&self, error: ValidationError) -> bool {
        self.0.contains(&error)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let messages: Vec<String> = self.0.iter().map(|e| e.to_string()).collect();
        write!(f, "{}", messages.join("; "))
    }
}

impl std::error::Error for ValidationErrors {}

/// 字段输入错误
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FieldError {
    /// 未知字段名
    #[error("未知字段: {name}")]
    UnknownField { name: String },
    /// 无法识别的难度
    #[error("无法识别的难度: '{value}' (可选: Easy / Medium / Hard)")]
    UnknownDifficulty { value: String },
    /// 附件不是 PDF
    #[error("参考资料必须是 PDF 文件 (application/pdf)，实际类型: {mime_type}")]
    AttachmentNotPdf { mime_type: String },
}

/// API 调用错误
#[derive(Debug, Error)]
pub enum ApiError {
    /// 网络请求失败（连接失败、超时等）
    #[error("API请求失败 ({endpoint}): {source}")]
    Transport {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },
    /// 服务返回非 2xx 状态码
    #[error("API返回错误状态 ({endpoint}): HTTP {status}: {message}")]
    HttpStatus {
        endpoint: String,
        status: u16,
        message: String,
    },
    /// 响应体不是预期的 JSON 结构
    #[error("API响应格式错误 ({endpoint}): {detail}")]
    MalformedResponse { endpoint: String, detail: String },
    /// 预期字段存在但内容为空
    #[error("API返回空结果: {endpoint}")]
    EmptyResponse { endpoint: String },
    /// 请求体构建失败
    #[error("请求体构建失败 (字段: {part}): {source}")]
    InvalidPayload {
        part: String,
        #[source]
        source: reqwest::Error,
    },
}

impl ApiError {
    /// 是否属于传输层错误（网络失败或非 2xx）
    pub fn is_transport(&self) -> bool {
        matches!(self, ApiError::Transport { .. } | ApiError::HttpStatus { .. })
    }

    /// 是否属于响应内容错误
    pub fn is_malformed(&self) -> bool {
        matches!(
            self,
            ApiError::MalformedResponse { .. } | ApiError::EmptyResponse { .. }
        )
    }
}

/// 流水线已有周期在运行，本次提交被拒绝
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("流水线正忙 ({stage})，请等待当前生成完成")]
pub struct PipelineBusy {
    pub stage: Stage,
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 接口地址不是合法的 http(s) URL
    #[error("接口地址无效: '{url}'")]
    InvalidBaseUrl { url: String },
    /// HTTP 客户端构建失败
    #[error("HTTP 客户端初始化失败: {source}")]
    ClientBuildFailed {
        #[source]
        source: reqwest::Error,
    },
}

/// 文件操作错误
#[derive(Debug, Error)]
pub enum FileError {
    /// 读取文件失败
    #[error("读取文件失败 ({path}): {source}")]
    ReadFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// TOML 解析失败
    #[error("TOML解析失败 ({path}): {source}")]
    TomlParseFailed {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}

// ========== 便捷构造函数 ==========

impl AppError {
    /// 创建文件读取错误
    pub fn file_read_failed(path: impl Into<String>, source: std::io::Error) -> Self {
        AppError::File(FileError::ReadFailed {
            path: path.into(),
            source,
        })
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;
