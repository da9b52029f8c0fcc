use crate::error::ConfigError;

/// 程序配置
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    /// 生成服务的根地址
    pub api_base_url: String,
    /// 单次请求超时（秒），`None` 表示一直等待
    pub request_timeout_secs: Option<u64>,
    /// 是否显示详细日志
    pub verbose_logging: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:8000".to_string(),
            request_timeout_secs: None,
            verbose_logging: false,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            api_base_url: std::env::var("GENERATOR_API_URL").unwrap_or(default.api_base_url),
            request_timeout_secs: std::env::var("GENERATOR_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|secs: &u64| *secs > 0)
                .or(default.request_timeout_secs),
            verbose_logging: std::env::var("VERBOSE_LOGGING")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.verbose_logging),
        }
    }

    /// 去掉末尾斜杠后的根地址
    pub fn base_url(&self) -> &str {
        self.api_base_url.trim_end_matches('/')
    }

    /// 检查根地址是否为 http(s) URL
    pub fn validate(&self) -> Result<(), ConfigError> {
        let valid = reqwest::Url::parse(self.base_url())
            .map(|url| matches!(url.scheme(), "http" | "https") && url.host_str().is_some())
            .unwrap_or(false);
        if valid {
            Ok(())
        } else {
            Err(ConfigError::InvalidBaseUrl {
                url: self.api_base_url.clone(),
            })
        }
    }
}
