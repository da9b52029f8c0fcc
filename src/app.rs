use crate::clients::HttpGenerationClient;
use crate::config::Config;
use crate::models::loaders::load_toml_to_field_model;
use crate::presentation::{render_result, ConsoleRenderer};
use crate::utils::logging::log_startup;
use crate::workflow::{GenerationPipeline, PipelineState, Stage};
use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// 应用主结构
///
/// 负责组装配置、客户端、流水线与展示层
pub struct App {
    config: Config,
    pipeline: GenerationPipeline<HttpGenerationClient>,
}

impl App {
    /// 初始化应用
    pub fn initialize(config: Config) -> Result<Self> {
        log_startup(&config);

        let client = HttpGenerationClient::new(&config).context("无法创建生成服务客户端")?;
        let renderer = Arc::new(ConsoleRenderer::new(config.verbose_logging));
        let pipeline = GenerationPipeline::new(client).with_observer(renderer);

        Ok(Self { config, pipeline })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// 根据需求文件生成试卷和答案，结果输出到标准输出
    ///
    /// 答案生成失败时仍会先输出已生成的试卷，然后返回错误
    pub async fn generate(&self, request_path: &Path, pdf_override: Option<&Path>) -> Result<()> {
        info!("📁 正在读取需求文件: {}", request_path.display());
        let model = load_toml_to_field_model(request_path, pdf_override).await?;

        let final_state = self.pipeline.submit(&model).await?;

        if let Some(output) = render_result(&final_state) {
            println!("{}", output);
        }

        match final_state {
            PipelineState::Complete { .. } => Ok(()),
            PipelineState::Failed {
                stage: Stage::Validation,
                message,
                ..
            } => anyhow::bail!("需求文件不完整: {}", message),
            PipelineState::Failed { stage, message, .. } => {
                anyhow::bail!("{} 失败: {}", stage, message)
            }
            other => anyhow::bail!("生成流程意外结束于状态: {}", other),
        }
    }

    /// 检查生成服务是否可用
    pub async fn health(&self) -> Result<()> {
        let status = self
            .pipeline
            .service()
            .health()
            .await
            .with_context(|| format!("生成服务不可用: {}", self.config.base_url()))?;
        info!("✓ 生成服务在线: {}", status);
        println!("{}", status);
        Ok(())
    }
}
