//! 命令行入口
//!
//! 只负责解析参数并分发给 `App`，不包含业务逻辑

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};

use crate::app::App;
use crate::config::Config;
use crate::utils::logging;

#[derive(Parser, Debug)]
#[command(
    name = "exam-paper-generator",
    version,
    about = "根据需求生成试卷，并基于试卷生成答案"
)]
pub struct Cli {
    /// 生成服务根地址（覆盖 GENERATOR_API_URL）
    #[arg(long, global = true)]
    pub api_url: Option<String>,

    /// 单次请求超时秒数（覆盖 GENERATOR_TIMEOUT_SECS，默认不限）
    #[arg(long, global = true)]
    pub timeout: Option<u64>,

    /// 输出详细日志
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// 生成试卷和答案
    Generate(GenerateArgs),
    /// 检查生成服务是否在线
    Health,
}

#[derive(Args, Debug)]
pub struct GenerateArgs {
    /// 试卷需求 TOML 文件
    pub request: PathBuf,

    /// 参考资料 PDF（覆盖需求文件中的 reference_pdf）
    #[arg(long)]
    pub pdf: Option<PathBuf>,
}

impl Cli {
    /// 合并环境变量与命令行参数
    pub fn config(&self) -> Config {
        let mut config = Config::from_env();
        if let Some(url) = &self.api_url {
            config.api_base_url = url.clone();
        }
        if let Some(secs) = self.timeout.filter(|s| *s > 0) {
            config.request_timeout_secs = Some(secs);
        }
        config.verbose_logging |= self.verbose;
        config
    }

    pub async fn run(self) -> Result<()> {
        let config = self.config();
        logging::init(config.verbose_logging);

        let app = App::initialize(config)?;
        match self.command {
            Commands::Generate(args) => app.generate(&args.request, args.pdf.as_deref()).await,
            Commands::Health => app.health().await,
        }
    }
}
