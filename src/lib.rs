//! # Exam Paper Generator
//!
//! 根据用户填写的试卷需求，调用远程生成服务得到试卷，再以试卷为输入生成答案
//!
//! ## 架构设计
//!
//! ### ① 模型层（Models）
//! - `models/` - 表单模型与服务响应结构
//! - `FieldModel` - 用户输入、规范化与校验
//! - `loaders` - 从 TOML 需求文件构建表单
//!
//! ### ② 业务能力层（Services / Clients）
//! - `services/PayloadEncoder` - 把表单快照编码为 multipart 请求体
//! - `clients/HttpGenerationClient` - 调用生成服务的两个接口
//!
//! ### ③ 流程层（Workflow）
//! - `GenerationPipeline` - 两阶段流水线（试卷 → 答案）
//! - `PipelineState` - 可观察的显式状态
//!
//! ### ④ 展示与编排（Presentation / App）
//! - `presentation/` - 只读订阅状态的渲染器，可替换
//! - `App` / `cli` - 组装并运行

pub mod app;
pub mod cli;
pub mod clients;
pub mod config;
pub mod error;
pub mod models;
pub mod presentation;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use app::App;
pub use clients::{GenerationService, HttpGenerationClient};
pub use config::Config;
pub use error::{ApiError, AppError, AppResult, PipelineBusy};
pub use models::{Attachment, Difficulty, FieldModel, FieldName, GenerationResult};
pub use services::{MultipartPayload, PayloadEncoder};
pub use workflow::{GenerationPipeline, PipelineState, Stage, StateObserver};
