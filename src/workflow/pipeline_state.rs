//! 生成流水线状态
//!
//! 每次提交对应一个完整周期：
//! `Idle → Running(1) → PartialResult → Running(2) → Complete`，
//! 任一阶段失败则进入 `Failed`

use std::fmt::Display;

use crate::models::generation::GenerationResult;

/// 流水线阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// 提交前的表单校验（不发请求）
    Validation,
    /// 第一阶段：生成试卷
    QuestionPaper,
    /// 第二阶段：生成答案
    AnswerKey,
}

impl Stage {
    /// 阶段编号：0 = 校验, 1 = 试卷, 2 = 答案
    pub fn number(self) -> u8 {
        match self {
            Stage::Validation => 0,
            Stage::QuestionPaper => 1,
            Stage::AnswerKey => 2,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Stage::Validation => "表单校验",
            Stage::QuestionPaper => "生成试卷",
            Stage::AnswerKey => "生成答案",
        }
    }
}

impl Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "阶段 {} ({})", self.number(), self.name())
    }
}

/// 流水线状态
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum PipelineState {
    #[default]
    Idle,
    /// 正在等待某个阶段的响应
    Running { stage: Stage },
    /// 试卷已生成，答案尚未完成
    PartialResult { question_paper: String },
    Complete {
        question_paper: String,
        answer_key: String,
    },
    /// 失败；若第二阶段失败，已生成的试卷仍保留在 `question_paper` 中
    Failed {
        stage: Stage,
        message: String,
        question_paper: Option<String>,
    },
}

impl PipelineState {
    pub fn is_running(&self) -> bool {
        matches!(self, PipelineState::Running { .. })
    }

    /// `Complete` 与 `Failed` 是一个周期的终点
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            PipelineState::Complete { .. } | PipelineState::Failed { .. }
        )
    }

    pub fn running_stage(&self) -> Option<Stage> {
        match self {
            PipelineState::Running { stage } => Some(*stage),
            _ => None,
        }
    }

    pub fn failed_stage(&self) -> Option<Stage> {
        match self {
            PipelineState::Failed { stage, .. } => Some(*stage),
            _ => None,
        }
    }

    pub fn question_paper(&self) -> Option<&str> {
        match self {
            PipelineState::PartialResult { question_paper }
            | PipelineState::Complete { question_paper, .. } => Some(question_paper),
            PipelineState::Failed { question_paper, .. } => question_paper.as_deref(),
            _ => None,
        }
    }

    pub fn answer_key(&self) -> Option<&str> {
        match self {
            PipelineState::Complete { answer_key, .. } => Some(answer_key),
            _ => None,
        }
    }

    /// 当前已获得的结果（包括部分结果）
    pub fn result(&self) -> Option<GenerationResult> {
        self.question_paper().map(|paper| GenerationResult {
            question_paper: paper.to_string(),
            answer_key: self.answer_key().map(str::to_string),
        })
    }
}

impl Display for PipelineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PipelineState::Idle => write!(f, "空闲"),
            PipelineState::Running { stage } => write!(f, "进行中: {}", stage),
            PipelineState::PartialResult { .. } => write!(f, "试卷已生成，等待答案"),
            PipelineState::Complete { .. } => write!(f, "已完成"),
            PipelineState::Failed { stage, message, .. } => {
                write!(f, "失败 [{}]: {}", stage, message)
            }
        }
    }
}
