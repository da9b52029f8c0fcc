//! 控制台展示
//!
//! 只读取流水线状态并输出，不修改表单或状态

use std::sync::Mutex;
use std::time::Instant;

use tracing::{error, info, warn};

use crate::utils::logging::truncate_text;
use crate::workflow::{PipelineState, Stage, StateObserver};

/// 控制台渲染器
///
/// 作为观察者记录状态变化，并负责把终态格式化为输出文本
#[derive(Default)]
pub struct ConsoleRenderer {
    verbose: bool,
    stage_started: Mutex<Option<Instant>>,
}

impl ConsoleRenderer {
    pub fn new(verbose: bool) -> Self {
        Self {
            verbose,
            stage_started: Mutex::new(None),
        }
    }

    /// 距离当前阶段开始的秒数
    fn elapsed_secs(&self) -> Option<f64> {
        self.stage_started
            .lock()
            .ok()
            .and_then(|started| started.map(|t| t.elapsed().as_secs_f64()))
    }

    fn mark_stage_start(&self) {
        if let Ok(mut started) = self.stage_started.lock() {
            *started = Some(Instant::now());
        }
    }
}

impl StateObserver for ConsoleRenderer {
    fn on_state_change(&self, state: &PipelineState) {
        match state {
            PipelineState::Idle => {}
            PipelineState::Running { stage } => {
                self.mark_stage_start();
                let icon = match stage {
                    Stage::AnswerKey => "📝",
                    _ => "⏳",
                };
                info!("{} {} 进行中...", icon, stage);
            }
            PipelineState::PartialResult { question_paper } => {
                let secs = self.elapsed_secs().unwrap_or_default();
                info!("✓ 试卷已生成，耗时 {:.1} 秒", secs);
                if self.verbose {
                    info!("试卷预览: {}", truncate_text(question_paper, 120));
                }
            }
            PipelineState::Complete { .. } => {
                let secs = self.elapsed_secs().unwrap_or_default();
                info!("✅ 试卷与答案均已生成，答案耗时 {:.1} 秒", secs);
            }
            PipelineState::Failed {
                stage: Stage::Validation,
                message,
                ..
            } => {
                warn!("⚠️ 请先完善表单: {}", message);
            }
            PipelineState::Failed {
                stage,
                message,
                question_paper,
            } => {
                error!("❌ {} 失败: {}", stage, message);
                if question_paper.is_some() {
                    warn!("⚠️ 已生成的试卷仍然保留，可重新提交以再次生成答案");
                }
            }
        }
    }
}

/// 把状态中已有的结果格式化为输出文本（Markdown 原样输出）
pub fn render_result(state: &PipelineState) -> Option<String> {
    let result = state.result()?;

    let mut output = String::new();
    output.push_str("# 试卷\n\n");
    output.push_str(result.question_paper.trim_end());
    output.push('\n');

    if let Some(answer_key) = &result.answer_key {
        output.push_str("\n# 答案\n\n");
        output.push_str(answer_key.trim_end());
        output.push('\n');
    }

    Some(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_complete_result() {
        let state = PipelineState::Complete {
            question_paper: "Q1...\n".to_string(),
            answer_key: "A1...".to_string(),
        };
        let text = render_result(&state).unwrap();
        assert_eq!(text, "# 试卷\n\nQ1...\n\n# 答案\n\nA1...\n");
    }

    #[test]
    fn test_render_partial_failure_shows_paper_only() {
        let state = PipelineState::Failed {
            stage: Stage::AnswerKey,
            message: "HTTP 502".to_string(),
            question_paper: Some("Q1...".to_string()),
        };
        let text = render_result(&state).unwrap();
        assert!(text.contains("Q1..."));
        assert!(!text.contains("# 答案"));
    }

    #[test]
    fn test_render_nothing_before_stage_one() {
        assert_eq!(render_result(&PipelineState::Idle), None);
        let failed = PipelineState::Failed {
            stage: Stage::QuestionPaper,
            message: "connection refused".to_string(),
            question_paper: None,
        };
        assert_eq!(render_result(&failed), None);
    }

    #[test]
    fn test_renderer_handles_every_state() {
        let renderer = ConsoleRenderer::new(true);
        for state in [
            PipelineState::Idle,
            PipelineState::Running {
                stage: Stage::QuestionPaper,
            },
            PipelineState::PartialResult {
                question_paper: "Q".to_string(),
            },
            PipelineState::Complete {
                question_paper: "Q".to_string(),
                answer_key: "A".to_string(),
            },
        ] {
            renderer.on_state_change(&state);
        }
        assert!(renderer.elapsed_secs().is_some());
    }
}
