//! 试卷生成流水线 - 流程层
//!
//! 核心职责：按顺序驱动两次远程调用，并对外发布状态
//!
//! 流程顺序：
//! 1. 校验表单 → 编码请求体（快照）
//! 2. 生成试卷
//! 3. 以试卷正文为输入生成答案
//!
//! 第二阶段只会在第一阶段成功之后发起；运行中的再次提交会被拒绝，不会排队。

use std::collections::VecDeque;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::clients::generation_client::GenerationService;
use crate::error::{ApiError, PipelineBusy};
use crate::models::field_model::FieldModel;
use crate::services::payload_encoder::{MultipartPayload, PayloadEncoder};
use crate::utils::logging::truncate_text;
use crate::workflow::pipeline_state::{PipelineState, Stage};

// 调用方丢弃进行中的提交时写入的失败信息
const CANCELLED_MESSAGE: &str = "请求已取消";

/// 状态观察者
///
/// 每次状态变化都会按写入顺序同步回调，观察者只能读取状态。
///
/// 回调中可以再次调用流水线（例如重新提交），由此产生的新状态会排在当前状态之后投递；
/// 多线程同时写入时，回调可能由另一个线程代为投递。
pub trait StateObserver: Send + Sync {
    fn on_state_change(&self, state: &PipelineState);
}

/// 试卷生成流水线
///
/// - 持有生成服务与当前状态
/// - 不持有表单，提交时对表单做快照
/// - 通过 `subscribe` 或 `StateObserver` 暴露状态
pub struct GenerationPipeline<S> {
    service: S,
    state: watch::Sender<PipelineState>,
    observers: Vec<Arc<dyn StateObserver>>,
    delivery: Mutex<Delivery>,
}

/// 待投递给观察者的状态
///
/// 所有状态写入都在这把锁内完成，并按写入顺序入队
#[derive(Default)]
struct Delivery {
    pending: VecDeque<PipelineState>,
    draining: bool,
}

impl<S: GenerationService> GenerationPipeline<S> {
    /// 创建新的流水线，初始状态为 `Idle`
    pub fn new(service: S) -> Self {
        let (state, _) = watch::channel(PipelineState::Idle);
        Self {
            service,
            state,
            observers: Vec::new(),
            delivery: Mutex::new(Delivery::default()),
        }
    }

    /// 注册状态观察者
    pub fn with_observer(mut self, observer: Arc<dyn StateObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    pub fn service(&self) -> &S {
        &self.service
    }

    /// 订阅最新状态
    ///
    /// `watch` 只保留最新值：接收端可能跳过中间状态（例如新周期开头的 `Idle`），
    /// 需要完整历史时使用 `StateObserver`
    pub fn subscribe(&self) -> watch::Receiver<PipelineState> {
        self.state.subscribe()
    }

    /// 当前状态的副本
    pub fn state(&self) -> PipelineState {
        self.state.borrow().clone()
    }

    pub fn is_busy(&self) -> bool {
        self.state.borrow().is_running()
    }

    /// 清除上一次的结果，回到 `Idle`
    pub fn reset(&self) -> Result<(), PipelineBusy> {
        self.claim(PipelineState::Idle)
    }

    /// 提交表单，运行一个完整的生成周期
    ///
    /// 调用时立即完成校验、编码与忙碌检查，返回的 future 不再引用表单，
    /// 因此请求进行中用户仍可继续编辑表单，已发出的请求不受影响。
    ///
    /// # 返回
    /// - `Ok(state)`: 本次周期的终态（`Complete` 或 `Failed`）
    /// - `Err(PipelineBusy)`: 已有周期在运行，本次提交被忽略
    pub fn submit(
        &self,
        model: &FieldModel,
    ) -> impl Future<Output = Result<PipelineState, PipelineBusy>> + '_ {
        let started = self.start_cycle(model);

        async move {
            let (payload, mut cycle) = match started {
                Err(busy) => return Err(busy),
                Ok(CycleStart::Invalid(state)) => return Ok(state),
                Ok(CycleStart::Started { payload, cycle }) => (payload, cycle),
            };

            let final_state = self.run_stages(&payload, &mut cycle).await;
            cycle.armed = false;
            Ok(final_state)
        }
    }

    /// 校验并编码表单快照，然后占用流水线
    fn start_cycle(&self, model: &FieldModel) -> Result<CycleStart<'_, S>, PipelineBusy> {
        let prepared = model.validate().map(|()| PayloadEncoder::encode(model));

        let first = match &prepared {
            Ok(_) => PipelineState::Running {
                stage: Stage::QuestionPaper,
            },
            Err(errors) => PipelineState::Failed {
                stage: Stage::Validation,
                message: errors.to_string(),
                question_paper: None,
            },
        };
        self.claim(first.clone())?;

        let payload = match prepared {
            Ok(payload) => payload,
            Err(errors) => {
                warn!("⚠️ 表单校验失败，未发送请求: {}", errors);
                return Ok(CycleStart::Invalid(first));
            }
        };

        info!(
            "🚀 开始生成试卷: {} / {} (难度: {})",
            model.standard,
            model.subject_name,
            model.difficulty.name()
        );

        Ok(CycleStart::Started {
            payload,
            cycle: CycleGuard {
                pipeline: self,
                stage: Stage::QuestionPaper,
                question_paper: None,
                armed: true,
            },
        })
    }

    async fn run_stages(
        &self,
        payload: &MultipartPayload,
        cycle: &mut CycleGuard<'_, S>,
    ) -> PipelineState {
        // ========== 阶段 1: 生成试卷 ==========
        let question_paper = match self.service.generate_question_paper(payload).await {
            Ok(text) => text,
            Err(e) => return self.fail(Stage::QuestionPaper, &e, None),
        };

        info!("✓ 试卷生成完成 ({} 字符)", question_paper.chars().count());
        debug!("试卷预览: {}", truncate_text(&question_paper, 80));

        self.transition(PipelineState::PartialResult {
            question_paper: question_paper.clone(),
        });

        // ========== 阶段 2: 生成答案 ==========
        let answer_payload = PayloadEncoder::encode_answer_key_request(&question_paper);
        cycle.stage = Stage::AnswerKey;
        cycle.question_paper = Some(question_paper.clone());
        self.transition(PipelineState::Running {
            stage: Stage::AnswerKey,
        });
        info!("📝 正在根据试卷生成答案...");

        match self.service.generate_answer_key(&answer_payload).await {
            Ok(answer_key) => {
                info!("✓ 答案生成完成 ({} 字符)", answer_key.chars().count());
                self.transition(PipelineState::Complete {
                    question_paper,
                    answer_key,
                })
            }
            Err(e) => self.fail(Stage::AnswerKey, &e, Some(question_paper)),
        }
    }

    /// 检查忙碌并写入新状态，二者在同一把锁内完成
    fn claim(&self, next: PipelineState) -> Result<(), PipelineBusy> {
        let mut delivery = self.lock_delivery();

        let running = self.state.borrow().running_stage();
        if let Some(stage) = running {
            drop(delivery);
            warn!("⚠️ 流水线正忙 ({})，忽略本次提交", stage);
            return Err(PipelineBusy { stage });
        }

        // 新周期从 Idle 开始，上一次的结果被丢弃
        if next != PipelineState::Idle {
            self.publish(&mut delivery, PipelineState::Idle);
        }
        self.publish(&mut delivery, next);
        self.deliver(delivery);
        Ok(())
    }

    fn transition(&self, next: PipelineState) -> PipelineState {
        debug!("状态变更: {}", next);
        let mut delivery = self.lock_delivery();
        self.publish(&mut delivery, next.clone());
        self.deliver(delivery);
        next
    }

    fn fail(&self, stage: Stage, err: &ApiError, question_paper: Option<String>) -> PipelineState {
        error!("❌ {} 失败: {}", stage, err);
        self.transition(PipelineState::Failed {
            stage,
            message: err.to_string(),
            question_paper,
        })
    }

    fn lock_delivery(&self) -> MutexGuard<'_, Delivery> {
        self.delivery.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // 调用方必须持有 delivery 锁
    fn publish(&self, delivery: &mut Delivery, next: PipelineState) {
        self.state.send_replace(next.clone());
        delivery.pending.push_back(next);
    }

    /// 按入队顺序回调观察者，回调期间不持有锁
    ///
    /// 已有调用方在投递时直接返回，新状态由它继续投递
    fn deliver<'a>(&'a self, mut delivery: MutexGuard<'a, Delivery>) {
        if delivery.draining {
            return;
        }
        delivery.draining = true;
        while let Some(state) = delivery.pending.pop_front() {
            drop(delivery);
            self.notify(&state);
            delivery = self.lock_delivery();
        }
        delivery.draining = false;
    }

    fn notify(&self, state: &PipelineState) {
        for observer in &self.observers {
            observer.on_state_change(state);
        }
    }
}

enum CycleStart<'a, S: GenerationService> {
    /// 校验失败，周期已直接结束
    Invalid(PipelineState),
    Started {
        payload: MultipartPayload,
        cycle: CycleGuard<'a, S>,
    },
}

/// 运行中的周期
///
/// 若提交的 future 在完成前（包括从未被 poll）被丢弃，则把状态收尾为 `Failed`，避免流水线一直处于忙碌
struct CycleGuard<'a, S: GenerationService> {
    pipeline: &'a GenerationPipeline<S>,
    stage: Stage,
    question_paper: Option<String>,
    armed: bool,
}

impl<S: GenerationService> Drop for CycleGuard<'_, S> {
    fn drop(&mut self) {
        if self.armed {
            warn!("⚠️ {} 尚未完成，提交已被取消", self.stage);
            self.pipeline.transition(PipelineState::Failed {
                stage: self.stage,
                message: CANCELLED_MESSAGE.to_string(),
                question_paper: self.question_paper.take(),
            });
        }
    }
}
