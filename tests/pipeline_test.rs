use exam_paper_generator::clients::{ANSWER_KEY_ENDPOINT, QUESTION_PAPER_ENDPOINT};
use exam_paper_generator::error::{ApiError, PipelineBusy};
use exam_paper_generator::services::{MultipartPayload, ATTACHMENT_PART, QUESTION_PAPER_PART};
use exam_paper_generator::{
    FieldModel, FieldName, GenerationPipeline, GenerationService, PipelineState, Stage,
    StateObserver,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, OnceLock, Weak};
use tokio::sync::Notify;
use tokio_test::{assert_pending, assert_ready};

// ========== 测试替身 ==========

/// 预设的服务响应
#[derive(Clone, Debug)]
enum Reply {
    Text(&'static str),
    Status(u16, &'static str),
    Malformed,
}

impl Reply {
    fn into_result(self, endpoint: &str) -> Result<String, ApiError> {
        match self {
            Reply::Text(text) => Ok(text.to_string()),
            Reply::Status(status, message) => Err(ApiError::HttpStatus {
                endpoint: endpoint.to_string(),
                status,
                message: message.to_string(),
            }),
            Reply::Malformed => Err(ApiError::MalformedResponse {
                endpoint: endpoint.to_string(),
                detail: "missing field".to_string(),
            }),
        }
    }
}

#[derive(Clone, Debug)]
enum Call {
    QuestionPaper(MultipartPayload),
    AnswerKey(MultipartPayload),
}

struct MockInner {
    paper_reply: Mutex<Reply>,
    answer_reply: Mutex<Reply>,
    calls: Mutex<Vec<Call>>,
    paper_gate: Option<Arc<Notify>>,
}

/// 内存中的生成服务，记录每一次调用
#[derive(Clone)]
struct MockService {
    inner: Arc<MockInner>,
}

impl MockService {
    fn new(paper: Reply, answer: Reply) -> Self {
        Self::build(paper, answer, None)
    }

    /// 第一阶段会等待 `gate` 放行
    fn gated(paper: Reply, answer: Reply, gate: Arc<Notify>) -> Self {
        Self::build(paper, answer, Some(gate))
    }

    fn build(paper: Reply, answer: Reply, paper_gate: Option<Arc<Notify>>) -> Self {
        Self {
            inner: Arc::new(MockInner {
                paper_reply: Mutex::new(paper),
                answer_reply: Mutex::new(answer),
                calls: Mutex::new(Vec::new()),
                paper_gate,
            }),
        }
    }

    fn set_answer_reply(&self, reply: Reply) {
        *self.inner.answer_reply.lock().unwrap() = reply;
    }

    fn calls(&self) -> Vec<Call> {
        self.inner.calls.lock().unwrap().clone()
    }
}

impl GenerationService for MockService {
    async fn generate_question_paper(&self, payload: &MultipartPayload) -> Result<String, ApiError> {
        self.inner
            .calls
            .lock()
            .unwrap()
            .push(Call::QuestionPaper(payload.clone()));
        if let Some(gate) = &self.inner.paper_gate {
            gate.notified().await;
        }
        let reply = self.inner.paper_reply.lock().unwrap().clone();
        reply.into_result(QUESTION_PAPER_ENDPOINT)
    }

    async fn generate_answer_key(&self, payload: &MultipartPayload) -> Result<String, ApiError> {
        self.inner
            .calls
            .lock()
            .unwrap()
            .push(Call::AnswerKey(payload.clone()));
        let reply = self.inner.answer_reply.lock().unwrap().clone();
        reply.into_result(ANSWER_KEY_ENDPOINT)
    }
}

/// 记录所有状态变化的观察者
#[derive(Default)]
struct Recorder {
    states: Mutex<Vec<PipelineState>>,
}

impl Recorder {
    fn states(&self) -> Vec<PipelineState> {
        self.states.lock().unwrap().clone()
    }
}

impl StateObserver for Recorder {
    fn on_state_change(&self, state: &PipelineState) {
        self.states.lock().unwrap().push(state.clone());
    }
}

/// 第一次看到 `Complete` 时立即重新提交，随后丢弃该提交
#[derive(Default)]
struct Resubmitter {
    pipeline: OnceLock<Weak<GenerationPipeline<MockService>>>,
    fired: AtomicBool,
}

impl StateObserver for Resubmitter {
    fn on_state_change(&self, state: &PipelineState) {
        if !matches!(state, PipelineState::Complete { .. }) || self.fired.swap(true, Ordering::SeqCst)
        {
            return;
        }
        if let Some(pipeline) = self.pipeline.get().and_then(Weak::upgrade) {
            let resubmitted = pipeline.submit(&scenario_model());
            drop(resubmitted);
        }
    }
}

fn scenario_model() -> FieldModel {
    let mut model = FieldModel::new();
    model.update(FieldName::Standard, "Class 10").unwrap();
    model.update(FieldName::SubjectName, "Physics").unwrap();
    model.update(FieldName::Difficulty, "Medium").unwrap();
    model.update(FieldName::CountOfMcqs, "5").unwrap();
    model.update(FieldName::CountOfShort, "3").unwrap();
    model.update(FieldName::CountOfLong, "2").unwrap();
    model
}

fn running(stage: Stage) -> PipelineState {
    PipelineState::Running { stage }
}

// ========== 测试用例 ==========

#[tokio::test]
async fn test_full_cycle_scenario() {
    let service = MockService::new(Reply::Text("Q1..."), Reply::Text("A1..."));
    let recorder = Arc::new(Recorder::default());
    let pipeline = GenerationPipeline::new(service.clone()).with_observer(recorder.clone());
    assert_eq!(pipeline.state(), PipelineState::Idle);

    let final_state = pipeline.submit(&scenario_model()).await.unwrap();

    let expected = PipelineState::Complete {
        question_paper: "Q1...".to_string(),
        answer_key: "A1...".to_string(),
    };
    assert_eq!(final_state, expected);
    assert_eq!(pipeline.state(), expected);

    assert_eq!(
        recorder.states(),
        vec![
            PipelineState::Idle,
            running(Stage::QuestionPaper),
            PipelineState::PartialResult {
                question_paper: "Q1...".to_string()
            },
            running(Stage::AnswerKey),
            expected,
        ]
    );

    let calls = service.calls();
    assert_eq!(calls.len(), 2);
    match &calls[0] {
        Call::QuestionPaper(payload) => {
            assert_eq!(payload.text_part_count(), 6);
            assert_eq!(payload.file_part_count(), 0);
            assert!(!payload.contains(ATTACHMENT_PART));
            assert_eq!(payload.text("Standard"), Some("Class 10"));
            assert_eq!(payload.text("countOfMCQs"), Some("5"));
        }
        other => panic!("first call should be stage 1, got {:?}", other),
    }
    match &calls[1] {
        Call::AnswerKey(payload) => {
            assert_eq!(payload.parts().len(), 1);
            assert_eq!(payload.text(QUESTION_PAPER_PART), Some("Q1..."));
        }
        other => panic!("second call should be stage 2, got {:?}", other),
    }
}

#[tokio::test]
async fn test_validation_failure_makes_no_calls() {
    let service = MockService::new(Reply::Text("Q1..."), Reply::Text("A1..."));
    let pipeline = GenerationPipeline::new(service.clone());

    let mut model = scenario_model();
    model.update(FieldName::Standard, "   ").unwrap();

    let final_state = pipeline.submit(&model).await.unwrap();
    match &final_state {
        PipelineState::Failed {
            stage,
            message,
            question_paper,
        } => {
            assert_eq!(*stage, Stage::Validation);
            assert_eq!(stage.number(), 0);
            assert!(message.contains("Standard"));
            assert!(question_paper.is_none());
        }
        other => panic!("expected validation failure, got {:?}", other),
    }
    assert!(service.calls().is_empty());
    assert!(!pipeline.is_busy());
}

#[tokio::test]
async fn test_stage_one_failure_skips_stage_two() {
    let service = MockService::new(Reply::Status(500, "model crashed"), Reply::Text("A1..."));
    let pipeline = GenerationPipeline::new(service.clone());

    let final_state = pipeline.submit(&scenario_model()).await.unwrap();

    assert_eq!(final_state.failed_stage(), Some(Stage::QuestionPaper));
    assert_eq!(final_state.question_paper(), None);
    assert_eq!(final_state.answer_key(), None);
    if let PipelineState::Failed { message, .. } = &final_state {
        assert!(message.contains("HTTP 500"));
        assert!(message.contains("model crashed"));
    }

    let calls = service.calls();
    assert_eq!(calls.len(), 1);
    assert!(matches!(calls[0], Call::QuestionPaper(_)));
}

#[tokio::test]
async fn test_stage_two_failure_keeps_question_paper() {
    let service = MockService::new(Reply::Text("Q1..."), Reply::Malformed);
    let recorder = Arc::new(Recorder::default());
    let pipeline = GenerationPipeline::new(service.clone()).with_observer(recorder.clone());

    let final_state = pipeline.submit(&scenario_model()).await.unwrap();

    assert_eq!(final_state.failed_stage(), Some(Stage::AnswerKey));
    assert_eq!(final_state.question_paper(), Some("Q1..."));
    assert_eq!(final_state.answer_key(), None);

    let result = final_state.result().unwrap();
    assert_eq!(result.question_paper, "Q1...");
    assert!(!result.is_complete());

    // 部分结果在失败前已经发布
    assert!(recorder.states().contains(&PipelineState::PartialResult {
        question_paper: "Q1...".to_string()
    }));
}

#[tokio::test]
async fn test_resubmit_restarts_from_stage_one() {
    let service = MockService::new(Reply::Text("Q1..."), Reply::Status(502, "bad gateway"));
    let pipeline = GenerationPipeline::new(service.clone());
    let model = scenario_model();

    let first = pipeline.submit(&model).await.unwrap();
    assert_eq!(first.failed_stage(), Some(Stage::AnswerKey));

    service.set_answer_reply(Reply::Text("A1..."));
    let second = pipeline.submit(&model).await.unwrap();
    assert_eq!(second.answer_key(), Some("A1..."));

    let stages: Vec<&'static str> = service
        .calls()
        .iter()
        .map(|c| match c {
            Call::QuestionPaper(_) => "paper",
            Call::AnswerKey(_) => "answer",
        })
        .collect();
    assert_eq!(stages, vec!["paper", "answer", "paper", "answer"]);
}

#[test]
fn test_submit_while_running_is_rejected() {
    let gate = Arc::new(Notify::new());
    let service = MockService::gated(Reply::Text("Q1..."), Reply::Text("A1..."), gate.clone());
    let pipeline = GenerationPipeline::new(service.clone());
    let model = scenario_model();

    let mut first = tokio_test::task::spawn(pipeline.submit(&model));
    assert_pending!(first.poll());
    assert_eq!(pipeline.state(), running(Stage::QuestionPaper));
    assert!(pipeline.is_busy());

    let second = tokio_test::block_on(pipeline.submit(&model));
    assert_eq!(
        second,
        Err(PipelineBusy {
            stage: Stage::QuestionPaper
        })
    );
    assert!(pipeline.reset().is_err());

    gate.notify_one();
    assert!(first.is_woken());
    let final_state = assert_ready!(first.poll()).unwrap();
    assert_eq!(final_state.answer_key(), Some("A1..."));

    // 被拒绝的提交没有排队，只发生了一次完整周期
    assert_eq!(service.calls().len(), 2);
}

#[test]
fn test_edits_after_submit_do_not_change_payload() {
    let gate = Arc::new(Notify::new());
    let service = MockService::gated(Reply::Text("Q1..."), Reply::Text("A1..."), gate.clone());
    let pipeline = GenerationPipeline::new(service.clone());
    let mut model = scenario_model();

    let mut in_flight = tokio_test::task::spawn(pipeline.submit(&model));
    model.update(FieldName::SubjectName, "Chemistry").unwrap();
    model.update(FieldName::CountOfMcqs, "").unwrap();

    assert_pending!(in_flight.poll());
    gate.notify_one();
    let final_state = assert_ready!(in_flight.poll()).unwrap();
    assert!(final_state.is_terminal());

    match &service.calls()[0] {
        Call::QuestionPaper(payload) => {
            assert_eq!(payload.text("Subject_Name"), Some("Physics"));
            assert_eq!(payload.text("countOfMCQs"), Some("5"));
        }
        other => panic!("unexpected call {:?}", other),
    }
}

#[test]
fn test_dropped_submission_releases_pipeline() {
    let gate = Arc::new(Notify::new());
    let service = MockService::gated(Reply::Text("Q1..."), Reply::Text("A1..."), gate);
    let pipeline = GenerationPipeline::new(service);
    let model = scenario_model();

    let mut in_flight = tokio_test::task::spawn(pipeline.submit(&model));
    assert_pending!(in_flight.poll());
    drop(in_flight);

    let state = pipeline.state();
    assert_eq!(state.failed_stage(), Some(Stage::QuestionPaper));
    assert!(!pipeline.is_busy());
    assert!(pipeline.reset().is_ok());
    assert_eq!(pipeline.state(), PipelineState::Idle);
}

#[tokio::test]
async fn test_subscriber_sees_terminal_state() {
    let service = MockService::new(Reply::Text("Q1..."), Reply::Text("A1..."));
    let pipeline = GenerationPipeline::new(service);
    let mut receiver = pipeline.subscribe();

    pipeline.submit(&scenario_model()).await.unwrap();

    assert!(receiver.has_changed().unwrap());
    let latest = receiver.borrow_and_update().clone();
    assert_eq!(latest.answer_key(), Some("A1..."));
}

#[tokio::test]
async fn test_new_submit_discards_previous_result() {
    let service = MockService::new(Reply::Text("Q1..."), Reply::Text("A1..."));
    let recorder = Arc::new(Recorder::default());
    let pipeline = GenerationPipeline::new(service).with_observer(recorder.clone());

    pipeline.submit(&scenario_model()).await.unwrap();
    let invalid = pipeline.submit(&FieldModel::new()).await.unwrap();

    assert_eq!(invalid.failed_stage(), Some(Stage::Validation));
    assert_eq!(invalid.question_paper(), None);

    let states = recorder.states();
    let tail = &states[states.len() - 2..];
    assert_eq!(tail[0], PipelineState::Idle);
    assert_eq!(tail[1].failed_stage(), Some(Stage::Validation));
}

#[tokio::test]
async fn test_observers_see_states_in_write_order_when_resubmitting() {
    let service = MockService::new(Reply::Text("Q1..."), Reply::Text("A1..."));
    let resubmitter = Arc::new(Resubmitter::default());
    let recorder = Arc::new(Recorder::default());
    let pipeline = Arc::new(
        GenerationPipeline::new(service)
            .with_observer(resubmitter.clone())
            .with_observer(recorder.clone()),
    );
    resubmitter
        .pipeline
        .set(Arc::downgrade(&pipeline))
        .unwrap();
    let receiver = pipeline.subscribe();

    let final_state = pipeline.submit(&scenario_model()).await.unwrap();
    assert_eq!(final_state.answer_key(), Some("A1..."));

    let cancelled = PipelineState::Failed {
        stage: Stage::QuestionPaper,
        message: "请求已取消".to_string(),
        question_paper: None,
    };
    let states = recorder.states();
    assert_eq!(
        &states[states.len() - 4..],
        &[
            final_state,
            PipelineState::Idle,
            running(Stage::QuestionPaper),
            cancelled.clone(),
        ]
    );
    assert_eq!(states.last(), Some(&pipeline.state()));
    assert_eq!(*receiver.borrow(), cancelled);
    assert!(!pipeline.is_busy());
}
