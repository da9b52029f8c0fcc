pub mod generation_client;

pub use generation_client::{
    GenerationService, HttpGenerationClient, ANSWER_KEY_ENDPOINT, HEALTH_ENDPOINT,
    QUESTION_PAPER_ENDPOINT,
};
