pub mod payload_encoder;

pub use payload_encoder::{
    MultipartPayload, PartValue, PayloadEncoder, PayloadPart, ATTACHMENT_PART,
    QUESTION_PAPER_PART,
};
