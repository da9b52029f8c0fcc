pub mod difficulty;
pub mod exam_request;
pub mod field_model;
pub mod generation;
pub mod loaders;

pub use difficulty::Difficulty;
pub use exam_request::ExamRequest;
pub use field_model::{Attachment, FieldModel, FieldName, PDF_MIME_TYPE};
pub use generation::GenerationResult;
pub use loaders::{load_exam_request, load_toml_to_field_model};
