pub mod toml_loader;

pub use toml_loader::{load_attachment, load_exam_request, load_toml_to_field_model};
