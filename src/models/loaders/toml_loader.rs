use crate::error::{AppError, AppResult, FileError};
use crate::models::exam_request::ExamRequest;
use crate::models::field_model::{Attachment, FieldModel};
use std::path::{Path, PathBuf};
use tokio::fs;

/// 从 TOML 文件加载试卷需求
pub async fn load_exam_request(toml_file_path: &Path) -> AppResult<ExamRequest> {
    let content = fs::read_to_string(toml_file_path)
        .await
        .map_err(|e| AppError::file_read_failed(toml_file_path.display().to_string(), e))?;

    let request: ExamRequest =
        toml::from_str(&content).map_err(|e| FileError::TomlParseFailed {
            path: toml_file_path.display().to_string(),
            source: e,
        })?;

    Ok(request)
}

/// 从 TOML 文件加载试卷需求并转换为表单
///
/// # 参数
/// - `toml_file_path`: 需求文件路径
/// - `pdf_override`: 命令行指定的参考资料，优先于文件中的 `reference_pdf`
pub async fn load_toml_to_field_model(
    toml_file_path: &Path,
    pdf_override: Option<&Path>,
) -> AppResult<FieldModel> {
    let request = load_exam_request(toml_file_path).await?;

    let mut model = FieldModel::new();
    request.apply_to(&mut model)?;

    let pdf_path = match pdf_override {
        Some(path) => Some(path.to_path_buf()),
        None => request
            .reference_pdf
            .as_deref()
            .map(|p| resolve_relative(toml_file_path, p)),
    };

    if let Some(path) = pdf_path {
        let attachment = load_attachment(&path).await?;
        tracing::info!(
            "📎 已加载参考资料: {} ({} 字节)",
            attachment.file_name,
            attachment.len()
        );
        model.set_attachment(Some(attachment))?;
    }

    Ok(model)
}

/// 读取参考资料文件
pub async fn load_attachment(path: &Path) -> AppResult<Attachment> {
    let bytes = fs::read(path)
        .await
        .map_err(|e| AppError::file_read_failed(path.display().to_string(), e))?;
    Ok(Attachment::from_path_and_bytes(path, bytes))
}

fn resolve_relative(toml_file_path: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }
    toml_file_path
        .parent()
        .map(|dir| dir.join(path))
        .unwrap_or_else(|| path.to_path_buf())
}
