//! 试卷需求表单模型
//!
//! 保存用户在表单中填写的内容，负责输入规范化与提交前校验。
//! 本模块不做任何网络访问。

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use tracing::warn;

use crate::error::{FieldError, ValidationError, ValidationErrors};
use crate::models::difficulty::Difficulty;

/// PDF 的 MIME 类型
pub const PDF_MIME_TYPE: &str = "application/pdf";

/// 表单字段
///
/// `wire_name` 即发送给生成服务时使用的字段名
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldName {
    Standard,
    SubjectName,
    Difficulty,
    CountOfMcqs,
    CountOfShort,
    CountOfLong,
    UserDefinedNotes,
}

impl FieldName {
    /// 全部字段，顺序即编码顺序
    pub const ALL: [FieldName; 7] = [
        FieldName::Standard,
        FieldName::SubjectName,
        FieldName::Difficulty,
        FieldName::CountOfMcqs,
        FieldName::CountOfShort,
        FieldName::CountOfLong,
        FieldName::UserDefinedNotes,
    ];

    pub fn wire_name(self) -> &'static str {
        match self {
            FieldName::Standard => "Standard",
            FieldName::SubjectName => "Subject_Name",
            FieldName::Difficulty => "difficulty",
            FieldName::CountOfMcqs => "countOfMCQs",
            FieldName::CountOfShort => "countOfShort",
            FieldName::CountOfLong => "countOfLong",
            FieldName::UserDefinedNotes => "User_defined_notes",
        }
    }

    /// 是否为题目数量字段（需要解析成整数）
    pub fn is_count(self) -> bool {
        matches!(
            self,
            FieldName::CountOfMcqs | FieldName::CountOfShort | FieldName::CountOfLong
        )
    }
}

impl fmt::Display for FieldName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_name())
    }
}

impl FromStr for FieldName {
    type Err = FieldError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FieldName::ALL
            .into_iter()
            .find(|f| f.wire_name() == s)
            .ok_or_else(|| FieldError::UnknownField {
                name: s.to_string(),
            })
    }
}

/// 参考资料附件（单个 PDF 文件）
#[derive(Clone, PartialEq, Eq)]
pub struct Attachment {
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl Attachment {
    pub fn new(file_name: impl Into<String>, mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            mime_type: mime_type.into(),
            bytes,
        }
    }

    /// 根据文件扩展名推断 MIME 类型构建附件
    pub fn from_path_and_bytes(path: &Path, bytes: Vec<u8>) -> Self {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "reference.pdf".to_string());
        let is_pdf = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.eq_ignore_ascii_case("pdf"))
            .unwrap_or(false);
        let mime_type = if is_pdf {
            PDF_MIME_TYPE
        } else {
            "application/octet-stream"
        };
        Self::new(file_name, mime_type, bytes)
    }

    pub fn is_pdf(&self) -> bool {
        self.mime_type.eq_ignore_ascii_case(PDF_MIME_TYPE)
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

// 附件内容不输出到日志
impl fmt::Debug for Attachment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Attachment")
            .field("file_name", &self.file_name)
            .field("mime_type", &self.mime_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// 试卷需求表单
///
/// - 文本字段保存为去除首尾空白后的字符串
/// - 数量字段为 `None` 表示"未填写"，与 0 区分
/// - 用户可以在提交过程中继续编辑，已发出的请求不受影响
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldModel {
    pub standard: String,
    pub subject_name: String,
    pub difficulty: Difficulty,
    pub count_of_mcqs: Option<u32>,
    pub count_of_short: Option<u32>,
    pub count_of_long: Option<u32>,
    pub user_defined_notes: Option<String>,
    attachment: Option<Attachment>,
}

impl FieldModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// 更新单个字段
    ///
    /// 数量字段从文本解析为非负整数，无效或空文本视为未填写；
    /// 其余字段保存为去除首尾空白的字符串。
    ///
    /// # 返回
    /// 仅当难度无法识别时返回错误，此时原值保持不变
    pub fn update(&mut self, field: FieldName, raw_value: &str) -> Result<(), FieldError> {
        match field {
            FieldName::Standard => self.standard = raw_value.trim().to_string(),
            FieldName::SubjectName => self.subject_name = raw_value.trim().to_string(),
            FieldName::Difficulty => {
                self.difficulty =
                    Difficulty::parse(raw_value).ok_or_else(|| FieldError::UnknownDifficulty {
                        value: raw_value.trim().to_string(),
                    })?;
            }
            FieldName::CountOfMcqs => self.count_of_mcqs = parse_count(field, raw_value),
            FieldName::CountOfShort => self.count_of_short = parse_count(field, raw_value),
            FieldName::CountOfLong => self.count_of_long = parse_count(field, raw_value),
            FieldName::UserDefinedNotes => {
                let notes = raw_value.trim();
                self.user_defined_notes = (!notes.is_empty()).then(|| notes.to_string());
            }
        }
        Ok(())
    }

    /// 按字段名更新（字段名使用服务端的命名，如 `countOfMCQs`）
    pub fn update_by_name(&mut self, field_name: &str, raw_value: &str) -> Result<(), FieldError> {
        let field = field_name.parse::<FieldName>()?;
        self.update(field, raw_value)
    }

    /// 替换附件，传入 `None` 清除附件
    ///
    /// 只检查 MIME 类型，不校验文件内容
    pub fn set_attachment(&mut self, attachment: Option<Attachment>) -> Result<(), FieldError> {
        if let Some(file) = &attachment {
            if !file.is_pdf() {
                return Err(FieldError::AttachmentNotPdf {
                    mime_type: file.mime_type.clone(),
                });
            }
        }
        self.attachment = attachment;
        Ok(())
    }

    pub fn attachment(&self) -> Option<&Attachment> {
        self.attachment.as_ref()
    }

    /// 读取某个字段的文本形式，未填写返回 `None`
    pub fn value(&self, field: FieldName) -> Option<String> {
        match field {
            FieldName::Standard => non_empty(&self.standard),
            FieldName::SubjectName => non_empty(&self.subject_name),
            FieldName::Difficulty => Some(self.difficulty.as_str().to_string()),
            FieldName::CountOfMcqs => self.count_of_mcqs.map(|c| c.to_string()),
            FieldName::CountOfShort => self.count_of_short.map(|c| c.to_string()),
            FieldName::CountOfLong => self.count_of_long.map(|c| c.to_string()),
            FieldName::UserDefinedNotes => self.user_defined_notes.clone(),
        }
    }

    /// 提交前校验：年级与科目不能为空
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = Vec::new();
        if self.standard.trim().is_empty() {
            errors.push(ValidationError::MissingStandard);
        }
        if self.subject_name.trim().is_empty() {
            errors.push(ValidationError::MissingSubjectName);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ValidationErrors(errors))
        }
    }
}

fn non_empty(s: &str) -> Option<String> {
    let trimmed = s.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// 解析题目数量
///
/// 接受 `5`、` 5 `、`5.0` 这类写法；空文本、负数、小数和非数字都视为未填写
fn parse_count(field: FieldName, raw_value: &str) -> Option<u32> {
    let text = raw_value.trim();
    if text.is_empty() {
        return None;
    }

    if let Ok(count) = text.parse::<u32>() {
        return Some(count);
    }

    let parsed = text
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite() && *v >= 0.0 && v.fract() == 0.0 && *v <= u32::MAX as f64)
        .map(|v| v as u32);

    if parsed.is_none() {
        warn!("⚠️ 字段 {} 的值 '{}' 不是非负整数，按未填写处理", field, text);
    }
    parsed
}
