//! 请求体编码 - 业务能力层
//!
//! 只负责把表单快照转换成 multipart 请求体，不关心何时发送

use reqwest::multipart::{Form, Part};
use tracing::debug;

use crate::error::ApiError;
use crate::models::field_model::{FieldModel, FieldName};

/// 附件所在的字段名
pub const ATTACHMENT_PART: &str = "pdf";

/// 答案生成请求中试卷正文所在的字段名
pub const QUESTION_PAPER_PART: &str = "question_paper";

/// 单个 multipart 字段的内容
#[derive(Clone, PartialEq, Eq)]
pub enum PartValue {
    Text(String),
    File {
        file_name: String,
        mime_type: String,
        bytes: Vec<u8>,
    },
}

impl std::fmt::Debug for PartValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PartValue::Text(text) => f.debug_tuple("Text").field(&text.len()).finish(),
            PartValue::File {
                file_name,
                mime_type,
                bytes,
            } => f
                .debug_struct("File")
                .field("file_name", file_name)
                .field("mime_type", mime_type)
                .field("len", &bytes.len())
                .finish(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayloadPart {
    pub name: &'static str,
    pub value: PartValue,
}

/// 编码后的 multipart 请求体
///
/// 是表单在编码时刻的快照，之后对表单的修改不会影响它
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MultipartPayload {
    parts: Vec<PayloadPart>,
}

impl MultipartPayload {
    pub fn parts(&self) -> &[PayloadPart] {
        &self.parts
    }

    /// 查找文本字段
    pub fn text(&self, name: &str) -> Option<&str> {
        self.parts.iter().find_map(|p| match &p.value {
            PartValue::Text(text) if p.name == name => Some(text.as_str()),
            _ => None,
        })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.parts.iter().any(|p| p.name == name)
    }

    pub fn text_part_count(&self) -> usize {
        self.parts
            .iter()
            .filter(|p| matches!(p.value, PartValue::Text(_)))
            .count()
    }

    pub fn file_part_count(&self) -> usize {
        self.parts.len() - self.text_part_count()
    }

    fn push_text(&mut self, name: &'static str, value: String) {
        self.parts.push(PayloadPart {
            name,
            value: PartValue::Text(value),
        });
    }

    /// 转换为 reqwest 的 multipart 表单
    ///
    /// 每次调用都会复制一份数据，payload 本身保持不变
    pub fn to_form(&self) -> Result<Form, ApiError> {
        let mut form = Form::new();
        for part in &self.parts {
            form = match &part.value {
                PartValue::Text(text) => form.text(part.name, text.clone()),
                PartValue::File {
                    file_name,
                    mime_type,
                    bytes,
                } => {
                    let file_part = Part::bytes(bytes.clone())
                        .file_name(file_name.clone())
                        .mime_str(mime_type)
                        .map_err(|e| ApiError::InvalidPayload {
                            part: part.name.to_string(),
                            source: e,
                        })?;
                    form.part(part.name, file_part)
                }
            };
        }
        Ok(form)
    }
}

/// 请求体编码器
pub struct PayloadEncoder;

impl PayloadEncoder {
    /// 编码试卷生成请求
    ///
    /// - 每个已填写的字段生成一个文本字段，数量以十进制字符串发送
    /// - 未填写的字段直接省略，不发送空字符串
    /// - 有附件时追加一个 `pdf` 文件字段，没有则不发送
    ///
    /// 字段顺序固定，相同的表单状态总是得到相同的结果
    pub fn encode(model: &FieldModel) -> MultipartPayload {
        let mut payload = MultipartPayload::default();

        for field in FieldName::ALL {
            if let Some(value) = model.value(field) {
                payload.push_text(field.wire_name(), value);
            }
        }

        if let Some(attachment) = model.attachment() {
            payload.parts.push(PayloadPart {
                name: ATTACHMENT_PART,
                value: PartValue::File {
                    file_name: attachment.file_name.clone(),
                    mime_type: attachment.mime_type.clone(),
                    bytes: attachment.bytes.clone(),
                },
            });
        }

        debug!(
            "编码试卷请求: {} 个文本字段, {} 个文件字段",
            payload.text_part_count(),
            payload.file_part_count()
        );

        payload
    }

    /// 编码答案生成请求，唯一的字段是试卷正文
    pub fn encode_answer_key_request(question_paper: &str) -> MultipartPayload {
        let mut payload = MultipartPayload::default();
        payload.push_text(QUESTION_PAPER_PART, question_paper.to_string());
        payload
    }
}
