use serde::Deserialize;
use std::path::PathBuf;

use crate::error::FieldError;
use crate::models::field_model::{FieldModel, FieldName};

/// TOML 文件中描述的试卷需求
///
/// ```toml
/// standard = "Class 10"
/// subject_name = "Physics"
/// difficulty = "Medium"
/// count_of_mcqs = 5
/// count_of_short = "3"
/// user_defined_notes = "Focus on numericals"
/// reference_pdf = "chapter3.pdf"
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExamRequest {
    #[serde(default)]
    pub standard: String,
    #[serde(default)]
    pub subject_name: String,
    #[serde(default)]
    pub difficulty: Option<String>,
    #[serde(default, deserialize_with = "deserialize_count")]
    pub count_of_mcqs: Option<String>,
    #[serde(default, deserialize_with = "deserialize_count")]
    pub count_of_short: Option<String>,
    #[serde(default, deserialize_with = "deserialize_count")]
    pub count_of_long: Option<String>,
    #[serde(default)]
    pub user_defined_notes: Option<String>,
    /// 参考资料 PDF 路径，相对路径以 TOML 文件所在目录为基准
    #[serde(default)]
    pub reference_pdf: Option<PathBuf>,
}

impl ExamRequest {
    /// 将文件内容逐字段写入表单，走与界面输入相同的规范化逻辑
    ///
    /// 附件不在此处理，由加载器读取文件后设置
    pub fn apply_to(&self, model: &mut FieldModel) -> Result<(), FieldError> {
        model.update(FieldName::Standard, &self.standard)?;
        model.update(FieldName::SubjectName, &self.subject_name)?;
        if let Some(difficulty) = &self.difficulty {
            model.update(FieldName::Difficulty, difficulty)?;
        }
        model.update(FieldName::CountOfMcqs, self.count_of_mcqs.as_deref().unwrap_or(""))?;
        model.update(FieldName::CountOfShort, self.count_of_short.as_deref().unwrap_or(""))?;
        model.update(FieldName::CountOfLong, self.count_of_long.as_deref().unwrap_or(""))?;
        model.update(
            FieldName::UserDefinedNotes,
            self.user_defined_notes.as_deref().unwrap_or(""),
        )?;
        Ok(())
    }
}

// 数量既可以写成整数也可以写成字符串，统一转成原始文本交给表单解析
fn deserialize_count<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::Visitor;
    use std::fmt;

    struct CountVisitor;

    impl<'de> Visitor<'de> for CountVisitor {
        type Value = String;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("a string or number representing a question count")
        }

        fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(value.to_string())
        }

        fn visit_i64<E>(self, value: i64) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(value.to_string())
        }

        fn visit_u64<E>(self, value: u64) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(value.to_string())
        }

        fn visit_f64<E>(self, value: f64) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(value.to_string())
        }
    }

    deserializer.deserialize_any(CountVisitor).map(Some)
}
