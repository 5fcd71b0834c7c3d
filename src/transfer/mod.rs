// 题库导入导出 - CSV 与 JSON 两种格式
//
// CSV 固定列布局: category,prompt,difficulty,correct,wrong1,wrong2,wrong3
// wrong2 / wrong3 可以留空

use crate::moderation::{validate_question_payload, AnswerDraft};
use crate::storage::models::{Answer, Category, Question};
use crate::storage::Database;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

/// 导入导出格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransferFormat {
    Csv,
    Json,
}

impl TransferFormat {
    /// 按文件扩展名推断格式
    pub fn from_path(path: &Path) -> Result<Self> {
        match path.extension().and_then(|e| e.to_str()) {
            Some("csv") => Ok(Self::Csv),
            Some("json") => Ok(Self::Json),
            other => Err(anyhow::anyhow!("无法识别的文件格式: {:?}", other)),
        }
    }
}

/// 交换格式中的一道题目
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionRecord {
    pub category: String,
    pub prompt: String,
    pub difficulty: i64,
    pub answers: Vec<AnswerRecord>,
}

/// 交换格式中的候选答案
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerRecord {
    pub text: String,
    pub is_correct: bool,
}

/// 单行导入失败的记录
#[derive(Debug, Clone, Serialize)]
pub struct RowError {
    /// 数据行号（CSV 从表头后的第1行起；JSON 为数组下标加1）
    pub row: usize,
    pub message: String,
}

/// 导入结果报告
#[derive(Debug, Clone, Serialize)]
pub struct ImportReport {
    pub imported: usize,
    pub skipped_duplicates: usize,
    pub errors: Vec<RowError>,
}

/// 题库导入导出服务
pub struct TransferService {
    db: Arc<Database>,
}

impl TransferService {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// 从文件导入题库，坏行跳过并记录在报告中
    pub async fn import_file(&self, path: &Path) -> Result<ImportReport> {
        let format = TransferFormat::from_path(path)?;
        let content = tokio::fs::read_to_string(path).await?;

        let report = match format {
            TransferFormat::Csv => self.import_csv(&content).await?,
            TransferFormat::Json => self.import_json(&content).await?,
        };

        info!(
            "导入完成: 新增 {} 道，跳过重复 {} 道，失败 {} 行",
            report.imported,
            report.skipped_duplicates,
            report.errors.len()
        );
        Ok(report)
    }

    /// 导出题库到文件，category_id 为空时导出全部
    pub async fn export_file(&self, path: &Path, category_id: Option<i64>) -> Result<usize> {
        let format = TransferFormat::from_path(path)?;
        let records = self.collect_records(category_id).await?;

        let content = match format {
            TransferFormat::Csv => render_csv(&records)?,
            TransferFormat::Json => serde_json::to_string_pretty(&records)?,
        };

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(path, content).await?;

        info!("导出完成: {} 道题目到 {:?}", records.len(), path);
        Ok(records.len())
    }

    /// 解析 CSV 内容并逐行导入
    async fn import_csv(&self, content: &str) -> Result<ImportReport> {
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_reader(content.as_bytes());

        let mut records = Vec::new();
        let mut errors = Vec::new();

        for (index, row) in reader.records().enumerate() {
            let row_number = index + 1;
            let row = match row {
                Ok(row) => row,
                Err(e) => {
                    errors.push(RowError {
                        row: row_number,
                        message: format!("CSV 解析失败: {}", e),
                    });
                    continue;
                }
            };

            match parse_csv_row(&row) {
                Ok(record) => records.push((row_number, record)),
                Err(e) => errors.push(RowError {
                    row: row_number,
                    message: e.to_string(),
                }),
            }
        }

        self.import_records(records, errors).await
    }

    /// 解析 JSON 内容并逐条导入
    async fn import_json(&self, content: &str) -> Result<ImportReport> {
        let parsed: Vec<QuestionRecord> =
            serde_json::from_str(content).map_err(|e| anyhow::anyhow!("JSON 解析失败: {}", e))?;

        let records = parsed
            .into_iter()
            .enumerate()
            .map(|(i, r)| (i + 1, r))
            .collect();
        self.import_records(records, Vec::new()).await
    }

    /// 校验并写入数据库，题干重复（同分类）时跳过
    async fn import_records(
        &self,
        records: Vec<(usize, QuestionRecord)>,
        mut errors: Vec<RowError>,
    ) -> Result<ImportReport> {
        let mut imported = 0;
        let mut skipped_duplicates = 0;

        for (row, record) in records {
            let drafts: Vec<AnswerDraft> = record
                .answers
                .iter()
                .map(|a| AnswerDraft {
                    text: a.text.clone(),
                    is_correct: a.is_correct,
                })
                .collect();

            if let Err(e) = validate_question_payload(&record.prompt, record.difficulty, &drafts) {
                warn!("第 {} 行校验失败: {}", row, e);
                errors.push(RowError {
                    row,
                    message: e.to_string(),
                });
                continue;
            }

            let category_name = record.category.trim();
            if category_name.is_empty() {
                errors.push(RowError {
                    row,
                    message: "分类名不能为空".to_string(),
                });
                continue;
            }

            let category_id = match self.ensure_category(category_name).await {
                Ok(id) => id,
                Err(e) => {
                    errors.push(RowError {
                        row,
                        message: e.to_string(),
                    });
                    continue;
                }
            };

            let existing = self.db.get_questions_by_category(category_id).await?;
            if existing
                .iter()
                .any(|d| d.question.prompt == record.prompt.trim())
            {
                skipped_duplicates += 1;
                continue;
            }

            let question = Question {
                id: None,
                category_id,
                prompt: record.prompt.trim().to_string(),
                difficulty: record.difficulty,
                created_at: None,
            };
            let answers: Vec<Answer> = record
                .answers
                .iter()
                .map(|a| Answer {
                    id: None,
                    question_id: 0,
                    text: a.text.trim().to_string(),
                    is_correct: a.is_correct,
                })
                .collect();

            match self.db.insert_question(&question, &answers).await {
                Ok(_) => imported += 1,
                Err(e) => errors.push(RowError {
                    row,
                    message: format!("写入失败: {}", e),
                }),
            }
        }

        Ok(ImportReport {
            imported,
            skipped_duplicates,
            errors,
        })
    }

    /// 导入时按名称找分类，不存在则创建
    async fn ensure_category(&self, name: &str) -> Result<i64> {
        if let Some(existing) = self.db.get_category_by_name(name).await? {
            return existing
                .id
                .ok_or_else(|| anyhow::anyhow!("分类记录缺少 ID"));
        }
        self.db.insert_category(&Category::new(name, "")).await
    }

    /// 收集待导出的题目
    async fn collect_records(&self, category_id: Option<i64>) -> Result<Vec<QuestionRecord>> {
        let categories = match category_id {
            Some(id) => vec![self.db.get_category(id).await?],
            None => self.db.get_all_categories().await?,
        };

        let mut records = Vec::new();
        for category in categories {
            let Some(id) = category.id else { continue };
            let details = self.db.get_questions_by_category(id).await?;
            for detail in details {
                records.push(QuestionRecord {
                    category: category.name.clone(),
                    prompt: detail.question.prompt,
                    difficulty: detail.question.difficulty,
                    answers: detail
                        .answers
                        .into_iter()
                        .map(|a| AnswerRecord {
                            text: a.text,
                            is_correct: a.is_correct,
                        })
                        .collect(),
                });
            }
        }
        Ok(records)
    }
}

/// 解析 CSV 数据行为题目记录
fn parse_csv_row(row: &csv::StringRecord) -> Result<QuestionRecord> {
    if row.len() < 5 {
        return Err(anyhow::anyhow!(
            "列数不足，需要 category,prompt,difficulty,correct,wrong1[,wrong2,wrong3]"
        ));
    }

    let difficulty: i64 = row[2]
        .trim()
        .parse()
        .map_err(|_| anyhow::anyhow!("难度必须是整数: {}", &row[2]))?;

    let mut answers = vec![AnswerRecord {
        text: row[3].trim().to_string(),
        is_correct: true,
    }];
    for i in 4..row.len().min(7) {
        let text = row[i].trim();
        if !text.is_empty() {
            answers.push(AnswerRecord {
                text: text.to_string(),
                is_correct: false,
            });
        }
    }

    Ok(QuestionRecord {
        category: row[0].trim().to_string(),
        prompt: row[1].trim().to_string(),
        difficulty,
        answers,
    })
}

/// 按固定列布局渲染 CSV
fn render_csv(records: &[QuestionRecord]) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(["category", "prompt", "difficulty", "correct", "wrong1", "wrong2", "wrong3"])?;

    for record in records {
        let correct = record
            .answers
            .iter()
            .find(|a| a.is_correct)
            .map(|a| a.text.clone())
            .unwrap_or_default();
        let wrong: Vec<String> = record
            .answers
            .iter()
            .filter(|a| !a.is_correct)
            .map(|a| a.text.clone())
            .collect();

        let mut fields = vec![
            record.category.clone(),
            record.prompt.clone(),
            record.difficulty.to_string(),
            correct,
        ];
        for i in 0..3 {
            fields.push(wrong.get(i).cloned().unwrap_or_default());
        }
        writer.write_record(&fields)?;
    }

    let bytes = writer.into_inner()?;
    Ok(String::from_utf8(bytes)?)
}
