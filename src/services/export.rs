//! 明细报表导出
//! CSV 走 csv，XLSX 走 rust_xlsxwriter，两种格式列顺序一致

use chrono::Utc;
use rust_xlsxwriter::{Workbook, Worksheet, XlsxError};

use crate::error::AppError;
use crate::models::report::{DetailedReport, ExportFormat};

/// 导出产物，文件名带当天日期
pub struct ExportFile {
    pub filename: String,
    pub media_type: &'static str,
    pub bytes: Vec<u8>,
}

/// 导出列，顺序即文件中的列顺序
const COLUMNS: [&str; 12] = [
    "id",
    "project_id",
    "project_name",
    "title",
    "priority",
    "status",
    "author_id",
    "assignee_id",
    "due_date",
    "created_at",
    "updated_at",
    "resolution_time_days",
];

/// 按格式序列化并命名文件
pub fn to_file(report: &DetailedReport, format: ExportFormat) -> Result<ExportFile, AppError> {
    let bytes = match format {
        ExportFormat::Csv => to_csv(report)?,
        ExportFormat::Xlsx => to_xlsx(report)?,
    };
    let filename = format!(
        "defects_report_{}.{}",
        Utc::now().date_naive(),
        format.extension()
    );

    Ok(ExportFile {
        filename,
        media_type: format.media_type(),
        bytes,
    })
}

/// CSV 导出，空报表也会写出表头行
pub fn to_csv(report: &DetailedReport) -> Result<Vec<u8>, AppError> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());

    writer
        .write_record(COLUMNS)
        .map_err(|e| AppError::internal_error(format!("Failed to write CSV header: {}", e)))?;
    for row in &report.defects {
        writer
            .serialize(row)
            .map_err(|e| AppError::internal_error(format!("Failed to write CSV row: {}", e)))?;
    }

    writer
        .into_inner()
        .map_err(|e| AppError::internal_error(format!("Failed to finalize CSV export: {}", e)))
}

/// XLSX 导出，单工作表
pub fn to_xlsx(report: &DetailedReport) -> Result<Vec<u8>, AppError> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name("Defects Report").map_err(xlsx_error)?;

    for (col, name) in COLUMNS.iter().enumerate() {
        worksheet
            .write_string(0, col as u16, *name)
            .map_err(xlsx_error)?;
    }

    for (i, row) in report.defects.iter().enumerate() {
        let r = (i + 1) as u32;
        write_text(worksheet, r, 0, Some(row.id.to_string()))?;
        write_text(worksheet, r, 1, Some(row.project_id.to_string()))?;
        write_text(worksheet, r, 2, row.project_name.clone())?;
        write_text(worksheet, r, 3, row.title.clone())?;
        write_text(worksheet, r, 4, row.priority.map(|p| p.to_string()))?;
        write_text(worksheet, r, 5, row.status.map(|s| s.to_string()))?;
        write_text(worksheet, r, 6, row.author_id.map(|v| v.to_string()))?;
        write_text(worksheet, r, 7, row.assignee_id.map(|v| v.to_string()))?;
        write_text(worksheet, r, 8, row.due_date.map(|d| d.to_string()))?;
        write_text(worksheet, r, 9, row.created_at.map(|t| t.to_rfc3339()))?;
        write_text(worksheet, r, 10, row.updated_at.map(|t| t.to_rfc3339()))?;
        if let Some(days) = row.resolution_time_days {
            worksheet.write_number(r, 11, days).map_err(xlsx_error)?;
        }
    }

    workbook.save_to_buffer().map_err(xlsx_error)
}

/// 空值留白，不写空字符串
fn write_text(
    worksheet: &mut Worksheet,
    row: u32,
    col: u16,
    value: Option<String>,
) -> Result<(), AppError> {
    if let Some(text) = value {
        worksheet
            .write_string(row, col, text.as_str())
            .map_err(xlsx_error)?;
    }
    Ok(())
}

fn xlsx_error(e: XlsxError) -> AppError {
    AppError::internal_error(format!("Failed to build XLSX export: {}", e))
}
