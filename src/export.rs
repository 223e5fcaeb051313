//! Spreadsheet export of the question bank.
//!
//! One worksheet, one bold header row, one row per question in the order given.

use rust_xlsxwriter::{Format, FormatAlign, Workbook, XlsxError};

use crate::models::{Question, QuestionStatus};

pub const SHEET_NAME: &str = "Geography Questions";

pub const CONTENT_TYPE: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

pub const HEADERS: [&str; 22] = [
    "Question ID",
    "Date",
    "User",
    "User Email",
    "Topic",
    "Subtopic",
    "Statement",
    "Question Type",
    "Image URL",
    "Image Description",
    "Image Source",
    "School Level",
    "Alternative A",
    "Alternative B",
    "Alternative C",
    "Alternative D",
    "Alternative E",
    "Correct Answer",
    "Correct Alternative Text",
    "Hint",
    "Bibliographic Source",
    "Status",
];

const MAX_COLUMN_WIDTH: usize = 50;

/// Longest text a single Excel cell can hold.
pub const MAX_CELL_CHARS: usize = 32_767;

/// Cuts `value` down to what one cell can hold. Stored text is unbounded.
fn fit_cell(value: String) -> String {
    match value.char_indices().nth(MAX_CELL_CHARS) {
        Some((cut, _)) => value[..cut].to_string(),
        None => value,
    }
}

/// Cell values of one question, aligned with [`HEADERS`] and cut to [`MAX_CELL_CHARS`].
pub fn question_row(q: &Question) -> [String; 22] {
    let optional = |value: &Option<String>| value.clone().unwrap_or_default();

    [
        q.id.to_string(),
        q.registered_on.format("%d/%m/%Y").to_string(),
        q.user.username.clone(),
        q.user.email.clone(),
        q.topic.clone(),
        q.subtopic.clone(),
        q.statement.clone(),
        q.question_type.clone(),
        optional(&q.image_url),
        optional(&q.image_description),
        optional(&q.image_source),
        q.school_level.clone(),
        q.alternative_a.clone(),
        q.alternative_b.clone(),
        q.alternative_c.clone(),
        q.alternative_d.clone(),
        q.alternative_e.clone(),
        q.correct_answer.to_string(),
        q.correct_answer_text.clone(),
        optional(&q.hint),
        optional(&q.bibliographic_source),
        q.status.to_string(),
    ]
    .map(fit_cell)
}

/// Width of each column: longest cell (header included) plus 2, capped at 50.
pub fn column_widths(rows: &[[String; 22]]) -> [usize; 22] {
    let mut widths = HEADERS.map(|h| h.chars().count());
    for row in rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }
    widths.map(|w| (w + 2).min(MAX_COLUMN_WIDTH))
}

/// build_workbook
///
/// Renders the questions into an in-memory `.xlsx` file.
pub fn build_workbook(questions: &[Question]) -> Result<Vec<u8>, XlsxError> {
    let rows: Vec<[String; 22]> = questions.iter().map(question_row).collect();

    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name(SHEET_NAME)?;

    let header_format = Format::new().set_bold().set_align(FormatAlign::Center);
    for (col, title) in HEADERS.iter().enumerate() {
        worksheet.write_string_with_format(0, col as u16, *title, &header_format)?;
    }

    for (idx, (question, row)) in questions.iter().zip(&rows).enumerate() {
        let row_num = idx as u32 + 1;
        // The id stays numeric so the column sorts correctly in spreadsheet tools.
        worksheet.write_number(row_num, 0, question.id as f64)?;
        for (col, cell) in row.iter().enumerate().skip(1) {
            worksheet.write_string(row_num, col as u16, cell)?;
        }
    }

    for (col, width) in column_widths(&rows).iter().enumerate() {
        worksheet.set_column_width(col as u16, *width as f64)?;
    }

    workbook.save_to_buffer()
}

/// `geography_questions_<status|all>.xlsx`
pub fn export_filename(status: Option<QuestionStatus>) -> String {
    let suffix = status.map(|s| s.as_str()).unwrap_or("all");
    format!("geography_questions_{}.xlsx", suffix)
}
