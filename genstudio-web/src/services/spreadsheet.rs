//! Spreadsheet reading (xlsx/xls) and workbook output
//!
//! The first row of each sheet is the header row. Cells are read as display
//! strings; empty cells become empty strings.

use calamine::{open_workbook_auto_from_rs, Data, Reader};
use rust_xlsxwriter::{Format, Workbook};
use std::io::Cursor;
use thiserror::Error;

/// Character budget for the CSV rendering sent with a summary prompt
pub const SUMMARY_CHAR_BUDGET: usize = 150_000;

/// Excel's limit on characters in one cell
const MAX_CELL_CHARS: usize = 32_767;

const TRUNCATION_NOTICE: &str = "\n[Data truncated]";

#[derive(Debug, Error)]
pub enum SpreadsheetError {
    #[error("Could not read spreadsheet: {0}")]
    Read(String),

    #[error("The uploaded Excel file is empty.")]
    Empty,

    #[error("Column '{column}' not found in the Excel file. Available columns: {}", .available.join(", "))]
    ColumnNotFound {
        column: String,
        available: Vec<String>,
    },

    #[error("Could not write workbook: {0}")]
    Write(String),
}

impl From<rust_xlsxwriter::XlsxError> for SpreadsheetError {
    fn from(err: rust_xlsxwriter::XlsxError) -> Self {
        SpreadsheetError::Write(err.to_string())
    }
}

/// One worksheet as header plus string rows
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetTable {
    pub name: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl SheetTable {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, column: &str) -> Result<usize, SpreadsheetError> {
        self.headers
            .iter()
            .position(|h| h == column)
            .ok_or_else(|| SpreadsheetError::ColumnNotFound {
                column: column.to_string(),
                available: self.headers.clone(),
            })
    }

    /// Values of column `index`, one per row (missing cells are empty)
    pub fn column_values(&self, index: usize) -> Vec<String> {
        self.rows
            .iter()
            .map(|row| row.get(index).cloned().unwrap_or_default())
            .collect()
    }

    /// CSV rendering with a header line and no index column
    pub fn to_csv(&self) -> String {
        let mut out = String::new();
        push_csv_line(&mut out, &self.headers);
        for row in &self.rows {
            push_csv_line(&mut out, row);
        }
        out
    }
}

fn push_csv_line(out: &mut String, fields: &[String]) {
    let line = fields
        .iter()
        .map(|f| csv_field(f))
        .collect::<Vec<_>>()
        .join(",");
    out.push_str(&line);
    out.push('\n');
}

fn csv_field(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Read every sheet of an xlsx/xls workbook
pub fn read_workbook(bytes: &[u8]) -> Result<Vec<SheetTable>, SpreadsheetError> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))
        .map_err(|e| SpreadsheetError::Read(e.to_string()))?;

    let mut sheets = Vec::new();
    for name in workbook.sheet_names() {
        let range = workbook
            .worksheet_range(&name)
            .map_err(|e| SpreadsheetError::Read(format!("sheet '{}': {}", name, e)))?;

        let mut rows = range.rows();
        let headers: Vec<String> = match rows.next() {
            Some(header_row) => header_row
                .iter()
                .enumerate()
                .map(|(i, cell)| {
                    let text = cell_text(cell);
                    if text.trim().is_empty() {
                        format!("Unnamed: {}", i)
                    } else {
                        text
                    }
                })
                .collect(),
            None => Vec::new(),
        };
        let rows = rows
            .map(|row| row.iter().map(cell_text).collect::<Vec<_>>())
            .collect();

        sheets.push(SheetTable {
            name,
            headers,
            rows,
        });
    }
    Ok(sheets)
}

/// First sheet of a workbook; errors when it has no data rows
pub fn read_first_sheet(bytes: &[u8]) -> Result<SheetTable, SpreadsheetError> {
    let sheet = read_workbook(bytes)?
        .into_iter()
        .next()
        .ok_or(SpreadsheetError::Empty)?;
    if sheet.is_empty() {
        return Err(SpreadsheetError::Empty);
    }
    Ok(sheet)
}

/// Render all sheets as CSV under a character budget
///
/// Whole sheets are added while they fit. The first sheet that does not fit
/// is cut short (when enough room remains for more than its banner) and a
/// truncation notice ends the text.
pub fn summarize_workbook(filename: &str, sheets: &[SheetTable], budget: usize) -> String {
    let mut out = format!("Summary of Excel file '{}':\n", filename);
    let mut used = out.chars().count();

    for sheet in sheets {
        if used >= budget {
            out.push_str(TRUNCATION_NOTICE);
            break;
        }

        let banner = format!("\n--- Sheet: {} ---\n", sheet.name);
        let csv = sheet.to_csv();
        let banner_len = banner.chars().count();
        let addition = banner_len + csv.chars().count();

        if used + addition <= budget {
            out.push_str(&banner);
            out.push_str(&csv);
            used += addition;
        } else {
            let remaining = budget - used;
            if remaining > banner_len + 50 {
                out.push_str(&banner);
                out.extend(csv.chars().take(remaining - banner_len - 1));
            }
            out.push_str(TRUNCATION_NOTICE);
            break;
        }
    }
    out
}

/// Single-sheet xlsx with a bold header row
pub fn write_workbook(headers: &[&str], rows: &[Vec<String>]) -> Result<Vec<u8>, SpreadsheetError> {
    let mut workbook = Workbook::new();
    let bold = Format::new().set_bold();
    {
        let worksheet = workbook.add_worksheet();
        for (col, header) in headers.iter().enumerate() {
            worksheet.write_string_with_format(0, col as u16, *header, &bold)?;
        }
        for (r, row) in rows.iter().enumerate() {
            let row_index = u32::try_from(r + 1)
                .map_err(|_| SpreadsheetError::Write("too many rows".to_string()))?;
            for (col, value) in row.iter().enumerate() {
                worksheet.write_string(row_index, col as u16, clamp_cell(value))?;
            }
        }
    }
    Ok(workbook.save_to_buffer()?)
}

fn clamp_cell(value: &str) -> String {
    if value.chars().count() <= MAX_CELL_CHARS {
        value.to_string()
    } else {
        value.chars().take(MAX_CELL_CHARS).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(name: &str, headers: &[&str], rows: &[&[&str]]) -> SheetTable {
        SheetTable {
            name: name.to_string(),
            headers: headers.iter().map(|s| s.to_string()).collect(),
            rows: rows
                .iter()
                .map(|r| r.iter().map(|s| s.to_string()).collect())
                .collect(),
        }
    }

    #[test]
    fn test_written_workbook_reads_back() {
        let bytes = write_workbook(
            &["Name", "Notes"],
            &[
                vec!["alpha".to_string(), "first".to_string()],
                vec!["beta".to_string(), String::new()],
            ],
        )
        .unwrap();

        let sheet = read_first_sheet(&bytes).unwrap();
        assert_eq!(sheet.headers, vec!["Name", "Notes"]);
        assert_eq!(sheet.rows.len(), 2);
        assert_eq!(sheet.column_values(0), vec!["alpha", "beta"]);
        assert_eq!(sheet.column_values(1)[0], "first");
        assert_eq!(sheet.column_values(1)[1], "");
    }

    #[test]
    fn test_header_only_sheet_is_empty() {
        let bytes = write_workbook(&["Only"], &[]).unwrap();
        assert!(matches!(read_first_sheet(&bytes), Err(SpreadsheetError::Empty)));
    }

    #[test]
    fn test_garbage_bytes_are_a_read_error() {
        assert!(matches!(
            read_workbook(b"definitely not a workbook"),
            Err(SpreadsheetError::Read(_))
        ));
    }

    #[test]
    fn test_missing_column_lists_available() {
        let sheet = table("S", &["a", "b"], &[&["1", "2"]]);
        let err = sheet.column_index("c").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Column 'c' not found in the Excel file. Available columns: a, b"
        );
        assert_eq!(sheet.column_index("b").unwrap(), 1);
    }

    #[test]
    fn test_csv_quoting() {
        let sheet = table("S", &["text", "n"], &[&["a, b", "1"], &["say \"hi\"", "2"]]);
        assert_eq!(sheet.to_csv(), "text,n\n\"a, b\",1\n\"say \"\"hi\"\"\",2\n");
    }

    #[test]
    fn test_summary_includes_every_sheet_under_budget() {
        let sheets = vec![
            table("One", &["a"], &[&["1"]]),
            table("Two", &["b"], &[&["2"]]),
        ];
        let summary = summarize_workbook("book.xlsx", &sheets, SUMMARY_CHAR_BUDGET);

        assert!(summary.starts_with("Summary of Excel file 'book.xlsx':\n"));
        assert!(summary.contains("\n--- Sheet: One ---\na\n1\n"));
        assert!(summary.contains("\n--- Sheet: Two ---\nb\n2\n"));
        assert!(!summary.contains("[Data truncated]"));
    }

    #[test]
    fn test_summary_truncates_large_sheet() {
        let big: Vec<Vec<String>> = (0..200).map(|i| vec![format!("row-{:04}", i)]).collect();
        let sheets = vec![SheetTable {
            name: "Big".to_string(),
            headers: vec!["col".to_string()],
            rows: big,
        }];

        let summary = summarize_workbook("big.xlsx", &sheets, 500);

        assert!(summary.contains("--- Sheet: Big ---"));
        assert!(summary.ends_with("\n[Data truncated]"));
        assert!(summary.chars().count() <= 500 + TRUNCATION_NOTICE.len());
    }

    #[test]
    fn test_summary_skips_sheet_when_little_room_left() {
        let sheets = vec![table("Wide", &["x"], &[&["0123456789012345678901234567890123456789"]])];
        let header_len = "Summary of Excel file 'w.xlsx':\n".chars().count();

        let summary = summarize_workbook("w.xlsx", &sheets, header_len + 20);

        assert!(!summary.contains("--- Sheet"));
        assert!(summary.ends_with("[Data truncated]"));
    }
}
