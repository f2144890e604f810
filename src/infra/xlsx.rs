//! `.xlsx`/`.xls` reading via calamine, `.xlsx` writing via rust_xlsxwriter.

use std::io::Cursor;

use calamine::{open_workbook_auto_from_rs, Data, Reader};
use rust_xlsxwriter::{Format, Workbook, XlsxError};

use crate::domain::services::spreadsheet::{Cell, ImportError, Sheet};
use crate::error::AppError;

pub const XLSX_CONTENT_TYPE: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

impl From<&Data> for Cell {
    fn from(data: &Data) -> Self {
        match data {
            Data::Empty | Data::Error(_) => Cell::Empty,
            Data::String(s) => Cell::Text(s.clone()),
            Data::Int(i) => Cell::Number(*i as f64),
            Data::Float(f) => Cell::Number(*f),
            Data::Bool(b) => Cell::Bool(*b),
            Data::DateTime(dt) => Cell::Number(dt.as_f64()),
            Data::DateTimeIso(s) | Data::DurationIso(s) => Cell::Text(s.clone()),
        }
    }
}

/// Reads the first worksheet. Row one holds the headers.
pub fn read_sheet(content: &[u8]) -> Result<Sheet, ImportError> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(content.to_vec()))
        .map_err(|e| ImportError::Unreadable(e.to_string()))?;

    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| ImportError::Unreadable("workbook has no worksheets".into()))?
        .map_err(|e| ImportError::Unreadable(e.to_string()))?;

    let mut rows = range.rows();
    let headers = rows
        .next()
        .map(|r| r.iter().map(|d| Cell::from(d).display()).collect::<Vec<String>>())
        .unwrap_or_default();

    let rows = rows
        .map(|r| r.iter().map(Cell::from).collect::<Vec<Cell>>())
        .filter(|r| !r.iter().all(Cell::is_blank))
        .collect();

    Ok(Sheet { headers, rows })
}

/// Renders the sheet as a single-worksheet workbook with a bold header row.
pub fn write_sheet(sheet: &Sheet, sheet_name: &str) -> Result<Vec<u8>, AppError> {
    build_workbook(sheet, sheet_name).map_err(|e| AppError::InternalWithMsg(format!("xlsx write failed: {}", e)))
}

fn build_workbook(sheet: &Sheet, sheet_name: &str) -> Result<Vec<u8>, XlsxError> {
    let mut workbook = Workbook::new();
    let bold = Format::new().set_bold();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name(sheet_name)?;

    for (col, header) in sheet.headers.iter().enumerate() {
        worksheet.write_string_with_format(0, col as u16, header, &bold)?;
    }

    for (idx, row) in sheet.rows.iter().enumerate() {
        let r = idx as u32 + 1;
        for (col, cell) in row.iter().enumerate() {
            let c = col as u16;
            match cell {
                Cell::Empty => {}
                Cell::Text(s) => {
                    worksheet.write_string(r, c, s)?;
                }
                Cell::Number(n) => {
                    worksheet.write_number(r, c, *n)?;
                }
                Cell::Bool(b) => {
                    worksheet.write_boolean(r, c, *b)?;
                }
            }
        }
    }

    workbook.save_to_buffer()
}
