//! Guest-list spreadsheet handling, independent of the file format.
//!
//! An upload goes through two phases. [`resolve_columns`] maps header cells
//! to the four logical columns once, producing a [`ColumnMap`]; every later
//! step reads rows only through that map. [`validate`] then runs the
//! structural check (short-circuiting) followed by all data checks, and
//! [`plan_import`] turns the rows into table and guest records.

use std::collections::{BTreeMap, HashSet};
use thiserror::Error;

use crate::domain::models::guest::{Dietary, Guest, Table, MAX_TABLE_SIZE};

pub const SHEET_NAME: &str = "Guest List";
pub const CHECKED_IN_HEADER: &str = "Checked In";

#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
}

enum SeatValue {
    Missing,
    Number(f64),
    Invalid,
}

impl Cell {
    pub fn is_blank(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// Trimmed text form. Whole numbers render without a fractional part,
    /// so a table typed as `1` reads back as `"1"`.
    pub fn display(&self) -> String {
        match self {
            Cell::Empty => String::new(),
            Cell::Text(s) => s.trim().to_string(),
            Cell::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => format!("{}", *n as i64),
            Cell::Number(n) => n.to_string(),
            Cell::Bool(b) => b.to_string(),
        }
    }

    fn seat_value(&self) -> SeatValue {
        match self {
            Cell::Empty => SeatValue::Missing,
            Cell::Number(n) => SeatValue::Number(*n),
            Cell::Text(s) => {
                let s = s.trim();
                if s.is_empty() {
                    return SeatValue::Missing;
                }
                match s.parse::<f64>() {
                    Ok(n) if n.is_finite() => SeatValue::Number(n),
                    _ => SeatValue::Invalid,
                }
            }
            Cell::Bool(_) => SeatValue::Invalid,
        }
    }
}

/// First worksheet of an uploaded file: one header row plus data rows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Sheet {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

const EMPTY: Cell = Cell::Empty;

fn cell(row: &[Cell], idx: usize) -> &Cell {
    row.get(idx).unwrap_or(&EMPTY)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Column {
    Name,
    Table,
    Seat,
    Dietary,
}

impl Column {
    pub const ALL: [Column; 4] = [Column::Name, Column::Table, Column::Seat, Column::Dietary];

    /// Lowercase label reported when the column is missing.
    pub fn label(self) -> &'static str {
        match self {
            Column::Name => "name",
            Column::Table => "table",
            Column::Seat => "seat no.",
            Column::Dietary => "dietary preference",
        }
    }

    /// Header text written to exports and templates.
    pub fn header(self) -> &'static str {
        match self {
            Column::Name => "Name",
            Column::Table => "Table",
            Column::Seat => "Seat No.",
            Column::Dietary => "Dietary Preference",
        }
    }

    fn keyword(self) -> &'static str {
        match self {
            Column::Name => "name",
            Column::Table => "table",
            Column::Seat => "seat",
            Column::Dietary => "dietary",
        }
    }
}

/// Header index of every logical column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnMap {
    pub name: usize,
    pub table: usize,
    pub seat: usize,
    pub dietary: usize,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConstraintViolation {
    #[error("Table '{table}' has {count} guests (max {})", MAX_TABLE_SIZE)]
    TableOverCapacity { table: String, count: usize },
    #[error("Seat numbers must be numeric")]
    NonNumericSeat,
    #[error("Duplicate seat {seat} in table '{table}' ({count} times)")]
    DuplicateSeat { table: String, seat: String, count: usize },
}

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("Error processing Excel file: {0}")]
    Unreadable(String),
    #[error("Missing required columns: {}", join_labels(.0))]
    MissingColumns(Vec<Column>),
    #[error("{} data constraint(s) violated", .0.len())]
    Constraints(Vec<ConstraintViolation>),
    #[error("Error processing Excel file: {0}")]
    Processing(String),
}

impl ImportError {
    /// Every problem as a separate line, for the caller to show in one go.
    pub fn details(&self) -> Vec<String> {
        match self {
            ImportError::Constraints(violations) => violations.iter().map(|v| v.to_string()).collect(),
            other => vec![other.to_string()],
        }
    }
}

fn join_labels(columns: &[Column]) -> String {
    columns.iter().map(|c| c.label()).collect::<Vec<_>>().join(", ")
}

/// Maps headers to logical columns.
///
/// Exact labels (`seat no.`, `table`, ...) are claimed first, then any header
/// containing a column keyword fills a column that is still open. Matching is
/// case-insensitive and ignores surrounding whitespace. A header fills at most
/// one column.
pub fn resolve_columns(headers: &[String]) -> Result<ColumnMap, ImportError> {
    let normalized: Vec<String> = headers.iter().map(|h| h.trim().to_lowercase()).collect();
    let mut slots: BTreeMap<Column, usize> = BTreeMap::new();
    let mut used = vec![false; normalized.len()];

    for column in Column::ALL {
        let exact = normalized
            .iter()
            .enumerate()
            .find(|(idx, h)| !used[*idx] && (h.as_str() == column.label() || h.as_str() == column.keyword()));
        if let Some((idx, _)) = exact {
            used[idx] = true;
            slots.insert(column, idx);
        }
    }

    for (idx, header) in normalized.iter().enumerate() {
        if used[idx] {
            continue;
        }
        let open = Column::ALL
            .into_iter()
            .find(|c| !slots.contains_key(c) && header.contains(c.keyword()));
        if let Some(column) = open {
            used[idx] = true;
            slots.insert(column, idx);
        }
    }

    let missing: Vec<Column> = Column::ALL.into_iter().filter(|c| !slots.contains_key(c)).collect();
    if !missing.is_empty() {
        return Err(ImportError::MissingColumns(missing));
    }

    Ok(ColumnMap {
        name: slots[&Column::Name],
        table: slots[&Column::Table],
        seat: slots[&Column::Seat],
        dietary: slots[&Column::Dietary],
    })
}

/// Capacity, seat-format and seat-uniqueness checks. Returns every violation.
pub fn check_constraints(sheet: &Sheet, map: &ColumnMap) -> Vec<ConstraintViolation> {
    let mut violations = Vec::new();

    let mut table_counts: BTreeMap<String, usize> = BTreeMap::new();
    let mut seat_counts: BTreeMap<(String, String), usize> = BTreeMap::new();
    let mut non_numeric = false;

    for row in &sheet.rows {
        let table = cell(row, map.table);
        let seat = cell(row, map.seat);

        if !table.is_blank() {
            *table_counts.entry(table.display()).or_default() += 1;
        }
        if matches!(seat.seat_value(), SeatValue::Invalid) {
            non_numeric = true;
        }
        if !table.is_blank() && !seat.is_blank() {
            *seat_counts.entry((table.display(), seat.display())).or_default() += 1;
        }
    }

    for (table, count) in table_counts {
        if count > MAX_TABLE_SIZE {
            violations.push(ConstraintViolation::TableOverCapacity { table, count });
        }
    }

    if non_numeric {
        violations.push(ConstraintViolation::NonNumericSeat);
    }

    for ((table, seat), count) in seat_counts {
        if count > 1 {
            violations.push(ConstraintViolation::DuplicateSeat { table, seat, count });
        }
    }

    violations
}

/// Structural check first; data checks only run once every column resolved.
pub fn validate(sheet: &Sheet) -> Result<ColumnMap, ImportError> {
    let map = resolve_columns(&sheet.headers)?;
    let violations = check_constraints(sheet, &map);
    if !violations.is_empty() {
        return Err(ImportError::Constraints(violations));
    }
    Ok(map)
}

#[derive(Debug, Clone, Default)]
pub struct SeatingPlan {
    pub tables: Vec<Table>,
    pub guests: Vec<Guest>,
}

/// Builds the records for a validated sheet, in row order.
///
/// Rows without a name are skipped. A table record is created the first
/// time its name appears.
pub fn plan_import(sheet: &Sheet, map: &ColumnMap, event_id: &str) -> Result<SeatingPlan, ImportError> {
    let mut plan = SeatingPlan::default();
    let mut seen_tables: HashSet<String> = HashSet::new();

    for (idx, row) in sheet.rows.iter().enumerate() {
        // header is line 1
        let line = idx + 2;
        let name = cell(row, map.name);
        if name.is_blank() {
            continue;
        }

        let table_name = cell(row, map.table).display();
        if table_name.is_empty() {
            return Err(ImportError::Processing(format!("row {} has no table", line)));
        }

        let seat_no = match cell(row, map.seat).seat_value() {
            SeatValue::Number(n) => n.trunc() as i64,
            SeatValue::Missing => {
                return Err(ImportError::Processing(format!("row {} has no seat number", line)));
            }
            SeatValue::Invalid => {
                return Err(ImportError::Processing(format!("row {} has an invalid seat number", line)));
            }
        };

        if seen_tables.insert(table_name.clone()) {
            plan.tables.push(Table::new(event_id.to_string(), table_name.clone()));
        }

        let dietary = Dietary::normalize(&cell(row, map.dietary).display());
        plan.guests.push(Guest::new(event_id.to_string(), name.display(), table_name, seat_no, dietary));
    }

    Ok(plan)
}

fn standard_headers() -> Vec<String> {
    Column::ALL.iter().map(|c| c.header().to_string()).collect()
}

/// Current guests in the upload layout, optionally with a Yes/No check-in column.
pub fn export_sheet(guests: &[Guest], include_checkin: bool) -> Sheet {
    let mut headers = standard_headers();
    if include_checkin {
        headers.push(CHECKED_IN_HEADER.to_string());
    }

    let rows = guests
        .iter()
        .map(|g| {
            let mut row = vec![
                Cell::Text(g.name.clone()),
                Cell::Text(g.table_name.clone()),
                Cell::Number(g.seat_no as f64),
                Cell::Text(g.dietary.clone()),
            ];
            if include_checkin {
                row.push(Cell::Text(if g.checked_in { "Yes" } else { "No" }.to_string()));
            }
            row
        })
        .collect();

    Sheet { headers, rows }
}

/// Blank upload template with a few sample rows.
pub fn template_sheet() -> Sheet {
    let sample = [
        ("Sample Guest 1", "A1", 1.0, "none"),
        ("Sample Guest 2", "A1", 2.0, "vegetarian"),
        ("Sample Guest 3", "B1", 1.0, "halal"),
    ];

    Sheet {
        headers: standard_headers(),
        rows: sample
            .iter()
            .map(|(name, table, seat, dietary)| {
                vec![
                    Cell::Text(name.to_string()),
                    Cell::Text(table.to_string()),
                    Cell::Number(*seat),
                    Cell::Text(dietary.to_string()),
                ]
            })
            .collect(),
    }
}
