use calamine::{open_workbook_auto, Data, Range, Reader};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Error, Debug)]
pub enum WorkbookError {
    #[error("Failed to open workbook: {0}")]
    WorkbookOpen(String),

    #[error("Failed to read sheet {sheet}: {msg}")]
    SheetRead { sheet: String, msg: String },

    #[error("Workbook has no sheets")]
    NoSheets,
}

/// A single spreadsheet cell, coerced to text at read time
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cell {
    Blank,
    Text(String),
    /// Spreadsheet error value such as `#N/A` or `#REF!`
    Invalid(String),
}

impl Cell {
    pub fn text(value: impl Into<String>) -> Self {
        Cell::Text(value.into())
    }

    /// Trimmed text, `None` for blank or whitespace-only cells
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Cell::Text(s) => {
                let trimmed = s.trim();
                (!trimmed.is_empty()).then_some(trimmed)
            }
            _ => None,
        }
    }

    pub fn is_blank(&self) -> bool {
        match self {
            Cell::Blank => true,
            Cell::Text(s) => s.trim().is_empty(),
            Cell::Invalid(_) => false,
        }
    }
}

/// Row-oriented view of one sheet
///
/// Coordinates are absolute: `rows[r][c]` is spreadsheet row `r + 1`,
/// column `c`, regardless of where the sheet's used range starts.
#[derive(Debug, Clone, PartialEq)]
pub struct SheetGrid {
    pub name: String,
    pub rows: Vec<Vec<Cell>>,
}

impl SheetGrid {
    pub fn new(name: impl Into<String>, rows: Vec<Vec<Cell>>) -> Self {
        Self {
            name: name.into(),
            rows,
        }
    }

    /// Build a grid from plain strings (empty strings become blanks)
    pub fn from_strings<S: AsRef<str>>(name: impl Into<String>, rows: &[Vec<S>]) -> Self {
        let rows = rows
            .iter()
            .map(|row| {
                row.iter()
                    .map(|v| {
                        let v = v.as_ref();
                        if v.is_empty() {
                            Cell::Blank
                        } else {
                            Cell::text(v)
                        }
                    })
                    .collect()
            })
            .collect();
        Self::new(name, rows)
    }

    pub fn cell(&self, row: usize, col: usize) -> &Cell {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .unwrap_or(&Cell::Blank)
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }
}

/// Reader for roster workbooks (.xlsx / .xls)
pub struct WorkbookReader {
    workbook_path: PathBuf,
}

impl WorkbookReader {
    pub fn new(workbook_path: impl AsRef<Path>) -> Self {
        Self {
            workbook_path: workbook_path.as_ref().to_path_buf(),
        }
    }

    /// Load every sheet of the workbook into memory
    ///
    /// The format is picked from the file extension, so temp files must keep
    /// the upload's extension. This is synchronous; async callers should run it
    /// on the blocking pool.
    pub fn read_all(&self) -> Result<Vec<SheetGrid>, WorkbookError> {
        info!("Reading workbook: {}", self.workbook_path.display());

        let mut workbook = open_workbook_auto(&self.workbook_path)
            .map_err(|e| WorkbookError::WorkbookOpen(e.to_string()))?;

        let sheet_names = workbook.sheet_names().to_owned();
        if sheet_names.is_empty() {
            return Err(WorkbookError::NoSheets);
        }
        debug!("Found {} sheets", sheet_names.len());

        let mut sheets = Vec::with_capacity(sheet_names.len());
        for sheet_name in sheet_names {
            let range = workbook
                .worksheet_range(&sheet_name)
                .map_err(|e| WorkbookError::SheetRead {
                    sheet: sheet_name.clone(),
                    msg: e.to_string(),
                })?;

            let grid = range_to_grid(&sheet_name, &range);
            debug!("Sheet '{}' has {} rows", sheet_name, grid.row_count());
            sheets.push(grid);
        }

        Ok(sheets)
    }
}

/// Convert a calamine range to an absolute-position grid
fn range_to_grid(sheet_name: &str, range: &Range<Data>) -> SheetGrid {
    let Some((start_row, start_col)) = range.start() else {
        return SheetGrid::new(sheet_name, Vec::new());
    };

    let mut rows: Vec<Vec<Cell>> = vec![Vec::new(); start_row as usize];
    for row in range.rows() {
        let mut cells = vec![Cell::Blank; start_col as usize];
        cells.extend(row.iter().map(data_to_cell));
        rows.push(cells);
    }

    SheetGrid::new(sheet_name, rows)
}

fn data_to_cell(data: &Data) -> Cell {
    match data {
        Data::Empty => Cell::Blank,
        Data::String(s) => Cell::Text(s.clone()),
        Data::Int(i) => Cell::Text(i.to_string()),
        Data::Float(f) => Cell::Text(format_number(*f)),
        Data::Bool(b) => Cell::Text(b.to_string().to_uppercase()),
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(datetime) if datetime.time() == chrono::NaiveTime::MIN => {
                Cell::Text(datetime.date().to_string())
            }
            Some(datetime) => Cell::Text(datetime.to_string()),
            None => Cell::Text(format_number(dt.as_f64())),
        },
        Data::DateTimeIso(s) | Data::DurationIso(s) => Cell::Text(s.clone()),
        Data::Error(e) => {
            warn!("Spreadsheet error value in cell: {:?}", e);
            Cell::Invalid(format!("{e:?}"))
        }
    }
}

/// Render a numeric cell the way it is typed: document numbers stored as
/// numbers must not gain a trailing ".0"
pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{value:.0}")
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_number_integral() {
        assert_eq!(format_number(12345678.0), "12345678");
        assert_eq!(format_number(3001234567.0), "3001234567");
    }

    #[test]
    fn test_format_number_fractional() {
        assert_eq!(format_number(1.5), "1.5");
    }

    #[test]
    fn test_data_to_cell_variants() {
        assert_eq!(data_to_cell(&Data::Empty), Cell::Blank);
        assert_eq!(data_to_cell(&Data::Int(42)), Cell::text("42"));
        assert_eq!(data_to_cell(&Data::Float(1e7)), Cell::text("10000000"));
        assert_eq!(
            data_to_cell(&Data::String("CC".to_string())),
            Cell::text("CC")
        );
        assert!(matches!(
            data_to_cell(&Data::Error(calamine::CellErrorType::NA)),
            Cell::Invalid(_)
        ));
    }

    #[test]
    fn test_cell_as_text_trims() {
        assert_eq!(Cell::text("  CC ").as_text(), Some("CC"));
        assert_eq!(Cell::text("   ").as_text(), None);
        assert!(Cell::text("   ").is_blank());
        assert!(!Cell::Invalid("#N/A".into()).is_blank());
    }

    #[test]
    fn test_grid_cell_out_of_bounds_is_blank() {
        let grid = SheetGrid::from_strings("S1", &[vec!["a", ""]]);
        assert_eq!(grid.cell(0, 0), &Cell::text("a"));
        assert_eq!(grid.cell(0, 1), &Cell::Blank);
        assert_eq!(grid.cell(5, 9), &Cell::Blank);
    }

    #[test]
    fn test_missing_workbook() {
        let reader = WorkbookReader::new("/nonexistent/path/roster.xlsx");
        match reader.read_all() {
            Err(WorkbookError::WorkbookOpen(_)) => {}
            other => panic!("Expected WorkbookOpen error, got {other:?}"),
        }
    }
}
