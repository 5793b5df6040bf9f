/// Learner row parsing
///
/// Column layout of the learner table (0-indexed):
/// ```text
/// 0 tipo documento | 1 número documento | 2 nombre completo | 3 estado
/// 4 correo         | 5 teléfono         | 6 teléfono alterno
/// ```
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::importers::workbook_reader::{Cell, SheetGrid};
use crate::utils::collapse_whitespace;

pub const DEFAULT_DOCUMENT_TYPE: &str = "CC";
pub const DEFAULT_STATUS: &str = "MATRICULADO";

/// Placeholders used when a full name has no words at all
pub const PLACEHOLDER_GIVEN_NAMES: &str = "SIN NOMBRE";
pub const PLACEHOLDER_SURNAMES: &str = "SIN APELLIDO";

const COL_DOCUMENT_TYPE: usize = 0;
const COL_DOCUMENT_NUMBER: usize = 1;
const COL_FULL_NAME: usize = 2;
const COL_STATUS: usize = 3;
const COL_EMAIL: usize = 4;
const COL_PHONE: usize = 5;
const COL_ALT_PHONE: usize = 6;

/// One learner row as found in the sheet, before validation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SheetRecord {
    /// 1-based spreadsheet row number
    pub row: usize,
    pub tipo_documento: String,
    pub numero_documento: String,
    pub nombre_completo: String,
    pub estado: String,
    pub email: Option<String>,
    pub telefono: Option<String>,
    pub telefono_alterno: Option<String>,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unreadable {field} cell at row {row}: {value}")]
pub struct RowParseError {
    pub row: usize,
    pub field: &'static str,
    pub value: String,
}

/// Parsed rows of one sheet plus the rows that could not be read
#[derive(Debug, Default)]
pub struct ParsedRows {
    pub records: Vec<SheetRecord>,
    pub failures: Vec<RowParseError>,
}

/// Parse every learner row from `data_start` to the end of the sheet
///
/// Blank rows and rows without a document number or name are skipped without
/// a diagnostic. A row with an unreadable cell is reported in `failures` and
/// parsing carries on with the next row.
pub fn parse_rows(grid: &SheetGrid, data_start: usize) -> ParsedRows {
    let mut parsed = ParsedRows::default();

    for row_idx in data_start..grid.row_count() {
        let row = &grid.rows[row_idx];
        if row.iter().all(Cell::is_blank) {
            continue;
        }

        match parse_row(grid, row_idx) {
            Ok(Some(record)) => parsed.records.push(record),
            Ok(None) => {
                debug!(
                    "Skipping row {} of '{}': missing document or name",
                    row_idx + 1,
                    grid.name
                );
            }
            Err(e) => {
                warn!("Sheet '{}': {}", grid.name, e);
                parsed.failures.push(e);
            }
        }
    }

    parsed
}

/// Parse a single row; `Ok(None)` when document number or name is blank
pub fn parse_row(grid: &SheetGrid, row_idx: usize) -> Result<Option<SheetRecord>, RowParseError> {
    let row = row_idx + 1;
    let text = |col: usize, field: &'static str| -> Result<Option<String>, RowParseError> {
        match grid.cell(row_idx, col) {
            Cell::Invalid(value) => Err(RowParseError {
                row,
                field,
                value: value.clone(),
            }),
            cell => Ok(cell.as_text().map(str::to_string)),
        }
    };

    let numero_documento = text(COL_DOCUMENT_NUMBER, "numero_documento")?;
    let nombre_completo = text(COL_FULL_NAME, "nombre_completo")?;

    let (Some(numero_documento), Some(nombre_completo)) = (numero_documento, nombre_completo)
    else {
        return Ok(None);
    };

    Ok(Some(SheetRecord {
        row,
        tipo_documento: text(COL_DOCUMENT_TYPE, "tipo_documento")?
            .unwrap_or_else(|| DEFAULT_DOCUMENT_TYPE.to_string()),
        numero_documento,
        nombre_completo: collapse_whitespace(&nombre_completo),
        estado: text(COL_STATUS, "estado")?.unwrap_or_else(|| DEFAULT_STATUS.to_string()),
        email: text(COL_EMAIL, "email")?,
        telefono: text(COL_PHONE, "telefono")?,
        telefono_alterno: text(COL_ALT_PHONE, "telefono_alterno")?,
    }))
}

/// Split a full name into (given names, surnames)
///
/// Heuristic tuned for the usual two-given-names/two-surnames convention:
/// - 4+ words: first two are given names, the rest surnames
/// - 3 words: first two are given names, the last one the surname
/// - 2 words: one each
/// - 1 word: the same word fills both fields
/// - blank: fixed placeholders
///
/// Names that follow other conventions are split approximately.
pub fn split_full_name(full_name: &str) -> (String, String) {
    let words: Vec<&str> = full_name.split_whitespace().collect();

    match words.len() {
        0 => (
            PLACEHOLDER_GIVEN_NAMES.to_string(),
            PLACEHOLDER_SURNAMES.to_string(),
        ),
        1 => (words[0].to_string(), words[0].to_string()),
        2 => (words[0].to_string(), words[1].to_string()),
        3 => (words[..2].join(" "), words[2].to_string()),
        _ => (words[..2].join(" "), words[2..].join(" ")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sheet(rows: &[Vec<&str>]) -> SheetGrid {
        SheetGrid::from_strings("Ficha", rows)
    }

    #[test]
    fn test_parse_full_row() {
        let grid = sheet(&[vec![
            "TI",
            "1001234567",
            "  MARÍA   JOSÉ LÓPEZ ",
            "EN FORMACION",
            "maria@correo.com",
            "3001234567",
            "6041234567",
        ]]);

        let record = parse_row(&grid, 0).unwrap().unwrap();
        assert_eq!(record.row, 1);
        assert_eq!(record.tipo_documento, "TI");
        assert_eq!(record.numero_documento, "1001234567");
        assert_eq!(record.nombre_completo, "MARÍA JOSÉ LÓPEZ");
        assert_eq!(record.estado, "EN FORMACION");
        assert_eq!(record.email.as_deref(), Some("maria@correo.com"));
        assert_eq!(record.telefono.as_deref(), Some("3001234567"));
        assert_eq!(record.telefono_alterno.as_deref(), Some("6041234567"));
    }

    #[test]
    fn test_parse_row_defaults() {
        let grid = sheet(&[vec!["", "123456", "ANA RUIZ"]]);
        let record = parse_row(&grid, 0).unwrap().unwrap();
        assert_eq!(record.tipo_documento, DEFAULT_DOCUMENT_TYPE);
        assert_eq!(record.estado, DEFAULT_STATUS);
        assert_eq!(record.email, None);
        assert_eq!(record.telefono, None);
        assert_eq!(record.telefono_alterno, None);
    }

    #[test]
    fn test_rows_missing_document_or_name_are_skipped_silently() {
        let grid = sheet(&[
            vec!["CC", "", "SIN DOCUMENTO"],
            vec!["CC", "555555", "   "],
            vec!["CC", "777777", "VALIDO UNO"],
        ]);

        let parsed = parse_rows(&grid, 0);
        assert_eq!(parsed.records.len(), 1);
        assert_eq!(parsed.records[0].numero_documento, "777777");
        assert!(parsed.failures.is_empty());
    }

    #[test]
    fn test_blank_rows_skipped() {
        let grid = sheet(&[
            vec!["", "", "", ""],
            vec!["  ", " "],
            vec!["CC", "888888", "OTRO"],
        ]);
        let parsed = parse_rows(&grid, 0);
        assert_eq!(parsed.records.len(), 1);
        assert_eq!(parsed.records[0].row, 3);
    }

    #[test]
    fn test_invalid_cell_reported_and_parsing_continues() {
        let mut grid = sheet(&[
            vec!["CC", "111111", "PRIMERO"],
            vec!["CC", "222222", "SEGUNDO", "MATRICULADO", ""],
            vec!["CC", "333333", "TERCERO"],
        ]);
        grid.rows[1][4] = Cell::Invalid("NA".to_string());

        let parsed = parse_rows(&grid, 0);
        assert_eq!(parsed.records.len(), 2);
        assert_eq!(parsed.failures.len(), 1);
        assert_eq!(parsed.failures[0].row, 2);
        assert_eq!(parsed.failures[0].field, "email");
    }

    #[test]
    fn test_parse_rows_respects_data_start() {
        let grid = sheet(&[
            vec!["Identificación", "", "Nombre"],
            vec!["CC", "444444", "DESDE DATA"],
        ]);
        let parsed = parse_rows(&grid, 1);
        assert_eq!(parsed.records.len(), 1);
        assert_eq!(parsed.records[0].row, 2);
    }

    #[test]
    fn test_split_four_or_more_words() {
        assert_eq!(
            split_full_name("JUAN CARLOS PÉREZ GÓMEZ"),
            ("JUAN CARLOS".to_string(), "PÉREZ GÓMEZ".to_string())
        );
        assert_eq!(
            split_full_name("ANA MARIA DE LOS RIOS"),
            ("ANA MARIA".to_string(), "DE LOS RIOS".to_string())
        );
    }

    #[test]
    fn test_split_three_words() {
        assert_eq!(
            split_full_name("JUAN PÉREZ GARCÍA"),
            ("JUAN PÉREZ".to_string(), "GARCÍA".to_string())
        );
    }

    #[test]
    fn test_split_two_words() {
        assert_eq!(
            split_full_name("LUIS TORRES"),
            ("LUIS".to_string(), "TORRES".to_string())
        );
    }

    #[test]
    fn test_split_single_word() {
        assert_eq!(
            split_full_name("MADONNA"),
            ("MADONNA".to_string(), "MADONNA".to_string())
        );
    }

    #[test]
    fn test_split_is_total() {
        for input in ["", "   ", "\t\n", "X", "A B", "A B C", "A B C D E F"] {
            let (given, surname) = split_full_name(input);
            assert!(!given.trim().is_empty(), "given names blank for {input:?}");
            assert!(!surname.trim().is_empty(), "surnames blank for {input:?}");
        }
        assert_eq!(
            split_full_name(""),
            (
                PLACEHOLDER_GIVEN_NAMES.to_string(),
                PLACEHOLDER_SURNAMES.to_string()
            )
        );
    }
}
