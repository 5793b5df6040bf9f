/// Roster sheet layout detection
///
/// Roster exports are loosely structured: a small metadata block (ficha code,
/// training program) sits above a header row, and the learner table starts
/// right after the header. Labels are matched on folded text (lowercase, no
/// accents) so spelling variants of the same label are accepted.
use serde::Serialize;

use crate::importers::workbook_reader::SheetGrid;
use crate::utils::fold_label;

/// Rows scanned for the ficha code label
pub const FICHA_CODE_SCAN_ROWS: usize = 10;

/// Rows scanned for the training program label
pub const PROGRAM_SCAN_ROWS: usize = 15;

/// Column holding the value next to a metadata label (column C)
const METADATA_VALUE_COL: usize = 2;

/// Where the ficha code of a sheet came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FichaCodeSource {
    /// Labeled "Código Ficha" cell in the metadata block
    Cell,
    /// No labeled cell; the sheet name stands in for the code
    SheetName,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SheetMetadata {
    pub ficha_code: String,
    pub ficha_code_source: FichaCodeSource,
    pub program_name: Option<String>,
}

/// Position of the learner table header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeaderPosition {
    pub row: usize,
    pub identification_col: usize,
    pub name_col: usize,
}

impl HeaderPosition {
    /// First row of learner data
    pub fn data_start(&self) -> usize {
        self.row + 1
    }
}

/// Extract ficha code and program name from the sheet's metadata block
pub fn extract_metadata(grid: &SheetGrid) -> SheetMetadata {
    let code = find_labeled_value(grid, FICHA_CODE_SCAN_ROWS, is_ficha_code_label);
    let program_name = find_labeled_value(grid, PROGRAM_SCAN_ROWS, is_program_label);

    match code {
        Some(ficha_code) => SheetMetadata {
            ficha_code,
            ficha_code_source: FichaCodeSource::Cell,
            program_name,
        },
        None => SheetMetadata {
            ficha_code: grid.name.trim().to_string(),
            ficha_code_source: FichaCodeSource::SheetName,
            program_name,
        },
    }
}

/// Find the learner table header row
///
/// The header is the first row with one cell mentioning "identificacion" and
/// one mentioning "nombre" (after folding).
pub fn locate_header(grid: &SheetGrid) -> Option<HeaderPosition> {
    grid.rows.iter().enumerate().find_map(|(row_idx, row)| {
        let mut identification_col = None;
        let mut name_col = None;

        for (col_idx, cell) in row.iter().enumerate() {
            let Some(text) = cell.as_text() else {
                continue;
            };
            let folded = fold_label(text);
            if identification_col.is_none() && folded.contains("identificacion") {
                identification_col = Some(col_idx);
            }
            if name_col.is_none() && folded.contains("nombre") {
                name_col = Some(col_idx);
            }
        }

        match (identification_col, name_col) {
            (Some(identification_col), Some(name_col)) => Some(HeaderPosition {
                row: row_idx,
                identification_col,
                name_col,
            }),
            _ => None,
        }
    })
}

fn find_labeled_value<F>(grid: &SheetGrid, max_rows: usize, is_label: F) -> Option<String>
where
    F: Fn(&str) -> bool,
{
    // The first labeled row decides, even when its value cell is blank
    let row_idx = (0..grid.row_count().min(max_rows)).find(|&row_idx| {
        grid.cell(row_idx, 0)
            .as_text()
            .is_some_and(|label| is_label(&fold_label(label)))
    })?;
    grid.cell(row_idx, METADATA_VALUE_COL)
        .as_text()
        .map(str::to_string)
}

fn is_ficha_code_label(folded: &str) -> bool {
    folded == "codigo ficha" || (folded.contains("codigo") && folded.contains("ficha"))
}

fn is_program_label(folded: &str) -> bool {
    folded.contains("programa") && folded.contains("formacion")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(rows: &[Vec<&str>]) -> SheetGrid {
        SheetGrid::from_strings("2845123", rows)
    }

    #[test]
    fn test_extract_metadata_from_block() {
        let sheet = grid(&[
            vec!["Reporte de Aprendices"],
            vec!["Código Ficha:", "", "2845123"],
            vec!["Programa de Formación:", "", "ANALISIS Y DESARROLLO DE SOFTWARE"],
        ]);

        let metadata = extract_metadata(&sheet);
        assert_eq!(metadata.ficha_code, "2845123");
        assert_eq!(metadata.ficha_code_source, FichaCodeSource::Cell);
        assert_eq!(
            metadata.program_name.as_deref(),
            Some("ANALISIS Y DESARROLLO DE SOFTWARE")
        );
    }

    #[test]
    fn test_extract_metadata_label_variants() {
        for label in ["CODIGO FICHA", "código de la ficha", "Ficha - Código"] {
            let sheet = grid(&[vec![label, "", "999"]]);
            assert_eq!(extract_metadata(&sheet).ficha_code, "999", "label {label}");
        }
        for label in ["PROGRAMA DE FORMACION", "Programa formación titulada"] {
            let sheet = grid(&[vec![label, "", "ADSO"]]);
            assert_eq!(
                extract_metadata(&sheet).program_name.as_deref(),
                Some("ADSO"),
                "label {label}"
            );
        }
    }

    #[test]
    fn test_extract_metadata_falls_back_to_sheet_name() {
        let sheet = grid(&[vec!["Identificación", "", "Nombre"]]);
        let metadata = extract_metadata(&sheet);
        assert_eq!(metadata.ficha_code, "2845123");
        assert_eq!(metadata.ficha_code_source, FichaCodeSource::SheetName);
        assert_eq!(metadata.program_name, None);
    }

    #[test]
    fn test_code_label_with_blank_value_falls_back() {
        let sheet = grid(&[vec!["Código Ficha", "", ""]]);
        let metadata = extract_metadata(&sheet);
        assert_eq!(metadata.ficha_code_source, FichaCodeSource::SheetName);
    }

    #[test]
    fn test_first_code_label_row_decides() {
        let sheet = grid(&[
            vec!["Código Ficha", "", ""],
            vec!["Codigo de Ficha", "", "9999999"],
        ]);
        let metadata = extract_metadata(&sheet);
        assert_eq!(metadata.ficha_code_source, FichaCodeSource::SheetName);
        assert_eq!(metadata.ficha_code, "2845123");
    }

    #[test]
    fn test_code_label_beyond_scan_window_ignored() {
        let mut rows: Vec<Vec<&str>> = vec![vec![""]; FICHA_CODE_SCAN_ROWS];
        rows.push(vec!["Código Ficha", "", "123"]);
        let metadata = extract_metadata(&grid(&rows));
        assert_eq!(metadata.ficha_code_source, FichaCodeSource::SheetName);
    }

    #[test]
    fn test_program_label_found_up_to_row_15() {
        let mut rows: Vec<Vec<&str>> = vec![vec![""]; PROGRAM_SCAN_ROWS - 1];
        rows.push(vec!["Programa de Formación", "", "ADSO"]);
        let metadata = extract_metadata(&grid(&rows));
        assert_eq!(metadata.program_name.as_deref(), Some("ADSO"));
    }

    #[test]
    fn test_locate_header_after_metadata() {
        let sheet = grid(&[
            vec!["Código Ficha:", "", "2845123"],
            vec![""],
            vec!["Tipo de Documento", "Número de Identificación", "Nombre", "Estado"],
            vec!["CC", "123456", "ANA RUIZ", "MATRICULADO"],
        ]);

        let header = locate_header(&sheet).expect("header row");
        assert_eq!(header.row, 2);
        assert_eq!(header.identification_col, 1);
        assert_eq!(header.name_col, 2);
        assert_eq!(header.data_start(), 3);
    }

    #[test]
    fn test_locate_header_accent_and_case_variants() {
        for (ident, name) in [
            ("Identificación", "Nombre"),
            ("IDENTIFICACION", "NOMBRES Y APELLIDOS"),
            ("Documento de identificación", "Nombre completo"),
        ] {
            let sheet = grid(&[vec![ident, "", name]]);
            assert!(locate_header(&sheet).is_some(), "{ident} / {name}");
        }
    }

    #[test]
    fn test_locate_header_requires_both_labels() {
        let sheet = grid(&[
            vec!["Identificación", "Documento"],
            vec!["Nombre", "Estado"],
        ]);
        assert_eq!(locate_header(&sheet), None);
    }

    #[test]
    fn test_locate_header_single_cell_with_both_labels() {
        let sheet = grid(&[vec!["Nombre e Identificación", "x"]]);
        let header = locate_header(&sheet).expect("header row");
        assert_eq!(header.row, 0);
        assert_eq!(header.identification_col, 0);
        assert_eq!(header.name_col, 0);
    }

    #[test]
    fn test_locate_header_empty_sheet() {
        assert_eq!(locate_header(&grid(&[])), None);
    }
}
