use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument, warn};

use crate::importers::diagnostics::{ImportDiagnostic, STRUCTURE_FIELD};
use crate::importers::field_validator::{
    validate_records, ValidatedRecord, ValidationBatch, ValidationMode,
};
use crate::importers::row_parser::parse_rows;
use crate::importers::sheet_layout::{extract_metadata, locate_header, SheetMetadata};
use crate::importers::workbook_reader::{SheetGrid, WorkbookError, WorkbookReader};

/// Everything learned from one sheet before touching storage
#[derive(Debug)]
pub struct ParsedSheet {
    pub name: String,
    pub metadata: SheetMetadata,
    /// Learner rows found after the header (valid or not)
    pub total_records: usize,
    pub valid_records: Vec<ValidatedRecord>,
    pub invalid_records: Vec<ValidatedRecord>,
    pub errors: Vec<ImportDiagnostic>,
    pub warnings: Vec<ImportDiagnostic>,
}

impl ParsedSheet {
    pub fn has_structure(&self) -> bool {
        !self
            .errors
            .iter()
            .any(|e| e.row == 0 && e.field == STRUCTURE_FIELD)
    }
}

/// Parses roster workbooks into validated learner records
pub struct RosterImporter {
    workbook_path: PathBuf,
}

impl RosterImporter {
    pub fn new(workbook_path: impl AsRef<Path>) -> Self {
        Self {
            workbook_path: workbook_path.as_ref().to_path_buf(),
        }
    }

    /// Read and parse every sheet of the workbook
    ///
    /// Synchronous: async callers should run this with `spawn_blocking`.
    #[instrument(skip(self), fields(path = %self.workbook_path.display()))]
    pub fn parse(&self, mode: ValidationMode) -> Result<Vec<ParsedSheet>, WorkbookError> {
        let sheets = WorkbookReader::new(&self.workbook_path).read_all()?;
        let parsed = parse_sheets(&sheets, mode);

        info!(
            "Parsed {} sheets, {} learner rows",
            parsed.len(),
            parsed.iter().map(|s| s.total_records).sum::<usize>()
        );
        Ok(parsed)
    }
}

pub fn parse_sheets(sheets: &[SheetGrid], mode: ValidationMode) -> Vec<ParsedSheet> {
    sheets.iter().map(|grid| parse_sheet(grid, mode)).collect()
}

/// Run metadata extraction, header location, row parsing and validation on
/// one sheet. A sheet without a header yields no records and a single
/// structural error.
pub fn parse_sheet(grid: &SheetGrid, mode: ValidationMode) -> ParsedSheet {
    let metadata = extract_metadata(grid);
    debug!(
        "Sheet '{}': ficha {} ({:?}), program {:?}",
        grid.name, metadata.ficha_code, metadata.ficha_code_source, metadata.program_name
    );

    let Some(header) = locate_header(grid) else {
        warn!("Sheet '{}' has no learner header row, skipping", grid.name);
        return ParsedSheet {
            name: grid.name.clone(),
            metadata,
            total_records: 0,
            valid_records: Vec::new(),
            invalid_records: Vec::new(),
            errors: vec![ImportDiagnostic::missing_headers(&grid.name)],
            warnings: Vec::new(),
        };
    };
    debug!("Sheet '{}': header at row {}", grid.name, header.row + 1);

    let rows = parse_rows(grid, header.data_start());
    let ValidationBatch {
        valid_records,
        invalid_records,
        errors,
        mut warnings,
    } = validate_records(&rows.records, &grid.name, &metadata, mode);

    warnings.extend(rows.failures.iter().map(|failure| {
        ImportDiagnostic::warning(
            &grid.name,
            failure.row,
            failure.field,
            Some(failure.value.as_str()),
            format!("Row could not be read: {failure}"),
        )
    }));

    ParsedSheet {
        name: grid.name.clone(),
        metadata,
        total_records: rows.records.len(),
        valid_records,
        invalid_records,
        errors,
        warnings,
    }
}
