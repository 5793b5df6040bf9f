use serde::{Deserialize, Serialize};
use std::time::Duration;
use utoipa::ToSchema;

use crate::importers::field_validator::ValidatedRecord;
use crate::importers::{ImportDiagnostic, ParsedSheet};

/// Sample rows shown per sheet in a preview
pub const PREVIEW_SAMPLE_RECORDS: usize = 5;
/// Sample errors shown per sheet in a preview
pub const PREVIEW_SAMPLE_ERRORS: usize = 3;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ImportSummary {
    pub total_files: usize,
    pub total_sheets: usize,
    pub total_records: usize,
    pub imported_records: usize,
    pub duplicate_records: usize,
    pub error_records: usize,
    pub fichas_processed: Vec<String>,
    pub programas_found: Vec<String>,
    pub updated_records: usize,
    pub skipped_records: usize,
    /// Milliseconds spent parsing, validating and persisting
    pub processing_time: u64,
}

/// Outcome of one import run
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ImportReport {
    /// True when no error diagnostic was produced
    pub success: bool,
    pub summary: ImportSummary,
    pub errors: Vec<ImportDiagnostic>,
    pub warnings: Vec<ImportDiagnostic>,
    pub imported_records: usize,
    pub total_records: usize,
    /// Milliseconds, wall clock for the whole run
    pub execution_time: u64,
}

/// Accumulates counts and diagnostics while an import runs
#[derive(Debug, Default)]
pub struct ReportBuilder {
    summary: ImportSummary,
    errors: Vec<ImportDiagnostic>,
    warnings: Vec<ImportDiagnostic>,
}

impl ReportBuilder {
    pub fn new(total_files: usize) -> Self {
        Self {
            summary: ImportSummary {
                total_files,
                ..ImportSummary::default()
            },
            ..Self::default()
        }
    }

    /// Fold in the parse and validation results of one sheet
    pub fn add_sheet(&mut self, sheet: &ParsedSheet) {
        self.summary.total_sheets += 1;
        self.summary.total_records += sheet.total_records;
        self.summary.error_records += sheet.invalid_records.len();

        if sheet.has_structure() {
            push_unique(&mut self.summary.fichas_processed, &sheet.metadata.ficha_code);
            if let Some(program) = &sheet.metadata.program_name {
                push_unique(&mut self.summary.programas_found, program);
            }
        }

        self.errors.extend(sheet.errors.iter().cloned());
        self.warnings.extend(sheet.warnings.iter().cloned());
    }

    /// An existing learner with the same document number was found
    pub fn record_existing_match(&mut self) {
        self.summary.duplicate_records += 1;
    }

    pub fn record_imported(&mut self) {
        self.summary.imported_records += 1;
    }

    pub fn record_updated(&mut self) {
        self.summary.updated_records += 1;
    }

    pub fn record_skipped(&mut self) {
        self.summary.skipped_records += 1;
    }

    /// A record passed validation but could not be persisted
    ///
    /// `duplicate` adds to the duplicate count unless the match was already
    /// counted by the pre-transaction lookup.
    pub fn record_failure(
        &mut self,
        record: &ValidatedRecord,
        field: &str,
        message: String,
        duplicate: bool,
    ) {
        self.summary.error_records += 1;
        if duplicate {
            self.summary.duplicate_records += 1;
        }
        self.errors.push(ImportDiagnostic::error(
            &record.sheet,
            record.row,
            field,
            Some(record.numero_documento.as_str()),
            message,
        ));
    }

    pub fn finish(mut self, processing: Duration, execution: Duration) -> ImportReport {
        self.summary.processing_time = processing.as_millis() as u64;
        let success = !self.errors.iter().any(ImportDiagnostic::is_error);

        ImportReport {
            success,
            imported_records: self.summary.imported_records,
            total_records: self.summary.total_records,
            summary: self.summary,
            errors: self.errors,
            warnings: self.warnings,
            execution_time: execution.as_millis() as u64,
        }
    }
}

fn push_unique(values: &mut Vec<String>, value: &str) {
    if !values.iter().any(|v| v == value) {
        values.push(value.to_string());
    }
}

/// One learner row as shown in a preview
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PreviewRecord {
    pub row: usize,
    pub tipo_documento: String,
    pub numero_documento: String,
    pub nombres: String,
    pub apellidos: String,
    pub estado: String,
    pub email: Option<String>,
    pub telefono: Option<String>,
}

impl From<&ValidatedRecord> for PreviewRecord {
    fn from(record: &ValidatedRecord) -> Self {
        Self {
            row: record.row,
            tipo_documento: record.tipo_documento.clone(),
            numero_documento: record.numero_documento.clone(),
            nombres: record.nombres.clone(),
            apellidos: record.apellidos.clone(),
            estado: record.estado.clone(),
            email: record.email.clone(),
            telefono: record.telefono.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SheetPreview {
    pub sheet_name: String,
    pub ficha_code: String,
    pub program_name: Option<String>,
    pub student_count: usize,
    pub error_count: usize,
    pub sample_records: Vec<PreviewRecord>,
    pub sample_errors: Vec<ImportDiagnostic>,
}

impl From<&ParsedSheet> for SheetPreview {
    fn from(sheet: &ParsedSheet) -> Self {
        Self {
            sheet_name: sheet.name.clone(),
            ficha_code: sheet.metadata.ficha_code.clone(),
            program_name: sheet.metadata.program_name.clone(),
            student_count: sheet.valid_records.len(),
            error_count: sheet.errors.len(),
            sample_records: sheet
                .valid_records
                .iter()
                .take(PREVIEW_SAMPLE_RECORDS)
                .map(PreviewRecord::from)
                .collect(),
            sample_errors: sheet
                .errors
                .iter()
                .take(PREVIEW_SAMPLE_ERRORS)
                .cloned()
                .collect(),
        }
    }
}

/// Dry-run view of a workbook; nothing is written
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PreviewReport {
    pub file_name: String,
    pub total_sheets: usize,
    pub total_records: usize,
    pub valid_records: usize,
    pub invalid_records: usize,
    pub sheets: Vec<SheetPreview>,
    pub warnings: Vec<ImportDiagnostic>,
}

impl PreviewReport {
    pub fn from_sheets(file_name: &str, sheets: &[ParsedSheet]) -> Self {
        Self {
            file_name: file_name.to_string(),
            total_sheets: sheets.len(),
            total_records: sheets.iter().map(|s| s.total_records).sum(),
            valid_records: sheets.iter().map(|s| s.valid_records.len()).sum(),
            invalid_records: sheets.iter().map(|s| s.invalid_records.len()).sum(),
            sheets: sheets.iter().map(SheetPreview::from).collect(),
            warnings: sheets.iter().flat_map(|s| s.warnings.iter().cloned()).collect(),
        }
    }
}
