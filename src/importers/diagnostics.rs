use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Field name used for sheet-level structural problems
pub const STRUCTURE_FIELD: &str = "estructura";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

/// One anomaly found while importing a workbook
///
/// `row` is the 1-based spreadsheet row; `0` means the problem concerns the
/// sheet as a whole.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ImportDiagnostic {
    pub row: usize,
    pub sheet: String,
    pub field: String,
    pub value: Option<String>,
    pub message: String,
    pub severity: Severity,
}

impl ImportDiagnostic {
    pub fn error(
        sheet: &str,
        row: usize,
        field: &str,
        value: Option<&str>,
        message: impl Into<String>,
    ) -> Self {
        Self::new(Severity::Error, sheet, row, field, value, message)
    }

    pub fn warning(
        sheet: &str,
        row: usize,
        field: &str,
        value: Option<&str>,
        message: impl Into<String>,
    ) -> Self {
        Self::new(Severity::Warning, sheet, row, field, value, message)
    }

    /// Sheet without a learner header row
    pub fn missing_headers(sheet: &str) -> Self {
        Self::error(
            sheet,
            0,
            STRUCTURE_FIELD,
            None,
            "No header row with 'Identificación' and 'Nombre' columns was found; sheet skipped",
        )
    }

    fn new(
        severity: Severity,
        sheet: &str,
        row: usize,
        field: &str,
        value: Option<&str>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            row,
            sheet: sheet.to_string(),
            field: field.to_string(),
            value: value.map(str::to_string),
            message: message.into(),
            severity,
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}
