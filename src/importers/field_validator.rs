/// Per-field validation of learner records
///
/// Each record is checked against a fixed rule per field. In strict mode any
/// issue rejects the record; in flexible mode only issues on
/// [`CRITICAL_FIELDS`] reject it and the rest are reported as warnings.
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use crate::importers::diagnostics::ImportDiagnostic;
use crate::importers::row_parser::{split_full_name, SheetRecord};
use crate::importers::sheet_layout::SheetMetadata;
use crate::utils::{collapse_whitespace, fold_label, normalize_document_type, DOCUMENT_TYPES};

pub const DOCUMENT_NUMBER_LEN: std::ops::RangeInclusive<usize> = 5..=20;
pub const NAME_MAX_LEN: usize = 100;
pub const EMAIL_MAX_LEN: usize = 150;
pub const PHONE_DIGITS: std::ops::RangeInclusive<usize> = 7..=15;

/// Enrollment statuses accepted in the "estado" column (folded, uppercase)
pub const ENROLLMENT_STATUSES: [&str; 11] = [
    "MATRICULADO",
    "EN FORMACION",
    "INDUCCION",
    "CONDICIONADO",
    "APLAZADO",
    "CANCELADO",
    "RETIRO VOLUNTARIO",
    "TRASLADADO",
    "REINGRESADO",
    "POR CERTIFICAR",
    "CERTIFICADO",
];

static DOCUMENT_NUMBER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9-]+$").expect("valid document number pattern"));

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}$").expect("valid email pattern")
});

static PHONE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\+?[0-9]+$").expect("valid phone pattern"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationMode {
    Strict,
    Flexible,
}

impl ValidationMode {
    pub fn from_flexible_flag(flexible: bool) -> Self {
        if flexible {
            ValidationMode::Flexible
        } else {
            ValidationMode::Strict
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    TipoDocumento,
    NumeroDocumento,
    Nombres,
    Apellidos,
    Estado,
    Email,
    Telefono,
    TelefonoAlterno,
}

impl Field {
    pub fn as_str(&self) -> &'static str {
        match self {
            Field::TipoDocumento => "tipo_documento",
            Field::NumeroDocumento => "numero_documento",
            Field::Nombres => "nombres",
            Field::Apellidos => "apellidos",
            Field::Estado => "estado",
            Field::Email => "email",
            Field::Telefono => "telefono",
            Field::TelefonoAlterno => "telefono_alterno",
        }
    }

    pub fn is_critical(&self) -> bool {
        CRITICAL_FIELDS.contains(self)
    }
}

/// Fields whose violations reject a record even in flexible mode
pub const CRITICAL_FIELDS: [Field; 3] = [Field::NumeroDocumento, Field::Nombres, Field::Apellidos];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldIssue {
    pub field: Field,
    pub value: Option<String>,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordOutcome {
    Valid,
    ValidWithWarnings,
    Rejected,
}

/// A sheet record with split names, sheet context and validation result
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidatedRecord {
    pub sheet: String,
    pub row: usize,
    pub ficha_codigo: String,
    pub programa: Option<String>,
    pub tipo_documento: String,
    pub numero_documento: String,
    pub nombre_completo: String,
    pub nombres: String,
    pub apellidos: String,
    pub estado: String,
    pub email: Option<String>,
    pub telefono: Option<String>,
    pub telefono_alterno: Option<String>,
    pub issues: Vec<FieldIssue>,
    pub outcome: RecordOutcome,
}

impl ValidatedRecord {
    pub fn is_accepted(&self) -> bool {
        self.outcome != RecordOutcome::Rejected
    }
}

/// Validation result for one sheet
#[derive(Debug, Default)]
pub struct ValidationBatch {
    pub valid_records: Vec<ValidatedRecord>,
    pub invalid_records: Vec<ValidatedRecord>,
    pub errors: Vec<ImportDiagnostic>,
    pub warnings: Vec<ImportDiagnostic>,
}

/// Validate all records of a sheet and split them into accepted and rejected
pub fn validate_records(
    records: &[SheetRecord],
    sheet: &str,
    metadata: &SheetMetadata,
    mode: ValidationMode,
) -> ValidationBatch {
    let mut batch = ValidationBatch::default();

    for record in records {
        let validated = validate_record(record, sheet, metadata, mode);
        let rejected = !validated.is_accepted();

        for issue in &validated.issues {
            let demoted = mode == ValidationMode::Flexible && !issue.field.is_critical();
            let diagnostic = if demoted {
                ImportDiagnostic::warning(
                    sheet,
                    validated.row,
                    issue.field.as_str(),
                    issue.value.as_deref(),
                    issue.message.clone(),
                )
            } else {
                ImportDiagnostic::error(
                    sheet,
                    validated.row,
                    issue.field.as_str(),
                    issue.value.as_deref(),
                    issue.message.clone(),
                )
            };
            if diagnostic.is_error() {
                batch.errors.push(diagnostic);
            } else {
                batch.warnings.push(diagnostic);
            }
        }

        if rejected {
            batch.invalid_records.push(validated);
        } else {
            batch.valid_records.push(validated);
        }
    }

    batch
}

/// Normalize and validate a single record
pub fn validate_record(
    record: &SheetRecord,
    sheet: &str,
    metadata: &SheetMetadata,
    mode: ValidationMode,
) -> ValidatedRecord {
    let (nombres, apellidos) = split_full_name(&record.nombre_completo);
    let tipo_documento = normalize_document_type(&record.tipo_documento);
    let numero_documento = record.numero_documento.trim().to_string();
    let estado = collapse_whitespace(&record.estado).to_uppercase();
    let email = record.email.as_deref().map(|e| e.trim().to_lowercase());
    let telefono = record.telefono.as_deref().map(|t| t.trim().to_string());
    let telefono_alterno = record.telefono_alterno.as_deref().map(|t| t.trim().to_string());

    let mut issues = Vec::new();
    let mut check = |field: Field, value: Option<&str>, result: Option<String>| {
        if let Some(message) = result {
            issues.push(FieldIssue {
                field,
                value: value.map(str::to_string),
                message,
            });
        }
    };

    check(
        Field::TipoDocumento,
        Some(tipo_documento.as_str()),
        check_document_type(&tipo_documento),
    );
    check(
        Field::NumeroDocumento,
        Some(numero_documento.as_str()),
        check_document_number(&numero_documento),
    );
    check(
        Field::Nombres,
        Some(nombres.as_str()),
        check_name(&nombres, "Given names"),
    );
    check(
        Field::Apellidos,
        Some(apellidos.as_str()),
        check_name(&apellidos, "Surnames"),
    );
    check(Field::Estado, Some(estado.as_str()), check_status(&estado));
    if let Some(email) = email.as_deref() {
        check(Field::Email, Some(email), check_email(email));
    }
    if let Some(phone) = telefono.as_deref() {
        check(Field::Telefono, Some(phone), check_phone(phone));
    }
    if let Some(phone) = telefono_alterno.as_deref() {
        check(Field::TelefonoAlterno, Some(phone), check_phone(phone));
    }

    let outcome = classify(&issues, mode);

    ValidatedRecord {
        sheet: sheet.to_string(),
        row: record.row,
        ficha_codigo: metadata.ficha_code.clone(),
        programa: metadata.program_name.clone(),
        tipo_documento,
        numero_documento,
        nombre_completo: record.nombre_completo.clone(),
        nombres,
        apellidos,
        estado,
        email,
        telefono,
        telefono_alterno,
        issues,
        outcome,
    }
}

fn classify(issues: &[FieldIssue], mode: ValidationMode) -> RecordOutcome {
    if issues.is_empty() {
        return RecordOutcome::Valid;
    }
    match mode {
        ValidationMode::Strict => RecordOutcome::Rejected,
        ValidationMode::Flexible => {
            if issues.iter().any(|i| i.field.is_critical()) {
                RecordOutcome::Rejected
            } else {
                RecordOutcome::ValidWithWarnings
            }
        }
    }
}

fn check_document_type(value: &str) -> Option<String> {
    (!DOCUMENT_TYPES.contains(&value)).then(|| {
        format!(
            "Unknown document type '{value}'; expected one of {}",
            DOCUMENT_TYPES.join(", ")
        )
    })
}

fn check_document_number(value: &str) -> Option<String> {
    if !DOCUMENT_NUMBER_LEN.contains(&value.chars().count()) {
        return Some(format!(
            "Document number must have between {} and {} characters",
            DOCUMENT_NUMBER_LEN.start(),
            DOCUMENT_NUMBER_LEN.end()
        ));
    }
    (!DOCUMENT_NUMBER_RE.is_match(value))
        .then(|| "Document number may only contain letters, digits and hyphens".to_string())
}

fn check_name(value: &str, label: &str) -> Option<String> {
    if value.trim().is_empty() {
        Some(format!("{label} are required"))
    } else if value.chars().count() > NAME_MAX_LEN {
        Some(format!("{label} exceed {NAME_MAX_LEN} characters"))
    } else {
        None
    }
}

fn check_status(value: &str) -> Option<String> {
    let folded = fold_label(value).to_uppercase();
    (!ENROLLMENT_STATUSES.contains(&folded.as_str()))
        .then(|| format!("Unknown enrollment status '{value}'"))
}

fn check_email(value: &str) -> Option<String> {
    if value.chars().count() > EMAIL_MAX_LEN {
        Some(format!("Email exceeds {EMAIL_MAX_LEN} characters"))
    } else if !EMAIL_RE.is_match(value) {
        Some("Email address is not valid".to_string())
    } else {
        None
    }
}

fn check_phone(value: &str) -> Option<String> {
    if !PHONE_RE.is_match(value) {
        return Some("Phone may only contain digits and an optional leading '+'".to_string());
    }
    let digits = value.trim_start_matches('+').len();
    (!PHONE_DIGITS.contains(&digits)).then(|| {
        format!(
            "Phone must have between {} and {} digits",
            PHONE_DIGITS.start(),
            PHONE_DIGITS.end()
        )
    })
}
