// Workbook-to-validated-records tests; no database needed

mod common;

use common::{roster_file, TestSheet};
use roster_import_service::importers::diagnostics::{Severity, STRUCTURE_FIELD};
use roster_import_service::importers::sheet_layout::FichaCodeSource;
use roster_import_service::importers::{split_full_name, RosterImporter, ValidationMode};
use roster_import_service::utils::normalize_document_type;
use rust_xlsxwriter::Workbook;
use std::io::Write;

#[test]
fn test_metadata_and_records_from_generated_workbook() {
    let file = roster_file(&[TestSheet::new(
        "Ficha ADSO",
        Some("2845123"),
        vec![
            vec!["CC", "12345678", "JUAN PÉREZ GARCÍA", "MATRICULADO", "juan@x.com", "3001234567", ""],
            vec!["TI", "1023456789", "ANA MARÍA LÓPEZ RUIZ", "EN FORMACIÓN", "", "", ""],
        ],
    )
    .program("ANÁLISIS Y DESARROLLO DE SOFTWARE")]);

    let sheets = RosterImporter::new(file.path())
        .parse(ValidationMode::Strict)
        .expect("workbook parses");
    assert_eq!(sheets.len(), 1);

    let sheet = &sheets[0];
    assert_eq!(sheet.metadata.ficha_code, "2845123");
    assert_eq!(sheet.metadata.ficha_code_source, FichaCodeSource::Cell);
    assert_eq!(
        sheet.metadata.program_name.as_deref(),
        Some("ANÁLISIS Y DESARROLLO DE SOFTWARE")
    );
    assert_eq!(sheet.total_records, 2);
    assert_eq!(sheet.valid_records.len(), 2);

    let juan = &sheet.valid_records[0];
    assert_eq!(juan.numero_documento, "12345678");
    assert_eq!(juan.nombres, "JUAN PÉREZ");
    assert_eq!(juan.apellidos, "GARCÍA");
    assert_eq!(juan.row, 5);

    let ana = &sheet.valid_records[1];
    assert_eq!(ana.nombres, "ANA MARÍA");
    assert_eq!(ana.apellidos, "LÓPEZ RUIZ");
    assert_eq!(ana.email, None);
}

#[test]
fn test_sheet_name_used_when_no_ficha_cell() {
    let file = roster_file(&[TestSheet::new(
        "2901234",
        None,
        vec![vec!["CC", "87654321", "LUIS TORRES", "", "", "", ""]],
    )]);

    let sheets = RosterImporter::new(file.path())
        .parse(ValidationMode::Strict)
        .unwrap();
    assert_eq!(sheets[0].metadata.ficha_code, "2901234");
    assert_eq!(sheets[0].metadata.ficha_code_source, FichaCodeSource::SheetName);
    assert_eq!(sheets[0].metadata.program_name, None);
    assert_eq!(sheets[0].valid_records[0].estado, "MATRICULADO");
}

#[test]
fn test_blank_document_or_name_rows_are_dropped() {
    let file = roster_file(&[TestSheet::new(
        "S1",
        Some("111"),
        vec![
            vec!["CC", "", "SIN DOCUMENTO", "", "", "", ""],
            vec!["CC", "55555555", "", "", "", "", ""],
            vec!["", "", "", "", "", "", ""],
            vec!["CC", "66666666", "ROSA DIAZ", "", "", "", ""],
        ],
    )]);

    let sheets = RosterImporter::new(file.path())
        .parse(ValidationMode::Strict)
        .unwrap();
    let sheet = &sheets[0];
    assert_eq!(sheet.total_records, 1);
    assert_eq!(sheet.valid_records.len(), 1);
    assert!(sheet.errors.is_empty());
    assert!(sheet.warnings.is_empty());
}

#[test]
fn test_sheet_without_header_is_skipped_with_one_error() {
    let file = roster_file(&[
        TestSheet::new("Resumen", Some("999"), vec![vec!["x", "y"]]).without_header(),
        TestSheet::new(
            "Ficha",
            Some("2845123"),
            vec![vec!["CC", "12345678", "JUAN PÉREZ GARCÍA", "", "", "", ""]],
        ),
    ]);

    let sheets = RosterImporter::new(file.path())
        .parse(ValidationMode::Flexible)
        .unwrap();
    assert_eq!(sheets.len(), 2);

    let summary = &sheets[0];
    assert_eq!(summary.total_records, 0);
    assert_eq!(summary.errors.len(), 1);
    assert_eq!(summary.errors[0].row, 0);
    assert_eq!(summary.errors[0].field, STRUCTURE_FIELD);

    assert_eq!(sheets[1].valid_records.len(), 1);
}

#[test]
fn test_flexible_mode_keeps_record_with_bad_phone() {
    let rows = vec![vec!["CC", "12345678", "JUAN PÉREZ GARCÍA", "MATRICULADO", "", "30-12", ""]];
    let file = roster_file(&[TestSheet::new("S1", Some("2845123"), rows)]);
    let importer = RosterImporter::new(file.path());

    let flexible = importer.parse(ValidationMode::Flexible).unwrap();
    assert_eq!(flexible[0].valid_records.len(), 1);
    assert!(flexible[0].errors.is_empty());
    assert_eq!(flexible[0].warnings.len(), 1);
    assert_eq!(flexible[0].warnings[0].field, "telefono");
    assert_eq!(flexible[0].warnings[0].severity, Severity::Warning);

    let strict = importer.parse(ValidationMode::Strict).unwrap();
    assert!(strict[0].valid_records.is_empty());
    assert_eq!(strict[0].errors.len(), 1);
}

#[test]
fn test_ppt_is_remapped_and_stable() {
    let rows = vec![vec!["PPT", "AB123456", "MARIA GOMEZ", "", "", "", ""]];
    let file = roster_file(&[TestSheet::new("S1", Some("2845123"), rows)]);

    let sheets = RosterImporter::new(file.path())
        .parse(ValidationMode::Strict)
        .unwrap();
    let record = &sheets[0].valid_records[0];
    assert_eq!(record.tipo_documento, "PP");
    // The executor maps again before insert; both paths must agree
    assert_eq!(normalize_document_type(&record.tipo_documento), "PP");
    assert_eq!(normalize_document_type("PPT"), record.tipo_documento);
}

#[test]
fn test_numeric_document_cells_are_read_without_decimals() {
    let mut workbook = Workbook::new();
    let ws = workbook.add_worksheet();
    ws.set_name("Numeros").unwrap();
    ws.write_string(0, 0, "Tipo").unwrap();
    ws.write_string(0, 1, "Identificación").unwrap();
    ws.write_string(0, 2, "Nombre").unwrap();
    ws.write_string(1, 0, "CC").unwrap();
    ws.write_number(1, 1, 1_023_456_789.0).unwrap();
    ws.write_string(1, 2, "PEDRO PABLO LEON").unwrap();
    let bytes = workbook.save_to_buffer().unwrap();

    let mut file = tempfile::Builder::new().suffix(".xlsx").tempfile().unwrap();
    file.write_all(&bytes).unwrap();

    let sheets = RosterImporter::new(file.path())
        .parse(ValidationMode::Strict)
        .unwrap();
    assert_eq!(sheets[0].valid_records[0].numero_documento, "1023456789");
}

#[test]
fn test_name_splitter_is_total() {
    for input in ["", "   ", "ANA", "ANA RUIZ", "JUAN PÉREZ GARCÍA", "A B C D E F", "\tJOSÉ \n LUIS  "] {
        let (nombres, apellidos) = split_full_name(input);
        assert!(!nombres.trim().is_empty(), "blank given names for {input:?}");
        assert!(!apellidos.trim().is_empty(), "blank surnames for {input:?}");
    }
}

#[test]
fn test_unreadable_file_is_a_file_format_error() {
    let mut file = tempfile::Builder::new().suffix(".xlsx").tempfile().unwrap();
    file.write_all(b"definitely not a zip archive").unwrap();
    assert!(RosterImporter::new(file.path())
        .parse(ValidationMode::Strict)
        .is_err());
}
