use rust_xlsxwriter::{Color, Format, FormatAlign, Workbook, XlsxError};

pub const TEMPLATE_FILE_NAME: &str = "plantilla_aprendices.xlsx";
pub const XLSX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// Header row of the learner table, in column order
pub const TEMPLATE_HEADERS: [&str; 7] = [
    "Tipo de Documento",
    "Número de Identificación",
    "Nombre Completo",
    "Estado",
    "Correo Electrónico",
    "Teléfono",
    "Teléfono Alterno",
];

const SAMPLE_ROW: [&str; 7] = [
    "CC",
    "1000000000",
    "NOMBRE1 NOMBRE2 APELLIDO1 APELLIDO2",
    "MATRICULADO",
    "aprendiz@correo.com",
    "3000000000",
    "",
];

const HEADER_ROW: u32 = 3;

fn label_format() -> Format {
    Format::new().set_bold()
}

fn header_format() -> Format {
    Format::new()
        .set_bold()
        .set_align(FormatAlign::Center)
        .set_background_color(Color::RGB(0xD9E1F2))
}

/// Build the roster template workbook
///
/// Layout matches what the importer looks for: "Código Ficha" and
/// "Programa de Formación" labels in column A with their values in column C,
/// then the header row and one example learner.
pub fn build_template() -> Result<Vec<u8>, XlsxError> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name("Ficha")?;

    let label = label_format();
    worksheet.write_string_with_format(0, 0, "Código Ficha", &label)?;
    worksheet.write_string(0, 2, "0000000")?;
    worksheet.write_string_with_format(1, 0, "Programa de Formación", &label)?;
    worksheet.write_string(1, 2, "NOMBRE DEL PROGRAMA")?;

    let hfmt = header_format();
    for (col, header) in TEMPLATE_HEADERS.iter().enumerate() {
        worksheet.write_string_with_format(HEADER_ROW, col as u16, *header, &hfmt)?;
        worksheet.set_column_width(col as u16, 24.0)?;
    }

    for (col, value) in SAMPLE_ROW.iter().enumerate() {
        if !value.is_empty() {
            worksheet.write_string(HEADER_ROW + 1, col as u16, *value)?;
        }
    }

    workbook.save_to_buffer()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::importers::field_validator::ValidationMode;
    use crate::importers::roster_importer::RosterImporter;
    use crate::importers::sheet_layout::FichaCodeSource;
    use std::io::Write;

    #[test]
    fn test_template_is_importable() {
        let bytes = build_template().expect("template builds");

        let mut file = tempfile::Builder::new()
            .suffix(".xlsx")
            .tempfile()
            .unwrap();
        file.write_all(&bytes).unwrap();

        let sheets = RosterImporter::new(file.path())
            .parse(ValidationMode::Strict)
            .unwrap();
        assert_eq!(sheets.len(), 1);

        let sheet = &sheets[0];
        assert_eq!(sheet.name, "Ficha");
        assert_eq!(sheet.metadata.ficha_code, "0000000");
        assert_eq!(sheet.metadata.ficha_code_source, FichaCodeSource::Cell);
        assert_eq!(
            sheet.metadata.program_name.as_deref(),
            Some("NOMBRE DEL PROGRAMA")
        );
        assert!(sheet.errors.is_empty(), "{:?}", sheet.errors);
        assert_eq!(sheet.valid_records.len(), 1);
        assert_eq!(sheet.valid_records[0].nombres, "NOMBRE1 NOMBRE2");
        assert_eq!(sheet.valid_records[0].apellidos, "APELLIDO1 APELLIDO2");
    }
}
