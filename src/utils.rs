/// Shared text helpers for roster workbooks
///
/// Fold a spreadsheet label for fuzzy matching: lowercase and strip the
/// Spanish diacritics that appear in column headers.
///
/// Header detection compares folded text, so "Identificación", "IDENTIFICACION"
/// and "identificacion" all match the same rule.
///
/// # Examples
///
/// ```
/// use roster_import_service::utils::fold_label;
///
/// assert_eq!(fold_label("Código Ficha"), "codigo ficha");
/// assert_eq!(fold_label("  Programa de FORMACIÓN "), "programa de formacion");
/// ```
pub fn fold_label(value: &str) -> String {
    value
        .trim()
        .to_lowercase()
        .chars()
        .map(|c| match c {
            'á' | 'à' | 'ä' | 'â' => 'a',
            'é' | 'è' | 'ë' | 'ê' => 'e',
            'í' | 'ì' | 'ï' | 'î' => 'i',
            'ó' | 'ò' | 'ö' | 'ô' => 'o',
            'ú' | 'ù' | 'ü' | 'û' => 'u',
            other => other,
        })
        .collect()
}

/// Accepted document types after synonym mapping
pub const DOCUMENT_TYPES: [&str; 6] = ["CC", "TI", "CE", "PP", "PEP", "RC"];

/// Normalize a document type cell to its canonical code
///
/// Applies the legacy synonyms found in older roster exports (e.g. "PPT" for
/// the temporary protection permit, which is stored as "PP"). Unknown values
/// are returned uppercased so the validator can report them verbatim.
///
/// Both the validator and the person insert path call this, so a value is
/// mapped the same way no matter which stage sees it first.
///
/// ```
/// use roster_import_service::utils::normalize_document_type;
///
/// assert_eq!(normalize_document_type("ppt"), "PP");
/// assert_eq!(normalize_document_type("Cédula"), "CC");
/// assert_eq!(normalize_document_type("TI"), "TI");
/// ```
pub fn normalize_document_type(value: &str) -> String {
    let folded = fold_label(value).to_uppercase();
    let compact: String = folded.split_whitespace().collect::<Vec<_>>().join(" ");

    let mapped = match compact.as_str() {
        "PPT" => "PP",
        "PASAPORTE" => "PP",
        "CEDULA" | "CEDULA DE CIUDADANIA" | "C.C." | "C.C" => "CC",
        "TARJETA DE IDENTIDAD" | "T.I." | "T.I" => "TI",
        "CEDULA DE EXTRANJERIA" | "C.E." | "C.E" => "CE",
        "REGISTRO CIVIL" | "R.C." => "RC",
        _ => return compact,
    };

    mapped.to_string()
}

/// Collapse internal whitespace runs to single spaces and trim the ends
pub fn collapse_whitespace(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}
