// Learner roster importers: workbook reading, layout detection, row parsing
// and field validation. Nothing in here touches the database.

pub mod diagnostics;
pub mod field_validator;
pub mod roster_importer;
pub mod row_parser;
pub mod sheet_layout;
pub mod template;
pub mod workbook_reader;

// Re-export commonly used items
pub use diagnostics::{ImportDiagnostic, Severity};
pub use field_validator::{ValidatedRecord, ValidationMode, CRITICAL_FIELDS};
pub use roster_importer::{ParsedSheet, RosterImporter};
pub use row_parser::{split_full_name, SheetRecord};
pub use sheet_layout::{HeaderPosition, SheetMetadata};
pub use workbook_reader::{Cell, SheetGrid, WorkbookError, WorkbookReader};
