pub mod duplicate_resolver;
pub mod import_report;
pub mod roster_import_service;

pub use duplicate_resolver::Route;
pub use import_report::{ImportReport, ImportSummary, PreviewReport, SheetPreview};
pub use roster_import_service::{
    ImportDefaults, ImportFailure, ImportOptions, RosterImportError, RosterImportService,
};
