use serde::{Deserialize, Serialize};
use sqlx::{Connection, PgConnection, PgPool};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, error, info, instrument, warn};
use utoipa::ToSchema;

use crate::db::{
    AprendizRepository, AprendizUpdate, DbError, FichaRepository, ImportLog, ImportLogRepository,
    NewAprendiz, NewFicha, NewImportLog,
};
use crate::importers::field_validator::ValidatedRecord;
use crate::importers::{ParsedSheet, RosterImporter, ValidationMode, WorkbookError};
use crate::services::duplicate_resolver::{resolve, Route};
use crate::services::import_report::{ImportReport, PreviewReport, ReportBuilder};
use crate::utils::normalize_document_type;

/// Jornada given to fichas created during an import
pub const DEFAULT_JORNADA: &str = "mixta";

/// Upper bound for history listings
pub const MAX_HISTORY_LIMIT: i64 = 100;

/// Caller-supplied switches for one import run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct ImportOptions {
    /// Reject records whose ficha does not exist (and is not created)
    pub validate_fichas: bool,
    pub create_missing_fichas: bool,
    pub update_existing: bool,
    pub skip_duplicates: bool,
    pub flexible_validation: bool,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            validate_fichas: false,
            create_missing_fichas: true,
            update_existing: false,
            skip_duplicates: true,
            flexible_validation: false,
        }
    }
}

impl ImportOptions {
    pub fn validation_mode(&self) -> ValidationMode {
        ValidationMode::from_flexible_flag(self.flexible_validation)
    }
}

/// Organisational references stamped on created rows
#[derive(Debug, Clone, Copy)]
pub struct ImportDefaults {
    pub centro_id: i32,
    pub sede_id: i32,
    pub history_limit: i64,
}

impl Default for ImportDefaults {
    fn default() -> Self {
        Self {
            centro_id: 1,
            sede_id: 1,
            history_limit: 20,
        }
    }
}

/// Errors that abort a whole import run
#[derive(Debug, thiserror::Error)]
pub enum RosterImportError {
    #[error("File format error: {0}")]
    FileFormat(#[from] WorkbookError),

    #[error("{0}")]
    Database(#[from] DbError),

    #[error("Background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<sqlx::Error> for RosterImportError {
    fn from(e: sqlx::Error) -> Self {
        RosterImportError::Database(DbError::from(e))
    }
}

/// Why a single validated record could not be persisted
#[derive(Debug, thiserror::Error)]
pub enum ImportFailure {
    #[error("A learner with document number {0} already exists")]
    Duplicate(String),

    #[error("Ficha {0} does not exist")]
    FichaNotFound(String),

    #[error("Learner with document number {0} disappeared before it could be updated")]
    Missing(String),

    #[error("{0}")]
    Database(#[from] DbError),
}

impl ImportFailure {
    /// Field reported in the error diagnostic
    pub fn field(&self) -> &'static str {
        match self {
            ImportFailure::Duplicate(_) | ImportFailure::Missing(_) => "numero_documento",
            ImportFailure::FichaNotFound(_) => "ficha",
            ImportFailure::Database(_) => "registro",
        }
    }
}

impl From<sqlx::Error> for ImportFailure {
    fn from(e: sqlx::Error) -> Self {
        ImportFailure::Database(DbError::from(e))
    }
}

/// A record with the route chosen for it before the transaction opened
struct PlannedRecord<'a> {
    record: &'a ValidatedRecord,
    route: Route,
    existing_match: bool,
}

/// Service for importing learner rosters from spreadsheets
#[derive(Clone)]
pub struct RosterImportService {
    pool: PgPool,
    aprendiz_repo: AprendizRepository,
    ficha_repo: FichaRepository,
    log_repo: ImportLogRepository,
    defaults: ImportDefaults,
}

impl RosterImportService {
    pub fn new(pool: PgPool, defaults: ImportDefaults) -> Self {
        Self {
            aprendiz_repo: AprendizRepository::new(pool.clone()),
            ficha_repo: FichaRepository::new(pool.clone()),
            log_repo: ImportLogRepository::new(pool.clone()),
            pool,
            defaults,
        }
    }

    /// Import every sheet of a workbook
    ///
    /// 1. Parses and validates all sheets on the blocking pool
    /// 2. Looks up each accepted record by document number and picks a route
    /// 3. Persists the batch in one transaction, one savepoint per record
    /// 4. Records an import log entry (failures here are only logged)
    #[instrument(skip(self, path, options), fields(file_name = %file_name))]
    pub async fn import_workbook(
        &self,
        path: &Path,
        file_name: &str,
        options: &ImportOptions,
    ) -> Result<ImportReport, RosterImportError> {
        let start_time = Instant::now();
        info!("Starting roster import of {} with {:?}", file_name, options);

        let sheets = parse_workbook(path, options.validation_mode()).await?;
        let processing_start = Instant::now();

        let mut report = ReportBuilder::new(1);
        for sheet in &sheets {
            report.add_sheet(sheet);
        }

        let plan = self.plan_records(&sheets, options).await;
        debug!("Planned {} records", plan.len());

        let mut tx = self.pool.begin().await?;
        let mut ficha_cache: HashMap<String, i64> = HashMap::new();

        for planned in &plan {
            let record = planned.record;
            if planned.existing_match {
                report.record_existing_match();
            }

            match &planned.route {
                Route::Skip { reason } => {
                    info!(
                        sheet = %record.sheet,
                        row = record.row,
                        "Learner skipped: {}", reason
                    );
                    report.record_skipped();
                }
                Route::Update { existing_id } => match self.apply_update(&mut tx, record).await {
                    Ok(()) => {
                        debug!("Updated learner {}", existing_id);
                        report.record_updated();
                    }
                    Err(failure) => {
                        log_failure(record, &failure);
                        report.record_failure(record, failure.field(), failure.to_string(), false);
                    }
                },
                Route::Insert => {
                    match self
                        .apply_insert(&mut tx, record, options, &mut ficha_cache)
                        .await
                    {
                        Ok(id) => {
                            debug!("Inserted learner {}", id);
                            report.record_imported();
                        }
                        Err(failure) => {
                            log_failure(record, &failure);
                            let duplicate = matches!(failure, ImportFailure::Duplicate(_))
                                && !planned.existing_match;
                            report.record_failure(
                                record,
                                failure.field(),
                                failure.to_string(),
                                duplicate,
                            );
                        }
                    }
                }
            }
        }

        tx.commit().await?;

        let report = report.finish(processing_start.elapsed(), start_time.elapsed());
        info!(
            "✓ Roster import of {} complete ({} ms): {} imported, {} updated, {} skipped, {} errors",
            file_name,
            report.execution_time,
            report.summary.imported_records,
            report.summary.updated_records,
            report.summary.skipped_records,
            report.summary.error_records
        );

        if let Err(e) = self.record_log(file_name, &report).await {
            warn!("Failed to record import log for {}: {}", file_name, e);
        }

        Ok(report)
    }

    /// Parse and validate a workbook without touching storage
    #[instrument(skip(self, path, options), fields(file_name = %file_name))]
    pub async fn preview_workbook(
        &self,
        path: &Path,
        file_name: &str,
        options: &ImportOptions,
    ) -> Result<PreviewReport, RosterImportError> {
        let sheets = parse_workbook(path, options.validation_mode()).await?;
        let preview = PreviewReport::from_sheets(file_name, &sheets);
        info!(
            "Previewed {}: {} sheets, {} valid of {} records",
            file_name, preview.total_sheets, preview.valid_records, preview.total_records
        );
        Ok(preview)
    }

    /// Most recent import runs, newest first
    #[instrument(skip(self))]
    pub async fn history(&self, limit: Option<i64>) -> Result<Vec<ImportLog>, RosterImportError> {
        let limit = limit
            .unwrap_or(self.defaults.history_limit)
            .clamp(1, MAX_HISTORY_LIMIT);
        Ok(self.log_repo.find_recent(limit).await?)
    }

    async fn plan_records<'a>(
        &self,
        sheets: &'a [ParsedSheet],
        options: &ImportOptions,
    ) -> Vec<PlannedRecord<'a>> {
        let mut plan = Vec::new();
        for record in sheets.iter().flat_map(|s| s.valid_records.iter()) {
            let lookup = self
                .aprendiz_repo
                .find_by_documento(&record.numero_documento)
                .await;
            let existing_match = matches!(lookup, Ok(Some(_)));
            let route = resolve(lookup, options);
            plan.push(PlannedRecord {
                record,
                route,
                existing_match,
            });
        }
        plan
    }

    async fn apply_insert(
        &self,
        conn: &mut PgConnection,
        record: &ValidatedRecord,
        options: &ImportOptions,
        ficha_cache: &mut HashMap<String, i64>,
    ) -> Result<i64, ImportFailure> {
        let mut savepoint = conn.begin().await?;

        let ficha_id = match ficha_cache.get(&record.ficha_codigo) {
            Some(id) => Some(*id),
            None => self.resolve_ficha(&mut savepoint, record, options).await?,
        };

        let aprendiz = self.new_aprendiz(record, ficha_id);
        let id = self
            .aprendiz_repo
            .insert(&mut savepoint, &aprendiz)
            .await
            .map_err(|e| {
                if e.is_unique_violation() {
                    ImportFailure::Duplicate(record.numero_documento.clone())
                } else {
                    ImportFailure::Database(e)
                }
            })?;

        savepoint.commit().await?;

        // Only cache fichas whose savepoint committed
        if let Some(ficha_id) = ficha_id {
            ficha_cache.insert(record.ficha_codigo.clone(), ficha_id);
        }
        Ok(id)
    }

    async fn resolve_ficha(
        &self,
        conn: &mut PgConnection,
        record: &ValidatedRecord,
        options: &ImportOptions,
    ) -> Result<Option<i64>, ImportFailure> {
        if let Some(ficha) = self
            .ficha_repo
            .find_by_codigo_on(conn, &record.ficha_codigo)
            .await?
        {
            return Ok(Some(ficha.id));
        }

        if options.create_missing_fichas {
            let ficha = self
                .ficha_repo
                .create(
                    conn,
                    &NewFicha {
                        codigo: record.ficha_codigo.clone(),
                        nombre_programa: record.programa.clone(),
                        jornada: DEFAULT_JORNADA.to_string(),
                        centro_id: self.defaults.centro_id,
                        sede_id: self.defaults.sede_id,
                    },
                )
                .await?;
            return Ok(Some(ficha.id));
        }

        if options.validate_fichas {
            return Err(ImportFailure::FichaNotFound(record.ficha_codigo.clone()));
        }

        debug!(
            "Ficha {} not found, inserting learner without ficha",
            record.ficha_codigo
        );
        Ok(None)
    }

    async fn apply_update(
        &self,
        conn: &mut PgConnection,
        record: &ValidatedRecord,
    ) -> Result<(), ImportFailure> {
        let mut savepoint = conn.begin().await?;

        let update = AprendizUpdate {
            nombres: record.nombres.clone(),
            apellidos: record.apellidos.clone(),
            email: record.email.clone(),
            telefono: record.telefono.clone(),
            telefono_alterno: record.telefono_alterno.clone(),
        };
        let updated = self
            .aprendiz_repo
            .update_from_import(&mut savepoint, &record.numero_documento, &update)
            .await?;
        if !updated {
            return Err(ImportFailure::Missing(record.numero_documento.clone()));
        }

        savepoint.commit().await?;
        Ok(())
    }

    fn new_aprendiz(&self, record: &ValidatedRecord, ficha_id: Option<i64>) -> NewAprendiz {
        NewAprendiz {
            tipo_documento: normalize_document_type(&record.tipo_documento),
            numero_documento: record.numero_documento.clone(),
            nombres: record.nombres.clone(),
            apellidos: record.apellidos.clone(),
            email: non_blank(&record.email),
            telefono: non_blank(&record.telefono),
            telefono_alterno: non_blank(&record.telefono_alterno),
            estado: record.estado.clone(),
            ficha_id,
            centro_id: self.defaults.centro_id,
            sede_id: self.defaults.sede_id,
        }
    }

    async fn record_log(&self, file_name: &str, report: &ImportReport) -> Result<i64, DbError> {
        let summary = &report.summary;
        let report_json = serde_json::to_value(report).unwrap_or_else(|e| {
            warn!("Could not serialize import report: {}", e);
            serde_json::Value::Null
        });

        self.log_repo
            .record(&NewImportLog {
                file_name: file_name.to_string(),
                total_records: count(summary.total_records),
                imported_records: count(summary.imported_records),
                updated_records: count(summary.updated_records),
                skipped_records: count(summary.skipped_records),
                error_records: count(summary.error_records),
                success: report.success,
                duration_ms: report.execution_time as i64,
                report: report_json,
            })
            .await
    }
}

/// Read and validate a workbook on the blocking pool
pub async fn parse_workbook(
    path: &Path,
    mode: ValidationMode,
) -> Result<Vec<ParsedSheet>, RosterImportError> {
    let path: PathBuf = path.to_path_buf();
    let sheets =
        tokio::task::spawn_blocking(move || RosterImporter::new(&path).parse(mode)).await??;
    Ok(sheets)
}

fn log_failure(record: &ValidatedRecord, failure: &ImportFailure) {
    match failure {
        ImportFailure::Database(e) => error!(
            sheet = %record.sheet,
            row = record.row,
            numero_documento = %record.numero_documento,
            "Failed to persist learner: {}", e
        ),
        other => warn!(
            sheet = %record.sheet,
            row = record.row,
            "Learner not persisted: {}", other
        ),
    }
}

fn non_blank(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn count(value: usize) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}
