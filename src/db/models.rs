use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use utoipa::ToSchema;

// Database entity models
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Aprendiz {
    pub id: i64,
    pub tipo_documento: String,
    pub numero_documento: String,
    pub nombres: String,
    pub apellidos: String,
    pub email: Option<String>,
    pub telefono: Option<String>,
    pub telefono_alterno: Option<String>,
    pub estado: String,
    pub ficha_id: Option<i64>,
    pub centro_id: Option<i32>,
    pub sede_id: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Ficha {
    pub id: i64,
    pub codigo: String,
    pub nombre_programa: Option<String>,
    pub jornada: String,
    pub centro_id: Option<i32>,
    pub sede_id: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ImportLog {
    pub id: i64,
    pub file_name: String,
    pub total_records: i32,
    pub imported_records: i32,
    pub updated_records: i32,
    pub skipped_records: i32,
    pub error_records: i32,
    pub success: bool,
    pub duration_ms: i64,
    #[schema(value_type = Object)]
    pub report: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

// Write-side inputs
#[derive(Debug, Clone)]
pub struct NewAprendiz {
    pub tipo_documento: String,
    pub numero_documento: String,
    pub nombres: String,
    pub apellidos: String,
    pub email: Option<String>,
    pub telefono: Option<String>,
    pub telefono_alterno: Option<String>,
    pub estado: String,
    pub ficha_id: Option<i64>,
    pub centro_id: i32,
    pub sede_id: i32,
}

/// Fields overwritten when an existing learner is re-imported
///
/// Names are always replaced; contact fields only when present.
#[derive(Debug, Clone)]
pub struct AprendizUpdate {
    pub nombres: String,
    pub apellidos: String,
    pub email: Option<String>,
    pub telefono: Option<String>,
    pub telefono_alterno: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewFicha {
    pub codigo: String,
    pub nombre_programa: Option<String>,
    pub jornada: String,
    pub centro_id: i32,
    pub sede_id: i32,
}

#[derive(Debug, Clone)]
pub struct NewImportLog {
    pub file_name: String,
    pub total_records: i32,
    pub imported_records: i32,
    pub updated_records: i32,
    pub skipped_records: i32,
    pub error_records: i32,
    pub success: bool,
    pub duration_ms: i64,
    pub report: serde_json::Value,
}
