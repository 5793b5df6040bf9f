use tracing::warn;

use crate::db::{Aprendiz, DbError};
use crate::services::roster_import_service::ImportOptions;

/// What the executor should do with an accepted record
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Insert,
    Update { existing_id: i64 },
    Skip { reason: String },
}

/// Classify a record from the result of the document-number lookup
///
/// A failed lookup is treated as "not found"; the unique constraint still
/// stops a real duplicate at insert time.
pub fn resolve(lookup: Result<Option<Aprendiz>, DbError>, options: &ImportOptions) -> Route {
    match lookup {
        Ok(Some(existing)) if options.update_existing => Route::Update {
            existing_id: existing.id,
        },
        Ok(Some(existing)) if options.skip_duplicates => Route::Skip {
            reason: format!(
                "Learner with document {} already exists (id {})",
                existing.numero_documento, existing.id
            ),
        },
        Ok(Some(_)) | Ok(None) => Route::Insert,
        Err(e) => {
            warn!("Duplicate lookup failed, attempting insert: {}", e);
            Route::Insert
        }
    }
}
