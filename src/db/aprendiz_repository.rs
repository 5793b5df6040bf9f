use sqlx::{PgConnection, PgPool};
use tracing::{debug, error, instrument};

use crate::db::{Aprendiz, AprendizUpdate, DbError, NewAprendiz};

const APRENDIZ_COLUMNS: &str = r#"
    id, tipo_documento, numero_documento, nombres, apellidos,
    email, telefono, telefono_alterno, estado,
    ficha_id, centro_id, sede_id, created_at, updated_at
"#;

#[derive(Clone)]
pub struct AprendizRepository {
    pool: PgPool,
}

impl AprendizRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[instrument(skip(self), fields(numero_documento = %numero_documento))]
    pub async fn find_by_documento(
        &self,
        numero_documento: &str,
    ) -> Result<Option<Aprendiz>, DbError> {
        debug!("Querying learner by document number");

        let aprendiz = sqlx::query_as::<_, Aprendiz>(&format!(
            "SELECT {APRENDIZ_COLUMNS} FROM aprendices WHERE numero_documento = $1"
        ))
        .bind(numero_documento)
        .fetch_optional(&self.pool)
        .await?;

        Ok(aprendiz)
    }

    /// Insert a learner on the given connection (usually a transaction)
    ///
    /// Fails with a unique violation when the document number already exists.
    #[instrument(skip(self, conn, aprendiz), fields(numero_documento = %aprendiz.numero_documento))]
    pub async fn insert(
        &self,
        conn: &mut PgConnection,
        aprendiz: &NewAprendiz,
    ) -> Result<i64, DbError> {
        let id = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO aprendices (
                tipo_documento, numero_documento, nombres, apellidos,
                email, telefono, telefono_alterno, estado,
                ficha_id, centro_id, sede_id
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING id
            "#,
        )
        .bind(&aprendiz.tipo_documento)
        .bind(&aprendiz.numero_documento)
        .bind(&aprendiz.nombres)
        .bind(&aprendiz.apellidos)
        .bind(&aprendiz.email)
        .bind(&aprendiz.telefono)
        .bind(&aprendiz.telefono_alterno)
        .bind(&aprendiz.estado)
        .bind(aprendiz.ficha_id)
        .bind(aprendiz.centro_id)
        .bind(aprendiz.sede_id)
        .fetch_one(&mut *conn)
        .await
        .map_err(|e| {
            error!(
                numero_documento = %aprendiz.numero_documento,
                error = %e,
                "Failed to insert learner"
            );
            e
        })?;

        debug!("Inserted learner {}", id);
        Ok(id)
    }

    /// Overwrite names and, when non-blank, contact fields of an existing learner
    ///
    /// Returns false when no learner has that document number.
    #[instrument(skip(self, conn, update), fields(numero_documento = %numero_documento))]
    pub async fn update_from_import(
        &self,
        conn: &mut PgConnection,
        numero_documento: &str,
        update: &AprendizUpdate,
    ) -> Result<bool, DbError> {
        let result = sqlx::query(
            r#"
            UPDATE aprendices
            SET nombres = $2,
                apellidos = $3,
                email = COALESCE(NULLIF(BTRIM($4::text), ''), email),
                telefono = COALESCE(NULLIF(BTRIM($5::text), ''), telefono),
                telefono_alterno = COALESCE(NULLIF(BTRIM($6::text), ''), telefono_alterno),
                updated_at = NOW()
            WHERE numero_documento = $1
            "#,
        )
        .bind(numero_documento)
        .bind(&update.nombres)
        .bind(&update.apellidos)
        .bind(&update.email)
        .bind(&update.telefono)
        .bind(&update.telefono_alterno)
        .execute(&mut *conn)
        .await?;

        debug!("Updated {} learner rows", result.rows_affected());
        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self))]
    pub async fn count_by_ficha(&self, ficha_id: i64) -> Result<i64, DbError> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM aprendices WHERE ficha_id = $1",
        )
        .bind(ficha_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }
}
