use sqlx::{PgConnection, PgPool};
use tracing::{debug, info, instrument};

use crate::db::{DbError, Ficha, NewFicha};

const FICHA_COLUMNS: &str = r#"
    id, codigo, nombre_programa, jornada, centro_id, sede_id, created_at, updated_at
"#;

#[derive(Clone)]
pub struct FichaRepository {
    pool: PgPool,
}

impl FichaRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[instrument(skip(self), fields(codigo = %codigo))]
    pub async fn find_by_codigo(&self, codigo: &str) -> Result<Option<Ficha>, DbError> {
        let mut conn = self.pool.acquire().await?;
        self.find_by_codigo_on(&mut conn, codigo).await
    }

    /// Look up a ficha on an existing connection so uncommitted fichas created
    /// earlier in the same transaction are visible
    #[instrument(skip(self, conn), fields(codigo = %codigo))]
    pub async fn find_by_codigo_on(
        &self,
        conn: &mut PgConnection,
        codigo: &str,
    ) -> Result<Option<Ficha>, DbError> {
        let ficha = sqlx::query_as::<_, Ficha>(&format!(
            "SELECT {FICHA_COLUMNS} FROM fichas WHERE codigo = $1"
        ))
        .bind(codigo)
        .fetch_optional(&mut *conn)
        .await?;

        if ficha.is_some() {
            debug!("Found ficha");
        } else {
            debug!("Ficha not found");
        }
        Ok(ficha)
    }

    #[instrument(skip(self, conn, ficha), fields(codigo = %ficha.codigo))]
    pub async fn create(&self, conn: &mut PgConnection, ficha: &NewFicha) -> Result<Ficha, DbError> {
        let created = sqlx::query_as::<_, Ficha>(&format!(
            r#"
            INSERT INTO fichas (codigo, nombre_programa, jornada, centro_id, sede_id)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {FICHA_COLUMNS}
            "#
        ))
        .bind(&ficha.codigo)
        .bind(&ficha.nombre_programa)
        .bind(&ficha.jornada)
        .bind(ficha.centro_id)
        .bind(ficha.sede_id)
        .fetch_one(&mut *conn)
        .await?;

        info!("Created ficha {} ({})", created.codigo, created.id);
        Ok(created)
    }
}
