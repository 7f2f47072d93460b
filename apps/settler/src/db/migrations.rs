use super::*;

// Idempotent; it creates `settler.schema_migrations` and records itself as v1.
const BOOTSTRAP: &str = include_str!("../../db/migrations/0001_schema.sql");

const VERSIONED: &[(i32, &str)] = &[(
    2,
    include_str!("../../db/migrations/0002_eligibility_index.sql"),
)];

/// "SETTLER1"
const MIGRATION_LOCK_KEY: i64 = 0x5345_5454_4C45_5231;

impl SettlerDb {
    /// Brings the `settler` schema up to date. Concurrent instances serialize on a
    /// session advisory lock, so lock, migrations and unlock share one connection.
    pub async fn migrate(&self) -> Result<()> {
        let mut conn = self
            .pool
            .acquire()
            .await
            .context("acquire migration connection")?;

        sqlx::query("select pg_advisory_lock($1)")
            .bind(MIGRATION_LOCK_KEY)
            .execute(&mut *conn)
            .await
            .context("take settler migration lock")?;

        let res = apply_pending(&mut conn).await;

        if let Err(err) = sqlx::query("select pg_advisory_unlock($1)")
            .bind(MIGRATION_LOCK_KEY)
            .execute(&mut *conn)
            .await
        {
            tracing::warn!(err = %err, "release settler migration lock");
        }

        res
    }
}

async fn apply_pending(conn: &mut PgConnection) -> Result<()> {
    run_statements(conn, BOOTSTRAP)
        .await
        .context("bootstrap settler schema")?;

    let applied: Vec<i32> = sqlx::query_scalar("select version from settler.schema_migrations")
        .fetch_all(&mut *conn)
        .await
        .context("read applied settler migrations")?;

    for (version, sql) in VERSIONED.iter().filter(|(v, _)| !applied.contains(v)) {
        apply_version(conn, *version, sql)
            .await
            .with_context(|| format!("settler migration v{version}"))?;
        tracing::info!(version, "applied settler migration");
    }
    Ok(())
}

async fn apply_version(conn: &mut PgConnection, version: i32, sql: &str) -> Result<()> {
    let mut tx = conn.begin().await.context("begin")?;
    run_statements(&mut *tx, sql).await?;
    sqlx::query("insert into settler.schema_migrations(version) values ($1)")
        .bind(version)
        .execute(&mut *tx)
        .await
        .context("record version")?;
    tx.commit().await.context("commit")
}

async fn run_statements<E>(exec: &mut E, sql: &str) -> Result<()>
where
    for<'c> &'c mut E: Executor<'c, Database = Postgres>,
{
    for stmt in statements(sql) {
        sqlx::query(stmt).execute(&mut *exec).await.with_context(|| {
            format!("statement `{}`", stmt.lines().next().unwrap_or_default())
        })?;
    }
    Ok(())
}

/// Migration files are plain `;`-separated DDL without functions or quoted semicolons.
fn statements(sql: &str) -> impl Iterator<Item = &str> {
    sql.split(';').map(str::trim).filter(|s| !s.is_empty())
}
