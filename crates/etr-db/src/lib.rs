use anyhow::{Context, Result};
use async_trait::async_trait;
use etr_reconcile::{AggregateStore, AggregateTxn, Company, StoreError, Tin};
use serde_json::Value;
use sqlx::{postgres::PgPoolOptions, PgPool, Postgres, Transaction};

pub const ENV_DB_URL: &str = "ETR_DATABASE_URL";

/// Connect to Postgres using ETR_DATABASE_URL.
pub async fn connect_from_env() -> Result<PgPool> {
    let url = std::env::var(ENV_DB_URL).with_context(|| format!("missing env var {ENV_DB_URL}"))?;
    connect(&url).await
}

pub async fn connect(url: &str) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(url)
        .await
        .context("failed to connect to Postgres")?;

    Ok(pool)
}

/// Run embedded SQLx migrations.
pub async fn migrate(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .context("db migrate failed")?;
    Ok(())
}

#[derive(Debug, Clone)]
pub struct DbStatus {
    pub ok: bool,
    pub has_companies_table: bool,
    pub companies: i64,
}

/// Connectivity + schema presence + row count.
pub async fn status(pool: &PgPool) -> Result<DbStatus> {
    let (one,): (i32,) = sqlx::query_as::<_, (i32,)>("select 1")
        .fetch_one(pool)
        .await
        .context("status connectivity query failed")?;

    let (exists,): (bool,) = sqlx::query_as::<_, (bool,)>(
        r#"
        select exists (
            select 1
            from information_schema.tables
            where table_schema='public' and table_name='companies'
        )
        "#,
    )
    .fetch_one(pool)
    .await
    .context("status table-exists query failed")?;

    let companies = if exists {
        let (n,): (i64,) = sqlx::query_as::<_, (i64,)>("select count(*)::bigint from companies")
            .fetch_one(pool)
            .await
            .context("status count query failed")?;
        n
    } else {
        0
    };

    Ok(DbStatus {
        ok: one == 1,
        has_companies_table: exists,
        companies,
    })
}

fn backend(e: sqlx::Error) -> StoreError {
    StoreError::Backend(e.to_string())
}

/// Aggregate store over the `companies` table. Same-TIN transactions are
/// serialized with a transaction-scoped advisory lock on `hashtext(tin)`.
#[derive(Clone)]
pub struct PgAggregateStore {
    pool: PgPool,
}

impl PgAggregateStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl AggregateStore for PgAggregateStore {
    async fn begin(&self, tin: &Tin) -> Result<Box<dyn AggregateTxn>, StoreError> {
        let mut tx = self.pool.begin().await.map_err(backend)?;
        sqlx::query("select pg_advisory_xact_lock(hashtext($1))")
            .bind(tin.as_str())
            .execute(&mut *tx)
            .await
            .map_err(backend)?;

        Ok(Box::new(PgAggregateTxn {
            tx,
            tin: tin.clone(),
            staged: None,
        }))
    }
}

pub struct PgAggregateTxn {
    tx: Transaction<'static, Postgres>,
    tin: Tin,
    staged: Option<Company>,
}

#[async_trait]
impl AggregateTxn for PgAggregateTxn {
    async fn get(&mut self) -> Result<Option<Company>, StoreError> {
        if let Some(c) = &self.staged {
            return Ok(Some(c.clone()));
        }

        let row: Option<(Value,)> =
            sqlx::query_as::<_, (Value,)>("select aggregate from companies where tin = $1")
                .bind(self.tin.as_str())
                .fetch_optional(&mut *self.tx)
                .await
                .map_err(backend)?;

        match row {
            None => Ok(None),
            Some((v,)) => serde_json::from_value(v)
                .map(Some)
                .map_err(|e| StoreError::Corrupt {
                    tin: self.tin.to_string(),
                    reason: e.to_string(),
                }),
        }
    }

    async fn put(&mut self, company: &Company) -> Result<(), StoreError> {
        if company.tin != self.tin {
            return Err(StoreError::TinMismatch {
                expected: self.tin.to_string(),
                got: company.tin.to_string(),
            });
        }
        self.staged = Some(company.clone());
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        let PgAggregateTxn {
            mut tx,
            tin,
            staged,
        } = *self;

        if let Some(company) = staged {
            let aggregate = serde_json::to_value(&company).map_err(|e| StoreError::Corrupt {
                tin: tin.to_string(),
                reason: e.to_string(),
            })?;
            sqlx::query(
                r#"
                insert into companies (tin, aggregate, updated_at_utc)
                values ($1, $2, now())
                on conflict (tin) do update
                  set aggregate = excluded.aggregate,
                      updated_at_utc = excluded.updated_at_utc
                "#,
            )
            .bind(tin.as_str())
            .bind(aggregate)
            .execute(&mut *tx)
            .await
            .map_err(backend)?;
        }

        tx.commit().await.map_err(backend)
    }
}
