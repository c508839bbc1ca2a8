use std::str::FromStr;

use anyhow::Result;
use futures::future::BoxFuture;
use sea_query::{ColumnDef, Expr, Func, Iden, Query, SqliteQueryBuilder, Table};
use sea_query_binder::SqlxBinder;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    Row as _, SqlitePool,
};
use tokio::sync::OnceCell;

use super::{ApiEvent, Repository};

#[derive(Iden)]
enum Events {
    Table,
    Dt,
    Event,
    UserId,
    Screen,
    Elem,
    Amount,
}

/// Sqlite storage
///
/// Connections are opened lazily, `events` table is created on first use.
pub struct SqliteRepository {
    pool: SqlitePool,
    schema: OnceCell<()>,
}

impl std::fmt::Debug for SqliteRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteRepository").finish_non_exhaustive()
    }
}

impl SqliteRepository {
    /// Must be called within tokio runtime
    pub fn new(url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
        Ok(Self {
            pool: SqlitePoolOptions::new().connect_lazy_with(options),
            schema: OnceCell::new(),
        })
    }

    async fn init(&self) -> Result<()> {
        self.schema
            .get_or_try_init(|| async {
                let query = Table::create()
                    .table(Events::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Events::Dt).timestamp_with_time_zone().not_null())
                    .col(ColumnDef::new(Events::Event).string().not_null())
                    .col(ColumnDef::new(Events::UserId).string().not_null())
                    .col(ColumnDef::new(Events::Screen).string().not_null())
                    .col(ColumnDef::new(Events::Elem).string().not_null())
                    .col(ColumnDef::new(Events::Amount).big_integer().not_null())
                    .build(SqliteQueryBuilder);
                sqlx::query(&query).execute(&self.pool).await?;
                Ok::<_, anyhow::Error>(())
            })
            .await?;
        Ok(())
    }

    /// Number of stored events named `event`
    pub async fn count(&self, event: &str) -> Result<i64> {
        self.init().await?;
        let (query, values) = Query::select()
            .expr(Func::count(Expr::col(Events::Event)))
            .from(Events::Table)
            .and_where(Expr::col(Events::Event).eq(event))
            .build_sqlx(SqliteQueryBuilder);
        let row = sqlx::query_with(&query, values)
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get(0))
    }
}

impl Repository for SqliteRepository {
    fn insert<'a>(&'a self, event: &'a ApiEvent) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            self.init().await?;
            let (query, values) = Query::insert()
                .into_table(Events::Table)
                .columns([
                    Events::Dt,
                    Events::Event,
                    Events::UserId,
                    Events::Screen,
                    Events::Elem,
                    Events::Amount,
                ])
                .values([
                    event.dt.into(),
                    event.event.as_str().into(),
                    event.user_id.as_str().into(),
                    event.screen.as_str().into(),
                    event.elem.as_str().into(),
                    event.amount.into(),
                ])?
                .build_sqlx(SqliteQueryBuilder);
            sqlx::query_with(&query, values).execute(&self.pool).await?;
            Ok(())
        })
    }
}
