use std::{future::Future, time::Duration};

use async_trait::async_trait;
use sqlx::{PgConnection, PgPool, Postgres, Transaction};

use crate::{db::UnitOfWork, errors::AppError};

/// A Postgres transaction used as a unit of work. Dropping it without
/// committing rolls it back.
pub struct PgUnit {
    tx: Transaction<'static, Postgres>,
    timeout: Duration,
}

impl PgUnit {
    pub async fn begin(pool: &PgPool, timeout: Duration) -> Result<Self, AppError> {
        let tx = bounded(timeout, async {
            pool.begin()
                .await
                .map_err(|e| AppError::Transaction(format!("Failed to begin transaction: {}", e)))
        })
        .await?;
        Ok(Self { tx, timeout })
    }

    pub(crate) fn conn(&mut self) -> &mut PgConnection {
        &mut self.tx
    }
}

#[async_trait]
impl UnitOfWork for PgUnit {
    async fn commit(self) -> Result<(), AppError> {
        let timeout = self.timeout;
        bounded(timeout, async move {
            self.tx
                .commit()
                .await
                .map_err(|e| AppError::Transaction(format!("Failed to commit transaction: {}", e)))
        })
        .await
    }

    async fn rollback(self) -> Result<(), AppError> {
        let timeout = self.timeout;
        bounded(timeout, async move {
            self.tx.rollback().await.map_err(|e| {
                AppError::Transaction(format!("Failed to roll back transaction: {}", e))
            })
        })
        .await
    }
}

/// Bounds a store call by a fixed timeout, independent of the caller.
pub(crate) async fn bounded<T, F>(timeout: Duration, fut: F) -> Result<T, AppError>
where
    F: Future<Output = Result<T, AppError>>,
{
    tokio::time::timeout(timeout, fut)
        .await
        .map_err(|_| AppError::StoreTimeout(timeout))?
}
