//! [`SqliteBindings`], the SQLite implementation of [`BindingStore`].

use std::path::Path;

use chrono::Utc;
use livestatus_core::binding::{BindingKey, BindingStore};
use rusqlite::OptionalExtension as _;
use tracing::debug;

use crate::{Error, Result, schema::SCHEMA};

/// A binding registry backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteBindings {
  conn: tokio_rusqlite::Connection,
}

impl SqliteBindings {
  /// Open (or create) a registry at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory registry, for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

impl BindingStore for SqliteBindings {
  type Error = Error;

  async fn get(&self, key: &BindingKey) -> Result<Option<String>> {
    let (kind, subject, group, target) = columns(key);
    let id: Option<String> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT resource_id FROM bindings
                WHERE kind = ?1 AND subject_id = ?2 AND group_id = ?3
                  AND target_id = ?4",
              rusqlite::params![kind, subject, group, target],
              |r| r.get(0),
            )
            .optional()?,
        )
      })
      .await?;
    Ok(id.filter(|id| !id.is_empty()))
  }

  async fn set(&self, key: &BindingKey, resource_id: Option<&str>) -> Result<()> {
    let (kind, subject, group, target) = columns(key);
    let resource_id = resource_id.unwrap_or_default().to_owned();
    let now = Utc::now().to_rfc3339();
    debug!(%kind, %subject, guild = %group, %resource_id, "binding set");
    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO bindings
             (kind, subject_id, group_id, target_id, resource_id, updated_at)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6)
           ON CONFLICT (kind, subject_id, group_id, target_id)
           DO UPDATE SET resource_id = excluded.resource_id,
                         updated_at  = excluded.updated_at",
          rusqlite::params![kind, subject, group, target, resource_id, now],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

/// Owned key columns, ready to move into a connection closure.
fn columns(key: &BindingKey) -> (String, String, String, String) {
  (
    key.kind.as_ref().to_owned(),
    key.subject_id.as_str().to_owned(),
    key.group_id.clone(),
    key.target_id.clone(),
  )
}
