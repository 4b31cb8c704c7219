//! Persistence of records in the Supabase tables

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use rocal_auth::Auth;
use rocal_postgrest::{affected_rows, PostgrestClient, SortOrder};
use serde_json::{Map, Value};
use tracing::{debug, instrument};

use crate::config::DashboardConfig;
use crate::error::StoreError;
use crate::kinds::RecordKind;
use crate::models::{Record, RecordId};

/// Column values sent on insert or update, keyed by wire column name
pub type Payload = Map<String, Value>;

/// Backend holding the three tables.
///
/// Selects return rows newest first. Updates and deletes that match no row
/// fail with [`StoreError::NotFound`].
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn select(&self, kind: RecordKind) -> Result<Vec<Record>, StoreError>;

    async fn insert(&self, kind: RecordKind, values: Payload) -> Result<(), StoreError>;

    async fn update(
        &self,
        kind: RecordKind,
        id: &RecordId,
        values: Payload,
    ) -> Result<(), StoreError>;

    async fn delete(&self, kind: RecordKind, id: &RecordId) -> Result<(), StoreError>;
}

/// [`RecordStore`] over PostgREST, authorised with the current session
pub struct SupabaseStore {
    url: String,
    anon_key: String,
    http_client: Client,
    auth: Arc<Auth>,
}

impl SupabaseStore {
    pub fn new(config: &DashboardConfig, http_client: Client, auth: Arc<Auth>) -> Self {
        Self {
            url: config.base_url().to_string(),
            anon_key: config.anon_key.clone(),
            http_client,
            auth,
        }
    }

    fn from_table(&self, kind: RecordKind) -> Result<PostgrestClient, StoreError> {
        // Row level security sees the anon role until someone signs in.
        let token = self
            .auth
            .access_token()
            .unwrap_or_else(|| self.anon_key.clone());
        let client = PostgrestClient::new(
            &self.url,
            &self.anon_key,
            kind.table(),
            self.http_client.clone(),
        )
        .with_auth(&token)?;
        Ok(client)
    }
}

#[async_trait]
impl RecordStore for SupabaseStore {
    #[instrument(skip(self), fields(table = kind.table()))]
    async fn select(&self, kind: RecordKind) -> Result<Vec<Record>, StoreError> {
        let rows: Vec<Value> = self
            .from_table(kind)?
            .select("*")
            .order("createdAt", SortOrder::Descending)
            .execute()
            .await?;
        debug!(rows = rows.len(), "fetched");

        rows.into_iter()
            .map(|row| {
                Record::from_value(kind, row).map_err(|e| {
                    StoreError::Decode(format!("{} row: {}", kind.table(), e))
                })
            })
            .collect()
    }

    #[instrument(skip(self, values), fields(table = kind.table()))]
    async fn insert(&self, kind: RecordKind, values: Payload) -> Result<(), StoreError> {
        self.from_table(kind)?.insert(values).await?;
        Ok(())
    }

    #[instrument(skip(self, values), fields(table = kind.table()))]
    async fn update(
        &self,
        kind: RecordKind,
        id: &RecordId,
        values: Payload,
    ) -> Result<(), StoreError> {
        let rows = self
            .from_table(kind)?
            .eq("id", id.as_str())
            .update(values)
            .await?;
        if affected_rows(&rows) == 0 {
            return Err(StoreError::not_found(kind.table(), id));
        }
        Ok(())
    }

    #[instrument(skip(self), fields(table = kind.table()))]
    async fn delete(&self, kind: RecordKind, id: &RecordId) -> Result<(), StoreError> {
        let rows = self.from_table(kind)?.eq("id", id.as_str()).delete().await?;
        if affected_rows(&rows) == 0 {
            return Err(StoreError::not_found(kind.table(), id));
        }
        Ok(())
    }
}
