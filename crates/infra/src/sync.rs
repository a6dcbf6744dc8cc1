//! Explicit import/export against a remote table store.
//!
//! Nothing here runs implicitly. `CloudSync::import_all` pulls every table and
//! replaces the matching local collection when the remote has rows for it;
//! `CloudSync::export_all` pushes a snapshot of every local collection.
//! Remote failures are returned to the caller and never touch local state.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use tokio::sync::RwLock;
use tracing::{info, instrument, warn};

use receiptdesk_branches::{User, UserRecord};
use receiptdesk_core::DomainError;
use receiptdesk_inventory::{InventoryEntry, InventoryRecord};
use receiptdesk_orders::{ReceiptOrder, ReceiptOrderRecord};
use receiptdesk_purchasing::{SupplierOrder, SupplierOrderRecord};
use receiptdesk_warehouse::{WarehouseItem, WarehouseRecord};

use crate::snapshot::{Snapshot, Table};
use crate::store::ReceiptStore;

#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("remote sync is not configured")]
    NotConfigured,
    #[error("remote is offline")]
    Offline,
    #[error("network error: {0}")]
    Network(String),
    #[error("remote error ({0}): {1}")]
    Api(u16, String),
    #[error("parse error: {0}")]
    Parse(String),
}

/// Remote side of the sync: named tables of JSON rows.
#[async_trait]
pub trait RemoteTables: Send + Sync {
    async fn fetch(&self, table: Table) -> Result<Vec<JsonValue>, SyncError>;

    /// Replace the whole table with `rows`.
    async fn replace(&self, table: Table, rows: Vec<JsonValue>) -> Result<(), SyncError>;
}

#[async_trait]
impl<T> RemoteTables for Arc<T>
where
    T: RemoteTables + ?Sized,
{
    async fn fetch(&self, table: Table) -> Result<Vec<JsonValue>, SyncError> {
        (**self).fetch(table).await
    }

    async fn replace(&self, table: Table, rows: Vec<JsonValue>) -> Result<(), SyncError> {
        (**self).replace(table, rows).await
    }
}

/// Remote tables held in process memory.
#[derive(Debug, Default)]
pub struct InMemoryRemoteTables {
    tables: RwLock<HashMap<Table, Vec<JsonValue>>>,
    offline: AtomicBool,
}

impl InMemoryRemoteTables {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn rows(&self, table: Table) -> Vec<JsonValue> {
        self.tables.read().await.get(&table).cloned().unwrap_or_default()
    }

    /// While offline every call fails with [`SyncError::Offline`].
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    fn check_online(&self) -> Result<(), SyncError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(SyncError::Offline);
        }
        Ok(())
    }
}

#[async_trait]
impl RemoteTables for InMemoryRemoteTables {
    async fn fetch(&self, table: Table) -> Result<Vec<JsonValue>, SyncError> {
        self.check_online()?;
        Ok(self.rows(table).await)
    }

    async fn replace(&self, table: Table, rows: Vec<JsonValue>) -> Result<(), SyncError> {
        self.check_online()?;
        self.tables.write().await.insert(table, rows);
        Ok(())
    }
}

/// Remote tables behind a PostgREST-style HTTP API.
#[derive(Debug, Clone)]
pub struct RestRemoteTables {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl RestRemoteTables {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, SyncError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SyncError::Network(e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        })
    }

    fn table_url(&self, table: Table) -> String {
        format!("{}/rest/v1/{}", self.base_url, table.name())
    }

    fn authorized(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        req.header("apikey", &self.api_key).bearer_auth(&self.api_key)
    }

    async fn check(resp: reqwest::Response) -> Result<reqwest::Response, SyncError> {
        if resp.status().is_success() {
            return Ok(resp);
        }
        let status = resp.status().as_u16();
        Err(SyncError::Api(status, resp.text().await.unwrap_or_default()))
    }
}

/// Column present on every row of a table; delete filters need one.
fn key_column(table: Table) -> &'static str {
    match table {
        Table::Users | Table::Orders | Table::SupplierOrders => "id",
        Table::Inventory | Table::Warehouse => "branch_id",
    }
}

#[async_trait]
impl RemoteTables for RestRemoteTables {
    async fn fetch(&self, table: Table) -> Result<Vec<JsonValue>, SyncError> {
        let url = format!("{}?select=*", self.table_url(table));
        let resp = self
            .authorized(self.client.get(&url))
            .send()
            .await
            .map_err(|e| SyncError::Network(e.to_string()))?;

        Self::check(resp)
            .await?
            .json::<Vec<JsonValue>>()
            .await
            .map_err(|e| SyncError::Parse(e.to_string()))
    }

    async fn replace(&self, table: Table, rows: Vec<JsonValue>) -> Result<(), SyncError> {
        let url = self.table_url(table);
        let delete_url = format!("{url}?{}=not.is.null", key_column(table));
        let resp = self
            .authorized(self.client.delete(&delete_url))
            .send()
            .await
            .map_err(|e| SyncError::Network(e.to_string()))?;
        Self::check(resp).await?;

        if rows.is_empty() {
            return Ok(());
        }
        let resp = self
            .authorized(self.client.post(&url))
            .header("Prefer", "return=minimal")
            .json(&rows)
            .send()
            .await
            .map_err(|e| SyncError::Network(e.to_string()))?;
        Self::check(resp).await?;
        Ok(())
    }
}

/// Outcome of importing one table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableImport {
    pub table: Table,
    pub imported: usize,
    pub skipped: usize,
    /// False when the remote table was empty and local data was kept.
    pub replaced: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    pub tables: Vec<TableImport>,
}

impl ImportReport {
    pub fn table(&self, table: Table) -> Option<&TableImport> {
        self.tables.iter().find(|t| t.table == table)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExportReport {
    pub rows: Vec<(Table, usize)>,
}

/// Rows fetched for every table, before anything is applied locally.
#[derive(Debug, Default)]
pub struct RemoteRows {
    rows: HashMap<Table, Vec<JsonValue>>,
}

impl RemoteRows {
    fn take(&mut self, table: Table) -> Vec<JsonValue> {
        self.rows.remove(&table).unwrap_or_default()
    }
}

fn decode<R, T>(
    table: Table,
    rows: Vec<JsonValue>,
    convert: impl Fn(R) -> Result<T, DomainError>,
) -> (Vec<T>, usize)
where
    R: DeserializeOwned,
{
    let mut decoded = Vec::with_capacity(rows.len());
    let mut skipped = 0;
    for (idx, row) in rows.into_iter().enumerate() {
        let record = match serde_json::from_value::<R>(row) {
            Ok(record) => record,
            Err(e) => {
                warn!(table = %table, row = idx, error = %e, "skipping undecodable row");
                skipped += 1;
                continue;
            }
        };
        match convert(record) {
            Ok(item) => decoded.push(item),
            Err(e) => {
                warn!(table = %table, row = idx, error = %e, "skipping invalid row");
                skipped += 1;
            }
        }
    }
    (decoded, skipped)
}

/// One-directional sync between a [`ReceiptStore`] and a [`RemoteTables`] backend.
#[derive(Debug)]
pub struct CloudSync<R> {
    remote: R,
}

impl<R: RemoteTables> CloudSync<R> {
    pub fn new(remote: R) -> Self {
        Self { remote }
    }

    pub fn remote(&self) -> &R {
        &self.remote
    }

    /// Fetch every table. Fails as a whole if any table cannot be fetched.
    pub async fn fetch_all(&self) -> Result<RemoteRows, SyncError> {
        let mut rows = HashMap::new();
        for table in Table::ALL {
            rows.insert(table, self.remote.fetch(table).await?);
        }
        Ok(RemoteRows { rows })
    }

    /// Pull every table and replace the local collections that have remote rows.
    #[instrument(skip_all, err(Display))]
    pub async fn import_all(&self, store: &mut ReceiptStore) -> Result<ImportReport, SyncError> {
        let rows = self.fetch_all().await?;
        Ok(apply_import(store, rows))
    }

    /// Push a snapshot of every local collection.
    #[instrument(skip_all, err(Display))]
    pub async fn export_all(&self, snapshot: &Snapshot) -> Result<ExportReport, SyncError> {
        let mut report = ExportReport::default();
        for table in Table::ALL {
            let rows = snapshot
                .table_rows(table)
                .map_err(|e| SyncError::Parse(e.to_string()))?;
            let count = rows.len();
            self.remote.replace(table, rows).await?;
            info!(table = %table, rows = count, "table exported");
            report.rows.push((table, count));
        }
        Ok(report)
    }
}

/// Replace a local collection with the decoded rows.
///
/// A table where no row decoded, or where more rows were skipped than
/// decoded, is rejected and the local collection is kept.
fn import_table<T>(
    table: Table,
    (items, skipped): (Vec<T>, usize),
    replace: impl FnOnce(Vec<T>),
) -> TableImport {
    let imported = items.len();
    if imported == 0 || skipped > imported {
        warn!(table = %table, imported, skipped, "remote table mostly undecodable, keeping local data");
        return TableImport {
            table,
            imported: 0,
            skipped,
            replaced: false,
        };
    }

    replace(items);
    info!(table = %table, imported, skipped, "table imported");
    TableImport {
        table,
        imported,
        skipped,
        replaced: true,
    }
}

/// Replace local collections from fetched rows. Empty or undecodable tables
/// keep local data.
pub fn apply_import(store: &mut ReceiptStore, mut rows: RemoteRows) -> ImportReport {
    let mut report = ImportReport::default();

    for table in Table::ALL {
        let table_rows = rows.take(table);
        if table_rows.is_empty() {
            info!(table = %table, "remote table empty, keeping local data");
            report.tables.push(TableImport {
                table,
                imported: 0,
                skipped: 0,
                replaced: false,
            });
            continue;
        }

        let outcome = match table {
            Table::Users => import_table(
                table,
                decode::<UserRecord, _>(table, table_rows, User::from_record),
                |items| store.replace_users(items),
            ),
            Table::Inventory => import_table(
                table,
                decode::<InventoryRecord, _>(table, table_rows, InventoryEntry::from_record),
                |items| store.replace_inventory(items),
            ),
            Table::Orders => import_table(
                table,
                decode::<ReceiptOrderRecord, _>(table, table_rows, ReceiptOrder::from_record),
                |items| store.replace_orders(items),
            ),
            Table::Warehouse => import_table(
                table,
                decode::<WarehouseRecord, _>(table, table_rows, |r| Ok(WarehouseItem::from_record(r))),
                |items| store.replace_warehouse(items),
            ),
            Table::SupplierOrders => import_table(
                table,
                decode::<SupplierOrderRecord, _>(table, table_rows, SupplierOrder::from_record),
                |items| store.replace_supplier_orders(items),
            ),
        };
        report.tables.push(outcome);
    }

    report
}
