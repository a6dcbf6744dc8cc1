//! Single in-memory state container and the one mutation entry point per
//! operation.
//!
//! ## Execution model
//!
//! ```text
//! operation
//!   ↓
//! 1. decide: `handle` on every aggregate involved (pure, nothing mutated)
//!   ↓
//! 2. apply: evolve each collection with the decided events
//!   ↓
//! 3. record: wrap events in envelopes, append to the activity journal,
//!    publish on the bus (if attached)
//! ```
//!
//! Any error in step 1 returns before step 2, so a failed operation leaves the
//! store untouched. Steps 2 and 3 cannot fail; a bus publish error is logged and
//! the committed state is kept.

use std::collections::VecDeque;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use serde_json::Value as JsonValue;
use tracing::{info, instrument, warn};

use receiptdesk_branches::{
    RegisterUser, RemoveBranch, UpdateBranch, User, UserCommand, UserDirectory, UserEvent, UserRole,
};
use receiptdesk_core::{Aggregate, DomainError, DomainResult, UserId};
use receiptdesk_events::{Event, EventBus, EventEnvelope, InMemoryEventBus};
use receiptdesk_inventory::{
    CreditDelivery, InventoryCommand, InventoryEntry, InventoryEvent, InventoryLedger,
};
use receiptdesk_orders::{
    ApproveOrder, CancelOrder, ConfirmReceipt, EditRequest, MarkDelivered, OrderBook, OrderStatus,
    ReceiptOrder, ReceiptOrderCommand, ReceiptOrderEvent, ReceiptOrderId, RequestOrder, ShipOrder,
};
use receiptdesk_purchasing::{
    AttachPrf, Billing, BillingSummary, ConfirmDelivery, MarkProcessed, MarkShipped,
    RequestSupply, SetPaid, SupplierOrder, SupplierOrderBook, SupplierOrderCommand,
    SupplierOrderEvent, SupplierOrderId,
};
use receiptdesk_receipts::{
    ReceiptType, SeriesRange, StockKey, assign_series_range, receipts_per_unit, series_range_from,
    unit_label_for,
};
use receiptdesk_warehouse::{WarehouseEvent, WarehouseItem, WarehouseStore};

use crate::snapshot::Snapshot;

/// Bus carrying every committed event as a JSON envelope.
pub type ActivityBus = InMemoryEventBus<EventEnvelope<JsonValue>>;

/// Input for registering a branch account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewBranch {
    pub username: String,
    pub branch_name: String,
    pub company: String,
    pub tin_number: Option<String>,
}

/// Admin edit of a branch account. `None` keeps the current value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BranchPatch {
    pub username: Option<String>,
    pub branch_name: Option<String>,
    pub company: Option<String>,
    pub tin_number: Option<String>,
}

/// What a branch delete took with it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BranchRemoval {
    pub inventory_entries: usize,
    pub warehouse_items: usize,
    pub orders: usize,
    pub supplier_orders: usize,
}

/// Maps a domain event enum to its journal stream.
trait Journaled: Event + Serialize {
    const AGGREGATE_TYPE: &'static str;

    fn journal_key(&self) -> String;
}

impl Journaled for UserEvent {
    const AGGREGATE_TYPE: &'static str = "branches.user";

    fn journal_key(&self) -> String {
        match self {
            UserEvent::UserRegistered(e) => e.user_id.to_string(),
            UserEvent::BranchUpdated(e) => e.user_id.to_string(),
            UserEvent::BranchRemoved(e) => e.user_id.to_string(),
        }
    }
}

impl Journaled for InventoryEvent {
    const AGGREGATE_TYPE: &'static str = "inventory.entry";

    fn journal_key(&self) -> String {
        self.key().to_string()
    }
}

impl Journaled for WarehouseEvent {
    const AGGREGATE_TYPE: &'static str = "warehouse.item";

    fn journal_key(&self) -> String {
        self.key().to_string()
    }
}

impl Journaled for ReceiptOrderEvent {
    const AGGREGATE_TYPE: &'static str = "orders.receipt_order";

    fn journal_key(&self) -> String {
        self.order_id().to_string()
    }
}

impl Journaled for SupplierOrderEvent {
    const AGGREGATE_TYPE: &'static str = "purchasing.supplier_order";

    fn journal_key(&self) -> String {
        self.order_id().to_string()
    }
}

fn today(now: DateTime<Utc>) -> NaiveDate {
    now.date_naive()
}

/// Journal entries kept by default; older entries are dropped first.
pub const DEFAULT_JOURNAL_CAPACITY: usize = 10_000;

/// The whole application state.
#[derive(Debug)]
pub struct ReceiptStore {
    users: UserDirectory,
    inventory: InventoryLedger,
    warehouse: WarehouseStore,
    orders: OrderBook,
    supplier_orders: SupplierOrderBook,
    journal: VecDeque<EventEnvelope<JsonValue>>,
    journal_capacity: usize,
    next_sequence: u64,
    bus: Option<Arc<ActivityBus>>,
}

impl Default for ReceiptStore {
    fn default() -> Self {
        Self {
            users: UserDirectory::default(),
            inventory: InventoryLedger::default(),
            warehouse: WarehouseStore::default(),
            orders: OrderBook::default(),
            supplier_orders: SupplierOrderBook::default(),
            journal: VecDeque::new(),
            journal_capacity: DEFAULT_JOURNAL_CAPACITY,
            next_sequence: 0,
            bus: None,
        }
    }
}

impl ReceiptStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep at most `capacity` journal entries, dropping the oldest.
    pub fn with_journal_capacity(mut self, capacity: usize) -> Self {
        self.journal_capacity = capacity;
        self.trim_journal();
        self
    }

    /// Publish every committed event on `bus` from now on.
    pub fn with_bus(mut self, bus: Arc<ActivityBus>) -> Self {
        self.bus = Some(bus);
        self
    }

    pub fn bus(&self) -> Option<&Arc<ActivityBus>> {
        self.bus.as_ref()
    }

    /// Retained committed events, oldest first. Sequence numbers keep
    /// counting after old entries are dropped.
    pub fn journal(&self) -> &VecDeque<EventEnvelope<JsonValue>> {
        &self.journal
    }

    fn trim_journal(&mut self) {
        while self.journal.len() > self.journal_capacity {
            self.journal.pop_front();
        }
    }

    /// The most recent `limit` journal entries, newest first.
    pub fn recent_activity(&self, limit: usize) -> Vec<&EventEnvelope<JsonValue>> {
        self.journal.iter().rev().take(limit).collect()
    }

    fn record<E: Journaled>(&mut self, events: &[E]) {
        for ev in events {
            self.next_sequence += 1;
            let envelope = match EventEnvelope::from_typed(
                E::AGGREGATE_TYPE,
                ev.journal_key(),
                self.next_sequence,
                ev,
            ) {
                Ok(envelope) => envelope,
                Err(e) => {
                    warn!(event_type = ev.event_type(), error = %e, "failed to encode event for journal");
                    continue;
                }
            };

            if let Some(bus) = &self.bus {
                if let Err(e) = bus.publish(envelope.clone()) {
                    warn!(event_type = ev.event_type(), error = ?e, "failed to publish event");
                }
            }
            self.journal.push_back(envelope);
        }
        self.trim_journal();
    }

    // ---------------------------------------------------------------------
    // Branch registry
    // ---------------------------------------------------------------------

    pub fn users(&self) -> impl Iterator<Item = &User> {
        self.users.all()
    }

    pub fn user(&self, id: UserId) -> DomainResult<&User> {
        self.users.require(id)
    }

    /// Branch accounts ordered by branch name.
    pub fn list_branches(&self) -> Vec<&User> {
        self.users.branches()
    }

    /// Resolve the acting account by username.
    pub fn authenticate(&self, username: &str) -> DomainResult<&User> {
        self.users
            .find_by_username(username)
            .ok_or_else(|| DomainError::not_found(format!("user {}", username.trim())))
    }

    fn register_user(
        &mut self,
        role: UserRole,
        username: &str,
        branch_name: Option<String>,
        company: Option<String>,
        tin_number: Option<String>,
    ) -> DomainResult<User> {
        if self.users.username_taken(username, None) {
            return Err(DomainError::conflict(format!(
                "username {} is already taken",
                username.trim()
            )));
        }

        let id = UserId::new();
        let mut user = User::empty(id);
        let events = user.handle(&UserCommand::RegisterUser(RegisterUser {
            user_id: id,
            username: username.to_string(),
            role,
            branch_name,
            company,
            tin_number,
            occurred_at: Utc::now(),
        }))?;

        for ev in &events {
            user.apply(ev);
        }
        self.users.insert(user.clone());
        self.record(&events);

        info!(user_id = %id, username = user.username(), role = ?role, "user registered");
        Ok(user)
    }

    /// Register the administrator account. Only one may exist.
    pub fn register_admin(&mut self, username: &str) -> DomainResult<User> {
        if self.users.all().any(User::is_admin) {
            return Err(DomainError::conflict("an administrator account already exists"));
        }
        self.register_user(UserRole::Admin, username, None, None, None)
    }

    #[instrument(skip(self, input), fields(username = %input.username), err(Display))]
    pub fn register_branch(&mut self, input: NewBranch) -> DomainResult<User> {
        self.register_user(
            UserRole::Branch,
            &input.username,
            Some(input.branch_name),
            Some(input.company),
            input.tin_number,
        )
    }

    /// Edit a branch account. A company change is carried to the branch's
    /// inventory entries in the same step.
    #[instrument(skip(self, patch), err(Display))]
    pub fn update_branch(&mut self, id: UserId, patch: BranchPatch) -> DomainResult<User> {
        let user = self.users.require_branch(id)?;
        if let Some(username) = &patch.username {
            if self.users.username_taken(username, Some(id)) {
                return Err(DomainError::conflict(format!(
                    "username {} is already taken",
                    username.trim()
                )));
            }
        }

        let now = Utc::now();
        let user_events = user.handle(&UserCommand::UpdateBranch(UpdateBranch {
            user_id: id,
            username: patch.username,
            branch_name: patch.branch_name,
            company: patch.company,
            tin_number: patch.tin_number,
            occurred_at: now,
        }))?;

        let mut updated = user.clone();
        for ev in &user_events {
            updated.apply(ev);
        }

        let mut inventory_events = Vec::new();
        if let Some(company) = updated.company() {
            for cmd in self.inventory.company_change_commands(id, company, now) {
                inventory_events.extend(self.inventory.decide(&cmd)?);
            }
        }

        self.users.insert(updated.clone());
        self.inventory.apply(&inventory_events);
        self.record(&user_events);
        self.record(&inventory_events);

        info!(
            user_id = %id,
            relabelled_entries = inventory_events.len(),
            "branch updated"
        );
        Ok(updated)
    }

    /// Remove a branch and everything recorded for it.
    #[instrument(skip(self), err(Display))]
    pub fn delete_branch(&mut self, id: UserId) -> DomainResult<BranchRemoval> {
        let user = self.users.require(id)?;
        let events = user.handle(&UserCommand::RemoveBranch(RemoveBranch {
            user_id: id,
            occurred_at: Utc::now(),
        }))?;

        self.users.remove(id);
        let removal = BranchRemoval {
            inventory_entries: self.inventory.remove_branch(id),
            warehouse_items: self.warehouse.remove_branch(id),
            orders: self.orders.remove_branch(id),
            supplier_orders: self.supplier_orders.remove_branch(id),
        };
        self.record(&events);

        info!(user_id = %id, removal = ?removal, "branch deleted");
        Ok(removal)
    }

    // ---------------------------------------------------------------------
    // Inventory ledger
    // ---------------------------------------------------------------------

    pub fn list_inventory(&self, branch: Option<UserId>) -> Vec<&InventoryEntry> {
        self.inventory.list(branch)
    }

    pub fn low_stock(&self, branch: Option<UserId>) -> Vec<&InventoryEntry> {
        self.inventory.low_stock(branch)
    }

    pub fn inventory_entry(&self, branch: UserId, receipt_type: ReceiptType) -> Option<&InventoryEntry> {
        self.inventory.get(&StockKey::new(branch, receipt_type))
    }

    /// Entries whose branch name, company or receipt type contains `query`
    /// (case-insensitive).
    pub fn search_inventory(&self, query: &str) -> Vec<&InventoryEntry> {
        let needle = query.trim().to_lowercase();
        self.inventory
            .list(None)
            .into_iter()
            .filter(|e| {
                let branch = self
                    .users
                    .get(e.branch_id())
                    .map(User::display_name)
                    .unwrap_or_default();
                needle.is_empty()
                    || branch.to_lowercase().contains(&needle)
                    || e.company().to_lowercase().contains(&needle)
                    || e.receipt_type().as_str().to_lowercase().contains(&needle)
            })
            .collect()
    }

    /// Record the last receipt number a branch has used.
    #[instrument(skip(self, logged_by), err(Display))]
    pub fn log_consumption(
        &mut self,
        branch: UserId,
        receipt_type: ReceiptType,
        new_last_used: u64,
        date: Option<NaiveDate>,
        logged_by: &str,
    ) -> DomainResult<InventoryEntry> {
        let now = Utc::now();
        let key = StockKey::new(branch, receipt_type);
        let events = self.inventory.consume(
            key,
            new_last_used,
            date.unwrap_or_else(|| today(now)),
            logged_by,
            now,
        )?;
        self.record(&events);

        let entry = self
            .inventory
            .get(&key)
            .cloned()
            .ok_or_else(|| DomainError::not_found(format!("inventory entry {key}")))?;
        info!(
            key = %key,
            last_used = entry.last_used_number(),
            remaining = entry.remaining_stock(),
            low_stock = entry.is_low_stock(),
            "consumption logged"
        );
        Ok(entry)
    }

    // ---------------------------------------------------------------------
    // Warehouse allocation
    // ---------------------------------------------------------------------

    pub fn warehouse_for(&self, branch: UserId) -> Vec<&WarehouseItem> {
        self.warehouse.get(branch)
    }

    pub fn warehouse_items(&self) -> impl Iterator<Item = &WarehouseItem> {
        self.warehouse.all()
    }

    pub fn warehouse_available(&self, branch: UserId, receipt_type: ReceiptType) -> Option<u32> {
        self.warehouse.available(&StockKey::new(branch, receipt_type))
    }

    /// Add units to a branch's allocation, creating the item when absent.
    #[instrument(skip(self), err(Display))]
    pub fn replenish_warehouse(
        &mut self,
        branch: UserId,
        receipt_type: ReceiptType,
        units: u32,
    ) -> DomainResult<WarehouseItem> {
        self.users.require_branch(branch)?;
        if units == 0 {
            return Err(DomainError::validation("replenishment must add at least one unit"));
        }

        let key = StockKey::new(branch, receipt_type);
        let events = self.warehouse.replenish(key, units, Utc::now())?;
        self.record(&events);
        self.warehouse_item(&key)
    }

    /// Manual correction; over-draws clamp at zero.
    #[instrument(skip(self), err(Display))]
    pub fn adjust_warehouse(
        &mut self,
        branch: UserId,
        receipt_type: ReceiptType,
        delta: i64,
    ) -> DomainResult<WarehouseItem> {
        let key = StockKey::new(branch, receipt_type);
        let events = self.warehouse.adjust(key, delta, Utc::now())?;
        self.record(&events);
        self.warehouse_item(&key)
    }

    fn warehouse_item(&self, key: &StockKey) -> DomainResult<WarehouseItem> {
        self.warehouse
            .item(key)
            .cloned()
            .ok_or_else(|| DomainError::not_found(format!("warehouse item {key}")))
    }

    // ---------------------------------------------------------------------
    // Receipt orders
    // ---------------------------------------------------------------------

    pub fn list_orders(&self, branch: Option<UserId>) -> Vec<&ReceiptOrder> {
        self.orders.list(branch)
    }

    pub fn order(&self, id: ReceiptOrderId) -> DomainResult<&ReceiptOrder> {
        self.orders.require(id)
    }

    /// Received orders whose branch name or receipt type contains `query`.
    pub fn order_history(&self, query: &str) -> Vec<&ReceiptOrder> {
        let needle = query.trim().to_lowercase();
        self.orders
            .list(None)
            .into_iter()
            .filter(|o| o.status() == OrderStatus::Received)
            .filter(|o| {
                needle.is_empty()
                    || o.branch_name().to_lowercase().contains(&needle)
                    || o.receipt_type().as_str().to_lowercase().contains(&needle)
            })
            .collect()
    }

    /// Series high-water mark for a branch/type: the larger of the ledger's
    /// current series end and the end of any range already shipped.
    pub fn series_baseline(&self, key: &StockKey) -> u64 {
        let ledger_end = self.inventory.current_series_end(key).unwrap_or(0);
        let shipped_end = self.orders.shipped_series_end(key).unwrap_or(0);
        ledger_end.max(shipped_end)
    }

    fn order_snapshot(&self, id: ReceiptOrderId) -> DomainResult<ReceiptOrder> {
        self.orders.require(id).cloned()
    }

    #[instrument(skip(self), err(Display))]
    pub fn request_order(
        &mut self,
        branch: UserId,
        receipt_type: ReceiptType,
        quantity_units: u32,
    ) -> DomainResult<ReceiptOrder> {
        let user = self.users.require_branch(branch)?;
        let now = Utc::now();
        let id = ReceiptOrderId::new();

        let order_events = self.orders.decide_new(
            id,
            &ReceiptOrderCommand::RequestOrder(RequestOrder {
                order_id: id,
                branch_id: branch,
                branch_name: user.display_name().to_string(),
                company: user.company().unwrap_or_default().to_string(),
                receipt_type,
                quantity_units,
                request_date: today(now),
                occurred_at: now,
            }),
        )?;
        let warehouse_events = self
            .warehouse
            .plan_ensure(StockKey::new(branch, receipt_type), now)?;

        self.orders.apply(&order_events);
        self.warehouse.apply(&warehouse_events);
        self.record(&order_events);
        self.record(&warehouse_events);

        info!(order_id = %id, branch = %branch, receipt_type = %receipt_type, quantity_units, "order requested");
        self.order_snapshot(id)
    }

    #[instrument(skip(self), err(Display))]
    pub fn edit_request(
        &mut self,
        id: ReceiptOrderId,
        receipt_type: ReceiptType,
        quantity_units: u32,
    ) -> DomainResult<ReceiptOrder> {
        let now = Utc::now();
        let order_events = self.orders.decide(
            id,
            &ReceiptOrderCommand::EditRequest(EditRequest {
                order_id: id,
                receipt_type,
                quantity_units,
                occurred_at: now,
            }),
        )?;
        let branch = self.orders.require(id)?.branch_id();
        let warehouse_events = self
            .warehouse
            .plan_ensure(StockKey::new(branch, receipt_type), now)?;

        self.orders.apply(&order_events);
        self.warehouse.apply(&warehouse_events);
        self.record(&order_events);
        self.record(&warehouse_events);

        info!(order_id = %id, receipt_type = %receipt_type, quantity_units, "order request edited");
        self.order_snapshot(id)
    }

    #[instrument(skip(self), err(Display))]
    pub fn approve_order(&mut self, id: ReceiptOrderId) -> DomainResult<ReceiptOrder> {
        let events = self.orders.decide(
            id,
            &ReceiptOrderCommand::ApproveOrder(ApproveOrder {
                order_id: id,
                occurred_at: Utc::now(),
            }),
        )?;
        self.orders.apply(&events);
        self.record(&events);

        info!(order_id = %id, "order approved");
        self.order_snapshot(id)
    }

    /// Ship an approved order: take the units out of the branch's warehouse
    /// allocation and assign the next series range.
    ///
    /// Without `start_series` the range continues right after the branch's
    /// series high-water mark. An explicit start must lie above it.
    #[instrument(skip(self), err(Display))]
    pub fn ship_order(
        &mut self,
        id: ReceiptOrderId,
        start_series: Option<u64>,
    ) -> DomainResult<ReceiptOrder> {
        let order = self.orders.require(id)?;
        if order.status() != OrderStatus::Approved {
            return Err(DomainError::precondition(format!(
                "cannot ship order {id} in status {}",
                order.status()
            )));
        }

        let key = order.stock_key();
        let quantity = order.quantity_units();
        let available = self.warehouse.available(&key).unwrap_or(0);
        if available < quantity {
            return Err(DomainError::precondition(format!(
                "insufficient warehouse stock for {}: {available} {} available, {quantity} requested",
                order.branch_name(),
                unit_label_for(key.receipt_type),
            )));
        }

        let baseline = self.series_baseline(&key);
        let per_unit = receipts_per_unit(key.receipt_type);
        let range: SeriesRange = match start_series {
            Some(start) if start <= baseline => {
                return Err(DomainError::validation(format!(
                    "series start must be greater than {baseline}"
                )));
            }
            Some(start) => series_range_from(start, quantity, per_unit)?,
            None => assign_series_range(baseline, quantity, per_unit)?,
        };

        let now = Utc::now();
        let order_events = self.orders.decide(
            id,
            &ReceiptOrderCommand::ShipOrder(ShipOrder {
                order_id: id,
                range,
                shipped_on: today(now),
                occurred_at: now,
            }),
        )?;
        let warehouse_events = self
            .warehouse
            .plan_adjust(key, -i64::from(quantity), now)?;

        self.orders.apply(&order_events);
        self.warehouse.apply(&warehouse_events);
        self.record(&order_events);
        self.record(&warehouse_events);

        info!(
            order_id = %id,
            series_start = range.start,
            series_end = range.end,
            warehouse_left = available - quantity,
            "order shipped"
        );
        self.order_snapshot(id)
    }

    #[instrument(skip(self), err(Display))]
    pub fn mark_delivered(&mut self, id: ReceiptOrderId) -> DomainResult<ReceiptOrder> {
        let now = Utc::now();
        let events = self.orders.decide(
            id,
            &ReceiptOrderCommand::MarkDelivered(MarkDelivered {
                order_id: id,
                delivered_on: today(now),
                occurred_at: now,
            }),
        )?;
        self.orders.apply(&events);
        self.record(&events);

        info!(order_id = %id, "order delivered");
        self.order_snapshot(id)
    }

    /// Branch confirms the delivery; the shipped range is credited to its
    /// inventory ledger.
    #[instrument(skip(self, received_by), err(Display))]
    pub fn confirm_receipt(&mut self, id: ReceiptOrderId, received_by: &str) -> DomainResult<ReceiptOrder> {
        let now = Utc::now();
        let order_events = self.orders.decide(
            id,
            &ReceiptOrderCommand::ConfirmReceipt(ConfirmReceipt {
                order_id: id,
                received_by: received_by.to_string(),
                occurred_at: now,
            }),
        )?;

        let order = self.orders.require(id)?;
        let range = order
            .series()
            .ok_or_else(|| DomainError::precondition(format!("order {id} has no series range")))?;
        let credit = InventoryCommand::CreditDelivery(CreditDelivery {
            key: order.stock_key(),
            company: order.company().to_string(),
            range,
            total_receipts: order.total_receipts(),
            delivered_on: today(now),
            occurred_at: now,
        });
        let inventory_events = self.inventory.decide(&credit)?;

        self.orders.apply(&order_events);
        self.inventory.apply(&inventory_events);
        self.record(&order_events);
        self.record(&inventory_events);

        info!(order_id = %id, series_start = range.start, series_end = range.end, "receipt confirmed");
        self.order_snapshot(id)
    }

    #[instrument(skip(self), err(Display))]
    pub fn cancel_order(&mut self, id: ReceiptOrderId) -> DomainResult<ReceiptOrder> {
        let events = self.orders.decide(
            id,
            &ReceiptOrderCommand::CancelOrder(CancelOrder {
                order_id: id,
                occurred_at: Utc::now(),
            }),
        )?;
        self.orders.apply(&events);
        self.record(&events);

        info!(order_id = %id, "order cancelled");
        self.order_snapshot(id)
    }

    // ---------------------------------------------------------------------
    // Supplier orders
    // ---------------------------------------------------------------------

    pub fn list_supplier_orders(&self) -> Vec<&SupplierOrder> {
        self.supplier_orders.list()
    }

    pub fn supplier_order(&self, id: SupplierOrderId) -> DomainResult<&SupplierOrder> {
        self.supplier_orders.require(id)
    }

    pub fn billing_archive(&self, query: Option<&str>) -> Vec<&SupplierOrder> {
        self.supplier_orders
            .billing_archive(query, |id| self.users.get(id).map(User::display_name))
    }

    pub fn billing_summary(&self, query: Option<&str>) -> BillingSummary {
        self.supplier_orders
            .billing_summary(query, |id| self.users.get(id).map(User::display_name))
    }

    fn supplier_snapshot(&self, id: SupplierOrderId) -> DomainResult<SupplierOrder> {
        self.supplier_orders.require(id).cloned()
    }

    fn run_supplier(&mut self, id: SupplierOrderId, command: SupplierOrderCommand) -> DomainResult<SupplierOrder> {
        let events = self.supplier_orders.decide(id, &command)?;
        self.supplier_orders.apply(&events);
        self.record(&events);
        self.supplier_snapshot(id)
    }

    #[instrument(skip(self), err(Display))]
    pub fn request_supply(
        &mut self,
        branch: UserId,
        receipt_type: ReceiptType,
        quantity_units: u32,
    ) -> DomainResult<SupplierOrder> {
        self.users.require_branch(branch)?;
        let now = Utc::now();
        let id = SupplierOrderId::new();
        let events = self.supplier_orders.decide_new(
            id,
            &SupplierOrderCommand::RequestSupply(RequestSupply {
                order_id: id,
                branch_id: branch,
                receipt_type,
                quantity_units,
                request_date: today(now),
                occurred_at: now,
            }),
        )?;
        self.supplier_orders.apply(&events);
        self.record(&events);

        info!(supplier_order_id = %id, branch = %branch, receipt_type = %receipt_type, quantity_units, "supply requested");
        self.supplier_snapshot(id)
    }

    #[instrument(skip(self), err(Display))]
    pub fn process_supply(&mut self, id: SupplierOrderId) -> DomainResult<SupplierOrder> {
        let order = self.run_supplier(
            id,
            SupplierOrderCommand::MarkProcessed(MarkProcessed {
                order_id: id,
                occurred_at: Utc::now(),
            }),
        )?;
        info!(supplier_order_id = %id, "supply processed");
        Ok(order)
    }

    #[instrument(skip(self), err(Display))]
    pub fn ship_supply(&mut self, id: SupplierOrderId) -> DomainResult<SupplierOrder> {
        let order = self.run_supplier(
            id,
            SupplierOrderCommand::MarkShipped(MarkShipped {
                order_id: id,
                occurred_at: Utc::now(),
            }),
        )?;
        info!(supplier_order_id = %id, "supply shipped");
        Ok(order)
    }

    /// Supplier stock arrives: billing is stamped and the units are added to
    /// the branch's warehouse allocation.
    #[instrument(skip(self, billing), err(Display))]
    pub fn confirm_supply_delivery(
        &mut self,
        id: SupplierOrderId,
        billing: Billing,
    ) -> DomainResult<SupplierOrder> {
        let now = Utc::now();
        let supplier_events = self.supplier_orders.decide(
            id,
            &SupplierOrderCommand::ConfirmDelivery(ConfirmDelivery {
                order_id: id,
                billing,
                occurred_at: now,
            }),
        )?;
        let order = self.supplier_orders.require(id)?;
        let key = order.stock_key();
        let units = order.quantity_units();
        let warehouse_events = self.warehouse.plan_replenish(key, units, now)?;

        self.supplier_orders.apply(&supplier_events);
        self.warehouse.apply(&warehouse_events);
        self.record(&supplier_events);
        self.record(&warehouse_events);

        info!(supplier_order_id = %id, key = %key, units, "supply delivered");
        self.supplier_snapshot(id)
    }

    #[instrument(skip(self), err(Display))]
    pub fn attach_prf(&mut self, id: SupplierOrderId, prf_number: &str) -> DomainResult<SupplierOrder> {
        self.run_supplier(
            id,
            SupplierOrderCommand::AttachPrf(AttachPrf {
                order_id: id,
                prf_number: prf_number.to_string(),
                occurred_at: Utc::now(),
            }),
        )
    }

    #[instrument(skip(self), err(Display))]
    pub fn set_paid(&mut self, id: SupplierOrderId, paid: bool) -> DomainResult<SupplierOrder> {
        self.run_supplier(
            id,
            SupplierOrderCommand::SetPaid(SetPaid {
                order_id: id,
                paid,
                occurred_at: Utc::now(),
            }),
        )
    }

    // ---------------------------------------------------------------------
    // Snapshot / bulk replace
    // ---------------------------------------------------------------------

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            users: self.users.all().map(User::to_record).collect(),
            inventory: self.inventory.list(None).into_iter().map(InventoryEntry::to_record).collect(),
            orders: self.orders.list(None).into_iter().map(ReceiptOrder::to_record).collect(),
            warehouse: self.warehouse.all().map(WarehouseItem::to_record).collect(),
            supplier_orders: self
                .supplier_orders
                .list()
                .into_iter()
                .map(SupplierOrder::to_record)
                .collect(),
        }
    }

    pub fn replace_users(&mut self, users: Vec<User>) {
        self.users.replace_all(users);
    }

    pub fn replace_inventory(&mut self, entries: Vec<InventoryEntry>) {
        self.inventory.replace_all(entries);
    }

    pub fn replace_orders(&mut self, orders: Vec<ReceiptOrder>) {
        self.orders.replace_all(orders);
    }

    pub fn replace_warehouse(&mut self, items: Vec<WarehouseItem>) {
        self.warehouse.replace_all(items);
    }

    pub fn replace_supplier_orders(&mut self, orders: Vec<SupplierOrder>) {
        self.supplier_orders.replace_all(orders);
    }
}
