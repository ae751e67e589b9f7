/// In-memory record store
///
/// Backs the consistency-engine test suites and local demos with plain maps
/// behind an `RwLock`, plus a broadcast channel standing in for the change
/// feed. Test-only behavior is opt-in via knobs:
///
/// - [`MemoryStore::set_lossy_feed`]: strips emails from delete events to
///   exercise the watcher's id-only sweep fallback
/// - [`MemoryStore::invalidate_feed`]: poisons live subscriptions so the
///   watcher observes `SubscriptionLost` and enters Degraded
/// - [`MemoryStore::set_unavailable`]: makes every call fail with
///   `StoreError::Unavailable` until cleared
/// - [`MemoryStore::set_call_budget`]: lets the next N calls succeed and
///   fails the rest, so an outage can start mid-request (exercises
///   degrade-to-stale reads)
/// - [`MemoryStore::flag_write_count`]: counts membership-flag writes for
///   the reconciler's idempotence property

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, Ordering};
use std::sync::RwLock;
use tokio::sync::broadcast;
use uuid::Uuid;

use super::{DeleteEvent, DeleteFeed, RecordStore};
use crate::error::StoreError;
use crate::models::{Identity, Membership, Payment, PaymentFilter};

/// Buffered feed slots per subscriber; tests never get near this
const FEED_CAPACITY: usize = 64;

#[derive(Debug, Clone)]
enum FeedItem {
    Event(DeleteEvent),
    Invalidated,
}

#[derive(Default)]
struct Collections {
    identities: HashMap<Uuid, Identity>,
    memberships: HashMap<Uuid, Membership>,
    payments: Vec<Payment>,
}

/// In-memory implementation of [`RecordStore`]
pub struct MemoryStore {
    data: RwLock<Collections>,
    feed_tx: broadcast::Sender<FeedItem>,
    lossy_feed: AtomicBool,
    unavailable: AtomicBool,
    call_budget: AtomicI64,
    flag_writes: AtomicU64,
}

impl MemoryStore {
    /// Creates an empty store
    pub fn new() -> Self {
        let (feed_tx, _) = broadcast::channel(FEED_CAPACITY);
        MemoryStore {
            data: RwLock::new(Collections::default()),
            feed_tx,
            lossy_feed: AtomicBool::new(false),
            unavailable: AtomicBool::new(false),
            call_budget: AtomicI64::new(i64::MAX),
            flag_writes: AtomicU64::new(0),
        }
    }

    /// When set, delete events carry only the id (no email), forcing the
    /// watcher onto its sweep fallback path
    pub fn set_lossy_feed(&self, lossy: bool) {
        self.lossy_feed.store(lossy, Ordering::SeqCst);
    }

    /// Invalidates all live feed subscriptions
    ///
    /// Subscribers observe `SubscriptionLost` on their next receive; a fresh
    /// [`RecordStore::watch_identity_deletes`] call succeeds again.
    pub fn invalidate_feed(&self) {
        let _ = self.feed_tx.send(FeedItem::Invalidated);
    }

    /// Simulates a store outage: every call fails until cleared
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Lets the next `calls` store calls succeed, then fails every call
    /// after them with `StoreError::Unavailable`
    ///
    /// Unlike [`set_unavailable`](Self::set_unavailable) this starts the
    /// outage partway through a multi-call operation, e.g. after a
    /// handler's own lookup but before the reconciler's.
    pub fn set_call_budget(&self, calls: i64) {
        self.call_budget.store(calls, Ordering::SeqCst);
    }

    /// Number of membership-flag writes performed so far
    pub fn flag_write_count(&self) -> u64 {
        self.flag_writes.load(Ordering::SeqCst)
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("injected outage".to_string()));
        }
        if self.call_budget.fetch_sub(1, Ordering::SeqCst) <= 0 {
            return Err(StoreError::Unavailable(
                "injected outage, call budget exhausted".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

struct MemoryFeed {
    rx: broadcast::Receiver<FeedItem>,
}

#[async_trait]
impl DeleteFeed for MemoryFeed {
    async fn next_event(&mut self) -> Result<DeleteEvent, StoreError> {
        loop {
            match self.rx.recv().await {
                Ok(FeedItem::Event(event)) => return Ok(event),
                Ok(FeedItem::Invalidated) => {
                    return Err(StoreError::SubscriptionLost(
                        "feed invalidated".to_string(),
                    ))
                }
                Err(broadcast::error::RecvError::Closed) => {
                    return Err(StoreError::SubscriptionLost("feed closed".to_string()))
                }
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
            }
        }
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn find_identity_by_email(&self, email: &str) -> Result<Option<Identity>, StoreError> {
        self.check_available()?;
        let data = self.data.read().unwrap();
        Ok(data.identities.values().find(|i| i.email == email).cloned())
    }

    async fn find_identities_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Identity>, StoreError> {
        self.check_available()?;
        let data = self.data.read().unwrap();
        Ok(ids
            .iter()
            .filter_map(|id| data.identities.get(id).cloned())
            .collect())
    }

    async fn insert_identity(&self, identity: &Identity) -> Result<(), StoreError> {
        self.check_available()?;
        let mut data = self.data.write().unwrap();
        if data.identities.values().any(|i| i.email == identity.email) {
            return Err(StoreError::Duplicate(format!(
                "identities.email: {}",
                identity.email
            )));
        }
        data.identities.insert(identity.id, identity.clone());
        Ok(())
    }

    async fn set_membership_flag(&self, email: &str, is_member: bool) -> Result<bool, StoreError> {
        self.check_available()?;
        let mut data = self.data.write().unwrap();
        match data.identities.values_mut().find(|i| i.email == email) {
            Some(identity) => {
                identity.is_member = is_member;
                self.flag_writes.fetch_add(1, Ordering::SeqCst);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_identity(&self, id: Uuid) -> Result<bool, StoreError> {
        self.check_available()?;
        let removed = {
            let mut data = self.data.write().unwrap();
            data.identities.remove(&id)
        };
        match removed {
            Some(identity) => {
                let email = if self.lossy_feed.load(Ordering::SeqCst) {
                    None
                } else {
                    Some(identity.email)
                };
                // No subscribers is fine; the sweep is the safety net then.
                let _ = self.feed_tx.send(FeedItem::Event(DeleteEvent { id, email }));
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn find_membership_by_email(&self, email: &str) -> Result<Option<Membership>, StoreError> {
        self.check_available()?;
        let data = self.data.read().unwrap();
        Ok(data.memberships.values().find(|m| m.email == email).cloned())
    }

    async fn find_memberships_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Membership>, StoreError> {
        self.check_available()?;
        let data = self.data.read().unwrap();
        Ok(ids
            .iter()
            .filter_map(|id| data.memberships.get(id).cloned())
            .collect())
    }

    async fn insert_membership(&self, membership: &Membership) -> Result<(), StoreError> {
        self.check_available()?;
        let mut data = self.data.write().unwrap();
        if data.memberships.values().any(|m| m.email == membership.email) {
            return Err(StoreError::Duplicate(format!(
                "memberships.email: {}",
                membership.email
            )));
        }
        data.memberships.insert(membership.id, membership.clone());
        Ok(())
    }

    async fn delete_membership_by_email(&self, email: &str) -> Result<bool, StoreError> {
        self.check_available()?;
        let mut data = self.data.write().unwrap();
        let id = data
            .memberships
            .values()
            .find(|m| m.email == email)
            .map(|m| m.id);
        match id {
            Some(id) => {
                data.memberships.remove(&id);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn list_membership_emails(
        &self,
        after: Option<&str>,
        limit: u32,
    ) -> Result<Vec<String>, StoreError> {
        self.check_available()?;
        let data = self.data.read().unwrap();
        let mut emails: Vec<String> = data
            .memberships
            .values()
            .map(|m| m.email.clone())
            .filter(|email| match after {
                Some(after) => email.as_str() > after,
                None => true,
            })
            .collect();
        emails.sort();
        emails.truncate(limit as usize);
        Ok(emails)
    }

    async fn insert_payment(&self, payment: &Payment) -> Result<(), StoreError> {
        self.check_available()?;
        let mut data = self.data.write().unwrap();
        if data
            .payments
            .iter()
            .any(|p| p.transaction_id == payment.transaction_id)
        {
            return Err(StoreError::Duplicate(format!(
                "payments.transaction_id: {}",
                payment.transaction_id
            )));
        }
        data.payments.push(payment.clone());
        Ok(())
    }

    async fn list_payments(&self, filter: &PaymentFilter) -> Result<Vec<Payment>, StoreError> {
        self.check_available()?;
        let data = self.data.read().unwrap();
        let term = filter
            .search
            .as_deref()
            .filter(|t| !t.is_empty())
            .map(str::to_lowercase);

        let mut payments: Vec<Payment> = data
            .payments
            .iter()
            .filter(|p| match filter.status {
                Some(status) => p.status == status,
                None => true,
            })
            .filter(|p| match &term {
                Some(term) => {
                    let hit = |field: Option<&str>| {
                        field.map(|f| f.to_lowercase().contains(term)).unwrap_or(false)
                    };
                    p.transaction_id.to_lowercase().contains(term)
                        || hit(p.payer_name.as_deref())
                        || hit(p.property_name.as_deref())
                }
                None => true,
            })
            .cloned()
            .collect();
        payments.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(payments)
    }

    fn supports_change_feed(&self) -> bool {
        true
    }

    async fn watch_identity_deletes(&self) -> Result<Box<dyn DeleteFeed>, StoreError> {
        self.check_available()?;
        Ok(Box::new(MemoryFeed {
            rx: self.feed_tx.subscribe(),
        }))
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.check_available()
    }
}
