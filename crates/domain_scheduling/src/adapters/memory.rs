//! In-memory port implementations

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use core_kernel::{DomainPort, Page, PageRequest, PortError, ScheduledPaymentId, SubscriptionId};

use crate::ports::{ScheduledPaymentRepository, SubscriptionLookup};
use crate::scheduled::{ScheduledPayment, Subscription};

/// In-memory scheduled payment store, ordered by creation time
#[derive(Debug, Default, Clone)]
pub struct InMemoryScheduledPaymentRepository {
    scheduled: Arc<RwLock<HashMap<ScheduledPaymentId, ScheduledPayment>>>,
}

impl InMemoryScheduledPaymentRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn with_scheduled(items: Vec<ScheduledPayment>) -> Self {
        let repo = Self::new();
        for item in items {
            repo.insert(item).await;
        }
        repo
    }

    pub async fn insert(&self, item: ScheduledPayment) {
        self.scheduled.write().await.insert(item.id, item);
    }

    pub async fn get(&self, id: ScheduledPaymentId) -> Option<ScheduledPayment> {
        self.scheduled.read().await.get(&id).cloned()
    }
}

impl DomainPort for InMemoryScheduledPaymentRepository {}

#[async_trait]
impl ScheduledPaymentRepository for InMemoryScheduledPaymentRepository {
    async fn find_pending(
        &self,
        area: &str,
        page: PageRequest,
    ) -> Result<Page<ScheduledPayment>, PortError> {
        let store = self.scheduled.read().await;
        let mut pending: Vec<&ScheduledPayment> = store
            .values()
            .filter(|s| s.area == area && s.is_pending())
            .collect();
        pending.sort_by_key(|s| (s.created_at, s.id));

        let total = pending.len() as u64;
        let items = pending
            .into_iter()
            .skip(page.offset as usize)
            .take(page.limit as usize)
            .cloned()
            .collect();
        Ok(Page::new(items, total))
    }

    async fn update(&self, scheduled: &ScheduledPayment) -> Result<(), PortError> {
        let mut store = self.scheduled.write().await;
        match store.get_mut(&scheduled.id) {
            Some(stored) => {
                *stored = scheduled.clone();
                Ok(())
            }
            None => Err(PortError::not_found("ScheduledPayment", scheduled.id)),
        }
    }
}

/// In-memory subscription lookup
#[derive(Debug, Default, Clone)]
pub struct InMemorySubscriptionLookup {
    subscriptions: Arc<RwLock<HashMap<SubscriptionId, Subscription>>>,
}

impl InMemorySubscriptionLookup {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn with_subscriptions(subscriptions: Vec<Subscription>) -> Self {
        let lookup = Self::new();
        for subscription in subscriptions {
            lookup.insert(subscription).await;
        }
        lookup
    }

    pub async fn insert(&self, subscription: Subscription) {
        self.subscriptions.write().await.insert(subscription.id, subscription);
    }
}

impl DomainPort for InMemorySubscriptionLookup {}

#[async_trait]
impl SubscriptionLookup for InMemorySubscriptionLookup {
    async fn get_subscription(&self, id: SubscriptionId) -> Result<Subscription, PortError> {
        self.subscriptions
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(|| PortError::not_found("Subscription", id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduled::TriggerType;
    use chrono::Duration;
    use core_kernel::{AccountId, Currency, Money, PaymentMethodId};

    fn item(area: &str, offset_secs: i64) -> ScheduledPayment {
        let mut item = ScheduledPayment::new(
            area,
            AccountId::new(),
            PaymentMethodId::new(),
            Money::from_minor(2500, Currency::USD),
            TriggerType::InitialServiceCompleted,
        );
        item.created_at += Duration::seconds(offset_secs);
        item
    }

    #[tokio::test]
    async fn test_find_pending_filters_area_and_status() {
        let mut cancelled = item("north", 0);
        cancelled.cancel("no subscription");
        let first = item("north", 1);
        let second = item("north", 2);
        let repo = InMemoryScheduledPaymentRepository::with_scheduled(vec![
            cancelled,
            second.clone(),
            item("south", 3),
            first.clone(),
        ])
        .await;

        let page = repo.find_pending("north", PageRequest::new(0, 10)).await.unwrap();
        assert_eq!(page.total, 2);
        let ids: Vec<_> = page.items.iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![first.id, second.id]);

        let tail = repo.find_pending("north", PageRequest::new(1, 10)).await.unwrap();
        assert_eq!(tail.items.len(), 1);
        assert_eq!(tail.total, 2);
    }
}
