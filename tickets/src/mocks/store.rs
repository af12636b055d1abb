//! In-memory ticket store.

use crate::error::{Result, TicketsError};
use crate::providers::TicketStore;
use crate::types::{
    Contact, NewPurchaseRequest, PromoCode, PurchaseRequest, PurchaseRequestId, Ticket, TicketId,
};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Default)]
struct StoreState {
    purchase_requests: BTreeMap<PurchaseRequestId, PurchaseRequest>,
    tickets: Vec<Ticket>,
    promo_codes: BTreeMap<String, PromoCode>,
    next_id: PurchaseRequestId,
    tickets_before_failure: Option<usize>,
    fail_association: bool,
    fail_reads: bool,
    fail_deletes: bool,
}

impl StoreState {
    fn attach_tickets(&self, mut request: PurchaseRequest) -> PurchaseRequest {
        request.tickets = self
            .tickets
            .iter()
            .filter(|t| t.purchase_request_id == Some(request.id))
            .cloned()
            .collect();
        request
    }

    fn check_reads(&self) -> Result<()> {
        if self.fail_reads {
            return Err(TicketsError::Database("injected read failure".to_string()));
        }
        Ok(())
    }

    fn remove_tickets(&mut self, keep: impl Fn(&Ticket) -> bool) -> Result<usize> {
        if self.fail_deletes {
            return Err(TicketsError::Database("injected delete failure".to_string()));
        }
        let before = self.tickets.len();
        self.tickets.retain(keep);
        Ok(before - self.tickets.len())
    }
}

/// In-memory [`TicketStore`] with failure injection.
///
/// Clones share state.
#[derive(Debug, Clone, Default)]
pub struct InMemoryTicketStore {
    state: Arc<Mutex<StoreState>>,
}

impl InMemoryTicketStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a purchase request with a chosen id. Later generated ids
    /// continue after the highest seeded one.
    pub fn insert_purchase_request(&self, request: PurchaseRequest) {
        if let Ok(mut state) = self.state.lock() {
            state.next_id = state.next_id.max(request.id);
            state.purchase_requests.insert(request.id, request);
        }
    }

    /// Seed a promo code.
    pub fn insert_promo_code(&self, promo: PromoCode) {
        if let Ok(mut state) = self.state.lock() {
            state.promo_codes.insert(promo.id.clone(), promo);
        }
    }

    /// Let `count` more ticket inserts succeed, then fail every later one.
    /// `None` removes the limit.
    pub fn fail_tickets_after(&self, count: Option<usize>) {
        if let Ok(mut state) = self.state.lock() {
            state.tickets_before_failure = count;
        }
    }

    /// Make `associate_tickets` fail.
    pub fn fail_association(&self, fail: bool) {
        if let Ok(mut state) = self.state.lock() {
            state.fail_association = fail;
        }
    }

    /// Make ticket deletes fail.
    pub fn fail_deletes(&self, fail: bool) {
        if let Ok(mut state) = self.state.lock() {
            state.fail_deletes = fail;
        }
    }

    /// Make every read of purchase requests fail.
    pub fn fail_reads(&self, fail: bool) {
        if let Ok(mut state) = self.state.lock() {
            state.fail_reads = fail;
        }
    }

    /// Every stored ticket, associated or not, in insertion order.
    #[must_use]
    pub fn tickets(&self) -> Vec<Ticket> {
        self.state
            .lock()
            .map(|state| state.tickets.clone())
            .unwrap_or_default()
    }

    /// Stored tickets with no owning purchase request.
    #[must_use]
    pub fn orphaned_tickets(&self) -> Vec<Ticket> {
        self.tickets()
            .into_iter()
            .filter(|t| t.purchase_request_id.is_none())
            .collect()
    }

    /// Current remaining count of a promo code.
    #[must_use]
    pub fn promo_count(&self, code: &str) -> Option<i32> {
        self.state
            .lock()
            .ok()
            .and_then(|state| state.promo_codes.get(code).map(|p| p.count))
    }

    fn lock(&self) -> Result<MutexGuard<'_, StoreState>> {
        self.state
            .lock()
            .map_err(|_| TicketsError::Database("Mutex lock failed".to_string()))
    }
}

impl TicketStore for InMemoryTicketStore {
    fn list_purchase_requests(&self) -> impl Future<Output = Result<Vec<PurchaseRequest>>> + Send {
        let result = self.lock().and_then(|state| {
            state.check_reads()?;
            Ok(state
                .purchase_requests
                .values()
                .map(|r| state.attach_tickets(r.clone()))
                .collect())
        });
        async move { result }
    }

    fn unresolved_purchase_requests(
        &self,
    ) -> impl Future<Output = Result<Vec<PurchaseRequest>>> + Send {
        let result = self.lock().and_then(|state| {
            state.check_reads()?;
            Ok(state
                .purchase_requests
                .values()
                .map(|r| state.attach_tickets(r.clone()))
                .filter(|r| r.tickets.is_empty() && r.canceled_at.is_none())
                .collect())
        });
        async move { result }
    }

    fn get_purchase_request(
        &self,
        id: PurchaseRequestId,
    ) -> impl Future<Output = Result<PurchaseRequest>> + Send {
        let result = self.lock().and_then(|state| {
            state.check_reads()?;
            state
                .purchase_requests
                .get(&id)
                .map(|r| state.attach_tickets(r.clone()))
                .ok_or_else(|| TicketsError::not_found("purchase request", id))
        });
        async move { result }
    }

    fn create_purchase_request(
        &self,
        request: NewPurchaseRequest,
        charged_cents: i64,
        created_at: DateTime<Utc>,
    ) -> impl Future<Output = Result<PurchaseRequest>> + Send {
        let result = self.lock().map(|mut state| {
            state.next_id += 1;
            let stored = PurchaseRequest {
                id: state.next_id,
                contact: request.contact,
                party_type: request.party_type,
                group_members: request.group_members,
                promo_code: request.promo_code,
                charged_cents,
                created_at,
                canceled_at: None,
                tickets: Vec::new(),
            };
            state.purchase_requests.insert(stored.id, stored.clone());
            stored
        });
        async move { result }
    }

    fn create_ticket(&self, ticket: &Ticket) -> impl Future<Output = Result<()>> + Send {
        let result = self.lock().and_then(|mut state| {
            match state.tickets_before_failure {
                Some(0) => {
                    return Err(TicketsError::Database("injected ticket insert failure".into()));
                }
                Some(remaining) => state.tickets_before_failure = Some(remaining - 1),
                None => {}
            }
            if state.tickets.iter().any(|t| t.id == ticket.id) {
                return Err(TicketsError::Database(format!("Ticket {} already exists", ticket.id)));
            }
            state.tickets.push(ticket.clone());
            Ok(())
        });
        async move { result }
    }

    fn ticket_exists(&self, id: &TicketId) -> impl Future<Output = Result<bool>> + Send {
        let result = self
            .lock()
            .map(|state| state.tickets.iter().any(|t| &t.id == id));
        async move { result }
    }

    fn get_ticket(&self, id: &TicketId) -> impl Future<Output = Result<Ticket>> + Send {
        let result = self.lock().and_then(|state| {
            state
                .tickets
                .iter()
                .find(|t| &t.id == id)
                .cloned()
                .ok_or_else(|| TicketsError::not_found("ticket", id))
        });
        async move { result }
    }

    fn list_tickets(&self) -> impl Future<Output = Result<Vec<Ticket>>> + Send {
        let result = self.lock().map(|state| state.tickets.clone());
        async move { result }
    }

    fn update_ticket_holder(
        &self,
        id: &TicketId,
        holder: &Contact,
    ) -> impl Future<Output = Result<Ticket>> + Send {
        let result = self.lock().and_then(|mut state| {
            let ticket = state
                .tickets
                .iter_mut()
                .find(|t| &t.id == id)
                .ok_or_else(|| TicketsError::not_found("ticket", id))?;
            ticket.holder = holder.clone();
            Ok(ticket.clone())
        });
        async move { result }
    }

    fn delete_tickets(&self, ids: &[TicketId]) -> impl Future<Output = Result<usize>> + Send {
        let result = self
            .lock()
            .and_then(|mut state| state.remove_tickets(|t| !ids.contains(&t.id)));
        async move { result }
    }

    fn discard_unassociated_tickets(
        &self,
        ids: &[TicketId],
    ) -> impl Future<Output = Result<usize>> + Send {
        let result = self.lock().and_then(|mut state| {
            state.remove_tickets(|t| t.purchase_request_id.is_some() || !ids.contains(&t.id))
        });
        async move { result }
    }

    fn associate_tickets(
        &self,
        purchase_request_id: PurchaseRequestId,
        ticket_ids: &[TicketId],
    ) -> impl Future<Output = Result<()>> + Send {
        let result = self.lock().and_then(|mut state| {
            if state.fail_association {
                return Err(TicketsError::Database("injected association failure".into()));
            }
            if !state.purchase_requests.contains_key(&purchase_request_id) {
                return Err(TicketsError::not_found("purchase request", purchase_request_id));
            }
            let all_free = ticket_ids.iter().all(|id| {
                state
                    .tickets
                    .iter()
                    .any(|t| &t.id == id && t.purchase_request_id.is_none())
            });
            if !all_free {
                return Err(TicketsError::Database(format!(
                    "Expected to associate {} ticket(s) with purchase request {purchase_request_id}",
                    ticket_ids.len()
                )));
            }
            for ticket in &mut state.tickets {
                if ticket_ids.contains(&ticket.id) {
                    ticket.purchase_request_id = Some(purchase_request_id);
                }
            }
            Ok(())
        });
        async move { result }
    }

    fn count_tickets(&self) -> impl Future<Output = Result<usize>> + Send {
        let result = self.lock().map(|state| state.tickets.len());
        async move { result }
    }

    fn mark_canceled(
        &self,
        purchase_request_id: PurchaseRequestId,
        at: DateTime<Utc>,
    ) -> impl Future<Output = Result<()>> + Send {
        let result = self.lock().and_then(|mut state| {
            let request = state
                .purchase_requests
                .get_mut(&purchase_request_id)
                .ok_or_else(|| TicketsError::not_found("purchase request", purchase_request_id))?;
            request.canceled_at.get_or_insert(at);
            Ok(())
        });
        async move { result }
    }

    fn find_promo_code(&self, code: &str) -> impl Future<Output = Result<Option<PromoCode>>> + Send {
        let result = self.lock().map(|state| {
            state
                .promo_codes
                .get(code)
                .filter(|p| p.count > 0)
                .cloned()
        });
        async move { result }
    }

    fn redeem_promo_code(&self, code: &str) -> impl Future<Output = Result<()>> + Send {
        let result = self.lock().map(|mut state| {
            if let Some(promo) = state.promo_codes.get_mut(code) {
                promo.count = (promo.count - 1).max(0);
            }
        });
        async move { result }
    }

    fn list_promo_codes(&self) -> impl Future<Output = Result<Vec<PromoCode>>> + Send {
        let result = self
            .lock()
            .map(|state| state.promo_codes.values().cloned().collect());
        async move { result }
    }

    fn save_promo_code(&self, promo: &PromoCode) -> impl Future<Output = Result<()>> + Send {
        let mut promo = promo.clone();
        promo.count = promo.count.max(0);
        let result = self.lock().map(|mut state| {
            state.promo_codes.insert(promo.id.clone(), promo);
        });
        async move { result }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::Contact;

    fn ticket(id: &str) -> Ticket {
        Ticket {
            id: TicketId(id.to_string()),
            purchase_request_id: None,
            holder: Contact::default(),
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_association_is_all_or_nothing() {
        let store = InMemoryTicketStore::new();
        let request = store
            .create_purchase_request(NewPurchaseRequest::default(), 2500, Utc::now())
            .await
            .unwrap();
        store.create_ticket(&ticket("a")).await.unwrap();

        let ids = [TicketId("a".into()), TicketId("missing".into())];
        assert!(store.associate_tickets(request.id, &ids).await.is_err());
        assert_eq!(store.orphaned_tickets().len(), 1);

        store.associate_tickets(request.id, &ids[..1]).await.unwrap();
        let request = store.get_purchase_request(request.id).await.unwrap();
        assert_eq!(request.tickets.len(), 1);
        assert!(store.unresolved_purchase_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_ticket_failure_injection() {
        let store = InMemoryTicketStore::new();
        store.fail_tickets_after(Some(1));

        store.create_ticket(&ticket("a")).await.unwrap();
        assert!(store.create_ticket(&ticket("b")).await.is_err());
        assert_eq!(store.count_tickets().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_discard_spares_associated_tickets() {
        let store = InMemoryTicketStore::new();
        let request = store
            .create_purchase_request(NewPurchaseRequest::default(), 2500, Utc::now())
            .await
            .unwrap();
        store.create_ticket(&ticket("owned")).await.unwrap();
        store.create_ticket(&ticket("loose")).await.unwrap();
        store
            .associate_tickets(request.id, &[TicketId("owned".into())])
            .await
            .unwrap();

        let ids = [TicketId("owned".into()), TicketId("loose".into())];
        assert_eq!(store.discard_unassociated_tickets(&ids).await.unwrap(), 1);
        assert_eq!(store.count_tickets().await.unwrap(), 1);

        assert_eq!(store.delete_tickets(&ids).await.unwrap(), 1);
        assert_eq!(store.count_tickets().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_update_ticket_holder() {
        let store = InMemoryTicketStore::new();
        store.create_ticket(&ticket("a")).await.unwrap();
        let holder = Contact {
            first_name: "Grace".into(),
            ..Contact::default()
        };

        let updated = store
            .update_ticket_holder(&TicketId("a".into()), &holder)
            .await
            .unwrap();
        assert_eq!(updated.holder, holder);
        assert!(matches!(
            store.update_ticket_holder(&TicketId("b".into()), &holder).await,
            Err(TicketsError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_promo_count_never_negative() {
        let store = InMemoryTicketStore::new();
        store.insert_promo_code(PromoCode {
            id: "EARLY".into(),
            percent: 0.1,
            amount_cents: 0,
            count: 1,
        });

        store.redeem_promo_code("EARLY").await.unwrap();
        store.redeem_promo_code("EARLY").await.unwrap();
        assert_eq!(store.promo_count("EARLY"), Some(0));
        assert!(store.find_promo_code("EARLY").await.unwrap().is_none());
    }
}
