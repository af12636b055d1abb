//! Invoice reconciliation loop.
//!
//! Each cycle opens a fresh invoicing session, lists every invoice, and walks
//! the purchase requests that have no outcome yet:
//!
//! | Invoice            | Age            | Action                      |
//! |--------------------|----------------|-----------------------------|
//! | none               | any            | nothing                     |
//! | `PAID`             | any            | issue tickets, email them   |
//! | `UNPAID`           | `>= stale_after` | cancel, mark canceled     |
//! | `UNPAID`           | `< stale_after`  | wait                      |
//! | anything else      | any            | wait                        |
//!
//! Issued and canceled purchase requests are terminal and never revisited,
//! so a second cycle over unchanged external state has no side effects.

use crate::config::ReconcileConfig;
use crate::error::Result;
use crate::issuance::issue_tickets;
use crate::notification::TicketMailer;
use crate::providers::{EmailProvider, TicketStore};
use crate::types::{Outcome, PurchaseRequest, PurchaseRequestId};
use chrono::{DateTime, Duration, Utc};
use invoice_tickets_invoicing::directory::{index_by_purchase_request, status_label};
use invoice_tickets_invoicing::{Invoice, InvoiceConnector, InvoiceService, InvoiceState};
use std::collections::BTreeMap;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

/// What a cycle does with one purchase request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// No invoice references the purchase request
    NoInvoice,
    /// Tickets were issued in an earlier cycle
    AlreadyIssued,
    /// The invoice was canceled in an earlier cycle
    AlreadyCanceled,
    /// Paid: issue tickets
    Issue,
    /// Unpaid and stale: cancel the invoice with this token
    Cancel {
        /// Invoice token
        token: String,
    },
    /// Not actionable yet
    Wait,
}

/// Apply the state-transition policy to one purchase request.
///
/// Pure: no I/O, `now` is supplied by the caller.
#[must_use]
pub fn decide(
    request: &PurchaseRequest,
    invoice: Option<&Invoice>,
    now: DateTime<Utc>,
    stale_after: Duration,
) -> Decision {
    match request.outcome() {
        Outcome::Issued => return Decision::AlreadyIssued,
        Outcome::Canceled => return Decision::AlreadyCanceled,
        Outcome::Unresolved => {}
    }

    let Some(invoice) = invoice else {
        return Decision::NoInvoice;
    };

    match invoice.state {
        InvoiceState::Paid => Decision::Issue,
        InvoiceState::Unpaid if now - request.created_at >= stale_after => Decision::Cancel {
            token: invoice.token.clone(),
        },
        _ => Decision::Wait,
    }
}

/// Summary of one reconciliation cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Invoices listed by the invoicing service
    pub invoices_seen: usize,
    /// Unresolved purchase requests examined
    pub examined: usize,
    /// Purchase requests without an invoice
    pub no_invoice: usize,
    /// Purchase requests left for a later cycle
    pub waiting: usize,
    /// Purchase requests already resolved when examined
    pub already_resolved: usize,
    /// Purchase requests whose tickets were issued this cycle
    pub issued: usize,
    /// Tickets created and associated this cycle
    pub tickets_issued: usize,
    /// Ticket emails accepted by the provider
    pub emails_sent: usize,
    /// Invoices canceled this cycle
    pub canceled: usize,
    /// Issuance attempts that failed part way
    pub issuance_failures: usize,
    /// Cancellation requests that failed
    pub cancel_failures: usize,
    /// `"<STATE> - <DELIVERY>"` or `NO_INVOICE` per examined purchase request
    pub statuses: BTreeMap<PurchaseRequestId, String>,
}

/// Drives reconciliation cycles.
#[derive(Debug)]
pub struct Reconciler<C, S, E> {
    connector: C,
    store: S,
    mailer: TicketMailer<E>,
    config: ReconcileConfig,
}

impl<C, S, E> Reconciler<C, S, E>
where
    C: InvoiceConnector,
    S: TicketStore,
    E: EmailProvider,
{
    /// Create a reconciler.
    pub const fn new(
        connector: C,
        store: S,
        mailer: TicketMailer<E>,
        config: ReconcileConfig,
    ) -> Self {
        Self {
            connector,
            store,
            mailer,
            config,
        }
    }

    /// Run one cycle as of `now`.
    ///
    /// # Errors
    ///
    /// Returns error if the session cannot be established, the invoice list
    /// cannot be fetched, or the store cannot be read. Nothing has been
    /// changed in that case. Failures for a single purchase request are
    /// logged and reported in [`CycleReport`] instead.
    pub async fn run_cycle(&self, now: DateTime<Utc>) -> Result<CycleReport> {
        metrics::counter!("reconcile.cycles").increment(1);

        let service = self.connector.connect().await?;
        let invoices = service.list_invoices().await?;
        let mut report = CycleReport {
            invoices_seen: invoices.len(),
            ..CycleReport::default()
        };
        let index = index_by_purchase_request(invoices);
        let requests = self.store.unresolved_purchase_requests().await?;
        report.examined = requests.len();

        for request in &requests {
            let invoice = index.get(&request.id);
            report.statuses.insert(request.id, status_label(invoice));

            match decide(request, invoice, now, self.config.stale_after()) {
                Decision::NoInvoice => report.no_invoice += 1,
                Decision::Wait => report.waiting += 1,
                Decision::AlreadyIssued | Decision::AlreadyCanceled => {
                    report.already_resolved += 1;
                }
                Decision::Issue => self.issue(request, now, &mut report).await,
                Decision::Cancel { token } => {
                    self.cancel(&service, request, &token, now, &mut report).await;
                }
            }
        }

        info!(
            invoices = report.invoices_seen,
            examined = report.examined,
            issued = report.issued,
            canceled = report.canceled,
            waiting = report.waiting,
            no_invoice = report.no_invoice,
            "Reconciliation cycle complete"
        );
        Ok(report)
    }

    async fn issue(&self, request: &PurchaseRequest, now: DateTime<Utc>, report: &mut CycleReport) {
        info!(
            purchase_request_id = request.id,
            party_type = %request.party_type,
            "Invoice paid, issuing tickets"
        );
        match issue_tickets(&self.store, request, now).await {
            Ok(tickets) => {
                report.issued += 1;
                report.tickets_issued += tickets.len();
                metrics::counter!("reconcile.tickets_issued").increment(tickets.len() as u64);
                report.emails_sent += self.mailer.notify(&tickets).await;
            }
            Err(e) => {
                report.issuance_failures += 1;
                metrics::counter!("reconcile.issuance_failures").increment(1);
                error!(
                    purchase_request_id = request.id,
                    orphaned = e.orphaned.len(),
                    error = %e,
                    "Ticket issuance failed"
                );
            }
        }
    }

    async fn cancel(
        &self,
        service: &C::Service,
        request: &PurchaseRequest,
        token: &str,
        now: DateTime<Utc>,
        report: &mut CycleReport,
    ) {
        info!(
            purchase_request_id = request.id,
            invoice = token,
            created_at = %request.created_at,
            "Unpaid invoice is stale, canceling"
        );
        if let Err(e) = service.cancel_invoice(token).await {
            report.cancel_failures += 1;
            warn!(purchase_request_id = request.id, invoice = token, error = %e, "Invoice cancellation failed");
            return;
        }

        report.canceled += 1;
        metrics::counter!("reconcile.invoices_canceled").increment(1);
        if let Err(e) = self.store.mark_canceled(request.id, now).await {
            // The remote cancel stands; the next cycle re-sends it
            error!(
                purchase_request_id = request.id,
                error = %e,
                "Failed to record cancellation"
            );
        }
    }

    /// Run cycles every poll interval until `shutdown` turns true.
    ///
    /// Cycles never overlap: a slow cycle delays the next tick instead of
    /// queueing a burst. Cycle failures are logged and the loop continues.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(self.config.interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(interval_secs = self.config.poll_interval, "Reconciliation loop started");

        while !*shutdown.borrow() {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = self.run_cycle(Utc::now()).await {
                        metrics::counter!("reconcile.cycle_failures").increment(1);
                        error!(error = %e, "Reconciliation cycle failed");
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        debug!("Shutdown signal received");
                        break;
                    }
                }
            }
        }

        info!("Reconciliation loop stopped");
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::{Contact, PartyType, Ticket, TicketId};
    use invoice_tickets_invoicing::mocks::invoice_for;

    fn request(created_at: DateTime<Utc>) -> PurchaseRequest {
        PurchaseRequest {
            id: 7,
            contact: Contact::default(),
            party_type: PartyType::Group,
            group_members: Vec::new(),
            promo_code: None,
            charged_cents: 8000,
            created_at,
            canceled_at: None,
            tickets: Vec::new(),
        }
    }

    fn day() -> Duration {
        Duration::hours(24)
    }

    #[test]
    fn test_paid_invoice_issues() {
        let now = Utc::now();
        let invoice = invoice_for(7, InvoiceState::Paid);
        assert_eq!(decide(&request(now), Some(&invoice), now, day()), Decision::Issue);
    }

    #[test]
    fn test_unpaid_cancel_boundary() {
        let now = Utc::now();
        let invoice = invoice_for(7, InvoiceState::Unpaid);

        let fresh = request(now - Duration::hours(23));
        assert_eq!(decide(&fresh, Some(&invoice), now, day()), Decision::Wait);

        let stale = request(now - Duration::hours(24));
        assert_eq!(
            decide(&stale, Some(&invoice), now, day()),
            Decision::Cancel {
                token: "inv_7".into()
            }
        );
    }

    #[test]
    fn test_other_states_wait() {
        let now = Utc::now();
        let invoice = invoice_for(7, InvoiceState::Other("SCHEDULED".into()));
        let old = request(now - Duration::days(3));
        assert_eq!(decide(&old, Some(&invoice), now, day()), Decision::Wait);
        assert_eq!(decide(&old, None, now, day()), Decision::NoInvoice);
    }

    #[test]
    fn test_terminal_outcomes_are_sticky() {
        let now = Utc::now();
        let paid = invoice_for(7, InvoiceState::Paid);
        let unpaid = invoice_for(7, InvoiceState::Unpaid);

        let mut issued = request(now - Duration::days(3));
        issued.tickets.push(Ticket {
            id: TicketId("a-b-c".into()),
            purchase_request_id: Some(7),
            holder: Contact::default(),
            created_at: now,
        });
        assert_eq!(decide(&issued, Some(&paid), now, day()), Decision::AlreadyIssued);
        assert_eq!(decide(&issued, Some(&unpaid), now, day()), Decision::AlreadyIssued);

        let mut canceled = request(now - Duration::days(3));
        canceled.canceled_at = Some(now);
        assert_eq!(decide(&canceled, Some(&paid), now, day()), Decision::AlreadyCanceled);
    }
}
