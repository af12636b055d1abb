//! Reconciliation and delivery metrics.
//!
//! ## Counters
//! - `reconcile.cycles` - cycles started
//! - `reconcile.cycle_failures` - cycles aborted by a session, list or store failure
//! - `reconcile.tickets_issued` - tickets created and associated
//! - `reconcile.invoices_canceled` - stale invoices canceled
//! - `reconcile.issuance_failures` - issuance attempts aborted part way
//! - `notification.failures` - ticket emails not delivered
//!
//! Nothing is exported unless the process installs a recorder.

use metrics::describe_counter;

/// Register metric descriptions. Call once at startup.
pub fn register_metrics() {
    describe_counter!("reconcile.cycles", "Reconciliation cycles started");
    describe_counter!(
        "reconcile.cycle_failures",
        "Reconciliation cycles aborted before examining purchase requests"
    );
    describe_counter!(
        "reconcile.tickets_issued",
        "Tickets created and associated with a paid purchase request"
    );
    describe_counter!(
        "reconcile.invoices_canceled",
        "Unpaid invoices canceled after going stale"
    );
    describe_counter!(
        "reconcile.issuance_failures",
        "Ticket issuance attempts that failed before association"
    );
    describe_counter!("notification.failures", "Ticket emails that could not be delivered");
}
