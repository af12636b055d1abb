//! `PostgreSQL` ticket store.
//!
//! Queries are checked at runtime (`query`/`query_as` with `bind`), so the
//! crate builds without a live database.
//!
//! # Example
//!
//! ```no_run
//! use invoice_tickets::stores::PostgresTicketStore;
//! use sqlx::PgPool;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let pool = PgPool::connect("postgresql://localhost/tickets").await?;
//! let store = PostgresTicketStore::new(pool);
//! store.migrate().await?;
//! # Ok(())
//! # }
//! ```

use crate::config::DatabaseConfig;
use crate::error::{Result, TicketsError};
use crate::providers::TicketStore;
use crate::types::{
    Contact, NewPurchaseRequest, PartyType, PromoCode, PurchaseRequest, PurchaseRequestId, Ticket,
    TicketId,
};
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::types::Json;
use sqlx::PgPool;
use std::collections::HashMap;
use std::time::Duration;

const PURCHASE_REQUEST_COLUMNS: &str = "id, first_name, last_name, phone_number, email, \
     party_type, group_members, promo_code, charged_cents, created_at, canceled_at";

const TICKET_COLUMNS: &str =
    "id, purchase_request_id, first_name, last_name, phone_number, email, created_at";

#[derive(sqlx::FromRow)]
struct PurchaseRequestRow {
    id: i64,
    first_name: String,
    last_name: String,
    phone_number: String,
    email: String,
    party_type: String,
    group_members: Json<Vec<Contact>>,
    promo_code: Option<String>,
    charged_cents: i64,
    created_at: DateTime<Utc>,
    canceled_at: Option<DateTime<Utc>>,
}

impl PurchaseRequestRow {
    fn into_purchase_request(self, tickets: Vec<Ticket>) -> PurchaseRequest {
        PurchaseRequest {
            id: self.id,
            contact: Contact {
                first_name: self.first_name,
                last_name: self.last_name,
                phone_number: self.phone_number,
                email: self.email,
            },
            party_type: PartyType::from_raw(&self.party_type),
            group_members: self.group_members.0,
            promo_code: self.promo_code,
            charged_cents: self.charged_cents,
            created_at: self.created_at,
            canceled_at: self.canceled_at,
            tickets,
        }
    }
}

#[derive(sqlx::FromRow)]
struct TicketRow {
    id: String,
    purchase_request_id: Option<i64>,
    first_name: String,
    last_name: String,
    phone_number: String,
    email: String,
    created_at: DateTime<Utc>,
}

impl From<TicketRow> for Ticket {
    fn from(row: TicketRow) -> Self {
        Self {
            id: TicketId(row.id),
            purchase_request_id: row.purchase_request_id,
            holder: Contact {
                first_name: row.first_name,
                last_name: row.last_name,
                phone_number: row.phone_number,
                email: row.email,
            },
            created_at: row.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct PromoCodeRow {
    id: String,
    percent: f64,
    amount_cents: i64,
    count: i32,
}

impl From<PromoCodeRow> for PromoCode {
    fn from(row: PromoCodeRow) -> Self {
        Self {
            id: row.id,
            percent: row.percent,
            amount_cents: row.amount_cents,
            count: row.count,
        }
    }
}

fn db_error(action: &str) -> impl Fn(sqlx::Error) -> TicketsError + '_ {
    move |e| TicketsError::Database(format!("Failed to {action}: {e}"))
}

/// `PostgreSQL` implementation of [`TicketStore`].
#[derive(Clone, Debug)]
pub struct PostgresTicketStore {
    pool: PgPool,
}

impl PostgresTicketStore {
    /// Create a store over an existing pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Build a connection pool from configuration.
    ///
    /// # Errors
    ///
    /// Returns error if the database is unreachable.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(config.connect_timeout))
            .connect(&config.url)
            .await
            .map_err(db_error("connect to database"))?;
        Ok(Self::new(pool))
    }

    /// Run database migrations.
    ///
    /// # Errors
    ///
    /// Returns error if migrations fail.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| TicketsError::Database(format!("Migration failed: {e}")))?;
        Ok(())
    }

    /// The underlying pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Attach each purchase request's tickets with one query.
    async fn with_tickets(&self, rows: Vec<PurchaseRequestRow>) -> Result<Vec<PurchaseRequest>> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<i64> = rows.iter().map(|row| row.id).collect();
        let tickets: Vec<TicketRow> = sqlx::query_as(&format!(
            "SELECT {TICKET_COLUMNS} FROM tickets \
             WHERE purchase_request_id = ANY($1) ORDER BY created_at, id"
        ))
        .bind(&ids)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("load tickets"))?;

        let mut by_request: HashMap<i64, Vec<Ticket>> = HashMap::new();
        for row in tickets {
            if let Some(id) = row.purchase_request_id {
                by_request.entry(id).or_default().push(row.into());
            }
        }

        Ok(rows
            .into_iter()
            .map(|row| {
                let tickets = by_request.remove(&row.id).unwrap_or_default();
                row.into_purchase_request(tickets)
            })
            .collect())
    }
}

impl TicketStore for PostgresTicketStore {
    async fn list_purchase_requests(&self) -> Result<Vec<PurchaseRequest>> {
        let rows: Vec<PurchaseRequestRow> = sqlx::query_as(&format!(
            "SELECT {PURCHASE_REQUEST_COLUMNS} FROM purchase_requests ORDER BY id"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("list purchase requests"))?;

        self.with_tickets(rows).await
    }

    async fn unresolved_purchase_requests(&self) -> Result<Vec<PurchaseRequest>> {
        let rows: Vec<PurchaseRequestRow> = sqlx::query_as(&format!(
            "SELECT {PURCHASE_REQUEST_COLUMNS} FROM purchase_requests pr \
             WHERE pr.canceled_at IS NULL \
               AND NOT EXISTS (SELECT 1 FROM tickets t WHERE t.purchase_request_id = pr.id) \
             ORDER BY pr.id"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("list unresolved purchase requests"))?;

        Ok(rows
            .into_iter()
            .map(|row| row.into_purchase_request(Vec::new()))
            .collect())
    }

    async fn get_purchase_request(&self, id: PurchaseRequestId) -> Result<PurchaseRequest> {
        let row: PurchaseRequestRow = sqlx::query_as(&format!(
            "SELECT {PURCHASE_REQUEST_COLUMNS} FROM purchase_requests WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("get purchase request"))?
        .ok_or_else(|| TicketsError::not_found("purchase request", id))?;

        let mut requests = self.with_tickets(vec![row]).await?;
        requests
            .pop()
            .ok_or_else(|| TicketsError::not_found("purchase request", id))
    }

    async fn create_purchase_request(
        &self,
        request: NewPurchaseRequest,
        charged_cents: i64,
        created_at: DateTime<Utc>,
    ) -> Result<PurchaseRequest> {
        let row: PurchaseRequestRow = sqlx::query_as(&format!(
            "INSERT INTO purchase_requests \
                 (first_name, last_name, phone_number, email, party_type, group_members, \
                  promo_code, charged_cents, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
             RETURNING {PURCHASE_REQUEST_COLUMNS}"
        ))
        .bind(&request.contact.first_name)
        .bind(&request.contact.last_name)
        .bind(&request.contact.phone_number)
        .bind(&request.contact.email)
        .bind(request.party_type.as_str())
        .bind(Json(&request.group_members))
        .bind(&request.promo_code)
        .bind(charged_cents)
        .bind(created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(db_error("create purchase request"))?;

        Ok(row.into_purchase_request(Vec::new()))
    }

    async fn create_ticket(&self, ticket: &Ticket) -> Result<()> {
        sqlx::query(
            "INSERT INTO tickets \
                 (id, purchase_request_id, first_name, last_name, phone_number, email, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(ticket.id.as_str())
        .bind(ticket.purchase_request_id)
        .bind(&ticket.holder.first_name)
        .bind(&ticket.holder.last_name)
        .bind(&ticket.holder.phone_number)
        .bind(&ticket.holder.email)
        .bind(ticket.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.is_unique_violation() {
                    return TicketsError::Database(format!("Ticket {} already exists", ticket.id));
                }
            }
            TicketsError::Database(format!("Failed to create ticket: {e}"))
        })?;
        Ok(())
    }

    async fn ticket_exists(&self, id: &TicketId) -> Result<bool> {
        let (exists,): (bool,) =
            sqlx::query_as("SELECT EXISTS(SELECT 1 FROM tickets WHERE id = $1)")
                .bind(id.as_str())
                .fetch_one(&self.pool)
                .await
                .map_err(db_error("check ticket"))?;
        Ok(exists)
    }

    async fn get_ticket(&self, id: &TicketId) -> Result<Ticket> {
        let row: TicketRow =
            sqlx::query_as(&format!("SELECT {TICKET_COLUMNS} FROM tickets WHERE id = $1"))
                .bind(id.as_str())
                .fetch_optional(&self.pool)
                .await
                .map_err(db_error("get ticket"))?
                .ok_or_else(|| TicketsError::not_found("ticket", id))?;
        Ok(row.into())
    }

    async fn list_tickets(&self) -> Result<Vec<Ticket>> {
        let rows: Vec<TicketRow> = sqlx::query_as(&format!(
            "SELECT {TICKET_COLUMNS} FROM tickets ORDER BY created_at, id"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("list tickets"))?;
        Ok(rows.into_iter().map(Ticket::from).collect())
    }

    async fn update_ticket_holder(&self, id: &TicketId, holder: &Contact) -> Result<Ticket> {
        let row: TicketRow = sqlx::query_as(&format!(
            "UPDATE tickets SET first_name = $2, last_name = $3, phone_number = $4, email = $5 \
             WHERE id = $1 RETURNING {TICKET_COLUMNS}"
        ))
        .bind(id.as_str())
        .bind(&holder.first_name)
        .bind(&holder.last_name)
        .bind(&holder.phone_number)
        .bind(&holder.email)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("update ticket"))?
        .ok_or_else(|| TicketsError::not_found("ticket", id))?;
        Ok(row.into())
    }

    async fn delete_tickets(&self, ids: &[TicketId]) -> Result<usize> {
        let ids: Vec<&str> = ids.iter().map(TicketId::as_str).collect();
        let result = sqlx::query("DELETE FROM tickets WHERE id = ANY($1)")
            .bind(&ids)
            .execute(&self.pool)
            .await
            .map_err(db_error("delete tickets"))?;
        Ok(usize::try_from(result.rows_affected()).unwrap_or_default())
    }

    async fn discard_unassociated_tickets(&self, ids: &[TicketId]) -> Result<usize> {
        let ids: Vec<&str> = ids.iter().map(TicketId::as_str).collect();
        let result = sqlx::query(
            "DELETE FROM tickets WHERE id = ANY($1) AND purchase_request_id IS NULL",
        )
        .bind(&ids)
        .execute(&self.pool)
        .await
        .map_err(db_error("discard unassociated tickets"))?;
        Ok(usize::try_from(result.rows_affected()).unwrap_or_default())
    }

    async fn associate_tickets(
        &self,
        purchase_request_id: PurchaseRequestId,
        ticket_ids: &[TicketId],
    ) -> Result<()> {
        let ids: Vec<&str> = ticket_ids.iter().map(TicketId::as_str).collect();
        let mut tx = self.pool.begin().await.map_err(db_error("begin transaction"))?;

        let result = sqlx::query(
            "UPDATE tickets SET purchase_request_id = $1 \
             WHERE id = ANY($2) AND purchase_request_id IS NULL",
        )
        .bind(purchase_request_id)
        .bind(&ids)
        .execute(&mut *tx)
        .await
        .map_err(db_error("associate tickets"))?;

        if usize::try_from(result.rows_affected()).ok() != Some(ids.len()) {
            tx.rollback().await.map_err(db_error("roll back association"))?;
            return Err(TicketsError::Database(format!(
                "Expected to associate {} ticket(s) with purchase request {purchase_request_id}, matched {}",
                ids.len(),
                result.rows_affected()
            )));
        }

        tx.commit().await.map_err(db_error("commit association"))?;
        Ok(())
    }

    async fn count_tickets(&self) -> Result<usize> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM tickets")
            .fetch_one(&self.pool)
            .await
            .map_err(db_error("count tickets"))?;
        Ok(usize::try_from(count).unwrap_or_default())
    }

    async fn mark_canceled(
        &self,
        purchase_request_id: PurchaseRequestId,
        at: DateTime<Utc>,
    ) -> Result<()> {
        let result = sqlx::query(
            "UPDATE purchase_requests SET canceled_at = $2 \
             WHERE id = $1 AND canceled_at IS NULL",
        )
        .bind(purchase_request_id)
        .bind(at)
        .execute(&self.pool)
        .await
        .map_err(db_error("mark purchase request canceled"))?;

        if result.rows_affected() == 0 {
            // Either already canceled or missing; only the latter is an error
            self.get_purchase_request(purchase_request_id).await?;
        }
        Ok(())
    }

    async fn find_promo_code(&self, code: &str) -> Result<Option<PromoCode>> {
        let row: Option<PromoCodeRow> = sqlx::query_as(
            "SELECT id, percent, amount_cents, count FROM promo_codes \
             WHERE id = $1 AND count > 0",
        )
        .bind(code)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("get promo code"))?;
        Ok(row.map(PromoCode::from))
    }

    async fn redeem_promo_code(&self, code: &str) -> Result<()> {
        sqlx::query("UPDATE promo_codes SET count = count - 1 WHERE id = $1 AND count > 0")
            .bind(code)
            .execute(&self.pool)
            .await
            .map_err(db_error("redeem promo code"))?;
        Ok(())
    }

    async fn list_promo_codes(&self) -> Result<Vec<PromoCode>> {
        let rows: Vec<PromoCodeRow> =
            sqlx::query_as("SELECT id, percent, amount_cents, count FROM promo_codes ORDER BY id")
                .fetch_all(&self.pool)
                .await
                .map_err(db_error("list promo codes"))?;
        Ok(rows.into_iter().map(PromoCode::from).collect())
    }

    async fn save_promo_code(&self, promo: &PromoCode) -> Result<()> {
        sqlx::query(
            "INSERT INTO promo_codes (id, percent, amount_cents, count) \
             VALUES ($1, $2, $3, $4) \
             ON CONFLICT (id) DO UPDATE \
             SET percent = EXCLUDED.percent, \
                 amount_cents = EXCLUDED.amount_cents, \
                 count = EXCLUDED.count",
        )
        .bind(&promo.id)
        .bind(promo.percent)
        .bind(promo.amount_cents)
        .bind(promo.count.max(0))
        .execute(&self.pool)
        .await
        .map_err(db_error("save promo code"))?;
        Ok(())
    }
}
