use axum::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::models::{
    Booking, BookingStatus, ModerationStatus, Ticket, Transaction, User,
};

use super::{MarketStore, StoreError, TicketFilter, TicketSort, TicketUpdate};

/// Production store backed by Postgres. The conditional inventory decrement
/// is a single `UPDATE ... WHERE available_quantity >= $n`, which the server
/// applies atomically against concurrent settlements.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn map_insert_err(e: sqlx::Error, key: &str) -> StoreError {
    if let sqlx::Error::Database(ref db) = e {
        if db.is_unique_violation() {
            return StoreError::DuplicateKey(key.to_string());
        }
    }
    StoreError::Database(e)
}

#[async_trait]
impl MarketStore for PgStore {
    async fn insert_user(&self, user: &User) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO users (id, name, email, role, fraudulent, api_token, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(user.id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(user.role)
        .bind(user.fraudulent)
        .bind(&user.api_token)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_insert_err(e, &user.email))?;
        Ok(())
    }

    async fn user_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn user_by_token(&self, token: &str) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE api_token = $1")
            .bind(token)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn list_users(&self, skip: i64, limit: i64) -> Result<Vec<User>, StoreError> {
        let users = sqlx::query_as::<_, User>(
            "SELECT * FROM users ORDER BY created_at DESC OFFSET $1 LIMIT $2",
        )
        .bind(skip)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(users)
    }

    async fn set_user_fraudulent(&self, id: Uuid) -> Result<bool, StoreError> {
        let result =
            sqlx::query("UPDATE users SET fraudulent = TRUE, updated_at = now() WHERE id = $1")
                .bind(id)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn insert_ticket(&self, ticket: &Ticket) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO tickets (id, vendor_id, vendor_name, vendor_email, origin, destination,
                                  mode, price, available_quantity, status, advertised,
                                  created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)",
        )
        .bind(ticket.id)
        .bind(ticket.vendor_id)
        .bind(&ticket.vendor_name)
        .bind(&ticket.vendor_email)
        .bind(&ticket.origin)
        .bind(&ticket.destination)
        .bind(ticket.mode)
        .bind(ticket.price)
        .bind(ticket.available_quantity)
        .bind(ticket.status)
        .bind(ticket.advertised)
        .bind(ticket.created_at)
        .bind(ticket.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn ticket_by_id(&self, id: Uuid) -> Result<Option<Ticket>, StoreError> {
        let ticket = sqlx::query_as::<_, Ticket>("SELECT * FROM tickets WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(ticket)
    }

    async fn list_tickets(&self, filter: &TicketFilter) -> Result<Vec<Ticket>, StoreError> {
        let mut qb: QueryBuilder<Postgres> = QueryBuilder::new("SELECT * FROM tickets WHERE TRUE");

        if let Some(status) = filter.status {
            qb.push(" AND status = ").push_bind(status);
        }
        if let Some(vendor_id) = filter.vendor_id {
            qb.push(" AND vendor_id = ").push_bind(vendor_id);
        }
        if let Some(ref origin) = filter.origin {
            qb.push(" AND lower(origin) = lower(").push_bind(origin).push(")");
        }
        if let Some(ref destination) = filter.destination {
            qb.push(" AND lower(destination) = lower(")
                .push_bind(destination)
                .push(")");
        }
        if let Some(mode) = filter.mode {
            qb.push(" AND mode = ").push_bind(mode);
        }
        if let Some(advertised) = filter.advertised {
            qb.push(" AND advertised = ").push_bind(advertised);
        }

        qb.push(match filter.sort {
            TicketSort::Newest => " ORDER BY created_at DESC",
            TicketSort::PriceAsc => " ORDER BY price ASC",
            TicketSort::PriceDesc => " ORDER BY price DESC",
        });
        qb.push(" OFFSET ").push_bind(filter.skip);
        qb.push(" LIMIT ").push_bind(filter.limit);

        let tickets = qb.build_query_as::<Ticket>().fetch_all(&self.pool).await?;
        Ok(tickets)
    }

    async fn update_ticket(
        &self,
        id: Uuid,
        update: &TicketUpdate,
    ) -> Result<Option<Ticket>, StoreError> {
        let ticket = sqlx::query_as::<_, Ticket>(
            "UPDATE tickets SET
                origin = COALESCE($2, origin),
                destination = COALESCE($3, destination),
                mode = COALESCE($4, mode),
                price = COALESCE($5, price),
                available_quantity = COALESCE($6, available_quantity),
                updated_at = now()
             WHERE id = $1
             RETURNING *",
        )
        .bind(id)
        .bind(update.origin.as_deref())
        .bind(update.destination.as_deref())
        .bind(update.mode)
        .bind(update.price)
        .bind(update.available_quantity)
        .fetch_optional(&self.pool)
        .await?;
        Ok(ticket)
    }

    async fn set_ticket_status(
        &self,
        id: Uuid,
        status: ModerationStatus,
    ) -> Result<bool, StoreError> {
        let result =
            sqlx::query("UPDATE tickets SET status = $2, updated_at = now() WHERE id = $1")
                .bind(id)
                .bind(status)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn reject_tickets_for_vendor(&self, vendor_id: Uuid) -> Result<u64, StoreError> {
        let result = sqlx::query(
            "UPDATE tickets SET status = 'rejected', updated_at = now() WHERE vendor_id = $1",
        )
        .bind(vendor_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    async fn set_ticket_advertised(&self, id: Uuid, advertised: bool) -> Result<bool, StoreError> {
        let result =
            sqlx::query("UPDATE tickets SET advertised = $2, updated_at = now() WHERE id = $1")
                .bind(id)
                .bind(advertised)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn count_advertised(&self) -> Result<i64, StoreError> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM tickets WHERE advertised = TRUE")
                .fetch_one(&self.pool)
                .await?;
        Ok(count)
    }

    async fn try_decrement_quantity(&self, id: Uuid, by: i32) -> Result<bool, StoreError> {
        // The whole consistency story hangs on this being one conditional
        // server-side update, not a read followed by a write.
        let result = sqlx::query(
            "UPDATE tickets
             SET available_quantity = available_quantity - $2, updated_at = now()
             WHERE id = $1 AND available_quantity >= $2",
        )
        .bind(id)
        .bind(by)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn increment_quantity(&self, id: Uuid, by: i32) -> Result<bool, StoreError> {
        let result = sqlx::query(
            "UPDATE tickets
             SET available_quantity = available_quantity + $2, updated_at = now()
             WHERE id = $1",
        )
        .bind(id)
        .bind(by)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_ticket(&self, id: Uuid) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM tickets WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn insert_booking(&self, booking: &Booking) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO bookings (id, ticket_id, buyer_id, buyer_name, buyer_email, quantity,
                                   unit_price, total_price, status, session_id, transaction_id,
                                   paid_at, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)",
        )
        .bind(booking.id)
        .bind(booking.ticket_id)
        .bind(booking.buyer_id)
        .bind(&booking.buyer_name)
        .bind(&booking.buyer_email)
        .bind(booking.quantity)
        .bind(booking.unit_price)
        .bind(booking.total_price)
        .bind(booking.status)
        .bind(booking.session_id.as_deref())
        .bind(booking.transaction_id)
        .bind(booking.paid_at)
        .bind(booking.created_at)
        .bind(booking.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn booking_by_id(&self, id: Uuid) -> Result<Option<Booking>, StoreError> {
        let booking = sqlx::query_as::<_, Booking>("SELECT * FROM bookings WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(booking)
    }

    async fn bookings_for_buyer(&self, buyer_id: Uuid) -> Result<Vec<Booking>, StoreError> {
        let bookings = sqlx::query_as::<_, Booking>(
            "SELECT * FROM bookings WHERE buyer_id = $1 ORDER BY created_at DESC",
        )
        .bind(buyer_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(bookings)
    }

    async fn bookings_for_vendor(&self, vendor_id: Uuid) -> Result<Vec<Booking>, StoreError> {
        let bookings = sqlx::query_as::<_, Booking>(
            "SELECT b.* FROM bookings b
             JOIN tickets t ON t.id = b.ticket_id
             WHERE t.vendor_id = $1
             ORDER BY b.created_at DESC",
        )
        .bind(vendor_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(bookings)
    }

    async fn transition_booking(
        &self,
        id: Uuid,
        from: BookingStatus,
        to: BookingStatus,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query(
            "UPDATE bookings SET status = $3, updated_at = now() WHERE id = $1 AND status = $2",
        )
        .bind(id)
        .bind(from)
        .bind(to)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn set_booking_session(&self, id: Uuid, session_id: &str) -> Result<bool, StoreError> {
        let result =
            sqlx::query("UPDATE bookings SET session_id = $2, updated_at = now() WHERE id = $1")
                .bind(id)
                .bind(session_id)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn mark_booking_paid(
        &self,
        id: Uuid,
        transaction_id: Uuid,
        paid_at: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query(
            "UPDATE bookings
             SET status = 'paid', transaction_id = $2, paid_at = $3, updated_at = now()
             WHERE id = $1 AND status = 'accepted'",
        )
        .bind(id)
        .bind(transaction_id)
        .bind(paid_at)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn insert_transaction(&self, txn: &Transaction) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO transactions (id, booking_id, buyer_id, amount, status, note, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(txn.id)
        .bind(txn.booking_id)
        .bind(txn.buyer_id)
        .bind(txn.amount)
        .bind(txn.status)
        .bind(txn.note.as_deref())
        .bind(txn.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn transactions_for_booking(
        &self,
        booking_id: Uuid,
    ) -> Result<Vec<Transaction>, StoreError> {
        let txns = sqlx::query_as::<_, Transaction>(
            "SELECT * FROM transactions WHERE booking_id = $1 ORDER BY created_at ASC",
        )
        .bind(booking_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(txns)
    }

    async fn list_transactions(
        &self,
        skip: i64,
        limit: i64,
    ) -> Result<Vec<Transaction>, StoreError> {
        let txns = sqlx::query_as::<_, Transaction>(
            "SELECT * FROM transactions ORDER BY created_at DESC OFFSET $1 LIMIT $2",
        )
        .bind(skip)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(txns)
    }
}
