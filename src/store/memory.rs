use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use axum::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::{
    Booking, BookingStatus, ModerationStatus, Ticket, Transaction, User,
};

use super::{MarketStore, StoreError, TicketFilter, TicketSort, TicketUpdate};

#[derive(Default)]
struct Inner {
    users: HashMap<Uuid, User>,
    tickets: HashMap<Uuid, Ticket>,
    bookings: HashMap<Uuid, Booking>,
    transactions: Vec<Transaction>,
}

/// In-process store used for tests and database-less development runs.
///
/// A single mutex guards all collections, so the conditional operations
/// (`try_decrement_quantity`, `transition_booking`, `mark_booking_paid`)
/// get the same check-and-write atomicity the Postgres store gets from
/// single-statement conditional updates.
#[derive(Default)]
pub struct MemStore {
    inner: Mutex<Inner>,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl MarketStore for MemStore {
    async fn insert_user(&self, user: &User) -> Result<(), StoreError> {
        let mut inner = self.lock();
        if inner.users.values().any(|u| u.email == user.email) {
            return Err(StoreError::DuplicateKey(user.email.clone()));
        }
        inner.users.insert(user.id, user.clone());
        Ok(())
    }

    async fn user_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        Ok(self.lock().users.get(&id).cloned())
    }

    async fn user_by_token(&self, token: &str) -> Result<Option<User>, StoreError> {
        Ok(self
            .lock()
            .users
            .values()
            .find(|u| u.api_token == token)
            .cloned())
    }

    async fn list_users(&self, skip: i64, limit: i64) -> Result<Vec<User>, StoreError> {
        let mut users: Vec<User> = self.lock().users.values().cloned().collect();
        users.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(users
            .into_iter()
            .skip(skip.max(0) as usize)
            .take(limit.max(0) as usize)
            .collect())
    }

    async fn set_user_fraudulent(&self, id: Uuid) -> Result<bool, StoreError> {
        let mut inner = self.lock();
        match inner.users.get_mut(&id) {
            Some(user) => {
                user.fraudulent = true;
                user.updated_at = Utc::now();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn insert_ticket(&self, ticket: &Ticket) -> Result<(), StoreError> {
        self.lock().tickets.insert(ticket.id, ticket.clone());
        Ok(())
    }

    async fn ticket_by_id(&self, id: Uuid) -> Result<Option<Ticket>, StoreError> {
        Ok(self.lock().tickets.get(&id).cloned())
    }

    async fn list_tickets(&self, filter: &TicketFilter) -> Result<Vec<Ticket>, StoreError> {
        let mut tickets: Vec<Ticket> = self
            .lock()
            .tickets
            .values()
            .filter(|t| filter.status.map_or(true, |s| t.status == s))
            .filter(|t| filter.vendor_id.map_or(true, |v| t.vendor_id == v))
            .filter(|t| {
                filter
                    .origin
                    .as_deref()
                    .map_or(true, |o| t.origin.eq_ignore_ascii_case(o))
            })
            .filter(|t| {
                filter
                    .destination
                    .as_deref()
                    .map_or(true, |d| t.destination.eq_ignore_ascii_case(d))
            })
            .filter(|t| filter.mode.map_or(true, |m| t.mode == m))
            .filter(|t| filter.advertised.map_or(true, |a| t.advertised == a))
            .cloned()
            .collect();

        match filter.sort {
            TicketSort::Newest => tickets.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
            TicketSort::PriceAsc => tickets.sort_by(|a, b| a.price.cmp(&b.price)),
            TicketSort::PriceDesc => tickets.sort_by(|a, b| b.price.cmp(&a.price)),
        }

        Ok(tickets
            .into_iter()
            .skip(filter.skip.max(0) as usize)
            .take(filter.limit.max(0) as usize)
            .collect())
    }

    async fn update_ticket(
        &self,
        id: Uuid,
        update: &TicketUpdate,
    ) -> Result<Option<Ticket>, StoreError> {
        let mut inner = self.lock();
        match inner.tickets.get_mut(&id) {
            Some(ticket) => {
                if let Some(ref origin) = update.origin {
                    ticket.origin = origin.clone();
                }
                if let Some(ref destination) = update.destination {
                    ticket.destination = destination.clone();
                }
                if let Some(mode) = update.mode {
                    ticket.mode = mode;
                }
                if let Some(price) = update.price {
                    ticket.price = price;
                }
                if let Some(quantity) = update.available_quantity {
                    ticket.available_quantity = quantity;
                }
                ticket.updated_at = Utc::now();
                Ok(Some(ticket.clone()))
            }
            None => Ok(None),
        }
    }

    async fn set_ticket_status(
        &self,
        id: Uuid,
        status: ModerationStatus,
    ) -> Result<bool, StoreError> {
        let mut inner = self.lock();
        match inner.tickets.get_mut(&id) {
            Some(ticket) => {
                ticket.status = status;
                ticket.updated_at = Utc::now();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn reject_tickets_for_vendor(&self, vendor_id: Uuid) -> Result<u64, StoreError> {
        let mut inner = self.lock();
        let mut affected = 0;
        for ticket in inner.tickets.values_mut() {
            if ticket.vendor_id == vendor_id {
                ticket.status = ModerationStatus::Rejected;
                ticket.updated_at = Utc::now();
                affected += 1;
            }
        }
        Ok(affected)
    }

    async fn set_ticket_advertised(&self, id: Uuid, advertised: bool) -> Result<bool, StoreError> {
        let mut inner = self.lock();
        match inner.tickets.get_mut(&id) {
            Some(ticket) => {
                ticket.advertised = advertised;
                ticket.updated_at = Utc::now();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn count_advertised(&self) -> Result<i64, StoreError> {
        Ok(self.lock().tickets.values().filter(|t| t.advertised).count() as i64)
    }

    async fn try_decrement_quantity(&self, id: Uuid, by: i32) -> Result<bool, StoreError> {
        let mut inner = self.lock();
        match inner.tickets.get_mut(&id) {
            Some(ticket) if ticket.available_quantity >= by => {
                ticket.available_quantity -= by;
                ticket.updated_at = Utc::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn increment_quantity(&self, id: Uuid, by: i32) -> Result<bool, StoreError> {
        let mut inner = self.lock();
        match inner.tickets.get_mut(&id) {
            Some(ticket) => {
                ticket.available_quantity += by;
                ticket.updated_at = Utc::now();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_ticket(&self, id: Uuid) -> Result<bool, StoreError> {
        Ok(self.lock().tickets.remove(&id).is_some())
    }

    async fn insert_booking(&self, booking: &Booking) -> Result<(), StoreError> {
        self.lock().bookings.insert(booking.id, booking.clone());
        Ok(())
    }

    async fn booking_by_id(&self, id: Uuid) -> Result<Option<Booking>, StoreError> {
        Ok(self.lock().bookings.get(&id).cloned())
    }

    async fn bookings_for_buyer(&self, buyer_id: Uuid) -> Result<Vec<Booking>, StoreError> {
        let mut bookings: Vec<Booking> = self
            .lock()
            .bookings
            .values()
            .filter(|b| b.buyer_id == buyer_id)
            .cloned()
            .collect();
        bookings.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(bookings)
    }

    async fn bookings_for_vendor(&self, vendor_id: Uuid) -> Result<Vec<Booking>, StoreError> {
        let inner = self.lock();
        let mut bookings: Vec<Booking> = inner
            .bookings
            .values()
            .filter(|b| {
                inner
                    .tickets
                    .get(&b.ticket_id)
                    .map_or(false, |t| t.vendor_id == vendor_id)
            })
            .cloned()
            .collect();
        bookings.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(bookings)
    }

    async fn transition_booking(
        &self,
        id: Uuid,
        from: BookingStatus,
        to: BookingStatus,
    ) -> Result<bool, StoreError> {
        let mut inner = self.lock();
        match inner.bookings.get_mut(&id) {
            Some(booking) if booking.status == from => {
                booking.status = to;
                booking.updated_at = Utc::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn set_booking_session(&self, id: Uuid, session_id: &str) -> Result<bool, StoreError> {
        let mut inner = self.lock();
        match inner.bookings.get_mut(&id) {
            Some(booking) => {
                booking.session_id = Some(session_id.to_string());
                booking.updated_at = Utc::now();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn mark_booking_paid(
        &self,
        id: Uuid,
        transaction_id: Uuid,
        paid_at: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let mut inner = self.lock();
        match inner.bookings.get_mut(&id) {
            Some(booking) if booking.status == BookingStatus::Accepted => {
                booking.status = BookingStatus::Paid;
                booking.transaction_id = Some(transaction_id);
                booking.paid_at = Some(paid_at);
                booking.updated_at = Utc::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn insert_transaction(&self, txn: &Transaction) -> Result<(), StoreError> {
        self.lock().transactions.push(txn.clone());
        Ok(())
    }

    async fn transactions_for_booking(
        &self,
        booking_id: Uuid,
    ) -> Result<Vec<Transaction>, StoreError> {
        Ok(self
            .lock()
            .transactions
            .iter()
            .filter(|t| t.booking_id == booking_id)
            .cloned()
            .collect())
    }

    async fn list_transactions(
        &self,
        skip: i64,
        limit: i64,
    ) -> Result<Vec<Transaction>, StoreError> {
        let mut txns = self.lock().transactions.clone();
        txns.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(txns
            .into_iter()
            .skip(skip.max(0) as usize)
            .take(limit.max(0) as usize)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;
    use crate::models::TransportMode;

    fn sample_ticket(quantity: i32) -> Ticket {
        let now = Utc::now();
        Ticket {
            id: Uuid::new_v4(),
            vendor_id: Uuid::new_v4(),
            vendor_name: "Northline Coaches".to_string(),
            vendor_email: "ops@northline.test".to_string(),
            origin: "Leeds".to_string(),
            destination: "Manchester".to_string(),
            mode: TransportMode::Bus,
            price: Decimal::new(1250, 2),
            available_quantity: quantity,
            status: ModerationStatus::Approved,
            advertised: false,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn decrement_is_conditional() {
        let store = MemStore::new();
        let ticket = sample_ticket(3);
        store.insert_ticket(&ticket).await.unwrap();

        assert!(store.try_decrement_quantity(ticket.id, 2).await.unwrap());
        assert!(!store.try_decrement_quantity(ticket.id, 2).await.unwrap());
        assert!(store.try_decrement_quantity(ticket.id, 1).await.unwrap());

        let stored = store.ticket_by_id(ticket.id).await.unwrap().unwrap();
        assert_eq!(stored.available_quantity, 0);
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected() {
        let store = MemStore::new();
        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            name: "Ada".to_string(),
            email: "ada@example.test".to_string(),
            role: crate::models::Role::Buyer,
            fraudulent: false,
            api_token: "tok-1".to_string(),
            created_at: now,
            updated_at: now,
        };
        store.insert_user(&user).await.unwrap();

        let dup = User {
            id: Uuid::new_v4(),
            api_token: "tok-2".to_string(),
            ..user.clone()
        };
        assert!(matches!(
            store.insert_user(&dup).await,
            Err(StoreError::DuplicateKey(_))
        ));
    }

    #[tokio::test]
    async fn ticket_filter_applies_sort_and_pagination() {
        let store = MemStore::new();
        for cents in [3000, 1000, 2000] {
            let mut t = sample_ticket(5);
            t.price = Decimal::new(cents, 2);
            store.insert_ticket(&t).await.unwrap();
        }

        let filter = TicketFilter {
            sort: TicketSort::PriceAsc,
            limit: 2,
            ..Default::default()
        };
        let tickets = store.list_tickets(&filter).await.unwrap();
        assert_eq!(tickets.len(), 2);
        assert!(tickets[0].price < tickets[1].price);
    }
}
