//! Booking coordinator: the single exclusivity domain around the inventory.
//!
//! Every read and write of ticket or user state goes through one
//! `parking_lot::Mutex`. A booking holds it for exactly one
//! lookup-check-mutate and never across a blocking call.

use std::collections::BTreeSet;

use parking_lot::Mutex;
use tracing::debug;

use crate::core::{BookingError, Inventory, Ticket, TicketId, TicketStatus, UserId};

/// Serializes ticket state transitions and the matching user history updates.
#[derive(Debug)]
pub struct BookingCoordinator {
    inventory: Mutex<Inventory>,
}

impl BookingCoordinator {
    /// Take ownership of a fully built inventory. Its shape is frozen from here on.
    #[must_use]
    pub fn new(inventory: Inventory) -> Self {
        Self {
            inventory: Mutex::new(inventory),
        }
    }

    /// Book `ticket_id` for `user_id`.
    ///
    /// Both lookups succeed before anything is mutated, so a failed attempt
    /// leaves the inventory untouched.
    ///
    /// # Errors
    ///
    /// - [`BookingError::TicketNotFound`] if the ticket does not exist
    /// - [`BookingError::AlreadyBooked`] if the ticket is no longer available
    /// - [`BookingError::UserNotFound`] if the user does not exist
    pub fn book_ticket(&self, user_id: UserId, ticket_id: TicketId) -> Result<(), BookingError> {
        let mut inventory = self.inventory.lock();

        if inventory.fetch_ticket(ticket_id)?.status != TicketStatus::Available {
            return Err(BookingError::AlreadyBooked(ticket_id));
        }
        inventory.fetch_user(user_id)?;

        let ticket = inventory.fetch_ticket_mut(ticket_id)?;
        ticket.status = TicketStatus::Booked;
        let snapshot = ticket.clone();
        inventory.fetch_user_mut(user_id)?.booked_tickets.push(snapshot);

        debug!(user_id = user_id, ticket_id = ticket_id, "Ticket booked");
        Ok(())
    }

    /// Current status of a ticket.
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::TicketNotFound`] if the ticket does not exist.
    pub fn ticket_status(&self, ticket_id: TicketId) -> Result<TicketStatus, BookingError> {
        Ok(self.inventory.lock().fetch_ticket(ticket_id)?.status)
    }

    /// Copy of a user's booking history.
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::UserNotFound`] if the user does not exist.
    pub fn user_history(&self, user_id: UserId) -> Result<Vec<Ticket>, BookingError> {
        Ok(self.inventory.lock().fetch_user(user_id)?.booked_tickets.clone())
    }

    /// Identifiers of every booked ticket, sorted.
    #[must_use]
    pub fn booked_ticket_ids(&self) -> BTreeSet<TicketId> {
        self.inventory
            .lock()
            .tickets()
            .filter(|t| t.status == TicketStatus::Booked)
            .map(|t| t.id)
            .collect()
    }

    /// Number of booked tickets.
    #[must_use]
    pub fn booked_count(&self) -> usize {
        self.inventory
            .lock()
            .tickets()
            .filter(|t| t.status == TicketStatus::Booked)
            .count()
    }

    /// Total number of entries across all user histories.
    #[must_use]
    pub fn history_total(&self) -> usize {
        self.inventory
            .lock()
            .users()
            .map(|u| u.booked_tickets.len())
            .sum()
    }

    /// Consistent copy of the whole inventory, taken under the lock.
    #[must_use]
    pub fn inventory_snapshot(&self) -> Inventory {
        self.inventory.lock().clone()
    }

    /// Number of tickets in the inventory.
    #[must_use]
    pub fn ticket_count(&self) -> usize {
        self.inventory.lock().ticket_count()
    }

    /// Number of users in the inventory.
    #[must_use]
    pub fn user_count(&self) -> usize {
        self.inventory.lock().user_count()
    }
}
