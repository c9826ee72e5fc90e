//! Inventory store: tickets and users keyed by dense 1-based identifiers.
//!
//! The store itself is not synchronized. It is built on a single thread and then
//! moved into a [`BookingCoordinator`](crate::core::BookingCoordinator), which
//! owns it behind its lock for the rest of the run.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::core::BookingError;

/// Ticket identifier (dense, starting at 1).
pub type TicketId = u32;

/// User identifier (dense, starting at 1).
pub type UserId = u32;

/// Booking state of a ticket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
    /// Ticket can still be booked.
    Available,
    /// Ticket has been sold; terminal.
    Booked,
}

/// A single allocatable ticket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ticket {
    /// Ticket identifier.
    pub id: TicketId,
    /// Price placeholder; always zero.
    pub price: u32,
    /// Current booking state.
    pub status: TicketStatus,
}

/// A simulated user and the tickets they hold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// User identifier.
    pub id: UserId,
    /// Display name.
    pub username: String,
    /// Snapshots of tickets booked by this user, in booking order.
    pub booked_tickets: Vec<Ticket>,
}

/// Owned ticket and user maps.
#[derive(Debug, Default, Clone)]
pub struct Inventory {
    tickets: HashMap<TicketId, Ticket>,
    users: HashMap<UserId, User>,
}

impl Inventory {
    /// Create an empty inventory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an inventory populated with `ticket_count` tickets and `user_count` users.
    #[must_use]
    pub fn with_counts(ticket_count: u32, user_count: u32) -> Self {
        let mut inventory = Self::new();
        inventory.create_tickets(ticket_count);
        inventory.create_users(user_count);
        inventory
    }

    /// Populate tickets `1..=count`, all available. Replaces any existing tickets.
    pub fn create_tickets(&mut self, count: u32) {
        self.tickets = (1..=count)
            .map(|id| {
                (
                    id,
                    Ticket {
                        id,
                        price: 0,
                        status: TicketStatus::Available,
                    },
                )
            })
            .collect();
    }

    /// Populate users `1..=count` with empty histories. Replaces any existing users.
    pub fn create_users(&mut self, count: u32) {
        self.users = (1..=count)
            .map(|id| {
                (
                    id,
                    User {
                        id,
                        username: format!("User {id}"),
                        booked_tickets: Vec::new(),
                    },
                )
            })
            .collect();
    }

    /// Look up a ticket.
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::TicketNotFound`] if `id` is not populated.
    pub fn fetch_ticket(&self, id: TicketId) -> Result<&Ticket, BookingError> {
        self.tickets.get(&id).ok_or(BookingError::TicketNotFound(id))
    }

    /// Look up a user.
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::UserNotFound`] if `id` is not populated.
    pub fn fetch_user(&self, id: UserId) -> Result<&User, BookingError> {
        self.users.get(&id).ok_or(BookingError::UserNotFound(id))
    }

    pub(crate) fn fetch_ticket_mut(&mut self, id: TicketId) -> Result<&mut Ticket, BookingError> {
        self.tickets
            .get_mut(&id)
            .ok_or(BookingError::TicketNotFound(id))
    }

    pub(crate) fn fetch_user_mut(&mut self, id: UserId) -> Result<&mut User, BookingError> {
        self.users.get_mut(&id).ok_or(BookingError::UserNotFound(id))
    }

    /// Number of tickets.
    #[must_use]
    pub fn ticket_count(&self) -> usize {
        self.tickets.len()
    }

    /// Number of users.
    #[must_use]
    pub fn user_count(&self) -> usize {
        self.users.len()
    }

    /// Iterate all tickets in arbitrary order.
    pub fn tickets(&self) -> impl Iterator<Item = &Ticket> {
        self.tickets.values()
    }

    /// Iterate all users in arbitrary order.
    pub fn users(&self) -> impl Iterator<Item = &User> {
        self.users.values()
    }
}
