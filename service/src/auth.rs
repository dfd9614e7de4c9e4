//! Actor identity and authorization guards.
//!
//! The (external) auth layer hands every call an authenticated
//! `{user_id, role}` pair. The guards here enforce the two policies the
//! engine needs: "owner or admin" for order access, cancellation and
//! payment, and "admin only" for explicit status transitions and delivery.

use storefront_core::error::{Error, Result};
use storefront_core::types::{Role, UserId};

/// Authenticated caller of a service operation
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Actor {
    /// Authenticated user id
    pub user_id: UserId,
    /// Role issued by the auth layer
    pub role: Role,
}

impl Actor {
    /// Creates an actor
    #[must_use]
    pub const fn new(user_id: UserId, role: Role) -> Self {
        Self { user_id, role }
    }

    /// A customer-role actor with a fresh id (test convenience)
    #[must_use]
    pub fn customer() -> Self {
        Self::new(UserId::new(), Role::Customer)
    }

    /// Whether the actor carries the admin role
    #[must_use]
    pub const fn is_admin(&self) -> bool {
        matches!(self.role, Role::Admin)
    }

    /// Fails with [`Error::NotAuthorized`] unless the actor owns the record
    /// or is an admin.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotAuthorized`] for a non-owner, non-admin caller.
    pub fn ensure_owner_or_admin(&self, owner: UserId) -> Result<()> {
        if self.is_admin() || self.user_id == owner {
            Ok(())
        } else {
            Err(Error::NotAuthorized)
        }
    }

    /// Fails with [`Error::NotAuthorized`] unless the actor is an admin.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotAuthorized`] for a non-admin caller.
    pub const fn ensure_admin(&self) -> Result<()> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(Error::NotAuthorized)
        }
    }
}
