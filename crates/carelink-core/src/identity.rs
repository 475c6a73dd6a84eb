//! # Domain Identity Newtypes
//!
//! Newtype wrappers for the identifiers that cross crate boundaries.
//! A `BookingId` cannot be passed where a `DisputeId` is expected.
//!
//! All identifiers serialize as a bare UUID string.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! uuid_newtype {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Generate a new random identifier.
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Wrap an existing UUID.
            pub fn from_uuid(id: Uuid) -> Self {
                Self(id)
            }

            /// Access the inner UUID.
            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}:{}", $prefix, self.0)
            }
        }

        impl From<Uuid> for $name {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }
    };
}

uuid_newtype!(
    /// A marketplace user: careseeker, caregiver, or administrator.
    ///
    /// Caregiver wallets are keyed by the caregiver's user id.
    UserId,
    "user"
);

uuid_newtype!(
    /// The booking (service transaction) a dispute is raised against.
    BookingId,
    "booking"
);

uuid_newtype!(
    /// A dispute case.
    DisputeId,
    "dispute"
);

uuid_newtype!(
    /// A single ledger transaction inside a caregiver wallet.
    TransactionId,
    "txn"
);
