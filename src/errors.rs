//! Unified error type for `MenuBuddy`.
//!
//! Every fallible operation in the crate returns [`Result`]. The API layer maps
//! these variants onto HTTP responses; see `api::error`.

use thiserror::Error;

/// All errors produced by the business logic and its collaborators.
#[derive(Debug, Error)]
pub enum Error {
    /// Missing or malformed configuration
    #[error("Configuration error: {message}")]
    Config {
        /// What went wrong
        message: String,
    },

    /// Error returned by the database layer
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// Filesystem error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Environment variable could not be read
    #[error("Environment variable error: {0}")]
    EnvVar(#[from] std::env::VarError),

    /// Integer conversion overflowed
    #[error("Integer conversion error: {0}")]
    IntConversion(#[from] std::num::TryFromIntError),

    /// (De)serialization of a stored JSON column failed
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Bad user input; the message is safe to show to the user
    #[error("{message}")]
    Validation {
        /// User-facing explanation
        message: String,
    },

    /// Price is negative or not finite
    #[error("Invalid amount: {amount}")]
    InvalidAmount {
        /// Offending value
        amount: f64,
    },

    /// The caller's role or ownership does not permit the operation
    #[error("Forbidden: {message}")]
    Forbidden {
        /// Internal reason, never shown to the user
        message: String,
    },

    /// No user with this id or name
    #[error("User not found: {name}")]
    UserNotFound {
        /// Id or username that was looked up
        name: String,
    },

    /// No customer profile
    #[error("Customer not found: {id}")]
    CustomerNotFound {
        /// Id that was looked up
        id: i64,
    },

    /// No restaurant owner profile
    #[error("Restaurant owner not found: {id}")]
    OwnerNotFound {
        /// Id that was looked up
        id: i64,
    },

    /// No restaurant with this id
    #[error("Restaurant not found: {id}")]
    RestaurantNotFound {
        /// Id that was looked up
        id: i64,
    },

    /// No menu item with this id
    #[error("Menu item not found: {id}")]
    MenuItemNotFound {
        /// Id that was looked up
        id: i64,
    },

    /// No order with this id
    #[error("Order not found: {id}")]
    OrderNotFound {
        /// Id that was looked up
        id: i64,
    },

    /// No feedback with this id
    #[error("Feedback not found: {id}")]
    FeedbackNotFound {
        /// Id that was looked up
        id: i64,
    },

    /// Cart already holds items from another restaurant
    #[error(
        "You can only order from one restaurant at a time. Please clear your cart first."
    )]
    CartConflict {
        /// Restaurant the cart is bound to
        cart_restaurant_id: i64,
        /// Restaurant of the rejected item
        item_restaurant_id: i64,
    },

    /// Checkout was attempted with nothing in the cart
    #[error("Your cart is empty.")]
    EmptyCart,

    /// Status string outside the known set
    #[error("Invalid order status: {status}")]
    InvalidStatus {
        /// Rejected value
        status: String,
    },

    /// Feedback or ratings submitted for an order that is not completed
    #[error(
        "Feedback can only be given once the order is completed (order {order_id} is {status})."
    )]
    FeedbackNotAllowed {
        /// Order id
        order_id: i64,
        /// Current status
        status: String,
    },

    /// Feedback or dish ratings already exist for this order
    #[error("{what} has already been submitted for order {order_id}.")]
    AlreadySubmitted {
        /// "Feedback" or "Dish rating"
        what: &'static str,
        /// Order id
        order_id: i64,
    },

    /// Username, password or role did not match
    #[error("Invalid username, password or role.")]
    InvalidCredentials,

    /// Auth or reset token failed verification
    #[error("Invalid or expired token")]
    InvalidToken,

    /// Password hashing failed
    #[error("Password hashing error: {message}")]
    PasswordHash {
        /// Error reported by the hasher
        message: String,
    },
}

impl Error {
    /// Shorthand for a [`Error::Validation`] with the given message.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Shorthand for a [`Error::Forbidden`] with the given reason.
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden {
            message: message.into(),
        }
    }

    /// True for errors that mean "no such entity".
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::UserNotFound { .. }
                | Self::CustomerNotFound { .. }
                | Self::OwnerNotFound { .. }
                | Self::RestaurantNotFound { .. }
                | Self::MenuItemNotFound { .. }
                | Self::OrderNotFound { .. }
                | Self::FeedbackNotFound { .. }
        )
    }
}

/// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;
