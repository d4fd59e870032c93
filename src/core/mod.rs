//! Core business logic, independent of the HTTP layer.
//!
//! Every function takes a database handle and plain values and returns
//! [`crate::errors::Result`], so the same operations back the API handlers and
//! the tests.

/// Shopping cart value object and checkout
pub mod cart;
/// Customer profile, preferences and favorites
pub mod customer;
/// Order feedback, dish ratings and owner responses
pub mod feedback;
/// User accounts, credentials and password reset tokens
pub mod identity;
/// Menu items, deal of the day and the daily order counter
pub mod menu;
/// Order lookup, listing and status progression
pub mod order;
/// Restaurant and dish recommendations
pub mod recommend;
/// Owner reports over a date range
pub mod report;
/// Restaurant management and search
pub mod restaurant;
