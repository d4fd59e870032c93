//! Cart business logic - A per-session basket of menu items from a single restaurant.
//!
//! The cart is a plain value owned by the caller (the API keeps one per session). It stores
//! only item ids and quantities; prices are read from the menu when the cart is summarised and
//! snapshotted onto the order lines at checkout.

use crate::{
    core::{customer, menu, order::OrderStatus, restaurant},
    entities::{menu_item, order, order_item, restaurant as restaurant_entity},
    errors::{Error, Result},
};
use chrono::{NaiveDate, Utc};
use sea_orm::{ConnectionTrait, DatabaseConnection, Set, TransactionTrait, prelude::*};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::info;

/// Items a customer intends to order, all from one restaurant.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    /// Restaurant every item belongs to, `None` while the cart is empty
    pub restaurant_id: Option<i64>,
    /// Menu item id to quantity
    pub items: BTreeMap<i64, i32>,
}

/// One priced line of a cart.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CartLine {
    /// Menu item id
    pub menu_item_id: i64,
    /// Dish name
    pub name: String,
    /// Current menu price
    pub unit_price: f64,
    /// Units in the cart
    pub quantity: i32,
    /// `unit_price * quantity`
    pub subtotal: f64,
}

/// The cart priced against the current menu.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CartSummary {
    /// Restaurant the cart is bound to
    pub restaurant: Option<restaurant_entity::Model>,
    /// Priced lines in item id order
    pub lines: Vec<CartLine>,
    /// Sum of all subtotals
    pub total: f64,
}

impl Cart {
    /// True when the cart holds no items.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Total number of units across all lines.
    #[must_use]
    pub fn item_count(&self) -> i32 {
        self.items.values().sum()
    }

    /// Adds `quantity` units of a menu item, merging with an existing line.
    ///
    /// Fails without touching the cart when the item belongs to a different
    /// restaurant than the items already in the cart.
    pub async fn add<C>(&mut self, db: &C, item_id: i64, quantity: i32) -> Result<()>
    where
        C: ConnectionTrait,
    {
        if quantity < 1 {
            return Err(Error::validation("Quantity must be at least 1."));
        }
        let item = menu::get_menu_item(db, item_id).await?;

        if let Some(cart_restaurant_id) = self.restaurant_id
            && !self.is_empty()
            && cart_restaurant_id != item.restaurant_id
        {
            return Err(Error::CartConflict {
                cart_restaurant_id,
                item_restaurant_id: item.restaurant_id,
            });
        }

        self.restaurant_id = Some(item.restaurant_id);
        let entry = self.items.entry(item_id).or_insert(0);
        *entry = entry.saturating_add(quantity);
        Ok(())
    }

    /// Sets the quantity of a line. Zero or less removes it.
    pub fn update(&mut self, item_id: i64, quantity: i32) -> Result<()> {
        if quantity <= 0 {
            self.items.remove(&item_id);
        } else if let Some(entry) = self.items.get_mut(&item_id) {
            *entry = quantity;
        } else {
            return Err(Error::validation("Item is not in your cart."));
        }

        if self.items.is_empty() {
            self.restaurant_id = None;
        }
        Ok(())
    }

    /// Empties the cart and forgets its restaurant.
    pub fn clear(&mut self) {
        self.items.clear();
        self.restaurant_id = None;
    }

    /// Prices the cart with current menu prices. Items removed from the menu
    /// since they were added are left out.
    pub async fn summary<C>(&self, db: &C) -> Result<CartSummary>
    where
        C: ConnectionTrait,
    {
        let restaurant = match self.restaurant_id {
            Some(id) if !self.is_empty() => match restaurant::get_restaurant(db, id).await {
                Ok(r) => Some(r),
                Err(e) if e.is_not_found() => None,
                Err(e) => return Err(e),
            },
            _ => None,
        };

        let mut lines = Vec::with_capacity(self.items.len());
        for (&item_id, &quantity) in &self.items {
            let item = match menu::get_menu_item(db, item_id).await {
                Ok(item) => item,
                Err(e) if e.is_not_found() => continue,
                Err(e) => return Err(e),
            };
            lines.push(CartLine {
                menu_item_id: item.id,
                name: item.name,
                unit_price: item.price,
                quantity,
                subtotal: item.price * f64::from(quantity),
            });
        }
        let total = lines.iter().map(|l| l.subtotal).sum();

        Ok(CartSummary {
            restaurant,
            lines,
            total,
        })
    }

    /// Turns the cart into a pending order.
    ///
    /// Everything runs in one transaction: the order, its lines with prices
    /// copied from the menu, and the daily counters. The cart is cleared only
    /// after the commit succeeds.
    pub async fn checkout(
        &mut self,
        db: &DatabaseConnection,
        customer_id: i64,
        today: NaiveDate,
    ) -> Result<order::Model> {
        let Some(restaurant_id) = self.restaurant_id.filter(|_| !self.is_empty()) else {
            return Err(Error::EmptyCart);
        };

        let txn = db.begin().await?;
        customer::get_customer(&txn, customer_id).await?;
        restaurant::get_restaurant(&txn, restaurant_id).await?;

        let mut priced: Vec<(menu_item::Model, i32)> = Vec::with_capacity(self.items.len());
        for (&item_id, &quantity) in &self.items {
            let item = menu::get_menu_item(&txn, item_id).await?;
            if item.restaurant_id != restaurant_id {
                return Err(Error::validation(format!(
                    "'{}' is no longer available from this restaurant.",
                    item.name
                )));
            }
            priced.push((item, quantity));
        }
        let total: f64 = priced
            .iter()
            .map(|(item, quantity)| item.price * f64::from(*quantity))
            .sum();

        let now = Utc::now();
        let order = order::ActiveModel {
            customer_id: Set(customer_id),
            restaurant_id: Set(restaurant_id),
            status: Set(OrderStatus::Pending.as_str().to_string()),
            total_amount: Set(total),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        for (item, quantity) in &priced {
            order_item::ActiveModel {
                order_id: Set(order.id),
                menu_item_id: Set(item.id),
                quantity: Set(*quantity),
                price: Set(item.price),
                created_at: Set(now),
                ..Default::default()
            }
            .insert(&txn)
            .await?;
            menu::increment_daily_order_count(&txn, item.id, *quantity, today).await?;
        }

        txn.commit().await?;
        self.clear();

        info!(
            "Order {} placed by customer {} at restaurant {} for {:.2}",
            order.id, customer_id, restaurant_id, order.total_amount
        );
        Ok(order)
    }
}
