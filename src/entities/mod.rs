//! Entity module - Contains all SeaORM entity definitions for the database.
//! These entities represent the database tables and their relationships.
//! Each entity has a Model struct for data and an Entity struct for operations.

pub mod customer;
pub mod dish_rating;
pub mod feedback;
pub mod menu_item;
pub mod order;
pub mod order_item;
pub mod restaurant;
pub mod restaurant_owner;
pub mod user;

// Re-export specific types to avoid conflicts
pub use customer::{Column as CustomerColumn, Entity as Customer, Model as CustomerModel};
pub use dish_rating::{
    Column as DishRatingColumn, Entity as DishRating, Model as DishRatingModel,
};
pub use feedback::{Column as FeedbackColumn, Entity as Feedback, Model as FeedbackModel};
pub use menu_item::{Column as MenuItemColumn, Entity as MenuItem, Model as MenuItemModel};
pub use order::{Column as OrderColumn, Entity as Order, Model as OrderModel};
pub use order_item::{Column as OrderItemColumn, Entity as OrderItem, Model as OrderItemModel};
pub use restaurant::{Column as RestaurantColumn, Entity as Restaurant, Model as RestaurantModel};
pub use restaurant_owner::{
    Column as RestaurantOwnerColumn, Entity as RestaurantOwner, Model as RestaurantOwnerModel,
};
pub use user::{Column as UserColumn, Entity as User, Model as UserModel};
