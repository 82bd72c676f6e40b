//! Domain models for the shop.
//!
//! These are validated domain objects, separate from database row types and
//! from the raw request bodies accepted by the services.

pub mod cart;
pub mod product;
pub mod user;

pub use cart::{Cart, CartItem, CartLinePayload, CartPayload};
pub use product::{NewProduct, Product, ProductUpdate};
pub use user::{NewUser, User, UserUpdate};
