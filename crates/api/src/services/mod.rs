//! Business logic services.
//!
//! # Services
//!
//! - `authz` - Cart access checks (existence, role, ownership)
//! - `cart` - Cart operations for buyers
//! - `users` - Registration and profile updates
//! - `products` - Catalog management for sellers
//!
//! Services borrow their stores for the duration of one request; build them
//! through [`crate::state::AppState`].

pub mod authz;
pub mod cart;
pub mod products;
pub mod users;

pub use authz::{AccessError, AuthorizationGuard};
pub use cart::{CartError, CartService};
pub use products::{NewProductInput, ProductError, ProductPatch, ProductService};
pub use users::{NewUserInput, UserError, UserPatch, UserService};
