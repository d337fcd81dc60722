//! Data models for the marketplace.
//!
//! Wire shapes are camelCase JSON; money is carried as `Decimal` and serialized as strings.

mod cart;
mod chat;
mod coupon;
mod dashboard;
mod deal;
mod order;
mod payment;
mod product;
mod settings;
mod shipping;
mod user;

pub use cart::*;
pub use chat::*;
pub use coupon::*;
pub use dashboard::*;
pub use deal::*;
pub use order::*;
pub use payment::*;
pub use product::*;
pub use settings::*;
pub use shipping::*;
pub use user::*;
