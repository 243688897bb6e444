//! Orders domain module.
//!
//! Orders, their line items (order details), the detail validator and the
//! pure half of the lifecycle engine. Everything here is deterministic: no IO,
//! no clocks (timestamps are passed in), no storage.

pub mod detail;
pub mod lifecycle;
pub mod order;
pub mod validator;

pub use detail::{DetailDraft, DetailInput, DetailPatch, OrderDetail};
pub use lifecycle::{Line, StockEffect};
pub use order::{MovementType, NewOrder, Order, OrderInput, OrderStatus};
