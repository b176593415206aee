// server/src/models/mod.rs

//! Rows as stored in PostgreSQL. Status columns are text and parse into the
//! `companion_core` enums on the way out.

pub mod balance_transaction;
pub mod complaint;
pub mod favorite;
pub mod guide;
pub mod guide_application;
pub mod message;
pub mod order;
pub mod user;

pub use balance_transaction::BalanceTransaction;
pub use complaint::Complaint;
pub use favorite::FavoriteGuide;
pub use guide::Guide;
pub use guide_application::GuideApplication;
pub use message::{ConversationSummary, Message};
pub use order::Order;
pub use user::User;
