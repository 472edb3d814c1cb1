pub mod server_model;
pub mod user_model;

pub use server_model::{ServerInfo, ServerType};
pub use user_model::{Character, Equipment, InventoryItem, Player};
