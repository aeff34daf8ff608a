mod manager;
mod model;
mod store;

pub use manager::SessionManager;
pub use model::{Message, MessageRole, Session, DEFAULT_USER_ID};
pub use store::SessionStore;
