//! Types kept in the visitor's session.

pub mod session;

pub use session::{Flash, FlashLevel, keys as session_keys};
