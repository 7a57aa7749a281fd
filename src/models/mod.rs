//! Data models for LoRA Shelf

pub mod access_request;
pub mod borrow;
pub mod collection;
pub mod comment;
pub mod enums;
pub mod lora;
pub mod notification;
pub mod user;

// Re-export commonly used types
pub use access_request::AccessRequest;
pub use borrow::{BorrowRequest, BorrowedItem};
pub use collection::Collection;
pub use comment::Comment;
pub use enums::{LoraStatus, RequestStatus, Role, Visibility};
pub use lora::Lora;
pub use notification::Notification;
pub use user::{User, UserClaims, UserShort};
