pub mod moderator;
pub mod permission;

pub use moderator::{InterfaceMode, Moderator};
pub use permission::{Permission, Section};
