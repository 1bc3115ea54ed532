//! Domain definitions.

pub mod event;
pub mod user;

pub use self::{event::Event, user::User};
