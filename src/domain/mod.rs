//! Domain layer - value objects and the notification model.

pub mod foundation;
pub mod notification;
