//! HTTP handlers for relay-service.

pub mod devices;
pub mod health;
pub mod maintenance;
pub mod notifications;

pub use devices::register_device;
pub use health::{health_check, metrics, readiness_check, root};
pub use maintenance::{delete_device, list_devices};
pub use notifications::send_notification;
