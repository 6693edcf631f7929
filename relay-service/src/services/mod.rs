pub mod database;
pub mod memory;
pub mod metrics;
pub mod providers;

pub use database::{DeviceStore, MongoDeviceStore};
pub use memory::InMemoryDeviceStore;
pub use self::metrics::{get_metrics, init_metrics, record_notification, record_registration};
pub use providers::{
    FcmProvider, MockPushProvider, ProviderError, ProviderResponse, PushMessage, PushProvider,
};
