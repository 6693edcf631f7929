pub mod device;

pub use device::{is_valid_code, Device, DeviceView, CODE_LENGTH, DEVICE_TTL};
