pub mod device_model;
pub mod event_model;
pub mod pin_model;
