pub mod calibration;
pub mod calibration_window;
pub mod config;
pub mod csv_loader;
pub mod debouncer;
pub mod direction;
pub mod foot_calibrator;
pub mod frame_source;
pub mod gesture_classifier;
pub mod hid;
pub mod step_driver;
pub mod thresholds;
pub mod tracking_session;
pub mod types;
