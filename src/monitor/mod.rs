mod controller;
mod worker;

pub use controller::{MonitorController, MonitorRun};
