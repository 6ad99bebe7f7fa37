//! Common test utilities
#![allow(dead_code)]

pub mod device_mock;
pub mod test_fixtures;

pub use device_mock::MockNodeMcu;
