//! Concrete modules shipped with the firmware
//!
//! Each module is a self-contained unit built on the [`crate::module`]
//! contract. Registration order at boot is fixed: status first, then
//! beacon.

pub mod beacon;
pub mod status;

pub use beacon::BeaconModule;
pub use status::StatusModule;
