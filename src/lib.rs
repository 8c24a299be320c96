// BENCHRIG LIBRARY
// EVERYTHING BUT ARGUMENT PARSING LIVES HERE SO tests/ CAN DRIVE IT OFFLINE.

pub mod config;
pub mod driver;
pub mod error;
pub mod record;
pub mod remote;
pub mod report;
pub mod server;
pub mod telemetry;
#[cfg(any(test, feature = "testing"))]
#[doc(hidden)]
pub mod testing;
pub mod window;
