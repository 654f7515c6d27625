pub mod bundle;
pub mod horizon;
pub mod locks;
pub mod service;
pub mod store;
#[cfg(any(test, feature = "test-support"))]
pub mod testkit;
