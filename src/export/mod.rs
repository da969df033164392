//! Deterministic export: a virtual frame clock replaces real time, every frame is captured in
//! order and the finished asset is handed to the completion handshake.

pub(crate) mod clock;
pub(crate) mod digest;
pub(crate) mod driver;
pub(crate) mod resolution;
pub(crate) mod session;
pub(crate) mod watchdog;
