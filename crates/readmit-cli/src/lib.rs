//! Library side of the `readmit` binary: logging setup and the JSON-lines transport.

pub mod logging;
pub mod transport;
