//! switchboardd — daemon internals, exposed as a library so the integration
//! suite can run the full registry in-process on a loopback port.

pub mod listener;
