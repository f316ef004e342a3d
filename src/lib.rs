//! biblio application library.
//!
//! Hosts the application modules mounted by the binary; kept as a library so
//! integration tests can compose the same router the server runs.

pub mod modules;
