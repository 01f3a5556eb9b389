//! Deskhelper daemon library
//!
//! Local HTTP helper that opens folders in the desktop file browser,
//! plus the background self-updater.

pub mod opener;
pub mod routes;
pub mod server;
pub mod updater;
