//! linehook core library: config, channels, reply selection, and the webhook gateway
//! used by the `linehook` CLI.

pub mod channels;
pub mod config;
pub mod gateway;
pub mod reply;
