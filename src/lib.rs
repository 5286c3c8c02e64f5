uniffi::setup_scaffolding!();

pub mod api;
mod trace_init;
