pub mod config_ops;
pub mod map_ops;
pub mod simulate_ops;
