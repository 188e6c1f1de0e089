pub mod betting;
pub mod commands;
pub mod config;
pub mod roulette;
pub mod session;
