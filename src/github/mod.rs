pub mod client;
pub mod forks;
pub mod gateway;
pub mod gh_cli;
pub mod identity;
pub mod types;
