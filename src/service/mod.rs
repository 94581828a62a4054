pub mod bootstrap;
pub mod gate;
pub mod installation_store;
pub mod session_hook;
