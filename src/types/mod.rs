pub mod hook;
pub mod installation;
pub mod session;
