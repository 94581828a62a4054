pub mod session_query;

pub use session_query::SessionQuery;
