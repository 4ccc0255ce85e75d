mod backend;

pub use backend::{PostgresBackend, connect};
