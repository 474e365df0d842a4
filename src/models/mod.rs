pub mod classify_types;
pub mod watch_types;
