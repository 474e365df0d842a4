pub mod classifier;
pub mod fs_service;
pub mod labels;
pub mod watcher;
