pub mod audio;
pub mod cabin;
pub mod config;
pub mod error;
pub mod live;
pub mod services;
pub mod session;

// Re-export specific items if needed for convenient access
pub use session::controller::SessionController;
