pub mod controller;
pub mod driver;
pub mod event;
pub mod transcript;
