pub mod api;
pub mod app;
pub mod avatar;
pub mod contacts;
pub mod conversations;
pub mod directory;
pub mod error;
pub mod phone;
pub mod session;
pub mod storage;
pub mod utils;

pub use error::{Error, Result};
