pub mod actors;
pub mod config;
pub mod diagnosis;
pub mod discord;
pub mod history;
pub mod notify;
pub mod probe;
pub mod storage;
pub mod target;
pub mod util;
