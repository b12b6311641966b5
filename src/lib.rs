pub mod asset;
pub mod clock;
pub mod config;
pub mod error;

pub mod content;
pub mod storage;

pub mod db;
pub mod input;
pub mod lifecycle;
pub mod ordering;
pub mod playlist;

pub mod reply;
pub mod server;
