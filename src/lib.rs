pub mod club;
pub mod club_db;
pub mod config;
pub mod error;
pub mod football_api;
pub mod http_cache;
pub mod http_client;
pub mod mock_feed;
pub mod model;
pub mod normalize;
pub mod notify;
pub mod persist;
pub mod provider;
pub mod validation;
