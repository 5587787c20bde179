pub mod api;
pub mod asset_cache;
pub mod config;
pub mod http_client;
pub mod leaderboard;
pub mod model;
pub mod provider;
pub mod round_view;
pub mod session;
pub mod state;
pub mod tips;
