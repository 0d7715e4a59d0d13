pub mod browser;
pub mod config;
pub mod credentials;
pub mod github;
pub mod host;
pub mod logging;
pub mod notify;
pub mod output;
pub mod poll;
pub mod status;
pub mod store;
pub mod tabs;
