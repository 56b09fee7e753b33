pub mod auth;
pub mod db;
pub mod error;
pub mod model;
pub mod mutation;
pub mod ops;
pub mod output;
pub mod page;
pub mod search;
pub mod store;
pub mod subscribe;
pub mod tui;
pub mod validate;
pub mod watch;
