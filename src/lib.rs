pub mod account;
pub mod attendance;
pub mod class;
pub mod config;
pub mod credentials;
pub mod dates;
pub mod db;
pub mod environment;
pub mod errors;
pub mod label;
pub mod normalization;
pub mod reports;
pub mod roster;
pub mod routes;
pub mod toggle;
pub mod urls;
pub mod view;
