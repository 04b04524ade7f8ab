pub mod catalog;
pub mod config;
pub mod db;
pub mod environment;
pub mod errors;
pub mod moderation;
pub mod normalization;
pub mod routes;
pub mod saved;
pub mod submission;
pub mod tutorial;
pub mod urls;
