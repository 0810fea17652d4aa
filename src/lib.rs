pub mod card;
pub mod config;
pub mod progress;
pub mod review;
pub mod scheduler;
pub mod web;
