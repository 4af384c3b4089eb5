//! Barta Feed - RSS generation for a JSON news API
//!
//! This crate polls the news site's JSON endpoints, normalizes whatever post
//! records come back and writes a single RSS 2.0 document. Every run starts
//! from scratch and always produces a valid feed.

pub mod config;
pub mod extract;
pub mod feed;
pub mod fetcher;
pub mod index;
pub mod normalize;
pub mod output;
pub mod pipeline;
