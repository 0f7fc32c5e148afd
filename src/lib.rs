//! rssmerge - fetch a list of feeds concurrently and serve them as one RSS feed.

pub mod api;
pub mod config;
pub mod feed;
pub mod util;
