//! Fetch images from URLs into a local directory, skipping anything that is
//! not an image or whose content is already stored there.

pub mod config;
pub mod content_type;
pub mod dedupe;
pub mod driver;
pub mod fetch;
pub mod filename;
