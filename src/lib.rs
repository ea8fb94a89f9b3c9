pub mod caption;
pub mod caption_store;
pub mod carousel;
pub mod config;
pub mod contact;
pub mod error;
pub mod events;
pub mod scan;
pub mod session;
pub mod web;
pub mod tasks {
    pub mod autoplay;
}
