//! Reader core for EB / EBG / EBXA / S-EBXA and EPWING CD-ROM reference
//! works.
//!
//! Four layers, each depending only on the one beneath it:
//! [`zio`] (compressed-I/O virtualisation), [`search`] (paged index
//! descent), [`text`] (the article-stream state machine), and [`book`]
//! (the subbook session that binds the other three together).

pub mod book;
pub mod cache;
pub mod error;
pub mod io;
pub mod position;
pub mod search;
pub mod text;
pub mod zio;

pub use book::{Book, BindOptions};
pub use error::{Error, Result};
