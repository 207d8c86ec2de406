//! # depthfeed - Market Depth Feed Handler
//!
//! This crate consumes a binary stream of market-data messages (add,
//! update, delete, execute) and maintains per-symbol limit order books with
//! aggregated price-level depth. After each message it prints the top-N
//! depth of the affected symbol, but only when that message changed one of
//! the top-N price levels.
//!
//! ## Architecture
//!
//! - **Decoder**: streaming, resumable framing of the raw byte stream into
//!   typed records
//! - **Book**: per-symbol order books with per-price aggregation, ordered
//!   ladders, and top-N change detection
//! - **Wire**: allocation-light encoding of depth output lines
//! - **Config**: `ENV`-selected profiles for stream parameters
//!
//! The binary wires these together as a producer task (source bytes to
//! records) and a consumer task (records to depth lines) over a bounded
//! channel.
//!
//! ## Example
//!
//! ```rust
//! use depthfeed::book::{Books, Side, Symbol};
//! use depthfeed::wire;
//!
//! let mut books = Books::new(3);
//! let changed = books.add(Symbol(*b"ABC"), 1, Side::Buy, 100, 10).unwrap();
//! assert!(changed);
//!
//! let book = books.get(Symbol(*b"ABC")).unwrap();
//! let line = wire::encode_depth_line(
//!     1,
//!     Symbol(*b"ABC"),
//!     &book.visible(Side::Buy),
//!     &book.visible(Side::Sell),
//! );
//! assert_eq!(&line[..], &b"1, ABC, [(100, 10)], []\n"[..]);
//! ```
pub mod book;
pub mod config;
pub mod decoder;
pub mod wire;
