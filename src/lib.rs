//! # PDF Spine
//!
//! The structural core of a PDF engine: the indirect-object graph, the
//! cross-reference machinery, and the incremental lexer/parser and
//! serializer that turn bytes on disk into that graph and back.
//!
//! ## What's here
//!
//! - **Lexer / Parser**: byte-level tokenizer and tail-first trailer
//!   chain reader; classic `xref` tables and PDF 1.5 cross-reference
//!   streams, object-stream decompression, lazy dereferencing.
//! - **Object model**: tagged [`object::Object`] values, dictionaries
//!   with insertion-ordered keys, streams with filter pipelines,
//!   explicit references resolved through per-generation tables.
//! - **Cross-reference tables**: add/remove/compact/renumber with
//!   uniqueness and reachability invariants.
//! - **Trailer chain**: one generation per incremental update,
//!   flattening when safe, signed generations preserved byte-exact.
//! - **Writer**: classic tables or cross-reference streams with packed
//!   object streams, incremental-update saves, width management.
//!
//! Deliberately out of scope: drawing APIs, fonts, AcroForm widgets,
//! the cryptographic side of encryption (a [`security::SecurityHandler`]
//! hook is exposed instead), and rendering.
//!
//! ## Quick start
//!
//! ```no_run
//! use pdf_spine::{Document, SaveOptions, XrefStyle};
//!
//! # fn main() -> Result<(), pdf_spine::Error> {
//! let mut doc = Document::open_file("report.pdf")?;
//! let catalog = doc.catalog()?;
//! println!("catalog at {}", catalog);
//!
//! // Rewrite with a cross-reference stream and packed object streams.
//! let mut out = Vec::new();
//! doc.save_with(
//!     &mut out,
//!     &SaveOptions {
//!         xref_style: XrefStyle::Stream,
//!         ..SaveOptions::default()
//!     },
//! )?;
//! # Ok(())
//! # }
//! ```

pub mod document;
pub mod error;
pub mod filters;
pub mod lexer;
pub mod object;
pub mod object_stream;
pub mod parser;
pub mod security;
pub mod trailer;
pub mod writer;
pub mod xref;

pub use document::{Document, Linearization, OpenMode, OpenOptions, Version};
pub use error::{Error, Result};
pub use object::{calc_checksum, Dictionary, HexString, Object, ObjectId, Stream, StringEncoding};
pub use security::{PasswordProvider, PasswordValidity, SecurityHandler};
pub use trailer::{ChainState, Trailer, TrailerKind};
pub use writer::{ObjectSerializer, SaveOptions, XrefStyle};
pub use xref::{CrossReferenceTable, Reference};
