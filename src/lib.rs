//! EPUB Canonical Fragment Identifiers
//!
//! Generation, parsing, interpretation and comparison of EPUB CFI strings.
//!
//! # Overview
//!
//! A CFI addresses a position inside an EPUB publication: a path through the
//! package document to a spine entry, an indirection into the content
//! document, and a path inside it.
//!
//! ```text
//! epubcfi(/6/4[chap01ref]!/4[body01]/10[para05]/3:10)
//!         │  │           │ │         │          │ └── character offset 10
//!         │  │           │ │         │          └──── text position (odd)
//!         │  │           │ │         └─────────────── element with id assertion
//!         │  │           │ └───────────────────────── body element
//!         │  │           └─────────────────────────── indirection
//!         │  └─────────────────────────────────────── spine itemref
//!         └────────────────────────────────────────── spine element
//! ```
//!
//! Elements take even indices. Every position before, between and after
//! elements takes an odd index, and the text, comments and processing
//! instructions in it are counted as one run of characters. Elements matched
//! by [`ElisionRules`] are skipped entirely.
//!
//! # Usage
//!
//! ```ignore
//! use epubcfi::{parse, package_component, complete_cfi, CfiGenerator, CfiInterpreter, XmlTree};
//!
//! let doc = XmlTree::parse_document(xhtml)?;
//! let tree = XmlTree::new(&doc);
//! let content = CfiGenerator::new(&tree).character_offset_component(text_node, 42)?;
//!
//! let package_doc = XmlTree::parse_document(opf)?;
//! let package = XmlTree::new(&package_doc);
//! let cfi = complete_cfi(package_component(Some(&package), Some("chap01"))?, content);
//!
//! let location = CfiInterpreter::new(&tree).resolve(&parse(&cfi.to_string())?)?;
//! ```

mod comparator;
pub mod config;
pub mod error;
mod generator;
mod indexing;
mod interpreter;
mod parser;
pub mod tree;
mod types;

// Re-export main types
pub use types::{
    escape, CharacterOffset, Cfi, CfiPath, CfiStep, ContentComponent, PackageComponent,
    RangeComponent, SpatialOffset, TemporalOffset, TextAssertion, RESERVED_CHARS,
};

pub use config::ElisionRules;
pub use error::{CfiError, ErrorKind, Result};
pub use tree::{DocumentTree, NodeKind, XmlTree};

// Re-export parser functions
pub use parser::{parse, parse_content, try_parse};

// Re-export generator
pub use generator::{
    complete_cfi, package_component, package_component_with_spine_index,
    validate_start_element, CfiGenerator, StopAt,
};

// Re-export interpreter
pub use interpreter::{
    interpret, resolve_package, CfiInterpreter, Location, Resolution, ResolvedRange,
    SpineReference,
};

// Re-export comparator functions
pub use comparator::{compare_cfi_strings, compare_reading_order, is_after, is_before, is_in_range};
