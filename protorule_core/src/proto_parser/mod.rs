//! Proto source parser for protorule.
//!
//! Turns `.proto` text into a [`ProtoDefinition`]: a closed tree of
//! declarations (package, imports, options, messages, enums, services,
//! extends). Only what is needed to answer structural questions about a
//! file is modelled; type references are kept as text and never resolved.
//!
//! # Example
//!
//! ```
//! use protorule_core::proto_parser::{parse, Element};
//!
//! let definition = parse(r#"syntax = "proto3"; package demo;"#).unwrap();
//! assert!(matches!(definition.elements[1], Element::Package(_)));
//! ```

pub mod ast;
pub mod lexer;
pub mod parser;

pub use ast::{
    Constant, Element, Enum, EnumElement, EnumValue, Extend, Import, ImportKind, Message,
    MessageElement, Package, ProtoDefinition, ProtoOption, Service,
};
pub use lexer::LexError;
pub use parser::{ParseError, Position, parse};
