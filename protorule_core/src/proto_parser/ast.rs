//! Proto Abstract Syntax Tree definitions.
//!
//! The tree is a closed set of declaration variants. Consumers walk it by
//! pattern matching rather than through a visitor registry.

use std::fmt;

/// A complete proto source file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProtoDefinition {
    pub elements: Vec<Element>,
}

/// A top-level declaration.
#[derive(Debug, Clone, PartialEq)]
pub enum Element {
    Syntax(String),
    Edition(String),
    Package(Package),
    Import(Import),
    Option(ProtoOption),
    Message(Message),
    Enum(Enum),
    Service(Service),
    Extend(Extend),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Package {
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ImportKind {
    #[default]
    Default,
    Weak,
    Public,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Import {
    pub filename: String,
    pub kind: ImportKind,
}

/// An option statement or a bracketed field/value option.
///
/// `name` keeps its textual form: `java_package`, `(my.ext)` or
/// `(my.ext).field`.
#[derive(Debug, Clone, PartialEq)]
pub struct ProtoOption {
    pub name: String,
    pub constant: Constant,
}

/// The value assigned to an option.
#[derive(Debug, Clone, PartialEq)]
pub enum Constant {
    String(String),
    Int(i128),
    Float(f64),
    Bool(bool),
    Identifier(String),
    /// A `{ ... }` text-format message, kept verbatim.
    Aggregate(String),
}

impl Constant {
    /// The string payload, if this is a string constant.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Constant::String(s) => Some(s),
            _ => None,
        }
    }

    /// The value as it would be written without quoting.
    pub fn source(&self) -> String {
        match self {
            Constant::String(s) | Constant::Identifier(s) | Constant::Aggregate(s) => s.clone(),
            Constant::Int(v) => v.to_string(),
            Constant::Float(v) => v.to_string(),
            Constant::Bool(v) => v.to_string(),
        }
    }
}

impl fmt::Display for Constant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constant::String(s) => write!(f, "{:?}", s),
            other => f.write_str(&other.source()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub name: String,
    pub elements: Vec<MessageElement>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum MessageElement {
    Field(Field),
    MapField(MapField),
    Oneof(Oneof),
    Option(ProtoOption),
    Message(Message),
    Enum(Enum),
    Extend(Extend),
    Reserved(Reserved),
    Extensions(Extensions),
}

impl Message {
    pub fn fields(&self) -> impl Iterator<Item = &Field> {
        self.elements.iter().filter_map(|e| match e {
            MessageElement::Field(f) => Some(f),
            _ => None,
        })
    }

    pub fn options(&self) -> impl Iterator<Item = &ProtoOption> {
        self.elements.iter().filter_map(|e| match e {
            MessageElement::Option(o) => Some(o),
            _ => None,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldLabel {
    Optional,
    Required,
    Repeated,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub label: Option<FieldLabel>,
    pub type_name: String,
    pub name: String,
    pub number: i64,
    pub options: Vec<ProtoOption>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MapField {
    pub key_type: String,
    pub value_type: String,
    pub name: String,
    pub number: i64,
    pub options: Vec<ProtoOption>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Oneof {
    pub name: String,
    pub fields: Vec<Field>,
    pub options: Vec<ProtoOption>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeEnd {
    Value(i64),
    Max,
}

/// `start`, `start to end` or `start to max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldRange {
    pub start: i64,
    pub end: Option<RangeEnd>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Reserved {
    pub ranges: Vec<FieldRange>,
    pub names: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Extensions {
    pub ranges: Vec<FieldRange>,
    pub options: Vec<ProtoOption>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Enum {
    pub name: String,
    pub elements: Vec<EnumElement>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EnumElement {
    Value(EnumValue),
    Option(ProtoOption),
    Reserved(Reserved),
}

impl Enum {
    pub fn values(&self) -> impl Iterator<Item = &EnumValue> {
        self.elements.iter().filter_map(|e| match e {
            EnumElement::Value(v) => Some(v),
            _ => None,
        })
    }

    pub fn options(&self) -> impl Iterator<Item = &ProtoOption> {
        self.elements.iter().filter_map(|e| match e {
            EnumElement::Option(o) => Some(o),
            _ => None,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnumValue {
    pub name: String,
    pub number: i64,
    pub options: Vec<ProtoOption>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Service {
    pub name: String,
    pub elements: Vec<ServiceElement>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ServiceElement {
    Rpc(Rpc),
    Option(ProtoOption),
}

impl Service {
    pub fn rpcs(&self) -> impl Iterator<Item = &Rpc> {
        self.elements.iter().filter_map(|e| match e {
            ServiceElement::Rpc(r) => Some(r),
            _ => None,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RpcType {
    pub name: String,
    pub stream: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Rpc {
    pub name: String,
    pub request: RpcType,
    pub response: RpcType,
    pub options: Vec<ProtoOption>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Extend {
    pub target: String,
    pub fields: Vec<Field>,
}
