//! Structural model of a single `.proto` file.
//!
//! A [`ProtoFile`] is built by one parse pass and is read-only afterwards.
//! Re-parsing a file produces a new value.

mod loader;
mod option_collector;

pub use loader::{DEFAULT_WORKSPACE_ENV, ProtoParser, workspace_root};
pub use option_collector::EnumOptionCollector;

use crate::error::{ProtoruleError, Result};
use crate::proto_parser::{
    Element, Enum, Import, Message, MessageElement, Package, ProtoDefinition, ProtoOption,
    Service, parse,
};

/// Returns true if the filename has the `.proto` extension.
pub fn is_proto_file(filename: &str) -> bool {
    std::path::Path::new(filename)
        .extension()
        .is_some_and(|ext| ext == "proto")
}

/// Base filename without its extension (`foo.proto` -> `foo`).
pub fn logical_name(basename: &str) -> &str {
    match basename.rfind('.') {
        Some(dot) => &basename[..dot],
        None => basename,
    }
}

/// The `go_package` option split into import path and package alias.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoPackage {
    pub importpath: String,
    pub alias: Option<String>,
}

/// A proto file discovered in a package directory.
#[derive(Debug, Clone, PartialEq)]
pub struct ProtoFile {
    dir: String,
    basename: String,
    name: String,

    syntax: Option<String>,
    proto_package: Option<Package>,
    imports: Vec<Import>,
    services: Vec<Service>,
    messages: Vec<Message>,
    options: Vec<ProtoOption>,
    enums: Vec<Enum>,
    enum_options: Vec<ProtoOption>,
}

impl ProtoFile {
    /// An empty model for `dir/basename` (e.g. `"rosetta/common"`,
    /// `"foo.proto"`).
    pub fn new(dir: impl Into<String>, basename: impl Into<String>) -> Self {
        let basename = basename.into();
        Self {
            dir: dir.into(),
            name: logical_name(&basename).to_string(),
            basename,
            syntax: None,
            proto_package: None,
            imports: Vec::new(),
            services: Vec::new(),
            messages: Vec::new(),
            options: Vec::new(),
            enums: Vec::new(),
            enum_options: Vec::new(),
        }
    }

    /// Parses in-memory source text as the file `dir/basename`.
    pub fn parse_str(
        dir: impl Into<String>,
        basename: impl Into<String>,
        source: &str,
    ) -> Result<Self> {
        let file = Self::new(dir, basename);
        let definition =
            parse(source).map_err(|e| ProtoruleError::syntax(file.relname(), e))?;
        Ok(file.populate(definition))
    }

    fn populate(mut self, definition: ProtoDefinition) -> Self {
        self.walk(definition.elements);

        // self.options only holds top-level options; enum and enum value
        // options need a second pass.
        let mut collector = EnumOptionCollector::new();
        for enum_def in &self.enums {
            collector.visit_enum(enum_def);
        }
        self.enum_options = collector.into_options();

        self
    }

    fn walk(&mut self, elements: Vec<Element>) {
        for element in elements {
            match element {
                Element::Syntax(syntax) | Element::Edition(syntax) => self.syntax = Some(syntax),
                Element::Package(package) => self.proto_package = Some(package),
                Element::Option(option) => self.options.push(option),
                Element::Import(import) => self.imports.push(import),
                Element::Enum(enum_def) => self.enums.push(enum_def),
                Element::Service(service) => self.services.push(service),
                Element::Message(message) => self.handle_message(message),
                Element::Extend(_) => {}
            }
        }
    }

    /// Records the message, then its nested messages and enums depth-first.
    fn handle_message(&mut self, message: Message) {
        let at = self.messages.len();
        self.handle_nested(&message.elements);
        self.messages.insert(at, message);
    }

    fn handle_nested(&mut self, elements: &[MessageElement]) {
        for element in elements {
            match element {
                MessageElement::Message(nested) => {
                    let at = self.messages.len();
                    self.handle_nested(&nested.elements);
                    self.messages.insert(at, nested.clone());
                }
                MessageElement::Enum(nested) => self.enums.push(nested.clone()),
                _ => {}
            }
        }
    }

    pub fn dir(&self) -> &str {
        &self.dir
    }

    pub fn basename(&self) -> &str {
        &self.basename
    }

    /// Logical name: the basename without extension.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Relative path of the proto file.
    pub fn relname(&self) -> String {
        if self.dir.is_empty() {
            self.basename.clone()
        } else {
            format!("{}/{}", self.dir.trim_end_matches('/'), self.basename)
        }
    }

    /// The `syntax` or `edition` value, if declared.
    pub fn syntax(&self) -> Option<&str> {
        self.syntax.as_deref()
    }

    pub fn package(&self) -> Option<&Package> {
        self.proto_package.as_ref()
    }

    pub fn package_name(&self) -> Option<&str> {
        self.proto_package.as_ref().map(|p| p.name.as_str())
    }

    pub fn imports(&self) -> &[Import] {
        &self.imports
    }

    /// Top-level options defined in the file.
    pub fn options(&self) -> &[ProtoOption] {
        &self.options
    }

    /// Options found on enums and enum values.
    pub fn enum_options(&self) -> &[ProtoOption] {
        &self.enum_options
    }

    pub fn enums(&self) -> &[Enum] {
        &self.enums
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn services(&self) -> &[Service] {
        &self.services
    }

    pub fn has_enums(&self) -> bool {
        !self.enums.is_empty()
    }

    pub fn has_messages(&self) -> bool {
        !self.messages.is_empty()
    }

    pub fn has_services(&self) -> bool {
        !self.services.is_empty()
    }

    /// Returns true if at least one enum or enum value is annotated with
    /// the named option.
    pub fn has_enum_option(&self, name: &str) -> bool {
        self.enum_options.iter().any(|option| option.name == name)
    }

    /// Looks up the `go_package` option and splits it at the first `;`
    /// (`github.com/foo/bar/v1;bar` -> `github.com/foo/bar/v1`, `bar`).
    pub fn go_package(&self) -> Option<GoPackage> {
        let option = self.options.iter().find(|o| o.name == "go_package")?;
        let source = option.constant.source();
        let (importpath, alias) = match source.split_once(';') {
            Some((importpath, alias)) => (importpath.to_string(), Some(alias.to_string())),
            None => (source, None),
        };
        Some(GoPackage { importpath, alias })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_new_derives_identity() {
        let file = ProtoFile::new("rosetta/common", "foo.proto");
        assert_eq!(file.dir(), "rosetta/common");
        assert_eq!(file.basename(), "foo.proto");
        assert_eq!(file.name(), "foo");
        assert_eq!(file.relname(), "rosetta/common/foo.proto");
        assert_eq!(ProtoFile::new("", "foo.proto").relname(), "foo.proto");
    }

    #[test]
    fn test_logical_name_strips_last_extension_only() {
        assert_eq!(logical_name("foo.proto"), "foo");
        assert_eq!(logical_name("foo.v1.proto"), "foo.v1");
        assert_eq!(logical_name("BUILD"), "BUILD");
    }

    #[test]
    fn test_is_proto_file() {
        assert!(is_proto_file("foo.proto"));
        assert!(!is_proto_file("foo.proto.bak"));
        assert!(!is_proto_file("BUILD.bazel"));
    }

    #[test]
    fn test_package_only_file_has_no_declarations() {
        let file = ProtoFile::parse_str("pkg", "foo.proto", "package foo;").unwrap();
        assert_eq!(file.package_name(), Some("foo"));
        assert!(!file.has_enums());
        assert!(!file.has_messages());
        assert!(!file.has_services());
    }

    #[test]
    fn test_top_level_and_enum_options_stay_separate() {
        let source = r#"
            syntax = "proto3";
            option (label) = "file";
            enum Color {
                RED = 0 [(label) = "red"];
            }
        "#;

        let file = ProtoFile::parse_str("pkg", "color.proto", source).unwrap();
        assert_eq!(file.options().len(), 1);
        assert_eq!(file.options()[0].name, "(label)");
        assert_eq!(file.options()[0].constant.as_str(), Some("file"));
        assert_eq!(file.enum_options().len(), 1);
        assert_eq!(file.enum_options()[0].constant.as_str(), Some("red"));
        assert!(file.has_enum_option("(label)"));
        assert!(!file.has_enum_option("label"));
    }

    #[test]
    fn test_walk_preserves_textual_order_and_nesting() {
        let source = r#"
            syntax = "proto3";
            import "a.proto";
            message First {
                message Inner {}
                enum InnerKind { INNER_KIND_UNSPECIFIED = 0; }
            }
            enum Top { TOP_UNSPECIFIED = 0; }
            import "b.proto";
            service Api {}
        "#;

        let file = ProtoFile::parse_str("", "order.proto", source).unwrap();
        let messages: Vec<_> = file.messages().iter().map(|m| m.name.as_str()).collect();
        let enums: Vec<_> = file.enums().iter().map(|e| e.name.as_str()).collect();
        let imports: Vec<_> = file.imports().iter().map(|i| i.filename.as_str()).collect();

        assert_eq!(messages, vec!["First", "Inner"]);
        assert_eq!(enums, vec!["InnerKind", "Top"]);
        assert_eq!(imports, vec!["a.proto", "b.proto"]);
        assert_eq!(file.syntax(), Some("proto3"));
        assert!(file.has_services());
    }

    #[test]
    fn test_deep_nesting_keeps_parent_before_children() {
        let source = r#"
            message A {
                message B {
                    message C { enum CK { CK_UNSPECIFIED = 0; } }
                    enum BK { BK_UNSPECIFIED = 0; }
                }
                message D {}
            }
            message E {}
        "#;

        let file = ProtoFile::parse_str("", "deep.proto", source).unwrap();
        let messages: Vec<_> = file.messages().iter().map(|m| m.name.as_str()).collect();
        let enums: Vec<_> = file.enums().iter().map(|e| e.name.as_str()).collect();

        assert_eq!(messages, vec!["A", "B", "C", "D", "E"]);
        assert_eq!(enums, vec!["CK", "BK"]);
        assert_eq!(file.messages()[0].elements.len(), 2);
    }

    #[test]
    fn test_message_level_options_are_not_top_level() {
        let source = r#"
            message M {
                option deprecated = true;
            }
        "#;
        let file = ProtoFile::parse_str("", "m.proto", source).unwrap();
        assert!(file.options().is_empty());
        assert!(file.enum_options().is_empty());
    }

    #[test]
    fn test_last_package_wins() {
        let file =
            ProtoFile::parse_str("", "p.proto", "package first; package second;").unwrap();
        assert_eq!(file.package_name(), Some("second"));
    }

    #[test]
    fn test_go_package_option() {
        let with_alias = ProtoFile::parse_str(
            "",
            "a.proto",
            r#"option go_package = "github.com/foo/bar/v1;bar";"#,
        )
        .unwrap();
        assert_eq!(
            with_alias.go_package(),
            Some(GoPackage {
                importpath: "github.com/foo/bar/v1".to_string(),
                alias: Some("bar".to_string()),
            })
        );

        let without_alias = ProtoFile::parse_str(
            "",
            "b.proto",
            r#"option go_package = "github.com/foo/bar";"#,
        )
        .unwrap();
        assert_eq!(
            without_alias.go_package().map(|p| p.alias),
            Some(None)
        );

        let none = ProtoFile::parse_str("", "c.proto", "package c;").unwrap();
        assert_eq!(none.go_package(), None);
    }

    #[test]
    fn test_syntax_error_carries_file_identity() {
        let err = ProtoFile::parse_str("pkg", "bad.proto", "message {").unwrap_err();
        match err {
            ProtoruleError::Syntax { file, .. } => {
                assert_eq!(file, std::path::PathBuf::from("pkg/bad.proto"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
