//! Collects options attached to enums and enum values.
//!
//! The file-level walk only sees top-level `option` statements. Enum-scoped
//! options live inside enum bodies and inside the bracketed option lists of
//! enum values, so they need their own descent.

use crate::proto_parser::{Enum, EnumElement, EnumValue, ProtoOption};

#[derive(Debug, Default)]
pub struct EnumOptionCollector {
    options: Vec<ProtoOption>,
}

impl EnumOptionCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Visits the enum's own options and every value's options, in
    /// textual order.
    pub fn visit_enum(&mut self, enum_def: &Enum) {
        for element in &enum_def.elements {
            match element {
                EnumElement::Option(option) => self.visit_option(option),
                EnumElement::Value(value) => self.visit_enum_value(value),
                EnumElement::Reserved(_) => {}
            }
        }
    }

    fn visit_enum_value(&mut self, value: &EnumValue) {
        for option in &value.options {
            self.visit_option(option);
        }
    }

    fn visit_option(&mut self, option: &ProtoOption) {
        self.options.push(option.clone());
    }

    pub fn into_options(self) -> Vec<ProtoOption> {
        self.options
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proto_parser::{Element, parse};

    fn enums(source: &str) -> Vec<Enum> {
        parse(source)
            .unwrap()
            .elements
            .into_iter()
            .filter_map(|e| match e {
                Element::Enum(e) => Some(e),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_collects_enum_and_value_options_in_order() {
        let source = r#"
            enum A {
                A_ZERO = 0 [(ext.label) = "zero"];
                option (ext.enum_level) = true;
                A_ONE = 1 [(ext.label) = "one", deprecated = true];
            }
            enum B {
                B_ZERO = 0;
            }
        "#;

        let mut collector = EnumOptionCollector::new();
        for e in &enums(source) {
            collector.visit_enum(e);
        }

        let names: Vec<_> = collector
            .into_options()
            .into_iter()
            .map(|o| o.name)
            .collect();
        assert_eq!(
            names,
            vec!["(ext.label)", "(ext.enum_level)", "(ext.label)", "deprecated"]
        );
    }

    #[test]
    fn test_enum_without_options_collects_nothing() {
        let mut collector = EnumOptionCollector::new();
        for e in &enums("enum E { E_ZERO = 0; reserved 5; }") {
            collector.visit_enum(e);
        }
        assert!(collector.into_options().is_empty());
    }
}
