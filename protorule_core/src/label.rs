//! Build target labels (`@repo//pkg:name`).

use crate::error::ProtoruleError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A reference to a build target.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Label {
    pub repo: String,
    pub pkg: String,
    pub name: String,
    /// `:name` form, resolved against the current package.
    pub relative: bool,
}

impl Label {
    pub fn new(repo: impl Into<String>, pkg: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            repo: repo.into(),
            pkg: pkg.into(),
            name: name.into(),
            relative: false,
        }
    }

    pub fn relative(name: impl Into<String>) -> Self {
        Self {
            repo: String::new(),
            pkg: String::new(),
            name: name.into(),
            relative: true,
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.relative {
            return write!(f, ":{}", self.name);
        }

        if !self.repo.is_empty() {
            write!(f, "@{}", self.repo)?;
        }

        let base = self.pkg.rsplit('/').next().unwrap_or_default();
        if base == self.name {
            write!(f, "//{}", self.pkg)
        } else {
            write!(f, "//{}:{}", self.pkg, self.name)
        }
    }
}

impl FromStr for Label {
    type Err = ProtoruleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |message: &str| ProtoruleError::invalid_label(s, message);

        if s.is_empty() {
            return Err(invalid("empty label"));
        }

        if let Some(name) = s.strip_prefix(':') {
            if name.is_empty() || name.contains(':') {
                return Err(invalid("invalid target name"));
            }
            return Ok(Label::relative(name));
        }

        let (repo, rest) = match s.strip_prefix('@') {
            Some(after_at) => match after_at.find("//") {
                Some(idx) => (&after_at[..idx], &after_at[idx..]),
                None => return Err(invalid("repository label without '//'")),
            },
            None => ("", s),
        };

        let Some(target) = rest.strip_prefix("//") else {
            // A bare name is a target in the current package.
            if rest.contains('/') || rest.contains(':') {
                return Err(invalid("label must start with '//' or ':'"));
            }
            return Ok(Label::relative(rest));
        };

        let (pkg, name) = match target.split_once(':') {
            Some((pkg, name)) => {
                if name.contains(':') {
                    return Err(invalid("more than one ':'"));
                }
                (pkg, name.to_string())
            }
            None => (target, target.rsplit('/').next().unwrap_or_default().to_string()),
        };

        if name.is_empty() {
            return Err(invalid("empty target name"));
        }

        Ok(Label::new(repo, pkg, name))
    }
}

impl TryFrom<String> for Label {
    type Error = ProtoruleError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Label> for String {
    fn from(label: Label) -> Self {
        label.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_display_full_label() {
        let label: Label = "@build_stack_rules_proto//plugin/golang/protobuf:protoc-gen-go"
            .parse()
            .unwrap();
        assert_eq!(label.repo, "build_stack_rules_proto");
        assert_eq!(label.pkg, "plugin/golang/protobuf");
        assert_eq!(label.name, "protoc-gen-go");
        assert_eq!(
            label.to_string(),
            "@build_stack_rules_proto//plugin/golang/protobuf:protoc-gen-go"
        );
    }

    #[test]
    fn test_display_shortens_when_name_matches_package() {
        assert_eq!(Label::new("", "foo/bar", "bar").to_string(), "//foo/bar");
        assert_eq!(
            "//foo/bar:bar".parse::<Label>().unwrap().to_string(),
            "//foo/bar"
        );
        assert_eq!("//foo/bar".parse::<Label>().unwrap().name, "bar");
    }

    #[test]
    fn test_root_package_label() {
        let label: Label = "//:gen".parse().unwrap();
        assert_eq!(label.pkg, "");
        assert_eq!(label.to_string(), "//:gen");
    }

    #[test]
    fn test_relative_labels() {
        assert_eq!(":foo_proto".parse::<Label>().unwrap(), Label::relative("foo_proto"));
        assert_eq!("foo_proto".parse::<Label>().unwrap().to_string(), ":foo_proto");
    }

    #[test]
    fn test_invalid_labels() {
        for input in ["", ":", "//pkg:", "//pkg:a:b", "@repo", "pkg/sub:x"] {
            assert!(input.parse::<Label>().is_err(), "{input} should not parse");
        }
    }

    #[test]
    fn test_serde_uses_string_form() {
        let label: Label = serde_json::from_str(r#""//pkg:tool""#).unwrap();
        assert_eq!(label, Label::new("", "pkg", "tool"));
        assert_eq!(serde_json::to_string(&label).unwrap(), r#""//pkg:tool""#);
    }
}
