//! Renders rule descriptions as JSON or as BUILD file blocks.

use protorule_core::error::Result;
use protorule_core::rule::{ProtoCompileRule, RuleDescription};
use std::collections::BTreeMap;

const INDENT: &str = "    ";

pub fn render_json(rules: &[ProtoCompileRule]) -> Result<String> {
    let descriptions: Vec<RuleDescription> = rules.iter().map(ProtoCompileRule::rule).collect();
    Ok(serde_json::to_string_pretty(&descriptions)? + "\n")
}

/// One load statement followed by one block per rule. Empty when there
/// are no rules.
pub fn render_build(rules: &[ProtoCompileRule]) -> Result<String> {
    let Some(first) = rules.first() else {
        return Ok(String::new());
    };

    let load = first.load_info();
    let mut out = format!("load({}", quote(load.name)?);
    for symbol in &load.symbols {
        out.push_str(", ");
        out.push_str(&quote(symbol)?);
    }
    out.push_str(")\n");

    for rule in rules {
        out.push('\n');
        render_rule(&mut out, &rule.rule())?;
    }
    Ok(out)
}

fn render_rule(out: &mut String, rule: &RuleDescription) -> Result<()> {
    for line in rule.comment.iter().flatten() {
        out.push_str(&format!("# {}\n", line));
    }

    out.push_str(&format!("{}(\n", rule.kind));
    attr(out, "name", &quote(&rule.name)?);
    if let Some(visibility) = &rule.attrs.visibility {
        attr(out, "visibility", &list(visibility)?);
    }
    attr(out, "proto", &quote(&rule.attrs.proto)?);
    attr(out, "plugins", &list(&rule.attrs.plugins)?);
    attr(out, "generated_srcs", &list(&rule.attrs.generated_srcs)?);
    if let Some(options) = &rule.attrs.options {
        attr(out, "options", &dict(options)?);
    }
    attr(out, "deps", &list(&rule.deps)?);
    out.push_str(")\n");
    Ok(())
}

fn attr(out: &mut String, name: &str, value: &str) {
    out.push_str(&format!("{INDENT}{name} = {value},\n"));
}

fn quote(value: &str) -> Result<String> {
    Ok(serde_json::to_string(value)?)
}

/// Single-element lists stay on one line; longer lists get one element
/// per line.
fn list(values: &[String]) -> Result<String> {
    match values {
        [] => Ok("[]".to_string()),
        [single] => Ok(format!("[{}]", quote(single)?)),
        _ => {
            let mut out = String::from("[\n");
            for value in values {
                out.push_str(&format!("{INDENT}{INDENT}{},\n", quote(value)?));
            }
            out.push_str(INDENT);
            out.push(']');
            Ok(out)
        }
    }
}

fn dict(entries: &BTreeMap<String, String>) -> Result<String> {
    let mut out = String::from("{\n");
    for (key, value) in entries {
        out.push_str(&format!("{INDENT}{INDENT}{}: {},\n", quote(key)?, quote(value)?));
    }
    out.push_str(INDENT);
    out.push('}');
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use protorule_core::{Label, ProtoFile};
    use std::collections::HashMap;

    fn rule(source_name: &str, options: &[(&str, &[&str])]) -> ProtoCompileRule {
        let generated_options = options
            .iter()
            .map(|(k, v)| (k.to_string(), v.iter().map(|s| s.to_string()).collect()))
            .collect::<HashMap<_, _>>();
        ProtoCompileRule::new(
            "go",
            &ProtoFile::new("pkg", format!("{source_name}.proto")),
            vec![Label::new("rules", "plugins", "go")],
            vec![
                format!("{source_name}.pb.go"),
                format!("{source_name}_grpc.pb.go"),
            ],
            generated_options,
        )
    }

    #[test]
    fn test_render_build_blocks() {
        let rules = vec![
            rule("foo", &[("go", &["plugins=grpc", "paths=source_relative"])])
                .with_comment(vec!["generated".to_string()]),
            rule("bar", &[]).with_visibility(vec!["//visibility:public".to_string()]),
        ];

        let expected = r#"load("@build_stack_rules_proto//rules:proto_compile.bzl", "proto_compile")

# generated
proto_compile(
    name = "foo_go_compile",
    proto = "foo_proto",
    plugins = ["@rules//plugins:go"],
    generated_srcs = [
        "foo.pb.go",
        "foo_grpc.pb.go",
    ],
    options = {
        "go": "paths=source_relative,plugins=grpc",
    },
    deps = [":foo_proto"],
)

proto_compile(
    name = "bar_go_compile",
    visibility = ["//visibility:public"],
    proto = "bar_proto",
    plugins = ["@rules//plugins:go"],
    generated_srcs = [
        "bar.pb.go",
        "bar_grpc.pb.go",
    ],
    deps = [":bar_proto"],
)
"#;
        assert_eq!(render_build(&rules).unwrap(), expected);
    }

    #[test]
    fn test_render_build_empty() {
        assert_eq!(render_build(&[]).unwrap(), "");
    }

    #[test]
    fn test_render_json_is_array_of_descriptions() {
        let json = render_json(&[rule("foo", &[])]).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value[0]["name"], "foo_go_compile");
        assert_eq!(value[0]["deps"][0], ":foo_proto");
        assert!(value[0]["attrs"].get("options").is_none());
    }
}
