//! Format adapter and config tree behavior through the public API

use clustenv::config::{
    ConfigKind, ConfigNode, ConfigValue, EnvFormat, FormatAdapter, FormatError, Mapping, Scalar,
    TomlFormat, Value, WriteOptions, YamlFormat,
};

fn options() -> WriteOptions {
    WriteOptions::default()
}

#[test]
fn test_yaml_null_renders_as_empty_scalar() {
    let mapping = YamlFormat.parse("foo: null\nbar: 1\n").unwrap();
    assert_eq!(mapping.get("foo"), Some(&Value::Null));

    let rendered = YamlFormat.serialize(&mapping, &options()).unwrap();
    assert!(!rendered.contains("null"), "rendered: {}", rendered);
    assert!(rendered.lines().any(|line| line == "foo:"));

    let reparsed = YamlFormat.parse(&rendered).unwrap();
    assert_eq!(reparsed.get("foo"), Some(&Value::Null));
    assert_eq!(reparsed, mapping);
}

#[test]
fn test_yaml_preserves_insertion_order_and_block_style() {
    let text = "zeta: 1\nalpha:\n  inner: true\n  list:\n  - a\n  - b\nmid: text\n";
    let mapping = YamlFormat.parse(text).unwrap();

    let keys: Vec<&str> = mapping.keys().map(String::as_str).collect();
    assert_eq!(keys, vec!["zeta", "alpha", "mid"]);

    let rendered = YamlFormat.serialize(&mapping, &options()).unwrap();
    assert!(rendered.find("zeta").unwrap() < rendered.find("alpha").unwrap());
    assert!(rendered.find("alpha").unwrap() < rendered.find("mid").unwrap());
    assert!(!rendered.contains('{'));
    assert!(!rendered.contains('['));
}

#[test]
fn test_malformed_yaml_degrades_to_empty() {
    let mapping = YamlFormat.parse_or_empty("key: [unclosed\n", "inline");
    assert!(mapping.is_empty());
    assert!(YamlFormat.parse("key: [unclosed\n").is_err());
}

#[test]
fn test_toml_round_trip() {
    let text = r#"
title = "cluster"
port = 25577
ratio = 0.75
enabled = true
tags = ["a", "b"]

[general]
hostname = "env1.example.net"

[general.nested]
depth = 2
"#;
    let mapping = TomlFormat.parse(text).unwrap();
    let rendered = TomlFormat.serialize(&mapping, &options()).unwrap();

    assert_eq!(TomlFormat.parse(&rendered).unwrap(), mapping);
}

#[test]
fn test_env_round_trip_keeps_everything_after_first_equals() {
    let mut mapping = Mapping::new();
    mapping.insert("JAVA_OPTS".to_string(), Value::from("-Dfoo=bar -Xmx4G"));
    mapping.insert("EMPTY".to_string(), Value::from(""));
    mapping.insert("MC_TYPE".to_string(), Value::from("FABRIC"));

    for quote in [true, false] {
        let options = WriteOptions {
            quote_env_values: quote,
        };
        let rendered = EnvFormat.serialize(&mapping, &options).unwrap();
        assert_eq!(EnvFormat.parse(&rendered).unwrap(), mapping);
    }
}

#[test]
fn test_env_parse_skips_comments_and_blank_lines() {
    let mapping = EnvFormat
        .parse("# header\n\nMC_VERSION=\"1.20.1\"\nURL=http://x/?a=b\n")
        .unwrap();

    assert_eq!(mapping.len(), 2);
    assert_eq!(mapping.get("MC_VERSION"), Some(&Value::from("1.20.1")));
    assert_eq!(mapping.get("URL"), Some(&Value::from("http://x/?a=b")));
}

#[test]
fn test_node_classifies_every_entry() {
    let mapping = YamlFormat
        .parse("i: 3\nf: 1.5\ns: text\nb: false\nseq: [1, 2]\nnested:\n  k: v\nnothing: null\n")
        .unwrap();
    let node = ConfigNode::new(&mapping);

    assert_eq!(node.len(), 7);
    assert_eq!(node.get_opt("i"), Some(&ConfigValue::Scalar(Scalar::Integer(3))));
    assert_eq!(node.get_opt("f"), Some(&ConfigValue::Scalar(Scalar::Float(1.5))));
    assert_eq!(node.get_str("s"), Some("text"));
    assert_eq!(node.get_bool("b"), Some(false));
    assert_eq!(node.get_opt("seq").and_then(ConfigValue::as_sequence).map(<[Value]>::len), Some(2));
    assert_eq!(node.node("nested").get_str("k"), Some("v"));
    assert!(node.get_opt("nothing").unwrap().is_null());
    assert_eq!(node.as_mapping(), mapping);
}

#[test]
fn test_node_underscore_lookup_falls_back_to_hyphen() {
    let mapping = YamlFormat.parse("online-mode: false\n").unwrap();
    let node = ConfigNode::new(&mapping);

    assert_eq!(node.get_bool("online_mode"), Some(false));
    assert!(!node.contains("online_mode"));

    let fallback = ConfigValue::Scalar(Scalar::String("default".to_string()));
    assert_eq!(node.get("missing", &fallback), &fallback);
    assert!(node.node("missing").is_empty());
}

#[test]
fn test_kind_selects_adapter() {
    for kind in [ConfigKind::Yaml, ConfigKind::Toml, ConfigKind::Env] {
        assert_eq!(kind.adapter().kind(), kind);
    }
}

#[test]
fn test_env_refuses_values_with_line_breaks() {
    let mut mapping = Mapping::new();
    mapping.insert("MOTD".to_string(), Value::from("line1\nline2"));

    for quote in [true, false] {
        let options = WriteOptions {
            quote_env_values: quote,
        };
        let err = EnvFormat.serialize(&mapping, &options).unwrap_err();
        assert!(matches!(err, FormatError::Unrepresentable { ref key, .. } if key == "MOTD"));
    }

    let mut carriage = Mapping::new();
    carriage.insert("MOTD".to_string(), Value::from("a\rb"));
    assert!(EnvFormat.serialize(&carriage, &options()).is_err());
}

#[test]
fn test_toml_writes_multiline_strings_unescaped() {
    let mut mapping = Mapping::new();
    mapping.insert("motd".to_string(), Value::from("a\nb"));

    let rendered = TomlFormat.serialize(&mapping, &options()).unwrap();

    assert!(rendered.contains("\"\"\""), "rendered: {}", rendered);
    assert_eq!(TomlFormat.parse(&rendered).unwrap(), mapping);
}
