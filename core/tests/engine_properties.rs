use argschema_core::*;

fn toks(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn calculator() -> Registry {
    Registry::from_declarations(vec![
        Declaration::subcommand("Add").field_with(
            "numbers",
            TypeDescriptor::list(TypeDescriptor::Float),
            ArgumentMeta::new()
                .flag("--numbers")
                .arity(Arity::OneOrMore)
                .help("Numbers to add"),
        ),
        Declaration::subcommand("Remove").field("index", TypeDescriptor::Int),
        Declaration::app("calc")
            .field_with(
                "verbose",
                TypeDescriptor::Bool,
                ArgumentMeta::new().flag("-v").flag("--verbose"),
            )
            .subcommand_field("add", "Add")
            .subcommand_field("remove", "Remove"),
    ])
    .unwrap()
}

/// Three nested levels: `git remote add <name> <url>`.
fn git() -> Registry {
    Registry::from_declarations(vec![
        Declaration::subcommand("Common").field_with(
            "quiet",
            TypeDescriptor::Bool,
            ArgumentMeta::new().flag("-q"),
        ),
        Declaration::subcommand("RemoteAdd")
            .extends("Common")
            .field("name", TypeDescriptor::Str)
            .field("url", TypeDescriptor::Str),
        Declaration::subcommand("RemoteRemove").field("name", TypeDescriptor::Str),
        Declaration::subcommand("Remote")
            .subcommand_field("add", "RemoteAdd")
            .subcommand_field("remove", "RemoteRemove"),
        Declaration::subcommand("Status").extends("Common"),
        Declaration::app("git")
            .subcommand_field("remote", "Remote")
            .subcommand_field("status", "Status"),
    ])
    .unwrap()
}

// ---------------------------------------------------------------------------
// Determinism
// ---------------------------------------------------------------------------

#[test]
fn compiling_twice_yields_identical_schemas() {
    let first = calculator().compile("calc").unwrap();
    let second = calculator().compile("calc").unwrap();
    assert_eq!(*first, *second);
}

#[test]
fn materializing_twice_yields_equal_instances() {
    let schema = calculator().compile("calc").unwrap();
    let raw = RawParseResult::new().with_subcommand(
        "add",
        RawParseResult::new().with_tokens("numbers", ["1", "2"]),
    );
    assert_eq!(
        materialize(&schema, &raw).unwrap(),
        materialize(&schema, &raw).unwrap()
    );
}

// ---------------------------------------------------------------------------
// Override precedence
// ---------------------------------------------------------------------------

#[test]
fn descendant_field_replaces_ancestor_field() {
    let registry = Registry::from_declarations(vec![
        Declaration::app("A").field("x", TypeDescriptor::Int),
        Declaration::app("B").extends("A").field("x", TypeDescriptor::Str),
    ])
    .unwrap();

    let schema = registry.compile("B").unwrap();
    let xs: Vec<_> = schema.fields.iter().filter(|f| f.name == "x").collect();
    assert_eq!(xs.len(), 1);
    assert_eq!(xs[0].coercion, TypeDescriptor::Str);

    let instance = materialize(&schema, &RawParseResult::new().with_token("x", "007")).unwrap();
    assert_eq!(instance.get("x"), Some(&Value::Str("007".into())));
}

// ---------------------------------------------------------------------------
// Type resolution
// ---------------------------------------------------------------------------

#[test]
fn union_takes_first_matching_member() {
    let ty = TypeDescriptor::union([TypeDescriptor::Int, TypeDescriptor::Str]);
    assert_eq!(resolve(&ty, &toks(&["42"])).unwrap(), Value::Int(42));
    assert_eq!(resolve(&ty, &toks(&["hi"])).unwrap(), Value::Str("hi".into()));
}

#[test]
fn list_resolves_in_order_and_accepts_empty() {
    let ty = TypeDescriptor::list(TypeDescriptor::Int);
    assert_eq!(
        resolve(&ty, &toks(&["1", "2", "3"])).unwrap(),
        Value::List(vec![Value::Int(1), Value::Int(2), Value::Int(3)])
    );
    assert_eq!(resolve(&ty, &[]).unwrap(), Value::List(vec![]));

    let spec = build_field("n", &ty, &ArgumentMeta::new().flag("--n")).unwrap();
    assert_eq!(spec.arity, Arity::ZeroOrMore);
}

#[test]
fn plain_str_field_is_required_positional() {
    let registry =
        Registry::from_declarations(vec![Declaration::app("cat").field("input", TypeDescriptor::Str)])
            .unwrap();
    let schema = registry.compile("cat").unwrap();
    let input = schema.field("input").unwrap();
    assert_eq!(input.kind, FieldKind::Positional);
    assert!(input.required);

    let instance =
        materialize(&schema, &RawParseResult::new().with_token("input", "hello")).unwrap();
    assert_eq!(instance.get_as::<String>("input").unwrap(), "hello");
}

// ---------------------------------------------------------------------------
// Subcommand exclusivity
// ---------------------------------------------------------------------------

#[test]
fn selected_subcommand_is_instance_and_sibling_is_absent() {
    let schema = calculator().compile("calc").unwrap();
    let raw = RawParseResult::new().with_subcommand(
        "add",
        RawParseResult::new().with_tokens("numbers", ["1", "2", "3"]),
    );
    let instance = materialize(&schema, &raw).unwrap();

    let (name, add) = instance.selected().unwrap();
    assert_eq!(name, "add");
    assert_eq!(
        add.get_as::<Vec<f64>>("numbers").unwrap(),
        vec![1.0, 2.0, 3.0]
    );
    assert_eq!(instance.get("remove"), Some(&Value::None));
    assert_eq!(instance.get("verbose"), Some(&Value::Bool(false)));
}

#[test]
fn absence_propagates_through_three_levels() {
    let schema = git().compile("git").unwrap();
    let raw = RawParseResult::new().with_subcommand(
        "remote",
        RawParseResult::new().with_subcommand(
            "add",
            RawParseResult::new()
                .with_flag("quiet")
                .with_token("name", "origin")
                .with_token("url", "https://example.com/repo.git"),
        ),
    );
    let instance = materialize(&schema, &raw).unwrap();

    assert_eq!(instance.get("status"), Some(&Value::None));
    let remote = instance.subcommand("remote").unwrap();
    assert_eq!(remote.get("remove"), Some(&Value::None));
    let add = remote.subcommand("add").unwrap();
    assert_eq!(add.get_as::<bool>("quiet").unwrap(), true);
    assert_eq!(add.get_as::<String>("name").unwrap(), "origin");

    let json = instance.to_json();
    assert_eq!(json["remote"]["add"]["url"], "https://example.com/repo.git");
    assert!(json["remote"]["remove"].is_null());
    assert!(json["status"].is_null());
}

#[test]
fn no_selection_leaves_every_level_absent() {
    let schema = git().compile("git").unwrap();
    let instance = materialize(&schema, &RawParseResult::new()).unwrap();
    assert!(instance.selected().is_none());
    assert_eq!(instance.get("remote"), Some(&Value::None));
    assert_eq!(instance.get("status"), Some(&Value::None));
}

// ---------------------------------------------------------------------------
// Fail-fast
// ---------------------------------------------------------------------------

#[test]
fn only_first_invalid_field_is_reported() {
    let registry = Registry::from_declarations(vec![
        Declaration::app("tool")
            .field("first", TypeDescriptor::Int)
            .field("second", TypeDescriptor::Int),
    ])
    .unwrap();
    let schema = registry.compile("tool").unwrap();

    let raw = RawParseResult::new()
        .with_token("first", "one")
        .with_token("second", "two");
    let err = materialize(&schema, &raw).unwrap_err();
    assert_eq!(err.field(), Some("first"));
    match err {
        MaterializationError::Coercion(err) => assert_eq!(err.tokens, vec!["one"]),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn missing_required_reports_field_name() {
    let schema = git().compile("git").unwrap();
    let raw = RawParseResult::new().with_subcommand(
        "remote",
        RawParseResult::new().with_subcommand(
            "add",
            RawParseResult::new().with_token("name", "origin"),
        ),
    );
    let err = materialize(&schema, &raw).unwrap_err();
    assert_eq!(
        err,
        MaterializationError::MissingRequired(MissingRequiredFieldError {
            path: vec!["remote".into(), "add".into()],
            field: "url".into(),
        })
    );
    assert_eq!(err.to_string(), "remote add: missing required field `url`");
}

// ---------------------------------------------------------------------------
// Cycle detection
// ---------------------------------------------------------------------------

#[test]
fn direct_self_nesting_rejected_at_compile_time() {
    let registry = Registry::from_declarations(vec![
        Declaration::subcommand("Loop").subcommand_field("again", "Loop"),
    ])
    .unwrap();
    assert_eq!(
        registry.compile("Loop").unwrap_err(),
        ConfigurationError::SubcommandCycle("Loop Loop".into())
    );
}

#[test]
fn transitive_nesting_through_inheritance_rejected() {
    let registry = Registry::from_declarations(vec![
        Declaration::subcommand("WithChild").subcommand_field("child", "Child"),
        Declaration::subcommand("Child").extends("WithChild"),
        Declaration::app("root").subcommand_field("child", "Child"),
    ])
    .unwrap();
    assert!(matches!(
        registry.compile("root").unwrap_err(),
        ConfigurationError::SubcommandCycle(_)
    ));
}

// ---------------------------------------------------------------------------
// Declaration files
// ---------------------------------------------------------------------------

#[test]
fn package_round_trips_through_json() {
    let mut package = DeclarationPackage::new("1.0.0", "2026-01-01T00:00:00Z");
    package.declarations = calculator().declarations().to_vec();

    let json = serde_json::to_string_pretty(&package).unwrap();
    let back: DeclarationPackage = serde_json::from_str(&json).unwrap();
    assert_eq!(back, package);
    assert!(validate_package(&back).is_empty());

    let registry = back.into_registry().unwrap();
    assert_eq!(*registry.compile("calc").unwrap(), *calculator().compile("calc").unwrap());
}

#[test]
fn declarations_load_from_plain_json() {
    let json = r#"{
        "version": "1.0.0",
        "generated_at": "2026-01-01T00:00:00Z",
        "declarations": [
            {
                "name": "serve",
                "prog": "serve",
                "description": "Serve a directory",
                "fields": [
                    { "name": "root", "annotation": "path" },
                    { "name": "port", "annotation": "int", "flags": ["-p", "--port"], "default": "8080" },
                    { "name": "bind", "annotation": "ip", "flags": ["--bind"], "default": "127.0.0.1" },
                    { "name": "mode", "annotation": "enum[Mode: dev, prod]", "flags": ["--mode"], "default": "dev" },
                    { "name": "limit", "annotation": "optional[int]", "flags": ["--limit"], "default": null }
                ]
            }
        ]
    }"#;
    let package: DeclarationPackage = serde_json::from_str(json).unwrap();
    let registry = package.into_registry().unwrap();
    let schema = registry.compile("serve").unwrap();

    let port = schema.field("port").unwrap();
    assert_eq!(port.default, Some(Value::Int(8080)));
    assert_eq!(schema.field("mode").unwrap().choices, vec!["dev", "prod"]);
    assert_eq!(schema.field("limit").unwrap().default, Some(Value::None));

    let instance = materialize(
        &schema,
        &RawParseResult::new().with_token("root", "/srv").with_token("port", "9000"),
    )
    .unwrap();
    assert_eq!(instance.get_as::<i64>("port").unwrap(), 9000);
    assert_eq!(instance.get("mode"), Some(&Value::Enum("dev".into())));
    assert_eq!(
        instance.get_as::<std::net::IpAddr>("bind").unwrap().to_string(),
        "127.0.0.1"
    );
}
