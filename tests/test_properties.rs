use std::path::{Component, Path, PathBuf};

use proptest::prelude::*;
use proptest::test_runner::Config;
use serde_json::{Value, json};

use settings_guard::PathResolver;
use settings_guard::config::schema::ValidatorCondition;
use settings_guard::error::PathError;
use settings_guard::validators::{BUILTIN_IDS, ValidatorCatalog};

/// Depth of `segments` relative to the start, or `None` if it climbs above it.
fn relative_depth(segments: &[&str]) -> Option<usize> {
    let mut depth = 0_usize;
    for segment in segments {
        match *segment {
            ".." => depth = depth.checked_sub(1)?,
            "." => {}
            _ => depth += 1,
        }
    }
    Some(depth)
}

fn segment() -> impl Strategy<Value = &'static str> {
    prop_oneof![Just(".."), Just("."), Just("config"), Just("nested"), Just("app.json")]
}

fn scalar() -> impl Strategy<Value = Option<Value>> {
    prop_oneof![
        Just(None),
        Just(Some(Value::Null)),
        any::<bool>().prop_map(|b| Some(json!(b))),
        any::<i64>().prop_map(|n| Some(json!(n))),
        "[ -~]{0,12}".prop_map(|s| Some(json!(s))),
        prop::collection::vec("[a-z]{0,4}", 0..4).prop_map(|v| Some(json!(v))),
    ]
}

proptest! {
    #![proptest_config(Config::with_cases(64))]

    #[test]
    fn resolved_paths_stay_inside_base(segments in prop::collection::vec(segment(), 1..8)) {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().canonicalize().unwrap();
        let base_dir = root.join("project");
        std::fs::create_dir_all(base_dir.join("config")).unwrap();
        let base = base_dir.join("rules.json").display().to_string();

        let reference = segments.join("/");
        let resolver = PathResolver::default().with_case_insensitive(false);
        let outcome = resolver.resolve_path(&reference, &base);

        match relative_depth(&segments) {
            Some(_) => {
                let resolved = outcome.unwrap();
                prop_assert!(resolved.is_absolute());
                prop_assert!(resolved.starts_with(&base_dir));
                let dotted = resolved
                    .components()
                    .any(|c| matches!(c, Component::ParentDir | Component::CurDir));
                prop_assert!(!dotted);
                prop_assert_eq!(resolver.resolve_path(&reference, &base).unwrap(), resolved);
            }
            None => {
                let denied = matches!(outcome, Err(PathError::AccessDenied { .. }));
                prop_assert!(denied, "expected denial for {}", reference);
            }
        }
    }

    #[test]
    fn absolute_paths_outside_base_are_denied(name in "[a-z]{1,8}") {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().canonicalize().unwrap();
        std::fs::create_dir_all(root.join("project")).unwrap();
        let base = root.join("project/rules.json").display().to_string();
        let outside: PathBuf = Path::new(&root).join(format!("{name}.json"));

        let outcome = PathResolver::default().resolve_path(&outside.display().to_string(), &base);
        prop_assert!(matches!(outcome, Err(PathError::AccessDenied { .. })), "expected AccessDenied, got {:?}", outcome);
    }

    #[test]
    fn builtin_validators_are_total(
        index in 0..BUILTIN_IDS.len(),
        declared in scalar(),
        actual in scalar(),
    ) {
        let id = BUILTIN_IDS[index];
        let catalog = ValidatorCatalog::builtin();
        let condition = ValidatorCondition::new(id, declared, "failed");
        let result = catalog
            .get_validator(id)
            .unwrap()
            .validate("Some:Key", actual.as_ref(), &condition);

        prop_assert_eq!(result.validator_type.as_str(), id);
        prop_assert_eq!(result.key.as_str(), "Some:Key");
        prop_assert!(!result.is_valid || result.message.is_empty());
        prop_assert!(result.is_valid || !result.message.is_empty());
    }
}
