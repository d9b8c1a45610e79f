#![no_main]

use libfuzzer_sys::fuzz_target;
use settings_guard::PathResolver;
use settings_guard::error::PathError;

const BASE: &str = "/srv/settings-guard/project/rules.json";

fuzz_target!(|data: &[u8]| {
    let Ok(reference) = std::str::from_utf8(data) else {
        return;
    };

    let resolver = PathResolver::default();
    match resolver.resolve_path(reference, BASE) {
        // Anything that resolves must stay under the base directory
        Ok(resolved) => assert!(
            reference.is_empty() || resolved.starts_with("/srv/settings-guard/project"),
            "{reference:?} escaped to {}",
            resolved.display()
        ),
        Err(PathError::InvalidArgument(_)) => panic!("base path is never empty"),
        Err(_) => {}
    }
});
