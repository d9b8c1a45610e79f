#![no_main]

use libfuzzer_sys::fuzz_target;
use serde_json::Value;
use settings_guard::ValidatorCatalog;
use settings_guard::config::schema::ValidatorCondition;
use settings_guard::validators::BUILTIN_IDS;

fuzz_target!(|data: &[u8]| {
    // Layout: [validator index][declared JSON] \0 [actual JSON]
    let Some((&selector, rest)) = data.split_first() else {
        return;
    };
    let mut parts = rest.splitn(2, |b| *b == 0);
    let declared = parts.next().and_then(|b| serde_json::from_slice::<Value>(b).ok());
    let actual = parts.next().and_then(|b| serde_json::from_slice::<Value>(b).ok());

    let id = BUILTIN_IDS[usize::from(selector) % BUILTIN_IDS.len()];
    let catalog = ValidatorCatalog::builtin();
    let Ok(validator) = catalog.get_validator(id) else {
        return;
    };

    // Validators never panic, whatever the rule declares
    let condition = ValidatorCondition::new(id, declared, "fuzz");
    let result = validator.validate("Fuzz:Key", actual.as_ref(), &condition);
    assert_eq!(result.validator_type, id);
});
