//! Effective value lookup.

use crate::value::{BlockSettings, FieldValue};

/// Returns a field's stored value, if the settings exist and hold it.
pub fn lookup<'a>(settings: Option<&'a BlockSettings>, field: &str) -> Option<&'a FieldValue> {
    settings.and_then(|s| s.get(field))
}

/// Returns the effective value of a field.
///
/// A stored value always wins, even `0`, `false` or `""`. Only a missing
/// field (or missing settings) falls back.
pub fn resolve(settings: Option<&BlockSettings>, field: &str, fallback: FieldValue) -> FieldValue {
    lookup(settings, field).cloned().unwrap_or(fallback)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn settings(pairs: &[(&str, FieldValue)]) -> BlockSettings {
        pairs.iter().map(|(k, v)| (*k, v.clone())).collect()
    }

    #[test]
    fn test_missing_settings_fall_back() {
        assert_eq!(resolve(None, "level", FieldValue::from(2)), FieldValue::from(2));
    }

    #[test]
    fn test_falsy_values_override() {
        let s = settings(&[
            ("markBorderWidth", FieldValue::from(0)),
            ("googleFont", FieldValue::from(false)),
            ("align", FieldValue::from("")),
        ]);

        assert_eq!(resolve(Some(&s), "markBorderWidth", 3.into()), FieldValue::from(0));
        assert_eq!(resolve(Some(&s), "googleFont", true.into()), FieldValue::from(false));
        assert_eq!(resolve(Some(&s), "align", "left".into()), FieldValue::from(""));
    }

    fn field_value() -> impl Strategy<Value = FieldValue> {
        prop_oneof![
            any::<bool>().prop_map(FieldValue::from),
            any::<i64>().prop_map(FieldValue::from),
            "[a-z#0-9]{0,8}".prop_map(FieldValue::from),
            prop::collection::vec(any::<i32>(), 0..5).prop_map(FieldValue::numbers),
        ]
    }

    proptest! {
        #[test]
        fn prop_absent_field_returns_fallback(
            stored in prop::collection::btree_map("[a-m]{1,6}", field_value(), 0..6),
            field in "[n-z]{1,6}",
            fallback in field_value(),
        ) {
            let s: BlockSettings = stored.into_iter().collect();
            prop_assert_eq!(resolve(Some(&s), &field, fallback.clone()), fallback);
        }

        #[test]
        fn prop_present_field_wins(
            stored in prop::collection::btree_map("[a-z]{1,6}", field_value(), 1..6),
            fallback in field_value(),
        ) {
            let s: BlockSettings = stored.clone().into_iter().collect();
            for (field, value) in stored {
                prop_assert_eq!(resolve(Some(&s), &field, fallback.clone()), value);
            }
        }
    }
}
