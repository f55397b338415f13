use std::collections::BTreeMap;

use crate::error::IntakeError;

pub const GENDER: &str = "gender";
pub const IS_PHARMACY_SET: &str = "is_pharmacy_set";
pub const AGE_IN_YEARS: &str = "age_in_years";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserFieldValue {
    Text(String),
    Bool(bool),
    Integer(i64),
}

/// External key/value state that conditions and requirements may read.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserFields {
    values: BTreeMap<String, UserFieldValue>,
}

impl UserFields {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates and stores `value` under `key`; `None` removes the field.
    pub fn set(&mut self, key: &str, value: Option<&str>) -> Result<(), IntakeError> {
        let invalid = |reason: &str| IntakeError::InvalidUserField {
            key: key.to_string(),
            reason: reason.to_string(),
        };
        let Some(raw) = value else {
            if !matches!(key, GENDER | IS_PHARMACY_SET | AGE_IN_YEARS) {
                return Err(invalid("unsupported key"));
            }
            self.values.remove(key);
            return Ok(());
        };
        let parsed = match key {
            GENDER => {
                let normalized = raw.trim().to_lowercase();
                if !matches!(normalized.as_str(), "male" | "female" | "other") {
                    return Err(invalid("expected one of male, female, other"));
                }
                UserFieldValue::Text(normalized)
            }
            IS_PHARMACY_SET => match raw.trim() {
                "true" => UserFieldValue::Bool(true),
                "false" => UserFieldValue::Bool(false),
                _ => return Err(invalid("expected true or false")),
            },
            AGE_IN_YEARS => UserFieldValue::Integer(
                raw.trim()
                    .parse::<i64>()
                    .map_err(|_| invalid("expected an integer"))?,
            ),
            _ => return Err(invalid("unsupported key")),
        };
        self.values.insert(key.to_string(), parsed);
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<&UserFieldValue> {
        self.values.get(key)
    }

    pub fn text(&self, key: &str) -> Option<&str> {
        match self.values.get(key)? {
            UserFieldValue::Text(value) => Some(value),
            _ => None,
        }
    }

    pub fn boolean(&self, key: &str) -> Option<bool> {
        match self.values.get(key)? {
            UserFieldValue::Bool(value) => Some(*value),
            _ => None,
        }
    }

    pub fn integer(&self, key: &str) -> Option<i64> {
        match self.values.get(key)? {
            UserFieldValue::Integer(value) => Some(*value),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_only_known_keys() {
        let mut fields = UserFields::new();
        fields.set(GENDER, Some("Female")).expect("gender");
        fields.set(IS_PHARMACY_SET, Some("true")).expect("pharmacy");
        fields.set(AGE_IN_YEARS, Some("42")).expect("age");
        assert_eq!(fields.text(GENDER), Some("female"));
        assert_eq!(fields.boolean(IS_PHARMACY_SET), Some(true));
        assert_eq!(fields.integer(AGE_IN_YEARS), Some(42));

        assert!(fields.set("favorite_color", Some("blue")).is_err());
        assert!(fields.set(GENDER, Some("unknown")).is_err());
        assert!(fields.set(IS_PHARMACY_SET, Some("yes")).is_err());
        assert!(fields.set(AGE_IN_YEARS, Some("4.5")).is_err());
    }

    #[test]
    fn missing_value_unsets_field() {
        let mut fields = UserFields::new();
        fields.set(AGE_IN_YEARS, Some("30")).expect("age");
        fields.set(AGE_IN_YEARS, None).expect("unset");
        assert_eq!(fields.integer(AGE_IN_YEARS), None);
    }
}
