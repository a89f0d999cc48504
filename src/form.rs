use std::collections::BTreeMap;

/// Per-field validation messages, rendered next to their inputs.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FormErrors {
    fields: BTreeMap<&'static str, Vec<String>>,
}

impl FormErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &'static str, message: impl Into<String>) {
        self.fields.entry(field).or_default().push(message.into());
    }

    pub fn get(&self, field: &str) -> &[String] {
        self.fields.get(field).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn has(&self, field: &str) -> bool {
        !self.get(field).is_empty()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Ok when nothing was added.
    pub fn into_result<T>(self, value: T) -> Result<T, Self> {
        if self.is_empty() {
            Ok(value)
        } else {
            Err(self)
        }
    }
}

/// Trims a required text input, recording an error if nothing is left.
pub fn required_text(errors: &mut FormErrors, field: &'static str, value: &str) -> String {
    let clean = value.trim();
    if clean.is_empty() {
        errors.add(field, "This field is required.");
    }
    clean.to_owned()
}

/// Ensures a value fits a column.
pub fn max_chars(errors: &mut FormErrors, field: &'static str, value: &str, max: usize) {
    let count = value.chars().count();
    if count > max {
        errors.add(
            field,
            format!(
                "Ensure this value has at most {} characters (it has {}).",
                max, count
            ),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required_text() {
        let mut errors = FormErrors::new();
        assert_eq!(required_text(&mut errors, "text", "  hello "), "hello");
        assert!(errors.is_empty());

        assert_eq!(required_text(&mut errors, "text", " \n\t "), "");
        assert_eq!(errors.get("text"), ["This field is required.".to_owned()]);
        assert!(errors.has("text"));
        assert!(!errors.has("group"));
        assert!(errors.into_result(()).is_err());
    }

    #[test]
    fn test_max_chars_counts_characters() {
        let mut errors = FormErrors::new();
        max_chars(&mut errors, "name", "ёжик", 4);
        assert!(errors.is_empty());
        max_chars(&mut errors, "name", "ёжики", 4);
        assert!(errors.has("name"));
    }
}
