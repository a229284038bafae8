use serde::{Deserialize, Deserializer};

/// Normalizes a name by stripping any surrounding whitespace and
/// composing it into Unicode Normalization Form C.
///
/// ```
/// use dojo::normalization::normalize_name;
/// assert_eq!(normalize_name(" Rickson "), "Rickson");
/// ```
pub fn normalize_name(name: impl AsRef<str>) -> String {
    use unicode_normalization::UnicodeNormalization;

    name.as_ref().trim().nfc().collect()
}

/// Normalizes an email address for lookups: trimmed and lowercased.
///
/// ```
/// use dojo::normalization::normalize_email;
/// assert_eq!(normalize_email(" Royce@Example.COM"), "royce@example.com");
/// ```
pub fn normalize_email(email: impl AsRef<str>) -> String {
    normalize_name(email).to_lowercase()
}

/// Deserializes a `String` after running it through `normalize_name`.
pub fn deserialize<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let s: String = Deserialize::deserialize(deserializer)?;
    Ok(normalize_name(s))
}

/// Deserializes a `String` after running it through `normalize_email`.
pub fn deserialize_email<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let s: String = Deserialize::deserialize(deserializer)?;
    Ok(normalize_email(s))
}

/// Deserializes a catalog key such as a membership type: normalized and
/// lowercased.
pub fn deserialize_lowercase<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let s: String = Deserialize::deserialize(deserializer)?;
    Ok(normalize_name(s).to_lowercase())
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use unicode_normalization::is_nfc;

    use super::{normalize_email, normalize_name};

    fn count_whitespace(s: impl AsRef<str>) -> usize {
        s.as_ref().chars().filter(|c| c.is_whitespace()).count()
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 2000, ..ProptestConfig::default()
        })]

        #[test]
        fn normalization_works(string in "(\\S.*\\S|\\S+)", space_before in "\\s*", space_after in "\\s*") {
            let normalized = normalize_name(format!("{}{}{}", space_before, string, space_after));

            prop_assert!(is_nfc(&normalized), "{:?} (normalized form of {:?}) is in NFC", normalized, string);

            prop_assert!(!normalized.starts_with(char::is_whitespace) && !normalized.ends_with(char::is_whitespace), "{:?} (normalized form of {:?}) has no leading or trailing whitespace", normalized, string);

            let trimmed = normalized.trim();

            prop_assert_eq!(count_whitespace(&normalized), count_whitespace(&trimmed), "{:?} (normalized form of {:?}) preserves inner whitespace", normalized, string);
        }

        #[test]
        fn emails_have_no_uppercase(local in "[A-Za-z0-9.]{1,16}", domain in "[A-Za-z]{1,12}\\.[A-Za-z]{2,3}") {
            let email = normalize_email(format!("  {}@{} ", local, domain));

            prop_assert_eq!(email.clone(), email.to_lowercase());
            prop_assert!(!email.starts_with(' ') && !email.ends_with(' '));
        }
    }
}
