use once_cell::sync::Lazy;
use std::collections::{HashMap, HashSet};

use crate::locale;

static COMMON_PASSWORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    include_str!("common_passwords.txt")
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect()
});

/// Strength rules applied to a new password.
#[derive(Debug, Clone, PartialEq)]
pub struct PasswordPolicy {
    pub min_length: usize,
    /// Similarity ratio (0.0..=1.0) at or above which a password is rejected
    /// for resembling one of the user's attributes.
    pub max_similarity: f64,
}

impl Default for PasswordPolicy {
    fn default() -> Self {
        Self {
            min_length: 8,
            max_similarity: 0.7,
        }
    }
}

/// The user's own values a password must not resemble.
#[derive(Debug, Default, Clone, Copy)]
pub struct UserAttributes<'a> {
    pub username: &'a str,
    pub first_name: &'a str,
    pub last_name: &'a str,
    pub email: &'a str,
}

impl<'a> UserAttributes<'a> {
    fn labelled(&self) -> [(&'static str, &'a str); 4] {
        [
            ("password.attr_username", self.username),
            ("password.attr_first_name", self.first_name),
            ("password.attr_last_name", self.last_name),
            ("password.attr_email", self.email),
        ]
    }
}

impl PasswordPolicy {
    /// Runs every rule and returns all failures, empty when the password is
    /// acceptable.
    pub fn check(&self, password: &str, user: &UserAttributes<'_>) -> Vec<String> {
        let mut problems = Vec::new();

        let locale = locale::current();

        if let Some(label) = self.similar_attribute(password, user) {
            let attribute = t!(label, locale = locale);
            problems.push(t!("password.too_similar", locale = locale, attribute = attribute).into_owned());
        }
        if password.chars().count() < self.min_length {
            problems.push(t!("password.too_short", locale = locale, min = self.min_length).into_owned());
        }
        if is_common(password) {
            problems.push(t!("password.too_common", locale = locale).into_owned());
        }
        if !password.is_empty() && password.chars().all(|c| c.is_ascii_digit()) {
            problems.push(t!("password.entirely_numeric", locale = locale).into_owned());
        }

        problems
    }

    fn similar_attribute(&self, password: &str, user: &UserAttributes<'_>) -> Option<&'static str> {
        let password = password.to_lowercase();
        for (label, value) in user.labelled() {
            if value.is_empty() {
                continue;
            }
            let value = value.to_lowercase();
            let parts = value
                .split(|c: char| !(c.is_alphanumeric() || c == '_'))
                .filter(|part| !part.is_empty())
                .chain(std::iter::once(value.as_str()));
            for part in parts {
                if self.exceeds_length_ratio(&password, part) {
                    continue;
                }
                if quick_ratio(&password, part) >= self.max_similarity {
                    return Some(label);
                }
            }
        }
        None
    }

    /// A long password cannot be "similar" to a very short attribute part.
    fn exceeds_length_ratio(&self, password: &str, part: &str) -> bool {
        let password_len = password.chars().count();
        let part_len = part.chars().count();
        let bound = self.max_similarity / 2.0 * password_len as f64;
        password_len >= 10 * part_len && (part_len as f64) < bound
    }
}

fn is_common(password: &str) -> bool {
    COMMON_PASSWORDS.contains(password.trim().to_lowercase().as_str())
}

/// Upper bound on sequence similarity: `2 * shared / (len_a + len_b)`, where
/// `shared` counts characters common to both strings with multiplicity.
pub(crate) fn quick_ratio(a: &str, b: &str) -> f64 {
    let total = a.chars().count() + b.chars().count();
    if total == 0 {
        return 1.0;
    }

    let mut available: HashMap<char, usize> = HashMap::new();
    for c in b.chars() {
        *available.entry(c).or_default() += 1;
    }
    let mut shared = 0usize;
    for c in a.chars() {
        if let Some(count) = available.get_mut(&c) {
            if *count > 0 {
                *count -= 1;
                shared += 1;
            }
        }
    }

    2.0 * shared as f64 / total as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn joe() -> UserAttributes<'static> {
        UserAttributes {
            username: "joedoe",
            first_name: "Joe",
            last_name: "Doe",
            email: "joe.doe@example.com",
        }
    }

    #[test]
    fn accepts_strong_password() {
        let policy = PasswordPolicy::default();
        assert!(policy.check("Kx7!vRq2#mPw", &joe()).is_empty());
    }

    #[test]
    fn rejects_short_password() {
        let policy = PasswordPolicy::default();
        assert_eq!(policy.check("Kx7!vR", &joe()).len(), 1);
    }

    #[test]
    fn min_length_is_configurable() {
        let policy = PasswordPolicy {
            min_length: 14,
            ..PasswordPolicy::default()
        };
        assert_eq!(policy.check("Kx7!vRq2#mPw", &joe()).len(), 1);
    }

    #[test]
    fn rejects_numeric_password() {
        let policy = PasswordPolicy::default();
        let problems = policy.check("40981736251", &UserAttributes::default());
        assert_eq!(problems.len(), 1);
    }

    #[test]
    fn rejects_common_password_case_insensitively() {
        let policy = PasswordPolicy::default();
        assert!(is_common("PassWord"));
        assert!(is_common(" qwerty123 "));
        assert_eq!(policy.check("Password1", &UserAttributes::default()).len(), 1);
    }

    #[test]
    fn rejects_dictionary_words_with_digit_suffix() {
        let policy = PasswordPolicy::default();
        for password in ["football1", "sunshine1", "princess1", "welcome1", "iloveyou1"] {
            assert!(is_common(password), "{password} should be common");
            let problems = policy.check(password, &UserAttributes::default());
            assert_eq!(problems.len(), 1, "{password}: {problems:?}");
        }
    }

    #[test]
    fn common_and_numeric_are_both_reported() {
        let policy = PasswordPolicy::default();
        // too short, common, numeric
        assert_eq!(policy.check("123456", &UserAttributes::default()).len(), 3);
    }

    #[test]
    fn rejects_password_resembling_username_or_email_parts() {
        let policy = PasswordPolicy::default();
        assert_eq!(policy.check("joedoe12", &joe()).len(), 1);
        assert_eq!(policy.check("EXAMPLE!", &joe()).len(), 1);
    }

    #[test]
    fn long_password_is_not_compared_with_tiny_parts() {
        let policy = PasswordPolicy::default();
        assert!(policy.exceeds_length_ratio("abcdefghijklmnopqrstuvwxyz0123", "ab"));
        assert!(!policy.exceeds_length_ratio("joedoe12", "joedoe"));
    }

    #[test]
    fn quick_ratio_counts_shared_characters() {
        assert_eq!(quick_ratio("abcd", "abcd"), 1.0);
        assert_eq!(quick_ratio("abcd", "wxyz"), 0.0);
        assert_eq!(quick_ratio("aab", "abb"), 2.0 * 2.0 / 6.0);
        assert_eq!(quick_ratio("", ""), 1.0);
    }
}
