//! Classification of registration API rejections.

/// Decides whether a declined registration means "already registered".
///
/// The registration API reports an existing registration as a failure with a
/// free-text message. The product treats that as success so a volunteer who
/// registers twice still reaches the confirmation page. The rule is kept here,
/// behind one type, because it still needs sign-off from the campaign team.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateRegistrationPolicy {
    markers: Vec<String>,
}

const DEFAULT_MARKERS: &[&str] = &[
    "ya se encuentra registrado",
    "ya está registrado",
    "ya esta registrado",
    "ya existe",
    "duplicad",
    "duplicate",
    "already registered",
    "already exists",
];

impl DuplicateRegistrationPolicy {
    /// Policy matching any of `markers`, case-insensitively.
    pub fn new<I, S>(markers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            markers: markers
                .into_iter()
                .map(|marker| marker.as_ref().trim().to_lowercase())
                .filter(|marker| !marker.is_empty())
                .collect(),
        }
    }

    /// Policy that never reclassifies a rejection.
    pub fn disabled() -> Self {
        Self {
            markers: Vec::new(),
        }
    }

    /// Whether `message` reports an existing registration.
    pub fn is_duplicate(&self, message: &str) -> bool {
        let message = message.to_lowercase();
        self.markers
            .iter()
            .any(|marker| message.contains(marker.as_str()))
    }
}

impl Default for DuplicateRegistrationPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MARKERS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("El DNI YA SE ENCUENTRA REGISTRADO", true)]
    #[case("Fiscal ya existe en el sistema", true)]
    #[case("Registro duplicado", true)]
    #[case("User already registered", true)]
    #[case("DNI inválido", false)]
    #[case("", false)]
    fn default_markers_match_case_insensitively(#[case] message: &str, #[case] expected: bool) {
        assert_eq!(
            DuplicateRegistrationPolicy::default().is_duplicate(message),
            expected
        );
    }

    #[rstest]
    fn disabled_policy_never_matches() {
        assert!(!DuplicateRegistrationPolicy::disabled().is_duplicate("ya existe"));
    }

    #[rstest]
    fn blank_markers_are_ignored() {
        let policy = DuplicateRegistrationPolicy::new(["  ", "Repetido"]);
        assert!(policy.is_duplicate("registro repetido"));
        assert!(!policy.is_duplicate("otro error"));
    }
}
