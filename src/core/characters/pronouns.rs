// Pronoun providers for character profiles.
//
// A provider is a fixed conjugation table keyed by a family name; characters
// store the family name and look the table up for display.

/// A pronoun conjugation table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PronounProvider {
    /// Key stored on the character ("they", "she", "zir", ...).
    pub family: &'static str,
    pub subject: &'static str,
    pub object: &'static str,
    pub possessive_adjective: &'static str,
    pub possessive: &'static str,
    pub reflexive: &'static str,
}

impl PronounProvider {
    /// Human-readable "subject / object" form used in embeds.
    pub fn display(&self) -> String {
        format!("{} / {}", self.subject, self.object)
    }
}

const PROVIDERS: &[PronounProvider] = &[
    PronounProvider {
        family: "they",
        subject: "they",
        object: "them",
        possessive_adjective: "their",
        possessive: "theirs",
        reflexive: "themself",
    },
    PronounProvider {
        family: "she",
        subject: "she",
        object: "her",
        possessive_adjective: "her",
        possessive: "hers",
        reflexive: "herself",
    },
    PronounProvider {
        family: "he",
        subject: "he",
        object: "him",
        possessive_adjective: "his",
        possessive: "his",
        reflexive: "himself",
    },
    PronounProvider {
        family: "it",
        subject: "it",
        object: "it",
        possessive_adjective: "its",
        possessive: "its",
        reflexive: "itself",
    },
    PronounProvider {
        family: "ze",
        subject: "ze",
        object: "zir",
        possessive_adjective: "zir",
        possessive: "zirs",
        reflexive: "zirself",
    },
    PronounProvider {
        family: "co",
        subject: "co",
        object: "co",
        possessive_adjective: "cos",
        possessive: "cos",
        reflexive: "coself",
    },
];

/// The default family applied to new characters.
pub const DEFAULT_PRONOUN_FAMILY: &str = "they";

/// Looks up a provider by its family name, case-insensitively.
pub fn get_provider(family: &str) -> Option<&'static PronounProvider> {
    PROVIDERS
        .iter()
        .find(|p| p.family.eq_ignore_ascii_case(family))
}

/// All known family names.
pub fn known_families() -> impl Iterator<Item = &'static str> {
    PROVIDERS.iter().map(|p| p.family)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_is_case_insensitive() {
        assert!(get_provider("She").is_some());
        assert!(get_provider("ZE").is_some());
        assert!(get_provider("xenomorph").is_none());
    }

    #[test]
    fn default_family_exists() {
        assert!(get_provider(DEFAULT_PRONOUN_FAMILY).is_some());
    }

    #[test]
    fn display_form() {
        let provider = get_provider("she").unwrap();
        assert_eq!(provider.display(), "she / her");
    }
}
