//! Quick-reply option catalog and the static intent → options table.

use serde::{Deserialize, Serialize};

use crate::locale::Language;
use crate::pipeline::types::IntentKind;

/// UI action tokens understood by the core.
pub mod tokens {
    pub const LANG_ES_AR: &str = "BTN_LANG_ES_AR";
    pub const LANG_ES_ES: &str = "BTN_LANG_ES_ES";
    pub const LANG_EN: &str = "BTN_LANG_EN";
    pub const NO_NAME: &str = "BTN_NO_NAME";
    pub const HELP: &str = "BTN_HELP";
    pub const TASK: &str = "BTN_TASK";
    pub const BASIC_TESTS: &str = "BTN_BASIC_TESTS";
    pub const TESTS_DONE: &str = "BTN_TESTS_DONE";
    pub const TESTS_FAIL: &str = "BTN_TESTS_FAIL";
    pub const ADVANCED_TESTS: &str = "BTN_ADVANCED_TESTS";
    pub const STEP_BY_STEP: &str = "BTN_STEP_BY_STEP";
    pub const SOLVED: &str = "BTN_SOLVED";
    pub const CONNECT_TECH: &str = "BTN_CONNECT_TECH";
    pub const YES: &str = "BTN_YES";
    pub const NO: &str = "BTN_NO";
    pub const CLOSE: &str = "BTN_CLOSE";
    pub const OS_WINDOWS: &str = "BTN_OS_WINDOWS";
    pub const OS_MACOS: &str = "BTN_OS_MACOS";
    pub const OS_LINUX: &str = "BTN_OS_LINUX";
    pub const OS_ANDROID: &str = "BTN_OS_ANDROID";
    pub const OS_IOS: &str = "BTN_OS_IOS";
}

/// A quick-reply button offered with a reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplyOption {
    pub token: String,
    pub label: String,
}

/// (token, Spanish label, English label)
const CATALOG: &[(&str, &str, &str)] = &[
    (tokens::LANG_ES_AR, "Español (Argentina)", "Spanish (Argentina)"),
    (tokens::LANG_ES_ES, "Español (España)", "Spanish (Spain)"),
    (tokens::LANG_EN, "English", "English"),
    (tokens::NO_NAME, "Prefiero no decirlo", "I'd rather not say"),
    (tokens::HELP, "Tengo un problema", "I have a problem"),
    (tokens::TASK, "Quiero hacer algo", "I want to get something done"),
    (tokens::BASIC_TESTS, "Hacer pruebas básicas", "Run basic tests"),
    (tokens::TESTS_DONE, "Ya hice las pruebas", "I ran the tests"),
    (tokens::TESTS_FAIL, "Sigue igual", "Still not working"),
    (tokens::ADVANCED_TESTS, "Pruebas avanzadas", "Advanced tests"),
    (tokens::STEP_BY_STEP, "Explicame paso a paso", "Walk me through it"),
    (tokens::SOLVED, "¡Funcionó!", "It worked!"),
    (tokens::CONNECT_TECH, "Necesito ayuda de un técnico", "I need help from a technician"),
    (tokens::YES, "Sí", "Yes"),
    (tokens::NO, "No", "No"),
    (tokens::CLOSE, "Cerrar chat", "Close chat"),
    (tokens::OS_WINDOWS, "Windows", "Windows"),
    (tokens::OS_MACOS, "macOS", "macOS"),
    (tokens::OS_LINUX, "Linux", "Linux"),
    (tokens::OS_ANDROID, "Android", "Android"),
    (tokens::OS_IOS, "iOS", "iOS"),
];

/// Operating-system pickers offered when the OS is still unknown.
pub const OS_PICKERS: [&str; 4] = [
    tokens::OS_WINDOWS,
    tokens::OS_MACOS,
    tokens::OS_ANDROID,
    tokens::OS_IOS,
];

/// Options that only make sense while diagnosing.
const DIAGNOSTIC_TOKENS: [&str; 4] = [
    tokens::BASIC_TESTS,
    tokens::TESTS_DONE,
    tokens::TESTS_FAIL,
    tokens::ADVANCED_TESTS,
];

/// Display label for a token, if it is in the catalog.
pub fn label_for(token: &str, language: Language) -> Option<&'static str> {
    CATALOG
        .iter()
        .find(|(t, _, _)| *t == token)
        .map(|(_, es, en)| language.pick(es, en))
}

/// Build a localized option. Tokens outside the catalog use the token as label.
pub fn option(token: &str, language: Language) -> ReplyOption {
    ReplyOption {
        token: token.to_string(),
        label: label_for(token, language).unwrap_or(token).to_string(),
    }
}

pub fn options(tokens: &[&str], language: Language) -> Vec<ReplyOption> {
    tokens.iter().map(|t| option(t, language)).collect()
}

/// Static option table for a freshly classified intent.
pub fn intent_option_tokens(intent: IntentKind) -> &'static [&'static str] {
    use IntentKind::*;
    match intent {
        TechnicalProblem | PerformanceIssue | ConnectionProblem => &[
            tokens::BASIC_TESTS,
            tokens::ADVANCED_TESTS,
            tokens::SOLVED,
            tokens::CONNECT_TECH,
        ],
        InstallationHelp | ConfigurationHelp | HowToQuestion => &[
            tokens::STEP_BY_STEP,
            tokens::SOLVED,
            tokens::CONNECT_TECH,
        ],
        InformationRequest => &[tokens::SOLVED, tokens::CONNECT_TECH],
        EscalationRequest => &[tokens::YES, tokens::NO],
        Feedback => &[tokens::HELP, tokens::CLOSE],
        CloseChat => &[],
        Unclear => &[tokens::HELP, tokens::TASK, tokens::CONNECT_TECH],
    }
}

/// Options for a fresh intent, filtered by diagnostic state.
///
/// Diagnostic options appear only when the intent requires a diagnostic;
/// advanced tests additionally require a prior basic-test attempt.
pub fn options_for_intent(
    intent: IntentKind,
    requires_diagnostic: bool,
    has_attempted_basic_tests: bool,
    language: Language,
) -> Vec<ReplyOption> {
    intent_option_tokens(intent)
        .iter()
        .filter(|t| {
            if **t == tokens::ADVANCED_TESTS {
                requires_diagnostic && has_attempted_basic_tests
            } else if DIAGNOSTIC_TOKENS.contains(*t) {
                requires_diagnostic
            } else {
                true
            }
        })
        .map(|t| option(t, language))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens_of(options: &[ReplyOption]) -> Vec<&str> {
        options.iter().map(|o| o.token.as_str()).collect()
    }

    #[test]
    fn labels_are_localized() {
        assert_eq!(label_for(tokens::SOLVED, Language::English), Some("It worked!"));
        assert_eq!(label_for(tokens::SOLVED, Language::Spanish), Some("¡Funcionó!"));
        assert_eq!(label_for("BTN_UNKNOWN", Language::Spanish), None);
        assert_eq!(option("BTN_UNKNOWN", Language::Spanish).label, "BTN_UNKNOWN");
    }

    #[test]
    fn advanced_tests_hidden_until_basic_attempted() {
        let before =
            options_for_intent(IntentKind::TechnicalProblem, true, false, Language::Spanish);
        assert!(tokens_of(&before).contains(&tokens::BASIC_TESTS));
        assert!(!tokens_of(&before).contains(&tokens::ADVANCED_TESTS));

        let after =
            options_for_intent(IntentKind::TechnicalProblem, true, true, Language::Spanish);
        assert!(tokens_of(&after).contains(&tokens::ADVANCED_TESTS));
    }

    #[test]
    fn diagnostics_hidden_without_diagnostic_need() {
        let opts =
            options_for_intent(IntentKind::PerformanceIssue, false, true, Language::English);
        assert!(!tokens_of(&opts).contains(&tokens::BASIC_TESTS));
        assert!(!tokens_of(&opts).contains(&tokens::ADVANCED_TESTS));
        assert!(tokens_of(&opts).contains(&tokens::CONNECT_TECH));
    }

    #[test]
    fn close_chat_has_no_options() {
        assert!(options_for_intent(IntentKind::CloseChat, false, false, Language::Spanish).is_empty());
    }
}
