//! Pre-LLM rules: slot detectors, auxiliary-reply shapes, fallback heuristics.
//!
//! Everything here is regex-only and runs without the collaborator:
//! - slot detectors pull OS / brand / device / topic / urgency from raw text
//! - the auxiliary vocabulary recognizes short follow-ups ("windows", "sí",
//!   "es una notebook HP") that answer an open active intent
//! - intent rules classify when the LLM is unavailable
//!
//! Installation and configuration rules are checked before problem rules so
//! a "how do I install X" request is never taken for a fault report.

use regex::Regex;
use tracing::debug;

use crate::pipeline::types::{DeviceType, IntentKind, Urgency};

/// Maximum length (chars) of a reply that may be treated as auxiliary.
const AUXILIARY_MAX_CHARS: usize = 60;

/// Maximum word count of a reply that may be treated as auxiliary.
const AUXILIARY_MAX_WORDS: usize = 6;

/// A heuristic intent rule used when the LLM cannot classify.
#[derive(Debug, Clone)]
pub struct IntentRule {
    /// Human-readable pattern description.
    pub pattern: String,
    /// Compiled regex for matching.
    pub regex: Regex,
    pub intent: IntentKind,
    pub confidence: f32,
}

/// Maps a regex match to a canonical slot value.
#[derive(Debug, Clone)]
struct SlotRule<T> {
    regex: Regex,
    value: T,
}

fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).unwrap()
}

fn slot<T>(pattern: &str, value: T) -> SlotRule<T> {
    SlotRule {
        regex: compile(pattern),
        value,
    }
}

const BRAND_ALTERNATION: &str = r"hp|dell|lenovo|asus|acer|samsung|apple|xiaomi|motorola|moto|lg|sony|toshiba|msi|huawei|tp-?link|mikrotik|microtik|epson|canon|brother|noblex|bgh|exo|macbook|iphone|ipad|imac";

const DEVICE_ALTERNATION: &str = r"notebook|laptop|port[aá]til|netbook|chromebook|pc|compu|computadora|computador|ordenador|desktop|escritorio|celular|cel|tel[eé]fono|smartphone|phone|m[oó]vil|tablet|impresora|printer|router|m[oó]dem|modem|tv|tele|televisor|smart\s?tv|stick|chromecast";

/// Regex rules engine shared by the classifier.
///
/// Built once and only read afterwards, so one instance can serve any
/// number of concurrent sessions.
pub struct RulesEngine {
    intent_rules: Vec<IntentRule>,
    os_rules: Vec<SlotRule<&'static str>>,
    brand_rules: Vec<SlotRule<&'static str>>,
    device_rules: Vec<SlotRule<DeviceType>>,
    topic_known: Regex,
    topic_after_verb: Regex,
    urgency_high: Regex,
    auxiliary_shapes: Vec<Regex>,
}

impl RulesEngine {
    /// Create a rules engine with the default Spanish/English patterns.
    pub fn default_rules() -> Self {
        let intent_rules = vec![
            IntentRule {
                pattern: "asks for a human".into(),
                regex: compile(
                    r"(?i)(hablar con (un |una |el |la )?(t[eé]cnico|humano|persona|operador|agente)|quiero (un|una) (t[eé]cnico|persona)|talk to (a |an )?(human|person|technician|agent)|real person)",
                ),
                intent: IntentKind::EscalationRequest,
                confidence: 0.7,
            },
            IntentRule {
                pattern: "goodbye".into(),
                regex: compile(
                    r"(?i)^\s*(chau|adi[oó]s|bye|goodbye|nos vemos|eso es todo|that'?s all)\b",
                ),
                intent: IntentKind::CloseChat,
                confidence: 0.7,
            },
            IntentRule {
                pattern: "installation phrase".into(),
                regex: compile(r"(?i)\b(instal\w*|install\w*|descarg\w*|download\w*|reinstal\w*)"),
                intent: IntentKind::InstallationHelp,
                confidence: 0.65,
            },
            IntentRule {
                pattern: "configuration phrase".into(),
                regex: compile(
                    r"(?i)\b(configur\w*|set\s?up|setup|vincul\w*|emparej\w*|pair\w*|conectar (el|la|mi|un|una|los|las) )",
                ),
                intent: IntentKind::ConfigurationHelp,
                confidence: 0.65,
            },
            IntentRule {
                pattern: "how-to phrase".into(),
                regex: compile(
                    r"(?i)(\bc[oó]mo (hago|puedo|se|hacer|cambio|activo|uso|agrego|pongo)\b|\bhow (do|can|to|should)\b)",
                ),
                intent: IntentKind::HowToQuestion,
                confidence: 0.6,
            },
            IntentRule {
                pattern: "connection phrase".into(),
                regex: compile(
                    r"(?i)(\b(no|sin)\b.*\b(wi-?fi|internet|conexi[oó]n|se[nñ]al|red)\b|\b(wi-?fi|internet|conexi[oó]n)\b.*\b(no anda|se cae|se corta|anda mal|no funciona)\b|\bno (me )?conecta|can'?t connect|no connection|no internet|internet (is )?down)",
                ),
                intent: IntentKind::ConnectionProblem,
                confidence: 0.65,
            },
            IntentRule {
                pattern: "performance phrase".into(),
                regex: compile(
                    r"(?i)\b(lent[oa]s?|slow\w*|tarda\w*|se traba|trabad[oa]|se cuelga|colgad[oa]|freez\w*|lag\w*)\b",
                ),
                intent: IntentKind::PerformanceIssue,
                confidence: 0.65,
            },
            IntentRule {
                pattern: "problem phrase".into(),
                regex: compile(
                    r"(?i)(\bno (me )?(prende|enciende|funciona|anda|arranca|carga|inicia|responde|abre|imprime|suena|da imagen)\b|\b(error|falla|fall[oó]|roto|rota|broken|crash\w*|pantalla (azul|negra)|blue screen)\b|won'?t (turn on|start|boot|work|charge)|\bnot working\b|doesn'?t work|stopped working)",
                ),
                intent: IntentKind::TechnicalProblem,
                confidence: 0.65,
            },
            IntentRule {
                pattern: "information phrase".into(),
                regex: compile(
                    r"(?i)(\b(qu[eé] es|cu[aá]l es|cu[aá]nto (cuesta|sale)|horarios?|precios?|informaci[oó]n)\b|\b(what is|how much|price|opening hours)\b)",
                ),
                intent: IntentKind::InformationRequest,
                confidence: 0.6,
            },
            IntentRule {
                pattern: "feedback phrase".into(),
                regex: compile(
                    r"(?i)\b(gracias|excelente|genial|buen[ií]simo|p[eé]simo|thanks|thank you|great job|awesome|terrible)\b",
                ),
                intent: IntentKind::Feedback,
                confidence: 0.6,
            },
        ];

        let os_rules = vec![
            slot(r"(?i)\b(chrome\s?os|chromebook)\b", "ChromeOS"),
            slot(r"(?i)\b(windows|win\s?(7|8|10|11|xp)|w10|w11)\b", "Windows"),
            slot(r"(?i)\b(ios|iphone|ipad)\b", "iOS"),
            slot(r"(?i)\b(mac\s?os|os\s?x|macbook|imac|mac)\b", "macOS"),
            slot(r"(?i)\b(android)\b", "Android"),
            slot(r"(?i)\b(linux|ubuntu|debian|fedora|mint)\b", "Linux"),
        ];

        let brand_rules = vec![
            slot(r"(?i)\b(hp|hewlett)\b", "HP"),
            slot(r"(?i)\bdell\b", "Dell"),
            slot(r"(?i)\blenovo\b", "Lenovo"),
            slot(r"(?i)\basus\b", "ASUS"),
            slot(r"(?i)\bacer\b", "Acer"),
            slot(r"(?i)\bsamsung\b", "Samsung"),
            slot(r"(?i)\b(apple|macbook|iphone|ipad|imac)\b", "Apple"),
            slot(r"(?i)\bxiaomi\b", "Xiaomi"),
            slot(r"(?i)\b(motorola|moto)\b", "Motorola"),
            slot(r"(?i)\blg\b", "LG"),
            slot(r"(?i)\bsony\b", "Sony"),
            slot(r"(?i)\btoshiba\b", "Toshiba"),
            slot(r"(?i)\bmsi\b", "MSI"),
            slot(r"(?i)\bhuawei\b", "Huawei"),
            slot(r"(?i)\btp-?link\b", "TP-Link"),
            slot(r"(?i)\b(mikrotik|microtik)\b", "MikroTik"),
            slot(r"(?i)\bepson\b", "Epson"),
            slot(r"(?i)\bcanon\b", "Canon"),
            slot(r"(?i)\bbrother\b", "Brother"),
            slot(r"(?i)\bnoblex\b", "Noblex"),
            slot(r"(?i)\bbgh\b", "BGH"),
            slot(r"(?i)\bexo\b", "EXO"),
        ];

        let device_rules = vec![
            slot(
                r"(?i)\b(notebook|laptop|port[aá]til|netbook|macbook|chromebook)\b",
                DeviceType::Notebook,
            ),
            slot(r"(?i)\b(tablet|ipad)\b", DeviceType::Tablet),
            slot(
                r"(?i)\b(celular|cel|tel[eé]fono|smartphone|phone|m[oó]vil|iphone)\b",
                DeviceType::Smartphone,
            ),
            slot(r"(?i)\b(impresora|printer)\b", DeviceType::Printer),
            slot(
                r"(?i)\b(router|m[oó]dem|modem|mikrotik|microtik|access point)\b",
                DeviceType::Router,
            ),
            slot(
                r"(?i)\b(smart\s?tv|tv|tele|televisor|stick|fire\s?stick|chromecast|roku)\b",
                DeviceType::Tv,
            ),
            slot(
                r"(?i)\b(pc|compu|computadora|computador|ordenador|desktop|escritorio|cpu|imac)\b",
                DeviceType::Desktop,
            ),
        ];

        let auxiliary_shapes = vec![
            // Operating system names
            compile(
                r"(?i)^(windows(\s?\d+)?|win\s?\d+|mac\s?os|macos|mac|linux|ubuntu|android|ios|chrome\s?os)$",
            ),
            // Yes / no
            compile(
                r"(?i)^(s[ií]|no|yes|yeah|yep|nope|ok|okay|dale|claro|correcto|exacto|listo|de acuerdo)$",
            ),
            // Brand, optionally followed by a model
            compile(&format!(
                r"(?i)^({})(\s+[\p{{L}}\d\-]+){{0,3}}$",
                BRAND_ALTERNATION
            )),
            // Device noun, optionally with article and brand/model
            compile(&format!(
                r"(?i)^((una?|el|la|mi|my|a|an)\s+)?({})(\s+[\p{{L}}\d\-]+){{0,3}}$",
                DEVICE_ALTERNATION
            )),
            // "tengo / uso / es un X", "I have / I use / it's a X"
            compile(
                r"(?i)^(tengo|uso|es|son|i have|i use|it'?s|its|it is)\s+((una?|el|la|a|an)\s+)?[\p{L}\d\-\.]+(\s+[\p{L}\d\-\.]+){0,3}$",
            ),
        ];

        Self {
            intent_rules,
            os_rules,
            brand_rules,
            device_rules,
            topic_known: compile(
                r"(?i)\b(anydesk|teamviewer|zoom|whatsapp|office|word|excel|powerpoint|outlook|teams|skype|chrome|firefox|antivirus|drivers?|controladores?|vpn|netflix|spotify|youtube|gmail|correo|e-?mail|wi-?fi|wan|impresora|printer)\b",
            ),
            topic_after_verb: compile(
                r"(?i)\b(?:instalar|install|configurar|configure|set up|descargar|download|actualizar|update)\s+(?:(?:el|la|los|las|un|una|the|a|an|mi|my)\s+)?([\p{L}\d][\p{L}\d\-\.]*)",
            ),
            urgency_high: compile(
                r"(?i)\b(urgente|urgent|urgencia|ya mismo|asap|cr[ií]tico|critical|emergencia|emergency|no puedo trabajar|can'?t work)\b",
            ),
            auxiliary_shapes,
        }
    }

    /// First heuristic intent rule matching `text`, in priority order.
    pub fn match_intent(&self, text: &str) -> Option<&IntentRule> {
        let rule = self.intent_rules.iter().find(|r| r.regex.is_match(text));
        if let Some(rule) = rule {
            debug!(rule = %rule.pattern, intent = %rule.intent, "Heuristic intent rule matched");
        }
        rule
    }

    /// Whether `text` has the shape of a short reply to an open question.
    ///
    /// Replies that also carry a new request ("tengo un problema, no prende")
    /// are not auxiliary even if short.
    pub fn is_auxiliary_reply(&self, text: &str) -> bool {
        let normalized = normalize_reply(text);
        if normalized.is_empty()
            || normalized.chars().count() > AUXILIARY_MAX_CHARS
            || normalized.split_whitespace().count() > AUXILIARY_MAX_WORDS
        {
            return false;
        }
        if !self.auxiliary_shapes.iter().any(|r| r.is_match(&normalized)) {
            return false;
        }
        self.match_intent(&normalized).is_none()
    }

    pub fn detect_operating_system(&self, text: &str) -> Option<String> {
        first_slot(&self.os_rules, text).map(|s| s.to_string())
    }

    pub fn detect_brand(&self, text: &str) -> Option<String> {
        first_slot(&self.brand_rules, text).map(|s| s.to_string())
    }

    pub fn detect_device(&self, text: &str) -> Option<DeviceType> {
        first_slot(&self.device_rules, text)
    }

    /// Software or subject the user is talking about.
    ///
    /// Known application names win over the word following an install or
    /// configure verb.
    pub fn detect_topic(&self, text: &str) -> Option<String> {
        if let Some(m) = self.topic_known.find(text) {
            return Some(m.as_str().to_lowercase());
        }
        self.topic_after_verb
            .captures(text)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_lowercase())
    }

    /// Urgency from explicit wording, then from the kind of intent.
    pub fn detect_urgency(&self, text: &str, intent: IntentKind) -> Urgency {
        if self.urgency_high.is_match(text) {
            Urgency::High
        } else if intent.is_problem() {
            Urgency::Medium
        } else {
            Urgency::Low
        }
    }
}

fn first_slot<T: Copy>(rules: &[SlotRule<T>], text: &str) -> Option<T> {
    rules.iter().find(|r| r.regex.is_match(text)).map(|r| r.value)
}

/// Trim and drop trailing punctuation so "Windows." and "¡sí!" match.
fn normalize_reply(text: &str) -> String {
    text.trim()
        .trim_matches(|c: char| matches!(c, '.' | ',' | '!' | '?' | '¡' | '¿' | ';' | ':'))
        .trim()
        .to_string()
}
