//! System and user prompts for reply synthesis.

use crate::locale::Language;
use crate::pipeline::types::IntentKind;
use crate::session::{Speaker, TranscriptEntry};

/// Slot values known at synthesis time.
#[derive(Debug, Clone, Default)]
pub struct KnownSlots<'a> {
    pub device: Option<&'a str>,
    pub operating_system: Option<&'a str>,
    pub device_brand: Option<&'a str>,
    pub topic: Option<&'a str>,
}

impl KnownSlots<'_> {
    /// "- OS: Windows" lines for every known slot.
    fn describe(&self) -> String {
        let mut lines = Vec::new();
        if let Some(v) = self.device {
            lines.push(format!("- Device: {v}"));
        }
        if let Some(v) = self.device_brand {
            lines.push(format!("- Brand/model: {v}"));
        }
        if let Some(v) = self.operating_system {
            lines.push(format!("- Operating system: {v}"));
        }
        if let Some(v) = self.topic {
            lines.push(format!("- Subject: {v}"));
        }
        if lines.is_empty() {
            "- (nothing yet)".to_string()
        } else {
            lines.join("\n")
        }
    }
}

/// Base persona shared by every synthesis prompt.
pub fn persona_prompt(language: Language, user_name: Option<&str>) -> String {
    let mut prompt = format!(
        "\
You are Tecnos, a friendly technical-support assistant for home and small-office users.

Guidelines:
- Reply in {}.
- Be concise: at most 6 short lines. Use numbered steps for instructions.
- One question at a time. Never ask for something the user already told you.
- No markdown headers, no code blocks, no emojis beyond one at most.
- Never promise remote access or on-site visits; a human technician can be offered.",
        language.prompt_name()
    );
    if let Some(name) = user_name {
        prompt.push_str(&format!("\n- The user's name is {name}; use it sparingly."));
    }
    prompt
}

/// Behavioral instructions for a freshly classified intent.
pub fn intent_behavior(intent: IntentKind) -> &'static str {
    match intent {
        IntentKind::TechnicalProblem => "\
CURRENT GOAL: technical problem.
Acknowledge the problem in one sentence. If the device is unknown, ask which device it is. \
Otherwise give the first two or three basic checks (power, cables, restart) as numbered steps.",
        IntentKind::PerformanceIssue => "\
CURRENT GOAL: performance issue.
Acknowledge the slowness. If the device is unknown, ask which device it is. \
Otherwise suggest the first quick checks (restart, close heavy programs, free disk space).",
        IntentKind::ConnectionProblem => "\
CURRENT GOAL: connection problem.
Acknowledge it. Suggest restarting the router/modem and checking whether other devices connect. \
Ask which device is failing only if it is unknown.",
        IntentKind::InstallationHelp => "\
CURRENT GOAL: installation help. This is NOT a fault: never suggest diagnostics.
If the operating system is unknown, ask ONLY which operating system the user has. \
If it is known, give the concrete installation steps for that operating system.",
        IntentKind::ConfigurationHelp => "\
CURRENT GOAL: configuration help. This is NOT a fault: never suggest diagnostics.
If the device or system is unknown, ask for it. Otherwise give the configuration steps.",
        IntentKind::HowToQuestion => "\
CURRENT GOAL: how-to question.
Explain how to do it in short numbered steps. Ask for the device or system only if the \
answer really depends on it.",
        IntentKind::InformationRequest => "\
CURRENT GOAL: information request.
Answer briefly and plainly. If you are not sure, say so and offer a technician.",
        IntentKind::EscalationRequest => "\
CURRENT GOAL: the user wants a human.
Confirm you can connect them with a technician and ask them to confirm.",
        IntentKind::Feedback => "\
CURRENT GOAL: feedback.
Thank the user briefly and ask if there is anything else you can help with.",
        IntentKind::CloseChat => "\
CURRENT GOAL: closing.
Say goodbye warmly in one or two sentences. Do not ask questions.",
        IntentKind::Unclear => "\
CURRENT GOAL: unclear request.
Briefly ask the user to describe what happens or what they want to do, with an example.",
    }
}

/// Instructions for a short reply to an open installation/configuration goal.
pub fn guide_builder_prompt(intent: IntentKind) -> String {
    let what = if intent == IntentKind::ConfigurationHelp {
        "configure"
    } else {
        "install"
    };
    format!(
        "\
The user already told you what they want to {what} and just answered your question. \
Do NOT ask again what they want to {what}, and do NOT ask again for anything listed under \
\"Known so far\".
Give the concrete next actionable steps for their exact system as a numbered list (3 to 6 steps), \
then ask them to tell you if it worked."
    )
}

/// Instructions for a short reply to an open problem goal.
pub fn diagnostic_builder_prompt(advanced: bool) -> &'static str {
    if advanced {
        "\
The user already described the problem and the basic checks did not solve it. \
Do NOT ask again what the problem is, and do NOT ask for anything listed under \"Known so far\".
Give two or three advanced checks for this exact device (safe mode, drivers, reset, \
hardware indicators) as a numbered list, then ask them to report the result."
    } else {
        "\
The user already described the problem and just answered your question. \
Do NOT ask again what the problem is, and do NOT ask for anything listed under \"Known so far\".
Give the next two or three basic checks for this exact device as a numbered list, \
then ask them to report the result."
    }
}

/// Instructions for a short reply to an open how-to or information goal.
pub fn how_to_builder_prompt() -> &'static str {
    "\
The user already asked their question and just added a detail. \
Do NOT ask again what they want to know, and do NOT ask for anything listed under \"Known so far\".
Answer with concrete numbered steps for their exact setup."
}

/// User prompt shared by every synthesis call.
pub fn synthesis_user_prompt(
    utterance: &str,
    original_request: Option<&str>,
    transcript: &[TranscriptEntry],
    confidence: f32,
    slots: &KnownSlots<'_>,
) -> String {
    let mut prompt = String::with_capacity(1024);

    if !transcript.is_empty() {
        prompt.push_str("Recent conversation:\n");
        for entry in transcript {
            let speaker = match entry.speaker {
                Speaker::User => "User",
                Speaker::Bot => "Assistant",
            };
            let preview: String = entry.text.chars().take(300).collect();
            prompt.push_str(&format!("  {speaker}: {preview}\n"));
        }
        prompt.push('\n');
    }

    if let Some(original) = original_request {
        prompt.push_str(&format!("Original request: {original}\n"));
    }
    prompt.push_str(&format!("Known so far:\n{}\n", slots.describe()));
    prompt.push_str(&format!("Classification confidence: {confidence:.2}\n"));
    prompt.push_str(&format!("\nUser message:\n{}", utterance.trim()));

    prompt
}
