use tokio::io::{AsyncBufReadExt, BufReader};

use helpdesk_dialogue::llm::gateway_from_env;
use helpdesk_dialogue::{DialogueConfig, Session, Stage, TurnOrchestrator, TurnOutcome};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = DialogueConfig::from_env()?;

    let gateway = gateway_from_env(config.llm_timeout)?;
    if !gateway.is_available() {
        eprintln!("   No API key set, running with deterministic fallbacks");
    }

    let locale = std::env::var("HELPDESK_LOCALE").unwrap_or_else(|_| "es-AR".to_string());

    eprintln!("🛠  Helpdesk dialogue v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Type a message, or a BTN_* token to press a button. /quit to exit.\n");

    let orchestrator = TurnOrchestrator::new(gateway, config);
    let mut session = Session::new(locale);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    eprint!("> ");
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            eprint!("> ");
            continue;
        }
        if line == "/quit" {
            break;
        }

        let outcome = if line.starts_with("BTN_") {
            orchestrator
                .handle_turn("", Some(line), &mut session, None)
                .await
        } else {
            orchestrator.handle_turn(line, None, &mut session, None).await
        };

        match outcome {
            TurnOutcome::Handled(result) => {
                println!("\n{}\n", result.reply);
                for option in &result.options {
                    println!("  [{}] {}", option.token, option.label);
                }
                eprintln!("   stage: {}", result.stage);
            }
            TurnOutcome::NotHandled => {
                // Stand-in for the host's onboarding validator.
                if session.stage == Stage::AskName {
                    session.user_name = Some(line.to_string());
                    orchestrator
                        .stage_machine()
                        .change_stage(&mut session, Stage::AskNeed, false)?;
                    let greeting = session.language().pick(
                        "¡Gracias! ¿En qué te puedo ayudar?",
                        "Thanks! How can I help you?",
                    );
                    println!("\n{greeting}\n");
                } else {
                    println!("\n(onboarding input not handled: pick a language button)\n");
                }
            }
        }
        eprint!("> ");
    }

    Ok(())
}
