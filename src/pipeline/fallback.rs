//! Deterministic, locale-aware replies used when the collaborator is not
//! available. Every function returns non-empty text.

use crate::locale::Language;
use crate::pipeline::types::DeviceType;

/// Ask which operating system the user has.
pub fn ask_operating_system(topic: Option<&str>, language: Language) -> String {
    match (language, topic) {
        (Language::Spanish, Some(t)) => {
            format!("¡Dale! Te ayudo a instalar {t}. ¿Qué sistema operativo tenés?")
        }
        (Language::Spanish, None) => {
            "¡Dale! Te ayudo con la instalación. ¿Qué sistema operativo tenés?".to_string()
        }
        (Language::English, Some(t)) => {
            format!("Sure! I'll help you install {t}. Which operating system do you have?")
        }
        (Language::English, None) => {
            "Sure! I'll help you with the installation. Which operating system do you have?"
                .to_string()
        }
    }
}

/// Ask which device has the problem.
pub fn ask_device(language: Language) -> String {
    language
        .pick(
            "Entiendo, vamos a revisarlo. ¿En qué equipo pasa? (PC, notebook, celular, impresora, router...)",
            "Got it, let's look into it. Which device is it? (PC, laptop, phone, printer, router...)",
        )
        .to_string()
}

/// Installation steps for a known operating system.
pub fn install_steps(operating_system: &str, topic: Option<&str>, language: Language) -> String {
    let app = topic.unwrap_or(language.pick("la aplicación", "the app"));
    let os = operating_system.to_ascii_lowercase();
    let es = language == Language::Spanish;

    let steps: Vec<String> = if os.contains("windows") {
        if es {
            vec![
                format!("Entrá al sitio oficial de {app} y descargá el instalador para Windows."),
                "Abrí el archivo .exe que se descargó (suele estar en la carpeta Descargas).".into(),
                "Si Windows pregunta si permitís cambios, elegí \"Sí\".".into(),
                "Seguí el asistente con \"Siguiente\" hasta \"Finalizar\".".into(),
                format!("Abrí {app} desde el menú Inicio."),
            ]
        } else {
            vec![
                format!("Go to the official {app} website and download the Windows installer."),
                "Open the downloaded .exe file (usually in your Downloads folder).".into(),
                "If Windows asks to allow changes, choose \"Yes\".".into(),
                "Follow the wizard with \"Next\" until \"Finish\".".into(),
                format!("Open {app} from the Start menu."),
            ]
        }
    } else if os.contains("mac") {
        if es {
            vec![
                format!("Descargá {app} desde el sitio oficial o buscalo en la App Store."),
                "Abrí el archivo .dmg descargado.".into(),
                "Arrastrá el ícono a la carpeta Aplicaciones.".into(),
                "La primera vez, abrilo con clic derecho → Abrir para aceptar el permiso.".into(),
            ]
        } else {
            vec![
                format!("Download {app} from the official website or the App Store."),
                "Open the downloaded .dmg file.".into(),
                "Drag the icon into the Applications folder.".into(),
                "The first time, right-click → Open to accept the permission prompt.".into(),
            ]
        }
    } else if os.contains("android") || os.contains("chrome") {
        if es {
            vec![
                "Abrí la Play Store.".into(),
                format!("Buscá \"{app}\" y verificá que sea la app oficial."),
                "Tocá \"Instalar\" y esperá que termine.".into(),
                "Abrila y aceptá los permisos que pida.".into(),
            ]
        } else {
            vec![
                "Open the Play Store.".into(),
                format!("Search for \"{app}\" and check it's the official app."),
                "Tap \"Install\" and wait for it to finish.".into(),
                "Open it and accept the permissions it asks for.".into(),
            ]
        }
    } else if os.contains("ios") {
        if es {
            vec![
                "Abrí la App Store.".into(),
                format!("Buscá \"{app}\" y tocá \"Obtener\"."),
                "Confirmá con Face ID, Touch ID o tu contraseña.".into(),
                "Abrila desde la pantalla de inicio.".into(),
            ]
        } else {
            vec![
                "Open the App Store.".into(),
                format!("Search for \"{app}\" and tap \"Get\"."),
                "Confirm with Face ID, Touch ID or your password.".into(),
                "Open it from the home screen.".into(),
            ]
        }
    } else if es {
        vec![
            format!("Descargá {app} desde el sitio oficial, eligiendo la versión para {operating_system}."),
            "Abrí el archivo descargado o instalalo con el gestor de paquetes de tu sistema.".into(),
            "Seguí las instrucciones del instalador.".into(),
        ]
    } else {
        vec![
            format!("Download {app} from the official website, picking the {operating_system} version."),
            "Open the downloaded file or install it with your system's package manager.".into(),
            "Follow the installer's instructions.".into(),
        ]
    };

    let intro = match language {
        Language::Spanish => format!("Perfecto, para {operating_system} seguí estos pasos:"),
        Language::English => format!("Great, for {operating_system} follow these steps:"),
    };
    let outro = language.pick(
        "Contame si funcionó o si te trabaste en algún paso.",
        "Let me know if it worked or where you got stuck.",
    );
    format!("{intro}\n{}\n{outro}", numbered(&steps))
}

/// Generic configuration steps.
pub fn configuration_steps(topic: Option<&str>, language: Language) -> String {
    let subject = topic.unwrap_or(language.pick("el equipo", "the device"));
    let steps: Vec<String> = match language {
        Language::Spanish => vec![
            format!("Abrí la configuración de {subject} (Ajustes o Configuración)."),
            "Buscá la sección correspondiente a lo que querés cambiar.".into(),
            "Aplicá el cambio y guardá.".into(),
            "Reiniciá si te lo pide y probá que funcione.".into(),
        ],
        Language::English => vec![
            format!("Open the settings for {subject} (Settings or Preferences)."),
            "Find the section for what you want to change.".into(),
            "Apply the change and save.".into(),
            "Restart if asked and check that it works.".into(),
        ],
    };
    let intro = language.pick("Vamos paso a paso:", "Let's go step by step:");
    let outro = language.pick(
        "Si me decís el modelo exacto te paso los pasos precisos.",
        "If you tell me the exact model I can give you precise steps.",
    );
    format!("{intro}\n{}\n{outro}", numbered(&steps))
}

/// Diagnostic checks, basic or advanced.
pub fn diagnostic_steps(device: Option<DeviceType>, advanced: bool, language: Language) -> String {
    let es = language == Language::Spanish;
    let steps: Vec<&str> = match (advanced, device) {
        (false, Some(DeviceType::Router)) => {
            if es {
                vec![
                    "Desenchufá el router y el módem 30 segundos y volvé a enchufarlos.",
                    "Revisá que las luces de internet/WAN estén encendidas.",
                    "Probá si otro equipo se conecta.",
                ]
            } else {
                vec![
                    "Unplug the router and modem for 30 seconds, then plug them back in.",
                    "Check that the internet/WAN lights are on.",
                    "Try whether another device can connect.",
                ]
            }
        }
        (false, Some(DeviceType::Printer)) => {
            if es {
                vec![
                    "Apagá la impresora, esperá 10 segundos y encendela.",
                    "Revisá que tenga papel y tinta/tóner y que no haya luces de error.",
                    "Verificá el cable o que esté en la misma red Wi-Fi.",
                ]
            } else {
                vec![
                    "Turn the printer off, wait 10 seconds and turn it on.",
                    "Check paper and ink/toner and look for error lights.",
                    "Check the cable or that it's on the same Wi-Fi network.",
                ]
            }
        }
        (false, _) => {
            if es {
                vec![
                    "Verificá que esté bien enchufado y que el cable o cargador funcione.",
                    "Reinicialo por completo (apagar, esperar 30 segundos, encender).",
                    "Fijate si aparece alguna luz, sonido o mensaje de error y anotalo.",
                ]
            } else {
                vec![
                    "Check it's plugged in and the cable or charger works.",
                    "Fully restart it (turn off, wait 30 seconds, turn on).",
                    "Note any light, sound or error message that appears.",
                ]
            }
        }
        (true, _) => {
            if es {
                vec![
                    "Mantené apretado el botón de encendido 30 segundos para descargar la energía.",
                    "Desconectá todo lo accesorio (USB, pendrives, periféricos) y probá de nuevo.",
                    "Si enciende, probá iniciar en modo seguro y revisá actualizaciones o drivers.",
                ]
            } else {
                vec![
                    "Hold the power button for 30 seconds to drain residual power.",
                    "Disconnect all accessories (USB drives, peripherals) and try again.",
                    "If it starts, boot into safe mode and check updates or drivers.",
                ]
            }
        }
    };
    let intro = if advanced {
        language.pick("Probemos algo más a fondo:", "Let's dig a bit deeper:")
    } else {
        language.pick("Probemos estos pasos:", "Let's try these steps:")
    };
    let outro = language.pick(
        "Contame cómo te fue. Si sigue igual, te conecto con un técnico.",
        "Tell me how it went. If nothing changes, I can connect you with a technician.",
    );
    let owned: Vec<String> = steps.into_iter().map(str::to_string).collect();
    format!("{intro}\n{}\n{outro}", numbered(&owned))
}

/// Generic numbered steps for a how-to or information goal.
pub fn how_to_steps(topic: Option<&str>, language: Language) -> String {
    let steps: Vec<String> = match (language, topic) {
        (Language::Spanish, Some(t)) => vec![
            format!("Abrí {t} o la configuración relacionada."),
            "Buscá la opción en el menú principal o en Ajustes.".into(),
            "Seguí las indicaciones en pantalla.".into(),
        ],
        (Language::Spanish, None) => vec![
            "Abrí la aplicación o la configuración relacionada.".into(),
            "Buscá la opción en el menú principal o en Ajustes.".into(),
            "Seguí las indicaciones en pantalla.".into(),
        ],
        (Language::English, Some(t)) => vec![
            format!("Open {t} or its related settings."),
            "Look for the option in the main menu or Settings.".into(),
            "Follow the on-screen instructions.".into(),
        ],
        (Language::English, None) => vec![
            "Open the app or its related settings.".into(),
            "Look for the option in the main menu or Settings.".into(),
            "Follow the on-screen instructions.".into(),
        ],
    };
    let outro = language.pick(
        "Si me das más detalles de tu equipo te lo explico con precisión.",
        "If you give me more details about your device I can be more precise.",
    );
    format!("{}\n{outro}", numbered(&steps))
}

/// Short apology with generic steps and a way out.
pub fn generic_steps(language: Language) -> String {
    let steps: Vec<String> = match language {
        Language::Spanish => vec![
            "Reiniciá el equipo o la aplicación.".into(),
            "Verificá la conexión a internet.".into(),
            "Contame con más detalle qué pasa o qué querés hacer.".into(),
        ],
        Language::English => vec![
            "Restart the device or the app.".into(),
            "Check your internet connection.".into(),
            "Tell me in more detail what happens or what you want to do.".into(),
        ],
    };
    let intro = language.pick(
        "Perdón, no pude procesar bien tu consulta. Mientras tanto podés probar:",
        "Sorry, I couldn't fully process your request. Meanwhile you can try:",
    );
    let outro = language.pick(
        "Si preferís, te conecto con un técnico.",
        "If you prefer, I can connect you with a technician.",
    );
    format!("{intro}\n{}\n{outro}", numbered(&steps))
}

pub fn clarification(language: Language) -> String {
    language
        .pick(
            "No estoy seguro de haberte entendido. ¿Podés contarme un poco más? Por ejemplo: \"mi notebook no prende\" o \"quiero instalar Zoom\".",
            "I'm not sure I understood. Could you tell me a bit more? For example: \"my laptop won't turn on\" or \"I want to install Zoom\".",
        )
        .to_string()
}

pub fn escalation_offer(language: Language) -> String {
    language
        .pick(
            "Puedo conectarte con un técnico de nuestro equipo. ¿Querés que genere el pedido?",
            "I can connect you with one of our technicians. Shall I open a request?",
        )
        .to_string()
}

pub fn information(topic: Option<&str>, language: Language) -> String {
    match (language, topic) {
        (Language::Spanish, Some(t)) => format!(
            "Sobre {t}: ahora no tengo acceso a esa información. Si querés, un técnico te la puede confirmar."
        ),
        (Language::English, Some(t)) => format!(
            "About {t}: I can't look that up right now. A technician can confirm it for you if you like."
        ),
        _ => language
            .pick(
                "Ahora no tengo acceso a esa información. Si querés, un técnico te la puede confirmar.",
                "I can't look that up right now. A technician can confirm it for you if you like.",
            )
            .to_string(),
    }
}

pub fn feedback_thanks(language: Language) -> String {
    language
        .pick(
            "¡Gracias por tu comentario! ¿Te puedo ayudar con algo más?",
            "Thanks for the feedback! Anything else I can help with?",
        )
        .to_string()
}

pub fn farewell(language: Language) -> String {
    language
        .pick(
            "¡Gracias por escribir! Si necesitás algo más, acá estoy. ¡Que andes bien!",
            "Thanks for reaching out! If you need anything else, I'm here. Take care!",
        )
        .to_string()
}

fn numbered(steps: &[String]) -> String {
    steps
        .iter()
        .enumerate()
        .map(|(i, s)| format!("{}. {}", i + 1, s))
        .collect::<Vec<_>>()
        .join("\n")
}
