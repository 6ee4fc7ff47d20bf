//! System prompt assembly.

use crate::completion::ChatMessage;

/// Persona and ground rules for the framework expert.
pub const DEFAULT_PREAMBLE: &str = "\
Du bist ein erfahrener Change-Management-Experte und Berater, spezialisiert auf das \
Triple Loop of Change Framework von Prof. Wolfgang Güttel und Dr. Katharina Kleinhanns-Rollé (TU Wien).

Du antwortest auf Deutsch und sprichst die Nutzer mit \"Sie\" an.

Wichtige Konzepte, die du beherrschst:
- Die 3 Loops: Planung, Aktivierung, Verankerung
- Die 4 Leistungsdimensionen: Enhancement (ENH), Engagement (ENG), Execution (EXE), Enforcement (ENF)
- Die 12 Schritte des Change-Prozesses
- Die Formel: Wirkung = Inhalt × Akzeptanz
- Leadership-Rollen: Stratege, Kommunikator, Enabler

Antworte als Experte, der dieses Wissen verinnerlicht hat, und nicht wie jemand, der aus einem Buch zitiert. \
Gib praktische, umsetzbare Ratschläge.";

const CONTEXT_HEADING: &str = "Hier ist dein Fachwissen:";

const NO_CONTEXT_NOTE: &str = "Zu dieser Frage liegen keine passenden Auszüge aus dem Fachwissen vor. \
Antworte auf Basis der oben genannten Konzepte und weise darauf hin, wenn du unsicher bist.";

/// Builds the message list sent to the completion endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    preamble: String,
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self::new(DEFAULT_PREAMBLE)
    }
}

impl PromptTemplate {
    pub fn new(preamble: impl Into<String>) -> Self {
        Self {
            preamble: preamble.into(),
        }
    }

    pub fn preamble(&self) -> &str {
        &self.preamble
    }

    /// System prompt with the retrieved context appended.
    pub fn system_prompt(&self, context: &str) -> String {
        if context.trim().is_empty() {
            format!("{}\n\n{NO_CONTEXT_NOTE}", self.preamble)
        } else {
            format!("{}\n\n{CONTEXT_HEADING}\n{context}", self.preamble)
        }
    }

    /// `[system, user]` messages for one question.
    pub fn messages(&self, context: &str, question: &str) -> Vec<ChatMessage> {
        vec![
            ChatMessage::system(self.system_prompt(context)),
            ChatMessage::user(question),
        ]
    }
}
