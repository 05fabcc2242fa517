//! The handful of product strings the core emits itself. The full
//! translation table lives with the UI; only conversation titles and the
//! error label ever originate server-side.

use crate::models::Language;

impl Language {
    pub fn default_conversation_title(self) -> &'static str {
        match self {
            Language::Fr => "Nouvelle Conversation",
            Language::Ar => "محادثة جديدة",
        }
    }

    pub fn error_title(self) -> &'static str {
        match self {
            Language::Fr => "Une erreur est survenue",
            Language::Ar => "حدث خطأ",
        }
    }

    pub fn quiz_conversation_title(self, topic: &str) -> String {
        match self {
            Language::Fr => format!("Quiz sur {topic}"),
            Language::Ar => format!("اختبار عن {topic}"),
        }
    }
}
