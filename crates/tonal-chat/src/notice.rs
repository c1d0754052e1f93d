//! User-facing notices in English and Brazilian Portuguese.
//!
//! Errors carry technical details for the log; what the user sees is a
//! short localized notice built here.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Local};

use crate::error::{ChatError, TurnStage};

/// Language of user-facing text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Locale {
    #[default]
    En,
    PtBr,
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locale::En => write!(f, "en"),
            Locale::PtBr => write!(f, "pt-BR"),
        }
    }
}

impl FromStr for Locale {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('_', "-").as_str() {
            "en" | "en-us" | "en-gb" => Ok(Locale::En),
            "pt" | "pt-br" => Ok(Locale::PtBr),
            other => Err(format!("unsupported locale: {}", other)),
        }
    }
}

/// A short toast-style message for the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub title: String,
    pub description: String,
    /// Rendered as an error rather than a confirmation.
    pub destructive: bool,
}

impl Notice {
    fn info(title: &str, description: String) -> Self {
        Self {
            title: title.to_string(),
            description,
            destructive: false,
        }
    }

    fn error(locale: Locale, description: &str) -> Self {
        let title = match locale {
            Locale::En => "Error",
            Locale::PtBr => "Erro",
        };
        Self {
            title: title.to_string(),
            description: description.to_string(),
            destructive: true,
        }
    }

    pub fn saved(locale: Locale, name: &str) -> Self {
        match locale {
            Locale::En => Self::info("Chat saved", format!("\"{}\" was saved successfully.", name)),
            Locale::PtBr => Self::info("Chat salvo", format!("\"{}\" foi salvo com sucesso.", name)),
        }
    }

    pub fn deleted(locale: Locale, name: &str) -> Self {
        match locale {
            Locale::En => Self::info("Chat deleted", format!("\"{}\" was deleted.", name)),
            Locale::PtBr => Self::info("Chat excluído", format!("\"{}\" foi excluído.", name)),
        }
    }

    pub fn message_failed(locale: Locale) -> Self {
        Self::error(
            locale,
            match locale {
                Locale::En => "Could not process the message. Please try again.",
                Locale::PtBr => "Não foi possível processar a mensagem. Tente novamente.",
            },
        )
    }

    pub fn audio_failed(locale: Locale) -> Self {
        Self::error(
            locale,
            match locale {
                Locale::En => "Could not process the audio. Please try again.",
                Locale::PtBr => "Não foi possível processar o áudio. Tente novamente.",
            },
        )
    }

    pub fn playback_failed(locale: Locale) -> Self {
        Self::error(
            locale,
            match locale {
                Locale::En => "Could not play the audio.",
                Locale::PtBr => "Não foi possível reproduzir o áudio.",
            },
        )
    }

    pub fn busy(locale: Locale) -> Self {
        Self::error(
            locale,
            match locale {
                Locale::En => "Please wait for the current reply to finish.",
                Locale::PtBr => "Aguarde a resposta atual terminar.",
            },
        )
    }

    pub fn nothing_to_save(locale: Locale) -> Self {
        Self::error(
            locale,
            match locale {
                Locale::En => "There are no messages to save yet.",
                Locale::PtBr => "Ainda não há mensagens para salvar.",
            },
        )
    }

    pub fn empty_name(locale: Locale) -> Self {
        Self::error(
            locale,
            match locale {
                Locale::En => "Please give the chat a name.",
                Locale::PtBr => "Dê um nome ao chat.",
            },
        )
    }

    pub fn storage_failed(locale: Locale) -> Self {
        Self::error(
            locale,
            match locale {
                Locale::En => "Could not access saved chats.",
                Locale::PtBr => "Não foi possível acessar os chats salvos.",
            },
        )
    }

    /// The notice shown for a failed user action.
    ///
    /// Technical details stay out of the notice; callers log them.
    pub fn for_error(locale: Locale, err: &ChatError) -> Self {
        match err {
            ChatError::Busy => Self::busy(locale),
            ChatError::NothingToSave => Self::nothing_to_save(locale),
            ChatError::EmptyName => Self::empty_name(locale),
            ChatError::Storage(_) | ChatError::SessionNotFound(_) => Self::storage_failed(locale),
            ChatError::Voice(_) => Self::audio_failed(locale),
            ChatError::Collaborator { stage, .. } => match stage {
                TurnStage::Transcription => Self::audio_failed(locale),
                TurnStage::Chat => Self::message_failed(locale),
                TurnStage::Speech | TurnStage::Playback => Self::playback_failed(locale),
            },
            ChatError::NoSpeech(_) | ChatError::MessageNotFound(_) => {
                Self::playback_failed(locale)
            }
            ChatError::EmptyMessage | ChatError::Personality(_) => {
                Self::error(locale, &err.to_string())
            }
        }
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.title, self.description)
    }
}

/// Suggested name for a new saved chat, e.g. `Chat 16/10/2026` in pt-BR.
pub fn default_chat_name(locale: Locale, now: DateTime<Local>) -> String {
    let date = match locale {
        Locale::En => now.format("%-m/%-d/%Y"),
        Locale::PtBr => now.format("%d/%m/%Y"),
    };
    format!("Chat {}", date)
}
