//! Languages supported for OCR and translation.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Language {
    English,
    Tamil,
    Hindi,
    Malayalam,
    Telugu,
    Kannada,
}

impl Language {
    pub const ALL: [Language; 6] = [
        Language::English,
        Language::Tamil,
        Language::Hindi,
        Language::Malayalam,
        Language::Telugu,
        Language::Kannada,
    ];

    /// Look up a language by code. Only the first two letters are compared,
    /// so regional codes like `ta-IN` resolve too.
    pub fn from_code(code: &str) -> Option<Self> {
        let prefix: String = code.trim().chars().take(2).collect::<String>().to_lowercase();
        Self::ALL.into_iter().find(|l| l.code() == prefix)
    }

    pub fn code(self) -> &'static str {
        match self {
            Language::English => "en",
            Language::Tamil => "ta",
            Language::Hindi => "hi",
            Language::Malayalam => "ml",
            Language::Telugu => "te",
            Language::Kannada => "kn",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Language::English => "English",
            Language::Tamil => "Tamil",
            Language::Hindi => "Hindi",
            Language::Malayalam => "Malayalam",
            Language::Telugu => "Telugu",
            Language::Kannada => "Kannada",
        }
    }

    /// BCP 47 locale used for speech synthesis.
    pub fn speech_locale(self) -> &'static str {
        match self {
            Language::English => "en-US",
            Language::Tamil => "ta-IN",
            Language::Hindi => "hi-IN",
            Language::Malayalam => "ml-IN",
            Language::Telugu => "te-IN",
            Language::Kannada => "kn-IN",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Speech locale for an arbitrary language code, falling back to `en-US`.
pub fn speech_locale(code: &str) -> &'static str {
    Language::from_code(code)
        .map(Language::speech_locale)
        .unwrap_or("en-US")
}

/// Display name for a code, or the code itself when unknown.
pub fn display_name(code: &str) -> String {
    Language::from_code(code)
        .map(|l| l.name().to_string())
        .unwrap_or_else(|| code.to_string())
}
