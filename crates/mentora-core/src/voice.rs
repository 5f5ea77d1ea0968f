use serde::{Deserialize, Serialize};

/// The examiner voices offered to candidates.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Voice {
    Algenib,
    #[default]
    Achird,
    Achernar,
    Aoede,
}

impl Voice {
    pub const ALL: [Voice; 4] = [Voice::Algenib, Voice::Achird, Voice::Achernar, Voice::Aoede];

    /// Label shown to the candidate and accepted as the `speaker` selector.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Algenib => "Pria - Algenib (Chirp HD)",
            Self::Achird => "Pria - Achird (Chirp HD)",
            Self::Achernar => "Wanita - Achernar (Chirp HD)",
            Self::Aoede => "Wanita - Aoede (Chirp HD)",
        }
    }

    /// Voice name understood by the speech synthesis API.
    pub fn voice_name(&self) -> &'static str {
        match self {
            Self::Algenib => "id-ID-Chirp3-HD-Algenib",
            Self::Achird => "id-ID-Chirp3-HD-Achird",
            Self::Achernar => "id-ID-Chirp3-HD-Achernar",
            Self::Aoede => "id-ID-Chirp3-HD-Aoede",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|v| v.label() == label)
    }

    /// Resolve an optional selector, falling back to `default` when it is
    /// missing or unknown.
    pub fn select(selector: Option<&str>, default: Voice) -> Self {
        selector.and_then(Self::from_label).unwrap_or(default)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_round_trip() {
        for voice in Voice::ALL {
            assert_eq!(Voice::from_label(voice.label()), Some(voice));
        }
    }

    #[test]
    fn unknown_selector_falls_back() {
        assert_eq!(Voice::select(Some("Robot"), Voice::Achird), Voice::Achird);
        assert_eq!(Voice::select(None, Voice::Aoede), Voice::Aoede);
        assert_eq!(
            Voice::select(Some("Wanita - Aoede (Chirp HD)"), Voice::Achird),
            Voice::Aoede
        );
    }

    #[test]
    fn default_is_achird() {
        assert_eq!(Voice::default().voice_name(), "id-ID-Chirp3-HD-Achird");
    }
}
