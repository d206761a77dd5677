use tracing::info;

/// Text-to-speech capability supplied by the host. At most one utterance is
/// active; speaking again replaces the previous one.
pub trait Speech {
    /// Voices the engine can speak with.
    fn voices(&self) -> &[Voice];
    fn speak(&mut self, text: &str, language: &str, voice: Option<&str>);
    fn cancel(&mut self);
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Utterance {
    pub text: String,
    pub language: String,
    pub voice: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Voice {
    pub name: String,
    pub language: String,
}

/// Voices that sound natural for learners, in order of preference.
pub const PREFERRED_VOICES: &[&str] = &[
    "Google US English",
    "Microsoft Zira",
    "Microsoft Jenny",
    "Microsoft Aria",
    "Samantha",
    "Google UK English Female",
];

/// Pick a voice for `language`. An explicit hint wins when it names an
/// available voice; otherwise the first voice matching a preferred name.
pub fn preferred_voice<'a>(
    voices: &'a [Voice],
    language: &str,
    hint: Option<&str>,
) -> Option<&'a Voice> {
    let candidates = || voices.iter().filter(|v| v.language == language);
    if let Some(hint) = hint
        && let Some(voice) = candidates().find(|v| v.name.contains(hint))
    {
        return Some(voice);
    }
    candidates().find(|v| PREFERRED_VOICES.iter().any(|p| v.name.contains(p)))
}

/// Speech sink without an audio engine. It tracks the active utterance and
/// logs what would be spoken.
#[derive(Debug)]
pub struct LoggedSpeech {
    voices: Vec<Voice>,
    current: Option<Utterance>,
}

impl LoggedSpeech {
    pub fn with_voices(voices: Vec<Voice>) -> Self {
        Self {
            voices,
            current: None,
        }
    }

    pub fn current(&self) -> Option<&Utterance> {
        self.current.as_ref()
    }
}

impl Default for LoggedSpeech {
    /// Advertises the common desktop voices.
    fn default() -> Self {
        let voices = [
            ("Samantha", "en-US"),
            ("Microsoft Zira", "en-US"),
            ("Google US English", "en-US"),
            ("Google UK English Female", "en-GB"),
            ("Paulina", "es-MX"),
        ]
        .into_iter()
        .map(|(name, language)| Voice {
            name: name.to_string(),
            language: language.to_string(),
        })
        .collect();
        Self::with_voices(voices)
    }
}

impl Speech for LoggedSpeech {
    fn voices(&self) -> &[Voice] {
        &self.voices
    }

    fn speak(&mut self, text: &str, language: &str, voice: Option<&str>) {
        self.cancel();
        info!(target: "speech", text, language, voice, "speak");
        self.current = Some(Utterance {
            text: text.to_string(),
            language: language.to_string(),
            voice: voice.map(str::to_string),
        });
    }

    fn cancel(&mut self) {
        self.current = None;
    }
}
