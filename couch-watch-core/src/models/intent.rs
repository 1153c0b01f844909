use std::fmt;

/// Operator intents understood by the command router.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperatorIntent {
    Help,
    Mute,
    Unmute,
    Enable,
    Disable,
    Capture,
    Preview,
    CreateRoi,
    Raise,
}

impl OperatorIntent {
    pub const ALL: [OperatorIntent; 9] = [
        Self::Help,
        Self::Mute,
        Self::Unmute,
        Self::Raise,
        Self::Enable,
        Self::Disable,
        Self::Capture,
        Self::Preview,
        Self::CreateRoi,
    ];

    /// Parse a chat-style command such as `/mute` or `/enable@watchbot`.
    ///
    /// The leading slash is optional and matching is case insensitive.
    /// Anything after the first whitespace is ignored.
    pub fn parse(text: &str) -> Option<Self> {
        let word = text.split_whitespace().next()?;
        let word = word.strip_prefix('/').unwrap_or(word);
        let word = word.split('@').next().unwrap_or(word).to_ascii_lowercase();

        let intent = match word.as_str() {
            "help" | "start" => Self::Help,
            "mute" => Self::Mute,
            "unmute" => Self::Unmute,
            "enable" => Self::Enable,
            "disable" => Self::Disable,
            "capture" => Self::Capture,
            "preview" => Self::Preview,
            "createroi" | "create-roi" => Self::CreateRoi,
            "raise" => Self::Raise,
            _ => return None,
        };
        Some(intent)
    }

    pub fn command(&self) -> &'static str {
        match self {
            Self::Help => "/help",
            Self::Mute => "/mute",
            Self::Unmute => "/unmute",
            Self::Enable => "/enable",
            Self::Disable => "/disable",
            Self::Capture => "/capture",
            Self::Preview => "/preview",
            Self::CreateRoi => "/createroi",
            Self::Raise => "/raise",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Help => "show this message",
            Self::Mute => "do not sound the alarm after a detection",
            Self::Unmute => "sound the alarm after a detection",
            Self::Raise => "play the alarm sound once",
            Self::Enable => "start watching the region of interest",
            Self::Disable => "stop watching the region of interest",
            Self::Capture => "take a photo",
            Self::Preview => "take a photo with the region of interest overlay",
            Self::CreateRoi => "draw a new region of interest",
        }
    }
}

impl fmt::Display for OperatorIntent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.command())
    }
}

/// An inbound message from the operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperatorMessage {
    /// Free text, usually a `/command`.
    Command(String),
    /// Encoded image of the operator's region-of-interest drawing.
    Drawing(Vec<u8>),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_slash_commands() {
        assert_eq!(OperatorIntent::parse("/mute"), Some(OperatorIntent::Mute));
        assert_eq!(OperatorIntent::parse("unmute"), Some(OperatorIntent::Unmute));
        assert_eq!(OperatorIntent::parse("/CreateROI"), Some(OperatorIntent::CreateRoi));
        assert_eq!(OperatorIntent::parse("  /enable now"), Some(OperatorIntent::Enable));
    }

    #[test]
    fn strips_bot_suffix() {
        assert_eq!(
            OperatorIntent::parse("/capture@couch_watch_bot"),
            Some(OperatorIntent::Capture)
        );
    }

    #[test]
    fn unknown_and_empty_text_ignored() {
        assert_eq!(OperatorIntent::parse("/setvolume 3"), None);
        assert_eq!(OperatorIntent::parse("hello"), None);
        assert_eq!(OperatorIntent::parse("   "), None);
    }

    #[test]
    fn every_intent_round_trips_through_its_command() {
        for intent in OperatorIntent::ALL {
            assert_eq!(OperatorIntent::parse(intent.command()), Some(intent));
        }
    }
}
