#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandToken {
    Start,
    Help,
    Clear,
    History,
    Status,
    Dump,
    Log,
    Model,
    Reset,
    Exit,
}

/// Recognized tokens in completion order.
pub const COMMAND_TOKENS: [CommandToken; 10] = [
    CommandToken::Start,
    CommandToken::Help,
    CommandToken::Clear,
    CommandToken::History,
    CommandToken::Status,
    CommandToken::Dump,
    CommandToken::Log,
    CommandToken::Model,
    CommandToken::Reset,
    CommandToken::Exit,
];

impl CommandToken {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Start => "START",
            Self::Help => "HELP",
            Self::Clear => "CLEAR",
            Self::History => "HISTORY",
            Self::Status => "STATUS",
            Self::Dump => "DUMP",
            Self::Log => "LOG",
            Self::Model => "MODEL",
            Self::Reset => "RESET",
            Self::Exit => "EXIT",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Self::Start => "Begin interaction",
            Self::Help => "Show this help",
            Self::Clear => "Clear screen",
            Self::History => "Show conversation history",
            Self::Status => "Show system status",
            Self::Dump => "Dump internal state",
            Self::Log => "Show log location",
            Self::Model => "Show model configuration",
            Self::Reset => "Reset session and lockout",
            Self::Exit => "Exit terminal",
        }
    }
}

/// Classified submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submission {
    Command(CommandToken),
    FreeText(String),
}

/// Matches the whole trimmed input against the command tokens, ignoring case.
pub fn parse_command(input: &str) -> Option<CommandToken> {
    let trimmed = input.trim();
    COMMAND_TOKENS
        .into_iter()
        .find(|token| token.as_str().eq_ignore_ascii_case(trimmed))
}

/// Classifies a raw line. Returns `None` for blank input.
pub fn classify(input: &str) -> Option<Submission> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return None;
    }

    Some(match parse_command(trimmed) {
        Some(token) => Submission::Command(token),
        None => Submission::FreeText(trimmed.to_string()),
    })
}

/// First token, in declared order, that starts with `partial` ignoring case.
pub fn autocomplete(partial: &str) -> Option<&'static str> {
    let partial = partial.trim();
    if partial.is_empty() {
        return None;
    }

    let upper = partial.to_ascii_uppercase();
    COMMAND_TOKENS
        .into_iter()
        .map(CommandToken::as_str)
        .find(|token| token.starts_with(&upper))
}
