//! Command table and line parser.

/// Shop identifier of the only purchasable item.
pub const RENAME_TICKET: &str = "rename-ticket";

/// Every command the interpreter recognizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandKind {
    Balance,
    Shop,
    Purchase,
    Rename,
    Deposit,
    Withdraw,
    Leaderboard,
    Grant,
    StressEcho,
    Analytics,
    Minigame,
    Wager,
    Help,
}

impl CommandKind {
    /// All commands in help order.
    pub const ALL: [CommandKind; 13] = [
        CommandKind::Balance,
        CommandKind::Shop,
        CommandKind::Purchase,
        CommandKind::Rename,
        CommandKind::Deposit,
        CommandKind::Withdraw,
        CommandKind::Leaderboard,
        CommandKind::Grant,
        CommandKind::StressEcho,
        CommandKind::Analytics,
        CommandKind::Minigame,
        CommandKind::Wager,
        CommandKind::Help,
    ];

    /// Case-sensitive lookup of a leading token.
    pub fn from_token(token: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.token() == token)
    }

    pub fn token(&self) -> &'static str {
        match self {
            CommandKind::Balance => "!balance",
            CommandKind::Shop => "!shop",
            CommandKind::Purchase => "!buy",
            CommandKind::Rename => "!rename",
            CommandKind::Deposit => "!deposit",
            CommandKind::Withdraw => "!withdraw",
            CommandKind::Leaderboard => "!ranking",
            CommandKind::Grant => "!grant",
            CommandKind::StressEcho => "!flood",
            CommandKind::Analytics => "!stats",
            CommandKind::Minigame => "!roll",
            CommandKind::Wager => "!rps",
            CommandKind::Help => "!help",
        }
    }

    pub fn usage(&self) -> &'static str {
        match self {
            CommandKind::Purchase => "!buy <item>",
            CommandKind::Rename => "!rename <new name>",
            CommandKind::Deposit => "!deposit [amount]",
            CommandKind::Withdraw => "!withdraw [amount]",
            CommandKind::Grant => "!grant <name> <amount>",
            CommandKind::Wager => "!rps <rock|paper|scissors> <amount>",
            other => other.token(),
        }
    }

    pub fn summary(&self) -> &'static str {
        match self {
            CommandKind::Balance => "show your points and inventory",
            CommandKind::Shop => "list items for sale",
            CommandKind::Purchase => "buy an item from the shop",
            CommandKind::Rename => "change your display name (needs a rename ticket)",
            CommandKind::Deposit => "move points into your bank (all if no amount)",
            CommandKind::Withdraw => "move savings back to your points (all if no amount)",
            CommandKind::Leaderboard => "show the richest identities",
            CommandKind::Grant => "admin only: give points to someone",
            CommandKind::StressEcho => "reply with a large fixed payload",
            CommandKind::Analytics => "show user count, total and mean points",
            CommandKind::Minigame => "roll a die against the house",
            CommandKind::Wager => "bet points on rock-paper-scissors",
            CommandKind::Help => "show this list",
        }
    }

    /// Label used in logs.
    pub fn name(&self) -> &'static str {
        self.token().trim_start_matches('!')
    }
}

/// A recognized command and its raw arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCommand {
    pub kind: CommandKind,
    /// Whitespace-separated arguments after the command token.
    pub args: Vec<String>,
    /// Everything after the command token, trimmed.
    pub rest: String,
}

/// Parse a chat line. `None` means the line is ordinary chat.
pub fn parse_command(text: &str) -> Option<ParsedCommand> {
    let trimmed = text.trim_start();
    let token = trimmed.split_whitespace().next()?;
    let kind = CommandKind::from_token(token)?;
    let rest = trimmed[token.len()..].trim().to_string();
    let args = rest.split_whitespace().map(str::to_string).collect();
    Some(ParsedCommand { kind, args, rest })
}
