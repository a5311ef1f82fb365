use std::str::FromStr;

use strum::{AsRefStr, EnumIter, EnumString, IntoEnumIterator, IntoStaticStr};

/// Commands that can be invoked by starting a message with a leading slash.
/// They are handled locally and never reach the server.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, EnumIter, AsRefStr, IntoStaticStr,
)]
#[strum(serialize_all = "kebab-case")]
pub enum SlashCommand {
    /// Show help
    Help,
    /// Clear the conversation log
    Clear,
    /// Exit the application
    Bye,
}

impl SlashCommand {
    /// User-visible description shown in help.
    pub fn description(self) -> &'static str {
        match self {
            SlashCommand::Help => "mostra os comandos disponíveis",
            SlashCommand::Clear => "limpa a conversa da tela",
            SlashCommand::Bye => "sai do Astrolino",
        }
    }

    /// Command string without the leading '/'.
    pub fn command(self) -> &'static str {
        self.into()
    }
}

/// Parse a slash command from user input. Unknown commands are not commands:
/// they are sent to the server as ordinary text.
pub fn parse_slash_command(input: &str) -> Option<SlashCommand> {
    let head = input.trim().strip_prefix('/')?.split_whitespace().next()?;

    SlashCommand::from_str(head)
        .ok()
        .or_else(|| match head.to_lowercase().as_str() {
            "q" | "quit" | "exit" | "sair" => Some(SlashCommand::Bye),
            "h" | "ajuda" => Some(SlashCommand::Help),
            "limpar" => Some(SlashCommand::Clear),
            _ => None,
        })
}

/// Help text, as markdown, for all available commands
pub fn get_help_text() -> String {
    let mut help = String::from("**Comandos disponíveis**\n\n");
    for command in SlashCommand::iter() {
        help.push_str(&format!("- `/{}` — {}\n", command.command(), command.description()));
    }
    help.push_str("\nEnter envia, Shift+Enter quebra a linha, PageUp/PageDown rolam a conversa e Esc sai.");
    help
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_commands_and_aliases() {
        assert_eq!(parse_slash_command("/help"), Some(SlashCommand::Help));
        assert_eq!(parse_slash_command("  /clear  "), Some(SlashCommand::Clear));
        assert_eq!(parse_slash_command("/q"), Some(SlashCommand::Bye));
        assert_eq!(parse_slash_command("/sair agora"), Some(SlashCommand::Bye));
    }

    #[test]
    fn ordinary_text_is_not_a_command() {
        assert_eq!(parse_slash_command("olá"), None);
        assert_eq!(parse_slash_command("/plutão é planeta?"), None);
        assert_eq!(parse_slash_command("/"), None);
    }

    #[test]
    fn help_lists_every_command() {
        let help = get_help_text();
        for command in SlashCommand::iter() {
            assert!(help.contains(&format!("/{}", command.command())));
        }
    }
}
