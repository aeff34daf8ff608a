//! Slash-command parsing. Command semantics live in the interactive loop;
//! this module only recognizes the command and carries its raw argument, so
//! the loop can print usage hints for malformed arguments instead of losing
//! them at parse time.

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlashCommand {
    Help,
    Sessions,
    New { title: String },
    Switch { arg: String },
    Delete { arg: String },
    Clear,
    Exit,
    Unknown { name: String },
}

/// Parses a slash command from an input line. Returns `None` if the line
/// does not start with `/`; an unrecognized command name parses to
/// [`SlashCommand::Unknown`] so the loop can point at `/help`.
pub fn parse_slash_command(content: &str) -> Option<SlashCommand> {
    let trimmed = content.trim();
    let rest = trimmed.strip_prefix('/')?;

    let (name, args) = match rest.split_once(char::is_whitespace) {
        Some((name, args)) => (name, args.trim()),
        None => (rest, ""),
    };

    match name.to_lowercase().as_str() {
        "help" => Some(SlashCommand::Help),
        "sessions" => Some(SlashCommand::Sessions),
        "new" => Some(SlashCommand::New {
            title: strip_quotes(args).to_string(),
        }),
        "switch" => Some(SlashCommand::Switch {
            arg: args.to_string(),
        }),
        "delete" => Some(SlashCommand::Delete {
            arg: args.to_string(),
        }),
        "clear" => Some(SlashCommand::Clear),
        "exit" => Some(SlashCommand::Exit),
        other => Some(SlashCommand::Unknown {
            name: other.to_string(),
        }),
    }
}

/// Session titles may be quoted (`/new "Q3 Revenue"`); the quotes are not
/// part of the title.
fn strip_quotes(text: &str) -> &str {
    let text = text.trim();
    text.strip_prefix('"')
        .and_then(|t| t.strip_suffix('"'))
        .or_else(|| text.strip_prefix('\'').and_then(|t| t.strip_suffix('\'')))
        .unwrap_or(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_slash_input_is_not_a_command() {
        assert_eq!(parse_slash_command("show revenue"), None);
        assert_eq!(parse_slash_command("  count / users"), None);
    }

    #[test]
    fn bare_commands_parse() {
        assert_eq!(parse_slash_command("/help"), Some(SlashCommand::Help));
        assert_eq!(parse_slash_command("/sessions"), Some(SlashCommand::Sessions));
        assert_eq!(parse_slash_command("/clear"), Some(SlashCommand::Clear));
        assert_eq!(parse_slash_command("  /exit  "), Some(SlashCommand::Exit));
    }

    #[test]
    fn command_names_are_case_insensitive() {
        assert_eq!(parse_slash_command("/HELP"), Some(SlashCommand::Help));
        assert_eq!(parse_slash_command("/Exit"), Some(SlashCommand::Exit));
    }

    #[test]
    fn new_strips_surrounding_quotes() {
        assert_eq!(
            parse_slash_command("/new \"Q3 Revenue\""),
            Some(SlashCommand::New {
                title: "Q3 Revenue".to_string()
            })
        );
        assert_eq!(
            parse_slash_command("/new 'Ad hoc'"),
            Some(SlashCommand::New {
                title: "Ad hoc".to_string()
            })
        );
        assert_eq!(
            parse_slash_command("/new Plain title"),
            Some(SlashCommand::New {
                title: "Plain title".to_string()
            })
        );
    }

    #[test]
    fn new_without_args_has_empty_title() {
        assert_eq!(
            parse_slash_command("/new"),
            Some(SlashCommand::New {
                title: String::new()
            })
        );
    }

    #[test]
    fn switch_and_delete_keep_raw_args() {
        assert_eq!(
            parse_slash_command("/switch 3"),
            Some(SlashCommand::Switch {
                arg: "3".to_string()
            })
        );
        // Non-numeric args survive parsing so the loop can show a hint.
        assert_eq!(
            parse_slash_command("/delete banana"),
            Some(SlashCommand::Delete {
                arg: "banana".to_string()
            })
        );
    }

    #[test]
    fn unrecognized_name_parses_to_unknown() {
        assert_eq!(
            parse_slash_command("/compact"),
            Some(SlashCommand::Unknown {
                name: "compact".to_string()
            })
        );
    }
}
