//! Tokenizer for the `perm` command group.
//!
//! Parsing never touches the registry: unknown plugins, commands, and
//! levels surface when the command is executed, so the parser only has
//! to decide the shape of the request.

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PermCommand {
    /// `perm list`
    List,
    /// `perm plugin <name>`
    Plugin { name: String },
    /// `perm set plugin <name> <admin|member>`: every command of the plugin.
    SetPlugin { name: String, level: String },
    /// `perm set command <plugin> <command> <admin|member>`
    SetCommand {
        plugin: String,
        command: String,
        level: String,
    },
    /// `perm alias <plugin> <command>`: show aliases.
    AliasList { plugin: String, command: String },
    /// `perm alias <plugin> <command> add <alias>`
    AliasAdd {
        plugin: String,
        command: String,
        alias: String,
    },
    /// `perm alias <plugin> <command> remove <alias>`
    AliasRemove {
        plugin: String,
        command: String,
        alias: String,
    },
    /// `perm name <plugin> <command> <new-name>`
    SetName {
        plugin: String,
        command: String,
        name: String,
    },
    /// `perm webui <start|stop|status>`
    WebUi { action: WebUiAction },
    /// `perm` or `perm help`
    Help,
    /// Recognized subcommand with missing or malformed arguments.
    Usage(&'static str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WebUiAction {
    Start,
    Stop,
    Status,
}

pub const USAGE_PLUGIN: &str = "usage: perm plugin <name>";
pub const USAGE_SET: &str =
    "usage: perm set plugin <name> <admin|member>  or  perm set command <plugin> <command> <admin|member>";
pub const USAGE_ALIAS: &str =
    "usage: perm alias <plugin> <command> [add <alias> | remove <alias>]";
pub const USAGE_NAME: &str = "usage: perm name <plugin> <command> <new-name>";
pub const USAGE_WEBUI: &str = "usage: perm webui <start|stop|status>";

/// Returns `None` when the line is not a `perm` command at all; the host
/// should then ignore it. A leading `/` is accepted and stripped.
pub fn parse_command(line: &str) -> Option<PermCommand> {
    let line = line.trim();
    let line = line.strip_prefix('/').unwrap_or(line);
    let mut words = line.split_whitespace();
    if words.next()? != "perm" {
        return None;
    }
    let args: Vec<&str> = words.collect();

    let command = match args.as_slice() {
        [] | ["help"] => PermCommand::Help,
        ["list"] => PermCommand::List,
        ["plugin", name] => PermCommand::Plugin {
            name: (*name).to_string(),
        },
        ["plugin", ..] => PermCommand::Usage(USAGE_PLUGIN),
        ["set", "plugin", name, level] => PermCommand::SetPlugin {
            name: (*name).to_string(),
            level: (*level).to_string(),
        },
        ["set", "command", plugin, command, level] => PermCommand::SetCommand {
            plugin: (*plugin).to_string(),
            command: (*command).to_string(),
            level: (*level).to_string(),
        },
        ["set", ..] => PermCommand::Usage(USAGE_SET),
        ["alias", plugin, command] => PermCommand::AliasList {
            plugin: (*plugin).to_string(),
            command: (*command).to_string(),
        },
        ["alias", plugin, command, "add", alias] => PermCommand::AliasAdd {
            plugin: (*plugin).to_string(),
            command: (*command).to_string(),
            alias: (*alias).to_string(),
        },
        ["alias", plugin, command, "remove", alias] => PermCommand::AliasRemove {
            plugin: (*plugin).to_string(),
            command: (*command).to_string(),
            alias: (*alias).to_string(),
        },
        ["alias", ..] => PermCommand::Usage(USAGE_ALIAS),
        ["name", plugin, command, name] => PermCommand::SetName {
            plugin: (*plugin).to_string(),
            command: (*command).to_string(),
            name: (*name).to_string(),
        },
        ["name", ..] => PermCommand::Usage(USAGE_NAME),
        ["webui", "start"] => PermCommand::WebUi {
            action: WebUiAction::Start,
        },
        ["webui", "stop"] => PermCommand::WebUi {
            action: WebUiAction::Stop,
        },
        ["webui", "status"] => PermCommand::WebUi {
            action: WebUiAction::Status,
        },
        ["webui", ..] => PermCommand::Usage(USAGE_WEBUI),
        _ => PermCommand::Help,
    };
    Some(command)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_perm_lines_are_ignored() {
        assert_eq!(parse_command("hello there"), None);
        assert_eq!(parse_command("permission list"), None);
        assert_eq!(parse_command(""), None);
    }

    #[test]
    fn leading_slash_and_whitespace_are_accepted() {
        assert_eq!(parse_command("/perm list"), Some(PermCommand::List));
        assert_eq!(parse_command("  perm   list  "), Some(PermCommand::List));
    }

    #[test]
    fn bare_perm_is_help() {
        assert_eq!(parse_command("perm"), Some(PermCommand::Help));
        assert_eq!(parse_command("perm help"), Some(PermCommand::Help));
    }

    #[test]
    fn set_keyword_selects_plugin_or_command_form() {
        assert_eq!(
            parse_command("perm set plugin astrbot admin"),
            Some(PermCommand::SetPlugin {
                name: "astrbot".into(),
                level: "admin".into(),
            })
        );
        assert_eq!(
            parse_command("perm set command astrbot ping member"),
            Some(PermCommand::SetCommand {
                plugin: "astrbot".into(),
                command: "ping".into(),
                level: "member".into(),
            })
        );
        assert_eq!(
            parse_command("perm set astrbot admin"),
            Some(PermCommand::Usage(USAGE_SET))
        );
        assert_eq!(
            parse_command("perm set plugin astrbot"),
            Some(PermCommand::Usage(USAGE_SET))
        );
    }

    #[test]
    fn parser_does_not_validate_levels() {
        // Validation happens on execution so the reply can name the value.
        assert_eq!(
            parse_command("perm set command astrbot ping owner"),
            Some(PermCommand::SetCommand {
                plugin: "astrbot".into(),
                command: "ping".into(),
                level: "owner".into(),
            })
        );
    }

    #[test]
    fn alias_forms() {
        assert_eq!(
            parse_command("perm alias astrbot ping"),
            Some(PermCommand::AliasList {
                plugin: "astrbot".into(),
                command: "ping".into(),
            })
        );
        assert_eq!(
            parse_command("perm alias astrbot ping add p"),
            Some(PermCommand::AliasAdd {
                plugin: "astrbot".into(),
                command: "ping".into(),
                alias: "p".into(),
            })
        );
        assert_eq!(
            parse_command("perm alias astrbot ping drop p"),
            Some(PermCommand::Usage(USAGE_ALIAS))
        );
    }

    #[test]
    fn webui_actions() {
        assert_eq!(
            parse_command("perm webui start"),
            Some(PermCommand::WebUi {
                action: WebUiAction::Start,
            })
        );
        assert_eq!(
            parse_command("perm webui restart"),
            Some(PermCommand::Usage(USAGE_WEBUI))
        );
        assert_eq!(
            parse_command("perm webui"),
            Some(PermCommand::Usage(USAGE_WEBUI))
        );
    }
}
