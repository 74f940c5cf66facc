//! Executes parsed `perm` commands against the registry and renders
//! plain-text replies for the chat channel.

use std::fmt::Write as _;

use super::parser::{PermCommand, WebUiAction};
use crate::registry::PermissionRegistry;
use crate::store::PermissionLevel;
use crate::webui::{WebUiServer, WebUiStatus};

const HELP_TEXT: &str = "\
perm list: enabled plugins and their command counts
perm plugin <name>: commands of a plugin with current levels
perm set plugin <name> <admin|member>: set every command of a plugin
perm set command <plugin> <command> <admin|member>: set one command
perm alias <plugin> <command> [add <alias> | remove <alias>]: manage aliases
perm name <plugin> <command> <new-name>: set a display name
perm webui <start|stop|status>: control the admin web UI";

pub async fn handle_command(
    command: PermCommand,
    registry: &PermissionRegistry,
    webui: &WebUiServer,
) -> String {
    match command {
        PermCommand::Help => HELP_TEXT.to_string(),
        PermCommand::Usage(usage) => usage.to_string(),
        PermCommand::List => render_plugin_list(registry),
        PermCommand::Plugin { name } => render_plugin(registry, &name),
        PermCommand::SetPlugin { name, level } => set_plugin(registry, &name, &level),
        PermCommand::SetCommand {
            plugin,
            command,
            level,
        } => set_command(registry, &plugin, &command, &level),
        PermCommand::AliasList { plugin, command } => {
            match registry.command_aliases(&plugin, &command) {
                Ok(aliases) if aliases.is_empty() => {
                    format!("{plugin}/{command} has no aliases")
                }
                Ok(aliases) => format!("aliases of {plugin}/{command}: {}", aliases.join(", ")),
                Err(err) => err.to_string(),
            }
        }
        PermCommand::AliasAdd {
            plugin,
            command,
            alias,
        } => alias_add(registry, &plugin, &command, alias),
        PermCommand::AliasRemove {
            plugin,
            command,
            alias,
        } => alias_remove(registry, &plugin, &command, &alias),
        PermCommand::SetName {
            plugin,
            command,
            name,
        } => match registry.rename_command(&plugin, &command, &name) {
            Ok(()) => format!("renamed {plugin}/{command} to {name}"),
            Err(err) => err.to_string(),
        },
        PermCommand::WebUi { action } => run_webui_action(webui, action).await,
    }
}

fn render_plugin_list(registry: &PermissionRegistry) -> String {
    let plugins = registry.list_plugins();
    if plugins.is_empty() {
        return "no enabled plugins".to_string();
    }
    let mut out = String::from("enabled plugins:");
    for plugin in plugins {
        let _ = write!(
            out,
            "\n  {}: {} commands ({} groups)",
            plugin.name, plugin.command_count, plugin.group_count
        );
    }
    out
}

fn render_plugin(registry: &PermissionRegistry, name: &str) -> String {
    let statuses = match registry.list_commands(name) {
        Ok(statuses) => statuses,
        Err(err) => return err.to_string(),
    };
    if statuses.is_empty() {
        return format!("plugin {name} has no commands");
    }
    let mut out = format!("commands of {name}:");
    for status in statuses {
        let kind = if status.is_group { " (group)" } else { "" };
        let _ = write!(out, "\n  [{}] {}{kind}", status.level, status.name);
        if !status.aliases.is_empty() {
            let _ = write!(out, " (aliases: {})", status.aliases.join(", "));
        }
    }
    out
}

fn set_plugin(registry: &PermissionRegistry, name: &str, level: &str) -> String {
    let level = match level.parse::<PermissionLevel>() {
        Ok(level) => level,
        Err(err) => return err.to_string(),
    };
    match registry.set_plugin_level(name, level) {
        Ok(outcome) => format!(
            "set {}/{} commands of {name} to {level}",
            outcome.applied, outcome.total
        ),
        Err(err) => err.to_string(),
    }
}

fn set_command(registry: &PermissionRegistry, plugin: &str, command: &str, level: &str) -> String {
    let level = match level.parse::<PermissionLevel>() {
        Ok(level) => level,
        Err(err) => return err.to_string(),
    };
    match registry.set_command_level(plugin, command, level) {
        Ok(()) => format!("set {plugin}/{command} to {level}"),
        Err(err) => err.to_string(),
    }
}

fn alias_add(registry: &PermissionRegistry, plugin: &str, command: &str, alias: String) -> String {
    let mut aliases = match registry.command_aliases(plugin, command) {
        Ok(aliases) => aliases,
        Err(err) => return err.to_string(),
    };
    if aliases.contains(&alias) {
        return format!("{plugin}/{command} already has alias {alias}");
    }
    aliases.push(alias.clone());
    match registry.set_command_aliases(plugin, command, aliases) {
        Ok(()) => format!("added alias {alias} to {plugin}/{command}"),
        Err(err) => err.to_string(),
    }
}

fn alias_remove(registry: &PermissionRegistry, plugin: &str, command: &str, alias: &str) -> String {
    let mut aliases = match registry.command_aliases(plugin, command) {
        Ok(aliases) => aliases,
        Err(err) => return err.to_string(),
    };
    let before = aliases.len();
    aliases.retain(|a| a != alias);
    if aliases.len() == before {
        return format!("{plugin}/{command} has no alias {alias}");
    }
    match registry.set_command_aliases(plugin, command, aliases) {
        Ok(()) => format!("removed alias {alias} from {plugin}/{command}"),
        Err(err) => err.to_string(),
    }
}

async fn run_webui_action(webui: &WebUiServer, action: WebUiAction) -> String {
    match action {
        WebUiAction::Status => format!("admin web UI is {}", webui.status()),
        WebUiAction::Start => match webui.status() {
            WebUiStatus::Running | WebUiStatus::Starting => "admin web UI is already running".to_string(),
            WebUiStatus::Stopped | WebUiStatus::Stopping => match webui.start().await {
                Ok(WebUiStatus::Running) => {
                    let port = webui.bound_port().unwrap_or_default();
                    format!(
                        "admin web UI started at http://{}:{port}/admin: log in with the configured secret key",
                        webui.display_host()
                    )
                }
                Ok(status) => format!("admin web UI did not start (now {status})"),
                Err(err) => format!("failed to start admin web UI: {err}"),
            },
        },
        WebUiAction::Stop => match webui.status() {
            WebUiStatus::Stopped | WebUiStatus::Stopping => "admin web UI is not running".to_string(),
            WebUiStatus::Running | WebUiStatus::Starting => {
                webui.stop().await;
                "admin web UI stopped".to_string()
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{CommandDescriptor, PluginDescriptor, StaticCatalog};
    use crate::commands::parse_command;
    use crate::config::WebUiConfig;
    use crate::store::PermissionStore;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn make_registry(dir: &TempDir) -> Arc<PermissionRegistry> {
        let catalog = StaticCatalog::new(vec![PluginDescriptor {
            name: "astrbot".into(),
            enabled: true,
            commands: vec![
                CommandDescriptor {
                    name: "help".into(),
                    is_group: false,
                    description: String::new(),
                },
                CommandDescriptor {
                    name: "ping".into(),
                    is_group: false,
                    description: String::new(),
                },
            ],
        }]);
        let store = PermissionStore::open(dir.path().join("alter_cmd.json")).unwrap();
        Arc::new(PermissionRegistry::new(Arc::new(catalog), Arc::new(store)))
    }

    fn make_webui(registry: Arc<PermissionRegistry>) -> WebUiServer {
        let webui = WebUiConfig {
            enabled: true,
            secret_key: "test-secret".into(),
            host: "127.0.0.1".into(),
            port: 0,
        };
        WebUiServer::new(&webui, registry, false)
    }

    async fn run(line: &str, registry: &PermissionRegistry, webui: &WebUiServer) -> String {
        let command = parse_command(line).unwrap();
        handle_command(command, registry, webui).await
    }

    #[tokio::test]
    async fn list_names_plugins_and_counts() {
        let dir = TempDir::new().unwrap();
        let registry = make_registry(&dir);
        let webui = make_webui(registry.clone());

        let reply = run("perm list", &registry, &webui).await;
        assert!(reply.contains("astrbot"));
        assert!(reply.contains("2 commands"));
    }

    #[tokio::test]
    async fn set_and_show_levels() {
        let dir = TempDir::new().unwrap();
        let registry = make_registry(&dir);
        let webui = make_webui(registry.clone());

        let reply = run("perm set command astrbot ping admin", &registry, &webui).await;
        assert_eq!(reply, "set astrbot/ping to admin");

        let reply = run("perm plugin astrbot", &registry, &webui).await;
        assert!(reply.contains("[admin] ping"));
        assert!(reply.contains("[member] help"));
    }

    #[tokio::test]
    async fn invalid_level_reply_names_the_value() {
        let dir = TempDir::new().unwrap();
        let registry = make_registry(&dir);
        let webui = make_webui(registry.clone());

        let reply = run("perm set command astrbot ping owner", &registry, &webui).await;
        assert!(reply.contains("owner"));
        assert!(registry.store().list_all().unwrap().is_empty());
    }

    #[tokio::test]
    async fn unknown_plugin_reply_names_it() {
        let dir = TempDir::new().unwrap();
        let registry = make_registry(&dir);
        let webui = make_webui(registry.clone());

        let reply = run("perm plugin ghost", &registry, &webui).await;
        assert!(reply.contains("ghost"));
    }

    #[tokio::test]
    async fn alias_add_list_remove() {
        let dir = TempDir::new().unwrap();
        let registry = make_registry(&dir);
        let webui = make_webui(registry.clone());

        let reply = run("perm alias astrbot ping add p", &registry, &webui).await;
        assert_eq!(reply, "added alias p to astrbot/ping");

        let reply = run("perm alias astrbot ping add p", &registry, &webui).await;
        assert_eq!(reply, "astrbot/ping already has alias p");

        let reply = run("perm alias astrbot ping", &registry, &webui).await;
        assert_eq!(reply, "aliases of astrbot/ping: p");

        let reply = run("perm alias astrbot ping remove p", &registry, &webui).await;
        assert_eq!(reply, "removed alias p from astrbot/ping");

        let reply = run("perm alias astrbot ping", &registry, &webui).await;
        assert_eq!(reply, "astrbot/ping has no aliases");
    }

    #[tokio::test]
    async fn webui_lifecycle_via_chat() {
        let dir = TempDir::new().unwrap();
        let registry = make_registry(&dir);
        let webui = make_webui(registry.clone());

        let reply = run("perm webui status", &registry, &webui).await;
        assert_eq!(reply, "admin web UI is stopped");

        let reply = run("perm webui start", &registry, &webui).await;
        assert!(reply.contains("http://127.0.0.1:"));

        let reply = run("perm webui start", &registry, &webui).await;
        assert_eq!(reply, "admin web UI is already running");

        let reply = run("perm webui stop", &registry, &webui).await;
        assert_eq!(reply, "admin web UI stopped");
    }
}
