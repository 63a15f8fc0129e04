//! Builds the ssh and rsync invocations used to reach the remote host.
//!
//! Everything here is pure construction: argument vectors go to the
//! `CommandRunner`, and only the pieces interpreted by a second shell (the
//! remote command and rsync's `-e` value) are rendered as quoted strings.

use anyhow::{Context, Result};

use crate::config::{FolderMapping, SshProxy, TransferConfig};
use crate::utils::process::CommandSpec;
use crate::utils::sh_quote;

/// Remote console subcommand that writes the database dump to stdout.
pub const EXPORT_SUBCOMMAND: &str = "data-transfer:export";

/// The `ProxyCommand=...` directive tunnelling through the jump host.
pub fn proxy_directive(proxy: &SshProxy) -> String {
    let mut command = vec!["ssh".to_string(), "-W".to_string(), "%h:%p".to_string()];
    command.extend(proxy.options.iter().cloned());
    command.push(format!("{}@{}", proxy.user, proxy.host));
    format!("ProxyCommand={}", command.join(" "))
}

/// Splits configured option strings into words, honouring shell quoting.
fn split_options(options: &[String], key: &str) -> Result<Vec<String>> {
    let mut words = Vec::new();
    for option in options {
        let split = shell_words::split(option)
            .with_context(|| format!("Invalid quoting in {} entry: {}", key, option))?;
        words.extend(split);
    }
    Ok(words)
}

/// SSH options as separate argv entries, followed by the proxy clause if configured.
pub fn ssh_option_args(config: &TransferConfig) -> Result<Vec<String>> {
    let mut args = split_options(&config.ssh_options, "ssh.options")?;
    if let Some(proxy) = &config.ssh_proxy {
        args.push("-o".to_string());
        args.push(proxy_directive(proxy));
    }
    Ok(args)
}

/// Renders one word for rsync's `-e` parser, which understands single and
/// double quotes but no backslash escapes.
fn rsync_shell_word(word: &str) -> Result<String> {
    let plain = !word.is_empty()
        && !word
            .chars()
            .any(|c| c.is_whitespace() || c == '"' || c == '\'');
    if plain {
        Ok(word.to_string())
    } else if !word.contains('"') {
        Ok(format!("\"{}\"", word))
    } else if !word.contains('\'') {
        Ok(format!("'{}'", word))
    } else {
        anyhow::bail!(
            "ssh argument {} contains both quote characters and cannot be passed to rsync -e",
            word
        )
    }
}

/// The ssh invocation handed to rsync as its remote shell (`-e`).
///
/// Built from the same words as the export invocation.
pub fn ssh_remote_shell(config: &TransferConfig) -> Result<String> {
    let mut parts = vec!["ssh".to_string()];
    for word in ssh_option_args(config)? {
        parts.push(rsync_shell_word(&word)?);
    }
    Ok(parts.join(" "))
}

fn remote_login(config: &TransferConfig) -> String {
    format!("{}@{}", config.remote_user, config.remote_host)
}

/// Shell line executed on the remote host. Stderr is merged so remote
/// errors end up in the captured output.
pub fn remote_export_command(config: &TransferConfig) -> String {
    let mut line = format!(
        "cd {} ; {}",
        sh_quote(&config.remote_dir),
        config.console_script
    );
    if let Some(env) = &config.remote_env {
        line.push_str(&format!(" --env={}", sh_quote(env)));
    }
    line.push_str(&format!(" {} 2>&1", EXPORT_SUBCOMMAND));
    line
}

pub fn export_command(config: &TransferConfig) -> Result<CommandSpec> {
    Ok(CommandSpec::new("ssh")
        .args(ssh_option_args(config)?)
        .arg(remote_login(config))
        .arg(remote_export_command(config)))
}

pub fn rsync_command(config: &TransferConfig, folder: &FolderMapping) -> Result<CommandSpec> {
    let source = format!(
        "{}:{}/{}",
        remote_login(config),
        config.remote_dir.trim_end_matches('/'),
        folder.source
    );
    let destination = format!("{}/", folder.destination.trim_end_matches('/'));

    Ok(CommandSpec::new("rsync")
        .args(split_options(&config.rsync_options, "rsync.options")?)
        .arg("-e")
        .arg(ssh_remote_shell(config)?)
        .arg(source)
        .arg(destination))
}
