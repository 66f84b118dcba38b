//! Config subcommand handlers.

use std::io::{self, BufRead};

use serde::Serialize;

use hostmirror_core::{Catalog, expand_selection};

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::config::{self, Config};
use crate::error::CliError;
use crate::output;

const REDACTED: &str = "****";

// ── Helpers ─────────────────────────────────────────────────────────

fn redacted(cfg: &Config) -> Config {
    let mut cfg = cfg.clone();
    if cfg.server.api_key.is_some() {
        cfg.server.api_key = Some(REDACTED.into());
    }
    cfg
}

/// Format config for display, masking the API key.
fn format_config_redacted(cfg: &Config) -> String {
    use std::fmt::Write;
    let mut out = String::new();

    let domains: Vec<String> = cfg.domains.iter().map(|d| format!("\"{d}\"")).collect();
    let _ = writeln!(out, "domains = [{}]", domains.join(", "));

    let s = &cfg.server;
    let _ = writeln!(out);
    let _ = writeln!(out, "[server]");
    if let Some(ref address) = s.address {
        let _ = writeln!(out, "address = \"{address}\"");
    }
    if s.api_key.is_some() {
        let _ = writeln!(out, "api_key = \"{REDACTED}\"");
    }
    if let Some(ref env) = s.api_key_env {
        let _ = writeln!(out, "api_key_env = \"{env}\"");
    }
    if let Some(ref ca) = s.ca_cert {
        let _ = writeln!(out, "ca_cert = \"{}\"", ca.display());
    }
    let _ = writeln!(out, "insecure = {}", s.insecure);
    let _ = writeln!(out, "timeout = {}", s.timeout);

    let _ = writeln!(out);
    let _ = writeln!(out, "[poll]");
    let _ = writeln!(out, "interval_secs = {}", cfg.poll.interval_secs);

    let _ = writeln!(out);
    let _ = writeln!(out, "[state]");
    if let Some(ref path) = cfg.state.path {
        let _ = writeln!(out, "path = \"{}\"", path.display());
    }
    let _ = write!(out, "namespace = \"{}\"", cfg.state.namespace);

    out
}

#[derive(Serialize)]
struct PathView {
    path: String,
    exists: bool,
}

// ── Handler ─────────────────────────────────────────────────────────

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let path = config::active_path(global);
    match args.command {
        ConfigCommand::Path => {
            let view = PathView {
                path: path.display().to_string(),
                exists: path.exists(),
            };
            let out = output::render_single(global.output, &view, |v| v.path.clone())?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ConfigCommand::Show => {
            let cfg = config::load(global, &[])?;
            let view = redacted(&cfg);
            let out = output::render_single(global.output, &view, format_config_redacted)?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ConfigCommand::Init {
            server,
            domains,
            force,
        } => {
            if path.exists() && !force {
                return Err(CliError::Validation {
                    field: "config".into(),
                    reason: format!("{} already exists (use --force to overwrite)", path.display()),
                });
            }

            let catalog = Catalog::builtin();
            let mut cfg = Config::default();
            cfg.server.address = server.or_else(|| global.address.clone());
            cfg.domains = if domains.is_empty() {
                catalog.default_selection().into_iter().map(str::to_owned).collect()
            } else {
                let unknown: Vec<&String> = domains
                    .iter()
                    .filter(|d| catalog.find_node(d).is_none())
                    .collect();
                if !unknown.is_empty() {
                    return Err(CliError::Validation {
                        field: "domains".into(),
                        reason: format!("unknown domain ids: {unknown:?}"),
                    });
                }
                domains
            };
            config::save_config(&cfg, &path)?;
            let selected = expand_selection(catalog, &cfg.domains);
            if !global.quiet {
                eprintln!("Wrote {}", path.display());
                eprintln!("   {} queryable domains selected", selected.len());
                if cfg.server.address.is_some() {
                    eprintln!("   Store the API key with: hostmirror config set-key");
                }
            }
            Ok(())
        }

        ConfigCommand::SetKey => {
            let cfg = config::load(global, &[])?;
            let address = cfg.server.address.ok_or_else(|| CliError::MissingConfig {
                field: "server.address".into(),
                path: path.display().to_string(),
            })?;

            let mut key = String::new();
            io::stdin().lock().read_line(&mut key)?;
            let key = key.trim();
            if key.is_empty() {
                return Err(CliError::Validation {
                    field: "api_key".into(),
                    reason: "API key cannot be empty".into(),
                });
            }

            hostmirror_config::store_api_key(&address, key)?;
            if !global.quiet {
                eprintln!("API key for {address} stored in system keyring");
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redaction_masks_only_the_key() {
        let mut cfg = Config::default();
        cfg.server.address = Some("https://tower.local".into());
        cfg.server.api_key = Some("secret".into());

        let text = format_config_redacted(&redacted(&cfg));
        assert!(text.contains("api_key = \"****\""));
        assert!(text.contains("address = \"https://tower.local\""));
        assert!(!text.contains("secret"));
    }

    #[test]
    fn absent_key_is_not_printed() {
        let text = format_config_redacted(&Config::default());
        assert!(!text.contains("api_key ="));
        assert!(text.contains("namespace = \"hostmirror.0\""));
    }
}
