//! Command-line overrides on top of the environment configuration.

use gpm_core::Config;

use crate::cli::CliArgs;

/// Build the effective configuration: environment (with profile), then flags.
pub fn resolve(args: &CliArgs) -> Config {
    let mut config = match &args.profile {
        Some(profile) => Config::for_profile(profile),
        None => Config::from_env(),
    };
    apply_overrides(&mut config, args);
    config
}

/// Flags win over environment values. Boolean flags only ever switch a
/// feature on.
pub fn apply_overrides(config: &mut Config, args: &CliArgs) {
    if let Some(url) = &args.dataservice_url {
        config.sync.dataservice_url = url.clone();
    }
    if let Some(connection) = &args.connection {
        config.sync.connection = connection.clone();
    }
    if let Some(interval) = args.interval_ms {
        config.sync.update_interval_ms = interval;
    }
    if args.strict {
        config.sync.strict_diffs = true;
    }
    if let Some(dir) = &args.rules_dir {
        config.rules.rules_dir = dir.clone();
    }
    if args.watch {
        config.rules.watch = true;
    }
    if let Some(url) = &args.webhook_url {
        config.actions.webhook_url = Some(url.clone());
    }
}
