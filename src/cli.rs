//! Command-line flag for choosing the config file.

use std::path::PathBuf;

use clap::Args;

use crate::Resolver;

/// The `-c/--config` flag, for flattening into an application's parser.
///
/// ```
/// use clap::Parser;
/// use stratum::cli::ConfigArgs;
///
/// #[derive(Parser)]
/// struct Cli {
///     #[command(flatten)]
///     config: ConfigArgs,
/// }
///
/// let cli = Cli::parse_from(["app", "-c", "/etc/app/config.toml"]);
/// let resolver = cli.config.apply(stratum::Resolver::new());
/// assert!(resolver.config_file().is_some());
/// ```
#[derive(Debug, Clone, Default, Args)]
pub struct ConfigArgs {
    /// Path to config
    #[arg(short = 'c', long = "config", value_name = "PATH")]
    pub config: Option<PathBuf>,
}

impl ConfigArgs {
    /// Points `resolver` at the given file, if one was passed.
    pub fn apply(&self, resolver: Resolver) -> Resolver {
        match &self.config {
            Some(path) => resolver.with_config_file(path),
            None => resolver,
        }
    }
}
