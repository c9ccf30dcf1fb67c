//! Command-line interface for the disgate bridge.

use clap::{value_parser, Arg, ArgMatches, Command};
use plugin_system::PluginSafetyConfig;
use std::net::IpAddr;
use std::path::PathBuf;

/// Command line arguments parsed from user input.
///
/// Every option except the safety flags overrides a value from the
/// configuration file.
#[derive(Debug, Clone)]
pub struct CliArgs {
    /// Path to the configuration file
    pub config_path: PathBuf,
    /// Optional override for plugin directory
    pub plugin_dir: Option<PathBuf>,
    /// Optional override for the exercise address
    pub address: Option<IpAddr>,
    /// Optional override for the exercise port
    pub port: Option<u16>,
    /// Optional override for log level
    pub log_level: Option<String>,
    /// Whether to force JSON log output
    pub json_logs: bool,
    /// Whether to allow plugins with different Rust compiler versions (DANGEROUS)
    pub danger_allow_unsafe_plugins: bool,
    /// Whether to allow plugins with different ABI versions (DANGEROUS)
    pub danger_allow_abi_mismatch: bool,
    /// Whether to require exact version matching including patch digits
    pub strict_versioning: bool,
}

impl CliArgs {
    pub fn parse() -> Self {
        Self::from_matches(&command().get_matches())
    }

    /// Parses an explicit argument list; the first item is the program name.
    pub fn try_parse_from<I, T>(args: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        Ok(Self::from_matches(&command().try_get_matches_from(args)?))
    }

    fn from_matches(matches: &ArgMatches) -> Self {
        Self {
            config_path: matches
                .get_one::<PathBuf>("config")
                .cloned()
                .unwrap_or_else(|| PathBuf::from("disgate.toml")),
            plugin_dir: matches.get_one::<PathBuf>("plugins").cloned(),
            address: matches.get_one::<IpAddr>("address").copied(),
            port: matches.get_one::<u16>("port").copied(),
            log_level: matches.get_one::<String>("log-level").cloned(),
            json_logs: matches.get_flag("json-logs"),
            danger_allow_unsafe_plugins: matches.get_flag("danger-allow-unsafe-plugins"),
            danger_allow_abi_mismatch: matches.get_flag("danger-allow-abi-mismatch"),
            strict_versioning: matches.get_flag("strict-versioning"),
        }
    }

    /// Converts CLI arguments to plugin safety configuration.
    pub fn to_plugin_safety_config(&self) -> PluginSafetyConfig {
        PluginSafetyConfig {
            allow_unsafe_plugins: self.danger_allow_unsafe_plugins,
            allow_abi_mismatch: self.danger_allow_abi_mismatch,
            strict_versioning: self.strict_versioning,
        }
    }
}

fn command() -> Command {
    Command::new("disgate")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Bridges a local simulation onto a DIS exercise")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file path")
                .value_parser(value_parser!(PathBuf))
                .default_value("disgate.toml"),
        )
        .arg(
            Arg::new("plugins")
                .short('p')
                .long("plugins")
                .value_name("DIR")
                .help("Plugin directory path")
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("address")
                .short('a')
                .long("address")
                .value_name("IP")
                .help("Exercise address: unicast, broadcast or multicast group")
                .value_parser(value_parser!(IpAddr)),
        )
        .arg(
            Arg::new("port")
                .long("port")
                .value_name("PORT")
                .help("Exercise UDP port")
                .value_parser(value_parser!(u16)),
        )
        .arg(
            Arg::new("log-level")
                .short('l')
                .long("log-level")
                .value_name("LEVEL")
                .help("Log level (trace, debug, info, warn, error)"),
        )
        .arg(
            Arg::new("json-logs")
                .long("json-logs")
                .help("Output logs in JSON format")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("danger-allow-unsafe-plugins")
                .long("danger-allow-unsafe-plugins")
                .help("Allow loading plugins compiled with different Rust compiler versions (MAY CAUSE CRASHES)")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("danger-allow-abi-mismatch")
                .long("danger-allow-abi-mismatch")
                .help("Allow loading plugins with different ABI versions (MAY CAUSE CRASHES OR UNDEFINED BEHAVIOR)")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("strict-versioning")
                .long("strict-versioning")
                .help("Require exact version matching including patch digits (default: only major.minor must match)")
                .action(clap::ArgAction::SetTrue),
        )
}
