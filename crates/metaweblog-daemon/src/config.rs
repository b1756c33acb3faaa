//! CLI argument parsing and config file support.
//!
//! The daemon can be configured via CLI flags, a JSON config file,
//! or a combination of both (CLI overrides config file).

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use metaweblog_types::config::{BridgeConfig, EditFailurePolicy};

const DEFAULT_LISTEN: &str = "127.0.0.1:8085";
const DEFAULT_SITE_TITLE: &str = "Home";
const DEFAULT_ARCHIVE: &str = "Articles";
const DEFAULT_MAX_BODY_BYTES: usize = 16 * 1024 * 1024;

// ---------------------------------------------------------------------------
// CLI arguments (manual parsing, no clap dependency)
// ---------------------------------------------------------------------------

/// Parsed command-line arguments.
#[derive(Debug, Default)]
pub struct CliArgs {
    pub config_path: Option<PathBuf>,
    pub listen_addr: Option<String>,
    pub public_url: Option<String>,
    pub media_dir: Option<PathBuf>,
    pub users: Vec<UserEntry>,
    pub archives: Vec<String>,
    pub strict_edits: bool,
    pub help: bool,
}

impl CliArgs {
    /// Parses CLI arguments from `std::env::args`, exiting on bad input.
    pub fn parse_from_env() -> Self {
        let args: Vec<String> = std::env::args().skip(1).collect();
        match Self::parse(&args) {
            Ok(cli) if cli.help => {
                print_help();
                std::process::exit(0);
            }
            Ok(cli) => cli,
            Err(e) => {
                eprintln!("{e}");
                eprintln!("use --help for usage information");
                std::process::exit(1);
            }
        }
    }

    /// Parses `args` (without the program name).
    pub fn parse(args: &[String]) -> Result<Self, String> {
        let mut cli = Self::default();
        let mut iter = args.iter();

        while let Some(arg) = iter.next() {
            let mut value = |flag: &str| {
                iter.next()
                    .cloned()
                    .ok_or_else(|| format!("missing value for {flag}"))
            };
            match arg.as_str() {
                "--config" => cli.config_path = Some(PathBuf::from(value(arg)?)),
                "--listen" => cli.listen_addr = Some(value(arg)?),
                "--public-url" => cli.public_url = Some(value(arg)?),
                "--media-dir" => cli.media_dir = Some(PathBuf::from(value(arg)?)),
                "--user" => cli.users.push(UserEntry::from_pair(&value(arg)?)?),
                "--archive" => cli.archives.push(value(arg)?),
                "--strict-edits" => cli.strict_edits = true,
                "--help" | "-h" => cli.help = true,
                other => return Err(format!("unknown argument: {other}")),
            }
        }

        Ok(cli)
    }
}

// ---------------------------------------------------------------------------
// Config file (JSON)
// ---------------------------------------------------------------------------

/// One login accepted by the daemon.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserEntry {
    pub username: String,
    /// Plain-text password.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    /// Hex SHA-256 of the password; preferred over `password`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password_sha256: Option<String>,
}

impl UserEntry {
    /// Parses `name:password`.
    pub fn from_pair(pair: &str) -> Result<Self, String> {
        match pair.split_once(':') {
            Some((name, password)) if !name.is_empty() => Ok(Self {
                username: name.to_string(),
                password: Some(password.to_string()),
                password_sha256: None,
            }),
            _ => Err(format!("--user expects name:password, got '{pair}'")),
        }
    }
}

/// JSON config file format.
///
/// Example `daemon.json`:
/// ```json
/// {
///   "listen_addr": "0.0.0.0:8085",
///   "public_url": "https://blog.example.org",
///   "media_dir": "/srv/blog/files",
///   "site_title": "My Blog",
///   "archives": ["News", "Reviews"],
///   "users": [
///     { "username": "editor", "password_sha256": "5e88...42d8" }
///   ],
///   "bridge": { "perex_limit": 400, "edit_failure_policy": "strict" }
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DaemonConfigFile {
    pub listen_addr: Option<String>,
    pub public_url: Option<String>,
    pub media_dir: Option<String>,
    pub site_title: Option<String>,
    pub archives: Option<Vec<String>>,
    pub users: Option<Vec<UserEntry>>,
    pub max_body_bytes: Option<usize>,
    pub bridge: Option<BridgeConfig>,
}

// ---------------------------------------------------------------------------
// Resolved config (all defaults applied)
// ---------------------------------------------------------------------------

/// Fully resolved daemon configuration with all defaults applied.
#[derive(Debug)]
pub struct DaemonConfig {
    pub listen_addr: SocketAddr,
    pub public_url: Option<String>,
    pub media_dir: PathBuf,
    pub site_title: String,
    pub archives: Vec<String>,
    pub users: Vec<UserEntry>,
    pub max_body_bytes: usize,
    pub bridge: BridgeConfig,
}

impl DaemonConfig {
    /// Build config purely from CLI args with defaults.
    pub fn from_cli(cli: &CliArgs) -> Result<Self, String> {
        Self::from_file(DaemonConfigFile::default())?.merge_cli(cli)
    }

    /// Load config from a JSON file.
    pub fn load(path: &Path) -> Result<Self, String> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| format!("failed to read config file: {e}"))?;

        let file: DaemonConfigFile =
            serde_json::from_str(&text).map_err(|e| format!("invalid config JSON: {e}"))?;

        Self::from_file(file)
    }

    /// Applies defaults to a parsed config file.
    pub fn from_file(file: DaemonConfigFile) -> Result<Self, String> {
        let listen = file.listen_addr.unwrap_or_else(|| DEFAULT_LISTEN.into());
        Ok(Self {
            listen_addr: parse_addr(&listen)?,
            public_url: file.public_url,
            media_dir: file
                .media_dir
                .map(PathBuf::from)
                .unwrap_or_else(default_media_dir),
            site_title: file
                .site_title
                .unwrap_or_else(|| DEFAULT_SITE_TITLE.into()),
            archives: file
                .archives
                .unwrap_or_else(|| vec![DEFAULT_ARCHIVE.into()]),
            users: file.users.unwrap_or_default(),
            max_body_bytes: file.max_body_bytes.unwrap_or(DEFAULT_MAX_BODY_BYTES),
            bridge: file.bridge.unwrap_or_default(),
        })
    }

    /// Merge CLI overrides onto a config-file base.
    pub fn merge_cli(mut self, cli: &CliArgs) -> Result<Self, String> {
        if let Some(ref addr) = cli.listen_addr {
            self.listen_addr = parse_addr(addr)?;
        }
        if cli.public_url.is_some() {
            self.public_url = cli.public_url.clone();
        }
        if let Some(ref dir) = cli.media_dir {
            self.media_dir = dir.clone();
        }
        if !cli.users.is_empty() {
            self.users.extend(cli.users.iter().cloned());
        }
        if !cli.archives.is_empty() {
            self.archives = cli.archives.clone();
        }
        if cli.strict_edits {
            self.bridge.edit_failure_policy = EditFailurePolicy::Strict;
        }
        Ok(self)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn parse_addr(addr: &str) -> Result<SocketAddr, String> {
    addr.parse()
        .map_err(|e| format!("invalid listen address '{addr}': {e}"))
}

/// Platform-specific default media directory.
fn default_media_dir() -> PathBuf {
    if let Some(data) = dirs::data_dir() {
        return data.join("metaweblog").join("files");
    }
    PathBuf::from("metaweblog-files")
}

fn print_help() {
    println!(
        r#"MetaWeblog Daemon - MetaWeblog API endpoint for blogging clients

USAGE:
    metaweblog-daemon [OPTIONS]

OPTIONS:
    --listen <ADDR>          HTTP listen address (default: {DEFAULT_LISTEN})
    --public-url <URL>       Public site base used in returned links
    --media-dir <PATH>       Directory receiving uploads (default: platform-specific)
    --user <NAME:PASSWORD>   Accept a login (repeatable)
    --archive <TITLE>        Seed an archive container (repeatable)
    --strict-edits           Report refused edits instead of answering true
    --config <PATH>          Load settings from JSON config file
    -h, --help               Show this help

EXAMPLES:
    # Local endpoint with one editor
    metaweblog-daemon --user editor:secret --archive News --archive Reviews

    # Behind a reverse proxy
    metaweblog-daemon --listen 0.0.0.0:8085 --public-url https://blog.example.org

    # Use config file
    metaweblog-daemon --config /etc/metaweblog/daemon.json

ENVIRONMENT:
    RUST_LOG                 Log level filter (default: info)
"#
    );
}
