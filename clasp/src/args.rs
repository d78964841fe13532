use clap::Parser;

/// Command-line arguments for the `clasp` proxy.
#[derive(Debug, Parser)]
#[command(name = "clasp", version, about = "Anthropic-protocol translation proxy")]
pub struct Args {
    /// Log filter, in `env_logger` syntax (e.g. `info`, `clasp=debug,warn`).
    #[arg(long, env = "RUST_LOG", default_value = "info")]
    pub log_filter: String,
}
