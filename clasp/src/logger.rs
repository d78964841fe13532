use crate::args::Args;

/// Initializes the process-wide logger from the configured filter.
pub fn init(args: &Args) {
    env_logger::Builder::new().parse_filters(&args.log_filter).init();
}
