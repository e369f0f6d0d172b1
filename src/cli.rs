use clap::Parser;
use std::path::PathBuf;

// Command-line front-end. Anything left out falls back to the values stored
// in the config file by the previous successful start.
#[derive(Parser, Debug)]
#[command(
    version,
    about = "A minimal web server for static files and directory listings.",
    long_about = "Serves the files under a web directory over HTTP and generates an HTML listing for every directory.\n Every request is written to a daily log file (log_<YYYY-MM-DD>.txt) in the log directory.\n Once started, type `stop`, `start`, `status` or `quit` on stdin to control the server.\n The port and directories of the last successful start are remembered in the config file."
)]
pub struct Cli {
    /// Port number to listen on (defaults to the stored port, then 8080)
    #[arg(short, long, value_parser = clap::value_parser!(u16).range(1..))]
    pub port: Option<u16>,

    /// Web directory to serve files from
    #[arg(short, long)]
    pub directory: Option<PathBuf>,

    /// Directory that receives the daily log files
    #[arg(short = 'o', long)]
    pub log_dir: Option<PathBuf>,

    /// Host address to listen on (e.g., "127.0.0.1" for local, "0.0.0.0" for everyone on the network)
    #[arg(short, long, default_value = "0.0.0.0")]
    pub listen: String,

    /// Serve connections on a fixed pool of this many threads instead of one thread per connection
    #[arg(short, long)]
    pub threads: Option<usize>,

    /// Seconds to wait for a client to send its request before giving up
    #[arg(long)]
    pub read_timeout: Option<u64>,

    /// File remembering the last used port and directories
    #[arg(short, long, default_value = "config.properties")]
    pub config: PathBuf,

    /// Enable verbose logging for debugging (log level: debug)
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}
