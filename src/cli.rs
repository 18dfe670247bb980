use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "rozip")]
#[command(version)]
#[command(about = "Explore ZIP archives and RO-Crates, locally or over HTTP", long_about = None)]
#[command(after_help = "Examples:\n  \
  rozip -l data.zip                          list files in a local archive\n  \
  rozip -v https://example.com/archive.zip   verbose listing, fetched via Range requests\n  \
  rozip data.zip results/table.csv -d out    extract one file into out/\n  \
  rozip --crate dataset.zip                  show the RO-Crate summary")]
pub struct Cli {
    /// ZIP file path or HTTP(S) URL
    #[arg(value_name = "FILE")]
    pub file: String,

    /// Member paths to extract (default: list instead)
    #[arg(value_name = "FILES")]
    pub files: Vec<String>,

    /// List files (short format)
    #[arg(short = 'l')]
    pub list: bool,

    /// List verbosely with sizes and timestamps
    #[arg(short = 'v')]
    pub verbose: bool,

    /// Write extracted files to stdout
    #[arg(short = 'p')]
    pub pipe: bool,

    /// Extract files into DIR
    #[arg(short = 'd', value_name = "DIR")]
    pub extract_dir: Option<String>,

    /// Show the RO-Crate summary
    #[arg(long = "crate")]
    pub show_crate: bool,

    /// Quiet mode
    #[arg(short = 'q')]
    pub quiet: bool,
}

impl Cli {
    pub fn is_http_url(&self) -> bool {
        self.file.starts_with("http://") || self.file.starts_with("https://")
    }

    pub fn is_quiet(&self) -> bool {
        self.quiet || self.pipe
    }
}
