use clap::{ArgAction, Parser, Subcommand};

#[derive(Parser)]
#[command(
    author,
    version,
    about,
    help_template = "{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}",
    arg_required_else_help = true
)]
pub struct Args {
    /// Set output verbosity
    #[arg(short = 'v', long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress outputs
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Output as json
    #[arg(short, long, global = true)]
    pub json: bool,

    /// Disable colors in output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Provide custom config file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Query one page of a configured view
    #[command(arg_required_else_help = true)]
    #[clap(name = "query", visible_alias = "q")]
    Query {
        /// Name of the view
        #[arg(required = true)]
        view: String,

        /// Page to show, starting at 1
        #[arg(short, long, default_value_t = 0)]
        page: i64,

        /// Rows per page (0 uses the configured default)
        #[arg(short, long, default_value_t = 0)]
        size: i64,

        /// Filter, sort or sequence value as field=value
        #[arg(short, long = "filter", value_name = "FIELD=VALUE")]
        filters: Vec<String>,

        /// Include soft-deleted rows
        #[arg(long)]
        include_deleted: bool,

        /// Log the rendered SQL
        #[arg(long)]
        debug: bool,
    },

    /// List configured views
    #[clap(name = "views", visible_alias = "ls")]
    Views,

    /// Print the effective configuration
    Config {
        /// Write an annotated default configuration file
        #[arg(long)]
        init: bool,
    },
}
