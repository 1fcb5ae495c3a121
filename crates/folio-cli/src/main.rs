use clap::Parser;
use cli::{Args, Commands};
use error::CliResult;
use folio_config::config::{generate_default_config, set_config_path, Config, CONFIG_PATH};
use folio_utils::path::resolve_path;
use query::{list_views, query_view, QueryOptions};
use tracing::{debug, info};
use utils::COLOR;

mod cli;
mod error;
mod logging;
mod query;
mod utils;

fn handle_cli() -> CliResult<()> {
    let args = Args::parse();

    logging::setup_logging(&args);

    if args.no_color {
        let mut color = COLOR.write().unwrap();
        *color = false;
    }

    if let Some(ref c) = args.config {
        set_config_path(resolve_path(c)?);
    }
    debug!("using config {}", CONFIG_PATH.read().unwrap().display());

    match args.command {
        Commands::Query {
            view,
            page,
            size,
            filters,
            include_deleted,
            debug,
        } => {
            let config = Config::new()?;
            query_view(
                &config,
                &view,
                QueryOptions {
                    page,
                    size,
                    filters,
                    include_deleted,
                    debug,
                    json: args.json,
                },
            )?;
        }
        Commands::Views => {
            let config = Config::new()?;
            list_views(&config, args.json)?;
        }
        Commands::Config {
            init,
        } => {
            if init {
                let path = generate_default_config()?;
                info!("Wrote {}", path.display());
            } else {
                let config = Config::new()?;
                if args.json {
                    let summary = serde_json::json!({
                        "config_path": CONFIG_PATH.read().unwrap().display().to_string(),
                        "db_path": config.get_db_path()?.display().to_string(),
                        "default_page_size": config.get_default_page_size(),
                        "debug_trace": config.get_debug_trace(),
                        "views": config.views.iter().map(|v| &v.name).collect::<Vec<_>>(),
                    });
                    println!("{}", serde_json::to_string_pretty(&summary)?);
                } else {
                    println!("{}", toml::to_string_pretty(&config)?);
                }
            }
        }
    }

    Ok(())
}

fn main() {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(2)
                .build(),
        )
    }))
    .ok();

    if let Err(err) = handle_cli() {
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(1);
    }
}
