use clap::Parser;
use filevault::cli::{commands, output, Cli, Commands};

fn main() {
    let cli = Cli::parse();

    init_logging(&cli.log_level);

    let result = match cli.command {
        Commands::Create { ref name, strength } => commands::create::execute(&cli, name, strength),
        Commands::List => commands::list::execute(&cli),
        Commands::Add { ref file } => commands::add::execute(&cli, file),
        Commands::Retrieve {
            ref name,
            output: ref out,
        } => commands::retrieve::execute(&cli, name, out.as_deref()),
        Commands::Remove { ref name, force } => commands::remove::execute(&cli, name, force),
        Commands::Cleanup => commands::cleanup::execute(&cli),
        Commands::Prune => commands::prune::execute(&cli),
        Commands::Check => commands::check::execute(&cli),
    };

    if let Err(e) = result {
        output::error(&e.to_string());
        std::process::exit(1);
    }
}

/// Log to stderr.  `RUST_LOG` wins over `--log-level` when set.
fn init_logging(level: &str) {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .init();
}
