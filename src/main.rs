use agent_deck::cli::CliOverrides;
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "agent_deck=info".into()))
        .init();

    let cli = match CliOverrides::parse_from_env() {
        Ok(parsed) => parsed,
        Err(err) => {
            tracing::error!("{err}");
            std::process::exit(2);
        }
    };
    if let Err(err) = agent_deck::replay::run(&cli) {
        tracing::error!("replay failed: {err:?}");
        std::process::exit(1);
    }
}
