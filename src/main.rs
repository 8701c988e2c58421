use clap::Parser;
use std::path::PathBuf;

use static_etags::{config, filters, log, scope::ScopeTree, server::Server};

#[derive(Parser)]
#[command(name = "static-etags", version, about = "HTTP front end that stamps file-based Etag headers")]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(long, default_value = config::DEFAULT_PATH)]
    config: PathBuf,
}

fn main() {
    let cli = Cli::parse();
    let loaded = tracing::subscriber::with_default(log::bootstrap(std::io::stdout), || {
        config::load_config(&cli.config)
    });
    let cfg = match loaded {
        Ok(c) => c,
        Err(e) => fail(&format!("Configuration error: {e}")),
    };
    log::init(cfg.server.logging, &cfg.server.log_level);

    let scopes = match ScopeTree::build(&cfg.server) {
        Ok(s) => s,
        Err(e) => fail(&format!("Configuration error: {e}")),
    };

    tracing::info!("Installing header filters...");
    let mut builder = filters::ChainBuilder::new();
    filters::register_all(&mut builder);
    let chain = builder.build();

    if let Err(e) = Server::new(cfg.server, scopes, chain).run() {
        fail(&format!("Server failed: {e}"));
    }
}

fn fail(msg: &str) -> ! {
    log::init(true, "error");
    tracing::error!("{msg}");
    std::process::exit(1);
}
