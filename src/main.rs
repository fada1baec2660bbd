use cinegate::cli::{
    Args, build_config, handle_seed_user, init_logging, load_jwt_secret, open_database,
};
use cinegate::run_server;
use clap::Parser;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    let args = Args::parse();

    init_logging(&args.log_format);

    let jwt_secret = load_jwt_secret(args.jwt_secret_file.as_deref()).unwrap_or_else(|e| {
        error!(error = %e, "Cannot load JWT secret");
        std::process::exit(1);
    });

    let Some(db) = open_database(&args.database).await else {
        std::process::exit(1);
    };

    if let Some(seed) = &args.seed_user {
        if !handle_seed_user(&db, seed).await {
            std::process::exit(1);
        }
    }

    let config = build_config(&args, db, jwt_secret).unwrap_or_else(|e| {
        error!(error = %e, "Invalid authentication settings");
        std::process::exit(1);
    });

    let addr = format!("0.0.0.0:{}", args.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .unwrap_or_else(|e| {
            error!(address = %addr, error = %e, "Failed to bind");
            std::process::exit(1);
        });

    let local_addr = listener.local_addr().unwrap_or_else(|e| {
        error!(error = %e, "Failed to read local address");
        std::process::exit(1);
    });

    info!(address = %local_addr, issuer = %args.jwt_issuer, "Listening");

    if let Err(e) = run_server(config, listener).await {
        error!(error = %e, "Server error");
        std::process::exit(1);
    }
}
