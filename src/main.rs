use actix_cors::Cors;
use actix_web::{
    http::header,
    middleware::{DefaultHeaders, Logger},
    web, App, HttpServer,
};
use clap::Parser;
use portfolio_cms::{config::Config, error, routes, setup::db_setup};
use std::fs;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "portfolio_server", author, version, about = "Starts the portfolio CMS API server.")]
struct Cli {
    /// Path to the .env configuration file.
    #[arg(long, default_value = ".env", value_name = "FILE")]
    env_file: PathBuf,
}

fn build_cors(allowed_origins: &str) -> Cors {
    let cors = if allowed_origins.trim() == "*" {
        Cors::default().allow_any_origin()
    } else {
        allowed_origins
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .fold(Cors::default(), |cors, origin| cors.allowed_origin(origin))
    };
    cors.allowed_methods(vec!["GET", "POST", "PUT", "PATCH", "DELETE"])
        .allowed_headers(vec![header::AUTHORIZATION, header::ACCEPT, header::CONTENT_TYPE])
        .supports_credentials()
        .max_age(3600)
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    let cli = Cli::parse();

    let config = Config::from_env(&cli.env_file).expect("FATAL: Failed to load or parse configuration.");

    env_logger::init_from_env(env_logger::Env::new().default_filter_or(&config.log_level));
    error::set_expose_details(config.is_development());

    let pool = db_setup::create_pool(&config.database_path()).expect("FATAL: Failed to create the SQLite connection pool.");
    {
        let mut conn = pool.get().expect("FATAL: Failed to get a DB connection for setup.");
        db_setup::setup_database(&mut conn).expect("FATAL: Failed to create database tables.");
    }

    let upload_dir = config.upload_path();
    fs::create_dir_all(&upload_dir)?;
    let upload_prefix = config.upload_url_prefix();

    let server_address = format!("{}:{}", config.web.host, config.web.port);
    log::info!("Server starting at http://{} ({})", server_address, config.node_env);
    log::info!("Serving uploads from '{}' under {}", upload_dir.display(), upload_prefix);

    let config_data = web::Data::new(config);
    let pool_data = web::Data::new(pool);

    HttpServer::new(move || {
        App::new()
            .wrap(build_cors(&config_data.allowed_origins))
            .wrap(Logger::default())
            .wrap(
                DefaultHeaders::new()
                    .add(("X-Content-Type-Options", "nosniff"))
                    .add(("X-Frame-Options", "DENY"))
                    .add(("X-XSS-Protection", "1; mode=block")),
            )
            .app_data(config_data.clone())
            .app_data(pool_data.clone())
            .configure(routes::config_api)
            .service(actix_files::Files::new(&upload_prefix, &upload_dir))
            .default_service(web::to(routes::not_found))
    })
    .bind(server_address)?
    .run()
    .await
}
