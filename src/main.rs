//! makemcp - Serve any OpenAPI-described service as an MCP server

use std::process::ExitCode;

use clap::Parser;
use serde_json::{Value, json};
use tracing::{error, info};

use makemcp::{
    Result, app, safety, server, setup_tracing,
    cli::{Cli, Command, OpenApiArgs, ServeArgs},
    source,
};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = setup_tracing(&cli.log_level, cli.log_format.as_deref()) {
        eprintln!("Failed to setup tracing: {e}");
        return ExitCode::FAILURE;
    }

    let outcome = match cli.command {
        Command::Openapi(args) => run_openapi(args).await,
        Command::Load { config, serve } => run_load(&config, &serve).await,
    };

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Build an app from an `OpenAPI` document, persist it, then serve
/// unless `--config-only` was given.
async fn run_openapi(args: OpenApiArgs) -> Result<()> {
    let transport = args.serve.transport.as_deref().unwrap_or("stdio");
    let port = args.serve.port.as_deref().unwrap_or("8080");

    // Serving options travel in the source params so the saved config
    // can be served later without repeating them.
    let params = json!({
        "specs": args.specs,
        "baseUrl": args.base_url,
        "timeout": args.timeout,
        "strictValidate": args.strict,
        "transport": transport,
        "port": port,
        "configOnly": args.config_only,
        "devMode": args.serve.dev_mode,
        "file": args.file,
    });

    let src = source::lookup(source::openapi::SOURCE_TYPE)?;
    src.validate_params(&params)?;
    safety::check_base_url(&args.base_url, args.serve.dev_mode);
    if args.specs.contains("://") {
        safety::check_base_url(&args.specs, args.serve.dev_mode);
    }

    let mut app = src.parse(&params).await?;
    let path = app.save(args.file.as_deref())?;
    info!(
        app = %app.name,
        tools = app.tools.len(),
        config = %path.display(),
        "Built app"
    );

    if args.config_only {
        println!("Config written to {}", path.display());
        return Ok(());
    }

    src.attach_handlers(&mut app)?;
    server::serve(app, transport.parse()?, port).await
}

/// Load a saved config and serve it. CLI flags override the serving
/// options persisted in the config.
async fn run_load(config: &std::path::Path, serve_args: &ServeArgs) -> Result<()> {
    let mut app = app::App::load(config)?;
    let src = source::lookup(&app.source_type)?;
    src.validate_params(&app.config)?;

    let dev_mode = serve_args.dev_mode
        || app
            .config
            .get("devMode")
            .and_then(Value::as_bool)
            .unwrap_or(false);
    if let Some(base_url) = app.config.get("baseUrl").and_then(Value::as_str) {
        safety::check_base_url(base_url, dev_mode);
    }

    let transport = serve_args
        .transport
        .clone()
        .or_else(|| config_str(&app.config, "transport"))
        .unwrap_or_else(|| "stdio".to_string());
    let port = serve_args
        .port
        .clone()
        .or_else(|| config_str(&app.config, "port"))
        .unwrap_or_else(|| "8080".to_string());

    src.attach_handlers(&mut app)?;
    info!(app = %app.name, tools = app.tools.len(), "Loaded app");
    server::serve(app, transport.parse()?, &port).await
}

fn config_str(config: &Value, key: &str) -> Option<String> {
    config.get(key).and_then(Value::as_str).map(str::to_string)
}
