//! skald: narration engine CLI
//!
//! Probe the backend, inspect templates, and run one-off narrations against
//! an in-memory session.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use skald::{
    Config, MemorySessionStore, NarrationRequest, RequestType, SessionContext, Skald,
    TemplateRegistry, Variables,
};

/// Skald CLI
#[derive(Parser)]
#[command(name = "skald")]
#[command(version)]
#[command(about = "Narration engine for tabletop role-playing sessions")]
struct Args {
    /// Config file (default: ~/.skald/config.toml, then /etc/skald/config.toml)
    #[arg(short, long, env = "SKALD_CONFIG")]
    config: Option<PathBuf>,

    /// Ollama base URL, overriding the config file
    #[arg(long, env = "SKALD_OLLAMA_URL")]
    ollama: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Check backend health
    Health,

    /// List backend models and the models each request type routes to
    Models,

    /// Warm every configured model
    Preload,

    /// Print the effective configuration
    Config,

    /// Render a built-in template without calling the backend
    Render {
        /// Request type (e.g. scene_description)
        request_type: RequestType,
        /// Template variable, repeatable
        #[arg(long = "var", value_parser = parse_var)]
        vars: Vec<(String, String)>,
        /// Template language
        #[arg(long, default_value = "en")]
        language: String,
    },

    /// Generate narration for one request
    Narrate {
        /// Request type (e.g. narrative_response)
        request_type: RequestType,
        /// Session id
        #[arg(short, long, default_value = "cli")]
        session: String,
        /// What the player does
        #[arg(short, long)]
        action: Option<String>,
        /// Session context as JSON (location, weather, quests, ...)
        #[arg(long)]
        context_file: Option<PathBuf>,
        /// Extra template variable, repeatable
        #[arg(long = "var", value_parser = parse_var)]
        vars: Vec<(String, String)>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialise tracing (default: warn for CLI; override with RUST_LOG).
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let args = Args::parse();
    let mut config = Config::load_or_default(args.config.as_deref())?;
    if let Some(url) = args.ollama {
        config.backend.base_url = url;
    }

    // Commands that don't require a backend
    if let Command::Config = args.command {
        print!("{}", config.to_toml_string()?);
        return Ok(());
    }
    if let Command::Render {
        request_type,
        ref vars,
        ref language,
    } = args.command
    {
        let registry = TemplateRegistry::with_defaults();
        let template = registry.get(request_type, language)?;
        let variables = vars
            .iter()
            .map(|(k, v)| (k.clone(), v.as_str().into()))
            .collect::<Variables>();
        println!("{}", registry.render(&template.id, &variables)?);
        return Ok(());
    }

    let sessions = Arc::new(MemorySessionStore::new());
    let engine = Skald::builder()
        .config(config)
        .sessions(sessions.clone())
        .build()?;

    match args.command {
        Command::Health => {
            let report = engine.check_health().await;
            let status = if report.backend_healthy {
                "healthy"
            } else {
                "unhealthy"
            };
            println!("backend: {} ({})", report.backend, engine.config().backend.base_url);
            println!("status: {status}");
            println!("models: {}", report.models.len());
        }

        Command::Models => {
            let profiles = engine.router().profiles();
            let mut routes = profiles.iter().collect::<Vec<_>>();
            routes.sort_by_key(|(t, _)| t.as_str());
            for (request_type, profile) in routes {
                println!("{request_type:<22} -> {}", profile.model);
            }
            println!();
            match engine.router().list_models().await {
                Ok(models) if models.is_empty() => println!("backend reports no models"),
                Ok(models) => {
                    let configured = engine.router().configured_models();
                    for model in models {
                        let marker = if configured.contains(&model) { "*" } else { " " };
                        println!("{marker} {model}");
                    }
                }
                Err(e) => println!("backend unavailable: {e}"),
            }
        }

        Command::Preload => {
            for result in engine.preload_models().await {
                match result.error {
                    None => println!("{}: loaded", result.model),
                    Some(e) => println!("{}: failed ({e})", result.model),
                }
            }
        }

        Command::Narrate {
            request_type,
            session,
            action,
            context_file,
            vars,
        } => {
            let mut context = match context_file {
                Some(path) => serde_json::from_str::<SessionContext>(&std::fs::read_to_string(
                    &path,
                )?)?,
                None => SessionContext::default(),
            };
            context.session_id = session.clone();
            sessions.insert_session(context).await;

            let mut request = NarrationRequest::new(request_type, session);
            if let Some(action) = action {
                request = request.player_action(action);
            }
            for (key, value) in vars {
                request = request.context(key, value);
            }

            let response = engine.process(request).await?;
            println!("{}", response.content);
            if !response.annotations.is_empty() {
                println!();
                println!("{}", serde_json::to_string_pretty(&response.annotations)?);
            }
            eprintln!(
                "model: {}, {} ms, ~{} tokens, confidence {:.2}",
                response.metadata.model,
                response.metadata.processing_time_ms,
                response.metadata.token_estimate,
                response.metadata.confidence
            );
        }

        Command::Config | Command::Render { .. } => unreachable!("handled above"),
    }

    Ok(())
}

/// Parse a `key=value` template variable.
fn parse_var(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .filter(|(k, _)| !k.is_empty())
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .ok_or_else(|| format!("expected key=value, got '{raw}'"))
}
