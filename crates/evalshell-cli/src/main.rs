//! evalsh CLI entry point.
//!
//! Operator tool for poking a running evaluation-shell service: evaluate
//! a snippet, ask for completions, or check readiness, all against a
//! fixed service URL (no hosting notebook involved).

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context};
use base64::prelude::*;
use clap::{Args, Parser, Subcommand};
use log::info;
use uuid::Uuid;

use evalshell::{
    Output, OutputCell, ServiceSpec, ShellClient, ShellConfig, ShellId, ShellOptions,
    StaticGateway,
};

#[derive(Parser, Debug)]
#[command(name = "evalsh")]
#[command(about = "Talk to a remote evaluation-shell service")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Base URL of the running service
    #[arg(long, global = true, default_value = "http://127.0.0.1:8801")]
    service_url: String,

    /// Language path segment of the service endpoints
    #[arg(long, global = true, default_value = "fsharp")]
    lang: String,

    /// Log level
    #[arg(long, global = true, default_value = "info")]
    log_level: String,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Evaluate a code snippet in a session and print the result
    Eval(EvalArgs),

    /// Ask the service for completions at a caret position
    Complete {
        /// Code buffer to complete in
        code: String,

        /// Caret offset (default: end of the buffer)
        #[arg(long)]
        caret: Option<usize>,
    },

    /// Check whether the service answers readiness probes
    Status,
}

#[derive(Args, Debug)]
struct EvalArgs {
    /// Code to evaluate; read from stdin when omitted
    code: Option<String>,

    /// Shell option as NAME=VALUE (repeatable)
    #[arg(long = "option", short = 'o', value_name = "NAME=VALUE")]
    options: Vec<String>,

    /// Reuse an existing shell id instead of allocating a fresh one
    #[arg(long)]
    shell: Option<String>,

    /// Bootstrap expression evaluated before the code; `{session}` is
    /// replaced with this invocation's session identity
    #[arg(long)]
    bootstrap: Option<String>,

    /// Interrupt and give up after this many seconds
    #[arg(long)]
    timeout: Option<u64>,

    /// Print the display model as JSON instead of rendering it
    #[arg(long)]
    json: bool,

    /// Write an image result to this file
    #[arg(long)]
    save: Option<PathBuf>,

    /// Leave the shell running on exit and print its id
    #[arg(long)]
    keep: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&cli.log_level))
        .init();

    let Cli {
        command,
        service_url,
        lang,
        ..
    } = cli;

    match command {
        Commands::Eval(args) => eval(&service_url, &lang, args).await,
        Commands::Complete { code, caret } => complete(&service_url, &lang, &code, caret).await,
        Commands::Status => status(&service_url, &lang).await,
    }
}

fn service_spec() -> ServiceSpec {
    ServiceSpec::new("evalsh", "evalsh", "Successfully started server")
}

async fn eval(service_url: &str, lang: &str, args: EvalArgs) -> anyhow::Result<()> {
    let code = match args.code {
        Some(code) => code,
        None => std::io::read_to_string(std::io::stdin()).context("failed to read stdin")?,
    };

    let mut options = ShellOptions::new();
    for pair in &args.options {
        let (name, value) = pair
            .split_once('=')
            .with_context(|| format!("option '{pair}' is not NAME=VALUE"))?;
        options.set(name, value);
    }

    let mut config = ShellConfig::new(lang).with_ready_probes(10, Duration::from_millis(500));
    if let Some(secs) = args.timeout {
        config = config.with_eval_timeout(Duration::from_secs(secs));
    }
    if let Some(bootstrap) = &args.bootstrap {
        config = config.with_bootstrap_template(bootstrap.clone());
    }

    let session_id = Uuid::new_v4().to_string();
    let gateway = StaticGateway::new(service_url).with_session_id(&session_id);
    let client = ShellClient::connect(gateway, &service_spec(), config).await?;

    let prior = args.shell.map(ShellId::new);
    let session = client.open_session(prior.as_ref(), options).await?;
    info!("[evalsh] Using shell {}", session.shell_id());

    let cell = OutputCell::new();
    session.evaluator().evaluate(&code, &cell).await?;
    if let Some(elapsed) = cell.elapsed() {
        info!("[evalsh] Settled in {elapsed:?}");
    }

    let display = cell.display();
    let failed = display.is_error();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&display)?);
    } else {
        render(&display, args.save.as_deref())?;
    }

    if args.keep {
        println!("shell: {}", session.shell_id());
    } else {
        session.exit().await;
    }

    if failed && !args.json {
        bail!("evaluation failed");
    }
    Ok(())
}

/// Print a display the way a terminal wants it.
fn render(display: &Output, save: Option<&Path>) -> anyhow::Result<()> {
    match display {
        Output::Plain { value } => println!("{}", value_to_text(value)),
        Output::Markup { html } => match save {
            Some(path) => {
                save_data_uri(html, path)?;
                println!("saved {}", path.display());
            }
            None => println!("{html}"),
        },
        Output::Table {
            column_names,
            values,
        } => {
            println!("{}", column_names.join("\t"));
            for row in values {
                let cells: Vec<String> = row.iter().map(value_to_text).collect();
                println!("{}", cells.join("\t"));
            }
        }
        Output::Error { message } => eprintln!("error: {}", value_to_text(message)),
        // An evaluation that has settled is never still pending.
        other => println!("{other:?}"),
    }
    Ok(())
}

fn value_to_text(value: &serde_json::Value) -> String {
    match value.as_str() {
        Some(text) => text.to_string(),
        None => value.to_string(),
    }
}

/// Pull the base64 payload out of an `<img src="data:..;base64,.." />`
/// markup display and write the decoded bytes.
fn save_data_uri(html: &str, path: &Path) -> anyhow::Result<()> {
    let start = html
        .find("base64,")
        .context("result is not a base64 data URI")?
        + "base64,".len();
    let end = html[start..]
        .find('"')
        .context("unterminated data URI")?
        + start;
    let bytes = BASE64_STANDARD
        .decode(&html[start..end])
        .context("invalid base64 payload")?;
    std::fs::write(path, &bytes).with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}

async fn complete(service_url: &str, lang: &str, code: &str, caret: Option<usize>) -> anyhow::Result<()> {
    let config = ShellConfig::new(lang).with_ready_probes(10, Duration::from_millis(500));
    let client =
        ShellClient::connect(StaticGateway::new(service_url), &service_spec(), config).await?;
    let session = client.open_session(None, ShellOptions::new()).await?;

    let caret = caret.unwrap_or(code.len());
    let candidates = session.completions().complete(code, caret).await?;
    for candidate in &candidates {
        println!("{candidate}");
    }
    if candidates.is_empty() {
        info!("[evalsh] No completions at offset {caret}");
    }

    session.exit().await;
    Ok(())
}

async fn status(service_url: &str, lang: &str) -> anyhow::Result<()> {
    let config = ShellConfig::new(lang).with_ready_probes(1, Duration::ZERO);
    match ShellClient::connect(StaticGateway::new(service_url), &service_spec(), config).await {
        Ok(client) => {
            println!("ready: {}/{}", client.base_url(), lang);
            Ok(())
        }
        Err(e) => bail!("service not ready: {e}"),
    }
}
