pub mod cli_args;

use anyhow::Result;
use clap::Parser;
use sehat_channel::{encode_reply, serve_stdio, ChannelReply, MethodChannel, ReplyEnvelope, EXTRACT_TEXT};
use sehat_config::Config;
use sehat_ocr::engine::resolve_engine_kind;
use sehat_ocr::{OcrService, IMAGE_PATH_KEY};
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

pub use cli_args::{Cli, Commands};

pub async fn run() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose);

    let config = Config::load_with_overrides(cli.config.as_deref(), cli.engine, cli.fast)?;
    debug!(?config, "configuration loaded");

    let channel = build_channel(&config)?;

    match cli.command {
        Commands::Extract { image_path, json } => run_extract(&channel, &image_path, json).await,
        Commands::Serve => {
            serve_stdio(Arc::new(channel)).await?;
            Ok(())
        }
        Commands::Info => {
            print_info(&config, &channel);
            Ok(())
        }
    }
}

/// Build the method channel and the platform service behind it
pub fn build_channel(config: &Config) -> Result<MethodChannel> {
    let service = OcrService::from_config(config)?;
    info!(
        channel = %config.channel.name,
        engine = service.engine_name(),
        "OCR channel ready"
    );
    Ok(MethodChannel::new(config.channel.name.clone(), service))
}

fn setup_logging(verbose: bool) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let level = if verbose { "debug" } else { "info" };
    let mut filter = EnvFilter::from_default_env();
    for target in ["sehat", "sehat_cli", "sehat_ocr", "sehat_channel", "sehat_config"] {
        if let Ok(directive) = format!("{}={}", target, level).parse() {
            filter = filter.add_directive(directive);
        }
    }

    // stdout carries channel replies, so logs go to stderr
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

/// Invoke `extractText` through the channel, exactly as a remote caller would
async fn run_extract(channel: &MethodChannel, image_path: &Path, json: bool) -> Result<()> {
    let mut args = serde_json::Map::new();
    args.insert(
        IMAGE_PATH_KEY.to_string(),
        Value::String(image_path.to_string_lossy().into_owned()),
    );
    let args = Value::Object(args);
    let reply = channel.invoke(EXTRACT_TEXT, &args).await;

    if json {
        println!("{}", encode_reply(&ReplyEnvelope::new(Value::Null, reply))?);
        return Ok(());
    }

    match reply {
        ChannelReply::Result(text) => {
            println!("{}", text);
            Ok(())
        }
        ChannelReply::Error(failure) => match failure.details {
            Some(details) => anyhow::bail!("{}: {} ({})", failure.code, failure.message, details),
            None => anyhow::bail!("{}: {}", failure.code, failure.message),
        },
    }
}

fn print_info(config: &Config, channel: &MethodChannel) {
    let options = channel.service().options();
    println!("channel:             {}", channel.name());
    println!("method:              {}", EXTRACT_TEXT);
    println!("engine (configured): {:?}", config.ocr.engine);
    println!("engine (resolved):   {:?}", resolve_engine_kind(config.ocr.engine));
    println!("engine name:         {}", channel.service().engine_name());
    println!("recognition level:   {:?}", options.level);
    println!("language correction: {}", options.language_correction);
    if options.languages.is_empty() {
        println!("languages:           (engine default)");
    } else {
        println!("languages:           {}", options.languages.join(", "));
    }
    println!("security scope:      {}", config.ocr.security_scoped_access);
}
