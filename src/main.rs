mod cli;

use crate::cli::{Cli, CliCommand};
use anyhow::{anyhow, bail, Context, Result};
use clap::Parser;
use futures::StreamExt;
use ircwire::config::{self, AppConfig, ServerConfig};
use ircwire::{Client, Handler, HandlerRegistry, JsonLineCodec, LineCodec, Message};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio_util::codec::FramedRead;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let CliCommand::InitConfig { force } = cli.command {
        return init_config(cli.config, force);
    }

    let cfg = config::load_config(cli.config.as_deref())?;
    ircwire::logging::init(&cfg.logging)?;

    match cli.command {
        CliCommand::Json { file } => json_view(file.as_deref(), &cfg).await,
        CliCommand::Connect { server } => connect(&cfg, server.as_deref()).await,
        CliCommand::InitConfig { .. } => Ok(()),
    }
}

fn init_config(path: Option<PathBuf>, force: bool) -> Result<()> {
    let path = path.unwrap_or_else(config::config_path);
    if path.exists() && !force {
        bail!("{} already exists (use --force to overwrite)", path.display());
    }
    config::save_config(&AppConfig::default(), &path)?;
    println!("Wrote {}", path.display());
    Ok(())
}

/// Diagnostic pass-through: one JSON object per input line on stdout.
async fn json_view(file: Option<&Path>, cfg: &AppConfig) -> Result<()> {
    let input: Box<dyn AsyncRead + Send + Unpin> = match file {
        Some(path) => Box::new(
            tokio::fs::File::open(path)
                .await
                .with_context(|| format!("Failed to open {}", path.display()))?,
        ),
        None => Box::new(tokio::io::stdin()),
    };
    let codec = JsonLineCodec::new(LineCodec::with_max_len(cfg.client.max_line_len));
    let mut frames = FramedRead::new(input, codec);
    let mut stdout = tokio::io::stdout();

    let mut line_no = 0usize;
    while let Some(frame) = frames.next().await {
        line_no += 1;
        let json = frame.with_context(|| format!("Input line {}", line_no))?;
        stdout.write_all(json.as_bytes()).await?;
        stdout.write_all(b"\n").await?;
    }
    stdout.flush().await?;
    Ok(())
}

async fn connect(cfg: &AppConfig, name: Option<&str>) -> Result<()> {
    let server = cfg.server(name).ok_or_else(|| match name {
        Some(name) => anyhow!("No server named {:?} in config", name),
        None => anyhow!("No servers configured"),
    })?;

    let stream = TcpStream::connect((server.host.as_str(), server.port))
        .await
        .with_context(|| format!("Failed to connect to {}:{}", server.host, server.port))?;
    info!(server = %server.name, host = %server.host, port = server.port, "connected");

    let handlers = HandlerRegistry::new();
    handlers
        .add(pong())
        .add(join_on_welcome(server.channels.clone()))
        .add(log_chat())
        .add(server_error_is_fatal());

    let client = Client::with_config(stream, handlers, &cfg.client);
    client.send_all(&registration(server)).await?;

    let run = tokio::spawn({
        let client = Arc::clone(&client);
        async move { client.run().await }
    });

    let mut interrupted = false;
    tokio::select! {
        _ = client.done() => {}
        _ = tokio::signal::ctrl_c() => {
            interrupted = true;
            info!("interrupted, sending QUIT");
            let quit = Message::new("QUIT").with_trailing(server.quit_message.clone());
            if let Err(e) = client.send(&quit).await {
                warn!(error = %e, "failed to send QUIT");
            }
            client.fatal(anyhow!("interrupted")).await;
        }
    }

    match run.await.context("client task panicked")? {
        Err(_) if interrupted => Ok(()),
        Err(e) => Err(anyhow::Error::new(e).context("connection terminated")),
        Ok(()) => Ok(()),
    }
}

fn registration(server: &ServerConfig) -> Vec<Message> {
    let mut msgs = Vec::new();
    if let Some(password) = &server.password {
        msgs.push(Message::new("PASS").with_param(password.clone()));
    }
    let username = server.username.as_deref().unwrap_or(&server.nickname);
    let realname = server.realname.as_deref().unwrap_or(&server.nickname);
    msgs.push(Message::new("NICK").with_param(server.nickname.clone()));
    msgs.push(
        Message::new("USER")
            .with_param(username)
            .with_param("0")
            .with_param("*")
            .with_trailing(realname),
    );
    msgs
}

fn pong() -> Arc<Handler> {
    Handler::on_command("PING", |client: Arc<Client>, msg: Arc<Message>| async move {
        let pong = Message {
            command: "PONG".to_string(),
            ..(*msg).clone()
        };
        if let Err(e) = client.send(&pong).await {
            client.warn(e).await;
        }
    })
}

fn join_on_welcome(channels: Vec<String>) -> Arc<Handler> {
    Handler::on_command("001", move |client: Arc<Client>, _| {
        let channels = channels.clone();
        async move {
            for channel in channels {
                if let Err(e) = client.send(&Message::new("JOIN").with_param(channel)).await {
                    client.warn(e).await;
                }
            }
        }
    })
}

fn log_chat() -> Arc<Handler> {
    Handler::new(
        |msg: &Message| msg.is_command("PRIVMSG") || msg.is_command("NOTICE"),
        |_, msg: Arc<Message>| async move {
            info!(
                from = msg.prefix.as_deref().unwrap_or("-"),
                target = msg.parameters.first().map(String::as_str).unwrap_or("-"),
                text = msg.trailing.as_deref().unwrap_or(""),
                "{}",
                msg.command
            );
        },
    )
}

fn server_error_is_fatal() -> Arc<Handler> {
    Handler::on_command("ERROR", |client: Arc<Client>, msg: Arc<Message>| async move {
        let reason = msg.trailing.clone().unwrap_or_default();
        client.fatal(anyhow!("server closed the link: {}", reason)).await;
    })
}
