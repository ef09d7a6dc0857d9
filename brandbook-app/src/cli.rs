use crate::server::{self, AppState};
use crate::tether::{Session, Tether};
use anyhow::{Result, bail};
use brandbook_common::ProviderKind;
use clap::{Args, Parser, Subcommand};
use futures::StreamExt;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

#[derive(Debug, Parser)]
#[command(name = "brandbook", version, about = "AI-powered company brochure generator")]
pub struct Cli {
    /// Configuration file; `brandbook.yaml` in the working directory and the
    /// user config directory are read when present.
    #[arg(long, short, global = true, env = "BRANDBOOK_CONFIG")]
    pub config: Option<PathBuf>,

    /// Mirror logs to stderr.
    #[arg(long, short, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Find the website of a company and stream its brochure to stdout.
    Generate {
        /// Company name or website, e.g. "HuggingFace".
        #[arg(long)]
        company: String,
        /// Skip the lookup and use this URL.
        #[arg(long)]
        url: Option<String>,
        #[command(flatten)]
        model: ModelArgs,
    },
    /// Print the official website of a company.
    FindUrl {
        company: String,
        #[command(flatten)]
        model: ModelArgs,
    },
    /// Run the HTTP API.
    Serve {
        /// Listen address; defaults to `server.bind` from the configuration.
        #[arg(long)]
        bind: Option<String>,
    },
}

#[derive(Debug, Args)]
pub struct ModelArgs {
    /// openai, gemini, ollama or claude.
    #[arg(long)]
    pub provider: Option<String>,
    #[arg(long)]
    pub model: Option<String>,
}

impl ModelArgs {
    async fn session(&self, tether: &Tether) -> Result<Session> {
        let provider = self
            .provider
            .as_deref()
            .map(str::parse::<ProviderKind>)
            .transpose()?;
        let session = tether.connect(provider, self.model.as_deref()).await?;
        eprintln!("Selected: {} - {}", session.provider, session.model);
        Ok(session)
    }
}

pub async fn run(cli: Cli, tether: Tether) -> Result<()> {
    match cli.command {
        Command::Generate {
            company,
            url,
            model,
        } => {
            let session = model.session(&tether).await?;
            let url = match url {
                Some(url) => url,
                None => match tether.resolver.resolve(&company, session.gateway.as_ref()).await {
                    Some(url) => {
                        eprintln!("Found website: {url}");
                        url
                    }
                    None => {
                        let mut stdin = tokio::io::BufReader::new(tokio::io::stdin());
                        let mut stderr = tokio::io::stderr();
                        ask_for_url(&mut stdin, &mut stderr).await?
                    }
                },
            };
            let mut stdout = tokio::io::stdout();
            stream_brochure(&tether, &session, &company, &url, &mut stdout).await
        }
        Command::FindUrl { company, model } => {
            let session = model.session(&tether).await?;
            match tether.resolver.resolve(&company, session.gateway.as_ref()).await {
                Some(url) => {
                    println!("{url}");
                    Ok(())
                }
                None => bail!("Could not find URL for {company}"),
            }
        }
        Command::Serve { bind } => {
            let bind = bind.unwrap_or_else(|| tether.config.server.bind.clone());
            let session = match tether.connect(None, None).await {
                Ok(session) => {
                    tracing::info!(provider = %session.provider, model = %session.model, "model initialized");
                    Some(session)
                }
                Err(e) => {
                    tracing::warn!(error = %e, "model initialization failed");
                    None
                }
            };
            server::serve(AppState::new(Arc::new(tether), session), &bind).await
        }
    }
}

/// Manual fallback when the lookup fails. Adds `https://` when the answer
/// has no scheme.
pub async fn ask_for_url<R, W>(input: &mut R, prompt: &mut W) -> Result<String>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    prompt
        .write_all(b"Enter website URL manually (e.g., https://huggingface.co): ")
        .await?;
    prompt.flush().await?;

    let mut line = String::new();
    input.read_line(&mut line).await?;
    let url = line.trim();
    if url.is_empty() {
        bail!("no website URL given");
    }
    if url.starts_with("http://") || url.starts_with("https://") {
        Ok(url.to_string())
    } else {
        Ok(format!("https://{url}"))
    }
}

/// Write brochure fragments to `out` as they arrive.
pub async fn stream_brochure<W>(
    tether: &Tether,
    session: &Session,
    company: &str,
    url: &str,
    out: &mut W,
) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let response = tether
        .composer
        .compose(company, url, session.gateway.as_ref(), true)
        .await?;
    let mut fragments = response.into_stream();
    while let Some(fragment) = fragments.next().await {
        out.write_all(fragment?.delta.as_bytes()).await?;
        out.flush().await?;
    }
    out.write_all(b"\n").await?;
    out.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_generate_flags() {
        let cli = Cli::try_parse_from([
            "brandbook",
            "generate",
            "--company",
            "Hugging Face",
            "--provider",
            "ollama",
            "--model",
            "llama3",
        ])
        .unwrap();
        match cli.command {
            Command::Generate {
                company,
                url,
                model,
            } => {
                assert_eq!(company, "Hugging Face");
                assert_eq!(url, None);
                assert_eq!(model.provider.as_deref(), Some("ollama"));
                assert_eq!(model.model.as_deref(), Some("llama3"));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn serve_bind_is_optional() {
        let cli = Cli::try_parse_from(["brandbook", "serve"]).unwrap();
        assert!(matches!(cli.command, Command::Serve { bind: None }));

        let cli = Cli::try_parse_from(["brandbook", "-v", "serve", "--bind", "127.0.0.1:9000"]).unwrap();
        assert!(cli.verbose);
        assert!(matches!(cli.command, Command::Serve { bind: Some(ref b) } if b == "127.0.0.1:9000"));
    }

    #[test]
    fn find_url_takes_positional_company() {
        let cli = Cli::try_parse_from(["brandbook", "find-url", "OpenAI"]).unwrap();
        assert!(matches!(cli.command, Command::FindUrl { ref company, .. } if company == "OpenAI"));
    }
}
