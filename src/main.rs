use anyhow::Context;
use clap::{Parser, ValueEnum};
use serde_json::json;
use sipserde::{Config, ParseState, SerdeState, SipMessage, SipSerde};
use std::path::PathBuf;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

/// Parse SIP messages from a byte stream and dump them
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Bytes handed to the parser per read
    #[arg(
        short = 'n',
        long,
        default_value_t = 512,
        value_parser = clap::value_parser!(u16).range(1..)
    )]
    chunk_size: u16,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = Format::Text)]
    format: Format,

    /// Input file, stdin if omitted
    input: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    /// Human-readable dump
    Text,
    /// One JSON object per line
    Json,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct DumpSummary {
    messages: u64,
    errors: u64,
    bytes: u64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let config = Config::load(args.config.as_deref()).context("loading configuration")?;
    debug!("Configuration loaded: {:?}", config);

    let mut serde = SipSerde::with_config(config.sip);
    let mut stdout = tokio::io::stdout();
    let chunk_size = usize::from(args.chunk_size);

    let summary = match &args.input {
        Some(path) => {
            let mut file = tokio::fs::File::open(path)
                .await
                .with_context(|| format!("opening {}", path.display()))?;
            dump_stream(&mut serde, &mut file, &mut stdout, chunk_size, args.format).await?
        }
        None => {
            let mut stdin = tokio::io::stdin();
            dump_stream(&mut serde, &mut stdin, &mut stdout, chunk_size, args.format).await?
        }
    };

    info!(
        "Dumped {} SIP messages from {} bytes, {} parse errors",
        summary.messages, summary.bytes, summary.errors
    );
    Ok(())
}

/// Feed `reader` to `serde` in chunks and dump every completed message.
///
/// Parse errors are logged and the codec is cleared to resynchronize.
async fn dump_stream<R, W>(
    serde: &mut SipSerde,
    reader: &mut R,
    out: &mut W,
    chunk_size: usize,
    format: Format,
) -> anyhow::Result<DumpSummary>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut summary = DumpSummary::default();
    let mut chunk = vec![0u8; chunk_size];

    loop {
        let n = reader.read(&mut chunk).await.context("reading input")?;
        if n == 0 {
            break;
        }
        summary.bytes += n as u64;

        match serde.add_raw(&chunk[..n]) {
            Ok(SerdeState::End) => drain(serde, out, format, &mut summary).await?,
            Ok(SerdeState::Progress) => {}
            Err(e) => {
                warn!("Dropping malformed SIP input: {}", e);
                summary.errors += 1;
                serde.clear_buffer();
            }
        }
    }

    if serde.residuum_len() > 0 || serde.state() != ParseState::StartLine {
        warn!(
            "Input ended with {} unparsed bytes in state {}",
            serde.residuum_len(),
            serde.state()
        );
    }

    out.flush().await.context("flushing output")?;
    Ok(summary)
}

async fn drain<W>(
    serde: &mut SipSerde,
    out: &mut W,
    format: Format,
    summary: &mut DumpSummary,
) -> anyhow::Result<()>
where
    W: AsyncWrite + Unpin,
{
    loop {
        match serde.pop_datum() {
            Ok(Some(msg)) => {
                out.write_all(render(&msg, format)?.as_bytes())
                    .await
                    .context("writing output")?;
                summary.messages += 1;
                serde.release(msg);
            }
            Ok(None) => return Ok(()),
            Err(e) => {
                warn!("Dropping malformed SIP input: {}", e);
                summary.errors += 1;
                serde.clear_buffer();
                return Ok(());
            }
        }
    }
}

fn render(msg: &SipMessage, format: Format) -> anyhow::Result<String> {
    match format {
        Format::Text => Ok(msg.to_string()),
        Format::Json => {
            let headers: serde_json::Map<String, serde_json::Value> = msg
                .headers()
                .iter()
                .map(|(name, value)| (name.to_string(), json!(value)))
                .collect();
            let value = json!({
                "type": msg.message_type(),
                "method": msg.method(),
                "uri": msg.uri(),
                "code": msg.response_code(),
                "reason": msg.reason(),
                "headers": headers,
                "body": msg.body().map(|body| String::from_utf8_lossy(body).into_owned()),
            });
            let mut line = serde_json::to_string(&value).context("encoding JSON")?;
            line.push('\n');
            Ok(line)
        }
    }
}
