// src/main.rs
mod metrics;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use memmap2::Mmap;
use std::{
    fs::File,
    io::{BufReader, Read},
    path::PathBuf,
    sync::Arc,
    time::Instant,
};
use tokio::{io::AsyncWriteExt, sync::mpsc, task};
use tracing::{error, info, warn};

use crate::metrics::Metrics;
use depthfeed::{
    book::{Books, Side},
    config::{Config, Env},
    decoder::{FrameDecoder, Record},
    wire,
};

#[derive(Parser, Debug)]
#[command(name = "depthfeed", version)]
struct Cli {
    /// Number of price levels printed per side; overrides the profile's
    /// book.depth (3 unless configured).
    #[arg(long)]
    depth: Option<usize>,
    /// Replay a capture file instead of reading stdin.
    #[arg(long)]
    file: Option<PathBuf>,
    /// Source read chunk size in bytes.
    #[arg(long, default_value_t = 4096)]
    chunk: usize,
}

#[tokio::main]
async fn main() -> Result<()> {
    // depth lines own stdout; all diagnostics go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let env = Env::from_env();
    let cfg = Config::load(env).context("load configuration")?;
    anyhow::ensure!(
        cfg.stream.header_length >= 8,
        "stream.header_length must be at least 8"
    );

    let depth = cli.depth.unwrap_or(cfg.book.depth);
    info!(
        app = %cfg.app.id,
        version = %cfg.app.version,
        %env,
        depth,
        "starting"
    );

    let metrics = Arc::new(Metrics::new());
    let (tx, rx) = mpsc::channel::<Record>(32_768);

    let producer = {
        let header_len = cfg.stream.header_length;
        let file = cli.file.clone();
        let chunk = cli.chunk.max(1);
        task::spawn_blocking(move || read_source(file, header_len, chunk, tx))
    };
    let consumer = tokio::spawn(consume(rx, depth, metrics.clone()));

    // Two-phase shutdown: the producer drops the sender at EOF (or on
    // error), the consumer drains the channel and flushes, and only then
    // does either result surface here.
    let produced = producer.await.context("producer task panicked")?;
    let consumed = consumer.await.context("consumer task panicked")?;
    produced?;
    consumed?;

    metrics.log_summary();
    Ok(())
}

/// Reads the byte source in chunks and feeds the frame decoder, sending
/// each complete record down the channel in stream order.
fn read_source(
    file: Option<PathBuf>,
    header_len: usize,
    chunk: usize,
    tx: mpsc::Sender<Record>,
) -> Result<()> {
    let mut dec = FrameDecoder::with_header_len(header_len);

    match file {
        Some(path) => {
            let f = File::open(&path).with_context(|| format!("open {:?}", path))?;
            let mmap = unsafe { Mmap::map(&f)? };
            info!(bytes = mmap.len(), file = ?path, "replaying capture");
            for part in mmap.chunks(chunk) {
                if !pump(&mut dec, part, &tx)? {
                    return Ok(());
                }
            }
        }
        None => {
            let stdin = std::io::stdin();
            let mut rd = BufReader::with_capacity(1 << 20, stdin.lock());
            let mut part = vec![0u8; chunk];
            loop {
                let n = rd.read(&mut part).context("read stdin")?;
                if n == 0 {
                    break;
                }
                if !pump(&mut dec, &part[..n], &tx)? {
                    return Ok(());
                }
            }
        }
    }

    dec.finish().context("stream ended mid-record")?;
    info!("stream finished");
    Ok(())
}

/// Feeds one chunk through the decoder. Returns `Ok(false)` when the
/// consumer has gone away; its join result carries the reason.
fn pump(dec: &mut FrameDecoder, part: &[u8], tx: &mpsc::Sender<Record>) -> Result<bool> {
    dec.push(part);
    while let Some(rec) = dec.next_record()? {
        if tx.blocking_send(rec).is_err() {
            return Ok(false);
        }
    }
    Ok(true)
}

/// Applies records to the books and prints a depth line whenever one
/// changed the visible prefix of its symbol.
async fn consume(
    mut rx: mpsc::Receiver<Record>,
    depth: usize,
    metrics: Arc<Metrics>,
) -> Result<()> {
    let mut books = Books::new(depth);
    let mut out = tokio::io::BufWriter::new(tokio::io::stdout());

    while let Some(rec) = rx.recv().await {
        metrics.inc_total();

        let t0 = Instant::now();
        let res = books.apply(&rec.body);
        metrics.record_engine(t0.elapsed());

        match res {
            Ok(true) => {
                let symbol = rec.body.symbol();
                if let Some(book) = books.get(symbol) {
                    let line = wire::encode_depth_line(
                        rec.seq,
                        symbol,
                        &book.visible(Side::Buy),
                        &book.visible(Side::Sell),
                    );
                    out.write_all(&line).await.context("write depth line")?;
                    metrics.inc_printed();
                }
            }
            Ok(false) => {}
            Err(e) if e.is_fatal() => {
                out.flush().await.ok();
                error!(seq = rec.seq, "fatal book error: {e}");
                return Err(anyhow!(e));
            }
            Err(e) => {
                warn!(seq = rec.seq, "dropping record: {e}");
                metrics.inc_dropped();
            }
        }
    }

    out.flush().await.context("flush output")?;
    info!(symbols = books.len(), "books drained");
    Ok(())
}
