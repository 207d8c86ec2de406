use std::collections::HashSet;
use std::fs::File;

use anyhow::{Context, Result};
use memmap2::Mmap;

use depthfeed::book::Symbol;
use depthfeed::decoder::{Body, FrameDecoder};

fn main() -> Result<()> {
    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "data/feed.stream".to_string());
    let f = File::open(&path).with_context(|| format!("open {path}"))?;
    let mmap = unsafe { Mmap::map(&f)? };

    let mut dec = FrameDecoder::new();
    dec.push(&mmap);

    let mut symbols = HashSet::<Symbol>::new();
    let (mut adds, mut updates, mut deletes, mut executes) = (0u64, 0u64, 0u64, 0u64);

    while let Some(rec) = dec.next_record()? {
        symbols.insert(rec.body.symbol());
        match rec.body {
            Body::Add { .. } => adds += 1,
            Body::Update { .. } => updates += 1,
            Body::Delete { .. } => deletes += 1,
            Body::Execute { .. } => executes += 1,
        }
    }
    dec.finish()?;

    println!("unique_symbols={}", symbols.len());
    println!("add={adds}");
    println!("update={updates}");
    println!("delete={deletes}");
    println!("execute={executes}");
    Ok(())
}
