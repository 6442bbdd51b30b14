//! `cnkl verify` – chunk-by-chunk verification of a downloaded file.
//!
//! The engine runs on its own thread; this command polls its progress on a
//! fixed tick and redraws a single status line, then reports the outcome.

use anyhow::{Context, Result};
use cnkl_core::config::CnklConfig;
use cnkl_core::fetch;
use cnkl_core::{CancelToken, Launch, Outcome, ProgressSnapshot, VerifyError};
use std::io::Write;
use std::path::Path;
use std::time::Duration;

use crate::cli::VerifyArgs;

pub async fn run_verify(args: &VerifyArgs, cfg: &CnklConfig) -> Result<()> {
    let chunklist = load_chunklist(args, cfg).await?;

    let mut policy = cfg.policy();
    if args.require_chunklist {
        policy.require_chunklist = true;
    }
    if args.no_verify {
        policy.verify_if_present = false;
    }
    let poll = args
        .poll_interval_ms
        .map(|ms| Duration::from_millis(ms.max(1)))
        .unwrap_or_else(|| cfg.poll_interval());

    let launch = match policy.launch(&args.file, chunklist.as_deref(), &CancelToken::new()) {
        Ok(l) => l,
        Err(e) => return report(args, Err(e)),
    };

    if let Launch::Running(task) = &launch {
        let progress = task.progress();
        let mut tick = tokio::time::interval(poll);
        loop {
            tick.tick().await;
            let snap = progress.snapshot();
            if !args.json {
                draw(&snap);
            }
            if snap.is_terminal() {
                break;
            }
        }
        if !args.json {
            eprintln!();
        }
    }

    let result = tokio::task::spawn_blocking(move || launch.finish()).await?;
    report(args, result)
}

/// Chunklist bytes from `--chunklist` or `--chunklist-url`. `None` when the
/// server publishes none.
pub(crate) async fn load_chunklist(args: &VerifyArgs, cfg: &CnklConfig) -> Result<Option<Vec<u8>>> {
    if let Some(path) = &args.chunklist {
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("read chunklist {}", path.display()))?;
        return Ok(Some(bytes));
    }
    if let Some(url) = &args.chunklist_url {
        let url = url.clone();
        let fetch_cfg = cfg.fetch.clone();
        let bytes =
            tokio::task::spawn_blocking(move || fetch::fetch_chunklist(&url, &fetch_cfg)).await??;
        return Ok(bytes);
    }
    Ok(None)
}

fn draw(snap: &ProgressSnapshot) {
    let mut err = std::io::stderr().lock();
    let _ = write!(err, "\r{} ({:.0}%)", snap.label(), snap.fraction() * 100.0);
    let _ = err.flush();
}

fn report(args: &VerifyArgs, result: Result<Outcome, VerifyError>) -> Result<()> {
    match result {
        Ok(outcome) => {
            tracing::info!(file = %args.file.display(), ?outcome, "verification finished");
            if args.json {
                let value = serde_json::json!({ "file": args.file, "ok": true, "result": outcome });
                println!("{}", serde_json::to_string_pretty(&value)?);
            } else {
                println!("{}", outcome.user_message());
            }
            Ok(())
        }
        Err(e) => {
            tracing::error!(file = %args.file.display(), error = %e, "verification failed");
            if args.json {
                println!("{}", serde_json::to_string_pretty(&failure_json(&args.file, &e))?);
            }
            // main prints this once, as `cnkl error: <advice>: <cause>`
            Err(failure_error(e))
        }
    }
}

/// Chunk to blame in a failure report. Cancellation stops between chunks, so
/// it names none.
fn failure_chunk(e: &VerifyError) -> Option<u32> {
    match e {
        VerifyError::ChunkMismatch { .. } | VerifyError::Truncated { .. } | VerifyError::Io { .. } => {
            e.chunk()
        }
        _ => None,
    }
}

fn failure_json(file: &Path, e: &VerifyError) -> serde_json::Value {
    serde_json::json!({
        "file": file,
        "ok": false,
        "error": e.to_string(),
        "failure_chunk_index": failure_chunk(e),
        "cancelled": matches!(e, VerifyError::Cancelled { .. }),
        "corrupted": e.is_corruption(),
    })
}

fn failure_error(e: VerifyError) -> anyhow::Error {
    match e {
        // their user message already embeds the cause
        VerifyError::Io { .. } | VerifyError::AlreadyStarted | VerifyError::WorkerPanicked => {
            anyhow::Error::new(e)
        }
        e => {
            let advice = e.user_message();
            anyhow::Error::new(e).context(advice)
        }
    }
}
