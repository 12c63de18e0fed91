use std::time::{Duration, Instant};

use tokio::{sync::mpsc, task::JoinSet};
use tracing::{error, info, warn};

use crate::config::RunConfig;
use crate::parse::parse_markup;
use crate::record::{RawPayload, Record};
use crate::request::{GenerationRequest, Generator};
use crate::sink::{connect, Sink};
use crate::{output, Error, Result};

/// The generation service has no availability guarantee, so every outbound
/// call carries a deadline; a timed-out call fails only its own task.
const GENERATION_TIMEOUT: Duration = Duration::from_secs(30);

/// What a finished batch looked like. Per-record failures are counted here
/// instead of aborting the run; the caller decides whether a partial batch
/// is acceptable.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BatchSummary {
    pub persisted: usize,
    pub generation_failures: usize,
    pub write_failures: usize,
}

/// Fans out `concurrency` independent generation tasks and streams their
/// outcomes back in completion order, not submission order.
///
/// Each task owns its unit of work end to end: one network call, plus the
/// parsing stage when the payload is markup, so parsers run concurrently
/// with still-pending generator calls. A failed task becomes an `Err` item
/// in the stream and never disturbs its siblings.
pub fn run_batch(
    generator: Generator,
    request: GenerationRequest,
    concurrency: usize,
) -> mpsc::Receiver<Result<Record>> {
    let (tx, rx) = mpsc::channel(concurrency.max(1));

    tokio::spawn(async move {
        let mut tasks = JoinSet::new();
        for _ in 0..concurrency {
            let generator = generator.clone();
            let request = request.clone();
            tasks.spawn(async move { generate_record(&generator, &request).await });
        }

        while let Some(joined) = tasks.join_next().await {
            let outcome = match joined {
                Ok(outcome) => outcome,
                Err(err) => Err(Error::RuntimeJoin(err)),
            };
            // A dropped receiver means the consumer is gone; stop quietly.
            if tx.send(outcome).await.is_err() {
                break;
            }
        }
    });

    rx
}

async fn generate_record(generator: &Generator, request: &GenerationRequest) -> Result<Record> {
    match generator.generate(request).await? {
        RawPayload::Markup(html) => parse_markup(html.into()).await,
        RawPayload::Structured(record) => Ok(record),
    }
}

/// Runs one full batch: fan out, stream completions into the sink, then
/// flush the optional file side channel.
///
/// The sink's shared connection handle is only ever touched from the single
/// writer loop below, so concurrent tasks never race on it.
pub async fn run(config: RunConfig) -> Result<BatchSummary> {
    let start = Instant::now();

    let client = reqwest::Client::builder()
        .timeout(GENERATION_TIMEOUT)
        .build()?;
    let generator = Generator::new(client);
    let pool = connect(&config.db).await?;
    let sink = Sink::new(pool, config.backend, config.destination.clone())?;

    info!(
        destination = %config.destination,
        kind = ?config.request.kind,
        concurrency = config.concurrency,
        "starting batch"
    );

    let mut results = run_batch(generator, config.request.clone(), config.concurrency);

    let mut summary = BatchSummary::default();
    let mut for_output: Vec<Record> = Vec::new();

    while let Some(outcome) = results.recv().await {
        match outcome {
            Ok(record) => match sink.write(&record).await {
                Ok(()) => {
                    summary.persisted += 1;
                    if config.output.is_some() {
                        for_output.push(record);
                    }
                }
                Err(err) => {
                    error!(%err, "failed to persist record");
                    summary.write_failures += 1;
                }
            },
            Err(err) => {
                warn!(%err, "generation task failed");
                summary.generation_failures += 1;
            }
        }
    }

    if let Some(target) = &config.output {
        output::write_records(&target.path, target.format, &for_output).await?;
    }

    sink.close().await;

    info!(
        persisted = summary.persisted,
        generation_failures = summary.generation_failures,
        write_failures = summary.write_failures,
        elapsed_ms = start.elapsed().as_millis() as u64,
        "batch finished"
    );
    Ok(summary)
}
