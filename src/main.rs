/*!
 * VOS Memory - Demo Entry Point
 *
 * Brings up an allocator from configuration, exercises it through a message
 * queue and prints the resulting usage snapshot as JSON.
 *
 * Usage: vos-mem [config.json]
 */

use miette::{Diagnostic, MietteHandlerOpts, Report};
use tracing::info;
use vos_mem::core::limits::DEFAULT_RECEIVE_TIMEOUT;
use vos_mem::{
    init_tracing, span_operation, AllocatorConfig, ConfigError, MemoryError, QueueManager,
};

/// Print a diagnostic through the graphical handler and convert it for `main`
fn report<E>(context: &str, error: E) -> anyhow::Error
where
    E: Diagnostic + Send + Sync + 'static,
{
    let report = Report::new(error);
    eprintln!("{:?}", report);
    anyhow::anyhow!("{}: {}", context, report)
}

fn load_config() -> Result<AllocatorConfig, ConfigError> {
    match std::env::args().nth(1) {
        Some(path) => AllocatorConfig::from_file(&path)?.with_env_overrides(),
        None => AllocatorConfig::from_env(),
    }
}

fn main() -> anyhow::Result<()> {
    // Only fails if a hook is already installed
    let _ = miette::set_hook(Box::new(|_| {
        Box::new(MietteHandlerOpts::new().context_lines(2).build())
    }));
    init_tracing();

    let config = load_config().map_err(|e| report("loading allocator config", e))?;
    info!(
        region_size = config.region_size,
        plan = %config.preallocation,
        "Allocator configuration loaded"
    );

    let (allocator, region) = config
        .build()
        .map_err(|e| report("initializing allocator", MemoryError::from(e)))?;
    info!("Region {} ready", region);

    {
        let span = span_operation("block_roundtrip");
        span.in_scope(|| {
            let block = allocator.allocate_guard(100)?;
            block.write(0, b"hello region")?;
            info!("Wrote into {}", block.handle());
            block.release()
        })?;
    }

    let queues = QueueManager::new(allocator.clone());
    {
        let span = span_operation("queue_roundtrip");
        span.in_scope(|| {
            let id = queues.create("demo", 8, 1024)?;
            queues.send(id, b"ping")?;
            let reply = queues.receive(id, DEFAULT_RECEIVE_TIMEOUT)?;
            info!("Received {} bytes from queue {}", reply.len(), id);
            queues.destroy(id)
        })?;
    }

    let usage = allocator.usage()?;
    println!("{}", serde_json::to_string_pretty(&usage)?);
    println!("{}", serde_json::to_string_pretty(&allocator.stats()?)?);

    allocator.teardown(region)?;
    info!("Region {} torn down", region);
    Ok(())
}
