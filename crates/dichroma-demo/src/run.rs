//! `run`: drive a frame processor headless.

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::Ordering;

use dichroma_core::mode::{builtin_modes, find_mode, parse_catalog};
use dichroma_core::{FrameGeometry, VisionMode};
use dichroma_engine::config::frame_interval;
use dichroma_engine::{FrameProcessor, ProcessorConfig, ProcessorEvent, ProcessorHandle};
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;

use crate::assets::FileLutSource;
use crate::cli::RunArgs;
use crate::error::DemoError;
use crate::synthetic::{LoggingSink, SyntheticCamera};

/// Mode id that selects the identity table.
const NORMAL_ID: &str = "normal";

pub async fn run(args: RunArgs) -> Result<(), DemoError> {
    let modes = load_catalog(args.catalog.as_deref())?;
    let requested = requested_modes(&modes, &args)?;
    let config = processor_config(&args);
    let interval = config.frame_interval;

    let sink = LoggingSink::new(args.log_every, args.snapshot.clone());
    let presented = sink.counter();
    let camera = SyntheticCamera::new(FrameGeometry::new(args.capture_width, args.capture_height));
    let source = Arc::new(FileLutSource::new(&args.luts));
    let processor = FrameProcessor::new(Box::new(camera), Box::new(sink), source, config)?;

    let event_log = tokio::spawn(log_events(processor.subscribe()));
    let (handle, commands) = ProcessorHandle::channel();
    let frame_loop = tokio::spawn(processor.run(commands));

    handle.check_permission()?;
    for mode in requested {
        handle.select_mode(mode)?;
    }

    while presented.load(Ordering::Relaxed) < args.frames && !handle.is_closed() {
        tokio::time::sleep(interval).await;
    }

    if handle.shutdown().is_err() {
        tracing::warn!("frame loop exited early");
    }
    let processor = frame_loop.await?;
    tracing::info!(
        "presented {} frames with {} ({})",
        presented.load(Ordering::Relaxed),
        processor.active_lut(),
        processor.stats()
    );

    drop(processor);
    event_log.abort();
    Ok(())
}

fn load_catalog(path: Option<&Path>) -> Result<Vec<VisionMode>, DemoError> {
    let Some(path) = path else {
        return Ok(builtin_modes());
    };
    let json = std::fs::read_to_string(path).map_err(|source| DemoError::Catalog {
        path: path.to_path_buf(),
        source,
    })?;
    let modes = parse_catalog(&json)?;
    tracing::info!("loaded {} vision modes from {}", modes.len(), path.display());
    Ok(modes)
}

/// Selections to send, in order. `None` selects normal vision.
fn requested_modes(
    modes: &[VisionMode],
    args: &RunArgs,
) -> Result<Vec<Option<VisionMode>>, DemoError> {
    let mut requested: Vec<Option<VisionMode>> = Vec::new();
    if args.cycle {
        requested.extend(modes.iter().cloned().map(Some));
    }
    if let Some(id) = &args.mode {
        if id.eq_ignore_ascii_case(NORMAL_ID) {
            requested.push(None);
        } else {
            let mode = find_mode(modes, id).ok_or_else(|| DemoError::UnknownMode(id.clone()))?;
            requested.push(Some(mode.clone()));
        }
    }
    Ok(requested)
}

fn processor_config(args: &RunArgs) -> ProcessorConfig {
    let mut config = ProcessorConfig::from_env();
    if let Some(fps) = args.fps {
        config.frame_interval = frame_interval(fps);
    }
    if let Some(resolution) = args.resolution {
        config.resolution = resolution;
    }
    config.initial_surface = FrameGeometry::new(args.surface_width, args.surface_height);
    config
}

async fn log_events(mut events: broadcast::Receiver<ProcessorEvent>) {
    loop {
        match events.recv().await {
            Ok(event) => match serde_json::to_string(&event) {
                Ok(json) => tracing::info!("event {json}"),
                Err(e) => tracing::error!("failed to serialize event: {e}"),
            },
            Err(RecvError::Lagged(missed)) => tracing::warn!("event log missed {missed} events"),
            Err(RecvError::Closed) => break,
        }
    }
}
