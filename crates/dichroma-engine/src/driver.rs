//! Async frame loop and the command handle that drives it.
//!
//! The host spawns [`FrameProcessor::run`] on a tokio runtime and controls it
//! from anywhere through a cloneable [`ProcessorHandle`]. Commands and frame
//! ticks are multiplexed on one task, so the processor is never shared.

use std::time::Duration;

use dichroma_core::VisionMode;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;

use crate::processor::{FrameProcessor, ProcessorError};
use crate::source::LutLocator;

/// A control-surface operation queued for the frame loop.
#[derive(Debug, Clone)]
pub enum ProcessorCommand {
    CheckPermission,
    Load,
    Stop,
    ChangeMode(Option<LutLocator>),
    SelectMode(Option<VisionMode>),
    SetAcuity(f32),
    Resize { width: u32, height: u32 },
    SetVisible(bool),
    Shutdown,
}

/// Sends commands to a running frame loop.
#[derive(Clone)]
pub struct ProcessorHandle {
    tx: mpsc::UnboundedSender<ProcessorCommand>,
}

impl ProcessorHandle {
    /// Create a handle and the receiver to pass to [`FrameProcessor::run`].
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<ProcessorCommand>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    pub fn send(&self, command: ProcessorCommand) -> Result<(), ProcessorError> {
        self.tx.send(command).map_err(|_| ProcessorError::LoopClosed)
    }

    pub fn check_permission(&self) -> Result<(), ProcessorError> {
        self.send(ProcessorCommand::CheckPermission)
    }

    pub fn load(&self) -> Result<(), ProcessorError> {
        self.send(ProcessorCommand::Load)
    }

    pub fn stop(&self) -> Result<(), ProcessorError> {
        self.send(ProcessorCommand::Stop)
    }

    pub fn change_mode(&self, locator: Option<LutLocator>) -> Result<(), ProcessorError> {
        self.send(ProcessorCommand::ChangeMode(locator))
    }

    pub fn select_mode(&self, mode: Option<VisionMode>) -> Result<(), ProcessorError> {
        self.send(ProcessorCommand::SelectMode(mode))
    }

    pub fn set_acuity(&self, acuity: f32) -> Result<(), ProcessorError> {
        self.send(ProcessorCommand::SetAcuity(acuity))
    }

    pub fn resize(&self, width: u32, height: u32) -> Result<(), ProcessorError> {
        self.send(ProcessorCommand::Resize { width, height })
    }

    pub fn set_visible(&self, visible: bool) -> Result<(), ProcessorError> {
        self.send(ProcessorCommand::SetVisible(visible))
    }

    pub fn shutdown(&self) -> Result<(), ProcessorError> {
        self.send(ProcessorCommand::Shutdown)
    }

    /// True once the frame loop has exited.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

impl FrameProcessor {
    /// Apply one command.
    pub async fn handle_command(
        &mut self,
        command: ProcessorCommand,
    ) -> Result<(), ProcessorError> {
        match command {
            ProcessorCommand::CheckPermission => self.check_permission().await?,
            ProcessorCommand::Load => self.load().await?,
            ProcessorCommand::Stop | ProcessorCommand::Shutdown => self.stop(),
            ProcessorCommand::ChangeMode(locator) => self.change_mode(locator),
            ProcessorCommand::SelectMode(mode) => self.select_mode(mode.as_ref()),
            ProcessorCommand::SetAcuity(acuity) => self.set_acuity(acuity),
            ProcessorCommand::Resize { width, height } => self.handle_resize(width, height),
            ProcessorCommand::SetVisible(visible) => self.set_visible(visible).await?,
        }
        Ok(())
    }

    /// Run the frame loop until [`ProcessorCommand::Shutdown`] arrives or
    /// every handle is dropped. The camera is released on exit and the
    /// processor is handed back.
    ///
    /// Command and frame errors are logged; neither ends the loop.
    pub async fn run(mut self, mut commands: mpsc::UnboundedReceiver<ProcessorCommand>) -> Self {
        let interval = self.config().frame_interval.max(Duration::from_millis(1));
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        tracing::info!("frame loop started ({interval:?} per frame)");
        loop {
            tokio::select! {
                biased;
                command = commands.recv() => match command {
                    None | Some(ProcessorCommand::Shutdown) => break,
                    Some(command) => {
                        if let Err(e) = self.handle_command(command).await {
                            tracing::warn!("command failed: {e}");
                        }
                    }
                },
                now = ticker.tick() => {
                    if let Err(e) = self.render_frame(now.into_std()) {
                        tracing::warn!("frame skipped: {e}");
                    }
                }
            }
        }

        self.stop();
        tracing::info!("frame loop shut down");
        self
    }
}
