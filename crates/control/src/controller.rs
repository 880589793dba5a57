use crate::command::Command;
use pps_common::{ParamError, ParamName, SwarmParams};
use pps_kernel::{ComputeBackend, SimError, Simulation};
use std::sync::mpsc::{self, Receiver, Sender};

#[derive(Debug, thiserror::Error)]
pub enum ControlError {
    #[error(transparent)]
    Param(#[from] ParamError),
    #[error("frame loop is gone; command dropped")]
    Disconnected,
}

/// Create a connected controller/inbox pair.
pub fn channel() -> (InteractionController, CommandInbox) {
    let (tx, rx) = mpsc::channel();
    (InteractionController { tx }, CommandInbox { rx })
}

/// Sending half, held by UI code. Cheap to clone and `Send`.
#[derive(Debug, Clone)]
pub struct InteractionController {
    tx: Sender<Command>,
}

impl InteractionController {
    /// Set a parameter by its contract name (`speed`, `neighborhoodRadius`,
    /// `globalRotation`, `localRotation`).
    pub fn set_parameter_by_name(&self, name: &str, value: f32) -> Result<(), ControlError> {
        let name: ParamName = name.parse()?;
        self.set_parameter(name, value)
    }

    pub fn set_parameter(&self, name: ParamName, value: f32) -> Result<(), ControlError> {
        let value = name.validate(value)?;
        self.send(Command::SetParameter { name, value })
    }

    pub fn set_params(&self, params: SwarmParams) -> Result<(), ControlError> {
        params.validate()?;
        self.send(Command::SetParams(params))
    }

    pub fn apply_preset(&self, name: &str) -> Result<(), ControlError> {
        SwarmParams::preset(name)?;
        self.send(Command::ApplyPreset(name.to_string()))
    }

    pub fn reset(&self) -> Result<(), ControlError> {
        self.send(Command::Reset)
    }

    pub fn randomize_and_reset(&self) -> Result<(), ControlError> {
        self.send(Command::RandomizeAndReset)
    }

    fn send(&self, command: Command) -> Result<(), ControlError> {
        tracing::debug!(?command, "command queued");
        self.tx.send(command).map_err(|_| ControlError::Disconnected)
    }
}

/// Receiving half, owned by the frame loop.
#[derive(Debug)]
pub struct CommandInbox {
    rx: Receiver<Command>,
}

impl CommandInbox {
    /// Drain everything queued so far without blocking.
    pub fn drain(&self) -> Vec<Command> {
        self.rx.try_iter().collect()
    }

    /// Apply every pending command to `sim`, in send order. Call between
    /// frames. Returns how many were applied.
    pub fn apply_pending<B: ComputeBackend>(
        &self,
        sim: &mut Simulation<B>,
    ) -> Result<usize, SimError> {
        let mut applied = 0;
        for command in self.rx.try_iter() {
            apply(sim, command)?;
            applied += 1;
        }
        Ok(applied)
    }
}

fn apply<B: ComputeBackend>(sim: &mut Simulation<B>, command: Command) -> Result<(), SimError> {
    match command {
        Command::SetParameter { name, value } => {
            sim.set_parameter(name, value)?;
        }
        Command::SetParams(params) => sim.set_params(params)?,
        Command::Reset => sim.reset()?,
        Command::RandomizeAndReset => {
            sim.randomize_and_reset()?;
        }
        Command::ApplyPreset(name) => {
            let params = SwarmParams::preset(&name)?;
            sim.set_params(params)?;
            tracing::info!(preset = %name, "preset applied");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pps_kernel::{CpuBackend, SimConfig};

    fn sim() -> Simulation<CpuBackend> {
        let config = SimConfig {
            agent_count: 64,
            seed: Some(1),
            ..SimConfig::default()
        };
        let backend =
            CpuBackend::new(config.agent_count, config.buffer_count, config.group_sizes()).unwrap();
        let mut sim = Simulation::new(backend, config).unwrap();
        sim.initialize().unwrap();
        sim
    }

    #[test]
    fn invalid_values_never_reach_the_queue() {
        let (ctl, inbox) = channel();
        assert!(ctl.set_parameter(ParamName::Speed, f32::NAN).is_err());
        assert!(ctl.set_parameter_by_name("neighborhoodRadius", -1.0).is_err());
        assert!(matches!(
            ctl.set_parameter_by_name("gravity", 1.0),
            Err(ControlError::Param(ParamError::UnknownParameter(_)))
        ));
        assert!(ctl.apply_preset("nope").is_err());
        assert!(inbox.drain().is_empty());
    }

    #[test]
    fn commands_apply_in_send_order() {
        let (ctl, inbox) = channel();
        let mut sim = sim();
        ctl.set_parameter_by_name("localRotation", 0.2).unwrap();
        ctl.set_parameter_by_name("local_rotation", 0.4).unwrap();
        assert_eq!(inbox.apply_pending(&mut sim).unwrap(), 2);
        assert_eq!(sim.params().local_rotation, 0.4);
        assert_eq!(inbox.apply_pending(&mut sim).unwrap(), 0);
    }

    #[test]
    fn preset_replaces_whole_set() {
        let (ctl, inbox) = channel();
        let mut sim = sim();
        ctl.apply_preset("vortex").unwrap();
        inbox.apply_pending(&mut sim).unwrap();
        assert_eq!(sim.params(), SwarmParams::preset("vortex").unwrap());
    }

    #[test]
    fn reset_restarts_generations_and_keeps_params() {
        let (ctl, inbox) = channel();
        let mut sim = sim();
        sim.run_frame().unwrap();
        sim.run_frame().unwrap();
        let params = sim.params();
        ctl.reset().unwrap();
        inbox.apply_pending(&mut sim).unwrap();
        assert_eq!(sim.generation(), 0);
        assert_eq!(sim.params(), params);
    }

    #[test]
    fn controller_works_from_another_thread() {
        let (ctl, inbox) = channel();
        let mut sim = sim();
        let worker = ctl.clone();
        std::thread::spawn(move || {
            worker.set_parameter(ParamName::GlobalRotation, 0.25).unwrap();
            worker.randomize_and_reset().unwrap();
        })
        .join()
        .unwrap();
        assert_eq!(inbox.apply_pending(&mut sim).unwrap(), 2);
        assert_eq!(sim.generation(), 0);
        assert!(sim.params().validate().is_ok());
    }

    #[test]
    fn dropped_inbox_reports_disconnect() {
        let (ctl, inbox) = channel();
        drop(inbox);
        assert!(matches!(ctl.reset(), Err(ControlError::Disconnected)));
    }
}
