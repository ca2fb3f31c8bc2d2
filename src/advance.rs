//! Pure state transition: `RobotState × Command → RobotState`.
//!
//! The previous snapshot is never touched. A transition clones the snapshot
//! (a handful of `Arc` bumps) and copies only the sections it writes through
//! `Arc::make_mut`.

use crate::command::{Command, PipettingParams};
use crate::entities::InvariantContext;
use crate::robot_state::{
    AIR, AbsorbanceReaderInitialization, LabwareTemporalProperties, LiquidVolume, LoadedTip,
    LocationLiquidState, ModuleState, RobotState, TemperatureModuleState, TemperatureStatus,
    total_volume,
};
use std::sync::Arc;

impl RobotState {
    /// Snapshot after `command` has run.
    pub fn advance(&self, command: &Command, ctx: &InvariantContext) -> RobotState {
        let mut next = self.clone();
        next.apply(command, ctx);
        next
    }

    /// Snapshot after every command in `commands` has run, in order.
    pub fn apply_commands(&self, commands: &[Command], ctx: &InvariantContext) -> RobotState {
        let mut next = self.clone();
        for command in commands {
            next.apply(command, ctx);
        }
        next
    }

    fn apply(&mut self, command: &Command, ctx: &InvariantContext) {
        tracing::trace!(command = command.command_type(), "advance");
        match command {
            // --- Pipetting ---
            Command::Aspirate(p) => self.aspirate(p, ctx),
            Command::Dispense(p) => self.dispense(p, ctx),
            Command::Blowout(p) => {
                let wells = self.wells_for(&p.pipette_id, &p.labware_id, &p.well_name, ctx);
                let tips = self.take_tip_contents(&p.pipette_id);
                for (i, contents) in tips {
                    if let Some(well) = wells.get(i).or(wells.first()) {
                        self.merge_into_well(&p.labware_id, well, without_air(contents));
                    }
                }
            }
            Command::AirGapInPlace(p) => {
                let tips = self.active_tip_count(&p.pipette_id, ctx);
                let pipette = Arc::make_mut(&mut self.liquid_state)
                    .pipettes
                    .entry(p.pipette_id.clone())
                    .or_default();
                for i in 0..tips {
                    pipette
                        .entry(i)
                        .or_default()
                        .entry(AIR.to_string())
                        .or_default()
                        .volume += p.volume;
                }
            }
            Command::BlowOutInPlace(p) => {
                self.take_tip_contents(&p.pipette_id);
            }
            Command::TouchTip(_)
            | Command::MoveToWell(_)
            | Command::MoveToAddressableArea(_)
            | Command::MoveToAddressableAreaForDropTip(_)
            | Command::ConfigureForVolume(_) => {}

            // --- Tips ---
            Command::PickUpTip(p) => {
                let active = self.active_tip_count(&p.pipette_id, ctx);
                let rack = ctx.labware(&p.labware_id);
                let wells = rack
                    .and_then(|l| l.def.wells_under_nozzles(&p.well_name, active))
                    .unwrap_or_else(|| vec![p.well_name.clone()]);
                let tip_state = Arc::make_mut(&mut self.tip_state);
                if let Some(rack_wells) = tip_state.tipracks.get_mut(&p.labware_id) {
                    for well in &wells {
                        rack_wells.insert(well.clone(), false);
                    }
                }
                tip_state.pipettes.insert(p.pipette_id.clone(), true);
                let fallback = ctx.pipette(&p.pipette_id).map_or(0.0, |e| e.spec.max_volume);
                tip_state.loaded.insert(
                    p.pipette_id.clone(),
                    LoadedTip {
                        volume: rack
                            .and_then(|l| l.def.parameters.tip_volume)
                            .unwrap_or(fallback),
                        length: rack.and_then(|l| l.def.parameters.tip_length).unwrap_or(0.0),
                    },
                );
            }
            Command::DropTipInPlace(p) => {
                self.take_tip_contents(&p.pipette_id);
                let tip_state = Arc::make_mut(&mut self.tip_state);
                tip_state.pipettes.insert(p.pipette_id.clone(), false);
                tip_state.loaded.remove(&p.pipette_id);
            }
            Command::ConfigureNozzleLayout(p) => {
                if let Some(pipette) = Arc::make_mut(&mut self.pipettes).get_mut(&p.pipette_id) {
                    pipette.nozzles = p.configuration_params.style;
                }
            }

            // --- Labware ---
            Command::MoveLabware(p) => {
                Arc::make_mut(&mut self.labware).insert(
                    p.labware_id.clone(),
                    LabwareTemporalProperties {
                        location: p.new_location.clone(),
                    },
                );
            }

            // --- Magnetic module ---
            Command::EngageMagnet(p) => {
                if let Some(ModuleState::Magnetic(m)) = self.module_mut(&p.module_id) {
                    m.engaged = true;
                    m.engage_height = Some(p.height);
                }
            }
            Command::DisengageMagnet(p) => {
                if let Some(ModuleState::Magnetic(m)) = self.module_mut(&p.module_id) {
                    m.engaged = false;
                    m.engage_height = None;
                }
            }

            // --- Temperature module ---
            Command::TemperatureSetTarget(p) => {
                if let Some(ModuleState::Temperature(m)) = self.module_mut(&p.module_id) {
                    m.status = TemperatureStatus::Approaching;
                    m.target_temperature = Some(p.celsius);
                }
            }
            Command::TemperatureWait(p) => {
                if let Some(ModuleState::Temperature(m)) = self.module_mut(&p.module_id) {
                    m.status = TemperatureStatus::AtTarget;
                }
            }
            Command::TemperatureDeactivate(p) => {
                if let Some(ModuleState::Temperature(m)) = self.module_mut(&p.module_id) {
                    *m = TemperatureModuleState::default();
                }
            }

            // --- Heater-shaker ---
            Command::HeaterShakerSetTargetTemperature(p) => {
                if let Some(ModuleState::HeaterShaker(m)) = self.module_mut(&p.module_id) {
                    m.target_temp = Some(p.celsius);
                }
            }
            Command::HeaterShakerDeactivateHeater(p) => {
                if let Some(ModuleState::HeaterShaker(m)) = self.module_mut(&p.module_id) {
                    m.target_temp = None;
                }
            }
            Command::HeaterShakerSetShakeSpeed(p) => {
                if let Some(ModuleState::HeaterShaker(m)) = self.module_mut(&p.module_id) {
                    m.target_speed = Some(p.rpm);
                }
            }
            Command::HeaterShakerDeactivateShaker(p) => {
                if let Some(ModuleState::HeaterShaker(m)) = self.module_mut(&p.module_id) {
                    m.target_speed = None;
                }
            }
            Command::HeaterShakerOpenLatch(p) => {
                if let Some(ModuleState::HeaterShaker(m)) = self.module_mut(&p.module_id) {
                    m.latch_open = Some(true);
                }
            }
            Command::HeaterShakerCloseLatch(p) => {
                if let Some(ModuleState::HeaterShaker(m)) = self.module_mut(&p.module_id) {
                    m.latch_open = Some(false);
                }
            }
            Command::HeaterShakerWaitForTemperature(_) => {}

            // --- Thermocycler ---
            Command::ThermocyclerSetBlockTemperature(p) => {
                if let Some(ModuleState::Thermocycler(m)) = self.module_mut(&p.module_id) {
                    m.block_target_temp = Some(p.celsius);
                }
            }
            Command::ThermocyclerSetLidTemperature(p) => {
                if let Some(ModuleState::Thermocycler(m)) = self.module_mut(&p.module_id) {
                    m.lid_target_temp = Some(p.celsius);
                }
            }
            Command::ThermocyclerDeactivateBlock(p) => {
                if let Some(ModuleState::Thermocycler(m)) = self.module_mut(&p.module_id) {
                    m.block_target_temp = None;
                }
            }
            Command::ThermocyclerDeactivateLid(p) => {
                if let Some(ModuleState::Thermocycler(m)) = self.module_mut(&p.module_id) {
                    m.lid_target_temp = None;
                }
            }
            Command::ThermocyclerOpenLid(p) => {
                if let Some(ModuleState::Thermocycler(m)) = self.module_mut(&p.module_id) {
                    m.lid_open = Some(true);
                }
            }
            Command::ThermocyclerCloseLid(p) => {
                if let Some(ModuleState::Thermocycler(m)) = self.module_mut(&p.module_id) {
                    m.lid_open = Some(false);
                }
            }
            Command::ThermocyclerRunProfile(p) => {
                if let Some(ModuleState::Thermocycler(m)) = self.module_mut(&p.module_id)
                    && let Some(last) = p.profile.last()
                {
                    m.block_target_temp = Some(last.celsius);
                }
            }
            Command::ThermocyclerWaitForBlockTemperature(_)
            | Command::ThermocyclerWaitForLidTemperature(_) => {}

            // --- Absorbance reader ---
            Command::AbsorbanceReaderOpenLid(p) => {
                if let Some(ModuleState::AbsorbanceReader(m)) = self.module_mut(&p.module_id) {
                    m.lid_open = Some(true);
                }
            }
            Command::AbsorbanceReaderCloseLid(p) => {
                if let Some(ModuleState::AbsorbanceReader(m)) = self.module_mut(&p.module_id) {
                    m.lid_open = Some(false);
                }
            }
            Command::AbsorbanceReaderInitialize(p) => {
                if let Some(ModuleState::AbsorbanceReader(m)) = self.module_mut(&p.module_id) {
                    m.initialization = Some(AbsorbanceReaderInitialization {
                        measure_mode: p.measure_mode,
                        sample_wavelengths: p.sample_wavelengths.clone(),
                        reference_wavelength: p.reference_wavelength,
                    });
                }
            }
            Command::AbsorbanceReaderRead(_) => {}

            // --- Flow ---
            Command::Comment(_) | Command::WaitForDuration(_) | Command::WaitForResume(_) => {}
        }
    }

    fn module_mut(&mut self, module_id: &str) -> Option<&mut ModuleState> {
        if !self.modules.contains_key(module_id) {
            return None;
        }
        Arc::make_mut(&mut self.modules)
            .get_mut(module_id)
            .map(|m| &mut m.module_state)
    }

    fn active_tip_count(&self, pipette_id: &str, ctx: &InvariantContext) -> usize {
        let channels = ctx.pipette(pipette_id).map_or(1, |p| p.channels());
        self.nozzles(pipette_id).active_tips(channels)
    }

    /// Wells touched by each active tip, indexed by tip.
    fn wells_for(
        &self,
        pipette_id: &str,
        labware_id: &str,
        well: &str,
        ctx: &InvariantContext,
    ) -> Vec<String> {
        let active = self.active_tip_count(pipette_id, ctx);
        ctx.labware(labware_id)
            .and_then(|l| l.def.wells_under_nozzles(well, active))
            .unwrap_or_else(|| vec![well.to_string()])
    }

    fn aspirate(&mut self, p: &PipettingParams, ctx: &InvariantContext) {
        let wells = self.wells_for(&p.pipette_id, &p.labware_id, &p.well_name, ctx);
        let liquid = Arc::make_mut(&mut self.liquid_state);
        for (i, well) in wells.iter().enumerate() {
            let source = liquid
                .labware
                .entry(p.labware_id.clone())
                .or_default()
                .entry(well.clone())
                .or_default();
            let available = total_volume(source);
            let mut drawn = remove_volume(source, p.volume.min(available));
            if p.volume > available {
                add_volume(&mut drawn, AIR, p.volume - available);
            }
            let tip = liquid
                .pipettes
                .entry(p.pipette_id.clone())
                .or_default()
                .entry(i)
                .or_default();
            merge(tip, drawn);
        }
    }

    fn dispense(&mut self, p: &PipettingParams, ctx: &InvariantContext) {
        let wells = self.wells_for(&p.pipette_id, &p.labware_id, &p.well_name, ctx);
        let liquid = Arc::make_mut(&mut self.liquid_state);
        for (i, well) in wells.iter().enumerate() {
            let Some(tip) = liquid
                .pipettes
                .get_mut(&p.pipette_id)
                .and_then(|tips| tips.get_mut(&i))
            else {
                continue;
            };
            let amount = p.volume.min(total_volume(tip));
            let expelled = remove_volume(tip, amount);
            let target = liquid
                .labware
                .entry(p.labware_id.clone())
                .or_default()
                .entry(well.clone())
                .or_default();
            merge(target, without_air(expelled));
        }
    }

    fn take_tip_contents(&mut self, pipette_id: &str) -> Vec<(usize, LocationLiquidState)> {
        if !self.liquid_state.pipettes.contains_key(pipette_id) {
            return Vec::new();
        }
        Arc::make_mut(&mut self.liquid_state)
            .pipettes
            .remove(pipette_id)
            .map(|tips| tips.into_iter().collect())
            .unwrap_or_default()
    }

    fn merge_into_well(&mut self, labware_id: &str, well: &str, contents: LocationLiquidState) {
        if contents.is_empty() {
            return;
        }
        let target = Arc::make_mut(&mut self.liquid_state)
            .labware
            .entry(labware_id.to_string())
            .or_default()
            .entry(well.to_string())
            .or_default();
        merge(target, contents);
    }
}

/// Removes `amount` from `location`, proportionally across its liquids.
fn remove_volume(location: &mut LocationLiquidState, amount: f64) -> LocationLiquidState {
    let total = total_volume(location);
    let mut removed = LocationLiquidState::new();
    if total <= 0.0 || amount <= 0.0 {
        return removed;
    }
    let ratio = (amount / total).min(1.0);
    for (liquid, v) in location.iter_mut() {
        let share = v.volume * ratio;
        v.volume -= share;
        if share > 0.0 {
            removed.insert(liquid.clone(), LiquidVolume { volume: share });
        }
    }
    location.retain(|_, v| v.volume > f64::EPSILON);
    removed
}

fn add_volume(location: &mut LocationLiquidState, liquid: &str, volume: f64) {
    location.entry(liquid.to_string()).or_default().volume += volume;
}

fn merge(into: &mut LocationLiquidState, from: LocationLiquidState) {
    for (liquid, v) in from {
        add_volume(into, &liquid, v.volume);
    }
}

fn without_air(mut contents: LocationLiquidState) -> LocationLiquidState {
    contents.remove(AIR);
    contents
}
