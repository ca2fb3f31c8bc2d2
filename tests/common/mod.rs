// tests/common/mod.rs
#![allow(dead_code)]

use indexmap::IndexMap;
use liquid_robot::command::{Command, ModuleParams};
use liquid_robot::entities::{
    AdditionalEquipmentEntity, EquipmentKind, LabwareDefinition, LabwareDimensions, LabwareEntity,
    LabwareParameters, ModuleEntity, ModuleModel, PipetteEntity, PipetteSpecs, WellDefinition,
};
use liquid_robot::robot_state::{LabwareLocation, Mount, RobotStateBuilder};
use liquid_robot::{CommandsAndWarnings, InvariantContext, RobotState, RobotType};

pub const PIPETTE: &str = "pipette";
pub const TIPRACK: &str = "tiprack";
pub const PLATE: &str = "plate";
pub const RESERVOIR: &str = "reservoir";
pub const TRASH: &str = "trashBin";
pub const TIPRACK_URI: &str = "opentrons/opentrons_flex_96_tiprack_200ul/1";

pub fn grid_def(cols: usize, rows: usize, well_volume: f64) -> LabwareDefinition {
    let mut wells = IndexMap::new();
    let mut ordering = Vec::new();
    for c in 0..cols {
        let mut column = Vec::new();
        for r in 0..rows {
            let name = format!("{}{}", (b'A' + r as u8) as char, c + 1);
            wells.insert(
                name.clone(),
                WellDefinition {
                    x: 14.38 + 9.0 * c as f64,
                    y: 74.24 - 9.0 * r as f64,
                    z: 1.0,
                    depth: 10.8,
                    total_liquid_volume: well_volume,
                },
            );
            column.push(name);
        }
        ordering.push(column);
    }
    LabwareDefinition {
        display_name: format!("{cols}x{rows} grid"),
        load_name: format!("grid_{cols}x{rows}"),
        dimensions: LabwareDimensions {
            x_dimension: 127.76,
            y_dimension: 85.48,
            z_dimension: 14.2,
        },
        wells,
        ordering,
        parameters: LabwareParameters::default(),
        allowed_roles: Vec::new(),
    }
}

pub fn tiprack_def() -> LabwareDefinition {
    let mut def = grid_def(12, 8, 200.0);
    def.load_name = "opentrons_flex_96_tiprack_200ul".into();
    def.parameters = LabwareParameters {
        is_tiprack: true,
        tip_length: Some(58.35),
        tip_volume: Some(200.0),
    };
    def
}

pub fn pipette(id: &str, name: &str, channels: u8) -> PipetteEntity {
    PipetteEntity {
        id: id.into(),
        name: name.into(),
        spec: PipetteSpecs {
            display_name: name.into(),
            channels,
            max_volume: 1000.0,
            min_volume: 5.0,
            default_aspirate_flow_rate: 160.0,
            default_dispense_flow_rate: 160.0,
            default_blow_out_flow_rate: 80.0,
        },
        tiprack_def_uris: vec![TIPRACK_URI.into()],
        python_name: None,
    }
}

pub fn labware(id: &str, uri: &str, def: LabwareDefinition) -> LabwareEntity {
    LabwareEntity {
        id: id.into(),
        def_uri: uri.into(),
        def,
        python_name: None,
    }
}

pub fn equipment(id: &str, kind: EquipmentKind, location: Option<&str>) -> AdditionalEquipmentEntity {
    AdditionalEquipmentEntity {
        id: id.into(),
        kind,
        location: location.map(str::to_string),
        python_name: None,
    }
}

pub fn module(id: &str, model: ModuleModel) -> ModuleEntity {
    ModuleEntity {
        id: id.into(),
        model,
        python_name: None,
    }
}

/// Flex with a single-channel 1 mL pipette, 200 µL tips, a plate, a reservoir,
/// a trash bin in A3 and a gripper.
pub fn flex_context() -> InvariantContext {
    InvariantContext::new(RobotType::Flex)
        .with_pipette(pipette(PIPETTE, "p1000_single_flex", 1))
        .with_labware(labware(TIPRACK, TIPRACK_URI, tiprack_def()))
        .with_labware(labware(
            PLATE,
            "opentrons/nest_96_wellplate_200ul_flat/2",
            grid_def(12, 8, 200.0),
        ))
        .with_labware(labware(
            RESERVOIR,
            "opentrons/nest_12_reservoir_15ml/1",
            grid_def(12, 1, 15000.0),
        ))
        .with_equipment(equipment(TRASH, EquipmentKind::TrashBin, Some("A3")))
        .with_equipment(equipment("gripper", EquipmentKind::Gripper, None))
}

/// Standard deck: tip rack in B2, plate in C2, reservoir in C1 with water in A1.
pub fn flex_deck() -> RobotStateBuilder {
    RobotState::builder()
        .pipette(PIPETTE, Mount::Left)
        .labware(TIPRACK, LabwareLocation::Slot("B2".into()))
        .labware(PLATE, LabwareLocation::Slot("C2".into()))
        .labware(RESERVOIR, LabwareLocation::Slot("C1".into()))
        .liquid(RESERVOIR, "A1", "water", 10_000.0)
}

/// Context plus a plate sitting in a module.
pub fn with_module_plate(
    ctx: InvariantContext,
    module_id: &str,
    model: ModuleModel,
    labware_id: &str,
) -> InvariantContext {
    ctx.with_module(module(module_id, model))
        .with_labware(labware(
            labware_id,
            "opentrons/opentrons_96_wellplate_200ul_pcr_full_skirt/2",
            grid_def(12, 8, 200.0),
        ))
}

pub fn module_params(id: &str) -> ModuleParams {
    ModuleParams {
        module_id: id.into(),
    }
}

pub fn command_types(output: &CommandsAndWarnings) -> Vec<&'static str> {
    output.commands.iter().map(Command::command_type).collect()
}
