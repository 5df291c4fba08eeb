use halo_color::to_device_coordinates;
use halo_core::{Color, LightAssignment, LightId, LightState, LightingBridge};
use log::{debug, info, warn};
use serde::Serialize;
use std::collections::BTreeMap;

/// Per-light results of one dispatch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DispatchReport {
    pub succeeded: Vec<LightId>,
    /// Failed lights and the bridge's reason.
    pub failed: BTreeMap<LightId, String>,
}

impl DispatchReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum DispatchOutcome {
    /// Nothing to send; lights were left untouched.
    Skipped,
    Applied(DispatchReport),
}

impl DispatchOutcome {
    pub fn report(&self) -> Option<&DispatchReport> {
        match self {
            DispatchOutcome::Skipped => None,
            DispatchOutcome::Applied(report) => Some(report),
        }
    }
}

/// Gives the i-th light `palette[i % palette.len()]`, cycling colors when
/// there are more lights than colors. An empty palette assigns nothing.
pub fn assign(palette: &[Color], light_ids: &[LightId]) -> LightAssignment {
    let mut assignment = LightAssignment::new();
    if palette.is_empty() {
        return assignment;
    }
    for (i, light) in light_ids.iter().enumerate() {
        assignment.insert(*light, palette[i % palette.len()]);
    }
    assignment
}

/// Sends one state command per assigned light. A failing light is recorded
/// and the remaining lights are still updated.
pub async fn dispatch<B>(
    bridge: &B,
    assignment: &LightAssignment,
    brightness: u8,
    transition: u16,
) -> DispatchOutcome
where
    B: LightingBridge + ?Sized,
{
    if assignment.is_empty() {
        debug!("Empty assignment, leaving lights untouched");
        return DispatchOutcome::Skipped;
    }

    let mut report = DispatchReport::default();
    for (light, color) in assignment.iter() {
        let state = LightState {
            xy: to_device_coordinates(color),
            brightness,
            transition,
        };
        debug!("Light {}: {} -> xy {:?}", light, color, state.xy);
        match bridge.set_state(light, &state).await {
            Ok(()) => report.succeeded.push(light),
            Err(e) => {
                warn!("Failed to update light {}: {}", light, e);
                report.failed.insert(light, e.to_string());
            }
        }
    }

    info!(
        "Updated {} of {} lights",
        report.succeeded.len(),
        assignment.len()
    );
    DispatchOutcome::Applied(report)
}
