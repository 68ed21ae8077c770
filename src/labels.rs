//! Fixed traffic sign class table.
//!
//! The classifier scores 43 sign classes; ids are 1-indexed to match the
//! model's training labels. The table is compiled in and immutable.

/// Number of sign classes the model scores.
pub const CLASS_COUNT: usize = 43;

/// Human-readable names, indexed by `class_id - 1`.
const SIGN_NAMES: [&str; CLASS_COUNT] = [
    "Speed limit (20km/h)",
    "Speed limit (30km/h)",
    "Speed limit (50km/h)",
    "Speed limit (60km/h)",
    "Speed limit (70km/h)",
    "Speed limit (80km/h)",
    "End of speed limit (80km/h)",
    "Speed limit (100km/h)",
    "Speed limit (120km/h)",
    "No passing",
    "No passing veh over 3.5 tons",
    "Right-of-way at intersection",
    "Priority road",
    "Yield",
    "Stop",
    "No vehicles",
    "Veh > 3.5 tons prohibited",
    "No entry",
    "General caution",
    "Dangerous curve left",
    "Dangerous curve right",
    "Double curve",
    "Bumpy road",
    "Slippery road",
    "Road narrows on the right",
    "Road work",
    "Traffic signals",
    "Pedestrians",
    "Children crossing",
    "Bicycles crossing",
    "Beware of ice/snow",
    "Wild animals crossing",
    "End speed + passing limits",
    "Turn right ahead",
    "Turn left ahead",
    "Ahead only",
    "Go straight or right",
    "Go straight or left",
    "Keep right",
    "Keep left",
    "Roundabout mandatory",
    "End of no passing",
    "End no passing veh > 3.5 tons",
];

/// Look up the sign name for a 1-indexed class id.
///
/// Returns `None` for ids outside `1..=43`.
pub fn sign_name(class_id: u8) -> Option<&'static str> {
    let idx = usize::from(class_id).checked_sub(1)?;
    SIGN_NAMES.get(idx).copied()
}
