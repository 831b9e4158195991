//! Transient transform-copy constraints.
//!
//! A constraint stack is built immediately before a bake, applied in order
//! once per sampled frame, and consumed by the bake call — constraints never
//! outlive one bake operation. Each entry rewrites the owner's world
//! transform from a driver world transform with per-axis masking.

use glam::EulerRot;

use crate::transform::Transform;

/// One constraint stack entry.
#[derive(Clone, Copy, Debug)]
pub enum Constraint {
    /// Copy the driver's world translation on the enabled axes. With
    /// `use_offset` the owner's own translation component is added on top,
    /// so a pre-set static offset survives as a baseline.
    CopyLocation {
        use_x: bool,
        use_y: bool,
        use_z: bool,
        use_offset: bool,
    },
    /// Copy the driver's world rotation on the enabled axes. Partial masks
    /// mix via XYZ Euler decomposition.
    CopyRotation {
        use_x: bool,
        use_y: bool,
        use_z: bool,
    },
    /// Clamp the owner's world height to a floor.
    LimitLocation { min_z: f32 },
}

impl Constraint {
    pub fn copy_location_full() -> Self {
        Self::CopyLocation {
            use_x: true,
            use_y: true,
            use_z: true,
            use_offset: false,
        }
    }

    pub fn copy_rotation_full() -> Self {
        Self::CopyRotation {
            use_x: true,
            use_y: true,
            use_z: true,
        }
    }
}

/// Run a constraint stack: start from the owner's current world transform
/// and let each entry rewrite it from the driver.
pub fn apply_stack(stack: &[Constraint], owner: Transform, driver: &Transform) -> Transform {
    let mut out = owner;
    for constraint in stack {
        out = apply_one(constraint, out, &owner, driver);
    }
    out
}

fn apply_one(
    constraint: &Constraint,
    mut current: Transform,
    owner: &Transform,
    driver: &Transform,
) -> Transform {
    match *constraint {
        Constraint::CopyLocation {
            use_x,
            use_y,
            use_z,
            use_offset,
        } => {
            let offset = if use_offset {
                owner.translation
            } else {
                glam::Vec3::ZERO
            };
            if use_x {
                current.translation.x = driver.translation.x + offset.x;
            }
            if use_y {
                current.translation.y = driver.translation.y + offset.y;
            }
            if use_z {
                current.translation.z = driver.translation.z + offset.z;
            }
            current
        }
        Constraint::CopyRotation { use_x, use_y, use_z } => {
            if use_x && use_y && use_z {
                current.rotation = driver.rotation;
            } else if use_x || use_y || use_z {
                let (cx, cy, cz) = current.rotation.to_euler(EulerRot::XYZ);
                let (dx, dy, dz) = driver.rotation.to_euler(EulerRot::XYZ);
                current.rotation = glam::Quat::from_euler(
                    EulerRot::XYZ,
                    if use_x { dx } else { cx },
                    if use_y { dy } else { cy },
                    if use_z { dz } else { cz },
                );
            }
            current
        }
        Constraint::LimitLocation { min_z } => {
            current.translation.z = current.translation.z.max(min_z);
            current
        }
    }
}
