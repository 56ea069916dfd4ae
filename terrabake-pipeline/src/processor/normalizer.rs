use super::types::NormalizeOutcome;
use log::{error, info};
use std::collections::HashMap;
use terrabake_core::*;

/// Gives the object exclusive mesh/material/animation data, then applies its modifier stack.
pub fn normalize_object<H: Host + ?Sized>(host: &mut H, object: ObjectId) -> BakeResult<()> {
    let info = host.object(object)?;
    host.make_single_user(object, SingleUserScope::ALL)?;
    info!("{}: made single user", info.name);

    // Stack order as it was before anything got applied.
    let modifiers = info.modifiers;
    if !modifiers.is_empty() {
        info!("{}: applying modifiers {:?}", info.name, modifiers);
    }
    for modifier in &modifiers {
        host.apply_modifier(object, modifier)?;
    }
    Ok(())
}

/// Normalizes each object independently. A failed object is reported and left out of
/// `normalized`; the rest still run.
pub fn normalize<H: Host + ?Sized>(host: &mut H, objects: &[ObjectId]) -> NormalizeOutcome {
    let mut outcome = NormalizeOutcome::default();
    for &object in objects {
        match normalize_object(host, object) {
            Ok(()) => outcome.normalized.push(object),
            Err(e) => {
                error!("{}", e);
                outcome.failures.push((object, e));
            }
        }
    }
    outcome
}

/// Fails when two of `objects` reference the same mesh, material or animation.
pub fn verify_exclusive<H: Host + ?Sized>(host: &H, objects: &[ObjectId]) -> BakeResult<()> {
    let mut owners: HashMap<DataId, ObjectId> = HashMap::new();
    for &object in objects {
        let info = host.object(object)?;
        let mut data: Vec<DataId> = Vec::new();
        data.extend(info.mesh.map(DataId::Mesh));
        data.extend(info.material_slots.iter().flatten().map(|&m| DataId::Material(m)));
        data.extend(info.animation.map(DataId::Action));
        for id in data {
            match owners.get(&id) {
                Some(&owner) if owner != object => {
                    return Err(BakeError::InvalidState(format!(
                        "{:?} is shared by {} and {}",
                        id, owner, object
                    )));
                }
                _ => {
                    owners.insert(id, object);
                }
            }
        }
    }
    Ok(())
}
