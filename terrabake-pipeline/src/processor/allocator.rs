use super::resolution::ResolutionPolicy;
use super::types::*;
use log::{debug, info};
use terrabake_core::*;

/// Creates bake targets for every object. All records exist before this returns, so no bake
/// can observe a half-prepared scene.
pub fn allocate<H: Host + ?Sized>(
    host: &mut H,
    objects: &[ObjectId],
    policy: &ResolutionPolicy,
    naming: &BakeNaming,
) -> BakeResult<BakeTable> {
    let mut table = BakeTable::new();
    for &object in objects {
        let record = allocate_object(host, object, policy, naming)?;
        table.insert(record)?;
    }
    Ok(table)
}

pub fn allocate_object<H: Host + ?Sized>(
    host: &mut H,
    object: ObjectId,
    policy: &ResolutionPolicy,
    naming: &BakeNaming,
) -> BakeResult<BakeRecord> {
    let info = host.object(object)?;
    let material = host.create_material(&naming.material_name(&info.name))?;
    let (tier, image) = create_target_image(host, &info, policy, naming)?;
    arm_slot_materials(host, &info, image, None)?;

    let previous_slot = info.active_material_slot;
    let material_slot = host.add_material_slot(object, material)?;
    host.set_active_material_slot(object, material_slot)?;

    let uv_channel = add_bake_channel(host, &info, &naming.uv_name)?;
    let image_node = wire_bake_material(host, material, image)?;

    if let Some(slot) = previous_slot {
        host.set_active_material_slot(object, slot)?;
    }
    info!("{}: material slots {:?}", info.name, host.object(object)?.material_slots);

    Ok(BakeRecord {
        object,
        material,
        material_slot,
        image,
        uv_channel,
        image_node,
        tier,
    })
}

/// Same as [`allocate_object`] but bakes through a material, slot and UV channel that
/// already exist on the object (the unified ones of a merged mesh).
pub fn allocate_into<H: Host + ?Sized>(
    host: &mut H,
    object: ObjectId,
    prepared: &PreparedTarget,
    policy: &ResolutionPolicy,
    naming: &BakeNaming,
) -> BakeResult<BakeRecord> {
    let info = host.object(object)?;
    if info.material_slots.get(prepared.slot) != Some(&Some(prepared.material)) {
        return Err(BakeError::InvalidState(format!(
            "{}: slot {} does not hold {}",
            info.name, prepared.slot, prepared.material
        )));
    }
    let (tier, image) = create_target_image(host, &info, policy, naming)?;
    arm_slot_materials(host, &info, image, Some(prepared.material))?;
    let image_node = wire_bake_material(host, prepared.material, image)?;

    Ok(BakeRecord {
        object,
        material: prepared.material,
        material_slot: prepared.slot,
        image,
        uv_channel: prepared.uv_channel,
        image_node,
        tier,
    })
}

fn create_target_image<H: Host + ?Sized>(
    host: &mut H,
    info: &ObjectInfo,
    policy: &ResolutionPolicy,
    naming: &BakeNaming,
) -> BakeResult<(ResolutionTier, ImageId)> {
    let extent = info.dimensions.max_element();
    let tier = policy.tier(extent);
    info!("{}: dimensions {:?} -> {}", info.name, info.dimensions.to_array(), tier);
    let image = host.create_image(&ImageDescriptor {
        name: &naming.image_name(&info.name),
        width: tier.pixels(),
        height: tier.pixels(),
    })?;
    Ok((tier, image))
}

/// Gives every shaded slot material an active image node writing into `image`.
fn arm_slot_materials<H: Host + ?Sized>(
    host: &mut H,
    info: &ObjectInfo,
    image: ImageId,
    except: Option<MaterialId>,
) -> BakeResult<()> {
    let mut armed: Vec<MaterialId> = Vec::new();
    for &material in info.material_slots.iter().flatten() {
        if Some(material) == except || armed.contains(&material) {
            continue;
        }
        if !host.material(material)?.has_shading() {
            debug!("{}: skipping {} without shading nodes", info.name, material);
            continue;
        }
        let node = host.add_shader_node(material, ShaderNodeKind::ImageTexture { image: Some(image) })?;
        host.set_active_node(material, node)?;
        armed.push(material);
    }
    Ok(())
}

/// Adds the bake UV channel, unwraps every face into it and gives the active flag back to
/// the channel that had it.
fn add_bake_channel<H: Host + ?Sized>(host: &mut H, info: &ObjectInfo, name: &str) -> BakeResult<UvChannelId> {
    let mesh = info
        .mesh
        .ok_or_else(|| BakeError::InvalidState(format!("{} has no mesh", info.name)))?;
    let previous = host.mesh(mesh)?.active_uv();
    let channel = host.add_uv_channel(info.id, name)?;
    host.unwrap_uv(info.id, channel, FaceSelection::All)?;
    info!("{}: uv map {} unwrapped", info.name, name);
    if let Some(previous) = previous {
        host.set_active_uv_channel(info.id, previous)?;
    }
    Ok(channel)
}

/// image Color -> principled Base Color, principled BSDF -> output Surface. The image node
/// ends up active.
fn wire_bake_material<H: Host + ?Sized>(host: &mut H, material: MaterialId, image: ImageId) -> BakeResult<NodeId> {
    let image_node = host.add_shader_node(material, ShaderNodeKind::ImageTexture { image: Some(image) })?;
    let shader = host.add_shader_node(material, ShaderNodeKind::Principled { base_color: [1.0; 4] })?;
    let output = host.output_node(material)?;
    host.link_sockets(material, (image_node, Socket::Color), (shader, Socket::BaseColor))?;
    host.link_sockets(material, (shader, Socket::Bsdf), (output, Socket::Surface))?;
    host.set_active_node(material, image_node)?;
    Ok(image_node)
}
