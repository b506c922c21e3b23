//! Placeable objects and the junction attachment algorithms.
//!
//! Each object owns one slot per point junction and one slot per line
//! junction of its catalog entry. Links are recorded on both sides: when
//! object A holds B in a slot, B holds A in one of its point slots.

use crate::catalog::{CatalogEntry, Junction};
use crate::config::EngineConfig;
use crate::curve::QuadBezier3;
use crate::error::{EngineError, EngineResult};
use crate::math::{direction_angle, normalize360};
use crate::mesh::Positionable;
use glam::DVec3;
use log::debug;
use std::sync::Arc;
use uuid::Uuid;

/// Unique identifier for scene objects.
pub type ObjectId = Uuid;

/// A boxed renderer mesh.
pub type Mesh = Box<dyn Positionable>;

/// Occupants of a line junction, in attachment order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LineSlot {
    occupants: Vec<ObjectId>,
}

impl LineSlot {
    pub fn occupants(&self) -> &[ObjectId] {
        &self.occupants
    }

    pub fn contains(&self, id: ObjectId) -> bool {
        self.occupants.contains(&id)
    }

    pub fn is_empty(&self) -> bool {
        self.occupants.is_empty()
    }

    fn push(&mut self, id: ObjectId) {
        if !self.contains(id) {
            self.occupants.push(id);
        }
    }

    fn remove(&mut self, id: ObjectId) -> bool {
        let before = self.occupants.len();
        self.occupants.retain(|&o| o != id);
        before != self.occupants.len()
    }
}

/// An object in the scene: a catalog entry, its connection slots and a mesh.
#[derive(Debug)]
pub struct PlaceableObject {
    id: ObjectId,
    catalog_entry: Arc<CatalogEntry>,
    junctions: Vec<Option<ObjectId>>,
    line_junctions: Vec<LineSlot>,
    /// Accumulated yaw in degrees, in `[0, 360)`. Equals minus the mesh yaw.
    angle: f64,
    /// Arc-length fraction along the parent's line junction.
    curve_position: f64,
    opacity: f64,
    /// Physical length for extruded and composite pieces.
    length_mm: Option<f64>,
    mesh: Option<Mesh>,
    junction_mark: Option<DVec3>,
}

impl Default for PlaceableObject {
    fn default() -> Self {
        Self::new()
    }
}

impl PlaceableObject {
    /// An object with an empty catalog entry and no mesh.
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            catalog_entry: Arc::new(CatalogEntry::empty()),
            junctions: Vec::new(),
            line_junctions: Vec::new(),
            angle: 0.0,
            curve_position: 0.5,
            opacity: 1.0,
            length_mm: None,
            mesh: None,
            junction_mark: None,
        }
    }

    pub fn with_entry(entry: Arc<CatalogEntry>, mesh: Option<Mesh>) -> Self {
        let mut object = Self::new();
        object.set_catalog_entry(entry);
        if let Some(mesh) = mesh {
            object.set_mesh(mesh);
        }
        object
    }

    pub fn id(&self) -> ObjectId {
        self.id
    }

    pub fn catalog_entry(&self) -> &Arc<CatalogEntry> {
        &self.catalog_entry
    }

    pub fn code(&self) -> &str {
        &self.catalog_entry.code
    }

    pub fn is_light(&self) -> bool {
        self.catalog_entry.is_light()
    }

    pub fn junctions(&self) -> &[Option<ObjectId>] {
        &self.junctions
    }

    pub fn line_junctions(&self) -> &[LineSlot] {
        &self.line_junctions
    }

    pub fn angle(&self) -> f64 {
        self.angle
    }

    pub fn curve_position(&self) -> f64 {
        self.curve_position
    }

    pub fn opacity(&self) -> f64 {
        self.opacity
    }

    pub fn length_mm(&self) -> Option<f64> {
        self.length_mm
    }

    pub fn set_length_mm(&mut self, length_mm: Option<f64>) {
        self.length_mm = length_mm;
    }

    /// Power draw in watts; per-metre power scales with the piece length.
    pub fn power(&self) -> f64 {
        self.catalog_entry.power * self.length_mm.unwrap_or(1000.0) / 1000.0
    }

    pub fn mesh(&self) -> Option<&dyn Positionable> {
        self.mesh.as_deref()
    }

    pub fn mesh_mut(&mut self) -> Option<&mut Mesh> {
        self.mesh.as_mut()
    }

    pub fn has_mesh(&self) -> bool {
        self.mesh.is_some()
    }

    pub fn junction_mark(&self) -> Option<DVec3> {
        self.junction_mark
    }

    /// Replace the catalog entry, resetting every slot.
    ///
    /// Neighbours still pointing here are not touched, so callers detach
    /// first, as [`SceneContainer::set_catalog_entry`](crate::SceneContainer::set_catalog_entry) does.
    pub(crate) fn set_catalog_entry(&mut self, entry: Arc<CatalogEntry>) {
        self.junctions = vec![None; entry.juncts.len()];
        self.line_junctions = vec![LineSlot::default(); entry.line_juncts.len()];
        self.catalog_entry = entry;
    }

    /// Replace the mesh, returning the previous one already disposed.
    ///
    /// Junctions move with the mesh, so callers detach first, as
    /// [`SceneContainer::set_mesh`](crate::SceneContainer::set_mesh) does.
    pub(crate) fn set_mesh(&mut self, mesh: Mesh) -> Option<Mesh> {
        self.angle = 0.0;
        let mut previous = self.mesh.replace(mesh);
        if let Some(old) = previous.as_mut() {
            old.dispose();
        }
        if let Some(current) = self.mesh.as_mut() {
            current.set_opacity(self.opacity);
        }
        previous
    }

    pub fn set_opacity(&mut self, opacity: f64) {
        self.opacity = opacity;
        if let Some(mesh) = self.mesh.as_mut() {
            mesh.set_opacity(opacity);
        }
    }

    /// Whether any point or line slot is occupied.
    pub fn is_attached(&self) -> bool {
        self.junctions.iter().any(Option::is_some) || self.line_junctions.iter().any(|s| !s.is_empty())
    }

    /// Distinct neighbours across all slots, in slot order.
    pub fn neighbours(&self) -> Vec<ObjectId> {
        let mut result: Vec<ObjectId> = Vec::new();
        let linked = self
            .junctions
            .iter()
            .flatten()
            .chain(self.line_junctions.iter().flat_map(|s| s.occupants.iter()));
        for &id in linked {
            if !result.contains(&id) {
                result.push(id);
            }
        }
        result
    }

    /// Indices of unoccupied point junctions.
    pub fn free_junctions(&self) -> Vec<usize> {
        self.junctions
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.is_none())
            .map(|(i, _)| i)
            .collect()
    }

    /// Index of the line slot holding `id`.
    pub fn line_slot_of(&self, id: ObjectId) -> Option<usize> {
        self.line_junctions.iter().position(|s| s.contains(id))
    }

    /// Index of the point slot holding `id`.
    pub fn junction_slot_of(&self, id: ObjectId) -> Option<usize> {
        self.junctions.iter().position(|s| *s == Some(id))
    }

    /// World position of a point junction.
    pub fn world_junction(&self, index: usize) -> Option<DVec3> {
        let junct = self.catalog_entry.juncts.get(index)?;
        Some(self.mesh.as_ref()?.local_to_world(junct.position()))
    }

    /// World-space curve of a line junction.
    pub fn world_line_curve(&self, index: usize) -> Option<QuadBezier3> {
        let line = self.catalog_entry.line_juncts.get(index)?;
        let mesh = self.mesh.as_ref()?;
        Some(line.curve_with(|p| mesh.local_to_world(p)))
    }

    /// Record a marker at a point junction, wrapping the index.
    pub fn mark_junction(&mut self, index: usize) -> Option<DVec3> {
        debug_assert_eq!(self.junctions.len(), self.catalog_entry.juncts.len());
        if self.junctions.is_empty() {
            return None;
        }
        let position = self.world_junction(index % self.junctions.len())?;
        self.junction_mark = Some(position);
        Some(position)
    }

    pub fn unmark_junction(&mut self) {
        self.junction_mark = None;
    }

    /// Drop the marker and mesh. The object is unusable for attachment afterwards.
    pub fn dispose(&mut self) {
        self.unmark_junction();
        if let Some(mut mesh) = self.mesh.take() {
            mesh.dispose();
        }
    }

    /// Attach `other` to this object through the first compatible pair of
    /// free point junctions, moving and rotating `other` to mate with it.
    ///
    /// `junction_id` forces the junction used on `other` and wraps modulo
    /// its junction count. Returns the matched group.
    pub fn attach(&mut self, other: &mut PlaceableObject, junction_id: Option<usize>) -> EngineResult<String> {
        self.attach_at(other, None, junction_id)
    }

    /// Like [`PlaceableObject::attach`] but may also force the junction on this side.
    pub fn attach_at(
        &mut self,
        other: &mut PlaceableObject,
        this_junction: Option<usize>,
        other_junction: Option<usize>,
    ) -> EngineResult<String> {
        if self.id == other.id {
            return Err(EngineError::InvalidAttachment("cannot attach an object to itself".into()));
        }
        if self.mesh.is_none() || other.mesh.is_none() {
            return Err(EngineError::InvalidAttachment("both objects need a mesh".into()));
        }
        if other.is_attached() {
            return Err(EngineError::InvalidAttachment(format!("{} is already attached", other.id)));
        }

        let this_candidates = forced_or_free(self, this_junction)?;
        let other_candidates = forced_or_free(other, other_junction)?;

        let (this_id, other_id) = this_candidates
            .iter()
            .find_map(|&i| {
                let group = &self.catalog_entry.juncts[i].group;
                other_candidates
                    .iter()
                    .find(|&&j| other.catalog_entry.juncts[j].group == *group)
                    .map(|&j| (i, j))
            })
            .ok_or(EngineError::NoCompatibleJunction)?;

        let j1 = self.catalog_entry.juncts[this_id].clone();
        let j2 = other.catalog_entry.juncts[other_id].clone();
        let (this_mesh, other_mesh) = mesh_pair(&self.mesh, &mut other.mesh)?;

        self.junctions[this_id] = Some(other.id);
        other.junctions[other_id] = Some(self.id);

        // Make the two junctions face each other.
        let rotate = normalize360(j2.angle + other.angle + 180.0) - normalize360(j1.angle + self.angle);
        other_mesh.rotate_y(rotate.to_radians());
        other.angle = normalize360(other.angle - rotate);
        self.angle = normalize360(self.angle);

        let target = this_mesh.local_to_world(j1.position());
        let current = other_mesh.local_to_world(j2.position());
        other_mesh.translate(target - current);

        debug!(
            "Attached {} junction {} to {} junction {} ({})",
            other.id, other_id, self.id, this_id, j1.group
        );
        Ok(j1.group)
    }

    /// Attach `other` to the first line junction at the sample nearest `target`.
    pub fn attach_line(
        &mut self,
        other: &mut PlaceableObject,
        target: DVec3,
        force: bool,
        config: &EngineConfig,
    ) -> EngineResult<String> {
        self.attach_line_to(other, 0, target, force, config)
    }

    /// Attach `other` to line junction `line_index` at the sample nearest `target`.
    ///
    /// With `force`, an existing link between the two objects is dropped first
    /// and `other` may already be attached elsewhere.
    pub fn attach_line_to(
        &mut self,
        other: &mut PlaceableObject,
        line_index: usize,
        target: DVec3,
        force: bool,
        config: &EngineConfig,
    ) -> EngineResult<String> {
        if self.id == other.id {
            return Err(EngineError::InvalidAttachment("cannot attach an object to itself".into()));
        }
        if self.mesh.is_none() || other.mesh.is_none() {
            return Err(EngineError::InvalidAttachment("both objects need a mesh".into()));
        }
        if !force && other.is_attached() {
            return Err(EngineError::InvalidAttachment(format!("{} is already attached", other.id)));
        }
        let line = self
            .catalog_entry
            .line_juncts
            .get(line_index)
            .cloned()
            .ok_or_else(|| EngineError::InvalidAttachment(format!("no line junction {}", line_index)))?;
        let this_id = self.id;
        let other_junct = other
            .junctions
            .iter()
            .position(|slot| slot.is_none() || (force && *slot == Some(this_id)))
            .ok_or(EngineError::NoCompatibleJunction)?;
        let j2 = other.catalog_entry.juncts[other_junct].clone();

        if force {
            self.detach(other);
        }

        let (this_mesh, other_mesh) = mesh_pair(&self.mesh, &mut other.mesh)?;
        let curve = line.curve_with(|p| this_mesh.local_to_world(p));
        let position = curve.nearest_spaced_fraction(target, config.curve_samples, config.curve_margin);

        orient_along(other_mesh, &mut other.angle, &other.catalog_entry, &j2, curve.tangent_at(position), config);
        let point = curve.point_at(position);
        let current = other_mesh.local_to_world(j2.position());
        other_mesh.translate(point - current);

        other.curve_position = position;
        self.line_junctions[line_index].push(other.id);
        other.junctions[other_junct] = Some(self.id);

        debug!(
            "Attached {} to line {} of {} at {:.3} ({})",
            other.id, line_index, self.id, position, line.group
        );
        Ok(line.group)
    }

    /// Slide this object along the line junction of `parent` it occupies.
    ///
    /// `position` is clamped to `[0, 1]`. Returns the line group, or `None`
    /// when this object does not sit on a line junction of `parent`.
    pub fn move_light(&mut self, parent: &PlaceableObject, position: f64, config: &EngineConfig) -> Option<String> {
        let position = position.clamp(0.0, 1.0);
        let line_index = parent.line_slot_of(self.id)?;
        let this_junct = self.junction_slot_of(parent.id)?;
        let line = parent.catalog_entry.line_juncts.get(line_index)?;
        let j2 = self.catalog_entry.juncts.get(this_junct)?.clone();
        let curve = parent.world_line_curve(line_index)?;
        let mesh = self.mesh.as_mut()?;

        orient_along(mesh, &mut self.angle, &self.catalog_entry, &j2, curve.tangent_at(position), config);
        let point = curve.point_at(position);
        let current = mesh.local_to_world(j2.position());
        mesh.translate(point - current);
        self.curve_position = position;

        Some(line.group.clone())
    }

    /// Remove every link between this object and `other`, on both sides.
    pub fn detach(&mut self, other: &mut PlaceableObject) -> bool {
        let this_changed = unlink(self, other.id);
        let other_changed = unlink(other, self.id);
        if this_changed || other_changed {
            debug!("Detached {} from {}", other.id, self.id);
        }
        this_changed || other_changed
    }

    /// Re-attach this object to `neighbour` using its next point junction.
    ///
    /// Requires exactly one occupied point junction, held by `neighbour`.
    /// On failure the previous link is restored.
    pub fn rotate(&mut self, neighbour: &mut PlaceableObject) -> EngineResult<String> {
        let occupied: Vec<usize> = self
            .junctions
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.is_some())
            .map(|(i, _)| i)
            .collect();
        let &[this_junct] = occupied.as_slice() else {
            return Err(EngineError::RequiresSingleAttachment);
        };
        if self.junctions[this_junct] != Some(neighbour.id) {
            return Err(EngineError::InvalidAttachment(format!("{} is not the attached neighbour", neighbour.id)));
        }
        if self.mesh.is_none() || neighbour.mesh.is_none() {
            return Err(EngineError::InvalidAttachment("both objects need a mesh".into()));
        }

        let neighbour_junct = neighbour.junction_slot_of(self.id);
        let neighbour_line = neighbour.line_slot_of(self.id);
        neighbour.detach(self);

        let next = (this_junct + 1) % self.junctions.len();
        match neighbour.attach(self, Some(next)) {
            Ok(group) => Ok(group),
            Err(err) => {
                self.junctions[this_junct] = Some(neighbour.id);
                if let Some(i) = neighbour_junct {
                    neighbour.junctions[i] = Some(self.id);
                }
                if let Some(i) = neighbour_line {
                    neighbour.line_junctions[i].push(self.id);
                }
                Err(err)
            }
        }
    }
}

/// Candidate point junctions: the forced one (wrapped) if free, else all free ones.
fn forced_or_free(object: &PlaceableObject, forced: Option<usize>) -> EngineResult<Vec<usize>> {
    let Some(index) = forced else {
        return Ok(object.free_junctions());
    };
    if object.junctions.is_empty() {
        return Err(EngineError::NoCompatibleJunction);
    }
    let index = index % object.junctions.len();
    if object.junctions[index].is_some() {
        return Err(EngineError::InvalidAttachment(format!("junction {} is occupied", index)));
    }
    Ok(vec![index])
}

fn mesh_pair<'a, 'b>(this: &'a Option<Mesh>, other: &'b mut Option<Mesh>) -> EngineResult<(&'a Mesh, &'b mut Mesh)> {
    match (this.as_ref(), other.as_mut()) {
        (Some(this), Some(other)) => Ok((this, other)),
        _ => Err(EngineError::InvalidAttachment("both objects need a mesh".into())),
    }
}

fn unlink(object: &mut PlaceableObject, id: ObjectId) -> bool {
    let mut changed = false;
    for slot in object.junctions.iter_mut() {
        if *slot == Some(id) {
            *slot = None;
            changed = true;
        }
    }
    for slot in object.line_junctions.iter_mut() {
        changed |= slot.remove(id);
    }
    changed
}

/// Turn a mesh to follow a curve tangent.
///
/// Lights take the tangent yaw plus their model offset. Other objects turn
/// so their attaching junction faces along the tangent.
fn orient_along(
    mesh: &mut Mesh,
    angle: &mut f64,
    entry: &CatalogEntry,
    junction: &Junction,
    tangent: DVec3,
    config: &EngineConfig,
) {
    if entry.is_light() {
        let yaw = tangent.z.atan2(tangent.x) + config.light_models.yaw_offset_deg(entry).to_radians();
        mesh.set_yaw(yaw);
        *angle = normalize360(-yaw.to_degrees());
        return;
    }
    let Some(tangent_angle) = direction_angle(tangent) else {
        return;
    };
    let rotate = normalize360(junction.angle + *angle) - tangent_angle;
    mesh.rotate_y(rotate.to_radians());
    *angle = normalize360(*angle - rotate);
}
