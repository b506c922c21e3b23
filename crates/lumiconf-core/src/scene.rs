//! Scenes and the container that brokers every operation touching two objects.

use crate::assets::MeshLoader;
use crate::camera::Camera;
use crate::catalog::{Catalog, CatalogEntry, SegmentRole};
use crate::composite::{CompositeProfileConfig, SCENE_UNITS_PER_MM};
use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::handles::{HandleManager, HandleRef, Hover};
use crate::lights::{self, PlacedLight};
use crate::object::{Mesh, ObjectId, PlaceableObject};
use glam::DVec3;
use kurbo::Point;
use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Opacity of objects dimmed while a light is highlighted.
pub const DIMMED_OPACITY: f64 = 0.4;

/// Named scenes kept by the container.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SceneKind {
    /// The full assembly.
    #[default]
    Normal,
    /// A single-product preview.
    Single,
}

/// Objects of one scene, in insertion order, and their handles.
#[derive(Debug, Default)]
pub struct Scene {
    objects: Vec<PlaceableObject>,
    pub handles: HandleManager,
}

impl Scene {
    pub fn new(handles: HandleManager) -> Self {
        Self {
            objects: Vec::new(),
            handles,
        }
    }

    pub fn add_object(&mut self, object: PlaceableObject) -> ObjectId {
        let id = object.id();
        self.objects.push(object);
        id
    }

    /// Remove an object after detaching it from every neighbour.
    pub fn remove_object(&mut self, id: ObjectId) -> Option<PlaceableObject> {
        self.detach_all(id).ok()?;
        let index = self.index_of(id)?;
        let mut object = self.objects.remove(index);
        object.dispose();
        Some(object)
    }

    pub fn get_object(&self, id: ObjectId) -> Option<&PlaceableObject> {
        self.objects.iter().find(|o| o.id() == id)
    }

    pub fn get_object_mut(&mut self, id: ObjectId) -> Option<&mut PlaceableObject> {
        self.objects.iter_mut().find(|o| o.id() == id)
    }

    /// Objects in insertion order.
    pub fn objects(&self) -> &[PlaceableObject] {
        &self.objects
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Dispose and drop every object and handle.
    pub fn clear(&mut self) {
        for object in &mut self.objects {
            object.dispose();
        }
        self.objects.clear();
        self.handles.delete();
    }

    fn index_of(&self, id: ObjectId) -> Option<usize> {
        self.objects.iter().position(|o| o.id() == id)
    }

    /// Mutable access to two distinct objects at once.
    pub fn pair_mut(&mut self, a: ObjectId, b: ObjectId) -> EngineResult<(&mut PlaceableObject, &mut PlaceableObject)> {
        let i = self.index_of(a).ok_or(EngineError::UnknownObject(a))?;
        let j = self.index_of(b).ok_or(EngineError::UnknownObject(b))?;
        if i == j {
            return Err(EngineError::InvalidAttachment("cannot attach an object to itself".into()));
        }
        if i < j {
            let (left, right) = self.objects.split_at_mut(j);
            Ok((&mut left[i], &mut right[0]))
        } else {
            let (left, right) = self.objects.split_at_mut(i);
            Ok((&mut right[0], &mut left[j]))
        }
    }

    pub fn detach(&mut self, a: ObjectId, b: ObjectId) -> EngineResult<bool> {
        let (a, b) = self.pair_mut(a, b)?;
        Ok(a.detach(b))
    }

    /// Detach an object from all its neighbours. Returns how many were detached.
    pub fn detach_all(&mut self, id: ObjectId) -> EngineResult<usize> {
        let neighbours = self
            .get_object(id)
            .ok_or(EngineError::UnknownObject(id))?
            .neighbours();
        let mut count = 0;
        for neighbour in neighbours {
            if self.detach(id, neighbour)? {
                count += 1;
            }
        }
        Ok(count)
    }

    /// Links that are missing their reverse side, as `(holder, held)` pairs.
    pub fn dangling_links(&self) -> Vec<(ObjectId, ObjectId)> {
        let mut dangling = Vec::new();
        for object in &self.objects {
            for neighbour in object.neighbours() {
                let mutual = self
                    .get_object(neighbour)
                    .is_some_and(|n| n.neighbours().contains(&object.id()));
                if !mutual {
                    dangling.push((object.id(), neighbour));
                }
            }
        }
        dangling
    }

    fn select_handles(&mut self, entry: &CatalogEntry, exclude: Option<ObjectId>) {
        self.handles
            .select_object(entry, self.objects.iter().filter(|o| Some(o.id()) != exclude));
    }
}

/// Serializable view of one object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectSnapshot {
    pub id: ObjectId,
    pub code: String,
    pub position: Option<[f64; 3]>,
    pub yaw_deg: Option<f64>,
    pub angle: f64,
    pub curve_position: f64,
    pub length_mm: Option<f64>,
    pub junctions: Vec<Option<ObjectId>>,
    pub line_junctions: Vec<Vec<ObjectId>>,
}

impl From<&PlaceableObject> for ObjectSnapshot {
    fn from(object: &PlaceableObject) -> Self {
        Self {
            id: object.id(),
            code: object.code().to_string(),
            position: object.mesh().map(|m| m.position().to_array()),
            yaw_deg: object.mesh().map(|m| m.yaw().to_degrees()),
            angle: object.angle(),
            curve_position: object.curve_position(),
            length_mm: object.length_mm(),
            junctions: object.junctions().to_vec(),
            line_junctions: object.line_junctions().iter().map(|s| s.occupants().to_vec()).collect(),
        }
    }
}

/// Serializable view of the active scene.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneSnapshot {
    pub kind: SceneKind,
    pub objects: Vec<ObjectSnapshot>,
    pub power_budget: f64,
    pub total_price_cents: i64,
}

impl SceneSnapshot {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// Owns the scenes, the camera and the catalog, and runs every operation
/// that needs more than one object.
#[derive(Debug)]
pub struct SceneContainer {
    catalog: Arc<Catalog>,
    config: EngineConfig,
    pub camera: Camera,
    normal: Scene,
    single: Scene,
    active: SceneKind,
}

impl SceneContainer {
    pub fn new(catalog: Arc<Catalog>, config: EngineConfig) -> Self {
        let camera = Camera {
            fov_deg: config.camera_fov_deg,
            ..Camera::default()
        };
        let handles = HandleManager::new(config.handle_scale);
        Self {
            catalog,
            camera,
            normal: Scene::new(handles.clone()),
            single: Scene::new(handles),
            active: SceneKind::Normal,
            config,
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn active_scene(&self) -> SceneKind {
        self.active
    }

    pub fn set_scene(&mut self, kind: SceneKind) {
        if self.active != kind {
            info!("Switching to {:?} scene", kind);
            self.active = kind;
        }
    }

    pub fn scene(&self) -> &Scene {
        match self.active {
            SceneKind::Normal => &self.normal,
            SceneKind::Single => &self.single,
        }
    }

    pub fn scene_mut(&mut self) -> &mut Scene {
        match self.active {
            SceneKind::Normal => &mut self.normal,
            SceneKind::Single => &mut self.single,
        }
    }

    /// Active scene, config and camera borrowed together.
    fn parts(&mut self) -> (&mut Scene, &EngineConfig, &mut Camera) {
        let scene = match self.active {
            SceneKind::Normal => &mut self.normal,
            SceneKind::Single => &mut self.single,
        };
        (scene, &self.config, &mut self.camera)
    }

    /// Dispose every object of the active scene.
    pub fn reset_scene(&mut self) {
        let count = self.scene().len();
        self.scene_mut().clear();
        self.camera.reset();
        info!("Reset {:?} scene ({} objects disposed)", self.active, count);
    }

    pub fn get_object(&self, id: ObjectId) -> Option<&PlaceableObject> {
        self.scene().get_object(id)
    }

    pub fn objects(&self) -> &[PlaceableObject] {
        self.scene().objects()
    }

    fn object_or_err(&self, id: ObjectId) -> EngineResult<&PlaceableObject> {
        self.get_object(id).ok_or(EngineError::UnknownObject(id))
    }

    fn insert(&mut self, entry: Arc<CatalogEntry>, mesh: Option<Mesh>) -> ObjectId {
        let code = entry.code.clone();
        let id = self.scene_mut().add_object(PlaceableObject::with_entry(entry, mesh));
        debug!("Added {} as {}", code, id);
        self.frame_object(id);
        id
    }

    /// Add an object for a catalog code with an already loaded mesh.
    pub fn add_object(&mut self, code: &str, mesh: Mesh) -> EngineResult<ObjectId> {
        let entry = self.catalog.entry(code)?;
        Ok(self.insert(entry, Some(mesh)))
    }

    /// Load the mesh for `code`, then add the object.
    ///
    /// Nothing is added if loading fails or the future is dropped.
    pub async fn add_object_with<L: MeshLoader + ?Sized>(&mut self, loader: &L, code: &str) -> EngineResult<ObjectId> {
        let entry = self.catalog.entry(code)?;
        let mesh = loader.load(code).await?;
        Ok(self.insert(entry, Some(mesh)))
    }

    /// Add a placeholder object with no catalog entry and no mesh.
    pub fn add_temporary_object(&mut self) -> ObjectId {
        self.scene_mut().add_object(PlaceableObject::new())
    }

    /// Add a straight extruded profile of `length_mm` derived from `code`.
    pub fn add_extruded_object(&mut self, code: &str, length_mm: f64, mesh: Mesh) -> EngineResult<ObjectId> {
        let entry = self.catalog.entry(code)?;
        let extruded = Arc::new(entry.extruded(length_mm * SCENE_UNITS_PER_MM)?);
        let id = self.insert(extruded, Some(mesh));
        if let Some(object) = self.scene_mut().get_object_mut(id) {
            object.set_length_mm(Some(length_mm));
        }
        Ok(id)
    }

    /// Lay out the pieces of a composite profile along X.
    ///
    /// Every piece uses the base code's entry, trimmed by its position in
    /// the run, with its mesh scaled to the piece length.
    pub async fn add_composite_profile<L: MeshLoader + ?Sized>(
        &mut self,
        loader: &L,
        composite: &CompositeProfileConfig,
    ) -> EngineResult<Vec<ObjectId>> {
        let entry = self.catalog.entry(&composite.base_code)?;
        let count = composite.piece_count();

        let mut meshes = Vec::with_capacity(count);
        for _ in 0..count {
            meshes.push(loader.load(&composite.base_code).await?);
        }

        let mut ids = Vec::with_capacity(count);
        let mut current_x = 0.0;
        for (index, (piece, mut mesh)) in composite.pieces().zip(meshes).enumerate() {
            let mut scale = mesh.scale();
            scale.x = piece.scale_factor();
            mesh.set_scale(scale);
            current_x += piece.length as f64 * SCENE_UNITS_PER_MM;
            mesh.set_position(DVec3::new(current_x, 0.0, 0.0));

            let role = SegmentRole::for_index(index, count);
            let mut object = PlaceableObject::with_entry(Arc::new(entry.presentation(role)), Some(mesh));
            object.set_length_mm(Some(piece.length as f64));
            ids.push(self.scene_mut().add_object(object));
        }
        info!(
            "Created composite {} from {} pieces ({}mm)",
            composite.base_code, count, composite.total_length
        );
        Ok(ids)
    }

    /// Detach and dispose an object.
    pub fn remove_object(&mut self, id: ObjectId) -> EngineResult<()> {
        self.object_or_err(id)?;
        self.scene_mut().remove_object(id);
        debug!("Removed {}", id);
        Ok(())
    }

    /// Replace an object's mesh, detaching it first since its junctions move.
    pub fn set_mesh(&mut self, id: ObjectId, mesh: Mesh) -> EngineResult<()> {
        self.scene_mut().detach_all(id)?;
        if let Some(object) = self.scene_mut().get_object_mut(id) {
            object.set_mesh(mesh);
        }
        Ok(())
    }

    /// Replace an object's catalog entry, detaching it first.
    pub fn set_catalog_entry(&mut self, id: ObjectId, entry: Arc<CatalogEntry>) -> EngineResult<()> {
        self.scene_mut().detach_all(id)?;
        if let Some(object) = self.scene_mut().get_object_mut(id) {
            object.set_catalog_entry(entry);
        }
        Ok(())
    }

    /// Attach `other` to `this` through point junctions.
    pub fn attach(
        &mut self,
        this: ObjectId,
        other: ObjectId,
        junction_id: Option<usize>,
        skip_reframe: bool,
    ) -> EngineResult<String> {
        self.attach_at(this, other, None, junction_id, skip_reframe)
    }

    fn attach_at(
        &mut self,
        this: ObjectId,
        other: ObjectId,
        this_junction: Option<usize>,
        other_junction: Option<usize>,
        skip_reframe: bool,
    ) -> EngineResult<String> {
        let (scene, _, _) = self.parts();
        let (a, b) = scene.pair_mut(this, other)?;
        let group = a.attach_at(b, this_junction, other_junction)?;
        if !skip_reframe {
            self.frame_object(other);
        }
        Ok(group)
    }

    /// Attach `other` to the first line junction of `profile`, nearest `target`.
    pub fn attach_line(&mut self, profile: ObjectId, other: ObjectId, target: DVec3, force: bool) -> EngineResult<String> {
        self.attach_line_to(profile, other, 0, target, force)
    }

    /// Attach `other` to line junction `line_index` of `profile`, nearest `target`.
    ///
    /// A light lands on the closest position that keeps its spacing to the
    /// lights already there; with no such position nothing changes and
    /// `NoValidLightPosition` is returned.
    pub fn attach_line_to(
        &mut self,
        profile: ObjectId,
        other: ObjectId,
        line_index: usize,
        target: DVec3,
        force: bool,
    ) -> EngineResult<String> {
        let placement = self.light_placement(profile, other, line_index, target)?;
        let (scene, config, _) = self.parts();
        if force && profile != other {
            scene.detach_all(other)?;
        }
        let (a, b) = scene.pair_mut(profile, other)?;
        let group = a.attach_line_to(b, line_index, target, force, config)?;
        if let Some(position) = placement {
            if (b.curve_position() - position).abs() > lights::SPACING_EPSILON {
                debug!("Spacing moved light {} from {:.3} to {:.3}", other, b.curve_position(), position);
                b.move_light(a, position, config);
            }
        }
        self.frame_object(other);
        Ok(group)
    }

    /// Spacing-valid landing position of `light` on a line junction, for a
    /// drop near `target`. `None` when `light` is not a light.
    fn light_placement(
        &self,
        profile: ObjectId,
        light: ObjectId,
        line_index: usize,
        target: DVec3,
    ) -> EngineResult<Option<f64>> {
        if !self.object_or_err(light)?.is_light() {
            return Ok(None);
        }
        let Some(curve) = self.object_or_err(profile)?.world_line_curve(line_index) else {
            return Ok(None);
        };
        let desired = curve.nearest_spaced_fraction(target, self.config.curve_samples, self.config.curve_margin);
        self.spaced_position(light, profile, line_index, desired).map(Some)
    }

    pub fn detach(&mut self, a: ObjectId, b: ObjectId) -> EngineResult<bool> {
        self.scene_mut().detach(a, b)
    }

    pub fn detach_all(&mut self, id: ObjectId) -> EngineResult<usize> {
        self.scene_mut().detach_all(id)
    }

    /// Drop every link of an object so it can be placed again.
    pub fn reset_connections(&mut self, id: ObjectId) -> EngineResult<()> {
        let count = self.detach_all(id)?;
        debug!("Reset {} connections of {}", count, id);
        Ok(())
    }

    /// Re-attach an object to its single neighbour through its next junction.
    pub fn rotate(&mut self, id: ObjectId) -> EngineResult<String> {
        let object = self.object_or_err(id)?;
        let occupied: Vec<ObjectId> = object.junctions().iter().flatten().copied().collect();
        let &[neighbour] = occupied.as_slice() else {
            return Err(EngineError::RequiresSingleAttachment);
        };
        let (object, neighbour) = self.scene_mut().pair_mut(id, neighbour)?;
        object.rotate(neighbour)
    }

    /// Show handles for placing an object with catalog `code` against the whole scene.
    pub fn select_object(&mut self, code: &str) -> EngineResult<()> {
        let entry = self.catalog.entry(code)?;
        self.scene_mut().select_handles(&entry, None);
        Ok(())
    }

    /// Show handles for placing an existing object against every other object.
    pub fn select_for(&mut self, moving: ObjectId) -> EngineResult<()> {
        let entry = self.object_or_err(moving)?.catalog_entry().clone();
        self.scene_mut().select_handles(&entry, Some(moving));
        Ok(())
    }

    pub fn set_handles_visible(&mut self, visible: bool) {
        self.scene_mut().handles.set_visible(visible);
    }

    /// Update hover state from a pointer position in pixels.
    pub fn update_pointer(&mut self, screen_point: Point) -> Option<Hover> {
        let ndc = self.camera.screen_to_ndc(screen_point);
        let (scene, _, camera) = self.parts();
        scene.handles.update(camera, ndc)
    }

    /// Attach `moving` through the hovered handle.
    pub fn click(&mut self, moving: ObjectId) -> EngineResult<String> {
        let handles = &self.scene().handles;
        let hover = handles.hovering().copied().ok_or(EngineError::NothingHovered)?;
        if hover.handle.is_disabled() {
            return Err(EngineError::DisabledHandle);
        }
        let target = handles
            .target(hover.handle)
            .ok_or_else(|| EngineError::InvalidAttachment("handle has no attachment target".into()))?;

        let group = match hover.handle {
            HandleRef::Line(i) => {
                let point = handles
                    .line_handles()
                    .get(i)
                    .and_then(|h| h.clicked_point)
                    .unwrap_or(hover.point);
                self.attach_line_to(target.other, moving, target.other_junction, point, false)?
            }
            _ => self.attach_at(target.other, moving, Some(target.other_junction), target.selected_junction, false)?,
        };
        self.scene_mut().handles.delete();
        Ok(group)
    }

    /// Ids of every light in the active scene.
    pub fn lights(&self) -> Vec<ObjectId> {
        self.objects().iter().filter(|o| o.is_light()).map(|o| o.id()).collect()
    }

    /// Lights on line junction `line_index` of `profile`, except `exclude`.
    fn lights_on(&self, profile: ObjectId, line_index: usize, exclude: ObjectId) -> Vec<PlacedLight> {
        let scene = self.scene();
        let Some(slot) = scene.get_object(profile).and_then(|p| p.line_junctions().get(line_index)) else {
            return Vec::new();
        };
        slot.occupants()
            .iter()
            .filter(|&&id| id != exclude)
            .filter_map(|&id| scene.get_object(id))
            .filter(|o| o.is_light())
            .map(|o| (o.curve_position(), self.config.light_models.min_spacing(o.catalog_entry())))
            .collect()
    }

    /// Whether `light` may sit at `position` on its profile.
    pub fn is_valid_light_position(&self, light: ObjectId, position: f64) -> bool {
        let Some(object) = self.get_object(light) else {
            return false;
        };
        let Some((profile, line_index)) = self.find_valid_profile_for_light(light) else {
            return true;
        };
        let spacing = self.config.light_models.min_spacing(object.catalog_entry());
        lights::is_valid_position(position, spacing, &self.lights_on(profile, line_index, light))
    }

    /// Closest position to `desired` that keeps light spacing, or `desired`
    /// clamped to the margins when no spacing rule applies.
    pub fn find_nearest_valid_light_position(&self, light: ObjectId, desired: f64) -> f64 {
        let (min, max) = (self.config.light_margin_min, self.config.light_margin_max);
        let fallback = desired.clamp(min, max);
        let Some(object) = self.get_object(light).filter(|o| o.is_light()) else {
            return fallback;
        };
        let Some((profile, line_index)) = self.find_valid_profile_for_light(light) else {
            return fallback;
        };
        let spacing = self.config.light_models.min_spacing(object.catalog_entry());
        let others = self.lights_on(profile, line_index, light);
        lights::nearest_valid_position(desired, spacing, &others, min, max).unwrap_or(fallback)
    }

    /// Closest position to `desired` on line `line_index` of `profile` that
    /// keeps `light` spaced from the other lights there.
    fn spaced_position(&self, light: ObjectId, profile: ObjectId, line_index: usize, desired: f64) -> EngineResult<f64> {
        let object = self.object_or_err(light)?;
        let spacing = self.config.light_models.min_spacing(object.catalog_entry());
        let others = self.lights_on(profile, line_index, light);
        lights::nearest_valid_position(
            desired,
            spacing,
            &others,
            self.config.light_margin_min,
            self.config.light_margin_max,
        )
        .ok_or(EngineError::NoValidLightPosition)
    }

    /// `Ok(None)` when the light has no parent profile to slide on.
    fn move_light_direct(&mut self, light: ObjectId, position: f64) -> EngineResult<Option<String>> {
        let Some(parent) = self.find_parent_profile(light) else {
            return Ok(None);
        };
        let Some(line_index) = self.find_junction_id_for_profile(parent, light) else {
            return Ok(None);
        };
        let position = self.spaced_position(light, parent, line_index, position)?;
        let (scene, config, _) = self.parts();
        let (object, parent) = scene.pair_mut(light, parent)?;
        Ok(object.move_light(parent, position, config))
    }

    /// Slide a light along its profile.
    ///
    /// A position too close to another light snaps to the nearest one that
    /// keeps spacing. When the light has no usable profile link, its
    /// connections are reset and it is re-attached to the first profile with
    /// a line junction, then moved once more.
    pub fn move_light(&mut self, light: ObjectId, position: f64) -> EngineResult<String> {
        if !self.object_or_err(light)?.is_light() {
            return Err(EngineError::NotALight(light));
        }
        if let Some(group) = self.move_light_direct(light, position)? {
            return Ok(group);
        }

        warn!("Light {} has no usable profile link, re-attaching", light);
        self.reset_connections(light)?;
        let (profile, midpoint) = self
            .objects()
            .iter()
            .filter(|o| o.id() != light && o.catalog_entry().accepts_lights())
            .find_map(|o| {
                let mesh = o.mesh()?;
                let line = o.catalog_entry().line_juncts.first()?;
                Some((o.id(), mesh.local_to_world(line.midpoint())))
            })
            .ok_or(EngineError::NoProfileAvailable)?;

        if let Err(err) = self.attach_line(profile, light, midpoint, true) {
            error!("Failed to re-attach light {} to {}: {}", light, profile, err);
            return Err(EngineError::LightMoveFailed(light));
        }
        match self.move_light_direct(light, position)? {
            Some(group) => Ok(group),
            None => {
                error!("Light {} could not be moved after re-attaching", light);
                Err(EngineError::LightMoveFailed(light))
            }
        }
    }

    /// Move a light to the valid position nearest `desired`. Returns the position used.
    pub fn place_light(&mut self, light: ObjectId, desired: f64) -> EngineResult<f64> {
        let object = self.object_or_err(light)?;
        if !object.is_light() {
            return Err(EngineError::NotALight(light));
        }
        let (profile, line_index) = self
            .find_valid_profile_for_light(light)
            .ok_or(EngineError::NoProfileAvailable)?;
        let position = self.spaced_position(light, profile, line_index, desired)?;
        self.move_light(light, position)?;
        Ok(position)
    }

    /// The profile whose line junction holds `light`, linked both ways.
    pub fn find_parent_profile(&self, light: ObjectId) -> Option<ObjectId> {
        let scene = self.scene();
        let object = scene.get_object(light)?;
        object
            .junctions()
            .iter()
            .flatten()
            .copied()
            .find(|&id| scene.get_object(id).is_some_and(|p| p.line_slot_of(light).is_some()))
    }

    /// The parent profile and line index of `light`, or else the first object
    /// that can carry lights.
    pub fn find_valid_profile_for_light(&self, light: ObjectId) -> Option<(ObjectId, usize)> {
        if let Some(parent) = self.find_parent_profile(light) {
            let index = self.find_junction_id_for_profile(parent, light)?;
            return Some((parent, index));
        }
        self.objects()
            .iter()
            .find(|o| o.id() != light && o.catalog_entry().accepts_lights() && o.has_mesh())
            .map(|o| (o.id(), 0))
    }

    /// Line junction index of `profile` holding `light`.
    pub fn find_junction_id_for_profile(&self, profile: ObjectId, light: ObjectId) -> Option<usize> {
        self.get_object(profile)?.line_slot_of(light)
    }

    /// Whether moving the light forward along its profile moves it left on screen.
    pub fn light_movement_direction(&self, light: ObjectId) -> bool {
        let Some(object) = self.get_object(light).filter(|o| o.has_mesh()) else {
            return false;
        };
        let Some(parent) = self.find_parent_profile(light) else {
            return false;
        };
        let Some(curve) = self
            .find_junction_id_for_profile(parent, light)
            .and_then(|index| self.get_object(parent)?.world_line_curve(index))
        else {
            return false;
        };
        curve.tangent_at(object.curve_position()).dot(self.camera.right()) < 0.0
    }

    /// Dim everything but `light` and frame it. `None` restores full opacity.
    pub fn highlight_light(&mut self, light: Option<ObjectId>) {
        for object in &mut self.scene_mut().objects {
            let opacity = match light {
                Some(id) if object.id() != id => DIMMED_OPACITY,
                _ => 1.0,
            };
            object.set_opacity(opacity);
        }
        if let Some(id) = light {
            self.frame(id);
        }
    }

    /// Total power of the active scene in watts.
    pub fn power_budget(&self) -> f64 {
        self.objects().iter().map(PlaceableObject::power).sum()
    }

    pub fn total_price_cents(&self) -> i64 {
        self.objects().iter().map(|o| o.catalog_entry().price_cents).sum()
    }

    /// Point the camera at a profile. Objects without line junctions are ignored.
    pub fn frame_object(&mut self, id: ObjectId) -> bool {
        let is_profile = self
            .get_object(id)
            .is_some_and(|o| !o.catalog_entry().line_juncts.is_empty());
        is_profile && self.frame(id)
    }

    fn frame(&mut self, id: ObjectId) -> bool {
        let Some(mesh) = self.get_object(id).and_then(PlaceableObject::mesh) else {
            return false;
        };
        let center = mesh.local_to_world(DVec3::ZERO);
        let radius = mesh.bounding_radius();
        self.camera.frame(center, radius);
        true
    }

    pub fn snapshot(&self) -> SceneSnapshot {
        SceneSnapshot {
            kind: self.active,
            objects: self.objects().iter().map(ObjectSnapshot::from).collect(),
            power_budget: self.power_budget(),
            total_price_cents: self.total_price_cents(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::MemoryMeshLoader;
    use crate::composite::calculate_profile_composition;
    use crate::lights::LightModel;
    use crate::mesh::TransformMesh;
    use pollster::block_on;

    const CATALOG: &str = r#"{
        "XNR01L": {
            "juncts": [
                {"group": "xnr", "x": 0, "y": 0, "z": 0, "angle": 270},
                {"group": "xnr", "x": 10, "y": 0, "z": 0, "angle": 90}
            ],
            "line_juncts": [
                {"group": "rail", "point1": {"x": 0, "y": 0, "z": 0},
                 "point2": {"x": 10, "y": 0, "z": 0}, "pointC": {"x": 5, "y": 0, "z": 0}}
            ],
            "power": 10,
            "price_cents": 5000,
            "category": "profile"
        },
        "XNRS31": {
            "juncts": [{"group": "rail", "x": 0, "y": 0, "z": 0, "angle": 0}],
            "power": 6,
            "price_cents": 2500,
            "category": "light_fixture",
            "model": "XNRS31"
        },
        "BOX": {
            "juncts": [{"group": "zzz", "x": 0, "y": 0, "z": 0, "angle": 0}]
        }
    }"#;

    fn container() -> SceneContainer {
        let catalog = Arc::new(Catalog::from_json(CATALOG).unwrap());
        SceneContainer::new(catalog, EngineConfig::default())
    }

    fn add(container: &mut SceneContainer, code: &str) -> ObjectId {
        container.add_object(code, TransformMesh::new().boxed()).unwrap()
    }

    fn camera_above(x: f64) -> Camera {
        Camera {
            position: DVec3::new(x, 20.0, 0.0),
            target: DVec3::new(x, 0.0, 0.0),
            up: DVec3::NEG_Z,
            ..Camera::default()
        }
    }

    fn viewport_center(container: &SceneContainer) -> Point {
        let size = container.camera.viewport;
        Point::new(size.width / 2.0, size.height / 2.0)
    }

    #[test]
    fn test_add_unknown_code() {
        let mut container = container();
        let result = container.add_object("NOPE", TransformMesh::new().boxed());
        assert!(matches!(result, Err(EngineError::Catalog(_))));
        assert!(container.objects().is_empty());
    }

    #[test]
    fn test_linear_chain() {
        let mut container = container();
        let a = add(&mut container, "XNR01L");
        let b = add(&mut container, "XNR01L");
        let c = add(&mut container, "XNR01L");

        container.attach(a, b, None, false).unwrap();
        container.attach(b, c, None, false).unwrap();

        let scene = container.scene();
        assert!(scene.dangling_links().is_empty());
        let b_obj = scene.get_object(b).unwrap();
        let c_obj = scene.get_object(c).unwrap();
        assert_eq!(b_obj.junctions(), &[Some(a), Some(c)]);
        assert!(b_obj.world_junction(1).unwrap().distance(c_obj.world_junction(0).unwrap()) < 1e-9);
    }

    #[test]
    fn test_attach_errors_leave_state() {
        let mut container = container();
        let a = add(&mut container, "XNR01L");
        let b = add(&mut container, "XNR01L");
        let c = add(&mut container, "XNR01L");
        let other = add(&mut container, "BOX");

        container.attach(a, b, None, true).unwrap();
        assert!(matches!(container.attach(c, b, None, true), Err(EngineError::InvalidAttachment(_))));
        assert!(matches!(container.attach(a, other, None, true), Err(EngineError::NoCompatibleJunction)));
        assert!(matches!(container.attach(a, a, None, true), Err(EngineError::InvalidAttachment(_))));
        assert!(matches!(
            container.attach(a, ObjectId::new_v4(), None, true),
            Err(EngineError::UnknownObject(_))
        ));
        assert!(!container.get_object(c).unwrap().is_attached());
        assert!(!container.get_object(other).unwrap().is_attached());
        assert!(container.scene().dangling_links().is_empty());
    }

    #[test]
    fn test_attach_line_midpoint() {
        let mut container = container();
        let profile = add(&mut container, "XNR01L");
        let light = add(&mut container, "XNRS31");

        let group = container
            .attach_line(profile, light, DVec3::new(5.0, 0.0, 0.0), false)
            .unwrap();
        assert_eq!(group, "rail");
        assert!((container.get_object(light).unwrap().curve_position() - 0.5).abs() < 1e-9);
        assert_eq!(container.find_parent_profile(light), Some(profile));
        assert_eq!(container.find_valid_profile_for_light(light), Some((profile, 0)));
        assert_eq!(container.find_junction_id_for_profile(profile, light), Some(0));
    }

    #[test]
    fn test_move_light_direct_and_recovery() {
        let mut container = container();
        let profile = add(&mut container, "XNR01L");
        let light = add(&mut container, "XNRS31");

        // Not attached yet: recovery attaches it to the profile first.
        container.move_light(light, 0.3).unwrap();
        let object = container.get_object(light).unwrap();
        assert_eq!(object.curve_position(), 0.3);
        assert_eq!(container.find_parent_profile(light), Some(profile));

        container.move_light(light, 0.8).unwrap();
        assert_eq!(container.get_object(light).unwrap().curve_position(), 0.8);
        assert!(container.scene().dangling_links().is_empty());
    }

    #[test]
    fn test_move_light_errors() {
        let mut container = container();
        let light = add(&mut container, "XNRS31");
        assert!(matches!(container.move_light(light, 0.5), Err(EngineError::NoProfileAvailable)));

        let profile = add(&mut container, "XNR01L");
        assert!(matches!(container.move_light(profile, 0.5), Err(EngineError::NotALight(_))));
    }

    #[test]
    fn test_place_light_keeps_spacing() {
        let mut container = container();
        let profile = add(&mut container, "XNR01L");
        let first = add(&mut container, "XNRS31");
        let second = add(&mut container, "XNRS31");

        container.attach_line(profile, first, DVec3::new(5.0, 0.0, 0.0), false).unwrap();
        assert!(!container.is_valid_light_position(second, 0.55));

        let position = container.place_light(second, 0.55).unwrap();
        assert!((position - 0.68).abs() < 1e-9);
        let a = container.get_object(first).unwrap().curve_position();
        let b = container.get_object(second).unwrap().curve_position();
        assert!((a - b).abs() + 1e-9 >= 0.18);
        assert_eq!(container.get_object(profile).unwrap().line_junctions()[0].occupants().len(), 2);
        assert_eq!(container.find_nearest_valid_light_position(second, 0.3), 0.3);
    }

    fn spacing(container: &SceneContainer, a: ObjectId, b: ObjectId) -> f64 {
        let a = container.get_object(a).unwrap().curve_position();
        let b = container.get_object(b).unwrap().curve_position();
        (a - b).abs()
    }

    #[test]
    fn test_attach_line_keeps_light_spacing() {
        let mut container = container();
        let profile = add(&mut container, "XNR01L");
        let first = add(&mut container, "XNRS31");
        let second = add(&mut container, "XNRS31");
        let middle = DVec3::new(5.0, 0.0, 0.0);

        container.attach_line(profile, first, middle, false).unwrap();
        container.attach_line(profile, second, middle, false).unwrap();
        assert!((container.get_object(first).unwrap().curve_position() - 0.5).abs() < 1e-9);
        assert!(spacing(&container, first, second) + 1e-9 >= 0.18);
        assert_eq!(container.find_parent_profile(second), Some(profile));

        // Moving straight onto the neighbour snaps to the closest free spot.
        container.place_light(second, 0.9).unwrap();
        container.move_light(second, 0.52).unwrap();
        let position = container.get_object(second).unwrap().curve_position();
        assert!((position - 0.68).abs() < 1e-9, "position = {position}");
        assert!(spacing(&container, first, second) + 1e-9 >= 0.18);
        assert!(container.scene().dangling_links().is_empty());
    }

    #[test]
    fn test_full_profile_rejects_light() {
        let catalog = Arc::new(Catalog::from_json(CATALOG).unwrap());
        let mut config = EngineConfig::default();
        config
            .light_models
            .models
            .insert("XNRS31".into(), LightModel::new(0.4, 0.0));
        let mut container = SceneContainer::new(catalog, config);
        let profile = add(&mut container, "XNR01L");
        let lights: Vec<ObjectId> = (0..4).map(|_| add(&mut container, "XNRS31")).collect();

        for &light in &lights[..3] {
            container.attach_line(profile, light, DVec3::ZERO, false).unwrap();
        }
        let positions: Vec<f64> = lights[..3]
            .iter()
            .map(|&id| container.get_object(id).unwrap().curve_position())
            .collect();
        for (position, expected) in positions.iter().zip([0.05, 0.45, 0.85]) {
            assert!((position - expected).abs() < 1e-9, "{positions:?}");
        }

        assert!(matches!(
            container.attach_line(profile, lights[3], DVec3::ZERO, false),
            Err(EngineError::NoValidLightPosition)
        ));
        assert!(!container.get_object(lights[3]).unwrap().is_attached());
        assert_eq!(container.get_object(profile).unwrap().line_junctions()[0].occupants().len(), 3);

        // The last light may only slide within its own gap.
        container.move_light(lights[2], 0.5).unwrap();
        assert!((container.get_object(lights[2]).unwrap().curve_position() - 0.85).abs() < 1e-9);
        assert!(matches!(container.place_light(lights[3], 0.5), Err(EngineError::NoValidLightPosition)));
        assert!(container.scene().dangling_links().is_empty());
    }

    #[test]
    fn test_attach_frames_moved_object() {
        let mut container = container();
        let a = add(&mut container, "XNR01L");
        let b = add(&mut container, "XNR01L");

        container.attach(a, b, Some(1), true).unwrap();
        assert_eq!(container.camera.target, DVec3::ZERO);

        container.detach(a, b).unwrap();
        let c = add(&mut container, "XNR01L");
        container.attach(a, c, Some(1), false).unwrap();
        let moved = container.get_object(c).unwrap().mesh().unwrap().position();
        assert!(moved.distance(DVec3::new(-10.0, 0.0, 0.0)) < 1e-9);
        assert!(container.camera.target.distance(moved) < 1e-9);
    }

    #[test]
    fn test_set_mesh_detaches_neighbours() {
        let mut container = container();
        let a = add(&mut container, "XNR01L");
        let b = add(&mut container, "XNR01L");
        container.attach(a, b, None, true).unwrap();

        container.set_mesh(b, TransformMesh::new().boxed()).unwrap();
        assert!(!container.get_object(a).unwrap().is_attached());
        assert!(!container.get_object(b).unwrap().is_attached());
        assert!(container.scene().dangling_links().is_empty());
    }

    #[test]
    fn test_rotate_through_container() {
        let mut container = container();
        let a = add(&mut container, "XNR01L");
        let b = add(&mut container, "XNR01L");
        assert!(matches!(container.rotate(b), Err(EngineError::RequiresSingleAttachment)));

        container.attach(a, b, None, true).unwrap();
        container.rotate(b).unwrap();
        assert_eq!(container.get_object(b).unwrap().junctions(), &[None, Some(a)]);
        container.rotate(b).unwrap();
        assert_eq!(container.get_object(b).unwrap().junctions(), &[Some(a), None]);
    }

    #[test]
    fn test_remove_object_detaches() {
        let mut container = container();
        let a = add(&mut container, "XNR01L");
        let b = add(&mut container, "XNR01L");
        let light = add(&mut container, "XNRS31");
        container.attach(a, b, None, true).unwrap();
        container.attach_line(a, light, DVec3::new(5.0, 0.0, 0.0), false).unwrap();

        container.remove_object(a).unwrap();
        assert!(container.get_object(a).is_none());
        assert!(!container.get_object(b).unwrap().is_attached());
        assert!(!container.get_object(light).unwrap().is_attached());
        assert!(container.scene().dangling_links().is_empty());
        assert!(matches!(container.remove_object(a), Err(EngineError::UnknownObject(_))));
    }

    #[test]
    fn test_click_point_handle() {
        let mut container = container();
        let a = add(&mut container, "XNR01L");
        let b = add(&mut container, "XNR01L");

        container.select_for(b).unwrap();
        container.camera = camera_above(10.0);
        let center = viewport_center(&container);
        let hover = container.update_pointer(center).unwrap();
        assert_eq!(hover.handle, HandleRef::Point(1));

        container.click(b).unwrap();
        assert_eq!(container.get_object(a).unwrap().junctions()[1], Some(b));
        assert!(!container.scene().handles.is_visible());
        assert!(matches!(container.click(b), Err(EngineError::NothingHovered)));
    }

    #[test]
    fn test_click_line_and_disabled_handles() {
        let mut container = container();
        let profile = add(&mut container, "XNR01L");
        let light = add(&mut container, "XNRS31");

        container.select_for(light).unwrap();
        container.camera = camera_above(10.0);
        let center = viewport_center(&container);
        container.update_pointer(center).unwrap();
        assert!(matches!(container.click(light), Err(EngineError::DisabledHandle)));

        container.camera = camera_above(4.0);
        let hover = container.update_pointer(center).unwrap();
        assert_eq!(hover.handle, HandleRef::Line(0));
        container.click(light).unwrap();
        let object = container.get_object(light).unwrap();
        assert!((object.curve_position() - 0.4).abs() < 0.01);
        assert_eq!(container.find_parent_profile(light), Some(profile));
    }

    #[test]
    fn test_select_object_by_code() {
        let mut container = container();
        add(&mut container, "XNR01L");
        container.select_object("XNRS31").unwrap();
        assert_eq!(container.scene().handles.line_handles().len(), 1);
        assert!(container.select_object("NOPE").is_err());
        container.set_handles_visible(false);
        assert!(container.update_pointer(Point::ZERO).is_none());
    }

    #[test]
    fn test_scenes_are_separate() {
        let mut container = container();
        add(&mut container, "XNR01L");
        container.set_scene(SceneKind::Single);
        assert!(container.objects().is_empty());
        add(&mut container, "BOX");
        container.reset_scene();
        assert!(container.objects().is_empty());
        container.set_scene(SceneKind::Normal);
        assert_eq!(container.objects().len(), 1);
    }

    #[test]
    fn test_totals_and_snapshot() {
        let mut container = container();
        let profile = add(&mut container, "XNR01L");
        let light = add(&mut container, "XNRS31");
        container.attach_line(profile, light, DVec3::new(5.0, 0.0, 0.0), false).unwrap();

        assert!((container.power_budget() - 16.0).abs() < 1e-9);
        assert_eq!(container.total_price_cents(), 7500);

        let snapshot = container.snapshot();
        assert_eq!(snapshot.objects.len(), 2);
        assert_eq!(snapshot.objects[0].line_junctions, vec![vec![light]]);
        let json = snapshot.to_json().unwrap();
        assert!(json.contains("XNRS31"));
    }

    #[test]
    fn test_extruded_power_scales_with_length() {
        let mut container = container();
        let id = container
            .add_extruded_object("XNR01L", 2000.0, TransformMesh::new().boxed())
            .unwrap();
        let object = container.get_object(id).unwrap();
        assert_eq!(object.length_mm(), Some(2000.0));
        assert!((object.world_junction(1).unwrap().x - 50.0).abs() < 1e-9);
        assert!((container.power_budget() - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_add_object_with_loader() {
        let mut container = container();
        let loader = MemoryMeshLoader::new();
        loader.insert("XNR01L", TransformMesh::with_radius(5.0)).unwrap();

        let id = block_on(container.add_object_with(&loader, "XNR01L")).unwrap();
        assert!(container.get_object(id).unwrap().has_mesh());
        assert!(block_on(container.add_object_with(&loader, "XNRS31")).is_err());
        assert_eq!(container.objects().len(), 1);
    }

    #[test]
    fn test_composite_profile_layout() {
        let mut container = container();
        let loader = MemoryMeshLoader::with_fallback(TransformMesh::new());
        let composite = calculate_profile_composition("XNR01L", 5600);

        let ids = block_on(container.add_composite_profile(&loader, &composite)).unwrap();
        assert_eq!(ids.len(), 4);

        let pieces: Vec<&PlaceableObject> = ids.iter().map(|&id| container.get_object(id).unwrap()).collect();
        assert_eq!(pieces[0].catalog_entry().juncts.len(), 1);
        assert!(pieces[1].catalog_entry().juncts.is_empty());
        assert_eq!(pieces[3].catalog_entry().juncts.len(), 1);
        assert!(pieces.iter().all(|p| p.catalog_entry().line_juncts.len() == 1));

        let xs: Vec<f64> = pieces.iter().map(|p| p.mesh().unwrap().position().x).collect();
        assert!(xs.windows(2).all(|w| w[0] < w[1]));
        assert!((pieces[2].mesh().unwrap().scale().x - 0.2).abs() < 1e-12);
        assert_eq!(pieces[2].length_mm(), Some(500.0));
    }

    #[test]
    fn test_highlight_and_direction() {
        let mut container = container();
        let profile = add(&mut container, "XNR01L");
        let light = add(&mut container, "XNRS31");
        container.attach_line(profile, light, DVec3::new(5.0, 0.0, 0.0), false).unwrap();

        container.highlight_light(Some(light));
        assert_eq!(container.get_object(profile).unwrap().opacity(), DIMMED_OPACITY);
        assert_eq!(container.get_object(light).unwrap().opacity(), 1.0);
        container.highlight_light(None);
        assert_eq!(container.get_object(profile).unwrap().opacity(), 1.0);

        container.camera = Camera::default();
        assert!(!container.light_movement_direction(light));
        container.camera.position = DVec3::new(0.0, 50.0, -50.0);
        assert!(container.light_movement_direction(light));
    }
}
