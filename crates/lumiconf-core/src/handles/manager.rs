//! Handle manager: builds candidate handles and tracks the hovered one.

use super::HandleError;
use super::handle::{
    AngleArrow, CurvePreview, DISABLED_COLOR, ENABLED_COLOR, HOVER_COLOR, HandleTarget, LineHandle, PointHandle,
};
use crate::camera::{Camera, Projection};
use crate::catalog::CatalogEntry;
use crate::config::HandleScale;
use crate::curve::QuadBezier3;
use crate::math::{Ray, angle_helper};
use crate::object::PlaceableObject;
use glam::DVec3;
use kurbo::Point;
use log::warn;

/// Reference to a handle in one of the manager's lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandleRef {
    Point(usize),
    DisabledPoint(usize),
    Line(usize),
    DisabledLine(usize),
}

impl HandleRef {
    pub fn is_disabled(&self) -> bool {
        matches!(self, Self::DisabledPoint(_) | Self::DisabledLine(_))
    }
}

/// The handle under the pointer and where the pointer ray touched it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hover {
    pub handle: HandleRef,
    pub point: DVec3,
    pub distance: f64,
}

/// Manages attachment handles for the object being placed.
#[derive(Debug, Clone, Default)]
pub struct HandleManager {
    handles: Vec<PointHandle>,
    disabled_handles: Vec<PointHandle>,
    line_handles: Vec<LineHandle>,
    disabled_line_handles: Vec<LineHandle>,
    angles: Vec<AngleArrow>,
    curves: Vec<CurvePreview>,
    visible: bool,
    hovering: Option<Hover>,
    scale: HandleScale,
}

impl HandleManager {
    /// Create a new handle manager.
    pub fn new(scale: HandleScale) -> Self {
        Self {
            scale,
            ..Self::default()
        }
    }

    /// Rebuild handles for placing an object with `selected` entry.
    ///
    /// Every free point junction of the given objects gets a handle, enabled
    /// when `selected` has a junction of the same group. Every line junction
    /// gets a line handle under the same rule. Objects without a mesh are skipped.
    pub fn select_object<'a>(
        &mut self,
        selected: &CatalogEntry,
        objects: impl IntoIterator<Item = &'a PlaceableObject>,
    ) -> &mut Self {
        self.clear();
        let compatible = |group: &str| selected.juncts.iter().position(|j| j.group == group);

        for object in objects {
            if !object.has_mesh() {
                continue;
            }
            let entry = object.catalog_entry();
            for (i, slot) in object.junctions().iter().enumerate() {
                if slot.is_some() {
                    continue;
                }
                let (Some(junct), Some(position)) = (entry.juncts.get(i), object.world_junction(i)) else {
                    continue;
                };
                match compatible(&junct.group) {
                    Some(k) => {
                        self.create_handle(
                            position,
                            HandleTarget { other: object.id(), other_junction: i, selected_junction: Some(k) },
                        );
                    }
                    None => {
                        self.create_disabled_handle(position);
                    }
                }
            }
            for (i, line) in entry.line_juncts.iter().enumerate() {
                let Some(curve) = object.world_line_curve(i) else {
                    continue;
                };
                let selected_junction = compatible(&line.group);
                let target = HandleTarget { other: object.id(), other_junction: i, selected_junction };
                if selected_junction.is_some() {
                    self.create_line_handle(curve, target);
                } else {
                    self.create_disabled_line_handle(curve, target);
                }
            }
        }

        log::debug!(
            "Handles for {}: {} enabled, {} disabled, {} line, {} disabled line",
            selected.code,
            self.handles.len(),
            self.disabled_handles.len(),
            self.line_handles.len(),
            self.disabled_line_handles.len()
        );
        self.visible = true;
        self
    }

    /// Remove every handle and forget the hover.
    pub fn clear(&mut self) {
        self.handles.clear();
        self.disabled_handles.clear();
        self.line_handles.clear();
        self.disabled_line_handles.clear();
        self.hovering = None;
    }

    /// Remove handles, angle arrows and curve previews, and hide.
    pub fn delete(&mut self) {
        self.clear();
        self.angles.clear();
        self.curves.clear();
        self.visible = false;
    }

    pub fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
        if !visible {
            self.hovering = None;
        }
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn create_handle(&mut self, position: DVec3, target: HandleTarget) -> usize {
        self.handles.push(PointHandle::new(position, Some(target)));
        self.handles.len() - 1
    }

    pub fn create_disabled_handle(&mut self, position: DVec3) -> usize {
        self.disabled_handles.push(PointHandle::disabled(position));
        self.disabled_handles.len() - 1
    }

    /// An enabled handle with no attachment target, e.g. a placement preview.
    pub fn create_temporary_handle(&mut self, position: DVec3) -> usize {
        let mut handle = PointHandle::new(position, None);
        handle.temporary = true;
        self.handles.push(handle);
        self.handles.len() - 1
    }

    pub fn create_line_handle(&mut self, curve: QuadBezier3, target: HandleTarget) -> usize {
        self.line_handles.push(LineHandle::new(curve, target, false));
        self.line_handles.len() - 1
    }

    pub fn create_disabled_line_handle(&mut self, curve: QuadBezier3, target: HandleTarget) -> usize {
        let target = HandleTarget { selected_junction: None, ..target };
        self.disabled_line_handles.push(LineHandle::new(curve, target, true));
        self.disabled_line_handles.len() - 1
    }

    pub fn move_handle(&mut self, index: usize, position: DVec3) -> Result<(), HandleError> {
        move_in(&mut self.handles, index, position)
    }

    pub fn move_disabled_handle(&mut self, index: usize, position: DVec3) -> Result<(), HandleError> {
        move_in(&mut self.disabled_handles, index, position)
    }

    pub fn create_angle(&mut self) -> usize {
        self.angles.push(AngleArrow::default());
        self.angles.len() - 1
    }

    /// Point an angle arrow along `angle` degrees from `position`.
    pub fn set_angle(&mut self, index: usize, angle: f64, position: DVec3) -> Result<(), HandleError> {
        let Some(arrow) = self.angles.get_mut(index) else {
            warn!("No angle arrow at index {}", index);
            return Err(HandleError::UnknownHandle(index));
        };
        arrow.position = position;
        arrow.direction = angle_helper(angle);
        arrow.visible = true;
        Ok(())
    }

    pub fn create_curve(&mut self, curve: &QuadBezier3) -> usize {
        self.curves.push(CurvePreview::from_curve(curve));
        self.curves.len() - 1
    }

    pub fn update_curve(&mut self, index: usize, curve: &QuadBezier3) -> Result<(), HandleError> {
        let Some(preview) = self.curves.get_mut(index) else {
            warn!("No curve preview at index {}", index);
            return Err(HandleError::UnknownHandle(index));
        };
        *preview = CurvePreview::from_curve(curve);
        Ok(())
    }

    pub fn delete_curve(&mut self, index: usize) -> Result<CurvePreview, HandleError> {
        if index >= self.curves.len() {
            warn!("No curve preview at index {}", index);
            return Err(HandleError::UnknownHandle(index));
        }
        Ok(self.curves.remove(index))
    }

    /// Rescale handles for the camera and pick the handle under `pointer`.
    ///
    /// `pointer` is in normalized device coordinates.
    pub fn update(&mut self, camera: &Camera, pointer: Point) -> Option<Hover> {
        if !self.visible {
            self.hovering = None;
            return None;
        }

        let scale = match camera.projection {
            Projection::Orthographic => self.scale.for_zoom(camera.zoom),
            Projection::Perspective => 1.0,
        };
        for handle in &mut self.handles {
            handle.scale = scale;
        }

        let ray = camera.ray_from_ndc(pointer);
        let hover = self.hit_test(&ray);

        for handle in &mut self.handles {
            handle.color = ENABLED_COLOR;
        }
        for handle in &mut self.line_handles {
            handle.color = ENABLED_COLOR;
        }
        match hover.map(|h| (h.handle, h.point)) {
            Some((HandleRef::Point(i), _)) => {
                if let Some(handle) = self.handles.get_mut(i) {
                    handle.color = HOVER_COLOR;
                }
            }
            Some((HandleRef::Line(i), point)) => {
                if let Some(handle) = self.line_handles.get_mut(i) {
                    handle.color = HOVER_COLOR;
                    handle.clicked_point = Some(point);
                }
            }
            Some((HandleRef::DisabledLine(i), point)) => {
                if let Some(handle) = self.disabled_line_handles.get_mut(i) {
                    handle.color = DISABLED_COLOR;
                    handle.clicked_point = Some(point);
                }
            }
            _ => {}
        }

        self.hovering = hover;
        hover
    }

    /// Closest handle hit by `ray` across all handle lists.
    pub fn hit_test(&self, ray: &Ray) -> Option<Hover> {
        let points = self
            .handles
            .iter()
            .enumerate()
            .filter_map(|(i, h)| h.intersect(ray).map(|hit| (HandleRef::Point(i), hit)));
        let disabled = self
            .disabled_handles
            .iter()
            .enumerate()
            .filter_map(|(i, h)| h.intersect(ray).map(|hit| (HandleRef::DisabledPoint(i), hit)));
        let lines = self
            .line_handles
            .iter()
            .enumerate()
            .filter_map(|(i, h)| h.intersect(ray).map(|hit| (HandleRef::Line(i), hit)));
        let disabled_lines = self
            .disabled_line_handles
            .iter()
            .enumerate()
            .filter_map(|(i, h)| h.intersect(ray).map(|hit| (HandleRef::DisabledLine(i), hit)));

        points
            .chain(disabled)
            .chain(lines)
            .chain(disabled_lines)
            .min_by(|a, b| a.1.0.total_cmp(&b.1.0))
            .map(|(handle, (distance, point))| Hover { handle, point, distance })
    }

    pub fn hovering(&self) -> Option<&Hover> {
        self.hovering.as_ref()
    }

    /// Attachment target of an enabled handle.
    pub fn target(&self, handle: HandleRef) -> Option<HandleTarget> {
        match handle {
            HandleRef::Point(i) => self.handles.get(i)?.target,
            HandleRef::Line(i) => Some(self.line_handles.get(i)?.target),
            HandleRef::DisabledPoint(_) | HandleRef::DisabledLine(_) => None,
        }
    }

    pub fn handles(&self) -> &[PointHandle] {
        &self.handles
    }

    pub fn disabled_handles(&self) -> &[PointHandle] {
        &self.disabled_handles
    }

    pub fn line_handles(&self) -> &[LineHandle] {
        &self.line_handles
    }

    pub fn disabled_line_handles(&self) -> &[LineHandle] {
        &self.disabled_line_handles
    }

    pub fn angles(&self) -> &[AngleArrow] {
        &self.angles
    }

    pub fn curves(&self) -> &[CurvePreview] {
        &self.curves
    }
}

fn move_in(handles: &mut [PointHandle], index: usize, position: DVec3) -> Result<(), HandleError> {
    match handles.get_mut(index) {
        Some(handle) => {
            handle.position = position;
            Ok(())
        }
        None => {
            warn!("No handle at index {}", index);
            Err(HandleError::UnknownHandle(index))
        }
    }
}
