//! Assembly scripts: a JSON list of scene operations addressed by label.

use glam::DVec3;
use lumiconf_core::{
    EngineError, MeshLoader, ObjectId, SceneContainer, TransformMesh, calculate_profile_composition,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// One scene operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Step {
    /// Add a catalog product
    Add { label: String, code: String },
    /// Add a straight profile of custom length
    AddExtruded { label: String, code: String, length_mm: f64 },
    /// Add a profile built from standard pieces, labelled `<label>.0`, `<label>.1`, ...
    AddComposite { label: String, code: String, length_mm: u32 },
    /// Attach `object` to a point junction of `to`
    Attach {
        to: String,
        object: String,
        #[serde(default)]
        junction: Option<usize>,
    },
    /// Attach `object` to the line junction of `to` nearest `target`
    AttachLine {
        to: String,
        object: String,
        target: [f64; 3],
        #[serde(default)]
        force: bool,
    },
    MoveLight { object: String, position: f64 },
    /// Move a light to the nearest position that keeps spacing
    PlaceLight { object: String, position: f64 },
    Rotate { object: String },
    Detach { a: String, b: String },
    Remove { object: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Script {
    pub steps: Vec<Step>,
}

impl Script {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("Unknown label: {0}")]
    UnknownLabel(String),
    #[error("Label already used: {0}")]
    DuplicateLabel(String),
    #[error(transparent)]
    Engine(#[from] EngineError),
}

/// Applies steps to a scene container, tracking labels.
pub struct ScriptRunner<'a> {
    container: &'a mut SceneContainer,
    loader: &'a dyn MeshLoader,
    labels: HashMap<String, ObjectId>,
}

impl<'a> ScriptRunner<'a> {
    pub fn new(container: &'a mut SceneContainer, loader: &'a dyn MeshLoader) -> Self {
        Self {
            container,
            loader,
            labels: HashMap::new(),
        }
    }

    pub fn labels(&self) -> &HashMap<String, ObjectId> {
        &self.labels
    }

    fn id(&self, label: &str) -> Result<ObjectId, ScriptError> {
        self.labels
            .get(label)
            .copied()
            .ok_or_else(|| ScriptError::UnknownLabel(label.to_string()))
    }

    fn bind(&mut self, label: &str, id: ObjectId) -> Result<(), ScriptError> {
        if self.labels.contains_key(label) {
            return Err(ScriptError::DuplicateLabel(label.to_string()));
        }
        self.labels.insert(label.to_string(), id);
        Ok(())
    }

    pub fn apply(&mut self, step: &Step) -> Result<(), ScriptError> {
        match step {
            Step::Add { label, code } => {
                if self.labels.contains_key(label) {
                    return Err(ScriptError::DuplicateLabel(label.clone()));
                }
                let id = pollster::block_on(self.container.add_object_with(self.loader, code))?;
                self.bind(label, id)?;
            }
            Step::AddExtruded { label, code, length_mm } => {
                if self.labels.contains_key(label) {
                    return Err(ScriptError::DuplicateLabel(label.clone()));
                }
                let id = self
                    .container
                    .add_extruded_object(code, *length_mm, TransformMesh::new().boxed())?;
                self.bind(label, id)?;
            }
            Step::AddComposite { label, code, length_mm } => {
                let composite = calculate_profile_composition(code, *length_mm);
                let labels: Vec<String> = (0..composite.piece_count()).map(|i| format!("{}.{}", label, i)).collect();
                if let Some(taken) = labels.iter().find(|l| self.labels.contains_key(*l)) {
                    return Err(ScriptError::DuplicateLabel(taken.clone()));
                }
                let ids = pollster::block_on(self.container.add_composite_profile(self.loader, &composite))?;
                for (label, id) in labels.iter().zip(ids) {
                    self.bind(label, id)?;
                }
            }
            Step::Attach { to, object, junction } => {
                let (to, object) = (self.id(to)?, self.id(object)?);
                self.container.attach(to, object, *junction, false)?;
            }
            Step::AttachLine { to, object, target, force } => {
                let (to, object) = (self.id(to)?, self.id(object)?);
                self.container
                    .attach_line(to, object, DVec3::from_array(*target), *force)?;
            }
            Step::MoveLight { object, position } => {
                let object = self.id(object)?;
                self.container.move_light(object, *position)?;
            }
            Step::PlaceLight { object, position } => {
                let object = self.id(object)?;
                let placed = self.container.place_light(object, *position)?;
                log::info!("Placed light at {:.3}", placed);
            }
            Step::Rotate { object } => {
                let object = self.id(object)?;
                self.container.rotate(object)?;
            }
            Step::Detach { a, b } => {
                let (a, b) = (self.id(a)?, self.id(b)?);
                self.container.detach(a, b)?;
            }
            Step::Remove { object } => {
                let id = self.id(object)?;
                self.container.remove_object(id)?;
                self.labels.remove(object);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lumiconf_core::{Catalog, EngineConfig, MemoryMeshLoader};
    use std::sync::Arc;

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
            "category": "profile"
        },
        "XNRS31": {
            "juncts": [{"group": "rail", "x": 0, "y": 0, "z": 0, "angle": 0}],
            "power": 6,
            "category": "light_fixture",
            "model": "XNRS31"
        }
    }"#;

    const SCRIPT: &str = r#"{
        "steps": [
            {"op": "add", "label": "a", "code": "XNR01L"},
            {"op": "add", "label": "b", "code": "XNR01L"},
            {"op": "attach", "to": "a", "object": "b"},
            {"op": "add", "label": "l1", "code": "XNRS31"},
            {"op": "attach_line", "to": "a", "object": "l1", "target": [5, 0, 0]},
            {"op": "add", "label": "l2", "code": "XNRS31"},
            {"op": "place_light", "object": "l2", "position": 0.55},
            {"op": "rotate", "object": "b"}
        ]
    }"#;

    fn container() -> SceneContainer {
        let catalog = Arc::new(Catalog::from_json(CATALOG).unwrap());
        SceneContainer::new(catalog, EngineConfig::default())
    }

    #[test]
    fn test_parse_steps() {
        let script = Script::from_json(SCRIPT).unwrap();
        assert_eq!(script.steps.len(), 8);
        assert_eq!(
            script.steps[2],
            Step::Attach { to: "a".into(), object: "b".into(), junction: None }
        );
    }

    #[test]
    fn test_run_script() {
        let mut container = container();
        let loader = MemoryMeshLoader::with_fallback(TransformMesh::new());
        let script = Script::from_json(SCRIPT).unwrap();
        let mut runner = ScriptRunner::new(&mut container, &loader);
        for step in &script.steps {
            runner.apply(step).unwrap();
        }
        let l2 = runner.labels()["l2"];

        assert_eq!(container.objects().len(), 4);
        assert!(container.scene().dangling_links().is_empty());
        let position = container.get_object(l2).unwrap().curve_position();
        assert!((position - 0.68).abs() < 1e-9);
    }

    #[test]
    fn test_label_errors() {
        let mut container = container();
        let loader = MemoryMeshLoader::with_fallback(TransformMesh::new());
        let mut runner = ScriptRunner::new(&mut container, &loader);

        let missing = Step::Rotate { object: "nope".into() };
        assert!(matches!(runner.apply(&missing), Err(ScriptError::UnknownLabel(_))));

        let add = Step::Add { label: "a".into(), code: "XNR01L".into() };
        runner.apply(&add).unwrap();
        assert!(matches!(runner.apply(&add), Err(ScriptError::DuplicateLabel(_))));

        let unknown = Step::Add { label: "x".into(), code: "NOPE".into() };
        assert!(matches!(runner.apply(&unknown), Err(ScriptError::Engine(_))));
    }

    #[test]
    fn test_composite_labels() {
        let mut container = container();
        let loader = MemoryMeshLoader::with_fallback(TransformMesh::new());
        let mut runner = ScriptRunner::new(&mut container, &loader);
        let step = Step::AddComposite { label: "run".into(), code: "XNR01L".into(), length_mm: 3100 };
        runner.apply(&step).unwrap();
        assert!(runner.labels().contains_key("run.0"));
        assert!(runner.labels().contains_key("run.2"));

        // A clash on any piece label adds nothing.
        let clash = Step::AddComposite { label: "run".into(), code: "XNR01L".into(), length_mm: 2600 };
        assert!(matches!(runner.apply(&clash), Err(ScriptError::DuplicateLabel(l)) if l == "run.0"));
        assert_eq!(runner.labels().len(), 3);
        assert_eq!(container.objects().len(), 3);
    }
}
