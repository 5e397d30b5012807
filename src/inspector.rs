use bitflags::bitflags;
use glam::Vec3;

use crate::numeric_field::format_number;
use crate::selection::{SelectionMode, SelectionSet};
use crate::stage::Stage;
use crate::transform::Axis;

bitflags! {
    /// Editor controls whose enabled state follows the selection.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct SelectionControls: u8 {
        const POSITION = 1 << 0;
        const ROTATION = 1 << 1;
        const VIEW_SELECTED = 1 << 2;
        const REMOVE = 1 << 3;
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterRow {
    pub index: usize,
    pub label: String,
    pub value: String,
    pub tooltip: Option<String>,
}

/// Everything the inspector panel shows, derived from the selection and stage alone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InspectorView {
    pub selection_count: usize,
    pub selection_mode: SelectionMode,
    pub selection_label: String,
    pub controls: SelectionControls,
    pub position: [String; 3],
    pub rotation: [String; 3],
    pub object_type: String,
    pub parameters: Vec<ParameterRow>,
}

impl Default for InspectorView {
    fn default() -> Self {
        Self::refresh(&SelectionSet::new(), &Stage::empty())
    }
}

impl InspectorView {
    pub fn refresh(selection: &SelectionSet, stage: &Stage) -> Self {
        let selection_count = selection.count();
        let selection_mode = selection.mode();

        let mut controls = SelectionControls::empty();
        if selection_mode == SelectionMode::Single {
            controls |= SelectionControls::POSITION | SelectionControls::ROTATION | SelectionControls::VIEW_SELECTED;
        }
        if selection_count > 0 {
            controls |= SelectionControls::REMOVE;
        }

        let transform = selection.active_transform(stage);
        let position = transform.map(|tx| tx.position).unwrap_or(Vec3::ZERO);
        let rotation = transform.map(|tx| tx.euler_degrees()).unwrap_or(Vec3::ZERO);

        let object = selection.active_object(stage);
        let object_type = object.map(|obj| obj.object_type.clone()).unwrap_or_default();
        let parameters = match object {
            Some(object) => {
                let template = stage.template_for(&object.object_type);
                object
                    .parameters
                    .iter()
                    .enumerate()
                    .map(|(index, param)| {
                        let template_param = template.and_then(|template| template.parameter(index));
                        ParameterRow {
                            index,
                            label: template_param
                                .map(|tp| tp.name.clone())
                                .unwrap_or_else(|| format!("Parameter {index}")),
                            value: param.display_text(),
                            tooltip: template_param
                                .map(|tp| tp.description.clone())
                                .filter(|description| !description.is_empty()),
                        }
                    })
                    .collect()
            }
            None => Vec::new(),
        };

        Self {
            selection_count,
            selection_mode,
            selection_label: format!("{selection_count} Object(s) Selected"),
            controls,
            position: vec3_fields(position),
            rotation: vec3_fields(rotation),
            object_type,
            parameters,
        }
    }

    pub fn is_enabled(&self, control: SelectionControls) -> bool {
        self.controls.contains(control)
    }
}

fn vec3_fields(value: Vec3) -> [String; 3] {
    Axis::ALL.map(|axis| format_number(value[axis.index()]))
}
