//! Editor interaction state machine.
//!
//! `transition` is a pure function of the current state, one input and the
//! editing context. It returns the next state together with the store writes
//! that the dispatcher has to apply. Nothing here touches the ECS world.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use super::origin_store::Origin;
use super::transform_store::{ScanId, TransformPatch};
use crate::tools::picking::PickHit;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransformMode {
    Translate,
    Rotate,
    Scale,
}

/// Mode names exchanged with the host page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EditorMode {
    ViewOnly,
    AddMarking,
    Translate,
    Rotate,
    Scale,
    PickOrigin,
}

impl EditorMode {
    pub fn from_string(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "view-only" | "view" => Some(Self::ViewOnly),
            "add-marking" => Some(Self::AddMarking),
            "translate" => Some(Self::Translate),
            "rotate" => Some(Self::Rotate),
            "scale" => Some(Self::Scale),
            "pick-origin" => Some(Self::PickOrigin),
            _ => None,
        }
    }

    pub fn to_string(&self) -> &'static str {
        match self {
            Self::ViewOnly => "view-only",
            Self::AddMarking => "add-marking",
            Self::Translate => "translate",
            Self::Rotate => "rotate",
            Self::Scale => "scale",
            Self::PickOrigin => "pick-origin",
        }
    }

    /// Input that requests this mode.
    pub fn input(self) -> EditorInput {
        match self {
            Self::ViewOnly => EditorInput::Back,
            Self::AddMarking => EditorInput::BeginAddMarking,
            Self::Translate => EditorInput::BeginTransform(TransformMode::Translate),
            Self::Rotate => EditorInput::BeginTransform(TransformMode::Rotate),
            Self::Scale => EditorInput::BeginTransform(TransformMode::Scale),
            Self::PickOrigin => EditorInput::BeginOriginPick,
        }
    }
}

/// Surface point waiting for a label.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PendingPick {
    pub point: Vec3,
    pub normal: Option<Vec3>,
}

/// State to return to once an origin pick finishes.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ResumeState {
    Viewing,
    AddingMarking,
    TransformingScan {
        mode: TransformMode,
        selected: Option<ScanId>,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum EditorState {
    #[default]
    Viewing,
    AddingMarking {
        pending: Option<PendingPick>,
    },
    PickingOrigin {
        resume: ResumeState,
    },
    TransformingScan {
        mode: TransformMode,
        selected: Option<ScanId>,
    },
}

impl EditorState {
    pub fn mode(&self) -> EditorMode {
        match self {
            Self::Viewing => EditorMode::ViewOnly,
            Self::AddingMarking { .. } => EditorMode::AddMarking,
            Self::PickingOrigin { .. } => EditorMode::PickOrigin,
            Self::TransformingScan { mode, .. } => match mode {
                TransformMode::Translate => EditorMode::Translate,
                TransformMode::Rotate => EditorMode::Rotate,
                TransformMode::Scale => EditorMode::Scale,
            },
        }
    }

    /// Orbit and pan are suspended while picking an origin so drags are never mistaken for picks.
    pub fn camera_controls_enabled(&self) -> bool {
        !matches!(self, Self::PickingOrigin { .. })
    }

    pub fn pending_pick(&self) -> Option<&PendingPick> {
        match self {
            Self::AddingMarking { pending } => pending.as_ref(),
            _ => None,
        }
    }

    pub fn selected_scan(&self) -> Option<&ScanId> {
        match self {
            Self::TransformingScan { selected, .. } => selected.as_ref(),
            _ => None,
        }
    }

    /// Input that steps back out of the innermost unfinished action.
    pub fn cancel_input(&self) -> EditorInput {
        match self {
            Self::AddingMarking { pending: Some(_) } => EditorInput::CancelPick,
            Self::PickingOrigin { .. } => EditorInput::CancelOriginPick,
            _ => EditorInput::Back,
        }
    }

    fn resume_point(&self) -> ResumeState {
        match self {
            Self::TransformingScan { mode, selected } => ResumeState::TransformingScan {
                mode: *mode,
                selected: selected.clone(),
            },
            Self::AddingMarking { .. } => ResumeState::AddingMarking,
            Self::Viewing | Self::PickingOrigin { .. } => ResumeState::Viewing,
        }
    }
}

impl From<ResumeState> for EditorState {
    fn from(resume: ResumeState) -> Self {
        match resume {
            ResumeState::Viewing => Self::Viewing,
            ResumeState::AddingMarking => Self::AddingMarking { pending: None },
            ResumeState::TransformingScan { mode, selected } => {
                Self::TransformingScan { mode, selected }
            }
        }
    }
}

/// Everything the host view or the pointer can ask of the editor.
#[derive(Event, Debug, Clone, PartialEq)]
pub enum EditorInput {
    BeginAddMarking,
    PointerClick(Option<PickHit>),
    ConfirmPick { label: String, link: Option<String> },
    CancelPick,
    BeginOriginPick,
    CancelOriginPick,
    BeginTransform(TransformMode),
    SelectScan(Option<ScanId>),
    DragFrame { scan: ScanId, patch: TransformPatch },
    Back,
    /// The environment stopped being editable.
    EditingEnded,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EditorContext {
    pub editable: bool,
}

/// Store write requested by a transition.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    AppendPendingMarking {
        position: Vec3,
        label: String,
        link: Option<String>,
    },
    WriteOrigin(Origin),
    WriteTransform {
        scan: ScanId,
        patch: TransformPatch,
    },
}

/// Reason an input was refused. The state is left unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Rejection {
    EmptyLabel,
    NotEditable,
    NoPendingPick,
    PickInProgress,
    NotApplicable,
}

impl Rejection {
    pub fn message(&self) -> &'static str {
        match self {
            Self::EmptyLabel => "A marking needs a label",
            Self::NotEditable => "Environment is not in edit mode",
            Self::NoPendingPick => "No picked point to confirm",
            Self::PickInProgress => "Confirm or cancel the picked point first",
            Self::NotApplicable => "Not available in the current mode",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub state: EditorState,
    pub effects: Vec<Effect>,
    pub rejected: Option<Rejection>,
}

impl Transition {
    fn to(state: EditorState) -> Self {
        Self {
            state,
            effects: Vec::new(),
            rejected: None,
        }
    }

    fn with(state: EditorState, effect: Effect) -> Self {
        Self {
            state,
            effects: vec![effect],
            rejected: None,
        }
    }

    fn reject(state: &EditorState, rejection: Rejection) -> Self {
        Self {
            state: state.clone(),
            effects: Vec::new(),
            rejected: Some(rejection),
        }
    }

    fn stay(state: &EditorState) -> Self {
        Self::to(state.clone())
    }
}

pub fn transition(state: &EditorState, input: EditorInput, context: &EditorContext) -> Transition {
    use EditorState as S;

    match (state, input) {
        (_, EditorInput::Back) => Transition::to(S::Viewing),

        (S::Viewing | S::TransformingScan { .. }, EditorInput::BeginAddMarking) => {
            Transition::to(S::AddingMarking { pending: None })
        }
        (_, EditorInput::BeginAddMarking) => Transition::reject(state, Rejection::NotApplicable),

        (S::AddingMarking { pending: None }, EditorInput::PointerClick(hit)) => match hit {
            Some(hit) => Transition::to(S::AddingMarking {
                pending: Some(PendingPick {
                    point: hit.point,
                    normal: hit.normal,
                }),
            }),
            None => Transition::stay(state),
        },
        (S::AddingMarking { pending: Some(_) }, EditorInput::PointerClick(_)) => {
            Transition::reject(state, Rejection::PickInProgress)
        }
        (S::PickingOrigin { resume }, EditorInput::PointerClick(hit)) => match hit {
            Some(hit) => Transition::with(
                resume.clone().into(),
                Effect::WriteOrigin(Origin::from_hit(hit.point, hit.normal)),
            ),
            None => Transition::stay(state),
        },
        (S::TransformingScan { mode, .. }, EditorInput::PointerClick(hit)) => {
            Transition::to(S::TransformingScan {
                mode: *mode,
                selected: hit.and_then(|hit| hit.scan),
            })
        }
        (S::Viewing, EditorInput::PointerClick(_)) => Transition::stay(state),

        (S::AddingMarking { pending: Some(pick) }, EditorInput::ConfirmPick { label, link }) => {
            let label = label.trim();
            if label.is_empty() {
                return Transition::reject(state, Rejection::EmptyLabel);
            }
            Transition::with(
                S::AddingMarking { pending: None },
                Effect::AppendPendingMarking {
                    position: pick.point,
                    label: label.to_string(),
                    link: link
                        .map(|link| link.trim().to_string())
                        .filter(|link| !link.is_empty()),
                },
            )
        }
        (S::AddingMarking { pending: Some(_) }, EditorInput::CancelPick) => {
            Transition::to(S::AddingMarking { pending: None })
        }
        (_, EditorInput::ConfirmPick { .. } | EditorInput::CancelPick) => {
            Transition::reject(state, Rejection::NoPendingPick)
        }

        (S::AddingMarking { pending: Some(_) }, EditorInput::BeginOriginPick) => {
            Transition::reject(state, Rejection::PickInProgress)
        }
        (S::PickingOrigin { .. }, EditorInput::BeginOriginPick) => {
            Transition::reject(state, Rejection::NotApplicable)
        }
        (_, EditorInput::BeginOriginPick) => Transition::to(S::PickingOrigin {
            resume: state.resume_point(),
        }),
        (S::PickingOrigin { resume }, EditorInput::CancelOriginPick) => {
            Transition::to(resume.clone().into())
        }
        (_, EditorInput::CancelOriginPick) => Transition::reject(state, Rejection::NotApplicable),

        (_, EditorInput::BeginTransform(_)) if !context.editable => {
            Transition::reject(state, Rejection::NotEditable)
        }
        (S::AddingMarking { pending: Some(_) }, EditorInput::BeginTransform(_)) => {
            Transition::reject(state, Rejection::PickInProgress)
        }
        (S::PickingOrigin { .. }, EditorInput::BeginTransform(_)) => {
            Transition::reject(state, Rejection::NotApplicable)
        }
        (_, EditorInput::BeginTransform(mode)) => Transition::to(S::TransformingScan {
            mode,
            selected: state.selected_scan().cloned(),
        }),

        (S::TransformingScan { mode, .. }, EditorInput::SelectScan(selected)) => {
            Transition::to(S::TransformingScan {
                mode: *mode,
                selected,
            })
        }
        (_, EditorInput::SelectScan(_)) => Transition::reject(state, Rejection::NotApplicable),

        (_, EditorInput::DragFrame { .. }) if !context.editable => {
            Transition::reject(state, Rejection::NotEditable)
        }
        (
            S::TransformingScan {
                selected: Some(selected),
                ..
            },
            EditorInput::DragFrame { scan, patch },
        ) if *selected == scan => {
            Transition::with(state.clone(), Effect::WriteTransform { scan, patch })
        }
        (_, EditorInput::DragFrame { .. }) => Transition::reject(state, Rejection::NotApplicable),

        (S::TransformingScan { .. }, EditorInput::EditingEnded) => Transition::to(S::Viewing),
        (
            S::PickingOrigin {
                resume: ResumeState::TransformingScan { .. },
            },
            EditorInput::EditingEnded,
        ) => Transition::to(S::PickingOrigin {
            resume: ResumeState::Viewing,
        }),
        (_, EditorInput::EditingEnded) => Transition::stay(state),
    }
}

/// Current interaction state.
#[derive(Resource, Debug, Default)]
pub struct EditorController {
    state: EditorState,
}

impl EditorController {
    pub fn state(&self) -> &EditorState {
        &self.state
    }

    /// Runs one input through the state machine and stores the resulting state.
    pub fn handle(&mut self, input: EditorInput, context: &EditorContext) -> Transition {
        let outcome = transition(&self.state, input, context);
        self.state = outcome.state.clone();
        outcome
    }

    pub fn reset(&mut self) {
        self.state = EditorState::Viewing;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const EDITABLE: EditorContext = EditorContext { editable: true };
    const LOCKED: EditorContext = EditorContext { editable: false };

    fn hit(point: Vec3) -> PickHit {
        PickHit {
            point,
            normal: Some(Vec3::Y),
            distance: 1.0,
            scan: Some("scan-a".into()),
        }
    }

    fn run(state: EditorState, inputs: Vec<EditorInput>, context: &EditorContext) -> (EditorState, Vec<Effect>) {
        inputs
            .into_iter()
            .fold((state, Vec::new()), |(state, mut effects), input| {
                let step = transition(&state, input, context);
                effects.extend(step.effects);
                (step.state, effects)
            })
    }

    #[test]
    fn click_then_confirm_appends_one_pending_marking() {
        let point = Vec3::new(1.0, 2.0, 3.0);
        let (state, effects) = run(
            EditorState::Viewing,
            vec![
                EditorInput::BeginAddMarking,
                EditorInput::PointerClick(Some(hit(point))),
            ],
            &LOCKED,
        );
        assert_eq!(state.pending_pick().map(|pick| pick.point), Some(point));
        assert!(effects.is_empty());

        let second = transition(&state, EditorInput::PointerClick(Some(hit(Vec3::ZERO))), &LOCKED);
        assert_eq!(second.rejected, Some(Rejection::PickInProgress));
        assert_eq!(second.state.pending_pick().map(|pick| pick.point), Some(point));

        let confirmed = transition(
            &state,
            EditorInput::ConfirmPick {
                label: "  L ".into(),
                link: Some(String::new()),
            },
            &LOCKED,
        );
        assert_eq!(confirmed.state, EditorState::AddingMarking { pending: None });
        assert_eq!(
            confirmed.effects,
            vec![Effect::AppendPendingMarking {
                position: point,
                label: "L".into(),
                link: None,
            }]
        );
    }

    #[test]
    fn empty_label_is_rejected_and_pick_kept() {
        let state = EditorState::AddingMarking {
            pending: Some(PendingPick {
                point: Vec3::X,
                normal: None,
            }),
        };
        let step = transition(
            &state,
            EditorInput::ConfirmPick {
                label: "   ".into(),
                link: None,
            },
            &LOCKED,
        );

        assert_eq!(step.rejected, Some(Rejection::EmptyLabel));
        assert_eq!(step.state, state);
        assert!(step.effects.is_empty());
    }

    #[test]
    fn click_on_empty_space_creates_nothing() {
        let state = EditorState::AddingMarking { pending: None };
        let step = transition(&state, EditorInput::PointerClick(None), &LOCKED);

        assert_eq!(step.state, state);
        assert!(step.effects.is_empty());
        assert_eq!(step.rejected, None);
    }

    #[test]
    fn cancel_discards_the_pick_without_effects() {
        let state = EditorState::AddingMarking {
            pending: Some(PendingPick {
                point: Vec3::X,
                normal: None,
            }),
        };
        let step = transition(&state, EditorInput::CancelPick, &LOCKED);

        assert_eq!(step.state, EditorState::AddingMarking { pending: None });
        assert!(step.effects.is_empty());

        let again = transition(&step.state, EditorInput::CancelPick, &LOCKED);
        assert_eq!(again.rejected, Some(Rejection::NoPendingPick));
    }

    #[test]
    fn origin_pick_commits_on_click_and_returns_to_prior_mode() {
        let start = EditorState::AddingMarking { pending: None };
        let picking = transition(&start, EditorInput::BeginOriginPick, &LOCKED).state;
        assert!(!picking.camera_controls_enabled());
        assert_eq!(picking.mode(), EditorMode::PickOrigin);

        let miss = transition(&picking, EditorInput::PointerClick(None), &LOCKED);
        assert_eq!(miss.state, picking);
        assert!(miss.effects.is_empty());

        let step = transition(
            &picking,
            EditorInput::PointerClick(Some(hit(Vec3::new(4.0, 0.0, 1.0)))),
            &LOCKED,
        );
        assert_eq!(step.state, start);
        assert!(step.state.camera_controls_enabled());
        assert_eq!(
            step.effects,
            vec![Effect::WriteOrigin(Origin {
                position: [4.0, 0.0, 1.0],
                rotation: [0.0, 0.0, 0.0],
            })]
        );
    }

    #[test]
    fn origin_pick_is_refused_while_a_marking_pick_waits() {
        let state = EditorState::AddingMarking {
            pending: Some(PendingPick {
                point: Vec3::X,
                normal: None,
            }),
        };
        let step = transition(&state, EditorInput::BeginOriginPick, &LOCKED);
        assert_eq!(step.rejected, Some(Rejection::PickInProgress));
    }

    #[test]
    fn cancel_origin_pick_restores_transform_selection() {
        let start = EditorState::TransformingScan {
            mode: TransformMode::Rotate,
            selected: Some("scan-a".into()),
        };
        let (state, effects) = run(
            start.clone(),
            vec![EditorInput::BeginOriginPick, EditorInput::CancelOriginPick],
            &EDITABLE,
        );
        assert_eq!(state, start);
        assert!(effects.is_empty());
    }

    #[test]
    fn transform_requires_an_editable_environment() {
        let step = transition(
            &EditorState::Viewing,
            EditorInput::BeginTransform(TransformMode::Translate),
            &LOCKED,
        );
        assert_eq!(step.rejected, Some(Rejection::NotEditable));
        assert_eq!(step.state, EditorState::Viewing);

        let step = transition(
            &EditorState::Viewing,
            EditorInput::BeginTransform(TransformMode::Scale),
            &EDITABLE,
        );
        assert_eq!(step.state.mode(), EditorMode::Scale);
    }

    #[test]
    fn every_drag_frame_writes_the_selected_scan() {
        let state = EditorState::TransformingScan {
            mode: TransformMode::Translate,
            selected: Some("scan-a".into()),
        };
        let frames: Vec<EditorInput> = (1..=3)
            .map(|i| EditorInput::DragFrame {
                scan: "scan-a".into(),
                patch: TransformPatch {
                    position: Some([i as f32, 0.0, 0.0]),
                    ..default()
                },
            })
            .collect();

        let (_, effects) = run(state.clone(), frames, &EDITABLE);
        let positions: Vec<f32> = effects
            .iter()
            .filter_map(|effect| match effect {
                Effect::WriteTransform { patch, .. } => patch.position.map(|p| p[0]),
                _ => None,
            })
            .collect();
        assert_eq!(positions, vec![1.0, 2.0, 3.0]);

        let other = transition(
            &state,
            EditorInput::DragFrame {
                scan: "scan-b".into(),
                patch: TransformPatch::default(),
            },
            &EDITABLE,
        );
        assert_eq!(other.rejected, Some(Rejection::NotApplicable));
    }

    #[test]
    fn click_in_transform_mode_selects_the_hit_scan() {
        let state = EditorState::TransformingScan {
            mode: TransformMode::Translate,
            selected: None,
        };
        let selected = transition(&state, EditorInput::PointerClick(Some(hit(Vec3::ZERO))), &EDITABLE);
        assert_eq!(selected.state.selected_scan(), Some(&"scan-a".to_string()));

        let cleared = transition(&selected.state, EditorInput::PointerClick(None), &EDITABLE);
        assert_eq!(cleared.state.selected_scan(), None);
    }

    #[test]
    fn losing_editability_leaves_transform_mode() {
        let state = EditorState::TransformingScan {
            mode: TransformMode::Translate,
            selected: Some("scan-a".into()),
        };
        assert_eq!(
            transition(&state, EditorInput::EditingEnded, &LOCKED).state,
            EditorState::Viewing
        );

        let picking = EditorState::PickingOrigin {
            resume: ResumeState::TransformingScan {
                mode: TransformMode::Scale,
                selected: None,
            },
        };
        assert_eq!(
            transition(&picking, EditorInput::EditingEnded, &LOCKED).state,
            EditorState::PickingOrigin {
                resume: ResumeState::Viewing
            }
        );
    }

    #[test]
    fn back_always_returns_to_viewing() {
        let states = [
            EditorState::AddingMarking {
                pending: Some(PendingPick {
                    point: Vec3::X,
                    normal: None,
                }),
            },
            EditorState::PickingOrigin {
                resume: ResumeState::AddingMarking,
            },
            EditorState::TransformingScan {
                mode: TransformMode::Rotate,
                selected: None,
            },
        ];
        for state in states {
            let step = transition(&state, EditorInput::Back, &EDITABLE);
            assert_eq!(step.state, EditorState::Viewing);
            assert!(step.effects.is_empty());
        }
    }

    #[test]
    fn cancel_steps_out_of_the_innermost_action() {
        let picking = EditorState::AddingMarking {
            pending: Some(PendingPick {
                point: Vec3::ZERO,
                normal: None,
            }),
        };
        assert_eq!(picking.cancel_input(), EditorInput::CancelPick);

        let origin = EditorState::PickingOrigin {
            resume: ResumeState::Viewing,
        };
        assert_eq!(origin.cancel_input(), EditorInput::CancelOriginPick);

        let adding = EditorState::AddingMarking { pending: None };
        assert_eq!(adding.cancel_input(), EditorInput::Back);
    }

    #[test]
    fn modes_round_trip_through_their_names() {
        for mode in [
            EditorMode::ViewOnly,
            EditorMode::AddMarking,
            EditorMode::Translate,
            EditorMode::Rotate,
            EditorMode::Scale,
            EditorMode::PickOrigin,
        ] {
            assert_eq!(EditorMode::from_string(mode.to_string()), Some(mode));
        }
        assert_eq!(EditorMode::from_string("sculpt"), None);
    }
}
