//! In-memory state of one posture check: four photo slots, their transforms,
//! and the analysis lifecycle.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::alignment::AlignmentScene;
use crate::analysis::{AnalysisRequest, Analyzer, ViewImages};
use crate::comparison::{Comparison, Scene, ViewSlot};
use crate::error::{AnalysisError, SessionError};
use crate::landmarks::{AnalysisResult, ViewType};
use crate::transform::{PhotoTransform, TransformStore};

/// A displayed photo: its source URL and the transform it is shown with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Photo {
    pub url: String,
    #[serde(default)]
    pub transform: PhotoTransform,
}

impl Photo {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            transform: PhotoTransform::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Before,
    After,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Before => "before",
            Phase::After => "after",
        }
    }

    pub fn other(&self) -> Phase {
        match self {
            Phase::Before => Phase::After,
            Phase::After => Phase::Before,
        }
    }
}

/// Where the session is in its lifecycle.
#[derive(Debug, Clone, PartialEq)]
pub enum Stage {
    Editing,
    Analyzing,
    Results(Comparison),
    Failed(AnalysisError),
}

#[derive(Debug, Clone)]
struct PhotoSlot {
    url: String,
    store: TransformStore,
}

#[derive(Debug, Clone)]
pub struct Session {
    view_types: HashMap<ViewSlot, ViewType>,
    photos: HashMap<(ViewSlot, Phase), PhotoSlot>,
    stage: Stage,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Self {
            view_types: HashMap::from([
                (ViewSlot::A, ViewType::Front),
                (ViewSlot::B, ViewType::Side),
            ]),
            photos: HashMap::new(),
            stage: Stage::Editing,
        }
    }

    pub fn stage(&self) -> &Stage {
        &self.stage
    }

    pub fn is_pending(&self) -> bool {
        matches!(self.stage, Stage::Analyzing)
    }

    pub fn view_type(&self, slot: ViewSlot) -> ViewType {
        self.view_types.get(&slot).copied().unwrap_or(ViewType::Front)
    }

    pub fn set_view_type(&mut self, slot: ViewSlot, view_type: ViewType) {
        self.view_types.insert(slot, view_type);
    }

    /// Place a photo in a slot. A replaced photo starts from the identity
    /// transform.
    pub fn set_photo(&mut self, slot: ViewSlot, phase: Phase, url: impl Into<String>) {
        let url = url.into();
        log::debug!("{} {:?} photo set ({} bytes)", phase.as_str(), slot, url.len());
        self.photos.insert(
            (slot, phase),
            PhotoSlot {
                url,
                store: TransformStore::new(),
            },
        );
    }

    pub fn clear_photo(&mut self, slot: ViewSlot, phase: Phase) {
        self.photos.remove(&(slot, phase));
    }

    pub fn photo(&self, slot: ViewSlot, phase: Phase) -> Option<Photo> {
        self.photos.get(&(slot, phase)).map(|p| Photo {
            url: p.url.clone(),
            transform: p.store.current(),
        })
    }

    /// Gesture state of a photo, for drag, zoom and flip.
    pub fn transform_mut(&mut self, slot: ViewSlot, phase: Phase) -> Option<&mut TransformStore> {
        self.photos.get_mut(&(slot, phase)).map(|p| &mut p.store)
    }

    fn view_images(&self, slot: ViewSlot) -> Result<Option<ViewImages>, SessionError> {
        let before = self.photos.get(&(slot, Phase::Before));
        let after = self.photos.get(&(slot, Phase::After));
        match (before, after) {
            (Some(before), Some(after)) => {
                ViewImages::from_urls(self.view_type(slot), &before.url, &after.url)
                    .map(Some)
                    .map_err(|e| SessionError::InvalidPhoto(e.to_string()))
            }
            _ => Ok(None),
        }
    }

    /// The request for the current photos. View A needs both photos; view B
    /// is included only when both of its photos are present.
    pub fn analysis_request(&self) -> Result<AnalysisRequest, SessionError> {
        for phase in [Phase::Before, Phase::After] {
            if !self.photos.contains_key(&(ViewSlot::A, phase)) {
                return Err(SessionError::MissingPhoto(format!("{} (view A)", phase.as_str())));
            }
        }
        let view_a = self
            .view_images(ViewSlot::A)?
            .ok_or(SessionError::MissingPhoto("view A".into()))?;
        let view_b = self.view_images(ViewSlot::B)?;
        Ok(AnalysisRequest { view_a, view_b })
    }

    /// Mark an analysis as in flight and return its request. Only an
    /// editing session can start one; results and failures need a
    /// [`reset`](Self::reset) first.
    pub fn begin_analysis(&mut self) -> Result<AnalysisRequest, SessionError> {
        match self.stage {
            Stage::Editing => {}
            Stage::Analyzing => return Err(SessionError::AnalysisPending),
            Stage::Results(_) | Stage::Failed(_) => return Err(SessionError::AnalysisFinished),
        }
        let request = self.analysis_request()?;
        self.stage = Stage::Analyzing;
        Ok(request)
    }

    /// Complete the in-flight analysis with its outcome.
    pub fn finish_analysis(
        &mut self,
        outcome: Result<AnalysisResult, AnalysisError>,
    ) -> Result<&Stage, SessionError> {
        if !self.is_pending() {
            return Err(SessionError::NotPending);
        }
        self.stage = match outcome {
            Ok(result) => Stage::Results(Comparison::new(result)),
            Err(e) => {
                log::warn!("analysis failed: {e}");
                Stage::Failed(e)
            }
        };
        Ok(&self.stage)
    }

    /// Run a full analysis synchronously.
    pub fn analyze(&mut self, analyzer: &Analyzer) -> Result<&Stage, SessionError> {
        let request = self.begin_analysis()?;
        let outcome = analyzer.analyze_request(&request);
        self.finish_analysis(outcome)
    }

    pub fn comparison(&self) -> Option<&Comparison> {
        match &self.stage {
            Stage::Results(comparison) => Some(comparison),
            _ => None,
        }
    }

    pub fn comparison_mut(&mut self) -> Option<&mut Comparison> {
        match &mut self.stage {
            Stage::Results(comparison) => Some(comparison),
            _ => None,
        }
    }

    /// The comparison scene of the active view with its session photos.
    pub fn scene(&self) -> Result<Scene, SessionError> {
        let comparison = self.comparison().ok_or(SessionError::NoResult)?;
        let slot = comparison.active_slot();
        let before = self.photo(slot, Phase::Before);
        let after = self.photo(slot, Phase::After);
        Ok(comparison.scene(before.as_ref(), after.as_ref())?)
    }

    /// The alignment frame for one photo, with the other phase of the same
    /// view as its ghost reference.
    pub fn alignment_scene(
        &self,
        slot: ViewSlot,
        phase: Phase,
    ) -> Result<AlignmentScene, SessionError> {
        let slot_state = self.photos.get(&(slot, phase)).ok_or_else(|| {
            SessionError::MissingPhoto(format!("{} (view {slot:?})", phase.as_str()))
        })?;
        let target = Photo {
            url: slot_state.url.clone(),
            transform: slot_state.store.current(),
        };
        let ghost = self.photo(slot, phase.other());
        Ok(AlignmentScene::new(target, ghost).dragging(slot_state.store.is_dragging()))
    }

    /// Drop every photo, transform and result.
    pub fn reset(&mut self) {
        *self = Self::new();
    }
}
