//! Validated analysis data: landmark sets, score items, and the aggregate
//! result of one analysis call.

use serde::{Deserialize, Serialize};

/// Upper bound of the normalized landmark coordinate space.
pub const LANDMARK_SPACE: f64 = 1000.0;

/// Number of points in a spine path.
pub const SPINE_POINTS: usize = 5;

/// A point in the 0–1000 normalized landmark space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// The named anatomical points of a [`LandmarkSet`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Landmark {
    Head,
    Ear,
    Shoulder,
    Hip,
    Knee,
    Ankle,
    Heel,
}

impl Landmark {
    pub const ALL: [Landmark; 7] = [
        Landmark::Head,
        Landmark::Ear,
        Landmark::Shoulder,
        Landmark::Hip,
        Landmark::Knee,
        Landmark::Ankle,
        Landmark::Heel,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Landmark::Head => "head",
            Landmark::Ear => "ear",
            Landmark::Shoulder => "shoulder",
            Landmark::Hip => "hip",
            Landmark::Knee => "knee",
            Landmark::Ankle => "ankle",
            Landmark::Heel => "heel",
        }
    }
}

impl std::fmt::Display for Landmark {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Landmarks as they arrive from the collaborator, any of which may be absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PartialLandmarks {
    pub head: Option<Point>,
    pub ear: Option<Point>,
    pub shoulder: Option<Point>,
    pub spine_path: Option<Vec<Point>>,
    pub hip: Option<Point>,
    pub knee: Option<Point>,
    pub ankle: Option<Point>,
    pub heel: Option<Point>,
}

/// A complete landmark set. Partial sets never exist as values of this type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "PartialLandmarks")]
pub struct LandmarkSet {
    pub head: Point,
    pub ear: Point,
    pub shoulder: Point,
    pub spine_path: [Point; SPINE_POINTS],
    pub hip: Point,
    pub knee: Point,
    pub ankle: Point,
    pub heel: Point,
}

impl LandmarkSet {
    /// Validate a partial set; `None` unless every field is present and the
    /// spine has exactly five points.
    pub fn from_partial(partial: &PartialLandmarks) -> Option<LandmarkSet> {
        LandmarkSet::try_from(partial.clone()).ok()
    }

    pub fn get(&self, landmark: Landmark) -> Point {
        match landmark {
            Landmark::Head => self.head,
            Landmark::Ear => self.ear,
            Landmark::Shoulder => self.shoulder,
            Landmark::Hip => self.hip,
            Landmark::Knee => self.knee,
            Landmark::Ankle => self.ankle,
            Landmark::Heel => self.heel,
        }
    }

    /// Named points in declaration order, spine excluded.
    pub fn named_points(&self) -> impl Iterator<Item = (Landmark, Point)> + '_ {
        Landmark::ALL.into_iter().map(|l| (l, self.get(l)))
    }
}

impl TryFrom<PartialLandmarks> for LandmarkSet {
    type Error = String;

    fn try_from(p: PartialLandmarks) -> Result<Self, Self::Error> {
        let missing = |name: &str| format!("landmark `{name}` is missing");
        let spine = p.spine_path.ok_or_else(|| missing("spinePath"))?;
        let spine_len = spine.len();
        let spine_path: [Point; SPINE_POINTS] = spine.try_into().map_err(|_| {
            format!("spinePath must have exactly {SPINE_POINTS} points, got {spine_len}")
        })?;

        Ok(LandmarkSet {
            head: p.head.ok_or_else(|| missing("head"))?,
            ear: p.ear.ok_or_else(|| missing("ear"))?,
            shoulder: p.shoulder.ok_or_else(|| missing("shoulder"))?,
            spine_path,
            hip: p.hip.ok_or_else(|| missing("hip"))?,
            knee: p.knee.ok_or_else(|| missing("knee"))?,
            ankle: p.ankle.ok_or_else(|| missing("ankle"))?,
            heel: p.heel.ok_or_else(|| missing("heel"))?,
        })
    }
}

/// Anatomical vantage point of a photo pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewType {
    Front,
    Side,
}

impl ViewType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ViewType::Front => "front",
            ViewType::Side => "side",
        }
    }
}

impl std::fmt::Display for ViewType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ViewType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "front" => Ok(ViewType::Front),
            "side" => Ok(ViewType::Side),
            _ => Err(format!("unknown view type: {s}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScoreStatus {
    Improved,
    Same,
    NeedsAttention,
}

/// The five fixed score categories agreed with the collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScoreCategory {
    StraightNeck,
    RolledShoulder,
    Kyphosis,
    Swayback,
    OLegs,
}

impl ScoreCategory {
    pub const ALL: [ScoreCategory; 5] = [
        ScoreCategory::StraightNeck,
        ScoreCategory::RolledShoulder,
        ScoreCategory::Kyphosis,
        ScoreCategory::Swayback,
        ScoreCategory::OLegs,
    ];

    /// Key of the category in the response JSON.
    pub fn key(&self) -> &'static str {
        match self {
            ScoreCategory::StraightNeck => "straightNeck",
            ScoreCategory::RolledShoulder => "rolledShoulder",
            ScoreCategory::Kyphosis => "kyphosis",
            ScoreCategory::Swayback => "swayback",
            ScoreCategory::OLegs => "oLegs",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreItem {
    pub label: String,
    pub before_score: u8,
    pub after_score: u8,
    pub description: String,
    pub status: ScoreStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetailedScores {
    pub straight_neck: ScoreItem,
    pub rolled_shoulder: ScoreItem,
    pub kyphosis: ScoreItem,
    pub swayback: ScoreItem,
    pub o_legs: ScoreItem,
}

impl DetailedScores {
    pub fn get(&self, category: ScoreCategory) -> &ScoreItem {
        match category {
            ScoreCategory::StraightNeck => &self.straight_neck,
            ScoreCategory::RolledShoulder => &self.rolled_shoulder,
            ScoreCategory::Kyphosis => &self.kyphosis,
            ScoreCategory::Swayback => &self.swayback,
            ScoreCategory::OLegs => &self.o_legs,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (ScoreCategory, &ScoreItem)> + '_ {
        ScoreCategory::ALL.into_iter().map(|c| (c, self.get(c)))
    }
}

/// Before/after landmarks for one view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewAnalysis {
    #[serde(rename = "type")]
    pub view_type: ViewType,
    pub before_landmarks: LandmarkSet,
    pub after_landmarks: LandmarkSet,
}

/// Outcome of one analysis call. Built atomically; never partially populated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub view_a: ViewAnalysis,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub view_b: Option<ViewAnalysis>,
    pub overall_before_score: u8,
    pub overall_after_score: u8,
    pub detailed_scores: DetailedScores,
    pub summary: String,
}

impl AnalysisResult {
    pub fn improvement(&self) -> i16 {
        self.overall_after_score as i16 - self.overall_before_score as i16
    }
}
