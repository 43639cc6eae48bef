//! Typed work requests accepted by the job queue.
//!
//! Each variant corresponds to one job type the backend worker knows how
//! to execute. Geometry is carried as opaque WKT (EPSG:3857) and never
//! interpreted here.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Wire job type for an InVEST model run.
pub const JOB_TYPE_INVEST: &str = "invest";
/// Wire job type for filling a parcel with a single land-use class.
pub const JOB_TYPE_LULC_FILL: &str = "lulc_fill";
/// Wire job type for wallpapering a parcel with a pattern.
pub const JOB_TYPE_WALLPAPER: &str = "wallpaper";
/// Wire job type for cropping the baseline land-use raster to a parcel.
pub const JOB_TYPE_LULC_CROP: &str = "lulc_crop";
/// Wire job type for land-use statistics under a parcel.
pub const JOB_TYPE_PARCEL_STATS: &str = "stats_under_parcel";
/// Wire job type for rendering a pattern's thumbnail.
pub const JOB_TYPE_PATTERN_THUMBNAIL: &str = "pattern_thumbnail";

/// InVEST models the backend worker can run against a scenario.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InvestModel {
    #[serde(rename = "carbon")]
    Carbon,
    #[serde(rename = "urban_cooling_model")]
    UrbanCooling,
    #[serde(rename = "urban_nature_access")]
    UrbanNatureAccess,
}

impl InvestModel {
    pub const ALL: [InvestModel; 3] = [
        InvestModel::Carbon,
        InvestModel::UrbanCooling,
        InvestModel::UrbanNatureAccess,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            InvestModel::Carbon => "carbon",
            InvestModel::UrbanCooling => "urban_cooling_model",
            InvestModel::UrbanNatureAccess => "urban_nature_access",
        }
    }
}

impl fmt::Display for InvestModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InvestModel {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "carbon" => Ok(InvestModel::Carbon),
            "urban_cooling_model" | "urban_cooling" => Ok(InvestModel::UrbanCooling),
            "urban_nature_access" => Ok(InvestModel::UrbanNatureAccess),
            other => Err(CoreError::UnknownVariant {
                kind: "InVEST model",
                value: other.to_string(),
            }),
        }
    }
}

/// One unit of work to submit to the job queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "job_type", rename_all = "snake_case")]
pub enum WorkRequest {
    /// Run an InVEST model for a scenario.
    Invest {
        scenario_id: i64,
        model: InvestModel,
        /// Land-use raster the model runs on.
        lulc_source_url: String,
        study_area_wkt: String,
    },
    /// Fill a parcel with one land-use class.
    LulcFill {
        scenario_id: i64,
        target_parcel_wkt: String,
        lulc_class: i32,
    },
    /// Wallpaper a parcel with the land use found under a pattern.
    Wallpaper {
        scenario_id: i64,
        target_parcel_wkt: String,
        /// Bounding box of the pattern to tile.
        pattern_bbox_wkt: String,
        /// Raster the pattern is sampled from.
        lulc_source_url: String,
    },
    /// Crop the baseline land-use raster to a parcel.
    LulcCrop {
        scenario_id: i64,
        target_parcel_wkt: String,
    },
    /// Summarise land-use classes under a parcel.
    #[serde(rename = "stats_under_parcel")]
    ParcelStats {
        session_id: String,
        target_parcel_wkt: String,
        lulc_source_url: String,
    },
    /// Render the thumbnail for a stored pattern.
    PatternThumbnail {
        pattern_id: i64,
        pattern_wkt: String,
    },
}

impl WorkRequest {
    /// The job type string the queue and worker dispatch on.
    pub fn job_type(&self) -> &'static str {
        match self {
            WorkRequest::Invest { .. } => JOB_TYPE_INVEST,
            WorkRequest::LulcFill { .. } => JOB_TYPE_LULC_FILL,
            WorkRequest::Wallpaper { .. } => JOB_TYPE_WALLPAPER,
            WorkRequest::LulcCrop { .. } => JOB_TYPE_LULC_CROP,
            WorkRequest::ParcelStats { .. } => JOB_TYPE_PARCEL_STATS,
            WorkRequest::PatternThumbnail { .. } => JOB_TYPE_PATTERN_THUMBNAIL,
        }
    }

    /// Short human-readable name, used as the job's `name` column and in
    /// logs and submission failures.
    pub fn label(&self) -> String {
        match self {
            WorkRequest::Invest {
                scenario_id, model, ..
            } => format!("{model} for scenario {scenario_id}"),
            WorkRequest::LulcFill {
                scenario_id,
                lulc_class,
                ..
            } => format!("fill scenario {scenario_id} with class {lulc_class}"),
            WorkRequest::Wallpaper { scenario_id, .. } => {
                format!("wallpaper scenario {scenario_id}")
            }
            WorkRequest::LulcCrop { scenario_id, .. } => {
                format!("crop baseline for scenario {scenario_id}")
            }
            WorkRequest::ParcelStats { session_id, .. } => {
                format!("parcel stats for session {session_id}")
            }
            WorkRequest::PatternThumbnail { pattern_id, .. } => {
                format!("thumbnail for pattern {pattern_id}")
            }
        }
    }

    /// Job-type specific arguments.
    ///
    /// Every key the worker reads from `job_args` for this job type is
    /// present under the name the worker uses. Scenario, session and
    /// pattern ids ride along so the queue can attach results to them.
    pub fn job_args(&self) -> serde_json::Value {
        match self {
            WorkRequest::Invest {
                scenario_id,
                model,
                lulc_source_url,
                study_area_wkt,
            } => serde_json::json!({
                "scenario_id": scenario_id,
                "invest_model": model.as_str(),
                "lulc_source_url": lulc_source_url,
                "study_area_wkt": study_area_wkt,
            }),
            WorkRequest::LulcFill {
                scenario_id,
                target_parcel_wkt,
                lulc_class,
            } => serde_json::json!({
                "scenario_id": scenario_id,
                "target_parcel_wkt": target_parcel_wkt,
                "lulc_class": lulc_class,
            }),
            WorkRequest::Wallpaper {
                scenario_id,
                target_parcel_wkt,
                pattern_bbox_wkt,
                lulc_source_url,
            } => serde_json::json!({
                "scenario_id": scenario_id,
                "target_parcel_wkt": target_parcel_wkt,
                "pattern_bbox_wkt": pattern_bbox_wkt,
                "lulc_source_url": lulc_source_url,
            }),
            WorkRequest::LulcCrop {
                scenario_id,
                target_parcel_wkt,
            } => serde_json::json!({
                "scenario_id": scenario_id,
                "target_parcel_wkt": target_parcel_wkt,
            }),
            WorkRequest::ParcelStats {
                session_id,
                target_parcel_wkt,
                lulc_source_url,
            } => serde_json::json!({
                "session_id": session_id,
                "target_parcel_wkt": target_parcel_wkt,
                "lulc_source_url": lulc_source_url,
            }),
            WorkRequest::PatternThumbnail {
                pattern_id,
                pattern_wkt,
            } => serde_json::json!({
                "pattern_id": pattern_id,
                "pattern_wkt": pattern_wkt,
            }),
        }
    }

    /// Reject requests the worker would fail on immediately.
    pub fn validate(&self) -> Result<(), CoreError> {
        let required: Vec<(&'static str, &str)> = match self {
            WorkRequest::Invest {
                lulc_source_url,
                study_area_wkt,
                ..
            } => vec![
                ("lulc_source_url", lulc_source_url.as_str()),
                ("study_area_wkt", study_area_wkt.as_str()),
            ],
            WorkRequest::LulcFill {
                target_parcel_wkt, ..
            }
            | WorkRequest::LulcCrop {
                target_parcel_wkt, ..
            } => vec![("target_parcel_wkt", target_parcel_wkt.as_str())],
            WorkRequest::Wallpaper {
                target_parcel_wkt,
                pattern_bbox_wkt,
                lulc_source_url,
                ..
            } => vec![
                ("target_parcel_wkt", target_parcel_wkt.as_str()),
                ("pattern_bbox_wkt", pattern_bbox_wkt.as_str()),
                ("lulc_source_url", lulc_source_url.as_str()),
            ],
            WorkRequest::ParcelStats {
                session_id,
                target_parcel_wkt,
                lulc_source_url,
            } => vec![
                ("session_id", session_id.as_str()),
                ("target_parcel_wkt", target_parcel_wkt.as_str()),
                ("lulc_source_url", lulc_source_url.as_str()),
            ],
            WorkRequest::PatternThumbnail { pattern_wkt, .. } => {
                vec![("pattern_wkt", pattern_wkt.as_str())]
            }
        };

        match required.iter().find(|(_, value)| value.trim().is_empty()) {
            Some((field, _)) => Err(CoreError::Validation(format!(
                "{} requires a non-empty {field}",
                self.job_type()
            ))),
            None => Ok(()),
        }
    }

    /// One InVEST request per model for the given scenario.
    pub fn invest_suite(
        scenario_id: i64,
        lulc_source_url: &str,
        study_area_wkt: &str,
        models: &[InvestModel],
    ) -> Vec<WorkRequest> {
        models
            .iter()
            .map(|&model| WorkRequest::Invest {
                scenario_id,
                model,
                lulc_source_url: lulc_source_url.to_string(),
                study_area_wkt: study_area_wkt.to_string(),
            })
            .collect()
    }
}
