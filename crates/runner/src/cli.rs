//! Command-line interface.
//!
//! Every scenario-building subcommand turns into one batch of work
//! requests; `status` is a single query and does not track anything.

use std::time::Duration;

use clap::{Parser, Subcommand, ValueEnum};
use urbanflow_core::{InvestModel, JobId, WorkRequest};
use urbanflow_queue::QueueConfig;
use urbanflow_tracker::TrackerConfig;

/// Land-use raster used when `--lulc-source` is not given.
pub const DEFAULT_LULC_SOURCE: &str = "lulc_overlay_3857.tif";

#[derive(Debug, Parser)]
#[command(
    name = "urbanflow-runner",
    version,
    about = "Submit urban-planning jobs and track them to completion"
)]
pub struct Cli {
    /// Job queue base URL. Overrides `JOB_QUEUE_URL`.
    #[arg(long, global = true)]
    pub api_url: Option<String>,

    /// Milliseconds between status polls. Overrides `POLL_INTERVAL_MS`.
    #[arg(long, global = true)]
    pub poll_interval_ms: Option<u64>,

    /// Log output format. Overrides `LOG_FORMAT`.
    #[arg(long, global = true, value_enum)]
    pub log_format: Option<LogFormat>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run InVEST models against a scenario (all models by default).
    Invest {
        #[arg(long)]
        scenario: i64,
        /// Model to run; repeat for several.
        #[arg(long = "model")]
        models: Vec<InvestModel>,
        /// Study area geometry as WKT (EPSG:3857).
        #[arg(long)]
        study_area: String,
        #[arg(long, default_value = DEFAULT_LULC_SOURCE)]
        lulc_source: String,
    },
    /// Fill parcels with a single land-use class.
    Fill {
        #[arg(long)]
        scenario: i64,
        /// Parcel geometry as WKT (EPSG:3857); repeat for several.
        #[arg(long = "parcel", required = true)]
        parcels: Vec<String>,
        #[arg(long)]
        lulc_class: i32,
    },
    /// Wallpaper parcels with the land use under a pattern.
    Wallpaper {
        #[arg(long)]
        scenario: i64,
        #[arg(long = "parcel", required = true)]
        parcels: Vec<String>,
        /// Pattern bounding box as WKT (EPSG:3857).
        #[arg(long)]
        pattern_wkt: String,
        #[arg(long, default_value = DEFAULT_LULC_SOURCE)]
        lulc_source: String,
    },
    /// Crop the baseline land-use raster to parcels.
    Crop {
        #[arg(long)]
        scenario: i64,
        #[arg(long = "parcel", required = true)]
        parcels: Vec<String>,
    },
    /// Summarise land use under parcels for a session.
    Stats {
        #[arg(long)]
        session: String,
        #[arg(long = "parcel", required = true)]
        parcels: Vec<String>,
        #[arg(long, default_value = DEFAULT_LULC_SOURCE)]
        lulc_source: String,
    },
    /// Render the thumbnail for a stored pattern.
    Thumbnail {
        #[arg(long)]
        pattern: i64,
        #[arg(long)]
        pattern_wkt: String,
    },
    /// Query the status of one job.
    Status {
        #[arg(long)]
        job: JobId,
    },
}

impl Command {
    /// The batch this command submits, or `None` for `status`.
    pub fn requests(&self) -> Option<Vec<WorkRequest>> {
        let requests = match self {
            Command::Invest {
                scenario,
                models,
                study_area,
                lulc_source,
            } => {
                let models = if models.is_empty() {
                    &InvestModel::ALL[..]
                } else {
                    &models[..]
                };
                WorkRequest::invest_suite(*scenario, lulc_source, study_area, models)
            }
            Command::Fill {
                scenario,
                parcels,
                lulc_class,
            } => parcels
                .iter()
                .map(|wkt| WorkRequest::LulcFill {
                    scenario_id: *scenario,
                    target_parcel_wkt: wkt.clone(),
                    lulc_class: *lulc_class,
                })
                .collect(),
            Command::Wallpaper {
                scenario,
                parcels,
                pattern_wkt,
                lulc_source,
            } => parcels
                .iter()
                .map(|wkt| WorkRequest::Wallpaper {
                    scenario_id: *scenario,
                    target_parcel_wkt: wkt.clone(),
                    pattern_bbox_wkt: pattern_wkt.clone(),
                    lulc_source_url: lulc_source.clone(),
                })
                .collect(),
            Command::Crop { scenario, parcels } => parcels
                .iter()
                .map(|wkt| WorkRequest::LulcCrop {
                    scenario_id: *scenario,
                    target_parcel_wkt: wkt.clone(),
                })
                .collect(),
            Command::Stats {
                session,
                parcels,
                lulc_source,
            } => parcels
                .iter()
                .map(|wkt| WorkRequest::ParcelStats {
                    session_id: session.clone(),
                    target_parcel_wkt: wkt.clone(),
                    lulc_source_url: lulc_source.clone(),
                })
                .collect(),
            Command::Thumbnail {
                pattern,
                pattern_wkt,
            } => vec![WorkRequest::PatternThumbnail {
                pattern_id: *pattern,
                pattern_wkt: pattern_wkt.clone(),
            }],
            Command::Status { .. } => return None,
        };
        Some(requests)
    }
}

impl Cli {
    /// Apply command-line overrides on top of env-derived configuration.
    pub fn apply_overrides(&self, queue: &mut QueueConfig, tracker: &mut TrackerConfig) {
        if let Some(url) = &self.api_url {
            queue.api_url = url.trim().to_string();
        }
        if let Some(ms) = self.poll_interval_ms {
            tracker.poll_interval = Duration::from_millis(ms);
        }
    }
}
