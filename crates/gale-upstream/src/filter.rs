//! The filtered-download (subsetting) endpoint grammar.
//!
//! The endpoint is query-parameter driven: one `lev_<name>=on` flag per
//! pressure level, one `var_<NAME>=on` flag per variable, the upstream
//! filename in `file=`, and the run directory in `dir=` with `/`
//! percent-encoded. The parameter order and encoding are load-bearing —
//! the service is an external collaborator and the grammar is reproduced
//! exactly.

use gale_types::{ArtifactKind, ForecastOffset, RunId};

/// Pressure-level sets requested from the primary file.
const LEVELS_13: &[&str] = &[
    "50_mb", "100_mb", "150_mb", "200_mb", "250_mb", "300_mb", "400_mb", "500_mb", "600_mb",
    "700_mb", "850_mb", "925_mb", "1000_mb",
];

const LEVELS_37: &[&str] = &[
    "1_mb", "2_mb", "3_mb", "5_mb", "7_mb", "10_mb", "20_mb", "30_mb", "50_mb", "70_mb",
    "100_mb", "150_mb", "200_mb", "250_mb", "300_mb", "350_mb", "400_mb", "450_mb", "500_mb",
    "550_mb", "600_mb", "650_mb", "700_mb", "750_mb", "800_mb", "850_mb", "900_mb", "925_mb",
    "950_mb", "975_mb", "1000_mb",
];

/// Supplemental levels served only by the secondary (`pgrb2b`) file.
const LEVELS_B: &[&str] = &["125_mb", "175_mb", "225_mb", "775_mb", "825_mb", "875_mb"];

/// Upper-air variables present at every pressure level.
const VARS_PRESSURE: &[&str] = &["HGT", "TMP", "SPFH", "VVEL", "UGRD", "VGRD"];

/// Surface and near-surface selection.
const LEVELS_SURFACE: &[&str] = &[
    "surface",
    "2_m_above_ground",
    "10_m_above_ground",
    "mean_sea_level",
];
const VARS_SURFACE: &[&str] = &["HGT", "TMP", "PRMSL", "UGRD", "VGRD", "LAND", "APCP"];

/// Which pressure-level profile the deployment runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LevelProfile {
    L13,
    L37,
}

impl LevelProfile {
    /// Map the config's numeric `levels` value.
    pub fn from_levels(levels: u16) -> Option<Self> {
        match levels {
            13 => Some(Self::L13),
            37 => Some(Self::L37),
            _ => None,
        }
    }

    fn pressure_levels(self) -> &'static [&'static str] {
        match self {
            Self::L13 => LEVELS_13,
            Self::L37 => LEVELS_37,
        }
    }
}

/// Which upstream source file a request subsets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFile {
    /// `pgrb2.0p25` — primary levels and surface fields.
    Pgrb2,
    /// `pgrb2b.0p25` — supplemental pressure levels.
    Pgrb2b,
}

impl SourceFile {
    /// The upstream filename for a run and forecast step.
    pub fn upstream_name(self, run: &RunId, forecast: ForecastOffset) -> String {
        let stem = match self {
            Self::Pgrb2 => "pgrb2",
            Self::Pgrb2b => "pgrb2b",
        };
        format!("gdas.t{}z.{}.0p25.{}", run.hour_str(), stem, forecast.fcode())
    }
}

/// A fully specified filtered-download request.
#[derive(Debug, Clone)]
pub struct FilterRequest {
    endpoint: String,
    run: RunId,
    forecast: ForecastOffset,
    source: SourceFile,
    levels: &'static [&'static str],
    vars: &'static [&'static str],
}

impl FilterRequest {
    /// Primary pressure-level subset (local kind `pgrba`).
    pub fn pressure_a(
        endpoint: &str,
        run: RunId,
        forecast: ForecastOffset,
        profile: LevelProfile,
    ) -> Self {
        Self {
            endpoint: endpoint.to_string(),
            run,
            forecast,
            source: SourceFile::Pgrb2,
            levels: profile.pressure_levels(),
            vars: VARS_PRESSURE,
        }
    }

    /// Supplemental pressure-level subset (local kind `pgrbb`).
    pub fn pressure_b(endpoint: &str, run: RunId, forecast: ForecastOffset) -> Self {
        Self {
            endpoint: endpoint.to_string(),
            run,
            forecast,
            source: SourceFile::Pgrb2b,
            levels: LEVELS_B,
            vars: VARS_PRESSURE,
        }
    }

    /// Surface subset (local kind `sfc`).
    pub fn surface(endpoint: &str, run: RunId, forecast: ForecastOffset) -> Self {
        Self {
            endpoint: endpoint.to_string(),
            run,
            forecast,
            source: SourceFile::Pgrb2,
            levels: LEVELS_SURFACE,
            vars: VARS_SURFACE,
        }
    }

    /// The three requests that make up one group's required triple.
    pub fn triple(
        endpoint: &str,
        run: RunId,
        forecast: ForecastOffset,
        profile: LevelProfile,
    ) -> [(ArtifactKind, FilterRequest); 3] {
        [
            (
                ArtifactKind::PressureA,
                Self::pressure_a(endpoint, run, forecast, profile),
            ),
            (
                ArtifactKind::PressureB,
                Self::pressure_b(endpoint, run, forecast),
            ),
            (
                ArtifactKind::Surface,
                Self::surface(endpoint, run, forecast),
            ),
        ]
    }

    pub fn run(&self) -> &RunId {
        &self.run
    }

    pub fn forecast(&self) -> ForecastOffset {
        self.forecast
    }

    /// Render the request URL, reproducing the endpoint grammar exactly:
    /// `?file=<name>` then the `lev_` flags, then the `var_` flags, then
    /// the percent-encoded `dir`.
    pub fn url(&self) -> String {
        let mut url = format!(
            "{}?file={}",
            self.endpoint,
            self.source.upstream_name(&self.run, self.forecast)
        );
        for level in self.levels {
            url.push_str("&lev_");
            url.push_str(level);
            url.push_str("=on");
        }
        for var in self.vars {
            url.push_str("&var_");
            url.push_str(var);
            url.push_str("=on");
        }
        url.push_str(&format!(
            "&dir=%2Fgdas.{}%2F{}%2Fatmos",
            self.run.date_str(),
            self.run.hour_str()
        ));
        url
    }
}
