//! Artifact identity and the path classifier.
//!
//! The classifier is a single pure function over a fixed filename grammar.
//! It is invoked once per filesystem arrival event and again during the
//! startup rescan, so it must produce identical answers for identical
//! paths — no hidden state, no filesystem access.
//!
//! Two families of names are recognized:
//!
//! - local arrival names, `YYYYMMDD_HH_FFF_<token>.<ext>`, where the token
//!   selects the kind (`pgrba`, `pgrbb`, `sfc`, `merged`)
//! - raw upstream names, `gdas.tHHz.pgrb2[b].0p25.fFFF`, with the date
//!   carried by an enclosing `gdas.YYYYMMDD` (or bare `YYYYMMDD`)
//!   directory component

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::run::RunId;

/// The category of an artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    /// Subset pressure-level file, primary level set.
    PressureA,
    /// Subset pressure-level file, supplemental level set.
    PressureB,
    /// Subset surface file.
    Surface,
    /// Output of the merge transform over a complete raw triple.
    Merged,
    /// Un-subset upstream file.
    Raw,
}

impl ArtifactKind {
    /// The filename token for local arrival names, if this kind has one.
    pub fn token(&self) -> Option<&'static str> {
        match self {
            ArtifactKind::PressureA => Some("pgrba"),
            ArtifactKind::PressureB => Some("pgrbb"),
            ArtifactKind::Surface => Some("sfc"),
            ArtifactKind::Merged => Some("merged"),
            ArtifactKind::Raw => None,
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ArtifactKind::PressureA => "pressure_a",
            ArtifactKind::PressureB => "pressure_b",
            ArtifactKind::Surface => "surface",
            ArtifactKind::Merged => "merged",
            ArtifactKind::Raw => "raw",
        };
        f.write_str(s)
    }
}

/// The input was not a 3-digit forecast code.
#[derive(Debug, thiserror::Error)]
#[error("malformed forecast offset '{0}': expected FFF or fFFF")]
pub struct ForecastOffsetError(String);

/// A forecast projection offset, displayed as a 3-digit code (`000`–`999`).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct ForecastOffset(u16);

impl ForecastOffset {
    /// Wrap an offset; values must fit the 3-digit code space.
    pub fn new(hours: u16) -> Option<Self> {
        (hours < 1000).then_some(Self(hours))
    }

    pub fn hours(&self) -> u16 {
        self.0
    }

    /// The `fFFF` form used in upstream filenames.
    pub fn fcode(&self) -> String {
        format!("f{:03}", self.0)
    }
}

impl fmt::Display for ForecastOffset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:03}", self.0)
    }
}

impl FromStr for ForecastOffset {
    type Err = ForecastOffsetError;

    /// Parse a bare 3-digit code; a leading `f` is accepted.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s.strip_prefix('f').unwrap_or(s);
        if digits.len() != 3 || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ForecastOffsetError(s.to_string()));
        }
        digits
            .parse::<u16>()
            .map(Self)
            .map_err(|_| ForecastOffsetError(s.to_string()))
    }
}

/// A classified artifact: which run, which forecast step, which kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ArtifactDescriptor {
    pub run: RunId,
    pub forecast: ForecastOffset,
    pub kind: ArtifactKind,
}

impl ArtifactDescriptor {
    /// The grouping key this artifact belongs to.
    pub fn group_key(&self) -> GroupKey {
        GroupKey {
            run: self.run,
            forecast: self.forecast,
        }
    }
}

/// Classify a path into an artifact descriptor.
///
/// Returns `None` for anything outside the fixed grammar; callers log and
/// skip, they never abort on unrecognized names.
pub fn classify(path: &Path) -> Option<ArtifactDescriptor> {
    let name = path.file_name()?.to_str()?;
    classify_arrival(name).or_else(|| classify_upstream(path, name))
}

/// Local arrival grammar: `YYYYMMDD_HH_FFF_<token>.<ext>`.
fn classify_arrival(name: &str) -> Option<ArtifactDescriptor> {
    let (stem, kind) = if let Some(s) = name.strip_suffix("_pgrba.grib2") {
        (s, ArtifactKind::PressureA)
    } else if let Some(s) = name.strip_suffix("_pgrbb.grib2") {
        (s, ArtifactKind::PressureB)
    } else if let Some(s) = name.strip_suffix("_sfc.grib2") {
        (s, ArtifactKind::Surface)
    } else if let Some(s) = name.strip_suffix("_merged.nc") {
        (s, ArtifactKind::Merged)
    } else {
        return None;
    };

    let mut parts = stem.splitn(3, '_');
    let date = parts.next()?;
    let hour = parts.next()?;
    let forecast = parts.next()?;
    if date.len() != 8 || hour.len() != 2 {
        return None;
    }

    let run = RunId::from_parts(date, hour).ok()?;
    let forecast: ForecastOffset = forecast.parse().ok()?;
    Some(ArtifactDescriptor {
        run,
        forecast,
        kind,
    })
}

/// Raw upstream grammar: `gdas.tHHz.pgrb2[b].0p25.fFFF`, date from an
/// enclosing `gdas.YYYYMMDD` or bare `YYYYMMDD` directory component.
fn classify_upstream(path: &Path, name: &str) -> Option<ArtifactDescriptor> {
    let rest = name.strip_prefix("gdas.t")?;
    let (hour, rest) = rest.split_at_checked(2)?;
    let rest = rest.strip_prefix("z.")?;
    let fcode = rest
        .strip_prefix("pgrb2.0p25.")
        .or_else(|| rest.strip_prefix("pgrb2b.0p25."))?;
    let forecast: ForecastOffset = fcode.parse().ok()?;

    let date = path.ancestors().skip(1).find_map(|dir| {
        let component = dir.file_name()?.to_str()?;
        let digits = component.strip_prefix("gdas.").unwrap_or(component);
        (digits.len() == 8 && digits.bytes().all(|b| b.is_ascii_digit())).then(|| digits.to_string())
    })?;

    let run = RunId::from_parts(&date, hour).ok()?;
    Some(ArtifactDescriptor {
        run,
        forecast,
        kind: ArtifactKind::Raw,
    })
}

/// Grouping key: one run at one forecast step.
///
/// Displays as `YYYYMMDD_HH_FFF`, the stem shared by every local artifact
/// in the group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GroupKey {
    pub run: RunId,
    pub forecast: ForecastOffset,
}

impl GroupKey {
    pub fn new(run: RunId, forecast: ForecastOffset) -> Self {
        Self { run, forecast }
    }

    /// Local filename for one of this group's token-bearing kinds.
    pub fn artifact_name(&self, kind: ArtifactKind) -> Option<String> {
        let ext = match kind {
            ArtifactKind::Merged => "nc",
            ArtifactKind::Raw => return None,
            _ => "grib2",
        };
        Some(format!("{}_{}.{}", self, kind.token()?, ext))
    }

    /// Filename of the merge transform's output for this group.
    pub fn merged_name(&self) -> String {
        format!("{self}_merged.nc")
    }

    /// Filename of the pair converter's output, keyed by the earlier member.
    pub fn pair_output_name(&self) -> String {
        format!("{self}_output.zarr")
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}_{}_{}",
            self.run.date_str(),
            self.run.hour_str(),
            self.forecast
        )
    }
}

/// Canonical identity of a processed pair: two groups on the same date,
/// six hours apart, sharing a forecast offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PairKey {
    pub date: NaiveDate,
    pub earlier_hour: u8,
    pub later_hour: u8,
    pub forecast: ForecastOffset,
}

impl PairKey {
    /// Build the canonical pair key for two groups, or `None` when they do
    /// not pair.
    ///
    /// Pairing requires an equal calendar date, so a six-hour gap that
    /// crosses midnight does not pair. See DESIGN.md.
    pub fn of(a: &GroupKey, b: &GroupKey) -> Option<Self> {
        if a.run.date() != b.run.date() || a.forecast != b.forecast {
            return None;
        }
        let delta = (i32::from(a.run.hour()) - i32::from(b.run.hour())).abs() % 24;
        if delta != 6 {
            return None;
        }
        Some(Self {
            date: a.run.date(),
            earlier_hour: a.run.hour().min(b.run.hour()),
            later_hour: a.run.hour().max(b.run.hour()),
            forecast: a.forecast,
        })
    }

    /// The two group keys this pair was formed from, earlier first.
    pub fn members(&self) -> (GroupKey, GroupKey) {
        let earlier = GroupKey::new(
            RunId::new(self.date, self.earlier_hour).expect("hour validated at construction"),
            self.forecast,
        );
        let later = GroupKey::new(
            RunId::new(self.date, self.later_hour).expect("hour validated at construction"),
            self.forecast,
        );
        (earlier, later)
    }
}

impl fmt::Display for PairKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}_{:02}-{:02}_{}",
            self.date.format("%Y%m%d"),
            self.earlier_hour,
            self.later_hour,
            self.forecast
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn key(s: &str) -> GroupKey {
        let mut parts = s.splitn(3, '_');
        let run = RunId::from_parts(parts.next().unwrap(), parts.next().unwrap()).unwrap();
        GroupKey::new(run, parts.next().unwrap().parse().unwrap())
    }

    #[test]
    fn classifies_all_three_raw_shapes() {
        let a = classify(Path::new("/data/in/20250101_06_003_pgrba.grib2")).unwrap();
        assert_eq!(a.kind, ArtifactKind::PressureA);
        assert_eq!(a.run.to_string(), "2025010106");
        assert_eq!(a.forecast.hours(), 3);

        let b = classify(Path::new("20250101_06_003_pgrbb.grib2")).unwrap();
        assert_eq!(b.kind, ArtifactKind::PressureB);

        let s = classify(Path::new("20250101_06_003_sfc.grib2")).unwrap();
        assert_eq!(s.kind, ArtifactKind::Surface);

        assert_eq!(a.group_key(), b.group_key());
        assert_eq!(a.group_key(), s.group_key());
    }

    #[test]
    fn classifies_merged_shape() {
        let m = classify(Path::new("/data/merged/20250101_12_000_merged.nc")).unwrap();
        assert_eq!(m.kind, ArtifactKind::Merged);
        assert_eq!(m.run.hour(), 12);
    }

    #[test]
    fn classifies_upstream_shape_with_date_directory() {
        let d = classify(Path::new(
            "/mirror/gdas.20250101/06/atmos/gdas.t06z.pgrb2.0p25.f011",
        ))
        .unwrap();
        assert_eq!(d.kind, ArtifactKind::Raw);
        assert_eq!(d.run.to_string(), "2025010106");
        assert_eq!(d.forecast.hours(), 11);

        let b = classify(Path::new(
            "/mirror/gdas.20250101/06/atmos/gdas.t06z.pgrb2b.0p25.f000",
        ))
        .unwrap();
        assert_eq!(b.kind, ArtifactKind::Raw);
    }

    #[test]
    fn rejects_unrecognized_names() {
        for name in [
            "readme.txt",
            "20250101_06_003_pgrbc.grib2",
            "2025010_06_003_pgrba.grib2",
            "20250101_6_003_pgrba.grib2",
            "20250101_06_03_pgrba.grib2",
            "20250101_25_003_pgrba.grib2",
            "gdas.t06z.pgrb2.0p25.f000",
        ] {
            assert!(classify(&PathBuf::from(name)).is_none(), "{name}");
        }
    }

    #[test]
    fn classification_is_stable_across_calls() {
        let p = Path::new("/in/20250101_00_005_sfc.grib2");
        assert_eq!(classify(p), classify(p));
    }

    #[test]
    fn group_key_builds_member_filenames() {
        let k = key("20250101_06_003");
        assert_eq!(
            k.artifact_name(ArtifactKind::PressureA).unwrap(),
            "20250101_06_003_pgrba.grib2"
        );
        assert_eq!(k.merged_name(), "20250101_06_003_merged.nc");
        assert_eq!(k.pair_output_name(), "20250101_06_003_output.zarr");
        assert!(k.artifact_name(ArtifactKind::Raw).is_none());
    }

    #[test]
    fn pair_key_is_canonical_regardless_of_order() {
        let a = key("20250101_06_000");
        let b = key("20250101_00_000");
        let ab = PairKey::of(&a, &b).unwrap();
        let ba = PairKey::of(&b, &a).unwrap();
        assert_eq!(ab, ba);
        assert_eq!(ab.earlier_hour, 0);
        assert_eq!(ab.later_hour, 6);
        assert_eq!(ab.to_string(), "20250101_00-06_000");
    }

    #[test]
    fn no_pair_when_gap_is_not_six_hours() {
        let a = key("20250101_00_000");
        assert!(PairKey::of(&a, &key("20250101_12_000")).is_none());
        assert!(PairKey::of(&a, &key("20250101_18_000")).is_none());
        assert!(PairKey::of(&a, &key("20250101_00_000")).is_none());
    }

    #[test]
    fn no_pair_across_forecast_offsets() {
        assert!(PairKey::of(&key("20250101_00_000"), &key("20250101_06_003")).is_none());
    }

    // The equal-date requirement drops a six-hour gap spanning midnight.
    #[test]
    fn no_pair_across_a_date_boundary() {
        assert!(PairKey::of(&key("20250101_18_000"), &key("20250102_00_000")).is_none());
    }

    #[test]
    fn pair_members_round_trip() {
        let pk = PairKey::of(&key("20250101_12_004"), &key("20250101_06_004")).unwrap();
        let (earlier, later) = pk.members();
        assert_eq!(earlier.to_string(), "20250101_06_004");
        assert_eq!(later.to_string(), "20250101_12_004");
    }
}
