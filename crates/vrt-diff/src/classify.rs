//! Region classification heuristics
//!
//! Classification checks run in a fixed priority order; the first matching
//! rule wins. The ordering matters: a large square-ish region is always a
//! layout shift even when its average color distance is high.

use crate::region::RawRegion;
use crate::types::{DiffRegion, DiffSeverity, DiffSummary, DiffType};
use vrt_core::config::DiffConfig;

/// Classify one raw region into a typed, scored diff region
pub fn classify_region(raw: &RawRegion, config: &DiffConfig) -> DiffRegion {
    let diff_type = region_type(raw, config);
    let severity = region_severity(raw);
    let confidence = region_confidence(raw);
    let description = describe(raw, diff_type, severity);

    DiffRegion {
        x: raw.min_x,
        y: raw.min_y,
        width: raw.width(),
        height: raw.height(),
        diff_type,
        severity,
        confidence,
        description,
    }
}

/// Priority order: layout shift, size change, color change, position
/// change, style change.
pub fn region_type(raw: &RawRegion, config: &DiffConfig) -> DiffType {
    let area = raw.area() as f64;
    let aspect = raw.aspect_ratio();

    // Large, square-ish areas read as layout shifts.
    if area > 1000.0 && aspect > 0.5 && aspect < 2.0 {
        return DiffType::LayoutShift;
    }

    // Strongly elongated regions suggest a dimension change.
    if (f64::from(raw.width()) - f64::from(raw.height())).abs() > config.layout_threshold * 10.0 {
        return DiffType::SizeChange;
    }

    if raw.avg_distance > config.color_threshold * 2.0 {
        return DiffType::ColorChange;
    }

    if f64::from(raw.min_x) > config.layout_threshold || f64::from(raw.min_y) > config.layout_threshold
    {
        return DiffType::PositionChange;
    }

    DiffType::StyleChange
}

/// Severity from bounding-box area and mean color distance
pub fn region_severity(raw: &RawRegion) -> DiffSeverity {
    let area = raw.area();
    let avg = raw.avg_distance;

    if area > 5000 && avg > 100.0 {
        DiffSeverity::Critical
    } else if area > 2000 || avg > 80.0 {
        DiffSeverity::Major
    } else if area > 500 || avg > 50.0 {
        DiffSeverity::Moderate
    } else if area > 100 || avg > 20.0 {
        DiffSeverity::Minor
    } else {
        DiffSeverity::None
    }
}

/// Confidence in the classification: larger, denser, higher-contrast
/// regions score higher. Always within [0, 1].
pub fn region_confidence(raw: &RawRegion) -> f64 {
    let area = raw.area() as f64;
    let confidence = (area / 1000.0).min(1.0) * 0.4
        + (raw.avg_distance / 100.0).min(1.0) * 0.3
        + raw.pixel_density().min(1.0) * 0.3;
    confidence.min(1.0)
}

fn describe(raw: &RawRegion, diff_type: DiffType, severity: DiffSeverity) -> String {
    let area = raw.area();
    let avg = raw.avg_distance;

    let detail = match diff_type {
        DiffType::LayoutShift => {
            format!("Layout shift detected ({}px², {:.1} avg diff)", area, avg)
        }
        DiffType::ColorChange => format!("Color change detected ({:.1} avg diff)", avg),
        DiffType::SizeChange => {
            format!("Size change detected ({}x{})", raw.width(), raw.height())
        }
        DiffType::PositionChange => {
            format!("Position change detected ({}, {})", raw.min_x, raw.min_y)
        }
        DiffType::StyleChange => format!("Style change detected ({:.1} avg diff)", avg),
        DiffType::ElementMissing => "Element appears to be missing".to_string(),
        DiffType::ElementAdded => "New element detected".to_string(),
        DiffType::TextChange => "Text content change detected".to_string(),
    };

    format!("{} - {} severity", detail, severity)
}

/// Aggregate severity over all regions: thresholded mean rank, clamped so
/// the result is never below the worst individual region.
pub fn overall_severity(regions: &[DiffRegion]) -> DiffSeverity {
    if regions.is_empty() {
        return DiffSeverity::None;
    }

    let total: u32 = regions.iter().map(|r| u32::from(r.severity.rank())).sum();
    let average = f64::from(total) / regions.len() as f64;

    let from_average = if average >= 3.5 {
        DiffSeverity::Critical
    } else if average >= 2.5 {
        DiffSeverity::Major
    } else if average >= 1.5 {
        DiffSeverity::Moderate
    } else if average >= 0.5 {
        DiffSeverity::Minor
    } else {
        DiffSeverity::None
    };

    let worst = regions
        .iter()
        .map(|r| r.severity)
        .max()
        .unwrap_or(DiffSeverity::None);

    from_average.max(worst)
}

/// Per-type and per-severity counts plus mean confidence
pub fn summarize(regions: &[DiffRegion]) -> DiffSummary {
    let mut summary = DiffSummary {
        total_regions: regions.len(),
        ..DiffSummary::default()
    };

    for region in regions {
        *summary.regions_by_type.entry(region.diff_type).or_insert(0) += 1;
        *summary
            .regions_by_severity
            .entry(region.severity)
            .or_insert(0) += 1;
    }

    if !regions.is_empty() {
        summary.average_confidence =
            regions.iter().map(|r| r.confidence).sum::<f64>() / regions.len() as f64;
    }

    summary
}
