//! Assertion definitions and checks
//!
//! Checks are pure functions over the component's rendered tree. Each
//! returns `Ok(outcome)` with a pass/fail verdict and the observed value, or
//! `Err` when the check itself cannot run; the orchestrator records errors
//! as failed results without aborting the rest of the suite.

use serde::{Deserialize, Serialize};
use vrt_core::config::SuiteConfig;
use vrt_core::{ComponentDescriptor, RenderedNode, Result, Viewport, VrtError};

/// Kind of check an assertion performs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssertionKind {
    ElementExists,
    TextMatches,
    NoOverlap,
    NoClipping,
    AccessibilityScore,
    ColorContrast,
    ResponsiveLayout,
}

impl std::fmt::Display for AssertionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ElementExists => write!(f, "element_exists"),
            Self::TextMatches => write!(f, "text_matches"),
            Self::NoOverlap => write!(f, "no_overlap"),
            Self::NoClipping => write!(f, "no_clipping"),
            Self::AccessibilityScore => write!(f, "accessibility_score"),
            Self::ColorContrast => write!(f, "color_contrast"),
            Self::ResponsiveLayout => write!(f, "responsive_layout"),
        }
    }
}

/// One check a suite runs in every environment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestAssertion {
    pub id: String,
    pub kind: AssertionKind,
    pub selector: String,
    pub expected_value: Option<serde_json::Value>,
    pub tolerance: Option<f64>,
    pub description: String,
}

impl TestAssertion {
    pub fn new(
        id: impl Into<String>,
        kind: AssertionKind,
        selector: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            kind,
            selector: selector.into(),
            expected_value: None,
            tolerance: None,
            description: description.into(),
        }
    }

    pub fn with_expected(mut self, expected: serde_json::Value) -> Self {
        self.expected_value = Some(expected);
        self
    }

    /// Assertions every suite starts with
    pub fn defaults(config: &SuiteConfig) -> Vec<TestAssertion> {
        vec![
            TestAssertion::new(
                "element_exists",
                AssertionKind::ElementExists,
                "[data-testid]",
                "Component has test ID",
            ),
            TestAssertion::new(
                "no_overlap",
                AssertionKind::NoOverlap,
                "*",
                "No overlapping elements",
            ),
            TestAssertion::new(
                "no_clipping",
                AssertionKind::NoClipping,
                "*",
                "No clipped elements",
            ),
            TestAssertion::new(
                "accessibility_score",
                AssertionKind::AccessibilityScore,
                "body",
                "Accessibility score above threshold",
            )
            .with_expected(serde_json::json!(config.accessibility_threshold)),
        ]
    }
}

/// Verdict plus the observed value for one assertion in one environment
#[derive(Debug, Clone)]
pub struct AssertionOutcome {
    pub passed: bool,
    pub actual: serde_json::Value,
}

impl AssertionOutcome {
    fn of(passed: bool, actual: serde_json::Value) -> Self {
        Self { passed, actual }
    }
}

/// Run one assertion against a component under one environment
pub fn check(
    assertion: &TestAssertion,
    component: &ComponentDescriptor,
    viewport: Viewport,
    config: &SuiteConfig,
) -> Result<AssertionOutcome> {
    let root = &component.root;
    match assertion.kind {
        AssertionKind::ElementExists => {
            let found = root.query(&assertion.selector).is_some();
            Ok(AssertionOutcome::of(found, serde_json::json!(found)))
        }
        AssertionKind::TextMatches => {
            let expected = assertion
                .expected_value
                .as_ref()
                .and_then(|v| v.as_str())
                .ok_or_else(|| {
                    VrtError::Assertion("text_matches requires an expected string".to_string())
                })?;
            let actual = root
                .query(&assertion.selector)
                .and_then(|n| n.text.as_deref())
                .map(str::trim)
                .unwrap_or_default();
            Ok(AssertionOutcome::of(
                actual == expected,
                serde_json::json!(actual),
            ))
        }
        AssertionKind::NoOverlap => {
            let passed = no_overlap(root, &assertion.selector);
            Ok(AssertionOutcome::of(passed, serde_json::json!(passed)))
        }
        AssertionKind::NoClipping => {
            let passed = no_clipping(root, &assertion.selector);
            Ok(AssertionOutcome::of(passed, serde_json::json!(passed)))
        }
        AssertionKind::AccessibilityScore => {
            let score = accessibility_score(root);
            let threshold = assertion
                .expected_value
                .as_ref()
                .and_then(|v| v.as_f64())
                .unwrap_or(config.accessibility_threshold);
            Ok(AssertionOutcome::of(
                score >= threshold,
                serde_json::json!(score),
            ))
        }
        AssertionKind::ColorContrast => {
            let ratio = contrast_ratio(root)?;
            let threshold = assertion
                .expected_value
                .as_ref()
                .and_then(|v| v.as_f64())
                .unwrap_or(config.color_contrast_threshold);
            Ok(AssertionOutcome::of(
                ratio >= threshold,
                serde_json::json!(ratio),
            ))
        }
        AssertionKind::ResponsiveLayout => {
            let passed = responsive_layout(root, viewport.width, config);
            Ok(AssertionOutcome::of(passed, serde_json::json!(passed)))
        }
    }
}

/// Selector matches scoped to descendants; the root is the query scope,
/// not a candidate.
fn matched_descendants<'a>(root: &'a RenderedNode, selector: &str) -> Vec<&'a RenderedNode> {
    root.children
        .iter()
        .flat_map(|child| child.query_all(selector))
        .collect()
}

/// Pairwise bounding-box intersection across all matched descendants
fn no_overlap(root: &RenderedNode, selector: &str) -> bool {
    let nodes = matched_descendants(root, selector);
    for (i, a) in nodes.iter().enumerate() {
        for b in &nodes[i + 1..] {
            if a.bounds.intersects(&b.bounds) {
                return false;
            }
        }
    }
    true
}

/// A node is clipped when it has no rendered size, or hides overflowing
/// content behind `overflow: hidden`.
fn no_clipping(root: &RenderedNode, selector: &str) -> bool {
    for node in matched_descendants(root, selector) {
        if node.bounds.width == 0.0 || node.bounds.height == 0.0 {
            return false;
        }
        if node.style("overflow") == Some("hidden")
            && (node.scroll_width > node.bounds.width || node.scroll_height > node.bounds.height)
        {
            return false;
        }
    }
    true
}

/// Heuristic accessibility score over the rendered tree, floored at 0
///
/// Starts at 1.0 and subtracts: 0.1 per image without alt text, 0.05 per
/// interactive control lacking an accessible label, 0.1 when no semantic
/// landmark is present, and 0.1 when the first focusable element is removed
/// from tab order.
pub fn accessibility_score(root: &RenderedNode) -> f64 {
    let mut score: f64 = 1.0;

    for img in root.query_all("img") {
        if img.attribute("alt").map_or(true, |alt| alt.trim().is_empty()) {
            score -= 0.1;
        }
    }

    for tag in ["button", "input", "select", "textarea"] {
        for node in root.query_all(tag) {
            if node.attribute("aria-label").is_none()
                && node.attribute("aria-labelledby").is_none()
            {
                score -= 0.05;
            }
        }
    }

    let landmarks = ["header", "nav", "main", "section", "article", "aside", "footer"];
    if !landmarks.iter().any(|tag| root.query(tag).is_some()) {
        score -= 0.1;
    }

    if let Some(first) = first_focusable(root) {
        if first.attribute("tabindex") == Some("-1") {
            score -= 0.1;
        }
    }

    score.max(0.0)
}

fn first_focusable(node: &RenderedNode) -> Option<&RenderedNode> {
    let focusable = matches!(node.tag.as_str(), "button" | "input" | "select" | "textarea")
        || (node.tag == "a" && node.attribute("href").is_some());
    if focusable {
        return Some(node);
    }
    node.children.iter().find_map(first_focusable)
}

/// WCAG contrast ratio of the root's foreground over its background
pub fn contrast_ratio(root: &RenderedNode) -> Result<f64> {
    let foreground = root
        .style("color")
        .and_then(parse_color)
        .ok_or_else(|| VrtError::Assertion("missing or unparsable color style".to_string()))?;
    let background = root
        .style("background-color")
        .and_then(parse_color)
        .ok_or_else(|| {
            VrtError::Assertion("missing or unparsable background-color style".to_string())
        })?;

    let fg = relative_luminance(foreground);
    let bg = relative_luminance(background);
    let (lighter, darker) = if fg > bg { (fg, bg) } else { (bg, fg) };
    Ok((lighter + 0.05) / (darker + 0.05))
}

/// Width heuristic: small breakpoints demand near-full-width rendering (or
/// an explicit responsive marker class), larger ones progressively less.
pub fn responsive_layout(root: &RenderedNode, breakpoint: u32, config: &SuiteConfig) -> bool {
    let width = root.bounds.width;
    let breakpoint = f64::from(breakpoint);

    if breakpoint < 768.0 {
        width >= breakpoint * 0.9
            || config
                .responsive_marker_classes
                .iter()
                .any(|class| root.has_class(class))
    } else if breakpoint < 1024.0 {
        width >= breakpoint * 0.7
    } else {
        width >= breakpoint * 0.5
    }
}

/// Parse `#rgb`, `#rrggbb`, or `rgb(r, g, b)` into channel values
fn parse_color(value: &str) -> Option<[u8; 3]> {
    let value = value.trim();

    if let Some(hex) = value.strip_prefix('#') {
        return match hex.len() {
            3 => {
                let mut channels = [0u8; 3];
                for (i, c) in hex.chars().enumerate() {
                    let d = c.to_digit(16)? as u8;
                    channels[i] = d * 16 + d;
                }
                Some(channels)
            }
            6 => {
                let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
                let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
                let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
                Some([r, g, b])
            }
            _ => None,
        };
    }

    let inner = value
        .strip_prefix("rgb(")
        .or_else(|| value.strip_prefix("rgba("))?
        .strip_suffix(')')?;
    let mut parts = inner.split(',').map(str::trim);
    let r = parts.next()?.parse().ok()?;
    let g = parts.next()?.parse().ok()?;
    let b = parts.next()?.parse().ok()?;
    Some([r, g, b])
}

fn relative_luminance([r, g, b]: [u8; 3]) -> f64 {
    fn channel(c: u8) -> f64 {
        let c = f64::from(c) / 255.0;
        if c <= 0.03928 {
            c / 12.92
        } else {
            ((c + 0.055) / 1.055).powf(2.4)
        }
    }
    0.2126 * channel(r) + 0.7152 * channel(g) + 0.0722 * channel(b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use vrt_core::Bounds;

    fn box_at(tag: &str, x: f64, y: f64, w: f64, h: f64) -> RenderedNode {
        RenderedNode::new(tag).with_bounds(Bounds::new(x, y, w, h))
    }

    #[test]
    fn test_default_assertions() {
        let assertions = TestAssertion::defaults(&SuiteConfig::default());
        assert_eq!(assertions.len(), 4);
        assert_eq!(assertions[0].kind, AssertionKind::ElementExists);
        assert_eq!(
            assertions[3].expected_value,
            Some(serde_json::json!(0.8))
        );
    }

    #[test]
    fn test_no_overlap() {
        let disjoint = box_at("div", 0.0, 0.0, 500.0, 500.0)
            .with_child(box_at("span", 600.0, 0.0, 100.0, 100.0).with_class("item"))
            .with_child(box_at("span", 800.0, 0.0, 100.0, 100.0).with_class("item"));
        assert!(no_overlap(&disjoint, ".item"));

        let overlapping = box_at("div", 0.0, 0.0, 500.0, 500.0)
            .with_child(box_at("span", 0.0, 0.0, 100.0, 100.0).with_class("item"))
            .with_child(box_at("span", 50.0, 50.0, 100.0, 100.0).with_class("item"));
        assert!(!no_overlap(&overlapping, ".item"));
    }

    #[test]
    fn test_no_clipping() {
        let clean = box_at("div", 0.0, 0.0, 200.0, 100.0);
        assert!(no_clipping(&clean, "*"));

        let zero_size = box_at("div", 0.0, 0.0, 200.0, 100.0)
            .with_child(box_at("span", 0.0, 0.0, 0.0, 0.0));
        assert!(!no_clipping(&zero_size, "*"));

        let mut overflowing =
            box_at("span", 0.0, 0.0, 200.0, 100.0).with_style("overflow", "hidden");
        overflowing.scroll_width = 400.0;
        let hidden_overflow = box_at("div", 0.0, 0.0, 200.0, 100.0).with_child(overflowing);
        assert!(!no_clipping(&hidden_overflow, "*"));
    }

    #[test]
    fn test_wildcard_selector_ignores_enclosing_root() {
        // The root's box always contains its children; it is the query
        // scope, not a candidate, so a flat layout with disjoint children
        // is not an overlap.
        let flat = box_at("header", 0.0, 0.0, 800.0, 120.0)
            .with_child(box_at("span", 0.0, 0.0, 100.0, 100.0))
            .with_child(box_at("span", 200.0, 0.0, 100.0, 100.0));
        assert!(no_overlap(&flat, "*"));
        assert!(no_clipping(&flat, "*"));

        let overlapping_children = box_at("header", 0.0, 0.0, 800.0, 120.0)
            .with_child(box_at("span", 0.0, 0.0, 100.0, 100.0))
            .with_child(box_at("span", 50.0, 0.0, 100.0, 100.0));
        assert!(!no_overlap(&overlapping_children, "*"));
    }

    #[test]
    fn test_accessibility_score_penalties() {
        // Bare div: only the missing-landmark penalty applies.
        let bare = box_at("div", 0.0, 0.0, 100.0, 100.0);
        assert!((accessibility_score(&bare) - 0.9).abs() < 1e-9);

        // Image without alt text costs another 0.1.
        let missing_alt = box_at("div", 0.0, 0.0, 100.0, 100.0)
            .with_child(box_at("img", 0.0, 0.0, 50.0, 50.0));
        assert!((accessibility_score(&missing_alt) - 0.8).abs() < 1e-9);

        // Adding alt text restores the 0.1.
        let with_alt = box_at("div", 0.0, 0.0, 100.0, 100.0)
            .with_child(box_at("img", 0.0, 0.0, 50.0, 50.0).with_attribute("alt", "logo"));
        assert!((accessibility_score(&with_alt) - 0.9).abs() < 1e-9);

        // Unlabeled button and a first focusable out of tab order.
        let keyboard_trap = box_at("main", 0.0, 0.0, 100.0, 100.0)
            .with_child(box_at("button", 0.0, 0.0, 10.0, 10.0).with_attribute("tabindex", "-1"));
        // Landmark present; -0.05 label, -0.1 tabindex.
        assert!((accessibility_score(&keyboard_trap) - 0.85).abs() < 1e-9);
    }

    #[test]
    fn test_accessibility_score_floors_at_zero() {
        let mut awful = box_at("div", 0.0, 0.0, 100.0, 100.0);
        for _ in 0..15 {
            awful = awful.with_child(box_at("img", 0.0, 0.0, 10.0, 10.0));
        }
        assert_eq!(accessibility_score(&awful), 0.0);
    }

    #[test]
    fn test_contrast_ratio() {
        let black_on_white = box_at("div", 0.0, 0.0, 100.0, 100.0)
            .with_style("color", "#000000")
            .with_style("background-color", "#ffffff");
        let ratio = contrast_ratio(&black_on_white).unwrap();
        assert!((ratio - 21.0).abs() < 0.1);

        let low = box_at("div", 0.0, 0.0, 100.0, 100.0)
            .with_style("color", "rgb(119, 119, 119)")
            .with_style("background-color", "#888888");
        assert!(contrast_ratio(&low).unwrap() < 1.5);

        let unstyled = box_at("div", 0.0, 0.0, 100.0, 100.0);
        assert!(matches!(
            contrast_ratio(&unstyled),
            Err(VrtError::Assertion(_))
        ));
    }

    #[test]
    fn test_responsive_layout_thresholds() {
        let config = SuiteConfig::default();

        let narrow = box_at("div", 0.0, 0.0, 350.0, 600.0);
        assert!(responsive_layout(&narrow, 375, &config)); // 350 >= 337.5

        let fixed = box_at("div", 0.0, 0.0, 300.0, 600.0);
        assert!(!responsive_layout(&fixed, 375, &config));

        let marked = box_at("div", 0.0, 0.0, 300.0, 600.0).with_class("responsive");
        assert!(responsive_layout(&marked, 375, &config));

        let tablet = box_at("div", 0.0, 0.0, 540.0, 600.0);
        assert!(responsive_layout(&tablet, 768, &config)); // 540 >= 537.6
        assert!(!responsive_layout(&fixed, 768, &config));

        let desktop = box_at("div", 0.0, 0.0, 1000.0, 600.0);
        assert!(responsive_layout(&desktop, 1920, &config)); // 1000 >= 960
        assert!(!responsive_layout(&tablet, 1920, &config));
    }

    #[test]
    fn test_parse_color_forms() {
        assert_eq!(parse_color("#fff"), Some([255, 255, 255]));
        assert_eq!(parse_color("#1a2b3c"), Some([26, 43, 60]));
        assert_eq!(parse_color("rgb(12, 34, 56)"), Some([12, 34, 56]));
        assert_eq!(parse_color("rgba(12, 34, 56)"), Some([12, 34, 56]));
        assert_eq!(parse_color("papayawhip"), None);
    }
}
