//! Core type definitions shared across the VRT pipeline

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Simulated device class for responsive capture and testing
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceClass {
    #[default]
    Desktop,
    Tablet,
    Mobile,
}

impl DeviceClass {
    /// All device classes, in the order breakpoint capture walks them
    pub fn all() -> [DeviceClass; 3] {
        [DeviceClass::Desktop, DeviceClass::Tablet, DeviceClass::Mobile]
    }
}

impl std::fmt::Display for DeviceClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Desktop => write!(f, "desktop"),
            Self::Tablet => write!(f, "tablet"),
            Self::Mobile => write!(f, "mobile"),
        }
    }
}

impl std::str::FromStr for DeviceClass {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "desktop" => Ok(Self::Desktop),
            "tablet" => Ok(Self::Tablet),
            "mobile" => Ok(Self::Mobile),
            _ => Err(format!("Invalid device class: {}", s)),
        }
    }
}

/// Simulated viewport size in CSS pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl std::fmt::Display for Viewport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Axis-aligned bounding box of a rendered element
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Bounds {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    pub fn area(&self) -> f64 {
        self.width * self.height
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    /// Whether two boxes share any area
    pub fn intersects(&self, other: &Bounds) -> bool {
        !(self.right() < other.x
            || self.x > other.right()
            || self.bottom() < other.y
            || self.y > other.bottom())
    }
}

/// A node in the rendered element tree supplied by the component registry
///
/// This is the structural half of a snapshot: enough of the DOM to resolve
/// selectors, read text and attributes, and reason about geometry, without
/// holding a live browser handle.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RenderedNode {
    /// Element tag name (lowercase)
    pub tag: String,
    /// Element id attribute, if any
    pub id: Option<String>,
    /// CSS classes
    pub classes: Vec<String>,
    /// Remaining attributes (alt, aria-label, href, tabindex, ...)
    pub attributes: HashMap<String, String>,
    /// Text content of this node (not descendants)
    pub text: Option<String>,
    /// Rendered bounding box
    pub bounds: Bounds,
    /// Scrollable content size, when larger than the box
    pub scroll_width: f64,
    pub scroll_height: f64,
    /// Computed style subset (overflow, color, background-color, ...)
    pub styles: HashMap<String, String>,
    /// Child nodes
    pub children: Vec<RenderedNode>,
}

impl RenderedNode {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into().to_lowercase(),
            ..Default::default()
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_class(mut self, class: impl Into<String>) -> Self {
        self.classes.push(class.into());
        self
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn with_bounds(mut self, bounds: Bounds) -> Self {
        self.bounds = bounds;
        self
    }

    pub fn with_style(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.styles.insert(name.into(), value.into());
        self
    }

    pub fn with_child(mut self, child: RenderedNode) -> Self {
        self.children.push(child);
        self
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    pub fn style(&self, name: &str) -> Option<&str> {
        self.styles.get(name).map(String::as_str)
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes.iter().any(|c| c == class)
    }

    /// Whether this node matches a simple selector
    ///
    /// Supported forms: `*`, `tag`, `#id`, `.class`, `[attr]`.
    pub fn matches(&self, selector: &str) -> bool {
        let selector = selector.trim();
        if selector == "*" {
            return true;
        }
        if let Some(id) = selector.strip_prefix('#') {
            return self.id.as_deref() == Some(id);
        }
        if let Some(class) = selector.strip_prefix('.') {
            return self.has_class(class);
        }
        if let Some(rest) = selector.strip_prefix('[') {
            if let Some(attr) = rest.strip_suffix(']') {
                return self.attributes.contains_key(attr);
            }
            return false;
        }
        self.tag.eq_ignore_ascii_case(selector)
    }

    /// First descendant (including self) matching the selector
    pub fn query(&self, selector: &str) -> Option<&RenderedNode> {
        if self.matches(selector) {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.query(selector))
    }

    /// All descendants (including self) matching the selector, document order
    pub fn query_all(&self, selector: &str) -> Vec<&RenderedNode> {
        let mut matched = Vec::new();
        self.collect_matches(selector, &mut matched);
        matched
    }

    fn collect_matches<'a>(&'a self, selector: &str, out: &mut Vec<&'a RenderedNode>) {
        if self.matches(selector) {
            out.push(self);
        }
        for child in &self.children {
            child.collect_matches(selector, out);
        }
    }
}

/// A renderable UI component as described by the component registry
///
/// The registry is an external collaborator; this descriptor is consumed
/// opaquely by capture, diff, and testing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentDescriptor {
    /// Stable component identifier
    pub id: String,
    /// Human-readable component name
    pub name: String,
    /// Rendered bounding box of the component root
    pub bounds: Bounds,
    /// Component props at capture time
    pub props: HashMap<String, serde_json::Value>,
    /// CSS classes on the component root
    pub css_classes: Vec<String>,
    /// Computed style subset of the component root
    pub computed_styles: HashMap<String, String>,
    /// Page URL the component was rendered on
    pub source_url: String,
    /// Rendered element tree rooted at the component
    pub root: RenderedNode,
}

impl ComponentDescriptor {
    pub fn new(id: impl Into<String>, name: impl Into<String>, root: RenderedNode) -> Self {
        let bounds = root.bounds;
        Self {
            id: id.into(),
            name: name.into(),
            bounds,
            props: HashMap::new(),
            css_classes: root.classes.clone(),
            computed_styles: root.styles.clone(),
            source_url: String::new(),
            root,
        }
    }

    pub fn with_source_url(mut self, url: impl Into<String>) -> Self {
        self.source_url = url.into();
        self
    }

    pub fn with_prop(mut self, name: impl Into<String>, value: serde_json::Value) -> Self {
        self.props.insert(name.into(), value);
        self
    }
}

/// Context describing the fix whose visual impact is being judged
///
/// Produced by the fixing agent; `expected_changes` lists the changes the
/// agent claims it made, used to partition diff regions into intentional
/// and unexpected.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FixContext {
    pub fix_id: String,
    pub component_id: String,
    pub fix_kind: String,
    pub expected_changes: Vec<String>,
}

impl FixContext {
    pub fn new(fix_id: impl Into<String>, component_id: impl Into<String>) -> Self {
        Self {
            fix_id: fix_id.into(),
            component_id: component_id.into(),
            fix_kind: String::new(),
            expected_changes: Vec::new(),
        }
    }

    pub fn with_fix_kind(mut self, kind: impl Into<String>) -> Self {
        self.fix_kind = kind.into();
        self
    }

    pub fn with_expected_change(mut self, change: impl Into<String>) -> Self {
        self.expected_changes.push(change.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_class_parsing() {
        let device: DeviceClass = "tablet".parse().unwrap();
        assert_eq!(device, DeviceClass::Tablet);
        assert_eq!(device.to_string(), "tablet");
        assert!("phablet".parse::<DeviceClass>().is_err());
    }

    #[test]
    fn test_bounds_intersects() {
        let a = Bounds::new(0.0, 0.0, 100.0, 100.0);
        let b = Bounds::new(50.0, 50.0, 100.0, 100.0);
        let c = Bounds::new(200.0, 200.0, 10.0, 10.0);
        assert!(a.intersects(&b));
        assert!(b.intersects(&a));
        assert!(!a.intersects(&c));
    }

    #[test]
    fn test_node_selector_matching() {
        let node = RenderedNode::new("button")
            .with_id("save")
            .with_class("primary")
            .with_attribute("aria-label", "Save");

        assert!(node.matches("*"));
        assert!(node.matches("button"));
        assert!(node.matches("#save"));
        assert!(node.matches(".primary"));
        assert!(node.matches("[aria-label]"));
        assert!(!node.matches("input"));
        assert!(!node.matches("#cancel"));
    }

    #[test]
    fn test_node_query_all() {
        let root = RenderedNode::new("div")
            .with_child(RenderedNode::new("img").with_attribute("alt", "logo"))
            .with_child(
                RenderedNode::new("section").with_child(RenderedNode::new("img")),
            );

        let images = root.query_all("img");
        assert_eq!(images.len(), 2);
        assert!(root.query("section").is_some());
        assert!(root.query("video").is_none());
    }

    #[test]
    fn test_fix_context_builder() {
        let ctx = FixContext::new("fix-1", "comp-1")
            .with_fix_kind("accessibility")
            .with_expected_change("color change on header");
        assert_eq!(ctx.expected_changes.len(), 1);
        assert_eq!(ctx.fix_kind, "accessibility");
    }
}
