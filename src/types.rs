//! CFI (Canonical Fragment Identifier) types for EPUB
//!
//! EPUB CFI is a standardized way to reference specific locations within EPUB publications.
//! Format: epubcfi(/6/4[chap01ref]!/4/2/22/3:268)
//!
//! Reference: <https://idpf.org/epub/linking/cfi/epub-cfi.html>

use serde::{Deserialize, Serialize};
use std::fmt;

/// Characters that must be escaped with `^` inside assertions
pub const RESERVED_CHARS: [char; 8] = ['^', '[', ']', '(', ')', ',', ';', '='];

/// Escape reserved characters with a leading `^`
pub fn escape(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        if RESERVED_CHARS.contains(&ch) {
            escaped.push('^');
        }
        escaped.push(ch);
    }
    escaped
}

/// A complete EPUB CFI
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cfi {
    /// Path through the package document to a spine itemref
    pub package: PackageComponent,
    /// Location inside the referenced content document
    pub content: ContentComponent,
}

/// Package document part of a CFI, ending at an `itemref`
///
/// Displays with its trailing indirection: `/6/4!`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PackageComponent {
    pub path: CfiPath,
}

/// Content document part of a CFI
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "type")]
pub enum ContentComponent {
    /// A single location
    Path(CfiPath),
    /// A range between two locations
    Range(RangeComponent),
}

/// A CFI range (for text selections)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RangeComponent {
    /// Path to the deepest element containing both endpoints
    pub common_ancestor: CfiPath,
    /// Start of the range (relative path from common ancestor)
    pub start: CfiPath,
    /// End of the range (relative path from common ancestor)
    pub end: CfiPath,
}

/// A CFI path (sequence of steps)
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CfiPath {
    /// Steps in this path
    pub steps: Vec<CfiStep>,
    /// Optional character offset at the end
    #[serde(skip_serializing_if = "Option::is_none")]
    pub character_offset: Option<CharacterOffset>,
    /// Optional temporal offset (for audio/video)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temporal_offset: Option<TemporalOffset>,
    /// Optional spatial offset (for images)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spatial_offset: Option<SpatialOffset>,
}

/// A single step in a CFI path
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CfiStep {
    /// Even for elements, odd for the text positions around them
    pub index: u32,
    /// Optional ID assertion [id]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id_assertion: Option<String>,
}

/// Text location assertion for disambiguation
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TextAssertion {
    /// Text before the location
    pub prefix: Option<String>,
    /// Text after the location
    pub suffix: Option<String>,
    /// Additional parameters
    pub parameters: Vec<(String, String)>,
}

/// Character offset within a run of text
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CharacterOffset {
    /// The character index (0-based)
    pub offset: usize,
    /// Optional text assertion for validation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assertion: Option<TextAssertion>,
}

/// Temporal offset for audio/video (in seconds)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemporalOffset {
    /// Time in seconds
    pub seconds: f64,
}

impl Eq for TemporalOffset {}

/// Spatial offset for images (percentage-based)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpatialOffset {
    /// X coordinate as percentage (0.0-100.0)
    pub x: f64,
    /// Y coordinate as percentage (0.0-100.0)
    pub y: f64,
}

impl Eq for SpatialOffset {}

impl Cfi {
    pub fn new(package: PackageComponent, content: ContentComponent) -> Self {
        Self { package, content }
    }

    /// Check if this CFI represents a range (text selection)
    pub fn is_range(&self) -> bool {
        matches!(self.content, ContentComponent::Range(_))
    }

    /// 0-based spine position implied by the final package step
    pub fn spine_index(&self) -> Option<usize> {
        self.package.spine_index()
    }

    /// Absolute content path of the start of this CFI
    ///
    /// For a range this joins the common ancestor with the start path.
    pub fn start_path(&self) -> CfiPath {
        match &self.content {
            ContentComponent::Path(path) => path.clone(),
            ContentComponent::Range(range) => range.common_ancestor.join(&range.start),
        }
    }

    /// Absolute content path of the end of this CFI
    pub fn end_path(&self) -> CfiPath {
        match &self.content {
            ContentComponent::Path(path) => path.clone(),
            ContentComponent::Range(range) => range.common_ancestor.join(&range.end),
        }
    }
}

impl From<CfiPath> for ContentComponent {
    fn from(path: CfiPath) -> Self {
        ContentComponent::Path(path)
    }
}

impl From<RangeComponent> for ContentComponent {
    fn from(range: RangeComponent) -> Self {
        ContentComponent::Range(range)
    }
}

impl PackageComponent {
    pub fn new(path: CfiPath) -> Self {
        Self { path }
    }

    /// 0-based position of the itemref among its siblings
    ///
    /// Only exact when the spine holds nothing but itemref elements, which
    /// the package document schema requires.
    pub fn spine_index(&self) -> Option<usize> {
        let last = self.path.steps.last()?;
        if last.index < 2 || last.index % 2 != 0 {
            return None;
        }
        Some((last.index / 2 - 1) as usize)
    }
}

impl CfiPath {
    /// Create an empty path
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a path with steps
    pub fn with_steps(steps: Vec<CfiStep>) -> Self {
        Self {
            steps,
            ..Self::default()
        }
    }

    /// Add a step to the path
    pub fn push(&mut self, step: CfiStep) {
        self.steps.push(step);
    }

    /// Set the character offset
    pub fn set_character_offset(&mut self, offset: usize) {
        self.character_offset = Some(CharacterOffset {
            offset,
            assertion: None,
        });
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty() && !self.has_terminus()
    }

    /// Whether any offset follows the steps
    pub fn has_terminus(&self) -> bool {
        self.character_offset.is_some()
            || self.temporal_offset.is_some()
            || self.spatial_offset.is_some()
    }

    /// Append `tail`'s steps and take its terminus
    pub fn join(&self, tail: &CfiPath) -> CfiPath {
        let mut steps = self.steps.clone();
        steps.extend(tail.steps.iter().cloned());
        CfiPath {
            steps,
            character_offset: tail.character_offset.clone(),
            temporal_offset: tail.temporal_offset.clone(),
            spatial_offset: tail.spatial_offset.clone(),
        }
    }
}

impl CfiStep {
    /// Create a step
    pub fn new(index: u32) -> Self {
        Self {
            index,
            id_assertion: None,
        }
    }

    /// Create a step with ID assertion
    pub fn with_id(index: u32, id: impl Into<String>) -> Self {
        Self {
            index,
            id_assertion: Some(id.into()),
        }
    }

    /// Element steps are even
    pub fn is_element(&self) -> bool {
        self.index % 2 == 0
    }
}

// Display implementations for serialization

impl fmt::Display for Cfi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "epubcfi({}{})", self.package, self.content)
    }
}

impl fmt::Display for PackageComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}!", self.path)
    }
}

impl fmt::Display for ContentComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContentComponent::Path(path) => write!(f, "{}", path),
            ContentComponent::Range(range) => write!(f, "{}", range),
        }
    }
}

impl fmt::Display for RangeComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{}", self.common_ancestor, self.start, self.end)
    }
}

impl fmt::Display for CfiPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for step in &self.steps {
            write!(f, "{}", step)?;
        }
        if let Some(ref offset) = self.character_offset {
            write!(f, ":{}", offset.offset)?;
            if let Some(ref assertion) = offset.assertion {
                write!(f, "{}", assertion)?;
            }
        }
        if let Some(ref temporal) = self.temporal_offset {
            write!(f, "~{}", temporal.seconds)?;
        }
        if let Some(ref spatial) = self.spatial_offset {
            write!(f, "@{}:{}", spatial.x, spatial.y)?;
        }
        Ok(())
    }
}

impl fmt::Display for CfiStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}", self.index)?;
        if let Some(ref id) = self.id_assertion {
            write!(f, "[{}]", escape(id))?;
        }
        Ok(())
    }
}

impl fmt::Display for TextAssertion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        if let Some(ref prefix) = self.prefix {
            write!(f, "{}", escape(prefix))?;
        }
        if let Some(ref suffix) = self.suffix {
            write!(f, ",{}", escape(suffix))?;
        }
        for (key, value) in &self.parameters {
            write!(f, ";{}={}", escape(key), escape(value))?;
        }
        write!(f, "]")?;
        Ok(())
    }
}
