//! Diagnostics
//!
//! Collects warnings and errors during registration and validation.
//! A failure on one declaration never aborts its siblings; everything lands
//! here and the caller decides what to do with it.

use serde::{Deserialize, Serialize};
use std::fmt;

// =============================================================================
// Diagnostic Codes
// =============================================================================

/// Diagnostic code for categorizing issues
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DiagnosticCode {
    // === Paths ===
    /// Projection source is not a registered record
    UnknownRecord,
    /// Path segment does not name a field on the current record
    UnknownField,
    /// Intermediate path segment names a scalar field
    CannotNavigateThroughScalar,
    /// Empty path or empty segment
    InvalidPath,

    // === Direct mappings ===
    /// Declared target type does not accept the resolved source type
    ProjectedTypeMismatch,

    // === Computed fields ===
    NoDependenciesDeclared,
    /// Reducers do not line up with collection-crossing dependencies
    ReducerCountMismatch,
    /// Reducer name outside the configured allow-list
    UnknownReducer,
    NoMatchingComputationMethod,
    IncompatibleReturnType,
    IncompatibleParameterCount,
    IncompatibleParameterType,

    // === Declarations ===
    /// Two projections share a DTO name
    DuplicateProjection,
    /// Embedded field targets a type that is not embeddable
    NotEmbeddable,

    // === Advisory ===
    /// Entity root declares no identifier field
    MissingIdentifier,
    /// Several identifier fields without a composite identifier declaration
    AmbiguousIdentifier,
    /// Provider type has no introspectable methods
    UnknownProvider,
}

impl DiagnosticCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UnknownRecord => "E101",
            Self::UnknownField => "E102",
            Self::CannotNavigateThroughScalar => "E103",
            Self::InvalidPath => "E104",
            Self::ProjectedTypeMismatch => "E105",
            Self::NoDependenciesDeclared => "E106",
            Self::ReducerCountMismatch => "E107",
            Self::UnknownReducer => "E108",
            Self::NoMatchingComputationMethod => "E109",
            Self::IncompatibleReturnType => "E110",
            Self::IncompatibleParameterCount => "E111",
            Self::IncompatibleParameterType => "E112",
            Self::DuplicateProjection => "E113",
            Self::NotEmbeddable => "E114",
            Self::MissingIdentifier => "W101",
            Self::AmbiguousIdentifier => "W102",
            Self::UnknownProvider => "W103",
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            Self::MissingIdentifier | Self::AmbiguousIdentifier | Self::UnknownProvider => {
                Severity::Warning
            }
            _ => Severity::Error,
        }
    }
}

impl fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// Severity
// =============================================================================

/// Diagnostic severity level
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Severity {
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Warning => write!(f, "warning"),
            Self::Error => write!(f, "error"),
        }
    }
}

// =============================================================================
// Diagnostic Item
// =============================================================================

/// A single diagnostic item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosticItem {
    /// Record or projection that declared the failing element
    pub subject: String,
    /// Field or method within the subject, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub element: Option<String>,
    pub code: DiagnosticCode,
    /// Human-readable message
    pub message: String,
    /// Additional context (source, providers, expected signature)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub context: Vec<String>,
}

impl DiagnosticItem {
    pub fn new(subject: impl Into<String>, code: DiagnosticCode, message: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            element: None,
            code,
            message: message.into(),
            context: Vec::new(),
        }
    }

    pub fn on(mut self, element: impl Into<String>) -> Self {
        self.element = Some(element.into());
        self
    }

    pub fn with_context(mut self, ctx: impl Into<String>) -> Self {
        self.context.push(ctx.into());
        self
    }

    pub fn severity(&self) -> Severity {
        self.code.severity()
    }

    fn location(&self) -> String {
        match &self.element {
            Some(element) => format!("{}.{}", self.subject, element),
            None => self.subject.clone(),
        }
    }
}

impl fmt::Display for DiagnosticItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {}: {} ({})",
            self.code,
            self.code.severity(),
            self.message,
            self.location()
        )?;

        for ctx in &self.context {
            write!(f, "\n  - {}", ctx)?;
        }

        Ok(())
    }
}

// =============================================================================
// Diagnostics Collection
// =============================================================================

/// Collection of diagnostics from a registration or validation pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostics {
    items: Vec<DiagnosticItem>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a diagnostic item
    pub fn push(&mut self, item: DiagnosticItem) {
        self.items.push(item);
    }

    /// Add an item; its severity comes from the code
    pub fn report(&mut self, subject: impl Into<String>, code: DiagnosticCode, message: impl Into<String>) {
        self.push(DiagnosticItem::new(subject, code, message));
    }

    /// Entity root with no identifier field
    pub fn missing_identifier(&mut self, record: &str) {
        self.push(DiagnosticItem::new(
            record,
            DiagnosticCode::MissingIdentifier,
            format!("No identifier field found in entity {}", record),
        ));
    }

    /// Entity root with several identifier fields and no composite declaration
    pub fn ambiguous_identifier(&mut self, record: &str, fields: &[String]) {
        self.push(
            DiagnosticItem::new(
                record,
                DiagnosticCode::AmbiguousIdentifier,
                format!(
                    "Entity {} declares {} identifier fields without a composite identifier",
                    record,
                    fields.len()
                ),
            )
            .with_context(format!("Identifier fields: {}", fields.join(", "))),
        );
    }

    /// Check if there are any errors
    pub fn has_errors(&self) -> bool {
        self.items.iter().any(|i| i.severity() == Severity::Error)
    }

    pub fn has_warnings(&self) -> bool {
        self.items.iter().any(|i| i.severity() == Severity::Warning)
    }

    /// Get all errors
    pub fn errors(&self) -> impl Iterator<Item = &DiagnosticItem> {
        self.items.iter().filter(|i| i.severity() == Severity::Error)
    }

    /// Get all warnings
    pub fn warnings(&self) -> impl Iterator<Item = &DiagnosticItem> {
        self.items.iter().filter(|i| i.severity() == Severity::Warning)
    }

    /// Items carrying a given code
    pub fn with_code(&self, code: DiagnosticCode) -> impl Iterator<Item = &DiagnosticItem> {
        self.items.iter().filter(move |i| i.code == code)
    }

    pub fn contains(&self, code: DiagnosticCode) -> bool {
        self.items.iter().any(|i| i.code == code)
    }

    /// Items attached to a subject (projection or record)
    pub fn for_subject<'a>(&'a self, subject: &'a str) -> impl Iterator<Item = &'a DiagnosticItem> {
        self.items.iter().filter(move |i| i.subject == subject)
    }

    /// Get all items
    pub fn all(&self) -> &[DiagnosticItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn error_count(&self) -> usize {
        self.errors().count()
    }

    pub fn warning_count(&self) -> usize {
        self.warnings().count()
    }

    /// Merge another Diagnostics into this one
    pub fn merge(&mut self, other: Diagnostics) {
        self.items.extend(other.items);
    }

    /// Format all diagnostics for display
    pub fn format_all(&self) -> String {
        let mut output = String::new();

        for item in &self.items {
            output.push_str(&format!("{}\n", item));
        }

        if self.has_errors() {
            output.push_str(&format!(
                "\n{} error(s), {} warning(s)\n",
                self.error_count(),
                self.warning_count()
            ));
        } else if !self.is_empty() {
            output.push_str(&format!("\n{} warning(s)\n", self.warning_count()));
        }

        output
    }
}

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_all())
    }
}

impl Extend<DiagnosticItem> for Diagnostics {
    fn extend<T: IntoIterator<Item = DiagnosticItem>>(&mut self, iter: T) {
        self.items.extend(iter);
    }
}

impl IntoIterator for Diagnostics {
    type Item = DiagnosticItem;
    type IntoIter = std::vec::IntoIter<DiagnosticItem>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl<'a> IntoIterator for &'a Diagnostics {
    type Item = &'a DiagnosticItem;
    type IntoIter = std::slice::Iter<'a, DiagnosticItem>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}
