//! Validation diagnostics.

use serde::{Deserialize, Serialize};

/// Diagnostic severity. Only errors affect validity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Error,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Warning => "warning",
            Severity::Error => "error",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single message about a resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
}

/// Diagnostics for one resource, in the order they were produced.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceValidation {
    pub resource: String,
    pub resource_type: String,
    pub diagnostics: Vec<Diagnostic>,
}

impl ResourceValidation {
    pub fn new(resource: impl Into<String>, resource_type: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
            resource_type: resource_type.into(),
            diagnostics: Vec::new(),
        }
    }

    pub fn add_error(&mut self, message: impl Into<String>) {
        self.diagnostics.push(Diagnostic {
            severity: Severity::Error,
            message: message.into(),
        });
    }

    pub fn add_warning(&mut self, message: impl Into<String>) {
        self.diagnostics.push(Diagnostic {
            severity: Severity::Warning,
            message: message.into(),
        });
    }

    pub fn errors(&self) -> impl Iterator<Item = &str> {
        self.messages(Severity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &str> {
        self.messages(Severity::Warning)
    }

    /// True when no error-level diagnostic was recorded.
    pub fn is_valid(&self) -> bool {
        self.errors().next().is_none()
    }

    fn messages(&self, severity: Severity) -> impl Iterator<Item = &str> {
        self.diagnostics
            .iter()
            .filter(move |d| d.severity == severity)
            .map(|d| d.message.as_str())
    }
}

/// Counts across a whole report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportSummary {
    pub resources: usize,
    pub invalid_resources: usize,
    pub errors: usize,
    pub warnings: usize,
    pub notices: usize,
}

/// Outcome of validating one template.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub resources: Vec<ResourceValidation>,
    /// Informational messages from null reconciliation.
    pub notices: Vec<String>,
}

impl ValidationReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, validation: ResourceValidation) {
        self.resources.push(validation);
    }

    pub fn add_notice(&mut self, notice: impl Into<String>) {
        self.notices.push(notice.into());
    }

    /// A report is valid iff no resource has an error. Warnings and
    /// notices never change the verdict.
    pub fn valid(&self) -> bool {
        self.resources.iter().all(ResourceValidation::is_valid)
    }

    pub fn resource(&self, name: &str) -> Option<&ResourceValidation> {
        self.resources.iter().find(|r| r.resource == name)
    }

    pub fn summary(&self) -> ReportSummary {
        ReportSummary {
            resources: self.resources.len(),
            invalid_resources: self.resources.iter().filter(|r| !r.is_valid()).count(),
            errors: self.resources.iter().map(|r| r.errors().count()).sum(),
            warnings: self.resources.iter().map(|r| r.warnings().count()).sum(),
            notices: self.notices.len(),
        }
    }

    /// Human-readable rendering of the report.
    pub fn report(&self) -> String {
        let mut report = String::new();

        report.push_str(&format!(
            "Status: {}\n",
            if self.valid() { "✅ VALID" } else { "❌ INVALID" }
        ));

        if !self.notices.is_empty() {
            report.push_str("\nNotices:\n");
            for notice in &self.notices {
                report.push_str(&format!("  ℹ️ {}\n", notice));
            }
        }

        report.push_str("\nResources:\n");
        for resource in &self.resources {
            let status = if !resource.is_valid() {
                "❌"
            } else if resource.warnings().next().is_some() {
                "⚠️"
            } else {
                "✅"
            };
            report.push_str(&format!(
                "  {} {} ({})\n",
                status, resource.resource, resource.resource_type
            ));
            for diagnostic in &resource.diagnostics {
                let marker = match diagnostic.severity {
                    Severity::Error => "❌",
                    Severity::Warning => "⚠️",
                };
                report.push_str(&format!("     {} {}\n", marker, diagnostic.message));
            }
        }

        let summary = self.summary();
        report.push_str(&format!(
            "\nSummary: {}/{} resources valid, {} errors, {} warnings",
            summary.resources - summary.invalid_resources,
            summary.resources,
            summary.errors,
            summary.warnings
        ));

        report
    }
}
