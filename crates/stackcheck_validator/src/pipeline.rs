//! End-to-end template validation.

use std::borrow::Cow;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info};

use stackcheck_spec::{InconsistencyConfiguration, Specification, SpecificationCache};
use stackcheck_template::{
    DeadEntries, NormalizerOptions, ParsedTemplate, Resource, SourceFormat, TemplateParser,
};

use crate::custom::{CustomResourceValidator, CustomValidatorRegistry};
use crate::error::ValidatorResult;
use crate::report::ValidationReport;
use crate::structural::StructuralValidator;

/// Settings for a [`TemplateValidator`].
#[derive(Debug, Clone)]
pub struct ValidatorConfig {
    pub normalizer: NormalizerOptions,
    /// Source format; detected from the path or content when unset.
    pub format: Option<SourceFormat>,
    pub inconsistencies: InconsistencyConfiguration,
    /// Register the built-in custom rules.
    pub builtin_rules: bool,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            normalizer: NormalizerOptions::default(),
            format: None,
            inconsistencies: InconsistencyConfiguration::default(),
            builtin_rules: true,
        }
    }
}

impl ValidatorConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_normalizer(mut self, normalizer: NormalizerOptions) -> Self {
        self.normalizer = normalizer;
        self
    }

    pub fn with_format(mut self, format: SourceFormat) -> Self {
        self.format = Some(format);
        self
    }

    pub fn with_inconsistencies(mut self, inconsistencies: InconsistencyConfiguration) -> Self {
        self.inconsistencies = inconsistencies;
        self
    }

    pub fn without_builtin_rules(mut self) -> Self {
        self.builtin_rules = false;
        self
    }
}

/// Normalizes, parses and validates templates against one specification.
#[derive(Debug)]
pub struct TemplateValidator {
    spec: Arc<Specification>,
    config: ValidatorConfig,
    parser: TemplateParser,
    custom: CustomValidatorRegistry,
}

impl TemplateValidator {
    pub fn new(spec: Arc<Specification>, config: ValidatorConfig) -> ValidatorResult<Self> {
        let custom = if config.builtin_rules {
            CustomValidatorRegistry::with_builtin_rules()?
        } else {
            CustomValidatorRegistry::new()
        };
        Ok(Self {
            spec,
            parser: TemplateParser::new(config.normalizer.clone()),
            config,
            custom,
        })
    }

    /// Create a validator for the specification of `region` at `version`,
    /// loading it into `cache` on first use.
    pub fn from_cache(
        cache: &SpecificationCache,
        region: &str,
        version: &str,
        config: ValidatorConfig,
    ) -> ValidatorResult<Self> {
        let spec = cache.get(region, version)?;
        Self::new(spec, config)
    }

    pub fn config(&self) -> &ValidatorConfig {
        &self.config
    }

    pub fn specification(&self) -> &Specification {
        &self.spec
    }

    pub fn custom_validators(&self) -> &CustomValidatorRegistry {
        &self.custom
    }

    /// Add a custom validator, replacing any registered for the same type.
    pub fn register(&mut self, validator: Arc<dyn CustomResourceValidator>) {
        self.custom.register(validator);
    }

    /// Validate a template file. The format comes from the configuration,
    /// then the file extension, then the content.
    pub fn validate_file(&self, path: &Path) -> ValidatorResult<ValidationReport> {
        let source = fs::read(path)?;
        let format = self
            .config
            .format
            .unwrap_or_else(|| SourceFormat::detect(Some(path), &source));
        debug!("Validating {:?} as {}", path, format);
        self.validate_source(&source, Some(format))
    }

    /// Validate template source. Decode failures abort the run; every
    /// structural problem ends up in the report.
    pub fn validate_source(
        &self,
        source: &[u8],
        format: Option<SourceFormat>,
    ) -> ValidatorResult<ValidationReport> {
        let format = format
            .or(self.config.format)
            .unwrap_or_else(|| SourceFormat::sniff(source));
        let parsed = self.parser.parse(source, format)?;
        Ok(self.validate_parsed(&parsed))
    }

    /// Validate an already parsed template.
    pub fn validate_parsed(&self, parsed: &ParsedTemplate) -> ValidationReport {
        let mut report = ValidationReport::new();
        if let Some(notice) = &parsed.reconciliation.notice {
            report.add_notice(notice.clone());
        }

        let structural = StructuralValidator::new(&self.spec, &self.config.inconsistencies);
        let dead = &parsed.reconciliation.dead;
        for mut validation in structural.validate_template(&parsed.template, dead) {
            let name = validation.resource.clone();
            if let Some(resource) = parsed.template.resource(&name) {
                let live = live_resource(&name, resource, dead);
                self.custom.validate(&name, &live, &mut validation);
            }
            report.push(validation);
        }

        let summary = report.summary();
        info!(
            "Validated {} resources: {} errors, {} warnings ({})",
            summary.resources,
            summary.errors,
            summary.warnings,
            if report.valid() { "valid" } else { "invalid" }
        );
        report
    }
}

/// `resource` without the properties the reconciler marked dead.
fn live_resource<'r>(name: &str, resource: &'r Resource, dead: &DeadEntries) -> Cow<'r, Resource> {
    if !resource.properties.keys().any(|p| dead.is_dead_property(name, p)) {
        return Cow::Borrowed(resource);
    }
    let mut live = resource.clone();
    live.properties.retain(|p, _| !dead.is_dead_property(name, p));
    Cow::Owned(live)
}
