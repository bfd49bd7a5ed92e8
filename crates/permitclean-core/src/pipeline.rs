//! Stage orchestration
//!
//! A [`Pipeline`] is built once from a project configuration and then run on
//! one input frame. Stages always execute in the same order:
//! validate, project, derive, merge (when a reference table is configured),
//! cleanse, dates.

use polars::prelude::DataFrame;

use crate::catalog::{ColumnCatalog, ColumnGroup};
use crate::cleanse::{self, CleanseMatching, CleanseRule};
use crate::clock::{Clock, SystemClock};
use crate::config::{Config, VendorTag};
use crate::dates;
use crate::derive::{self, DerivationDirective};
use crate::error::Result;
use crate::merge::{self, ReferenceTable};
use crate::project;
use crate::validate::{SchemaValidator, Severity, ValidationReport};

/// Result of a pipeline run
#[derive(Debug)]
pub struct PipelineOutput {
    /// Normalized frame
    pub frame: DataFrame,
    /// Report from the validation stage
    pub validation: ValidationReport,
}

/// Reference lookup and the main-frame column it joins on
#[derive(Debug)]
struct MergeStep {
    reference: ReferenceTable,
    table_key: String,
}

/// The configured normalization pipeline
pub struct Pipeline {
    validator: SchemaValidator,
    severity: Severity,
    numeric: Vec<String>,
    keep: Vec<String>,
    directives: Vec<DerivationDirective>,
    merge: Option<MergeStep>,
    cleanse_rules: Vec<CleanseRule>,
    date_columns: Vec<String>,
    clock: Box<dyn Clock>,
}

impl Pipeline {
    /// Assemble a pipeline from already-loaded parts.
    ///
    /// The table-side merge key comes from the catalog and is only required
    /// when `reference` is present.
    pub fn new(
        validator: SchemaValidator,
        catalog: &ColumnCatalog,
        directives: Vec<DerivationDirective>,
        reference: Option<ReferenceTable>,
        matching: CleanseMatching,
    ) -> Result<Self> {
        let merge = match reference {
            Some(reference) => {
                let (_, table_key) = catalog.merge_keys()?;
                Some(MergeStep {
                    reference,
                    table_key: table_key.to_string(),
                })
            }
            None => None,
        };

        Ok(Self {
            validator,
            severity: Severity::default(),
            numeric: catalog.get(ColumnGroup::Numeric).to_vec(),
            keep: catalog.get(ColumnGroup::Keep).to_vec(),
            directives,
            merge,
            cleanse_rules: cleanse::resolve_rules(catalog.get(ColumnGroup::Cleanse), matching),
            date_columns: catalog.get(ColumnGroup::Date).to_vec(),
            clock: Box::new(SystemClock),
        })
    }

    /// Load every input named by the project and assemble the pipeline.
    pub fn from_config(config: &Config) -> Result<Self> {
        let project = &config.project;
        tracing::info!("Loading project '{}' ({})", project.name, project.vendor);

        let catalog = config.load_catalog()?;
        let directives = config.load_directives(&catalog)?;
        let reference = config.load_reference(&catalog)?;
        let validator = config.load_schema()?;

        let pipeline = Self::new(
            validator,
            &catalog,
            directives,
            reference,
            project.cleanse_matching,
        )?
        .with_severity(project.validation.severity);
        Ok(pipeline)
    }

    /// Set what an invalid input frame does
    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    /// Replace the clock used by `starttime` directives
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    /// Vendor of the configured schema
    pub fn vendor(&self) -> VendorTag {
        self.validator.vendor()
    }

    /// Resolved cleanse rules, in execution order
    pub fn cleanse_rules(&self) -> &[CleanseRule] {
        &self.cleanse_rules
    }

    /// Run only the validation stage.
    pub fn validate(&self, df: &DataFrame) -> Result<ValidationReport> {
        self.validator.validate(df)
    }

    /// Run every stage on `df`.
    pub fn run(&self, df: DataFrame) -> Result<PipelineOutput> {
        let validation = self.validate(&df)?;
        validation.enforce(self.severity)?;

        let df = project::project(df, &self.numeric, &self.keep)?;
        let df = derive::derive(df, &self.directives, self.clock.as_ref())?;

        let mut df = match &self.merge {
            Some(step) => merge::merge_reference(df, &step.reference, &step.table_key)?,
            None => {
                tracing::debug!("No reference table configured, skipping merge");
                df
            }
        };

        for rule in &self.cleanse_rules {
            df = cleanse::cleanse(df, rule)?;
        }

        let frame = dates::normalize_dates(df, &self.date_columns, self.vendor())?;

        tracing::info!(
            "Pipeline finished: {} row(s), {} column(s)",
            frame.height(),
            frame.width()
        );
        Ok(PipelineOutput { frame, validation })
    }
}
