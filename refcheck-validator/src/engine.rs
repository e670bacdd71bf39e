//! Validation orchestration.
//!
//! An [`IdValidator`] owns the enabled flag. Registering a schema with it
//! extracts the reference descriptors once and returns a [`SchemaValidator`],
//! which runs them for each document:
//!
//! 1. disabled validator → pass
//! 2. unmodified path → pass, no query
//! 3. plan the value; nothing to check → pass, malformed → fail
//! 4. resolve conditions, target collection and connection
//! 5. count → pass / fail / error
//!
//! Descriptor paths with `$` wildcards are expanded against the document and
//! each concrete path is checked and reported on its own. All checks of one
//! document run concurrently within the caller's task.

use futures::future::join_all;
use refcheck_model::{Document, RefTarget, SchemaRef};
use refcheck_storage::{Connection, default_connection};
use refcheck_types::{Expansion, SessionId};
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use tracing::{debug, trace};

use crate::{
    CheckError, FieldCheck, FieldError, FieldErrors, Lookup, ReferenceDescriptor, ValidateResult,
    ValidationError, ValidationOutcome, ValidatorOptions, execute, extract_descriptors,
    is_modified, resolve_conditions,
};

/// Owner of the enabled flag shared by every schema it registers.
#[derive(Debug, Clone)]
pub struct IdValidator {
    enabled: Arc<AtomicBool>,
}

impl Default for IdValidator {
    fn default() -> Self {
        Self::new()
    }
}

impl IdValidator {
    /// Creates an enabled validator, independent of every other instance.
    pub fn new() -> Self {
        Self {
            enabled: Arc::new(AtomicBool::new(true)),
        }
    }

    /// The process-wide instance used by [`register`].
    pub fn global() -> &'static IdValidator {
        static GLOBAL: OnceLock<IdValidator> = OnceLock::new();
        GLOBAL.get_or_init(IdValidator::new)
    }

    pub fn enable(&self) {
        self.enabled.store(true, Ordering::SeqCst);
    }

    /// While disabled every reference check passes without a query.
    pub fn disable(&self) {
        self.enabled.store(false, Ordering::SeqCst);
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    /// Extracts the schema's references and binds them to this validator.
    pub fn register(&self, schema: &SchemaRef, options: ValidatorOptions) -> SchemaValidator {
        let descriptors = extract_descriptors(schema, options.allow_duplicates);
        SchemaValidator {
            schema_name: schema.name().to_string(),
            descriptors,
            options,
            enabled: Arc::clone(&self.enabled),
        }
    }
}

/// Registers `schema` with the process-wide [`IdValidator::global`] instance.
pub fn register(schema: &SchemaRef, options: ValidatorOptions) -> SchemaValidator {
    IdValidator::global().register(schema, options)
}

/// Per-document state shared by the checks of one validation event.
struct ValidationContext<'a> {
    doc: &'a dyn Document,
    connection: Option<Connection>,
    session: Option<SessionId>,
}

/// The reference checks of one registered schema.
#[derive(Debug)]
pub struct SchemaValidator {
    schema_name: String,
    descriptors: Vec<ReferenceDescriptor>,
    options: ValidatorOptions,
    enabled: Arc<AtomicBool>,
}

impl SchemaValidator {
    pub fn schema_name(&self) -> &str {
        &self.schema_name
    }

    pub fn descriptors(&self) -> &[ReferenceDescriptor] {
        &self.descriptors
    }

    pub fn options(&self) -> &ValidatorOptions {
        &self.options
    }

    /// Checks every reference path of `doc` and reports each outcome.
    pub async fn check(&self, doc: &dyn Document) -> Vec<FieldCheck> {
        let ctx = ValidationContext {
            doc,
            connection: self.options.connection.clone().or_else(default_connection),
            session: doc.session(),
        };

        let checks = self.descriptors.iter().flat_map(|descriptor| {
            descriptor
                .path
                .expand(doc.root())
                .into_iter()
                .map(move |expansion| (descriptor, expansion))
        });
        let ctx = &ctx;
        join_all(checks.map(|(descriptor, expansion)| async move {
            let outcome = self.check_path(ctx, descriptor, &expansion).await;
            FieldCheck {
                path: expansion.path,
                outcome,
            }
        }))
        .await
    }

    /// Validates `doc`, aggregating the per-path outcomes.
    ///
    /// Any backend error wins, then any configuration error; otherwise every
    /// failed path is returned with its rendered message.
    pub async fn validate(&self, doc: &dyn Document) -> ValidateResult<()> {
        let mut failures = Vec::new();
        let mut misconfigured = None;

        for check in self.check(doc).await {
            match check.outcome {
                ValidationOutcome::Pass => {}
                ValidationOutcome::Fail => failures.push(FieldError {
                    message: self.options.render_message(&check.path),
                    path: check.path,
                }),
                ValidationOutcome::Error(CheckError::Backend(source)) => {
                    return Err(ValidationError::Backend {
                        path: check.path,
                        source,
                    });
                }
                ValidationOutcome::Error(CheckError::Configuration(reason)) => {
                    if misconfigured.is_none() {
                        misconfigured = Some(ValidationError::Configuration {
                            path: check.path,
                            reason,
                        });
                    }
                }
            }
        }

        if let Some(error) = misconfigured {
            return Err(error);
        }
        if !failures.is_empty() {
            debug!(
                "{}: {} invalid reference(s)",
                self.schema_name,
                failures.len()
            );
            return Err(ValidationError::Invalid(FieldErrors::new(failures)));
        }
        Ok(())
    }

    async fn check_path(
        &self,
        ctx: &ValidationContext<'_>,
        descriptor: &ReferenceDescriptor,
        expansion: &Expansion,
    ) -> ValidationOutcome {
        let path = &expansion.path;
        if !self.enabled.load(Ordering::SeqCst) {
            trace!("{}: validation disabled, {} passes", self.schema_name, path);
            return ValidationOutcome::Pass;
        }
        if !is_modified(ctx.doc, path) {
            trace!("{}: {} unmodified, skipped", self.schema_name, path);
            return ValidationOutcome::Pass;
        }

        let lookup = Lookup::plan(
            ctx.doc.get(path),
            descriptor.cardinality,
            descriptor.allow_duplicates,
        );
        match lookup {
            Lookup::Nothing => return ValidationOutcome::Pass,
            Lookup::Malformed => {
                debug!("{}: {} holds a malformed reference", self.schema_name, path);
                return ValidationOutcome::Fail;
            }
            Lookup::One(_) | Lookup::Many(_) => {}
        }

        let conditions = resolve_conditions(&descriptor.conditions, ctx.doc);
        let collection = match resolve_target(ctx.doc, &descriptor.target, expansion) {
            Ok(collection) => collection,
            Err(e) => return ValidationOutcome::Error(e),
        };
        let Some(connection) = &ctx.connection else {
            return ValidationOutcome::Error(CheckError::Configuration(
                "no backend connection available".to_string(),
            ));
        };

        let outcome = execute(
            connection.as_ref(),
            &collection,
            lookup,
            conditions,
            ctx.session,
        )
        .await;
        if outcome.is_fail() {
            debug!("{}: {} references a missing record", self.schema_name, path);
        }
        outcome
    }
}

/// Names the collection a reference points at. Dynamic targets are read off
/// the document, with wildcards bound to the indices of the checked element.
fn resolve_target(
    doc: &dyn Document,
    target: &RefTarget,
    expansion: &Expansion,
) -> Result<String, CheckError> {
    match target {
        RefTarget::Fixed(collection) => Ok(collection.clone()),
        RefTarget::Dynamic(target_path) => {
            let bound = target_path.bind(&expansion.indices);
            match doc.get(&bound) {
                Some(Value::String(name)) if !name.is_empty() => Ok(name.clone()),
                Some(other) => Err(CheckError::Configuration(format!(
                    "target field {bound} must name a collection, found {other}"
                ))),
                None => Err(CheckError::Configuration(format!(
                    "target field {bound} is missing"
                ))),
            }
        }
    }
}
