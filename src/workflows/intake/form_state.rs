use super::domain::{Application, FormField, FormPatch, FormValues};
use super::schema::{ApplicationSchema, ValidationReport};

/// Storage for raw values plus the errors last reported for each field.
///
/// Validation never fails loudly: callers get a [`ValidationReport`] and the holder
/// remembers the messages so a renderer can show them next to the inputs.
pub trait FormStateHolder {
    fn values(&self) -> &FormValues;

    /// Write the fields present in `patch`. Errors for those fields are cleared.
    fn edit(&mut self, patch: FormPatch);

    /// Validate only `fields`. Errors for the listed fields are replaced by the result.
    fn validate_fields(&mut self, fields: &[FormField]) -> ValidationReport;

    /// Validate every field and produce the typed application.
    fn validate_all(&mut self) -> Result<Application, ValidationReport>;

    /// Errors currently displayed.
    fn errors(&self) -> &ValidationReport;

    /// Back to empty values and no errors.
    fn reset(&mut self);
}

/// [`FormStateHolder`] backed by [`ApplicationSchema`].
#[derive(Debug, Clone, Default)]
pub struct SchemaFormState {
    schema: ApplicationSchema,
    values: FormValues,
    errors: ValidationReport,
}

impl SchemaFormState {
    pub fn new(schema: ApplicationSchema) -> Self {
        Self {
            schema,
            values: FormValues::default(),
            errors: ValidationReport::passed(),
        }
    }

    pub fn with_values(values: FormValues) -> Self {
        Self {
            values,
            ..Self::default()
        }
    }

    fn merge_errors(&mut self, checked: &[FormField], report: &ValidationReport) {
        let mut merged = ValidationReport::passed();
        for (field, message) in self.errors.errors() {
            if !checked.contains(field) {
                merged.insert(*field, message.clone());
            }
        }
        for (field, message) in report.errors() {
            merged.insert(*field, message.clone());
        }
        self.errors = merged;
    }
}

impl FormStateHolder for SchemaFormState {
    fn values(&self) -> &FormValues {
        &self.values
    }

    fn edit(&mut self, patch: FormPatch) {
        let touched = patch.fields();
        patch.apply_to(&mut self.values);
        self.merge_errors(&touched, &ValidationReport::passed());
    }

    fn validate_fields(&mut self, fields: &[FormField]) -> ValidationReport {
        let report = self.schema.validate(fields, &self.values);
        self.merge_errors(fields, &report);
        report
    }

    fn validate_all(&mut self) -> Result<Application, ValidationReport> {
        let result = self.schema.parse(&self.values);
        match &result {
            Ok(_) => self.errors = ValidationReport::passed(),
            Err(report) => self.errors = report.clone(),
        }
        result
    }

    fn errors(&self) -> &ValidationReport {
        &self.errors
    }

    fn reset(&mut self) {
        self.values = FormValues::default();
        self.errors = ValidationReport::passed();
    }
}
