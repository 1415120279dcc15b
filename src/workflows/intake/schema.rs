use std::collections::BTreeMap;
use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;

use super::domain::{Application, FormField, FormValues, YesNo};

pub const HAS_ONLY_FANS_MESSAGE: &str = "Please select whether you have an OnlyFans account";
pub const ONLY_FANS_DURATION_MESSAGE: &str = "Please select how long you have been on OnlyFans";
pub const HAS_AGENCY_MESSAGE: &str = "Please select whether you currently work with an agency";
pub const MONTHLY_EARNING_MESSAGE: &str = "Please select your monthly earnings";
pub const INSTAGRAM_HANDLE_MESSAGE: &str = "Instagram handle is required";
pub const CONTENT_TYPE_MESSAGE: &str = "Please select at least one content type";
pub const HELP_NEEDED_MESSAGE: &str = "Please select at least one area you need help with";
pub const FULL_NAME_MESSAGE: &str = "Name must be at least 2 characters";
pub const EMAIL_MESSAGE: &str = "Please enter a valid email address";
pub const PHONE_NUMBER_MESSAGE: &str = "Phone number is required";

const FULL_NAME_MIN_CHARS: usize = 2;

fn email_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[A-Za-z0-9_'+\-.]*[A-Za-z0-9_+\-]@([A-Za-z0-9][A-Za-z0-9\-]*\.)+[A-Za-z]{2,}$")
            .expect("email pattern compiles")
    })
}

/// Outcome of validating a set of fields. Only failing fields are listed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    errors: BTreeMap<FormField, String>,
}

impl ValidationReport {
    pub fn passed() -> Self {
        Self::default()
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn message(&self, field: FormField) -> Option<&str> {
        self.errors.get(&field).map(String::as_str)
    }

    pub fn fields(&self) -> impl Iterator<Item = FormField> + '_ {
        self.errors.keys().copied()
    }

    pub fn errors(&self) -> &BTreeMap<FormField, String> {
        &self.errors
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub(crate) fn insert(&mut self, field: FormField, message: impl Into<String>) {
        self.errors.insert(field, message.into());
    }

    /// Field names joined for log lines.
    pub fn summary(&self) -> String {
        self.errors
            .keys()
            .map(|field| field.name())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Field constraints of the application form.
#[derive(Debug, Clone, Copy, Default)]
pub struct ApplicationSchema;

impl ApplicationSchema {
    /// Check one field, returning the applicant-facing message on failure.
    pub fn check(&self, field: FormField, values: &FormValues) -> Result<(), &'static str> {
        let ok = match field {
            FormField::HasOnlyFans => YesNo::parse(&values.has_only_fans).is_some(),
            FormField::OnlyFansDuration => !values.only_fans_duration.is_empty(),
            FormField::HasAgency => YesNo::parse(&values.has_agency).is_some(),
            FormField::MonthlyEarning => !values.monthly_earning.is_empty(),
            FormField::InstagramHandle => !values.instagram_handle.is_empty(),
            FormField::ContentType => values.content_type.iter().any(|entry| !entry.is_empty()),
            FormField::HelpNeeded => values.help_needed.iter().any(|entry| !entry.is_empty()),
            FormField::FullName => values.full_name.chars().count() >= FULL_NAME_MIN_CHARS,
            FormField::Email => is_valid_email(&values.email),
            FormField::PhoneNumber => !values.phone_number.is_empty(),
            FormField::AdditionalNotes => true,
        };

        if ok {
            Ok(())
        } else {
            Err(Self::message_for(field))
        }
    }

    /// Message reported when `field` fails its constraint.
    pub const fn message_for(field: FormField) -> &'static str {
        match field {
            FormField::HasOnlyFans => HAS_ONLY_FANS_MESSAGE,
            FormField::OnlyFansDuration => ONLY_FANS_DURATION_MESSAGE,
            FormField::HasAgency => HAS_AGENCY_MESSAGE,
            FormField::MonthlyEarning => MONTHLY_EARNING_MESSAGE,
            FormField::InstagramHandle => INSTAGRAM_HANDLE_MESSAGE,
            FormField::ContentType => CONTENT_TYPE_MESSAGE,
            FormField::HelpNeeded => HELP_NEEDED_MESSAGE,
            FormField::FullName => FULL_NAME_MESSAGE,
            FormField::Email => EMAIL_MESSAGE,
            FormField::PhoneNumber => PHONE_NUMBER_MESSAGE,
            FormField::AdditionalNotes => "",
        }
    }

    pub fn validate(&self, fields: &[FormField], values: &FormValues) -> ValidationReport {
        let mut report = ValidationReport::passed();
        for &field in fields {
            if let Err(message) = self.check(field, values) {
                report.insert(field, message);
            }
        }
        report
    }

    /// Validate every field and build the typed application.
    pub fn parse(&self, values: &FormValues) -> Result<Application, ValidationReport> {
        let report = self.validate(&FormField::ALL, values);
        let (true, Some(has_only_fans), Some(has_agency)) = (
            report.is_valid(),
            YesNo::parse(&values.has_only_fans),
            YesNo::parse(&values.has_agency),
        ) else {
            return Err(report);
        };

        Ok(Application {
            has_only_fans,
            only_fans_duration: values.only_fans_duration.clone(),
            has_agency,
            monthly_earning: values.monthly_earning.clone(),
            instagram_handle: values.instagram_handle.clone(),
            content_type: selections(&values.content_type),
            help_needed: selections(&values.help_needed),
            full_name: values.full_name.clone(),
            email: values.email.clone(),
            phone_number: values.phone_number.clone(),
            additional_notes: values
                .additional_notes
                .as_ref()
                .filter(|notes| !notes.trim().is_empty())
                .cloned(),
        })
    }
}

fn is_valid_email(raw: &str) -> bool {
    !raw.starts_with('.') && !raw.contains("..") && email_pattern().is_match(raw)
}

/// Checkbox groups are sets: drop blanks and repeats, keep first-seen order.
fn selections(raw: &[String]) -> Vec<String> {
    let mut seen = Vec::with_capacity(raw.len());
    for entry in raw {
        if !entry.is_empty() && !seen.contains(entry) {
            seen.push(entry.clone());
        }
    }
    seen
}
