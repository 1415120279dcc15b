use std::fmt;

use serde::{Deserialize, Serialize};

/// Binary answer used by the background questions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum YesNo {
    Yes,
    No,
}

impl YesNo {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "yes" => Some(Self::Yes),
            "no" => Some(Self::No),
            _ => None,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Yes => "yes",
            Self::No => "no",
        }
    }
}

/// The three sections of the form, displayed one at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormStep {
    Background,
    ContentDetails,
    Contact,
}

impl FormStep {
    pub const COUNT: u8 = 3;

    pub const fn ordered() -> [Self; 3] {
        [Self::Background, Self::ContentDetails, Self::Contact]
    }

    pub const fn first() -> Self {
        Self::Background
    }

    /// 1-based position shown to the applicant.
    pub const fn index(self) -> u8 {
        match self {
            Self::Background => 1,
            Self::ContentDetails => 2,
            Self::Contact => 3,
        }
    }

    pub const fn title(self) -> &'static str {
        match self {
            Self::Background => "Your Background",
            Self::ContentDetails => "Content Details",
            Self::Contact => "Contact Information",
        }
    }

    pub const fn next(self) -> Option<Self> {
        match self {
            Self::Background => Some(Self::ContentDetails),
            Self::ContentDetails => Some(Self::Contact),
            Self::Contact => None,
        }
    }

    pub const fn previous(self) -> Option<Self> {
        match self {
            Self::Background => None,
            Self::ContentDetails => Some(Self::Background),
            Self::Contact => Some(Self::ContentDetails),
        }
    }

    pub const fn is_last(self) -> bool {
        self.next().is_none()
    }

    /// Fields rendered on this step. The three sets are disjoint and cover every field.
    pub const fn fields(self) -> &'static [FormField] {
        match self {
            Self::Background => &[
                FormField::HasOnlyFans,
                FormField::OnlyFansDuration,
                FormField::HasAgency,
                FormField::MonthlyEarning,
            ],
            Self::ContentDetails => &[
                FormField::InstagramHandle,
                FormField::ContentType,
                FormField::HelpNeeded,
            ],
            Self::Contact => &[
                FormField::FullName,
                FormField::Email,
                FormField::PhoneNumber,
                FormField::AdditionalNotes,
            ],
        }
    }

    /// Progress bar fill, in whole percent.
    pub const fn progress_percent(self) -> u8 {
        (self.index() as u16 * 100 / Self::COUNT as u16) as u8
    }
}

impl fmt::Display for FormStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "step {} ({})", self.index(), self.title())
    }
}

/// Every field collected by the application form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FormField {
    HasOnlyFans,
    OnlyFansDuration,
    HasAgency,
    MonthlyEarning,
    InstagramHandle,
    ContentType,
    HelpNeeded,
    FullName,
    Email,
    PhoneNumber,
    AdditionalNotes,
}

impl FormField {
    pub const ALL: [Self; 11] = [
        Self::HasOnlyFans,
        Self::OnlyFansDuration,
        Self::HasAgency,
        Self::MonthlyEarning,
        Self::InstagramHandle,
        Self::ContentType,
        Self::HelpNeeded,
        Self::FullName,
        Self::Email,
        Self::PhoneNumber,
        Self::AdditionalNotes,
    ];

    /// Name used by the form on the wire.
    pub const fn name(self) -> &'static str {
        match self {
            Self::HasOnlyFans => "hasOnlyFans",
            Self::OnlyFansDuration => "onlyFansDuration",
            Self::HasAgency => "hasAgency",
            Self::MonthlyEarning => "monthlyEarning",
            Self::InstagramHandle => "instagramHandle",
            Self::ContentType => "contentType",
            Self::HelpNeeded => "helpNeeded",
            Self::FullName => "fullName",
            Self::Email => "email",
            Self::PhoneNumber => "phoneNumber",
            Self::AdditionalNotes => "additionalNotes",
        }
    }

    /// Column in the applications table.
    pub const fn column(self) -> &'static str {
        match self {
            Self::HasOnlyFans => "has_only_fans",
            Self::OnlyFansDuration => "only_fans_duration",
            Self::HasAgency => "has_agency",
            Self::MonthlyEarning => "monthly_earning",
            Self::InstagramHandle => "instagram_handle",
            Self::ContentType => "content_type",
            Self::HelpNeeded => "help_needed",
            Self::FullName => "full_name",
            Self::Email => "email",
            Self::PhoneNumber => "phone_number",
            Self::AdditionalNotes => "additional_notes",
        }
    }

    pub const fn step(self) -> FormStep {
        match self {
            Self::HasOnlyFans | Self::OnlyFansDuration | Self::HasAgency | Self::MonthlyEarning => {
                FormStep::Background
            }
            Self::InstagramHandle | Self::ContentType | Self::HelpNeeded => {
                FormStep::ContentDetails
            }
            Self::FullName | Self::Email | Self::PhoneNumber | Self::AdditionalNotes => {
                FormStep::Contact
            }
        }
    }
}

impl fmt::Display for FormField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Raw values as entered, before validation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FormValues {
    pub has_only_fans: String,
    pub only_fans_duration: String,
    pub has_agency: String,
    pub monthly_earning: String,
    pub instagram_handle: String,
    pub content_type: Vec<String>,
    pub help_needed: Vec<String>,
    pub full_name: String,
    pub email: String,
    pub phone_number: String,
    pub additional_notes: Option<String>,
}

/// Partial update of the raw values. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct FormPatch {
    pub has_only_fans: Option<String>,
    pub only_fans_duration: Option<String>,
    pub has_agency: Option<String>,
    pub monthly_earning: Option<String>,
    pub instagram_handle: Option<String>,
    pub content_type: Option<Vec<String>>,
    pub help_needed: Option<Vec<String>>,
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub additional_notes: Option<String>,
}

impl FormPatch {
    /// Patch writing only the fields owned by `step`, taken from `values`.
    pub fn for_step(values: &FormValues, step: FormStep) -> Self {
        let mut patch = Self::from(values.clone());
        patch.retain_step(step);
        patch
    }

    /// Fields this patch writes, in declaration order.
    pub fn fields(&self) -> Vec<FormField> {
        let present = [
            self.has_only_fans.is_some(),
            self.only_fans_duration.is_some(),
            self.has_agency.is_some(),
            self.monthly_earning.is_some(),
            self.instagram_handle.is_some(),
            self.content_type.is_some(),
            self.help_needed.is_some(),
            self.full_name.is_some(),
            self.email.is_some(),
            self.phone_number.is_some(),
            self.additional_notes.is_some(),
        ];

        FormField::ALL
            .into_iter()
            .zip(present)
            .filter_map(|(field, set)| set.then_some(field))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.fields().is_empty()
    }

    fn retain_step(&mut self, step: FormStep) {
        let keep = |field: FormField| field.step() == step;
        if !keep(FormField::HasOnlyFans) {
            self.has_only_fans = None;
        }
        if !keep(FormField::OnlyFansDuration) {
            self.only_fans_duration = None;
        }
        if !keep(FormField::HasAgency) {
            self.has_agency = None;
        }
        if !keep(FormField::MonthlyEarning) {
            self.monthly_earning = None;
        }
        if !keep(FormField::InstagramHandle) {
            self.instagram_handle = None;
        }
        if !keep(FormField::ContentType) {
            self.content_type = None;
        }
        if !keep(FormField::HelpNeeded) {
            self.help_needed = None;
        }
        if !keep(FormField::FullName) {
            self.full_name = None;
        }
        if !keep(FormField::Email) {
            self.email = None;
        }
        if !keep(FormField::PhoneNumber) {
            self.phone_number = None;
        }
        if !keep(FormField::AdditionalNotes) {
            self.additional_notes = None;
        }
    }

    pub fn apply_to(self, values: &mut FormValues) {
        let FormPatch {
            has_only_fans,
            only_fans_duration,
            has_agency,
            monthly_earning,
            instagram_handle,
            content_type,
            help_needed,
            full_name,
            email,
            phone_number,
            additional_notes,
        } = self;

        if let Some(value) = has_only_fans {
            values.has_only_fans = value;
        }
        if let Some(value) = only_fans_duration {
            values.only_fans_duration = value;
        }
        if let Some(value) = has_agency {
            values.has_agency = value;
        }
        if let Some(value) = monthly_earning {
            values.monthly_earning = value;
        }
        if let Some(value) = instagram_handle {
            values.instagram_handle = value;
        }
        if let Some(value) = content_type {
            values.content_type = value;
        }
        if let Some(value) = help_needed {
            values.help_needed = value;
        }
        if let Some(value) = full_name {
            values.full_name = value;
        }
        if let Some(value) = email {
            values.email = value;
        }
        if let Some(value) = phone_number {
            values.phone_number = value;
        }
        if let Some(value) = additional_notes {
            values.additional_notes = Some(value);
        }
    }
}

impl From<FormValues> for FormPatch {
    fn from(values: FormValues) -> Self {
        Self {
            has_only_fans: Some(values.has_only_fans),
            only_fans_duration: Some(values.only_fans_duration),
            has_agency: Some(values.has_agency),
            monthly_earning: Some(values.monthly_earning),
            instagram_handle: Some(values.instagram_handle),
            content_type: Some(values.content_type),
            help_needed: Some(values.help_needed),
            full_name: Some(values.full_name),
            email: Some(values.email),
            phone_number: Some(values.phone_number),
            additional_notes: values.additional_notes,
        }
    }
}

/// A fully validated application.
///
/// Serializes to the column layout of the applications table, so it doubles as the
/// insert payload. `additional_notes` is `null` when nothing was entered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Application {
    pub has_only_fans: YesNo,
    pub only_fans_duration: String,
    pub has_agency: YesNo,
    pub monthly_earning: String,
    pub instagram_handle: String,
    pub content_type: Vec<String>,
    pub help_needed: Vec<String>,
    pub full_name: String,
    pub email: String,
    pub phone_number: String,
    pub additional_notes: Option<String>,
}
