//! Static labels for the Health app's categories, sample types and clinical
//! record types. The strings must match what the app puts on screen.

use crate::data_entry::{SampleInput, ValueEntry};
use crate::query::LabelPredicate;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;

/// A category on the Health app's browse/search page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Category {
    Activity,
    BodyMeasurements,
    CycleTracking,
    Hearing,
    Heart,
    Medications,
    MentalWellbeing,
    Mobility,
    Nutrition,
    Respiratory,
    Sleep,
    Symptoms,
    Vitals,
    OtherData,
}

impl Category {
    pub const ALL: [Category; 14] = [
        Category::Activity,
        Category::BodyMeasurements,
        Category::CycleTracking,
        Category::Hearing,
        Category::Heart,
        Category::Medications,
        Category::MentalWellbeing,
        Category::Mobility,
        Category::Nutrition,
        Category::Respiratory,
        Category::Sleep,
        Category::Symptoms,
        Category::Vitals,
        Category::OtherData,
    ];

    /// English title shown for the category in the Health app.
    pub fn display_label(&self) -> &'static str {
        match self {
            Category::Activity => "Activity",
            Category::BodyMeasurements => "Body Measurements",
            Category::CycleTracking => "Cycle Tracking",
            Category::Hearing => "Hearing",
            Category::Heart => "Heart",
            Category::Medications => "Medications",
            Category::MentalWellbeing => "Mental Wellbeing",
            Category::Mobility => "Mobility",
            Category::Nutrition => "Nutrition",
            Category::Respiratory => "Respiratory",
            Category::Sleep => "Sleep",
            Category::Symptoms => "Symptoms",
            Category::Vitals => "Vitals",
            Category::OtherData => "Other Data",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_label())
    }
}

/// A data type page inside a category.
///
/// The well-known types are constants; callers may build their own with
/// [`SampleType::new`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SampleType {
    category: Category,
    display_label: Cow<'static, str>,
    type_identifier: Cow<'static, str>,
}

impl SampleType {
    pub const ACTIVE_ENERGY: SampleType = SampleType::well_known(
        Category::Activity,
        "Active Energy",
        "HKQuantityTypeIdentifierActiveEnergyBurned",
    );
    pub const RESTING_HEART_RATE: SampleType = SampleType::well_known(
        Category::Heart,
        "Resting Heart Rate",
        "HKQuantityTypeIdentifierRestingHeartRate",
    );
    pub const ELECTROCARDIOGRAMS: SampleType = SampleType::well_known(
        Category::Heart,
        "Electrocardiograms (ECG)",
        "HKDataTypeIdentifierElectrocardiogram",
    );
    pub const STEPS: SampleType = SampleType::well_known(
        Category::Activity,
        "Steps",
        "HKQuantityTypeIdentifierStepCount",
    );
    pub const PUSHES: SampleType = SampleType::well_known(
        Category::Activity,
        "Pushes",
        "HKQuantityTypeIdentifierPushCount",
    );

    const fn well_known(
        category: Category,
        display_label: &'static str,
        type_identifier: &'static str,
    ) -> Self {
        Self {
            category,
            display_label: Cow::Borrowed(display_label),
            type_identifier: Cow::Borrowed(type_identifier),
        }
    }

    pub fn new(
        category: Category,
        display_label: impl Into<String>,
        type_identifier: impl Into<String>,
    ) -> Self {
        Self {
            category,
            display_label: Cow::Owned(display_label.into()),
            type_identifier: Cow::Owned(type_identifier.into()),
        }
    }

    /// Every well-known sample type.
    pub fn all() -> &'static [SampleType] {
        &ALL_SAMPLE_TYPES
    }

    pub fn category(&self) -> Category {
        self.category
    }

    pub fn display_label(&self) -> &str {
        &self.display_label
    }

    /// Backend type identifier. Only used to match on-screen diagnostic
    /// text, never to drive navigation.
    pub fn type_identifier(&self) -> &str {
        &self.type_identifier
    }
}

static ALL_SAMPLE_TYPES: [SampleType; 5] = [
    SampleType::ACTIVE_ENERGY,
    SampleType::RESTING_HEART_RATE,
    SampleType::ELECTROCARDIOGRAMS,
    SampleType::STEPS,
    SampleType::PUSHES,
];

/// Clinical record types offered on the Health Records sharing sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HealthRecordType {
    Allergy,
    ClinicalNote,
    VitalSign,
    Condition,
    Immunization,
    Coverage,
    LabResult,
    Medication,
    Procedure,
}

impl HealthRecordType {
    pub const ALL: [HealthRecordType; 9] = [
        HealthRecordType::Allergy,
        HealthRecordType::ClinicalNote,
        HealthRecordType::VitalSign,
        HealthRecordType::Condition,
        HealthRecordType::Immunization,
        HealthRecordType::Coverage,
        HealthRecordType::LabResult,
        HealthRecordType::Medication,
        HealthRecordType::Procedure,
    ];

    /// Label of the record type's switch on the authorization sheet.
    pub fn display_label(&self) -> &'static str {
        match self {
            HealthRecordType::Allergy => "Allergies",
            HealthRecordType::ClinicalNote => "Clinical Notes",
            HealthRecordType::VitalSign => "Clinical Vitals",
            HealthRecordType::Condition => "Conditions",
            HealthRecordType::Immunization => "Immunizations",
            HealthRecordType::Coverage => "Insurance",
            HealthRecordType::LabResult => "Lab Results",
            HealthRecordType::Medication => "Medications",
            HealthRecordType::Procedure => "Procedures",
        }
    }

    pub fn type_identifier(&self) -> &'static str {
        match self {
            HealthRecordType::Allergy => "HKClinicalTypeIdentifierAllergyRecord",
            HealthRecordType::ClinicalNote => "HKClinicalTypeIdentifierClinicalNoteRecord",
            HealthRecordType::VitalSign => "HKClinicalTypeIdentifierVitalSignRecord",
            HealthRecordType::Condition => "HKClinicalTypeIdentifierConditionRecord",
            HealthRecordType::Immunization => "HKClinicalTypeIdentifierImmunizationRecord",
            HealthRecordType::Coverage => "HKClinicalTypeIdentifierCoverageRecord",
            HealthRecordType::LabResult => "HKClinicalTypeIdentifierLabResultRecord",
            HealthRecordType::Medication => "HKClinicalTypeIdentifierMedicationRecord",
            HealthRecordType::Procedure => "HKClinicalTypeIdentifierProcedureRecord",
        }
    }
}

/// Mock institution accounts available in the simulator's Health Records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HealthRecordAccount {
    SampleA,
    SampleB,
    SampleC,
}

impl HealthRecordAccount {
    pub const ALL: [HealthRecordAccount; 3] = [
        HealthRecordAccount::SampleA,
        HealthRecordAccount::SampleB,
        HealthRecordAccount::SampleC,
    ];

    fn letter(&self) -> &'static str {
        match self {
            HealthRecordAccount::SampleA => "A",
            HealthRecordAccount::SampleB => "B",
            HealthRecordAccount::SampleC => "C",
        }
    }

    pub fn institution_name(&self) -> String {
        format!("Sample Institution {}", self.letter())
    }

    pub fn location_name(&self) -> String {
        format!("Sample Location {}", self.letter())
    }
}

/// Fixed set of pages, each with a canned value to enter.
/// Prefer building a [`SampleInput`] directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HealthAppDataType {
    ActiveEnergy,
    RestingHeartRate,
    Electrocardiograms,
    Steps,
    Pushes,
}

impl HealthAppDataType {
    pub const ALL: [HealthAppDataType; 5] = [
        HealthAppDataType::ActiveEnergy,
        HealthAppDataType::RestingHeartRate,
        HealthAppDataType::Electrocardiograms,
        HealthAppDataType::Steps,
        HealthAppDataType::Pushes,
    ];

    pub fn sample_type(&self) -> SampleType {
        match self {
            HealthAppDataType::ActiveEnergy => SampleType::ACTIVE_ENERGY,
            HealthAppDataType::RestingHeartRate => SampleType::RESTING_HEART_RATE,
            HealthAppDataType::Electrocardiograms => SampleType::ELECTROCARDIOGRAMS,
            HealthAppDataType::Steps => SampleType::STEPS,
            HealthAppDataType::Pushes => SampleType::PUSHES,
        }
    }

    pub fn default_sample(&self) -> SampleInput {
        let value_entry = match self {
            HealthAppDataType::ActiveEnergy => ValueEntry::numeric_in(
                52.0,
                LabelPredicate::AnyOf(vec![
                    LabelPredicate::like("cal"),
                    LabelPredicate::like("kcal"),
                ]),
            ),
            HealthAppDataType::RestingHeartRate => ValueEntry::numeric(80.0),
            HealthAppDataType::Electrocardiograms => ValueEntry::choice("High Heart Rate"),
            HealthAppDataType::Steps => ValueEntry::numeric(75.0),
            HealthAppDataType::Pushes => ValueEntry::numeric(85.0),
        };
        SampleInput::new(self.sample_type(), value_entry)
    }
}
