//! US Core resource type names.
//!
//! The server only needs resource type *names*; the field-level structure of
//! each resource is owned by the FHIR standard and never inspected here.
//!
//! See: <https://hl7.org/fhir/us/core/#us-core-profiles>

/// Resource types covered by the US Core profiles, in alphabetical order.
pub const US_CORE_RESOURCE_TYPES: &[&str] = &[
    "AllergyIntolerance",
    "CarePlan",
    "CareTeam",
    "Condition",
    "Device",
    "DiagnosticReport",
    "DocumentReference",
    "Encounter",
    "Goal",
    "Immunization",
    "Location",
    "Medication",
    "MedicationDispense",
    "MedicationRequest",
    "Observation",
    "Organization",
    "Patient",
    "Practitioner",
    "PractitionerRole",
    "Procedure",
    "Provenance",
    "QuestionnaireResponse",
    "RelatedPerson",
    "ServiceRequest",
    "Specimen",
];

/// FHIR release implemented by the server.
pub const FHIR_VERSION: &str = "4.0.1";
