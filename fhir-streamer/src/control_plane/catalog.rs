//! Built-in resource route catalog.
//!
//! Destination topics, route ids, trigger names and audit details are part of the downstream
//! contract: topic consumers and audit consumers read them as-is, so they keep their historical
//! spellings (`FHIRSvr_AllergyIntellorance`, `FHIRQuestionaire`, `account message received`,
//! `Medication Statement message received` on MedicationAdministration, ...).
//!
//! Departures from the historical deployment:
//!
//! * ClinicalImpression was registered under CodeSystem's route id; it gets
//!   `FHIRClinicalImpression` so route ids stay unique.
//! * Keys use the FHIR resource names and endpoints are the lower-cased key. Historical
//!   endpoints such as `alergyintollerance`, `clincialimpression`, `fhirrcoverage` and the
//!   `fhir`-prefixed financial paths are not bound.
//! * AllergyIntolerance carries the `FHIR` industry tag like every other route.

use crate::descriptor::{ResourceProfile, ResourceRouteDescriptor};

/// `(key, destination topic, route id, trigger name, audit details)`
type CatalogRow = (
    &'static str,
    &'static str,
    &'static str,
    &'static str,
    &'static str,
);

const CLINICAL_ROUTES: &[CatalogRow] = &[
    (
        "AdverseEvent",
        "FHIRSvr_AdverseEvent",
        "FHIRAdverseEvent",
        "AdverseEvent",
        "Adverse Event message received",
    ),
    (
        "AllergyIntolerance",
        "FHIRSvr_AllergyIntellorance",
        "FHIRAllergyIntollerance",
        "AllergyIntollerance",
        "Allergy Intollerance message received",
    ),
    (
        "Appointment",
        "FHIRSvr_Appointment",
        "FHIRAppointment",
        "Appointment",
        "Appointment message received",
    ),
    (
        "AppointmentResponse",
        "FHIRSvr_AppointmentResponse",
        "FHIRAppointmentResponse",
        "AppointmentResponse",
        "Appointment Response message received",
    ),
    ("CarePlan", "FHIRSvr_CarePlan", "FHIRCarePlan", "CarePlan", "CarePlan message received"),
    ("CareTeam", "FHIRSvr_CareTeam", "FHIRCareTeam", "CareTeam", "CareTeam message received"),
    (
        "CodeSystem",
        "FHIRSvr_CodeSystem",
        "FHIRCodeSystem",
        "CodeSystem",
        "CodeSystem message received",
    ),
    ("Consent", "FHIRSvr_Consent", "FHIRConsent", "Consent", "Consent message received"),
    (
        "ClinicalImpression",
        "FHIRSvr_ClinicalImpression",
        "FHIRClinicalImpression",
        "ClinicalImpression",
        "ClinicalImpression message received",
    ),
    (
        "Communication",
        "FHIRSvr_Communication",
        "FHIRCommunication",
        "Communication",
        "Communication message received",
    ),
    ("Condition", "FHIRSvr_Condition", "FHIRCondition", "Condition", "Condition message received"),
    (
        "DetectedIssue",
        "FHIRSvr_DetectedIssue",
        "FHIRDetectedIssue",
        "DetectedIssue",
        "Detected Issue message received",
    ),
    ("Device", "FHIRSvr_Device", "FHIRDevice", "Device", "Device message received"),
    (
        "DeviceRequest",
        "FHIRSvr_DeviceRequest",
        "FHIRDeviceRequest",
        "DeviceRequest",
        "Device Request message received",
    ),
    (
        "DeviceUseStatement",
        "FHIRSvr_DeviceUseStatement",
        "FHIRDeviceUseStatement",
        "DeviceUseStatement",
        "Device Use Statement message received",
    ),
    (
        "DiagnosticResult",
        "FHIRSvr_DeviceResult",
        "FHIRDiagnosticResult",
        "DiagnosticResult",
        "DiagnosticResult message received",
    ),
    (
        "EffectEvidenceSynthesis",
        "FHIRSvr_EffectEvidenceSynthesis",
        "FHIREffectEvidenceSynthesis",
        "EffectEvidenceSynthesis",
        "Effect Evidence Synthesis message received",
    ),
    ("Encounter", "FHIRSvr_Encounter", "FHIREncounter", "Encounter", "Encounter message received"),
    (
        "EpisodeOfCare",
        "FHIRSvr_EpisodeOfCare",
        "FHIREpisodeOfCare",
        "EpisodeOfCare",
        "EpisodeOfCare message received",
    ),
    ("Evidence", "FHIRSvr_Evidence", "FHIREvidence", "Evidence", "Evidence message received"),
    (
        "EvidenceVariable",
        "FHIRSvr_EvidenceVariable",
        "FHIREvidenceVariable",
        "EvidenceVariable",
        "Evidence Variable message received",
    ),
    ("Goal", "FHIRSvr_Goal", "FHIRGoal", "Goal", "Goal message received"),
    (
        "HealthcareService",
        "FHIRSvr_HealthcareService",
        "FHIRHealthcareService",
        "HealthcareService",
        "HealthcareService message received",
    ),
    (
        "ImagingStudy",
        "FHIRSvr_ImagingStudy",
        "FHIRImagingStudy",
        "ImagingStudy",
        "Imaging Study message received",
    ),
    ("Location", "FHIRSvr_Location", "FHIRLocation", "Location", "Location message received"),
    ("Measure", "FHIRSvr_Measure", "FHIRMeasure", "Measure", "Measure message received"),
    (
        "MeasureReport",
        "FHIRSvr_MeasureReport",
        "FHIRMeasureReport",
        "MeasureReport",
        "Measure Report message received",
    ),
    (
        "MedicationRequest",
        "FHIRSvr_MedicationRequest",
        "FHIRMedicationRequest",
        "MedicationRequest",
        "Medication Request message received",
    ),
    (
        "MedicationAdministration",
        "FHIRSvr_MedicationAdministration",
        "FHIRMedicationAdministration",
        "MedicationAdministration",
        "Medication Statement message received",
    ),
    (
        "Observation",
        "FHIRSvr_Observation",
        "FHIRObservation",
        "Observation",
        "Observation message received",
    ),
    ("Order", "FHIRSvr_Order", "FHIROrder", "Order", "Order message received"),
    (
        "Organization",
        "FHIRSvr_Organization",
        "FHIROrganization",
        "Organization",
        "Organization message received",
    ),
    (
        "OrganizationAffiliation",
        "FHIRSvr_OrganizationAffiliation",
        "FHIROrganizationAffiliation",
        "OrganizationAffiliation",
        "Organization Affiliation message received",
    ),
    ("Patient", "FHIRSvr_Patient", "FHIRPatient", "Patient", "Patient message received"),
    ("Person", "FHIRSvr_Person", "FHIRPerson", "Person", "Person message received"),
    (
        "Practitioner",
        "FHIRSvr_Practitioner",
        "FHIRPractitioner",
        "Practitioner",
        "Practitioner message received",
    ),
    ("Procedure", "FHIRSvr_Procedure", "FHIRProcedure", "Procedure", "Procedure message received"),
    (
        "Questionnaire",
        "FHIRSvrQuestionaire",
        "FHIRQuestionaire",
        "Questionaire",
        "Questionaire message received",
    ),
    (
        "QuestionnaireResponse",
        "FHIRSvrQuestionaireResponse",
        "FHIRQuestionaireResponse",
        "QuestionaireResponse",
        "Questionaire Response message received",
    ),
    (
        "ResearchElementDefinition",
        "FHIR_ResearchElementhDefinition",
        "FHIRResearchElementhDefinition",
        "ResearchElementDefinition",
        "Research Element Definition message received",
    ),
    (
        "ResearchDefinition",
        "FHIR_ResearchDefinition",
        "FHIRResearchDefinition",
        "ResearchDefinition",
        "Research Definition message received",
    ),
    (
        "ResearchStudy",
        "FHIR_ResearchStudy",
        "FHIRResearchStudy",
        "ResearchStudy",
        "Research Study message received",
    ),
    (
        "ResearchSubject",
        "FHIR_ResearchSubject",
        "FHIRResearchSubject",
        "ResearchSubject",
        "Research Subject message received",
    ),
    ("Schedule", "FHIR_Schedule", "FHIRSchedule", "Schedule", "Schedule message received"),
    (
        "ServiceRequest",
        "FHIR_ServiceRequest",
        "FHIRServiceRequest",
        "ServiceRequest",
        "Service Request message received",
    ),
    ("Specimen", "FHIR_Specimen", "FHIRSpecimen", "Specimen", "Specimen message received"),
    ("Substance", "FHIR_Sustance", "FHIRSubstance", "Substance", "Substance message received"),
    (
        "SupplyDelivery",
        "FHIR_SupplyDelivery",
        "FHIRSupplyDelivery",
        "SupplyDelivery",
        "Supply Delivery message received",
    ),
    (
        "SupplyRequest",
        "FHIR_SupplyRequest",
        "FHIRSupplyRequest",
        "SupplyRequest",
        "Supply Request message received",
    ),
    (
        "TestReport",
        "FHIR_TestReport",
        "FHIRTestReport",
        "TestReport",
        "Test Report message received",
    ),
    (
        "TestScript",
        "FHIR_TestScript",
        "FHIRTestScript",
        "TestScript",
        "Test Script message received",
    ),
    (
        "VerificationResult",
        "FHIR_VerificationResult",
        "FHIRVerificationResult",
        "VerificationResult",
        "Verification Result message received",
    ),
];

const FINANCIAL_ROUTES: &[CatalogRow] = &[
    ("Account", "FHIRSvr_Account", "FHIRAccount", "account", "account message received"),
    (
        "ChargeItem",
        "FHIRSvr_ChargeItem",
        "FHIRChargeItem",
        "chargeitem",
        "charge item message received",
    ),
    (
        "ChargeItemDefinition",
        "FHIRSvr_ChargeItemDefinintion",
        "FHIRChargeItemDefintion",
        "chargeitemdefinition",
        "charge item definition message received",
    ),
    ("Contract", "FHIRSvr_Contract", "FHIRContract", "contract", "contract message received"),
    ("Coverage", "FHIRSvr_Coverage", "FHIRCoverage", "coverage", "coverage message received"),
    (
        "CoverageEligibilityRequest",
        "FHIRSvr_CoverageEligibilityRequest",
        "FHIRCoverageEligibilityRequest",
        "coverageeligibilityrequest",
        "coverageeligibilityrequest message received",
    ),
    (
        "CoverageEligibilityResponse",
        "FHIRSvr_CoverageEligibilityResponse",
        "FHIRCoverageeligibilityresponse",
        "coverageeligibilityresponse",
        "coverageeligibilityresponse message received",
    ),
    (
        "EnrollmentRequest",
        "FHIRSvr_EnrollmentRequest",
        "FHIREnrollmentrequest",
        "enrollmentrequest",
        "Enrollment Request message received",
    ),
    (
        "EnrollmentResponse",
        "FHIRSvr_EnrollmentResponse",
        "FHIREnrollmentresponse",
        "enrollmentresponse",
        "Enroll Response message received",
    ),
    (
        "ExplanationOfBenefits",
        "FHIRSvr_ExplanationOfBenefits",
        "FHIRExplanationofbenefits",
        "explanationofbenefits",
        "explanationofbenefits message received",
    ),
    (
        "InsurancePlan",
        "FHIRSvr_InsurancePlan",
        "FHIRInsuranceplan",
        "insuranceplan",
        "insuranceplan message received",
    ),
    ("Claim", "FHIRSvr_Claim", "FHIRClaim", "claim", "Claim message received"),
    (
        "ClaimResponse",
        "FHIRSvr_ClaimResponse",
        "FHIRClaimresponse",
        "claimresponse",
        "claimresponse message received",
    ),
    ("Invoice", "FHIRSvr_Invoice", "FHIRInvoice", "invoice", "invoice message received"),
    (
        "PaymentNotice",
        "FHIRSvr_PaymentNotice",
        "FHIRPaymentnotice",
        "paymentnotice",
        "paymentnotice message received",
    ),
    (
        "PaymentReconciliation",
        "FHIRSvr_PaymentReconciliation",
        "FHIRPaymentreconciliation",
        "paymentreconciliation",
        "paymentreconciliation message received",
    ),
];

fn rows_to_descriptors(
    rows: &[CatalogRow],
    profile: ResourceProfile,
) -> impl Iterator<Item = ResourceRouteDescriptor> + '_ {
    rows.iter()
        .map(move |(key, topic, route_id, trigger_name, audit_details)| {
            ResourceRouteDescriptor::new(key, profile, topic)
                .with_route_id(route_id)
                .with_trigger_name(trigger_name)
                .with_audit_details(audit_details)
        })
}

/// Every built-in descriptor, clinical first.
pub(crate) fn builtin_descriptors() -> Vec<ResourceRouteDescriptor> {
    rows_to_descriptors(CLINICAL_ROUTES, ResourceProfile::Clinical)
        .chain(rows_to_descriptors(FINANCIAL_ROUTES, ResourceProfile::Financial))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{builtin_descriptors, CLINICAL_ROUTES, FINANCIAL_ROUTES};
    use crate::descriptor::ResourceProfile;

    #[test]
    fn builtin_descriptors_cover_both_profiles() {
        let descriptors = builtin_descriptors();

        assert_eq!(
            descriptors.len(),
            CLINICAL_ROUTES.len() + FINANCIAL_ROUTES.len()
        );
        assert!(descriptors
            .iter()
            .any(|d| d.profile() == ResourceProfile::Financial && d.key() == "Claim"));
        assert!(descriptors.iter().all(|d| d.industry_standard() == Some("FHIR")));
    }

    #[test]
    fn builtin_topics_keep_downstream_spellings() {
        let descriptors = builtin_descriptors();
        let topic_of = |key: &str| {
            descriptors
                .iter()
                .find(|d| d.key() == key)
                .map(|d| d.destination_topic().to_string())
        };

        assert_eq!(topic_of("Patient").as_deref(), Some("FHIRSvr_Patient"));
        assert_eq!(topic_of("Substance").as_deref(), Some("FHIR_Sustance"));
        assert_eq!(
            topic_of("AllergyIntolerance").as_deref(),
            Some("FHIRSvr_AllergyIntellorance")
        );
    }

    #[test]
    fn builtin_audit_fields_keep_downstream_spellings() {
        let descriptors = builtin_descriptors();
        let find = |key: &str| {
            descriptors
                .iter()
                .find(|d| d.key() == key)
                .expect("key is in the catalog")
        };

        let allergy = find("AllergyIntolerance");
        assert_eq!(allergy.route_id(), "FHIRAllergyIntollerance");
        assert_eq!(allergy.trigger_name(), "AllergyIntollerance");
        assert_eq!(allergy.audit_details(), "Allergy Intollerance message received");
        assert_eq!(allergy.endpoint(), "allergyintolerance");

        assert_eq!(
            find("MedicationAdministration").audit_details(),
            "Medication Statement message received"
        );
        assert_eq!(find("Questionnaire").route_id(), "FHIRQuestionaire");
        assert_eq!(
            find("CoverageEligibilityResponse").route_id(),
            "FHIRCoverageeligibilityresponse"
        );

        let account = find("Account");
        assert_eq!(account.trigger_name(), "account");
        assert_eq!(account.audit_details(), "account message received");
    }

    #[test]
    fn clinical_impression_no_longer_shares_code_system_route_id() {
        let descriptors = builtin_descriptors();
        let route_id_of = |key: &str| {
            descriptors
                .iter()
                .find(|d| d.key() == key)
                .map(|d| d.route_id().to_string())
        };

        assert_eq!(
            route_id_of("ClinicalImpression").as_deref(),
            Some("FHIRClinicalImpression")
        );
        assert_eq!(route_id_of("CodeSystem").as_deref(), Some("FHIRCodeSystem"));
    }
}
