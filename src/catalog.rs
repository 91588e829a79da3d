//! Read-only reference data served by the case-data provider. The core never
//! mutates these; they are cached by id once loaded.

use serde::{Deserialize, Serialize};

use crate::model::{CaseId, CategoryId};

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub description: String,
    pub icon_url: Option<String>,
    pub background_url: Option<String>,
    pub is_available: bool,
    #[serde(default)]
    pub coming_soon: bool,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CaseSummary {
    pub id: CaseId,
    pub category_id: CategoryId,
    pub title: String,
    pub patient_name: String,
    pub patient_age: u8,
    pub short_description: String,
    pub is_available: bool,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PatientNote {
    pub title: String,
    pub content: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PatientStory {
    pub id: String,
    pub title: String,
    pub content: String,
    pub background_image: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosisOption {
    pub id: String,
    pub name: String,
    pub is_correct: bool,
    pub explanation: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TreatmentOption {
    pub id: String,
    pub name: String,
    pub description: String,
    pub outcomes: String,
    pub is_recommended: bool,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ExpertCommentary {
    pub title: String,
    pub basic_content: String,
    pub extended_content: String,
    pub video_url: Option<String>,
}

/// Everything a case's stage screens need, denormalized into one bundle.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CaseDetail {
    pub id: CaseId,
    pub category_id: CategoryId,
    pub title: String,
    pub patient_name: String,
    pub patient_age: u8,
    pub full_description: String,
    pub patient_notes: Vec<PatientNote>,
    pub patient_stories: Vec<PatientStory>,
    pub consultation_chat_id: Option<String>,
    pub diagnosis_options: Vec<DiagnosisOption>,
    pub treatment_options: Vec<TreatmentOption>,
    pub expert_commentary: ExpertCommentary,
}

impl CaseDetail {
    pub fn diagnosis_option(&self, option_id: &str) -> Option<&DiagnosisOption> {
        self.diagnosis_options.iter().find(|o| o.id == option_id)
    }

    pub fn treatment_option(&self, option_id: &str) -> Option<&TreatmentOption> {
        self.treatment_options.iter().find(|o| o.id == option_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_decodes_host_shape() {
        let raw = r#"{
            "id": "mood-disorders",
            "name": "Mood Disorders",
            "description": "Depression, bipolar and related conditions",
            "iconUrl": "/icons/mood.png",
            "backgroundUrl": null,
            "isAvailable": true
        }"#;

        let category: Category = serde_json::from_str(raw).unwrap();
        assert_eq!(category.id.as_str(), "mood-disorders");
        assert!(category.is_available);
        assert!(!category.coming_soon);
    }

    #[test]
    fn case_summary_decodes_host_shape() {
        let raw = r#"{
            "id": "postpartum-depression",
            "categoryId": "mood-disorders",
            "title": "Postpartum depression",
            "patientName": "Anna",
            "patientAge": 29,
            "shortDescription": "Low mood after childbirth",
            "isAvailable": true
        }"#;

        let case: CaseSummary = serde_json::from_str(raw).unwrap();
        assert_eq!(case.category_id.as_str(), "mood-disorders");
        assert_eq!(case.patient_age, 29);
    }

    #[test]
    fn option_lookup_by_id() {
        let detail = sample_detail();

        let option = detail.diagnosis_option("dx-2").unwrap();
        assert!(option.is_correct);
        assert!(detail.diagnosis_option("missing").is_none());

        let option = detail.treatment_option("tx-1").unwrap();
        assert!(option.is_recommended);
    }

    fn sample_detail() -> CaseDetail {
        CaseDetail {
            id: CaseId::new("postpartum-depression"),
            category_id: CategoryId::new("mood-disorders"),
            title: "Postpartum depression".into(),
            patient_name: "Anna".into(),
            patient_age: 29,
            full_description: "Persistent low mood six weeks after childbirth".into(),
            patient_notes: vec![PatientNote {
                title: "Intake note".into(),
                content: "Reports anhedonia and poor sleep".into(),
            }],
            patient_stories: vec![PatientStory {
                id: "story-1".into(),
                title: "First weeks".into(),
                content: "It started slowly".into(),
                background_image: None,
            }],
            consultation_chat_id: Some("chat-ppd".into()),
            diagnosis_options: vec![
                DiagnosisOption {
                    id: "dx-1".into(),
                    name: "Adjustment disorder".into(),
                    is_correct: false,
                    explanation: "Duration and severity exceed adjustment criteria".into(),
                },
                DiagnosisOption {
                    id: "dx-2".into(),
                    name: "Postpartum depression".into(),
                    is_correct: true,
                    explanation: "Onset within the postpartum window with core symptoms".into(),
                },
            ],
            treatment_options: vec![TreatmentOption {
                id: "tx-1".into(),
                name: "Psychotherapy with SSRI".into(),
                description: "Combined first-line treatment".into(),
                outcomes: "Remission expected within weeks".into(),
                is_recommended: true,
            }],
            expert_commentary: ExpertCommentary {
                title: "Expert review".into(),
                basic_content: "Classic presentation".into(),
                extended_content: "Screening should be routine postpartum".into(),
                video_url: None,
            },
        }
    }
}
