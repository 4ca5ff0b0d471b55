use serde::{Deserialize, Serialize};

use super::domain::{FormAnswers, SessionError};
use super::export::ExportValue;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SurveyInput {
    Choice { options: &'static [&'static str] },
    Likert { min: i64, max: i64, default: i64 },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SurveyQuestion {
    pub key: &'static str,
    pub section: &'static str,
    pub prompt: &'static str,
    pub input: SurveyInput,
}

const PERCEPTION: &[&str] = &[
    "Minimizing overstock/waste",
    "Avoiding stockouts",
    "Both equal",
];
const INDUSTRIES: &[&str] = &[
    "Manufacturing",
    "Automotive",
    "Retail",
    "Logistics",
    "Pharma",
    "Other",
];
const COMPANY_SIZES: &[&str] = &["<50", "50-249", "250-999", "1000+"];
const EXPERIENCE: &[&str] = &[
    "0-1 years",
    "2-3 years",
    "4-6 years",
    "7-10 years",
    ">10 years",
];

const LIKERT: SurveyInput = SurveyInput::Likert {
    min: 1,
    max: 5,
    default: 3,
};

/// Closing questionnaire in export column order.
pub fn questions() -> Vec<SurveyQuestion> {
    vec![
        SurveyQuestion {
            key: "Perception_Check",
            section: "1. Decision Perception",
            prompt: "Which decision do you consider more environmentally friendly?",
            input: SurveyInput::Choice {
                options: PERCEPTION,
            },
        },
        SurveyQuestion {
            key: "Env_CO2",
            section: "2. Environmental Awareness (1-5)",
            prompt: "CO2 reduction is important to me.",
            input: LIKERT,
        },
        SurveyQuestion {
            key: "Env_Lifecycle",
            section: "2. Environmental Awareness (1-5)",
            prompt: "I consider full product life cycle.",
            input: LIKERT,
        },
        SurveyQuestion {
            key: "Env_Certifications",
            section: "2. Environmental Awareness (1-5)",
            prompt: "I prioritize environmental certifications.",
            input: LIKERT,
        },
        SurveyQuestion {
            key: "Env_HigherCost",
            section: "2. Environmental Awareness (1-5)",
            prompt: "I accept higher costs for eco-performance.",
            input: LIKERT,
        },
        SurveyQuestion {
            key: "Env_ReduceWaste",
            section: "2. Environmental Awareness (1-5)",
            prompt: "I aim to reduce waste to avoid harm.",
            input: LIKERT,
        },
        SurveyQuestion {
            key: "Industry",
            section: "3. Demographics",
            prompt: "Industry",
            input: SurveyInput::Choice {
                options: INDUSTRIES,
            },
        },
        SurveyQuestion {
            key: "CompanySize",
            section: "3. Demographics",
            prompt: "Company Size",
            input: SurveyInput::Choice {
                options: COMPANY_SIZES,
            },
        },
        SurveyQuestion {
            key: "Experience",
            section: "3. Demographics",
            prompt: "Experience",
            input: SurveyInput::Choice {
                options: EXPERIENCE,
            },
        },
    ]
}

/// Validated survey responses, kept in question order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SurveyAnswers(Vec<(String, ExportValue)>);

impl SurveyAnswers {
    pub fn entries(&self) -> &[(String, ExportValue)] {
        &self.0
    }

    pub fn get(&self, key: &str) -> Option<&ExportValue> {
        self.0
            .iter()
            .find(|(candidate, _)| candidate == key)
            .map(|(_, value)| value)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

pub fn validate(answers: &FormAnswers) -> Result<SurveyAnswers, SessionError> {
    let mut entries = Vec::new();
    for question in questions() {
        let raw = answers.get(question.key).ok_or_else(|| {
            SessionError::Validation(format!("please answer '{}'", question.prompt))
        })?;

        let value = match &question.input {
            SurveyInput::Choice { options } => {
                let text = raw.text();
                if !options.contains(&text.as_str()) {
                    return Err(SessionError::Validation(format!(
                        "'{text}' is not an option for '{}'",
                        question.prompt
                    )));
                }
                ExportValue::Text(text)
            }
            SurveyInput::Likert { min, max, .. } => match raw.integer() {
                Some(level) if (*min..=*max).contains(&level) => ExportValue::Integer(level),
                _ => {
                    return Err(SessionError::Validation(format!(
                        "'{}' needs a rating between {min} and {max}",
                        question.prompt
                    )))
                }
            },
        };
        entries.push((question.key.to_string(), value));
    }
    Ok(SurveyAnswers(entries))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::study::domain::FormValue;

    fn complete_answers() -> FormAnswers {
        let mut answers = FormAnswers::new();
        answers.insert(
            "Perception_Check".to_string(),
            FormValue::from("Both equal"),
        );
        for key in [
            "Env_CO2",
            "Env_Lifecycle",
            "Env_Certifications",
            "Env_HigherCost",
            "Env_ReduceWaste",
        ] {
            answers.insert(key.to_string(), FormValue::Integer(4));
        }
        answers.insert("Industry".to_string(), FormValue::from("Retail"));
        answers.insert("CompanySize".to_string(), FormValue::from("50-249"));
        answers.insert("Experience".to_string(), FormValue::from("2-3 years"));
        answers
    }

    #[test]
    fn complete_survey_keeps_question_order() {
        let validated = validate(&complete_answers()).expect("survey validates");
        let keys: Vec<&str> = validated
            .entries()
            .iter()
            .map(|(key, _)| key.as_str())
            .collect();
        let expected: Vec<&str> = questions().iter().map(|question| question.key).collect();
        assert_eq!(keys, expected);
        assert_eq!(validated.get("Env_CO2"), Some(&ExportValue::Integer(4)));
        assert_eq!(
            validated.get("Industry"),
            Some(&ExportValue::Text("Retail".to_string()))
        );
    }

    #[test]
    fn likert_accepts_text_digits() {
        let mut answers = complete_answers();
        answers.insert("Env_CO2".to_string(), FormValue::from("5"));
        let validated = validate(&answers).expect("survey validates");
        assert_eq!(validated.get("Env_CO2"), Some(&ExportValue::Integer(5)));
    }

    #[test]
    fn likert_out_of_range_is_rejected() {
        let mut answers = complete_answers();
        answers.insert("Env_HigherCost".to_string(), FormValue::Integer(6));
        assert!(matches!(
            validate(&answers),
            Err(SessionError::Validation(_))
        ));
    }

    #[test]
    fn missing_demographics_are_rejected() {
        let mut answers = complete_answers();
        answers.remove("Experience");
        assert!(matches!(
            validate(&answers),
            Err(SessionError::Validation(_))
        ));
    }

    #[test]
    fn unknown_choice_is_rejected() {
        let mut answers = complete_answers();
        answers.insert("CompanySize".to_string(), FormValue::from("huge"));
        assert!(matches!(
            validate(&answers),
            Err(SessionError::Validation(_))
        ));
    }
}
