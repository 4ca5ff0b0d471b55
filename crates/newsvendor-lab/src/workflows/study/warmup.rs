use serde::Serialize;

use super::domain::{FormAnswers, SessionError};
use super::scoring::Pricing;

pub const QUESTION_COUNT: u8 = 3;

/// A comprehension question shown before the ordering rounds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WarmupQuestion {
    pub key: &'static str,
    pub heading: String,
    pub prompt: String,
    pub options: Vec<String>,
    #[serde(skip)]
    pub correct: String,
}

pub fn questions(pricing: Pricing) -> Vec<WarmupQuestion> {
    vec![
        WarmupQuestion {
            key: "q1_units_sold",
            heading: "1. If you order 100 tires but demand is only 80:".to_string(),
            prompt: "How many tires do you actually sell?".to_string(),
            options: vec!["100".to_string(), "80".to_string(), "20".to_string()],
            correct: "80".to_string(),
        },
        WarmupQuestion {
            key: "q2_leftover",
            heading: "2. In the same scenario (Order 100, Demand 80):".to_string(),
            prompt: "What happens to the leftover 20 tires?".to_string(),
            options: vec![
                "We keep them for next week".to_string(),
                "They are thrown away (Waste)".to_string(),
            ],
            correct: "They are thrown away (Waste)".to_string(),
        },
        WarmupQuestion {
            key: "q3_unit_profit",
            heading: "3. Profit Calculation:".to_string(),
            prompt: format!(
                "You buy a tire for ${} and sell it for ${}. What is the profit per tire?",
                pricing.cost, pricing.price
            ),
            options: vec![
                format!("${}", pricing.price),
                format!("${}", pricing.unit_margin()),
                format!("${}", pricing.cost),
            ],
            correct: format!("${}", pricing.unit_margin()),
        },
    ]
}

/// Checks that every question has a listed answer and counts the correct ones.
pub fn grade(answers: &FormAnswers, pricing: Pricing) -> Result<u8, SessionError> {
    let mut score = 0u8;
    for question in questions(pricing) {
        let answer = answers
            .get(question.key)
            .map(|value| value.text())
            .filter(|value| !value.is_empty())
            .ok_or_else(|| {
                SessionError::Validation(format!("please answer question '{}'", question.prompt))
            })?;

        if !question.options.iter().any(|option| *option == answer) {
            return Err(SessionError::Validation(format!(
                "'{answer}' is not an option for '{}'",
                question.prompt
            )));
        }

        if answer == question.correct {
            score += 1;
        }
    }
    Ok(score.min(QUESTION_COUNT))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::study::domain::FormValue;

    const PRICING: Pricing = Pricing {
        price: 10,
        cost: 3,
    };

    fn answers(q1: &str, q2: &str, q3: &str) -> FormAnswers {
        let mut answers = FormAnswers::new();
        answers.insert("q1_units_sold".to_string(), FormValue::from(q1));
        answers.insert("q2_leftover".to_string(), FormValue::from(q2));
        answers.insert("q3_unit_profit".to_string(), FormValue::from(q3));
        answers
    }

    #[test]
    fn canonical_answers_score_three() {
        let score = grade(
            &answers("80", "They are thrown away (Waste)", "$7"),
            PRICING,
        )
        .expect("valid answers");
        assert_eq!(score, 3);
    }

    #[test]
    fn each_wrong_answer_costs_one_point() {
        let one_wrong = grade(&answers("100", "They are thrown away (Waste)", "$7"), PRICING);
        let two_wrong = grade(&answers("100", "We keep them for next week", "$7"), PRICING);
        let all_wrong = grade(&answers("20", "We keep them for next week", "$3"), PRICING);
        assert_eq!(one_wrong, Ok(2));
        assert_eq!(two_wrong, Ok(1));
        assert_eq!(all_wrong, Ok(0));
    }

    #[test]
    fn numeric_json_answers_are_accepted() {
        let mut submitted = answers("", "They are thrown away (Waste)", "$7");
        submitted.insert("q1_units_sold".to_string(), FormValue::Integer(80));
        assert_eq!(grade(&submitted, PRICING), Ok(3));
    }

    #[test]
    fn missing_answer_is_a_validation_error() {
        let mut submitted = answers("80", "They are thrown away (Waste)", "$7");
        submitted.remove("q2_leftover");
        assert!(matches!(
            grade(&submitted, PRICING),
            Err(SessionError::Validation(_))
        ));
    }

    #[test]
    fn unknown_option_is_a_validation_error() {
        let submitted = answers("85", "They are thrown away (Waste)", "$7");
        assert!(matches!(
            grade(&submitted, PRICING),
            Err(SessionError::Validation(_))
        ));
    }

    #[test]
    fn profit_question_follows_pricing() {
        let pricing = Pricing { price: 12, cost: 5 };
        let profit_question = &questions(pricing)[2];
        assert_eq!(profit_question.correct, "$7");
        assert!(profit_question.prompt.contains("$5"));
        assert!(profit_question.options.contains(&"$12".to_string()));
    }
}
