//! Heuristic quality checks of chat completions.

use std::{borrow::Cow, time::Instant};

use serde::Serialize;
use telemetry::{EvaluationRecord, Recorders};

use crate::instrument::SYSTEM;

pub const EVALUATION_NAME: &str = "heuristic_eval";

/// Value of the criteria attribute, one short name per check.
pub const CRITERIA: [&str; 4] = ["content", "length", "uniqueness", "coherence"];

const MIN_LENGTH: usize = 10;
const MIN_WORDS: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Criteria {
    pub has_content: bool,
    pub reasonable_length: bool,
    pub not_just_input: bool,
    pub has_spaces: bool,
    pub not_gibberish: bool,
}

impl Criteria {
    fn check(prompt: &str, output: &str) -> Self {
        let output = output.trim();
        let prompt = prompt.trim();

        Self {
            has_content: !output.is_empty(),
            reasonable_length: output.chars().count() > MIN_LENGTH,
            not_just_input: output.to_lowercase() != prompt.to_lowercase(),
            has_spaces: output.contains(' '),
            not_gibberish: output.split_whitespace().count() > MIN_WORDS,
        }
    }

    fn met(&self) -> usize {
        [
            self.has_content,
            self.reasonable_length,
            self.not_just_input,
            self.has_spaces,
            self.not_gibberish,
        ]
        .into_iter()
        .filter(|met| *met)
        .count()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Evaluation {
    pub score: f64,
    pub passed: bool,
    /// Seconds spent evaluating.
    pub duration: f64,
    pub criteria: Criteria,
}

#[derive(Clone)]
pub struct Evaluator {
    recorders: Recorders,
    pass_threshold: f64,
}

impl Evaluator {
    pub fn new(recorders: Recorders, pass_threshold: f64) -> Self {
        Self {
            recorders,
            pass_threshold,
        }
    }

    /// Score `output` as an answer to `prompt` and record the result on every path.
    pub fn evaluate(&self, prompt: &str, output: &str, model: &str, user_id: Option<&str>) -> Evaluation {
        let start = Instant::now();

        let criteria = Criteria::check(prompt, output);
        let score = criteria.met() as f64 / 5.0;
        let passed = score >= self.pass_threshold;

        let duration = start.elapsed();

        self.recorders.record_evaluation(&EvaluationRecord {
            system: Cow::Borrowed(SYSTEM),
            request_model: model.to_string(),
            name: EVALUATION_NAME.to_string(),
            criteria: CRITERIA.iter().map(|name| name.to_string()).collect(),
            score,
            passed,
            duration,
            user_id: user_id.map(str::to_owned),
        });

        log::debug!("Evaluated response of {model}: score {score}, passed {passed}");

        Evaluation {
            score,
            passed,
            duration: duration.as_secs_f64(),
            criteria,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use telemetry::{OperationRecord, Origin, Recorder};

    use super::*;

    #[derive(Default)]
    struct Captured(Mutex<Vec<EvaluationRecord>>);

    impl Recorder for Captured {
        fn origin(&self) -> Origin {
            Origin::OpenTelemetry
        }

        fn record_operation(&self, _: &OperationRecord) {}

        fn record_evaluation(&self, record: &EvaluationRecord) {
            self.0.lock().unwrap().push(record.clone());
        }
    }

    fn evaluator() -> (Evaluator, Arc<Captured>) {
        let captured = Arc::new(Captured::default());
        let recorders = Recorders::new(vec![captured.clone() as Arc<dyn Recorder>]);

        (Evaluator::new(recorders, 0.6), captured)
    }

    #[test]
    fn good_answer_meets_every_criterion() {
        let (evaluator, captured) = evaluator();

        let evaluation = evaluator.evaluate(
            "What is Rust?",
            "Rust is a systems programming language.",
            "gpt-4",
            Some("u1"),
        );

        assert_eq!(evaluation.score, 1.0);
        assert!(evaluation.passed);

        let records = captured.0.lock().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name, "heuristic_eval");
        assert_eq!(records[0].criteria.join(","), "content,length,uniqueness,coherence");
        assert_eq!(records[0].request_model, "gpt-4");
        assert_eq!(records[0].user_id.as_deref(), Some("u1"));
        assert!(records[0].passed);
    }

    #[test]
    fn echoed_prompt_fails() {
        let (evaluator, _) = evaluator();

        let evaluation = evaluator.evaluate("Hello", "  hello ", "gpt-4", None);

        insta::assert_debug_snapshot!(evaluation.criteria, @r"
        Criteria {
            has_content: true,
            reasonable_length: false,
            not_just_input: false,
            has_spaces: false,
            not_gibberish: false,
        }
        ");

        assert_eq!(evaluation.score, 0.2);
        assert!(!evaluation.passed);
    }

    #[test]
    fn empty_output_only_differs_from_the_prompt() {
        let (evaluator, _) = evaluator();

        let evaluation = evaluator.evaluate("Hi", "", "gpt-4", None);
        assert_eq!(evaluation.score, 0.2);

        let evaluation = evaluator.evaluate("", "   ", "gpt-4", None);
        assert_eq!(evaluation.score, 0.0);
        assert!(!evaluation.passed);
    }

    #[test]
    fn threshold_is_inclusive() {
        let (evaluator, _) = evaluator();

        // content, uniqueness, spaces: 3 of 5
        let evaluation = evaluator.evaluate("Hi", "a b", "gpt-4", None);

        assert_eq!(evaluation.score, 0.6);
        assert!(evaluation.passed);
    }
}
