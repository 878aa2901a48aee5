use autograde_core::ResultsPayload;

pub const SYSTEM_PROMPT: &str = "You are a direct, knowledgeable programming instructor providing feedback on student code submissions.
Give specific, actionable feedback in 2-3 sentences per graded section.
Focus on what the student did wrong and how to fix it, or what they did well if they succeeded.
Be direct and technical - avoid unnecessary encouragement.";

const OUTPUT_LIMIT: usize = 500;

const RESPONSE_FORMAT: &str = r#"

Provide feedback in the following JSON format:
{
    "overall": "2-3 sentences of direct overall assessment focusing on key strengths or weaknesses",
    "tests": {
        "test_name_1": "2-3 sentences of specific feedback for this test",
        "test_name_2": "2-3 sentences of specific feedback for this test"
    }
}

For each test, analyze what the student did wrong (or right) and provide specific guidance.
If they failed, explain the likely issue and how to fix it.
If they succeeded, briefly note what they did well.
Focus on the code implementation, not just restating the scores."#;

#[derive(Debug, Clone, PartialEq)]
pub struct TestSummary {
    pub name: String,
    pub score: f64,
    pub max_score: f64,
    pub output: String,
}

pub fn summarize_tests(results: &ResultsPayload) -> Vec<TestSummary> {
    results
        .tests
        .iter()
        .map(|t| TestSummary {
            name: t.name.clone(),
            score: t.score,
            max_score: t.max_score,
            output: t.output.chars().take(OUTPUT_LIMIT).collect(),
        })
        .collect()
}

pub fn feedback_prompt(summaries: &[TestSummary], student_code: &str) -> String {
    let mut prompt = format!(
        "Analyze this student's code submission and provide feedback based on the autograder results.\n\n\
         STUDENT CODE:\n```python\n{}\n```\n\nAUTOGRADER RESULTS:\n",
        student_code
    );

    for test in summaries {
        prompt.push_str(&format!(
            "\n{}: {}/{} points",
            test.name, test.score, test.max_score
        ));
        if !test.output.is_empty() {
            prompt.push_str(&format!("\nAutograder output: {}\n", test.output));
        }
    }

    prompt.push_str(RESPONSE_FORMAT);
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use autograde_core::TestResult;
    use std::time::Duration;

    fn payload() -> ResultsPayload {
        ResultsPayload::new(
            vec![
                TestResult {
                    name: "simple convolution".into(),
                    score: 0.0,
                    max_score: 10.0,
                    output: "e".repeat(800),
                },
                TestResult {
                    name: "for loops".into(),
                    score: 0.0,
                    max_score: 0.0,
                    output: String::new(),
                },
            ],
            Duration::from_millis(10),
        )
    }

    #[test]
    fn test_summaries_cap_output() {
        let summaries = summarize_tests(&payload());
        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].output.len(), 500);
        assert_eq!(summaries[0].max_score, 10.0);
    }

    #[test]
    fn test_prompt_embeds_code_and_scores() {
        let prompt = feedback_prompt(&summarize_tests(&payload()), "def conv2d(): pass");

        assert!(prompt.contains("```python\ndef conv2d(): pass\n```"));
        assert!(prompt.contains("\nsimple convolution: 0/10 points\nAutograder output: eee"));
        assert!(prompt.contains("\nfor loops: 0/0 points"));
        assert!(!prompt.contains("for loops: 0/0 points\nAutograder output"));
        assert!(prompt.contains(r#""overall": "#));
    }
}
