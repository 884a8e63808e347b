use crate::backend::validation::ValidatedQuery;
use crate::error::GenerationError;
use tera::{Context, Tera};

const TEMPLATE_NAME: &str = "explanation";

const EXPLANATION_TEMPLATE: &str = r#"Please provide a detailed explanation in {{ explanation_language }} for the problem titled "{{ problem_title }}".
- Programming Language: {{ language }}
- Difficulty: {{ difficulty }}
- Answer Type: {{ answer_type }}
{% if user_code %}
The user's current attempt:
```{{ language }}
{{ user_code }}
```
{% endif %}
Important Instructions:
1. The entire response must be in {{ explanation_language }} ({{ language_description }})
2. For code examples, use {{ language }} syntax
3. Explain the approach step by step
4. No need to provide full code, just the logic and approach
5. Use simple and clear language
6. If the answer type is 'code', explain the algorithm in detail
7. If the answer type is 'logical_explanation', break down the problem-solving process
8. If the answer type is 'company_approach', explain how this problem might be approached in a technical interview
"#;

/// Renders the explanation prompt sent to the model.
pub struct ExplanationPrompt {
    tera: Tera,
}

impl ExplanationPrompt {
    pub fn new() -> Result<Self, GenerationError> {
        let mut tera = Tera::default();
        tera.add_raw_template(TEMPLATE_NAME, EXPLANATION_TEMPLATE)
            .map_err(|e| GenerationError::Prompt(e.to_string()))?;
        Ok(Self { tera })
    }

    pub fn render(&self, query: &ValidatedQuery) -> Result<String, GenerationError> {
        let mut context = Context::new();
        context.insert("problem_title", &query.problem_title);
        context.insert("difficulty", &query.difficulty);
        context.insert("language", &query.language);
        context.insert("answer_type", &query.answer_type.to_string());
        context.insert("explanation_language", &query.explanation_language.to_string());
        context.insert(
            "language_description",
            query.explanation_language.describe(),
        );
        context.insert("user_code", &query.user_code);

        self.tera
            .render(TEMPLATE_NAME, &context)
            .map_err(|e| GenerationError::Prompt(e.to_string()))
    }
}
