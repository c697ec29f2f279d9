//! Two-stage function calling over a text-completion backend.
//!
//! 1. Selection: the model names the functions to call, comma separated,
//!    or the [`NO_FUNCTION`] sentinel.
//! 2. Arguments: for each selected function, in order, the model writes a
//!    JSON object matching the function's parameter schema.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use steer::function::{self, to_json_indented};
use steer::{
    ChatMessage, FunctionSchema, JsonSchemaConstraint, MultiEnumConstraint, Result, NO_FUNCTION,
};

use crate::completion::{CompletionRequest, TextCompletion, DEFAULT_MODEL};
use crate::retry::{generate_with_constraint, RetryPolicy};

const SELECTION_INSTRUCTIONS: &str = "\
You are a helpful assistant that selects the most appropriate functions to call.
Your task is to return the function names that best match the user's request, separated by commas if multiple functions are needed.
If none of the available functions are suitable for the request, respond with 'no_need_to_call_any_known_function'.
Do not include any other text or explanation in your response.";

/// One function the model decided to call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionInvocation {
    pub name: String,
    pub arguments: Value,
}

/// Settings of [`process_function_call`].
#[derive(Debug, Clone)]
pub struct FunctionCallConfig {
    pub model: String,
    /// Temperature of the first attempt of each stage.
    pub temperature: f32,
    pub max_attempts: usize,
}

impl Default for FunctionCallConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            temperature: 0.1,
            max_attempts: 3,
        }
    }
}

impl FunctionCallConfig {
    fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            initial_temperature: self.temperature,
        }
    }

    fn request(&self, messages: Vec<ChatMessage>) -> CompletionRequest {
        CompletionRequest::new(messages).with_model(self.model.clone())
    }
}

/// Messages asking which of `functions` answer `user_input`.
#[must_use]
pub fn selection_messages(user_input: &str, functions: &[FunctionSchema]) -> Vec<ChatMessage> {
    let summary = functions
        .iter()
        .map(|f| match &f.description {
            Some(description) => format!("- {}: {description}", f.name),
            None => format!("- {}", f.name),
        })
        .collect::<Vec<_>>()
        .join("\n");
    vec![
        ChatMessage::system(SELECTION_INSTRUCTIONS),
        ChatMessage::system(format!("Available functions:\n{summary}")),
        ChatMessage::user("What's the weather in Paris?"),
        ChatMessage::assistant("get_weather"),
        ChatMessage::user("What's the weather in Paris and the stock price for AAPL?"),
        ChatMessage::assistant("get_weather,get_stock_price"),
        ChatMessage::user(user_input),
    ]
}

/// Messages asking for the arguments of `function` given `user_input`.
///
/// # Errors
/// Returns an error if the parameter schema cannot be serialized.
pub fn arguments_messages(user_input: &str, function: &FunctionSchema) -> Result<Vec<ChatMessage>> {
    let schema = to_json_indented(&function.parameters, 2)?;
    let instructions = format!(
        "You are a helpful assistant that generates function arguments in JSON format.\n\
         Your task is to extract relevant information from the user's request and format it as JSON.\n\
         Respond ONLY with a valid JSON object matching this schema:\n\
         {schema}\n\n\
         Example response for '{}':\n\
         {{\"location\": \"Paris\"}}",
        function.name
    );
    Ok(vec![
        ChatMessage::system(instructions),
        ChatMessage::user("What's the weather in Tokyo?"),
        ChatMessage::assistant(r#"{"location": "Tokyo"}"#),
        ChatMessage::user(user_input),
    ])
}

/// Select functions for `user_input` and generate their arguments.
///
/// Returns `None` when the model answers that no offered function applies,
/// otherwise one invocation per selected name, in the order selected.
///
/// # Errors
/// Returns [`steer::Error::InvalidFunctionSelection`] if a selected name is
/// not offered, [`steer::Error::ConstraintExhausted`] if a stage never
/// produced an acceptable answer, or the backend's transport error.
pub async fn process_function_call<C: TextCompletion>(
    completion: &mut C,
    user_input: &str,
    functions: &[FunctionSchema],
    config: &FunctionCallConfig,
) -> Result<Option<Vec<FunctionInvocation>>> {
    let policy = config.retry_policy();

    let selection = generate_with_constraint(
        completion,
        &config.request(selection_messages(user_input, functions)),
        &MultiEnumConstraint::for_functions(functions),
        &policy,
    )
    .await?;
    let selection = selection.trim();
    if selection == NO_FUNCTION {
        tracing::info!("no function applies");
        return Ok(None);
    }

    let selected = selection
        .split(',')
        .map(|name| function::find(functions, name.trim()))
        .collect::<Result<Vec<_>>>()?;
    tracing::info!(
        functions = ?selected.iter().map(|f| f.name.as_str()).collect::<Vec<_>>(),
        "selected functions"
    );

    let mut invocations = Vec::with_capacity(selected.len());
    for function in selected {
        let arguments = generate_with_constraint(
            completion,
            &config.request(arguments_messages(user_input, function)?),
            &JsonSchemaConstraint::for_function(function),
            &policy,
        )
        .await?;
        invocations.push(FunctionInvocation {
            name: function.name.clone(),
            arguments: serde_json::from_str(&arguments)?,
        });
    }
    Ok(Some(invocations))
}
