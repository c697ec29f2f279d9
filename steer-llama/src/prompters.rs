//! Prompt encoders for Llama-2 instruct and CodeLlama function-calling models.

use serde::{Deserialize, Serialize};
use steer::chat_template::{ChatMessage, MessageBody, Role};
use steer::function::{self, to_json_indented, FunctionSchema};
use steer::{Error, PrefixItem, Prompt, Prompter, Result};

/// Beginning-of-sequence token of the Llama vocabulary.
pub const BOS_ID: u32 = 1;
/// End-of-sequence token of the Llama vocabulary.
pub const EOS_ID: u32 = 2;

fn function_summary(function: &FunctionSchema) -> String {
    match &function.description {
        Some(description) => format!("- {} - {description}", function.name),
        None => format!("- {}", function.name),
    }
}

fn functions_summary(functions: &[FunctionSchema]) -> String {
    let lines: Vec<String> = functions.iter().map(function_summary).collect();
    format!("Available functions:\n{}", lines.join("\n"))
}

/// Description and parameter schema of the function whose arguments are
/// being generated.
fn function_data(function: &FunctionSchema) -> Result<String> {
    let mut lines = Vec::new();
    if let Some(description) = &function.description {
        lines.push(format!("Function description: {description}"));
    }
    lines.push("Function parameters should follow this schema:".to_string());
    lines.push("```jsonschema".to_string());
    lines.push(to_json_indented(&function.properties(), 4)?);
    lines.push("```".to_string());
    Ok(lines.join("\n"))
}

/// Prompter for Llama-2 instruct models.
///
/// Builds a single `[INST] <<SYS>>` turn that either asks which function
/// to call or asks for the arguments of `function_to_call`, and ends with
/// the start of the expected answer so the model continues from there.
#[derive(Debug, Clone, Copy, Default)]
pub struct LlamaInstructPrompter;

impl Prompter for LlamaInstructPrompter {
    fn prompt(
        &self,
        prompt: &Prompt,
        functions: &[FunctionSchema],
        function_to_call: Option<&str>,
    ) -> Result<Vec<PrefixItem>> {
        let Prompt::Text(question) = prompt else {
            return Err(Error::InvalidPrompt(
                "Llama instruct prompts take a single question, not a chat".to_string(),
            ));
        };
        let (system, data, response_start) = match function_to_call {
            None => (
                "Help choose the appropriate function to call to answer the user's question."
                    .to_string(),
                functions_summary(functions),
                "Here's the function the user should call: ".to_string(),
            ),
            Some(name) => (
                format!("Define the arguments for {name} to answer the user's question."),
                function_data(function::find(functions, name)?)?,
                format!("Here are the arguments for the `{name}` function: ```json\n"),
            ),
        };
        Ok(vec![
            PrefixItem::Token(BOS_ID),
            PrefixItem::Text(format!(
                "[INST] <<SYS>>\n{system}\n\n{data}\n<</SYS>>\n\n{question} [/INST] {response_start}"
            )),
        ])
    }
}

/// Markers that tell whether a model wants to call a function.
///
/// Generation after a should-call prefix starts with one of
/// `if_should_call` when the model intends a call, or one of
/// `if_not_should_call` when it answers in natural language.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShouldCallResponse {
    pub if_should_call: Vec<String>,
    pub if_not_should_call: Vec<String>,
}

/// Prompter for CodeLlama models finetuned for function calling.
///
/// Encodes a whole conversation: every completed turn is closed with EOS
/// and the next one opened with BOS, function results are marked with
/// `<function>`, and the catalog of functions is injected as a system
/// block in front of the first user message.
#[derive(Debug, Clone, Copy, Default)]
pub struct CodeLlamaFunctionCallingPrompter;

impl CodeLlamaFunctionCallingPrompter {
    fn user_message(role: Role, content: &str) -> String {
        if role == Role::User {
            format!("[INST] {content} [/INST]")
        } else {
            format!("[INST] <function>{content} [/INST]")
        }
    }

    fn assistant_message(message: &ChatMessage) -> String {
        match &message.body {
            MessageBody::Content(text) => format!(" {text}"),
            MessageBody::FunctionCall(call) => {
                format!("<function>{}\n{}", call.name, call.arguments)
            }
        }
    }

    fn system_prompt(functions: &[FunctionSchema]) -> Result<String> {
        let summary = functions
            .iter()
            .map(|f| to_json_indented(f, 4).map(|json| format!("<function>{json}")))
            .collect::<Result<Vec<_>>>()?
            .join("\n");
        Ok(format!(
            "<<SYS>>\n<function>Available functions:\n{summary} <</SYS>>\n\n"
        ))
    }

    fn chat_prompt(
        chat: &[ChatMessage],
        functions: &[FunctionSchema],
        function_to_call: Option<&str>,
        use_function: bool,
    ) -> Result<Vec<PrefixItem>> {
        let Some(first) = chat.first() else {
            return Err(Error::InvalidPrompt("chat is empty".to_string()));
        };
        if first.role != Role::User {
            return Err(Error::InvalidPrompt(
                "first message must be from user".to_string(),
            ));
        }
        if first.content().is_none() {
            return Err(Error::InvalidPrompt(
                "first message must have content".to_string(),
            ));
        }
        let system_prompt = Self::system_prompt(functions)?;

        let mut result = vec![PrefixItem::Token(BOS_ID)];
        let close_turn = |result: &mut Vec<PrefixItem>, text: String| {
            result.push(PrefixItem::Text(text));
            result.push(PrefixItem::Token(EOS_ID));
            result.push(PrefixItem::Token(BOS_ID));
        };

        let mut pending: Option<String> = None;
        for (i, message) in chat.iter().enumerate() {
            let content = message.content().unwrap_or_default();
            match message.role {
                Role::User | Role::Function => {
                    if let Some(user) = pending.take() {
                        close_turn(&mut result, user);
                    }
                    pending = Some(if i == 0 {
                        Self::user_message(message.role, &format!("{system_prompt}{content}"))
                    } else {
                        Self::user_message(message.role, content)
                    });
                }
                // An assistant turn without a preceding user turn has
                // nothing to attach to and is dropped.
                Role::Assistant => {
                    if let Some(user) = pending.take() {
                        close_turn(&mut result, user + &Self::assistant_message(message));
                    }
                }
                Role::System => {}
            }
        }
        if let Some(user) = pending {
            close_turn(&mut result, user);
        }

        let f_start = match (use_function, function_to_call) {
            (false, _) => String::new(),
            (true, None) => "<function>".to_string(),
            (true, Some(name)) => format!("<function>{name}\n"),
        };
        if result.last() == Some(&PrefixItem::Token(BOS_ID)) {
            result.truncate(result.len() - 2);
        }
        match result.last_mut() {
            Some(PrefixItem::Text(text)) => text.push_str(&f_start),
            _ => result.push(PrefixItem::Text(f_start)),
        }
        Ok(result)
    }

    fn as_chat(prompt: &Prompt) -> Vec<ChatMessage> {
        match prompt {
            Prompt::Text(text) => vec![ChatMessage::user(text.clone())],
            Prompt::Chat(chat) => chat.clone(),
        }
    }

    /// Prefix that lets the model decide whether to call a function.
    ///
    /// # Errors
    /// Returns [`Error::InvalidPrompt`] if the chat does not open with a
    /// user message that has content.
    pub fn should_call_prompt(
        &self,
        prompt: &Prompt,
        functions: &[FunctionSchema],
    ) -> Result<(Vec<PrefixItem>, ShouldCallResponse)> {
        let prefix = Self::chat_prompt(&Self::as_chat(prompt), functions, None, false)?;
        Ok((
            prefix,
            ShouldCallResponse {
                if_should_call: vec!["<function>".to_string()],
                if_not_should_call: vec![" ".to_string()],
            },
        ))
    }

    /// Prefix for a plain natural-language answer.
    ///
    /// # Errors
    /// Returns an error if the function catalog cannot be serialized.
    pub fn natural_language_prompt(
        &self,
        prompt: &str,
        functions: &[FunctionSchema],
    ) -> Result<Vec<PrefixItem>> {
        let (prefix, _) = self.should_call_prompt(&Prompt::from(prompt), functions)?;
        Ok(prefix)
    }
}

impl Prompter for CodeLlamaFunctionCallingPrompter {
    fn prompt(
        &self,
        prompt: &Prompt,
        functions: &[FunctionSchema],
        function_to_call: Option<&str>,
    ) -> Result<Vec<PrefixItem>> {
        if let Some(name) = function_to_call {
            function::find(functions, name)?;
        }
        Self::chat_prompt(&Self::as_chat(prompt), functions, function_to_call, true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn weather() -> FunctionSchema {
        FunctionSchema::new(
            "get_weather",
            "Get weather in a location",
            json!({
                "type": "object",
                "properties": {"location": {"type": "string"}},
                "required": ["location"]
            }),
        )
    }

    fn catalog() -> Vec<FunctionSchema> {
        vec![
            weather(),
            FunctionSchema {
                name: "ping".to_string(),
                description: None,
                parameters: json!({"type": "object", "properties": {}}),
            },
        ]
    }

    fn text(item: &PrefixItem) -> &str {
        match item {
            PrefixItem::Text(text) => text,
            PrefixItem::Token(id) => panic!("expected text, got token {id}"),
        }
    }

    // ---- Llama instruct ----

    #[test]
    fn instruct_selection_prompt() {
        let prefix = LlamaInstructPrompter
            .prompt(&Prompt::from("Weather in Paris?"), &catalog(), None)
            .unwrap();
        assert_eq!(prefix.len(), 2);
        assert_eq!(prefix[0], PrefixItem::Token(BOS_ID));
        assert_eq!(
            text(&prefix[1]),
            concat!(
                "[INST] <<SYS>>\n",
                "Help choose the appropriate function to call to answer the user's question.\n\n",
                "Available functions:\n",
                "- get_weather - Get weather in a location\n",
                "- ping\n",
                "<</SYS>>\n\n",
                "Weather in Paris? [/INST] Here's the function the user should call: ",
            )
        );
    }

    #[test]
    fn instruct_arguments_prompt() {
        let prefix = LlamaInstructPrompter
            .prompt(&Prompt::from("Weather in Paris?"), &catalog(), Some("get_weather"))
            .unwrap();
        assert_eq!(
            text(&prefix[1]),
            concat!(
                "[INST] <<SYS>>\n",
                "Define the arguments for get_weather to answer the user's question.\n\n",
                "Function description: Get weather in a location\n",
                "Function parameters should follow this schema:\n",
                "```jsonschema\n",
                "{\n    \"location\": {\n        \"type\": \"string\"\n    }\n}\n",
                "```\n",
                "<</SYS>>\n\n",
                "Weather in Paris? [/INST] Here are the arguments for the `get_weather` function: ```json\n",
            )
        );
    }

    #[test]
    fn instruct_rejects_unknown_function_and_chat() {
        let err = LlamaInstructPrompter
            .prompt(&Prompt::from("hi"), &catalog(), Some("get_time"))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidFunctionSelection { .. }));

        let chat = Prompt::Chat(vec![ChatMessage::user("hi")]);
        let err = LlamaInstructPrompter.prompt(&chat, &catalog(), None).unwrap_err();
        assert!(matches!(err, Error::InvalidPrompt(_)));
    }

    // ---- CodeLlama function calling ----

    fn system_block() -> String {
        CodeLlamaFunctionCallingPrompter::system_prompt(&[weather()]).unwrap()
    }

    #[test]
    fn codellama_system_block_lists_schemas() {
        let block = system_block();
        assert!(block.starts_with("<<SYS>>\n<function>Available functions:\n<function>{\n"));
        assert!(block.contains("    \"name\": \"get_weather\","));
        assert!(block.ends_with("} <</SYS>>\n\n"));
    }

    #[test]
    fn codellama_single_question() {
        let prefix = CodeLlamaFunctionCallingPrompter
            .prompt(&Prompt::from("Hi"), &[weather()], None)
            .unwrap();
        assert_eq!(
            prefix,
            vec![
                PrefixItem::Token(BOS_ID),
                PrefixItem::Text(format!("[INST] {}Hi [/INST]<function>", system_block())),
            ]
        );

        let prefix = CodeLlamaFunctionCallingPrompter
            .prompt(&Prompt::from("Hi"), &[weather()], Some("get_weather"))
            .unwrap();
        assert!(text(&prefix[1]).ends_with("[/INST]<function>get_weather\n"));
    }

    #[test]
    fn codellama_multi_turn_closes_turns() {
        let chat = Prompt::Chat(vec![
            ChatMessage::user("Hi"),
            ChatMessage::function_call("get_weather", r#"{"location": "Paris"}"#),
            ChatMessage::function_result("get_weather", "sunny"),
        ]);
        let prefix = CodeLlamaFunctionCallingPrompter
            .prompt(&chat, &[weather()], None)
            .unwrap();
        assert_eq!(
            prefix,
            vec![
                PrefixItem::Token(BOS_ID),
                PrefixItem::Text(format!(
                    "[INST] {}Hi [/INST]<function>get_weather\n{{\"location\": \"Paris\"}}",
                    system_block()
                )),
                PrefixItem::Token(EOS_ID),
                PrefixItem::Token(BOS_ID),
                PrefixItem::Text("[INST] <function>sunny [/INST]<function>".to_string()),
            ]
        );
    }

    #[test]
    fn codellama_assistant_text_reply() {
        let chat = Prompt::Chat(vec![
            ChatMessage::user("Hi"),
            ChatMessage::assistant("Hello!"),
        ]);
        let prefix = CodeLlamaFunctionCallingPrompter
            .prompt(&chat, &[weather()], None)
            .unwrap();
        assert_eq!(prefix.len(), 2);
        assert!(text(&prefix[1]).ends_with("Hi [/INST] Hello!<function>"));
    }

    #[test]
    fn codellama_first_message_must_be_user() {
        let chat = Prompt::Chat(vec![ChatMessage::assistant("Hello!")]);
        let err = CodeLlamaFunctionCallingPrompter
            .prompt(&chat, &[weather()], None)
            .unwrap_err();
        assert!(matches!(err, Error::InvalidPrompt(_)));

        let err = CodeLlamaFunctionCallingPrompter
            .prompt(&Prompt::Chat(Vec::new()), &[weather()], None)
            .unwrap_err();
        assert!(matches!(err, Error::InvalidPrompt(_)));
    }

    #[test]
    fn codellama_should_call_prompt() {
        let (prefix, markers) = CodeLlamaFunctionCallingPrompter
            .should_call_prompt(&Prompt::from("Hi"), &[weather()])
            .unwrap();
        assert!(text(&prefix[1]).ends_with("Hi [/INST]"));
        assert_eq!(markers.if_should_call, vec!["<function>"]);
        assert_eq!(markers.if_not_should_call, vec![" "]);

        let natural = CodeLlamaFunctionCallingPrompter
            .natural_language_prompt("Hi", &[weather()])
            .unwrap();
        assert_eq!(natural, prefix);
    }
}
