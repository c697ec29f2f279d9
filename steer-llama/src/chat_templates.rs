//! Chat templates for the Llama-2 model family

use steer::chat_template::{ChatMessage, ChatTemplate, MessageBody, Role};

/// Llama-2 chat template.
///
/// Format:
/// ```text
/// <s>[INST] <<SYS>>
/// {system}
/// <</SYS>>
///
/// {user} [/INST] {assistant} </s><s>[INST] {user} [/INST]
/// ```
///
/// Consecutive system messages are merged into one `<<SYS>>` block that
/// opens the next user turn. Function calls and function results use the
/// `<function>` marker of the function-calling finetunes.
pub struct Llama2Template;

impl ChatTemplate for Llama2Template {
    fn apply(&self, messages: &[ChatMessage]) -> String {
        let mut prompt = String::new();
        let mut system: Vec<&str> = Vec::new();
        for msg in messages {
            match msg.role {
                Role::System => system.extend(msg.content()),
                Role::User | Role::Function => {
                    prompt.push_str("<s>[INST] ");
                    if !system.is_empty() {
                        push_system(&mut prompt, &system);
                        system.clear();
                    }
                    if msg.role == Role::Function {
                        prompt.push_str("<function>");
                    }
                    prompt.push_str(msg.content().unwrap_or_default());
                    prompt.push_str(" [/INST]");
                }
                Role::Assistant => {
                    prompt.push(' ');
                    match &msg.body {
                        MessageBody::Content(text) => prompt.push_str(text.trim()),
                        MessageBody::FunctionCall(call) => {
                            prompt.push_str("<function>");
                            prompt.push_str(&call.name);
                            prompt.push('\n');
                            prompt.push_str(&call.arguments);
                        }
                    }
                    prompt.push_str(" </s>");
                }
            }
        }
        // A trailing system block still needs a turn to live in
        if !system.is_empty() {
            prompt.push_str("<s>[INST] ");
            push_system(&mut prompt, &system);
            prompt.push_str(" [/INST]");
        }
        prompt
    }

    fn includes_bos(&self) -> bool {
        true
    }
}

fn push_system(prompt: &mut String, system: &[&str]) {
    prompt.push_str("<<SYS>>\n");
    prompt.push_str(&system.join("\n\n"));
    prompt.push_str("\n<</SYS>>\n\n");
}
