//! End-to-end function calling against mock backends.

use serde_json::json;
use steer::{ByteTokenizer, CachedModel, ChatMessage, Error, Forward, FunctionSchema, Result};
use steer_llama::Llama2Template;
use steer_runtime::{
    process_function_call, CompletionRequest, FunctionCallConfig, FunctionInvocation,
    LocalCompletion, TextCompletion,
};

fn functions() -> Vec<FunctionSchema> {
    vec![
        FunctionSchema::new(
            "get_weather",
            "Get weather in a location",
            json!({
                "type": "object",
                "properties": {"location": {"type": "string", "description": "City name"}},
                "required": ["location"]
            }),
        ),
        FunctionSchema::new(
            "get_stock_price",
            "Get the latest price of a stock",
            json!({
                "type": "object",
                "properties": {"symbol": {"type": "string", "description": "Ticker symbol"}},
                "required": ["symbol"]
            }),
        ),
    ]
}

const QUESTION: &str = "What's the weather in Paris and the stock price for AAPL?";

fn expected() -> Vec<FunctionInvocation> {
    vec![
        FunctionInvocation {
            name: "get_weather".to_string(),
            arguments: json!({"location": "Paris"}),
        },
        FunctionInvocation {
            name: "get_stock_price".to_string(),
            arguments: json!({"symbol": "AAPL"}),
        },
    ]
}

// ---------------------------------------------------------------------------
// Routed backend: answers according to which stage the messages belong to
// ---------------------------------------------------------------------------

struct Routed {
    selection: String,
    weather: String,
    stock: String,
    calls: usize,
}

impl Routed {
    fn new(selection: &str) -> Self {
        Self {
            selection: selection.to_string(),
            weather: r#"{"location":"Paris"}"#.to_string(),
            stock: r#"{"symbol": "AAPL"}"#.to_string(),
            calls: 0,
        }
    }

    fn route(&self, messages: &[ChatMessage]) -> String {
        let system = messages[0].content().unwrap_or_default();
        if system.contains("selects the most appropriate functions") {
            self.selection.clone()
        } else if system.contains("'get_weather'") {
            self.weather.clone()
        } else {
            self.stock.clone()
        }
    }
}

impl TextCompletion for Routed {
    async fn complete(&mut self, request: &CompletionRequest) -> Result<String> {
        self.calls += 1;
        Ok(self.route(&request.messages))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn selects_then_fills_arguments_in_order() {
    let mut backend = Routed::new("get_weather,get_stock_price");
    let result = process_function_call(
        &mut backend,
        QUESTION,
        &functions(),
        &FunctionCallConfig::default(),
    )
    .await
    .unwrap();
    assert_eq!(result, Some(expected()));
    assert_eq!(backend.calls, 3);
}

#[tokio::test]
async fn selection_is_trimmed_per_name() {
    let mut backend = Routed::new(" get_stock_price , get_weather\n");
    let result = process_function_call(
        &mut backend,
        QUESTION,
        &functions(),
        &FunctionCallConfig::default(),
    )
    .await
    .unwrap()
    .unwrap();
    let names: Vec<&str> = result.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, vec!["get_stock_price", "get_weather"]);
}

#[tokio::test]
async fn sentinel_means_no_call() {
    let mut backend = Routed::new("no_need_to_call_any_known_function");
    let result = process_function_call(
        &mut backend,
        "Tell me a joke",
        &functions(),
        &FunctionCallConfig::default(),
    )
    .await
    .unwrap();
    assert_eq!(result, None);
    assert_eq!(backend.calls, 1);
}

#[tokio::test]
async fn unknown_selection_exhausts_retries() {
    let mut backend = Routed::new("get_time");
    let err = process_function_call(
        &mut backend,
        QUESTION,
        &functions(),
        &FunctionCallConfig::default(),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, Error::ConstraintExhausted { attempts: 3, .. }));
    assert_eq!(backend.calls, 3);
}

#[tokio::test]
async fn arguments_missing_required_key_exhaust_retries() {
    let mut backend = Routed::new("get_weather");
    backend.weather = r#"{"city": "Paris"}"#.to_string();
    let config = FunctionCallConfig {
        max_attempts: 2,
        ..FunctionCallConfig::default()
    };
    let err = process_function_call(&mut backend, QUESTION, &functions(), &config)
        .await
        .unwrap_err();
    match err {
        Error::ConstraintExhausted {
            attempts,
            last_text,
        } => {
            assert_eq!(attempts, 2);
            assert_eq!(last_text.as_deref(), Some(r#"{"city": "Paris"}"#));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(backend.calls, 3);
}

// ---------------------------------------------------------------------------
// Local runtime: a byte-level model that "answers" after the last [/INST]
// ---------------------------------------------------------------------------

/// Forward pass that keeps its own token cache and emits a canned reply
/// chosen by what the prompt contains, one byte per step, then EOS.
struct CannedForward {
    cache: Vec<u32>,
    replies: Vec<(&'static str, &'static str)>,
    evaluated: usize,
}

impl CannedForward {
    fn next_token(&self) -> u32 {
        let bytes: Vec<u8> = self
            .cache
            .iter()
            .filter_map(|&t| u8::try_from(t).ok())
            .collect();
        let text = String::from_utf8_lossy(&bytes);
        let Some(end) = text.rfind("[/INST]") else {
            return ByteTokenizer::EOS;
        };
        let emitted = text.len() - (end + "[/INST]".len());
        let reply = self
            .replies
            .iter()
            .find(|(needle, _)| text[..end].contains(needle))
            .map_or("", |(_, reply)| reply);
        reply
            .as_bytes()
            .get(emitted)
            .map_or(ByteTokenizer::EOS, |&b| u32::from(b))
    }
}

impl Forward for CannedForward {
    fn vocab_size(&self) -> usize {
        258
    }

    fn forward(&mut self, tokens: &[u32], position: usize) -> Result<Vec<f32>> {
        self.cache.truncate(position);
        self.cache.extend_from_slice(tokens);
        self.evaluated += tokens.len();
        let mut logits = vec![0.0; 258];
        logits[self.next_token() as usize] = 20.0;
        Ok(logits)
    }

    fn clear(&mut self) {
        self.cache.clear();
    }

    fn truncate(&mut self, len: usize) -> bool {
        self.cache.truncate(len);
        true
    }
}

#[tokio::test]
async fn local_runtime_end_to_end() {
    let forward = CannedForward {
        cache: Vec::new(),
        replies: vec![
            ("Available functions:", " get_weather,get_stock_price"),
            ("Example response for 'get_weather'", r#" {"location":"Paris"}"#),
            ("Example response for 'get_stock_price'", r#" {"symbol": "AAPL"}"#),
        ],
        evaluated: 0,
    };
    let mut local = LocalCompletion::new(CachedModel::new(forward, ByteTokenizer), Llama2Template);
    let result = process_function_call(
        &mut local,
        QUESTION,
        &functions(),
        &FunctionCallConfig::default(),
    )
    .await
    .unwrap();
    assert_eq!(result, Some(expected()));

    // The three prompts open with the same instructions, so later stages
    // evaluate fewer tokens than their full prompt.
    let backend = local.model().backend();
    let prompts: usize = [
        steer_runtime::selection_messages(QUESTION, &functions()),
        steer_runtime::arguments_messages(QUESTION, &functions()[0]).unwrap(),
        steer_runtime::arguments_messages(QUESTION, &functions()[1]).unwrap(),
    ]
    .iter()
    .map(|m| steer::ChatTemplate::apply(&Llama2Template, m).len())
    .sum();
    assert!(backend.evaluated < prompts);
}
