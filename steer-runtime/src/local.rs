//! Full-text completion driven token by token on a local runtime.

use std::future::Future;

use rand::rngs::StdRng;
use rand::SeedableRng;
use steer::logits::argmax;
use steer::sampling::sample_top_p;
use steer::{
    ChatTemplate, Error, GenerateOptions, Generation, Model, PrefixItem, Result, SamplingParams,
};

use crate::completion::{CompletionRequest, TextCompletion};

/// Local text completion over a [`Model`].
///
/// Renders messages with a chat template, starts a [`Generation`] on the
/// model and samples until EOS or the token budget. Successive calls reuse
/// whatever prompt prefix the model already evaluated.
pub struct LocalCompletion<M: Model, C: ChatTemplate> {
    model: M,
    template: C,
    seed: u64,
    leading_space: bool,
}

impl<M: Model, C: ChatTemplate> LocalCompletion<M, C> {
    #[must_use]
    pub fn new(model: M, template: C) -> Self {
        Self {
            model,
            template,
            seed: SamplingParams::default().seed,
            leading_space: false,
        }
    }

    /// Seed of the sampling PRNG; every call starts from it.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Force the first generated token to be one whose text starts with a
    /// space. Llama instruct prompts end right after `[/INST]`.
    #[must_use]
    pub fn with_leading_space(mut self, leading_space: bool) -> Self {
        self.leading_space = leading_space;
        self
    }

    #[must_use]
    pub fn model(&self) -> &M {
        &self.model
    }

    pub fn model_mut(&mut self) -> &mut M {
        &mut self.model
    }

    /// Generate from an encoded prefix.
    ///
    /// Returns the generated text, prompt excluded.
    ///
    /// # Errors
    /// Returns an error if the prefix is empty or evaluation fails.
    pub fn generate_from_prefix(
        &mut self,
        prefix: &[PrefixItem],
        options: &GenerateOptions,
    ) -> Result<String> {
        let generation = Generation::start(&mut self.model, prefix)?;
        run(generation, options, self.leading_space)
    }

    /// Generate a reply to `request.messages`.
    ///
    /// # Errors
    /// Returns an error if tokenization or evaluation fails.
    pub fn generate(&mut self, request: &CompletionRequest) -> Result<String> {
        let prompt = self.template.apply(&request.messages);
        let tokens = self.model.tokenize(&prompt, !self.template.includes_bos())?;
        tracing::debug!(
            model = %request.model,
            prompt_tokens = tokens.len(),
            temperature = request.temperature,
            "local completion"
        );
        let options = GenerateOptions {
            max_new_tokens: request.max_tokens,
            eos_token_id: None,
            sampling: Some(SamplingParams {
                temperature: request.temperature,
                top_p: request.top_p,
                seed: self.seed,
            }),
        };
        let generation = Generation::from_tokens(&mut self.model, tokens)?;
        run(generation, &options, self.leading_space)
    }
}

impl<M, C> TextCompletion for LocalCompletion<M, C>
where
    M: Model,
    C: ChatTemplate,
{
    fn complete(
        &mut self,
        request: &CompletionRequest,
    ) -> impl Future<Output = Result<String>> + Send {
        std::future::ready(self.generate(request))
    }
}

fn run<M: Model + ?Sized>(
    mut generation: Generation<'_, M>,
    options: &GenerateOptions,
    leading_space: bool,
) -> Result<String> {
    let eos = options
        .eos_token_id
        .unwrap_or_else(|| generation.eos_token_id());
    let mut rng = options
        .sampling
        .as_ref()
        .map(|params| StdRng::seed_from_u64(params.seed));

    for step in 0..options.max_new_tokens {
        let forced = if step == 0 && leading_space {
            first_spaced(&generation)?
        } else {
            None
        };
        let token = match forced {
            Some(token) => token,
            None => next_token(&generation, options.sampling.as_ref(), rng.as_mut())?,
        };
        if token == eos {
            break;
        }
        generation.register(token)?;
    }
    generation.settled_text()
}

/// Best-ranked candidate whose text starts with a space.
fn first_spaced<M: Model + ?Sized>(generation: &Generation<'_, M>) -> Result<Option<u32>> {
    Ok(generation.candidates()?.find(|&token| {
        generation
            .preview(token)
            .is_ok_and(|text| text.starts_with(' '))
    }))
}

fn next_token<M: Model + ?Sized>(
    generation: &Generation<'_, M>,
    sampling: Option<&SamplingParams>,
    rng: Option<&mut StdRng>,
) -> Result<u32> {
    let logits = generation.logits()?;
    let token = match (sampling, rng) {
        (Some(params), Some(rng)) => sample_top_p(logits, params.temperature, params.top_p, rng),
        _ => argmax(logits),
    };
    token.ok_or_else(|| Error::Evaluation("runtime returned empty logits".to_string()))
}
