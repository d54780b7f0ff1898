// =============================================================================
// Token Generation — Autoregressive decoding with the transformer stack
// =============================================================================
//
// Builds a small transformer over a character vocabulary and decodes from a
// prompt. The weights are randomly initialized (the stack has no training
// loop), so the output is noise; what the example shows is the plumbing:
//
//   Token Embedding(vocab_size, d_model)
//   + Sinusoidal positional encoding
//   → N × TransformerBlock(d_model, num_heads, d_ff), causal mask
//   → Linear(d_model, vocab_size)
//   → softmax over the last position, sample, append, repeat
//
// Usage:
//   cargo run --release -p example-token-generate
//   cargo run --release -p example-token-generate -- --prompt "to be" --length 60
//   cargo run --release -p example-token-generate -- --greedy --seed 3

use rand::rngs::StdRng;
use rand::SeedableRng;
use synapse::prelude::*;
use tracing_subscriber::EnvFilter;

// ─────────────────────────────────────────────────────────────────────────────
// Configuration
// ─────────────────────────────────────────────────────────────────────────────

struct Config {
    /// Text to continue
    prompt: String,
    /// Total length of the generated sequence, prompt included
    length: usize,
    /// Model dimension
    d_model: usize,
    /// Number of attention heads
    n_heads: usize,
    /// Number of transformer layers
    n_layers: usize,
    /// Seed for weights and sampling
    seed: u64,
    /// Always take the most likely token
    greedy: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            prompt: "the ".to_string(),
            length: 48,
            d_model: 32,
            n_heads: 4,
            n_layers: 2,
            seed: 42,
            greedy: false,
        }
    }
}

fn parse_args() -> Result<Config> {
    let mut cfg = Config::default();
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        let mut value = |name: &str| {
            args.next()
                .ok_or_else(|| Error::msg(format!("{name} needs a value")))
        };
        match arg.as_str() {
            "--prompt" => cfg.prompt = value("--prompt")?,
            "--length" => cfg.length = parse_num("--length", &value("--length")?)?,
            "--d-model" => cfg.d_model = parse_num("--d-model", &value("--d-model")?)?,
            "--n-heads" => cfg.n_heads = parse_num("--n-heads", &value("--n-heads")?)?,
            "--n-layers" => cfg.n_layers = parse_num("--n-layers", &value("--n-layers")?)?,
            "--seed" => cfg.seed = parse_num("--seed", &value("--seed")?)?,
            "--greedy" => cfg.greedy = true,
            other => return Err(Error::msg(format!("unknown argument '{other}'"))),
        }
    }
    Ok(cfg)
}

fn parse_num<T: std::str::FromStr>(name: &str, raw: &str) -> Result<T> {
    raw.parse()
        .map_err(|_| Error::msg(format!("invalid {name}: '{raw}'")))
}

// ─────────────────────────────────────────────────────────────────────────────
// Character vocabulary
// ─────────────────────────────────────────────────────────────────────────────

const ALPHABET: &str = "abcdefghijklmnopqrstuvwxyz .,;!?'";

struct CharVocab {
    chars: Vec<char>,
}

impl CharVocab {
    fn new() -> Self {
        CharVocab {
            chars: ALPHABET.chars().collect(),
        }
    }

    fn len(&self) -> usize {
        self.chars.len()
    }

    fn encode(&self, text: &str) -> Result<Vec<usize>> {
        text.to_lowercase()
            .chars()
            .map(|c| {
                self.chars
                    .iter()
                    .position(|&v| v == c)
                    .ok_or_else(|| Error::msg(format!("character {c:?} is not in the vocabulary")))
            })
            .collect()
    }

    fn decode(&self, ids: &[usize]) -> String {
        ids.iter().filter_map(|&i| self.chars.get(i)).collect()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Main
// ─────────────────────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cfg = parse_args()?;
    let vocab = CharVocab::new();

    let config = TransformerConfig::new(cfg.d_model, cfg.n_heads, cfg.n_layers)
        .with_vocab_size(vocab.len())
        .with_max_len(cfg.length.max(1))
        .with_seed(cfg.seed);
    let model = Transformer::new(config)?;

    println!("=== Synapse — Token Generation ===");
    println!(
        "  vocab={}  d_model={}  heads={}  layers={}  params={}",
        vocab.len(),
        cfg.d_model,
        cfg.n_heads,
        cfg.n_layers,
        model.num_parameters()
    );

    let prompt = vocab.encode(&cfg.prompt)?;
    let tokens = if cfg.greedy {
        model.generate_greedy(&prompt, cfg.length)?
    } else {
        let mut rng = StdRng::seed_from_u64(cfg.seed);
        model.generate(&prompt, cfg.length, &mut rng)?
    };

    let probs = model.next_token_probabilities(&tokens)?;
    let entropy: f64 = probs
        .iter()
        .filter(|&&p| p > 0.0)
        .map(|&p| -p * p.ln())
        .sum();

    println!("  mode:     {}", if cfg.greedy { "greedy" } else { "sampled" });
    println!("  prompt:   {:?}", cfg.prompt);
    println!("  output:   {:?}", vocab.decode(&tokens));
    println!("  next-token entropy: {entropy:.4} nats (uniform = {:.4})", (vocab.len() as f64).ln());
    Ok(())
}
