// Integration tests for the transformer stack.

use rand::rngs::StdRng;
use rand::SeedableRng;
use synapse::nn::attention::{attention_scores, scaled_dot_product_attention};
use synapse::prelude::*;

fn assert_vec_approx(got: &[f64], expected: &[f64], tol: f64) {
    assert_eq!(got.len(), expected.len(), "length mismatch");
    for (i, (g, e)) in got.iter().zip(expected).enumerate() {
        assert!((g - e).abs() < tol, "index {i}: got {g} expected {e} (tol {tol})");
    }
}

#[test]
fn test_encoder_shape_and_determinism() -> synapse::Result<()> {
    let config = TransformerConfig::new(8, 2, 1).with_seed(42);
    let encoder = TransformerEncoder::new(&config, &mut StdRng::seed_from_u64(42))?;
    let x = Matrix::random(5, 8, 1.0, &mut StdRng::seed_from_u64(0));

    let a = encoder.forward(&x)?;
    let b = encoder.forward(&x)?;
    assert_eq!(a.shape(), Shape::new(5, 8));
    assert_eq!(a, b);

    // Same seed → same weights → same output.
    let again = TransformerEncoder::new(&config, &mut StdRng::seed_from_u64(42))?;
    assert_eq!(again.forward(&x)?, a);
    Ok(())
}

#[test]
fn test_encoder_rows_are_normalized() -> synapse::Result<()> {
    let config = TransformerConfig::new(8, 4, 2);
    let encoder = TransformerEncoder::new(&config, &mut StdRng::seed_from_u64(1))?;
    let x = Matrix::random(6, 8, 1.0, &mut StdRng::seed_from_u64(2));
    let y = encoder.forward_masked(&x, Some(&create_causal_mask(6)))?;
    for r in 0..y.rows() {
        let mean = y.row(r)?.sum() / 8.0;
        assert!(mean.abs() < 1e-9, "row {r} mean {mean}");
    }
    Ok(())
}

#[test]
fn test_causal_mask_blocks_future_positions() -> synapse::Result<()> {
    let mut rng = StdRng::seed_from_u64(3);
    let mha = MultiHeadAttention::new(8, 2, &mut rng)?;
    let x = Matrix::random(5, 8, 1.0, &mut rng);
    let mask = create_causal_mask(5);
    for weights in mha.attention_weights(&x, &x, Some(&mask))? {
        for i in 0..5 {
            for j in (i + 1)..5 {
                assert_eq!(weights.get(i, j)?, 0.0);
            }
            assert!((weights.row(i)?.sum() - 1.0).abs() < 1e-12);
        }
    }
    Ok(())
}

#[test]
fn test_causal_prefix_is_unaffected_by_later_tokens() -> synapse::Result<()> {
    // Under a causal mask, position i only depends on positions <= i, so the
    // first rows of the output do not change when the sequence grows.
    let config = TransformerConfig::new(8, 2, 2).with_vocab_size(10).with_seed(5);
    let model = Transformer::new(config)?;
    let short = model.forward_tokens(&[1, 2, 3], Some(&create_causal_mask(3)))?;
    let long = model.forward_tokens(&[1, 2, 3, 9, 4], Some(&create_causal_mask(5)))?;
    assert_vec_approx(short.data(), long.narrow_rows(0, 3)?.data(), 1e-12);
    Ok(())
}

#[test]
fn test_scaled_dot_product_attention_known_values() -> synapse::Result<()> {
    // Two keys with equal scores → the output is the mean of the values.
    let q = Matrix::row_vector(&[1.0, 0.0]);
    let k = Matrix::from_2d(&[vec![0.0, 1.0], vec![0.0, -1.0]])?;
    let v = Matrix::from_2d(&[vec![2.0, 0.0], vec![4.0, 2.0]])?;
    let out = scaled_dot_product_attention(&q, &k, &v, None, 2)?;
    assert_vec_approx(out.data(), &[3.0, 1.0], 1e-12);

    let w = attention_scores(&q, &k, None, 2)?;
    assert_vec_approx(w.data(), &[0.5, 0.5], 1e-12);
    Ok(())
}

#[test]
fn test_transformer_token_forward_shapes() -> synapse::Result<()> {
    let config = TransformerConfig::new(8, 2, 1).with_vocab_size(12).with_seed(9);
    let model = Transformer::new(config)?;

    let logits = model.forward_tokens(&[0, 5, 11], None)?;
    assert_eq!(logits.shape(), Shape::new(3, 12));

    // A single column of ids goes through the embedding too.
    let ids = Matrix::from_array(&[0.0, 5.0, 11.0]);
    assert_eq!(model.forward(&ids, None)?, logits);

    assert!(model.forward_tokens(&[12], None).is_err());
    Ok(())
}

#[test]
fn test_transformer_without_vocab_passes_through_encoder() -> synapse::Result<()> {
    let model = Transformer::new(TransformerConfig::new(8, 2, 1).with_seed(1))?;
    let x = Matrix::random(4, 8, 1.0, &mut StdRng::seed_from_u64(1));
    assert_eq!(model.forward(&x, None)?.shape(), Shape::new(4, 8));
    assert_eq!(model.forward(&x, None)?, model.encoder().forward(&x)?);
    Ok(())
}

#[test]
fn test_generate_requires_vocab() {
    let model = Transformer::new(TransformerConfig::new(8, 2, 1).with_seed(0)).unwrap();
    let mut rng = StdRng::seed_from_u64(0);
    assert!(matches!(
        model.generate(&[1, 2], 5, &mut rng),
        Err(Error::Config(_))
    ));
    assert!(matches!(model.generate_greedy(&[1], 3), Err(Error::Config(_))));
    assert!(matches!(model.forward_tokens(&[1], None), Err(Error::Config(_))));
}

#[test]
fn test_generate_validates_inputs() {
    let config = TransformerConfig::new(8, 2, 1)
        .with_vocab_size(6)
        .with_max_len(16)
        .with_seed(0);
    let model = Transformer::new(config).unwrap();
    let mut rng = StdRng::seed_from_u64(0);
    assert!(model.generate(&[], 4, &mut rng).is_err());
    assert!(model.generate(&[6], 4, &mut rng).is_err());
    assert!(matches!(
        model.generate(&[1], 17, &mut rng),
        Err(Error::SequenceTooLong { len: 17, max: 16 })
    ));
}

#[test]
fn test_generate_extends_prompt() -> synapse::Result<()> {
    let config = TransformerConfig::new(8, 2, 2).with_vocab_size(7).with_seed(21);
    let model = Transformer::new(config)?;

    let a = model.generate(&[3, 1], 8, &mut StdRng::seed_from_u64(99))?;
    let b = model.generate(&[3, 1], 8, &mut StdRng::seed_from_u64(99))?;
    assert_eq!(a.len(), 8);
    assert_eq!(&a[..2], &[3, 1]);
    assert!(a.iter().all(|&t| t < 7));
    assert_eq!(a, b);

    let greedy = model.generate_greedy(&[3, 1], 6)?;
    assert_eq!(greedy.len(), 6);
    let probs = model.next_token_probabilities(&greedy[..2])?;
    assert_eq!(Some(greedy[2]), argmax(&probs));
    assert!((probs.iter().sum::<f64>() - 1.0).abs() < 1e-9);
    Ok(())
}

#[test]
fn test_parameter_counts() -> synapse::Result<()> {
    let d = 8;
    let ff = 32;
    let vocab = 10;
    let config = TransformerConfig::new(d, 2, 3).with_vocab_size(vocab).with_seed(0);
    let model = Transformer::new(config)?;
    let per_block = 4 * d * d + (d * ff + ff + ff * d + d) + 2 * (2 * d);
    let expected = vocab * d + 3 * per_block + (d * vocab + vocab);
    assert_eq!(model.num_parameters(), expected);
    Ok(())
}

#[test]
fn test_config_from_json_builds_model() -> synapse::Result<()> {
    let config = TransformerConfig::from_json(
        r#"{"d_model": 4, "num_heads": 2, "num_layers": 1, "vocab_size": 5, "max_len": 32, "seed": 7}"#,
    )?;
    let model = Transformer::new(config)?;
    assert_eq!(model.generate_greedy(&[0], 4)?.len(), 4);
    assert!(TransformerConfig::from_json(r#"{"d_model": 6, "num_heads": 4, "num_layers": 1}"#).is_err());
    Ok(())
}

#[test]
fn test_single_width_model_decodes_tokens() -> synapse::Result<()> {
    // With d_model = 1 the embedded sequence is itself one column wide; it
    // must not be read back as token ids.
    let config = TransformerConfig::new(1, 1, 1).with_vocab_size(5).with_seed(3);
    let model = Transformer::new(config)?;

    let logits = model.forward_tokens(&[1, 2], None)?;
    assert_eq!(logits.shape(), Shape::new(2, 5));

    let ids = Matrix::from_array(&[1.0, 2.0]);
    assert_eq!(model.forward(&ids, None)?, logits);

    let tokens = model.generate_greedy(&[1, 2], 4)?;
    assert_eq!(tokens.len(), 4);
    assert!(tokens.iter().all(|&t| t < 5));
    let sampled = model.generate(&[1, 2], 4, &mut StdRng::seed_from_u64(3))?;
    assert_eq!(sampled.len(), 4);
    Ok(())
}
